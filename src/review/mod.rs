//! review
//!
//! Abstraction over the remote review service.
//!
//! # Architecture
//!
//! The review service (change metadata, per-file status, rebase, submit)
//! is consumed as a black box. The change-backed repository variant reads
//! the current ref, subject and Change-Id of a change every time it writes,
//! and the file status map every time it lists.
//!
//! # Modules
//!
//! - `traits`: The [`ReviewService`] trait and its data types
//! - [`mock`]: In-memory implementation for deterministic testing

pub mod mock;
mod traits;

pub use traits::*;
