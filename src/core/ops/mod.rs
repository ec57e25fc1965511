//! core::ops
//!
//! Concurrency and resilience primitives for command sequences.
//!
//! # Modules
//!
//! - [`lock`] - One exclusive lock per version name
//! - [`retry`] - Bounded retry of transient transport failures
//!
//! # Architecture
//!
//! Every executor operation:
//! 1. Acquires the lock for its version name
//! 2. Runs its steps against the local working copy
//! 3. Wraps each transport-touching step in the retry policy
//! 4. Releases the lock when the sequence (including retries) finishes

pub mod lock;
pub mod retry;

pub use lock::LockRegistry;
pub use retry::{RetryPolicy, Retryable};
