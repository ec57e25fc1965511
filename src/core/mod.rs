//! core
//!
//! Core domain types, configuration, and concurrency primitives.
//!
//! # Modules
//!
//! - [`types`] - Strong types: VersionName, RefName, Oid, ChangeId, FileEntry
//! - [`paths`] - Directory layout of per-version working copies
//! - [`config`] - Configuration schema and loading
//! - [`ops`] - Per-version locking and retry
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Nothing here touches git directly

pub mod config;
pub mod ops;
pub mod paths;
pub mod types;
