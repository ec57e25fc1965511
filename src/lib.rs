//! registry-vcs - Repository orchestration for registry configuration review
//!
//! Maps version names (the stable branch or a numbered review change) to
//! on-disk working copies, runs multi-step git command sequences against
//! them safely under concurrent access, classifies failures into a small
//! error taxonomy, and reconciles the local tree with the review service's
//! per-change file statuses.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`core`] - Domain types, paths, configuration, locking and retry
//! - [`git`] - Single interface for all Git operations
//! - [`review`] - Abstraction for the remote review service
//! - [`repo`] - Command executor, versioned file views and their factory
//! - [`cli`] - Administrative command-line interface
//! - [`ui`] - Output formatting
//!
//! # Correctness Invariants
//!
//! 1. For one version name, command sequences never interleave
//! 2. Only transient transport failures are retried, at most a fixed number of times
//! 3. Working copy existence on disk is the only "cloned" state
//! 4. Every failure surfaces as one stable error kind with its cause attached

pub mod cli;
pub mod core;
pub mod git;
pub mod repo;
pub mod review;
pub mod ui;
