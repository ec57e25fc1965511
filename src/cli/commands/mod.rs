//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments into strong types
//! 2. Calls one executor operation
//! 3. Formats and displays output (human or JSON)

mod completion;
mod files;
mod lifecycle;

pub use completion::completion;
pub use files::{cat, conflicts, dates, ls, rollback, submit};
pub use lifecycle::{clone, delete, exists, fetch, reset};

use anyhow::{Context as _, Result};

use super::args::Command;
use super::Context;
use crate::core::types::VersionName;

/// Parse a version argument.
pub(crate) fn version(name: &str) -> Result<VersionName> {
    VersionName::new(name).with_context(|| format!("invalid version name '{}'", name))
}

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Clone { version } => clone(ctx, &version),
        Command::Fetch { version, refname } => fetch(ctx, &version, &refname),
        Command::Reset { version } => reset(ctx, &version),
        Command::Ls { version, path } => ls(ctx, &version, &path),
        Command::Cat { version, path } => cat(ctx, &version, &path),
        Command::Dates { version, path } => dates(ctx, &version, &path),
        Command::Conflicts { version, target } => conflicts(ctx, &version, &target),
        Command::Rollback { version, path } => rollback(ctx, &version, &path),
        Command::Submit {
            version,
            path,
            from,
        } => submit(ctx, &version, &path, &from),
        Command::Delete { version } => delete(ctx, &version),
        Command::Exists { version } => exists(ctx, &version),
        Command::Completion { shell } => completion(shell),
    }
}
