//! cli
//!
//! Administrative command-line interface.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Resolve configuration into executor settings
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Every command maps to one
//! [`CommandExecutor`](crate::repo::CommandExecutor) operation; no git work
//! happens here.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::repo::{CommandExecutor, ExecutorSettings};
use crate::ui::output::Verbosity;

/// Shared state for command handlers.
#[derive(Debug)]
pub struct Context {
    pub executor: CommandExecutor,
    pub verbosity: Verbosity,
    pub json: bool,
}

impl Context {
    /// Load configuration and build the executor.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = Config::load(cli.config.as_deref()).context("failed to load config")?;
        if let Some(root) = &cli.root {
            config.set_root(root.clone());
        }
        let settings =
            ExecutorSettings::from_config(&config).context("invalid executor settings")?;
        Ok(Self {
            executor: CommandExecutor::new(settings),
            verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
            json: cli.json,
        })
    }
}

/// Run the CLI application with parsed arguments.
///
/// This is the main entry point called from `main.rs`.
pub fn run(cli: Cli) -> Result<()> {
    if let args::Command::Completion { shell } = cli.command {
        return commands::completion(shell);
    }
    let ctx = Context::from_cli(&cli)?;
    commands::dispatch(cli.command, &ctx)
}
