//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this configuration file instead of searching
//! - `--root <path>`: Override the working copy root
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--json`: Machine-readable output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// regvcs - Administer per-version working copies of the registry repository
#[derive(Parser, Debug)]
#[command(name = "regvcs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: $REGVCS_CONFIG, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding one working copy per version
    #[arg(long, global = true, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub debug: bool,

    /// Minimal output; only warnings and errors are logged
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Default log filter for the chosen verbosity.
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Clone the remote for a version unless its working copy exists
    Clone {
        /// Version name (stable branch or change number)
        version: String,
    },

    /// Fetch a ref and check it out as a detached HEAD
    #[command(after_help = "\
EXAMPLES:
    # Check out patch set 3 of change 42
    regvcs fetch 42 refs/changes/42/42/3")]
    Fetch {
        /// Version name
        version: String,
        /// Ref to fetch
        refname: String,
    },

    /// Fetch everything and hard-reset the version's branch to the remote
    Reset {
        /// Version name
        version: String,
    },

    /// List files directly inside a directory
    Ls {
        /// Version name
        version: String,
        /// Directory path
        path: String,
    },

    /// Print a file's content at HEAD
    Cat {
        /// Version name
        version: String,
        /// File path
        path: String,
    },

    /// Show when a file was first and last committed
    Dates {
        /// Version name
        version: String,
        /// File path
        path: String,
    },

    /// List paths that would conflict when merging a ref into HEAD
    #[command(after_help = "\
The probe never changes HEAD, the index or the working tree.

EXAMPLES:
    regvcs conflicts 42 origin/master")]
    Conflicts {
        /// Version name
        version: String,
        /// Revision to merge (ref, remote branch or commit)
        target: String,
    },

    /// Undo the last commit's change to a file and push the amended change
    Rollback {
        /// Version name
        version: String,
        /// File path
        path: String,
    },

    /// Commit a file on top of the stable branch and submit it directly
    #[command(after_help = "\
EXAMPLES:
    # Publish settings straight to the stable branch
    regvcs submit master settings.yaml --from ./settings.yaml")]
    Submit {
        /// Version name whose working copy is used
        version: String,
        /// Repository path to write
        path: String,
        /// Local file with the new content
        #[arg(long, value_name = "FILE")]
        from: PathBuf,
    },

    /// Remove a version's working copy
    Delete {
        /// Version name
        version: String,
    },

    /// Report whether a version's working copy exists
    Exists {
        /// Version name
        version: String,
    },

    /// Generate shell completion scripts
    #[command(after_help = "\
EXAMPLES:
    # Bash
    regvcs completion bash > ~/.local/share/bash-completion/completions/regvcs

    # Zsh
    regvcs completion zsh > ~/.zfunc/_regvcs

    # Fish
    regvcs completion fish > ~/.config/fish/completions/regvcs.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Shell types for completion generation.
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["regvcs", "ls", "42", "forms", "--json", "--root", "/r"])
            .unwrap();
        assert!(cli.json);
        assert_eq!(cli.root, Some(PathBuf::from("/r")));
        assert!(matches!(cli.command, Command::Ls { .. }));
    }

    #[test]
    fn log_levels() {
        let cli = Cli::try_parse_from(["regvcs", "--debug", "exists", "1"]).unwrap();
        assert_eq!(cli.log_level(), "debug");
        let cli = Cli::try_parse_from(["regvcs", "-q", "exists", "1"]).unwrap();
        assert_eq!(cli.log_level(), "warn");
        let cli = Cli::try_parse_from(["regvcs", "exists", "1"]).unwrap();
        assert_eq!(cli.log_level(), "info");
    }

    #[test]
    fn debug_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["regvcs", "--debug", "-q", "exists", "1"]).is_err());
    }

    #[test]
    fn submit_requires_source() {
        assert!(Cli::try_parse_from(["regvcs", "submit", "master", "a.yaml"]).is_err());
    }
}
