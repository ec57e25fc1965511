//! regvcs - administrative entry point

use registry_vcs::cli::{self, Cli};
use registry_vcs::ui::output;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse_args();

    // RUST_LOG wins over the verbosity flags when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = cli::run(cli) {
        output::error(format!("{:#}", err));
        std::process::exit(1);
    }
}
