//! Gatewall - bot-filter rule deployer for shared WordPress hosting.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use gatewall::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Install { verify_target } => {
            gatewall::commands::install::run(verify_target, &cli.config).await
        }
        Commands::Update { dry_run } => gatewall::commands::update::run(dry_run, &cli.config).await,
        Commands::Uninstall { yes } => gatewall::commands::uninstall::run(yes, &cli.config).await,
        Commands::Verify { target, origin, verbose_probes } => {
            gatewall::commands::verify::run(&target, origin, verbose_probes, &cli.config).await
        }
        Commands::Validate { rules } => gatewall::commands::validate::run(rules, &cli.config).await,
        Commands::Status => gatewall::commands::status::run(&cli.config).await,
        Commands::Version => {
            println!("gatewall {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
