//! Ferry CLI - Command line interface for ferry
//!
//! Migrates GitLab issues and epics into Linear.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{ConfigArgs, InspectArgs, MigrateArgs};

/// Ferry: GitLab to Linear work item migration
#[derive(Parser, Debug)]
#[command(name = "ferry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to ~/.config/ferry/config.toml)
    #[arg(long, global = true, env = "FERRY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Migrate issues or epics into Linear
    #[command(visible_alias = "m")]
    Migrate(MigrateArgs),

    /// Show what a migration would read from an issue
    Inspect(InspectArgs),

    /// Show current configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    let config_path = cli.config.as_deref();

    match cli.command {
        Some(Commands::Version) => {
            println!("ferry {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Migrate(args)) => {
            args.execute(config_path).await?;
        }
        Some(Commands::Inspect(args)) => {
            args.execute(config_path).await?;
        }
        Some(Commands::Config(args)) => {
            args.execute(config_path)?;
        }
        None => {
            println!("Ferry - GitLab to Linear work item migration");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}
