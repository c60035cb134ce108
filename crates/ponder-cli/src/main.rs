//! ponder CLI - drive the background search offload from the command line.

mod commands;
mod demo;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ponder")]
#[command(author, version, about = "Background search offload driver", long_about = None)]
struct Cli {
    /// Log filter (overrides RUST_LOG), e.g. "debug" or "ponder_offload=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulated frame loop against a background worker
    Run(commands::run::RunArgs),

    /// List the sound bank
    Sounds(commands::sounds::SoundsArgs),

    /// Show the effective configuration
    Config(commands::config::ConfigArgs),

    /// List audio output devices
    Devices(commands::devices::DevicesArgs),
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    tracing_log::LogTracer::init().ok();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Sounds(args) => commands::sounds::run(args),
        Commands::Config(args) => commands::config::run(args),
        Commands::Devices(args) => commands::devices::run(args),
    }
}
