use clap::{Parser, Subcommand};

mod commands;
mod report;

use commands::{ScanArgs, SizeArgs, WatchArgs};

#[derive(Parser)]
#[command(name = "maestro")]
#[command(
    about = "Multi-timeframe signal scanner: volume profile, VWAP, absorption and forecasts",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan every configured instrument once and print the report
    Scan(ScanArgs),
    /// Rescan on a fixed interval, picking up configuration edits
    Watch(WatchArgs),
    /// Suggest a position size for a stop distance
    Size(SizeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Reports go to stdout, logs to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scan(args) => commands::run_scan(args).await?,
        Commands::Watch(args) => commands::run_watch(args).await?,
        Commands::Size(args) => commands::run_size(args)?,
    }

    Ok(())
}
