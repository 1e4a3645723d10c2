//! `scan` and `watch`: run the signal pipeline over the configured instruments.

use anyhow::{bail, Result};
use async_trait::async_trait;
use clap::Args;
use maestro_core::config_loader::DEFAULT_CONFIG_DIR;
use maestro_core::{
    AppConfig, BarSeries, ConfigLoader, ConfigWatcher, Interval, LogAlertSink, MarketDataProvider,
    Period, ProviderConfig,
};
use maestro_data::{CsvProvider, YahooChartProvider};
use maestro_signals::{InstrumentReport, Scanner};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::report::ReportFormatter;

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Directory holding Config.toml
    #[arg(long, default_value = DEFAULT_CONFIG_DIR)]
    pub config_dir: PathBuf,

    /// Profile overlay, loaded from Config.{profile}.toml
    #[arg(long)]
    pub profile: Option<String>,

    /// Read bars from {dir}/{symbol}_{interval}.csv instead of Yahoo Finance
    #[arg(long)]
    pub csv_dir: Option<PathBuf>,

    /// Only scan these symbols (repeatable)
    #[arg(long = "symbol")]
    pub symbols: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Seconds between scans
    #[arg(long, default_value_t = 60)]
    pub every_secs: u64,
}

/// Where bars come from for this run.
pub enum DataSource {
    Yahoo(YahooChartProvider),
    Csv(CsvProvider),
}

impl DataSource {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(csv_dir: Option<&Path>, provider: &ProviderConfig) -> Result<Self> {
        match csv_dir {
            Some(dir) => Ok(Self::Csv(CsvProvider::new(dir))),
            None => Ok(Self::Yahoo(YahooChartProvider::new(provider)?)),
        }
    }
}

#[async_trait]
impl MarketDataProvider for DataSource {
    async fn fetch_bars(&self, symbol: &str, interval: Interval, period: Period) -> Result<BarSeries> {
        match self {
            Self::Yahoo(p) => p.fetch_bars(symbol, interval, period).await,
            Self::Csv(p) => p.fetch_bars(symbol, interval, period).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Yahoo(p) => p.name(),
            Self::Csv(p) => p.name(),
        }
    }
}

/// Keeps only the requested instruments. An empty filter keeps all.
///
/// # Errors
/// Returns an error when the filter matches nothing.
pub fn filter_instruments(config: &mut AppConfig, symbols: &[String]) -> Result<()> {
    if symbols.is_empty() {
        return Ok(());
    }
    config
        .instruments
        .retain(|i| symbols.iter().any(|s| s.eq_ignore_ascii_case(&i.symbol)));
    if config.instruments.is_empty() {
        bail!("No configured instrument matches {}", symbols.join(", "));
    }
    Ok(())
}

fn load(args: &ScanArgs) -> Result<AppConfig> {
    let mut config = ConfigLoader::load_from(&args.config_dir, args.profile.as_deref())?;
    filter_instruments(&mut config, &args.symbols)?;
    Ok(config)
}

fn print_reports(reports: &[InstrumentReport]) {
    for report in reports {
        println!("{}", ReportFormatter::format(report));
    }
}

/// Scans once and prints one report per instrument.
///
/// # Errors
/// Returns an error if the configuration cannot be loaded or the provider
/// cannot be built. Per-instrument failures are part of the report.
pub async fn run_scan(args: ScanArgs) -> Result<()> {
    let config = load(&args)?;
    let provider = DataSource::new(args.csv_dir.as_deref(), &config.provider)?;
    let scanner = Scanner::new(provider, Arc::new(LogAlertSink), config);

    let reports = scanner.scan_all().await;
    print_reports(&reports);
    tracing::info!(instruments = reports.len(), "Scan complete");
    Ok(())
}

/// Rescans every `every` until `shutdown` resolves, applying configuration
/// edits from `rx` between scans. Returns the number of completed scans.
///
/// `shutdown` is raced against both the timer and the scan in flight.
pub async fn watch_loop<P: MarketDataProvider>(
    scanner: &mut Scanner<P>,
    rx: &mut watch::Receiver<AppConfig>,
    symbols: &[String],
    every: Duration,
    shutdown: impl Future<Output = ()>,
) -> usize {
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(every);
    let mut scans = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = &mut shutdown => break,
        }

        if rx.has_changed().unwrap_or(false) {
            let mut next = rx.borrow_and_update().clone();
            match filter_instruments(&mut next, symbols) {
                Ok(()) => {
                    scanner.set_config(next);
                    tracing::info!("Applied reloaded configuration");
                }
                Err(e) => tracing::warn!("Ignoring reloaded configuration: {:#}", e),
            }
        }

        tokio::select! {
            reports = scanner.scan_all() => {
                print_reports(&reports);
                scans += 1;
            }
            () = &mut shutdown => break,
        }
    }

    scans
}

/// Rescans on a timer until Ctrl+C, applying configuration edits between scans.
///
/// Provider settings are read once at startup; everything else follows the
/// watched file.
///
/// # Errors
/// Returns an error if the initial configuration cannot be loaded or the
/// provider cannot be built.
pub async fn run_watch(args: WatchArgs) -> Result<()> {
    let config = load(&args.scan)?;
    let provider = DataSource::new(args.scan.csv_dir.as_deref(), &config.provider)?;

    let (watcher, mut rx) = ConfigWatcher::new(
        config.clone(),
        args.scan.config_dir.clone(),
        args.scan.profile.clone(),
    );
    let watch_task = tokio::spawn(async move {
        if let Err(e) = watcher.watch().await {
            tracing::error!("Config watcher stopped: {:#}", e);
        }
    });

    let mut scanner = Scanner::new(provider, Arc::new(LogAlertSink), config);
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Ctrl+C handler failed: {e}");
        }
    };
    let every = Duration::from_secs(args.every_secs.max(1));
    let scans = watch_loop(&mut scanner, &mut rx, &args.scan.symbols, every, ctrl_c).await;
    tracing::info!(scans, "Received Ctrl+C, stopping");

    watch_task.abort();
    Ok(())
}
