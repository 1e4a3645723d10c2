use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use csv::{Reader, Writer};
use maestro_core::{Bar, BarSeries, Interval, MarketDataProvider, Period};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One CSV row: `timestamp,open,high,low,close,volume`.
#[derive(Debug, Serialize, Deserialize)]
struct CsvBar {
    timestamp: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::str")]
    open: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    high: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    low: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    close: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    volume: Decimal,
}

impl From<&Bar> for CsvBar {
    fn from(bar: &Bar) -> Self {
        Self {
            timestamp: bar.timestamp,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

impl From<CsvBar> for Bar {
    fn from(row: CsvBar) -> Self {
        Self {
            timestamp: row.timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        }
    }
}

pub struct CsvStorage;

impl CsvStorage {
    /// Writes a bar series to CSV.
    ///
    /// Format: timestamp,open,high,low,close,volume (RFC 3339 timestamps)
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_bars(path: impl AsRef<Path>, series: &BarSeries) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        let mut writer = Writer::from_writer(file);

        for bar in series.bars() {
            writer.serialize(CsvBar::from(bar))?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Reads bars written by [`CsvStorage::write_bars`].
    ///
    /// Rows are sorted by timestamp before the series is built, so files
    /// appended out of order still load.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened, a row does not parse, or
    /// two rows share a timestamp.
    pub fn read_bars(path: impl AsRef<Path>, symbol: &str, interval: Interval) -> Result<BarSeries> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
        let mut reader = Reader::from_reader(file);

        let mut bars = reader
            .deserialize::<CsvBar>()
            .enumerate()
            .map(|(i, row)| {
                row.map(Bar::from)
                    .with_context(|| format!("Bad row {} in {}", i + 1, path.display()))
            })
            .collect::<Result<Vec<_>>>()?;
        bars.sort_by_key(|b| b.timestamp);

        BarSeries::new(symbol, interval, bars)
            .with_context(|| format!("Invalid bar series in {}", path.display()))
    }
}

/// Serves bars from `{dir}/{symbol}_{interval}.csv` files.
///
/// Useful offline and in tests. A missing file is an empty series, and the
/// requested period is measured back from the newest bar in the file.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn path_for(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.dir.join(format!("{symbol}_{interval}.csv"))
    }
}

#[async_trait]
impl MarketDataProvider for CsvProvider {
    async fn fetch_bars(&self, symbol: &str, interval: Interval, period: Period) -> Result<BarSeries> {
        let path = self.path_for(symbol, interval);
        let owned_symbol = symbol.to_string();

        let series = tokio::task::spawn_blocking(move || {
            match CsvStorage::read_bars(&path, &owned_symbol, interval) {
                Ok(series) => Ok(series),
                Err(e)
                    if e.downcast_ref::<std::io::Error>()
                        .is_some_and(|io| io.kind() == ErrorKind::NotFound) =>
                {
                    debug!(path = %path.display(), "no CSV file, returning empty series");
                    Ok(BarSeries::empty(owned_symbol, interval))
                }
                Err(e) => Err(e),
            }
        })
        .await
        .context("CSV read task panicked")??;

        let Some(last) = series.last() else {
            return Ok(series);
        };
        let cutoff = last.timestamp - period.approx_duration();
        let bars: Vec<Bar> = series
            .bars()
            .iter()
            .filter(|b| b.timestamp > cutoff)
            .cloned()
            .collect();

        Ok(BarSeries::new(symbol, interval, bars)?)
    }

    fn name(&self) -> &str {
        "csv"
    }
}
