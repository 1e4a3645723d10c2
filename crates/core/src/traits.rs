use crate::bar::BarSeries;
use crate::timeframe::{Interval, Period};
use anyhow::Result;
use async_trait::async_trait;

/// Source of OHLCV bars.
///
/// An empty series is a valid answer; callers decide whether it is enough.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_bars(&self, symbol: &str, interval: Interval, period: Period)
        -> Result<BarSeries>;

    fn name(&self) -> &str;
}

/// Fire-and-forget destination for alert messages.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
}

/// Alert sink that writes messages to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn send(&self, message: &str) -> Result<()> {
        tracing::warn!(target: "maestro::alert", "{message}");
        Ok(())
    }
}
