//! OHLCV bars and time-ordered bar series.
//!
//! A [`BarSeries`] is the unit every indicator consumes: one instrument at one
//! interval, strictly increasing timestamps, immutable once built.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SignalError;
use crate::timeframe::Interval;

/// Minimum number of bars before any rolling computation is meaningful.
pub const MIN_WINDOW: usize = 20;

/// A single OHLCV bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Bar {
    /// High minus low.
    #[must_use]
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// Absolute distance between open and close.
    #[must_use]
    pub fn body(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    /// Wick above the body: `high - max(open, close)`.
    #[must_use]
    pub fn upper_wick(&self) -> Decimal {
        self.high - self.open.max(self.close)
    }

    /// Wick below the body: `min(open, close) - low`.
    #[must_use]
    pub fn lower_wick(&self) -> Decimal {
        self.open.min(self.close) - self.low
    }

    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

/// Time-ordered bars for one (instrument, interval) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarSeries {
    symbol: String,
    interval: Interval,
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Builds a series, rejecting duplicate or out-of-order timestamps.
    ///
    /// # Errors
    /// Returns [`SignalError::UnorderedBars`] with the index of the first bar
    /// whose timestamp is not strictly after its predecessor.
    pub fn new(
        symbol: impl Into<String>,
        interval: Interval,
        bars: Vec<Bar>,
    ) -> Result<Self, SignalError> {
        if let Some(index) = bars
            .windows(2)
            .position(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err(SignalError::UnorderedBars { index: index + 1 });
        }

        Ok(Self {
            symbol: symbol.into(),
            interval,
            bars,
        })
    }

    /// An empty series, the normal answer for "provider had no data".
    #[must_use]
    pub fn empty(symbol: impl Into<String>, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            bars: Vec::new(),
        }
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub const fn interval(&self) -> Interval {
        self.interval
    }

    #[must_use]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Fails with [`SignalError::InsufficientData`] unless the series holds at
    /// least `required` bars.
    ///
    /// # Errors
    /// See above.
    pub fn ensure_len(&self, required: usize) -> Result<(), SignalError> {
        if self.bars.len() < required {
            return Err(SignalError::InsufficientData {
                required,
                actual: self.bars.len(),
            });
        }
        Ok(())
    }

    /// Closing prices as `f64`, for the statistical models.
    #[must_use]
    pub fn closes_f64(&self) -> Vec<f64> {
        self.bars
            .iter()
            .map(|b| b.close.to_f64().unwrap_or(f64::NAN))
            .collect()
    }

    /// Keeps only the most recent `n` bars.
    #[must_use]
    pub fn tail(&self, n: usize) -> Self {
        let start = self.bars.len().saturating_sub(n);
        Self {
            symbol: self.symbol.clone(),
            interval: self.interval,
            bars: self.bars[start..].to_vec(),
        }
    }
}
