//! Per-timeframe indicator bundle.
//!
//! Runs POC, VWAP, absorption and regime over one series. Only a series too
//! short for the rolling windows is an error; individual indicators that have
//! no answer (flat range, zero volume) are left as `None`.

use chrono::{DateTime, Utc};
use maestro_core::{BarSeries, IndicatorConfig, Interval, SignalError, TrendVerdict, MIN_WINDOW};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::absorption::{detect_absorption, AbsorptionReading, AnomalyConfig};
use crate::regime::{RegimeClassifier, RegimeReading};
use crate::volume_profile::point_of_control;
use crate::vwap::latest_vwap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeAnalysis {
    pub symbol: String,
    pub interval: Interval,
    pub last_timestamp: DateTime<Utc>,
    pub last_close: Decimal,
    pub poc: Option<Decimal>,
    pub vwap: Option<Decimal>,
    /// `None` when VWAP is undefined (no traded volume)
    pub verdict: Option<TrendVerdict>,
    pub absorption: Option<AbsorptionReading>,
    pub regime: Option<RegimeReading>,
}

impl TimeframeAnalysis {
    /// Signed offset of the last close from the POC, in percent of the POC.
    /// Negative when price trades below the POC.
    #[must_use]
    pub fn poc_offset_pct(&self) -> Option<Decimal> {
        let poc = self.poc?;
        if poc.is_zero() {
            return None;
        }
        Some((self.last_close - poc) / poc * Decimal::ONE_HUNDRED)
    }

    /// Absolute distance from the last close to the POC, in percent of the POC.
    #[must_use]
    pub fn poc_distance_pct(&self) -> Option<Decimal> {
        self.poc_offset_pct().map(|d| d.abs())
    }

    #[must_use]
    pub fn is_anomaly(&self) -> bool {
        self.absorption.as_ref().is_some_and(|a| a.is_anomaly)
    }
}

/// Computes every indicator for one timeframe.
///
/// # Errors
/// Returns [`SignalError::InsufficientData`] for a series shorter than
/// [`MIN_WINDOW`] or than the configured rolling window.
pub fn analyze_timeframe(
    series: &BarSeries,
    config: &IndicatorConfig,
) -> Result<TimeframeAnalysis, SignalError> {
    series.ensure_len(MIN_WINDOW.max(config.rolling_window))?;
    let last = series
        .last()
        .ok_or_else(|| SignalError::DataUnavailable(format!("{} has no bars", series.symbol())))?;

    let poc = match point_of_control(series, config.poc_bins) {
        Ok(poc) => Some(poc),
        Err(e) => {
            debug!(symbol = series.symbol(), interval = %series.interval(), error = %e, "POC skipped");
            None
        }
    };

    let vwap = latest_vwap(series.bars());
    let verdict = vwap.map(|v| TrendVerdict::from_close_vs_vwap(last.close, v));

    let absorption = match detect_absorption(series, &AnomalyConfig::from(config)) {
        Ok(reading) => Some(reading),
        Err(e) => {
            debug!(symbol = series.symbol(), interval = %series.interval(), error = %e, "absorption skipped");
            None
        }
    };

    let regime = match RegimeClassifier::from(&config.regime).classify(series) {
        Ok(reading) => Some(reading),
        Err(e) => {
            debug!(symbol = series.symbol(), interval = %series.interval(), error = %e, "regime skipped");
            None
        }
    };

    Ok(TimeframeAnalysis {
        symbol: series.symbol().to_string(),
        interval: series.interval(),
        last_timestamp: last.timestamp,
        last_close: last.close,
        poc,
        vwap,
        verdict,
        absorption,
        regime,
    })
}
