//! Relative volume and range anomaly ("absorption") detection.
//!
//! A bar trading far more volume than usual without a proportional range is a
//! sign that someone is absorbing order flow. The detector evaluates the
//! latest bar against rolling means that include it.

use maestro_core::{AnomalyPolicy, Bar, BarSeries, IndicatorConfig, SignalError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::stats::{decimal_mean, rolling_mean, to_f64};

/// Configuration for absorption detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyConfig {
    /// Rolling window in bars
    pub window: usize,
    /// Relative volume must exceed this (observed 1.7 - 2.0)
    pub rvol_threshold: f64,
    /// Which range predicates qualify the volume spike
    pub policy: AnomalyPolicy,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            window: 20,
            rvol_threshold: 2.0,
            policy: AnomalyPolicy::Compression,
        }
    }
}

impl From<&IndicatorConfig> for AnomalyConfig {
    fn from(config: &IndicatorConfig) -> Self {
        Self {
            window: config.rolling_window,
            rvol_threshold: config.rvol_threshold,
            policy: config.anomaly_policy,
        }
    }
}

impl AnomalyConfig {
    /// # Errors
    /// Returns [`SignalError::InvalidConfig`] for a window below 2 or a
    /// threshold below 1.
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.window < 2 {
            return Err(SignalError::InvalidConfig(
                "anomaly window must be at least 2".into(),
            ));
        }
        if !self.rvol_threshold.is_finite() || self.rvol_threshold < 1.0 {
            return Err(SignalError::InvalidConfig(format!(
                "rvol threshold must be >= 1.0, got {}",
                self.rvol_threshold
            )));
        }
        Ok(())
    }
}

/// Side of a dominant rejection wick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WickSide {
    /// Long upper wick: sellers rejected higher prices
    Upper,
    /// Long lower wick: buyers rejected lower prices
    Lower,
}

/// Evaluation of the latest bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsorptionReading {
    /// Latest volume over its rolling mean; `None` when the mean is zero
    pub relative_volume: Option<f64>,
    pub range: Decimal,
    pub mean_range: Decimal,
    /// Range below its rolling mean
    pub compression: bool,
    /// Dominant wick longer than the body, if any
    pub wick_rejection: Option<WickSide>,
    /// Final flag under the configured policy
    pub is_anomaly: bool,
}

/// Volume divided by its rolling mean, per bar.
#[must_use]
pub fn relative_volume(bars: &[Bar], window: usize) -> Vec<Option<f64>> {
    let volumes: Vec<f64> = bars.iter().map(|b| to_f64(b.volume)).collect();
    rolling_mean(&volumes, window)
        .into_iter()
        .zip(volumes.iter())
        .map(|(avg, vol)| match avg {
            Some(avg) if avg > 0.0 => Some(vol / avg),
            _ => None,
        })
        .collect()
}

/// Returns the side whose wick exceeds the candle body.
#[must_use]
pub fn wick_rejection(bar: &Bar) -> Option<WickSide> {
    let upper = bar.upper_wick();
    let lower = bar.lower_wick();
    let body = bar.body();

    if upper >= lower {
        (upper > body).then_some(WickSide::Upper)
    } else {
        (lower > body).then_some(WickSide::Lower)
    }
}

/// Evaluates the latest bar for absorption.
///
/// # Errors
/// * [`SignalError::InvalidConfig`] for invalid parameters.
/// * [`SignalError::InsufficientData`] when the series is shorter than the window.
pub fn detect_absorption(
    series: &BarSeries,
    config: &AnomalyConfig,
) -> Result<AbsorptionReading, SignalError> {
    config.validate()?;
    series.ensure_len(config.window)?;

    let bars = series.bars();
    let window = &bars[bars.len() - config.window..];
    let Some(last) = window.last() else {
        return Err(SignalError::InsufficientData {
            required: config.window,
            actual: 0,
        });
    };

    let relative_volume = relative_volume(window, config.window)
        .last()
        .copied()
        .flatten();

    let ranges: Vec<Decimal> = window.iter().map(Bar::range).collect();
    let range = last.range();
    let mean_range = decimal_mean(&ranges).unwrap_or(range);
    let compression = range < mean_range;
    let wick = wick_rejection(last);

    let volume_spike = relative_volume.is_some_and(|rv| rv > config.rvol_threshold);
    let shape = match config.policy {
        AnomalyPolicy::Compression => compression,
        AnomalyPolicy::WickRejection => wick.is_some(),
        AnomalyPolicy::Either => compression || wick.is_some(),
        AnomalyPolicy::Both => compression && wick.is_some(),
    };

    Ok(AbsorptionReading {
        relative_volume,
        range,
        mean_range,
        compression,
        wick_rejection: wick,
        is_anomaly: volume_spike && shape,
    })
}
