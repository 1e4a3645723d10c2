//! Volatility regime classification.
//!
//! The binary state compares the latest rolling volatility of returns with
//! its sample mean. K-means over `(volatility, return)` points is reported
//! alongside for display and does not drive the state.

use maestro_core::{BarSeries, RegimeConfig, SignalError, MIN_WINDOW};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::kmeans::kmeans;
use crate::stats::{mean, pct_change, rolling_std};

/// Market state derived from volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketRegime {
    /// Volatility above its average
    Trending,
    /// Volatility at or below its average
    Ranging,
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trending => f.write_str("TRENDING"),
            Self::Ranging => f.write_str("RANGING"),
        }
    }
}

/// K-means summary over the volatility/return plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeClusters {
    /// `[volatility, return]` per cluster
    pub centroids: Vec<[f64; 2]>,
    pub labels: Vec<usize>,
    /// Cluster of the most recent observation
    pub latest_cluster: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeReading {
    pub regime: MarketRegime,
    pub latest_volatility: f64,
    pub mean_volatility: f64,
    pub clustering: Option<RegimeClusters>,
}

/// Classifies the volatility regime of a bar series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegimeClassifier {
    vol_window: usize,
    clusters: usize,
    seed: u64,
}

impl Default for RegimeClassifier {
    fn default() -> Self {
        Self::from(&RegimeConfig::default())
    }
}

impl From<&RegimeConfig> for RegimeClassifier {
    fn from(config: &RegimeConfig) -> Self {
        Self {
            vol_window: config.vol_window,
            clusters: config.clusters,
            seed: config.seed,
        }
    }
}

impl RegimeClassifier {
    #[must_use]
    pub const fn new(vol_window: usize, clusters: usize, seed: u64) -> Self {
        Self {
            vol_window,
            clusters,
            seed,
        }
    }

    /// Classifies the latest state of `series`.
    ///
    /// # Errors
    /// * [`SignalError::InvalidConfig`] when the volatility window is below 2.
    /// * [`SignalError::InsufficientData`] when the series is shorter than
    ///   [`MIN_WINDOW`] or than the volatility window plus one.
    /// * [`SignalError::Degenerate`] when no finite volatility can be computed.
    pub fn classify(&self, series: &BarSeries) -> Result<RegimeReading, SignalError> {
        if self.vol_window < 2 {
            return Err(SignalError::InvalidConfig(
                "volatility window must be at least 2".into(),
            ));
        }
        series.ensure_len(MIN_WINDOW.max(self.vol_window + 1))?;

        // missing returns become NaN so any window touching them is dropped
        let returns: Vec<f64> = pct_change(&series.closes_f64())
            .into_iter()
            .map(|r| r.unwrap_or(f64::NAN))
            .collect();
        let points: Vec<[f64; 2]> = rolling_std(&returns, self.vol_window)
            .into_iter()
            .zip(returns.iter())
            .filter_map(|(vol, ret)| match vol {
                Some(v) if v.is_finite() && ret.is_finite() => Some([v, *ret]),
                _ => None,
            })
            .collect();

        let vols: Vec<f64> = points.iter().map(|p| p[0]).collect();
        let (Some(latest_volatility), Some(mean_volatility)) = (vols.last().copied(), mean(&vols))
        else {
            return Err(SignalError::Degenerate(
                "no finite rolling volatility".into(),
            ));
        };

        let regime = if latest_volatility > mean_volatility {
            MarketRegime::Trending
        } else {
            MarketRegime::Ranging
        };

        let clustering = match kmeans(&points, self.clusters, self.seed) {
            Ok(fit) => fit.labels.last().copied().map(|latest_cluster| RegimeClusters {
                centroids: fit.centroids,
                labels: fit.labels,
                latest_cluster,
            }),
            Err(e) => {
                debug!(symbol = series.symbol(), error = %e, "regime clustering skipped");
                None
            }
        };

        Ok(RegimeReading {
            regime,
            latest_volatility,
            mean_volatility,
            clustering,
        })
    }
}
