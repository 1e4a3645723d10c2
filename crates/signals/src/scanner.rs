//! Instrument scanner: fetch, analyse, vote, forecast, alert.
//!
//! Instruments and timeframes are processed one after another. A failure is
//! recorded in the report of the timeframe or forecast it belongs to and the
//! scan moves on; nothing short of a panic aborts a run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use maestro_core::{
    AlertSink, AppConfig, BarSeries, ConsensusVerdict, InstrumentConfig, Interval,
    MarketDataProvider, Period, SignalError, TimeframeConfig,
};
use tokio::sync::RwLock;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::alert::{dispatch, AlertGate};
use crate::analysis::{analyze_timeframe, TimeframeAnalysis};
use crate::consensus::aggregate_partial;
use crate::forecast::ForecastBundle;

#[derive(Debug, Clone, PartialEq)]
pub struct TimeframeReport {
    pub interval: Interval,
    pub period: Period,
    pub analysis: Result<TimeframeAnalysis, SignalError>,
}

impl TimeframeReport {
    #[must_use]
    pub fn analysis(&self) -> Option<&TimeframeAnalysis> {
        self.analysis.as_ref().ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentReport {
    pub symbol: String,
    pub label: String,
    pub timeframes: Vec<TimeframeReport>,
    pub consensus: ConsensusVerdict,
    pub forecast: ForecastBundle,
    /// An absorption alert was sent for the shortest timeframe
    pub alerted: bool,
}

#[derive(Debug, Clone)]
struct CachedForecast {
    computed_at: Instant,
    bundle: ForecastBundle,
}

/// Runs the signal pipeline for every configured instrument.
pub struct Scanner<P> {
    provider: P,
    sink: Arc<dyn AlertSink>,
    config: AppConfig,
    forecasts: RwLock<HashMap<String, CachedForecast>>,
}

impl<P: MarketDataProvider> Scanner<P> {
    pub fn new(provider: P, sink: Arc<dyn AlertSink>, config: AppConfig) -> Self {
        Self {
            provider,
            sink,
            config,
            forecasts: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Swaps in a new configuration and drops cached forecasts.
    pub fn set_config(&mut self, config: AppConfig) {
        self.config = config;
        self.forecasts.get_mut().clear();
    }

    /// Scans every configured instrument in order.
    pub async fn scan_all(&self) -> Vec<InstrumentReport> {
        let mut reports = Vec::with_capacity(self.config.instruments.len());
        for instrument in &self.config.instruments {
            reports.push(self.scan_instrument(instrument).await);
        }
        reports
    }

    /// Scans one instrument across all configured timeframes.
    pub async fn scan_instrument(&self, instrument: &InstrumentConfig) -> InstrumentReport {
        info!(symbol = %instrument.symbol, provider = self.provider.name(), "scanning");

        let mut timeframes = Vec::with_capacity(self.config.timeframes.len());
        for tf in &self.config.timeframes {
            timeframes.push(self.scan_timeframe(&instrument.symbol, *tf).await);
        }

        let verdicts: Vec<_> = timeframes
            .iter()
            .map(|r| r.analysis().and_then(|a| a.verdict))
            .collect();
        let consensus = aggregate_partial(&verdicts, self.config.timeframes.len());

        let alerted = self.alert(&instrument.label, &timeframes).await;
        let forecast = self.forecast(&instrument.symbol).await;

        info!(symbol = %instrument.symbol, %consensus, alerted, "scan complete");

        InstrumentReport {
            symbol: instrument.symbol.clone(),
            label: instrument.label.clone(),
            timeframes,
            consensus,
            forecast,
            alerted,
        }
    }

    async fn scan_timeframe(&self, symbol: &str, tf: TimeframeConfig) -> TimeframeReport {
        let analysis = match self.fetch(symbol, tf.interval, tf.period).await {
            Ok(series) => analyze_timeframe(&series, &self.config.indicators),
            Err(e) => Err(e),
        };
        if let Err(e) = &analysis {
            warn!(symbol, interval = %tf.interval, error = %e, "timeframe unavailable");
        }
        TimeframeReport {
            interval: tf.interval,
            period: tf.period,
            analysis,
        }
    }

    async fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        period: Period,
    ) -> Result<BarSeries, SignalError> {
        let limit = Duration::from_secs(self.config.provider.timeout_secs);
        match timeout(limit, self.provider.fetch_bars(symbol, interval, period)).await {
            Err(_) => Err(SignalError::Timeout(format!(
                "fetching {symbol} {interval}/{period} exceeded {}s",
                limit.as_secs()
            ))),
            Ok(Err(e)) => Err(SignalError::DataUnavailable(format!("{e:#}"))),
            Ok(Ok(series)) if series.is_empty() => Err(SignalError::DataUnavailable(format!(
                "no bars for {symbol} {interval}/{period}"
            ))),
            Ok(Ok(series)) => Ok(series),
        }
    }

    async fn alert(&self, label: &str, timeframes: &[TimeframeReport]) -> bool {
        let Some(shortest) = self.config.shortest_timeframe() else {
            return false;
        };
        let Some(analysis) = timeframes
            .iter()
            .find(|r| r.interval == shortest.interval)
            .and_then(TimeframeReport::analysis)
        else {
            return false;
        };
        let gate = AlertGate::from(&self.config.alerts);
        dispatch(&gate, self.sink.as_ref(), label, analysis).await
    }

    async fn forecast(&self, symbol: &str) -> ForecastBundle {
        let ttl = Duration::from_secs(self.config.cache.forecast_ttl_secs);
        if let Some(cached) = self.forecasts.read().await.get(symbol) {
            if cached.computed_at.elapsed() < ttl {
                debug!(symbol, "forecast served from cache");
                return cached.bundle.clone();
            }
        }

        let fc = &self.config.forecast;
        let series = match self.fetch(symbol, fc.interval, fc.period).await {
            Ok(series) => series,
            Err(e) => {
                warn!(symbol, error = %e, "forecast series unavailable");
                return ForecastBundle::unavailable(&e.to_string());
            }
        };
        let bundle = if series.len() <= fc.min_series_len {
            let reason = SignalError::InsufficientData {
                required: fc.min_series_len + 1,
                actual: series.len(),
            };
            debug!(symbol, error = %reason, "forecasts skipped");
            ForecastBundle::unavailable(&reason.to_string())
        } else {
            let config = fc.clone();
            let limit = Duration::from_millis(fc.fit_timeout_ms);
            let fit =
                tokio::task::spawn_blocking(move || ForecastBundle::compute(&series, &config));
            match timeout(limit, fit).await {
                Ok(Ok(bundle)) => bundle,
                Ok(Err(e)) => {
                    warn!(symbol, error = %e, "forecast task failed");
                    return ForecastBundle::unavailable(&format!("forecast task failed: {e}"));
                }
                Err(_) => {
                    warn!(symbol, timeout_ms = fc.fit_timeout_ms, "forecast fit timed out");
                    return ForecastBundle::unavailable(
                        &SignalError::Timeout(format!(
                            "model fit exceeded {}ms",
                            fc.fit_timeout_ms
                        ))
                        .to_string(),
                    );
                }
            }
        };

        self.forecasts.write().await.insert(
            symbol.to_string(),
            CachedForecast {
                computed_at: Instant::now(),
                bundle: bundle.clone(),
            },
        );
        bundle
    }
}
