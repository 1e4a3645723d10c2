use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SignalError;
use crate::position_sizing::ContractSpec;
use crate::timeframe::{Interval, Period};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub instruments: Vec<InstrumentConfig>,
    pub timeframes: Vec<TimeframeConfig>,
    pub indicators: IndicatorConfig,
    pub forecast: ForecastConfig,
    pub risk: RiskConfig,
    pub provider: ProviderConfig,
    pub alerts: AlertConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub symbol: String,
    pub label: String,
    /// Pip conversion for lot sizing; falls back to `risk.default_contract`.
    #[serde(default)]
    pub contract: Option<ContractSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeframeConfig {
    pub interval: Interval,
    pub period: Period,
}

/// How the absorption detector combines its range predicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyPolicy {
    /// Range below its rolling mean.
    #[default]
    Compression,
    /// Rejection wick longer than the body.
    WickRejection,
    /// Either predicate.
    Either,
    /// Both predicates.
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub poc_bins: usize,
    pub rolling_window: usize,
    pub rvol_threshold: f64,
    pub anomaly_policy: AnomalyPolicy,
    pub regime: RegimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    pub vol_window: usize,
    pub clusters: usize,
    pub seed: u64,
}

/// `(p, d, q)` order of the autoregressive-integrated price model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    #[must_use]
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl std::fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

/// Fixed order, or lowest-AIC search over `p <= max_p`, `q <= max_q`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "selection", rename_all = "snake_case")]
pub enum OrderSelection {
    Fixed { p: usize, d: usize, q: usize },
    Auto { max_p: usize, d: usize, max_q: usize },
}

impl Default for OrderSelection {
    fn default() -> Self {
        Self::Fixed { p: 2, d: 1, q: 2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub interval: Interval,
    pub period: Period,
    pub horizon: usize,
    pub arima: OrderSelection,
    pub min_price_obs: usize,
    pub min_return_obs: usize,
    /// Forecasts are skipped when the forecast series has this many bars or fewer.
    pub min_series_len: usize,
    /// Upper bound on one instrument's model fits, in milliseconds.
    pub fit_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub account_balance: Decimal,
    /// Percent of balance risked per trade (1.0 = 1%).
    pub risk_pct: Decimal,
    pub default_contract: Option<ContractSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub rate_limit_per_second: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub enabled: bool,
    /// Only alert when the close is within this percent of the POC.
    pub poc_proximity_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub forecast_ttl_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            instruments: vec![
                InstrumentConfig {
                    symbol: "GC=F".to_string(),
                    label: "Gold".to_string(),
                    contract: None,
                },
                InstrumentConfig {
                    symbol: "USDJPY=X".to_string(),
                    label: "USD/JPY".to_string(),
                    contract: None,
                },
                InstrumentConfig {
                    symbol: "BTC-USD".to_string(),
                    label: "Bitcoin".to_string(),
                    contract: None,
                },
            ],
            timeframes: vec![
                TimeframeConfig {
                    interval: Interval::FiveMinutes,
                    period: Period::days(2),
                },
                TimeframeConfig {
                    interval: Interval::FifteenMinutes,
                    period: Period::days(5),
                },
                TimeframeConfig {
                    interval: Interval::OneHour,
                    period: Period::days(30),
                },
            ],
            indicators: IndicatorConfig::default(),
            forecast: ForecastConfig::default(),
            risk: RiskConfig::default(),
            provider: ProviderConfig::default(),
            alerts: AlertConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            poc_bins: 20,
            rolling_window: 20,
            rvol_threshold: 2.0,
            anomaly_policy: AnomalyPolicy::Compression,
            regime: RegimeConfig::default(),
        }
    }
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            vol_window: 10,
            clusters: 3,
            seed: 42,
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            interval: Interval::OneHour,
            period: Period::days(60),
            horizon: 5,
            arima: OrderSelection::default(),
            min_price_obs: 30,
            min_return_obs: 50,
            min_series_len: 50,
            fit_timeout_ms: 20_000,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            account_balance: Decimal::new(10_000, 0),
            risk_pct: Decimal::ONE,
            default_contract: None,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 15,
            rate_limit_per_second: 2,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poc_proximity_pct: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            forecast_ttl_secs: 300,
        }
    }
}

impl AppConfig {
    /// Checks every tunable against its valid range.
    ///
    /// # Errors
    /// Returns [`SignalError::InvalidConfig`] naming the first offending key.
    pub fn validate(&self) -> Result<(), SignalError> {
        fn invalid(msg: impl Into<String>) -> Result<(), SignalError> {
            Err(SignalError::InvalidConfig(msg.into()))
        }

        if self.instruments.is_empty() {
            return invalid("instruments must not be empty");
        }
        if self.timeframes.is_empty() {
            return invalid("timeframes must not be empty");
        }

        let ind = &self.indicators;
        if ind.poc_bins == 0 {
            return invalid("indicators.poc_bins must be at least 1");
        }
        if ind.rolling_window < 2 {
            return invalid("indicators.rolling_window must be at least 2");
        }
        if !ind.rvol_threshold.is_finite() || ind.rvol_threshold < 1.0 {
            return invalid("indicators.rvol_threshold must be a finite value >= 1.0");
        }
        if ind.regime.vol_window < 2 {
            return invalid("indicators.regime.vol_window must be at least 2");
        }
        if !(2..=3).contains(&ind.regime.clusters) {
            return invalid("indicators.regime.clusters must be 2 or 3");
        }

        let fc = &self.forecast;
        if fc.horizon == 0 {
            return invalid("forecast.horizon must be at least 1");
        }
        let (max_p, d, max_q) = match fc.arima {
            OrderSelection::Fixed { p, d, q } => (p, d, q),
            OrderSelection::Auto { max_p, d, max_q } => (max_p, d, max_q),
        };
        if max_p > 5 || max_q > 5 || d > 2 {
            return invalid("forecast.arima: p and q must be <= 5, d must be <= 2");
        }
        if fc.min_price_obs < 10 || fc.min_return_obs < 10 {
            return invalid("forecast.min_price_obs and min_return_obs must be at least 10");
        }
        if fc.fit_timeout_ms == 0 || self.provider.timeout_secs == 0 {
            return invalid("timeouts must be positive");
        }

        if self.risk.risk_pct <= Decimal::ZERO || self.risk.risk_pct > Decimal::ONE_HUNDRED {
            return invalid("risk.risk_pct must be in (0, 100]");
        }
        if self.risk.account_balance < Decimal::ZERO {
            return invalid("risk.account_balance must not be negative");
        }

        if self.provider.rate_limit_per_second == 0 {
            return invalid("provider.rate_limit_per_second must be positive");
        }

        if let Some(pct) = self.alerts.poc_proximity_pct {
            if !pct.is_finite() || pct < 0.0 {
                return invalid("alerts.poc_proximity_pct must be a non-negative number");
            }
        }

        Ok(())
    }

    /// Timeframes ordered shortest first; the first entry drives alerts.
    #[must_use]
    pub fn shortest_timeframe(&self) -> Option<TimeframeConfig> {
        self.timeframes.iter().min_by_key(|tf| tf.interval).copied()
    }
}
