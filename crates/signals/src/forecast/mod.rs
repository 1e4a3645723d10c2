//! Short-horizon price and volatility forecasts.
//!
//! Both entry points refit their model on every call and never fail: any
//! problem (short series, flat prices, optimiser trouble) is reported as
//! [`Forecast::Unavailable`]. Caching is the scanner's concern.

pub mod arima;
pub mod garch;
pub mod optimizer;

pub use arima::ArimaModel;
pub use garch::GarchModel;
pub use optimizer::{Minimum, NelderMead};

use maestro_core::{ArimaOrder, BarSeries, Direction, ForecastConfig, OrderSelection, SignalError};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::stats::{pct_change, sample_std, sample_variance};

/// A model output, or the reason there is none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Forecast<T> {
    Ready(T),
    Unavailable { reason: String },
}

impl<T> Forecast<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn as_ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Unavailable { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

impl<T> From<Result<T, SignalError>> for Forecast<T> {
    fn from(result: Result<T, SignalError>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(e) => Self::unavailable(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceForecast {
    pub last_close: Decimal,
    /// Final point of the forecast path
    pub forecast_price: Decimal,
    pub path: Vec<Decimal>,
    pub direction: Direction,
    /// Percent change from `last_close` to `forecast_price`; `None` for a zero last close
    pub change_pct: Option<f64>,
    /// Order actually fitted (differs from the configured one under auto selection)
    pub order: ArimaOrder,
}

/// Predicted volatility relative to the historical sample deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolatilityLevel {
    /// More than 1.5x historical
    VeryHigh,
    /// Above historical
    High,
    /// Above half of historical
    Normal,
    Low,
}

impl VolatilityLevel {
    #[must_use]
    pub fn classify(predicted: f64, historical: f64) -> Self {
        if predicted > historical * 1.5 {
            Self::VeryHigh
        } else if predicted > historical {
            Self::High
        } else if predicted > historical * 0.5 {
            Self::Normal
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for VolatilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VeryHigh => f.write_str("VERY HIGH"),
            Self::High => f.write_str("HIGH"),
            Self::Normal => f.write_str("NORMAL"),
            Self::Low => f.write_str("LOW"),
        }
    }
}

/// Whether forecast variance exceeds the historical variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskRead {
    Elevated,
    Stable,
}

impl fmt::Display for RiskRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elevated => f.write_str("ELEVATED"),
            Self::Stable => f.write_str("STABLE"),
        }
    }
}

/// Volatility figures are in percent per bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityForecast {
    pub predicted_volatility: f64,
    pub historical_volatility: f64,
    pub level: VolatilityLevel,
    pub risk: RiskRead,
    pub persistence: f64,
}

fn price_forecast(series: &BarSeries, config: &ForecastConfig) -> Result<PriceForecast, SignalError> {
    if config.horizon == 0 {
        return Err(SignalError::InvalidConfig("forecast horizon must be at least 1".into()));
    }
    series.ensure_len(config.min_price_obs)?;

    let closes = series.closes_f64();
    let model = match config.arima {
        OrderSelection::Fixed { p, d, q } => ArimaModel::fit(&closes, ArimaOrder::new(p, d, q))?,
        OrderSelection::Auto { max_p, d, max_q } => ArimaModel::fit_auto(&closes, max_p, d, max_q)?,
    };

    let path = model.forecast(config.horizon);
    if path.iter().any(|v| !v.is_finite()) {
        return Err(SignalError::ModelFit("non-finite price forecast".into()));
    }

    let last = closes[closes.len() - 1];
    let final_price = path[path.len() - 1];
    let last_close = series
        .last()
        .map(|b| b.close)
        .ok_or_else(|| SignalError::DataUnavailable("empty series".into()))?;
    let to_decimal = |v: f64| {
        Decimal::from_f64(v)
            .ok_or_else(|| SignalError::ModelFit(format!("forecast {v} not representable")))
    };
    let path: Vec<Decimal> = path.iter().map(|v| to_decimal(*v)).collect::<Result<_, _>>()?;

    Ok(PriceForecast {
        last_close,
        forecast_price: to_decimal(final_price)?,
        path,
        direction: Direction::of_change(last, final_price),
        change_pct: (last != 0.0).then(|| (final_price - last) / last * 100.0),
        order: model.order(),
    })
}

/// Fits the configured ARIMA model on closing prices and forecasts
/// `config.horizon` steps ahead.
#[must_use]
pub fn forecast_price(series: &BarSeries, config: &ForecastConfig) -> Forecast<PriceForecast> {
    let result = price_forecast(series, config);
    if let Err(e) = &result {
        debug!(symbol = series.symbol(), error = %e, "price forecast unavailable");
    }
    result.into()
}

/// Percent returns with the undefined ones dropped.
#[must_use]
pub fn percent_returns(series: &BarSeries) -> Vec<f64> {
    pct_change(&series.closes_f64())
        .into_iter()
        .flatten()
        .map(|r| r * 100.0)
        .filter(|r| r.is_finite())
        .collect()
}

fn volatility_forecast(
    series: &BarSeries,
    config: &ForecastConfig,
) -> Result<VolatilityForecast, SignalError> {
    if config.horizon == 0 {
        return Err(SignalError::InvalidConfig("forecast horizon must be at least 1".into()));
    }
    let returns = percent_returns(series);
    if returns.len() < config.min_return_obs {
        return Err(SignalError::InsufficientData {
            required: config.min_return_obs,
            actual: returns.len(),
        });
    }

    let model = GarchModel::fit(&returns)?;
    let variance = model
        .forecast_variance(config.horizon)
        .last()
        .copied()
        .ok_or_else(|| SignalError::ModelFit("empty variance forecast".into()))?;

    let historical = sample_std(&returns).unwrap_or(0.0);
    let historical_variance = sample_variance(&returns).unwrap_or(0.0);
    let predicted = variance.sqrt();

    Ok(VolatilityForecast {
        predicted_volatility: predicted,
        historical_volatility: historical,
        level: VolatilityLevel::classify(predicted, historical),
        risk: if variance > historical_variance {
            RiskRead::Elevated
        } else {
            RiskRead::Stable
        },
        persistence: model.persistence(),
    })
}

/// Fits GARCH(1,1) on percent returns and forecasts volatility
/// `config.horizon` steps ahead.
#[must_use]
pub fn forecast_volatility(
    series: &BarSeries,
    config: &ForecastConfig,
) -> Forecast<VolatilityForecast> {
    let result = volatility_forecast(series, config);
    if let Err(e) = &result {
        debug!(symbol = series.symbol(), error = %e, "volatility forecast unavailable");
    }
    result.into()
}

/// Both forecasts for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBundle {
    pub price: Forecast<PriceForecast>,
    pub volatility: Forecast<VolatilityForecast>,
}

impl ForecastBundle {
    #[must_use]
    pub fn compute(series: &BarSeries, config: &ForecastConfig) -> Self {
        Self {
            price: forecast_price(series, config),
            volatility: forecast_volatility(series, config),
        }
    }

    #[must_use]
    pub fn unavailable(reason: &str) -> Self {
        Self {
            price: Forecast::unavailable(reason),
            volatility: Forecast::unavailable(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use maestro_core::{Bar, Interval};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn series(closes: &[f64]) -> BarSeries {
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let close = Decimal::from_f64(*c).unwrap().round_dp(6);
                Bar {
                    timestamp: start + Duration::hours(i as i64),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: Decimal::ONE_HUNDRED,
                }
            })
            .collect();
        BarSeries::new("GC=F", Interval::OneHour, bars).unwrap()
    }

    fn random_walk(n: usize, drift: f64, seed: u64) -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut price = 100.0;
        (0..n)
            .map(|_| {
                price += drift + rng.gen_range(-0.5..0.5);
                price
            })
            .collect()
    }

    #[test]
    fn garch_needs_fifty_returns() {
        // 50 bars -> 49 returns
        let s = series(&random_walk(50, 0.0, 1));
        let forecast = forecast_volatility(&s, &ForecastConfig::default());
        assert!(matches!(forecast, Forecast::Unavailable { .. }));

        let s = series(&random_walk(51, 0.0, 1));
        assert!(forecast_volatility(&s, &ForecastConfig::default()).is_ready());
    }

    #[test]
    fn flat_prices_have_no_price_forecast() {
        let s = series(&[100.0; 60]);
        let forecast = forecast_price(&s, &ForecastConfig::default());
        let Forecast::Unavailable { reason } = forecast else {
            panic!("expected unavailable");
        };
        assert!(reason.contains("variation"), "{reason}");
    }

    #[test]
    fn short_series_has_no_price_forecast() {
        let s = series(&random_walk(29, 0.2, 3));
        assert!(!forecast_price(&s, &ForecastConfig::default()).is_ready());
    }

    #[test]
    fn rising_series_forecast_points_up() {
        let s = series(&random_walk(200, 1.0, 8));
        let forecast = forecast_price(&s, &ForecastConfig::default());
        let ready = forecast.as_ready().expect("forecast");

        assert_eq!(ready.direction, Direction::Up);
        assert!(ready.change_pct.is_some_and(|c| c > 0.0));
        assert_eq!(ready.path.len(), 5);
        assert_eq!(ready.path.last(), Some(&ready.forecast_price));
        assert_eq!(ready.order, ArimaOrder::new(2, 1, 2));
    }

    #[test]
    fn zero_last_close_has_no_percent_change() {
        let mut closes = random_walk(80, 0.0, 5);
        *closes.last_mut().unwrap() = 0.0;
        let s = series(&closes);
        let forecast = forecast_price(&s, &ForecastConfig::default());
        let ready = forecast.as_ready().expect("forecast");

        assert_eq!(ready.last_close, Decimal::ZERO);
        assert_eq!(ready.change_pct, None);
    }

    #[test]
    fn volatility_bands() {
        assert_eq!(VolatilityLevel::classify(1.6, 1.0), VolatilityLevel::VeryHigh);
        assert_eq!(VolatilityLevel::classify(1.5, 1.0), VolatilityLevel::High);
        assert_eq!(VolatilityLevel::classify(1.0, 1.0), VolatilityLevel::Normal);
        assert_eq!(VolatilityLevel::classify(0.5, 1.0), VolatilityLevel::Low);
    }

    #[test]
    fn volatility_forecast_is_consistent() {
        let s = series(&random_walk(300, 0.0, 21));
        let forecast = forecast_volatility(&s, &ForecastConfig::default());
        let ready = forecast.as_ready().expect("forecast");

        assert!(ready.predicted_volatility > 0.0);
        assert_eq!(
            ready.level,
            VolatilityLevel::classify(ready.predicted_volatility, ready.historical_volatility)
        );
        let elevated = ready.predicted_volatility > ready.historical_volatility;
        assert_eq!(ready.risk == RiskRead::Elevated, elevated);
    }
}
