use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use maestro_core::{
    AlertSink, AppConfig, Bar, BarSeries, ConsensusVerdict, InstrumentConfig, Interval,
    MarketDataProvider, OrderSelection, Period, SignalError, TrendVerdict,
};
use maestro_signals::{Forecast, Scanner};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Default)]
struct StubProvider {
    bars: HashMap<(String, Interval), Vec<Bar>>,
    failing: HashSet<String>,
    slow: HashSet<String>,
    forecast_fetches: AtomicUsize,
}

impl StubProvider {
    fn with(mut self, symbol: &str, interval: Interval, bars: Vec<Bar>) -> Self {
        self.bars.insert((symbol.to_string(), interval), bars);
        self
    }
}

#[async_trait]
impl MarketDataProvider for StubProvider {
    async fn fetch_bars(
        &self,
        symbol: &str,
        interval: Interval,
        period: Period,
    ) -> Result<BarSeries> {
        if period.to_string() == "60d" {
            self.forecast_fetches.fetch_add(1, Ordering::SeqCst);
        }
        if self.slow.contains(symbol) {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if self.failing.contains(symbol) {
            bail!("HTTP 404 for {symbol}");
        }
        let bars = self
            .bars
            .get(&(symbol.to_string(), interval))
            .cloned()
            .unwrap_or_default();
        Ok(BarSeries::new(symbol, interval, bars)?)
    }

    fn name(&self) -> &str {
        "stub"
    }
}

#[derive(Default)]
struct RecordingSink(Mutex<Vec<String>>);

#[async_trait]
impl AlertSink for RecordingSink {
    async fn send(&self, message: &str) -> Result<()> {
        self.0.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

fn rising(n: usize, minutes: i64) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = Decimal::from(100 + i);
            Bar {
                timestamp: start + ChronoDuration::minutes(minutes * i as i64),
                open: close - dec!(0.5),
                high: close + dec!(0.5),
                low: close - dec!(1),
                close,
                volume: dec!(100),
            }
        })
        .collect()
}

/// Seeded random walk around 2300.
fn noisy(n: usize, minutes: i64, seed: u64) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut price = 2300.0_f64;
    (0..n)
        .map(|i| {
            price += rng.gen_range(-2.0..2.0);
            let close = Decimal::from_f64(price).unwrap().round_dp(2);
            Bar {
                timestamp: start + ChronoDuration::minutes(minutes * i as i64),
                open: close,
                high: close + dec!(1),
                low: close - dec!(1),
                close,
                volume: dec!(100),
            }
        })
        .collect()
}

fn unavailable_reason<T>(forecast: &Forecast<T>) -> &str {
    match forecast {
        Forecast::Unavailable { reason } => reason,
        Forecast::Ready(_) => panic!("expected an unavailable forecast"),
    }
}

/// Quiet bars with a high-volume, narrow-range last bar.
fn absorption_bars() -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
    (0..25)
        .map(|i| {
            let close = dec!(100) + Decimal::from(i % 3);
            let last = i == 24;
            Bar {
                timestamp: start + ChronoDuration::minutes(5 * i as i64),
                open: close,
                high: if last { close + dec!(0.2) } else { close + dec!(1) },
                low: if last { close - dec!(0.2) } else { close - dec!(1) },
                close,
                volume: if last { dec!(1000) } else { dec!(100) },
            }
        })
        .collect()
}

fn instrument(symbol: &str) -> InstrumentConfig {
    InstrumentConfig {
        symbol: symbol.to_string(),
        label: symbol.to_string(),
        contract: None,
    }
}

fn config(symbols: &[&str]) -> AppConfig {
    let mut config = AppConfig::default();
    config.instruments = symbols.iter().map(|s| instrument(s)).collect();
    config
}

fn healthy(provider: StubProvider, symbol: &str) -> StubProvider {
    provider
        .with(symbol, Interval::FiveMinutes, rising(25, 5))
        .with(symbol, Interval::FifteenMinutes, rising(25, 15))
        .with(symbol, Interval::OneHour, rising(25, 60))
}

#[tokio::test]
async fn failing_instrument_does_not_block_the_rest() {
    let mut provider = healthy(StubProvider::default(), "GC=F");
    provider.failing.insert("BAD".into());

    let scanner = Scanner::new(
        provider,
        Arc::new(RecordingSink::default()),
        config(&["BAD", "GC=F"]),
    );
    let reports = scanner.scan_all().await;

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].symbol, "BAD");
    assert_eq!(reports[0].consensus, ConsensusVerdict::Insufficient);
    assert!(reports[0]
        .timeframes
        .iter()
        .all(|t| matches!(t.analysis, Err(SignalError::DataUnavailable(_)))));
    assert!(!reports[0].forecast.price.is_ready());

    assert_eq!(reports[1].symbol, "GC=F");
    assert_eq!(reports[1].consensus, ConsensusVerdict::StrongBuy);
    for tf in &reports[1].timeframes {
        assert_eq!(tf.analysis().unwrap().verdict, Some(TrendVerdict::Buy));
    }
    // 25 hourly bars is too short for the models
    assert!(!reports[1].forecast.volatility.is_ready());
}

#[tokio::test]
async fn short_timeframe_gives_no_verdict() {
    let provider =
        healthy(StubProvider::default(), "GC=F").with("GC=F", Interval::FiveMinutes, rising(10, 5));
    let scanner = Scanner::new(provider, Arc::new(RecordingSink::default()), config(&["GC=F"]));

    let report = scanner.scan_instrument(&instrument("GC=F")).await;

    assert_eq!(
        report.timeframes[0].analysis,
        Err(SignalError::InsufficientData { required: 20, actual: 10 })
    );
    assert!(report.timeframes[1].analysis().is_some());
    assert_eq!(report.consensus, ConsensusVerdict::Insufficient);
}

#[tokio::test(start_paused = true)]
async fn slow_provider_times_out() {
    let mut provider = StubProvider::default();
    provider.slow.insert("SLOW".into());
    let mut config = config(&["SLOW"]);
    config.provider.timeout_secs = 1;

    let scanner = Scanner::new(provider, Arc::new(RecordingSink::default()), config);
    let reports = scanner.scan_all().await;

    assert!(reports[0]
        .timeframes
        .iter()
        .all(|t| matches!(t.analysis, Err(SignalError::Timeout(_)))));
    assert_eq!(reports[0].consensus, ConsensusVerdict::Insufficient);
    assert!(!reports[0].forecast.price.is_ready());
}

#[tokio::test]
async fn absorption_on_shortest_timeframe_alerts() {
    let provider = healthy(StubProvider::default(), "GC=F").with(
        "GC=F",
        Interval::FiveMinutes,
        absorption_bars(),
    );
    let sink = Arc::new(RecordingSink::default());
    let scanner = Scanner::new(provider, sink.clone(), config(&["GC=F"]));

    let report = scanner.scan_instrument(&instrument("GC=F")).await;

    assert!(report.alerted);
    let messages = sink.0.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("ABSORPTION GC=F (GC=F) 5m"), "{}", messages[0]);
}

#[tokio::test]
async fn disabled_alerts_stay_quiet() {
    let provider = healthy(StubProvider::default(), "GC=F").with(
        "GC=F",
        Interval::FiveMinutes,
        absorption_bars(),
    );
    let sink = Arc::new(RecordingSink::default());
    let mut config = config(&["GC=F"]);
    config.alerts.enabled = false;
    let scanner = Scanner::new(provider, sink.clone(), config);

    let report = scanner.scan_instrument(&instrument("GC=F")).await;

    assert!(!report.alerted);
    assert!(report.timeframes[0].analysis().unwrap().is_anomaly());
    assert!(sink.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn forecasts_are_cached_between_scans() {
    // long enough hourly series for the models to be fitted
    let provider =
        healthy(StubProvider::default(), "GC=F").with("GC=F", Interval::OneHour, noisy(120, 60, 7));
    let scanner = Scanner::new(provider, Arc::new(RecordingSink::default()), config(&["GC=F"]));

    let first = scanner.scan_all().await;
    assert!(first[0].forecast.price.is_ready(), "{:?}", first[0].forecast.price);
    assert!(first[0].forecast.volatility.is_ready(), "{:?}", first[0].forecast.volatility);

    let second = scanner.scan_all().await;

    assert_eq!(first[0].forecast, second[0].forecast);
    assert_eq!(scanner_forecast_fetches(&scanner), 1);
}

#[tokio::test]
async fn timed_out_fit_is_unavailable_and_not_cached() {
    let provider =
        healthy(StubProvider::default(), "GC=F").with("GC=F", Interval::OneHour, noisy(400, 60, 11));
    let mut config = config(&["GC=F"]);
    config.forecast.arima = OrderSelection::Auto { max_p: 3, d: 1, max_q: 3 };
    config.forecast.fit_timeout_ms = 1;
    let mut scanner = Scanner::new(provider, Arc::new(RecordingSink::default()), config.clone());

    for _ in 0..2 {
        let reports = scanner.scan_all().await;
        let forecast = &reports[0].forecast;
        assert!(unavailable_reason(&forecast.price).contains("timed out"));
        assert!(unavailable_reason(&forecast.volatility).contains("timed out"));
    }
    // every scan went back to the provider
    assert_eq!(scanner_forecast_fetches(&scanner), 2);

    config.forecast.fit_timeout_ms = 60_000;
    scanner.set_config(config);
    let reports = scanner.scan_all().await;

    assert!(reports[0].forecast.price.is_ready(), "{:?}", reports[0].forecast.price);
    assert!(reports[0].forecast.volatility.is_ready());
    assert_eq!(scanner_forecast_fetches(&scanner), 3);
}

#[tokio::test]
async fn expired_cache_refits() {
    let provider = healthy(StubProvider::default(), "GC=F");
    let mut config = config(&["GC=F"]);
    config.cache.forecast_ttl_secs = 0;
    let scanner = Scanner::new(provider, Arc::new(RecordingSink::default()), config);

    scanner.scan_all().await;
    scanner.scan_all().await;

    assert_eq!(scanner_forecast_fetches(&scanner), 2);
}

fn scanner_forecast_fetches(scanner: &Scanner<StubProvider>) -> usize {
    scanner.provider().forecast_fetches.load(Ordering::SeqCst)
}
