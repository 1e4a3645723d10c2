//! Decides which absorption readings are worth an alert, and formats them.

use maestro_core::{AlertConfig, AlertSink};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::analysis::TimeframeAnalysis;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertGate {
    enabled: bool,
    poc_proximity_pct: Option<f64>,
}

impl From<&AlertConfig> for AlertGate {
    fn from(config: &AlertConfig) -> Self {
        Self {
            enabled: config.enabled,
            poc_proximity_pct: config.poc_proximity_pct,
        }
    }
}

impl AlertGate {
    #[must_use]
    pub const fn new(enabled: bool, poc_proximity_pct: Option<f64>) -> Self {
        Self {
            enabled,
            poc_proximity_pct,
        }
    }

    /// True when the analysis flags absorption and, if a proximity limit is
    /// configured, the close sits within that percent of the POC.
    #[must_use]
    pub fn should_alert(&self, analysis: &TimeframeAnalysis) -> bool {
        if !self.enabled || !analysis.is_anomaly() {
            return false;
        }
        let Some(limit) = self.poc_proximity_pct else {
            return true;
        };
        let (Some(distance), Some(limit)) = (analysis.poc_distance_pct(), Decimal::from_f64(limit))
        else {
            return false;
        };
        distance <= limit
    }
}

/// One-line alert text.
#[must_use]
pub fn format_alert(label: &str, analysis: &TimeframeAnalysis) -> String {
    let rvol = analysis
        .absorption
        .as_ref()
        .and_then(|a| a.relative_volume)
        .map_or_else(|| "n/a".to_string(), |rv| format!("{rv:.2}"));
    let poc = analysis
        .poc
        .map_or_else(|| "n/a".to_string(), |p| p.round_dp(2).to_string());

    format!(
        "ABSORPTION {label} ({}) {}: close {} rvol {rvol} poc {poc}",
        analysis.symbol,
        analysis.interval,
        analysis.last_close.round_dp(2),
    )
}

/// Sends `message` if the gate passes. Delivery failures are logged only.
///
/// Returns whether an alert was attempted.
pub async fn dispatch(
    gate: &AlertGate,
    sink: &dyn AlertSink,
    label: &str,
    analysis: &TimeframeAnalysis,
) -> bool {
    if !gate.should_alert(analysis) {
        debug!(symbol = %analysis.symbol, "no alert");
        return false;
    }
    let message = format_alert(label, analysis);
    if let Err(e) = sink.send(&message).await {
        warn!(symbol = %analysis.symbol, error = %e, "alert delivery failed");
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::absorption::AbsorptionReading;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use maestro_core::Interval;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    fn analysis(anomaly: bool, close: Decimal, poc: Option<Decimal>) -> TimeframeAnalysis {
        TimeframeAnalysis {
            symbol: "GC=F".into(),
            interval: Interval::FiveMinutes,
            last_timestamp: Utc.with_ymd_and_hms(2024, 6, 3, 14, 0, 0).unwrap(),
            last_close: close,
            poc,
            vwap: Some(dec!(2300)),
            verdict: None,
            absorption: Some(AbsorptionReading {
                relative_volume: Some(3.25),
                range: dec!(0.4),
                mean_range: dec!(1.2),
                compression: true,
                wick_rejection: None,
                is_anomaly: anomaly,
            }),
            regime: None,
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    #[async_trait]
    impl AlertSink for Recorder {
        async fn send(&self, message: &str) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl AlertSink for Broken {
        async fn send(&self, _message: &str) -> anyhow::Result<()> {
            anyhow::bail!("channel closed")
        }
    }

    #[test]
    fn gate_requires_anomaly() {
        let gate = AlertGate::new(true, None);
        assert!(gate.should_alert(&analysis(true, dec!(2310), None)));
        assert!(!gate.should_alert(&analysis(false, dec!(2310), None)));
        assert!(!AlertGate::new(false, None).should_alert(&analysis(true, dec!(2310), None)));
    }

    #[test]
    fn proximity_limits_alerts() {
        let gate = AlertGate::new(true, Some(0.5));
        // 0.4% away
        assert!(gate.should_alert(&analysis(true, dec!(2309.2), Some(dec!(2300)))));
        // 1% away
        assert!(!gate.should_alert(&analysis(true, dec!(2323), Some(dec!(2300)))));
        // no POC to compare against
        assert!(!gate.should_alert(&analysis(true, dec!(2300), None)));
    }

    #[test]
    fn message_names_instrument() {
        let text = format_alert("Gold", &analysis(true, dec!(2310.456), Some(dec!(2300))));
        assert_eq!(text, "ABSORPTION Gold (GC=F) 5m: close 2310.46 rvol 3.25 poc 2300");
    }

    #[tokio::test]
    async fn dispatch_sends_and_swallows_errors() {
        let gate = AlertGate::new(true, None);
        let recorder = Recorder::default();
        assert!(dispatch(&gate, &recorder, "Gold", &analysis(true, dec!(2310), None)).await);
        assert_eq!(recorder.0.lock().unwrap().len(), 1);

        assert!(!dispatch(&gate, &recorder, "Gold", &analysis(false, dec!(2310), None)).await);
        assert_eq!(recorder.0.lock().unwrap().len(), 1);

        assert!(dispatch(&gate, &Broken, "Gold", &analysis(true, dec!(2310), None)).await);
    }
}
