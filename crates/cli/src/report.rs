#![allow(clippy::format_push_string)]

use maestro_core::{Direction, SizeSuggestion};
use maestro_signals::{Forecast, InstrumentReport, TimeframeReport};

pub struct ReportFormatter;

impl ReportFormatter {
    #[must_use]
    pub fn format(report: &InstrumentReport) -> String {
        let mut output = String::new();

        output.push_str(&format!("{} ({})\n", report.label, report.symbol));
        output.push_str("───────────────────────────────────────────────────────────────\n");

        for tf in &report.timeframes {
            output.push_str(&Self::timeframe_line(tf));
            output.push('\n');
        }

        output.push_str(&format!("Consensus:             {}\n", report.consensus));

        match &report.forecast.price {
            Forecast::Ready(price) => {
                let change = price
                    .change_pct
                    .map_or_else(|| "n/a".to_string(), |c| format!("{c:+.2}%"));
                output.push_str(&format!(
                    "Price forecast {}: {} -> {} ({change}, {})\n",
                    price.order,
                    price.last_close,
                    price.forecast_price.round_dp(4),
                    direction_label(price.direction),
                ));
            }
            Forecast::Unavailable { reason } => {
                output.push_str(&format!("Price forecast:        unavailable ({reason})\n"));
            }
        }

        match &report.forecast.volatility {
            Forecast::Ready(vol) => output.push_str(&format!(
                "Volatility forecast:   {:.3}% vs {:.3}% historical, {} (risk {})\n",
                vol.predicted_volatility, vol.historical_volatility, vol.level, vol.risk,
            )),
            Forecast::Unavailable { reason } => {
                output.push_str(&format!("Volatility forecast:   unavailable ({reason})\n"));
            }
        }

        if report.alerted {
            output.push_str("Alert sent for absorption on the shortest timeframe\n");
        }

        output
    }

    fn timeframe_line(tf: &TimeframeReport) -> String {
        let analysis = match &tf.analysis {
            Ok(analysis) => analysis,
            Err(e) => return format!("  {:<4} unavailable: {e}", tf.interval),
        };

        let mut line = format!("  {:<4} close {}", tf.interval, analysis.last_close);
        match analysis.vwap {
            Some(vwap) => line.push_str(&format!("  vwap {}", vwap.round_dp(4))),
            None => line.push_str("  vwap n/a"),
        }
        match (analysis.poc, analysis.poc_offset_pct()) {
            (Some(poc), Some(offset)) => {
                line.push_str(&format!("  poc {} ({:+}%)", poc.round_dp(4), offset.round_dp(2)));
            }
            (Some(poc), None) => line.push_str(&format!("  poc {}", poc.round_dp(4))),
            _ => line.push_str("  poc n/a"),
        }
        match analysis.verdict {
            Some(verdict) => line.push_str(&format!("  {verdict}")),
            None => line.push_str("  no verdict"),
        }
        if let Some(regime) = &analysis.regime {
            line.push_str(&format!("  {}", regime.regime));
        }
        if analysis.is_anomaly() {
            let rvol = analysis
                .absorption
                .as_ref()
                .and_then(|a| a.relative_volume)
                .map_or_else(|| "n/a".to_string(), |r| format!("{r:.2}"));
            line.push_str(&format!("  ABSORPTION rvol {rvol}"));
        }
        line
    }

    #[must_use]
    pub fn format_size(suggestion: &SizeSuggestion, stop_distance: rust_decimal::Decimal) -> String {
        let mut output = String::new();
        output.push_str(&format!("Risk amount:           {:.2}\n", suggestion.risk_amount));
        output.push_str(&format!("Stop distance:         {stop_distance}\n"));
        output.push_str(&format!("Units:                 {:.4}\n", suggestion.units));
        if let Some(lots) = suggestion.lots {
            output.push_str(&format!("Lots:                  {lots:.2}\n"));
        }
        output
    }
}

const fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "up",
        Direction::Down => "down",
        Direction::Neutral => "flat",
    }
}
