//! Cleans provider rows into an ordered bar list.

use chrono::{DateTime, Utc};
use maestro_core::Bar;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// A provider row before validation; any field may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawBar {
    pub timestamp: Option<i64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizeStats {
    pub kept: usize,
    /// Rows with a missing or non-finite field
    pub incomplete: usize,
    pub duplicates: usize,
}

fn price(value: Option<f64>) -> Option<Decimal> {
    value
        .filter(|v| v.is_finite())
        .and_then(Decimal::from_f64)
}

fn to_bar(raw: &RawBar) -> Option<Bar> {
    let timestamp = DateTime::<Utc>::from_timestamp(raw.timestamp?, 0)?;
    let volume = raw.volume.filter(|v| v.is_finite() && *v >= 0.0)?;
    Some(Bar {
        timestamp,
        open: price(raw.open)?,
        high: price(raw.high)?,
        low: price(raw.low)?,
        close: price(raw.close)?,
        volume: Decimal::from_f64(volume)?,
    })
}

/// Drops incomplete rows, sorts by timestamp and keeps the last row for any
/// repeated timestamp.
#[must_use]
pub fn normalize(rows: &[RawBar]) -> (Vec<Bar>, NormalizeStats) {
    let mut stats = NormalizeStats::default();
    let mut bars: Vec<Bar> = rows
        .iter()
        .filter_map(|raw| {
            let bar = to_bar(raw);
            if bar.is_none() {
                stats.incomplete += 1;
            }
            bar
        })
        .collect();

    // stable sort keeps provider order among equal timestamps
    bars.sort_by_key(|b| b.timestamp);

    let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match deduped.last_mut() {
            Some(prev) if prev.timestamp == bar.timestamp => {
                *prev = bar;
                stats.duplicates += 1;
            }
            _ => deduped.push(bar),
        }
    }

    stats.kept = deduped.len();
    (deduped, stats)
}
