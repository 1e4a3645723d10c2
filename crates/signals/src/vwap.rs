//! Cumulative volume-weighted average price.

use maestro_core::Bar;
use rust_decimal::Decimal;

/// Running `sum(close * volume) / sum(volume)` for every bar.
///
/// Entries stay `None` until some volume has accrued.
#[must_use]
pub fn vwap_series(bars: &[Bar]) -> Vec<Option<Decimal>> {
    let mut cum_pv = Decimal::ZERO;
    let mut cum_vol = Decimal::ZERO;

    bars.iter()
        .map(|bar| {
            cum_pv += bar.close * bar.volume;
            cum_vol += bar.volume;
            if cum_vol > Decimal::ZERO {
                Some(cum_pv / cum_vol)
            } else {
                None
            }
        })
        .collect()
}

/// VWAP at the last bar, `None` if no volume traded in the whole series.
#[must_use]
pub fn latest_vwap(bars: &[Bar]) -> Option<Decimal> {
    let cum_vol: Decimal = bars.iter().map(|b| b.volume).sum();
    if cum_vol <= Decimal::ZERO {
        return None;
    }
    let cum_pv: Decimal = bars.iter().map(|b| b.close * b.volume).sum();
    Some(cum_pv / cum_vol)
}
