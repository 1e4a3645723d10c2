//! Volume profile and point of control (POC).
//!
//! Closing prices are bucketed into `bins` equal-width intervals spanning the
//! observed close range; each bar contributes its whole volume to the bucket
//! holding its close. The POC is the midpoint of the heaviest bucket.

use maestro_core::{BarSeries, SignalError};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One price bucket: `[lower, upper)`, except the top bucket which also
/// holds closes equal to `upper`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBin {
    pub lower: Decimal,
    pub upper: Decimal,
    pub volume: Decimal,
}

impl PriceBin {
    #[must_use]
    pub fn midpoint(&self) -> Decimal {
        (self.lower + self.upper) / Decimal::TWO
    }
}

/// Volume summed per close-price bucket, lowest bucket first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeProfile {
    pub bins: Vec<PriceBin>,
}

impl VolumeProfile {
    /// Index of the heaviest bucket. Ties resolve to the lowest-priced bucket.
    #[must_use]
    pub fn poc_index(&self) -> Option<usize> {
        let mut best: Option<(usize, Decimal)> = None;
        for (i, bin) in self.bins.iter().enumerate() {
            match best {
                Some((_, v)) if bin.volume <= v => {}
                _ => best = Some((i, bin.volume)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Midpoint of the heaviest bucket.
    #[must_use]
    pub fn point_of_control(&self) -> Option<Decimal> {
        self.poc_index().map(|i| self.bins[i].midpoint())
    }

    #[must_use]
    pub fn total_volume(&self) -> Decimal {
        self.bins.iter().map(|b| b.volume).sum()
    }
}

/// Builds the close-price volume profile.
///
/// # Errors
/// * [`SignalError::InvalidConfig`] when `bins` is zero.
/// * [`SignalError::InsufficientData`] unless the series has more bars than bins.
/// * [`SignalError::Degenerate`] when all closes are equal or the total
///   volume is zero.
pub fn volume_profile(series: &BarSeries, bins: usize) -> Result<VolumeProfile, SignalError> {
    if bins == 0 {
        return Err(SignalError::InvalidConfig("poc bins must be at least 1".into()));
    }
    series.ensure_len(bins + 1)?;

    let bars = series.bars();
    let (min, max) = bars.iter().fold((bars[0].close, bars[0].close), |(lo, hi), b| {
        (lo.min(b.close), hi.max(b.close))
    });
    if max == min {
        return Err(SignalError::Degenerate(format!(
            "close range is a single price ({min})"
        )));
    }

    let bin_count = Decimal::from(bins);
    let width = (max - min) / bin_count;
    let mut profile: Vec<PriceBin> = (0..bins)
        .map(|i| {
            let lower = min + width * Decimal::from(i);
            let upper = if i + 1 == bins {
                max
            } else {
                min + width * Decimal::from(i + 1)
            };
            PriceBin {
                lower,
                upper,
                volume: Decimal::ZERO,
            }
        })
        .collect();

    for bar in bars {
        let offset = ((bar.close - min) / width).floor();
        let index = offset.to_usize().unwrap_or(bins - 1).min(bins - 1);
        profile[index].volume += bar.volume.max(Decimal::ZERO);
    }

    let profile = VolumeProfile { bins: profile };
    if profile.total_volume().is_zero() {
        return Err(SignalError::Degenerate("total volume is zero".into()));
    }

    Ok(profile)
}

/// Point of control: midpoint of the highest-volume close bucket.
///
/// # Errors
/// Same as [`volume_profile`].
pub fn point_of_control(series: &BarSeries, bins: usize) -> Result<Decimal, SignalError> {
    let profile = volume_profile(series, bins)?;
    profile
        .point_of_control()
        .ok_or_else(|| SignalError::Degenerate("empty volume profile".into()))
}
