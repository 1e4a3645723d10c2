//! Verdict types shared by the pipeline and its consumers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a forecast or move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Bullish - expect price to go up
    Up,
    /// Bearish - expect price to go down
    Down,
    /// No directional bias
    Neutral,
}

impl Direction {
    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Neutral => Self::Neutral,
        }
    }

    /// Direction of `to - from`.
    #[must_use]
    pub fn of_change(from: f64, to: f64) -> Self {
        if to > from {
            Self::Up
        } else if to < from {
            Self::Down
        } else {
            Self::Neutral
        }
    }
}

/// Per-timeframe trend call. Strictly binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendVerdict {
    Buy,
    Sell,
}

impl TrendVerdict {
    /// Close above VWAP is a buy, anything else a sell.
    #[must_use]
    pub fn from_close_vs_vwap(close: Decimal, vwap: Decimal) -> Self {
        if close > vwap {
            Self::Buy
        } else {
            Self::Sell
        }
    }
}

impl fmt::Display for TrendVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("BUY"),
            Self::Sell => f.write_str("SELL"),
        }
    }
}

/// Unanimous-vote result across the configured timeframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsensusVerdict {
    /// Every timeframe says buy.
    StrongBuy,
    /// Every timeframe says sell.
    StrongSell,
    /// Timeframes disagree; wait for alignment.
    Mixed,
    /// At least one timeframe produced no verdict.
    Insufficient,
}

impl fmt::Display for ConsensusVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::StrongBuy => "STRONG BUY: full buy alignment",
            Self::StrongSell => "STRONG SELL: full sell alignment",
            Self::Mixed => "MIXED: timeframes disagree, wait for alignment",
            Self::Insufficient => "INSUFFICIENT DATA",
        };
        f.write_str(text)
    }
}
