//! Error taxonomy for the signal pipeline.
//!
//! Every failure is contained at the indicator, timeframe or instrument it
//! belongs to; callers render these as "unavailable" rather than aborting.

use thiserror::Error;

/// Errors produced by indicator, forecast and scan operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    /// Series too short for the requested computation.
    #[error("insufficient data: need {required} bars, got {actual}")]
    InsufficientData {
        /// Bars required.
        required: usize,
        /// Bars available.
        actual: usize,
    },

    /// Input is well-formed but has no meaningful answer (zero volume, flat range, ...).
    #[error("degenerate input: {0}")]
    Degenerate(String),

    /// Timestamps are duplicated or not increasing.
    #[error("bars out of order at index {index}")]
    UnorderedBars {
        /// Index of the offending bar.
        index: usize,
    },

    /// A statistical model could not be fitted.
    #[error("model fit failed: {0}")]
    ModelFit(String),

    /// A fetch or a fit exceeded its deadline.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The market data provider returned nothing usable.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// A parameter is out of its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SignalError {
    /// True for the data-unavailable class (empty, short or missing series).
    #[must_use]
    pub const fn is_data_shortage(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. } | Self::DataUnavailable(_)
        )
    }
}
