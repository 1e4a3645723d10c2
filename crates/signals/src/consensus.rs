//! Unanimous multi-timeframe vote.

use maestro_core::{ConsensusVerdict, TrendVerdict};

/// Number of timeframe verdicts the default configuration expects.
pub const DEFAULT_REQUIRED_VERDICTS: usize = 3;

/// Combines per-timeframe verdicts.
///
/// Fewer than `required` verdicts is `Insufficient`; otherwise the verdicts
/// must agree unanimously for a strong call. `required` is clamped to at
/// least one so an empty vote is never a strong call.
#[must_use]
pub fn aggregate(verdicts: &[TrendVerdict], required: usize) -> ConsensusVerdict {
    if verdicts.len() < required.max(1) {
        return ConsensusVerdict::Insufficient;
    }
    if verdicts.iter().all(|v| *v == TrendVerdict::Buy) {
        ConsensusVerdict::StrongBuy
    } else if verdicts.iter().all(|v| *v == TrendVerdict::Sell) {
        ConsensusVerdict::StrongSell
    } else {
        ConsensusVerdict::Mixed
    }
}

/// Aggregates optional verdicts, where `None` marks a timeframe whose data
/// was unavailable.
#[must_use]
pub fn aggregate_partial(verdicts: &[Option<TrendVerdict>], required: usize) -> ConsensusVerdict {
    let present: Vec<TrendVerdict> = verdicts.iter().flatten().copied().collect();
    aggregate(&present, required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use TrendVerdict::{Buy, Sell};

    #[test]
    fn truth_table() {
        let cases = [
            (vec![Buy, Buy, Buy], ConsensusVerdict::StrongBuy),
            (vec![Sell, Sell, Sell], ConsensusVerdict::StrongSell),
            (vec![Buy, Sell, Buy], ConsensusVerdict::Mixed),
            (vec![Sell, Sell, Buy], ConsensusVerdict::Mixed),
            (vec![Buy, Buy], ConsensusVerdict::Insufficient),
            (vec![], ConsensusVerdict::Insufficient),
        ];
        for (verdicts, expected) in cases {
            assert_eq!(
                aggregate(&verdicts, DEFAULT_REQUIRED_VERDICTS),
                expected,
                "{verdicts:?}"
            );
        }
    }

    #[test]
    fn missing_timeframe_is_insufficient() {
        assert_eq!(
            aggregate_partial(&[Some(Buy), None, Some(Buy)], 3),
            ConsensusVerdict::Insufficient
        );
        assert_eq!(
            aggregate_partial(&[Some(Sell), Some(Sell), Some(Sell)], 3),
            ConsensusVerdict::StrongSell
        );
    }

    #[test]
    fn zero_required_still_needs_a_vote() {
        assert_eq!(aggregate(&[], 0), ConsensusVerdict::Insufficient);
        assert_eq!(aggregate(&[Buy], 0), ConsensusVerdict::StrongBuy);
    }
}
