use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pip conversion for one instrument, supplied by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSpec {
    /// Price change that counts as one pip (e.g. 0.01 for USD/JPY).
    pub pip_size: Decimal,
    /// Account-currency value of one pip for one lot.
    pub pip_value_per_lot: Decimal,
}

/// Calculate position size from a risk budget and a stop distance.
///
/// # Arguments
/// * `risk_amount` - Currency amount the trade may lose
/// * `stop_distance` - Distance from entry to stop, in price units
///
/// # Returns
/// Units to trade, or zero when the stop distance is not positive
#[must_use]
pub fn calculate_position_size(risk_amount: Decimal, stop_distance: Decimal) -> Decimal {
    if stop_distance <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    risk_amount / stop_distance
}

/// Currency amount at risk for a balance and a percent (1.0 = 1%).
#[must_use]
pub fn risk_amount(account_balance: Decimal, risk_pct: Decimal) -> Decimal {
    account_balance * risk_pct / Decimal::ONE_HUNDRED
}

/// Calculate lot size using the instrument's pip conversion.
///
/// `lots = risk_amount / (stop_distance / pip_size * pip_value_per_lot)`
///
/// Returns zero when the stop distance, pip size or pip value is not positive.
#[must_use]
pub fn calculate_lot_size(
    risk_amount: Decimal,
    stop_distance: Decimal,
    contract: &ContractSpec,
) -> Decimal {
    if stop_distance <= Decimal::ZERO
        || contract.pip_size <= Decimal::ZERO
        || contract.pip_value_per_lot <= Decimal::ZERO
    {
        return Decimal::ZERO;
    }

    let stop_pips = stop_distance / contract.pip_size;
    risk_amount / (stop_pips * contract.pip_value_per_lot)
}

/// How much of the account each trade may lose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskBudget {
    /// Fixed currency amount.
    Amount(Decimal),
    /// Percent of the account balance (1.0 = 1%).
    Percent(Decimal),
}

/// Suggested trade size for a stop distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeSuggestion {
    pub risk_amount: Decimal,
    pub units: Decimal,
    /// Present only when a contract spec was supplied.
    pub lots: Option<Decimal>,
}

/// Bundles an account balance with a risk budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSizer {
    pub account_balance: Decimal,
    pub budget: RiskBudget,
}

impl PositionSizer {
    #[must_use]
    pub const fn new(account_balance: Decimal, budget: RiskBudget) -> Self {
        Self {
            account_balance,
            budget,
        }
    }

    /// Currency amount at risk under the budget.
    #[must_use]
    pub fn risk_amount(&self) -> Decimal {
        match self.budget {
            RiskBudget::Amount(amount) => amount,
            RiskBudget::Percent(pct) => risk_amount(self.account_balance, pct),
        }
    }

    /// Sizes a trade for a stop distance, in units and optionally in lots.
    #[must_use]
    pub fn suggest(&self, stop_distance: Decimal, contract: Option<&ContractSpec>) -> SizeSuggestion {
        let risk = self.risk_amount();
        SizeSuggestion {
            risk_amount: risk,
            units: calculate_position_size(risk, stop_distance),
            lots: contract.map(|spec| calculate_lot_size(risk, stop_distance, spec)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_basic_position_sizing() {
        // $100 at risk with a $2 stop = 50 units
        assert_eq!(calculate_position_size(dec!(100), dec!(2)), dec!(50));
    }

    #[test]
    fn test_zero_stop_returns_zero() {
        assert_eq!(calculate_position_size(dec!(100), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(calculate_position_size(dec!(100), dec!(-1)), Decimal::ZERO);
    }

    #[test]
    fn test_size_is_linear_in_risk() {
        for stop in [dec!(0.25), dec!(1.5), dec!(12)] {
            let single = calculate_position_size(dec!(37.5), stop);
            let double = calculate_position_size(dec!(75), stop);
            assert_eq!(double, single * dec!(2));
        }
    }

    #[test]
    fn test_risk_amount_from_percent() {
        // 1% of $10k
        assert_eq!(risk_amount(dec!(10000), dec!(1)), dec!(100));
        assert_eq!(risk_amount(dec!(5000), dec!(2.5)), dec!(125));
    }

    #[test]
    fn test_lot_size_with_pip_conversion() {
        // USD/JPY style: pip 0.01, $6.7 per pip per lot, 20 pip stop, $134 risk
        let spec = ContractSpec {
            pip_size: dec!(0.01),
            pip_value_per_lot: dec!(6.7),
        };
        let lots = calculate_lot_size(dec!(134), dec!(0.20), &spec);
        assert_eq!(lots, dec!(1));
    }

    #[test]
    fn test_lot_size_guards() {
        let spec = ContractSpec {
            pip_size: dec!(0.0001),
            pip_value_per_lot: Decimal::ZERO,
        };
        assert_eq!(calculate_lot_size(dec!(100), dec!(0.001), &spec), Decimal::ZERO);
    }

    #[test]
    fn test_sizer_with_percent_budget() {
        let sizer = PositionSizer::new(dec!(20000), RiskBudget::Percent(dec!(0.5)));
        let spec = ContractSpec {
            pip_size: dec!(0.1),
            pip_value_per_lot: dec!(10),
        };

        let suggestion = sizer.suggest(dec!(5), Some(&spec));

        // $100 risk / $5 stop = 20 units; 50 pips * $10 = $500 per lot -> 0.2 lots
        assert_eq!(suggestion.risk_amount, dec!(100));
        assert_eq!(suggestion.units, dec!(20));
        assert_eq!(suggestion.lots, Some(dec!(0.2)));
    }

    #[test]
    fn test_sizer_with_fixed_amount() {
        let sizer = PositionSizer::new(dec!(20000), RiskBudget::Amount(dec!(40)));
        let suggestion = sizer.suggest(dec!(8), None);
        assert_eq!(suggestion.units, dec!(5));
        assert_eq!(suggestion.lots, None);
    }
}
