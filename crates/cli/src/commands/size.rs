//! `size`: position size for a stop distance.

use anyhow::{anyhow, Result};
use clap::Args;
use maestro_core::config_loader::DEFAULT_CONFIG_DIR;
use maestro_core::{AppConfig, ConfigLoader, ContractSpec, PositionSizer, RiskBudget};
use rust_decimal::Decimal;
use std::path::PathBuf;

use crate::report::ReportFormatter;

#[derive(Args, Debug, Clone)]
pub struct SizeArgs {
    /// Distance from entry to stop, in price units
    #[arg(long)]
    pub stop: Decimal,

    /// Account balance (defaults to risk.account_balance)
    #[arg(long)]
    pub balance: Option<Decimal>,

    /// Percent of balance to risk, 1.0 = 1% (defaults to risk.risk_pct)
    #[arg(long, conflicts_with = "risk_amount")]
    pub risk_pct: Option<Decimal>,

    /// Fixed currency amount to risk instead of a percent
    #[arg(long)]
    pub risk_amount: Option<Decimal>,

    /// Use this configured instrument's contract spec for lots
    #[arg(long)]
    pub symbol: Option<String>,

    /// Price change that counts as one pip
    #[arg(long, requires = "pip_value")]
    pub pip_size: Option<Decimal>,

    /// Value of one pip for one lot, in account currency
    #[arg(long, requires = "pip_size")]
    pub pip_value: Option<Decimal>,

    /// Directory holding Config.toml
    #[arg(long, default_value = DEFAULT_CONFIG_DIR)]
    pub config_dir: PathBuf,
}

/// Resolves the sizer and contract from flags, falling back to configuration.
///
/// # Errors
/// Returns an error when `--symbol` names an instrument that is not configured.
pub fn resolve(args: &SizeArgs, config: &AppConfig) -> Result<(PositionSizer, Option<ContractSpec>)> {
    let balance = args.balance.unwrap_or(config.risk.account_balance);
    let budget = match args.risk_amount {
        Some(amount) => RiskBudget::Amount(amount),
        None => RiskBudget::Percent(args.risk_pct.unwrap_or(config.risk.risk_pct)),
    };

    let contract = match (args.pip_size, args.pip_value) {
        (Some(pip_size), Some(pip_value_per_lot)) => Some(ContractSpec {
            pip_size,
            pip_value_per_lot,
        }),
        _ => match &args.symbol {
            Some(symbol) => {
                let instrument = config
                    .instruments
                    .iter()
                    .find(|i| i.symbol.eq_ignore_ascii_case(symbol))
                    .ok_or_else(|| anyhow!("Instrument {symbol} is not configured"))?;
                instrument.contract.or(config.risk.default_contract)
            }
            None => config.risk.default_contract,
        },
    };

    Ok((PositionSizer::new(balance, budget), contract))
}

/// # Errors
/// Returns an error if the configuration cannot be loaded or `--symbol` is unknown.
pub fn run_size(args: SizeArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config_dir, None)?;
    let (sizer, contract) = resolve(&args, &config)?;

    if args.stop <= Decimal::ZERO {
        tracing::warn!(stop = %args.stop, "Stop distance is not positive, size is zero");
    }

    let suggestion = sizer.suggest(args.stop, contract.as_ref());
    print!("{}", ReportFormatter::format_size(&suggestion, args.stop));
    Ok(())
}
