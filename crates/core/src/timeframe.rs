use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bar interval, using the provider's string spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    OneMinute,
    TwoMinutes,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    NinetyMinutes,
    OneDay,
    OneWeek,
    OneMonth,
}

impl Interval {
    /// Returns the provider string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::TwoMinutes => "2m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
            Self::NinetyMinutes => "90m",
            Self::OneDay => "1d",
            Self::OneWeek => "1wk",
            Self::OneMonth => "1mo",
        }
    }

    /// Returns the interval duration in seconds.
    #[must_use]
    pub const fn duration_secs(&self) -> i64 {
        match self {
            Self::OneMinute => 60,
            Self::TwoMinutes => 120,
            Self::FiveMinutes => 300,
            Self::FifteenMinutes => 900,
            Self::ThirtyMinutes => 1_800,
            Self::OneHour => 3_600,
            Self::NinetyMinutes => 5_400,
            Self::OneDay => 86_400,
            Self::OneWeek => 604_800,
            Self::OneMonth => 2_592_000, // ~30 days
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1m" => Ok(Self::OneMinute),
            "2m" => Ok(Self::TwoMinutes),
            "5m" => Ok(Self::FiveMinutes),
            "15m" => Ok(Self::FifteenMinutes),
            "30m" => Ok(Self::ThirtyMinutes),
            "1h" | "60m" => Ok(Self::OneHour),
            "90m" => Ok(Self::NinetyMinutes),
            "1d" => Ok(Self::OneDay),
            "1wk" => Ok(Self::OneWeek),
            "1mo" => Ok(Self::OneMonth),
            _ => Err(anyhow!(
                "Invalid interval: '{s}'. Valid values: 1m, 2m, 5m, 15m, 30m, 1h, 90m, 1d, 1wk, 1mo"
            )),
        }
    }
}

impl TryFrom<String> for Interval {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(value: Interval) -> Self {
        value.as_str().to_string()
    }
}

/// Unit of a lookback period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodUnit {
    Day,
    Month,
    Year,
}

impl PeriodUnit {
    const fn suffix(self) -> &'static str {
        match self {
            Self::Day => "d",
            Self::Month => "mo",
            Self::Year => "y",
        }
    }
}

/// Lookback period requested from the provider, e.g. `2d`, `60d`, `6mo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    pub amount: u32,
    pub unit: PeriodUnit,
}

impl Period {
    #[must_use]
    pub const fn days(amount: u32) -> Self {
        Self {
            amount,
            unit: PeriodUnit::Day,
        }
    }

    #[must_use]
    pub const fn months(amount: u32) -> Self {
        Self {
            amount,
            unit: PeriodUnit::Month,
        }
    }

    /// Calendar length, counting months as 30 days and years as 365.
    #[must_use]
    pub fn approx_duration(&self) -> chrono::Duration {
        let days = match self.unit {
            PeriodUnit::Day => i64::from(self.amount),
            PeriodUnit::Month => i64::from(self.amount) * 30,
            PeriodUnit::Year => i64::from(self.amount) * 365,
        };
        chrono::Duration::days(days)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| anyhow!("Invalid period '{s}': missing unit (d, mo, y)"))?;
        let (digits, suffix) = s.split_at(split);

        let amount: u32 = digits
            .parse()
            .map_err(|_| anyhow!("Invalid period '{s}': missing amount"))?;
        if amount == 0 {
            return Err(anyhow!("Invalid period '{s}': amount must be positive"));
        }

        let unit = match suffix {
            "d" => PeriodUnit::Day,
            "mo" => PeriodUnit::Month,
            "y" => PeriodUnit::Year,
            _ => return Err(anyhow!("Invalid period '{s}': unit must be d, mo or y")),
        };

        Ok(Self { amount, unit })
    }
}

impl TryFrom<String> for Period {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(value: Period) -> Self {
        value.to_string()
    }
}
