//! Lookback windows expressed the way market data vendors name them
//! (`5d`, `3mo`, `2y`).

use chrono::{Days, Months, NaiveDate};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    Days(u32),
    Months(u32),
    Years(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookbackError {
    #[error("empty lookback")]
    Empty,

    #[error("invalid lookback '{0}' (expected <n>d, <n>mo or <n>y)")]
    Invalid(String),

    #[error("lookback must be at least one unit")]
    Zero,
}

impl Lookback {
    /// First calendar date covered by the window ending on `end`.
    pub fn start_date(&self, end: NaiveDate) -> NaiveDate {
        let start = match *self {
            Lookback::Days(n) => end.checked_sub_days(Days::new(u64::from(n))),
            Lookback::Months(n) => end.checked_sub_months(Months::new(n)),
            Lookback::Years(n) => end.checked_sub_months(Months::new(n.saturating_mul(12))),
        };
        start.unwrap_or(NaiveDate::MIN)
    }
}

impl FromStr for Lookback {
    type Err = LookbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s.is_empty() {
            return Err(LookbackError::Empty);
        }

        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| LookbackError::Invalid(s.clone()))?;
        let (digits, unit) = s.split_at(split);
        let n: u32 = digits
            .parse()
            .map_err(|_| LookbackError::Invalid(s.clone()))?;
        if n == 0 {
            return Err(LookbackError::Zero);
        }

        match unit {
            "d" => Ok(Lookback::Days(n)),
            "mo" => Ok(Lookback::Months(n)),
            "y" => Ok(Lookback::Years(n)),
            _ => Err(LookbackError::Invalid(s.clone())),
        }
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookback::Days(n) => write!(f, "{}d", n),
            Lookback::Months(n) => write!(f, "{}mo", n),
            Lookback::Years(n) => write!(f, "{}y", n),
        }
    }
}
