//! Daily OHLCV bar as delivered by a market data source.

use chrono::NaiveDate;

use crate::domain::price_table::PriceQuote;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl OhlcvBar {
    /// The open/close pair the returns engine works from.
    pub fn quote(&self) -> PriceQuote {
        PriceQuote {
            open: self.open,
            close: self.close,
        }
    }

    /// True when open and close are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite() && self.close.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> OhlcvBar {
        OhlcvBar {
            symbol: "NVDA".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000,
        }
    }

    #[test]
    fn quote_takes_open_and_close() {
        let q = sample_bar().quote();
        assert_eq!(q.open, 100.0);
        assert_eq!(q.close, 105.0);
    }

    #[test]
    fn nan_close_is_not_finite() {
        let mut bar = sample_bar();
        assert!(bar.is_finite());
        bar.close = f64::NAN;
        assert!(!bar.is_finite());
    }
}
