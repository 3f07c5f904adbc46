//! Price table: a unified trading-date timeline with one open/close column
//! per symbol.
//!
//! Dates are strictly increasing. A symbol that did not trade on a date holds
//! `None` for that row; nothing is filled in here.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub open: f64,
    pub close: f64,
}

/// Which side of a quote a computation read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Open,
    Close,
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceField::Open => write!(f, "open"),
            PriceField::Close => write!(f, "close"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    symbols: Vec<String>,
    columns: Vec<Vec<Option<PriceQuote>>>,
}

impl PriceTable {
    /// Build a table from per-symbol bar lists. Symbols keep the order given;
    /// the timeline is the sorted union of every bar date. A repeated date
    /// within one symbol keeps the last bar seen.
    pub fn from_series(series: Vec<(String, Vec<OhlcvBar>)>) -> Self {
        let dates = build_unified_timeline(&series);
        let index: BTreeMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let mut symbols = Vec::with_capacity(series.len());
        let mut columns = Vec::with_capacity(series.len());
        for (symbol, bars) in series {
            let mut column = vec![None; dates.len()];
            for bar in &bars {
                if let Some(&row) = index.get(&bar.date) {
                    column[row] = Some(bar.quote());
                }
            }
            symbols.push(symbol);
            columns.push(column);
        }

        Self {
            dates,
            symbols,
            columns,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn row_count(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn column(&self, symbol: &str) -> Option<&[Option<PriceQuote>]> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.columns[i].as_slice())
    }

    /// Every symbol paired with its column, in table order.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &[Option<PriceQuote>])> {
        self.symbols
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    /// Observed closes for one symbol, gaps skipped.
    pub fn close_series(&self, symbol: &str) -> Vec<(NaiveDate, f64)> {
        match self.column(symbol) {
            Some(column) => self
                .dates
                .iter()
                .zip(column)
                .filter_map(|(date, q)| q.map(|q| (*date, q.close)))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of rows on which `symbol` has a quote.
    pub fn observations(&self, symbol: &str) -> usize {
        self.column(symbol)
            .map(|c| c.iter().filter(|q| q.is_some()).count())
            .unwrap_or(0)
    }
}

fn build_unified_timeline(series: &[(String, Vec<OhlcvBar>)]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = series
        .iter()
        .flat_map(|(_, bars)| bars.iter().map(|bar| bar.date))
        .collect();
    unique_dates.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bar(symbol: &str, date: &str, close: f64) -> OhlcvBar {
        OhlcvBar {
            symbol: symbol.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1000,
        }
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn timeline_merges_and_sorts() {
        let table = PriceTable::from_series(vec![
            (
                "NVDA".into(),
                vec![
                    make_bar("NVDA", "2024-01-05", 101.0),
                    make_bar("NVDA", "2024-01-02", 100.0),
                ],
            ),
            (
                "MSFT".into(),
                vec![
                    make_bar("MSFT", "2024-01-01", 50.0),
                    make_bar("MSFT", "2024-01-03", 51.0),
                ],
            ),
        ]);

        assert_eq!(
            table.dates(),
            &[d("2024-01-01"), d("2024-01-02"), d("2024-01-03"), d("2024-01-05")]
        );
        assert_eq!(table.symbols(), &["NVDA".to_string(), "MSFT".to_string()]);
    }

    #[test]
    fn missing_days_stay_empty() {
        let table = PriceTable::from_series(vec![
            ("NVDA".into(), vec![make_bar("NVDA", "2024-01-02", 100.0)]),
            ("MSFT".into(), vec![make_bar("MSFT", "2024-01-01", 50.0)]),
        ]);

        let nvda = table.column("NVDA").unwrap();
        assert!(nvda[0].is_none());
        assert_eq!(nvda[1].unwrap().close, 100.0);
        assert_eq!(table.observations("NVDA"), 1);
    }

    #[test]
    fn close_series_skips_gaps() {
        let table = PriceTable::from_series(vec![
            (
                "NVDA".into(),
                vec![
                    make_bar("NVDA", "2024-01-01", 100.0),
                    make_bar("NVDA", "2024-01-03", 102.0),
                ],
            ),
            ("MSFT".into(), vec![make_bar("MSFT", "2024-01-02", 50.0)]),
        ]);

        assert_eq!(
            table.close_series("NVDA"),
            vec![(d("2024-01-01"), 100.0), (d("2024-01-03"), 102.0)]
        );
        assert!(table.close_series("META").is_empty());
    }

    #[test]
    fn empty_series_gives_empty_table() {
        let table = PriceTable::from_series(vec![]);
        assert!(table.is_empty());
        assert_eq!(table.last_date(), None);
    }

    #[test]
    fn repeated_date_keeps_last_bar() {
        let table = PriceTable::from_series(vec![(
            "NVDA".into(),
            vec![
                make_bar("NVDA", "2024-01-01", 100.0),
                make_bar("NVDA", "2024-01-01", 105.0),
            ],
        )]);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.column("NVDA").unwrap()[0].unwrap().close, 105.0);
    }
}
