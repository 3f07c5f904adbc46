//! Returns engine: daily and monthly returns, cumulative return, volatility
//! and intraday performance derived from a [`PriceTable`].
//!
//! Every operation is a pure function of its input and runs the same code for
//! one symbol or many. A return that cannot be computed (the first
//! observation of a series, or a date the symbol did not trade) is `None`,
//! never zero. A zero price in a divisor position is reported as
//! [`DashboardError::DivisionByZero`] instead of letting NaN or infinity
//! through.

use chrono::{Datelike, NaiveDate};

use crate::domain::error::DashboardError;
use crate::domain::price_table::{PriceField, PriceQuote, PriceTable};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Returns per date and symbol. `values[s][t]` belongs to `symbols[s]` on
/// `dates[t]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnsSeries {
    pub dates: Vec<NaiveDate>,
    pub symbols: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl ReturnsSeries {
    pub fn get(&self, symbol: &str) -> Option<&[Option<f64>]> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.values[i].as_slice())
    }

    /// Defined returns for one symbol, leading and gap markers dropped.
    pub fn valid(&self, symbol: &str) -> Vec<f64> {
        self.get(symbol)
            .map(|column| column.iter().flatten().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// One scalar per symbol, in table order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SymbolMetric {
    entries: Vec<(String, f64)>,
}

impl SymbolMetric {
    pub fn new(entries: Vec<(String, f64)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(s, v)| (s.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Percentage gain per symbol over the window.
pub type CumulativeReturn = SymbolMetric;
/// Sample standard deviation of returns per symbol.
pub type Volatility = SymbolMetric;
/// Same-day open-to-close change per symbol.
pub type IntradayPerformance = SymbolMetric;

#[derive(Debug, Clone, PartialEq)]
pub struct Mover {
    pub symbol: String,
    pub value: f64,
}

/// Best and worst performer of an [`IntradayPerformance`] map.
#[derive(Debug, Clone, PartialEq)]
pub struct Movers {
    pub best: Mover,
    pub worst: Mover,
}

pub fn daily_returns(prices: &PriceTable) -> Result<ReturnsSeries, DashboardError> {
    require_rows(prices, 2)?;

    let mut values = Vec::with_capacity(prices.symbols().len());
    for (symbol, column) in prices.iter_columns() {
        let closes: Vec<Option<f64>> = column.iter().map(|q| q.map(|q| q.close)).collect();
        values.push(pct_change(symbol, prices.dates(), &closes)?);
    }

    Ok(ReturnsSeries {
        dates: prices.dates().to_vec(),
        symbols: prices.symbols().to_vec(),
        values,
    })
}

/// Month-over-month returns. Each month is represented by the last close at
/// or before its calendar month end, carried forward across gaps, and
/// labelled with that month-end date.
pub fn monthly_returns(prices: &PriceTable) -> Result<ReturnsSeries, DashboardError> {
    require_rows(prices, 2)?;

    let mut month_ends: Vec<NaiveDate> = Vec::new();
    let mut last_row_of_month: Vec<usize> = Vec::new();
    for (row, date) in prices.dates().iter().enumerate() {
        let end = month_end(*date);
        if month_ends.last() == Some(&end) {
            if let Some(last) = last_row_of_month.last_mut() {
                *last = row;
            }
        } else {
            month_ends.push(end);
            last_row_of_month.push(row);
        }
    }

    let mut values = Vec::with_capacity(prices.symbols().len());
    for (symbol, column) in prices.iter_columns() {
        let filled = forward_fill(column);
        let sampled: Vec<Option<f64>> = last_row_of_month.iter().map(|&row| filled[row]).collect();
        values.push(pct_change(symbol, &month_ends, &sampled)?);
    }

    Ok(ReturnsSeries {
        dates: month_ends,
        symbols: prices.symbols().to_vec(),
        values,
    })
}

/// `(last close / first close - 1) * 100` per symbol.
pub fn cumulative_return(prices: &PriceTable) -> Result<CumulativeReturn, DashboardError> {
    require_rows(prices, 2)?;

    let mut entries = Vec::with_capacity(prices.symbols().len());
    for (symbol, column) in prices.iter_columns() {
        let observations = prices.observations(symbol);
        let quoted = |(date, q): (&NaiveDate, &Option<PriceQuote>)| q.map(|q| (*date, q.close));
        let first = prices.dates().iter().zip(column).find_map(quoted);
        let last = prices.dates().iter().zip(column).rev().find_map(quoted);
        let ((first_date, first), (_, last)) = match (first, last) {
            (Some(first), Some(last)) if observations >= 2 => (first, last),
            _ => {
                return Err(DashboardError::InsufficientData {
                    symbol: symbol.to_string(),
                    observations,
                    minimum: 2,
                });
            }
        };
        if first == 0.0 {
            return Err(DashboardError::DivisionByZero {
                symbol: symbol.to_string(),
                date: first_date,
                field: PriceField::Close,
            });
        }
        entries.push((symbol.to_string(), (last / first - 1.0) * 100.0));
    }

    Ok(SymbolMetric::new(entries))
}

/// Sample standard deviation (n - 1) of each symbol's defined returns,
/// scaled by sqrt(252) when `annualize` is set.
pub fn volatility(returns: &ReturnsSeries, annualize: bool) -> Result<Volatility, DashboardError> {
    let mut entries = Vec::with_capacity(returns.symbols.len());
    for symbol in &returns.symbols {
        let valid = returns.valid(symbol);
        if valid.len() < 2 {
            return Err(DashboardError::InsufficientData {
                symbol: symbol.clone(),
                observations: valid.len(),
                minimum: 2,
            });
        }

        let n = valid.len() as f64;
        let mean = valid.iter().sum::<f64>() / n;
        let variance = valid.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let mut stddev = variance.sqrt();
        if annualize {
            stddev *= TRADING_DAYS_PER_YEAR.sqrt();
        }
        entries.push((symbol.clone(), stddev));
    }

    Ok(SymbolMetric::new(entries))
}

/// `(close - open) / close` on each symbol's most recent quote.
pub fn intraday_perf_vs_close(
    prices: &PriceTable,
) -> Result<IntradayPerformance, DashboardError> {
    intraday(prices, PriceField::Close)
}

/// `(close - open) / open` on each symbol's most recent quote.
pub fn intraday_perf_vs_open(
    prices: &PriceTable,
) -> Result<IntradayPerformance, DashboardError> {
    intraday(prices, PriceField::Open)
}

/// Highest and lowest value. Ties go to the alphabetically first symbol.
pub fn top_movers(perf: &IntradayPerformance) -> Result<Movers, DashboardError> {
    let mut sorted: Vec<(&str, f64)> = perf.iter().collect();
    if sorted.is_empty() {
        return Err(DashboardError::insufficient_rows(0, 1));
    }
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut best = sorted[0];
    let mut worst = sorted[0];
    for &(symbol, value) in &sorted[1..] {
        if value > best.1 {
            best = (symbol, value);
        }
        if value < worst.1 {
            worst = (symbol, value);
        }
    }

    Ok(Movers {
        best: Mover {
            symbol: best.0.to_string(),
            value: best.1,
        },
        worst: Mover {
            symbol: worst.0.to_string(),
            value: worst.1,
        },
    })
}

fn intraday(prices: &PriceTable, divisor: PriceField) -> Result<IntradayPerformance, DashboardError> {
    require_rows(prices, 1)?;

    let mut entries = Vec::with_capacity(prices.symbols().len());
    for (symbol, column) in prices.iter_columns() {
        let latest = prices
            .dates()
            .iter()
            .zip(column)
            .rev()
            .find_map(|(date, q)| q.map(|q| (*date, q)));
        let Some((date, PriceQuote { open, close })) = latest else {
            return Err(DashboardError::InsufficientData {
                symbol: symbol.to_string(),
                observations: 0,
                minimum: 1,
            });
        };

        let base = match divisor {
            PriceField::Open => open,
            PriceField::Close => close,
        };
        if base == 0.0 {
            return Err(DashboardError::DivisionByZero {
                symbol: symbol.to_string(),
                date,
                field: divisor,
            });
        }
        entries.push((symbol.to_string(), (close - open) / base));
    }

    Ok(SymbolMetric::new(entries))
}

/// Simple percentage change between consecutive observations. Gaps yield
/// `None` and do not reset the previous observation.
fn pct_change(
    symbol: &str,
    dates: &[NaiveDate],
    closes: &[Option<f64>],
) -> Result<Vec<Option<f64>>, DashboardError> {
    let mut out = Vec::with_capacity(closes.len());
    let mut prev: Option<(NaiveDate, f64)> = None;

    for (date, close) in dates.iter().zip(closes) {
        let Some(close) = *close else {
            out.push(None);
            continue;
        };
        let value = match prev {
            Some((prev_date, p)) => {
                if p == 0.0 {
                    return Err(DashboardError::DivisionByZero {
                        symbol: symbol.to_string(),
                        date: prev_date,
                        field: PriceField::Close,
                    });
                }
                Some(close / p - 1.0)
            }
            None => None,
        };
        out.push(value);
        prev = Some((*date, close));
    }

    Ok(out)
}

fn forward_fill(column: &[Option<PriceQuote>]) -> Vec<Option<f64>> {
    let mut carry = None;
    column
        .iter()
        .map(|q| {
            if let Some(q) = q {
                carry = Some(q.close);
            }
            carry
        })
        .collect()
}

fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

fn require_rows(prices: &PriceTable, minimum: usize) -> Result<(), DashboardError> {
    if prices.row_count() < minimum {
        return Err(DashboardError::insufficient_rows(prices.row_count(), minimum));
    }
    Ok(())
}
