//! One render's worth of dashboard numbers.
//!
//! A snapshot is rebuilt from scratch for every request: fetch the selected
//! symbols over the lookback window, derive the selected view and the
//! summary metrics, and hand the raw numbers to the presentation layer.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::domain::error::DashboardError;
use crate::domain::forecast::{self, ForecastConfig, ForecastResult};
use crate::domain::lookback::Lookback;
use crate::domain::price_table::PriceTable;
use crate::domain::returns::{
    self, CumulativeReturn, Movers, ReturnsSeries, Volatility,
};
use crate::domain::universe;
use crate::ports::data_port::MarketDataPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    StockPrices,
    DailyReturns,
    MonthlyReturns,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown view '{0}' (expected stock_prices, daily_returns or monthly_returns)")]
pub struct UnknownView(pub String);

impl View {
    pub const ALL: [View; 3] = [View::StockPrices, View::DailyReturns, View::MonthlyReturns];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::StockPrices => "stock_prices",
            View::DailyReturns => "daily_returns",
            View::MonthlyReturns => "monthly_returns",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            View::StockPrices => "Stock Prices",
            View::DailyReturns => "Daily Returns",
            View::MonthlyReturns => "Monthly Returns",
        }
    }

    /// True when table cells are fractional returns rather than prices.
    pub fn is_returns(&self) -> bool {
        !matches!(self, View::StockPrices)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = UnknownView;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "stock_prices" | "prices" => Ok(View::StockPrices),
            "daily_returns" | "daily" => Ok(View::DailyReturns),
            "monthly_returns" | "monthly" => Ok(View::MonthlyReturns),
            _ => Err(UnknownView(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardRequest {
    pub symbols: Vec<String>,
    pub view: View,
    pub lookback: Lookback,
    pub annualize_volatility: bool,
}

impl Default for DashboardRequest {
    fn default() -> Self {
        Self {
            symbols: universe::default_symbols(),
            view: View::DailyReturns,
            lookback: Lookback::Months(3),
            annualize_volatility: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewRow {
    pub date: NaiveDate,
    pub values: Vec<Option<f64>>,
}

/// The selected view as a table, newest date first.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewTable {
    pub view: View,
    pub symbols: Vec<String>,
    pub rows: Vec<ViewRow>,
}

impl ViewTable {
    fn from_prices(prices: &PriceTable) -> Self {
        let rows = prices
            .dates()
            .iter()
            .enumerate()
            .rev()
            .map(|(row, date)| ViewRow {
                date: *date,
                values: prices
                    .iter_columns()
                    .map(|(_, column)| column[row].map(|q| q.close))
                    .collect(),
            })
            .collect();
        Self {
            view: View::StockPrices,
            symbols: prices.symbols().to_vec(),
            rows,
        }
    }

    fn from_returns(view: View, returns: &ReturnsSeries) -> Self {
        let rows = returns
            .dates
            .iter()
            .enumerate()
            .rev()
            .map(|(row, date)| ViewRow {
                date: *date,
                values: returns.values.iter().map(|column| column[row]).collect(),
            })
            .collect();
        Self {
            view,
            symbols: returns.symbols.clone(),
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    pub request: DashboardRequest,
    pub prices: PriceTable,
    pub daily: ReturnsSeries,
    pub table: ViewTable,
    pub cumulative: CumulativeReturn,
    pub volatility: Volatility,
    pub movers: Movers,
    /// Date of the most recent row in the window.
    pub as_of: NaiveDate,
}

/// Fetch the window and compute everything the dashboard shows.
///
/// Any engine error aborts the render; no metric is replaced by a
/// placeholder.
pub fn build_snapshot(
    port: &dyn MarketDataPort,
    request: &DashboardRequest,
    end: NaiveDate,
) -> Result<DashboardSnapshot, DashboardError> {
    info!(
        symbols = %request.symbols.join(","),
        view = %request.view,
        lookback = %request.lookback,
        "building dashboard snapshot"
    );

    let prices = port.fetch(&request.symbols, request.lookback, end)?;
    let as_of = prices
        .last_date()
        .ok_or_else(|| DashboardError::insufficient_rows(0, 1))?;

    let daily = returns::daily_returns(&prices)?;
    let table = match request.view {
        View::StockPrices => ViewTable::from_prices(&prices),
        View::DailyReturns => ViewTable::from_returns(View::DailyReturns, &daily),
        View::MonthlyReturns => {
            ViewTable::from_returns(View::MonthlyReturns, &returns::monthly_returns(&prices)?)
        }
    };
    let cumulative = returns::cumulative_return(&prices)?;
    let volatility = returns::volatility(&daily, request.annualize_volatility)?;
    let movers = returns::top_movers(&returns::intraday_perf_vs_close(&prices)?)?;

    info!(rows = prices.row_count(), %as_of, "dashboard snapshot ready");

    Ok(DashboardSnapshot {
        request: request.clone(),
        prices,
        daily,
        table,
        cumulative,
        volatility,
        movers,
        as_of,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSettings {
    /// Window of closes the model is fitted on.
    pub history: Lookback,
    pub model: ForecastConfig,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            history: Lookback::Years(2),
            model: ForecastConfig::default(),
        }
    }
}

/// Fetch the fitting window for one symbol and run the forecast engine.
pub fn forecast_symbol(
    port: &dyn MarketDataPort,
    symbol: &str,
    settings: &ForecastSettings,
    end: NaiveDate,
) -> Result<ForecastResult, DashboardError> {
    info!(symbol, history = %settings.history, "forecasting");
    let prices = port.fetch(&[symbol.to_string()], settings.history, end)?;
    let history = prices.close_series(symbol);
    forecast::forecast(symbol, &history, &settings.model)
}
