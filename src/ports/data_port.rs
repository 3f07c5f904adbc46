//! Market data port trait.

use chrono::NaiveDate;
use tracing::warn;

use crate::domain::error::DashboardError;
use crate::domain::lookback::Lookback;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::price_table::PriceTable;
use crate::domain::universe;

pub trait MarketDataPort {
    /// Daily bars for one symbol with `start <= date <= end`, ascending.
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, DashboardError>;

    /// Symbols this source can serve.
    fn list_symbols(&self) -> Result<Vec<String>, DashboardError> {
        Ok(universe::default_symbols())
    }

    /// Price table for `symbols` over the `lookback` window ending on `end`.
    ///
    /// Days a symbol did not trade stay missing. Bars with a non-finite open
    /// or close are dropped. A symbol with no usable bar in the window is a
    /// [`DashboardError::DataSource`] failure.
    fn fetch(
        &self,
        symbols: &[String],
        lookback: Lookback,
        end: NaiveDate,
    ) -> Result<PriceTable, DashboardError> {
        let start = lookback.start_date(end);
        let mut series = Vec::with_capacity(symbols.len());

        for symbol in symbols {
            let fetched = self.fetch_bars(symbol, start, end)?;
            let total = fetched.len();
            let bars: Vec<OhlcvBar> = fetched
                .into_iter()
                .filter(|b| b.date >= start && b.date <= end && b.is_finite())
                .collect();
            if bars.len() < total {
                warn!(
                    symbol = %symbol,
                    dropped = total - bars.len(),
                    "dropped bars outside the window or with non-finite prices"
                );
            }
            if bars.is_empty() {
                return Err(DashboardError::DataSource {
                    symbol: symbol.clone(),
                    reason: format!("no bars between {start} and {end}"),
                });
            }
            series.push((symbol.clone(), bars));
        }

        Ok(PriceTable::from_series(series))
    }
}
