//! CSV file market data adapter.
//!
//! One file per symbol, `<dir>/<SYMBOL>.csv`, with a header row. Columns are
//! located by name (`date`, `open`, `high`, `low`, `close`, `volume`, any
//! case), so vendor downloads with extra columns such as `Adj Close` load
//! as-is. `volume` is optional.

use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::domain::error::DashboardError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::MarketDataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn data_error(symbol: &str, reason: impl Into<String>) -> DashboardError {
    DashboardError::DataSource {
        symbol: symbol.to_string(),
        reason: reason.into(),
    }
}

fn locate_columns(symbol: &str, headers: &csv::StringRecord) -> Result<Columns, DashboardError> {
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };
    let require = |name: &str| {
        find(name).ok_or_else(|| data_error(symbol, format!("missing {} column", name)))
    };

    Ok(Columns {
        date: require("date")?,
        open: require("open")?,
        high: require("high")?,
        low: require("low")?,
        close: require("close")?,
        volume: find("volume"),
    })
}

fn parse_price(
    symbol: &str,
    record: &csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<f64, DashboardError> {
    let raw = record
        .get(index)
        .ok_or_else(|| data_error(symbol, format!("missing {} value", name)))?;
    raw.trim()
        .parse()
        .map_err(|e| data_error(symbol, format!("invalid {} value '{}': {}", name, raw, e)))
}

impl MarketDataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, DashboardError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_error(symbol, format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| data_error(symbol, format!("CSV header error: {}", e)))?
            .clone();
        let columns = locate_columns(symbol, &headers)?;
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| data_error(symbol, format!("CSV parse error: {}", e)))?;

            let date_str = record
                .get(columns.date)
                .ok_or_else(|| data_error(symbol, "missing date value"))?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
                .map_err(|e| data_error(symbol, format!("invalid date format: {}", e)))?;

            if date < start || date > end {
                continue;
            }

            let volume = match columns.volume {
                Some(index) => {
                    let raw = record.get(index).unwrap_or("0").trim();
                    raw.parse::<f64>()
                        .map(|v| v.max(0.0) as u64)
                        .map_err(|e| data_error(symbol, format!("invalid volume value: {}", e)))?
                }
                None => 0,
            };

            bars.push(OhlcvBar {
                symbol: symbol.to_string(),
                date,
                open: parse_price(symbol, &record, columns.open, "open")?,
                high: parse_price(symbol, &record, columns.high, "high")?,
                low: parse_price(symbol, &record, columns.low, "low")?,
                close: parse_price(symbol, &record, columns.close, "close")?,
                volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        debug!(symbol, bars = bars.len(), path = %path.display(), "loaded CSV bars");
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, DashboardError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(
                "all",
                format!("failed to read directory {}: {}", self.base_path.display(), e),
            )
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_error("all", format!("directory entry error: {}", e)))?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_uppercase());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
