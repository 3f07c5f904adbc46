//! Core domain types and logic: price tables, the returns and forecast
//! engines, and dashboard assembly.

pub mod ohlcv;
pub mod price_table;
pub mod lookback;
pub mod universe;
pub mod returns;
pub mod forecast;
pub mod dashboard;
pub mod config_validation;
pub mod error;
