//! Domain error types.

use chrono::NaiveDate;

use crate::domain::forecast::FitError;
use crate::domain::price_table::PriceField;
use crate::domain::universe::UniverseError;

/// Top-level error type for stockdash.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("data source error for {symbol}: {reason}")]
    DataSource { symbol: String, reason: String },

    #[error("insufficient data for {symbol}: have {observations} observations, need {minimum}")]
    InsufficientData {
        symbol: String,
        observations: usize,
        minimum: usize,
    },

    #[error("division by zero: {field} price of {symbol} on {date} is 0")]
    DivisionByZero {
        symbol: String,
        date: NaiveDate,
        field: PriceField,
    },

    #[error(
        "insufficient history to forecast {symbol}: have {observations} observations, need {required}"
    )]
    InsufficientHistory {
        symbol: String,
        observations: usize,
        required: usize,
    },

    #[error("forecast for {symbol} failed: {source}")]
    Forecasting {
        symbol: String,
        #[source]
        source: FitError,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Universe(#[from] UniverseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    /// Table-wide shortage, used when the whole window is too short.
    pub fn insufficient_rows(observations: usize, minimum: usize) -> Self {
        DashboardError::InsufficientData {
            symbol: "all".to_string(),
            observations,
            minimum,
        }
    }
}

impl From<&DashboardError> for std::process::ExitCode {
    fn from(err: &DashboardError) -> Self {
        let code: u8 = match err {
            DashboardError::Io(_) => 1,
            DashboardError::ConfigParse { .. }
            | DashboardError::ConfigInvalid { .. }
            | DashboardError::Universe(_) => 2,
            DashboardError::DataSource { .. } => 3,
            DashboardError::InsufficientData { .. }
            | DashboardError::InsufficientHistory { .. } => 5,
            DashboardError::DivisionByZero { .. } | DashboardError::Forecasting { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn forecasting_error_keeps_cause() {
        let err = DashboardError::Forecasting {
            symbol: "NVDA".into(),
            source: FitError::NotPositiveDefinite { pivot: 3 },
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("NVDA"));
    }

    #[test]
    fn division_by_zero_names_field() {
        let err = DashboardError::DivisionByZero {
            symbol: "MSFT".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            field: PriceField::Open,
        };
        assert_eq!(
            err.to_string(),
            "division by zero: open price of MSFT on 2024-03-01 is 0"
        );
    }

    #[test]
    fn config_errors_exit_with_2() {
        use std::process::ExitCode;
        let parse = DashboardError::ConfigParse {
            file: "stockdash.ini".into(),
            reason: "bad section".into(),
        };
        let invalid = DashboardError::ConfigInvalid {
            section: "forecast".into(),
            key: "horizon_days".into(),
            reason: "not a whole number".into(),
        };
        let universe = DashboardError::Universe(UniverseError::NoSymbols);
        for err in [&parse, &invalid, &universe] {
            assert_eq!(ExitCode::from(err), ExitCode::from(2));
        }
    }

    #[test]
    fn insufficient_rows_uses_all_marker() {
        let err = DashboardError::insufficient_rows(1, 2);
        assert!(matches!(
            err,
            DashboardError::InsufficientData { ref symbol, observations: 1, minimum: 2 } if symbol == "all"
        ));
    }
}
