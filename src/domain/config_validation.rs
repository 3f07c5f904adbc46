//! Configuration validation.
//!
//! Every key is optional and falls back to its default; a key that is present
//! must hold a usable value.

use std::str::FromStr;

use crate::domain::dashboard::View;
use crate::domain::error::DashboardError;
use crate::domain::lookback::Lookback;
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;

pub fn validate_dashboard_config(config: &dyn ConfigPort) -> Result<(), DashboardError> {
    validate_symbols(config)?;
    validate_parsed::<View>(config, "dashboard", "view")?;
    validate_parsed::<Lookback>(config, "dashboard", "lookback")?;
    validate_flag(config, "dashboard", "annualize_volatility")?;
    validate_data_source(config)?;
    Ok(())
}

pub fn validate_forecast_config(config: &dyn ConfigPort) -> Result<(), DashboardError> {
    validate_parsed::<Lookback>(config, "forecast", "history")?;
    validate_horizon(config)?;
    validate_positive(config, "changepoint_prior_scale")?;
    validate_positive(config, "seasonality_prior_scale")?;
    validate_changepoints(config)?;
    validate_fraction(config, "changepoint_range", true)?;
    validate_fraction(config, "interval_width", false)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> DashboardError {
    DashboardError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), DashboardError> {
    if let Some(raw) = config.get_string("dashboard", "symbols") {
        parse_symbols(&raw).map_err(|e| invalid("dashboard", "symbols", e.to_string()))?;
    }
    Ok(())
}

fn validate_parsed<T>(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), DashboardError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = config.get_string(section, key) {
        raw.parse::<T>()
            .map_err(|e| invalid(section, key, e.to_string()))?;
    }
    Ok(())
}

fn validate_flag(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), DashboardError> {
    match config.get_string(section, key) {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "false" | "no" | "0" => Ok(()),
            _ => Err(invalid(section, key, format!("'{raw}' is not a boolean"))),
        },
        None => Ok(()),
    }
}

fn validate_data_source(config: &dyn ConfigPort) -> Result<(), DashboardError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "yahoo".to_string());
    match source.trim().to_lowercase().as_str() {
        "yahoo" => Ok(()),
        "csv" => match config.get_string("data", "csv_dir") {
            Some(dir) if dir.trim().is_empty() => {
                Err(invalid("data", "csv_dir", "csv_dir must not be empty"))
            }
            _ => Ok(()),
        },
        other => Err(invalid(
            "data",
            "source",
            format!("unknown source '{other}' (expected yahoo or csv)"),
        )),
    }
}

fn number(config: &dyn ConfigPort, key: &str) -> Result<Option<f64>, DashboardError> {
    match config.get_string("forecast", key) {
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| invalid("forecast", key, format!("'{raw}' is not a number"))),
        None => Ok(None),
    }
}

/// Integer keys are read back with `get_int`, so `45.0` is rejected here
/// rather than silently replaced by the default.
fn whole_number(config: &dyn ConfigPort, key: &str) -> Result<Option<i64>, DashboardError> {
    match config.get_string("forecast", key) {
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| invalid("forecast", key, format!("'{raw}' is not a whole number"))),
        None => Ok(None),
    }
}

fn validate_horizon(config: &dyn ConfigPort) -> Result<(), DashboardError> {
    if let Some(value) = whole_number(config, "horizon_days")? {
        if !(1..=365).contains(&value) {
            return Err(invalid(
                "forecast",
                "horizon_days",
                "horizon_days must be between 1 and 365",
            ));
        }
    }
    Ok(())
}

fn validate_positive(config: &dyn ConfigPort, key: &str) -> Result<(), DashboardError> {
    if let Some(value) = number(config, key)? {
        if !(value.is_finite() && value > 0.0) {
            return Err(invalid("forecast", key, format!("{key} must be positive")));
        }
    }
    Ok(())
}

fn validate_changepoints(config: &dyn ConfigPort) -> Result<(), DashboardError> {
    if let Some(value) = whole_number(config, "n_changepoints")? {
        if value < 0 {
            return Err(invalid(
                "forecast",
                "n_changepoints",
                "n_changepoints must not be negative",
            ));
        }
    }
    Ok(())
}

/// Values in `(0, 1)`, or `(0, 1]` when `inclusive`.
fn validate_fraction(config: &dyn ConfigPort, key: &str, inclusive: bool) -> Result<(), DashboardError> {
    if let Some(value) = number(config, key)? {
        let in_range = value > 0.0 && (value < 1.0 || (inclusive && value == 1.0));
        if !in_range {
            let bound = if inclusive { "(0, 1]" } else { "(0, 1)" };
            return Err(invalid("forecast", key, format!("{key} must lie in {bound}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn invalid_key(err: DashboardError) -> String {
        match err {
            DashboardError::ConfigInvalid { key, .. } => key,
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = make_config("");
        assert!(validate_dashboard_config(&config).is_ok());
        assert!(validate_forecast_config(&config).is_ok());
    }

    #[test]
    fn valid_dashboard_config_passes() {
        let config = make_config(
            r#"
[dashboard]
symbols = NVDA, msft ,META
view = monthly_returns
lookback = 6mo
annualize_volatility = yes

[data]
source = csv
csv_dir = /var/lib/prices
"#,
        );
        assert!(validate_dashboard_config(&config).is_ok());
    }

    #[test]
    fn unknown_symbol_fails() {
        let config = make_config("[dashboard]\nsymbols = NVDA,TSLA\n");
        let err = validate_dashboard_config(&config).unwrap_err();
        assert_eq!(invalid_key(err), "symbols");
    }

    #[test]
    fn unknown_view_fails() {
        let config = make_config("[dashboard]\nview = candles\n");
        assert_eq!(invalid_key(validate_dashboard_config(&config).unwrap_err()), "view");
    }

    #[test]
    fn bad_lookback_fails() {
        let config = make_config("[dashboard]\nlookback = 3 weeks\n");
        assert_eq!(invalid_key(validate_dashboard_config(&config).unwrap_err()), "lookback");
    }

    #[test]
    fn non_boolean_flag_fails() {
        let config = make_config("[dashboard]\nannualize_volatility = maybe\n");
        assert_eq!(
            invalid_key(validate_dashboard_config(&config).unwrap_err()),
            "annualize_volatility"
        );
    }

    #[test]
    fn unknown_data_source_fails() {
        let config = make_config("[data]\nsource = bloomberg\n");
        assert_eq!(invalid_key(validate_dashboard_config(&config).unwrap_err()), "source");
    }

    #[test]
    fn valid_forecast_config_passes() {
        let config = make_config(
            r#"
[forecast]
history = 3y
horizon_days = 60
changepoint_prior_scale = 0.05
seasonality_prior_scale = 5
n_changepoints = 10
changepoint_range = 1.0
interval_width = 0.95
"#,
        );
        assert!(validate_forecast_config(&config).is_ok());
    }

    #[test]
    fn horizon_out_of_range_fails() {
        for raw in ["0", "400", "2.5", "soon"] {
            let config = make_config(&format!("[forecast]\nhorizon_days = {raw}\n"));
            assert_eq!(
                invalid_key(validate_forecast_config(&config).unwrap_err()),
                "horizon_days"
            );
        }
    }

    #[test]
    fn prior_scales_must_be_positive() {
        let config = make_config("[forecast]\nchangepoint_prior_scale = 0\n");
        assert_eq!(
            invalid_key(validate_forecast_config(&config).unwrap_err()),
            "changepoint_prior_scale"
        );
        let config = make_config("[forecast]\nseasonality_prior_scale = -1\n");
        assert_eq!(
            invalid_key(validate_forecast_config(&config).unwrap_err()),
            "seasonality_prior_scale"
        );
    }

    #[test]
    fn integer_keys_reject_decimal_notation() {
        for (key, raw) in [("horizon_days", "45.0"), ("n_changepoints", "10.0")] {
            let config = make_config(&format!("[forecast]\n{key} = {raw}\n"));
            let err = validate_forecast_config(&config).unwrap_err();
            match err {
                DashboardError::ConfigInvalid { key: k, reason, .. } => {
                    assert_eq!(k, key);
                    assert!(reason.contains("whole number"));
                }
                other => panic!("expected ConfigInvalid, got {other:?}"),
            }
        }
    }

    #[test]
    fn negative_changepoints_fail() {
        let config = make_config("[forecast]\nn_changepoints = -3\n");
        assert_eq!(
            invalid_key(validate_forecast_config(&config).unwrap_err()),
            "n_changepoints"
        );
    }

    #[test]
    fn interval_width_excludes_one() {
        let config = make_config("[forecast]\ninterval_width = 1.0\n");
        assert_eq!(
            invalid_key(validate_forecast_config(&config).unwrap_err()),
            "interval_width"
        );
        let config = make_config("[forecast]\nchangepoint_range = 1.0\n");
        assert!(validate_forecast_config(&config).is_ok());
    }
}
