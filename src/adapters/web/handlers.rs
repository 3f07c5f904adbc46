//! HTTP request handlers for web adapter.

use askama::Template;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
};
use chrono::Local;
use std::sync::Arc;
use tracing::info;

use crate::domain::dashboard::{self, DashboardRequest, View};
use crate::domain::error::DashboardError;
use crate::domain::lookback::Lookback;
use crate::domain::universe::{parse_symbol, parse_symbols};

use super::templates::{self, ForecastPlaceholderTemplate, PageTemplate};
use super::{is_htmx_request, AppState, WebError};

fn respond(htmx: bool, title: &str, fragment: String) -> Result<Response, WebError> {
    if htmx {
        return Ok(Html(fragment).into_response());
    }
    let page = PageTemplate {
        title,
        content: &fragment,
    };
    let html = page
        .render()
        .map_err(|e| WebError::internal(format!("template error: {e}")))?;
    Ok(Html(html).into_response())
}

/// Overlay query parameters on the configured defaults. `symbols` may repeat
/// (one checkbox each) or carry a comma-separated list.
///
/// A form submission (`submitted`) with every checkbox cleared is an empty
/// selection, not a request for the defaults.
pub fn dashboard_request(
    defaults: &DashboardRequest,
    params: &[(String, String)],
    submitted: bool,
) -> Result<DashboardRequest, WebError> {
    let mut request = defaults.clone();

    let symbols: Vec<&str> = params
        .iter()
        .filter(|(k, _)| k == "symbols")
        .map(|(_, v)| v.as_str())
        .collect();
    if !symbols.is_empty() || submitted {
        request.symbols = parse_symbols(&symbols.join(","))
            .map_err(|e| WebError::from(DashboardError::from(e)))?;
    }

    for (key, value) in params {
        match key.as_str() {
            "view" => {
                request.view = value
                    .parse::<View>()
                    .map_err(|e| WebError::bad_request(e.to_string()))?;
            }
            "lookback" => {
                request.lookback = value
                    .parse::<Lookback>()
                    .map_err(|e| WebError::bad_request(e.to_string()))?;
            }
            _ => {}
        }
    }

    Ok(request)
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let htmx = is_htmx_request(&headers);
    let request = dashboard_request(&state.defaults, &params, htmx).map_err(|e| e.htmx(htmx))?;

    let port = Arc::clone(&state.data_port);
    let today = Local::now().date_naive();
    let job = request.clone();
    let snapshot = tokio::task::spawn_blocking(move || {
        dashboard::build_snapshot(port.as_ref(), &job, today)
    })
    .await
    .map_err(|e| WebError::internal(format!("dashboard task failed: {e}")).htmx(htmx))?
    .map_err(|e| WebError::from(e).htmx(htmx))?;

    let generated_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let fragment = templates::dashboard_fragment(&snapshot, &generated_at);
    info!(symbols = snapshot.request.symbols.len(), view = %snapshot.request.view, "dashboard rendered");

    if htmx {
        return respond(true, "Dashboard", fragment);
    }

    let forecast_symbol = request
        .symbols
        .first()
        .cloned()
        .unwrap_or_else(|| "NVDA".to_string());
    let mut content = templates::controls_fragment(&request, &forecast_symbol);
    content.push_str(&fragment);
    let placeholder = ForecastPlaceholderTemplate {
        symbol: &forecast_symbol,
    }
    .render()
    .map_err(|e| WebError::internal(format!("template error: {e}")))?;
    content.push_str(&placeholder);
    respond(false, "Dashboard", content)
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct ForecastQuery {
    pub symbol: Option<String>,
}

pub async fn forecast(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ForecastQuery>,
) -> Result<Response, WebError> {
    let htmx = is_htmx_request(&headers);
    let symbol = match query.symbol.as_deref() {
        Some(raw) => parse_symbol(raw).map_err(|e| WebError::from(DashboardError::from(e)).htmx(htmx))?,
        None => state
            .defaults
            .symbols
            .first()
            .cloned()
            .ok_or_else(|| WebError::bad_request("symbol is required").htmx(htmx))?,
    };

    let port = Arc::clone(&state.data_port);
    let settings = state.forecast.clone();
    let today = Local::now().date_naive();
    let target = symbol.clone();
    let result = tokio::task::spawn_blocking(move || {
        dashboard::forecast_symbol(port.as_ref(), &target, &settings, today)
    })
    .await
    .map_err(|e| WebError::internal(format!("forecast task failed: {e}")).htmx(htmx))?
    .map_err(|e| WebError::from(e).htmx(htmx))?;

    info!(symbol = %symbol, points = result.points.len(), "forecast rendered");
    respond(htmx, "Forecast", templates::forecast_fragment(&result))
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn not_found(headers: HeaderMap) -> WebError {
    WebError::not_found("page not found").htmx(is_htmx_request(&headers))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn no_params_keeps_defaults() {
        let defaults = DashboardRequest::default();
        assert_eq!(dashboard_request(&defaults, &[], false).unwrap(), defaults);
    }

    #[test]
    fn repeated_and_comma_separated_symbols_merge() {
        let request = dashboard_request(
            &DashboardRequest::default(),
            &params(&[("symbols", "nvda"), ("symbols", "MSFT,META"), ("view", "monthly_returns")]),
            true,
        )
        .unwrap();
        assert_eq!(request.symbols, vec!["NVDA", "MSFT", "META"]);
        assert_eq!(request.view, View::MonthlyReturns);
    }

    #[test]
    fn unknown_symbol_is_bad_request() {
        let err = dashboard_request(&DashboardRequest::default(), &params(&[("symbols", "TSLA")]), false)
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn bad_view_is_bad_request() {
        let err = dashboard_request(&DashboardRequest::default(), &params(&[("view", "candles")]), false)
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
        assert!(err.message.contains("candles"));
    }

    #[test]
    fn cleared_form_is_empty_selection() {
        let err = dashboard_request(
            &DashboardRequest::default(),
            &params(&[("view", "daily_returns")]),
            true,
        )
        .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "no symbols selected");
    }

    #[test]
    fn plain_link_without_symbols_keeps_defaults() {
        let defaults = DashboardRequest::default();
        let request =
            dashboard_request(&defaults, &params(&[("view", "stock_prices")]), false).unwrap();
        assert_eq!(request.symbols, defaults.symbols);
        assert_eq!(request.view, View::StockPrices);
    }
}
