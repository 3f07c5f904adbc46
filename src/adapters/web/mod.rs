//! Web server adapter.
//!
//! Axum server with an HTMX frontend: one dashboard page whose sections are
//! re-rendered as fragments when the selection changes.

pub mod chart_svg;
mod error;
mod handlers;
mod templates;

pub use error::{WebError, status_from_error};
pub use handlers::*;
pub use templates::*;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::domain::dashboard::{DashboardRequest, ForecastSettings};
use crate::ports::data_port::MarketDataPort;

pub struct AppState {
    pub data_port: Arc<dyn MarketDataPort + Send + Sync>,
    /// Selection used when a request does not name one.
    pub defaults: DashboardRequest,
    pub forecast: ForecastSettings,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::dashboard))
        .route("/forecast", get(handlers::forecast))
        .route("/health", get(handlers::health))
        .nest_service("/static", ServeDir::new("static"))
        .fallback(handlers::not_found)
        .with_state(Arc::new(state))
}

fn is_htmx_request(headers: &axum::http::HeaderMap) -> bool {
    headers.get("HX-Request").is_some()
}
