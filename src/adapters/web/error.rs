//! HTTP error responses for the web adapter.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::warn;

use crate::domain::error::DashboardError;

use super::templates::{ErrorFragmentTemplate, ErrorTemplate};

const RESWAP_HEADER: &str = "HX-Reswap";

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
    /// Render only the error fragment (HTMX swap) instead of a full page.
    pub fragment: bool,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fragment: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn htmx(mut self, fragment: bool) -> Self {
        self.fragment = fragment;
        self
    }
}

pub fn status_from_error(err: &DashboardError) -> StatusCode {
    match err {
        DashboardError::ConfigInvalid { .. }
        | DashboardError::ConfigParse { .. }
        | DashboardError::Universe(_) => StatusCode::BAD_REQUEST,
        DashboardError::InsufficientData { .. }
        | DashboardError::InsufficientHistory { .. }
        | DashboardError::DivisionByZero { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        DashboardError::DataSource { .. } => StatusCode::BAD_GATEWAY,
        DashboardError::Forecasting { .. } | DashboardError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<DashboardError> for WebError {
    fn from(err: DashboardError) -> Self {
        Self::new(status_from_error(&err), err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        warn!(status = self.status.as_u16(), message = %self.message, "request failed");
        let status = self.status.as_u16();
        if self.fragment {
            let template = ErrorFragmentTemplate {
                message: &self.message,
                status,
            };
            // Swap inside the target so the container survives for the next request.
            let headers = [(RESWAP_HEADER, "innerHTML")];
            return match template.render() {
                Ok(html) => (self.status, headers, Html(html)).into_response(),
                Err(_) => (self.status, headers, self.message).into_response(),
            };
        }
        let template = ErrorTemplate {
            message: &self.message,
            status,
        };
        match template.render() {
            Ok(html) => (self.status, Html(html)).into_response(),
            Err(_) => (self.status, self.message).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::forecast::FitError;
    use crate::domain::universe::UniverseError;

    #[test]
    fn statuses_follow_error_category() {
        let cases = [
            (
                DashboardError::Universe(UniverseError::UnknownSymbol("IBM".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                DashboardError::InsufficientHistory {
                    symbol: "NVDA".into(),
                    observations: 10,
                    required: 252,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                DashboardError::DataSource {
                    symbol: "NVDA".into(),
                    reason: "timeout".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                DashboardError::Forecasting {
                    symbol: "NVDA".into(),
                    source: FitError::ZeroSpan,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(WebError::from(err).status, status);
        }
    }

    #[test]
    fn fragment_error_swaps_inside_target() {
        let response = WebError::bad_request("no symbols selected")
            .htmx(true)
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(RESWAP_HEADER).unwrap(),
            "innerHTML"
        );
    }

    #[test]
    fn full_page_error_has_no_swap_header() {
        let response = WebError::not_found("page not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(RESWAP_HEADER).is_none());
    }
}
