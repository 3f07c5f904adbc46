//! HTML templates using Askama, plus the fragments HTMX swaps in.

use askama::Template;
use std::fmt::Write;

use crate::domain::dashboard::{DashboardRequest, DashboardSnapshot, View};
use crate::domain::forecast::ForecastResult;
use crate::domain::universe::UNIVERSE;

use super::chart_svg::{self, Series};

/// Full page shell; `content` is already-rendered HTML.
#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate<'a> {
    pub title: &'a str,
    pub content: &'a str,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub message: &'a str,
    pub status: u16,
}

/// Error body swapped into the HTMX target in place of a fragment.
#[derive(Template)]
#[template(path = "error_fragment.html")]
pub struct ErrorFragmentTemplate<'a> {
    pub message: &'a str,
    pub status: u16,
}

/// Placeholder that loads the forecast once the page is up.
#[derive(Template)]
#[template(path = "forecast_placeholder.html")]
pub struct ForecastPlaceholderTemplate<'a> {
    pub symbol: &'a str,
}

/// Escapes text for HTML output with askama's escaper.
pub(crate) fn escape(raw: &str) -> String {
    askama::filters::escape(askama::Html, raw)
        .map(|markup| markup.to_string())
        .unwrap_or_default()
}

fn percent(value: f64) -> String {
    format!("{:+.2}%", value * 100.0)
}

fn cell(value: Option<f64>, view: View) -> String {
    match value {
        Some(v) if view.is_returns() => percent(v),
        Some(v) => format!("{:.2}", v),
        None => "&ndash;".to_string(),
    }
}

/// Selection form: symbols, view and forecast target.
pub fn controls_fragment(request: &DashboardRequest, forecast_symbol: &str) -> String {
    let mut html = String::from(
        "<form id=\"controls\" hx-get=\"/\" hx-target=\"#dashboard\" hx-swap=\"outerHTML\" hx-trigger=\"change\">",
    );
    html.push_str("<fieldset><legend>Symbols</legend>");
    for symbol in UNIVERSE {
        let checked = if request.symbols.iter().any(|s| s == symbol) {
            " checked"
        } else {
            ""
        };
        let _ = write!(
            html,
            "<label><input type=\"checkbox\" name=\"symbols\" value=\"{symbol}\"{checked}> {symbol}</label>"
        );
    }
    html.push_str("</fieldset><label>View <select name=\"view\">");
    for view in View::ALL {
        let selected = if view == request.view { " selected" } else { "" };
        let _ = write!(
            html,
            "<option value=\"{}\"{}>{}</option>",
            view.as_str(),
            selected,
            view.label()
        );
    }
    html.push_str("</select></label></form>");

    html.push_str(
        "<form id=\"forecast-controls\" hx-get=\"/forecast\" hx-target=\"#forecast\" hx-swap=\"outerHTML\" hx-trigger=\"change\">",
    );
    html.push_str("<label>Forecast <select name=\"symbol\">");
    for symbol in UNIVERSE {
        let selected = if symbol == forecast_symbol { " selected" } else { "" };
        let _ = write!(html, "<option value=\"{symbol}\"{selected}>{symbol}</option>");
    }
    html.push_str("</select></label></form>");
    html
}

pub fn dashboard_fragment(snapshot: &DashboardSnapshot, generated_at: &str) -> String {
    let request = &snapshot.request;
    let mut html = String::from("<div id=\"dashboard\">");
    let _ = write!(
        html,
        "<p class=\"updated\">Last updated {} (prices through {}, lookback {})</p>",
        escape(generated_at),
        snapshot.as_of,
        request.lookback
    );

    let movers = &snapshot.movers;
    let _ = write!(
        html,
        "<section class=\"movers\"><h2>Today's movers</h2><p class=\"best\">Best: <strong>{}</strong> {}</p><p class=\"worst\">Worst: <strong>{}</strong> {}</p></section>",
        movers.best.symbol,
        percent(movers.best.value),
        movers.worst.symbol,
        percent(movers.worst.value)
    );

    html.push_str("<section class=\"metrics\"><h2>Cumulative return</h2>");
    let cumulative: Vec<(&str, f64)> = snapshot.cumulative.iter().collect();
    html.push_str(&chart_svg::bar_chart("Cumulative return", &cumulative, "%"));
    html.push_str("<table><tr><th>Symbol</th><th>Return</th></tr>");
    for (symbol, value) in &cumulative {
        let _ = write!(html, "<tr><td>{}</td><td>{:+.2}%</td></tr>", symbol, value);
    }
    html.push_str("</table>");

    let vol_title = if request.annualize_volatility {
        "Volatility (annualized)"
    } else {
        "Volatility (daily)"
    };
    let _ = write!(html, "<h2>{}</h2>", vol_title);
    let volatility: Vec<(&str, f64)> = snapshot
        .volatility
        .iter()
        .map(|(s, v)| (s, v * 100.0))
        .collect();
    html.push_str(&chart_svg::bar_chart(vol_title, &volatility, "%"));
    html.push_str("<table><tr><th>Symbol</th><th>Volatility</th></tr>");
    for (symbol, value) in &volatility {
        let _ = write!(html, "<tr><td>{}</td><td>{:.2}%</td></tr>", symbol, value);
    }
    html.push_str("</table></section>");

    let table = &snapshot.table;
    let _ = write!(html, "<section class=\"view\"><h2>{}</h2>", table.view.label());
    let (scale, unit) = if table.view.is_returns() { (100.0, "%") } else { (1.0, "") };
    let series: Vec<Series<'_>> = table
        .symbols
        .iter()
        .enumerate()
        .map(|(i, symbol)| Series {
            label: symbol,
            points: table
                .rows
                .iter()
                .rev()
                .filter_map(|row| row.values[i].map(|v| (row.date, v * scale)))
                .collect(),
        })
        .collect();
    html.push_str(&chart_svg::line_chart(table.view.label(), &series, unit));

    html.push_str("<table class=\"view-table\"><tr><th>Date</th>");
    for symbol in &table.symbols {
        let _ = write!(html, "<th>{}</th>", symbol);
    }
    html.push_str("</tr>");
    for row in &table.rows {
        let _ = write!(html, "<tr><td>{}</td>", row.date);
        for value in &row.values {
            let _ = write!(html, "<td>{}</td>", cell(*value, table.view));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table></section></div>");
    html
}

pub fn forecast_fragment(result: &ForecastResult) -> String {
    let mut html = String::from("<div id=\"forecast\">");
    let _ = write!(html, "<h2>{} price forecast</h2>", result.symbol);
    html.push_str(&chart_svg::forecast_chart(result));
    html.push_str(
        "<table class=\"forecast-table\"><tr><th>Date</th><th>Estimate</th><th>Lower</th><th>Upper</th></tr>",
    );
    for p in result.future() {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td></tr>",
            p.date, p.yhat, p.lower, p.upper
        );
    }
    html.push_str("</table></div>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_replaces_markup() {
        let html = escape(r#"<b class="x">Tom & Jerry"#);
        assert_eq!(html, "&lt;b class=&quot;x&quot;&gt;Tom &amp; Jerry");
    }

    #[test]
    fn error_fragment_is_escaped() {
        let html = ErrorFragmentTemplate {
            message: "unknown symbol: <IBM>",
            status: 400,
        }
        .render()
        .unwrap();
        assert!(html.starts_with("<div id=\"error\""));
        assert!(html.contains("Error 400"));
        assert!(html.contains("&lt;IBM&gt;"));
        assert!(!html.contains("<IBM>"));
    }

    #[test]
    fn placeholder_loads_forecast_for_symbol() {
        let html = ForecastPlaceholderTemplate { symbol: "GOOGL" }.render().unwrap();
        assert!(html.starts_with("<div id=\"forecast\""));
        assert!(html.contains("hx-get=\"/forecast?symbol=GOOGL\""));
        assert!(html.contains("hx-trigger=\"load\""));
    }

    #[test]
    fn controls_mark_current_selection() {
        let request = DashboardRequest {
            symbols: vec!["NVDA".into()],
            view: View::MonthlyReturns,
            ..DashboardRequest::default()
        };
        let html = controls_fragment(&request, "META");
        assert!(html.contains("value=\"NVDA\" checked"));
        assert!(!html.contains("value=\"MSFT\" checked"));
        assert!(html.contains("<option value=\"monthly_returns\" selected>"));
        assert!(html.contains("<option value=\"META\" selected>"));
    }

    #[test]
    fn missing_cells_render_as_dash() {
        assert_eq!(cell(None, View::DailyReturns), "&ndash;");
        assert_eq!(cell(Some(0.0123), View::DailyReturns), "+1.23%");
        assert_eq!(cell(Some(101.5), View::StockPrices), "101.50");
    }
}
