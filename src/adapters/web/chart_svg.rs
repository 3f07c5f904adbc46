//! Inline SVG charts for the dashboard and forecast fragments.
//!
//! The x axis is calendar time, so gaps in a series show as gaps in spacing
//! rather than being squeezed out.

use chrono::NaiveDate;
use std::fmt::Write;

use crate::domain::forecast::ForecastResult;

use super::templates::escape;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 260.0;
const PADDING: f64 = 44.0;
const PALETTE: [&str; 5] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd"];

pub struct Series<'a> {
    pub label: &'a str,
    pub points: Vec<(NaiveDate, f64)>,
}

struct Frame {
    x0: NaiveDate,
    span_days: f64,
    y_min: f64,
    y_max: f64,
}

impl Frame {
    fn new(
        dates: impl Iterator<Item = NaiveDate> + Clone,
        values: impl Iterator<Item = f64>,
    ) -> Option<Self> {
        let x0 = dates.clone().min()?;
        let x1 = dates.max()?;
        let (y_min, y_max) = values
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if !y_min.is_finite() {
            return None;
        }
        Some(Self {
            x0,
            span_days: (x1 - x0).num_days() as f64,
            y_min,
            y_max,
        })
    }

    fn plot_width() -> f64 {
        WIDTH - 2.0 * PADDING
    }

    fn plot_height() -> f64 {
        HEIGHT - 2.0 * PADDING
    }

    fn x(&self, date: NaiveDate) -> f64 {
        if self.span_days > 0.0 {
            PADDING + (date - self.x0).num_days() as f64 / self.span_days * Self::plot_width()
        } else {
            PADDING + Self::plot_width() / 2.0
        }
    }

    fn y(&self, value: f64) -> f64 {
        let range = self.y_max - self.y_min;
        if range > 0.0 {
            HEIGHT - PADDING - (value - self.y_min) / range * Self::plot_height()
        } else {
            HEIGHT / 2.0
        }
    }

    fn polyline(&self, points: &[(NaiveDate, f64)]) -> String {
        points
            .iter()
            .map(|&(d, v)| format!("{:.1},{:.1}", self.x(d), self.y(v)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn axes(&self, svg: &mut String, unit: &str) {
        let bottom = HEIGHT - PADDING;
        let _ = write!(
            svg,
            r##"<line x1="{p:.0}" y1="{p:.0}" x2="{p:.0}" y2="{b:.0}" stroke="#999"/><line x1="{p:.0}" y1="{b:.0}" x2="{r:.0}" y2="{b:.0}" stroke="#999"/>"##,
            p = PADDING,
            b = bottom,
            r = WIDTH - PADDING,
        );
        let _ = write!(
            svg,
            r#"<text x="4" y="{:.1}" font-size="10">{:.2}{}</text><text x="4" y="{:.1}" font-size="10">{:.2}{}</text>"#,
            self.y(self.y_max) + 4.0,
            self.y_max,
            unit,
            self.y(self.y_min),
            self.y_min,
            unit,
        );
        let last = self.x0 + chrono::Duration::days(self.span_days as i64);
        let _ = write!(
            svg,
            r#"<text x="{:.0}" y="{:.0}" font-size="10">{}</text><text x="{:.0}" y="{:.0}" font-size="10" text-anchor="end">{}</text>"#,
            PADDING,
            bottom + 16.0,
            self.x0,
            WIDTH - PADDING,
            bottom + 16.0,
            last,
        );
    }
}

fn open_svg(title: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}" width="{WIDTH:.0}" height="{HEIGHT:.0}" role="img" aria-label="{t}"><title>{t}</title><rect width="100%" height="100%" fill="white"/>"#,
        t = escape(title),
    )
}

fn empty(title: &str) -> String {
    format!("<p class=\"empty\">No data available for {}.</p>", escape(title))
}

/// One line per series, with a legend across the top.
pub fn line_chart(title: &str, series: &[Series<'_>], unit: &str) -> String {
    let all = series.iter().flat_map(|s| s.points.iter());
    let Some(frame) = Frame::new(all.clone().map(|p| p.0), all.map(|p| p.1)) else {
        return empty(title);
    };

    let mut svg = open_svg(title);
    frame.axes(&mut svg, unit);
    for (i, s) in series.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let _ = write!(
            svg,
            r#"<polyline fill="none" stroke="{}" stroke-width="1.5" points="{}"/><text x="{:.0}" y="14" font-size="11" fill="{}">{}</text>"#,
            color,
            frame.polyline(&s.points),
            PADDING + i as f64 * 80.0,
            color,
            escape(s.label),
        );
    }
    svg.push_str("</svg>");
    svg
}

/// Vertical bars around a zero baseline.
pub fn bar_chart(title: &str, bars: &[(&str, f64)], unit: &str) -> String {
    if bars.is_empty() || bars.iter().any(|(_, v)| !v.is_finite()) {
        return empty(title);
    }

    let lo = bars.iter().map(|b| b.1).fold(0.0_f64, f64::min);
    let hi = bars.iter().map(|b| b.1).fold(0.0_f64, f64::max);
    let range = if hi > lo { hi - lo } else { 1.0 };
    let plot_height = HEIGHT - 2.0 * PADDING;
    let y = |v: f64| HEIGHT - PADDING - (v - lo) / range * plot_height;
    let slot = (WIDTH - 2.0 * PADDING) / bars.len() as f64;

    let mut svg = open_svg(title);
    let baseline = y(0.0);
    let _ = write!(
        svg,
        r##"<line x1="{:.0}" y1="{:.1}" x2="{:.0}" y2="{:.1}" stroke="#999"/>"##,
        PADDING,
        baseline,
        WIDTH - PADDING,
        baseline,
    );

    for (i, (label, value)) in bars.iter().enumerate() {
        let color = if *value >= 0.0 { "#2ca02c" } else { "#d62728" };
        let x = PADDING + i as f64 * slot + slot * 0.2;
        let top = y(*value).min(baseline);
        let height = (y(*value) - baseline).abs();
        let _ = write!(
            svg,
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"/><text x="{:.1}" y="{:.0}" font-size="11" text-anchor="middle">{}</text><text x="{:.1}" y="{:.1}" font-size="10" text-anchor="middle">{:.2}{}</text>"#,
            x,
            top,
            slot * 0.6,
            height,
            color,
            x + slot * 0.3,
            HEIGHT - PADDING + 16.0,
            escape(label),
            x + slot * 0.3,
            top - 4.0,
            value,
            unit,
        );
    }
    svg.push_str("</svg>");
    svg
}

/// Observed closes, fitted line and the shaded uncertainty band, with a
/// marker where the history ends.
pub fn forecast_chart(result: &ForecastResult) -> String {
    let title = format!("{} forecast", result.symbol);
    let points = &result.points;
    let values = points
        .iter()
        .flat_map(|p| [p.lower, p.upper].into_iter().chain(p.observed));
    let Some(frame) = Frame::new(points.iter().map(|p| p.date), values) else {
        return empty(&title);
    };

    let mut svg = open_svg(&title);
    frame.axes(&mut svg, "");

    let upper: Vec<(NaiveDate, f64)> = points.iter().map(|p| (p.date, p.upper)).collect();
    let lower: Vec<(NaiveDate, f64)> = points.iter().rev().map(|p| (p.date, p.lower)).collect();
    let _ = write!(
        svg,
        r##"<polygon fill="#1f77b4" fill-opacity="0.2" stroke="none" points="{} {}"/>"##,
        frame.polyline(&upper),
        frame.polyline(&lower),
    );

    let observed: Vec<(NaiveDate, f64)> = points
        .iter()
        .filter_map(|p| p.observed.map(|v| (p.date, v)))
        .collect();
    let fitted: Vec<(NaiveDate, f64)> = points.iter().map(|p| (p.date, p.yhat)).collect();
    let _ = write!(
        svg,
        r##"<polyline fill="none" stroke="#444" stroke-width="1" points="{}"/><polyline fill="none" stroke="#1f77b4" stroke-width="1.5" points="{}"/>"##,
        frame.polyline(&observed),
        frame.polyline(&fitted),
    );

    if let Some(last) = result.last_observed() {
        let x = frame.x(last);
        let _ = write!(
            svg,
            r##"<line x1="{x:.1}" y1="{:.0}" x2="{x:.1}" y2="{:.0}" stroke="#d62728" stroke-dasharray="4 3"/>"##,
            PADDING,
            HEIGHT - PADDING,
        );
    }

    svg.push_str("</svg>");
    svg
}
