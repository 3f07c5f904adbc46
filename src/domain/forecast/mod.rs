//! Forecast engine: an additive trend + seasonality regression fitted to one
//! symbol's close prices and extrapolated a fixed number of calendar days.
//!
//! The model is
//!
//! ```text
//! y(t) = m + k t + sum_j d_j (t - s_j)+ + sum_p sum_n [a_pn sin(2 pi n day / P) + b_pn cos(2 pi n day / P)]
//! ```
//!
//! with time `t` scaled to `[0, 1]` over the history, `day` counted in
//! calendar days since the first observation and prices scaled by their
//! maximum. Slope adjustments `d_j` and the Fourier coefficients get Gaussian
//! priors (scales `changepoint_prior_scale` and `seasonality_prior_scale`), so
//! the maximum a-posteriori fit is a ridge regression.
//!
//! Uncertainty: fitted rows carry the residual noise. Future rows add a
//! random-walk term that grows with the number of days ahead, plus the
//! variance of trend changes expected over the extrapolated stretch
//! (changepoint rate times twice the squared mean absolute slope adjustment,
//! integrated over the horizon). Intervals therefore widen strictly with the
//! horizon.

mod design;
mod solver;

use chrono::{Days, NaiveDate};
use ndarray::{Array1, s};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

use crate::domain::error::DashboardError;

use design::Design;

/// Smallest noise standard deviation, in units of the largest price.
const NOISE_FLOOR: f64 = 1e-2;

#[derive(Debug, Clone, PartialEq)]
pub struct Seasonality {
    pub name: String,
    /// Cycle length in days.
    pub period: f64,
    pub fourier_order: usize,
}

impl Seasonality {
    pub fn new(name: &str, period: f64, fourier_order: usize) -> Self {
        Self {
            name: name.to_string(),
            period,
            fourier_order,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastConfig {
    pub horizon_days: u32,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub n_changepoints: usize,
    pub changepoint_range: f64,
    pub interval_width: f64,
    pub seasonalities: Vec<Seasonality>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_days: 30,
            changepoint_prior_scale: 0.3,
            seasonality_prior_scale: 10.0,
            n_changepoints: 25,
            changepoint_range: 0.8,
            interval_width: 0.8,
            seasonalities: vec![
                Seasonality::new("weekly", 5.0, 3),
                Seasonality::new("monthly", 21.0, 5),
                Seasonality::new("quarterly", 62.0, 20),
                Seasonality::new("yearly", 252.0, 25),
            ],
        }
    }
}

impl ForecastConfig {
    /// Observations needed to see one full cycle of the longest seasonality.
    pub fn min_observations(&self) -> usize {
        let longest = self
            .seasonalities
            .iter()
            .map(|s| s.period)
            .fold(0.0_f64, f64::max);
        (longest.ceil() as usize).max(2)
    }
}

/// Cause of a failed fit.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("history dates are not strictly increasing at {date}")]
    UnorderedHistory { date: NaiveDate },

    #[error("non-finite price on {date}")]
    NonFiniteInput { date: NaiveDate },

    #[error("history covers a single day")]
    ZeroSpan,

    #[error("every price in the history is zero")]
    ZeroScale,

    #[error("normal equations are not positive definite (pivot {pivot})")]
    NotPositiveDefinite { pivot: usize },

    #[error("model produced a non-finite estimate for {date}")]
    NonFiniteOutput { date: NaiveDate },

    #[error("no normal quantile for p = {p}: {reason}")]
    Quantile { p: f64, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub yhat: f64,
    pub lower: f64,
    pub upper: f64,
    /// The actual close for fitted rows; `None` beyond the history.
    pub observed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    pub symbol: String,
    pub points: Vec<ForecastPoint>,
    history_len: usize,
}

impl ForecastResult {
    pub fn fitted(&self) -> &[ForecastPoint] {
        &self.points[..self.history_len]
    }

    pub fn future(&self) -> &[ForecastPoint] {
        &self.points[self.history_len..]
    }

    pub fn last_observed(&self) -> Option<NaiveDate> {
        self.fitted().last().map(|p| p.date)
    }
}

/// Fit the model to `history` (ascending `(date, close)` pairs) and project
/// `config.horizon_days` calendar days past its last date.
pub fn forecast(
    symbol: &str,
    history: &[(NaiveDate, f64)],
    config: &ForecastConfig,
) -> Result<ForecastResult, DashboardError> {
    let required = config.min_observations();
    if history.len() < required {
        return Err(DashboardError::InsufficientHistory {
            symbol: symbol.to_string(),
            observations: history.len(),
            required,
        });
    }

    let points = fit(history, config).map_err(|source| DashboardError::Forecasting {
        symbol: symbol.to_string(),
        source,
    })?;

    debug!(
        symbol,
        observations = history.len(),
        horizon = config.horizon_days,
        "forecast fitted"
    );

    Ok(ForecastResult {
        symbol: symbol.to_string(),
        points,
        history_len: history.len(),
    })
}

fn fit(history: &[(NaiveDate, f64)], config: &ForecastConfig) -> Result<Vec<ForecastPoint>, FitError> {
    for w in history.windows(2) {
        if w[1].0 <= w[0].0 {
            return Err(FitError::UnorderedHistory { date: w[1].0 });
        }
    }
    for (date, y) in history {
        if !y.is_finite() {
            return Err(FitError::NonFiniteInput { date: *date });
        }
    }

    let origin = history[0].0;
    let last_date = history[history.len() - 1].0;
    let days: Vec<f64> = history
        .iter()
        .map(|(d, _)| (*d - origin).num_days() as f64)
        .collect();
    let span = days[days.len() - 1];
    if span <= 0.0 {
        return Err(FitError::ZeroSpan);
    }
    let t: Vec<f64> = days.iter().map(|d| d / span).collect();

    let y_scale = history.iter().map(|(_, y)| y.abs()).fold(0.0_f64, f64::max);
    if y_scale == 0.0 {
        return Err(FitError::ZeroScale);
    }
    let y: Array1<f64> = history.iter().map(|(_, v)| v / y_scale).collect();

    let design = Design::new(
        &t,
        config.n_changepoints,
        config.changepoint_range,
        &config.seasonalities,
    );
    let x = design.matrix(&t, &days);

    let floor = NOISE_FLOOR * NOISE_FLOOR;
    let prior_noise = linear_trend_variance(&t, &y).max(floor);
    let penalty = penalties(&design, config, prior_noise);
    let beta = solver::ridge(&x, &y, &penalty)?;

    let fitted = x.dot(&beta);
    let n = history.len() as f64;
    let residual_var = (&y - &fitted).mapv(|r| r * r).sum() / n;
    let sigma2 = residual_var.max(floor);

    let deltas = beta.slice(s![design.changepoint_columns()]);
    let mean_abs_delta = if deltas.is_empty() {
        0.0
    } else {
        deltas.mapv(f64::abs).sum() / deltas.len() as f64
    };
    let changepoint_rate = design.changepoints().len() as f64;
    let z = normal_quantile(0.5 + config.interval_width / 2.0)?;

    debug!(
        columns = design.width(),
        changepoints = design.changepoints().len(),
        sigma = sigma2.sqrt() * y_scale,
        mean_abs_delta,
        "trend/seasonality regression solved"
    );

    let mut points = Vec::with_capacity(history.len() + config.horizon_days as usize);
    let half_width = z * sigma2.sqrt();
    for (i, (date, observed)) in history.iter().enumerate() {
        points.push(scaled_point(*date, fitted[i], half_width, y_scale, Some(*observed))?);
    }

    for k in 1..=config.horizon_days {
        let Some(date) = last_date.checked_add_days(Days::new(u64::from(k))) else {
            break;
        };
        let day = span + f64::from(k);
        let t_future = day / span;
        let row = design.row(t_future, day);
        let yhat: f64 = row.iter().zip(beta.iter()).map(|(a, b)| a * b).sum();

        let h = t_future - 1.0;
        let trend_var = changepoint_rate * 2.0 * mean_abs_delta.powi(2) * h.powi(3) / 3.0;
        let var = sigma2 * (1.0 + f64::from(k)) + trend_var;
        points.push(scaled_point(date, yhat, z * var.sqrt(), y_scale, None)?);
    }

    Ok(points)
}

fn scaled_point(
    date: NaiveDate,
    yhat: f64,
    half_width: f64,
    y_scale: f64,
    observed: Option<f64>,
) -> Result<ForecastPoint, FitError> {
    let point = ForecastPoint {
        date,
        yhat: yhat * y_scale,
        lower: (yhat - half_width) * y_scale,
        upper: (yhat + half_width) * y_scale,
        observed,
    };
    if !(point.yhat.is_finite() && point.lower.is_finite() && point.upper.is_finite()) {
        return Err(FitError::NonFiniteOutput { date });
    }
    Ok(point)
}

/// Ridge weights: the noise-to-prior variance ratio for slope adjustments
/// and Fourier terms, nothing on intercept and base slope.
fn penalties(design: &Design, config: &ForecastConfig, noise_var: f64) -> Vec<f64> {
    let mut penalty = vec![0.0; design.width()];
    let trend = noise_var / config.changepoint_prior_scale.powi(2);
    let seasonal = noise_var / config.seasonality_prior_scale.powi(2);
    for j in design.changepoint_columns() {
        penalty[j] = trend;
    }
    for j in design.seasonal_columns() {
        penalty[j] = seasonal;
    }
    penalty
}

/// Residual variance of an ordinary least squares line through `(t, y)`.
fn linear_trend_variance(t: &[f64], y: &Array1<f64>) -> f64 {
    let n = t.len() as f64;
    let sum_t: f64 = t.iter().sum();
    let sum_y: f64 = y.sum();
    let sum_t2: f64 = t.iter().map(|v| v * v).sum();
    let sum_ty: f64 = t.iter().zip(y.iter()).map(|(a, b)| a * b).sum();

    let denominator = n * sum_t2 - sum_t * sum_t;
    let (slope, intercept) = if denominator.abs() > f64::EPSILON {
        let slope = (n * sum_ty - sum_t * sum_y) / denominator;
        (slope, (sum_y - slope * sum_t) / n)
    } else {
        (0.0, sum_y / n)
    };

    t.iter()
        .zip(y.iter())
        .map(|(ti, yi)| (yi - intercept - slope * ti).powi(2))
        .sum::<f64>()
        / n
}

/// Inverse of the standard normal CDF for `p` strictly inside (0, 1).
pub fn normal_quantile(p: f64) -> Result<f64, FitError> {
    if !(p > 0.0 && p < 1.0) {
        return Err(FitError::Quantile {
            p,
            reason: "probability must lie strictly between 0 and 1".to_string(),
        });
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| FitError::Quantile {
        p,
        reason: e.to_string(),
    })?;
    Ok(normal.inverse_cdf(p))
}
