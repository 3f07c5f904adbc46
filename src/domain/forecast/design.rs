//! Regression features for the trend and seasonal components.
//!
//! Column layout: intercept, slope, one hinge `(t - s_j)+` per changepoint
//! `s_j`, then a sine/cosine pair per harmonic of every seasonality.

use ndarray::Array2;
use std::f64::consts::PI;
use std::ops::Range;

use super::Seasonality;

#[derive(Debug, Clone)]
pub struct Design {
    changepoints: Vec<f64>,
    seasonalities: Vec<Seasonality>,
}

impl Design {
    pub fn new(
        t: &[f64],
        n_changepoints: usize,
        changepoint_range: f64,
        seasonalities: &[Seasonality],
    ) -> Self {
        Self {
            changepoints: place_changepoints(t, n_changepoints, changepoint_range),
            seasonalities: seasonalities.to_vec(),
        }
    }

    pub fn changepoints(&self) -> &[f64] {
        &self.changepoints
    }

    pub fn width(&self) -> usize {
        self.seasonal_columns().end
    }

    pub fn changepoint_columns(&self) -> Range<usize> {
        2..2 + self.changepoints.len()
    }

    pub fn seasonal_columns(&self) -> Range<usize> {
        let start = self.changepoint_columns().end;
        let count: usize = self
            .seasonalities
            .iter()
            .map(|s| 2 * s.fourier_order)
            .sum();
        start..start + count
    }

    /// Features for scaled time `t` and `day` days since the first
    /// observation.
    pub fn row(&self, t: f64, day: f64) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.width());
        row.push(1.0);
        row.push(t);
        row.extend(self.changepoints.iter().map(|&s| (t - s).max(0.0)));
        for season in &self.seasonalities {
            push_fourier_terms(&mut row, day, season.period, season.fourier_order);
        }
        row
    }

    pub fn matrix(&self, t: &[f64], days: &[f64]) -> Array2<f64> {
        let mut m = Array2::<f64>::zeros((t.len(), self.width()));
        for (i, (&ti, &day)) in t.iter().zip(days).enumerate() {
            for (j, value) in self.row(ti, day).into_iter().enumerate() {
                m[[i, j]] = value;
            }
        }
        m
    }
}

/// Potential changepoints spread evenly over the first `range` share of the
/// observations, never on the first one.
fn place_changepoints(t: &[f64], n_changepoints: usize, range: f64) -> Vec<f64> {
    let hist_size = ((t.len() as f64) * range).floor() as usize;
    let hist_size = hist_size.min(t.len());
    let count = n_changepoints.min(hist_size.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }

    let last = (hist_size - 1) as f64;
    (1..=count)
        .map(|i| {
            let idx = (i as f64 * last / count as f64).round() as usize;
            t[idx]
        })
        .collect()
}

fn push_fourier_terms(row: &mut Vec<f64>, day: f64, period: f64, order: usize) {
    for n in 1..=order {
        let angle = 2.0 * PI * n as f64 * day / period;
        row.push(angle.sin());
        row.push(angle.cos());
    }
}
