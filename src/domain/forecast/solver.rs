//! Penalised least squares via the normal equations and a Cholesky
//! factorisation.

use ndarray::{Array1, Array2};

use super::FitError;

/// Minimise `|y - X b|^2 + sum(penalty[j] * b[j]^2)`.
pub fn ridge(x: &Array2<f64>, y: &Array1<f64>, penalty: &[f64]) -> Result<Array1<f64>, FitError> {
    let mut gram = x.t().dot(x);
    for (j, &lambda) in penalty.iter().enumerate() {
        gram[[j, j]] += lambda;
    }
    let rhs = x.t().dot(y);
    solve_spd(gram, rhs)
}

/// Solve `a * b = rhs` for a symmetric positive definite `a`.
pub fn solve_spd(a: Array2<f64>, rhs: Array1<f64>) -> Result<Array1<f64>, FitError> {
    let n = a.nrows();
    let l = cholesky(a)?;

    // L z = rhs
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = rhs[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }

    // L^T b = z
    let mut b = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * b[k];
        }
        b[i] = sum / l[[i, i]];
    }

    Ok(b)
}

/// Lower-triangular `L` with `a = L L^T`.
fn cholesky(a: Array2<f64>) -> Result<Array2<f64>, FitError> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if !(diag > 0.0) || !diag.is_finite() {
            return Err(FitError::NotPositiveDefinite { pivot: j });
        }
        let root = diag.sqrt();
        l[[j, j]] = root;

        for i in (j + 1)..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / root;
        }
    }

    Ok(l)
}
