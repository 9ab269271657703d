//! Ordinary Least Squares (OLS) regression utilities.
//!
//! Used by the regression-based weight estimator to fit unconstrained
//! combination coefficients of model predictions against observations.

use crate::error::{EnsembleError, Result};

/// Fit `y = sum_j coef_j * columns[j]` through the origin.
///
/// Solves the normal equations by Cholesky decomposition and returns one
/// coefficient per column.
pub fn ols_fit(y: &[f64], columns: &[Vec<f64>]) -> Result<Vec<f64>> {
    let n = y.len();

    if n == 0 {
        return Err(EnsembleError::EmptyData);
    }
    if columns.is_empty() {
        return Ok(vec![]);
    }

    for col in columns {
        if col.len() != n {
            return Err(EnsembleError::DimensionMismatch {
                expected: n,
                got: col.len(),
            });
        }
    }

    // Normal equations X'X beta = X'y
    let k = columns.len();
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];

    for obs in 0..n {
        for i in 0..k {
            let xi = columns[i][obs];
            for j in 0..k {
                xtx[i][j] += xi * columns[j][obs];
            }
            xty[i] += xi * y[obs];
        }
    }

    // Small ridge on the diagonal for numerical stability
    for i in 0..k {
        xtx[i][i] += 1e-8;
    }

    solve_symmetric(&xtx, &xty).ok_or_else(|| {
        EnsembleError::ComputationError(
            "OLS regression failed: matrix not positive definite".into(),
        )
    })
}

/// Solve symmetric positive definite system using Cholesky decomposition.
///
/// Solves A @ x = b where A is symmetric positive definite.
fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    // Cholesky decomposition A = L @ L'
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // Forward substitution: L @ y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // Backward substitution: L' @ x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ols_fit_single_column() {
        // y = 3*x
        let y = vec![3.0, 6.0, 9.0, 12.0, 15.0];
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];

        let coefficients = ols_fit(&y, &[x]).unwrap();

        assert_eq!(coefficients.len(), 1);
        assert_relative_eq!(coefficients[0], 3.0, epsilon = 1e-6);
    }

    #[test]
    fn ols_fit_two_columns() {
        // y = 0.3*a + 0.7*b
        let a = vec![1.0, 4.0, 2.0, 8.0, 5.0];
        let b = vec![3.0, 1.0, 6.0, 2.0, 9.0];
        let y: Vec<f64> = a
            .iter()
            .zip(b.iter())
            .map(|(a, b)| 0.3 * a + 0.7 * b)
            .collect();

        let coefficients = ols_fit(&y, &[a, b]).unwrap();

        assert_relative_eq!(coefficients[0], 0.3, epsilon = 1e-6);
        assert_relative_eq!(coefficients[1], 0.7, epsilon = 1e-6);
    }

    #[test]
    fn ols_fit_no_regressors() {
        assert!(ols_fit(&[1.0, 2.0, 3.0], &[]).unwrap().is_empty());
    }

    #[test]
    fn ols_fit_dimension_mismatch() {
        let result = ols_fit(&[1.0, 2.0, 3.0], &[vec![1.0, 2.0]]);
        assert!(matches!(
            result,
            Err(EnsembleError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn ols_fit_empty() {
        assert_eq!(ols_fit(&[], &[]).unwrap_err(), EnsembleError::EmptyData);
    }
}
