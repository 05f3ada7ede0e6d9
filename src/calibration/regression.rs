//! Ordinary least squares without an implicit intercept.
//!
//! Callers that want a constant term add a column of ones to the design
//! matrix. The system is solved by SVD on column-scaled data.

use crate::error::{Result, SensorLogError};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

/// Singular values below this fraction of the largest mean the design
/// matrix does not have full column rank
const SINGULARITY_TOLERANCE: f64 = 1e-10;

/// Coefficients and goodness of fit of a least-squares solve
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresFit {
    pub coefficients: Vec<f64>,
    pub fitted: Vec<f64>,
    pub r_squared: f64,
}

impl LeastSquaresFit {
    /// Target minus fitted value, per row
    pub fn residuals(&self, target: &[f64]) -> Vec<f64> {
        target
            .iter()
            .zip(&self.fitted)
            .map(|(y, y_hat)| y - y_hat)
            .collect()
    }
}

/// Fit `target ≈ design · β` in the least-squares sense
pub fn least_squares(design: &[Vec<f64>], target: &[f64]) -> Result<LeastSquaresFit> {
    let n_rows = design.len();
    let n_cols = design.first().map_or(0, Vec::len);

    if n_rows != target.len() {
        return Err(SensorLogError::Configuration {
            message: format!(
                "Design matrix has {} rows but target has {}",
                n_rows,
                target.len()
            ),
        });
    }
    if n_cols == 0 {
        return Err(SensorLogError::Configuration {
            message: "Design matrix has no columns".to_string(),
        });
    }
    if let Some(row) = design.iter().position(|r| r.len() != n_cols) {
        return Err(SensorLogError::Configuration {
            message: format!("Design matrix row {} has inconsistent width", row),
        });
    }
    if n_rows < n_cols {
        return Err(SensorLogError::InsufficientData {
            needed: n_cols,
            found: n_rows,
        });
    }

    // Scale every column to unit RMS so products of very different
    // magnitudes (ns against ns·°C) stay comparable.
    let scales: Vec<f64> = (0..n_cols)
        .map(|j| {
            let rms = (design.iter().map(|r| r[j] * r[j]).sum::<f64>() / n_rows as f64).sqrt();
            if rms > 0.0 { rms } else { 1.0 }
        })
        .collect();

    let scaled = DMatrix::from_fn(n_rows, n_cols, |i, j| design[i][j] / scales[j]);
    let svd = scaled.svd(true, true);

    // Rank check
    let largest = svd.singular_values.max();
    let smallest = svd.singular_values.min();
    if largest <= 0.0 || smallest <= SINGULARITY_TOLERANCE * largest {
        return Err(SensorLogError::SingularSystem {
            reason: format!(
                "Design columns are linearly dependent (singular values {:.3e}..{:.3e})",
                smallest, largest
            ),
        });
    }

    let rhs = DVector::from_column_slice(target);
    let solution = svd
        .solve(&rhs, SINGULARITY_TOLERANCE * largest)
        .map_err(|reason| SensorLogError::SingularSystem {
            reason: reason.to_string(),
        })?;

    let coefficients: Vec<f64> = solution.iter().zip(&scales).map(|(b, s)| b / s).collect();

    let fitted: Vec<f64> = design
        .iter()
        .map(|row| row.iter().zip(&coefficients).map(|(x, b)| x * b).sum())
        .collect();
    let r_squared = r_squared(target, &fitted);

    debug!(
        "Least squares over {} rows x {} columns: coefficients={:?}, r2={:.6}",
        n_rows, n_cols, coefficients, r_squared
    );

    Ok(LeastSquaresFit {
        coefficients,
        fitted,
        r_squared,
    })
}

/// Coefficient of determination around the target mean.
///
/// A constant target scores 1.0 when fitted exactly and 0.0 otherwise.
pub fn r_squared(target: &[f64], fitted: &[f64]) -> f64 {
    if target.is_empty() {
        return 0.0;
    }
    let mean = target.iter().sum::<f64>() / target.len() as f64;
    let ss_tot: f64 = target.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = target
        .iter()
        .zip(fitted)
        .map(|(y, y_hat)| (y - y_hat).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-8,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_exact_linear_relation() {
        let design: Vec<Vec<f64>> = (0..6).map(|i| vec![1.0, i as f64]).collect();
        let target: Vec<f64> = (0..6).map(|i| 2.0 + 3.0 * i as f64).collect();

        let fit = least_squares(&design, &target).unwrap();
        assert_close(fit.coefficients[0], 2.0);
        assert_close(fit.coefficients[1], 3.0);
        assert_close(fit.r_squared, 1.0);
        assert!(fit.residuals(&target).iter().all(|r| r.abs() < 1e-8));
    }

    #[test]
    fn test_no_intercept_fit() {
        let design = vec![vec![1.0], vec![2.0], vec![3.0]];
        let target = vec![1.0, 2.0, 2.0];
        // beta = sum(xy)/sum(x^2) = 11/14
        let fit = least_squares(&design, &target).unwrap();
        assert_close(fit.coefficients[0], 11.0 / 14.0);
    }

    #[test]
    fn test_badly_scaled_columns() {
        let design: Vec<Vec<f64>> = (1..20)
            .map(|i| {
                let tof = 1.0e6 + 1.0e4 * i as f64;
                let dt = (i % 7) as f64 - 3.0;
                vec![1.0, tof, dt * tof]
            })
            .collect();
        let target: Vec<f64> = design
            .iter()
            .map(|r| 5.0 + 1.7e-4 * r[1] + 3.0e-7 * r[2])
            .collect();

        let fit = least_squares(&design, &target).unwrap();
        assert!((fit.coefficients[0] - 5.0).abs() < 1e-4);
        assert!((fit.coefficients[1] - 1.7e-4).abs() < 1e-10);
        assert!((fit.coefficients[2] - 3.0e-7).abs() < 1e-12);
    }

    #[test]
    fn test_collinear_columns_are_singular() {
        let design: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64, 2.0 * i as f64]).collect();
        let target = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        assert!(matches!(
            least_squares(&design, &target),
            Err(SensorLogError::SingularSystem { .. })
        ));
    }

    #[test]
    fn test_overdetermined_noisy_fit_minimises_residuals() {
        // y = 1 + 2x with alternating +/-0.5 noise; symmetric noise keeps the
        // exact coefficients
        let design: Vec<Vec<f64>> = (0..8).map(|i| vec![1.0, i as f64]).collect();
        let target: Vec<f64> = (0..8)
            .map(|i| {
                let noise = if i % 4 == 0 || i % 4 == 3 { 0.5 } else { -0.5 };
                1.0 + 2.0 * i as f64 + noise
            })
            .collect();

        let fit = least_squares(&design, &target).unwrap();
        assert_close(fit.coefficients[0], 1.0);
        assert_close(fit.coefficients[1], 2.0);
        assert!(fit.r_squared < 1.0 && fit.r_squared > 0.95);
    }

    #[test]
    fn test_underdetermined_system_is_rejected() {
        let design = vec![vec![1.0, 2.0, 3.0]];
        assert!(matches!(
            least_squares(&design, &[1.0]),
            Err(SensorLogError::InsufficientData {
                needed: 3,
                found: 1
            })
        ));
    }

    #[test]
    fn test_r_squared_of_constant_target() {
        assert_eq!(r_squared(&[2.0, 2.0], &[2.0, 2.0]), 1.0);
        assert_eq!(r_squared(&[2.0, 2.0], &[1.0, 3.0]), 0.0);
    }
}
