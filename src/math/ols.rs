//! Least squares solver.
//!
//! The trainer repeatedly solves small linear regression problems of the form:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! once per candidate ridge penalty during the λ grid search (the penalty is
//! folded into the design matrix by row-stacking, so the solver itself stays
//! a plain least-squares solve).
//!
//! Implementation choices:
//! - SVD-based solve so tall (rows > columns) systems work; nalgebra's
//!   `QR::solve` is intended for square systems and panics otherwise.
//! - One-hot service/terrain indicators can be collinear (e.g. a dataset
//!   containing a single service type alongside the intercept), so the
//!   tolerance is relaxed progressively before giving up.
//! - Parameter dimension is tiny (a handful of indicator and numeric
//!   columns), so SVD performance is a non-issue.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if the strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}
