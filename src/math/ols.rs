//! Linear least squares solver.
//!
//! Two kinds of problems in this crate reduce to
//!
//! ```text
//! minimize ‖X β − y‖²
//! ```
//!
//! - the cubic polynomial family, which is linear in its coefficients
//! - each damped Levenberg–Marquardt step, solved as an augmented system
//!   `[J; √λ·D] δ = [r; 0]`
//!
//! Both are tall and tiny (≤ 4 columns), so we solve through SVD, which copes
//! with near-collinear columns (e.g. `n³` and `n²` on a short range).
//! Nalgebra's `QR::solve` is intended for square systems and panics on
//! non-square input.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() != y.len() || x.ncols() == 0 || x.nrows() < x.ncols() {
        return None;
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return None;
    }

    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}
