//! Levenberg–Marquardt nonlinear least squares.
//!
//! We minimise `S(p) = Σ r_i(p)²` with `r_i = y_i − f(x_i; p)`. Each iteration
//! linearises the model around `p` and solves the damped step
//!
//! ```text
//! minimize ‖J δ − r‖² + λ ‖D δ‖²
//! ```
//!
//! as the augmented system `[J; √λ·D] δ = [r; 0]` with the SVD solver from
//! [`crate::math::ols`]. `D` is Marquardt's diagonal scaling (running maximum
//! of the Jacobian column norms), which keeps badly scaled parameters such as
//! `b ≈ 1e-3` next to `c ≈ 2` well behaved.
//!
//! `λ` shrinks after every accepted step and grows after every rejected one.
//! The solver stops when one of the classical MINPACK-style tests passes or
//! when no damping level can reduce `S` any further. Running out of model
//! evaluations is the only non-convergence outcome.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::math::solve_least_squares;

/// Damping above which we consider the current point a numerical minimum.
const LAMBDA_MAX: f64 = 1e16;
const LAMBDA_MIN: f64 = 1e-15;
const LAMBDA_UP: f64 = 10.0;
const LAMBDA_DOWN: f64 = 10.0;

/// Residual sum of squares treated as an exact fit.
const SSE_EXACT: f64 = 1e-30;

/// A least-squares problem with an analytic Jacobian.
pub trait LeastSquaresProblem {
    /// Number of observations.
    fn obs_len(&self) -> usize;

    /// Number of parameters.
    fn param_len(&self) -> usize;

    /// Write `r_i = y_i − f(x_i; p)` into `out` (length `obs_len`).
    fn residuals(&self, params: &[f64], out: &mut [f64]);

    /// Write `∂f(x_i; p)/∂p_j` into `out[(i, j)]`.
    fn model_jacobian(&self, params: &[f64], out: &mut DMatrix<f64>);
}

/// Solver tolerances and limits.
#[derive(Debug, Clone)]
pub struct LmOptions {
    /// Maximum number of residual evaluations (including the starting point).
    pub max_evaluations: usize,
    /// Relative reduction of `S` below which an accepted step ends the fit.
    pub ftol: f64,
    /// Relative step length below which an accepted step ends the fit.
    pub xtol: f64,
    /// Infinity norm of `Jᵀr` below which the current point is stationary.
    pub gtol: f64,
    pub initial_lambda: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_evaluations: 10_000,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 1e-14,
            initial_lambda: 1e-3,
        }
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Accepted step reduced `S` by less than `ftol` (relative), or `S ≈ 0`.
    SmallReduction,
    /// Accepted step shorter than `xtol` (relative to `‖p‖`).
    SmallStep,
    /// Gradient `Jᵀr` vanished.
    SmallGradient,
    /// No damping level produced a decrease; `p` is a numerical minimum.
    NoImprovement,
    /// Closed-form linear least squares; no iterations needed.
    ExactSolve,
}

impl Termination {
    pub fn label(self) -> &'static str {
        match self {
            Termination::SmallReduction => "small reduction",
            Termination::SmallStep => "small step",
            Termination::SmallGradient => "small gradient",
            Termination::NoImprovement => "no improvement",
            Termination::ExactSolve => "exact solve",
        }
    }
}

/// Converged solution.
#[derive(Debug, Clone)]
pub struct LmReport {
    pub params: Vec<f64>,
    pub sse: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
}

/// Non-convergence outcomes.
#[derive(Debug, Clone, PartialEq)]
pub enum LmFailure {
    /// Start vector length does not match the problem.
    DimensionMismatch { expected: usize, got: usize },
    /// Residuals at the starting point are not finite.
    NonFiniteStart,
    /// Evaluation budget exhausted before any stopping test passed.
    EvaluationLimit { evaluations: usize, sse: f64 },
}

impl std::fmt::Display for LmFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LmFailure::DimensionMismatch { expected, got } => {
                write!(f, "expected {expected} starting parameters, got {got}")
            }
            LmFailure::NonFiniteStart => write!(f, "residuals are not finite at the starting point"),
            LmFailure::EvaluationLimit { evaluations, sse } => write!(
                f,
                "optimal parameters not found: number of calls to function has reached {evaluations} (SSE={sse:.6e})"
            ),
        }
    }
}

/// Minimise the problem's sum of squared residuals starting from `start`.
pub fn levenberg_marquardt<P: LeastSquaresProblem>(
    problem: &P,
    start: &[f64],
    opts: &LmOptions,
) -> Result<LmReport, LmFailure> {
    let m = problem.obs_len();
    let k = problem.param_len();
    if start.len() != k {
        return Err(LmFailure::DimensionMismatch {
            expected: k,
            got: start.len(),
        });
    }

    let mut params = start.to_vec();
    let mut resid = vec![0.0; m];
    problem.residuals(&params, &mut resid);
    let mut evaluations = 1usize;
    let mut sse = sum_squares(&resid);
    if !sse.is_finite() {
        return Err(LmFailure::NonFiniteStart);
    }

    let mut jac = DMatrix::<f64>::zeros(m, k);
    let mut scale = vec![0.0_f64; k];
    let mut trial = vec![0.0; k];
    let mut trial_resid = vec![0.0; m];
    let mut lambda = opts.initial_lambda;
    let mut iterations = 0usize;

    loop {
        if sse <= SSE_EXACT {
            return Ok(report(params, sse, iterations, evaluations, Termination::SmallReduction));
        }

        iterations += 1;
        problem.model_jacobian(&params, &mut jac);

        // Gradient of S/2 with respect to p is −Jᵀr; its size is the stationarity test.
        let r = DVector::from_column_slice(&resid);
        let g = jac.transpose() * &r;
        if g.iter().any(|v| !v.is_finite()) {
            return Ok(report(params, sse, iterations, evaluations, Termination::NoImprovement));
        }
        if g.amax() <= opts.gtol {
            return Ok(report(params, sse, iterations, evaluations, Termination::SmallGradient));
        }

        for (j, d) in scale.iter_mut().enumerate() {
            let norm = jac.column(j).norm();
            *d = d.max(norm);
        }

        // Inner loop: raise λ until a step decreases S.
        loop {
            if lambda > LAMBDA_MAX {
                return Ok(report(params, sse, iterations, evaluations, Termination::NoImprovement));
            }

            let Some(step) = damped_step(&jac, &r, &scale, lambda) else {
                lambda *= LAMBDA_UP;
                continue;
            };

            if evaluations >= opts.max_evaluations {
                return Err(LmFailure::EvaluationLimit { evaluations, sse });
            }
            for j in 0..k {
                trial[j] = params[j] + step[j];
            }
            problem.residuals(&trial, &mut trial_resid);
            evaluations += 1;
            let trial_sse = sum_squares(&trial_resid);

            if !(trial_sse.is_finite() && trial_sse < sse) {
                lambda *= LAMBDA_UP;
                continue;
            }

            let reduction = (sse - trial_sse) / sse;
            let step_norm = step.norm();
            let param_norm = trial.iter().map(|v| v * v).sum::<f64>().sqrt();

            params.copy_from_slice(&trial);
            resid.copy_from_slice(&trial_resid);
            sse = trial_sse;
            lambda = (lambda / LAMBDA_DOWN).max(LAMBDA_MIN);

            if reduction <= opts.ftol {
                return Ok(report(params, sse, iterations, evaluations, Termination::SmallReduction));
            }
            if step_norm <= opts.xtol * (param_norm + opts.xtol) {
                return Ok(report(params, sse, iterations, evaluations, Termination::SmallStep));
            }
            break;
        }
    }
}

fn damped_step(
    jac: &DMatrix<f64>,
    resid: &DVector<f64>,
    scale: &[f64],
    lambda: f64,
) -> Option<DVector<f64>> {
    let m = jac.nrows();
    let k = jac.ncols();
    let sqrt_lambda = lambda.sqrt();

    let mut a = DMatrix::<f64>::zeros(m + k, k);
    a.rows_mut(0, m).copy_from(jac);
    for (j, &d) in scale.iter().enumerate() {
        // Zero columns still get unit damping so the augmented system stays full rank.
        let d = if d > 0.0 { d } else { 1.0 };
        a[(m + j, j)] = sqrt_lambda * d;
    }

    let mut b = DVector::<f64>::zeros(m + k);
    b.rows_mut(0, m).copy_from(resid);

    solve_least_squares(&a, &b)
}

fn report(
    params: Vec<f64>,
    sse: f64,
    iterations: usize,
    evaluations: usize,
    termination: Termination,
) -> LmReport {
    LmReport {
        params,
        sse,
        iterations,
        evaluations,
        termination,
    }
}

fn sum_squares(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `y = a·e^(b·x)` on a handful of points.
    struct ExpDecay {
        x: Vec<f64>,
        y: Vec<f64>,
    }

    impl LeastSquaresProblem for ExpDecay {
        fn obs_len(&self) -> usize {
            self.x.len()
        }

        fn param_len(&self) -> usize {
            2
        }

        fn residuals(&self, p: &[f64], out: &mut [f64]) {
            for i in 0..self.x.len() {
                out[i] = self.y[i] - p[0] * (p[1] * self.x[i]).exp();
            }
        }

        fn model_jacobian(&self, p: &[f64], out: &mut DMatrix<f64>) {
            for i in 0..self.x.len() {
                let e = (p[1] * self.x[i]).exp();
                out[(i, 0)] = e;
                out[(i, 1)] = p[0] * self.x[i] * e;
            }
        }
    }

    fn exp_problem() -> ExpDecay {
        let x: Vec<f64> = (0..20).map(|i| i as f64 * 0.25).collect();
        let y = x.iter().map(|&x| 2.5 * (-0.8 * x).exp()).collect();
        ExpDecay { x, y }
    }

    #[test]
    fn recovers_exponential_decay() {
        let problem = exp_problem();
        let fit = levenberg_marquardt(&problem, &[1.0, -0.1], &LmOptions::default()).unwrap();
        assert!((fit.params[0] - 2.5).abs() < 1e-6, "a = {}", fit.params[0]);
        assert!((fit.params[1] + 0.8).abs() < 1e-6, "b = {}", fit.params[1]);
        assert!(fit.sse < 1e-12);
    }

    #[test]
    fn evaluation_budget_is_enforced() {
        let problem = exp_problem();
        let opts = LmOptions {
            max_evaluations: 2,
            ..LmOptions::default()
        };
        let err = levenberg_marquardt(&problem, &[1.0, -0.1], &opts).unwrap_err();
        assert!(matches!(err, LmFailure::EvaluationLimit { evaluations: 2, .. }));
        assert!(err.to_string().contains("has reached 2"));
    }

    #[test]
    fn rejects_wrong_start_length() {
        let problem = exp_problem();
        let err = levenberg_marquardt(&problem, &[1.0], &LmOptions::default()).unwrap_err();
        assert_eq!(err, LmFailure::DimensionMismatch { expected: 2, got: 1 });
    }

    #[test]
    fn non_finite_start_is_reported() {
        let problem = exp_problem();
        let err = levenberg_marquardt(&problem, &[1.0, 1e6], &LmOptions::default()).unwrap_err();
        assert_eq!(err, LmFailure::NonFiniteStart);
    }
}
