//! Low-level fitting routines for a single curve family.
//!
//! Given observed `(n_i, p_i)` pairs we minimise `Σ (p_i − f(n_i; θ))²`:
//!
//! - the polynomial family is linear in `θ`, so one SVD least-squares solve is exact
//! - the other families run Levenberg–Marquardt from every starting point in
//!   [`crate::fit::start`] and keep the converged candidate with the lowest SSE
//!
//! A family fails only when no starting point converges within the evaluation
//! budget; the last solver failure becomes the error message. The budget covers
//! the whole family: each start gets whatever the earlier starts left over.

use nalgebra::{DMatrix, DVector};

use crate::domain::{Family, FamilyFit, FitQuality, ObservedPoint, SolverSummary};
use crate::error::AppError;
use crate::fit::start::starting_points;
use crate::math::{
    levenberg_marquardt, r_squared, rmse, solve_least_squares, LeastSquaresProblem, LmFailure,
    LmOptions, LmReport, Termination,
};
use crate::models::{fill_gradient, predict};

/// Fitting options shared by every family.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Residual evaluations allowed for the whole family fit, shared by all
    /// starting points in order.
    pub max_evaluations: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_evaluations: crate::domain::DEFAULT_MAX_EVALUATIONS,
        }
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    idx: usize,
    report: LmReport,
}

/// `(x, y)` data bound to a family, as seen by the solver.
struct CurveProblem<'a> {
    family: Family,
    x: &'a [f64],
    y: &'a [f64],
}

impl LeastSquaresProblem for CurveProblem<'_> {
    fn obs_len(&self) -> usize {
        self.x.len()
    }

    fn param_len(&self) -> usize {
        self.family.param_count()
    }

    fn residuals(&self, params: &[f64], out: &mut [f64]) {
        for (i, (&n, &p)) in self.x.iter().zip(self.y).enumerate() {
            out[i] = p - predict(self.family, n, params);
        }
    }

    fn model_jacobian(&self, params: &[f64], out: &mut DMatrix<f64>) {
        let mut row = vec![0.0; self.family.param_count()];
        for (i, &n) in self.x.iter().enumerate() {
            fill_gradient(self.family, n, params, &mut row);
            for (j, &v) in row.iter().enumerate() {
                out[(i, j)] = v;
            }
        }
    }
}

/// Fit a single family to the observed points.
pub fn fit_family(
    family: Family,
    points: &[ObservedPoint],
    opts: &FitOptions,
) -> Result<FamilyFit, AppError> {
    if points.is_empty() {
        return Err(AppError::new("No data points to fit."));
    }
    let k = family.param_count();
    if points.len() < k {
        return Err(AppError::new(format!(
            "{}: underdetermined, {} points for {k} parameters.",
            family.display_name(),
            points.len()
        )));
    }

    let x: Vec<f64> = points.iter().map(|p| p.n).collect();
    let y: Vec<f64> = points.iter().map(|p| p.p).collect();
    if x.iter().chain(&y).any(|v| !v.is_finite()) {
        return Err(AppError::new("Non-finite observation in fit input."));
    }

    let (params, solver) = if family.is_linear() {
        fit_linear(family, &x, &y)?
    } else {
        fit_nonlinear(family, &x, &y, opts)?
    };

    let predicted: Vec<f64> = x.iter().map(|&n| predict(family, n, &params)).collect();
    if predicted.iter().any(|v| !v.is_finite()) {
        return Err(AppError::new(format!(
            "{}: fitted curve is not finite on the observed range.",
            family.display_name()
        )));
    }

    let quality = FitQuality {
        r_squared: r_squared(&y, &predicted),
        sse: crate::math::sse(&y, &predicted),
        rmse: rmse(&y, &predicted),
        n: y.len(),
    };

    Ok(FamilyFit {
        family,
        params,
        quality,
        solver,
    })
}

/// Solve a linear-in-parameters family with one least-squares solve.
fn fit_linear(family: Family, x: &[f64], y: &[f64]) -> Result<(Vec<f64>, SolverSummary), AppError> {
    let k = family.param_count();
    let mut design = DMatrix::<f64>::zeros(x.len(), k);
    let origin = vec![0.0; k];
    let mut row = vec![0.0; k];
    for (i, &n) in x.iter().enumerate() {
        // The gradient of a linear model is its design row, independent of θ.
        fill_gradient(family, n, &origin, &mut row);
        for (j, &v) in row.iter().enumerate() {
            design[(i, j)] = v;
        }
    }

    let beta = solve_least_squares(&design, &DVector::from_column_slice(y)).ok_or_else(|| {
        AppError::new(format!(
            "{}: least squares system is singular.",
            family.display_name()
        ))
    })?;

    let solver = SolverSummary {
        iterations: 0,
        evaluations: 1,
        termination: Termination::ExactSolve,
        start_index: 0,
    };
    Ok((beta.iter().copied().collect(), solver))
}

/// Run Levenberg–Marquardt from every starting point and keep the best.
fn fit_nonlinear(
    family: Family,
    x: &[f64],
    y: &[f64],
    opts: &FitOptions,
) -> Result<(Vec<f64>, SolverSummary), AppError> {
    let problem = CurveProblem { family, x, y };

    let mut candidates = Vec::new();
    let mut last_failure = None;
    let mut used = 0usize;

    for (idx, start) in starting_points(family, x, y).into_iter().enumerate() {
        let remaining = opts.max_evaluations.saturating_sub(used);
        if remaining == 0 {
            tracing::debug!(family = family.display_name(), start = idx, "evaluation budget spent");
            break;
        }
        let lm_opts = LmOptions {
            max_evaluations: remaining,
            ..LmOptions::default()
        };

        let outcome = levenberg_marquardt(&problem, &start, &lm_opts);
        used += match &outcome {
            Ok(report) => report.evaluations,
            Err(LmFailure::EvaluationLimit { evaluations, .. }) => *evaluations,
            // Rejected before or at the first evaluation.
            Err(_) => 1,
        };

        match outcome {
            Ok(report) => {
                tracing::debug!(
                    family = family.display_name(),
                    start = idx,
                    sse = report.sse,
                    evaluations = report.evaluations,
                    termination = report.termination.label(),
                    "start converged"
                );
                candidates.push(Candidate { idx, report });
            }
            Err(failure) => {
                tracing::debug!(
                    family = family.display_name(),
                    start = idx,
                    %failure,
                    "start failed"
                );
                last_failure = Some(failure);
            }
        }
    }

    if candidates.is_empty() {
        let reason = match last_failure {
            // Report the family-wide count, not the last start's share.
            Some(LmFailure::EvaluationLimit { sse, .. }) => {
                LmFailure::EvaluationLimit { evaluations: used, sse }.to_string()
            }
            Some(f) => f.to_string(),
            None => "no starting points".to_string(),
        };
        return Err(AppError::new(reason).context(family.display_name()));
    }

    // Deterministic selection: pick the minimum SSE; break ties by start index.
    let mut best = &candidates[0];
    for c in &candidates[1..] {
        if c.report.sse < best.report.sse || (c.report.sse == best.report.sse && c.idx < best.idx) {
            best = c;
        }
    }

    let solver = SolverSummary {
        iterations: best.report.iterations,
        evaluations: used,
        termination: best.report.termination,
        start_index: best.idx,
    };
    Ok((best.report.params.clone(), solver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    fn synthetic(family: Family, params: &[f64]) -> Vec<ObservedPoint> {
        (1..=100)
            .map(|n| {
                let n = f64::from(n);
                ObservedPoint {
                    n,
                    p: predict(family, n, params),
                }
            })
            .collect()
    }

    fn assert_recovers(family: Family, truth: &[f64], rel_tol: f64) {
        let points = synthetic(family, truth);
        let fit = fit_family(family, &points, &FitOptions::default()).unwrap();
        for (j, (&got, &want)) in fit.params.iter().zip(truth).enumerate() {
            let err = (got - want).abs() / want.abs().max(1e-12);
            assert!(
                err < rel_tol,
                "{family:?} p{j}: got {got}, want {want} (rel err {err:e})"
            );
        }
        assert!(fit.quality.r_squared > 1.0 - 1e-9, "R² = {}", fit.quality.r_squared);
    }

    #[test]
    fn round_trip_exponential() {
        assert_recovers(Family::Exponential, &[1.0, 0.0015, 2.0], 1e-5);
    }

    #[test]
    fn round_trip_logistic() {
        assert_recovers(Family::Logistic, &[1.0, 0.1, 40.0], 1e-5);
    }

    #[test]
    fn round_trip_power() {
        assert_recovers(Family::Power, &[0.0001, 2.0, 0.05], 1e-4);
    }

    #[test]
    fn round_trip_polynomial() {
        assert_recovers(Family::Polynomial, &[-1e-6, 1e-4, 0.01, 0.02], 1e-6);
        let fit = fit_family(
            Family::Polynomial,
            &synthetic(Family::Polynomial, &[-1e-6, 1e-4, 0.01, 0.02]),
            &FitOptions::default(),
        )
        .unwrap();
        assert_eq!(fit.solver.termination, Termination::ExactSolve);
    }

    #[test]
    fn noisy_exponential_still_fits_well() {
        let truth = [1.0, 0.0015, 2.0];
        let mut rng = StdRng::seed_from_u64(42);
        let noise = Normal::new(0.0, 0.005).unwrap();
        let points: Vec<ObservedPoint> = synthetic(Family::Exponential, &truth)
            .into_iter()
            .map(|p| ObservedPoint {
                n: p.n,
                p: p.p + noise.sample(&mut rng),
            })
            .collect();

        let fit = fit_family(Family::Exponential, &points, &FitOptions::default()).unwrap();
        assert!(fit.quality.r_squared > 0.999, "R² = {}", fit.quality.r_squared);
        assert!((fit.params[2] - 2.0).abs() < 0.1, "c = {}", fit.params[2]);
    }

    #[test]
    fn exhausted_budget_is_an_error() {
        let points = synthetic(Family::Logistic, &[1.0, 0.1, 40.0]);
        let opts = FitOptions { max_evaluations: 1 };
        let err = fit_family(Family::Logistic, &points, &opts).unwrap_err();
        assert!(err.message().starts_with("Logistic: optimal parameters not found"), "{err}");
    }

    #[test]
    fn budget_is_shared_across_starts() {
        let points = synthetic(Family::Exponential, &[1.0, 0.0015, 2.0]);
        let fit = fit_family(Family::Exponential, &points, &FitOptions::default()).unwrap();
        assert!(fit.solver.evaluations <= crate::domain::DEFAULT_MAX_EVALUATIONS);

        // A budget the first start cannot finish in leaves nothing for the rest,
        // and the error reports the family-wide count.
        let opts = FitOptions { max_evaluations: 3 };
        let err = fit_family(Family::Logistic, &synthetic(Family::Logistic, &[1.0, 0.1, 40.0]), &opts)
            .unwrap_err();
        assert!(err.message().contains("has reached 3 "), "{err}");
    }

    #[test]
    fn underdetermined_and_empty_inputs_fail() {
        let two = synthetic(Family::Polynomial, &[0.0, 0.0, 0.01, 0.0]);
        let err = fit_family(Family::Polynomial, &two[..2], &FitOptions::default()).unwrap_err();
        assert!(err.message().contains("underdetermined"));

        assert!(fit_family(Family::Power, &[], &FitOptions::default()).is_err());
    }
}
