//! Model evaluation for the four curve families.
//!
//! The fitter relies on two primitive operations:
//! - predict `y(n)` given parameters (for residuals, R² and plots)
//! - fill the gradient `∂y/∂p` at `n` (Jacobian rows for Levenberg–Marquardt,
//!   design rows for the linear polynomial solve)
//!
//! Parameter order follows `Family::param_names`.

use crate::domain::Family;

/// Predict `y(n)` for the given family.
///
/// # Panics
/// Panics if `params` is shorter than `family.param_count()`.
pub fn predict(family: Family, n: f64, params: &[f64]) -> f64 {
    match family {
        Family::Exponential => {
            let (a, b, c) = (params[0], params[1], params[2]);
            a * -(-b * n.powf(c)).exp_m1()
        }
        Family::Logistic => {
            let (a, b, c) = (params[0], params[1], params[2]);
            a * sigmoid(b * (n - c))
        }
        Family::Power => {
            let (a, b, c) = (params[0], params[1], params[2]);
            a * n.powf(b) + c
        }
        Family::Polynomial => {
            let (a, b, c, d) = (params[0], params[1], params[2], params[3]);
            ((a * n + b) * n + c) * n + d
        }
    }
}

/// Fill `out` with the partial derivatives of `y(n)` with respect to each parameter.
///
/// # Panics
/// Panics if `params` or `out` is shorter than `family.param_count()`.
pub fn fill_gradient(family: Family, n: f64, params: &[f64], out: &mut [f64]) {
    match family {
        Family::Exponential => {
            let (a, b, c) = (params[0], params[1], params[2]);
            let u = n.powf(c);
            let e = (-b * u).exp();
            out[0] = -(-b * u).exp_m1();
            out[1] = a * u * e;
            out[2] = a * b * u * n.ln() * e;
        }
        Family::Logistic => {
            let (a, b, c) = (params[0], params[1], params[2]);
            let s = sigmoid(b * (n - c));
            let ds = s * (1.0 - s);
            out[0] = s;
            out[1] = a * ds * (n - c);
            out[2] = -a * ds * b;
        }
        Family::Power => {
            let (a, b) = (params[0], params[1]);
            let u = n.powf(b);
            out[0] = u;
            out[1] = a * u * n.ln();
            out[2] = 1.0;
        }
        Family::Polynomial => {
            out[0] = n * n * n;
            out[1] = n * n;
            out[2] = n;
            out[3] = 1.0;
        }
    }
}

/// Sample `y(n)` on `count` evenly spaced points over `[lo, hi]`.
pub fn sample_curve(family: Family, params: &[f64], lo: f64, hi: f64, count: usize) -> Vec<(f64, f64)> {
    let count = count.max(2);
    (0..count)
        .map(|i| {
            let u = i as f64 / (count as f64 - 1.0);
            let n = lo + u * (hi - lo);
            (n, predict(family, n, params))
        })
        .collect()
}

/// Logistic function evaluated without overflow for large `|z|`.
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_known_values() {
        let exp = predict(Family::Exponential, 2.0, &[1.0, 0.5, 1.0]);
        assert!((exp - (1.0 - (-1.0_f64).exp())).abs() < 1e-15);

        let log = predict(Family::Logistic, 40.0, &[0.8, 0.2, 40.0]);
        assert!((log - 0.4).abs() < 1e-15);

        let pow = predict(Family::Power, 3.0, &[2.0, 2.0, 1.0]);
        assert!((pow - 19.0).abs() < 1e-12);

        let poly = predict(Family::Polynomial, 2.0, &[1.0, -1.0, 0.5, 3.0]);
        assert!((poly - 8.0).abs() < 1e-12);
    }

    #[test]
    fn logistic_is_finite_far_from_center() {
        assert_eq!(predict(Family::Logistic, 1.0, &[1.0, 50.0, 100.0]), 0.0);
        assert_eq!(predict(Family::Logistic, 100.0, &[1.0, 50.0, 1.0]), 1.0);
    }

    #[test]
    fn gradients_match_finite_differences() {
        let cases: [(Family, Vec<f64>); 4] = [
            (Family::Exponential, vec![0.95, 0.0015, 1.9]),
            (Family::Logistic, vec![1.02, 0.11, 24.0]),
            (Family::Power, vec![0.002, 1.4, -0.03]),
            (Family::Polynomial, vec![-1e-6, 2e-4, 0.01, -0.05]),
        ];

        for (family, params) in cases {
            for &n in &[1.0, 7.0, 23.0, 61.0, 100.0] {
                let mut grad = vec![0.0; family.param_count()];
                fill_gradient(family, n, &params, &mut grad);
                for j in 0..params.len() {
                    let h = 1e-6 * params[j].abs().max(1e-3);
                    let mut up = params.clone();
                    let mut down = params.clone();
                    up[j] += h;
                    down[j] -= h;
                    let numeric =
                        (predict(family, n, &up) - predict(family, n, &down)) / (2.0 * h);
                    let tol = 1e-5 * numeric.abs().max(1.0);
                    assert!(
                        (grad[j] - numeric).abs() < tol,
                        "{family:?} n={n} p{j}: analytic={} numeric={numeric}",
                        grad[j]
                    );
                }
            }
        }
    }

    #[test]
    fn sample_curve_spans_interval() {
        let curve = sample_curve(Family::Power, &[1.0, 1.0, 0.0], 1.0, 100.0, 1000);
        assert_eq!(curve.len(), 1000);
        assert_eq!(curve[0], (1.0, 1.0));
        assert!((curve[999].0 - 100.0).abs() < 1e-12);
    }
}
