//! Starting points for the nonlinear families.
//!
//! Levenberg–Marquardt only finds the minimum whose basin it starts in, so each
//! family is tried from a small, deterministic list of starts:
//!
//! 1. the all-ones vector (the conventional default when no guess is given)
//! 2. data-driven guesses from linearising transforms of the data, e.g. for the
//!    exponential family `ln(−ln(1 − y/a)) = ln b + c·ln n`
//!
//! The order matters only for tie-breaking in the fitter.

use nalgebra::{DMatrix, DVector};

use crate::domain::Family;
use crate::math::solve_least_squares;

/// Headroom above the largest observation used for the asymptote guesses.
const ASYMPTOTE_HEADROOM: f64 = 1.01;

/// Only points below this fraction of the asymptote enter the linearised fits;
/// the log transforms blow up near the plateau.
const PLATEAU_CUTOFF: f64 = 0.95;

/// Build the list of starting parameter vectors for `family`.
///
/// Always contains at least the all-ones start; every vector has
/// `family.param_count()` finite entries.
pub fn starting_points(family: Family, x: &[f64], y: &[f64]) -> Vec<Vec<f64>> {
    let mut out = vec![vec![1.0; family.param_count()]];

    let guesses: Vec<Option<Vec<f64>>> = match family {
        Family::Exponential => vec![exponential_linearised(x, y), exponential_half_life(x, y)],
        Family::Logistic => vec![logistic_linearised(x, y), logistic_midpoint(x, y)],
        Family::Power => power_offsets(y)
            .into_iter()
            .map(|c0| power_linearised(x, y, c0))
            .collect(),
        Family::Polynomial => Vec::new(),
    };

    for guess in guesses.into_iter().flatten() {
        if guess.iter().all(|v| v.is_finite()) && !out.contains(&guess) {
            out.push(guess);
        }
    }
    out
}

/// `ln(−ln(1 − y/a)) = ln b + c·ln n` with `a` just above the largest observation.
fn exponential_linearised(x: &[f64], y: &[f64]) -> Option<Vec<f64>> {
    let a = max_finite(y)? * ASYMPTOTE_HEADROOM;
    if a <= 0.0 {
        return None;
    }

    let (lx, lz): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter(|&(&n, &p)| n > 0.0 && p > 0.0 && p < PLATEAU_CUTOFF * a)
        .map(|(&n, &p)| (n.ln(), (-(1.0 - p / a).ln()).ln()))
        .unzip();

    let (ln_b, c) = fit_line(&lx, &lz)?;
    Some(vec![a, ln_b.exp(), c])
}

/// Shape `c = 1` with `b` set so the curve reaches half its plateau at the observed midpoint.
fn exponential_half_life(x: &[f64], y: &[f64]) -> Option<Vec<f64>> {
    let a = max_finite(y)?;
    let n_half = half_crossing(x, y, a)?;
    if a <= 0.0 || n_half <= 0.0 {
        return None;
    }
    Some(vec![a, std::f64::consts::LN_2 / n_half, 1.0])
}

/// `ln(y / (a − y)) = b·n − b·c`.
fn logistic_linearised(x: &[f64], y: &[f64]) -> Option<Vec<f64>> {
    let a = max_finite(y)? * ASYMPTOTE_HEADROOM;
    if a <= 0.0 {
        return None;
    }

    let (xs, zs): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter(|&(_, &p)| p > 0.0 && p < PLATEAU_CUTOFF * a)
        .map(|(&n, &p)| (n, (p / (a - p)).ln()))
        .unzip();

    let (intercept, b) = fit_line(&xs, &zs)?;
    if b == 0.0 {
        return None;
    }
    Some(vec![a, b, -intercept / b])
}

/// Centre at the observed half-plateau crossing, slope spanning the observed range.
fn logistic_midpoint(x: &[f64], y: &[f64]) -> Option<Vec<f64>> {
    let a = max_finite(y)?;
    let c = half_crossing(x, y, a)?;
    let span = max_finite(x)? - min_finite(x)?;
    if a <= 0.0 || span <= 0.0 {
        return None;
    }
    Some(vec![a, 8.0 / span, c])
}

/// Candidate offsets `c` for the power family: none, and just below the data.
fn power_offsets(y: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0];
    if let (Some(lo), Some(hi)) = (min_finite(y), max_finite(y)) {
        let c = lo - 0.05 * (hi - lo).max(f64::EPSILON);
        if c != 0.0 {
            out.push(c);
        }
    }
    out
}

/// `ln(y − c) = ln a + b·ln n` for a fixed offset `c`.
fn power_linearised(x: &[f64], y: &[f64], c: f64) -> Option<Vec<f64>> {
    let (lx, ly): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter(|&(&n, &p)| n > 0.0 && p - c > 0.0)
        .map(|(&n, &p)| (n.ln(), (p - c).ln()))
        .unzip();

    let (ln_a, b) = fit_line(&lx, &ly)?;
    Some(vec![ln_a.exp(), b, c])
}

/// Ordinary least squares line `z = intercept + slope·x`.
fn fit_line(x: &[f64], z: &[f64]) -> Option<(f64, f64)> {
    if x.len() < 2 || x.len() != z.len() {
        return None;
    }
    let first = x[0];
    if x.iter().all(|&v| v == first) {
        return None;
    }

    let mut design = DMatrix::<f64>::zeros(x.len(), 2);
    for (i, &v) in x.iter().enumerate() {
        design[(i, 0)] = 1.0;
        design[(i, 1)] = v;
    }
    let beta = solve_least_squares(&design, &DVector::from_column_slice(z))?;
    Some((beta[0], beta[1]))
}

/// First `n` at which `y` reaches half of `plateau`.
fn half_crossing(x: &[f64], y: &[f64], plateau: f64) -> Option<f64> {
    x.iter()
        .zip(y)
        .find(|&(_, &p)| p >= 0.5 * plateau)
        .map(|(&n, _)| n)
}

fn max_finite(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
}

fn min_finite(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.min(v))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::predict;

    fn grid() -> Vec<f64> {
        (1..=100).map(f64::from).collect()
    }

    #[test]
    fn every_start_has_the_right_length() {
        let x = grid();
        let y: Vec<f64> = x.iter().map(|&n| 1.0 - (-n * n / 730.0).exp()).collect();
        for family in Family::ALL {
            let starts = starting_points(family, &x, &y);
            assert_eq!(starts[0], vec![1.0; family.param_count()]);
            for s in &starts {
                assert_eq!(s.len(), family.param_count());
                assert!(s.iter().all(|v| v.is_finite()));
            }
        }
    }

    #[test]
    fn linearised_exponential_lands_near_truth() {
        let x = grid();
        let truth = [1.0, 0.0015, 2.0];
        let y: Vec<f64> = x.iter().map(|&n| predict(Family::Exponential, n, &truth)).collect();

        let guess = exponential_linearised(&x, &y).unwrap();
        assert!((guess[2] - 2.0).abs() < 0.3, "c guess {}", guess[2]);
        assert!(guess[1] > 1e-4 && guess[1] < 1e-2, "b guess {}", guess[1]);
    }

    #[test]
    fn linearised_logistic_lands_near_truth() {
        let x = grid();
        let truth = [1.0, 0.1, 40.0];
        let y: Vec<f64> = x.iter().map(|&n| predict(Family::Logistic, n, &truth)).collect();

        let guess = logistic_linearised(&x, &y).unwrap();
        assert!((guess[2] - 40.0).abs() < 5.0, "c guess {}", guess[2]);
        assert!(guess[1] > 0.05 && guess[1] < 0.2, "b guess {}", guess[1]);
    }

    #[test]
    fn power_offset_zero_recovers_pure_power_law() {
        let x = grid();
        let y: Vec<f64> = x.iter().map(|&n| 0.3 * n.powf(0.5)).collect();
        let guess = power_linearised(&x, &y, 0.0).unwrap();
        assert!((guess[0] - 0.3).abs() < 1e-9);
        assert!((guess[1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn degenerate_data_keeps_default_start() {
        let x = vec![5.0; 4];
        let y = vec![0.0; 4];
        let starts = starting_points(Family::Logistic, &x, &y);
        assert_eq!(starts, vec![vec![1.0, 1.0, 1.0]]);
    }
}
