//! Goodness-of-fit metrics.

/// Sum of squared residuals `Σ (y_true − y_pred)²`.
pub fn sse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p) * (t - p))
        .sum()
}

/// Root mean squared error.
pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return f64::NAN;
    }
    (sse(y_true, y_pred) / y_true.len() as f64).sqrt()
}

/// Coefficient of determination `R² = 1 − SS_res / SS_tot`.
///
/// Always `≤ 1`; negative when the model is worse than the mean. For constant
/// observations (`SS_tot = 0`) the ratio is undefined: a perfect prediction
/// scores `1`, anything else `−∞`.
pub fn r_squared(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return f64::NAN;
    }

    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res = sse(y_true, y_pred);
    let ss_tot: f64 = y_true.iter().map(|y| (y - mean) * (y - mean)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { f64::NEG_INFINITY };
    }
    1.0 - ss_res / ss_tot
}
