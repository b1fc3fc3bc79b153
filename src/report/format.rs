//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (and covered by snapshot-style tests)

use std::path::Path;

use crate::domain::{FamilyFit, THRESHOLD_N, THRESHOLD_PROBABILITY};
use crate::error::AppError;
use crate::fit::FitSelection;
use crate::io::ingest::IngestedData;
use crate::report::ThresholdSummary;

/// Printed after any failure of the load/fit/plot pipeline.
pub const REMEDIATION_HINT: &str = "Make sure the input CSV exists (headerless columns: n,exact,approx,poisson,diff; \
generate it with the birthday-curve analysis tool) and that bday was built with its numerical \
and plotting dependencies (nalgebra, plotters; enable the `fonts` feature for labelled PNG charts).";

/// Format the dataset summary printed before the scores.
pub fn format_dataset_summary(path: &Path, ingest: &IngestedData) -> String {
    let s = &ingest.stats;
    let mut out = String::new();

    out.push_str(&format!("Input: {}\n", path.display()));
    out.push_str(&format!(
        "Points: {} | n=[{}, {}] | exact=[{:.6}, {:.6}]",
        s.n_rows, s.n_min, s.n_max, s.exact_min, s.exact_max
    ));
    if let Some(d) = s.max_diff {
        out.push_str(&format!(" | max |exact-approx|={d:.6}"));
    }
    out.push('\n');

    if !ingest.row_errors.is_empty() {
        out.push_str(&format!(
            "Skipped {} of {} rows (first: line {}: {})\n",
            ingest.row_errors.len(),
            ingest.rows_read,
            ingest.row_errors[0].line,
            ingest.row_errors[0].message
        ));
    }

    out
}

/// Format the R² table and the best-fit line.
pub fn format_scores(selection: &FitSelection) -> String {
    let mut out = String::new();

    out.push_str("Best Fit Functions for Birthday Paradox:\n");
    out.push_str("=======================================\n");
    for fit in &selection.fits {
        out.push_str(&format!(
            "{:<12} R² = {:.6}\n",
            format!("{}:", fit.family.display_name()),
            fit.quality.r_squared
        ));
    }

    let best = selection.best_fit();
    out.push_str(&format!(
        "\nBest fit: {} (R² = {:.6})\n",
        best.family.display_name(),
        best.quality.r_squared
    ));

    out
}

/// Format fitted parameters, one line per family.
pub fn format_parameters(selection: &FitSelection) -> String {
    let mut out = String::new();
    for fit in &selection.fits {
        out.push_str(&format!(
            "{} fit parameters: {}\n",
            fit.family.display_name(),
            fmt_params(fit)
        ));
    }
    out
}

/// Format solver diagnostics (formula, RMSE, evaluations, stopping reason).
pub fn format_diagnostics(selection: &FitSelection) -> String {
    let mut out = String::from("Diagnostics:\n");
    for fit in &selection.fits {
        let chosen = if fit.family == selection.best { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:<12} {:<33} RMSE={:.6} evals={} ({})\n",
            fit.family.display_name(),
            fit.family.formula(),
            fit.quality.rmse,
            fit.solver.evaluations,
            fit.solver.termination.label()
        ));
    }
    out
}

/// Format the 50% threshold comparison.
pub fn format_threshold(summary: &ThresholdSummary) -> String {
    let pct = THRESHOLD_PROBABILITY * 100.0;
    let mut out = format!("{pct:.0}% threshold:\n");

    match summary.observed_first_n {
        Some(n) => out.push_str(&format!("  observed: first n with P >= {THRESHOLD_PROBABILITY} is {n}\n")),
        None => out.push_str(&format!("  observed: P never reaches {THRESHOLD_PROBABILITY}\n")),
    }
    if let Some(p) = summary.observed_at_threshold_n {
        out.push_str(&format!("  observed: P(n={THRESHOLD_N}) = {p:.6}\n"));
    }

    for f in &summary.families {
        let crossing = f
            .crossing
            .map(|n| format!("crosses at n={n:.3}"))
            .unwrap_or_else(|| "does not cross in [1, 100]".to_string());
        out.push_str(&format!(
            "  {:<12} P(n={THRESHOLD_N}) = {:.6}, {crossing}\n",
            f.family.display_name(),
            f.at_threshold_n
        ));
    }

    out
}

/// Format a caught pipeline failure with its remediation hint.
pub fn format_failure(err: &AppError) -> String {
    format!("Error in curve fitting: {err}\n{REMEDIATION_HINT}")
}

fn fmt_params(fit: &FamilyFit) -> String {
    fit.family
        .param_names()
        .iter()
        .zip(&fit.params)
        .map(|(name, v)| format!("{name}={v:.6}"))
        .collect::<Vec<_>>()
        .join(", ")
}
