//! Shared "fit pipeline" logic used by the `fit` and `report` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! CSV load -> fit each family -> select by R² -> threshold analysis
//!
//! The callers can then focus on presentation (printing, charts, viewer).

use crate::domain::{FitConfig, ObservedPoint};
use crate::error::AppError;
use crate::fit::selection::{fit_and_select, FitSelection};
use crate::io::ingest::{load_samples, IngestedData};
use crate::report::{threshold_summary, ThresholdSummary};

/// All computed outputs of a single `bday fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub points: Vec<ObservedPoint>,
    pub selection: FitSelection,
    pub thresholds: ThresholdSummary,
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let ingest = load_samples(&config.input)?;
    tracing::info!(
        path = %config.input.display(),
        rows = ingest.rows.len(),
        skipped = ingest.row_errors.len(),
        "data loaded"
    );

    let points = ingest.points();
    let selection = fit_and_select(&points, config)?;
    tracing::info!(best = selection.best.display_name(), "best family selected");

    let thresholds = threshold_summary(&ingest.stats, &selection);

    Ok(RunOutput {
        ingest,
        points,
        selection,
        thresholds,
    })
}
