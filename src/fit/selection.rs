//! Fit every requested family and select the best by R².
//!
//! Selection rules:
//! 1. Every requested family must fit; the first failure aborts the run.
//! 2. Choose the family with the largest finite R².
//! 3. Ties go to the earlier family in `Family::ALL` order.

use crate::domain::{Family, FamilyFit, FitConfig, ObservedPoint};
use crate::error::AppError;
use crate::fit::fitter::{fit_family, FitOptions};

/// Output of fitting + selection.
#[derive(Debug, Clone)]
pub struct FitSelection {
    /// Fits in `Family::ALL` order (restricted to the requested families).
    pub fits: Vec<FamilyFit>,
    pub best: Family,
}

impl FitSelection {
    pub fn best_fit(&self) -> &FamilyFit {
        // `best` is always taken from `fits` in `select_by_r_squared`.
        self.get(self.best).unwrap_or(&self.fits[0])
    }

    pub fn get(&self, family: Family) -> Option<&FamilyFit> {
        self.fits.iter().find(|f| f.family == family)
    }
}

/// Fit the configured families and select the best.
pub fn fit_and_select(points: &[ObservedPoint], config: &FitConfig) -> Result<FitSelection, AppError> {
    let opts = FitOptions {
        max_evaluations: config.max_evaluations,
    };

    let mut fits = Vec::new();
    for family in config.families.families() {
        let fit = fit_family(family, points, &opts)?;
        tracing::info!(
            family = family.display_name(),
            r_squared = fit.quality.r_squared,
            sse = fit.quality.sse,
            evaluations = fit.solver.evaluations,
            "family fitted"
        );
        fits.push(fit);
    }

    let best = select_by_r_squared(&fits)?;
    Ok(FitSelection { fits, best })
}

/// Pick the family with maximum R².
pub fn select_by_r_squared(fits: &[FamilyFit]) -> Result<Family, AppError> {
    let mut best: Option<&FamilyFit> = None;
    for f in fits {
        if !f.quality.r_squared.is_finite() {
            continue;
        }
        match best {
            Some(b) if f.quality.r_squared <= b.quality.r_squared => {}
            _ => best = Some(f),
        }
    }

    best.map(|f| f.family)
        .ok_or_else(|| AppError::new("No fit produced a finite R²."))
}
