//! Reporting utilities: threshold analysis and formatted terminal output.

use crate::domain::{Family, THRESHOLD_N, THRESHOLD_PROBABILITY};
use crate::fit::FitSelection;
use crate::io::ingest::DatasetStats;
use crate::models::{predict, sample_curve};

pub mod format;

pub use format::*;

/// Domain over which fitted curves are searched for the 50% crossing.
pub const CROSSING_DOMAIN: [f64; 2] = [1.0, 100.0];

/// Where one fitted curve stands relative to the 50% threshold.
#[derive(Debug, Clone)]
pub struct FamilyThreshold {
    pub family: Family,
    /// Fitted probability at `n = 23`.
    pub at_threshold_n: f64,
    /// `n` at which the fitted curve first reaches 50%, if it does in the domain.
    pub crossing: Option<f64>,
}

/// Observed and fitted threshold behaviour.
#[derive(Debug, Clone)]
pub struct ThresholdSummary {
    pub observed_first_n: Option<u32>,
    pub observed_at_threshold_n: Option<f64>,
    pub families: Vec<FamilyThreshold>,
}

/// Compare each fitted curve against the 50% threshold.
pub fn threshold_summary(stats: &DatasetStats, selection: &FitSelection) -> ThresholdSummary {
    let families = selection
        .fits
        .iter()
        .map(|f| FamilyThreshold {
            family: f.family,
            at_threshold_n: predict(f.family, THRESHOLD_N, &f.params),
            crossing: crossing_point(
                f.family,
                &f.params,
                THRESHOLD_PROBABILITY,
                CROSSING_DOMAIN[0],
                CROSSING_DOMAIN[1],
            ),
        })
        .collect();

    ThresholdSummary {
        observed_first_n: stats.first_n_over_threshold,
        observed_at_threshold_n: stats.exact_at_threshold_n,
        families,
    }
}

/// First `n` in `[lo, hi]` where the fitted curve reaches `target`.
///
/// The curve is scanned on a fine grid for the first upward crossing, which is
/// then refined by bisection. Returns `None` if the curve never reaches `target`.
pub fn crossing_point(family: Family, params: &[f64], target: f64, lo: f64, hi: f64) -> Option<f64> {
    let grid = sample_curve(family, params, lo, hi, 1000);
    let (first_n, first_y) = *grid.first()?;
    if first_y >= target {
        return Some(first_n);
    }

    let bracket = grid
        .windows(2)
        .find(|w| w[0].1 < target && w[1].1 >= target)?;
    let (mut a, mut b) = (bracket[0].0, bracket[1].0);

    for _ in 0..60 {
        let mid = 0.5 * (a + b);
        if predict(family, mid, params) >= target {
            b = mid;
        } else {
            a = mid;
        }
    }
    Some(b)
}
