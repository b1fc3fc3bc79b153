//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and rendering
//! - exported to JSON/CSV
//! - reloaded later for plotting without refitting

use std::path::PathBuf;

use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::math::Termination;

/// Default input path (headerless CSV: `n,exact,approx,poisson,diff`).
pub const DEFAULT_INPUT: &str = "birthday_data.csv";

/// Default chart output path.
pub const DEFAULT_OUTPUT: &str = "birthday_curve.png";

/// Default cap on model evaluations per family fit, shared by its starting points.
pub const DEFAULT_MAX_EVALUATIONS: usize = 10_000;

/// Probability threshold highlighted on the chart and analysed in the report.
pub const THRESHOLD_PROBABILITY: f64 = 0.5;

/// Group size highlighted on the chart (the classic "23 people" answer).
pub const THRESHOLD_N: f64 = 23.0;

/// Plotted domain for `n`.
pub const PLOT_X_RANGE: [f64; 2] = [0.0, 100.0];

/// Plotted range for probabilities.
pub const PLOT_Y_RANGE: [f64; 2] = [0.0, 1.0];

/// A parametric curve family fitted to the collision probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// `a·(1 − e^(−b·n^c))`
    Exponential,
    /// `a / (1 + e^(−b·(n−c)))`
    Logistic,
    /// `a·n^b + c`
    Power,
    /// `a·n³ + b·n² + c·n + d`
    Polynomial,
}

impl Family {
    /// All families in report order. Ties in model selection go to the earlier entry.
    pub const ALL: [Family; 4] = [
        Family::Exponential,
        Family::Logistic,
        Family::Power,
        Family::Polynomial,
    ];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            Family::Exponential => "Exponential",
            Family::Logistic => "Logistic",
            Family::Power => "Power",
            Family::Polynomial => "Polynomial",
        }
    }

    /// Formula as printed in reports.
    pub fn formula(self) -> &'static str {
        match self {
            Family::Exponential => "y = a * (1 - exp(-b * n^c))",
            Family::Logistic => "y = a / (1 + exp(-b * (n - c)))",
            Family::Power => "y = a * n^b + c",
            Family::Polynomial => "y = a*n^3 + b*n^2 + c*n + d",
        }
    }

    /// Parameter names, in the order they appear in parameter vectors.
    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            Family::Exponential | Family::Logistic | Family::Power => &["a", "b", "c"],
            Family::Polynomial => &["a", "b", "c", "d"],
        }
    }

    /// Number of free parameters.
    pub fn param_count(self) -> usize {
        self.param_names().len()
    }

    /// Whether the family is linear in its parameters (solved directly, no iteration).
    pub fn is_linear(self) -> bool {
        matches!(self, Family::Polynomial)
    }
}

/// Which family (or families) to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FamilySpec {
    All,
    Exponential,
    Logistic,
    Power,
    Polynomial,
}

impl FamilySpec {
    pub fn families(self) -> Vec<Family> {
        match self {
            FamilySpec::All => Family::ALL.to_vec(),
            FamilySpec::Exponential => vec![Family::Exponential],
            FamilySpec::Logistic => vec![Family::Logistic],
            FamilySpec::Power => vec![Family::Power],
            FamilySpec::Polynomial => vec![Family::Polynomial],
        }
    }
}

/// One row of the input CSV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    /// Group size.
    pub n: u32,
    /// Exact collision probability `1 − ∏(365−i)/365`.
    pub exact: f64,
    /// `1 − e^(−n(n−1)/730)` approximation.
    pub approx: f64,
    /// Poisson approximation.
    pub poisson: f64,
    /// `|exact − approx|`.
    pub diff: f64,
}

/// Observed `(n, exact)` pair, the only columns that are fitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservedPoint {
    pub n: f64,
    pub p: f64,
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    pub r_squared: f64,
    pub sse: f64,
    pub rmse: f64,
    pub n: usize,
}

/// Solver bookkeeping for a single family fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverSummary {
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
    /// Index of the winning starting point (0 for linear families).
    pub start_index: usize,
}

/// Fitted parameters and diagnostics for one family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyFit {
    pub family: Family,
    pub params: Vec<f64>,
    pub quality: FitQuality,
    pub solver: SolverSummary,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub families: FamilySpec,
    pub max_evaluations: usize,

    /// Render the chart to `output`.
    pub render: bool,
    pub image_width: u32,
    pub image_height: u32,
    /// Show the chart in the terminal viewer after saving it.
    pub show: bool,

    pub ascii: bool,
    pub ascii_width: usize,
    pub ascii_height: usize,

    pub export_json: Option<PathBuf>,
    pub export_csv: Option<PathBuf>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            families: FamilySpec::All,
            max_evaluations: DEFAULT_MAX_EVALUATIONS,
            render: true,
            image_width: 1200,
            image_height: 800,
            show: false,
            ascii: false,
            ascii_width: 100,
            ascii_height: 25,
            export_json: None,
            export_csv: None,
        }
    }
}

/// A saved fits file (JSON), readable by `bday plot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitsFile {
    pub tool: String,
    pub generated_at: DateTime<Local>,
    pub input: PathBuf,
    pub points: Vec<ObservedPoint>,
    pub fits: Vec<FamilyFit>,
    pub best: Family,
}
