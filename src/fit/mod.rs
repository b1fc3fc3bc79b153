//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - generate starting points for the nonlinear families
//! - fit each family (Levenberg–Marquardt or direct linear solve)
//! - select the best family by R²

pub mod fitter;
pub mod selection;
pub mod start;

pub use fitter::*;
pub use selection::*;
pub use start::*;
