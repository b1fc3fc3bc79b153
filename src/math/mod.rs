//! Mathematical utilities: linear and nonlinear least squares, fit metrics.

pub mod lm;
pub mod metrics;
pub mod ols;

pub use lm::*;
pub use metrics::*;
pub use ols::*;
