//! Chart rendering.
//!
//! - Plotters overlay chart for PNG/SVG files and the terminal viewer (`chart`)
//! - fixed-grid ASCII plot for quick checks (`ascii`)

pub mod ascii;
pub mod chart;

pub use ascii::*;
pub use chart::*;
