//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - per-row prediction export (`export`)
//! - fits JSON read/write (`fits`)

pub mod export;
pub mod fits;
pub mod ingest;

pub use export::*;
pub use fits::*;
pub use ingest::*;
