//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input records (`SampleRow`, `ObservedPoint`)
//! - curve families and selection (`Family`, `FamilySpec`)
//! - fit outputs (`FamilyFit`, `FitQuality`, `FitsFile`)
//! - run configuration (`FitConfig`)

pub mod types;

pub use types::*;
