//! `birthday-curves` library crate.
//!
//! The binary (`bday`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the fitting code is reusable without the chart and viewer front-ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod tui;
