//! Read/write fits JSON files.
//!
//! A fits file is the portable record of one run:
//! - the observed `(n, exact)` points
//! - every family's parameters, quality and solver summary
//! - which family won
//!
//! `bday plot --fits <file>` re-renders a chart from it without refitting.
//! The schema is defined by `domain::FitsFile`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Local;

use crate::domain::{FitsFile, ObservedPoint};
use crate::error::AppError;
use crate::fit::FitSelection;

pub const TOOL_NAME: &str = "bday";

/// Assemble the serializable record of a run.
pub fn build_fits_file(input: &Path, points: &[ObservedPoint], selection: &FitSelection) -> FitsFile {
    FitsFile {
        tool: TOOL_NAME.to_string(),
        generated_at: Local::now(),
        input: input.to_path_buf(),
        points: points.to_vec(),
        fits: selection.fits.clone(),
        best: selection.best,
    }
}

/// Write a fits JSON file.
pub fn write_fits_json(path: &Path, fits: &FitsFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(format!("Failed to create fits JSON '{}': {e}", path.display())))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, fits)
        .map_err(|e| AppError::new(format!("Failed to write fits JSON: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::new(format!("Failed to write fits JSON: {e}")))?;

    Ok(())
}

/// Read a fits JSON file.
pub fn read_fits_json(path: &Path) -> Result<FitsFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(format!("Failed to open fits JSON '{}': {e}", path.display())))?;
    let fits: FitsFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(format!("Invalid fits JSON: {e}")))?;

    if fits.fits.iter().all(|f| f.family != fits.best) {
        return Err(AppError::new(format!(
            "Invalid fits JSON: best family {:?} has no fit entry.",
            fits.best
        )));
    }
    if let Some(bad) = fits.fits.iter().find(|f| f.params.len() != f.family.param_count()) {
        return Err(AppError::new(format!(
            "Invalid fits JSON: {} has {} parameters, expected {}.",
            bad.family.display_name(),
            bad.params.len(),
            bad.family.param_count()
        )));
    }

    Ok(fits)
}

impl FitsFile {
    /// Rebuild the in-memory selection for rendering.
    pub fn selection(&self) -> FitSelection {
        FitSelection {
            fits: self.fits.clone(),
            best: self.best,
        }
    }
}
