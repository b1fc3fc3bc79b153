//! Export per-row fitted values to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream
//! scripts: the input columns, followed by one column per fitted family.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::SampleRow;
use crate::error::AppError;
use crate::fit::FitSelection;
use crate::io::ingest::COLUMNS;
use crate::models::predict;

/// Write per-row observed and fitted values to a CSV file.
pub fn write_predictions_csv(path: &Path, rows: &[SampleRow], selection: &FitSelection) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_predictions(&mut out, rows, selection)?;
    out.flush()
        .map_err(|e| AppError::new(format!("Failed to write export CSV: {e}")))
}

/// Write the export to any writer (header + one line per row).
pub fn write_predictions<W: Write>(out: &mut W, rows: &[SampleRow], selection: &FitSelection) -> Result<(), AppError> {
    let mut header: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
    header.extend(
        selection
            .fits
            .iter()
            .map(|f| f.family.display_name().to_lowercase()),
    );
    writeln!(out, "{}", header.join(","))
        .map_err(|e| AppError::new(format!("Failed to write export CSV header: {e}")))?;

    for r in rows {
        let mut fields = vec![
            r.n.to_string(),
            fmt_value(r.exact),
            fmt_value(r.approx),
            fmt_value(r.poisson),
            fmt_value(r.diff),
        ];
        fields.extend(
            selection
                .fits
                .iter()
                .map(|f| fmt_value(predict(f.family, f64::from(r.n), &f.params))),
        );
        writeln!(out, "{}", fields.join(","))
            .map_err(|e| AppError::new(format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}

/// Six decimals like the input; missing optional values stay empty.
fn fmt_value(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.6}")
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Family, FamilyFit, FitQuality, SolverSummary};
    use crate::math::Termination;

    #[test]
    fn export_has_one_column_per_family() {
        let selection = FitSelection {
            fits: vec![FamilyFit {
                family: Family::Power,
                params: vec![0.01, 1.0, 0.0],
                quality: FitQuality {
                    r_squared: 1.0,
                    sse: 0.0,
                    rmse: 0.0,
                    n: 1,
                },
                solver: SolverSummary {
                    iterations: 1,
                    evaluations: 2,
                    termination: Termination::SmallStep,
                    start_index: 0,
                },
            }],
            best: Family::Power,
        };
        let rows = [SampleRow {
            n: 23,
            exact: 0.507297,
            approx: 0.500002,
            poisson: f64::NAN,
            diff: 0.007295,
        }];

        let mut buf = Vec::new();
        write_predictions(&mut buf, &rows, &selection).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "n,exact,approx,poisson,diff,power\n23,0.507297,0.500002,,0.007295,0.230000\n"
        );
    }
}
