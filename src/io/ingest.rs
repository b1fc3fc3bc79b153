//! CSV ingest and validation.
//!
//! The input is a headerless CSV with columns `n, exact, approx, poisson, diff`
//! (one row per group size), as written by the birthday-curve analysis tool.
//!
//! Design goals:
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (file order is preserved)
//! - **Separation of concerns**: no fitting logic here

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{ObservedPoint, SampleRow, THRESHOLD_N, THRESHOLD_PROBABILITY};
use crate::error::AppError;

/// Columns in file order.
pub const COLUMNS: [&str; 5] = ["n", "exact", "approx", "poisson", "diff"];

/// Summary stats about the rows actually used for fitting.
#[derive(Debug, Clone)]
pub struct DatasetStats {
    pub n_rows: usize,
    pub n_min: u32,
    pub n_max: u32,
    pub exact_min: f64,
    pub exact_max: f64,
    /// Largest finite `|diff|` (exact vs. approximation), if any.
    pub max_diff: Option<f64>,
    /// Smallest `n` whose exact probability reaches the 50% threshold.
    pub first_n_over_threshold: Option<u32>,
    /// Exact probability at `n = 23`, when that row is present.
    pub exact_at_threshold_n: Option<f64>,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: parsed rows + stats + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub rows: Vec<SampleRow>,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl IngestedData {
    /// The `(n, exact)` pairs that get fitted.
    pub fn points(&self) -> Vec<ObservedPoint> {
        self.rows
            .iter()
            .map(|r| ObservedPoint {
                n: f64::from(r.n),
                p: r.exact,
            })
            .collect()
    }
}

/// Load and validate the sample CSV at `path`.
pub fn load_samples(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_samples(file).map_err(|e| e.context(format!("'{}'", path.display())))
}

/// Parse samples from any reader (headerless CSV).
pub fn read_samples<R: Read>(reader: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, record) in reader.records().enumerate() {
        rows_read += 1;

        // Physical line in the file; the reader skips empty lines, so the
        // record index alone drifts after a blank line.
        let position = match &record {
            Ok(r) => r.position(),
            Err(e) => e.position(),
        };
        let line = position.map_or(idx + 1, |p| p.line() as usize);

        let record = match record {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("unreadable row: {e}"),
                });
                continue;
            }
        };

        if is_blank(&record) {
            rows_read -= 1;
            continue;
        }

        match parse_row(&record) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    for err in &row_errors {
        tracing::warn!(line = err.line, "skipping row: {}", err.message);
    }

    let stats = compute_stats(&rows).ok_or_else(|| {
        AppError::new(format!(
            "No usable rows (read {rows_read}, rejected {}). Expected headerless columns: {}.",
            row_errors.len(),
            COLUMNS.join(",")
        ))
    })?;

    Ok(IngestedData {
        rows,
        stats,
        row_errors,
        rows_read,
    })
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|f| f.is_empty())
}

fn parse_row(record: &StringRecord) -> Result<SampleRow, String> {
    if record.len() < 2 {
        return Err(format!(
            "expected at least columns n,exact; got {} field(s)",
            record.len()
        ));
    }

    let n = parse_group_size(record.get(0).unwrap_or(""))?;
    let exact = parse_required(record, 1)?;
    if !(0.0..=1.0).contains(&exact) {
        return Err(format!("exact={exact} is not a probability in [0,1]"));
    }

    Ok(SampleRow {
        n,
        exact,
        approx: parse_optional(record, 2)?,
        poisson: parse_optional(record, 3)?,
        diff: parse_optional(record, 4)?,
    })
}

/// `n` must be a positive integer; `"23"` and `"23.0"` are both accepted.
fn parse_group_size(raw: &str) -> Result<u32, String> {
    if let Ok(n) = raw.parse::<u32>() {
        return if n > 0 {
            Ok(n)
        } else {
            Err("n must be positive".to_string())
        };
    }

    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 1.0 && v.fract() == 0.0 && v <= f64::from(u32::MAX) => {
            Ok(v as u32)
        }
        Ok(v) => Err(format!("n={v} is not a positive integer")),
        Err(_) => Err(format!("n='{raw}' is not a number")),
    }
}

fn parse_required(record: &StringRecord, idx: usize) -> Result<f64, String> {
    let raw = record.get(idx).unwrap_or("");
    let v: f64 = raw
        .parse()
        .map_err(|_| format!("{}='{raw}' is not a number", COLUMNS[idx]))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("{}={v} is not finite", COLUMNS[idx]))
    }
}

/// Trailing columns are informational; a missing field reads as NaN.
fn parse_optional(record: &StringRecord, idx: usize) -> Result<f64, String> {
    match record.get(idx) {
        None | Some("") => Ok(f64::NAN),
        Some(_) => parse_required(record, idx),
    }
}

fn compute_stats(rows: &[SampleRow]) -> Option<DatasetStats> {
    let first = rows.first()?;

    let mut stats = DatasetStats {
        n_rows: rows.len(),
        n_min: first.n,
        n_max: first.n,
        exact_min: first.exact,
        exact_max: first.exact,
        max_diff: None,
        first_n_over_threshold: None,
        exact_at_threshold_n: None,
    };

    for r in rows {
        stats.n_min = stats.n_min.min(r.n);
        stats.n_max = stats.n_max.max(r.n);
        stats.exact_min = stats.exact_min.min(r.exact);
        stats.exact_max = stats.exact_max.max(r.exact);

        if r.diff.is_finite() {
            let d = r.diff.abs();
            stats.max_diff = Some(stats.max_diff.map_or(d, |m| m.max(d)));
        }
        if r.exact >= THRESHOLD_PROBABILITY {
            stats.first_n_over_threshold =
                Some(stats.first_n_over_threshold.map_or(r.n, |m| m.min(r.n)));
        }
        if f64::from(r.n) == THRESHOLD_N {
            stats.exact_at_threshold_n = Some(r.exact);
        }
    }

    Some(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headerless_rows() {
        let csv = "1,0.000000,0.000000,0.000000,0.000000\n\
                   22,0.475695,0.469494,0.469494,0.006201\n\
                   23,0.507297,0.500002,0.500002,0.007295\n";
        let data = read_samples(csv.as_bytes()).unwrap();

        assert_eq!(data.rows.len(), 3);
        assert!(data.row_errors.is_empty());
        assert_eq!(data.rows[2].n, 23);
        assert_eq!(data.stats.n_min, 1);
        assert_eq!(data.stats.n_max, 23);
        assert_eq!(data.stats.first_n_over_threshold, Some(23));
        assert_eq!(data.stats.exact_at_threshold_n, Some(0.507297));
        assert_eq!(data.stats.max_diff, Some(0.007295));

        let points = data.points();
        assert_eq!(points[1], ObservedPoint { n: 22.0, p: 0.475695 });
    }

    #[test]
    fn bad_rows_are_skipped_and_reported() {
        let csv = "n,Exact,Approximation,Poisson,Difference\n\
                   2,0.002740,0.002736,0.002736,0.000004\n\
                   0,0.1,0.1,0.1,0.0\n\
                   3,1.5,0,0,0\n\
                   4.5,0.01,0,0,0\n\
                   \n\
                   5, 0.027136 ,0.027025,0.027025,0.000111\n";
        let data = read_samples(csv.as_bytes()).unwrap();

        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.rows[1].n, 5);
        assert!((data.rows[1].exact - 0.027136).abs() < 1e-12);
        let lines: Vec<usize> = data.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![1, 3, 4, 5]);
        assert_eq!(data.rows_read, 6);
    }

    #[test]
    fn error_lines_count_blank_lines() {
        let csv = "1,0.000000


x,0.1
2,0.002740

7,2.0
";
        let data = read_samples(csv.as_bytes()).unwrap();

        assert_eq!(data.rows.len(), 2);
        let lines: Vec<usize> = data.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![4, 7]);
    }

    #[test]
    fn trailing_columns_are_optional() {
        let data = read_samples("10,0.116948\n".as_bytes()).unwrap();
        assert_eq!(data.rows[0].n, 10);
        assert!(data.rows[0].approx.is_nan());
        assert_eq!(data.stats.max_diff, None);
        assert_eq!(data.stats.exact_at_threshold_n, None);
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = read_samples("".as_bytes()).unwrap_err();
        assert!(err.message().contains("No usable rows"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join("bday-definitely-missing-input.csv");
        let err = load_samples(&path).unwrap_err();
        assert!(err.message().contains("Failed to open CSV"), "{err}");
    }
}
