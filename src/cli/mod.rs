//! Command-line parsing for the birthday-paradox curve fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{FamilySpec, DEFAULT_INPUT, DEFAULT_MAX_EVALUATIONS, DEFAULT_OUTPUT};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "bday", version, about = "Birthday paradox curve fitter")]
pub struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit all families, print scores and parameters, save and show the chart.
    Fit(FitArgs),
    /// Fit and print the report only (no chart).
    Report(FitArgs),
    /// Re-render a chart from a fits JSON written by `bday fit --export-json`.
    Plot(PlotArgs),
}

/// Options for fitting and reporting.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Headerless CSV with columns n,exact,approx,poisson,diff.
    #[arg(short = 'i', long, env = "BDAY_INPUT", default_value = DEFAULT_INPUT)]
    pub input: PathBuf,

    /// Chart output path (.png or .svg).
    #[arg(short = 'o', long, env = "BDAY_OUTPUT", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Which family (or families) to fit.
    #[arg(long, value_enum, default_value_t = FamilySpec::All)]
    pub families: FamilySpec,

    /// Cap on model evaluations per family, shared by its starting points.
    #[arg(long, default_value_t = DEFAULT_MAX_EVALUATIONS)]
    pub max_evals: usize,

    /// Chart width in pixels.
    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    /// Chart height in pixels.
    #[arg(long, default_value_t = 800)]
    pub height: u32,

    /// Do not open the terminal chart viewer after saving.
    #[arg(long)]
    pub no_show: bool,

    /// Also print an ASCII plot.
    #[arg(long)]
    pub ascii: bool,

    /// ASCII plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub ascii_width: usize,

    /// ASCII plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub ascii_height: usize,

    /// Export the fits (parameters, R², observed points) to JSON.
    #[arg(long = "export-json", value_name = "PATH")]
    pub export_json: Option<PathBuf>,

    /// Export per-row observed and fitted values to CSV.
    #[arg(long = "export-csv", value_name = "PATH")]
    pub export_csv: Option<PathBuf>,
}

/// Options for plotting saved fits.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Fits JSON file produced by `bday fit --export-json`.
    #[arg(long, value_name = "JSON")]
    pub fits: PathBuf,

    /// Write the chart to this path (.png or .svg).
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Chart width in pixels.
    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    /// Chart height in pixels.
    #[arg(long, default_value_t = 800)]
    pub height: u32,

    /// Do not open the terminal chart viewer.
    #[arg(long)]
    pub no_show: bool,

    /// Print an ASCII plot.
    #[arg(long)]
    pub ascii: bool,

    /// ASCII plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub ascii_width: usize,

    /// ASCII plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub ascii_height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_defaults() {
        let cli = Cli::try_parse_from(["bday", "fit"]).unwrap();
        assert_eq!(cli.log_level, tracing::Level::WARN);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.max_evals, 10_000);
        assert_eq!(args.families, FamilySpec::All);
        assert_eq!((args.width, args.height), (1200, 800));
        assert!(!args.no_show && !args.ascii);
        assert!(args.export_json.is_none());
    }

    #[test]
    fn global_log_level_after_subcommand() {
        let cli = Cli::try_parse_from([
            "bday",
            "report",
            "--families",
            "logistic",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
        let Command::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.families, FamilySpec::Logistic);
    }

    #[test]
    fn plot_requires_fits() {
        assert!(Cli::try_parse_from(["bday", "plot"]).is_err());
        let cli = Cli::try_parse_from(["bday", "plot", "--fits", "fits.json", "--ascii"]).unwrap();
        let Command::Plot(args) = cli.command else {
            panic!("expected plot");
        };
        assert_eq!(args.fits, PathBuf::from("fits.json"));
        assert!(args.ascii && args.output.is_none());
    }
}
