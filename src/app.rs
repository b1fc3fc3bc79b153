//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments (plus an optional `.env`)
//! - runs curve fitting + model selection
//! - prints reports/plots
//! - saves and shows the chart
//! - writes optional exports
//!
//! Every failure in those steps lands in one catch-all that prints the error
//! with a remediation hint.

use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;

use crate::cli::{Command, FitArgs, PlotArgs};
use crate::domain::FitConfig;
use crate::error::AppError;
use crate::report::{
    format_dataset_summary, format_diagnostics, format_failure, format_parameters, format_scores,
    format_threshold,
};

pub mod pipeline;

/// Entry point for the `bday` binary.
pub fn run() -> ExitCode {
    // `.env` is optional; a missing file is not an error.
    let _ = dotenvy::dotenv();

    // We want `bday` and `bday --input x.csv` to behave like `bday fit ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Fit(args) => handle_fit(args, OutputMode::Full),
        Command::Report(args) => handle_fit(args, OutputMode::ReportOnly),
        Command::Plot(args) => handle_plot(args),
    };

    if let Err(err) = result {
        tracing::debug!(error = %err, "run failed");
        println!("{}", format_failure(&err));
    }

    ExitCode::SUCCESS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Full,
    ReportOnly,
}

fn handle_fit(args: FitArgs, mode: OutputMode) -> Result<(), AppError> {
    let mut config = fit_config_from_args(&args);
    if mode == OutputMode::ReportOnly {
        config.render = false;
        config.show = false;
    }

    let run = pipeline::run_fit(&config)?;

    println!("{}", format_dataset_summary(&config.input, &run.ingest));
    println!("{}", format_scores(&run.selection));
    println!("{}", format_threshold(&run.thresholds));

    if config.render {
        let scene = crate::plot::build_scene(&run.points, &run.selection);
        crate::plot::save_chart(&config.output, &scene, config.image_width, config.image_height)?;
        println!("Chart saved to {}\n", config.output.display());
    }

    if config.ascii {
        let plot = crate::plot::render_ascii_plot(
            &run.points,
            &run.selection,
            config.ascii_width,
            config.ascii_height,
        );
        println!("{plot}");
    }

    if config.show && std::io::stdout().is_terminal() {
        let saved = config.render.then_some(config.output.as_path());
        crate::tui::run(&run.points, &run.selection, saved)?;
    }

    println!("{}", format_parameters(&run.selection));
    if mode == OutputMode::ReportOnly {
        println!("{}", format_diagnostics(&run.selection));
    }

    // Optional exports.
    if let Some(path) = &config.export_json {
        let fits = crate::io::fits::build_fits_file(&config.input, &run.points, &run.selection);
        crate::io::fits::write_fits_json(path, &fits)?;
        tracing::info!(path = %path.display(), "fits JSON written");
    }
    if let Some(path) = &config.export_csv {
        crate::io::export::write_predictions_csv(path, &run.ingest.rows, &run.selection)?;
        tracing::info!(path = %path.display(), "predictions CSV written");
    }

    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let fits = crate::io::fits::read_fits_json(&args.fits)?;
    let selection = fits.selection();
    tracing::info!(path = %args.fits.display(), families = selection.fits.len(), "fits loaded");

    println!("{}", format_scores(&selection));

    if let Some(path) = &args.output {
        let scene = crate::plot::build_scene(&fits.points, &selection);
        crate::plot::save_chart(path, &scene, args.width, args.height)?;
        println!("Chart saved to {}\n", path.display());
    }

    if args.ascii {
        let plot = crate::plot::render_ascii_plot(&fits.points, &selection, args.ascii_width, args.ascii_height);
        println!("{plot}");
    }

    if !args.no_show && std::io::stdout().is_terminal() {
        crate::tui::run(&fits.points, &selection, args.output.as_deref())?;
    }

    println!("{}", format_parameters(&selection));
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        input: args.input.clone(),
        output: args.output.clone(),
        families: args.families,
        max_evaluations: args.max_evals,
        render: true,
        image_width: args.width,
        image_height: args.height,
        show: !args.no_show,
        ascii: args.ascii,
        ascii_width: args.ascii_width,
        ascii_height: args.ascii_height,
        export_json: args.export_json.clone(),
        export_csv: args.export_csv.clone(),
    }
}

/// Rewrite argv so `bday` defaults to `bday fit`.
///
/// Rules:
/// - `bday`                      -> `bday fit`
/// - `bday --input x.csv ...`    -> `bday fit --input x.csv ...`
/// - `bday --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("fit".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "fit" | "report" | "plot");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "fit flags".
    if arg1.starts_with('-') {
        argv.insert(1, "fit".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
