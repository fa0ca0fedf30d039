//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and resolves settings
//! - loads the dataset (CSV or synthetic)
//! - runs processing / correlation / views
//! - prints reports/plots and writes optional exports

use std::fs::File;
use std::sync::Mutex;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, CompareArgs, CorrelateArgs, DataArgs, ExploreArgs, FetchArgs, ProcessArgs, TableArgs};
use crate::config::{DEFAULT_LOG_FILTER, Settings, TUI_LOG_FILE};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `covx` binary.
pub fn run() -> Result<(), AppError> {
    // We want `covx` and `covx -c Italy` to behave like `covx tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    let settings = Settings::from_env();

    let to_file = matches!(cli.command, Command::Tui(_));
    init_logging(&settings.log_filter, to_file)?;

    match cli.command {
        Command::Process(args) => handle_process(args, &settings),
        Command::Correlate(args) => handle_correlate(args, &settings),
        Command::Table(args) => handle_table(args, &settings),
        Command::Trend(args) => handle_trend(args, &settings),
        Command::Explore(args) => handle_explore(args, &settings),
        Command::Compare(args) => handle_compare(args, &settings),
        Command::Fetch(args) => handle_fetch(args, &settings),
        Command::Countries(args) => handle_countries(args, &settings),
        Command::Tui(args) => crate::tui::run(args, settings),
    }
}

/// Install the global subscriber: stderr for CLI commands, a log file for the TUI.
fn init_logging(filter: &str, to_file: bool) -> Result<(), AppError> {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let result = if to_file {
        let file = File::create(TUI_LOG_FILE)
            .map_err(|e| AppError::new(2, format!("Failed to create log file '{TUI_LOG_FILE}': {e}")))?;
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init()
    };

    // Already installed (e.g. by a test harness) is fine.
    result.ok();
    Ok(())
}

fn open(args: &DataArgs, settings: &Settings) -> Result<(pipeline::Dataset, String), AppError> {
    let dataset = pipeline::load_dataset(args, settings)?;
    let country = pipeline::resolve_country(args, settings, &dataset);
    info!(source = %dataset.source, country = %country, countries = dataset.countries.len(), "dataset ready");
    Ok((dataset, country))
}

fn handle_process(args: ProcessArgs, settings: &Settings) -> Result<(), AppError> {
    let (mut dataset, country) = open(&args.data, settings)?;
    let series = dataset.cache.series(&country)?;

    println!("{}", crate::report::format_series_summary(&series));

    if let Some(path) = &args.export {
        crate::io::write_series_csv(path, &series)?;
        println!("Wrote {} rows to {}", series.len(), path.display());
    }
    Ok(())
}

fn handle_correlate(args: CorrelateArgs, settings: &Settings) -> Result<(), AppError> {
    let (mut dataset, country) = open(&args.data, settings)?;
    let lagged = pipeline::run_lag_search(&mut dataset, &country, args.a, args.b, args.lookback)?;

    println!("{}", crate::report::format_lagged(&lagged));
    if args.plot {
        println!("{}", crate::plot::render_lagged_plot(&lagged, args.width, args.height));
    }
    Ok(())
}

fn handle_table(args: TableArgs, settings: &Settings) -> Result<(), AppError> {
    let (mut dataset, country) = open(&args.data, settings)?;
    let columns = pipeline::resolve_columns(&args.columns, settings)?;

    let report = pipeline::run_table(&mut dataset, &country, &columns, args.lag)?;

    println!("Correlations for {} ({} rows)\n", report.country, report.rows);
    println!("{}", crate::report::format_correlation_table(&report.table));
    println!("{}", crate::report::format_pairs(report.top_pair.as_ref(), &report.pairs));
    if let Some(lagged) = &report.lagged {
        println!("{}", crate::report::format_lagged(lagged));
    }

    if let Some(path) = &args.export {
        crate::io::write_correlations_json(path, &report)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn handle_trend(args: DataArgs, settings: &Settings) -> Result<(), AppError> {
    let (dataset, country) = open(&args, settings)?;
    let report = crate::views::fit_trends(dataset.records(), &country)?;
    println!("{}", crate::report::format_trends(&report));
    Ok(())
}

fn handle_explore(args: ExploreArgs, settings: &Settings) -> Result<(), AppError> {
    let (dataset, country) = open(&args.data, settings)?;
    let view = crate::views::explore(dataset.records(), &country, args.options())?;
    println!("{}", crate::report::format_explorer(&view));
    Ok(())
}

fn handle_compare(args: CompareArgs, settings: &Settings) -> Result<(), AppError> {
    let (dataset, country) = open(&args.data, settings)?;
    let cmp = crate::views::compare_countries(dataset.records(), &country, &args.other)?;
    println!("{}", crate::report::format_comparison(&cmp));
    Ok(())
}

fn handle_fetch(args: FetchArgs, settings: &Settings) -> Result<(), AppError> {
    let dest = args.out.unwrap_or_else(|| settings.data_path.clone());
    let url = args.url.unwrap_or_else(|| settings.data_url.clone());

    let bytes = crate::data::download_dataset(&url, &dest)?;
    println!("Downloaded {bytes} bytes to {}", dest.display());
    Ok(())
}

fn handle_countries(args: DataArgs, settings: &Settings) -> Result<(), AppError> {
    let dataset = pipeline::load_dataset(&args, settings)?;
    for c in &dataset.countries {
        println!("{c}");
    }
    Ok(())
}

/// Rewrite argv so `covx` defaults to `covx tui`.
///
/// Rules:
/// - `covx`                      -> `covx tui`
/// - `covx -c Italy ...`         -> `covx tui -c Italy ...`
/// - `covx --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_launches_tui() {
        assert_eq!(rewrite_args(argv(&["covx"])), argv(&["covx", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["covx", "-c", "Italy"])),
            argv(&["covx", "tui", "-c", "Italy"])
        );
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        assert_eq!(rewrite_args(argv(&["covx", "--help"])), argv(&["covx", "--help"]));
        assert_eq!(
            rewrite_args(argv(&["covx", "trend", "--sample"])),
            argv(&["covx", "trend", "--sample"])
        );
    }
}
