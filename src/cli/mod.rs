//! Command-line parsing for the COVID-19 data explorer.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the processing/correlation code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::Metric;
use crate::views::{ExplorerOptions, MOVING_AVERAGE_RANGE, TABLE_DAYS_RANGE};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "covx", version, about = "COVID-19 data explorer (OWID dataset)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Derive the smoothed analysis series for a country; optionally export it as CSV.
    Process(ProcessArgs),
    /// Find the shift at which column A best correlates with column B.
    Correlate(CorrelateArgs),
    /// Print the correlation table of the analysis columns and the most correlated pair.
    Table(TableArgs),
    /// Fit straight-line trends of total cases and full vaccinations.
    Trend(DataArgs),
    /// Summary table with a configurable moving average of new cases.
    Explore(ExploreArgs),
    /// Compare the case trajectories of two countries.
    Compare(CompareArgs),
    /// Download the OWID dataset.
    Fetch(FetchArgs),
    /// List the countries present in the dataset.
    Countries(DataArgs),
    /// Launch the interactive dashboard.
    ///
    /// Bare `covx` (or `covx -c X`) is rewritten to this subcommand.
    Tui(DataArgs),
}

/// Dataset selection shared by every command that reads data.
#[derive(Debug, Args, Clone, Default)]
pub struct DataArgs {
    /// Dataset CSV (defaults to `COVX_DATA`, then `Data/owid-covid-data.csv`).
    #[arg(long, value_name = "CSV")]
    pub data: Option<PathBuf>,

    /// Use the built-in synthetic dataset instead of a CSV.
    #[arg(long, conflicts_with = "data")]
    pub sample: bool,

    /// Country (defaults to `COVX_COUNTRY`, then `United States`).
    #[arg(short = 'c', long)]
    pub country: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Export the derived series to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct CorrelateArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Column shifted forward in time.
    #[arg(short = 'a', long, value_enum, default_value_t = Metric::NewCases)]
    pub a: Metric,

    /// Column held in place.
    #[arg(short = 'b', long, value_enum, default_value_t = Metric::NewDeaths)]
    pub b: Metric,

    /// Number of most recent rows to search (0 = whole series; default: all but the first 90).
    #[arg(long)]
    pub lookback: Option<usize>,

    /// Render an ASCII plot of the aligned columns.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct TableArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Analysis columns (repeatable; defaults to `COVX_COLUMNS`, then the standard set).
    #[arg(long = "column", value_enum)]
    pub columns: Vec<Metric>,

    /// Also run the lag search on the top pair.
    #[arg(long)]
    pub lag: bool,

    /// Export the table, pairs and lag search to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ExploreArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Rows in the summary table (clamped to 3..=15).
    #[arg(long, default_value_t = ExplorerOptions::default().table_days)]
    pub table_days: usize,

    /// Moving-average window in days (clamped to 5..=14).
    #[arg(long = "moving-average", default_value_t = ExplorerOptions::default().moving_average_days)]
    pub moving_average_days: usize,
}

impl ExploreArgs {
    pub fn options(&self) -> ExplorerOptions {
        let opts = ExplorerOptions {
            table_days: self.table_days,
            moving_average_days: self.moving_average_days,
        };
        let clamped = opts.clamped();
        if clamped != opts {
            tracing::warn!(
                table_days = ?TABLE_DAYS_RANGE,
                moving_average = ?MOVING_AVERAGE_RANGE,
                "explorer options clamped to range"
            );
        }
        clamped
    }
}

#[derive(Debug, Args, Clone)]
pub struct CompareArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Second country.
    #[arg(long = "with", value_name = "COUNTRY")]
    pub other: String,
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// Destination file (defaults to `COVX_DATA`).
    #[arg(long, value_name = "CSV")]
    pub out: Option<PathBuf>,

    /// Source URL (defaults to `COVX_DATA_URL`).
    #[arg(long)]
    pub url: Option<String>,
}
