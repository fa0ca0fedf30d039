//! `covid-explorer` library crate.
//!
//! The binary (`covx`) is a thin wrapper around this library so that:
//!
//! - core logic (smoothing, prevalence, lag search) is testable without spawning processes
//! - the CLI and the terminal dashboard share one pipeline
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod correlate;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod plot;
pub mod process;
pub mod report;
pub mod tui;
pub mod views;
