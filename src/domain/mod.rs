//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw dataset rows (`DailyRecord`, `RecordField`)
//! - processed series (`CountrySeries`, `SeriesRow`, `Metric`)
//! - the analysis column set and calendar constants

pub mod types;

pub use types::*;
