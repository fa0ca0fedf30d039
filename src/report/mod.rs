//! Reporting utilities: terminal summaries of series, correlations, trends and comparisons.

pub mod format;

pub use format::*;
