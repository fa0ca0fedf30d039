//! Time-series derivation for a single country.
//!
//! Responsibilities:
//!
//! - trailing-window smoothing with explicit missing values
//! - the sequential prevalence-ratio scan
//! - derived IFR / recovered-infection estimates and row completeness
//! - per-country memoization

pub mod cache;
pub mod prevalence;
pub mod processor;
pub mod rolling;

pub use cache::*;
pub use prevalence::*;
pub use processor::*;
pub use rolling::*;
