//! Correlation analysis over processed country series.
//!
//! - pairwise-complete Pearson correlation (`pearson`)
//! - lag search between two columns (`lag`)
//! - the full column-by-column table and its ranked pairs (`table`)

pub mod lag;
pub mod pearson;
pub mod table;

pub use lag::*;
pub use pearson::*;
pub use table::*;
