//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - series CSV and correlation JSON exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
