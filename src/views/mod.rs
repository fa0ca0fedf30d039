//! Dashboard views built directly on the raw records.
//!
//! - explorer summary with a configurable moving average (`explorer`)
//! - straight-line case / vaccination trends (`trend`)
//! - two-country comparison (`compare`)

pub mod compare;
pub mod explorer;
pub mod trend;

pub use compare::*;
pub use explorer::*;
pub use trend::*;
