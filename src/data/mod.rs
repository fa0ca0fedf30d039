//! Dataset sources: the public CSV download and a synthetic generator.

pub mod owid;
pub mod sample;

pub use owid::{DEFAULT_DATA_URL, download_dataset};
pub use sample::{SampleConfig, generate_sample};
