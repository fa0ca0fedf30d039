//! Runtime settings resolved from the environment (and an optional `.env`).
//!
//! CLI flags take precedence over anything resolved here.

use std::path::PathBuf;

use crate::data::DEFAULT_DATA_URL;

pub const DEFAULT_DATA_PATH: &str = "Data/owid-covid-data.csv";
pub const DEFAULT_COUNTRY: &str = "United States";
pub const DEFAULT_LOG_FILTER: &str = "info";
/// Log file used while the TUI owns the terminal.
pub const TUI_LOG_FILE: &str = "covx.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// `COVX_DATA`
    pub data_path: PathBuf,
    /// `COVX_DATA_URL`
    pub data_url: String,
    /// `COVX_COUNTRY`
    pub country: String,
    /// `COVX_LOG` (an `EnvFilter` directive)
    pub log_filter: String,
    /// `COVX_COLUMNS`: comma-separated analysis column names, parsed on use.
    pub columns: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            data_url: DEFAULT_DATA_URL.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            columns: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through an arbitrary key lookup; blank values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            data_path: get("COVX_DATA").map(PathBuf::from).unwrap_or(defaults.data_path),
            data_url: get("COVX_DATA_URL").unwrap_or(defaults.data_url),
            country: get("COVX_COUNTRY").unwrap_or(defaults.country),
            log_filter: get("COVX_LOG").unwrap_or(defaults.log_filter),
            columns: get("COVX_COLUMNS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn lookup_overrides_and_blank_values_fall_back() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("COVX_DATA", "/tmp/data.csv"),
            ("COVX_COUNTRY", "  "),
            ("COVX_LOG", "covid_explorer=debug"),
            ("COVX_COLUMNS", "new_cases, icu-patients"),
        ]);
        let settings = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(settings.data_path, PathBuf::from("/tmp/data.csv"));
        assert_eq!(settings.country, DEFAULT_COUNTRY);
        assert_eq!(settings.log_filter, "covid_explorer=debug");
        assert_eq!(settings.data_url, DEFAULT_DATA_URL);
        assert_eq!(settings.columns.as_deref(), Some("new_cases, icu-patients"));
        assert_eq!(Settings::from_lookup(|_| None).columns, None);
    }
}
