//! Download of the public per-country COVID-19 dataset.

use std::fs::{self, File, create_dir_all};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{info, warn};

use crate::error::AppError;

pub const DEFAULT_DATA_URL: &str = "https://covid.ourworldindata.org/data/owid-covid-data.csv";

const TIMEOUT_SECS: u64 = 300;

/// Fetch the dataset from `url` and write it to `dest`. Returns the byte count.
///
/// `dest` is replaced only once the whole body has been written.
pub fn download_dataset(url: &str, dest: &Path) -> Result<u64, AppError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(TIMEOUT_SECS))
        .build()
        .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;

    info!(url, dest = %dest.display(), "downloading dataset");
    let mut resp = client
        .get(url)
        .send()
        .map_err(|e| AppError::new(2, format!("Download failed for {url}: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(AppError::new(2, format!("Download failed for {url}: HTTP {status}")));
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", parent.display())))?;
    }

    let bytes = write_replacing(dest, |file| resp.copy_to(file).map_err(|e| e.to_string()))?;

    info!(bytes, "dataset saved");
    Ok(bytes)
}

/// Sibling file the body is streamed into before it replaces `dest`.
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Run `write` against a fresh partial file, then rename it onto `dest`.
///
/// On failure the partial file is removed and `dest` keeps its old contents.
pub fn write_replacing<F>(dest: &Path, write: F) -> Result<u64, AppError>
where
    F: FnOnce(&mut File) -> Result<u64, String>,
{
    let part = partial_path(dest);
    let mut file = File::create(&part)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", part.display())))?;

    let written = write(&mut file).and_then(|bytes| file.sync_all().map(|_| bytes).map_err(|e| e.to_string()));
    drop(file);

    let bytes = match written {
        Ok(bytes) => bytes,
        Err(e) => {
            if let Err(rm) = fs::remove_file(&part) {
                warn!(path = %part.display(), error = %rm, "failed to remove partial download");
            }
            return Err(AppError::new(2, format!("Failed to write '{}': {e}", dest.display())));
        }
    };

    fs::rename(&part, dest).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to move '{}' to '{}': {e}", part.display(), dest.display()),
        )
    })?;
    Ok(bytes)
}
