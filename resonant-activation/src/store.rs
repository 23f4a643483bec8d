//! Persistent activation state.
//!
//! A small JSON document in the per-product application-data directory.
//! A missing or corrupt file reads as `None`, which is equivalent to
//! "not activated", never a crash.

use crate::error::ActivationResult;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Loads a state document, or `None` when the file is missing or
/// unreadable.
pub fn load<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "state file corrupt, treating as absent");
            None
        }
    }
}

/// Saves a state document, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error when the directory cannot be created or the file
/// cannot be written.
pub fn save<T: Serialize>(path: &Path, value: &T) -> ActivationResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Removes the state file. A file that is already gone is success.
///
/// # Errors
///
/// Returns an error for any filesystem failure other than a missing file.
pub fn clear(path: &Path) -> ActivationResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Default state-file location for a product:
/// `<data dir>/Resonant/<product_id>/activation.json`.
#[must_use]
pub fn default_state_path(product_id: &str) -> Option<PathBuf> {
    dirs::data_dir().map(|base| {
        base.join("Resonant")
            .join(product_id)
            .join("activation.json")
    })
}
