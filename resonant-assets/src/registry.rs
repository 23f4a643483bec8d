//! Download bookkeeping.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Tracks in-flight transfers, cancellation requests, and completed
/// downloads for one `AssetDownloader`.
///
/// Cancellation requests are drained the first time the transfer loop
/// observes them, and dropped when their id leaves the in-flight set, so a
/// stale request cannot poison a later download of the same asset.
#[derive(Debug, Default)]
pub struct DownloadRegistry {
    in_flight: HashSet<String>,
    cancel_requests: HashSet<String>,
    completed: HashMap<String, PathBuf>,
}

impl DownloadRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims an id for transfer.
    ///
    /// Returns false when a transfer for the same id is already running
    /// (the duplicate-request guard).
    pub fn begin(&mut self, asset_id: &str) -> bool {
        self.in_flight.insert(asset_id.to_string())
    }

    /// Releases an id after completion, error, or cancellation.
    pub fn finish(&mut self, asset_id: &str) {
        self.in_flight.remove(asset_id);
        self.cancel_requests.remove(asset_id);
    }

    /// Files a cancellation request for `asset_id`.
    pub fn request_cancel(&mut self, asset_id: &str) {
        self.cancel_requests.insert(asset_id.to_string());
    }

    /// Files cancellation requests for every in-flight transfer.
    pub fn cancel_in_flight(&mut self) {
        for id in &self.in_flight {
            self.cancel_requests.insert(id.clone());
        }
    }

    /// Observes and drains a cancellation request for `asset_id`.
    pub fn take_cancel(&mut self, asset_id: &str) -> bool {
        self.cancel_requests.remove(asset_id)
    }

    /// Whether a transfer for `asset_id` is currently running.
    #[must_use]
    pub fn is_in_flight(&self, asset_id: &str) -> bool {
        self.in_flight.contains(asset_id)
    }

    /// Whether any transfer is currently running.
    #[must_use]
    pub fn any_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Records where a completed download landed.
    pub fn record_completed(&mut self, asset_id: &str, path: PathBuf) {
        self.completed.insert(asset_id.to_string(), path);
    }

    /// Local path of a completed download.
    #[must_use]
    pub fn completed_path(&self, asset_id: &str) -> Option<PathBuf> {
        self.completed.get(asset_id).cloned()
    }

    /// Forgets a completed download, returning its path.
    pub fn remove_completed(&mut self, asset_id: &str) -> Option<PathBuf> {
        self.completed.remove(asset_id)
    }

    /// Paths of every completed download.
    #[must_use]
    pub fn completed_paths(&self) -> Vec<PathBuf> {
        self.completed.values().cloned().collect()
    }
}
