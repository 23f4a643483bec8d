//! Asset delivery types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of a download operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// The transfer completed and was verified.
    Success,
    /// The asset does not exist or has no download URL.
    NotFound,
    /// The service rejected the credentials.
    Unauthorized,
    /// The transfer could not be started or broke mid-stream.
    NetworkError,
    /// The local file could not be created or written.
    DiskError,
    /// The transfer was cancelled cooperatively.
    Cancelled,
    /// A local copy already exists and `skip_existing` is set.
    AlreadyExists,
    /// The presigned URL was unusable.
    InvalidUrl,
    /// The downloaded bytes did not match the expected checksum.
    Corrupted,
}

impl DownloadStatus {
    /// Human-readable description for download UIs.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "Download completed",
            Self::NotFound => "Asset not found",
            Self::Unauthorized => "Not authorized",
            Self::NetworkError => "Network error",
            Self::DiskError => "Could not write file",
            Self::Cancelled => "Download cancelled",
            Self::AlreadyExists => "File already exists",
            Self::InvalidUrl => "Invalid download URL",
            Self::Corrupted => "File corrupted",
        }
    }
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Metadata for one content asset.
///
/// Fetched fresh for every download attempt and never cached across
/// operations, since presigned URLs expire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Asset identifier.
    #[serde(default)]
    pub id: String,
    /// Display name, also used as the local file name.
    #[serde(default)]
    pub name: String,
    /// Kind tag (sample pack, preset bank, bundle).
    #[serde(default, rename = "type")]
    pub kind: String,
    /// MIME type of the content.
    #[serde(default)]
    pub mime_type: String,
    /// Content size in bytes.
    #[serde(default, rename = "file_size")]
    pub size: u64,
    /// Hex SHA-256 of the content, when the service computed one.
    #[serde(default)]
    pub checksum: Option<String>,
    /// Presigned download URL, when the info endpoint includes one.
    #[serde(default)]
    pub url: Option<String>,
    /// When the presigned URL stops working.
    #[serde(default)]
    pub url_expires_at: Option<DateTime<Utc>>,
}

/// Progress snapshot emitted once per received chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// Asset being transferred; empty for direct URL downloads.
    pub asset_id: String,
    /// Local file name.
    pub file_name: String,
    /// Bytes written so far.
    pub bytes_downloaded: u64,
    /// Total bytes, 0 when the server did not say.
    pub total_bytes: u64,
    /// Completion percentage, 0 when the total is unknown.
    pub percent: f32,
    /// Instantaneous throughput over the transfer so far.
    pub speed_bytes_per_sec: f64,
    /// Position within a batch, 1-based; 1 for single downloads.
    pub current_file: usize,
    /// Batch size; 1 for single downloads.
    pub total_files: usize,
}

/// Aggregate result of a batch download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Transfers that completed or already existed locally.
    pub succeeded: usize,
    /// Transfers that failed for any reason.
    pub failed: usize,
}

/// Shared progress callback, invoked from the transfer loop.
pub type ProgressFn = Arc<dyn Fn(&DownloadProgress) + Send + Sync>;
