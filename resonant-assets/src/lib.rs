//! Content asset delivery for Resonant products.
//!
//! Resolves asset metadata and time-limited presigned URLs from the
//! content service, then streams downloads into the local library:
//! per-chunk progress reporting, cooperative cancellation, duplicate-
//! request guarding, optional checksum verification, and batch transfers
//! with bounded concurrency. Every network-bound operation has async,
//! blocking, and callback variants; bookkeeping queries answer from local
//! state only.

mod downloader;
mod error;
mod registry;
mod types;

pub use downloader::{AssetDownloader, DownloaderConfig};
pub use error::{AssetError, AssetResult};
pub use registry::DownloadRegistry;
pub use types::{AssetInfo, BatchOutcome, DownloadProgress, DownloadStatus, ProgressFn};
