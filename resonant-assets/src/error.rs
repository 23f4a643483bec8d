//! Error types for the asset crate.

use resonant_gateway::GatewayError;
use thiserror::Error;

/// Result type for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;

/// Failures with no in-band status encoding.
///
/// Transfer outcomes are [`DownloadStatus`](crate::DownloadStatus) values;
/// this type covers construction failures only.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The download directory or worker threads could not be set up.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP gateway could not be constructed.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}
