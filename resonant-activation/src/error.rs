//! Error types for the activation crate.

use resonant_gateway::GatewayError;
use thiserror::Error;

/// Result type for activation operations.
pub type ActivationResult<T> = Result<T, ActivationError>;

/// Failures with no in-band status encoding.
///
/// Expected outcomes (invalid code, revoked license, network down) are
/// [`ActivationStatus`](crate::ActivationStatus) values returned from the
/// operations themselves; this type covers construction and filesystem
/// failures only.
#[derive(Debug, Error)]
pub enum ActivationError {
    /// Filesystem failure while touching state or worker threads.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// State serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP gateway could not be constructed.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// No per-user application-data directory on this platform.
    #[error("no application data directory available")]
    NoDataDir,
}
