//! Activation state types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a state-changing activation operation.
///
/// Every operation returns one of these. Expected failures are values,
/// never panics or errors, so hosts can switch on the result directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationStatus {
    /// The license is valid and active on this machine.
    Valid,
    /// The activation code was rejected.
    Invalid,
    /// The license has been revoked.
    Revoked,
    /// The code has reached its activation limit.
    MaxReached,
    /// The service could not be reached.
    NetworkError,
    /// The service answered with something unusable.
    ServerError,
    /// The manager has no usable service configuration.
    NotConfigured,
    /// An activation already exists.
    AlreadyActive,
    /// No activation exists to operate on.
    NotActivated,
}

impl ActivationStatus {
    /// Human-readable description for activation dialogs.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Valid => "Valid",
            Self::Invalid => "Invalid activation code",
            Self::Revoked => "License has been revoked",
            Self::MaxReached => "Maximum activations reached",
            Self::NetworkError => "Network error - check connection",
            Self::ServerError => "Server error - try again later",
            Self::NotConfigured => "Not configured",
            Self::AlreadyActive => "Already activated",
            Self::NotActivated => "Not activated",
        }
    }
}

impl std::fmt::Display for ActivationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// The license binding for this machine.
///
/// Owned exclusively by one `ActivationManager`; serialized verbatim as
/// the persisted state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRecord {
    /// The code the license was activated with.
    pub activation_code: String,
    /// Fingerprint of the machine this activation is bound to.
    pub machine_id: String,
    /// When the service recorded the activation.
    pub activated_at: DateTime<Utc>,
    /// When the license expires, for time-limited plans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Seats currently consumed on this code.
    #[serde(default)]
    pub current_activations: u32,
    /// Seat limit for this code; 0 when the service did not report one.
    #[serde(default)]
    pub max_activations: u32,
    /// Most recent validity verdict.
    pub is_valid: bool,
}
