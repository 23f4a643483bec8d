//! License activation manager.
//!
//! Owns the activation state machine: activate, validate, and deactivate
//! against the remote service, persistence of the resulting record, and
//! fast local state reads for UI polling. Construction never touches the
//! network (plugin hosts reject components that perform network I/O during
//! process load); startup validation is armed as deferred background work
//! instead.

use crate::error::{ActivationError, ActivationResult};
use crate::fingerprint::MachineFingerprint;
use crate::record::{ActivationRecord, ActivationStatus};
use crate::store;
use chrono::{DateTime, Utc};
use resonant_gateway::{DebugLog, HttpGateway, HttpResponse, ReqwestGateway, TaskRunner};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for an [`ActivationManager`].
///
/// Immutable once the manager is constructed; reconfiguration means
/// constructing a new instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationConfig {
    /// Base URL of the activation service.
    pub base_url: String,
    /// Product identifier registered with the service.
    pub product_id: String,
    /// Service auth key, sent as both `apikey` and bearer token.
    pub service_key: String,
    /// Display name used for the debug-log directory; falls back to
    /// `product_id` when empty.
    pub product_name: String,
    /// Overrides the default per-product state-file location.
    pub state_path: Option<PathBuf>,
    /// Timeout applied to every request, in seconds.
    pub request_timeout_secs: u64,
    /// Arms one deferred background validation after construction.
    pub validate_on_startup: bool,
    /// Interval for periodic background revalidation, 0 to disable.
    pub revalidate_interval_secs: u64,
    /// Enables the per-instance debug log file.
    pub debug_log: bool,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            product_id: String::new(),
            service_key: String::new(),
            product_name: String::new(),
            state_path: None,
            request_timeout_secs: 30,
            validate_on_startup: false,
            revalidate_interval_secs: 0,
            debug_log: false,
        }
    }
}

#[derive(Deserialize)]
struct ActivateResponse {
    error: Option<String>,
    activated_at: Option<String>,
    expires_at: Option<String>,
    /// Current seat count; older service revisions report
    /// `current_activations` instead.
    activations: Option<u32>,
    current_activations: Option<u32>,
    max_activations: Option<u32>,
}

#[derive(Deserialize)]
struct DeactivateResponse {
    error: Option<String>,
}

#[derive(Deserialize)]
struct ValidateResponse {
    error: Option<String>,
    valid: Option<bool>,
}

// The service reports failures as free-text `error` strings; these are the
// known substrings. Replace with a structured error code once the service
// grows one.
fn classify_activation_error(error: &str) -> ActivationStatus {
    if error.contains("Invalid") {
        ActivationStatus::Invalid
    } else if error.contains("revoked") {
        ActivationStatus::Revoked
    } else if error.contains("maximum") || error.contains("limit") {
        ActivationStatus::MaxReached
    } else {
        ActivationStatus::ServerError
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

struct Inner {
    config: ActivationConfig,
    state_path: PathBuf,
    gateway: Arc<dyn HttpGateway>,
    log: DebugLog,
    record: Mutex<Option<ActivationRecord>>,
}

/// Owns activation state for one product instance.
///
/// Cheap to clone; clones share state and the background runner. Each
/// embedding context (each loaded plugin instance) constructs its own
/// manager; there is no process-wide singleton.
#[derive(Clone)]
pub struct ActivationManager {
    inner: Arc<Inner>,
    runner: Arc<TaskRunner>,
}

impl ActivationManager {
    /// Builds a manager over the default `reqwest` gateway.
    ///
    /// # Errors
    ///
    /// Returns an error when the gateway, worker threads, or state-file
    /// location cannot be set up. No network I/O happens here.
    pub fn new(config: ActivationConfig) -> ActivationResult<Self> {
        let gateway = Arc::new(ReqwestGateway::new()?);
        Self::with_gateway(config, gateway)
    }

    /// Builds a manager over an injected gateway.
    ///
    /// Loads persisted state and arms deferred background validation;
    /// nothing network-bound runs before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error when worker threads cannot start or, absent a
    /// `state_path` override, the platform has no data directory.
    pub fn with_gateway(
        config: ActivationConfig,
        gateway: Arc<dyn HttpGateway>,
    ) -> ActivationResult<Self> {
        let state_path = match &config.state_path {
            Some(path) => path.clone(),
            None => store::default_state_path(&config.product_id)
                .ok_or(ActivationError::NoDataDir)?,
        };

        let log = if config.debug_log {
            let log_name = if config.product_name.is_empty() {
                &config.product_id
            } else {
                &config.product_name
            };
            DebugLog::open(log_name, true)
        } else {
            DebugLog::disabled()
        };

        let record = load_record(&state_path, &log);

        let inner = Arc::new(Inner {
            config,
            state_path,
            gateway,
            log,
            record: Mutex::new(record),
        });
        let runner = Arc::new(TaskRunner::new("resonant-activation")?);

        let manager = Self { inner, runner };
        manager.arm_background_validation();
        Ok(manager)
    }

    /// Local, non-blocking, never touches the network.
    ///
    /// Answers from the in-memory record only, so it is safe from UI
    /// polling paths and real-time callers.
    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.inner
            .lock_record()
            .as_ref()
            .is_some_and(|record| record.is_valid)
    }

    /// Snapshot copy of the current record, if any. Local, non-blocking.
    #[must_use]
    pub fn activation_info(&self) -> Option<ActivationRecord> {
        self.inner.lock_record().clone()
    }

    /// Fingerprint of the current machine.
    #[must_use]
    pub fn machine_id(&self) -> String {
        MachineFingerprint::generate()
    }

    /// Activates `code` for this machine. Blocks on the network up to the
    /// configured timeout.
    pub async fn activate(&self, code: &str) -> ActivationStatus {
        self.inner.activate(code).await
    }

    /// Deactivates the current activation. On any server failure, local
    /// state is left untouched: deactivation is explicit and confirmed,
    /// never assumed.
    pub async fn deactivate(&self) -> ActivationStatus {
        self.inner.deactivate().await
    }

    /// Revalidates the current activation with the service, updating only
    /// the record's validity flag.
    pub async fn validate(&self) -> ActivationStatus {
        self.inner.validate().await
    }

    /// Blocking variant of [`activate`](Self::activate).
    ///
    /// Parks the calling thread; must not be called from within an async
    /// context.
    pub fn activate_blocking(&self, code: &str) -> ActivationStatus {
        self.runner.block_on(self.inner.activate(code))
    }

    /// Blocking variant of [`deactivate`](Self::deactivate).
    pub fn deactivate_blocking(&self) -> ActivationStatus {
        self.runner.block_on(self.inner.deactivate())
    }

    /// Blocking variant of [`validate`](Self::validate).
    pub fn validate_blocking(&self) -> ActivationStatus {
        self.runner.block_on(self.inner.validate())
    }

    /// Runs [`activate`](Self::activate) as background work and hands the
    /// status to `on_complete`, which may run on any worker thread.
    pub fn activate_async(
        &self,
        code: impl Into<String>,
        on_complete: impl FnOnce(ActivationStatus) + Send + 'static,
    ) {
        let inner = Arc::clone(&self.inner);
        let code = code.into();
        self.runner
            .run(async move { inner.activate(&code).await }, on_complete);
    }

    /// Runs [`validate`](Self::validate) as background work.
    pub fn validate_async(&self, on_complete: impl FnOnce(ActivationStatus) + Send + 'static) {
        let inner = Arc::clone(&self.inner);
        self.runner
            .run(async move { inner.validate().await }, on_complete);
    }

    /// Path of the per-instance debug log, when one is configured.
    #[must_use]
    pub fn debug_log_path(&self) -> Option<PathBuf> {
        self.inner.log.path()
    }

    /// Whether the per-instance debug log is writing.
    #[must_use]
    pub fn is_debug_enabled(&self) -> bool {
        self.inner.log.is_enabled()
    }

    fn arm_background_validation(&self) {
        if self.inner.config.validate_on_startup && self.is_activated() {
            let weak = Arc::downgrade(&self.inner);
            self.runner.spawn(async move {
                if let Some(inner) = weak.upgrade() {
                    let status = inner.validate().await;
                    debug!(?status, "startup validation finished");
                }
            });
        }

        if self.inner.config.revalidate_interval_secs > 0 {
            let weak: Weak<Inner> = Arc::downgrade(&self.inner);
            let period = Duration::from_secs(self.inner.config.revalidate_interval_secs);
            self.runner.spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                // the first tick completes immediately; revalidation starts
                // one full period after construction
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let Some(inner) = weak.upgrade() else { break };
                    if inner.lock_record().is_some() {
                        let status = inner.validate().await;
                        debug!(?status, "periodic revalidation finished");
                    }
                }
            });
        }
    }
}

impl Inner {
    fn lock_record(&self) -> MutexGuard<'_, Option<ActivationRecord>> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_configured(&self) -> bool {
        !self.config.base_url.is_empty() && !self.config.product_id.is_empty()
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), name)
    }

    fn auth_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if self.config.service_key.is_empty() {
            self.log.log("warning: no service key configured");
        } else {
            headers.push(("apikey".to_string(), self.config.service_key.clone()));
            headers.push((
                "Authorization".to_string(),
                format!("Bearer {}", self.config.service_key),
            ));
        }
        headers
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    /// POSTs the shared request body to one of the license endpoints.
    /// Transport failure is already mapped to its status here; response
    /// interpretation stays with the caller.
    async fn post_license(
        &self,
        name: &str,
        code: &str,
        machine_id: &str,
    ) -> Result<HttpResponse, ActivationStatus> {
        let body = serde_json::json!({
            "code": code,
            "product_id": self.config.product_id,
            "machine_id": machine_id,
        });

        match self
            .gateway
            .post_json(&self.endpoint(name), &body, &self.auth_headers(), self.timeout())
            .await
        {
            Ok(response) => Ok(response),
            Err(e) => {
                self.log.log(&format!("{name}: transport failure: {e}"));
                Err(ActivationStatus::NetworkError)
            }
        }
    }

    async fn activate(&self, code: &str) -> ActivationStatus {
        if !self.is_configured() {
            return ActivationStatus::NotConfigured;
        }

        // UUID-shaped and legacy dash-grouped codes both pass through
        // unvalidated; the server is authoritative.
        let code = code.trim();
        if code.is_empty() {
            return ActivationStatus::Invalid;
        }

        let machine_id = MachineFingerprint::generate();
        self.log
            .log(&format!("activate: machine {}", &machine_id[..16]));

        let response = match self.post_license("activate", code, &machine_id).await {
            Ok(response) => response,
            Err(status) => return status,
        };

        let Some(parsed) = response.json::<ActivateResponse>() else {
            self.log.log("activate: unparseable response");
            return ActivationStatus::ServerError;
        };

        if let Some(error) = parsed.error {
            self.log.log(&format!("activate: service error: {error}"));
            return classify_activation_error(&error);
        }

        let record = ActivationRecord {
            activation_code: code.to_string(),
            machine_id,
            activated_at: parsed
                .activated_at
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_else(Utc::now),
            expires_at: parsed.expires_at.as_deref().and_then(parse_timestamp),
            current_activations: parsed
                .activations
                .or(parsed.current_activations)
                .unwrap_or(0),
            max_activations: parsed.max_activations.unwrap_or(0),
            is_valid: true,
        };

        *self.lock_record() = Some(record.clone());
        self.persist(&record);
        debug!(product = %self.config.product_id, "license activated");
        ActivationStatus::Valid
    }

    async fn deactivate(&self) -> ActivationStatus {
        if !self.is_configured() {
            return ActivationStatus::NotConfigured;
        }

        let identity = {
            let guard = self.lock_record();
            guard
                .as_ref()
                .map(|r| (r.activation_code.clone(), r.machine_id.clone()))
        }; // lock dropped before the request
        let Some((code, machine_id)) = identity else {
            return ActivationStatus::NotActivated;
        };

        let response = match self.post_license("deactivate", &code, &machine_id).await {
            Ok(response) => response,
            Err(status) => return status,
        };

        let Some(parsed) = response.json::<DeactivateResponse>() else {
            return ActivationStatus::ServerError;
        };

        if let Some(error) = parsed.error {
            self.log.log(&format!("deactivate: service error: {error}"));
            return ActivationStatus::ServerError;
        }

        *self.lock_record() = None;
        if let Err(e) = store::clear(&self.state_path) {
            warn!(error = %e, "failed to remove activation state file");
        }
        self.log.log("deactivate: cleared local activation");
        ActivationStatus::Valid
    }

    async fn validate(&self) -> ActivationStatus {
        if !self.is_configured() {
            return ActivationStatus::NotConfigured;
        }

        let identity = {
            let guard = self.lock_record();
            guard
                .as_ref()
                .map(|r| (r.activation_code.clone(), r.machine_id.clone()))
        };
        let Some((code, machine_id)) = identity else {
            return ActivationStatus::NotActivated;
        };

        let response = match self.post_license("validate", &code, &machine_id).await {
            Ok(response) => response,
            Err(status) => return status,
        };

        let Some(parsed) = response.json::<ValidateResponse>() else {
            return ActivationStatus::ServerError;
        };

        if let Some(error) = parsed.error {
            self.log.log(&format!("validate: service error: {error}"));
            if error.contains("revoked") {
                self.set_validity(false);
                return ActivationStatus::Revoked;
            }
            if error.contains("Invalid") {
                self.set_validity(false);
                return ActivationStatus::Invalid;
            }
            // verdict unknown; leave the record alone
            return ActivationStatus::ServerError;
        }

        let valid = parsed.valid.unwrap_or(false);
        self.set_validity(valid);
        if valid {
            ActivationStatus::Valid
        } else {
            ActivationStatus::Invalid
        }
    }

    /// Updates the record's validity flag and persists when it changed.
    fn set_validity(&self, valid: bool) {
        let changed = {
            let mut guard = self.lock_record();
            match guard.as_mut() {
                Some(record) if record.is_valid != valid => {
                    record.is_valid = valid;
                    Some(record.clone())
                }
                _ => None,
            }
        };
        if let Some(record) = changed {
            self.persist(&record);
        }
    }

    fn persist(&self, record: &ActivationRecord) {
        if let Err(e) = store::save(&self.state_path, record) {
            warn!(error = %e, "failed to persist activation state");
            self.log.log(&format!("state save failed: {e}"));
        }
    }
}

/// Loads the persisted record, enforcing the fingerprint-match invariant:
/// a state file whose `machine_id` differs from this machine's fingerprint
/// must not grant activation.
fn load_record(state_path: &std::path::Path, log: &DebugLog) -> Option<ActivationRecord> {
    let record: ActivationRecord = store::load(state_path)?;
    if record.machine_id != MachineFingerprint::generate() {
        warn!("persisted activation belongs to a different machine, ignoring");
        log.log("load: fingerprint mismatch, state ignored");
        return None;
    }
    log.log("load: restored persisted activation");
    Some(record)
}
