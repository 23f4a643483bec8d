//! Asset transfer manager.
//!
//! Resolves asset metadata and time-limited presigned URLs from the
//! content service, then streams content into the local library directory:
//! bounded chunks, per-chunk progress and cancellation checks, incremental
//! checksum verification, and a rename from `<name>.download` to the final
//! name only on verified success.

use crate::error::AssetResult;
use crate::registry::DownloadRegistry;
use crate::types::{AssetInfo, BatchOutcome, DownloadProgress, DownloadStatus, ProgressFn};
use futures::StreamExt;
use resonant_gateway::{DebugLog, GatewayError, HttpGateway, ReqwestGateway, TaskRunner};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Configuration for an [`AssetDownloader`].
///
/// Immutable once the downloader is constructed, except for the auth
/// token, which can be replaced at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// Base URL of the content service.
    pub base_url: String,
    /// Directory downloads land in.
    pub download_dir: PathBuf,
    /// Bearer token for content requests, when the product requires one.
    pub auth_token: Option<String>,
    /// Product identifier sent with presigned-URL requests.
    pub product_id: String,
    /// Timeout applied to every request and chunk read, in seconds.
    pub request_timeout_secs: u64,
    /// Verify SHA-256 checksums when the service provides them.
    pub verify_checksums: bool,
    /// Treat an existing local file as already downloaded.
    pub skip_existing: bool,
    /// Cap on simultaneous transfers within a batch.
    pub max_concurrent: usize,
    /// Enables the per-instance debug log file.
    pub debug_log: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            download_dir: PathBuf::new(),
            auth_token: None,
            product_id: String::new(),
            request_timeout_secs: 60,
            verify_checksums: true,
            skip_existing: true,
            max_concurrent: 3,
            debug_log: false,
        }
    }
}

#[derive(Deserialize)]
struct AssetInfoResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    info: AssetInfo,
}

#[derive(Deserialize)]
struct DownloadUrlResponse {
    url: Option<String>,
}

struct Inner {
    config: DownloaderConfig,
    auth_token: Mutex<Option<String>>,
    gateway: Arc<dyn HttpGateway>,
    log: DebugLog,
    registry: Mutex<DownloadRegistry>,
    /// Latched by `cancel_all` to stop scheduling of not-yet-started batch
    /// items; cleared when a new batch starts.
    batch_abort: AtomicBool,
}

/// Transfers content assets for one product instance.
///
/// Cheap to clone; clones share the registry and the background runner.
/// Each embedding context constructs its own downloader; no global state.
#[derive(Clone)]
pub struct AssetDownloader {
    inner: Arc<Inner>,
    runner: Arc<TaskRunner>,
}

impl AssetDownloader {
    /// Builds a downloader over the default `reqwest` gateway.
    ///
    /// # Errors
    ///
    /// Returns an error when the download directory or worker threads
    /// cannot be set up. No network I/O happens here.
    pub fn new(config: DownloaderConfig) -> AssetResult<Self> {
        let gateway = Arc::new(ReqwestGateway::new()?);
        Self::with_gateway(config, gateway)
    }

    /// Builds a downloader over an injected gateway.
    ///
    /// # Errors
    ///
    /// Returns an error when the download directory or worker threads
    /// cannot be set up.
    pub fn with_gateway(
        config: DownloaderConfig,
        gateway: Arc<dyn HttpGateway>,
    ) -> AssetResult<Self> {
        if !config.download_dir.as_os_str().is_empty() {
            std::fs::create_dir_all(&config.download_dir)?;
        }

        let log = if config.debug_log {
            let log_name = if config.product_id.is_empty() {
                "assets"
            } else {
                &config.product_id
            };
            DebugLog::open(log_name, true)
        } else {
            DebugLog::disabled()
        };

        let auth_token = Mutex::new(config.auth_token.clone());
        let inner = Arc::new(Inner {
            config,
            auth_token,
            gateway,
            log,
            registry: Mutex::new(DownloadRegistry::new()),
            batch_abort: AtomicBool::new(false),
        });
        let runner = Arc::new(TaskRunner::new("resonant-assets")?);

        Ok(Self { inner, runner })
    }

    /// Replaces the bearer token used for content requests, e.g. with the
    /// activation service key after a successful activation.
    pub fn set_auth_token(&self, token: impl Into<String>) {
        *self.inner.lock_token() = Some(token.into());
    }

    /// Fetches asset metadata. Any failure (not found, unauthorized,
    /// network) reads as `None`; callers needing the distinction use
    /// [`download`](Self::download).
    pub async fn asset_info(&self, asset_id: &str) -> Option<AssetInfo> {
        self.inner.asset_info(asset_id).await
    }

    /// Fetches a fresh presigned download URL. Any failure reads as
    /// `None`.
    pub async fn download_url(&self, asset_id: &str) -> Option<String> {
        self.inner.download_url(asset_id).await
    }

    /// Downloads one asset, reporting progress per chunk.
    ///
    /// Returns the final local path on success. A second call for an id
    /// already in flight returns `(Success, None)` immediately instead of
    /// starting a duplicate transfer.
    pub async fn download(
        &self,
        asset_id: &str,
        on_progress: Option<ProgressFn>,
    ) -> (DownloadStatus, Option<PathBuf>) {
        self.inner.download(asset_id, on_progress, 1, 1).await
    }

    /// Streams an arbitrary URL to `file_name` in the download directory,
    /// without metadata resolution or registry bookkeeping.
    pub async fn download_from_url(
        &self,
        url: &str,
        file_name: &str,
        on_progress: Option<ProgressFn>,
    ) -> (DownloadStatus, Option<PathBuf>) {
        self.inner
            .stream_to_file(url, file_name, None, None, on_progress, 1, 1)
            .await
    }

    /// Downloads every listed asset with at most `max_concurrent`
    /// simultaneous transfers, re-labelling progress events with the batch
    /// position.
    pub async fn download_batch(
        &self,
        asset_ids: Vec<String>,
        on_progress: Option<ProgressFn>,
    ) -> BatchOutcome {
        self.inner.download_batch(asset_ids, on_progress).await
    }

    /// Blocking variant of [`download`](Self::download).
    ///
    /// Parks the calling thread; must not be called from within an async
    /// context.
    pub fn download_blocking(
        &self,
        asset_id: &str,
        on_progress: Option<ProgressFn>,
    ) -> (DownloadStatus, Option<PathBuf>) {
        self.runner
            .block_on(self.inner.download(asset_id, on_progress, 1, 1))
    }

    /// Runs [`download`](Self::download) as background work; the
    /// completion callback may run on any worker thread.
    pub fn download_async(
        &self,
        asset_id: impl Into<String>,
        on_progress: Option<ProgressFn>,
        on_complete: impl FnOnce(DownloadStatus, Option<PathBuf>) + Send + 'static,
    ) {
        let inner = Arc::clone(&self.inner);
        let asset_id = asset_id.into();
        self.runner.run(
            async move { inner.download(&asset_id, on_progress, 1, 1).await },
            move |(status, path)| on_complete(status, path),
        );
    }

    /// Runs [`download_batch`](Self::download_batch) as background work.
    pub fn download_batch_async(
        &self,
        asset_ids: Vec<String>,
        on_progress: Option<ProgressFn>,
        on_complete: impl FnOnce(BatchOutcome) + Send + 'static,
    ) {
        let inner = Arc::clone(&self.inner);
        self.runner.run(
            async move { inner.download_batch(asset_ids, on_progress).await },
            on_complete,
        );
    }

    /// Requests cooperative cancellation of one transfer. The transfer
    /// loop observes the flag at its next chunk boundary, removes its
    /// partial temp file, and returns [`DownloadStatus::Cancelled`].
    pub fn cancel(&self, asset_id: &str) {
        self.inner.lock_registry().request_cancel(asset_id);
    }

    /// Cancels every in-flight transfer and stops scheduling of
    /// not-yet-started batch items.
    pub fn cancel_all(&self) {
        self.inner.batch_abort.store(true, Ordering::SeqCst);
        self.inner.lock_registry().cancel_in_flight();
    }

    /// Whether any transfer is currently running. Local, never touches the
    /// network.
    #[must_use]
    pub fn is_downloading(&self) -> bool {
        self.inner.lock_registry().any_in_flight()
    }

    /// Whether `asset_id` was downloaded by this instance and its file is
    /// still present.
    #[must_use]
    pub fn is_downloaded(&self, asset_id: &str) -> bool {
        self.inner
            .lock_registry()
            .completed_path(asset_id)
            .is_some_and(|path| path.is_file())
    }

    /// Local path of a completed download.
    #[must_use]
    pub fn local_path(&self, asset_id: &str) -> Option<PathBuf> {
        self.inner.lock_registry().completed_path(asset_id)
    }

    /// Deletes a completed download from disk and forgets it. Returns
    /// false when nothing was deleted.
    pub fn delete_download(&self, asset_id: &str) -> bool {
        let mut registry = self.inner.lock_registry();
        let Some(path) = registry.completed_path(asset_id) else {
            return false;
        };
        if std::fs::remove_file(&path).is_ok() {
            registry.remove_completed(asset_id);
            true
        } else {
            false
        }
    }

    /// Total on-disk size of completed downloads, in bytes.
    #[must_use]
    pub fn total_downloaded_size(&self) -> u64 {
        let paths = self.inner.lock_registry().completed_paths();
        paths
            .iter()
            .filter_map(|path| std::fs::metadata(path).ok())
            .map(|meta| meta.len())
            .sum()
    }

    /// Path of the per-instance debug log, when one is configured.
    #[must_use]
    pub fn debug_log_path(&self) -> Option<PathBuf> {
        self.inner.log.path()
    }
}

impl Inner {
    fn lock_registry(&self) -> MutexGuard<'_, DownloadRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_token(&self) -> MutexGuard<'_, Option<String>> {
        self.auth_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn is_configured(&self) -> bool {
        !self.config.base_url.is_empty()
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    fn content_url(&self, asset_id: &str, leaf: &str) -> String {
        format!(
            "{}/content/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            asset_id,
            leaf
        )
    }

    fn content_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if let Some(token) = self.lock_token().clone() {
            headers.push(("apikey".to_string(), token.clone()));
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        headers
    }

    async fn asset_info(&self, asset_id: &str) -> Option<AssetInfo> {
        if !self.is_configured() {
            return None;
        }

        let url = self.content_url(asset_id, "info");
        let response = self
            .gateway
            .get(&url, &self.content_headers(), self.timeout())
            .await
            .ok()?;
        if !response.is_success() {
            return None;
        }

        let parsed: AssetInfoResponse = response.json()?;
        if parsed.error.is_some() {
            return None;
        }

        let mut info = parsed.info;
        info.id = asset_id.to_string();
        Some(info)
    }

    async fn download_url(&self, asset_id: &str) -> Option<String> {
        if !self.is_configured() {
            return None;
        }

        let mut url = self.content_url(asset_id, "download-url");
        if !self.config.product_id.is_empty() {
            url = format!("{url}?product_id={}", self.config.product_id);
        }

        let response = self
            .gateway
            .get(&url, &self.content_headers(), self.timeout())
            .await
            .ok()?;
        if !response.is_success() {
            return None;
        }

        let parsed: DownloadUrlResponse = response.json()?;
        parsed.url.filter(|u| !u.is_empty())
    }

    async fn download(
        &self,
        asset_id: &str,
        on_progress: Option<ProgressFn>,
        current_file: usize,
        total_files: usize,
    ) -> (DownloadStatus, Option<PathBuf>) {
        if !self.is_configured() {
            return (DownloadStatus::NetworkError, None);
        }

        if !self.lock_registry().begin(asset_id) {
            // a transfer for this id is already running
            return (DownloadStatus::Success, None);
        }

        let result = self
            .download_claimed(asset_id, on_progress, current_file, total_files)
            .await;

        {
            let mut registry = self.lock_registry();
            registry.finish(asset_id);
            if matches!(
                result.0,
                DownloadStatus::Success | DownloadStatus::AlreadyExists
            ) {
                if let Some(path) = &result.1 {
                    registry.record_completed(asset_id, path.clone());
                }
            }
        }

        result
    }

    async fn download_claimed(
        &self,
        asset_id: &str,
        on_progress: Option<ProgressFn>,
        current_file: usize,
        total_files: usize,
    ) -> (DownloadStatus, Option<PathBuf>) {
        let info = self.asset_info(asset_id).await;
        // the server-supplied name is used as a leaf only; it must not be
        // able to place files outside the download directory
        let file_name = info
            .as_ref()
            .and_then(|i| Path::new(&i.name).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| asset_id.to_string());
        let checksum = info.as_ref().and_then(|i| i.checksum.clone());

        let final_path = self.config.download_dir.join(&file_name);
        if self.config.skip_existing && final_path.is_file() {
            self.log.log(&format!("download {asset_id}: already present"));
            return (DownloadStatus::AlreadyExists, Some(final_path));
        }

        // the presigned URL is resolved fresh per attempt; it expires
        let Some(url) = self.download_url(asset_id).await else {
            self.log.log(&format!("download {asset_id}: no download url"));
            return (DownloadStatus::NotFound, None);
        };

        self.stream_to_file(
            &url,
            &file_name,
            Some(asset_id),
            checksum.as_deref(),
            on_progress,
            current_file,
            total_files,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn stream_to_file(
        &self,
        url: &str,
        file_name: &str,
        asset_id: Option<&str>,
        checksum: Option<&str>,
        on_progress: Option<ProgressFn>,
        current_file: usize,
        total_files: usize,
    ) -> (DownloadStatus, Option<PathBuf>) {
        let final_path = self.config.download_dir.join(file_name);
        let temp_path = self.config.download_dir.join(format!("{file_name}.download"));

        let streamed = match self
            .gateway
            .get_stream(url, &self.content_headers(), self.timeout())
            .await
        {
            Ok(streamed) => streamed,
            Err(GatewayError::InvalidUrl(e)) => {
                self.log.log(&format!("download {file_name}: bad url: {e}"));
                return (DownloadStatus::InvalidUrl, None);
            }
            Err(e) => {
                self.log
                    .log(&format!("download {file_name}: no stream: {e}"));
                return (DownloadStatus::NetworkError, None);
            }
        };

        match streamed.status {
            401 | 403 => return (DownloadStatus::Unauthorized, None),
            404 => return (DownloadStatus::NotFound, None),
            status if !(200..300).contains(&status) => {
                return (DownloadStatus::NetworkError, None);
            }
            _ => {}
        }

        let total_bytes = streamed.content_length.unwrap_or(0);
        let mut stream = streamed.stream;

        let mut file = match tokio::fs::File::create(&temp_path).await {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %temp_path.display(), error = %e, "could not create temp file");
                return (DownloadStatus::DiskError, None);
            }
        };

        // hash while writing so verification costs no second read
        let mut hasher = (self.config.verify_checksums && checksum.is_some()).then(Sha256::new);
        let mut bytes_downloaded: u64 = 0;
        let started = Instant::now();

        loop {
            // cancellation is observed once per chunk; this bounds latency
            // without aborting a read mid-flight
            if let Some(id) = asset_id {
                if self.lock_registry().take_cancel(id) {
                    drop(file);
                    remove_temp(&temp_path).await;
                    self.log.log(&format!("download {id}: cancelled"));
                    return (DownloadStatus::Cancelled, None);
                }
            }

            let chunk = match stream.next_chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    drop(file);
                    remove_temp(&temp_path).await;
                    self.log
                        .log(&format!("download {file_name}: stream failed: {e}"));
                    return (DownloadStatus::NetworkError, None);
                }
            };

            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                remove_temp(&temp_path).await;
                warn!(path = %temp_path.display(), error = %e, "write failed");
                return (DownloadStatus::DiskError, None);
            }

            if let Some(hasher) = hasher.as_mut() {
                hasher.update(&chunk);
            }
            bytes_downloaded += chunk.len() as u64;

            if let Some(on_progress) = &on_progress {
                let elapsed = started.elapsed().as_secs_f64();
                on_progress(&DownloadProgress {
                    asset_id: asset_id.unwrap_or_default().to_string(),
                    file_name: file_name.to_string(),
                    bytes_downloaded,
                    total_bytes,
                    percent: if total_bytes > 0 {
                        (bytes_downloaded as f32 / total_bytes as f32) * 100.0
                    } else {
                        0.0
                    },
                    speed_bytes_per_sec: if elapsed > 0.0 {
                        bytes_downloaded as f64 / elapsed
                    } else {
                        0.0
                    },
                    current_file,
                    total_files,
                });
            }
        }

        if let Err(e) = file.flush().await {
            drop(file);
            remove_temp(&temp_path).await;
            warn!(path = %temp_path.display(), error = %e, "flush failed");
            return (DownloadStatus::DiskError, None);
        }
        drop(file);

        if let (Some(hasher), Some(expected)) = (hasher, checksum) {
            let actual = hex::encode(hasher.finalize());
            if !actual.eq_ignore_ascii_case(expected.trim()) {
                remove_temp(&temp_path).await;
                self.log
                    .log(&format!("download {file_name}: checksum mismatch"));
                return (DownloadStatus::Corrupted, None);
            }
        }

        if let Err(e) = tokio::fs::rename(&temp_path, &final_path).await {
            remove_temp(&temp_path).await;
            warn!(path = %final_path.display(), error = %e, "rename failed");
            return (DownloadStatus::DiskError, None);
        }

        debug!(file = %final_path.display(), bytes = bytes_downloaded, "download complete");
        (DownloadStatus::Success, Some(final_path))
    }

    async fn download_batch(
        &self,
        asset_ids: Vec<String>,
        on_progress: Option<ProgressFn>,
    ) -> BatchOutcome {
        // the abort latch belongs to the previous batch
        self.batch_abort.store(false, Ordering::SeqCst);

        let total_files = asset_ids.len();
        let max_concurrent = self.config.max_concurrent.max(1);

        let results = futures::stream::iter(asset_ids.into_iter().enumerate().map(
            |(index, asset_id)| {
                let on_progress = on_progress.clone();
                async move {
                    if self.batch_abort.load(Ordering::SeqCst) {
                        // cancelled before this item started; never scheduled
                        return None;
                    }
                    let (status, _) = self
                        .download(&asset_id, on_progress, index + 1, total_files)
                        .await;
                    Some(matches!(
                        status,
                        DownloadStatus::Success | DownloadStatus::AlreadyExists
                    ))
                }
            },
        ))
        .buffer_unordered(max_concurrent)
        .collect::<Vec<_>>()
        .await;

        let succeeded = results.iter().filter(|r| **r == Some(true)).count();
        let failed = results.iter().filter(|r| **r == Some(false)).count();
        let outcome = BatchOutcome { succeeded, failed };
        debug!(?outcome, total_files, "batch finished");
        outcome
    }
}

async fn remove_temp(path: &Path) {
    let _ = tokio::fs::remove_file(path).await;
}
