//! Per-instance diagnostic logging.
//!
//! Each SDK instance carries its own opt-in log sink; nothing is global.
//! Lines are timestamped and appended to a per-product file under the
//! platform data directory, and mirrored to `tracing` for hosts that wire
//! up a subscriber instead.

use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Append-only log sink, opt-in per SDK instance.
///
/// A disabled sink costs a mutex lock and nothing else. Write failures are
/// swallowed: diagnostics must never take the host down.
pub struct DebugLog {
    inner: Mutex<Inner>,
}

struct Inner {
    enabled: bool,
    path: Option<PathBuf>,
}

impl DebugLog {
    /// A sink that discards everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            inner: Mutex::new(Inner {
                enabled: false,
                path: None,
            }),
        }
    }

    /// Opens `<data dir>/Resonant/<dir_name>/debug.log`.
    ///
    /// Falls back to a disabled sink when the platform has no data
    /// directory.
    #[must_use]
    pub fn open(dir_name: &str, enabled: bool) -> Self {
        match dirs::data_dir() {
            Some(base) => Self::at_path(
                base.join("Resonant").join(dir_name).join("debug.log"),
                enabled,
            ),
            None => Self::disabled(),
        }
    }

    /// Opens a sink at an explicit path.
    ///
    /// When enabled, any previous log is truncated and an init header is
    /// written, so each session starts with a clean file.
    #[must_use]
    pub fn at_path(path: PathBuf, enabled: bool) -> Self {
        if enabled {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(mut file) = File::create(&path) {
                let _ = writeln!(file, "[{}] === debug log opened ===", timestamp());
            }
        }
        Self {
            inner: Mutex::new(Inner {
                enabled,
                path: Some(path),
            }),
        }
    }

    /// Appends one timestamped line when enabled.
    pub fn log(&self, message: &str) {
        tracing::debug!("{message}");

        let inner = self.lock();
        if !inner.enabled {
            return;
        }
        let Some(path) = inner.path.as_deref() else {
            return;
        };
        append_line(path, message);
    }

    /// Returns whether the sink currently writes.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    /// Turns the sink on or off at runtime.
    pub fn set_enabled(&self, enabled: bool) {
        self.lock().enabled = enabled;
    }

    /// Returns the log file path, if the sink has one.
    #[must_use]
    pub fn path(&self) -> Option<PathBuf> {
        self.lock().path.clone()
    }

    /// Deletes the log file.
    pub fn clear(&self) {
        let inner = self.lock();
        if let Some(path) = inner.path.as_deref() {
            let _ = std::fs::remove_file(path);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn append_line(path: &Path, message: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "[{}] {}", timestamp(), message);
    }
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}
