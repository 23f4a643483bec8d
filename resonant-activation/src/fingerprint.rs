//! Machine fingerprinting for license binding.
//!
//! Derives a stable identifier for the current device. The raw hardware
//! identifiers never leave the machine; only their SHA-256 digest is sent
//! to the activation service.

use sha2::{Digest, Sha256};

/// Hashed instead of raw identifiers when no platform source is available,
/// so generation is total: never an error, never a network or blocking
/// call.
const FALLBACK_ID: &str = "FALLBACK_ID";

/// Stable digest identifying the current device.
pub struct MachineFingerprint;

impl MachineFingerprint {
    /// Returns the 64-hex-character fingerprint for this machine.
    ///
    /// Deterministic across calls and process restarts; reinstalling the
    /// application does not change it, since only OS- and hardware-level
    /// identifiers feed the digest.
    #[must_use]
    pub fn generate() -> String {
        let info = collect_machine_info();
        let info = if info.is_empty() {
            FALLBACK_ID.to_string()
        } else {
            info
        };

        let mut hasher = Sha256::new();
        hasher.update(info.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Returns the first 16 characters of [`generate`](Self::generate),
    /// for display in activation dialogs.
    #[must_use]
    pub fn generate_short() -> String {
        let mut full = Self::generate();
        full.truncate(16);
        full
    }
}

#[cfg(target_os = "linux")]
fn collect_machine_info() -> String {
    let mut info = String::new();

    // systemd machine id survives reinstalls; dbus id is the older home
    let machine_id = std::fs::read_to_string("/etc/machine-id")
        .or_else(|_| std::fs::read_to_string("/var/lib/dbus/machine-id"))
        .ok()
        .map(|s| s.trim().to_string());
    if let Some(id) = machine_id.filter(|s| !s.is_empty()) {
        info.push_str(&format!("MID:{id};"));
    }

    // product_uuid needs root on many distros; best effort
    if let Ok(uuid) = std::fs::read_to_string("/sys/class/dmi/id/product_uuid") {
        let uuid = uuid.trim();
        if !uuid.is_empty() {
            info.push_str(&format!("UUID:{uuid};"));
        }
    }

    if let Some(host) = get_hostname() {
        info.push_str(&format!("HOST:{host};"));
    }

    info
}

#[cfg(target_os = "macos")]
fn collect_machine_info() -> String {
    let mut info = String::new();

    if let Some(output) = ioreg_platform_output() {
        if let Some(serial) = extract_ioreg_value(&output, "IOPlatformSerialNumber") {
            info.push_str(&format!("SERIAL:{serial};"));
        }
        if let Some(uuid) = extract_ioreg_value(&output, "IOPlatformUUID") {
            info.push_str(&format!("UUID:{uuid};"));
        }
    }

    info
}

#[cfg(target_os = "macos")]
fn ioreg_platform_output() -> Option<String> {
    std::process::Command::new("ioreg")
        .args(["-rd1", "-c", "IOPlatformExpertDevice"])
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
}

#[cfg(target_os = "macos")]
fn extract_ioreg_value(output: &str, key: &str) -> Option<String> {
    output
        .lines()
        .find(|line| line.contains(key))
        .and_then(|line| line.split('"').nth(3))
        .map(String::from)
}

#[cfg(target_os = "windows")]
fn collect_machine_info() -> String {
    let mut info = String::new();

    if let Some(guid) = read_machine_guid() {
        info.push_str(&format!("GUID:{guid};"));
    }

    if let Some(name) = get_hostname() {
        info.push_str(&format!("NAME:{name};"));
    }

    info
}

#[cfg(target_os = "windows")]
fn read_machine_guid() -> Option<String> {
    let output = std::process::Command::new("reg")
        .args([
            "query",
            r"HKLM\SOFTWARE\Microsoft\Cryptography",
            "/v",
            "MachineGuid",
        ])
        .output()
        .ok()?;
    let text = String::from_utf8(output.stdout).ok()?;
    text.lines()
        .find(|line| line.contains("MachineGuid"))
        .and_then(|line| line.split_whitespace().last())
        .map(String::from)
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn collect_machine_info() -> String {
    "UNKNOWN_PLATFORM".to_string()
}

#[cfg(any(target_os = "linux", target_os = "windows"))]
fn get_hostname() -> Option<String> {
    hostname::get().ok().and_then(|h| h.into_string().ok())
}
