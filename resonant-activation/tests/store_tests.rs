use chrono::Utc;
use resonant_activation::{ActivationRecord, store};
use tempfile::TempDir;

fn sample_record() -> ActivationRecord {
    ActivationRecord {
        activation_code: "ABCD-EFGH-IJKL".to_string(),
        machine_id: "a".repeat(64),
        activated_at: Utc::now(),
        expires_at: None,
        current_activations: 1,
        max_activations: 3,
        is_valid: true,
    }
}

// ── Round trips ─────────────────────────────────────────────────

#[test]
fn save_then_load_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("activation.json");

    let record = sample_record();
    store::save(&path, &record).unwrap();

    let loaded: ActivationRecord = store::load(&path).unwrap();
    assert_eq!(loaded, record);
}

#[test]
fn save_creates_nested_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir
        .path()
        .join("Resonant")
        .join("com.example.plugin")
        .join("activation.json");

    store::save(&path, &sample_record()).unwrap();
    assert!(path.is_file());
}

#[test]
fn state_file_uses_the_documented_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("activation.json");

    store::save(&path, &sample_record()).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    for key in [
        "activation_code",
        "machine_id",
        "activated_at",
        "is_valid",
        "current_activations",
        "max_activations",
    ] {
        assert!(raw.get(key).is_some(), "missing key {key}");
    }
}

// ── Degraded inputs ─────────────────────────────────────────────

#[test]
fn missing_file_loads_as_none() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("never-written.json");

    assert!(store::load::<ActivationRecord>(&path).is_none());
}

#[test]
fn corrupt_file_loads_as_none() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("activation.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    // corrupt state is "not activated", never a crash
    assert!(store::load::<ActivationRecord>(&path).is_none());
}

#[test]
fn truncated_json_loads_as_none() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("activation.json");
    std::fs::write(&path, r#"{"activation_code": "ABC""#).unwrap();

    assert!(store::load::<ActivationRecord>(&path).is_none());
}

// ── clear ───────────────────────────────────────────────────────

#[test]
fn clear_removes_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("activation.json");
    store::save(&path, &sample_record()).unwrap();

    store::clear(&path).unwrap();
    assert!(!path.exists());
}

#[test]
fn clear_of_missing_file_succeeds() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("already-gone.json");

    store::clear(&path).unwrap();
}

// ── Default location ────────────────────────────────────────────

#[test]
fn default_state_path_is_per_product() {
    let path = store::default_state_path("com.example.plugin").unwrap();
    let display = path.display().to_string();
    assert!(display.contains("Resonant"));
    assert!(display.contains("com.example.plugin"));
    assert!(display.ends_with("activation.json"));
}
