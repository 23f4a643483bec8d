use resonant_gateway::DebugLog;
use tempfile::TempDir;

#[test]
fn disabled_sink_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("debug.log");

    let log = DebugLog::at_path(path.clone(), false);
    log.log("should not appear");

    assert!(!log.is_enabled());
    assert!(!path.exists());
}

#[test]
fn enabled_sink_writes_header_and_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("debug.log");

    let log = DebugLog::at_path(path.clone(), true);
    log.log("first message");
    log.log("second message");

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("=== debug log opened ==="));
    assert!(contents.contains("first message"));
    assert!(contents.contains("second message"));
    // every line carries a [HH:MM:SS] timestamp
    for line in contents.lines() {
        assert!(line.starts_with('['), "untimestamped line: {line}");
    }
}

#[test]
fn opening_truncates_previous_session() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("debug.log");

    let first = DebugLog::at_path(path.clone(), true);
    first.log("stale entry");
    drop(first);

    let second = DebugLog::at_path(path.clone(), true);
    second.log("fresh entry");

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(!contents.contains("stale entry"));
    assert!(contents.contains("fresh entry"));
}

#[test]
fn set_enabled_toggles_writing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("debug.log");

    let log = DebugLog::at_path(path.clone(), true);
    log.set_enabled(false);
    log.log("suppressed");
    log.set_enabled(true);
    log.log("recorded");

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(!contents.contains("suppressed"));
    assert!(contents.contains("recorded"));
}

#[test]
fn creates_missing_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("debug.log");

    let log = DebugLog::at_path(path.clone(), true);
    log.log("hello");

    assert!(path.exists());
}

#[test]
fn clear_removes_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("debug.log");

    let log = DebugLog::at_path(path.clone(), true);
    log.log("something");
    assert!(path.exists());

    log.clear();
    assert!(!path.exists());
}

#[test]
fn path_accessor_reports_location() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("debug.log");

    let log = DebugLog::at_path(path.clone(), true);
    assert_eq!(log.path(), Some(path));

    assert_eq!(DebugLog::disabled().path(), None);
}

#[test]
fn disabled_sink_can_be_enabled_later() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("debug.log");

    let log = DebugLog::at_path(path.clone(), false);
    log.set_enabled(true);
    log.log("late arrival");

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("late arrival"));
}
