use resonant_assets::DownloadRegistry;
use std::path::PathBuf;

#[test]
fn begin_claims_an_id_once() {
    let mut registry = DownloadRegistry::new();

    assert!(registry.begin("asset-1"));
    assert!(!registry.begin("asset-1")); // duplicate-request guard
    assert!(registry.begin("asset-2"));

    assert!(registry.is_in_flight("asset-1"));
    assert!(registry.any_in_flight());
}

#[test]
fn finish_releases_the_claim() {
    let mut registry = DownloadRegistry::new();
    registry.begin("asset-1");
    registry.finish("asset-1");

    assert!(!registry.is_in_flight("asset-1"));
    assert!(!registry.any_in_flight());
    assert!(registry.begin("asset-1")); // claimable again
}

#[test]
fn cancel_requests_are_drained_on_observation() {
    let mut registry = DownloadRegistry::new();
    registry.begin("asset-1");
    registry.request_cancel("asset-1");

    assert!(registry.take_cancel("asset-1"));
    // observed once, then gone
    assert!(!registry.take_cancel("asset-1"));
}

#[test]
fn finish_drops_unobserved_cancel_requests() {
    let mut registry = DownloadRegistry::new();
    registry.begin("asset-1");
    registry.request_cancel("asset-1");
    registry.finish("asset-1");

    // a stale request must not poison the next download of the same id
    registry.begin("asset-1");
    assert!(!registry.take_cancel("asset-1"));
}

#[test]
fn cancel_in_flight_flags_only_running_transfers() {
    let mut registry = DownloadRegistry::new();
    registry.begin("running-1");
    registry.begin("running-2");
    registry.record_completed("done", PathBuf::from("/tmp/done.bin"));

    registry.cancel_in_flight();

    assert!(registry.take_cancel("running-1"));
    assert!(registry.take_cancel("running-2"));
    assert!(!registry.take_cancel("done"));
}

#[test]
fn completed_bookkeeping_round_trips() {
    let mut registry = DownloadRegistry::new();
    let path = PathBuf::from("/library/kick.wav");

    registry.record_completed("asset-1", path.clone());
    assert_eq!(registry.completed_path("asset-1"), Some(path.clone()));
    assert_eq!(registry.completed_paths(), vec![path.clone()]);

    assert_eq!(registry.remove_completed("asset-1"), Some(path));
    assert!(registry.completed_path("asset-1").is_none());
    assert!(registry.completed_paths().is_empty());
}

#[test]
fn unknown_ids_answer_negatively() {
    let mut registry = DownloadRegistry::new();

    assert!(!registry.is_in_flight("ghost"));
    assert!(!registry.take_cancel("ghost"));
    assert!(registry.completed_path("ghost").is_none());
    assert!(registry.remove_completed("ghost").is_none());
}
