use resonant_activation::MachineFingerprint;

#[test]
fn fingerprint_is_64_hex_chars() {
    let fp = MachineFingerprint::generate();
    assert_eq!(fp.len(), 64);
    assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(fp, fp.to_lowercase());
}

#[test]
fn fingerprint_is_stable_across_calls() {
    let first = MachineFingerprint::generate();
    let second = MachineFingerprint::generate();
    assert_eq!(first, second);
}

#[test]
fn short_form_is_a_prefix() {
    let full = MachineFingerprint::generate();
    let short = MachineFingerprint::generate_short();
    assert_eq!(short.len(), 16);
    assert!(full.starts_with(&short));
}
