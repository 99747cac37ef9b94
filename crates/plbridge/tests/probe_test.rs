use std::path::Path;

use plbridge::{Bridge, BridgeConfig, MemoryBackend, Verdict};

fn bridge_with_local(version: &str) -> Bridge {
    let config = BridgeConfig::from_toml_str(
        &format!("[runtime]\nlocal_version = \"{version}\"\n"),
        Path::new("plbridge.toml"),
    )
    .unwrap();
    Bridge::new(config)
}

#[test]
fn same_minor_release_matches() {
    let mut backend = MemoryBackend::new().with_remote_version("3.7.3");
    let report = bridge_with_local("3.7.12").check_environment(&mut backend).unwrap();

    assert_eq!(report.verdict, Verdict::Match);
    assert_eq!(report.verdict.to_string(), "versions match");
    assert_eq!(report.local.to_string(), "3.7.12");
}

#[test]
fn different_minor_release_mismatches() {
    let mut backend = MemoryBackend::new().with_remote_version("3.6.9");
    let report = bridge_with_local("3.7.12").check_environment(&mut backend).unwrap();

    assert_eq!(report.verdict, Verdict::Mismatch);
    assert_eq!(
        report.verdict.to_string(),
        "versions differ, object-relational access in triggers unsafe"
    );
}

#[test]
fn missing_language_is_unreachable() {
    // no remote version configured: the helper installs but the query fails
    let mut backend = MemoryBackend::new();
    let report = bridge_with_local("3.7.12").check_environment(&mut backend).unwrap();

    assert!(matches!(report.verdict, Verdict::Unreachable(_)));
    assert!(report.remote.is_none());
}

#[test]
fn probe_does_not_disturb_sync() {
    let mut backend = MemoryBackend::new().with_remote_version("3.6.9");
    let bridge = bridge_with_local("3.7.12");
    bridge.check_environment(&mut backend).unwrap();

    // the helper installed by the probe is not declared, so sync ignores it
    let report = bridge.sync(&mut backend).unwrap();
    assert_eq!(report.mutations(), 0);
    assert!(backend.catalog().function("pl_python_version", "").is_some());
}
