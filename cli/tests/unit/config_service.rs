//! Tests for the configuration service and YAML store.

#![allow(clippy::expect_used, clippy::unwrap_used, unsafe_code)]

use ingress_ssh::application::ports::ConfigStore;
use ingress_ssh::application::services::config_service::{load_config, set_config_value};
use ingress_ssh::domain::IngressConfig;
use ingress_ssh::infra::config::{CONFIG_PATH_ENV, YamlConfigStore};
use serial_test::serial;
use tempfile::TempDir;

/// A store backed by a not-yet-existing file in a fresh temp dir.
fn temp_store() -> (TempDir, YamlConfigStore) {
    let dir = TempDir::new().expect("temp dir");
    let store = YamlConfigStore::at(dir.path().join("nested").join("config.yaml"));
    (dir, store)
}

#[test]
fn test_missing_file_loads_defaults() {
    let (_dir, store) = temp_store();
    assert_eq!(load_config(&store).expect("load"), IngressConfig::default());
}

#[test]
fn test_set_persists_and_reloads() {
    let (_dir, store) = temp_store();
    let updated = set_config_value(&store, "defaults.region", "eu-central-1").expect("set");
    assert_eq!(updated.defaults.region, "eu-central-1");

    let reloaded = load_config(&store).expect("load");
    assert_eq!(reloaded.defaults.region, "eu-central-1");
    assert_eq!(reloaded.defaults.user, "ec2-user");
}

#[test]
fn test_rejected_value_writes_nothing() {
    let (_dir, store) = temp_store();
    assert!(set_config_value(&store, "identity.echo_url", "ftp://example.com").is_err());
    assert!(!store.path().expect("path").exists());
}

#[test]
fn test_unknown_key_is_rejected() {
    let (_dir, store) = temp_store();
    let err = set_config_value(&store, "security.level", "strict").unwrap_err();
    assert!(err.to_string().contains("Unknown setting"), "got: {err}");
}

#[test]
fn test_corrupt_file_is_an_error() {
    let (_dir, store) = temp_store();
    let path = store.path().expect("path");
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    std::fs::write(&path, "defaults: [not, a, map").expect("write");
    assert!(load_config(&store).is_err());
}

#[cfg(unix)]
#[test]
fn test_saved_file_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, store) = temp_store();
    set_config_value(&store, "defaults.user", "ubuntu").expect("set");
    let mode = std::fs::metadata(store.path().expect("path"))
        .expect("metadata")
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
#[serial]
fn test_default_store_honours_path_override() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("override.yaml");
    // SAFETY: every test that touches the process environment is #[serial].
    unsafe { std::env::set_var(CONFIG_PATH_ENV, &path) };
    let resolved = YamlConfigStore::default().path();
    unsafe { std::env::remove_var(CONFIG_PATH_ENV) };
    assert_eq!(resolved.expect("path"), path);
}
