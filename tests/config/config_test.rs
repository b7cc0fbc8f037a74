//! Config file loading and environment precedence.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use hashgen::config::{HashgenConfig, CONFIG_PATH_ENV};

#[test]
fn file_values_then_env_overrides() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[engine]
timeout_ms = 1500
max_steps = 1000

[logging]
level = "info"
"#,
    )
    .expect("write");

    let config = HashgenConfig::load_with(Some(&path), |key| match key {
        "HASHGEN_MAX_STEPS" => Some("77".to_owned()),
        _ => None,
    })
    .expect("loads");
    assert_eq!(config.engine.timeout_ms, 1500);
    assert_eq!(config.engine.max_steps, 77);
    assert_eq!(config.logging.level, "info");

    let engine = config.engine_config();
    assert_eq!(engine.timeout, Some(Duration::from_millis(1500)));
    assert_eq!(engine.limits.max_steps, 77);
}

#[test]
fn config_path_env_is_used_without_explicit_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("via-env.toml");
    fs::write(&path, "[store]\npath = \"/srv/hashgen/snippets.json\"\n").expect("write");
    let path_str = path.display().to_string();

    let config = HashgenConfig::load_with(None, |key| {
        (key == CONFIG_PATH_ENV).then(|| path_str.clone())
    })
    .expect("loads");
    assert_eq!(
        config.store_path().expect("path"),
        PathBuf::from("/srv/hashgen/snippets.json")
    );
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    fs::write(&path, "[engine]\ntimeout_ms = \"soon\"\n").expect("write");
    assert!(HashgenConfig::load_with(Some(&path), |_| None).is_err());
}

#[test]
fn snippets_path_env_wins_over_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    fs::write(&path, "[store]\npath = \"/from/file.json\"\n").expect("write");
    let config = HashgenConfig::load_with(Some(&path), |key| {
        (key == "HASHGEN_SNIPPETS_PATH").then(|| "/from/env.json".to_owned())
    })
    .expect("loads");
    assert_eq!(config.store.path, Some(PathBuf::from("/from/env.json")));
}
