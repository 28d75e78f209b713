//! Configuration loading, root folder resolution and scope merging
//!
//! Tests touching FOLIO_ROOT_FOLDER are marked #[serial] so they do not race
//! on the process environment.

use folio_common::config::{
    load_toml_config, load_toml_config_or_default, write_atomic,
    CompiledDefaults, RootFolderResolver, TomlConfig, ROOT_FOLDER_ENV,
};
use folio_common::ScopedConfig;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();
    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert!(defaults.root_folder.to_string_lossy().contains("folio"));
    assert_eq!(defaults.log_level, "info");
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolved = RootFolderResolver::new("test").resolve();
    assert_eq!(resolved, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let resolved = RootFolderResolver::new("test").with_toml_config(&config).resolve();
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(resolved, PathBuf::from("/from/env"));
}

#[test]
#[serial]
fn test_cli_arg_beats_env_var() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");

    let resolved = RootFolderResolver::new("test")
        .with_cli_arg(Some(PathBuf::from("/from/cli")))
        .resolve();
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(resolved, PathBuf::from("/from/cli"));
}

#[test]
#[serial]
fn test_toml_used_when_env_blank() {
    env::set_var(ROOT_FOLDER_ENV, "   ");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let resolved = RootFolderResolver::new("test").with_toml_config(&config).resolve();
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(resolved, PathBuf::from("/from/toml"));
}

#[test]
fn test_missing_config_file_degrades_to_defaults() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");

    assert!(load_toml_config(&missing).is_err());
    assert_eq!(load_toml_config_or_default(&missing), TomlConfig::default());
}

#[test]
fn test_config_round_trips_through_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("folio.toml");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/srv/folio")),
        pool_file: Some(PathBuf::from("pool.json")),
        max_parallel_records: Some(8),
        ..Default::default()
    };

    let content = toml::to_string_pretty(&config).unwrap();
    write_atomic(&path, content.as_bytes()).unwrap();
    assert_eq!(load_toml_config(&path).unwrap(), config);
    assert!(!path.with_file_name("folio.toml.tmp").exists());
}

#[test]
fn test_write_atomic_replaces_contents() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.csv");

    write_atomic(&path, b"first").unwrap();
    write_atomic(&path, b"second").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
}

#[test]
fn test_scope_file_resolves_most_specific_per_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scope.toml");
    std::fs::write(
        &path,
        r#"
[publisher]
name = "Nimble Books LLC"
settings = { lsi_account = "6024045", imprint = "Nimble Books" }
field_limits = { short_description = 350 }

[imprint]
name = "Xynapse Traces"
settings = { imprint = "Xynapse Traces" }

[tranche]
name = "2025-spring"
field_overrides = { "Language Code" = "eng" }
field_limits = { short_description = 300 }
"#,
    )
    .unwrap();

    let resolved = ScopedConfig::load(&path).unwrap().resolve();

    assert_eq!(resolved.scope.publisher.as_deref(), Some("Nimble Books LLC"));
    assert_eq!(resolved.scope.tranche.as_deref(), Some("2025-spring"));
    assert_eq!(resolved.setting("imprint"), Some("Xynapse Traces"));
    assert_eq!(resolved.setting("lsi_account"), Some("6024045"));
    assert_eq!(resolved.field_limit("short_description"), Some(300));
    assert_eq!(
        resolved.field_overrides.get("Language Code").map(String::as_str),
        Some("eng")
    );
}

#[test]
fn test_scope_file_missing_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(ScopedConfig::load(&dir.path().join("nope.toml")).is_err());
}
