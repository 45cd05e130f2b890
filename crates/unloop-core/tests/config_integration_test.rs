use secrecy::ExposeSecret;
use std::fs;
use tempfile::TempDir;
use unloop_core::{ConfigSources, UnloopConfig, UnloopError};

#[test]
fn explicit_file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(
        &path,
        r#"
default_subject = 3
recent_followers = 8

[api]
base_url = "https://neynar.example.test/v2"
api_key = "from-file"

[collector]
page_size = 50
page_delay_ms = 0
"#,
    )
    .unwrap();

    let config = UnloopConfig::load_from(&ConfigSources::file_only(&path)).unwrap();
    assert_eq!(config.default_subject, 3);
    assert_eq!(config.recent_followers, 8);
    assert_eq!(config.api.base_url, "https://neynar.example.test/v2");
    assert_eq!(
        config.api.api_key.as_ref().map(|k| k.expose_secret().to_string()),
        Some("from-file".to_string())
    );
    assert_eq!(config.collector.page_size, 50);
    assert_eq!(config.collector.max_pages, 25);
    assert!(config.collector.page_delay().is_zero());
    assert!(config.validate().is_ok());
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = UnloopConfig::load_from(&ConfigSources::file_only(dir.path().join("absent.toml")));
    assert!(matches!(result, Err(UnloopError::Config(_))));
}

#[test]
fn malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[collector]\nmax_pages = \"many\"\n").unwrap();

    assert!(UnloopConfig::from_file(&path).is_err());
}

#[test]
fn optional_files_layer_under_explicit_file() {
    let dir = TempDir::new().unwrap();
    let user = dir.path().join("user.toml");
    let local = dir.path().join("local.toml");
    let explicit = dir.path().join("explicit.toml");
    fs::write(&user, "default_subject = 11\nrecent_followers = 2\n").unwrap();
    fs::write(&local, "default_subject = 22\n[collector]\nmax_pages = 4\n").unwrap();
    fs::write(&explicit, "[collector]\nmax_pages = 6\n").unwrap();

    let sources = ConfigSources {
        optional_files: vec![user, local, dir.path().join("not-there.toml")],
        explicit: Some(explicit),
        environment: false,
    };
    let config = UnloopConfig::load_from(&sources).unwrap();

    assert_eq!(config.recent_followers, 2);
    assert_eq!(config.default_subject, 22);
    assert_eq!(config.collector.max_pages, 6);
    assert!(config.api.api_key.is_none());
}

#[test]
fn standard_sources_include_local_file_and_environment() {
    let sources = ConfigSources::standard(None);
    assert!(sources.environment);
    assert!(sources.explicit.is_none());
    assert_eq!(
        sources.optional_files.last(),
        Some(&std::path::PathBuf::from("unloop.toml"))
    );
}
