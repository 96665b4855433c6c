use ragdesk::config::AppConfig;
use serial_test::serial;
use std::env;
use std::fs;

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        env::remove_var("RAGDESK_SERVER__PORT");
        env::remove_var("RAGDESK_CORS__ENABLED");
        env::remove_var("RAGDESK_CORS__ALLOW_ORIGINS");
        env::remove_var("RAGDESK_UI__PATH");
        env::remove_var("CONFIG_FILE");
        env::remove_var("PORT");
        env::remove_var("UI_ENABLED");
        env::remove_var("CORS_ENABLED");
    }
}

fn load(args: &[&str]) -> AppConfig {
    let mut argv = vec!["ragdesk"];
    argv.extend_from_slice(args);
    AppConfig::load_from_args(argv).expect("Failed to load config")
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = load(&[]);
    assert_eq!(config.server.port, 8001);
    assert!(!config.cors.enabled);
    assert!(config.ui.enabled);
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("RAGDESK_SERVER__PORT", "9090");
        env::set_var("RAGDESK_CORS__ENABLED", "true");
        env::set_var("RAGDESK_CORS__ALLOW_ORIGINS", "http://a.test,http://b.test");
    }

    let config = load(&[]);
    assert_eq!(config.server.port, 9090);
    assert!(config.cors.enabled);
    assert_eq!(
        config.cors.allow_origins,
        vec!["http://a.test".to_string(), "http://b.test".to_string()]
    );

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("settings.yaml");
    fs::write(
        &file_path,
        r#"
server:
  port: 7070
ui:
  path: /ui
cors:
  enabled: true
  allow_origins: ["*"]
  allow_methods: ["GET", "POST"]
"#,
    )
    .unwrap();

    let config = load(&["--config", file_path.to_str().unwrap()]);
    assert_eq!(config.server.port, 7070);
    assert_eq!(config.ui.path, "/ui");
    assert_eq!(config.cors.allow_methods, vec!["GET", "POST"]);
}

#[test]
#[serial]
fn test_cli_flags_beat_env_and_file() {
    clear_env_vars();

    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("settings.yaml");
    fs::write(&file_path, "server:\n  port: 7070\nui:\n  enabled: true\n").unwrap();
    unsafe {
        env::set_var("RAGDESK_SERVER__PORT", "9090");
    }

    let config = load(&[
        "--config",
        file_path.to_str().unwrap(),
        "--port",
        "6060",
        "--ui-enabled",
        "false",
    ]);
    assert_eq!(config.server.port, 6060);
    assert!(!config.ui.enabled);

    clear_env_vars();
}

#[test]
#[serial]
fn test_invalid_setting_is_rejected() {
    clear_env_vars();

    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("settings.yaml");
    fs::write(&file_path, "ingest:\n  chunk_size: 0\n").unwrap();

    let result = AppConfig::load_from_args(["ragdesk", "--config", file_path.to_str().unwrap()]);
    assert!(result.is_err());
}
