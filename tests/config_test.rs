use datablend::config::{AppConfig, ConfigManager};
use datablend::Limits;
use std::fs;
use tempfile::TempDir;

// Helper to create a temporary config directory for testing
fn setup_test_config_dir() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_manager = ConfigManager::with_dir(temp_dir.path().to_path_buf());
    (temp_dir, config_manager)
}

#[test]
fn test_default_config() {
    let config = AppConfig::default();

    assert_eq!(config.version, "0.1");
    assert_eq!(config.limits(), Limits::default());
    assert_eq!(config.display.preview_rows, 50);
    assert_eq!(config.display.step_preview_rows, 5);
    assert_eq!(config.export.csv_delimiter, b',');
    assert!(config.export.include_header);
    assert_eq!(config.transfer.source_app, "datablend");
    assert!(config.transfer.store_dir.is_none());
    assert!(!config.debug.enabled);

    let read = config.read_options();
    assert_eq!(read.delimiter, b',');
    assert!(read.has_header);
    assert!(read.try_parse_dates);
}

#[test]
fn test_generate_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let template = config_manager.generate_default_config();

    for section in [
        "[limits]",
        "[file_loading]",
        "[display]",
        "[export]",
        "[transfer]",
        "[debug]",
    ] {
        assert!(template.contains(section), "missing {}", section);
    }
    assert!(template.contains("version = \"0.1\""));
}

#[test]
fn test_default_template_parses_to_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let parsed: AppConfig = toml::from_str(&config_manager.generate_default_config()).unwrap();
    assert_eq!(parsed.limits(), Limits::default());
    parsed.validate().unwrap();
}

#[test]
fn test_write_default_config_respects_force() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let path = config_manager.write_default_config(false).unwrap();
    assert!(path.exists());
    assert!(fs::read_to_string(&path).unwrap().contains("[limits]"));

    let err = config_manager.write_default_config(false).unwrap_err();
    assert!(err.to_string().contains("--force"));
    assert!(config_manager.write_default_config(true).is_ok());
}

#[test]
fn test_user_config_overrides_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.ensure_config_dir().unwrap();
    fs::write(
        config_manager.config_path("config.toml"),
        r#"
version = "0.1"

[limits]
max_rows = 1000
warn_cells = 500

[file_loading]
delimiter = 59

[display]
preview_rows = 10

[transfer]
store_dir = "/tmp/blend-store"
source_app = "reports"
"#,
    )
    .unwrap();

    let config = AppConfig::load_from(&config_manager).unwrap();
    let limits = config.limits();
    assert_eq!(limits.max_rows, 1000);
    assert_eq!(limits.warn_cells, 500);
    assert_eq!(limits.max_files, 5);
    assert_eq!(limits.max_cells, 1_000_000);
    assert_eq!(config.read_options().delimiter, b';');
    assert_eq!(config.display.preview_rows, 10);
    assert_eq!(config.display.step_preview_rows, 5);
    assert_eq!(
        config.transfer.store_dir().unwrap(),
        std::path::PathBuf::from("/tmp/blend-store")
    );
    assert_eq!(config.transfer.source_app, "reports");
}

#[test]
fn test_missing_user_config_uses_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let config = AppConfig::load_from(&config_manager).unwrap();
    assert_eq!(config.limits(), Limits::default());
}

#[test]
fn test_validate_rejects_bad_values() {
    let mut config = AppConfig::default();
    config.limits.warn_cells = 2_000_000;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.limits.max_files = 0;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.version = "9.0".to_string();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.export.csv_delimiter = b'"';
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_toml_is_reported() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.ensure_config_dir().unwrap();
    fs::write(config_manager.config_path("config.toml"), "[limits\nmax_rows = ").unwrap();
    let err = AppConfig::load_from(&config_manager).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}
