/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use tokio_test::{assert_err, assert_ok};
use tovik::app_config::{Config, LogLevel, NoTranslateMarker};

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.service.base_url, "https://engine.sparc.coop");
    assert_eq!(config.service.batch_size, 25);
    assert_eq!(config.service.max_concurrent_requests, 4);
    assert!(config.service.shared_cache_lookup);
    assert!(config.service.send_page_context);

    assert_eq!(config.document.inline_tag, "tovik-t");
    assert!(config.document.skip_tags.contains(&"script".to_string()));
    assert!(config.document.skip_tags.contains(&"tovik-t".to_string()));
    assert!(config
        .document
        .no_translate_markers
        .contains(&NoTranslateMarker::new("translate", "no")));
    assert_eq!(config.document.language_override_attribute, "data-toviklang");
    assert_eq!(config.document.language_query_parameter, "lang");

    assert!(config.cache.enabled);
    assert_eq!(config.default_language, "en");
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert_ok!(config.validate());

    // Invalid base URL
    config.service.base_url = "not a url".to_string();
    assert_err!(config.validate());
    config.service.base_url = "https://engine.example".to_string();

    // Batch size bounds
    config.service.batch_size = 0;
    assert_err!(config.validate());
    config.service.batch_size = 1;
    assert_ok!(config.validate());
    config.service.batch_size = 25;

    // No concurrency
    config.service.max_concurrent_requests = 0;
    assert_err!(config.validate());
    config.service.max_concurrent_requests = 2;

    // Malformed default language
    config.default_language = "not a language".to_string();
    assert_err!(config.validate());
    config.default_language = "pt-BR".to_string();

    assert_ok!(config.validate());
}

/// Test saving and loading a configuration file
#[test]
fn test_config_saveAndLoad_withTempFile_shouldPreserveValues() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("conf.json");

    let mut config = Config::default();
    config.service.base_url = "https://engine.example".to_string();
    config.service.timeout_secs = Some(10);
    config.document.translatable_attributes = vec!["placeholder".to_string(), "title".to_string()];
    config.log_level = LogLevel::Debug;
    config.save(&path)?;

    let loaded = Config::from_file(&path)?;
    assert_eq!(loaded.service.base_url, "https://engine.example");
    assert_eq!(loaded.service.timeout_secs, Some(10));
    assert_eq!(loaded.document.translatable_attributes.len(), 2);
    assert_eq!(loaded.log_level, LogLevel::Debug);
    Ok(())
}

/// Test that partial configuration files fall back to defaults
#[test]
fn test_config_fromFile_withPartialJson_shouldFillDefaults() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{ "service": { "batch_size": 10 }, "log_level": "warn" }"#,
    )?;

    let config = Config::from_file(&path)?;
    assert_eq!(config.service.batch_size, 10);
    assert_eq!(config.service.base_url, "https://engine.sparc.coop");
    assert_eq!(config.document.inline_tag, "tovik-t");
    assert_eq!(config.log_level, LogLevel::Warn);
    Ok(())
}

/// Test loading a file that is not valid JSON
#[test]
fn test_config_fromFile_withInvalidJson_shouldFail() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{ not json")?;

    assert!(Config::from_file(&path).is_err());
    assert!(Config::from_file(dir.path().join("missing.json")).is_err());
    Ok(())
}

/// Test log level conversion
#[test]
fn test_logLevel_toLevelFilter_shouldMapEveryLevel() {
    assert_eq!(LogLevel::Error.to_level_filter(), log::LevelFilter::Error);
    assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
    assert_eq!(LogLevel::Info.to_level_filter(), log::LevelFilter::Info);
    assert_eq!(LogLevel::Debug.to_level_filter(), log::LevelFilter::Debug);
    assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
}
