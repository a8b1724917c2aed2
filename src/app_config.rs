use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::translation::batch::MAX_BATCH_SIZE;

/// Application configuration module
/// This module handles loading, validating and saving the engine settings.
/// Represents the engine configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Remote translation service settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Host-document integration settings
    #[serde(default)]
    pub document: DocumentConfig,

    /// Local translation cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Language used when nothing else resolves (ISO / BCP 47 code)
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Remote translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceConfig {
    // @field: Base URL of the translation service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    // @field: Max concurrent untranslated batches
    #[serde(default = "default_concurrent_requests")]
    pub max_concurrent_requests: usize,

    // @field: Max units per untranslated request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    // @field: Query the service-side shared cache before translating
    #[serde(default = "default_true")]
    pub shared_cache_lookup: bool,

    // @field: Send the document title as translation context
    #[serde(default = "default_true")]
    pub send_page_context: bool,

    // @field: Request timeout in seconds, none by default
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_concurrent_requests: default_concurrent_requests(),
            batch_size: default_batch_size(),
            shared_cache_lookup: true,
            send_page_context: true,
            timeout_secs: None,
        }
    }
}

/// Marker that excludes an element and its descendants from translation
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NoTranslateMarker {
    /// Attribute name to inspect
    pub attribute: String,

    /// Value that marks the element; for `class` this is matched as a token
    pub value: String,
}

impl NoTranslateMarker {
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// Host-document integration configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DocumentConfig {
    /// Attributes whose values are translated (e.g. `placeholder`)
    #[serde(default = "default_translatable_attributes")]
    pub translatable_attributes: Vec<String>,

    /// Elements whose text is never translated
    #[serde(default = "default_skip_tags")]
    pub skip_tags: Vec<String>,

    /// "Do not translate" markers
    #[serde(default = "default_no_translate_markers")]
    pub no_translate_markers: Vec<NoTranslateMarker>,

    /// Tag of inline single-unit translation elements
    #[serde(default = "default_inline_tag")]
    pub inline_tag: String,

    /// Body attribute carrying an externally imposed target language
    #[serde(default = "default_language_override_attribute")]
    pub language_override_attribute: String,

    /// Body attribute overriding the request domain
    #[serde(default = "default_domain_attribute")]
    pub domain_attribute: String,

    /// Body attribute overriding the request path
    #[serde(default = "default_path_attribute")]
    pub path_attribute: String,

    /// Page URL query parameter selecting the target language
    #[serde(default = "default_language_query_parameter")]
    pub language_query_parameter: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            translatable_attributes: default_translatable_attributes(),
            skip_tags: default_skip_tags(),
            no_translate_markers: default_no_translate_markers(),
            inline_tag: default_inline_tag(),
            language_override_attribute: default_language_override_attribute(),
            domain_attribute: default_domain_attribute(),
            path_attribute: default_path_attribute(),
            language_query_parameter: default_language_query_parameter(),
        }
    }
}

/// Local cache configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Whether translations are cached locally
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// SQLite database location; the platform data directory when unset
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_path: None,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_base_url() -> String {
    "https://engine.sparc.coop".to_string()
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "en".to_string()
}

fn default_translatable_attributes() -> Vec<String> {
    vec!["placeholder".to_string()]
}

fn default_skip_tags() -> Vec<String> {
    ["script", "style", "noscript", "template", "tovik-t"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

fn default_no_translate_markers() -> Vec<NoTranslateMarker> {
    vec![
        NoTranslateMarker::new("translate", "no"),
        NoTranslateMarker::new("class", "notranslate"),
    ]
}

fn default_inline_tag() -> String {
    "tovik-t".to_string()
}

fn default_language_override_attribute() -> String {
    "data-toviklang".to_string()
}

fn default_domain_attribute() -> String {
    "data-tovikdomain".to_string()
}

fn default_path_attribute() -> String {
    "data-tovikpath".to_string()
}

fn default_language_query_parameter() -> String {
    "lang".to_string()
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {:?}", path))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;

        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {:?}", path))?;

        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.service.base_url)
            .map_err(|e| anyhow!("Invalid service base URL '{}': {}", self.service.base_url, e))?;

        if self.service.batch_size == 0 || self.service.batch_size > MAX_BATCH_SIZE {
            return Err(anyhow!(
                "Batch size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE,
                self.service.batch_size
            ));
        }

        if self.service.max_concurrent_requests == 0 {
            return Err(anyhow!("At least one concurrent request is required"));
        }

        if !crate::language_utils::is_well_formed(&self.default_language) {
            return Err(anyhow!("Invalid default language: '{}'", self.default_language));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            service: ServiceConfig::default(),
            document: DocumentConfig::default(),
            cache: CacheConfig::default(),
            default_language: default_language(),
            log_level: LogLevel::default(),
        }
    }
}
