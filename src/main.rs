// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tovik::app_config::{self, Config};
use tovik::database::{Repository, Store};
use tovik::document::{Document, MemoryDocument, NodeId};
use tovik::providers::{HttpTranslationService, TranslationService};
use tovik::translation::{LanguageCatalog, TranslationCache};
use tovik::Engine;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Show what the local store holds
    Stats,
    /// Delete every cached translation
    Clear,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the languages the translation service supports
    Languages,

    /// Translate a single text
    Translate {
        /// Text to translate
        #[arg(value_name = "TEXT")]
        text: String,

        /// Target language code (e.g., 'fr', 'de', 'ar')
        #[arg(short, long)]
        to: String,

        /// Language the text is written in
        #[arg(short, long, default_value = "en")]
        from: String,
    },

    /// Translate a text file, one paragraph per non-empty line
    Page {
        /// Input text file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Target language code (e.g., 'fr', 'de', 'ar')
        #[arg(short, long)]
        to: String,

        /// Language the file is written in
        #[arg(short, long, default_value = "en")]
        from: String,
    },

    /// Inspect or clear the local translation cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },

    /// Generate shell completions for tovik
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// tovik - incremental document translation
///
/// Translates document content through a remote translation service,
/// caching every translation locally.
#[derive(Parser, Debug)]
#[command(name = "tovik")]
#[command(version)]
#[command(about = "Incremental document translation engine")]
#[command(long_about = "tovik translates document content through a remote translation service, caching every translation locally.

EXAMPLES:
    tovik languages                          # List supported languages
    tovik translate \"Hello\" --to fr          # Translate one text
    tovik page notes.txt --to de             # Translate a text file line by line
    tovik cache stats                        # Show local cache statistics
    tovik completions bash > tovik.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI colour for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with the most verbose level it may need;
    // the effective level is narrowed with set_max_level below
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "tovik", &mut std::io::stdout());
        return Ok(());
    }

    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &cli.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config = load_or_create_config(&cli.config, cli.log_level.clone())?;
    config.validate().context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if cli.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    match cli.command {
        Commands::Languages => run_languages(&config).await,
        Commands::Translate { text, to, from } => run_translate(&config, &text, &from, &to).await,
        Commands::Page { file, to, from } => run_page(&config, &file, &from, &to).await,
        Commands::Cache { action } => run_cache(&config, action).await,
        Commands::Completions { .. } => Ok(()),
    }
}

/// Load the configuration file, writing a default one when missing
fn load_or_create_config(config_path: &str, log_level: Option<CliLogLevel>) -> Result<Config> {
    let mut config = if Path::new(config_path).exists() {
        Config::from_file(config_path)?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();
        config.save(config_path)?;
        config
    };

    // Update log level in config if specified via command line
    if let Some(log_level) = log_level {
        config.log_level = log_level.into();
    }

    Ok(config)
}

fn open_store(config: &Config) -> Result<Arc<dyn Store>> {
    let repository = Repository::from_config(&config.cache).context("Failed to open the translation cache")?;
    Ok(Arc::new(repository))
}

fn open_service(config: &Config) -> Result<Arc<dyn TranslationService>> {
    let service = HttpTranslationService::from_config(&config.service)
        .map_err(|e| anyhow!("Failed to create the translation client: {}", e))?;
    Ok(Arc::new(service))
}

/// In-memory page in `from` whose target language is imposed as `to`
fn new_page(config: &Config, from: &str, to: &str) -> Arc<MemoryDocument> {
    let doc = Arc::new(MemoryDocument::new());
    doc.set_attribute(doc.document_element(), "lang", from);
    if let Some(body) = doc.body() {
        doc.set_attribute(body, &config.document.language_override_attribute, to);
    }
    doc
}

async fn start_engine(config: &Config, doc: Arc<MemoryDocument>) -> Result<Engine> {
    Engine::builder(config.clone(), doc)
        .service(open_service(config)?)
        .store(open_store(config)?)
        .start()
        .await
        .map_err(|e| anyhow!("Failed to start the engine: {}", e))
}

async fn run_languages(config: &Config) -> Result<()> {
    let catalog = LanguageCatalog::new(open_service(config)?, open_store(config)?);
    let languages = catalog
        .languages()
        .await
        .map_err(|e| anyhow!("Failed to fetch languages: {}", e))?;

    for language in &languages {
        println!("{:<8} {}", language.id, language.native_name);
    }
    info!("{} languages available", languages.len());
    Ok(())
}

async fn run_translate(config: &Config, text: &str, from: &str, to: &str) -> Result<()> {
    let doc = new_page(config, from, to);
    let body = doc.body().ok_or_else(|| anyhow!("Document has no body"))?;
    let paragraph = doc.append_element(body, "p");
    doc.append_text(paragraph, text);

    let mut engine = start_engine(config, doc.clone()).await?;
    println!("{}", doc.text(paragraph).unwrap_or_default());
    engine.shutdown();
    Ok(())
}

async fn run_page(config: &Config, file: &Path, from: &str, to: &str) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read input file: {:?}", file))?;

    let doc = new_page(config, from, to);
    let body = doc.body().ok_or_else(|| anyhow!("Document has no body"))?;
    let paragraphs: Vec<NodeId> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let paragraph = doc.append_element(body, "p");
            doc.append_text(paragraph, line);
            paragraph
        })
        .collect();
    if paragraphs.is_empty() {
        warn!("Nothing to translate in {:?}", file);
        return Ok(());
    }

    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(format!("Translating {} paragraphs into {}", paragraphs.len(), to));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let started = start_engine(config, doc.clone()).await;
    spinner.finish_and_clear();
    let mut engine = started?;

    for paragraph in &paragraphs {
        println!("{}", doc.text(*paragraph).unwrap_or_default());
    }

    let stats = engine.cache_stats();
    let client = engine.client_stats();
    info!(
        "Translated {} paragraphs: {} cache hits, {} service requests, {} rate limited, {} failed",
        paragraphs.len(),
        stats.hits,
        client.requests_sent,
        client.rate_limited,
        client.failures
    );
    engine.shutdown();
    Ok(())
}

async fn run_cache(config: &Config, action: CacheCommand) -> Result<()> {
    let repository = Repository::from_config(&config.cache).context("Failed to open the translation cache")?;

    match action {
        CacheCommand::Stats => {
            let stats = repository.stats()?;
            println!("{}", repository.connection().path().display());
            println!("{}", stats);
        }
        CacheCommand::Clear => {
            let cache = TranslationCache::new(Arc::new(repository.clone()), true);
            let removed = cache.clear().await?;
            repository.connection().vacuum()?;
            info!("Removed {} cached translations", removed);
        }
    }
    Ok(())
}
