/*!
 * Incremental translation of a live document.
 *
 * This module contains the translation engine proper. It is split into
 * several submodules:
 *
 * - `filter`: which text nodes and attributes are eligible
 * - `scanner`: discovery of candidates under an observed root
 * - `binding`: per-candidate original text and lifecycle state
 * - `cache`: content-addressed translation cache
 * - `batch`: deduplicating, batching client for the translation service
 * - `language`: current language and the supported-language catalog
 * - `core`: the engine context and the translation pass
 * - `reactivity`: components reacting to mutations and language changes
 * - `unit`: request and response records
 */

// Re-export main types for easier usage
pub use self::batch::{BatchClient, BatchOptions, ClientStats, MAX_BATCH_SIZE, RequestScope};
pub use self::binding::{BindingKey, BindingState, BindingTable, NodeBinding};
pub use self::cache::{CacheStats, TranslationCache, unit_hash};
pub use self::core::{EngineContext, PageSettings, PassReport, RootState, translate_page};
pub use self::filter::{ContentFilter, FilterMode};
pub use self::language::{LanguageCatalog, LanguageController, LanguageProfile, LanguageSource, LanguageSources};
pub use self::reactivity::{Component, InlineTranslation, TranslateRoot};
pub use self::scanner::ContentScanner;
pub use self::unit::{Language, TranslationRequest, TranslationUnit};

// Submodules
pub mod batch;
pub mod binding;
pub mod cache;
pub mod core;
pub mod filter;
pub mod language;
pub mod reactivity;
pub mod scanner;
pub mod unit;
