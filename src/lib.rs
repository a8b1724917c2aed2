/*!
 * # tovik - incremental document translation
 *
 * A Rust library that keeps a live document translated into the user's
 * language without changing the host page's markup.
 *
 * ## Features
 *
 * - Discovery of translatable text nodes and attributes in a mutating tree
 * - Content-addressed translation cache persisted in SQLite
 * - Request de-duplication and batches of at most 25 units
 * - Shared-cache lookup before asking for fresh translations
 * - Re-translation on content mutation and on language change
 * - Right-to-left direction handling
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `document`: Generic tree-of-nodes document model:
 *   - `document::walker`: Filtered tree traversal
 *   - `document::query`: Selectors and lookups
 *   - `document::memory`: In-memory document
 * - `translation`: The incremental translation engine:
 *   - `translation::filter`: Content eligibility
 *   - `translation::scanner`: Candidate discovery
 *   - `translation::binding`: Per-node state machine
 *   - `translation::cache`: Translation cache
 *   - `translation::batch`: Batch client
 *   - `translation::language`: Language controller and catalog
 *   - `translation::core`: Engine context and translation pass
 *   - `translation::reactivity`: Attachable components
 * - `engine`: Engine bootstrap
 * - `events`: Notification bus
 * - `database`: Persistent storage
 * - `providers`: Translation service clients:
 *   - `providers::remote`: HTTP client
 *   - `providers::mock`: Scripted service for tests
 * - `language_utils`: Language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod database;
pub mod document;
pub mod engine;
pub mod errors;
pub mod events;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use document::{Document, MemoryDocument, NodeId, Selector};
pub use engine::{Engine, EngineBuilder};
pub use errors::{EngineError, ServiceError};
pub use events::{EventBus, Notification};
pub use providers::{HttpTranslationService, MockService, TranslationService};
pub use translation::{EngineContext, InlineTranslation, TranslateRoot, TranslationUnit};
