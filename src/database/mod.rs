/*!
 * Database module for persistent local storage.
 *
 * This module provides SQLite-based persistence for the three logical
 * partitions the engine needs:
 * - Translation entries keyed by content hash
 * - The catalog of supported languages keyed by language id
 * - A single user-language profile record
 *
 * The engine only talks to the [`Store`] trait; [`Repository`] is the
 * SQLite implementation.
 */

use anyhow::Result;
use async_trait::async_trait;

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

pub use connection::{DatabaseConnection, DatabaseStats};
pub use models::{CacheEntry, LanguageRecord, ProfileRecord};
pub use repository::Repository;

/// Fixed key of the single profile record
pub const PROFILE_ID: &str = "user";

/// Keyed storage with three partitions, each with point get/put and listing
///
/// Writes are last-write-wins per key.
#[async_trait]
pub trait Store: Send + Sync {
    // ===== Translation entries =====

    async fn get_translation(&self, hash: &str) -> Result<Option<CacheEntry>>;

    async fn put_translation(&self, entry: &CacheEntry) -> Result<()>;

    async fn list_translations(&self) -> Result<Vec<CacheEntry>>;

    /// Delete every translation entry, returning how many were removed
    async fn clear_translations(&self) -> Result<usize>;

    // ===== Language catalog =====

    async fn get_language(&self, id: &str) -> Result<Option<LanguageRecord>>;

    async fn put_languages(&self, languages: &[LanguageRecord]) -> Result<()>;

    async fn list_languages(&self) -> Result<Vec<LanguageRecord>>;

    // ===== User profile =====

    async fn get_profile(&self) -> Result<Option<ProfileRecord>>;

    async fn put_profile(&self, profile: &ProfileRecord) -> Result<()>;
}
