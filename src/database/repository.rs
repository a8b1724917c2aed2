/*!
 * Repository layer for database operations.
 *
 * This module implements [`Store`] on top of SQLite, abstracting away the
 * SQL details. Every write is an upsert so the last write for a key wins.
 */

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use rusqlite::{OptionalExtension, params};

use super::Store;
use super::connection::{DatabaseConnection, DatabaseStats};
use super::models::{CacheEntry, LanguageRecord, ProfileRecord};
use super::PROFILE_ID;
use crate::app_config::CacheConfig;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Open the repository the cache configuration points at
    ///
    /// A disabled cache gets an in-memory database so the language
    /// catalog and profile still work for the process lifetime.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        if !config.enabled {
            return Self::new_in_memory();
        }
        match &config.database_path {
            Some(path) => Ok(Self::new(DatabaseConnection::new(path)?)),
            None => Self::new_default(),
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn stats(&self) -> Result<DatabaseStats> {
        self.db.stats()
    }
}

#[async_trait]
impl Store for Repository {
    // =========================================================================
    // Translation Operations
    // =========================================================================

    async fn get_translation(&self, hash: &str) -> Result<Option<CacheEntry>> {
        let hash = hash.to_string();

        self.db
            .execute_async(move |conn| {
                let entry = conn
                    .query_row(
                        r#"
                        SELECT id, domain, path, language_id, text, updated_at
                        FROM translations
                        WHERE id = ?1
                        "#,
                        [&hash],
                        |row| {
                            Ok(CacheEntry {
                                id: row.get(0)?,
                                domain: row.get(1)?,
                                path: row.get(2)?,
                                language_id: row.get(3)?,
                                text: row.get(4)?,
                                updated_at: row.get(5)?,
                            })
                        },
                    )
                    .optional()
                    .context("Failed to read translation")?;

                if entry.is_some() {
                    debug!("Store hit for {}", hash);
                }
                Ok(entry)
            })
            .await
    }

    async fn put_translation(&self, entry: &CacheEntry) -> Result<()> {
        let entry = entry.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO translations (id, domain, path, language_id, text, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT(id) DO UPDATE SET
                        domain = excluded.domain,
                        path = excluded.path,
                        language_id = excluded.language_id,
                        text = excluded.text,
                        updated_at = excluded.updated_at
                    "#,
                    params![
                        entry.id,
                        entry.domain,
                        entry.path,
                        entry.language_id,
                        entry.text,
                        entry.updated_at,
                    ],
                )
                .context("Failed to write translation")?;
                Ok(())
            })
            .await
    }

    async fn list_translations(&self) -> Result<Vec<CacheEntry>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, domain, path, language_id, text, updated_at FROM translations ORDER BY id",
                    )
                    .context("Failed to prepare translation listing")?;

                let entries = stmt
                    .query_map([], |row| {
                        Ok(CacheEntry {
                            id: row.get(0)?,
                            domain: row.get(1)?,
                            path: row.get(2)?,
                            language_id: row.get(3)?,
                            text: row.get(4)?,
                            updated_at: row.get(5)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .context("Failed to list translations")?;

                Ok(entries)
            })
            .await
    }

    async fn clear_translations(&self) -> Result<usize> {
        self.db
            .execute_async(|conn| {
                let removed = conn
                    .execute("DELETE FROM translations", [])
                    .context("Failed to clear translations")?;
                Ok(removed)
            })
            .await
    }

    // =========================================================================
    // Language Catalog Operations
    // =========================================================================

    async fn get_language(&self, id: &str) -> Result<Option<LanguageRecord>> {
        let id = id.to_string();

        self.db
            .execute_async(move |conn| {
                let record = conn
                    .query_row(
                        "SELECT id, native_name FROM languages WHERE id = ?1",
                        [&id],
                        |row| {
                            Ok(LanguageRecord {
                                id: row.get(0)?,
                                native_name: row.get(1)?,
                            })
                        },
                    )
                    .optional()
                    .context("Failed to read language")?;
                Ok(record)
            })
            .await
    }

    async fn put_languages(&self, languages: &[LanguageRecord]) -> Result<()> {
        let languages = languages.to_vec();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .transaction_async(move |tx| {
                let mut stmt = tx.prepare(
                    r#"
                    INSERT INTO languages (id, native_name, updated_at)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(id) DO UPDATE SET
                        native_name = excluded.native_name,
                        updated_at = excluded.updated_at
                    "#,
                )?;

                for language in &languages {
                    stmt.execute(params![language.id, language.native_name, now])
                        .with_context(|| format!("Failed to write language {}", language.id))?;
                }

                debug!("Stored {} catalog languages", languages.len());
                Ok(())
            })
            .await
    }

    async fn list_languages(&self) -> Result<Vec<LanguageRecord>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn
                    .prepare("SELECT id, native_name FROM languages ORDER BY id")
                    .context("Failed to prepare language listing")?;

                let records = stmt
                    .query_map([], |row| {
                        Ok(LanguageRecord {
                            id: row.get(0)?,
                            native_name: row.get(1)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .context("Failed to list languages")?;

                Ok(records)
            })
            .await
    }

    // =========================================================================
    // Profile Operations
    // =========================================================================

    async fn get_profile(&self) -> Result<Option<ProfileRecord>> {
        self.db
            .execute_async(|conn| {
                let profile = conn
                    .query_row(
                        "SELECT id, language, updated_at FROM profiles WHERE id = ?1",
                        [PROFILE_ID],
                        |row| {
                            Ok(ProfileRecord {
                                id: row.get(0)?,
                                language: row.get(1)?,
                                updated_at: row.get(2)?,
                            })
                        },
                    )
                    .optional()
                    .context("Failed to read profile")?;
                Ok(profile)
            })
            .await
    }

    async fn put_profile(&self, profile: &ProfileRecord) -> Result<()> {
        let profile = profile.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO profiles (id, language, updated_at)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(id) DO UPDATE SET
                        language = excluded.language,
                        updated_at = excluded.updated_at
                    "#,
                    params![PROFILE_ID, profile.language, profile.updated_at],
                )
                .context("Failed to write profile")?;
                Ok(())
            })
            .await
    }
}
