/*!
 * Database entity models.
 *
 * These structures map directly to database tables.
 */

use serde::{Deserialize, Serialize};

use super::PROFILE_ID;

/// Persisted translation, keyed by the content hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Content hash of (trimmed source text, target language)
    pub id: String,
    /// Domain the translation was requested for
    pub domain: String,
    /// Path the translation was requested for
    pub path: String,
    /// Target language code
    pub language_id: String,
    /// Translated text
    pub text: String,
    /// Last write timestamp (RFC 3339)
    pub updated_at: String,
}

impl CacheEntry {
    pub fn new(
        id: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
        language_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            domain: domain.into(),
            path: path.into(),
            language_id: language_id.into(),
            text: text.into(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Entry of the supported-language catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageRecord {
    /// Language code
    pub id: String,
    /// Display name in the language itself
    pub native_name: String,
}

impl LanguageRecord {
    pub fn new(id: impl Into<String>, native_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            native_name: native_name.into(),
        }
    }
}

/// The user's selected language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Always [`PROFILE_ID`]
    pub id: String,
    pub language: String,
    pub updated_at: String,
}

impl ProfileRecord {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            id: PROFILE_ID.to_string(),
            language: language.into(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
