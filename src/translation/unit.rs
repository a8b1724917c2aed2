/*!
 * Request and response records exchanged with the translation service.
 */

use serde::{Deserialize, Serialize};

use crate::database::{CacheEntry, LanguageRecord};

/// The atomic unit of translation and caching
///
/// On the way out `text` holds the source text; in a response it holds the
/// translated text. `hash` is always the hash of the source text and the
/// target language, so a response matches its request by hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub hash: String,
    pub domain: String,
    pub path: String,
    pub language_id: String,
    pub text: String,
}

impl TranslationUnit {
    pub fn new(
        hash: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
        language_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            hash: hash.into(),
            domain: domain.into(),
            path: path.into(),
            language_id: language_id.into(),
            text: text.into(),
        }
    }
}

impl From<CacheEntry> for TranslationUnit {
    fn from(entry: CacheEntry) -> Self {
        Self {
            hash: entry.id,
            domain: entry.domain,
            path: entry.path,
            language_id: entry.language_id,
            text: entry.text,
        }
    }
}

impl From<&TranslationUnit> for CacheEntry {
    fn from(unit: &TranslationUnit) -> Self {
        CacheEntry::new(
            unit.hash.clone(),
            unit.domain.clone(),
            unit.path.clone(),
            unit.language_id.clone(),
            unit.text.clone(),
        )
    }
}

/// One candidate waiting for a translation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranslationRequest {
    pub hash: String,
    /// Trimmed source text
    pub text: String,
}

impl TranslationRequest {
    pub fn new(hash: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            text: text.into(),
        }
    }
}

/// Language offered by the translation service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: String,
    pub native_name: String,
}

impl Language {
    pub fn new(id: impl Into<String>, native_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            native_name: native_name.into(),
        }
    }
}

impl From<LanguageRecord> for Language {
    fn from(record: LanguageRecord) -> Self {
        Self {
            id: record.id,
            native_name: record.native_name,
        }
    }
}

impl From<&Language> for LanguageRecord {
    fn from(language: &Language) -> Self {
        LanguageRecord::new(language.id.clone(), language.native_name.clone())
    }
}
