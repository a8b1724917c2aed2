/*!
 * Translation caching functionality.
 *
 * This module provides the content-addressed translation cache: an
 * in-process map in front of the persistent [`Store`]. Entries are keyed by
 * [`unit_hash`] and never expire. Store failures are logged and treated as
 * absent entries.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use log::{debug, warn};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use super::unit::TranslationUnit;
use crate::database::{CacheEntry, Store};

/// Number of hex characters kept from the digest
const HASH_LENGTH: usize = 32;

/// Cache key of a (text, target language) pair
///
/// The text is trimmed first, so surrounding whitespace never changes the key.
pub fn unit_hash(text: &str, language: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.trim().as_bytes());
    hasher.update(b":");
    hasher.update(language.as_bytes());
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(HASH_LENGTH);
    hex
}

/// Hit and miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    /// Entries currently held in memory
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Translation cache for storing and retrieving translations
pub struct TranslationCache {
    /// Entries seen during this process
    memory: RwLock<HashMap<String, TranslationUnit>>,

    /// Durable backing store
    store: Option<Arc<dyn Store>>,

    hits: AtomicUsize,
    misses: AtomicUsize,

    /// Whether caching is enabled
    enabled: bool,
}

impl TranslationCache {
    /// Create a cache backed by a persistent store
    pub fn new(store: Arc<dyn Store>, enabled: bool) -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            store: Some(store),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            enabled,
        }
    }

    /// Create a cache that lives only as long as the process
    pub fn in_memory() -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            store: None,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            enabled: true,
        }
    }

    /// Look a hash up, memory first, then the store
    pub async fn get(&self, hash: &str) -> Option<TranslationUnit> {
        if !self.enabled {
            return None;
        }

        let cached = self.memory.read().get(hash).cloned();
        if let Some(unit) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache hit for {}", hash);
            return Some(unit);
        }

        let found = match &self.store {
            Some(store) => match store.get_translation(hash).await {
                Ok(entry) => entry.map(TranslationUnit::from),
                Err(e) => {
                    warn!("Translation cache read failed for {}: {:#}", hash, e);
                    None
                }
            },
            None => None,
        };

        match found {
            Some(unit) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {} (store)", hash);
                self.memory.write().insert(hash.to_string(), unit.clone());
                Some(unit)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss for {}", hash);
                None
            }
        }
    }

    /// Store a unit; the last write for a hash wins
    pub async fn put(&self, unit: &TranslationUnit) {
        if !self.enabled {
            return;
        }

        self.memory.write().insert(unit.hash.clone(), unit.clone());

        if let Some(store) = &self.store {
            if let Err(e) = store.put_translation(&CacheEntry::from(unit)).await {
                warn!("Translation cache write failed for {}: {:#}", unit.hash, e);
            }
        }
    }

    /// Remove every entry from memory and from the store
    pub async fn clear(&self) -> Result<usize> {
        let in_memory = {
            let mut memory = self.memory.write();
            let count = memory.len();
            memory.clear();
            count
        };

        let removed = match &self.store {
            Some(store) => store.clear_translations().await?,
            None => in_memory,
        };

        debug!("Translation cache cleared ({} entries)", removed);
        Ok(removed)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.memory.read().len(),
        }
    }

    /// Check if the cache is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::in_memory()
    }
}
