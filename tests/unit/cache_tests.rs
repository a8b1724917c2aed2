/*!
 * Tests for the translation cache
 */

use std::sync::Arc;

use tovik::database::Store;
use tovik::translation::{TranslationCache, TranslationUnit, unit_hash};

use crate::common::{FailingStore, in_memory_store};

fn bonjour() -> TranslationUnit {
    TranslationUnit::new(unit_hash("Hello", "fr"), "example.com", "/", "fr", "Bonjour")
}

/// Test that a put is visible to later gets
#[tokio::test]
async fn test_cache_putThenGet_shouldReturnUnit() {
    let cache = TranslationCache::new(in_memory_store(), true);
    let unit = bonjour();

    assert!(cache.get(&unit.hash).await.is_none());
    cache.put(&unit).await;

    assert_eq!(cache.get(&unit.hash).await, Some(unit));
    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 1);
    assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
}

/// Test that entries survive in the store for a fresh cache
#[tokio::test]
async fn test_cache_newInstanceOnSameStore_shouldReadPersistedEntry() {
    let store = in_memory_store();
    let unit = bonjour();
    TranslationCache::new(store.clone(), true).put(&unit).await;

    let fresh = TranslationCache::new(store.clone(), true);
    assert_eq!(fresh.stats().entries, 0);
    assert_eq!(fresh.get(&unit.hash).await.map(|u| u.text), Some("Bonjour".to_string()));
    assert_eq!(fresh.stats().entries, 1);
    assert_eq!(store.list_translations().await.unwrap().len(), 1);
}

/// Test that the last write for a hash wins
#[tokio::test]
async fn test_cache_putTwice_shouldKeepLastWrite() {
    let store = in_memory_store();
    let cache = TranslationCache::new(store.clone(), true);
    let mut unit = bonjour();
    cache.put(&unit).await;
    unit.text = "Salut".to_string();
    cache.put(&unit).await;

    assert_eq!(cache.get(&unit.hash).await.unwrap().text, "Salut");
    let fresh = TranslationCache::new(store, true);
    assert_eq!(fresh.get(&unit.hash).await.unwrap().text, "Salut");
}

/// Test that a disabled cache stores nothing
#[tokio::test]
async fn test_cache_whenDisabled_shouldNeverHit() {
    let store = in_memory_store();
    let cache = TranslationCache::new(store.clone(), false);
    let unit = bonjour();

    cache.put(&unit).await;

    assert!(!cache.is_enabled());
    assert!(cache.get(&unit.hash).await.is_none());
    assert!(store.list_translations().await.unwrap().is_empty());
}

/// Test that store failures degrade to misses
#[tokio::test]
async fn test_cache_withFailingStore_shouldTreatAsMiss() {
    let cache = TranslationCache::new(Arc::new(FailingStore), true);
    let unit = bonjour();

    assert!(cache.get(&unit.hash).await.is_none());

    // The write fails in the store but the process-local copy still serves
    cache.put(&unit).await;
    assert_eq!(cache.get(&unit.hash).await, Some(unit));
}

/// Test clearing memory and store
#[tokio::test]
async fn test_cache_clear_shouldEmptyMemoryAndStore() {
    let store = in_memory_store();
    let cache = TranslationCache::new(store.clone(), true);
    cache.put(&bonjour()).await;
    cache
        .put(&TranslationUnit::new(unit_hash("Bye", "fr"), "d", "/", "fr", "Au revoir"))
        .await;

    assert_eq!(cache.clear().await.unwrap(), 2);
    assert_eq!(cache.stats().entries, 0);
    assert!(store.list_translations().await.unwrap().is_empty());
    assert!(cache.get(&bonjour().hash).await.is_none());
}

/// Test hashing used as the cache key
#[test]
fn test_unitHash_withSameTextDifferentLanguage_shouldDiffer() {
    let fr = unit_hash("Hello", "fr");
    assert_eq!(fr, unit_hash("  Hello\n", "fr"));
    assert_ne!(fr, unit_hash("Hello", "de"));
    assert_ne!(fr, unit_hash("hello", "fr"));
    assert!(fr.chars().all(|c| c.is_ascii_hexdigit()));
}
