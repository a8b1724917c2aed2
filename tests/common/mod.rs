/*!
 * Common test utilities for the tovik test suite
 */

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use tovik::database::{CacheEntry, LanguageRecord, ProfileRecord, Repository, Store};
use tovik::document::{Document, MemoryDocument, NodeId};
use tovik::{Config, Engine, MockService};

/// Route library logs to the test output; safe to call repeatedly
pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Page whose `<html>` declares `language`
pub fn page(language: &str) -> Arc<MemoryDocument> {
    let doc = Arc::new(MemoryDocument::new());
    doc.set_attribute(doc.document_element(), "lang", language);
    doc
}

/// Append `<p>text</p>` to the body, returning the text node
pub fn add_paragraph(doc: &MemoryDocument, text: &str) -> NodeId {
    let body = doc.body().expect("memory document has a body");
    let p = doc.append_element(body, "p");
    doc.append_text(p, text)
}

pub fn in_memory_store() -> Arc<Repository> {
    Arc::new(Repository::new_in_memory().expect("Failed to create test repository"))
}

/// Start an engine over `doc` with an in-memory store, resolving to `target`
pub async fn start_engine(doc: Arc<MemoryDocument>, service: &MockService, target: &str) -> Engine {
    start_engine_with_store(doc, service, in_memory_store(), target).await
}

pub async fn start_engine_with_store(
    doc: Arc<MemoryDocument>,
    service: &MockService,
    store: Arc<dyn Store>,
    target: &str,
) -> Engine {
    init_test_logger();
    Engine::builder(Config::default(), doc)
        .service(Arc::new(service.clone()))
        .store(store)
        .environment_language(target)
        .start()
        .await
        .expect("engine should start")
}

/// Wait until the engine's first root has completed `count` passes
pub async fn wait_for_passes(engine: &Engine, count: u64) {
    let state = engine.roots()[0].state().expect("root should be attached");
    tokio::time::timeout(Duration::from_secs(5), state.wait_for_passes(count))
        .await
        .expect("timed out waiting for translation passes");
}

/// Store whose every operation fails
pub struct FailingStore;

#[async_trait]
impl Store for FailingStore {
    async fn get_translation(&self, _hash: &str) -> Result<Option<CacheEntry>> {
        Err(anyhow!("store unavailable"))
    }

    async fn put_translation(&self, _entry: &CacheEntry) -> Result<()> {
        Err(anyhow!("store unavailable"))
    }

    async fn list_translations(&self) -> Result<Vec<CacheEntry>> {
        Err(anyhow!("store unavailable"))
    }

    async fn clear_translations(&self) -> Result<usize> {
        Err(anyhow!("store unavailable"))
    }

    async fn get_language(&self, _id: &str) -> Result<Option<LanguageRecord>> {
        Err(anyhow!("store unavailable"))
    }

    async fn put_languages(&self, _languages: &[LanguageRecord]) -> Result<()> {
        Err(anyhow!("store unavailable"))
    }

    async fn list_languages(&self) -> Result<Vec<LanguageRecord>> {
        Err(anyhow!("store unavailable"))
    }

    async fn get_profile(&self) -> Result<Option<ProfileRecord>> {
        Err(anyhow!("store unavailable"))
    }

    async fn put_profile(&self, _profile: &ProfileRecord) -> Result<()> {
        Err(anyhow!("store unavailable"))
    }
}
