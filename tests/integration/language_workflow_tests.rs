/*!
 * Tests for language selection, persistence and the language catalog
 */

use std::sync::Arc;

use tovik::database::{ProfileRecord, Store};
use tovik::document::Document;
use tovik::providers::mock::Endpoint;
use tovik::translation::{Language, LanguageSource};
use tovik::{Config, Engine, EventBus, MockService, Notification};

use crate::common::{add_paragraph, in_memory_store, page, start_engine, start_engine_with_store, wait_for_passes};

/// Test right-to-left target languages
#[tokio::test]
async fn test_engine_withArabicTarget_shouldSetRtlDirection() {
    let doc = page("en");
    add_paragraph(&doc, "Hello");
    let service = MockService::working();

    let engine = start_engine(doc.clone(), &service, "ar").await;
    let html = doc.document_element();
    assert_eq!(doc.attribute(html, "dir").as_deref(), Some("rtl"));
    assert_eq!(doc.attribute(html, "lang").as_deref(), Some("ar"));

    engine.set_language("fr").await;
    assert_eq!(doc.attribute(html, "dir").as_deref(), Some("ltr"));
    assert_eq!(doc.attribute(html, "lang").as_deref(), Some("fr"));
}

/// Test a language picker request travelling over the bus
#[tokio::test]
async fn test_engine_requestLanguage_shouldRetranslateContent() {
    let doc = page("en");
    let hello = add_paragraph(&doc, "Hello");
    let service = MockService::working();
    let engine = start_engine(doc.clone(), &service, "fr").await;
    assert_eq!(doc.text(hello).as_deref(), Some("[fr] Hello"));

    engine.request_language("de");
    wait_for_passes(&engine, 2).await;

    assert_eq!(engine.current_language(), "de");
    assert_eq!(doc.text(hello).as_deref(), Some("[de] Hello"));
    // The original text is what goes out again, not the French rendering
    let batches = service.untranslated_batches();
    assert_eq!(batches.last().unwrap()[0].text, "Hello");
}

/// Test that a regional variant of the rendered language does not rescan
#[tokio::test]
async fn test_engine_withSamePrimarySubtag_shouldNotRetranslate() {
    let doc = page("en");
    add_paragraph(&doc, "Hello");
    let service = MockService::working();
    let engine = start_engine(doc.clone(), &service, "fr").await;
    service.reset_calls();

    assert!(engine.set_language("fr-CA").await);
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;

    assert_eq!(service.translation_request_count(), 0);
    assert_eq!(engine.roots()[0].state().unwrap().pass_count(), 1);
}

/// Test precedence of the URL query parameter
#[tokio::test]
async fn test_engine_withQueryParameter_shouldWinOverProfile() {
    let doc = page("en");
    let hello = add_paragraph(&doc, "Hello");
    let store = in_memory_store();
    store.put_profile(&ProfileRecord::new("de")).await.unwrap();
    let service = MockService::working();

    let engine = Engine::builder(Config::default(), doc.clone())
        .service(Arc::new(service.clone()))
        .store(store.clone())
        .page_url("https://shop.example/products?lang=es".parse().unwrap())
        .environment_language("en")
        .start()
        .await
        .unwrap();

    assert_eq!(engine.language_source(), LanguageSource::QueryParameter);
    assert_eq!(doc.text(hello).as_deref(), Some("[es] Hello"));
    assert_eq!(store.get_profile().await.unwrap().unwrap().language, "es");
    // Domain and path come from the page URL
    let unit = &service.untranslated_batches()[0][0];
    assert_eq!(unit.domain, "shop.example");
    assert_eq!(unit.path, "/products");
}

/// Test that an imposed document language is used but never persisted
#[tokio::test]
async fn test_engine_withDocumentOverride_shouldNotPersistChanges() {
    let doc = page("en");
    doc.set_attribute(doc.body().unwrap(), "data-toviklang", "it");
    add_paragraph(&doc, "Hello");
    let store = in_memory_store();
    let service = MockService::working();

    let engine = start_engine_with_store(doc.clone(), &service, store.clone(), "en").await;
    assert_eq!(engine.language_source(), LanguageSource::DocumentOverride);
    assert_eq!(engine.current_language(), "it");

    engine.set_language("de").await;
    assert!(store.get_profile().await.unwrap().is_none());
}

/// Test that the persisted profile is used on the next start
#[tokio::test]
async fn test_engine_restart_shouldResumePersistedLanguage() {
    let store = in_memory_store();
    let service = MockService::working();
    {
        let engine = start_engine_with_store(page("en"), &service, store.clone(), "fr").await;
        engine.set_language("de").await;
    }

    let engine = start_engine_with_store(page("en"), &service, store, "fr").await;

    assert_eq!(engine.language_source(), LanguageSource::Profile);
    assert_eq!(engine.current_language(), "de");
}

/// Test the language catalog through the engine
#[tokio::test]
async fn test_engine_languages_shouldSortAndCacheCatalog() {
    let service = MockService::working().with_languages(vec![
        Language::new("fr", "Français"),
        Language::new("de", "Deutsch"),
        Language::new("es", "español"),
    ]);
    let engine = start_engine(page("en"), &service, "en").await;

    let languages = engine.languages().await.unwrap();
    let ids: Vec<&str> = languages.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["de", "es", "fr"]);

    engine.languages().await.unwrap();
    assert_eq!(service.call_count(Endpoint::Languages), 1);
    assert!(engine.catalog().ensure_contains("fr-CA").await.unwrap());
    assert!(!engine.catalog().ensure_contains("ja").await.unwrap());
}

/// Test that a language request survives a burst of notifications
#[tokio::test]
async fn test_engine_withLaggedRequestListener_shouldApplyLatestRequest() {
    let doc = page("en");
    let hello = add_paragraph(&doc, "Hello");
    let bus = EventBus::with_capacity(2);
    let engine = Engine::builder(Config::default(), doc.clone())
        .service(Arc::new(MockService::working()))
        .store(in_memory_store())
        .bus(bus.clone())
        .environment_language("fr")
        .start()
        .await
        .unwrap();
    assert_eq!(doc.text(hello).as_deref(), Some("[fr] Hello"));

    bus.request_language("de");
    for _ in 0..4 {
        bus.publish(Notification::ContentChanged);
    }

    let converged = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while doc.text(hello).as_deref() != Some("[de] Hello") {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(converged.is_ok(), "text stayed {:?}", doc.text(hello));
    assert_eq!(engine.current_language(), "de");
}
