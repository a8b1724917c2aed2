/*!
 * End-to-end tests for translating a page through the engine
 */

use tovik::database::Store;
use tovik::document::Document;
use tovik::providers::mock::Endpoint;
use tovik::translation::unit_hash;
use tovik::MockService;

use crate::common::{
    add_paragraph, in_memory_store, page, start_engine, start_engine_with_store, wait_for_passes,
};

/// Test the basic English to French flow and its cache entry
#[tokio::test]
async fn test_engine_withEnglishPage_shouldRenderFrenchAndCache() {
    let doc = page("en");
    let hello = add_paragraph(&doc, "Hello");
    let store = in_memory_store();
    let service = MockService::working().with_dictionary([("Hello", "Bonjour")]);

    let engine = start_engine_with_store(doc.clone(), &service, store.clone(), "fr").await;

    assert_eq!(doc.text(hello).as_deref(), Some("Bonjour"));
    assert_eq!(engine.current_language(), "fr");
    let entry = store
        .get_translation(&unit_hash("Hello", "fr"))
        .await
        .unwrap()
        .expect("translation should be cached");
    assert_eq!(entry.text, "Bonjour");
    assert_eq!(entry.language_id, "fr");
}

/// Test that a second engine on the same store needs no network
#[tokio::test]
async fn test_engine_withWarmStore_shouldNotCallService() {
    let store = in_memory_store();
    let first_service = MockService::working().with_dictionary([("Hello", "Bonjour")]);
    {
        let doc = page("en");
        add_paragraph(&doc, "Hello");
        let _engine = start_engine_with_store(doc, &first_service, store.clone(), "fr").await;
    }

    let doc = page("en");
    let hello = add_paragraph(&doc, "Hello");
    let second_service = MockService::working();
    let engine = start_engine_with_store(doc.clone(), &second_service, store, "fr").await;

    assert_eq!(doc.text(hello).as_deref(), Some("Bonjour"));
    assert_eq!(second_service.translation_request_count(), 0);
    assert_eq!(engine.cache_stats().hits, 1);
}

/// Test outer whitespace handling
#[tokio::test]
async fn test_engine_withPaddedText_shouldKeepSurroundingSpace() {
    let doc = page("en");
    let padded = add_paragraph(&doc, "  Hello \n");
    let tight = add_paragraph(&doc, "Goodbye");
    let service = MockService::working().with_dictionary([("Hello", "Bonjour"), ("Goodbye", "Au revoir")]);

    let _engine = start_engine(doc.clone(), &service, "fr").await;

    assert_eq!(doc.text(padded).as_deref(), Some(" Bonjour "));
    assert_eq!(doc.text(tight).as_deref(), Some("Au revoir"));
    // Whitespace never reaches the service
    assert_eq!(service.translated_texts().len(), 2);
    assert!(service.translated_texts().contains(&"Hello".to_string()));
}

/// Test that untranslated units go out in batches of at most 25
#[tokio::test]
async fn test_engine_withSixtyParagraphs_shouldSendThreeBatches() {
    let doc = page("en");
    let nodes: Vec<_> = (0..60)
        .map(|i| add_paragraph(&doc, &format!("Paragraph number {}", i)))
        .collect();
    let service = MockService::working();

    let _engine = start_engine(doc.clone(), &service, "de").await;

    let batches = service.untranslated_batches();
    assert_eq!(batches.len(), 3);
    assert!(batches.iter().all(|batch| batch.len() <= 25));
    assert_eq!(batches.iter().map(Vec::len).sum::<usize>(), 60);
    assert_eq!(service.call_count(Endpoint::TranslateAll), 1);
    assert_eq!(doc.text(nodes[42]).as_deref(), Some("[de] Paragraph number 42"));
}

/// Test that repeated texts are requested once
#[tokio::test]
async fn test_engine_withRepeatedText_shouldRequestOnce() {
    let doc = page("en");
    let nodes: Vec<_> = (0..5).map(|_| add_paragraph(&doc, "Add to cart")).collect();
    let service = MockService::working().with_dictionary([("Add to cart", "Ajouter au panier")]);

    let _engine = start_engine(doc.clone(), &service, "fr").await;

    assert_eq!(service.translated_texts(), vec!["Add to cart".to_string()]);
    for node in nodes {
        assert_eq!(doc.text(node).as_deref(), Some("Ajouter au panier"));
    }
}

/// Test that text without letters is never sent
#[tokio::test]
async fn test_engine_withLetterlessText_shouldNotCallService() {
    let doc = page("en");
    let number = add_paragraph(&doc, "1234");
    add_paragraph(&doc, "   ");
    add_paragraph(&doc, "-- / --");
    let service = MockService::working();

    let _engine = start_engine(doc.clone(), &service, "fr").await;

    assert_eq!(service.translation_request_count(), 0);
    assert_eq!(doc.text(number).as_deref(), Some("1234"));
}

/// Test exclusion by tag and by marker
#[tokio::test]
async fn test_engine_withExcludedContent_shouldLeaveItUntouched() {
    let doc = page("en");
    let body = doc.body().unwrap();
    let script = doc.append_element(body, "script");
    let code = doc.append_text(script, "console.log('Hello')");
    let aside = doc.append_element(body, "aside");
    doc.set_attribute(aside, "translate", "no");
    let brand = doc.append_text(doc.append_element(aside, "span"), "Acme Shoes");
    let div = doc.append_element(body, "div");
    doc.set_attribute(div, "class", "footer notranslate");
    let footer = doc.append_text(div, "All rights reserved");
    let hello = add_paragraph(&doc, "Hello");
    let service = MockService::working();

    let _engine = start_engine(doc.clone(), &service, "fr").await;

    assert_eq!(doc.text(code).as_deref(), Some("console.log('Hello')"));
    assert_eq!(doc.text(brand).as_deref(), Some("Acme Shoes"));
    assert_eq!(doc.text(footer).as_deref(), Some("All rights reserved"));
    assert_eq!(doc.text(hello).as_deref(), Some("[fr] Hello"));
    assert_eq!(service.translated_texts(), vec!["Hello".to_string()]);
}

/// Test translatable attributes
#[tokio::test]
async fn test_engine_withPlaceholder_shouldTranslateAttribute() {
    let doc = page("en");
    let body = doc.body().unwrap();
    let input = doc.append_element(body, "input");
    doc.set_attribute(input, "placeholder", "Search products");
    let service = MockService::working().with_dictionary([("Search products", "Rechercher des produits")]);

    let _engine = start_engine(doc.clone(), &service, "fr").await;

    assert_eq!(
        doc.attribute(input, "placeholder").as_deref(),
        Some("Rechercher des produits")
    );
}

/// Test that inserted content gets translated by a follow-up pass
#[tokio::test]
async fn test_engine_withInsertedContent_shouldTranslateOnlyNewText() {
    let doc = page("en");
    let hello = add_paragraph(&doc, "Hello");
    let service = MockService::working().with_dictionary([("Hello", "Bonjour"), ("Fresh news", "Dernieres nouvelles")]);
    let engine = start_engine(doc.clone(), &service, "fr").await;
    service.reset_calls();

    let body = doc.body().unwrap();
    let section = doc.create_element("section");
    let fresh = doc.append_text(section, "Fresh news");
    doc.append_child(body, section);
    wait_for_passes(&engine, 2).await;

    assert_eq!(doc.text(fresh).as_deref(), Some("Dernieres nouvelles"));
    assert_eq!(doc.text(hello).as_deref(), Some("Bonjour"));
    assert_eq!(service.translated_texts(), vec!["Fresh news".to_string()]);
}

/// Test that a page already in the target language is left alone
#[tokio::test]
async fn test_engine_withPageInTargetLanguage_shouldNotCallService() {
    let doc = page("fr");
    let text = add_paragraph(&doc, "Bonjour tout le monde");
    let service = MockService::working();

    let engine = start_engine(doc.clone(), &service, "fr-CA").await;

    assert_eq!(doc.text(text).as_deref(), Some("Bonjour tout le monde"));
    assert_eq!(service.translation_request_count(), 0);
    assert_eq!(engine.roots()[0].state().unwrap().last_report().scanned, 0);
}

/// Test switching back to the page's own language
#[tokio::test]
async fn test_engine_switchingBackToOrigin_shouldRestoreOriginals() {
    let doc = page("fr");
    let text = add_paragraph(&doc, "  Bonjour ");
    let service = MockService::working().with_dictionary([("Bonjour", "Hello")]);
    let engine = start_engine(doc.clone(), &service, "en").await;
    assert_eq!(doc.text(text).as_deref(), Some(" Hello "));
    service.reset_calls();

    assert!(engine.set_language("fr").await);
    wait_for_passes(&engine, 2).await;

    assert_eq!(doc.text(text).as_deref(), Some("  Bonjour "));
    assert_eq!(service.translation_request_count(), 0);
    assert_eq!(engine.roots()[0].state().unwrap().last_report().restored, 1);
}

/// Test inline translation elements
#[tokio::test]
async fn test_engine_withInlineElement_shouldTranslateItSeparately() {
    let doc = page("en");
    let body = doc.body().unwrap();
    let inline = doc.append_element(body, "tovik-t");
    doc.append_text(inline, " Sign in ");
    let service = MockService::working().with_dictionary([("Sign in", "Se connecter")]);

    let engine = start_engine(doc.clone(), &service, "fr").await;

    assert_eq!(doc.text(inline).as_deref(), Some("Se connecter"));
    assert_eq!(engine.inline_translations().len(), 1);
    assert_eq!(service.call_count(Endpoint::Translate), 1);
    // The page pass never picks up inline content
    assert_eq!(service.call_count(Endpoint::TranslateUntranslated), 0);
}
