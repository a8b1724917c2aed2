/*!
 * Tests for the deduplicating batch client
 */

use std::sync::Arc;

use tovik::providers::mock::{Endpoint, MockService};
use tovik::translation::{
    BatchClient, BatchOptions, RequestScope, TranslationCache, TranslationRequest, unit_hash,
};

fn scope(context: Option<&str>) -> RequestScope {
    RequestScope {
        domain: "shop.example".to_string(),
        path: "/cart".to_string(),
        from_language: "en".to_string(),
        target_language: "fr".to_string(),
        context: context.map(str::to_string),
    }
}

fn requests(texts: &[&str]) -> Vec<TranslationRequest> {
    texts
        .iter()
        .map(|text| TranslationRequest::new(unit_hash(text, "fr"), *text))
        .collect()
}

fn client(service: &MockService, options: BatchOptions) -> (BatchClient, Arc<TranslationCache>) {
    let cache = Arc::new(TranslationCache::in_memory());
    let client = BatchClient::new(Arc::new(service.clone()), cache.clone(), options);
    (client, cache)
}

/// Test that batches respect the configured size
#[tokio::test]
async fn test_resolve_withSmallBatchSize_shouldSplitRequests() {
    let service = MockService::working();
    let options = BatchOptions {
        batch_size: 10,
        ..Default::default()
    };
    let (client, _) = client(&service, options);
    let texts: Vec<String> = (0..23).map(|i| format!("Item {}", i)).collect();
    let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();

    let resolved = client.resolve(&requests(&text_refs), &scope(None)).await;

    assert_eq!(resolved.len(), 23);
    let mut sizes: Vec<usize> = service.untranslated_batches().iter().map(Vec::len).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![3, 10, 10]);
}

/// Test that batch sizes above the service limit are clamped
#[test]
fn test_new_withOversizedBatch_shouldClamp() {
    let service = MockService::working();
    let options = BatchOptions {
        batch_size: 100,
        max_concurrent_requests: 0,
        shared_cache_lookup: true,
    };
    let (client, _) = client(&service, options);

    assert_eq!(client.options().batch_size, 25);
    assert_eq!(client.options().max_concurrent_requests, 1);
}

/// Test that disabling the shared-cache lookup skips that endpoint
#[tokio::test]
async fn test_resolve_withoutSharedLookup_shouldOnlyTranslate() {
    let service = MockService::working();
    let options = BatchOptions {
        shared_cache_lookup: false,
        ..Default::default()
    };
    let (client, cache) = client(&service, options);
    let batch = requests(&["Hello"]);

    let resolved = client.resolve(&batch, &scope(None)).await;

    assert_eq!(resolved[&batch[0].hash].text, "[fr] Hello");
    assert_eq!(resolved[&batch[0].hash].language_id, "fr");
    assert_eq!(service.call_count(Endpoint::TranslateAll), 0);
    assert_eq!(service.call_count(Endpoint::TranslateUntranslated), 1);
    assert!(cache.get(&batch[0].hash).await.is_some());
}

/// Test outbound unit contents
#[tokio::test]
async fn test_resolve_shouldSendScopeAndContext() {
    let service = MockService::working();
    let (client, _) = client(&service, BatchOptions::default());

    client
        .resolve(&requests(&["Checkout"]), &scope(Some("Your cart")))
        .await;

    let calls = service.calls_to(Endpoint::TranslateUntranslated);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].context.as_deref(), Some("Your cart"));
    assert_eq!(calls[0].target, "fr");
    let unit = &calls[0].units[0];
    assert_eq!(unit.domain, "shop.example");
    assert_eq!(unit.path, "/cart");
    assert_eq!(unit.language_id, "en");
    assert_eq!(unit.text, "Checkout");
}

/// Test that blank answers are not accepted as translations
#[tokio::test]
async fn test_resolve_withBlankTranslation_shouldLeaveUnresolved() {
    let service = MockService::working().with_dictionary([("Hello", "   ")]);
    let (client, cache) = client(&service, BatchOptions::default());
    let batch = requests(&["Hello", "World"]);

    let resolved = client.resolve(&batch, &scope(None)).await;

    assert!(!resolved.contains_key(&batch[0].hash));
    assert!(resolved.contains_key(&batch[1].hash));
    assert!(cache.get(&batch[0].hash).await.is_none());
}

/// Test that an empty service answer resolves nothing
#[tokio::test]
async fn test_resolve_withEmptyService_shouldResolveNothing() {
    let service = MockService::empty();
    let (client, _) = client(&service, BatchOptions::default());

    let resolved = client.resolve(&requests(&["Hello"]), &scope(None)).await;

    assert!(resolved.is_empty());
    assert_eq!(client.inflight_count(), 0);
    assert_eq!(client.stats().failures, 0);
}

/// Test that server errors are counted and contained
#[tokio::test]
async fn test_resolve_withFailingService_shouldCountFailures() {
    let service = MockService::failing();
    let (client, _) = client(&service, BatchOptions::default());

    let resolved = client.resolve(&requests(&["Hello"]), &scope(None)).await;

    assert!(resolved.is_empty());
    let stats = client.stats();
    assert_eq!(stats.failures, 2);
    assert_eq!(stats.rate_limited, 0);
    assert_eq!(stats.requests_sent, 2);
    assert_eq!(client.inflight_count(), 0);
}

/// Test that no request means no call
#[tokio::test]
async fn test_resolve_withNoRequests_shouldNotCallService() {
    let service = MockService::working();
    let (client, _) = client(&service, BatchOptions::default());

    assert!(client.resolve(&[], &scope(None)).await.is_empty());
    assert!(service.calls().is_empty());
}
