/*!
 * Tests for the HTTP translation service client against a local mock server
 */

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tovik::errors::ServiceError;
use tovik::providers::{HttpTranslationService, TranslationService};
use tovik::translation::TranslationUnit;

fn unit(hash: &str, text: &str) -> TranslationUnit {
    TranslationUnit::new(hash, "shop.example", "/", "en", text)
}

async fn service(server: &MockServer) -> HttpTranslationService {
    HttpTranslationService::new(server.uri(), None).expect("client should build")
}

/// Test language catalog retrieval
#[tokio::test]
async fn test_languages_shouldDecodeCatalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/translate/languages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "fr", "nativeName": "Français" },
            { "id": "de" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let languages = service(&server).await.languages().await.unwrap();

    assert_eq!(languages.len(), 2);
    assert_eq!(languages[0].id, "fr");
    assert_eq!(languages[0].native_name, "Français");
    // Missing native names fall back to the id
    assert_eq!(languages[1].native_name, "de");
}

/// Test the shared-cache lookup request shape
#[tokio::test]
async fn test_translateAll_shouldSendTargetLanguageHeader() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/translate/all"))
        .and(header("accept-language", "fr"))
        .and(body_partial_json(json!([
            { "id": "h1", "Domain": "shop.example", "Path": "/", "LanguageId": "en", "Language": { "Id": "en" }, "Text": "Hello" }
        ])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "h1", "languageId": "fr", "text": "Bonjour" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let units = service(&server)
        .await
        .translate_all(&[unit("h1", "Hello")], "fr")
        .await
        .unwrap();

    assert_eq!(units, vec![TranslationUnit::new("h1", "", "", "fr", "Bonjour")]);
}

/// Test the untranslated request body and null tolerance
#[tokio::test]
async fn test_translateUntranslated_shouldWrapItemsWithContext() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/translate/untranslated"))
        .and(header("accept-language", "de"))
        .and(body_partial_json(json!({
            "Items": [{ "id": "h1", "Text": "Hello" }, { "id": "h2", "Text": "Cart" }],
            "Context": "Shop"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "h1", "text": "Hallo" },
            null
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let units = service(&server)
        .await
        .translate_untranslated(&[unit("h1", "Hello"), unit("h2", "Cart")], Some("Shop"), "de")
        .await
        .unwrap();

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].hash, "h1");
    assert_eq!(units[0].text, "Hallo");
    // No language in the response means the target language
    assert_eq!(units[0].language_id, "de");
}

/// Test the single-unit endpoint with an empty answer
#[tokio::test]
async fn test_translate_withNullBody_shouldReturnNone() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/translate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(&server)
        .await;

    let result = service(&server).await.translate(&unit("h1", "Hello"), "fr").await.unwrap();

    assert!(result.is_none());
}

/// Test the usage-limit condition
#[tokio::test]
async fn test_translate_withTooManyRequests_shouldReturnRateLimited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/translate/untranslated"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let error = service(&server)
        .await
        .translate_untranslated(&[unit("h1", "Hello")], None, "fr")
        .await
        .unwrap_err();

    assert!(error.is_rate_limit());
    assert!(matches!(error, ServiceError::RateLimited { ref language } if language == "fr"));
}

/// Test other non-success statuses
#[tokio::test]
async fn test_translate_withServerError_shouldReturnApiError() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/translate/all"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let error = service(&server)
        .await
        .translate_all(&[unit("h1", "Hello")], "fr")
        .await
        .unwrap_err();

    assert!(!error.is_rate_limit());
    assert_eq!(error.status_code(), Some(500));
    assert!(matches!(error, ServiceError::Api { ref message, .. } if message == "boom"));
}

/// Test malformed response bodies
#[tokio::test]
async fn test_translateAll_withMalformedJson_shouldReturnParseError() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/translate/all"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{ not json"))
        .mount(&server)
        .await;

    let error = service(&server)
        .await
        .translate_all(&[unit("h1", "Hello")], "fr")
        .await
        .unwrap_err();

    assert!(matches!(error, ServiceError::ParseError(_)));
}
