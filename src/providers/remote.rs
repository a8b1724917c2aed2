/*!
 * HTTP client for the hosted translation service.
 */

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::TranslationService;
use crate::app_config::ServiceConfig;
use crate::errors::ServiceError;
use crate::translation::unit::{Language, TranslationUnit};

/// HTTP client for the hosted translation service
///
/// Every request carries the session cookies (credentials) and an
/// `Accept-Language` header naming the target language.
pub struct HttpTranslationService {
    /// HTTP client for API requests
    client: Client,
    /// Base URL without trailing slash
    base_url: String,
}

/// Outbound unit in the service's wire casing
#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    id: &'a str,
    #[serde(rename = "Domain")]
    domain: &'a str,
    #[serde(rename = "Path")]
    path: &'a str,
    #[serde(rename = "LanguageId")]
    language_id: &'a str,
    #[serde(rename = "Language")]
    language: WireLanguageRef<'a>,
    #[serde(rename = "Text")]
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct WireLanguageRef<'a> {
    #[serde(rename = "Id")]
    id: &'a str,
}

impl<'a> From<&'a TranslationUnit> for WireRequest<'a> {
    fn from(unit: &'a TranslationUnit) -> Self {
        Self {
            id: &unit.hash,
            domain: &unit.domain,
            path: &unit.path,
            language_id: &unit.language_id,
            language: WireLanguageRef {
                id: &unit.language_id,
            },
            text: &unit.text,
        }
    }
}

/// Body of the "translate what's missing" call
#[derive(Debug, Serialize)]
struct UntranslatedBody<'a> {
    #[serde(rename = "Items")]
    items: Vec<WireRequest<'a>>,
    #[serde(rename = "Context", skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
}

/// Inbound unit; only `id` is mandatory
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUnit {
    #[serde(alias = "hash")]
    id: String,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    language_id: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl WireUnit {
    fn into_unit(self, target: &str) -> TranslationUnit {
        TranslationUnit {
            hash: self.id,
            domain: self.domain.unwrap_or_default(),
            path: self.path.unwrap_or_default(),
            language_id: self
                .language_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| target.to_string()),
            text: self.text.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLanguage {
    id: String,
    #[serde(default)]
    native_name: Option<String>,
}

impl HttpTranslationService {
    /// Create a new client for the given base URL
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ServiceError> {
        let mut builder = Client::builder().cookie_store(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        Self::new(&config.base_url, config.timeout_secs.map(Duration::from_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn with_language(request: RequestBuilder, target: &str) -> RequestBuilder {
        match HeaderValue::from_str(target) {
            Ok(value) => request.header(ACCEPT_LANGUAGE, value),
            Err(_) => request,
        }
    }

    /// Send a request and decode a JSON body; a null or empty body decodes to `None`
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        target: &str,
    ) -> Result<Option<T>, ServiceError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ServiceError::RateLimited {
                language: target.to_string(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                status_code: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let body = body.trim();
        if body.is_empty() || body == "null" {
            return Ok(None);
        }

        serde_json::from_str(body)
            .map(Some)
            .map_err(|e| ServiceError::ParseError(e.to_string()))
    }

    async fn post_units(
        &self,
        path: &str,
        body: &impl Serialize,
        target: &str,
    ) -> Result<Vec<TranslationUnit>, ServiceError> {
        let request = Self::with_language(self.client.post(self.endpoint(path)).json(body), target);
        let units: Option<Vec<Option<WireUnit>>> = self.send(request, target).await?;

        let units: Vec<TranslationUnit> = units
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .map(|unit| unit.into_unit(target))
            .collect();

        debug!("{} returned {} units", path, units.len());
        Ok(units)
    }
}

#[async_trait]
impl TranslationService for HttpTranslationService {
    async fn languages(&self) -> Result<Vec<Language>, ServiceError> {
        let request = self.client.get(self.endpoint("translate/languages"));
        let languages: Option<Vec<WireLanguage>> = self.send(request, "").await?;

        Ok(languages
            .unwrap_or_default()
            .into_iter()
            .map(|language| {
                let native_name = language.native_name.unwrap_or_else(|| language.id.clone());
                Language::new(language.id, native_name)
            })
            .collect())
    }

    async fn translate(
        &self,
        unit: &TranslationUnit,
        target: &str,
    ) -> Result<Option<TranslationUnit>, ServiceError> {
        let request = Self::with_language(
            self.client
                .post(self.endpoint("translate"))
                .json(&WireRequest::from(unit)),
            target,
        );
        let result: Option<WireUnit> = self.send(request, target).await?;
        Ok(result.map(|unit| unit.into_unit(target)))
    }

    async fn translate_all(
        &self,
        units: &[TranslationUnit],
        target: &str,
    ) -> Result<Vec<TranslationUnit>, ServiceError> {
        let body: Vec<WireRequest<'_>> = units.iter().map(WireRequest::from).collect();
        self.post_units("translate/all", &body, target).await
    }

    async fn translate_untranslated(
        &self,
        units: &[TranslationUnit],
        context: Option<&str>,
        target: &str,
    ) -> Result<Vec<TranslationUnit>, ServiceError> {
        let body = UntranslatedBody {
            items: units.iter().map(WireRequest::from).collect(),
            context,
        };
        self.post_units("translate/untranslated", &body, target).await
    }
}
