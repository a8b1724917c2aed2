/*!
 * Current-language management.
 *
 * The [`LanguageController`] owns the engine's language profile. It resolves
 * the initial language once at start, in this order:
 * 1. the page URL's language query parameter
 * 2. the body's externally-imposed override attribute
 * 3. the persisted profile
 * 4. the environment default
 *
 * After that the language changes only through [`LanguageController::set_language`].
 * The [`LanguageCatalog`] lists the languages the service supports.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use parking_lot::RwLock;
use url::Url;

use super::unit::Language;
use crate::app_config::DocumentConfig;
use crate::database::{LanguageRecord, ProfileRecord, Store};
use crate::document::Document;
use crate::errors::ServiceError;
use crate::events::{EventBus, Notification};
use crate::language_utils;
use crate::providers::TranslationService;

/// Process-wide language state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageProfile {
    /// Language content is rendered in
    pub current_language: String,
    /// Language the document declared before the engine touched it
    pub document_original_language: Option<String>,
}

/// Where the initial language came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageSource {
    QueryParameter,
    DocumentOverride,
    Profile,
    Environment,
}

/// Candidate initial languages gathered from the host document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageSources {
    pub query_language: Option<String>,
    pub override_language: Option<String>,
    pub environment_default: String,
}

impl LanguageSources {
    pub fn from_document(
        doc: &dyn Document,
        config: &DocumentConfig,
        page_url: Option<&Url>,
        environment_default: impl Into<String>,
    ) -> Self {
        let query_language = page_url.and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == config.language_query_parameter.as_str())
                .map(|(_, value)| value.trim().to_string())
                .filter(|value| !value.is_empty())
        });
        let override_language = doc
            .body()
            .and_then(|body| doc.attribute(body, &config.language_override_attribute))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Self {
            query_language,
            override_language,
            environment_default: environment_default.into(),
        }
    }
}

pub struct LanguageController {
    document: Arc<dyn Document>,
    store: Arc<dyn Store>,
    bus: EventBus,
    profile: RwLock<LanguageProfile>,
    has_override: AtomicBool,
}

impl LanguageController {
    pub fn new(document: Arc<dyn Document>, store: Arc<dyn Store>, bus: EventBus) -> Self {
        let document_original_language = document
            .attribute(document.document_element(), "lang")
            .map(|lang| lang.trim().to_string())
            .filter(|lang| !lang.is_empty());

        Self {
            document,
            store,
            bus,
            profile: RwLock::new(LanguageProfile {
                current_language: String::new(),
                document_original_language,
            }),
            has_override: AtomicBool::new(false),
        }
    }

    /// Resolve and apply the initial language
    pub async fn start(&self, sources: &LanguageSources) -> LanguageSource {
        self.has_override
            .store(sources.override_language.is_some(), Ordering::Relaxed);

        let stored = match self.store.get_profile().await {
            Ok(profile) => profile.map(|p| p.language).filter(|l| !l.trim().is_empty()),
            Err(e) => {
                warn!("Failed to read the language profile: {:#}", e);
                None
            }
        };

        let (language, source) = if let Some(code) = &sources.query_language {
            (code.clone(), LanguageSource::QueryParameter)
        } else if let Some(code) = &sources.override_language {
            (code.clone(), LanguageSource::DocumentOverride)
        } else if let Some(code) = stored {
            (code, LanguageSource::Profile)
        } else {
            (sources.environment_default.clone(), LanguageSource::Environment)
        };
        let language = language_utils::normalize_tag(&language);

        self.profile.write().current_language = language.clone();
        if matches!(source, LanguageSource::QueryParameter | LanguageSource::Environment) {
            self.persist(&language).await;
        }
        self.apply_document_attributes(&language);

        info!("Language resolved to '{}' ({:?})", language, source);
        self.bus.publish(Notification::LanguageSet(language));
        source
    }

    pub fn current_language(&self) -> String {
        self.profile.read().current_language.clone()
    }

    pub fn document_original_language(&self) -> Option<String> {
        self.profile.read().document_original_language.clone()
    }

    pub fn profile(&self) -> LanguageProfile {
        self.profile.read().clone()
    }

    /// Whether the document imposes its target language
    pub fn has_override(&self) -> bool {
        self.has_override.load(Ordering::Relaxed)
    }

    /// Switch to `code`; returns whether the language actually changed
    ///
    /// The confirmation notification is sent on every call, the change
    /// notification only when the value differs.
    pub async fn set_language(&self, code: &str) -> bool {
        let language = language_utils::normalize_tag(code);
        if language.is_empty() {
            warn!("Ignoring request for an empty language code");
            return false;
        }

        let changed = {
            let mut profile = self.profile.write();
            if profile.current_language.eq_ignore_ascii_case(&language) {
                false
            } else {
                profile.current_language = language.clone();
                true
            }
        };

        if changed {
            if self.has_override() {
                debug!("Language override present, not persisting '{}'", language);
            } else {
                self.persist(&language).await;
            }
            self.apply_document_attributes(&language);
            info!("Language changed to '{}'", language);
            self.bus.publish(Notification::LanguageChanged(language.clone()));
        }

        self.bus.publish(Notification::LanguageSet(language));
        changed
    }

    async fn persist(&self, language: &str) {
        if let Err(e) = self.store.put_profile(&ProfileRecord::new(language)).await {
            warn!("Failed to persist language '{}': {:#}", language, e);
        }
    }

    fn apply_document_attributes(&self, language: &str) {
        let root = self.document.document_element();
        self.document.set_attribute(root, "lang", language);
        self.document
            .set_attribute(root, "dir", language_utils::text_direction(language).as_str());
    }
}

/// Supported languages, cached in the store after the first fetch
pub struct LanguageCatalog {
    service: Arc<dyn TranslationService>,
    store: Arc<dyn Store>,
}

impl LanguageCatalog {
    pub fn new(service: Arc<dyn TranslationService>, store: Arc<dyn Store>) -> Self {
        Self { service, store }
    }

    /// Languages sorted by native name
    pub async fn languages(&self) -> Result<Vec<Language>, ServiceError> {
        let stored = match self.store.list_languages().await {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to read the language catalog: {:#}", e);
                Vec::new()
            }
        };

        let mut languages: Vec<Language> = if stored.is_empty() {
            let fetched = self.service.languages().await?;
            let records: Vec<LanguageRecord> = fetched.iter().map(LanguageRecord::from).collect();
            if let Err(e) = self.store.put_languages(&records).await {
                warn!("Failed to store the language catalog: {:#}", e);
            }
            debug!("Fetched {} languages from the service", fetched.len());
            fetched
        } else {
            stored.into_iter().map(Language::from).collect()
        };

        sort_by_native_name(&mut languages);
        Ok(languages)
    }

    /// Whether `code` names a language of the catalog
    pub async fn ensure_contains(&self, code: &str) -> Result<bool, ServiceError> {
        let code = language_utils::normalize_tag(code);
        Ok(self.languages().await?.iter().any(|language| {
            language.id.eq_ignore_ascii_case(&code)
                || language_utils::primary_subtags_match(&language.id, &code)
        }))
    }
}

/// Case-insensitive by native name, ties by id
pub fn sort_by_native_name(languages: &mut [Language]) {
    languages.sort_by(|a, b| {
        a.native_name
            .to_lowercase()
            .cmp(&b.native_name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
}
