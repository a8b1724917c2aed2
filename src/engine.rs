/*!
 * Engine bootstrap.
 *
 * [`EngineBuilder::start`] wires the shared pieces into one
 * [`EngineContext`], resolves the initial language, starts listening for
 * language requests on the bus, then attaches:
 * - an [`InlineTranslation`] to every inline element
 * - a [`TranslateRoot`] to every configured selector, or to `body` when none is given
 */

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use url::Url;

use crate::app_config::Config;
use crate::database::{Repository, Store};
use crate::document::query::query_selector_all;
use crate::document::{Document, Selector};
use crate::errors::{EngineError, ServiceError};
use crate::events::{EventBus, Notification};
use crate::language_utils;
use crate::providers::{HttpTranslationService, TranslationService};
use crate::translation::{
    BatchClient, BatchOptions, CacheStats, ClientStats, Component, ContentFilter, EngineContext,
    InlineTranslation, Language, LanguageCatalog, LanguageController, LanguageSource,
    LanguageSources, PageSettings, TranslateRoot, TranslationCache,
};

/// Builder for [`Engine`]
pub struct EngineBuilder {
    config: Config,
    document: Arc<dyn Document>,
    service: Option<Arc<dyn TranslationService>>,
    store: Option<Arc<dyn Store>>,
    page_url: Option<Url>,
    roots: Vec<Selector>,
    environment_language: Option<String>,
    bus: Option<EventBus>,
}

impl EngineBuilder {
    pub fn new(config: Config, document: Arc<dyn Document>) -> Self {
        Self {
            config,
            document,
            service: None,
            store: None,
            page_url: None,
            roots: Vec::new(),
            environment_language: None,
            bus: None,
        }
    }

    /// Use this service instead of the HTTP client built from the configuration
    pub fn service(mut self, service: Arc<dyn TranslationService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Use this store instead of the SQLite repository built from the configuration
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// URL of the page, for the language query parameter and request domain/path
    pub fn page_url(mut self, url: Url) -> Self {
        self.page_url = Some(url);
        self
    }

    /// Observe the first element matching `selector`; may be called repeatedly
    pub fn root(mut self, selector: Selector) -> Self {
        self.roots.push(selector);
        self
    }

    /// Language used when no query parameter, override or profile resolves
    pub fn environment_language(mut self, code: impl Into<String>) -> Self {
        self.environment_language = Some(code.into());
        self
    }

    /// Share an existing bus, e.g. with a language picker
    pub fn bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub async fn start(self) -> Result<Engine, EngineError> {
        let config = self.config;
        config
            .validate()
            .map_err(|e| EngineError::Config(format!("{:#}", e)))?;

        let document = self.document;
        let service: Arc<dyn TranslationService> = match self.service {
            Some(service) => service,
            None => Arc::new(
                HttpTranslationService::from_config(&config.service)
                    .map_err(|e| EngineError::Config(e.to_string()))?,
            ),
        };
        let store: Arc<dyn Store> = match self.store {
            Some(store) => store,
            None => Arc::new(Repository::from_config(&config.cache)?),
        };

        let bus = self.bus.unwrap_or_default();
        let cache = Arc::new(TranslationCache::new(store.clone(), config.cache.enabled));
        let client = Arc::new(BatchClient::new(
            service.clone(),
            cache.clone(),
            BatchOptions::from(&config.service),
        ));
        let filter = Arc::new(ContentFilter::from_config(&config.document));
        let settings = Arc::new(PageSettings::resolve(
            document.as_ref(),
            &config,
            self.page_url.as_ref(),
        ));

        let environment_default = self
            .environment_language
            .or_else(language_utils::environment_language)
            .unwrap_or_else(|| config.default_language.clone());
        let sources = LanguageSources::from_document(
            document.as_ref(),
            &config.document,
            self.page_url.as_ref(),
            environment_default,
        );
        let languages = Arc::new(LanguageController::new(
            document.clone(),
            store.clone(),
            bus.clone(),
        ));
        let requests = bus.subscribe();
        let language_source = languages.start(&sources).await;
        let request_listener = tokio::spawn(listen_for_requests(languages.clone(), bus.clone(), requests));

        let context = EngineContext {
            document: document.clone(),
            bus,
            languages,
            cache,
            client,
            filter,
            settings,
        };

        let mut inline = Vec::new();
        let inline_tag = Selector::Tag(config.document.inline_tag.to_lowercase());
        for element in query_selector_all(document.as_ref(), &inline_tag) {
            let mut component = InlineTranslation::new(context.clone());
            component.on_attach(element).await?;
            inline.push(component);
        }

        let selectors = if self.roots.is_empty() {
            vec![Selector::Tag("body".to_string())]
        } else {
            self.roots
        };
        let mut roots = Vec::with_capacity(selectors.len());
        for selector in selectors {
            let mut root = TranslateRoot::with_selector(context.clone(), selector);
            root.on_attach(document.document_element()).await?;
            roots.push(root);
        }

        info!(
            "Engine started in '{}' with {} roots and {} inline elements",
            context.current_language(),
            roots.len(),
            inline.len()
        );

        Ok(Engine {
            catalog: LanguageCatalog::new(service, store),
            context,
            roots,
            inline,
            request_listener: Some(request_listener),
            language_source,
        })
    }
}

/// Apply inbound language requests until the bus closes
async fn listen_for_requests(
    languages: Arc<LanguageController>,
    bus: EventBus,
    mut notifications: broadcast::Receiver<Notification>,
) {
    loop {
        match notifications.recv().await {
            Ok(Notification::LanguageChangeRequested(code)) => {
                debug!("Language '{}' requested", code);
                languages.set_language(&code).await;
            }
            Ok(_) => {}
            Err(RecvError::Lagged(missed)) => {
                // the latest request is the one that counts
                if let Some(code) = bus.last_requested_language() {
                    warn!("Missed {} notifications, applying latest language request '{}'", missed, code);
                    languages.set_language(&code).await;
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// A running engine bound to one document
pub struct Engine {
    context: EngineContext,
    catalog: LanguageCatalog,
    roots: Vec<TranslateRoot>,
    inline: Vec<InlineTranslation>,
    request_listener: Option<JoinHandle<()>>,
    language_source: LanguageSource,
}

impl Engine {
    pub fn builder(config: Config, document: Arc<dyn Document>) -> EngineBuilder {
        EngineBuilder::new(config, document)
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    pub fn bus(&self) -> &EventBus {
        &self.context.bus
    }

    pub fn current_language(&self) -> String {
        self.context.current_language()
    }

    /// Where the initial language came from
    pub fn language_source(&self) -> LanguageSource {
        self.language_source
    }

    /// Ask for a language change the way a language picker does
    pub fn request_language(&self, code: impl Into<String>) {
        self.context.bus.request_language(code);
    }

    /// Change the language directly; returns whether it changed
    pub async fn set_language(&self, code: &str) -> bool {
        self.context.languages.set_language(code).await
    }

    pub fn catalog(&self) -> &LanguageCatalog {
        &self.catalog
    }

    /// Supported languages sorted by native name
    pub async fn languages(&self) -> Result<Vec<Language>, ServiceError> {
        self.catalog.languages().await
    }

    pub fn roots(&self) -> &[TranslateRoot] {
        &self.roots
    }

    pub fn inline_translations(&self) -> &[InlineTranslation] {
        &self.inline
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.context.cache.stats()
    }

    pub fn client_stats(&self) -> ClientStats {
        self.context.client.stats()
    }

    /// Detach every component and stop listening for requests
    pub fn shutdown(&mut self) {
        for root in &mut self.roots {
            root.on_detach();
        }
        for inline in &mut self.inline {
            inline.on_detach();
        }
        if let Some(listener) = self.request_listener.take() {
            listener.abort();
            info!("Engine stopped");
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
