/*!
 * Attachable components that keep content translated.
 *
 * - [`TranslateRoot`] translates a whole subtree, rescans it on every
 *   content-changed notification and re-translates it with forced reload
 *   when the language moves to a different primary subtag.
 * - [`InlineTranslation`] translates one element's whole text as a single
 *   unit and re-translates it on every language change.
 *
 * Both own their subscriptions and release them on detach or drop.
 */

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

use super::cache::unit_hash;
use super::core::{EngineContext, PassReport, RootState, translate_page};
use super::filter::{FilterMode, contains_letter};
use super::unit::TranslationRequest;
use crate::document::query::query_selector;
use crate::document::{NodeId, NodeKind, ObserveOptions, ObserverId, Selector};
use crate::errors::EngineError;
use crate::events::Notification;
use crate::language_utils::primary_subtags_match;

/// Lifecycle hooks of something attached to a document node
#[async_trait]
pub trait Component: Send {
    /// Start working on `root`
    async fn on_attach(&mut self, root: NodeId) -> Result<(), EngineError>;

    /// Release every subscription
    fn on_detach(&mut self);
}

fn ensure_element(ctx: &EngineContext, node: NodeId) -> Result<(), EngineError> {
    match ctx.document.kind(node) {
        Some(NodeKind::Element) => Ok(()),
        _ => Err(EngineError::UnknownNode(node.0)),
    }
}

/// Subtree translator
pub struct TranslateRoot {
    ctx: EngineContext,
    selector: Option<Selector>,
    state: Option<Arc<RootState>>,
    observer: Option<ObserverId>,
    listener: Option<JoinHandle<()>>,
}

impl TranslateRoot {
    /// Translate the node passed to [`Component::on_attach`]
    pub fn new(ctx: EngineContext) -> Self {
        Self {
            ctx,
            selector: None,
            state: None,
            observer: None,
            listener: None,
        }
    }

    /// Translate the first element matching `selector` instead of the attach node
    pub fn with_selector(ctx: EngineContext, selector: Selector) -> Self {
        Self {
            ctx,
            selector: Some(selector),
            state: None,
            observer: None,
            listener: None,
        }
    }

    /// State of the observed root once attached
    pub fn state(&self) -> Option<Arc<RootState>> {
        self.state.clone()
    }

    pub fn observed_root(&self) -> Option<NodeId> {
        self.state.as_ref().map(|state| state.root())
    }

    pub fn is_attached(&self) -> bool {
        self.listener.is_some()
    }

    fn resolve_root(&self, root: NodeId) -> Result<NodeId, EngineError> {
        let target = match &self.selector {
            Some(selector) => query_selector(self.ctx.document.as_ref(), selector)
                .ok_or_else(|| EngineError::RootNotFound(format!("{:?}", selector)))?,
            None => root,
        };
        ensure_element(&self.ctx, target)?;
        Ok(target)
    }
}

#[async_trait]
impl Component for TranslateRoot {
    async fn on_attach(&mut self, root: NodeId) -> Result<(), EngineError> {
        if self.is_attached() {
            self.on_detach();
        }
        let target = self.resolve_root(root)?;
        let state = Arc::new(RootState::new(
            self.ctx.document.as_ref(),
            target,
            self.ctx.languages.document_original_language(),
        ));

        let notifications = self.ctx.bus.subscribe();
        let report = translate_page(&self.ctx, &state, FilterMode::Normal).await;
        info!(
            "Attached to {}: {} candidates, {} from cache, {} translated",
            target, report.scanned, report.cache_hits, report.translated
        );

        let bus = self.ctx.bus.clone();
        self.observer = Some(self.ctx.document.observe(
            target,
            ObserveOptions::structure(),
            Arc::new(move |records| {
                if !records.is_empty() {
                    bus.publish(Notification::ContentChanged);
                }
            }),
        ));
        self.listener = Some(tokio::spawn(listen(
            self.ctx.clone(),
            state.clone(),
            notifications,
        )));
        self.state = Some(state);
        Ok(())
    }

    fn on_detach(&mut self) {
        if let Some(observer) = self.observer.take() {
            self.ctx.document.disconnect(observer);
        }
        if let Some(listener) = self.listener.take() {
            listener.abort();
            debug!("Detached translator from {:?}", self.observed_root());
        }
    }
}

impl Drop for TranslateRoot {
    fn drop(&mut self) {
        self.on_detach();
    }
}

/// Mode for the catch-up pass after missed notifications
///
/// A missed language change shows up as rendered content in another
/// primary subtag than the current language.
fn lagged_mode(ctx: &EngineContext, state: &RootState) -> FilterMode {
    let current = ctx.current_language();
    match state.rendered_language() {
        Some(rendered) if !primary_subtags_match(&rendered, &current) => FilterMode::ForceReload,
        _ => FilterMode::Normal,
    }
}

/// Re-run passes for notifications until the bus closes
async fn listen(ctx: EngineContext, state: Arc<RootState>, mut notifications: broadcast::Receiver<Notification>) {
    let mut passes: JoinSet<PassReport> = JoinSet::new();

    loop {
        tokio::select! {
            received = notifications.recv() => {
                let mode = match received {
                    Ok(Notification::ContentChanged) => FilterMode::Normal,
                    Ok(Notification::LanguageChanged(language)) => {
                        let rendered = state.rendered_language();
                        if rendered.as_deref().is_some_and(|r| primary_subtags_match(r, &language)) {
                            debug!("Content under {} already rendered in '{}'", state.root(), language);
                            continue;
                        }
                        FilterMode::ForceReload
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Translator for {} missed {} notifications, rescanning", state.root(), missed);
                        lagged_mode(&ctx, &state)
                    }
                    Err(RecvError::Closed) => break,
                };

                let ctx = ctx.clone();
                let state = state.clone();
                passes.spawn(async move { translate_page(&ctx, &state, mode).await });
            }
            Some(_) = passes.join_next(), if !passes.is_empty() => {}
        }
    }

    passes.shutdown().await;
}

/// State of an attached inline element
pub struct InlineState {
    element: NodeId,
    original: String,
    origin_language: Option<String>,
    rendered: Mutex<Option<String>>,
    translations: watch::Sender<u64>,
}

impl InlineState {
    pub fn element(&self) -> NodeId {
        self.element
    }

    /// Trimmed text content captured at attach
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Text currently written to the element
    pub fn rendered(&self) -> Option<String> {
        self.rendered.lock().clone()
    }

    pub fn translation_count(&self) -> u64 {
        *self.translations.borrow()
    }

    /// Wait until at least `count` translations have completed
    pub async fn wait_for_translations(&self, count: u64) {
        let mut translations = self.translations.subscribe();
        let _ = translations.wait_for(|completed| *completed >= count).await;
    }
}

/// Single-unit translator for an inline element
pub struct InlineTranslation {
    ctx: EngineContext,
    state: Option<Arc<InlineState>>,
    listener: Option<JoinHandle<()>>,
}

impl InlineTranslation {
    pub fn new(ctx: EngineContext) -> Self {
        Self {
            ctx,
            state: None,
            listener: None,
        }
    }

    pub fn state(&self) -> Option<Arc<InlineState>> {
        self.state.clone()
    }
}

#[async_trait]
impl Component for InlineTranslation {
    async fn on_attach(&mut self, root: NodeId) -> Result<(), EngineError> {
        if self.listener.is_some() {
            self.on_detach();
        }
        ensure_element(&self.ctx, root)?;

        let doc = self.ctx.document.as_ref();
        let own_language = doc
            .attribute(root, "lang")
            .map(|lang| lang.trim().to_string())
            .filter(|lang| !lang.is_empty());
        let (translations, _) = watch::channel(0);
        let state = Arc::new(InlineState {
            element: root,
            original: doc.text(root).unwrap_or_default().trim().to_string(),
            origin_language: own_language.or_else(|| self.ctx.languages.document_original_language()),
            rendered: Mutex::new(None),
            translations,
        });

        let notifications = self.ctx.bus.subscribe();
        translate_inline(&self.ctx, &state).await;
        self.listener = Some(tokio::spawn(listen_inline(
            self.ctx.clone(),
            state.clone(),
            notifications,
        )));
        self.state = Some(state);
        Ok(())
    }

    fn on_detach(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

impl Drop for InlineTranslation {
    fn drop(&mut self) {
        self.on_detach();
    }
}

async fn listen_inline(
    ctx: EngineContext,
    state: Arc<InlineState>,
    mut notifications: broadcast::Receiver<Notification>,
) {
    loop {
        match notifications.recv().await {
            Ok(Notification::LanguageChanged(_)) | Err(RecvError::Lagged(_)) => {
                translate_inline(&ctx, &state).await;
            }
            Ok(_) => {}
            Err(RecvError::Closed) => break,
        }
    }
}

/// Translate an inline element through the local cache, then the single endpoint
pub async fn translate_inline(ctx: &EngineContext, state: &InlineState) {
    let target = ctx.current_language();
    let doc = ctx.document.as_ref();

    let rendered = if target.is_empty()
        || !contains_letter(&state.original)
        || state
            .origin_language
            .as_deref()
            .is_some_and(|origin| primary_subtags_match(origin, &target))
    {
        state.original.clone()
    } else {
        let hash = unit_hash(&state.original, &target);
        let cached = ctx.cache.get(&hash).await;
        let unit = match cached {
            Some(unit) => Some(unit),
            None => {
                let from_language = state.origin_language.clone().unwrap_or_default();
                let scope = ctx.scope(&from_language, &target);
                ctx.client
                    .translate_one(&TranslationRequest::new(hash, state.original.clone()), &scope)
                    .await
            }
        };

        if !ctx.current_language().eq_ignore_ascii_case(&target) {
            debug!("Inline result for {} arrived after a language change", state.element);
            return;
        }
        unit.map(|unit| unit.text).unwrap_or_else(|| state.original.clone())
    };

    let previous = state.rendered.lock().clone();
    if previous.as_deref().unwrap_or(state.original.as_str()) != rendered {
        doc.set_text(state.element, &rendered);
    }
    *state.rendered.lock() = Some(rendered);
    state.translations.send_modify(|completed| *completed += 1);
}
