/*!
 * Core translation pass.
 *
 * [`EngineContext`] is the explicit context object every component receives
 * at attach time: document, bus, language controller, cache, batch client,
 * filter and page settings. [`translate_page`] runs one pass over an observed
 * root:
 * 1. prune bindings of detached nodes
 * 2. scan text nodes and translatable attributes
 * 3. apply local-cache hits
 * 4. mark misses `translating` and resolve them through the batch client
 * 5. apply results, reverting anything unresolved to its original
 *
 * When the target language matches the root's origin language every binding
 * is restored to its original text instead, without touching the network.
 */

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use log::{debug, info};
use parking_lot::Mutex;
use tokio::sync::watch;
use url::Url;

use super::batch::{BatchClient, RequestScope};
use super::binding::{BindingKey, BindingState, BindingTable};
use super::cache::TranslationCache;
use super::filter::{ContentFilter, FilterMode};
use super::language::LanguageController;
use super::scanner::ContentScanner;
use super::unit::{TranslationRequest, TranslationUnit};
use crate::app_config::Config;
use crate::document::query::{document_title, is_connected};
use crate::document::{Document, NodeId};
use crate::events::{EventBus, Notification};
use crate::language_utils::primary_subtags_match;

/// Per-page request settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSettings {
    /// Domain sent with every unit
    pub domain: String,
    /// Path sent with every unit
    pub path: String,
    /// Send the document title as context with untranslated batches
    pub send_page_context: bool,
    /// Attributes scanned on every pass
    pub translatable_attributes: Vec<String>,
}

impl PageSettings {
    /// Body override attributes first, then the page URL
    pub fn resolve(doc: &dyn Document, config: &Config, page_url: Option<&Url>) -> Self {
        let body_attribute = |name: &str| {
            doc.body()
                .and_then(|body| doc.attribute(body, name))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let domain = body_attribute(&config.document.domain_attribute)
            .or_else(|| {
                page_url.and_then(|url| {
                    url.host_str().map(|host| match url.port() {
                        Some(port) => format!("{}:{}", host, port),
                        None => host.to_string(),
                    })
                })
            })
            .unwrap_or_default();
        let path = body_attribute(&config.document.path_attribute)
            .or_else(|| page_url.map(|url| url.path().to_string()))
            .unwrap_or_else(|| "/".to_string());

        Self {
            domain,
            path,
            send_page_context: config.service.send_page_context,
            translatable_attributes: config.document.translatable_attributes.clone(),
        }
    }
}

/// Everything a component needs, created once per engine
#[derive(Clone)]
pub struct EngineContext {
    pub document: Arc<dyn Document>,
    pub bus: EventBus,
    pub languages: Arc<LanguageController>,
    pub cache: Arc<TranslationCache>,
    pub client: Arc<BatchClient>,
    pub filter: Arc<ContentFilter>,
    pub settings: Arc<PageSettings>,
}

impl EngineContext {
    pub fn current_language(&self) -> String {
        self.languages.current_language()
    }

    /// Request scope for text written in `from_language` going to `target_language`
    pub fn scope(&self, from_language: &str, target_language: &str) -> RequestScope {
        let context = if self.settings.send_page_context {
            document_title(self.document.as_ref())
        } else {
            None
        };

        RequestScope {
            domain: self.settings.domain.clone(),
            path: self.settings.path.clone(),
            from_language: from_language.to_string(),
            target_language: target_language.to_string(),
            context,
        }
    }
}

/// What one pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Candidates moved to `pending`
    pub scanned: usize,
    /// Bindings served from the local cache
    pub cache_hits: usize,
    /// Distinct hashes handed to the batch client
    pub requested: usize,
    /// Bindings rendered from a service result
    pub translated: usize,
    /// Bindings left on their original text
    pub unresolved: usize,
    /// Bindings restored because the target is the origin language
    pub restored: usize,
    /// Bindings dropped because their node left the document
    pub pruned: usize,
    /// Bindings whose result arrived after the language changed
    pub stale: usize,
}

/// Translation state of one observed root
pub struct RootState {
    root: NodeId,
    origin_language: Option<String>,
    bindings: Mutex<BindingTable>,
    rendered_language: Mutex<Option<String>>,
    last_report: Mutex<PassReport>,
    passes: watch::Sender<u64>,
}

impl RootState {
    /// `document_language` is used unless the root declares its own `lang`
    pub fn new(doc: &dyn Document, root: NodeId, document_language: Option<String>) -> Self {
        let own_language = if root == doc.document_element() {
            None
        } else {
            doc.attribute(root, "lang")
                .map(|lang| lang.trim().to_string())
                .filter(|lang| !lang.is_empty())
        };
        let (passes, _) = watch::channel(0);

        Self {
            root,
            origin_language: own_language.or(document_language),
            bindings: Mutex::new(BindingTable::new()),
            rendered_language: Mutex::new(None),
            last_report: Mutex::new(PassReport::default()),
            passes,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn origin_language(&self) -> Option<&str> {
        self.origin_language.as_deref()
    }

    /// Language the content was last rendered in
    pub fn rendered_language(&self) -> Option<String> {
        self.rendered_language.lock().clone()
    }

    /// Whether content in `language` is the untranslated original
    pub fn is_origin(&self, language: &str) -> bool {
        self.origin_language
            .as_deref()
            .is_some_and(|origin| primary_subtags_match(origin, language))
    }

    pub fn binding_state(&self, key: &BindingKey) -> Option<BindingState> {
        self.bindings.lock().state(key)
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.lock().len()
    }

    pub fn count_in(&self, state: BindingState) -> usize {
        self.bindings.lock().count_in(state)
    }

    pub fn last_report(&self) -> PassReport {
        *self.last_report.lock()
    }

    /// Completed passes so far
    pub fn pass_count(&self) -> u64 {
        *self.passes.borrow()
    }

    /// Wait until at least `count` passes have completed
    pub async fn wait_for_passes(&self, count: u64) {
        let mut passes = self.passes.subscribe();
        let _ = passes.wait_for(|completed| *completed >= count).await;
    }

    fn finish_pass(&self, report: PassReport) -> PassReport {
        *self.last_report.lock() = report;
        self.passes.send_modify(|completed| *completed += 1);
        report
    }

    /// Write every original back and forget the lifecycle
    fn restore_originals(&self, doc: &dyn Document) -> usize {
        let mut table = self.bindings.lock();
        let mut restored = 0;
        for binding in table.iter_mut() {
            if binding.state() == BindingState::Untouched {
                continue;
            }
            let original = binding.reset();
            binding.write(doc, &original);
            restored += 1;
        }
        restored
    }
}

/// Hash -> (trimmed source text, bindings sharing it)
type HashGroups = HashMap<String, (String, Vec<BindingKey>)>;

#[derive(Default)]
struct ApplyOutcome {
    translated: usize,
    unresolved: usize,
    stale: usize,
}

/// Render results for `hashes`; hashes without a result fall back to the original
fn apply_results<'a>(
    ctx: &EngineContext,
    state: &RootState,
    groups: &HashGroups,
    hashes: impl IntoIterator<Item = &'a String>,
    results: &HashMap<String, TranslationUnit>,
    target_language: &str,
) -> ApplyOutcome {
    let doc = ctx.document.as_ref();
    let language_moved = !ctx.current_language().eq_ignore_ascii_case(target_language);
    let mut outcome = ApplyOutcome::default();
    let mut table = state.bindings.lock();

    for hash in hashes {
        let Some((_, keys)) = groups.get(hash) else {
            continue;
        };
        for key in keys {
            let Some(binding) = table.get_mut(key) else {
                continue;
            };
            // rebound by a later pass
            if binding.hash() != Some(hash.as_str()) {
                continue;
            }

            if language_moved {
                binding.revert();
                outcome.stale += 1;
                continue;
            }

            match results.get(hash) {
                Some(unit) => {
                    let rendered = binding.complete(&unit.text);
                    binding.write(doc, &rendered);
                    outcome.translated += 1;
                }
                None => {
                    let original = binding.revert();
                    binding.write(doc, &original);
                    outcome.unresolved += 1;
                }
            }
        }
    }

    outcome
}

/// Run one translation pass over `state`'s root
pub async fn translate_page(ctx: &EngineContext, state: &RootState, mode: FilterMode) -> PassReport {
    let doc = ctx.document.as_ref();
    let target = ctx.current_language();
    let mut report = PassReport::default();

    if target.is_empty() || !is_connected(doc, state.root) {
        return state.finish_pass(report);
    }

    if state.is_origin(&target) {
        report.restored = state.restore_originals(doc);
        *state.rendered_language.lock() = Some(target.clone());
        if report.restored > 0 {
            info!("Restored {} original texts under {} for '{}'", report.restored, state.root, target);
        }
        return state.finish_pass(report);
    }

    // translated content still shows another language
    let mode = match state.rendered_language() {
        Some(rendered) if mode == FilterMode::Normal && !primary_subtags_match(&rendered, &target) => {
            debug!("Content under {} is still in '{}', reloading", state.root, rendered);
            FilterMode::ForceReload
        }
        _ => mode,
    };

    let groups: HashGroups = {
        let mut table = state.bindings.lock();
        report.pruned = table.retain_connected(doc);

        let scanner = ContentScanner::new(doc, &ctx.filter);
        let mut keys = scanner.scan_text(state.root, mode, &target, &mut table);
        for attribute in &ctx.settings.translatable_attributes {
            keys.extend(scanner.scan_attribute(state.root, attribute, mode, &target, &mut table));
        }
        report.scanned = keys.len();

        let mut groups = HashGroups::new();
        for key in keys {
            let Some(binding) = table.get(&key) else {
                continue;
            };
            if let Some(hash) = binding.hash() {
                groups
                    .entry(hash.to_string())
                    .or_insert_with(|| (binding.original_text().to_string(), Vec::new()))
                    .1
                    .push(key);
            }
        }
        groups
    };
    *state.rendered_language.lock() = Some(target.clone());

    if groups.is_empty() {
        return state.finish_pass(report);
    }

    let lookups = join_all(groups.keys().map(|hash| async move {
        let hit = ctx.cache.get(hash).await;
        (hash.clone(), hit)
    }))
    .await;

    let mut hits = HashMap::new();
    let mut misses = Vec::new();
    for (hash, hit) in lookups {
        match hit {
            Some(unit) => {
                hits.insert(hash, unit);
            }
            None => misses.push(hash),
        }
    }

    let applied = apply_results(ctx, state, &groups, hits.keys(), &hits, &target);
    report.cache_hits = applied.translated;
    report.stale += applied.stale;

    let requests: Vec<TranslationRequest> = {
        let mut table = state.bindings.lock();
        misses
            .iter()
            .filter_map(|hash| {
                let (text, keys) = groups.get(hash)?;
                let mut claimed = false;
                for key in keys {
                    if let Some(binding) = table.get_mut(key) {
                        if binding.hash() == Some(hash.as_str()) && binding.mark_translating() {
                            claimed = true;
                        }
                    }
                }
                claimed.then(|| TranslationRequest::new(hash.clone(), text.clone()))
            })
            .collect()
    };
    report.requested = requests.len();

    if !requests.is_empty() {
        let from_language = state.origin_language.clone().unwrap_or_default();
        let scope = ctx.scope(&from_language, &target);
        let results = ctx.client.resolve(&requests, &scope).await;

        let hashes: Vec<&String> = requests.iter().map(|request| &request.hash).collect();
        let applied = apply_results(ctx, state, &groups, hashes, &results, &target);
        report.translated = applied.translated;
        report.unresolved = applied.unresolved;
        report.stale += applied.stale;
    }

    if report.stale > 0 {
        debug!("{} results arrived after a language change, rescanning", report.stale);
        ctx.bus.publish(Notification::ContentChanged);
    }

    debug!(
        "Pass under {} for '{}': {} scanned, {} cached, {} requested, {} translated, {} unresolved",
        state.root,
        target,
        report.scanned,
        report.cache_hits,
        report.requested,
        report.translated,
        report.unresolved
    );
    state.finish_pass(report)
}
