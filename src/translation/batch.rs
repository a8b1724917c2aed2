/*!
 * Batch translation processing.
 *
 * The batch client turns a pass's cache misses into as few service calls as
 * possible:
 * 1. requests are deduplicated by hash
 * 2. hashes already in flight elsewhere are awaited, not re-sent
 * 3. the service's shared cache is consulted (`translate/all`)
 * 4. what is still missing goes out in batches of at most
 *    [`MAX_BATCH_SIZE`] units, concurrently
 *
 * Every resolved unit is written to the local cache before it is handed
 * back. Service failures are logged and end up as "nothing resolved".
 */

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::{FutureExt, Shared, join_all};
use futures::stream::{self, StreamExt};
use log::{debug, error, warn};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::cache::TranslationCache;
use super::unit::{TranslationRequest, TranslationUnit};
use crate::app_config::ServiceConfig;
use crate::errors::ServiceError;
use crate::providers::TranslationService;

/// Largest number of units in one outbound untranslated request
pub const MAX_BATCH_SIZE: usize = 25;

type InflightResult = Shared<oneshot::Receiver<Option<TranslationUnit>>>;

/// Batching options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Units per untranslated request, clamped to `1..=MAX_BATCH_SIZE`
    pub batch_size: usize,
    /// Untranslated requests allowed in flight at once
    pub max_concurrent_requests: usize,
    /// Whether to consult the service's shared cache first
    pub shared_cache_lookup: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            max_concurrent_requests: 4,
            shared_cache_lookup: true,
        }
    }
}

impl From<&ServiceConfig> for BatchOptions {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            max_concurrent_requests: config.max_concurrent_requests,
            shared_cache_lookup: config.shared_cache_lookup,
        }
    }
}

/// Where a batch of requests comes from and where it goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestScope {
    pub domain: String,
    pub path: String,
    /// Language the source texts are written in
    pub from_language: String,
    /// Language to translate into
    pub target_language: String,
    /// Surrounding page text sent along with untranslated batches
    pub context: Option<String>,
}

impl RequestScope {
    fn unit_for(&self, request: &TranslationRequest) -> TranslationUnit {
        TranslationUnit {
            hash: request.hash.clone(),
            domain: self.domain.clone(),
            path: self.path.clone(),
            language_id: self.from_language.clone(),
            text: request.text.clone(),
        }
    }
}

/// Request counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Calls made to the service
    pub requests_sent: usize,
    /// Calls rejected with the usage-limit condition
    pub rate_limited: usize,
    /// Calls that failed for any other reason
    pub failures: usize,
    /// Requests satisfied by waiting on another caller's call
    pub coalesced: usize,
}

/// Collapse requests sharing a hash, keeping the first occurrence
pub fn dedup_by_hash(requests: &[TranslationRequest]) -> Vec<TranslationRequest> {
    let mut seen = HashSet::new();
    requests
        .iter()
        .filter(|request| seen.insert(request.hash.clone()))
        .cloned()
        .collect()
}

/// Log a contained service failure
pub fn report_failure(error: &ServiceError, target_language: &str) {
    if error.is_rate_limit() {
        warn!(
            "Tried to translate the site into {}, but the site has reached its translation limit",
            target_language
        );
    } else {
        match error.status_code() {
            Some(code) => error!("Unable to translate part of the site: error code {}", code),
            None => error!("Unable to translate part of the site: {}", error),
        }
    }
}

/// Removes claimed hashes from the in-flight map however the owner exits
struct InflightGuard<'a> {
    inflight: &'a Mutex<HashMap<String, InflightResult>>,
    hashes: Vec<String>,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock();
        for hash in &self.hashes {
            inflight.remove(hash);
        }
    }
}

/// Deduplicating, batching front-end to a [`TranslationService`]
pub struct BatchClient {
    service: Arc<dyn TranslationService>,
    cache: Arc<TranslationCache>,
    options: BatchOptions,
    inflight: Mutex<HashMap<String, InflightResult>>,
    requests_sent: AtomicUsize,
    rate_limited: AtomicUsize,
    failures: AtomicUsize,
    coalesced: AtomicUsize,
}

impl BatchClient {
    pub fn new(
        service: Arc<dyn TranslationService>,
        cache: Arc<TranslationCache>,
        options: BatchOptions,
    ) -> Self {
        let options = BatchOptions {
            batch_size: options.batch_size.clamp(1, MAX_BATCH_SIZE),
            max_concurrent_requests: options.max_concurrent_requests.max(1),
            ..options
        };

        Self {
            service,
            cache,
            options,
            inflight: Mutex::new(HashMap::new()),
            requests_sent: AtomicUsize::new(0),
            rate_limited: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            coalesced: AtomicUsize::new(0),
        }
    }

    pub fn options(&self) -> BatchOptions {
        self.options
    }

    pub fn service(&self) -> &Arc<dyn TranslationService> {
        &self.service
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
        }
    }

    /// Number of hashes currently being fetched
    pub fn inflight_count(&self) -> usize {
        self.inflight.lock().len()
    }

    /// Split requests into those this caller must fetch and those already in flight
    #[allow(clippy::type_complexity)]
    fn claim(
        &self,
        requests: Vec<TranslationRequest>,
    ) -> (
        Vec<(TranslationRequest, oneshot::Sender<Option<TranslationUnit>>)>,
        Vec<(String, InflightResult)>,
    ) {
        let mut owned = Vec::new();
        let mut waiting = Vec::new();
        let mut inflight = self.inflight.lock();

        for request in requests {
            match inflight.get(&request.hash) {
                Some(pending) => waiting.push((request.hash.clone(), pending.clone())),
                None => {
                    let (tx, rx) = oneshot::channel();
                    inflight.insert(request.hash.clone(), rx.shared());
                    owned.push((request, tx));
                }
            }
        }

        (owned, waiting)
    }

    fn record_failure(&self, error: &ServiceError, target_language: &str) {
        if error.is_rate_limit() {
            self.rate_limited.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        report_failure(error, target_language);
    }

    /// Keep only non-empty units that answer one of `requested`
    fn accept(
        &self,
        units: Vec<TranslationUnit>,
        requested: &HashSet<&str>,
        scope: &RequestScope,
    ) -> Vec<TranslationUnit> {
        units
            .into_iter()
            .filter(|unit| requested.contains(unit.hash.as_str()) && !unit.text.trim().is_empty())
            .map(|mut unit| {
                unit.language_id = scope.target_language.clone();
                unit
            })
            .collect()
    }

    /// Resolve as many requests as possible; unresolved hashes are absent from the result
    pub async fn resolve(
        &self,
        requests: &[TranslationRequest],
        scope: &RequestScope,
    ) -> HashMap<String, TranslationUnit> {
        let unique = dedup_by_hash(requests);
        if unique.is_empty() {
            return HashMap::new();
        }

        let (owned, waiting) = self.claim(unique);
        let _guard = InflightGuard {
            inflight: &self.inflight,
            hashes: owned.iter().map(|(request, _)| request.hash.clone()).collect(),
        };
        if !waiting.is_empty() {
            debug!("{} requests already in flight, waiting on them", waiting.len());
            self.coalesced.fetch_add(waiting.len(), Ordering::Relaxed);
        }

        let own_requests: Vec<TranslationRequest> =
            owned.iter().map(|(request, _)| request.clone()).collect();
        let mut resolved = self.fetch(&own_requests, scope).await;

        for (request, tx) in owned {
            let _ = tx.send(resolved.get(&request.hash).cloned());
        }

        let waited = join_all(waiting.into_iter().map(|(hash, pending)| async move {
            (hash, pending.await.ok().flatten())
        }))
        .await;
        for (hash, unit) in waited {
            if let Some(unit) = unit {
                resolved.insert(hash, unit);
            }
        }

        resolved
    }

    /// Shared-cache lookup, then batched untranslated requests
    async fn fetch(
        &self,
        requests: &[TranslationRequest],
        scope: &RequestScope,
    ) -> HashMap<String, TranslationUnit> {
        let mut resolved = HashMap::new();
        if requests.is_empty() {
            return resolved;
        }

        let units: Vec<TranslationUnit> = requests.iter().map(|r| scope.unit_for(r)).collect();
        let requested: HashSet<&str> = units.iter().map(|u| u.hash.as_str()).collect();

        if self.options.shared_cache_lookup {
            self.requests_sent.fetch_add(1, Ordering::Relaxed);
            match self.service.translate_all(&units, &scope.target_language).await {
                Ok(found) => {
                    for unit in self.accept(found, &requested, scope) {
                        self.cache.put(&unit).await;
                        resolved.insert(unit.hash.clone(), unit);
                    }
                    debug!(
                        "Shared cache resolved {} of {} units",
                        resolved.len(),
                        units.len()
                    );
                }
                Err(e) => self.record_failure(&e, &scope.target_language),
            }
        }

        let remaining: Vec<TranslationUnit> = units
            .iter()
            .filter(|unit| !resolved.contains_key(&unit.hash))
            .cloned()
            .collect();
        if remaining.is_empty() {
            return resolved;
        }

        let batches: Vec<Vec<TranslationUnit>> = remaining
            .chunks(self.options.batch_size)
            .map(<[_]>::to_vec)
            .collect();
        debug!(
            "Sending {} untranslated units in {} batches",
            remaining.len(),
            batches.len()
        );

        let context = scope.context.as_deref();
        let target = scope.target_language.as_str();
        let results = stream::iter(batches)
            .map(|batch: Vec<TranslationUnit>| async move {
                self.requests_sent.fetch_add(1, Ordering::Relaxed);
                self.service.translate_untranslated(&batch, context, target).await
            })
            .buffer_unordered(self.options.max_concurrent_requests)
            .collect::<Vec<_>>()
            .await;

        for result in results {
            match result {
                Ok(units) => {
                    for unit in self.accept(units, &requested, scope) {
                        self.cache.put(&unit).await;
                        resolved.insert(unit.hash.clone(), unit);
                    }
                }
                Err(e) => self.record_failure(&e, &scope.target_language),
            }
        }

        resolved
    }

    /// Translate a single request through the single-unit endpoint
    pub async fn translate_one(
        &self,
        request: &TranslationRequest,
        scope: &RequestScope,
    ) -> Option<TranslationUnit> {
        let (owned, waiting) = self.claim(vec![request.clone()]);
        let _guard = InflightGuard {
            inflight: &self.inflight,
            hashes: owned.iter().map(|(request, _)| request.hash.clone()).collect(),
        };

        if let Some((_, pending)) = waiting.into_iter().next() {
            self.coalesced.fetch_add(1, Ordering::Relaxed);
            return pending.await.ok().flatten();
        }

        let unit = scope.unit_for(request);
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
        let result = match self.service.translate(&unit, &scope.target_language).await {
            Ok(found) => {
                let requested: HashSet<&str> = [unit.hash.as_str()].into_iter().collect();
                self.accept(found.into_iter().collect(), &requested, scope).pop()
            }
            Err(e) => {
                self.record_failure(&e, &scope.target_language);
                None
            }
        };

        if let Some(found) = &result {
            self.cache.put(found).await;
        }
        for (_, tx) in owned {
            let _ = tx.send(result.clone());
        }
        result
    }
}
