/*!
 * Mock translation service for testing.
 *
 * This module provides a scripted service that simulates different behaviors:
 * - `MockService::working()` - Always succeeds with a translated text
 * - `MockService::rate_limited()` - Always answers with the usage-limit error
 * - `MockService::failing()` - Always fails with a server error
 * - `MockService::empty()` - Succeeds but never resolves anything
 * - `MockService::slow(ms)` - Like working, after a delay
 *
 * It also simulates the service's shared cache: whatever it translated once
 * is returned by later `translate_all` lookups. Every call is recorded so
 * tests can assert on request counts and batch shapes.
 */

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{Duration, sleep};

use super::TranslationService;
use crate::errors::ServiceError;
use crate::translation::unit::{Language, TranslationUnit};

/// Behavior mode for the mock service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Always answers HTTP 429
    RateLimited,
    /// Always fails with HTTP 500
    Failing,
    /// Succeeds with empty results
    Empty,
    /// Succeeds after a delay
    Slow { delay_ms: u64 },
}

/// Service operation a call was made to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Languages,
    Translate,
    TranslateAll,
    TranslateUntranslated,
}

/// One recorded call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint: Endpoint,
    pub units: Vec<TranslationUnit>,
    pub context: Option<String>,
    pub target: String,
}

#[derive(Default)]
struct MockState {
    behavior: Option<MockBehavior>,
    calls: Vec<RecordedCall>,
    shared_cache: HashMap<String, TranslationUnit>,
}

/// Scripted [`TranslationService`]
///
/// Clones share their state, so a test can keep one handle while the engine
/// owns another.
#[derive(Clone)]
pub struct MockService {
    behavior: MockBehavior,
    dictionary: Arc<HashMap<String, String>>,
    untranslatable: Arc<HashSet<String>>,
    languages: Arc<Vec<Language>>,
    state: Arc<Mutex<MockState>>,
}

impl MockService {
    /// Create a new mock service with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            dictionary: Arc::new(HashMap::new()),
            untranslatable: Arc::new(HashSet::new()),
            languages: Arc::new(vec![
                Language::new("en", "English"),
                Language::new("fr", "Français"),
                Language::new("de", "Deutsch"),
                Language::new("ar", "العربية"),
            ]),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn rate_limited() -> Self {
        Self::new(MockBehavior::RateLimited)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Fixed translations by source text, used for every target language
    pub fn with_dictionary<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.dictionary = Arc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Source texts the service never returns a translation for
    pub fn with_untranslatable<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.untranslatable = Arc::new(texts.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_languages(mut self, languages: Vec<Language>) -> Self {
        self.languages = Arc::new(languages);
        self
    }

    /// Seed the simulated shared cache
    pub fn with_shared_translation(self, unit: TranslationUnit) -> Self {
        self.state.lock().shared_cache.insert(unit.hash.clone(), unit);
        self
    }

    /// Switch behavior for every clone from now on
    pub fn set_behavior(&self, behavior: MockBehavior) {
        self.state.lock().behavior = Some(behavior);
    }

    fn current_behavior(&self) -> MockBehavior {
        self.state.lock().behavior.unwrap_or(self.behavior)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    pub fn calls_to(&self, endpoint: Endpoint) -> Vec<RecordedCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .count()
    }

    /// Number of calls that could have reached the network for translations
    pub fn translation_request_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.endpoint != Endpoint::Languages)
            .count()
    }

    /// Unit lists of every untranslated call, in call order
    pub fn untranslated_batches(&self) -> Vec<Vec<TranslationUnit>> {
        self.calls_to(Endpoint::TranslateUntranslated)
            .into_iter()
            .map(|call| call.units)
            .collect()
    }

    /// Source texts sent for fresh translation, in call order
    pub fn translated_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call.endpoint, Endpoint::Translate | Endpoint::TranslateUntranslated))
            .flat_map(|call| call.units.into_iter().map(|unit| unit.text))
            .collect()
    }

    pub fn reset_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn record(&self, endpoint: Endpoint, units: &[TranslationUnit], context: Option<&str>, target: &str) {
        self.state.lock().calls.push(RecordedCall {
            endpoint,
            units: units.to_vec(),
            context: context.map(str::to_string),
            target: target.to_string(),
        });
    }

    /// Apply the configured behavior; `Ok(false)` means "answer with nothing"
    async fn gate(&self, target: &str) -> Result<bool, ServiceError> {
        match self.current_behavior() {
            MockBehavior::Working => Ok(true),
            MockBehavior::Slow { delay_ms } => {
                sleep(Duration::from_millis(delay_ms)).await;
                Ok(true)
            }
            MockBehavior::Empty => Ok(false),
            MockBehavior::RateLimited => Err(ServiceError::RateLimited {
                language: target.to_string(),
            }),
            MockBehavior::Failing => Err(ServiceError::Api {
                status_code: 500,
                message: "Simulated service failure".to_string(),
            }),
        }
    }

    fn render(&self, unit: &TranslationUnit, target: &str) -> Option<TranslationUnit> {
        if self.untranslatable.contains(&unit.text) {
            return None;
        }
        let text = self
            .dictionary
            .get(&unit.text)
            .cloned()
            .unwrap_or_else(|| format!("[{}] {}", target, unit.text));

        Some(TranslationUnit {
            hash: unit.hash.clone(),
            domain: unit.domain.clone(),
            path: unit.path.clone(),
            language_id: target.to_string(),
            text,
        })
    }

    fn translate_and_share(&self, units: &[TranslationUnit], target: &str) -> Vec<TranslationUnit> {
        let translated: Vec<TranslationUnit> = units.iter().filter_map(|unit| self.render(unit, target)).collect();
        let mut state = self.state.lock();
        for unit in &translated {
            state.shared_cache.insert(unit.hash.clone(), unit.clone());
        }
        translated
    }
}

#[async_trait]
impl TranslationService for MockService {
    async fn languages(&self) -> Result<Vec<Language>, ServiceError> {
        self.record(Endpoint::Languages, &[], None, "");
        if !self.gate("").await? {
            return Ok(Vec::new());
        }
        Ok(self.languages.as_ref().clone())
    }

    async fn translate(
        &self,
        unit: &TranslationUnit,
        target: &str,
    ) -> Result<Option<TranslationUnit>, ServiceError> {
        self.record(Endpoint::Translate, std::slice::from_ref(unit), None, target);
        if !self.gate(target).await? {
            return Ok(None);
        }
        Ok(self.translate_and_share(std::slice::from_ref(unit), target).pop())
    }

    async fn translate_all(
        &self,
        units: &[TranslationUnit],
        target: &str,
    ) -> Result<Vec<TranslationUnit>, ServiceError> {
        self.record(Endpoint::TranslateAll, units, None, target);
        if !self.gate(target).await? {
            return Ok(Vec::new());
        }
        let state = self.state.lock();
        Ok(units
            .iter()
            .filter_map(|unit| state.shared_cache.get(&unit.hash).cloned())
            .collect())
    }

    async fn translate_untranslated(
        &self,
        units: &[TranslationUnit],
        context: Option<&str>,
        target: &str,
    ) -> Result<Vec<TranslationUnit>, ServiceError> {
        self.record(Endpoint::TranslateUntranslated, units, context, target);
        if !self.gate(target).await? {
            return Ok(Vec::new());
        }
        Ok(self.translate_and_share(units, target))
    }
}
