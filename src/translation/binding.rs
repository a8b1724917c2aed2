/*!
 * Per-candidate translation state.
 *
 * A [`NodeBinding`] wraps one text node or one (element, attribute) pair.
 * It captures the original text exactly once, remembers whether whitespace
 * was trimmed on either side, and walks the lifecycle
 * `untouched -> pending -> translating -> translated`, with
 * `translated -> pending` only on a forced reload.
 */

use std::collections::HashMap;

use crate::document::query::is_connected;
use crate::document::{Document, NodeId};

/// Lifecycle state of a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingState {
    Untouched,
    /// Hash computed, cache lookup issued
    Pending,
    /// Request in flight
    Translating,
    Translated,
}

/// What a binding is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingKey {
    Text(NodeId),
    Attribute(NodeId, String),
}

impl BindingKey {
    pub fn node(&self) -> NodeId {
        match self {
            Self::Text(node) | Self::Attribute(node, _) => *node,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeBinding {
    key: BindingKey,
    /// Trimmed original text
    original_text: String,
    /// Original text exactly as first seen
    raw_text: String,
    pre_whitespace: bool,
    post_whitespace: bool,
    hash: Option<String>,
    state: BindingState,
}

impl NodeBinding {
    /// Capture a binding from the value first seen on the node
    pub fn capture(key: BindingKey, raw: &str) -> Self {
        let trimmed = raw.trim();
        Self {
            key,
            pre_whitespace: raw.starts_with(char::is_whitespace),
            post_whitespace: raw.ends_with(char::is_whitespace),
            original_text: trimmed.to_string(),
            raw_text: raw.to_string(),
            hash: None,
            state: BindingState::Untouched,
        }
    }

    pub fn key(&self) -> &BindingKey {
        &self.key
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn pre_whitespace(&self) -> bool {
        self.pre_whitespace
    }

    pub fn post_whitespace(&self) -> bool {
        self.post_whitespace
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn state(&self) -> BindingState {
        self.state
    }

    /// Enter `pending` with the hash for the current target language
    ///
    /// Refused while a request is in flight.
    pub fn begin(&mut self, hash: String) -> bool {
        if self.state == BindingState::Translating {
            return false;
        }
        self.hash = Some(hash);
        self.state = BindingState::Pending;
        true
    }

    /// Cache miss: `pending -> translating`
    pub fn mark_translating(&mut self) -> bool {
        if self.state != BindingState::Pending {
            return false;
        }
        self.state = BindingState::Translating;
        true
    }

    /// A translation arrived; returns the text to render
    pub fn complete(&mut self, translated: &str) -> String {
        self.state = BindingState::Translated;
        self.render(translated)
    }

    /// Nothing came back; returns the original to render
    pub fn revert(&mut self) -> String {
        self.state = BindingState::Pending;
        self.raw_text.clone()
    }

    /// Forget the translation lifecycle, keeping the captured original
    pub fn reset(&mut self) -> String {
        self.state = BindingState::Untouched;
        self.hash = None;
        self.raw_text.clone()
    }

    /// Translated text with the original's outer whitespace restored
    pub fn render(&self, translated: &str) -> String {
        let mut out = String::with_capacity(translated.len() + 2);
        if self.pre_whitespace {
            out.push(' ');
        }
        out.push_str(translated.trim());
        if self.post_whitespace {
            out.push(' ');
        }
        out
    }

    /// Write a rendered value back to the bound node
    pub fn write(&self, doc: &dyn Document, value: &str) {
        match &self.key {
            BindingKey::Text(node) => doc.set_text(*node, value),
            BindingKey::Attribute(node, name) => doc.set_attribute(*node, name, value),
        }
    }
}

/// Bindings owned by one observed root
#[derive(Debug, Default)]
pub struct BindingTable {
    bindings: HashMap<BindingKey, NodeBinding>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &BindingKey) -> Option<&NodeBinding> {
        self.bindings.get(key)
    }

    pub fn get_mut(&mut self, key: &BindingKey) -> Option<&mut NodeBinding> {
        self.bindings.get_mut(key)
    }

    pub fn state(&self, key: &BindingKey) -> Option<BindingState> {
        self.bindings.get(key).map(NodeBinding::state)
    }

    /// Existing binding, or a fresh one capturing `raw` when first seen
    pub fn capture(&mut self, key: BindingKey, raw: &str) -> &mut NodeBinding {
        self.bindings
            .entry(key.clone())
            .or_insert_with(|| NodeBinding::capture(key, raw))
    }

    /// Drop bindings whose node left the document; returns how many
    pub fn retain_connected(&mut self, doc: &dyn Document) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|key, _| is_connected(doc, key.node()));
        before - self.bindings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeBinding> {
        self.bindings.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut NodeBinding> {
        self.bindings.values_mut()
    }

    pub fn count_in(&self, state: BindingState) -> usize {
        self.bindings.values().filter(|b| b.state == state).count()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
