/*!
 * Content eligibility rules.
 *
 * The filter decides whether a text node or an attribute value may be sent
 * for translation. It never mutates anything; the binding state it looks at
 * is passed in by the caller.
 */

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::binding::BindingState;
use crate::app_config::{DocumentConfig, NoTranslateMarker};
use crate::document::query::{closest, has_token};
use crate::document::{Document, NodeId, NodeKind};

static LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}").expect("letter pattern is valid"));

/// Scan mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Skip anything translated or being translated
    Normal,
    /// Re-translate translated content, still skip content in flight
    ForceReload,
}

impl FilterMode {
    /// Whether a binding in `state` may be picked up again
    pub fn admits(&self, state: Option<BindingState>) -> bool {
        match (self, state) {
            (_, None) => true,
            (_, Some(BindingState::Translating)) => false,
            (Self::Normal, Some(BindingState::Translated)) => false,
            _ => true,
        }
    }
}

/// Whether the text contains at least one letter in any script
pub fn contains_letter(text: &str) -> bool {
    LETTER.is_match(text)
}

/// Eligibility predicate for text nodes and attributes
#[derive(Debug, Clone)]
pub struct ContentFilter {
    /// Elements whose content is never rendered as text (lowercase tag names)
    skip_tags: HashSet<String>,
    /// "Do not translate" markers
    markers: Vec<NoTranslateMarker>,
}

impl ContentFilter {
    pub fn new(skip_tags: &[String], markers: &[NoTranslateMarker]) -> Self {
        Self {
            skip_tags: skip_tags.iter().map(|tag| tag.to_lowercase()).collect(),
            markers: markers.to_vec(),
        }
    }

    pub fn from_config(config: &DocumentConfig) -> Self {
        Self::new(&config.skip_tags, &config.no_translate_markers)
    }

    /// Whether the element itself is a non-renderable container
    pub fn is_skipped_tag(&self, doc: &dyn Document, element: NodeId) -> bool {
        doc.tag_name(element)
            .is_some_and(|tag| self.skip_tags.contains(&tag))
    }

    /// Whether the element itself carries a "do not translate" marker
    pub fn is_marked(&self, doc: &dyn Document, element: NodeId) -> bool {
        self.markers.iter().any(|marker| {
            let Some(actual) = doc.attribute(element, &marker.attribute) else {
                return false;
            };
            if marker.value.is_empty() {
                true
            } else if marker.attribute.eq_ignore_ascii_case("class") {
                has_token(&actual, &marker.value)
            } else {
                actual.trim().eq_ignore_ascii_case(&marker.value)
            }
        })
    }

    /// Whether everything below this element is out of bounds
    pub fn excludes_element(&self, doc: &dyn Document, element: NodeId) -> bool {
        self.is_skipped_tag(doc, element) || self.is_marked(doc, element)
    }

    /// Whether `node` or any ancestor up to the document root is excluded
    pub fn is_excluded(&self, doc: &dyn Document, node: NodeId) -> bool {
        closest(doc, node, |element| self.excludes_element(doc, element)).is_some()
    }

    /// Full check for a text node
    ///
    /// `original` is the captured original text when a binding already
    /// exists; the node's current data is used otherwise.
    pub fn accept_text(
        &self,
        doc: &dyn Document,
        node: NodeId,
        state: Option<BindingState>,
        original: Option<&str>,
        mode: FilterMode,
    ) -> bool {
        if doc.kind(node) != Some(NodeKind::Text) || !mode.admits(state) {
            return false;
        }
        if self.is_excluded(doc, node) {
            return false;
        }
        match original {
            Some(text) => contains_letter(text),
            None => doc.text(node).is_some_and(|text| contains_letter(&text)),
        }
    }

    /// Full check for an attribute value on an element
    pub fn accept_attribute(
        &self,
        doc: &dyn Document,
        element: NodeId,
        value: &str,
        state: Option<BindingState>,
        mode: FilterMode,
    ) -> bool {
        doc.kind(element) == Some(NodeKind::Element)
            && mode.admits(state)
            && !self.is_excluded(doc, element)
            && contains_letter(value)
    }
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::from_config(&DocumentConfig::default())
    }
}
