/*!
 * Content discovery inside an observed subtree.
 *
 * Each scan is a fresh traversal. Subtrees under excluded elements are
 * never entered, text nodes are offered to the filter one by one, and every
 * accepted candidate gets its binding captured (once) and moved to
 * `pending` with the hash for the target language.
 */

use log::debug;

use super::binding::{BindingKey, BindingTable};
use super::cache::unit_hash;
use super::filter::{ContentFilter, FilterMode};
use crate::document::query::elements_with_attribute;
use crate::document::{Document, NodeId, NodeKind, TreeWalker, WalkFilter};

pub struct ContentScanner<'a> {
    doc: &'a dyn Document,
    filter: &'a ContentFilter,
}

impl<'a> ContentScanner<'a> {
    pub fn new(doc: &'a dyn Document, filter: &'a ContentFilter) -> Self {
        Self { doc, filter }
    }

    /// Lazy sequence of text nodes below `root` outside excluded regions
    pub fn text_nodes(&self, root: NodeId) -> impl Iterator<Item = NodeId> + 'a {
        let doc = self.doc;
        let filter = self.filter;
        TreeWalker::new(doc, root, move |node| match doc.kind(node) {
            Some(NodeKind::Text) => WalkFilter::Accept,
            Some(NodeKind::Element) if filter.excludes_element(doc, node) => WalkFilter::Reject,
            _ => WalkFilter::Skip,
        })
    }

    /// Capture and mark pending every eligible text node below `root`
    pub fn scan_text(
        &self,
        root: NodeId,
        mode: FilterMode,
        language: &str,
        table: &mut BindingTable,
    ) -> Vec<BindingKey> {
        if self.filter.is_excluded(self.doc, root) {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for node in self.text_nodes(root) {
            let key = BindingKey::Text(node);
            let state = table.state(&key);
            let original = table.get(&key).map(|b| b.original_text().to_string());
            if !self
                .filter
                .accept_text(self.doc, node, state, original.as_deref(), mode)
            {
                continue;
            }

            let raw = self.doc.text(node).unwrap_or_default();
            let binding = table.capture(key.clone(), &raw);
            let hash = unit_hash(binding.original_text(), language);
            if binding.begin(hash) {
                candidates.push(key);
            }
        }

        debug!("Text scan under {} found {} candidates", root, candidates.len());
        candidates
    }

    /// Capture and mark pending every eligible `attribute` value below `root`
    pub fn scan_attribute(
        &self,
        root: NodeId,
        attribute: &str,
        mode: FilterMode,
        language: &str,
        table: &mut BindingTable,
    ) -> Vec<BindingKey> {
        let mut candidates = Vec::new();
        for element in elements_with_attribute(self.doc, root, attribute) {
            let key = BindingKey::Attribute(element, attribute.to_string());
            let state = table.state(&key);
            let value = match table.get(&key) {
                Some(binding) => binding.original_text().to_string(),
                None => self.doc.attribute(element, attribute).unwrap_or_default(),
            };
            if !self
                .filter
                .accept_attribute(self.doc, element, &value, state, mode)
            {
                continue;
            }

            let binding = table.capture(key.clone(), &value);
            let hash = unit_hash(binding.original_text(), language);
            if binding.begin(hash) {
                candidates.push(key);
            }
        }

        if !candidates.is_empty() {
            debug!(
                "Attribute scan for '{}' under {} found {} candidates",
                attribute,
                root,
                candidates.len()
            );
        }
        candidates
    }
}
