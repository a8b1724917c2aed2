/*!
 * Selectors and tree lookups built on top of [`Document`].
 */

use std::str::FromStr;

use super::walker::{TreeWalker, WalkFilter};
use super::{Document, NodeId, NodeKind};
use crate::errors::EngineError;

/// Simple single-compound selector
///
/// Supported forms: `tag`, `#id`, `.class`, `[attr]` and `[attr=value]`
/// (the value may be quoted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Tag(String),
    Id(String),
    Class(String),
    Attribute { name: String, value: Option<String> },
}

impl FromStr for Selector {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || EngineError::InvalidSelector(s.to_string());

        if let Some(id) = s.strip_prefix('#') {
            return (!id.is_empty()).then(|| Self::Id(id.to_string())).ok_or_else(invalid);
        }
        if let Some(class) = s.strip_prefix('.') {
            return (!class.is_empty())
                .then(|| Self::Class(class.to_string()))
                .ok_or_else(invalid);
        }
        if let Some(inner) = s.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            let (name, value) = match inner.split_once('=') {
                Some((name, value)) => {
                    let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                    (name.trim(), Some(value.to_string()))
                }
                None => (inner.trim(), None),
            };
            if name.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::Attribute {
                name: name.to_lowercase(),
                value,
            });
        }
        if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Ok(Self::Tag(s.to_lowercase()));
        }

        Err(invalid())
    }
}

impl Selector {
    pub fn matches(&self, doc: &dyn Document, node: NodeId) -> bool {
        if doc.kind(node) != Some(NodeKind::Element) {
            return false;
        }
        match self {
            Self::Tag(tag) => doc.tag_name(node).as_deref() == Some(tag.as_str()),
            Self::Id(id) => doc.attribute(node, "id").as_deref() == Some(id.as_str()),
            Self::Class(class) => doc
                .attribute(node, "class")
                .is_some_and(|classes| has_token(&classes, class)),
            Self::Attribute { name, value } => match (doc.attribute(node, name), value) {
                (Some(actual), Some(expected)) => &actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            },
        }
    }
}

/// Whether a whitespace-separated token list contains `token`
pub fn has_token(list: &str, token: &str) -> bool {
    list.split_whitespace().any(|t| t == token)
}

/// First element in the document matching the selector, document element included
pub fn query_selector(doc: &dyn Document, selector: &Selector) -> Option<NodeId> {
    let root = doc.document_element();
    if selector.matches(doc, root) {
        return Some(root);
    }
    TreeWalker::new(doc, root, |node| {
        if selector.matches(doc, node) {
            WalkFilter::Accept
        } else {
            WalkFilter::Skip
        }
    })
    .next()
}

/// Every element matching the selector, in document order
pub fn query_selector_all(doc: &dyn Document, selector: &Selector) -> Vec<NodeId> {
    let root = doc.document_element();
    let mut found: Vec<NodeId> = selector.matches(doc, root).then_some(root).into_iter().collect();
    found.extend(TreeWalker::new(doc, root, |node| {
        if selector.matches(doc, node) {
            WalkFilter::Accept
        } else {
            WalkFilter::Skip
        }
    }));
    found
}

/// Every element below `root` carrying the attribute
pub fn elements_with_attribute(doc: &dyn Document, root: NodeId, name: &str) -> Vec<NodeId> {
    TreeWalker::new(doc, root, |node| {
        if doc.kind(node) == Some(NodeKind::Element) && doc.attribute(node, name).is_some() {
            WalkFilter::Accept
        } else {
            WalkFilter::Skip
        }
    })
    .collect()
}

/// Nearest element, starting at `node` itself, that satisfies the predicate
pub fn closest<P>(doc: &dyn Document, node: NodeId, mut predicate: P) -> Option<NodeId>
where
    P: FnMut(NodeId) -> bool,
{
    let mut current = Some(node);
    while let Some(candidate) = current {
        if doc.kind(candidate) == Some(NodeKind::Element) && predicate(candidate) {
            return Some(candidate);
        }
        current = doc.parent(candidate);
    }
    None
}

/// Whether the node is still reachable from the document element
pub fn is_connected(doc: &dyn Document, node: NodeId) -> bool {
    let root = doc.document_element();
    let mut current = Some(node);
    while let Some(candidate) = current {
        if candidate == root {
            return true;
        }
        current = doc.parent(candidate);
    }
    false
}

/// Trimmed text of the `<title>` element, when non-empty
pub fn document_title(doc: &dyn Document) -> Option<String> {
    let title = query_selector(doc, &Selector::Tag("title".to_string()))?;
    let text = doc.text(title)?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
