/*!
 * Generic tree-of-nodes document model.
 *
 * The engine never depends on a concrete DOM. Anything that can expose
 * nodes, text, attributes and change notifications through [`Document`]
 * can be translated:
 * - `walker`: filtered pre-order traversal over a live tree
 * - `query`: selectors and ancestor/descendant lookups
 * - `memory`: an in-memory document used by the CLI, tests and benches
 */

use std::fmt;
use std::sync::Arc;

pub mod memory;
pub mod query;
pub mod walker;

pub use memory::MemoryDocument;
pub use query::Selector;
pub use walker::{TreeWalker, WalkFilter};

/// Handle to a node inside a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
}

/// What changed in a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Children were inserted or removed
    ChildList,
    /// A text node's data changed
    CharacterData,
    /// An attribute was set
    Attributes,
}

/// Description of one changed region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
}

/// Which mutations an observer wants to hear about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub character_data: bool,
    pub attributes: bool,
    pub subtree: bool,
}

impl ObserveOptions {
    /// Structural changes anywhere below the root
    pub fn structure() -> Self {
        Self {
            child_list: true,
            character_data: false,
            attributes: false,
            subtree: true,
        }
    }

    pub fn wants(&self, kind: MutationKind) -> bool {
        match kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::CharacterData => self.character_data,
            MutationKind::Attributes => self.attributes,
        }
    }
}

/// Registration handle returned by [`Document::observe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

/// Callback invoked with a batch of mutation records
pub type MutationCallback = Arc<dyn Fn(&[MutationRecord]) + Send + Sync>;

/// Live, mutable tree of nodes
///
/// All methods take `&self`; implementations synchronise internally so a
/// document can be shared between the host page and the engine. Lookups on
/// nodes that do not exist return `None` or an empty list, and writes to
/// them are ignored.
pub trait Document: Send + Sync {
    /// The root element (`<html>`)
    fn document_element(&self) -> NodeId;

    /// The `<body>` element, if present
    fn body(&self) -> Option<NodeId>;

    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Lowercase tag name of an element
    fn tag_name(&self, node: NodeId) -> Option<String>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Data of a text node, or concatenated descendant text of an element
    fn text(&self, node: NodeId) -> Option<String>;

    /// Set a text node's data, or replace an element's children with one text node
    fn set_text(&self, node: NodeId, text: &str);

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn set_attribute(&self, node: NodeId, name: &str, value: &str);

    /// Register a callback for mutations under `root`
    fn observe(&self, root: NodeId, options: ObserveOptions, callback: MutationCallback) -> ObserverId;

    /// Stop delivering mutations to an observer
    fn disconnect(&self, observer: ObserverId);
}
