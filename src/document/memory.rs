/*!
 * In-memory document.
 *
 * Nodes live in an arena behind a `parking_lot::RwLock`; a removed node
 * keeps its slot but loses its parent, so handles held by bindings stay
 * valid and simply report themselves as detached. Observers are called
 * after the node lock is released so a callback may read the document.
 */

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use super::{
    Document, MutationCallback, MutationKind, MutationRecord, NodeId, NodeKind, ObserveOptions,
    ObserverId,
};

/// Elements serialized without a closing tag
const VOID_ELEMENTS: [&str; 6] = ["br", "hr", "img", "input", "meta", "link"];

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    tag: String,
    text: String,
    attributes: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn element(tag: &str) -> Self {
        Self {
            kind: NodeKind::Element,
            tag: tag.to_lowercase(),
            text: String::new(),
            attributes: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    fn character_data(kind: NodeKind, text: &str) -> Self {
        Self {
            kind,
            tag: String::new(),
            text: text.to_string(),
            attributes: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

struct Observer {
    id: ObserverId,
    root: NodeId,
    options: ObserveOptions,
    callback: MutationCallback,
}

/// Arena-backed [`Document`] starting out as `<html><head></head><body></body></html>`
pub struct MemoryDocument {
    nodes: RwLock<Vec<NodeData>>,
    observers: Mutex<Vec<Observer>>,
    next_observer: AtomicU64,
    root: NodeId,
    head: NodeId,
    body: NodeId,
}

impl MemoryDocument {
    pub fn new() -> Self {
        let mut nodes = vec![NodeData::element("html"), NodeData::element("head"), NodeData::element("body")];
        let (root, head, body) = (NodeId(0), NodeId(1), NodeId(2));
        nodes[0].children = vec![head, body];
        nodes[1].parent = Some(root);
        nodes[2].parent = Some(root);

        Self {
            nodes: RwLock::new(nodes),
            observers: Mutex::new(Vec::new()),
            next_observer: AtomicU64::new(1),
            root,
            head,
            body,
        }
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    /// Create a detached element
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.push(NodeData::element(tag))
    }

    /// Create a detached text node
    pub fn create_text(&self, text: &str) -> NodeId {
        self.push(NodeData::character_data(NodeKind::Text, text))
    }

    pub fn create_comment(&self, text: &str) -> NodeId {
        self.push(NodeData::character_data(NodeKind::Comment, text))
    }

    /// Move `child` to the end of `parent`'s children
    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        let mut records = Vec::new();
        {
            let mut nodes = self.nodes.write();
            if parent.0 >= nodes.len() || child.0 >= nodes.len() || parent == child {
                return;
            }
            if nodes[parent.0].kind != NodeKind::Element || Self::is_ancestor(&nodes, child, parent) {
                return;
            }
            if let Some(old_parent) = nodes[child.0].parent.take() {
                nodes[old_parent.0].children.retain(|c| *c != child);
                records.push(MutationRecord {
                    kind: MutationKind::ChildList,
                    target: old_parent,
                });
            }
            nodes[child.0].parent = Some(parent);
            nodes[parent.0].children.push(child);
            records.push(MutationRecord {
                kind: MutationKind::ChildList,
                target: parent,
            });
        }
        self.notify(&records);
    }

    /// Detach `child` from `parent`; the node and its subtree stay addressable
    pub fn remove_child(&self, parent: NodeId, child: NodeId) {
        {
            let mut nodes = self.nodes.write();
            if child.0 >= nodes.len() || nodes[child.0].parent != Some(parent) {
                return;
            }
            nodes[child.0].parent = None;
            nodes[parent.0].children.retain(|c| *c != child);
        }
        self.notify(&[MutationRecord {
            kind: MutationKind::ChildList,
            target: parent,
        }]);
    }

    /// Create an element and append it to `parent`
    pub fn append_element(&self, parent: NodeId, tag: &str) -> NodeId {
        let node = self.create_element(tag);
        self.append_child(parent, node);
        node
    }

    /// Create a text node and append it to `parent`
    pub fn append_text(&self, parent: NodeId, text: &str) -> NodeId {
        let node = self.create_text(text);
        self.append_child(parent, node);
        node
    }

    /// Serialize a node and its subtree as markup
    pub fn outer_html(&self, node: NodeId) -> String {
        let nodes = self.nodes.read();
        let mut out = String::new();
        Self::serialize(&nodes, node, &mut out);
        out
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    fn push(&self, data: NodeData) -> NodeId {
        let mut nodes = self.nodes.write();
        nodes.push(data);
        NodeId(nodes.len() - 1)
    }

    fn is_ancestor(nodes: &[NodeData], ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = nodes.get(candidate.0).and_then(|n| n.parent);
        }
        false
    }

    fn serialize(nodes: &[NodeData], node: NodeId, out: &mut String) {
        let Some(data) = nodes.get(node.0) else {
            return;
        };
        match data.kind {
            NodeKind::Text => out.push_str(&escape(&data.text)),
            NodeKind::Comment => {
                out.push_str("<!--");
                out.push_str(&data.text);
                out.push_str("-->");
            }
            NodeKind::Element => {
                out.push('<');
                out.push_str(&data.tag);
                for (name, value) in &data.attributes {
                    out.push_str(&format!(" {}=\"{}\"", name, escape(value).replace('"', "&quot;")));
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&data.tag.as_str()) {
                    return;
                }
                for child in &data.children {
                    Self::serialize(nodes, *child, out);
                }
                out.push_str("</");
                out.push_str(&data.tag);
                out.push('>');
            }
        }
    }

    fn collect_text(nodes: &[NodeData], node: NodeId, out: &mut String) {
        let Some(data) = nodes.get(node.0) else {
            return;
        };
        match data.kind {
            NodeKind::Text => out.push_str(&data.text),
            NodeKind::Comment => {}
            NodeKind::Element => {
                for child in &data.children {
                    Self::collect_text(nodes, *child, out);
                }
            }
        }
    }

    fn notify(&self, records: &[MutationRecord]) {
        if records.is_empty() {
            return;
        }

        let deliveries: Vec<(MutationCallback, Vec<MutationRecord>)> = {
            let observers = self.observers.lock();
            if observers.is_empty() {
                return;
            }
            let nodes = self.nodes.read();
            observers
                .iter()
                .filter_map(|observer| {
                    let matching: Vec<MutationRecord> = records
                        .iter()
                        .filter(|record| observer.options.wants(record.kind))
                        .filter(|record| {
                            record.target == observer.root
                                || (observer.options.subtree
                                    && Self::is_ancestor(&nodes, observer.root, record.target))
                        })
                        .cloned()
                        .collect();
                    (!matching.is_empty()).then(|| (observer.callback.clone(), matching))
                })
                .collect()
        };

        for (callback, batch) in deliveries {
            callback(&batch);
        }
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

impl Document for MemoryDocument {
    fn document_element(&self) -> NodeId {
        self.root
    }

    fn body(&self) -> Option<NodeId> {
        Some(self.body)
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.read().get(node.0).map(|n| n.kind)
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.nodes
            .read()
            .get(node.0)
            .filter(|n| n.kind == NodeKind::Element)
            .map(|n| n.tag.clone())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.read().get(node.0).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .read()
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn text(&self, node: NodeId) -> Option<String> {
        let nodes = self.nodes.read();
        let data = nodes.get(node.0)?;
        match data.kind {
            NodeKind::Element => {
                let mut out = String::new();
                Self::collect_text(&nodes, node, &mut out);
                Some(out)
            }
            _ => Some(data.text.clone()),
        }
    }

    fn set_text(&self, node: NodeId, text: &str) {
        let record = {
            let mut nodes = self.nodes.write();
            let Some(kind) = nodes.get(node.0).map(|n| n.kind) else {
                return;
            };
            match kind {
                NodeKind::Element => {
                    let old_children = std::mem::take(&mut nodes[node.0].children);
                    for child in old_children {
                        nodes[child.0].parent = None;
                    }
                    let mut replacement = NodeData::character_data(NodeKind::Text, text);
                    replacement.parent = Some(node);
                    nodes.push(replacement);
                    let id = NodeId(nodes.len() - 1);
                    nodes[node.0].children.push(id);
                    MutationRecord {
                        kind: MutationKind::ChildList,
                        target: node,
                    }
                }
                _ => {
                    if nodes[node.0].text == text {
                        return;
                    }
                    nodes[node.0].text = text.to_string();
                    MutationRecord {
                        kind: MutationKind::CharacterData,
                        target: node,
                    }
                }
            }
        };
        self.notify(&[record]);
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let nodes = self.nodes.read();
        nodes
            .get(node.0)?
            .attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        {
            let mut nodes = self.nodes.write();
            let Some(data) = nodes.get_mut(node.0) else {
                return;
            };
            if data.kind != NodeKind::Element {
                return;
            }
            match data.attributes.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
                Some((_, existing)) if existing == value => return,
                Some((_, existing)) => *existing = value.to_string(),
                None => data.attributes.push((name.to_lowercase(), value.to_string())),
            }
        }
        self.notify(&[MutationRecord {
            kind: MutationKind::Attributes,
            target: node,
        }]);
    }

    fn observe(&self, root: NodeId, options: ObserveOptions, callback: MutationCallback) -> ObserverId {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push(Observer {
            id,
            root,
            options,
            callback,
        });
        id
    }

    fn disconnect(&self, observer: ObserverId) {
        self.observers.lock().retain(|o| o.id != observer);
    }
}
