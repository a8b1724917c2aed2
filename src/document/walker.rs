/*!
 * Filtered pre-order traversal.
 *
 * A [`TreeWalker`] is a one-shot iterator: it fetches children lazily as it
 * goes, so nodes inserted into a part of the tree it has not reached yet are
 * still visited. It is not restartable; create a new walker for a new pass.
 */

use super::{Document, NodeId};

/// Verdict of a walk filter for one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkFilter {
    /// Yield the node and descend into it
    Accept,
    /// Do not yield the node but still descend into it
    Skip,
    /// Do not yield the node nor anything below it
    Reject,
}

/// Pre-order iterator over the descendants of a root, excluding the root
pub struct TreeWalker<'a, F> {
    doc: &'a dyn Document,
    stack: Vec<NodeId>,
    filter: F,
}

impl<'a, F> TreeWalker<'a, F>
where
    F: FnMut(NodeId) -> WalkFilter,
{
    pub fn new(doc: &'a dyn Document, root: NodeId, filter: F) -> Self {
        let mut stack = doc.children(root);
        stack.reverse();
        Self { doc, stack, filter }
    }
}

impl<F> Iterator for TreeWalker<'_, F>
where
    F: FnMut(NodeId) -> WalkFilter,
{
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(node) = self.stack.pop() {
            let verdict = (self.filter)(node);
            if verdict != WalkFilter::Reject {
                let children = self.doc.children(node);
                self.stack.extend(children.into_iter().rev());
            }
            if verdict == WalkFilter::Accept {
                return Some(node);
            }
        }
        None
    }
}

/// Walk every descendant of `root`
pub fn descendants(doc: &dyn Document, root: NodeId) -> TreeWalker<'_, fn(NodeId) -> WalkFilter> {
    TreeWalker::new(doc, root, |_| WalkFilter::Accept)
}
