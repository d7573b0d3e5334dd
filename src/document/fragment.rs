//! Parsed document fragments.

use std::fmt;

use crate::tree::{NodeId, Tree};

use super::{DocumentId, UnlinkedNodes};

/// Identifies a fragment bookkept by a [`Document`](super::Document).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FragmentId {
    pub(crate) doc: DocumentId,
    pub(crate) index: usize,
}

impl FragmentId {
    /// The position of the fragment in its document's fragment list.
    #[must_use]
    pub fn index(self) -> usize {
        self.index
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/fragment#{}", self.doc, self.index)
    }
}

/// An ordered group of top-level nodes parsed outside the main tree.
///
/// The nodes live in the owning document's arena but are not attached to
/// it. Until [`remove`](Self::remove) runs, the fragment is responsible for
/// them; afterwards the document's registry is.
#[derive(Debug)]
pub struct DocumentFragment {
    nodes: Vec<NodeId>,
    doc: DocumentId,
    url: String,
}

impl DocumentFragment {
    pub(crate) fn new(nodes: Vec<NodeId>, doc: DocumentId, url: impl Into<String>) -> Self {
        Self {
            nodes,
            doc,
            url: url.into(),
        }
    }

    /// The top-level nodes, in source order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    #[must_use]
    pub fn document_id(&self) -> DocumentId {
        self.doc
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns `true` once the nodes have been handed to a registry.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Hands the nodes the fragment still owns to `registry` in order and
    /// empties the fragment. Returns the number of handles migrated; a
    /// second call migrates none.
    ///
    /// A node that has since been given a parent belongs to that parent,
    /// and a node already in `registry` belongs to the registry; neither is
    /// migrated.
    pub fn remove(&mut self, tree: &Tree, registry: &mut UnlinkedNodes) -> usize {
        let mut migrated = 0;
        for id in self.nodes.drain(..) {
            if tree.parent(id).is_some() || registry.contains(id) {
                tracing::trace!(node = ?id, "fragment node no longer owned, not migrated");
                continue;
            }
            registry.append(id);
            migrated += 1;
        }
        migrated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeKind, Tree};

    #[test]
    fn test_remove_migrates_then_noop() {
        let mut tree = Tree::new();
        let a = tree.create_node(NodeKind::element("a")).unwrap();
        let b = tree.create_node(NodeKind::element("b")).unwrap();
        let mut fragment = DocumentFragment::new(vec![a, b], DocumentId::next(), "mem:");
        let mut registry = UnlinkedNodes::new();

        assert!(!fragment.is_removed());
        assert_eq!(fragment.remove(&tree, &mut registry), 2);
        assert!(fragment.is_removed());
        assert_eq!(registry.iter().collect::<Vec<_>>(), vec![a, b]);

        assert_eq!(fragment.remove(&tree, &mut registry), 0);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_empty_fragment() {
        let tree = Tree::new();
        let mut fragment = DocumentFragment::new(Vec::new(), DocumentId::next(), "");
        let mut registry = UnlinkedNodes::new();
        assert_eq!(fragment.remove(&tree, &mut registry), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_skips_adopted_and_registered_nodes() {
        let mut tree = Tree::new();
        let a = tree.create_node(NodeKind::element("a")).unwrap();
        let b = tree.create_node(NodeKind::element("b")).unwrap();
        let c = tree.create_node(NodeKind::element("c")).unwrap();
        tree.append_child(tree.root(), a).unwrap();
        let mut registry = UnlinkedNodes::new();
        registry.append(b);

        let mut fragment = DocumentFragment::new(vec![a, b, c], DocumentId::next(), "");
        assert_eq!(fragment.remove(&tree, &mut registry), 1);
        assert!(fragment.is_removed());
        assert_eq!(registry.iter().collect::<Vec<_>>(), vec![b, c]);
    }
}
