//! Arena-based node storage with explicit release.
//!
//! A [`Tree`] plays the role libxml2's `xmlDoc` plays for its bindings: it
//! owns every node of one document, including nodes that are no longer
//! attached anywhere. Nodes are referenced by [`NodeId`], a generational
//! handle. Releasing a node with [`Tree::free_node`] bumps its slot's
//! generation, so any handle still pointing at it becomes stale and every
//! lookup through it fails instead of reaching a reused slot.
//!
//! # Architecture
//!
//! All navigation links (parent, first\_child, last\_child, next\_sibling,
//! prev\_sibling) are arena handles. Released slots go on a free list and
//! are reused by later allocations.

mod node;

pub use node::{NodeKind, NodeType};

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::TreeError;

static NEXT_TREE_SERIAL: AtomicU64 = AtomicU64::new(1);

/// A generational handle to a node slot in a [`Tree`].
///
/// The slot index is never zero, so `Option<NodeId>` packs into the same
/// space and the raw form can use 0 for "no node".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: NonZeroU32,
    generation: u32,
}

impl NodeId {
    fn as_index(self) -> usize {
        self.index.get() as usize
    }

    /// Returns the slot generation this handle was issued for.
    #[must_use]
    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Packs this handle into a non-zero `u64` for FFI interop.
    ///
    /// The generation occupies the high 32 bits and the slot index the low
    /// 32 bits. Use 0 to represent "no node".
    #[must_use]
    pub fn into_raw(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index.get())
    }

    /// Unpacks a handle produced by [`into_raw`](Self::into_raw).
    ///
    /// Returns `None` if the slot index part is 0.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_raw(raw: u64) -> Option<Self> {
        let index = NonZeroU32::new(raw as u32)?;
        Some(Self {
            index,
            generation: (raw >> 32) as u32,
        })
    }
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute's qualified name as written.
    pub name: String,
    /// The attribute value with references resolved.
    pub value: String,
}

/// Storage for a single live node.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is and its payload.
    pub kind: NodeKind,
    /// Parent node, if attached.
    pub parent: Option<NodeId>,
    /// First child node.
    pub first_child: Option<NodeId>,
    /// Last child node (for O(1) append).
    pub last_child: Option<NodeId>,
    /// Next sibling.
    pub next_sibling: Option<NodeId>,
    /// Previous sibling.
    pub prev_sibling: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

/// The node arena of one document.
#[derive(Debug)]
pub struct Tree {
    serial: u64,
    /// Index 0 is a permanently empty placeholder.
    slots: Vec<Slot>,
    free_slots: Vec<NonZeroU32>,
    root: NodeId,
    live: usize,
    released: u64,
    node_limit: Option<u32>,
}

impl Tree {
    /// Creates a tree holding only the document node.
    #[must_use]
    pub fn new() -> Self {
        Self::with_node_limit(None)
    }

    /// Creates a tree that refuses to hold more than `limit` live nodes
    /// (the document node included).
    #[must_use]
    pub fn with_node_limit(limit: Option<u32>) -> Self {
        let root = NodeId {
            index: NonZeroU32::MIN,
            generation: 0,
        };
        let mut slots = Vec::with_capacity(64);
        slots.push(Slot {
            generation: 0,
            data: None,
        });
        slots.push(Slot {
            generation: 0,
            data: Some(NodeData::new(NodeKind::Document)),
        });
        Self {
            serial: NEXT_TREE_SERIAL.fetch_add(1, Ordering::Relaxed),
            slots,
            free_slots: Vec::new(),
            root,
            live: 1,
            released: 0,
            node_limit: limit,
        }
    }

    /// Returns the process-unique serial number of this tree.
    #[must_use]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Returns the document node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the first element child of the document node.
    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root)
            .find(|&id| self.node_type(id) == Some(NodeType::Element))
    }

    /// Returns `true` if `id` refers to a node that has not been released.
    #[must_use]
    pub fn is_live(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Returns the node data for `id`, or `None` if the handle is stale.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.slots
            .get(id.as_index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_ref())
    }

    /// Returns the node data for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleHandle`] if the node has been released.
    pub fn node(&self, id: NodeId) -> Result<&NodeData, TreeError> {
        self.get(id).ok_or(TreeError::StaleHandle(id))
    }

    /// Returns the node data for `id` mutably, or `None` if stale.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.slots
            .get_mut(id.as_index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_mut())
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, TreeError> {
        self.get_mut(id).ok_or(TreeError::StaleHandle(id))
    }

    /// Returns the type tag of a live node.
    #[must_use]
    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.get(id).map(|n| n.kind.node_type())
    }

    /// Returns the name of an element or the target of a PI.
    #[must_use]
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.kind {
            NodeKind::Element { name, .. }
            | NodeKind::ProcessingInstruction { target: name, .. }
            | NodeKind::DocumentType { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the content of a text, CDATA or comment node, or PI data.
    #[must_use]
    pub fn node_text(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.kind {
            NodeKind::Text { content }
            | NodeKind::CData { content }
            | NodeKind::Comment { content } => Some(content),
            NodeKind::ProcessingInstruction { data, .. } => data.as_deref(),
            _ => None,
        }
    }

    /// Returns the value of an attribute on an element node.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.get(id)?.kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.value.as_str()),
            _ => None,
        }
    }

    /// Returns the concatenated text and CDATA content of a node and its
    /// descendants.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut buf = String::new();
        if let Some(text) = self.node_text(id) {
            if matches!(
                self.node_type(id),
                Some(NodeType::Text | NodeType::CData)
            ) {
                buf.push_str(text);
            }
            return buf;
        }
        for desc in self.descendants(id) {
            if let Some(NodeKind::Text { content } | NodeKind::CData { content }) =
                self.get(desc).map(|n| &n.kind)
            {
                buf.push_str(content);
            }
        }
        buf
    }

    // --- Navigation ---

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.first_child
    }

    /// Returns the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.last_child
    }

    /// Returns the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.next_sibling
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.prev_sibling
    }

    /// Returns an iterator over the children of a node.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    /// Returns an iterator over a node and its ancestors.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.is_live(id).then_some(id),
        }
    }

    /// Returns a depth-first iterator over the descendants of a node
    /// (the node itself excluded).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root: id,
            next: self.first_child(id),
        }
    }

    /// Returns `true` if `id` is the document node or hangs below it.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.ancestors(id).any(|a| a == self.root)
    }

    // --- Allocation ---

    /// Allocates a new, unattached node.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::CapacityExhausted`] if the node limit is reached
    /// or the slot index space is exhausted.
    pub fn create_node(&mut self, kind: NodeKind) -> Result<NodeId, TreeError> {
        let limit = self.node_limit.unwrap_or(u32::MAX);
        if self.live >= limit as usize {
            return Err(TreeError::CapacityExhausted { limit });
        }

        if let Some(index) = self.free_slots.pop() {
            let slot = &mut self.slots[index.get() as usize];
            slot.data = Some(NodeData::new(kind));
            self.live += 1;
            return Ok(NodeId {
                index,
                generation: slot.generation,
            });
        }

        let index = u32::try_from(self.slots.len())
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or(TreeError::CapacityExhausted { limit })?;
        self.slots.push(Slot {
            generation: 0,
            data: Some(NodeData::new(kind)),
        });
        self.live += 1;
        Ok(NodeId {
            index,
            generation: 0,
        })
    }

    // --- Mutation ---

    /// Appends `child` as the last child of `parent`, detaching it from
    /// its current position first.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleHandle`] if either node has been released,
    /// or [`TreeError::CycleDetected`] if `child` is `parent` or one of its
    /// ancestors.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.node(parent)?;
        self.node(child)?;
        if self.ancestors(parent).any(|a| a == child) {
            return Err(TreeError::CycleDetected(child));
        }
        self.detach(child)?;

        let last = self.node(parent)?.last_child;
        {
            let node = self.node_mut(child)?;
            node.parent = Some(parent);
            node.prev_sibling = last;
        }
        match last {
            Some(last) => self.node_mut(last)?.next_sibling = Some(child),
            None => self.node_mut(parent)?.first_child = Some(child),
        }
        self.node_mut(parent)?.last_child = Some(child);
        Ok(())
    }

    /// Detaches a node from its parent. The node stays allocated.
    ///
    /// Detaching a node that has no parent is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleHandle`] if the node has been released.
    pub fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        let (parent, prev, next) = {
            let node = self.node(id)?;
            let Some(parent) = node.parent else {
                return Ok(());
            };
            (parent, node.prev_sibling, node.next_sibling)
        };

        match prev {
            Some(p) => self.node_mut(p)?.next_sibling = next,
            None => self.node_mut(parent)?.first_child = next,
        }
        match next {
            Some(n) => self.node_mut(n)?.prev_sibling = prev,
            None => self.node_mut(parent)?.last_child = prev,
        }

        let node = self.node_mut(id)?;
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
        Ok(())
    }

    // --- Release ---

    /// Releases a node and its whole subtree, detaching it first.
    ///
    /// Returns the number of slots released. Every handle to a released
    /// node becomes stale.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleHandle`] if the node was already released,
    /// and refuses to release the document node.
    pub fn free_node(&mut self, id: NodeId) -> Result<usize, TreeError> {
        if id == self.root {
            return Err(TreeError::ForeignNode);
        }
        self.detach(id)?;

        let mut doomed = vec![id];
        doomed.extend(self.descendants(id));
        for &victim in &doomed {
            let slot = &mut self.slots[victim.as_index()];
            slot.data = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free_slots.push(victim.index);
        }
        self.live -= doomed.len();
        self.released += doomed.len() as u64;
        Ok(doomed.len())
    }

    /// Returns the number of live nodes, the document node included.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Returns the number of nodes released through [`free_node`](Self::free_node).
    #[must_use]
    pub fn released_count(&self) -> u64 {
        self.released
    }

    /// Releases the whole arena, returning how many nodes were still live.
    pub fn free(self) -> usize {
        self.live
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

// --- Iterators ---

/// Iterator over the children of a node.
pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}

/// Iterator over a node and its ancestors.
pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// Depth-first iterator over the descendants of a node.
pub struct Descendants<'a> {
    tree: &'a Tree,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        if let Some(child) = self.tree.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        let mut cursor = Some(current);
        while let Some(node) = cursor {
            if node == self.root {
                break;
            }
            if let Some(sibling) = self.tree.next_sibling(node) {
                self.next = Some(sibling);
                return Some(current);
            }
            cursor = self.tree.parent(node);
        }

        self.next = None;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(content: &str) -> NodeKind {
        NodeKind::Text {
            content: content.to_string(),
        }
    }

    #[test]
    fn test_new_tree_has_document_node() {
        let tree = Tree::new();
        assert_eq!(tree.node_type(tree.root()), Some(NodeType::Document));
        assert_eq!(tree.live_count(), 1);
        assert_eq!(tree.root_element(), None);
    }

    #[test]
    fn test_create_and_append_element() {
        let mut tree = Tree::new();
        let root = tree.root();
        let elem = tree.create_node(NodeKind::element("div")).unwrap();
        assert!(!tree.is_attached(elem));

        tree.append_child(root, elem).unwrap();
        assert_eq!(tree.first_child(root), Some(elem));
        assert_eq!(tree.last_child(root), Some(elem));
        assert_eq!(tree.parent(elem), Some(root));
        assert_eq!(tree.root_element(), Some(elem));
        assert!(tree.is_attached(elem));
    }

    #[test]
    fn test_children_order() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = tree.create_node(text("A")).unwrap();
        let b = tree.create_node(text("B")).unwrap();
        let c = tree.create_node(text("C")).unwrap();
        tree.append_child(root, a).unwrap();
        tree.append_child(root, b).unwrap();
        tree.append_child(root, c).unwrap();

        let children: Vec<NodeId> = tree.children(root).collect();
        assert_eq!(children, vec![a, b, c]);
        assert_eq!(tree.prev_sibling(c), Some(b));
        assert_eq!(tree.next_sibling(c), None);
    }

    #[test]
    fn test_detach_middle_child() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = tree.create_node(text("A")).unwrap();
        let b = tree.create_node(text("B")).unwrap();
        let c = tree.create_node(text("C")).unwrap();
        tree.append_child(root, a).unwrap();
        tree.append_child(root, b).unwrap();
        tree.append_child(root, c).unwrap();

        tree.detach(b).unwrap();
        let children: Vec<NodeId> = tree.children(root).collect();
        assert_eq!(children, vec![a, c]);
        assert_eq!(tree.parent(b), None);
        assert_eq!(tree.next_sibling(a), Some(c));
        assert_eq!(tree.prev_sibling(c), Some(a));
        assert!(tree.is_live(b));
    }

    #[test]
    fn test_detach_unattached_is_noop() {
        let mut tree = Tree::new();
        let orphan = tree.create_node(text("orphan")).unwrap();
        tree.detach(orphan).unwrap();
        assert_eq!(tree.parent(orphan), None);
    }

    #[test]
    fn test_append_moves_attached_child() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = tree.create_node(NodeKind::element("p")).unwrap();
        let q = tree.create_node(NodeKind::element("q")).unwrap();
        let x = tree.create_node(text("x")).unwrap();
        tree.append_child(root, p).unwrap();
        tree.append_child(p, q).unwrap();
        tree.append_child(p, x).unwrap();

        tree.append_child(q, x).unwrap();
        assert_eq!(tree.children(p).collect::<Vec<_>>(), vec![q]);
        assert_eq!(tree.parent(x), Some(q));
    }

    #[test]
    fn test_append_rejects_cycle() {
        let mut tree = Tree::new();
        let a = tree.create_node(NodeKind::element("a")).unwrap();
        let b = tree.create_node(NodeKind::element("b")).unwrap();
        tree.append_child(a, b).unwrap();
        assert_eq!(tree.append_child(b, a), Err(TreeError::CycleDetected(a)));
        assert_eq!(tree.append_child(a, a), Err(TreeError::CycleDetected(a)));
    }

    #[test]
    fn test_free_node_releases_subtree() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = tree.create_node(NodeKind::element("p")).unwrap();
        let t = tree.create_node(text("hello")).unwrap();
        let b = tree.create_node(NodeKind::element("b")).unwrap();
        let bt = tree.create_node(text("world")).unwrap();
        tree.append_child(root, p).unwrap();
        tree.append_child(p, t).unwrap();
        tree.append_child(p, b).unwrap();
        tree.append_child(b, bt).unwrap();
        assert_eq!(tree.live_count(), 5);

        assert_eq!(tree.free_node(p).unwrap(), 4);
        assert_eq!(tree.live_count(), 1);
        assert_eq!(tree.released_count(), 4);
        assert_eq!(tree.first_child(root), None);
        for id in [p, t, b, bt] {
            assert!(!tree.is_live(id));
        }
    }

    #[test]
    fn test_double_free_is_stale() {
        let mut tree = Tree::new();
        let a = tree.create_node(text("a")).unwrap();
        tree.free_node(a).unwrap();
        assert_eq!(tree.free_node(a), Err(TreeError::StaleHandle(a)));
        assert_eq!(tree.released_count(), 1);
    }

    #[test]
    fn test_reused_slot_does_not_alias_stale_handle() {
        let mut tree = Tree::new();
        let old = tree.create_node(text("old")).unwrap();
        tree.free_node(old).unwrap();
        let new = tree.create_node(text("new")).unwrap();

        assert_ne!(old, new);
        assert_eq!(tree.node_text(old), None);
        assert_eq!(tree.node_text(new), Some("new"));
        assert_eq!(new.generation(), old.generation() + 1);
    }

    #[test]
    fn test_free_document_node_refused() {
        let mut tree = Tree::new();
        let root = tree.root();
        assert_eq!(tree.free_node(root), Err(TreeError::ForeignNode));
    }

    #[test]
    fn test_node_limit() {
        let mut tree = Tree::with_node_limit(Some(2));
        let a = tree.create_node(text("a")).unwrap();
        assert_eq!(
            tree.create_node(text("b")),
            Err(TreeError::CapacityExhausted { limit: 2 })
        );
        tree.free_node(a).unwrap();
        assert!(tree.create_node(text("c")).is_ok());
    }

    #[test]
    fn test_descendants_stop_at_root() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = tree.create_node(NodeKind::element("p")).unwrap();
        let a = tree.create_node(text("a")).unwrap();
        let q = tree.create_node(NodeKind::element("q")).unwrap();
        tree.append_child(root, p).unwrap();
        tree.append_child(p, a).unwrap();
        tree.append_child(root, q).unwrap();

        assert_eq!(tree.descendants(p).collect::<Vec<_>>(), vec![a]);
        assert_eq!(tree.descendants(root).collect::<Vec<_>>(), vec![p, a, q]);
    }

    #[test]
    fn test_text_content() {
        let mut tree = Tree::new();
        let p = tree.create_node(NodeKind::element("p")).unwrap();
        let a = tree.create_node(text("hello ")).unwrap();
        let c = tree
            .create_node(NodeKind::CData {
                content: "world".to_string(),
            })
            .unwrap();
        tree.append_child(p, a).unwrap();
        tree.append_child(p, c).unwrap();
        assert_eq!(tree.text_content(p), "hello world");
        assert_eq!(tree.text_content(a), "hello ");
    }

    #[test]
    fn test_raw_round_trip() {
        let mut tree = Tree::new();
        let a = tree.create_node(text("a")).unwrap();
        tree.free_node(a).unwrap();
        let b = tree.create_node(text("b")).unwrap();
        assert_eq!(NodeId::from_raw(b.into_raw()), Some(b));
        assert_eq!(NodeId::from_raw(0), None);
    }

    #[test]
    fn test_serials_are_unique() {
        assert_ne!(Tree::new().serial(), Tree::new().serial());
    }
}
