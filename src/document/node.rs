//! Lightweight node wrappers.

use crate::tree::{NodeId, NodeType};

use super::{Document, DocumentId};

/// A non-owning reference to a node of a [`Document`].
///
/// Wrappers are `Copy` and may alias freely. They never own arena memory:
/// the document decides when a node is released. A wrapper with no handle
/// stands for "no node", as returned by [`Document::root`] on an empty
/// document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Node {
    pub(crate) id: Option<NodeId>,
    pub(crate) node_type: NodeType,
    pub(crate) doc: DocumentId,
}

impl Node {
    /// The arena handle, or `None` for the absent node.
    #[must_use]
    pub fn id(&self) -> Option<NodeId> {
        self.id
    }

    #[must_use]
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// The document this wrapper belongs to.
    #[must_use]
    pub fn document_id(&self) -> DocumentId {
        self.doc
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.id.is_none()
    }

    /// Resolves the handle against `doc`, refusing wrappers of other
    /// documents and released nodes.
    pub(crate) fn live_id(&self, doc: &Document) -> Option<NodeId> {
        let id = self.id?;
        (self.doc == doc.id() && doc.tree().is_live(id)).then_some(id)
    }

    /// The element name, PI target or doctype name.
    #[must_use]
    pub fn name<'d>(&self, doc: &'d Document) -> Option<&'d str> {
        doc.tree().node_name(self.live_id(doc)?)
    }

    /// The concatenated text of this node and its descendants.
    #[must_use]
    pub fn text(&self, doc: &Document) -> Option<String> {
        Some(doc.tree().text_content(self.live_id(doc)?))
    }

    /// The value of the named attribute, for elements.
    #[must_use]
    pub fn attribute<'d>(&self, doc: &'d Document, name: &str) -> Option<&'d str> {
        doc.tree().attribute(self.live_id(doc)?, name)
    }

    /// Returns `true` if the node is attached below the document node.
    #[must_use]
    pub fn is_attached(&self, doc: &Document) -> bool {
        self.live_id(doc)
            .is_some_and(|id| doc.tree().is_attached(id))
    }
}
