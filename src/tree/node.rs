//! Node type definitions.
//!
//! [`NodeKind`] carries the per-type payload of a node stored in the arena;
//! [`NodeType`] is the payload-free tag surfaced on wrappers, numbered like
//! libxml2's `xmlElementType`.

use std::fmt;

use super::Attribute;

/// The kind of an XML node and its associated data.
///
/// Navigation links (parent, children, siblings) are stored in `NodeData`,
/// not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document node, exactly one per [`Tree`](super::Tree).
    Document,

    /// A container for parsed fragment content before it is split into
    /// top-level nodes.
    DocumentFragment,

    /// An element node, e.g. `<div class="x">`. The name may be empty for
    /// elements created programmatically.
    Element {
        /// The element's qualified name as written.
        name: String,
        /// Attributes in document order.
        attributes: Vec<Attribute>,
    },

    /// Character data with references resolved.
    Text {
        /// The text content.
        content: String,
    },

    /// A CDATA section, e.g. `<![CDATA[...]]>`.
    CData {
        /// The CDATA content (no escaping applied).
        content: String,
    },

    /// A comment, without the `<!--` and `-->` delimiters.
    Comment {
        /// The comment text.
        content: String,
    },

    /// A processing instruction, e.g. `<?target data?>`.
    ProcessingInstruction {
        /// The PI target.
        target: String,
        /// The PI data, if any.
        data: Option<String>,
    },

    /// A document type declaration, e.g. `<!DOCTYPE html>`.
    DocumentType {
        /// The root element name declared in the DOCTYPE.
        name: String,
        /// The SYSTEM identifier, if any.
        system_id: Option<String>,
        /// The PUBLIC identifier, if any.
        public_id: Option<String>,
    },
}

impl NodeKind {
    /// Returns the payload-free type tag of this kind.
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Document => NodeType::Document,
            Self::DocumentFragment => NodeType::DocumentFragment,
            Self::Element { .. } => NodeType::Element,
            Self::Text { .. } => NodeType::Text,
            Self::CData { .. } => NodeType::CData,
            Self::Comment { .. } => NodeType::Comment,
            Self::ProcessingInstruction { .. } => NodeType::ProcessingInstruction,
            Self::DocumentType { .. } => NodeType::DocumentType,
        }
    }

    /// Builds an element kind with no attributes.
    #[must_use]
    pub fn element(name: impl Into<String>) -> Self {
        Self::Element {
            name: name.into(),
            attributes: Vec::new(),
        }
    }
}

/// Node type tag, numbered like libxml2's `xmlElementType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum NodeType {
    Element = 1,
    Text = 3,
    CData = 4,
    ProcessingInstruction = 7,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
    DocumentFragment = 11,
}

impl NodeType {
    /// Returns the libxml2 numeric code of this type.
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Returns the type for a libxml2 numeric code.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            1 => Self::Element,
            3 => Self::Text,
            4 => Self::CData,
            7 => Self::ProcessingInstruction,
            8 => Self::Comment,
            9 => Self::Document,
            10 => Self::DocumentType,
            11 => Self::DocumentFragment,
            _ => return None,
        })
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Element => "element",
            Self::Text => "text",
            Self::CData => "cdata",
            Self::ProcessingInstruction => "processing-instruction",
            Self::Comment => "comment",
            Self::Document => "document",
            Self::DocumentType => "document-type",
            Self::DocumentFragment => "fragment",
        };
        f.write_str(name)
    }
}
