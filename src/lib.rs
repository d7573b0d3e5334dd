//! # xmlsteward
//!
//! Arena-backed XML document trees with an explicit node lifecycle.
//!
//! Nodes live in a [`Tree`] owned by a [`Document`] and are surfaced to
//! callers as lightweight, non-owning [`Node`] wrappers. Nodes detached from
//! the tree are parked in the document's unlinked-node registry, parsed
//! snippets are kept as [`DocumentFragment`]s, and [`Document::free`] tears
//! everything down in a fixed order so that every node is released exactly
//! once.
//!
//! ## Quick Start
//!
//! ```
//! use xmlsteward::{Document, ParseOptions};
//!
//! let mut doc = Document::create(b"<a><b/></a>", "utf-8", "", ParseOptions::default(), "utf-8")
//!     .unwrap();
//! assert_eq!(doc.root().name(&doc), Some("a"));
//!
//! let frag = doc.parse_fragment(b"<c/><d/>", "", ParseOptions::default()).unwrap();
//! doc.remove_fragment(frag);
//!
//! let report = doc.free();
//! assert_eq!(report.freed_nodes.len(), 2);
//! ```

pub mod document;
pub mod encoding;
pub mod error;
#[cfg(feature = "ffi")]
pub mod ffi;
pub mod parser;
pub mod tree;
pub mod xpath;

// Re-export primary types at the crate root for convenience.
pub use document::{
    Document, DocumentConfig, DocumentFragment, DocumentId, FragmentId, Node, TeardownReport,
    TeardownStep, UnlinkedNodes,
};
pub use error::{ParseDiagnostic, ParseError, TreeError};
pub use parser::ParseOptions;
pub use tree::{NodeId, NodeKind, NodeType, Tree};
pub use xpath::{XPathContext, XPathError};
