//! Documents and their node lifecycle.
//!
//! A [`Document`] exclusively owns one [`Tree`] plus the bookkeeping that
//! makes releasing it safe however much it was mutated:
//!
//! - the [`UnlinkedNodes`] registry of handles detached from the tree;
//! - the list of [`DocumentFragment`]s parsed into the document's arena;
//! - the [`XPathContext`] bound to the tree.
//!
//! [`Document::free`] consumes the document and releases everything in a
//! fixed order: fragments are removed (their nodes migrate to the
//! registry), registered nodes are freed, the `XPath` context is freed, and
//! the tree is freed last. Dropping a document without calling `free`
//! releases the arena in bulk.
//!
//! # Examples
//!
//! ```
//! use xmlsteward::{Document, ParseOptions, TeardownStep};
//!
//! let mut doc = Document::create(b"<a><b/></a>", "", "", ParseOptions::default(), "").unwrap();
//! let b = doc.search(&doc.root(), "b").unwrap()[0];
//! doc.unlink(&b).unwrap();
//!
//! let report = doc.free();
//! assert_eq!(report.freed_nodes, vec![b.id().unwrap()]);
//! assert_eq!(report.steps.last(), Some(&TeardownStep::FreeTree));
//! ```

mod fragment;
mod node;
mod registry;

pub use fragment::{DocumentFragment, FragmentId};
pub use node::Node;
pub use registry::UnlinkedNodes;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::encoding::{self, DEFAULT_ENCODING};
use crate::error::{ErrorSeverity, ParseDiagnostic, ParseError, TreeError};
use crate::parser::{self, ParseOptions};
use crate::tree::{NodeId, NodeKind, NodeType, Tree};
use crate::xpath::{XPathContext, XPathError};

const INITIAL_FRAGMENT_CAPACITY: usize = 2;

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    pub(crate) fn next() -> Self {
        Self(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// Settings for [`Document::parse`].
///
/// ```
/// use xmlsteward::{DocumentConfig, ParseOptions};
///
/// let config = DocumentConfig::default()
///     .input_encoding("iso-8859-1")
///     .url("file:///tmp/a.xml")
///     .options(ParseOptions::NONE)
///     .node_limit(10_000);
/// assert_eq!(config.input_encoding, "iso-8859-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentConfig {
    /// Label of the encoding of the input bytes.
    pub input_encoding: String,
    /// Label of the encoding used when the document is written back out.
    pub output_encoding: String,
    /// Source URL, kept for diagnostics.
    pub url: String,
    pub options: ParseOptions,
    /// Maximum number of live nodes in the arena, document node included.
    pub node_limit: Option<u32>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            input_encoding: DEFAULT_ENCODING.to_string(),
            output_encoding: DEFAULT_ENCODING.to_string(),
            url: String::new(),
            options: ParseOptions::default(),
            node_limit: None,
        }
    }
}

impl DocumentConfig {
    /// Sets the input encoding label; empty means UTF-8.
    #[must_use]
    pub fn input_encoding(mut self, label: impl Into<String>) -> Self {
        self.input_encoding = label.into();
        self
    }

    /// Sets the output encoding label; empty means UTF-8.
    #[must_use]
    pub fn output_encoding(mut self, label: impl Into<String>) -> Self {
        self.output_encoding = label.into();
        self
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    #[must_use]
    pub fn options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn node_limit(mut self, limit: u32) -> Self {
        self.node_limit = Some(limit);
        self
    }
}

/// A step of [`Document::free`], in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    RemoveFragments,
    FreeUnlinked,
    FreeXPathContext,
    FreeTree,
}

/// What [`Document::free`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Steps in the order they ran.
    pub steps: Vec<TeardownStep>,
    /// Number of fragments bookkept at teardown.
    pub fragments_removed: usize,
    /// Handles moved from fragments into the registry during step one.
    pub migrated: usize,
    /// Registered handles that were freed, in registry order.
    pub freed_nodes: Vec<NodeId>,
    /// Registered handles that were already released (typically because an
    /// ancestor was freed first) and were skipped.
    pub stale_skipped: Vec<NodeId>,
    /// Nodes still live in the tree when it was freed, document node
    /// included.
    pub tree_nodes_released: usize,
}

/// An XML document: the tree plus its lifecycle bookkeeping.
#[derive(Debug)]
pub struct Document {
    id: DocumentId,
    tree: Tree,
    input_encoding: String,
    output_encoding: String,
    doc_type: NodeType,
    input_len: usize,
    url: String,
    diagnostics: Vec<ParseDiagnostic>,
    unlinked: UnlinkedNodes,
    fragments: Vec<DocumentFragment>,
    xpath: XPathContext,
}

impl Document {
    fn from_tree(tree: Tree, config: &DocumentConfig, input_len: usize) -> Self {
        let xpath = XPathContext::new(&tree);
        Self {
            id: DocumentId::next(),
            tree,
            input_encoding: encoding::label_or_default(&config.input_encoding).to_string(),
            output_encoding: encoding::label_or_default(&config.output_encoding).to_string(),
            doc_type: NodeType::Document,
            input_len,
            url: config.url.clone(),
            diagnostics: Vec::new(),
            unlinked: UnlinkedNodes::new(),
            fragments: Vec::with_capacity(INITIAL_FRAGMENT_CAPACITY),
            xpath,
        }
    }

    /// Creates a document from raw bytes.
    ///
    /// Empty `content` yields an empty document and never fails. Empty
    /// encoding labels mean UTF-8.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the input encoding is unknown, or if the
    /// content is malformed and `options` lacks
    /// [`ParseOptions::RECOVER`].
    pub fn create(
        content: &[u8],
        input_encoding: &str,
        url: &str,
        options: ParseOptions,
        output_encoding: &str,
    ) -> Result<Self, ParseError> {
        let config = DocumentConfig::default()
            .input_encoding(input_encoding)
            .output_encoding(output_encoding)
            .url(url)
            .options(options);
        Self::parse(content, &config)
    }

    /// Creates a document with no content.
    #[must_use]
    pub fn create_empty(input_encoding: &str, output_encoding: &str) -> Self {
        let config = DocumentConfig::default()
            .input_encoding(input_encoding)
            .output_encoding(output_encoding);
        let doc = Self::from_tree(Tree::new(), &config, 0);
        debug!(doc = %doc.id, "created empty document");
        doc
    }

    /// Creates a document from raw bytes using `config`.
    ///
    /// # Errors
    ///
    /// See [`create`](Self::create). Also fails if the content needs more
    /// nodes than `config.node_limit` allows.
    pub fn parse(content: &[u8], config: &DocumentConfig) -> Result<Self, ParseError> {
        if content.is_empty() {
            let doc = Self::from_tree(Tree::with_node_limit(config.node_limit), config, 0);
            debug!(doc = %doc.id, url = %doc.url, "created empty document");
            return Ok(doc);
        }

        let (text, decode_diagnostic) = decode(content, &config.input_encoding, config.options)?;
        let parsed = parser::parse_document(&text, config.options, config.node_limit)?;

        let mut doc = Self::from_tree(parsed.tree, config, content.len());
        doc.diagnostics.extend(decode_diagnostic);
        doc.diagnostics.extend(parsed.diagnostics);
        debug!(
            doc = %doc.id,
            url = %doc.url,
            bytes = content.len(),
            nodes = doc.tree.live_count(),
            diagnostics = doc.diagnostics.len(),
            "parsed document"
        );
        Ok(doc)
    }

    // --- Introspection ---

    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// The node type of the document itself.
    #[must_use]
    pub fn doc_type(&self) -> NodeType {
        self.doc_type
    }

    #[must_use]
    pub fn input_encoding(&self) -> &str {
        &self.input_encoding
    }

    #[must_use]
    pub fn output_encoding(&self) -> &str {
        &self.output_encoding
    }

    /// Length in bytes of the content the document was created from.
    #[must_use]
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Warnings and recovered errors from every parse into this document.
    #[must_use]
    pub fn diagnostics(&self) -> &[ParseDiagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn unlinked_nodes(&self) -> &UnlinkedNodes {
        &self.unlinked
    }

    /// Bookkept fragments, in creation order.
    #[must_use]
    pub fn fragments(&self) -> &[DocumentFragment] {
        &self.fragments
    }

    #[must_use]
    pub fn fragment(&self, id: FragmentId) -> Option<&DocumentFragment> {
        if id.doc != self.id {
            return None;
        }
        self.fragments.get(id.index)
    }

    #[must_use]
    pub fn xpath_context(&self) -> &XPathContext {
        &self.xpath
    }

    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Wraps a handle of this document's tree, or `None` if the handle is
    /// unknown or released.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<Node> {
        let node_type = self.tree.node_type(id)?;
        Some(self.wrap(id, node_type))
    }

    fn wrap(&self, id: NodeId, node_type: NodeType) -> Node {
        Node {
            id: Some(id),
            node_type,
            doc: self.id,
        }
    }

    /// The root element, or an absent node if the document has none.
    #[must_use]
    pub fn root(&self) -> Node {
        match self.tree.root_element() {
            Some(id) => self.wrap(id, NodeType::Element),
            None => Node {
                id: None,
                node_type: NodeType::Element,
                doc: self.id,
            },
        }
    }

    // --- Node creation ---

    /// Creates an unattached element. An empty tag is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::CapacityExhausted`] if the node limit is
    /// reached.
    pub fn create_element(&mut self, tag: &str) -> Result<Node, TreeError> {
        let id = self.tree.create_node(NodeKind::element(tag))?;
        Ok(self.wrap(id, NodeType::Element))
    }

    /// Creates an unattached CDATA section, or `None` if the node limit is
    /// reached.
    pub fn create_cdata(&mut self, text: &str) -> Option<Node> {
        self.create_leaf(NodeKind::CData {
            content: text.to_string(),
        })
    }

    /// Creates an unattached text node, or `None` if the node limit is
    /// reached.
    pub fn create_text(&mut self, text: &str) -> Option<Node> {
        self.create_leaf(NodeKind::Text {
            content: text.to_string(),
        })
    }

    /// Creates an unattached comment, or `None` if the node limit is
    /// reached.
    pub fn create_comment(&mut self, text: &str) -> Option<Node> {
        self.create_leaf(NodeKind::Comment {
            content: text.to_string(),
        })
    }

    fn create_leaf(&mut self, kind: NodeKind) -> Option<Node> {
        let node_type = kind.node_type();
        match self.tree.create_node(kind) {
            Ok(id) => Some(self.wrap(id, node_type)),
            Err(err) => {
                debug!(doc = %self.id, %err, "node allocation refused");
                None
            }
        }
    }

    // --- Fragments ---

    /// Parses `input` as a fragment of this document and bookkeeps it.
    ///
    /// The input is decoded with the document's input encoding. On failure
    /// nothing is allocated and nothing is bookkept.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the content is malformed and `options` lacks
    /// [`ParseOptions::RECOVER`], or if the node limit is reached.
    pub fn parse_fragment(
        &mut self,
        input: &[u8],
        url: &str,
        options: ParseOptions,
    ) -> Result<FragmentId, ParseError> {
        let (text, decode_diagnostic) = decode(input, &self.input_encoding, options)?;
        let (nodes, diagnostics) = parser::parse_fragment(&mut self.tree, &text, options)?;
        debug!(
            doc = %self.id,
            url,
            nodes = nodes.len(),
            diagnostics = diagnostics.len(),
            "parsed fragment"
        );
        self.diagnostics.extend(decode_diagnostic);
        self.diagnostics.extend(diagnostics);

        let fragment = DocumentFragment::new(nodes, self.id, url);
        self.bookkeep_fragment(fragment)
            .map_err(|e| ParseError::new(e.to_string()))
    }

    /// Records `fragment` so teardown removes it.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::ForeignNode`] if the fragment belongs to
    /// another document.
    pub fn bookkeep_fragment(&mut self, fragment: DocumentFragment) -> Result<FragmentId, TreeError> {
        if fragment.document_id() != self.id {
            return Err(TreeError::ForeignNode);
        }
        let id = FragmentId {
            doc: self.id,
            index: self.fragments.len(),
        };
        self.fragments.push(fragment);
        Ok(id)
    }

    /// Removes a fragment now, moving the nodes it still owns to the
    /// registry. Nodes appended into the tree since the parse stay with
    /// their new parent. Returns the number of handles migrated; unknown
    /// ids and fragments already removed migrate none.
    pub fn remove_fragment(&mut self, id: FragmentId) -> usize {
        if id.doc != self.id {
            return 0;
        }
        match self.fragments.get_mut(id.index) {
            Some(fragment) => fragment.remove(&self.tree, &mut self.unlinked),
            None => 0,
        }
    }

    // --- Registry and mutation ---

    /// Registers a detached handle for release at teardown. No validation
    /// is performed.
    pub fn add_unlinked_node(&mut self, id: NodeId) {
        self.unlinked.append(id);
    }

    /// Detaches `node` from its parent and registers it. A node already
    /// registered is not registered again. Absent nodes are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::ForeignNode`] for wrappers of another document
    /// and for the document node, and [`TreeError::StaleHandle`] for
    /// released nodes.
    pub fn unlink(&mut self, node: &Node) -> Result<(), TreeError> {
        let id = match self.check(node)? {
            Some(id) => id,
            None => return Ok(()),
        };
        if id == self.tree.root() {
            return Err(TreeError::ForeignNode);
        }
        self.tree.detach(id)?;
        if !self.unlinked.contains(id) {
            self.unlinked.append(id);
        }
        Ok(())
    }

    /// Appends `child` as the last child of `parent`, detaching it first.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::ForeignNode`] for wrappers of another document
    /// or absent nodes, [`TreeError::StaleHandle`] for released nodes, and
    /// [`TreeError::CycleDetected`] if `child` is an ancestor of `parent`.
    pub fn append_child(&mut self, parent: &Node, child: &Node) -> Result<(), TreeError> {
        let parent = self.check(parent)?.ok_or(TreeError::ForeignNode)?;
        let child = self.check(child)?.ok_or(TreeError::ForeignNode)?;
        self.tree.append_child(parent, child)
    }

    fn check(&self, node: &Node) -> Result<Option<NodeId>, TreeError> {
        if node.doc != self.id {
            return Err(TreeError::ForeignNode);
        }
        match node.id {
            Some(id) => self.tree.node(id).map(|_| Some(id)),
            None => Ok(None),
        }
    }

    /// Evaluates a location path with `context` as the context node. An
    /// absent context means the document node.
    ///
    /// # Errors
    ///
    /// Returns [`XPathError`] if the expression is malformed or the context
    /// node has been released.
    pub fn search(&self, context: &Node, expression: &str) -> Result<Vec<Node>, XPathError> {
        if context.doc != self.id {
            return Err(XPathError::ForeignTree);
        }
        let start = context.id.unwrap_or_else(|| self.tree.root());
        let hits = self.xpath.evaluate(&self.tree, start, expression)?;
        Ok(hits.into_iter().filter_map(|id| self.node(id)).collect())
    }

    // --- Teardown ---

    /// Releases the document.
    ///
    /// Fragments are removed first, in creation order, so their nodes join
    /// the registry. Registered nodes are then freed in registry order;
    /// handles already released with an ancestor are skipped. The `XPath`
    /// context is freed next and the tree last.
    pub fn free(self) -> TeardownReport {
        let Self {
            id,
            mut tree,
            mut unlinked,
            mut fragments,
            xpath,
            ..
        } = self;
        let mut report = TeardownReport {
            fragments_removed: fragments.len(),
            ..TeardownReport::default()
        };

        for fragment in &mut fragments {
            report.migrated += fragment.remove(&tree, &mut unlinked);
        }
        report.steps.push(TeardownStep::RemoveFragments);
        debug!(doc = %id, fragments = report.fragments_removed, migrated = report.migrated, "fragments removed");

        for (handle, outcome) in unlinked.drain_and_free(|h| tree.free_node(h)) {
            match outcome {
                Ok(_) => report.freed_nodes.push(handle),
                Err(err) => {
                    warn!(doc = %id, node = ?handle, %err, "skipping unlinked node");
                    report.stale_skipped.push(handle);
                }
            }
        }
        report.steps.push(TeardownStep::FreeUnlinked);
        debug!(
            doc = %id,
            freed = report.freed_nodes.len(),
            skipped = report.stale_skipped.len(),
            "unlinked nodes freed"
        );

        xpath.free();
        report.steps.push(TeardownStep::FreeXPathContext);

        report.tree_nodes_released = tree.free();
        report.steps.push(TeardownStep::FreeTree);
        debug!(doc = %id, nodes = report.tree_nodes_released, "document freed");
        report
    }
}

/// Decodes input bytes, turning malformed sequences into a diagnostic when
/// recovering and an error otherwise.
fn decode(
    content: &[u8],
    label: &str,
    options: ParseOptions,
) -> Result<(String, Option<ParseDiagnostic>), ParseError> {
    let decoded = encoding::decode_input(content, label).map_err(|e| ParseError::new(e.to_string()))?;
    if !decoded.had_errors {
        return Ok((decoded.text, None));
    }
    let message = format!("input is not valid {}", decoded.encoding);
    if !options.contains(ParseOptions::RECOVER) {
        return Err(ParseError::new(message));
    }
    let diagnostic = ParseDiagnostic {
        severity: ErrorSeverity::Error,
        message,
        location: Default::default(),
    };
    Ok((decoded.text, Some(diagnostic)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(xml: &str) -> Document {
        Document::create(xml.as_bytes(), "", "", ParseOptions::default(), "").unwrap()
    }

    #[test]
    fn test_empty_content_yields_empty_document() {
        let doc = Document::create(b"", "", "mem:", ParseOptions::NONE, "").unwrap();
        assert!(doc.root().is_absent());
        assert_eq!(doc.root().node_type(), NodeType::Element);
        assert_eq!(doc.input_len(), 0);
        assert_eq!(doc.input_encoding(), "utf-8");
        assert_eq!(doc.url(), "mem:");
        assert_eq!(doc.doc_type(), NodeType::Document);
    }

    #[test]
    fn test_fresh_document_bookkeeping_is_empty() {
        let doc = doc("<a/>");
        assert!(doc.unlinked_nodes().is_empty());
        assert!(doc.fragments().is_empty());
        assert!(doc.xpath_context().is_bound_to(doc.tree()));
        assert_eq!(doc.input_len(), 4);
    }

    #[test]
    fn test_strict_parse_failure() {
        let err = Document::create(b"<a>", "", "", ParseOptions::NONE, "").unwrap_err();
        assert!(err.message.contains("premature end"));
    }

    #[test]
    fn test_unknown_encoding_is_parse_error() {
        let err = Document::create(b"<a/>", "klingon", "", ParseOptions::default(), "").unwrap_err();
        assert!(err.message.contains("klingon"));
    }

    #[test]
    fn test_malformed_bytes_strict_and_recover() {
        assert!(Document::create(b"<a>\xFF</a>", "utf-8", "", ParseOptions::NONE, "").is_err());
        let doc = Document::create(b"<a>\xFF</a>", "utf-8", "", ParseOptions::RECOVER, "").unwrap();
        assert_eq!(doc.diagnostics().len(), 1);
    }

    #[test]
    fn test_create_element_empty_tag() {
        let mut doc = Document::create_empty("", "");
        let node = doc.create_element("").unwrap();
        assert_eq!(node.node_type(), NodeType::Element);
        assert_eq!(node.name(&doc), Some(""));
        assert!(!node.is_attached(&doc));
    }

    #[test]
    fn test_node_limit_exhaustion() {
        let config = DocumentConfig::default().node_limit(2);
        let mut doc = Document::parse(b"<a/>", &config).unwrap();
        assert_eq!(
            doc.create_element("b"),
            Err(TreeError::CapacityExhausted { limit: 2 })
        );
        assert!(doc.create_cdata("x").is_none());
        assert!(doc.create_text("x").is_none());
        assert!(doc.create_comment("x").is_none());
    }

    #[test]
    fn test_unlink_registers_once() {
        let mut doc = doc("<a><b/></a>");
        let b = doc.search(&doc.root(), "b").unwrap()[0];
        doc.unlink(&b).unwrap();
        doc.unlink(&b).unwrap();
        assert_eq!(doc.unlinked_nodes().len(), 1);
        assert!(!b.is_attached(&doc));
    }

    #[test]
    fn test_unlink_rejects_foreign_and_document_node() {
        let mut a = doc("<a/>");
        let b = doc("<b/>");
        assert_eq!(a.unlink(&b.root()), Err(TreeError::ForeignNode));
        let document_node = a.node(a.tree().root()).unwrap();
        assert_eq!(a.unlink(&document_node), Err(TreeError::ForeignNode));
    }

    #[test]
    fn test_foreign_fragment_rejected() {
        let mut a = doc("<a/>");
        let mut b = doc("<b/>");
        let frag_id = b.parse_fragment(b"<c/>", "", ParseOptions::NONE).unwrap();
        let foreign = DocumentFragment::new(Vec::new(), b.id(), "");
        assert_eq!(a.bookkeep_fragment(foreign), Err(TreeError::ForeignNode));
        assert!(a.fragment(frag_id).is_none());
        assert_eq!(a.remove_fragment(frag_id), 0);
    }

    #[test]
    fn test_node_refuses_released_handle() {
        let mut doc = doc("<a><b/></a>");
        let b = doc.search(&doc.root(), "b").unwrap()[0];
        let id = b.id().unwrap();
        assert_eq!(doc.node(id), Some(b));
        assert_eq!(doc.node(id).map(|n| n.node_type()), Some(NodeType::Element));

        doc.unlink(&b).unwrap();
        doc.tree.free_node(id).unwrap();
        assert_eq!(doc.node(id), None);
    }

    #[test]
    fn test_node_reports_actual_kind() {
        let doc = doc("<a>t<!--c--></a>");
        let kinds: Vec<_> = doc
            .search(&doc.root(), "node()")
            .unwrap()
            .iter()
            .map(Node::node_type)
            .collect();
        assert_eq!(kinds, vec![NodeType::Text, NodeType::Comment]);
    }

    #[test]
    fn test_search_wraps_hits() {
        let doc = doc("<r><a>1</a><a>2</a></r>");
        let hits = doc.search(&doc.root(), "a").unwrap();
        let texts: Vec<_> = hits.iter().filter_map(|n| n.text(&doc)).collect();
        assert_eq!(texts, vec!["1", "2"]);
    }

    #[test]
    fn test_free_step_order() {
        let report = doc("<a/>").free();
        assert_eq!(
            report.steps,
            vec![
                TeardownStep::RemoveFragments,
                TeardownStep::FreeUnlinked,
                TeardownStep::FreeXPathContext,
                TeardownStep::FreeTree,
            ]
        );
        assert_eq!(report.tree_nodes_released, 2);
    }
}
