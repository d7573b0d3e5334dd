//! `XPath` evaluation context.
//!
//! An [`XPathContext`] is created bound to one [`Tree`] and evaluates
//! abbreviated location paths against it:
//!
//! - `/` selects the document node, a leading `/` makes a path absolute
//! - `//` selects descendants-or-self before the next step
//! - `.` and `..` select the context node and its parent
//! - `*` selects child elements, a name selects child elements by name
//! - `text()` selects text and CDATA children, `node()` selects any child
//!
//! Results are node sets in document order without duplicates.
//!
//! ```
//! use xmlsteward::{Document, ParseOptions};
//!
//! let doc = Document::create(b"<r><a/><b><a/></b></r>", "", "", ParseOptions::default(), "").unwrap();
//! let hits = doc.search(&doc.root(), "//a").unwrap();
//! assert_eq!(hits.len(), 2);
//! ```

use thiserror::Error;

use crate::tree::{NodeId, NodeKind, Tree};

/// An error raised while parsing or evaluating a path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XPathError {
    /// The expression is not a supported location path.
    #[error("invalid path expression '{expression}' at offset {position}")]
    Syntax { expression: String, position: usize },

    /// The context was created for another tree.
    #[error("XPath context is bound to another tree")]
    ForeignTree,

    /// The context node has been released.
    #[error("context node {0:?} is no longer live")]
    StaleContext(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    DescendantOrSelf,
    SelfNode,
    Parent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Name(String),
    Wildcard,
    Text,
    Node,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
}

impl Step {
    const DESCENDANT_OR_SELF: Self = Self {
        axis: Axis::DescendantOrSelf,
        test: NodeTest::Node,
    };
}

#[derive(Debug, PartialEq, Eq)]
struct LocationPath {
    absolute: bool,
    steps: Vec<Step>,
}

/// Evaluation state bound to a single tree.
#[derive(Debug)]
pub struct XPathContext {
    tree_serial: u64,
}

impl XPathContext {
    /// Creates a context bound to `tree`.
    #[must_use]
    pub fn new(tree: &Tree) -> Self {
        tracing::trace!(tree = tree.serial(), "xpath context created");
        Self {
            tree_serial: tree.serial(),
        }
    }

    /// Returns `true` if this context was created for `tree`.
    #[must_use]
    pub fn is_bound_to(&self, tree: &Tree) -> bool {
        self.tree_serial == tree.serial()
    }

    /// Evaluates `expression` with `context` as the context node.
    ///
    /// # Errors
    ///
    /// Returns [`XPathError::Syntax`] for malformed expressions,
    /// [`XPathError::ForeignTree`] if `tree` is not the bound tree, and
    /// [`XPathError::StaleContext`] if `context` has been released.
    pub fn evaluate(
        &self,
        tree: &Tree,
        context: NodeId,
        expression: &str,
    ) -> Result<Vec<NodeId>, XPathError> {
        if !self.is_bound_to(tree) {
            return Err(XPathError::ForeignTree);
        }
        if !tree.is_live(context) {
            return Err(XPathError::StaleContext(context));
        }

        let path = parse_path(expression)?;
        let mut nodes = vec![if path.absolute { tree.root() } else { context }];
        for step in &path.steps {
            nodes = apply_step(tree, &nodes, step);
        }
        Ok(nodes)
    }

    /// Releases the context.
    pub fn free(self) {
        tracing::trace!(tree = self.tree_serial, "xpath context freed");
    }
}

fn parse_path(expression: &str) -> Result<LocationPath, XPathError> {
    let syntax = |position: usize| XPathError::Syntax {
        expression: expression.to_string(),
        position,
    };

    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(syntax(0));
    }
    let offset = expression.len() - expression.trim_start().len();

    let mut steps = Vec::new();
    let mut rest = trimmed;
    let absolute = rest.starts_with('/');
    if rest == "/" {
        return Ok(LocationPath { absolute, steps });
    }
    if let Some(after) = rest.strip_prefix("//") {
        steps.push(Step::DESCENDANT_OR_SELF);
        rest = after;
    } else if let Some(after) = rest.strip_prefix('/') {
        rest = after;
    }

    loop {
        let position = offset + (trimmed.len() - rest.len());
        let end = rest.find('/').unwrap_or(rest.len());
        let token = rest[..end].trim();
        steps.push(parse_step(token).ok_or_else(|| syntax(position))?);

        rest = &rest[end..];
        if rest.is_empty() {
            break;
        }
        if let Some(after) = rest.strip_prefix("//") {
            steps.push(Step::DESCENDANT_OR_SELF);
            rest = after;
        } else {
            rest = &rest[1..];
        }
    }
    Ok(LocationPath { absolute, steps })
}

fn parse_step(token: &str) -> Option<Step> {
    let child = |test| Some(Step {
        axis: Axis::Child,
        test,
    });
    match token {
        "" => None,
        "." => Some(Step {
            axis: Axis::SelfNode,
            test: NodeTest::Node,
        }),
        ".." => Some(Step {
            axis: Axis::Parent,
            test: NodeTest::Node,
        }),
        "*" => child(NodeTest::Wildcard),
        "text()" => child(NodeTest::Text),
        "node()" => child(NodeTest::Node),
        name if is_name(name) => child(NodeTest::Name(name.to_string())),
        _ => None,
    }
}

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
}

fn apply_step(tree: &Tree, input: &[NodeId], step: &Step) -> Vec<NodeId> {
    let mut result: Vec<NodeId> = Vec::new();
    for &node in input {
        let candidates: Vec<NodeId> = match step.axis {
            Axis::Child => tree.children(node).collect(),
            Axis::DescendantOrSelf => std::iter::once(node).chain(tree.descendants(node)).collect(),
            Axis::SelfNode => vec![node],
            Axis::Parent => tree.parent(node).into_iter().collect(),
        };
        for id in candidates {
            if matches_test(tree, id, &step.test) && !result.contains(&id) {
                result.push(id);
            }
        }
    }
    if input.len() > 1 {
        result.sort_by_cached_key(|&id| document_position(tree, id));
    }
    result
}

fn matches_test(tree: &Tree, id: NodeId, test: &NodeTest) -> bool {
    let Some(data) = tree.get(id) else {
        return false;
    };
    match test {
        NodeTest::Node => true,
        NodeTest::Wildcard => matches!(data.kind, NodeKind::Element { .. }),
        NodeTest::Text => matches!(data.kind, NodeKind::Text { .. } | NodeKind::CData { .. }),
        NodeTest::Name(name) => {
            matches!(&data.kind, NodeKind::Element { name: n, .. } if n == name)
        }
    }
}

/// Sibling positions from the topmost ancestor down to `id`. Sorting by
/// this key yields document order within one tree.
fn document_position(tree: &Tree, id: NodeId) -> Vec<usize> {
    let mut key: Vec<usize> = std::iter::once(id)
        .chain(tree.ancestors(id))
        .map(|n| {
            std::iter::successors(tree.prev_sibling(n), |&p| tree.prev_sibling(p)).count()
        })
        .collect();
    key.reverse();
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_document, ParseOptions};

    fn tree(xml: &str) -> Tree {
        parse_document(xml, ParseOptions::NONE, None).unwrap().tree
    }

    fn names(tree: &Tree, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|&id| tree.node_name(id).unwrap_or("#").to_string())
            .collect()
    }

    #[test]
    fn test_root_path() {
        let t = tree("<r/>");
        let ctx = XPathContext::new(&t);
        let hits = ctx.evaluate(&t, t.root(), "/").unwrap();
        assert_eq!(hits, vec![t.root()]);
    }

    #[test]
    fn test_child_and_descendant_paths() {
        let t = tree("<r><a><b/></a><b/><c><a><b/></a></c></r>");
        let ctx = XPathContext::new(&t);
        let root = t.root();
        assert_eq!(ctx.evaluate(&t, root, "/r/a/b").unwrap().len(), 1);
        assert_eq!(ctx.evaluate(&t, root, "//b").unwrap().len(), 3);
        assert_eq!(ctx.evaluate(&t, root, "/r//a/b").unwrap().len(), 2);
        assert_eq!(
            names(&t, &ctx.evaluate(&t, root, "/r/*").unwrap()),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_document_order_across_contexts() {
        let t = tree("<r><x><y>1</y></x><y>2</y></r>");
        let ctx = XPathContext::new(&t);
        let hits = ctx.evaluate(&t, t.root(), "//y").unwrap();
        let texts: Vec<String> = hits.iter().map(|&id| t.text_content(id)).collect();
        assert_eq!(texts, vec!["1", "2"]);
    }

    #[test]
    fn test_relative_self_parent_and_text() {
        let t = tree("<r><a>hi</a></r>");
        let ctx = XPathContext::new(&t);
        let r = t.root_element().unwrap();
        let a = ctx.evaluate(&t, r, "a").unwrap()[0];
        assert_eq!(ctx.evaluate(&t, a, "..").unwrap(), vec![r]);
        assert_eq!(ctx.evaluate(&t, a, ".").unwrap(), vec![a]);
        let text = ctx.evaluate(&t, a, "text()").unwrap();
        assert_eq!(t.node_text(text[0]), Some("hi"));
        assert_eq!(ctx.evaluate(&t, r, "a/node()").unwrap().len(), 1);
    }

    #[test]
    fn test_syntax_errors() {
        let t = tree("<r/>");
        let ctx = XPathContext::new(&t);
        for bad in ["", "a/", "a[1]", "count(*)", "///"] {
            assert!(
                matches!(ctx.evaluate(&t, t.root(), bad), Err(XPathError::Syntax { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_foreign_tree_and_stale_context() {
        let mut t = tree("<r><a/></r>");
        let other = tree("<r/>");
        let ctx = XPathContext::new(&t);
        assert_eq!(
            ctx.evaluate(&other, other.root(), "/"),
            Err(XPathError::ForeignTree)
        );

        let r = t.root_element().unwrap();
        let a = t.first_child(r).unwrap();
        t.free_node(a).unwrap();
        assert_eq!(ctx.evaluate(&t, a, "."), Err(XPathError::StaleContext(a)));
        ctx.free();
    }
}
