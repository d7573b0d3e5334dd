//! XML 1.0 parser.
//!
//! A hand-rolled recursive descent parser that builds directly into a
//! [`Tree`] arena. It parses whole documents and content fragments, and
//! supports a recovery mode for malformed input.
//!
//! Parser behavior is selected with [`ParseOptions`], a bitmask using the
//! numeric values of libxml2's `xmlParserOption` so options can be passed
//! through the C binding unchanged.

pub(crate) mod input;
mod xml;

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::error::{ErrorSeverity, ParseDiagnostic, ParseError};
use crate::tree::{NodeId, NodeKind, Tree};

/// Parser option flags.
///
/// ```
/// use xmlsteward::ParseOptions;
///
/// let opts = ParseOptions::NONE.recover(true).no_net(true);
/// assert!(opts.contains(ParseOptions::RECOVER));
/// assert_eq!(opts.bits(), (1 << 0) | (1 << 11));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParseOptions(u32);

impl ParseOptions {
    /// No options: strict parsing, diagnostics logged.
    pub const NONE: Self = Self(0);
    /// Recover from well-formedness errors and return a best-effort tree.
    pub const RECOVER: Self = Self(1 << 0);
    /// Do not log error diagnostics.
    pub const NOERROR: Self = Self(1 << 5);
    /// Do not log warning diagnostics.
    pub const NOWARNING: Self = Self(1 << 6);
    /// Forbid network access while parsing.
    pub const NONET: Self = Self(1 << 11);

    const ALL: u32 = Self::RECOVER.0 | Self::NOERROR.0 | Self::NOWARNING.0 | Self::NONET.0;

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Builds options from raw bits, dropping bits this parser does not know.
    #[must_use]
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    fn with(self, flag: Self, yes: bool) -> Self {
        if yes {
            Self(self.0 | flag.0)
        } else {
            Self(self.0 & !flag.0)
        }
    }

    /// Enables or disables error recovery.
    #[must_use]
    pub fn recover(self, yes: bool) -> Self {
        self.with(Self::RECOVER, yes)
    }

    /// Enables or disables logging of error diagnostics.
    #[must_use]
    pub fn no_error(self, yes: bool) -> Self {
        self.with(Self::NOERROR, yes)
    }

    /// Enables or disables logging of warning diagnostics.
    #[must_use]
    pub fn no_warning(self, yes: bool) -> Self {
        self.with(Self::NOWARNING, yes)
    }

    /// Enables or disables the network ban.
    #[must_use]
    pub fn no_net(self, yes: bool) -> Self {
        self.with(Self::NONET, yes)
    }
}

/// The lenient default: recover, stay quiet, stay offline.
impl Default for ParseOptions {
    fn default() -> Self {
        Self::RECOVER | Self::NOERROR | Self::NOWARNING | Self::NONET
    }
}

impl BitOr for ParseOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ParseOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::RECOVER, "RECOVER"),
            (Self::NOERROR, "NOERROR"),
            (Self::NOWARNING, "NOWARNING"),
            (Self::NONET, "NONET"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            f.write_str("ParseOptions(NONE)")
        } else {
            write!(f, "ParseOptions({})", set.join(" | "))
        }
    }
}

/// The result of a successful document parse.
#[derive(Debug)]
pub struct ParsedDocument {
    pub tree: Tree,
    /// Warnings, plus errors that were recovered from.
    pub diagnostics: Vec<ParseDiagnostic>,
}

/// Parses a complete document into a fresh tree.
///
/// `node_limit` caps the number of live nodes in the resulting tree,
/// including nodes created later through the document.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed and
/// [`ParseOptions::RECOVER`] is not set, or if the node limit is reached.
pub fn parse_document(
    input: &str,
    options: ParseOptions,
    node_limit: Option<u32>,
) -> Result<ParsedDocument, ParseError> {
    let mut tree = Tree::with_node_limit(node_limit);
    let mut parser = xml::XmlParser::new(input, &mut tree, options);
    let outcome = parser.parse_document();
    let diagnostics = parser.into_diagnostics();
    emit_diagnostics(&diagnostics, options);
    match outcome {
        Ok(()) => Ok(ParsedDocument { tree, diagnostics }),
        Err(err) => {
            report_fatal(&err, options);
            Err(err)
        }
    }
}

/// Parses well-balanced content into `tree` as unattached top-level nodes.
///
/// Content is parsed below a temporary fragment container that is released
/// afterwards. On failure every node allocated for the content is released
/// too, so the tree's live count is unchanged.
///
/// # Errors
///
/// Returns `ParseError` if the content is malformed and
/// [`ParseOptions::RECOVER`] is not set, or if the tree's node limit is
/// reached.
pub fn parse_fragment(
    tree: &mut Tree,
    input: &str,
    options: ParseOptions,
) -> Result<(Vec<NodeId>, Vec<ParseDiagnostic>), ParseError> {
    let container = tree
        .create_node(NodeKind::DocumentFragment)
        .map_err(|e| ParseError::new(e.to_string()))?;

    let mut parser = xml::XmlParser::new(input, tree, options);
    let outcome = parser.parse_fragment(container);
    let diagnostics = parser.into_diagnostics();
    emit_diagnostics(&diagnostics, options);

    if let Err(err) = outcome {
        report_fatal(&err, options);
        tree.free_node(container)
            .map_err(|e| ParseError::new(e.to_string()))?;
        return Err(err);
    }

    let nodes: Vec<NodeId> = tree.children(container).collect();
    for &id in &nodes {
        tree.detach(id).map_err(|e| ParseError::new(e.to_string()))?;
    }
    tree.free_node(container)
        .map_err(|e| ParseError::new(e.to_string()))?;
    Ok((nodes, diagnostics))
}

fn emit_diagnostics(diagnostics: &[ParseDiagnostic], options: ParseOptions) {
    for diag in diagnostics {
        match diag.severity {
            ErrorSeverity::Warning if !options.contains(ParseOptions::NOWARNING) => {
                tracing::warn!(target: "xmlsteward::parser", location = %diag.location, "{}", diag.message);
            }
            ErrorSeverity::Error | ErrorSeverity::Fatal
                if !options.contains(ParseOptions::NOERROR) =>
            {
                tracing::error!(target: "xmlsteward::parser", location = %diag.location, "{}", diag.message);
            }
            _ => {}
        }
    }
}

fn report_fatal(err: &ParseError, options: ParseOptions) {
    if !options.contains(ParseOptions::NOERROR) {
        tracing::error!(target: "xmlsteward::parser", location = %err.location, "{}", err.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_bits_match_libxml2() {
        assert_eq!(ParseOptions::RECOVER.bits(), 1);
        assert_eq!(ParseOptions::NOERROR.bits(), 32);
        assert_eq!(ParseOptions::NOWARNING.bits(), 64);
        assert_eq!(ParseOptions::NONET.bits(), 2048);
        assert_eq!(ParseOptions::default().bits(), 1 | 32 | 64 | 2048);
    }

    #[test]
    fn test_option_builders() {
        let opts = ParseOptions::default().recover(false);
        assert!(!opts.contains(ParseOptions::RECOVER));
        assert!(opts.contains(ParseOptions::NONET | ParseOptions::NOERROR));

        let mut opts = ParseOptions::NONE;
        opts |= ParseOptions::NOWARNING;
        assert_eq!(opts, ParseOptions::NONE.no_warning(true));
    }

    #[test]
    fn test_from_bits_truncate_drops_unknown() {
        let opts = ParseOptions::from_bits_truncate(1 | (1 << 3));
        assert_eq!(opts, ParseOptions::RECOVER);
    }

    #[test]
    fn test_debug_lists_flags() {
        assert_eq!(format!("{:?}", ParseOptions::NONE), "ParseOptions(NONE)");
        assert_eq!(
            format!("{:?}", ParseOptions::RECOVER | ParseOptions::NONET),
            "ParseOptions(RECOVER | NONET)"
        );
    }

    #[test]
    fn test_parse_document_keeps_diagnostics() {
        let parsed = parse_document("<a><b></a>", ParseOptions::default(), None).unwrap();
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].severity, ErrorSeverity::Error);
    }

    #[test]
    fn test_parse_document_node_limit() {
        // document node + 2 elements fit, the third does not
        let err = parse_document("<a><b/><c/></a>", ParseOptions::NONE, Some(3)).unwrap_err();
        assert!(err.message.contains("capacity"), "{}", err.message);
    }

    #[test]
    fn test_parse_fragment_detaches_nodes() {
        let mut tree = Tree::new();
        let (nodes, diagnostics) =
            parse_fragment(&mut tree, "<b/>text<!--c-->", ParseOptions::NONE).unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(diagnostics.is_empty());
        for id in &nodes {
            assert_eq!(tree.parent(*id), None);
        }
        // document node + three fragment nodes; container released
        assert_eq!(tree.live_count(), 4);
    }

    #[test]
    fn test_parse_fragment_failure_releases_everything() {
        let mut tree = Tree::new();
        let before = tree.live_count();
        let err = parse_fragment(&mut tree, "<b><c/>", ParseOptions::NONE);
        assert!(err.is_err());
        assert_eq!(tree.live_count(), before);
    }

    #[test]
    fn test_parse_empty_fragment() {
        let mut tree = Tree::new();
        let (nodes, _) = parse_fragment(&mut tree, "", ParseOptions::NONE).unwrap();
        assert!(nodes.is_empty());
    }
}
