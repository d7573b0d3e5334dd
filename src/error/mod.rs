//! Error types and diagnostics.
//!
//! Parse failures carry a source location and the diagnostics collected
//! before the failure, matching libxml2's error reporting model. In
//! recovery mode the parser still produces a tree and the diagnostics are
//! attached to the resulting document instead.
//!
//! Tree mutation helpers report [`TreeError`]. Use-after-free and double
//! free are not runtime errors of the document model: they are prevented by
//! ownership, and the arena's generational handles turn any remaining
//! misuse into [`TreeError::StaleHandle`].

use std::fmt;

use thiserror::Error;

use crate::tree::NodeId;

/// Severity level for a parse diagnostic, matching libxml2's `xmlErrorLevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// A non-fatal issue that doesn't prevent parsing.
    Warning,
    /// A recoverable error: the parser continued but the input is malformed.
    Error,
    /// An unrecoverable error: parsing stopped.
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Fatal => write!(f, "fatal error"),
        }
    }
}

/// Source location within parsed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based byte offset from the start of the input.
    pub byte_offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single diagnostic emitted during parsing.
#[derive(Debug, Clone, Error)]
#[error("{severity}: {message} at {location}")]
pub struct ParseDiagnostic {
    /// The severity of this diagnostic.
    pub severity: ErrorSeverity,
    /// Human-readable message.
    pub message: String,
    /// Where in the source this diagnostic was raised.
    pub location: SourceLocation,
}

/// The error returned when a document or fragment cannot be parsed.
///
/// No partial state is retained when this error is returned: a failed
/// document parse allocates no document, and a failed fragment parse
/// releases every node it allocated.
#[derive(Debug, Clone, Error)]
#[error("parse error at {location}: {message}")]
pub struct ParseError {
    /// The primary error message.
    pub message: String,
    /// Where in the source the fatal error occurred.
    pub location: SourceLocation,
    /// Diagnostics collected before the fatal error.
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl ParseError {
    /// Creates a `ParseError` with no location information.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: SourceLocation::default(),
            diagnostics: Vec::new(),
        }
    }
}

/// Errors raised by tree mutation and lookup helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The handle refers to a node that has already been released.
    #[error("stale node handle {0:?}")]
    StaleHandle(NodeId),

    /// The wrapper belongs to a different document, or has no node.
    #[error("node does not belong to this document")]
    ForeignNode,

    /// The arena reached its node limit.
    #[error("node arena capacity exhausted ({limit} nodes)")]
    CapacityExhausted {
        /// The configured limit that was hit.
        limit: u32,
    },

    /// Attaching the node would make it its own ancestor.
    #[error("node {0:?} cannot become a descendant of itself")]
    CycleDetected(NodeId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation {
            line: 10,
            column: 5,
            byte_offset: 42,
        };
        assert_eq!(loc.to_string(), "10:5");
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError {
            message: "unexpected end of input".to_string(),
            location: SourceLocation {
                line: 1,
                column: 15,
                byte_offset: 14,
            },
            diagnostics: vec![],
        };
        assert_eq!(
            err.to_string(),
            "parse error at 1:15: unexpected end of input"
        );
    }

    #[test]
    fn test_parse_diagnostic_display() {
        let diag = ParseDiagnostic {
            severity: ErrorSeverity::Warning,
            message: "external subset not loaded".to_string(),
            location: SourceLocation {
                line: 3,
                column: 10,
                byte_offset: 50,
            },
        };
        assert_eq!(
            diag.to_string(),
            "warning: external subset not loaded at 3:10"
        );
    }

    #[test]
    fn test_tree_error_display() {
        let err = TreeError::CapacityExhausted { limit: 4 };
        assert_eq!(err.to_string(), "node arena capacity exhausted (4 nodes)");
        assert_eq!(
            TreeError::ForeignNode.to_string(),
            "node does not belong to this document"
        );
    }
}
