//! Recursive descent XML parser building directly into a [`Tree`].
//!
//! Handles the XML declaration, comments, processing instructions, the
//! DOCTYPE declaration (internal subset skipped), elements with attributes,
//! character data, CDATA sections and the predefined entities. In recovery
//! mode well-formedness errors become diagnostics and the parser keeps
//! going: unclosed elements are closed at end of input and a mismatched end
//! tag closes the current element.

use crate::error::{ErrorSeverity, ParseError};
use crate::tree::{Attribute, NodeId, NodeKind, Tree};

use super::input::ParserInput;
use super::ParseOptions;

/// How a run of element content ended.
enum ContentEnd {
    EndTag(String),
    Eof,
}

pub(crate) struct XmlParser<'a, 't> {
    input: ParserInput<'a>,
    tree: &'t mut Tree,
    options: ParseOptions,
}

impl<'a, 't> XmlParser<'a, 't> {
    pub fn new(input: &'a str, tree: &'t mut Tree, options: ParseOptions) -> Self {
        Self {
            input: ParserInput::new(input, options.contains(ParseOptions::RECOVER)),
            tree,
            options,
        }
    }

    /// Returns the diagnostics collected so far.
    pub fn into_diagnostics(self) -> Vec<crate::error::ParseDiagnostic> {
        self.input.diagnostics
    }

    /// Parses a complete document below the tree's document node.
    pub fn parse_document(&mut self) -> Result<(), ParseError> {
        let doc = self.tree.root();

        if self.input.looking_at(b"<?xml")
            && matches!(self.input.peek_at(5), Some(b' ' | b'\t' | b'\r' | b'\n'))
        {
            self.parse_xml_declaration()?;
        }

        self.parse_misc(doc)?;
        if self.input.looking_at(b"<!DOCTYPE") {
            self.parse_doctype(doc)?;
            self.parse_misc(doc)?;
        }

        if self.input.peek() == Some(b'<')
            && self
                .input
                .peek_at(1)
                .is_some_and(|b| b != b'!' && b != b'?' && b != b'/')
        {
            self.parse_element(doc)?;
        } else {
            self.input.error("start tag expected, '<' not found")?;
            return Ok(());
        }

        self.parse_misc(doc)?;
        if !self.input.at_end() {
            self.input.error("extra content at the end of the document")?;
        }
        Ok(())
    }

    /// Parses a sequence of content nodes below `container` until end of
    /// input. Stray end tags are errors.
    pub fn parse_fragment(&mut self, container: NodeId) -> Result<(), ParseError> {
        loop {
            match self.parse_content(container)? {
                ContentEnd::Eof => return Ok(()),
                ContentEnd::EndTag(name) => {
                    self.input
                        .error(format!("unexpected end tag '{name}' in fragment"))?;
                }
            }
        }
    }

    fn append(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, ParseError> {
        let id = self
            .tree
            .create_node(kind)
            .map_err(|e| self.input.fatal(e.to_string()))?;
        self.tree
            .append_child(parent, id)
            .map_err(|e| self.input.fatal(e.to_string()))?;
        Ok(id)
    }

    // --- Prolog ---
    // See XML 1.0 §2.8: [22] prolog, [23] XMLDecl

    fn parse_xml_declaration(&mut self) -> Result<(), ParseError> {
        self.input.expect_str(b"<?xml")?;
        let body = self.input.take_until(b"?>", "XML declaration")?;
        if !body.contains("version") {
            self.input.error("XML declaration without version")?;
        }
        Ok(())
    }

    fn parse_misc(&mut self, parent: NodeId) -> Result<(), ParseError> {
        loop {
            self.input.skip_whitespace();
            if self.input.looking_at(b"<!--") {
                self.parse_comment(parent)?;
            } else if self.input.looking_at(b"<?") {
                self.parse_processing_instruction(parent)?;
            } else {
                return Ok(());
            }
        }
    }

    // See XML 1.0 §2.8: [28] doctypedecl
    fn parse_doctype(&mut self, parent: NodeId) -> Result<(), ParseError> {
        self.input.expect_str(b"<!DOCTYPE")?;
        self.input.skip_whitespace();
        let name = self.input.parse_name()?;
        self.input.skip_whitespace();

        let mut system_id = None;
        let mut public_id = None;
        if self.input.looking_at(b"SYSTEM") {
            self.input.advance(6);
            self.input.skip_whitespace();
            system_id = Some(self.input.parse_quoted_value()?);
        } else if self.input.looking_at(b"PUBLIC") {
            self.input.advance(6);
            self.input.skip_whitespace();
            public_id = Some(self.input.parse_quoted_value()?);
            self.input.skip_whitespace();
            system_id = Some(self.input.parse_quoted_value()?);
        }
        self.input.skip_whitespace();

        if self.input.peek() == Some(b'[') {
            self.skip_internal_subset()?;
            self.input.skip_whitespace();
        }
        self.input.expect_byte(b'>')?;

        if let Some(uri) = &system_id {
            let reason = if self.options.contains(ParseOptions::NONET) {
                "network access disabled"
            } else {
                "external subsets are never loaded"
            };
            self.input.push_diagnostic(
                ErrorSeverity::Warning,
                format!("external subset '{uri}' not loaded: {reason}"),
            );
        }

        self.append(
            parent,
            NodeKind::DocumentType {
                name,
                system_id,
                public_id,
            },
        )?;
        Ok(())
    }

    fn skip_internal_subset(&mut self) -> Result<(), ParseError> {
        self.input.expect_byte(b'[')?;
        loop {
            match self.input.peek() {
                None => return Err(self.input.fatal("unexpected end of input in internal subset")),
                Some(b']') => {
                    self.input.advance(1);
                    return Ok(());
                }
                Some(q @ (b'"' | b'\'')) => {
                    self.input.advance(1);
                    self.input.skip_past(&[q]);
                }
                Some(_) if self.input.looking_at(b"<!--") => self.input.skip_past(b"-->"),
                Some(_) => self.input.advance(1),
            }
        }
    }

    // --- Elements ---
    // See XML 1.0 §3.1: [40] STag, [42] ETag, [44] EmptyElemTag

    fn parse_element(&mut self, parent: NodeId) -> Result<(), ParseError> {
        self.input.increment_depth()?;
        self.input.expect_byte(b'<')?;
        let name = self.input.parse_name()?;

        let mut attributes: Vec<Attribute> = Vec::new();
        loop {
            let had_ws = self.input.skip_whitespace();
            if self.input.peek() == Some(b'>') || self.input.looking_at(b"/>") {
                break;
            }
            if self.input.at_end() {
                return Err(self.input.fatal(format!("unexpected end of input in tag '{name}'")));
            }
            if !had_ws {
                self.input.error("whitespace required between attributes")?;
            }
            let attr_name = self.input.parse_name()?;
            self.input.skip_whitespace();
            self.input.expect_byte(b'=')?;
            self.input.skip_whitespace();
            let value = self.input.parse_attribute_value()?;
            if attributes.iter().any(|a| a.name == attr_name) {
                self.input
                    .error(format!("attribute '{attr_name}' redefined"))?;
                continue;
            }
            attributes.push(Attribute {
                name: attr_name,
                value,
            });
        }

        let node = self.append(
            parent,
            NodeKind::Element {
                name: name.clone(),
                attributes,
            },
        )?;

        if self.input.looking_at(b"/>") {
            self.input.advance(2);
            self.input.decrement_depth();
            return Ok(());
        }
        self.input.expect_byte(b'>')?;

        match self.parse_content(node)? {
            ContentEnd::EndTag(close) if close == name => {}
            ContentEnd::EndTag(close) => {
                self.input.error(format!(
                    "opening and ending tag mismatch: {name} and {close}"
                ))?;
            }
            ContentEnd::Eof => {
                self.input
                    .error(format!("premature end of data in tag {name}"))?;
            }
        }
        self.input.decrement_depth();
        Ok(())
    }

    /// Parses content below `parent` until an end tag or end of input.
    fn parse_content(&mut self, parent: NodeId) -> Result<ContentEnd, ParseError> {
        loop {
            if self.input.at_end() {
                return Ok(ContentEnd::Eof);
            }
            if self.input.looking_at(b"</") {
                self.input.advance(2);
                let name = self.input.parse_name()?;
                self.input.skip_whitespace();
                self.input.expect_byte(b'>')?;
                return Ok(ContentEnd::EndTag(name));
            }
            if self.input.looking_at(b"<!--") {
                self.parse_comment(parent)?;
            } else if self.input.looking_at(b"<![CDATA[") {
                self.input.advance(9);
                let content = self.input.take_until(b"]]>", "CDATA section")?;
                self.append(parent, NodeKind::CData { content })?;
            } else if self.input.looking_at(b"<?") {
                self.parse_processing_instruction(parent)?;
            } else if self.input.looking_at(b"<!") {
                self.input.error("markup declaration not allowed here")?;
                self.input.skip_past(b">");
            } else if self.input.peek() == Some(b'<') {
                self.parse_element(parent)?;
            } else {
                self.parse_text(parent)?;
            }
        }
    }

    // See XML 1.0 §2.4: [14] CharData
    fn parse_text(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let mut content = String::new();
        while let Some(b) = self.input.peek() {
            match b {
                b'<' => break,
                b'&' => content.push_str(&self.input.parse_reference()?),
                _ => {
                    if self.input.looking_at(b"]]>") {
                        self.input.error("sequence ']]>' not allowed in content")?;
                    }
                    content.push(self.input.next_char()?);
                }
            }
        }
        if !content.is_empty() {
            self.append(parent, NodeKind::Text { content })?;
        }
        Ok(())
    }

    // See XML 1.0 §2.5: [15] Comment
    fn parse_comment(&mut self, parent: NodeId) -> Result<(), ParseError> {
        self.input.expect_str(b"<!--")?;
        let content = self.input.take_until(b"-->", "comment")?;
        if content.contains("--") {
            self.input.error("'--' not allowed inside comments")?;
        }
        self.append(parent, NodeKind::Comment { content })?;
        Ok(())
    }

    // See XML 1.0 §2.6: [16] PI
    fn parse_processing_instruction(&mut self, parent: NodeId) -> Result<(), ParseError> {
        self.input.expect_str(b"<?")?;
        let target = self.input.parse_name()?;
        if target.eq_ignore_ascii_case("xml") {
            self.input
                .error("XML declaration allowed only at the start of the document")?;
        }
        let data = if self.input.skip_whitespace() {
            Some(self.input.take_until(b"?>", "processing instruction")?)
                .filter(|d| !d.is_empty())
        } else {
            self.input.expect_str(b"?>")?;
            None
        };
        self.append(parent, NodeKind::ProcessingInstruction { target, data })?;
        Ok(())
    }
}
