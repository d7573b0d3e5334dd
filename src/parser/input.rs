//! Low-level input handling for the XML parser.
//!
//! [`ParserInput`] owns the cursor over decoded input: position tracking
//! (line, column, byte offset), lookahead, name and reference parsing, and
//! diagnostic collection. Nesting depth is bounded to keep hostile input
//! from exhausting the stack.
//!
//! No external entity is ever loaded; only the five predefined entities and
//! character references are expanded.

use crate::error::{ErrorSeverity, ParseDiagnostic, ParseError, SourceLocation};

/// Maximum element nesting depth.
pub(crate) const DEFAULT_MAX_DEPTH: u32 = 256;

/// Returns `true` if `c` is a valid `Char` per XML 1.0 §2.2 `[2]`.
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x0001_0000..=0x0010_FFFF
    )
}

/// Returns `true` if `c` is a valid `NameStartChar` per XML 1.0 §2.3 `[4]`.
pub(crate) fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z' |
        '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}' |
        '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' |
        '\u{200C}'..='\u{200D}' | '\u{2070}'..='\u{218F}' |
        '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}' |
        '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' |
        '\u{10000}'..='\u{EFFFF}'
    )
}

/// Returns `true` if `c` is a valid `NameChar` per XML 1.0 §2.3 `[4a]`.
pub(crate) fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' |
            '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}'
        )
}

/// Cursor over decoded parser input.
pub(crate) struct ParserInput<'a> {
    input: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    depth: u32,
    recover: bool,
    /// Warnings and recovered errors, in the order they were raised.
    pub(crate) diagnostics: Vec<ParseDiagnostic>,
}

impl<'a> ParserInput<'a> {
    pub fn new(input: &'a str, recover: bool) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            depth: 0,
            recover,
            diagnostics: Vec::new(),
        }
    }

    // -- Depth tracking --

    pub fn increment_depth(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > DEFAULT_MAX_DEPTH {
            return Err(self.fatal(format!(
                "maximum nesting depth exceeded ({DEFAULT_MAX_DEPTH})"
            )));
        }
        Ok(())
    }

    pub fn decrement_depth(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // -- Position queries --

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            byte_offset: self.pos,
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    pub fn peek_char(&self) -> Option<char> {
        let rest = self.input.get(self.pos..)?;
        // Input comes from a `&str`, so `pos` always sits on a char boundary.
        let width = match rest.first()? {
            b if *b < 0x80 => 1,
            b if *b >= 0xF0 => 4,
            b if *b >= 0xE0 => 3,
            _ => 2,
        };
        std::str::from_utf8(rest.get(..width)?)
            .ok()
            .and_then(|s| s.chars().next())
    }

    pub fn looking_at(&self, s: &[u8]) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    // -- Advance operations --

    /// Advances by `count` bytes of ASCII input, updating line/column.
    pub fn advance(&mut self, count: usize) {
        for _ in 0..count {
            if self.pos < self.input.len() {
                if self.input[self.pos] == b'\n' {
                    self.line += 1;
                    self.column = 1;
                } else {
                    self.column += 1;
                }
                self.pos += 1;
            }
        }
    }

    fn advance_char(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += ch.len_utf8();
    }

    /// Consumes the next character with `\r\n` normalization and `Char`
    /// validation.
    pub fn next_char(&mut self) -> Result<char, ParseError> {
        let ch = self
            .peek_char()
            .ok_or_else(|| self.fatal("unexpected end of input"))?;
        self.advance_char(ch);
        if ch == '\r' {
            if self.peek() == Some(b'\n') {
                self.advance(1);
            }
            return Ok('\n');
        }
        if !is_xml_char(ch) {
            self.error(format!("invalid XML character: U+{:04X}", ch as u32))?;
        }
        Ok(ch)
    }

    pub fn expect_byte(&mut self, expected: u8) -> Result<(), ParseError> {
        match self.peek() {
            Some(b) if b == expected => {
                self.advance(1);
                Ok(())
            }
            Some(b) => Err(self.fatal(format!(
                "expected '{}', found '{}'",
                expected as char, b as char
            ))),
            None => Err(self.fatal(format!(
                "expected '{}', found end of input",
                expected as char
            ))),
        }
    }

    pub fn expect_str(&mut self, expected: &[u8]) -> Result<(), ParseError> {
        for &b in expected {
            self.expect_byte(b)?;
        }
        Ok(())
    }

    /// Skips whitespace characters. Returns `true` if any were consumed.
    pub fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while let Some(b' ' | b'\t' | b'\r' | b'\n') = self.peek() {
            self.advance(1);
        }
        self.pos > start
    }

    /// Skips forward until just past `delim`, or to the end of input.
    pub fn skip_past(&mut self, delim: &[u8]) {
        while !self.at_end() && !self.looking_at(delim) {
            self.advance(1);
        }
        self.advance(delim.len());
    }

    /// Collects characters up to `delim` and consumes the delimiter.
    pub fn take_until(&mut self, delim: &[u8], what: &str) -> Result<String, ParseError> {
        let mut content = String::new();
        loop {
            if self.at_end() {
                return Err(self.fatal(format!("unexpected end of input in {what}")));
            }
            if self.looking_at(delim) {
                self.advance(delim.len());
                return Ok(content);
            }
            content.push(self.next_char()?);
        }
    }

    // -- Names and references --

    /// Parses an XML `Name` per XML 1.0 §2.3 production `[5]`.
    pub fn parse_name(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let first = self
            .peek_char()
            .ok_or_else(|| self.fatal("expected name, found end of input"))?;
        if !is_name_start_char(first) {
            return Err(self.fatal(format!("invalid name start character: '{first}'")));
        }
        self.advance_char(first);
        while let Some(ch) = self.peek_char() {
            if !is_name_char(ch) {
                break;
            }
            self.advance_char(ch);
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    /// Parses an entity or character reference (`&...;`).
    ///
    /// Unknown entities are fatal unless recovering, in which case the
    /// reference text is kept literally.
    pub fn parse_reference(&mut self) -> Result<String, ParseError> {
        self.expect_byte(b'&')?;

        if self.peek() == Some(b'#') {
            self.advance(1);
            let (radix, digits) = if self.peek() == Some(b'x') {
                self.advance(1);
                (16, self.take_while(|b| b.is_ascii_hexdigit()))
            } else {
                (10, self.take_while(|b| b.is_ascii_digit()))
            };
            self.expect_byte(b';')?;
            let ch = u32::from_str_radix(&digits, radix)
                .ok()
                .and_then(char::from_u32)
                .filter(|&c| is_xml_char(c));
            return match ch {
                Some(ch) => Ok(ch.to_string()),
                None => {
                    self.error(format!("invalid character reference: &#{digits};"))?;
                    Ok(String::new())
                }
            };
        }

        let name = self.parse_name()?;
        self.expect_byte(b';')?;
        let resolved = match name.as_str() {
            "amp" => "&",
            "lt" => "<",
            "gt" => ">",
            "apos" => "'",
            "quot" => "\"",
            _ => {
                self.error(format!("entity '{name}' not defined"))?;
                return Ok(format!("&{name};"));
            }
        };
        Ok(resolved.to_string())
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.advance(1);
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    /// Parses a quoted attribute value with reference resolution and
    /// whitespace normalization (XML 1.0 §3.3.3).
    pub fn parse_attribute_value(&mut self) -> Result<String, ParseError> {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.fatal("attribute value must be quoted")),
        };
        self.advance(1);

        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.fatal("unexpected end of input in attribute value")),
                Some(b) if b == quote => {
                    self.advance(1);
                    return Ok(value);
                }
                Some(b'&') => value.push_str(&self.parse_reference()?),
                Some(b'<') => {
                    self.error("'<' not allowed in attribute values")?;
                    self.advance(1);
                    value.push('<');
                }
                Some(_) => match self.next_char()? {
                    '\n' | '\t' => value.push(' '),
                    ch => value.push(ch),
                },
            }
        }
    }

    /// Parses a quoted literal with no reference resolution.
    pub fn parse_quoted_value(&mut self) -> Result<String, ParseError> {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.fatal("expected quoted value")),
        };
        self.advance(1);
        let delim = [quote];
        self.take_until(&delim, "quoted value")
    }

    // -- Error helpers --

    /// Creates a fatal `ParseError` at the current location.
    pub fn fatal(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            location: self.location(),
            diagnostics: self.diagnostics.clone(),
        }
    }

    /// Reports a well-formedness error: recorded and skipped when
    /// recovering, fatal otherwise.
    pub fn error(&mut self, message: impl Into<String>) -> Result<(), ParseError> {
        if self.recover {
            self.push_diagnostic(ErrorSeverity::Error, message.into());
            Ok(())
        } else {
            Err(self.fatal(message))
        }
    }

    pub fn push_diagnostic(&mut self, severity: ErrorSeverity, message: String) {
        self.diagnostics.push(ParseDiagnostic {
            severity,
            message,
            location: self.location(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_column_tracking() {
        let mut input = ParserInput::new("ab\ncd", false);
        input.advance(3);
        assert_eq!(input.location().line, 2);
        assert_eq!(input.location().column, 1);
        assert_eq!(input.location().byte_offset, 3);
    }

    #[test]
    fn test_next_char_cr_normalization() {
        let mut input = ParserInput::new("\r\nx", false);
        assert_eq!(input.next_char().unwrap(), '\n');
        assert_eq!(input.next_char().unwrap(), 'x');
    }

    #[test]
    fn test_parse_name_multibyte() {
        let mut input = ParserInput::new("caf\u{e9}-1 rest", false);
        assert_eq!(input.parse_name().unwrap(), "caf\u{e9}-1");
        assert_eq!(input.peek(), Some(b' '));
    }

    #[test]
    fn test_parse_name_rejects_digit_start() {
        let mut input = ParserInput::new("1abc", false);
        assert!(input.parse_name().is_err());
    }

    #[test]
    fn test_references() {
        let mut input = ParserInput::new("&amp;&#65;&#x42;", false);
        assert_eq!(input.parse_reference().unwrap(), "&");
        assert_eq!(input.parse_reference().unwrap(), "A");
        assert_eq!(input.parse_reference().unwrap(), "B");
    }

    #[test]
    fn test_unknown_entity_strict_and_recover() {
        let mut strict = ParserInput::new("&nbsp;", false);
        assert!(strict.parse_reference().is_err());

        let mut lenient = ParserInput::new("&nbsp;", true);
        assert_eq!(lenient.parse_reference().unwrap(), "&nbsp;");
        assert_eq!(lenient.diagnostics.len(), 1);
        assert_eq!(lenient.diagnostics[0].severity, ErrorSeverity::Error);
    }

    #[test]
    fn test_attribute_value_normalization() {
        let mut input = ParserInput::new("'a\tb&lt;c'", false);
        assert_eq!(input.parse_attribute_value().unwrap(), "a b<c");
    }

    #[test]
    fn test_take_until_unterminated() {
        let mut input = ParserInput::new("abc", false);
        let err = input.take_until(b"-->", "comment").unwrap_err();
        assert_eq!(err.message, "unexpected end of input in comment");
    }
}
