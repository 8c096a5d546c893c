//! Lexical scanner for YAML 1.1.
//!
//! Produces a lazy token stream with one construct scanned ahead of the
//! consumer. Block structure is tracked with a stack of indentation levels;
//! a scalar that might retroactively become a mapping key is remembered as a
//! "possible simple key" until a `:` confirms it or the position goes stale.

use std::collections::HashMap;
use std::collections::VecDeque;

use tracing::trace;

use crate::token::Directive;
use crate::{Mark, Reader, ReaderError, ScalarStyle, ScanError, Token, TokenKind};

/// A candidate simple key: a token that becomes a KEY if a `:` shows up
/// while the position is still valid.
#[derive(Debug, Clone)]
struct SimpleKey {
    /// Position of the candidate in the token stream.
    token_number: usize,
    /// Whether a key is mandatory here (block context, at the open indent).
    required: bool,
    index: usize,
    line: usize,
    column: usize,
    mark: Mark,
}

/// Pull-based scanner over a decoded input stream.
pub struct Scanner {
    reader: Reader,
    done: bool,
    /// Number of unclosed `[` and `{`; zero means block context.
    flow_level: usize,
    tokens: VecDeque<Token>,
    tokens_taken: usize,
    /// Current indentation level; -1 before any block structure opens.
    indent: i64,
    indents: Vec<i64>,
    /// Whether a simple key may start at the current position. In block
    /// context this also gates opening a new block collection.
    allow_simple_key: bool,
    /// At most one candidate per flow level.
    possible_simple_keys: HashMap<usize, SimpleKey>,
}

impl Scanner {
    /// Scan a string.
    pub fn from_str(name: &str, source: &str) -> Result<Self, ReaderError> {
        Ok(Self::new(Reader::from_str(name, source)?))
    }

    /// Scan raw bytes, detecting the encoding from a BOM.
    pub fn from_bytes(name: &str, bytes: &[u8]) -> Result<Self, ReaderError> {
        Ok(Self::new(Reader::from_bytes(name, bytes)?))
    }

    /// Scan from an already-constructed reader.
    pub fn new(reader: Reader) -> Self {
        let mut scanner = Self {
            reader,
            done: false,
            flow_level: 0,
            tokens: VecDeque::new(),
            tokens_taken: 0,
            indent: -1,
            indents: Vec::new(),
            allow_simple_key: true,
            possible_simple_keys: HashMap::new(),
        };
        let mark = scanner.reader.mark();
        let encoding = scanner.reader.encoding();
        scanner
            .tokens
            .push_back(Token::new(TokenKind::StreamStart(encoding), mark.clone(), mark));
        scanner
    }

    /// Name of the underlying stream.
    pub fn stream_name(&self) -> &str {
        self.reader.name()
    }

    /// Look at the next token without consuming it.
    pub fn peek_token(&mut self) -> Result<Option<&Token>, ScanError> {
        while self.need_more_tokens()? {
            self.fetch_more_tokens()?;
        }
        Ok(self.tokens.front())
    }

    /// Consume and return the next token.
    pub fn get_token(&mut self) -> Result<Option<Token>, ScanError> {
        while self.need_more_tokens()? {
            self.fetch_more_tokens()?;
        }
        let token = self.tokens.pop_front();
        if let Some(token) = &token {
            self.tokens_taken += 1;
            trace!("token {} at line {}", token.kind.describe(), token.start.line);
        }
        Ok(token)
    }

    fn need_more_tokens(&mut self) -> Result<bool, ScanError> {
        if self.done {
            return Ok(false);
        }
        if self.tokens.is_empty() {
            return Ok(true);
        }
        // The head of the queue may still become a KEY token.
        self.stale_possible_simple_keys()?;
        Ok(self.next_possible_simple_key() == Some(self.tokens_taken))
    }

    fn fetch_more_tokens(&mut self) -> Result<(), ScanError> {
        self.scan_to_next_token();
        self.stale_possible_simple_keys()?;
        self.unwind_indent(self.reader.column() as i64);

        let ch = self.reader.peek(0);
        match ch {
            '\0' => self.fetch_stream_end(),
            '%' if self.check_directive() => self.fetch_directive(),
            '-' if self.check_document_start() => self.fetch_document_indicator(TokenKind::DocumentStart),
            '.' if self.check_document_end() => self.fetch_document_indicator(TokenKind::DocumentEnd),
            '[' => self.fetch_flow_collection_start(TokenKind::FlowSequenceStart),
            '{' => self.fetch_flow_collection_start(TokenKind::FlowMappingStart),
            ']' => self.fetch_flow_collection_end(TokenKind::FlowSequenceEnd),
            '}' => self.fetch_flow_collection_end(TokenKind::FlowMappingEnd),
            ',' => self.fetch_flow_entry(),
            '-' if self.check_block_entry() => self.fetch_block_entry(),
            '?' if self.check_key() => self.fetch_key(),
            ':' if self.check_value() => self.fetch_value(),
            '*' => self.fetch_anchor_or_alias(false),
            '&' => self.fetch_anchor_or_alias(true),
            '!' => self.fetch_tag(),
            '|' if self.flow_level == 0 => self.fetch_block_scalar(ScalarStyle::Literal),
            '>' if self.flow_level == 0 => self.fetch_block_scalar(ScalarStyle::Folded),
            '\'' => self.fetch_flow_quoted_scalar(ScalarStyle::SingleQuoted),
            '"' => self.fetch_flow_quoted_scalar(ScalarStyle::DoubleQuoted),
            _ if self.check_plain() => self.fetch_plain(),
            _ => Err(ScanError {
                context: Some("while scanning for the next token".to_string()),
                context_mark: None,
                problem: format!("found character {ch:?} that cannot start any token"),
                problem_mark: self.reader.mark(),
            }),
        }
    }

    // Simple key bookkeeping.

    fn next_possible_simple_key(&self) -> Option<usize> {
        self.possible_simple_keys
            .values()
            .map(|key| key.token_number)
            .min()
    }

    /// Drop candidates that can no longer become keys: a simple key must sit
    /// on a single line and span at most 1024 characters.
    fn stale_possible_simple_keys(&mut self) -> Result<(), ScanError> {
        let line = self.reader.line();
        let index = self.reader.index();
        let mut stale = Vec::new();
        for (&level, key) in &self.possible_simple_keys {
            if key.line != line || index - key.index > 1024 {
                if key.required {
                    return Err(ScanError::with_context(
                        "while scanning a simple key",
                        key.mark.clone(),
                        "could not find expected ':'",
                        self.reader.mark(),
                    ));
                }
                stale.push(level);
            }
        }
        for level in stale {
            self.possible_simple_keys.remove(&level);
        }
        Ok(())
    }

    /// The next token may start a simple key; remember where it begins.
    fn save_possible_simple_key(&mut self) -> Result<(), ScanError> {
        let required = self.flow_level == 0 && self.indent == self.reader.column() as i64;
        if self.allow_simple_key {
            self.remove_possible_simple_key()?;
            let token_number = self.tokens_taken + self.tokens.len();
            let key = SimpleKey {
                token_number,
                required,
                index: self.reader.index(),
                line: self.reader.line(),
                column: self.reader.column(),
                mark: self.reader.mark(),
            };
            self.possible_simple_keys.insert(self.flow_level, key);
        }
        Ok(())
    }

    fn remove_possible_simple_key(&mut self) -> Result<(), ScanError> {
        if let Some(key) = self.possible_simple_keys.remove(&self.flow_level) {
            if key.required {
                return Err(ScanError::with_context(
                    "while scanning a simple key",
                    key.mark,
                    "could not find expected ':'",
                    self.reader.mark(),
                ));
            }
        }
        Ok(())
    }

    // Indentation.

    /// Pop indentation levels deeper than `column`, closing their blocks.
    /// Flow context ignores indentation entirely.
    fn unwind_indent(&mut self, column: i64) {
        if self.flow_level > 0 {
            return;
        }
        while self.indent > column {
            let mark = self.reader.mark();
            self.indent = self.indents.pop().unwrap_or(-1);
            self.tokens
                .push_back(Token::new(TokenKind::BlockEnd, mark.clone(), mark));
        }
    }

    fn add_indent(&mut self, column: i64) -> bool {
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            return true;
        }
        false
    }

    // Fetchers.

    fn fetch_stream_end(&mut self) -> Result<(), ScanError> {
        self.unwind_indent(-1);
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        self.possible_simple_keys.clear();
        let mark = self.reader.mark();
        self.tokens
            .push_back(Token::new(TokenKind::StreamEnd, mark.clone(), mark));
        self.done = true;
        Ok(())
    }

    fn fetch_directive(&mut self) -> Result<(), ScanError> {
        self.unwind_indent(-1);
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_directive()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_document_indicator(&mut self, kind: TokenKind) -> Result<(), ScanError> {
        self.unwind_indent(-1);
        // No block collection can follow `---` on the same line.
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        let start = self.reader.mark();
        self.reader.forward(3);
        let end = self.reader.mark();
        self.tokens.push_back(Token::new(kind, start, end));
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, kind: TokenKind) -> Result<(), ScanError> {
        self.save_possible_simple_key()?;
        self.flow_level += 1;
        self.allow_simple_key = true;
        let start = self.reader.mark();
        self.reader.forward(1);
        let end = self.reader.mark();
        self.tokens.push_back(Token::new(kind, start, end));
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, kind: TokenKind) -> Result<(), ScanError> {
        self.remove_possible_simple_key()?;
        self.flow_level = self.flow_level.saturating_sub(1);
        self.allow_simple_key = false;
        let start = self.reader.mark();
        self.reader.forward(1);
        let end = self.reader.mark();
        self.tokens.push_back(Token::new(kind, start, end));
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<(), ScanError> {
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        let start = self.reader.mark();
        self.reader.forward(1);
        let end = self.reader.mark();
        self.tokens
            .push_back(Token::new(TokenKind::FlowEntry, start, end));
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> Result<(), ScanError> {
        if self.flow_level == 0 {
            if !self.allow_simple_key {
                return Err(ScanError::new(
                    "sequence entries are not allowed here",
                    self.reader.mark(),
                ));
            }
            if self.add_indent(self.reader.column() as i64) {
                let mark = self.reader.mark();
                self.tokens.push_back(Token::new(
                    TokenKind::BlockSequenceStart,
                    mark.clone(),
                    mark,
                ));
            }
        }
        // A `-` inside flow context is an error, but the parser reports it
        // with better context than the scanner could.
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        let start = self.reader.mark();
        self.reader.forward(1);
        let end = self.reader.mark();
        self.tokens
            .push_back(Token::new(TokenKind::BlockEntry, start, end));
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<(), ScanError> {
        if self.flow_level == 0 {
            if !self.allow_simple_key {
                return Err(ScanError::new(
                    "mapping keys are not allowed here",
                    self.reader.mark(),
                ));
            }
            if self.add_indent(self.reader.column() as i64) {
                let mark = self.reader.mark();
                self.tokens
                    .push_back(Token::new(TokenKind::BlockMappingStart, mark.clone(), mark));
            }
        }
        self.allow_simple_key = self.flow_level == 0;
        self.remove_possible_simple_key()?;
        let start = self.reader.mark();
        self.reader.forward(1);
        let end = self.reader.mark();
        self.tokens.push_back(Token::new(TokenKind::Key, start, end));
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<(), ScanError> {
        if let Some(key) = self.possible_simple_keys.remove(&self.flow_level) {
            // The pending candidate was a key after all.
            self.tokens.insert(
                key.token_number - self.tokens_taken,
                Token::new(TokenKind::Key, key.mark.clone(), key.mark.clone()),
            );
            if self.flow_level == 0 && self.add_indent(key.column as i64) {
                self.tokens.insert(
                    key.token_number - self.tokens_taken,
                    Token::new(TokenKind::BlockMappingStart, key.mark.clone(), key.mark),
                );
            }
            // There cannot be two simple keys in a row.
            self.allow_simple_key = false;
        } else {
            if self.flow_level == 0 {
                if !self.allow_simple_key {
                    return Err(ScanError::new(
                        "mapping values are not allowed here",
                        self.reader.mark(),
                    ));
                }
                if self.add_indent(self.reader.column() as i64) {
                    let mark = self.reader.mark();
                    self.tokens.push_back(Token::new(
                        TokenKind::BlockMappingStart,
                        mark.clone(),
                        mark,
                    ));
                }
            }
            self.allow_simple_key = self.flow_level == 0;
            self.remove_possible_simple_key()?;
        }
        let start = self.reader.mark();
        self.reader.forward(1);
        let end = self.reader.mark();
        self.tokens
            .push_back(Token::new(TokenKind::Value, start, end));
        Ok(())
    }

    fn fetch_anchor_or_alias(&mut self, anchor: bool) -> Result<(), ScanError> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_anchor(anchor)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<(), ScanError> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_tag()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, style: ScalarStyle) -> Result<(), ScanError> {
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        let token = self.scan_block_scalar(style)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_flow_quoted_scalar(&mut self, style: ScalarStyle) -> Result<(), ScanError> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_flow_scalar(style)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_plain(&mut self) -> Result<(), ScanError> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_plain()?;
        self.tokens.push_back(token);
        Ok(())
    }

    // Checkers.

    fn check_directive(&self) -> bool {
        self.reader.column() == 0
    }

    fn check_document_start(&self) -> bool {
        self.reader.column() == 0
            && self.reader.prefix(3) == "---"
            && is_blank_or_break_or_nul(self.reader.peek(3))
    }

    fn check_document_end(&self) -> bool {
        self.reader.column() == 0
            && self.reader.prefix(3) == "..."
            && is_blank_or_break_or_nul(self.reader.peek(3))
    }

    fn check_block_entry(&self) -> bool {
        is_blank_or_break_or_nul(self.reader.peek(1))
    }

    fn check_key(&self) -> bool {
        self.flow_level > 0 || is_blank_or_break_or_nul(self.reader.peek(1))
    }

    fn check_value(&self) -> bool {
        self.flow_level > 0 || is_blank_or_break_or_nul(self.reader.peek(1))
    }

    /// A plain scalar may not start with most indicator characters, with the
    /// usual exception for `-?:` when followed by a non-space.
    fn check_plain(&self) -> bool {
        let ch = self.reader.peek(0);
        let indicator = matches!(
            ch,
            '-' | '?'
                | ':'
                | ','
                | '['
                | ']'
                | '{'
                | '}'
                | '#'
                | '&'
                | '*'
                | '!'
                | '|'
                | '>'
                | '\''
                | '"'
                | '%'
                | '@'
                | '`'
        );
        if !indicator && !is_blank_or_break_or_nul(ch) {
            return true;
        }
        let follower_ok = !is_blank_or_break_or_nul(self.reader.peek(1));
        follower_ok && (ch == '-' || (self.flow_level == 0 && matches!(ch, '?' | ':')))
    }

    // Scanners.

    /// Skip whitespace, comments, and line breaks between tokens. Tabs are
    /// deliberately not skipped; a tab where indentation is expected falls
    /// through to the dispatch and is reported there.
    fn scan_to_next_token(&mut self) {
        loop {
            while self.reader.peek(0) == ' ' {
                self.reader.forward(1);
            }
            if self.reader.peek(0) == '#' {
                while !is_break_or_nul(self.reader.peek(0)) {
                    self.reader.forward(1);
                }
            }
            if self.scan_line_break().is_some() {
                if self.flow_level == 0 {
                    self.allow_simple_key = true;
                }
            } else {
                return;
            }
        }
    }

    fn scan_directive(&mut self) -> Result<Token, ScanError> {
        let start = self.reader.mark();
        self.reader.forward(1);
        let name = self.scan_directive_name(&start)?;
        let (directive, end) = match name.as_str() {
            "YAML" => {
                let (major, minor) = self.scan_yaml_directive_value(&start)?;
                (Directive::Version { major, minor }, self.reader.mark())
            }
            "TAG" => {
                let (handle, prefix) = self.scan_tag_directive_value(&start)?;
                (Directive::Tag { handle, prefix }, self.reader.mark())
            }
            _ => {
                let end = self.reader.mark();
                while !is_break_or_nul(self.reader.peek(0)) {
                    self.reader.forward(1);
                }
                (Directive::Reserved { name }, end)
            }
        };
        self.scan_directive_ignored_line(&start)?;
        Ok(Token::new(TokenKind::Directive(directive), start, end))
    }

    fn scan_directive_name(&mut self, start: &Mark) -> Result<String, ScanError> {
        let mut length = 0;
        while is_word_char(self.reader.peek(length)) {
            length += 1;
        }
        if length == 0 {
            return Err(ScanError::with_context(
                "while scanning a directive",
                start.clone(),
                format!(
                    "expected alphabetic or numeric character, but found {:?}",
                    self.reader.peek(0)
                ),
                self.reader.mark(),
            ));
        }
        let value = self.reader.prefix(length);
        self.reader.forward(length);
        let ch = self.reader.peek(0);
        if ch != ' ' && !is_break_or_nul(ch) {
            return Err(ScanError::with_context(
                "while scanning a directive",
                start.clone(),
                format!("expected alphabetic or numeric character, but found {ch:?}"),
                self.reader.mark(),
            ));
        }
        Ok(value)
    }

    fn scan_yaml_directive_value(&mut self, start: &Mark) -> Result<(u32, u32), ScanError> {
        while self.reader.peek(0) == ' ' {
            self.reader.forward(1);
        }
        let major = self.scan_yaml_directive_number(start)?;
        if self.reader.peek(0) != '.' {
            return Err(ScanError::with_context(
                "while scanning a directive",
                start.clone(),
                format!("expected a digit or '.', but found {:?}", self.reader.peek(0)),
                self.reader.mark(),
            ));
        }
        self.reader.forward(1);
        let minor = self.scan_yaml_directive_number(start)?;
        let ch = self.reader.peek(0);
        if ch != ' ' && !is_break_or_nul(ch) {
            return Err(ScanError::with_context(
                "while scanning a directive",
                start.clone(),
                format!("expected a digit or ' ', but found {ch:?}"),
                self.reader.mark(),
            ));
        }
        Ok((major, minor))
    }

    fn scan_yaml_directive_number(&mut self, start: &Mark) -> Result<u32, ScanError> {
        if !self.reader.peek(0).is_ascii_digit() {
            return Err(ScanError::with_context(
                "while scanning a directive",
                start.clone(),
                format!("expected a digit, but found {:?}", self.reader.peek(0)),
                self.reader.mark(),
            ));
        }
        let mut length = 0;
        while self.reader.peek(length).is_ascii_digit() {
            length += 1;
        }
        let value = self.reader.prefix(length).parse().unwrap_or(u32::MAX);
        self.reader.forward(length);
        Ok(value)
    }

    fn scan_tag_directive_value(&mut self, start: &Mark) -> Result<(String, String), ScanError> {
        while self.reader.peek(0) == ' ' {
            self.reader.forward(1);
        }
        let handle = self.scan_tag_handle("directive", start)?;
        while self.reader.peek(0) == ' ' {
            self.reader.forward(1);
        }
        let prefix = self.scan_tag_uri("directive", start)?;
        let ch = self.reader.peek(0);
        if ch != ' ' && !is_break_or_nul(ch) {
            return Err(ScanError::with_context(
                "while scanning a directive",
                start.clone(),
                format!("expected ' ', but found {ch:?}"),
                self.reader.mark(),
            ));
        }
        Ok((handle, prefix))
    }

    fn scan_directive_ignored_line(&mut self, start: &Mark) -> Result<(), ScanError> {
        while self.reader.peek(0) == ' ' {
            self.reader.forward(1);
        }
        if self.reader.peek(0) == '#' {
            while !is_break_or_nul(self.reader.peek(0)) {
                self.reader.forward(1);
            }
        }
        let ch = self.reader.peek(0);
        if ch != '\0' && !is_break(ch) {
            return Err(ScanError::with_context(
                "while scanning a directive",
                start.clone(),
                format!("expected a comment or a line break, but found {ch:?}"),
                self.reader.mark(),
            ));
        }
        self.scan_line_break();
        Ok(())
    }

    fn scan_anchor(&mut self, anchor: bool) -> Result<Token, ScanError> {
        let start = self.reader.mark();
        let what = if anchor { "anchor" } else { "alias" };
        self.reader.forward(1);
        let mut length = 0;
        while is_word_char(self.reader.peek(length)) {
            length += 1;
        }
        if length == 0 {
            return Err(ScanError::with_context(
                format!("while scanning an {what}"),
                start,
                format!(
                    "expected alphabetic or numeric character, but found {:?}",
                    self.reader.peek(0)
                ),
                self.reader.mark(),
            ));
        }
        let value = self.reader.prefix(length);
        self.reader.forward(length);
        let ch = self.reader.peek(0);
        if !is_blank_or_break_or_nul(ch) && !matches!(ch, '?' | ':' | ',' | ']' | '}' | '%' | '@' | '`')
        {
            return Err(ScanError::with_context(
                format!("while scanning an {what}"),
                start,
                format!("expected alphabetic or numeric character, but found {ch:?}"),
                self.reader.mark(),
            ));
        }
        let end = self.reader.mark();
        let kind = if anchor {
            TokenKind::Anchor(value)
        } else {
            TokenKind::Alias(value)
        };
        Ok(Token::new(kind, start, end))
    }

    fn scan_tag(&mut self) -> Result<Token, ScanError> {
        let start = self.reader.mark();
        let (handle, suffix) = match self.reader.peek(1) {
            '<' => {
                // Verbatim tag: !<...>
                self.reader.forward(2);
                let suffix = self.scan_tag_uri("tag", &start)?;
                if self.reader.peek(0) != '>' {
                    return Err(ScanError::with_context(
                        "while parsing a tag",
                        start,
                        format!("expected '>', but found {:?}", self.reader.peek(0)),
                        self.reader.mark(),
                    ));
                }
                self.reader.forward(1);
                (None, suffix)
            }
            ch if is_blank_or_break_or_nul(ch) => {
                // Non-specific tag, just `!`.
                self.reader.forward(1);
                (None, "!".to_string())
            }
            _ => {
                // Either !suffix or !handle!suffix; look for a second '!'.
                let mut length = 1;
                let mut use_handle = false;
                loop {
                    let ch = self.reader.peek(length);
                    if is_blank_or_break_or_nul(ch) {
                        break;
                    }
                    if ch == '!' {
                        use_handle = true;
                        break;
                    }
                    length += 1;
                }
                let handle = if use_handle {
                    self.scan_tag_handle("tag", &start)?
                } else {
                    self.reader.forward(1);
                    "!".to_string()
                };
                let suffix = self.scan_tag_uri("tag", &start)?;
                (Some(handle), suffix)
            }
        };
        let ch = self.reader.peek(0);
        if ch != ' ' && !is_break_or_nul(ch) {
            return Err(ScanError::with_context(
                "while scanning a tag",
                start,
                format!("expected ' ', but found {ch:?}"),
                self.reader.mark(),
            ));
        }
        let end = self.reader.mark();
        Ok(Token::new(TokenKind::Tag { handle, suffix }, start, end))
    }

    fn scan_tag_handle(&mut self, what: &str, start: &Mark) -> Result<String, ScanError> {
        if self.reader.peek(0) != '!' {
            return Err(ScanError::with_context(
                format!("while scanning a {what}"),
                start.clone(),
                format!("expected '!', but found {:?}", self.reader.peek(0)),
                self.reader.mark(),
            ));
        }
        let mut length = 1;
        if self.reader.peek(length) != ' ' {
            while is_word_char(self.reader.peek(length)) {
                length += 1;
            }
            if self.reader.peek(length) != '!' {
                self.reader.forward(length);
                return Err(ScanError::with_context(
                    format!("while scanning a {what}"),
                    start.clone(),
                    format!("expected '!', but found {:?}", self.reader.peek(0)),
                    self.reader.mark(),
                ));
            }
            length += 1;
        }
        let value = self.reader.prefix(length);
        self.reader.forward(length);
        Ok(value)
    }

    fn scan_tag_uri(&mut self, what: &str, start: &Mark) -> Result<String, ScanError> {
        let mut chunks = String::new();
        let mut length = 0;
        loop {
            let ch = self.reader.peek(length);
            if ch.is_ascii_alphanumeric()
                || matches!(
                    ch,
                    '-' | ';'
                        | '/'
                        | '?'
                        | ':'
                        | '@'
                        | '&'
                        | '='
                        | '+'
                        | '$'
                        | ','
                        | '_'
                        | '.'
                        | '!'
                        | '~'
                        | '*'
                        | '\''
                        | '('
                        | ')'
                        | '['
                        | ']'
                )
            {
                length += 1;
                continue;
            }
            if ch == '%' {
                chunks.push_str(&self.reader.prefix(length));
                self.reader.forward(length);
                length = 0;
                chunks.push_str(&self.scan_uri_escapes(what, start)?);
                continue;
            }
            break;
        }
        if length > 0 {
            chunks.push_str(&self.reader.prefix(length));
            self.reader.forward(length);
        }
        if chunks.is_empty() {
            return Err(ScanError::with_context(
                format!("while parsing a {what}"),
                start.clone(),
                format!("expected a URI, but found {:?}", self.reader.peek(0)),
                self.reader.mark(),
            ));
        }
        Ok(chunks)
    }

    fn scan_uri_escapes(&mut self, what: &str, start: &Mark) -> Result<String, ScanError> {
        let mut bytes = Vec::new();
        let mark = self.reader.mark();
        while self.reader.peek(0) == '%' {
            self.reader.forward(1);
            let hi = self.reader.peek(0);
            let lo = self.reader.peek(1);
            if !hi.is_ascii_hexdigit() || !lo.is_ascii_hexdigit() {
                return Err(ScanError::with_context(
                    format!("while scanning a {what}"),
                    start.clone(),
                    format!(
                        "expected URI escape sequence of 2 hexadecimal numbers, but found {hi:?}"
                    ),
                    self.reader.mark(),
                ));
            }
            let byte = (hi.to_digit(16).unwrap() * 16 + lo.to_digit(16).unwrap()) as u8;
            bytes.push(byte);
            self.reader.forward(2);
        }
        String::from_utf8(bytes).map_err(|_| {
            ScanError::with_context(
                format!("while scanning a {what}"),
                start.clone(),
                "found an invalid UTF-8 sequence in a URI escape",
                mark,
            )
        })
    }

    fn scan_block_scalar(&mut self, style: ScalarStyle) -> Result<Token, ScanError> {
        let folded = style == ScalarStyle::Folded;
        let start = self.reader.mark();
        self.reader.forward(1);
        let (chomping, increment) = self.scan_block_scalar_indicators(&start)?;
        self.scan_block_scalar_ignored_line(&start)?;

        let min_indent = (self.indent + 1).max(1);
        let mut chunks = String::new();
        let (mut breaks, indent, mut end) = if let Some(increment) = increment {
            let indent = min_indent + increment as i64 - 1;
            let (breaks, end) = self.scan_block_scalar_breaks(indent);
            (breaks, indent, end)
        } else {
            let (breaks, max_indent, end) = self.scan_block_scalar_indentation();
            (breaks, min_indent.max(max_indent), end)
        };

        let mut line_break: Option<char> = None;
        while self.reader.column() as i64 == indent && self.reader.peek(0) != '\0' {
            chunks.push_str(&breaks);
            let leading_non_space = !matches!(self.reader.peek(0), ' ' | '\t');
            let mut length = 0;
            while !is_break_or_nul(self.reader.peek(length)) {
                length += 1;
            }
            chunks.push_str(&self.reader.prefix(length));
            self.reader.forward(length);
            line_break = self.scan_line_break();
            let (next_breaks, next_end) = self.scan_block_scalar_breaks(indent);
            breaks = next_breaks;
            end = next_end;
            if self.reader.column() as i64 == indent && self.reader.peek(0) != '\0' {
                // Folding joins lines with a space, except around
                // more-indented lines which keep their breaks.
                if folded
                    && line_break == Some('\n')
                    && leading_non_space
                    && !matches!(self.reader.peek(0), ' ' | '\t')
                {
                    if breaks.is_empty() {
                        chunks.push(' ');
                    }
                } else if let Some(br) = line_break {
                    chunks.push(br);
                }
            } else {
                break;
            }
        }

        if chomping != Chomping::Strip {
            if let Some(br) = line_break {
                chunks.push(br);
            }
        }
        if chomping == Chomping::Keep {
            chunks.push_str(&breaks);
        }

        Ok(Token::new(
            TokenKind::Scalar {
                value: chunks,
                plain: false,
                style,
            },
            start,
            end,
        ))
    }

    fn scan_block_scalar_indicators(
        &mut self,
        start: &Mark,
    ) -> Result<(Chomping, Option<u32>), ScanError> {
        let mut chomping = Chomping::Clip;
        let mut increment = None;
        let ch = self.reader.peek(0);
        if ch == '+' || ch == '-' {
            chomping = if ch == '+' { Chomping::Keep } else { Chomping::Strip };
            self.reader.forward(1);
            let ch = self.reader.peek(0);
            if ch.is_ascii_digit() {
                let value = ch.to_digit(10).unwrap();
                if value == 0 {
                    return Err(ScanError::with_context(
                        "while scanning a block scalar",
                        start.clone(),
                        "expected indentation indicator in the range 1-9, but found 0",
                        self.reader.mark(),
                    ));
                }
                increment = Some(value);
                self.reader.forward(1);
            }
        } else if ch.is_ascii_digit() {
            let value = ch.to_digit(10).unwrap();
            if value == 0 {
                return Err(ScanError::with_context(
                    "while scanning a block scalar",
                    start.clone(),
                    "expected indentation indicator in the range 1-9, but found 0",
                    self.reader.mark(),
                ));
            }
            increment = Some(value);
            self.reader.forward(1);
            let ch = self.reader.peek(0);
            if ch == '+' || ch == '-' {
                chomping = if ch == '+' { Chomping::Keep } else { Chomping::Strip };
                self.reader.forward(1);
            }
        }
        let ch = self.reader.peek(0);
        if ch != ' ' && !is_break_or_nul(ch) {
            return Err(ScanError::with_context(
                "while scanning a block scalar",
                start.clone(),
                format!("expected chomping or indentation indicators, but found {ch:?}"),
                self.reader.mark(),
            ));
        }
        Ok((chomping, increment))
    }

    fn scan_block_scalar_ignored_line(&mut self, start: &Mark) -> Result<(), ScanError> {
        while self.reader.peek(0) == ' ' {
            self.reader.forward(1);
        }
        if self.reader.peek(0) == '#' {
            while !is_break_or_nul(self.reader.peek(0)) {
                self.reader.forward(1);
            }
        }
        let ch = self.reader.peek(0);
        if ch != '\0' && !is_break(ch) {
            return Err(ScanError::with_context(
                "while scanning a block scalar",
                start.clone(),
                format!("expected a comment or a line break, but found {ch:?}"),
                self.reader.mark(),
            ));
        }
        self.scan_line_break();
        Ok(())
    }

    fn scan_block_scalar_indentation(&mut self) -> (String, i64, Mark) {
        let mut breaks = String::new();
        let mut max_indent = 0i64;
        let mut end = self.reader.mark();
        loop {
            let ch = self.reader.peek(0);
            if !is_break(ch) && ch != ' ' {
                break;
            }
            if ch == ' ' {
                self.reader.forward(1);
                max_indent = max_indent.max(self.reader.column() as i64);
            } else if let Some(br) = self.scan_line_break() {
                breaks.push(br);
                end = self.reader.mark();
            }
        }
        (breaks, max_indent, end)
    }

    fn scan_block_scalar_breaks(&mut self, indent: i64) -> (String, Mark) {
        let mut breaks = String::new();
        let mut end = self.reader.mark();
        while (self.reader.column() as i64) < indent && self.reader.peek(0) == ' ' {
            self.reader.forward(1);
        }
        while is_break(self.reader.peek(0)) {
            if let Some(br) = self.scan_line_break() {
                breaks.push(br);
            }
            end = self.reader.mark();
            while (self.reader.column() as i64) < indent && self.reader.peek(0) == ' ' {
                self.reader.forward(1);
            }
        }
        (breaks, end)
    }

    fn scan_flow_scalar(&mut self, style: ScalarStyle) -> Result<Token, ScanError> {
        let double = style == ScalarStyle::DoubleQuoted;
        let start = self.reader.mark();
        let quote = self.reader.peek(0);
        self.reader.forward(1);
        let mut chunks = String::new();
        self.scan_flow_scalar_non_spaces(double, &start, &mut chunks)?;
        while self.reader.peek(0) != quote {
            self.scan_flow_scalar_spaces(&start, &mut chunks)?;
            self.scan_flow_scalar_non_spaces(double, &start, &mut chunks)?;
        }
        self.reader.forward(1);
        let end = self.reader.mark();
        Ok(Token::new(
            TokenKind::Scalar {
                value: chunks,
                plain: false,
                style,
            },
            start,
            end,
        ))
    }

    fn scan_flow_scalar_non_spaces(
        &mut self,
        double: bool,
        start: &Mark,
        chunks: &mut String,
    ) -> Result<(), ScanError> {
        loop {
            let mut length = 0;
            loop {
                let ch = self.reader.peek(length);
                if matches!(ch, '\'' | '"' | '\\') || is_blank_or_break_or_nul(ch) {
                    break;
                }
                length += 1;
            }
            if length > 0 {
                chunks.push_str(&self.reader.prefix(length));
                self.reader.forward(length);
            }
            let ch = self.reader.peek(0);
            if !double && ch == '\'' && self.reader.peek(1) == '\'' {
                chunks.push('\'');
                self.reader.forward(2);
            } else if (double && ch == '\'') || (!double && matches!(ch, '"' | '\\')) {
                chunks.push(ch);
                self.reader.forward(1);
            } else if double && ch == '\\' {
                self.reader.forward(1);
                let ch = self.reader.peek(0);
                if let Some(replacement) = escape_replacement(ch) {
                    chunks.push(replacement);
                    self.reader.forward(1);
                } else if let Some(width) = escape_code_width(ch) {
                    self.reader.forward(1);
                    for k in 0..width {
                        if !self.reader.peek(k).is_ascii_hexdigit() {
                            return Err(ScanError::with_context(
                                "while scanning a double-quoted scalar",
                                start.clone(),
                                format!(
                                    "expected escape sequence of {width} hexadecimal numbers, but found {:?}",
                                    self.reader.peek(k)
                                ),
                                self.reader.mark(),
                            ));
                        }
                    }
                    let code = u32::from_str_radix(&self.reader.prefix(width), 16).unwrap();
                    let Some(decoded) = char::from_u32(code) else {
                        return Err(ScanError::with_context(
                            "while scanning a double-quoted scalar",
                            start.clone(),
                            format!("found invalid escaped code point {code:#x}"),
                            self.reader.mark(),
                        ));
                    };
                    chunks.push(decoded);
                    self.reader.forward(width);
                } else if is_break(ch) {
                    self.scan_line_break();
                    self.scan_flow_scalar_breaks(start, chunks)?;
                } else {
                    return Err(ScanError::with_context(
                        "while scanning a double-quoted scalar",
                        start.clone(),
                        format!("found unknown escape character {ch:?}"),
                        self.reader.mark(),
                    ));
                }
            } else {
                return Ok(());
            }
        }
    }

    fn scan_flow_scalar_spaces(
        &mut self,
        start: &Mark,
        chunks: &mut String,
    ) -> Result<(), ScanError> {
        let mut length = 0;
        while matches!(self.reader.peek(length), ' ' | '\t') {
            length += 1;
        }
        let whitespaces = self.reader.prefix(length);
        self.reader.forward(length);
        let ch = self.reader.peek(0);
        if ch == '\0' {
            return Err(ScanError::with_context(
                "while scanning a quoted scalar",
                start.clone(),
                "found unexpected end of stream",
                self.reader.mark(),
            ));
        }
        if is_break(ch) {
            let line_break = self.scan_line_break();
            let mut breaks = String::new();
            self.scan_flow_scalar_breaks(start, &mut breaks)?;
            if line_break != Some('\n') {
                if let Some(br) = line_break {
                    chunks.push(br);
                }
            } else if breaks.is_empty() {
                chunks.push(' ');
            }
            chunks.push_str(&breaks);
        } else {
            chunks.push_str(&whitespaces);
        }
        Ok(())
    }

    fn scan_flow_scalar_breaks(
        &mut self,
        start: &Mark,
        chunks: &mut String,
    ) -> Result<(), ScanError> {
        loop {
            // A document separator inside a quoted scalar means the quote
            // was never closed.
            let prefix = self.reader.prefix(3);
            if (prefix == "---" || prefix == "...")
                && is_blank_or_break_or_nul(self.reader.peek(3))
            {
                return Err(ScanError::with_context(
                    "while scanning a quoted scalar",
                    start.clone(),
                    "found unexpected document separator",
                    self.reader.mark(),
                ));
            }
            while matches!(self.reader.peek(0), ' ' | '\t') {
                self.reader.forward(1);
            }
            if is_break(self.reader.peek(0)) {
                if let Some(br) = self.scan_line_break() {
                    chunks.push(br);
                }
            } else {
                return Ok(());
            }
        }
    }

    fn scan_plain(&mut self) -> Result<Token, ScanError> {
        let mut chunks = String::new();
        let start = self.reader.mark();
        let mut end = self.reader.mark();
        let indent = self.indent + 1;
        let mut spaces = String::new();
        loop {
            if self.reader.peek(0) == '#' {
                break;
            }
            let mut length = 0;
            loop {
                let ch = self.reader.peek(length);
                if is_blank_or_break_or_nul(ch) {
                    break;
                }
                if ch == ':' {
                    let follower = self.reader.peek(length + 1);
                    if is_blank_or_break_or_nul(follower)
                        || (self.flow_level > 0 && matches!(follower, ',' | '[' | ']' | '{' | '}'))
                    {
                        break;
                    }
                }
                if self.flow_level > 0 && matches!(ch, ',' | '[' | ']' | '{' | '}') {
                    break;
                }
                length += 1;
            }
            if length == 0 {
                break;
            }
            self.allow_simple_key = false;
            chunks.push_str(&spaces);
            chunks.push_str(&self.reader.prefix(length));
            self.reader.forward(length);
            end = self.reader.mark();
            spaces = self.scan_plain_spaces();
            if spaces.is_empty()
                || self.reader.peek(0) == '#'
                || (self.flow_level == 0 && (self.reader.column() as i64) < indent)
            {
                break;
            }
        }
        Ok(Token::new(
            TokenKind::Scalar {
                value: chunks,
                plain: true,
                style: ScalarStyle::Plain,
            },
            start,
            end,
        ))
    }

    /// Consume the whitespace after a plain-scalar chunk. Returns the text
    /// to insert before the next chunk; empty means the scalar ends here.
    fn scan_plain_spaces(&mut self) -> String {
        let mut chunks = String::new();
        let mut length = 0;
        while self.reader.peek(length) == ' ' {
            length += 1;
        }
        let whitespaces = self.reader.prefix(length);
        self.reader.forward(length);
        let ch = self.reader.peek(0);
        if is_break(ch) {
            let line_break = self.scan_line_break();
            self.allow_simple_key = true;
            if self.check_document_boundary() {
                return String::new();
            }
            let mut breaks = String::new();
            loop {
                let ch = self.reader.peek(0);
                if ch == ' ' {
                    self.reader.forward(1);
                } else if is_break(ch) {
                    if let Some(br) = self.scan_line_break() {
                        breaks.push(br);
                    }
                    if self.check_document_boundary() {
                        return String::new();
                    }
                } else {
                    break;
                }
            }
            if line_break != Some('\n') {
                if let Some(br) = line_break {
                    chunks.push(br);
                }
            } else if breaks.is_empty() {
                chunks.push(' ');
            }
            chunks.push_str(&breaks);
        } else if !whitespaces.is_empty() {
            chunks.push_str(&whitespaces);
        }
        chunks
    }

    fn check_document_boundary(&self) -> bool {
        let prefix = self.reader.prefix(3);
        (prefix == "---" || prefix == "...") && is_blank_or_break_or_nul(self.reader.peek(3))
    }

    /// Consume one line break; CRLF counts as one. Returns the break
    /// normalized to `\n` except for the Unicode LS/PS characters.
    fn scan_line_break(&mut self) -> Option<char> {
        let ch = self.reader.peek(0);
        match ch {
            '\r' | '\n' | '\u{85}' => {
                if self.reader.prefix(2) == "\r\n" {
                    self.reader.forward(2);
                } else {
                    self.reader.forward(1);
                }
                Some('\n')
            }
            '\u{2028}' | '\u{2029}' => {
                self.reader.forward(1);
                Some(ch)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chomping {
    /// Default: keep the final break, drop trailing empty lines.
    Clip,
    /// `-`: drop the final break too.
    Strip,
    /// `+`: keep everything.
    Keep,
}

#[inline]
fn is_break(ch: char) -> bool {
    matches!(ch, '\r' | '\n' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

#[inline]
fn is_break_or_nul(ch: char) -> bool {
    ch == '\0' || is_break(ch)
}

#[inline]
fn is_blank_or_break_or_nul(ch: char) -> bool {
    matches!(ch, ' ' | '\t') || is_break_or_nul(ch)
}

#[inline]
fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

fn escape_replacement(ch: char) -> Option<char> {
    Some(match ch {
        '0' => '\0',
        'a' => '\x07',
        'b' => '\x08',
        't' | '\t' => '\t',
        'n' => '\n',
        'v' => '\x0b',
        'f' => '\x0c',
        'r' => '\r',
        'e' => '\x1b',
        ' ' => ' ',
        '"' => '"',
        '\\' => '\\',
        '/' => '/',
        'N' => '\u{85}',
        '_' => '\u{a0}',
        'L' => '\u{2028}',
        'P' => '\u{2029}',
        _ => return None,
    })
}

fn escape_code_width(ch: char) -> Option<usize> {
    match ch {
        'x' => Some(2),
        'u' => Some(4),
        'U' => Some(8),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Encoding;

    fn scan(source: &str) -> Vec<TokenKind> {
        let mut scanner = Scanner::from_str("test", source).unwrap();
        let mut kinds = Vec::new();
        while let Some(token) = scanner.get_token().unwrap() {
            kinds.push(token.kind);
        }
        kinds
    }

    fn scan_err(source: &str) -> ScanError {
        let mut scanner = Scanner::from_str("test", source).unwrap();
        loop {
            match scanner.get_token() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("expected a scan error for {source:?}"),
                Err(err) => return err,
            }
        }
    }

    fn plain(value: &str) -> TokenKind {
        TokenKind::Scalar {
            value: value.to_string(),
            plain: true,
            style: ScalarStyle::Plain,
        }
    }

    #[test]
    fn test_flow_sequence_tokens() {
        let kinds = scan("[1, 2, 3]");
        assert_eq!(
            kinds,
            vec![
                TokenKind::StreamStart(Encoding::Utf8),
                TokenKind::FlowSequenceStart,
                plain("1"),
                TokenKind::FlowEntry,
                plain("2"),
                TokenKind::FlowEntry,
                plain("3"),
                TokenKind::FlowSequenceEnd,
                TokenKind::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_block_mapping_tokens() {
        let kinds = scan("a: 1\nb:\n  c: 3\n");
        assert_eq!(
            kinds,
            vec![
                TokenKind::StreamStart(Encoding::Utf8),
                TokenKind::BlockMappingStart,
                TokenKind::Key,
                plain("a"),
                TokenKind::Value,
                plain("1"),
                TokenKind::Key,
                plain("b"),
                TokenKind::Value,
                TokenKind::BlockMappingStart,
                TokenKind::Key,
                plain("c"),
                TokenKind::Value,
                plain("3"),
                TokenKind::BlockEnd,
                TokenKind::BlockEnd,
                TokenKind::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_block_sequence_tokens() {
        let kinds = scan("- a\n- b\n");
        assert_eq!(
            kinds,
            vec![
                TokenKind::StreamStart(Encoding::Utf8),
                TokenKind::BlockSequenceStart,
                TokenKind::BlockEntry,
                plain("a"),
                TokenKind::BlockEntry,
                plain("b"),
                TokenKind::BlockEnd,
                TokenKind::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_sequence_at_mapping_indent() {
        // The special-case rule: `- ` may sit at the same column as the key.
        // No BLOCK-SEQUENCE-START is opened; the parser recognizes the
        // indentless sequence from the bare entries.
        let kinds = scan("seq:\n- a\n- b\n");
        assert_eq!(
            kinds,
            vec![
                TokenKind::StreamStart(Encoding::Utf8),
                TokenKind::BlockMappingStart,
                TokenKind::Key,
                plain("seq"),
                TokenKind::Value,
                TokenKind::BlockEntry,
                plain("a"),
                TokenKind::BlockEntry,
                plain("b"),
                TokenKind::BlockEnd,
                TokenKind::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_document_markers() {
        let kinds = scan("---\na\n...\n");
        assert_eq!(
            kinds,
            vec![
                TokenKind::StreamStart(Encoding::Utf8),
                TokenKind::DocumentStart,
                plain("a"),
                TokenKind::DocumentEnd,
                TokenKind::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_directive_tokens() {
        let kinds = scan("%YAML 1.1\n%TAG !e! tag:example.com,2000:\n---\nx\n");
        assert_eq!(
            kinds[1],
            TokenKind::Directive(Directive::Version { major: 1, minor: 1 })
        );
        assert_eq!(
            kinds[2],
            TokenKind::Directive(Directive::Tag {
                handle: "!e!".to_string(),
                prefix: "tag:example.com,2000:".to_string(),
            })
        );
        assert_eq!(kinds[3], TokenKind::DocumentStart);
    }

    #[test]
    fn test_anchor_alias_tag_tokens() {
        let kinds = scan("- &a !!str x\n- *a\n");
        assert!(kinds.contains(&TokenKind::Anchor("a".to_string())));
        assert!(kinds.contains(&TokenKind::Tag {
            handle: Some("!!".to_string()),
            suffix: "str".to_string(),
        }));
        assert!(kinds.contains(&TokenKind::Alias("a".to_string())));
    }

    #[test]
    fn test_verbatim_tag() {
        let kinds = scan("!<tag:yaml.org,2002:int> 3");
        assert_eq!(
            kinds[1],
            TokenKind::Tag {
                handle: None,
                suffix: "tag:yaml.org,2002:int".to_string(),
            }
        );
    }

    #[test]
    fn test_single_quoted_escaping() {
        let kinds = scan("'it''s'");
        assert_eq!(
            kinds[1],
            TokenKind::Scalar {
                value: "it's".to_string(),
                plain: false,
                style: ScalarStyle::SingleQuoted,
            }
        );
    }

    #[test]
    fn test_double_quoted_escapes() {
        let kinds = scan(r#""a\tb\x41\u00e9\n""#);
        assert_eq!(
            kinds[1],
            TokenKind::Scalar {
                value: "a\tbA\u{e9}\n".to_string(),
                plain: false,
                style: ScalarStyle::DoubleQuoted,
            }
        );
    }

    #[test]
    fn test_double_quoted_line_folding() {
        let kinds = scan("\"a\n b\"");
        assert_eq!(
            kinds[1],
            TokenKind::Scalar {
                value: "a b".to_string(),
                plain: false,
                style: ScalarStyle::DoubleQuoted,
            }
        );
    }

    #[test]
    fn test_literal_block_scalar() {
        let kinds = scan("|\n  a\n  b\n");
        assert_eq!(
            kinds[1],
            TokenKind::Scalar {
                value: "a\nb\n".to_string(),
                plain: false,
                style: ScalarStyle::Literal,
            }
        );
    }

    #[test]
    fn test_literal_chomping() {
        let strip = scan("|-\n  a\n\n");
        assert!(matches!(&strip[1], TokenKind::Scalar { value, .. } if value == "a"));
        let keep = scan("|+\n  a\n\n");
        assert!(matches!(&keep[1], TokenKind::Scalar { value, .. } if value == "a\n\n"));
    }

    #[test]
    fn test_folded_block_scalar() {
        let kinds = scan(">\n  a\n  b\n\n  c\n");
        assert_eq!(
            kinds[1],
            TokenKind::Scalar {
                value: "a b\nc\n".to_string(),
                plain: false,
                style: ScalarStyle::Folded,
            }
        );
    }

    #[test]
    fn test_folded_more_indented_lines_keep_breaks() {
        let kinds = scan(">\n  a\n    b\n  c\n");
        assert_eq!(
            kinds[1],
            TokenKind::Scalar {
                value: "a\n  b\nc\n".to_string(),
                plain: false,
                style: ScalarStyle::Folded,
            }
        );
    }

    #[test]
    fn test_multiline_plain_folds() {
        let kinds = scan("a\n b\n");
        assert_eq!(kinds[1], plain("a b"));
    }

    #[test]
    fn test_plain_stops_at_comment() {
        let kinds = scan("value # trailing\n");
        assert_eq!(kinds[1], plain("value"));
    }

    #[test]
    fn test_flow_mapping_simple_key() {
        let kinds = scan("{a: 1}");
        assert_eq!(
            kinds,
            vec![
                TokenKind::StreamStart(Encoding::Utf8),
                TokenKind::FlowMappingStart,
                TokenKind::Key,
                plain("a"),
                TokenKind::Value,
                plain("1"),
                TokenKind::FlowMappingEnd,
                TokenKind::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_unterminated_double_quote_error_marks() {
        let err = scan_err("key: \"abc");
        assert_eq!(err.context.as_deref(), Some("while scanning a quoted scalar"));
        let context_mark = err.context_mark.unwrap();
        assert_eq!((context_mark.line, context_mark.column), (0, 5));
        assert_eq!(err.problem, "found unexpected end of stream");
        assert_eq!(err.problem_mark.index, 9);
    }

    #[test]
    fn test_tab_cannot_start_token() {
        let err = scan_err("a:\n\t- b\n");
        assert!(err.problem.contains("cannot start any token"));
    }

    #[test]
    fn test_value_after_value_is_rejected() {
        // `b` cannot start a simple key right after `a:`, so the second
        // `:` has nothing to attach to.
        let err = scan_err("a: b: c\n");
        assert_eq!(err.problem, "mapping values are not allowed here");
    }

    #[test]
    fn test_bad_escape_is_rejected() {
        let err = scan_err("\"\\q\"");
        assert!(err.problem.contains("unknown escape character"));
    }

    #[test]
    fn test_zero_block_indent_is_rejected() {
        let err = scan_err("|0\n");
        assert!(err.problem.contains("range 1-9"));
    }

    #[test]
    fn test_simple_key_spanning_lines_is_not_a_key() {
        // `a` alone on its line never gets a KEY token.
        let kinds = scan("[a\n: b]");
        assert!(!kinds.contains(&TokenKind::Key));
    }
}
