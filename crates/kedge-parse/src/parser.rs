//! Pull-based event parser for YAML 1.1.
//!
//! A state machine over the grammar
//!
//! ```text
//! stream   ::= STREAM-START implicit_document? explicit_document* STREAM-END
//! document ::= (DIRECTIVE* DOCUMENT-START)? node DOCUMENT-END?
//! node     ::= ALIAS | properties? (scalar | block_collection | flow_collection)
//! ```
//!
//! driven one token at a time with a single event of lookahead. Balanced
//! start/end events are guaranteed: every collection start produced here is
//! closed before its parent state resumes.

use std::collections::HashMap;

use tracing::trace;

use crate::{
    Directive, Event, EventKind, Mark, ParseError, ReaderError, ScalarStyle, Scanner, Token,
    TokenKind,
};

/// Parser states, one per grammar position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
}

/// Pull-based event parser over a token stream.
pub struct Parser {
    scanner: Scanner,
    state: Option<State>,
    states: Vec<State>,
    /// Start marks of the open collections, for error context.
    marks: Vec<Mark>,
    current_event: Option<Event>,
    yaml_version: Option<(u32, u32)>,
    tag_handles: HashMap<String, String>,
}

fn default_tag_handles() -> [(&'static str, &'static str); 2] {
    [("!", "!"), ("!!", "tag:yaml.org,2002:")]
}

impl Parser {
    /// Create a parser over the given scanner.
    pub fn new(scanner: Scanner) -> Self {
        Self {
            scanner,
            state: Some(State::StreamStart),
            states: Vec::new(),
            marks: Vec::new(),
            current_event: None,
            yaml_version: None,
            tag_handles: HashMap::new(),
        }
    }

    /// Create a parser directly from a string.
    pub fn from_str(source: &str) -> Result<Self, ReaderError> {
        Ok(Self::new(Scanner::from_str("<string>", source)?))
    }

    /// Look at the next event without consuming it.
    pub fn peek_event(&mut self) -> Result<Option<&Event>, ParseError> {
        if self.current_event.is_none() {
            self.current_event = self.produce()?;
        }
        Ok(self.current_event.as_ref())
    }

    /// Consume and return the next event.
    pub fn get_event(&mut self) -> Result<Option<Event>, ParseError> {
        if self.current_event.is_none() {
            self.current_event = self.produce()?;
        }
        let event = self.current_event.take();
        if let Some(event) = &event {
            trace!("event {}", event.kind.describe());
        }
        Ok(event)
    }

    /// Collect the remaining events into a vector.
    pub fn parse_to_vec(mut self) -> Result<Vec<Event>, ParseError> {
        let mut events = Vec::new();
        while let Some(event) = self.get_event()? {
            events.push(event);
        }
        Ok(events)
    }

    fn produce(&mut self) -> Result<Option<Event>, ParseError> {
        let Some(state) = self.state else {
            return Ok(None);
        };
        let event = match state {
            State::StreamStart => self.parse_stream_start()?,
            State::ImplicitDocumentStart => self.parse_implicit_document_start()?,
            State::DocumentStart => self.parse_document_start()?,
            State::DocumentContent => self.parse_document_content()?,
            State::DocumentEnd => self.parse_document_end()?,
            State::BlockNode => self.parse_node(true, false)?,
            State::BlockSequenceFirstEntry => self.parse_block_sequence_entry(true)?,
            State::BlockSequenceEntry => self.parse_block_sequence_entry(false)?,
            State::IndentlessSequenceEntry => self.parse_indentless_sequence_entry()?,
            State::BlockMappingFirstKey => self.parse_block_mapping_key(true)?,
            State::BlockMappingKey => self.parse_block_mapping_key(false)?,
            State::BlockMappingValue => self.parse_block_mapping_value()?,
            State::FlowSequenceFirstEntry => self.parse_flow_sequence_entry(true)?,
            State::FlowSequenceEntry => self.parse_flow_sequence_entry(false)?,
            State::FlowSequenceEntryMappingKey => self.parse_flow_sequence_entry_mapping_key()?,
            State::FlowSequenceEntryMappingValue => {
                self.parse_flow_sequence_entry_mapping_value()?
            }
            State::FlowSequenceEntryMappingEnd => self.parse_flow_sequence_entry_mapping_end()?,
            State::FlowMappingFirstKey => self.parse_flow_mapping_key(true)?,
            State::FlowMappingKey => self.parse_flow_mapping_key(false)?,
            State::FlowMappingValue => self.parse_flow_mapping_value()?,
            State::FlowMappingEmptyValue => self.parse_flow_mapping_empty_value()?,
        };
        Ok(Some(event))
    }

    // Token access.

    fn peek_token(&mut self) -> Result<&Token, ParseError> {
        match self.scanner.peek_token()? {
            Some(_) => {}
            None => {
                return Err(ParseError::new(
                    "unexpected end of the token stream",
                    Mark::synthetic(),
                ));
            }
        }
        Ok(self
            .scanner
            .peek_token()
            .expect("token was just peeked")
            .expect("token was just peeked"))
    }

    fn get_token(&mut self) -> Result<Token, ParseError> {
        match self.scanner.get_token()? {
            Some(token) => Ok(token),
            None => Err(ParseError::new(
                "unexpected end of the token stream",
                Mark::synthetic(),
            )),
        }
    }

    fn pop_state(&mut self) -> State {
        self.states.pop().expect("parser state stack underflow")
    }

    // Grammar productions.

    fn parse_stream_start(&mut self) -> Result<Event, ParseError> {
        let token = self.get_token()?;
        let TokenKind::StreamStart(encoding) = token.kind else {
            return Err(ParseError::new(
                format!("expected '<stream start>', but found {}", token.kind.describe()),
                token.start,
            ));
        };
        self.state = Some(State::ImplicitDocumentStart);
        Ok(Event::new(
            EventKind::StreamStart {
                encoding: Some(encoding),
            },
            token.start,
            token.end,
        ))
    }

    fn parse_implicit_document_start(&mut self) -> Result<Event, ParseError> {
        let starts_explicitly = matches!(
            self.peek_token()?.kind,
            TokenKind::Directive(_) | TokenKind::DocumentStart | TokenKind::StreamEnd
        );
        if starts_explicitly {
            return self.parse_document_start();
        }
        self.yaml_version = None;
        self.tag_handles = default_tag_handles()
            .iter()
            .map(|(h, p)| (h.to_string(), p.to_string()))
            .collect();
        let mark = self.peek_token()?.start.clone();
        self.states.push(State::DocumentEnd);
        self.state = Some(State::BlockNode);
        Ok(Event::new(
            EventKind::DocumentStart {
                explicit: false,
                version: None,
                tags: Vec::new(),
            },
            mark.clone(),
            mark,
        ))
    }

    fn parse_document_start(&mut self) -> Result<Event, ParseError> {
        while matches!(self.peek_token()?.kind, TokenKind::DocumentEnd) {
            self.get_token()?;
        }
        if matches!(self.peek_token()?.kind, TokenKind::StreamEnd) {
            let token = self.get_token()?;
            self.state = None;
            debug_assert!(self.states.is_empty());
            debug_assert!(self.marks.is_empty());
            return Ok(Event::new(EventKind::StreamEnd, token.start, token.end));
        }
        let start = self.peek_token()?.start.clone();
        let (version, tags) = self.process_directives()?;
        let token = self.get_token()?;
        if !matches!(token.kind, TokenKind::DocumentStart) {
            return Err(ParseError::new(
                format!(
                    "expected '<document start>', but found {}",
                    token.kind.describe()
                ),
                token.start,
            ));
        }
        self.states.push(State::DocumentEnd);
        self.state = Some(State::DocumentContent);
        Ok(Event::new(
            EventKind::DocumentStart {
                explicit: true,
                version,
                tags,
            },
            start,
            token.end,
        ))
    }

    fn parse_document_end(&mut self) -> Result<Event, ParseError> {
        let start = self.peek_token()?.start.clone();
        let mut end = start.clone();
        let mut explicit = false;
        if matches!(self.peek_token()?.kind, TokenKind::DocumentEnd) {
            let token = self.get_token()?;
            end = token.end;
            explicit = true;
        }
        self.state = Some(State::DocumentStart);
        Ok(Event::new(EventKind::DocumentEnd { explicit }, start, end))
    }

    fn parse_document_content(&mut self) -> Result<Event, ParseError> {
        let ends_here = matches!(
            self.peek_token()?.kind,
            TokenKind::Directive(_)
                | TokenKind::DocumentStart
                | TokenKind::DocumentEnd
                | TokenKind::StreamEnd
        );
        if ends_here {
            let mark = self.peek_token()?.start.clone();
            self.state = Some(self.pop_state());
            Ok(process_empty_scalar(mark))
        } else {
            self.parse_node(true, false)
        }
    }

    /// Validate and collect the `%YAML`/`%TAG` directives in front of a
    /// document. Directive state never leaks across document boundaries.
    fn process_directives(&mut self) -> Result<(Option<(u32, u32)>, Vec<(String, String)>), ParseError>
    {
        self.yaml_version = None;
        self.tag_handles.clear();
        while matches!(self.peek_token()?.kind, TokenKind::Directive(_)) {
            let token = self.get_token()?;
            let TokenKind::Directive(directive) = token.kind else {
                unreachable!("peeked a directive token");
            };
            match directive {
                Directive::Version { major, minor } => {
                    if self.yaml_version.is_some() {
                        return Err(ParseError::new("found duplicate YAML directive", token.start));
                    }
                    if major != 1 {
                        return Err(ParseError::new(
                            "found incompatible YAML document (version 1.* is required)",
                            token.start,
                        ));
                    }
                    self.yaml_version = Some((major, minor));
                }
                Directive::Tag { handle, prefix } => {
                    if self.tag_handles.contains_key(&handle) {
                        return Err(ParseError::new(
                            format!("duplicate tag handle {handle:?}"),
                            token.start,
                        ));
                    }
                    self.tag_handles.insert(handle, prefix);
                }
                Directive::Reserved { .. } => {
                    // Unknown directives are carried by the scanner and
                    // skipped here.
                }
            }
        }
        let mut declared: Vec<(String, String)> = self
            .tag_handles
            .iter()
            .map(|(h, p)| (h.clone(), p.clone()))
            .collect();
        declared.sort();
        for (handle, prefix) in default_tag_handles() {
            self.tag_handles
                .entry(handle.to_string())
                .or_insert_with(|| prefix.to_string());
        }
        Ok((self.yaml_version, declared))
    }

    /// Parse a node: an alias, or optional anchor/tag properties followed by
    /// a scalar or collection. `block` allows block collections;
    /// `indentless` additionally allows a sequence introduced by bare `- `
    /// entries at the enclosing mapping's indentation.
    fn parse_node(&mut self, block: bool, indentless: bool) -> Result<Event, ParseError> {
        if matches!(self.peek_token()?.kind, TokenKind::Alias(_)) {
            let token = self.get_token()?;
            let TokenKind::Alias(anchor) = token.kind else {
                unreachable!("peeked an alias token");
            };
            self.state = Some(self.pop_state());
            return Ok(Event::new(
                EventKind::Alias { anchor },
                token.start,
                token.end,
            ));
        }

        let mut anchor: Option<String> = None;
        let mut tag_value: Option<(Option<String>, String)> = None;
        let mut start_mark: Option<Mark> = None;
        let mut end_mark: Option<Mark> = None;
        let mut tag_mark: Option<Mark> = None;

        // Anchor and tag may appear in either order; both attach to the
        // node that follows.
        if matches!(self.peek_token()?.kind, TokenKind::Anchor(_)) {
            let token = self.get_token()?;
            let TokenKind::Anchor(value) = token.kind else {
                unreachable!("peeked an anchor token");
            };
            anchor = Some(value);
            start_mark = Some(token.start);
            end_mark = Some(token.end);
            if matches!(self.peek_token()?.kind, TokenKind::Tag { .. }) {
                let token = self.get_token()?;
                let TokenKind::Tag { handle, suffix } = token.kind else {
                    unreachable!("peeked a tag token");
                };
                tag_mark = Some(token.start);
                end_mark = Some(token.end);
                tag_value = Some((handle, suffix));
            }
        } else if matches!(self.peek_token()?.kind, TokenKind::Tag { .. }) {
            let token = self.get_token()?;
            let TokenKind::Tag { handle, suffix } = token.kind else {
                unreachable!("peeked a tag token");
            };
            start_mark = Some(token.start.clone());
            tag_mark = Some(token.start);
            end_mark = Some(token.end);
            tag_value = Some((handle, suffix));
            if matches!(self.peek_token()?.kind, TokenKind::Anchor(_)) {
                let token = self.get_token()?;
                let TokenKind::Anchor(value) = token.kind else {
                    unreachable!("peeked an anchor token");
                };
                anchor = Some(value);
                end_mark = Some(token.end);
            }
        }

        let tag: Option<String> = match tag_value {
            Some((Some(handle), suffix)) => match self.tag_handles.get(&handle) {
                Some(prefix) => Some(format!("{prefix}{suffix}")),
                None => {
                    return Err(ParseError::with_context(
                        "while parsing a node",
                        start_mark.expect("tag implies a start mark"),
                        format!("found undefined tag handle {handle:?}"),
                        tag_mark.expect("tag implies a tag mark"),
                    ));
                }
            },
            Some((None, suffix)) => Some(suffix),
            None => None,
        };

        let start_mark = match start_mark {
            Some(mark) => mark,
            None => self.peek_token()?.start.clone(),
        };
        let implicit = tag.is_none() || tag.as_deref() == Some("!");

        if indentless && matches!(self.peek_token()?.kind, TokenKind::BlockEntry) {
            let end = self.peek_token()?.end.clone();
            self.state = Some(State::IndentlessSequenceEntry);
            return Ok(Event::new(
                EventKind::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    flow_style: Some(false),
                },
                start_mark,
                end,
            ));
        }

        match &self.peek_token()?.kind {
            TokenKind::Scalar { .. } => {
                let token = self.get_token()?;
                let TokenKind::Scalar { value, plain, style } = token.kind else {
                    unreachable!("peeked a scalar token");
                };
                let implicit = if (plain && tag.is_none()) || tag.as_deref() == Some("!") {
                    (true, false)
                } else if tag.is_none() {
                    (false, true)
                } else {
                    (false, false)
                };
                self.state = Some(self.pop_state());
                Ok(Event::new(
                    EventKind::Scalar {
                        anchor,
                        tag,
                        implicit,
                        value,
                        style: Some(style),
                    },
                    start_mark,
                    token.end,
                ))
            }
            TokenKind::FlowSequenceStart => {
                let end = self.peek_token()?.end.clone();
                self.state = Some(State::FlowSequenceFirstEntry);
                Ok(Event::new(
                    EventKind::SequenceStart {
                        anchor,
                        tag,
                        implicit,
                        flow_style: Some(true),
                    },
                    start_mark,
                    end,
                ))
            }
            TokenKind::FlowMappingStart => {
                let end = self.peek_token()?.end.clone();
                self.state = Some(State::FlowMappingFirstKey);
                Ok(Event::new(
                    EventKind::MappingStart {
                        anchor,
                        tag,
                        implicit,
                        flow_style: Some(true),
                    },
                    start_mark,
                    end,
                ))
            }
            TokenKind::BlockSequenceStart if block => {
                let end = self.peek_token()?.start.clone();
                self.state = Some(State::BlockSequenceFirstEntry);
                Ok(Event::new(
                    EventKind::SequenceStart {
                        anchor,
                        tag,
                        implicit,
                        flow_style: Some(false),
                    },
                    start_mark,
                    end,
                ))
            }
            TokenKind::BlockMappingStart if block => {
                let end = self.peek_token()?.start.clone();
                self.state = Some(State::BlockMappingFirstKey);
                Ok(Event::new(
                    EventKind::MappingStart {
                        anchor,
                        tag,
                        implicit,
                        flow_style: Some(false),
                    },
                    start_mark,
                    end,
                ))
            }
            _ if anchor.is_some() || tag.is_some() => {
                // An anchor or tag with nothing after it stands for an
                // empty scalar.
                self.state = Some(self.pop_state());
                Ok(Event::new(
                    EventKind::Scalar {
                        anchor,
                        tag,
                        implicit: (implicit, false),
                        value: String::new(),
                        style: None,
                    },
                    start_mark.clone(),
                    end_mark.unwrap_or(start_mark),
                ))
            }
            _ => {
                let node = if block { "block node" } else { "flow node" };
                let token = self.peek_token()?;
                Err(ParseError::with_context(
                    format!("while parsing a {node}"),
                    start_mark,
                    format!(
                        "expected the node content, but found {}",
                        token.kind.describe()
                    ),
                    token.start.clone(),
                ))
            }
        }
    }

    fn parse_block_sequence_entry(&mut self, first: bool) -> Result<Event, ParseError> {
        if first {
            let token = self.get_token()?;
            self.marks.push(token.start);
        }
        if matches!(self.peek_token()?.kind, TokenKind::BlockEntry) {
            let token = self.get_token()?;
            if matches!(
                self.peek_token()?.kind,
                TokenKind::BlockEntry | TokenKind::BlockEnd
            ) {
                self.state = Some(State::BlockSequenceEntry);
                return Ok(process_empty_scalar(token.end));
            }
            self.states.push(State::BlockSequenceEntry);
            return self.parse_node(true, false);
        }
        if !matches!(self.peek_token()?.kind, TokenKind::BlockEnd) {
            let mark = self.marks.last().expect("open collection").clone();
            let token = self.peek_token()?;
            return Err(ParseError::with_context(
                "while parsing a block collection",
                mark,
                format!("expected <block end>, but found {}", token.kind.describe()),
                token.start.clone(),
            ));
        }
        let token = self.get_token()?;
        self.state = Some(self.pop_state());
        self.marks.pop();
        Ok(Event::new(EventKind::SequenceEnd, token.start, token.end))
    }

    fn parse_indentless_sequence_entry(&mut self) -> Result<Event, ParseError> {
        if matches!(self.peek_token()?.kind, TokenKind::BlockEntry) {
            let token = self.get_token()?;
            if matches!(
                self.peek_token()?.kind,
                TokenKind::BlockEntry | TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd
            ) {
                self.state = Some(State::IndentlessSequenceEntry);
                return Ok(process_empty_scalar(token.end));
            }
            self.states.push(State::IndentlessSequenceEntry);
            return self.parse_node(true, false);
        }
        let mark = self.peek_token()?.start.clone();
        self.state = Some(self.pop_state());
        Ok(Event::new(EventKind::SequenceEnd, mark.clone(), mark))
    }

    fn parse_block_mapping_key(&mut self, first: bool) -> Result<Event, ParseError> {
        if first {
            let token = self.get_token()?;
            self.marks.push(token.start);
        }
        if matches!(self.peek_token()?.kind, TokenKind::Key) {
            let token = self.get_token()?;
            if matches!(
                self.peek_token()?.kind,
                TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd
            ) {
                self.state = Some(State::BlockMappingValue);
                return Ok(process_empty_scalar(token.end));
            }
            self.states.push(State::BlockMappingValue);
            return self.parse_node(true, true);
        }
        if !matches!(self.peek_token()?.kind, TokenKind::BlockEnd) {
            let mark = self.marks.last().expect("open mapping").clone();
            let token = self.peek_token()?;
            return Err(ParseError::with_context(
                "while parsing a block mapping",
                mark,
                format!("expected <block end>, but found {}", token.kind.describe()),
                token.start.clone(),
            ));
        }
        let token = self.get_token()?;
        self.state = Some(self.pop_state());
        self.marks.pop();
        Ok(Event::new(EventKind::MappingEnd, token.start, token.end))
    }

    fn parse_block_mapping_value(&mut self) -> Result<Event, ParseError> {
        if matches!(self.peek_token()?.kind, TokenKind::Value) {
            let token = self.get_token()?;
            if matches!(
                self.peek_token()?.kind,
                TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd
            ) {
                self.state = Some(State::BlockMappingKey);
                return Ok(process_empty_scalar(token.end));
            }
            self.states.push(State::BlockMappingKey);
            return self.parse_node(true, true);
        }
        // A key with no `:` at all gets a null value.
        let mark = self.peek_token()?.start.clone();
        self.state = Some(State::BlockMappingKey);
        Ok(process_empty_scalar(mark))
    }

    fn parse_flow_sequence_entry(&mut self, first: bool) -> Result<Event, ParseError> {
        if first {
            let token = self.get_token()?;
            self.marks.push(token.start);
        }
        if !matches!(self.peek_token()?.kind, TokenKind::FlowSequenceEnd) {
            if !first {
                if matches!(self.peek_token()?.kind, TokenKind::FlowEntry) {
                    self.get_token()?;
                } else {
                    let mark = self.marks.last().expect("open sequence").clone();
                    let token = self.peek_token()?;
                    return Err(ParseError::with_context(
                        "while parsing a flow sequence",
                        mark,
                        format!("expected ',' or ']', but got {}", token.kind.describe()),
                        token.start.clone(),
                    ));
                }
            }
            if matches!(self.peek_token()?.kind, TokenKind::Key) {
                // `[? a: b]` - a single-pair mapping inside the sequence.
                let token = self.peek_token()?;
                let (start, end) = (token.start.clone(), token.end.clone());
                self.state = Some(State::FlowSequenceEntryMappingKey);
                return Ok(Event::new(
                    EventKind::MappingStart {
                        anchor: None,
                        tag: None,
                        implicit: true,
                        flow_style: Some(true),
                    },
                    start,
                    end,
                ));
            } else if !matches!(self.peek_token()?.kind, TokenKind::FlowSequenceEnd) {
                self.states.push(State::FlowSequenceEntry);
                return self.parse_node(false, false);
            }
        }
        let token = self.get_token()?;
        self.state = Some(self.pop_state());
        self.marks.pop();
        Ok(Event::new(EventKind::SequenceEnd, token.start, token.end))
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> Result<Event, ParseError> {
        let token = self.get_token()?;
        if matches!(
            self.peek_token()?.kind,
            TokenKind::Value | TokenKind::FlowEntry | TokenKind::FlowSequenceEnd
        ) {
            self.state = Some(State::FlowSequenceEntryMappingValue);
            return Ok(process_empty_scalar(token.end));
        }
        self.states.push(State::FlowSequenceEntryMappingValue);
        self.parse_node(false, false)
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> Result<Event, ParseError> {
        if matches!(self.peek_token()?.kind, TokenKind::Value) {
            let token = self.get_token()?;
            if matches!(
                self.peek_token()?.kind,
                TokenKind::FlowEntry | TokenKind::FlowSequenceEnd
            ) {
                self.state = Some(State::FlowSequenceEntryMappingEnd);
                return Ok(process_empty_scalar(token.end));
            }
            self.states.push(State::FlowSequenceEntryMappingEnd);
            return self.parse_node(false, false);
        }
        let mark = self.peek_token()?.start.clone();
        self.state = Some(State::FlowSequenceEntryMappingEnd);
        Ok(process_empty_scalar(mark))
    }

    fn parse_flow_sequence_entry_mapping_end(&mut self) -> Result<Event, ParseError> {
        let mark = self.peek_token()?.start.clone();
        self.state = Some(State::FlowSequenceEntry);
        Ok(Event::new(EventKind::MappingEnd, mark.clone(), mark))
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> Result<Event, ParseError> {
        if first {
            let token = self.get_token()?;
            self.marks.push(token.start);
        }
        if !matches!(self.peek_token()?.kind, TokenKind::FlowMappingEnd) {
            if !first {
                if matches!(self.peek_token()?.kind, TokenKind::FlowEntry) {
                    self.get_token()?;
                } else {
                    let mark = self.marks.last().expect("open mapping").clone();
                    let token = self.peek_token()?;
                    return Err(ParseError::with_context(
                        "while parsing a flow mapping",
                        mark,
                        format!("expected ',' or '}}', but got {}", token.kind.describe()),
                        token.start.clone(),
                    ));
                }
            }
            if matches!(self.peek_token()?.kind, TokenKind::Key) {
                let token = self.get_token()?;
                if matches!(
                    self.peek_token()?.kind,
                    TokenKind::Value | TokenKind::FlowEntry | TokenKind::FlowMappingEnd
                ) {
                    self.state = Some(State::FlowMappingValue);
                    return Ok(process_empty_scalar(token.end));
                }
                self.states.push(State::FlowMappingValue);
                return self.parse_node(false, false);
            } else if !matches!(self.peek_token()?.kind, TokenKind::FlowMappingEnd) {
                // `{a}` - an entry without an explicit key; the node is the
                // key and the value defaults to null.
                self.states.push(State::FlowMappingEmptyValue);
                return self.parse_node(false, false);
            }
        }
        let token = self.get_token()?;
        self.state = Some(self.pop_state());
        self.marks.pop();
        Ok(Event::new(EventKind::MappingEnd, token.start, token.end))
    }

    fn parse_flow_mapping_value(&mut self) -> Result<Event, ParseError> {
        if matches!(self.peek_token()?.kind, TokenKind::Value) {
            let token = self.get_token()?;
            if matches!(
                self.peek_token()?.kind,
                TokenKind::FlowEntry | TokenKind::FlowMappingEnd
            ) {
                self.state = Some(State::FlowMappingKey);
                return Ok(process_empty_scalar(token.end));
            }
            self.states.push(State::FlowMappingKey);
            return self.parse_node(false, false);
        }
        let mark = self.peek_token()?.start.clone();
        self.state = Some(State::FlowMappingKey);
        Ok(process_empty_scalar(mark))
    }

    fn parse_flow_mapping_empty_value(&mut self) -> Result<Event, ParseError> {
        let mark = self.peek_token()?.start.clone();
        self.state = Some(State::FlowMappingKey);
        Ok(process_empty_scalar(mark))
    }
}

/// A zero-width plain scalar standing in for an omitted key or value.
fn process_empty_scalar(mark: Mark) -> Event {
    Event::new(
        EventKind::Scalar {
            anchor: None,
            tag: None,
            implicit: (true, false),
            value: String::new(),
            style: Some(ScalarStyle::Plain),
        },
        mark.clone(),
        mark,
    )
}

impl Iterator for Parser {
    type Item = Result<Event, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.get_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => None,
            Err(err) => {
                // An error is fatal to the stream; stop producing.
                self.state = None;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests;
