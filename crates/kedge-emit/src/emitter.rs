//! Emitter: events in, YAML text out.
//!
//! A state machine driven one event at a time. A small event queue delays
//! processing where a decision needs lookahead: a document start needs to
//! know whether the document is empty, a collection start whether the
//! collection is, and a mapping key whether it fits the simple-key form.

use std::collections::VecDeque;
use std::fmt;

use tracing::trace;

use crate::scalar::{analyze_scalar, is_allowed_unicode, ScalarAnalysis};
use crate::{EmitOptions, Encoding, Event, EventKind, ScalarStyle};

/// An impossible formatting request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitError {
    pub problem: String,
}

impl EmitError {
    pub(crate) fn new(problem: impl Into<String>) -> Self {
        Self {
            problem: problem.into(),
        }
    }
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.problem)
    }
}

impl std::error::Error for EmitError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StreamStart,
    FirstDocumentStart,
    DocumentStart,
    DocumentRoot,
    DocumentEnd,
    Nothing,
    FlowSequenceFirstItem,
    FlowSequenceItem,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingSimpleValue,
    FlowMappingValue,
    BlockSequenceFirstItem,
    BlockSequenceItem,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingSimpleValue,
    BlockMappingValue,
}

/// Renders an event stream as YAML text.
pub struct Emitter {
    opts: EmitOptions,
    out: String,

    state: State,
    states: Vec<State>,
    events: VecDeque<Event>,

    indents: Vec<Option<usize>>,
    indent: Option<usize>,
    flow_level: usize,

    root_context: bool,
    mapping_context: bool,
    simple_key_context: bool,

    line: usize,
    column: usize,
    whitespace: bool,
    indention: bool,
    /// A plain scalar at the document root leaves the document "open":
    /// a following document must be introduced by an explicit marker.
    open_ended: bool,

    encoding: Option<Encoding>,
    /// Known tag prefixes, as (prefix, handle) pairs.
    tag_prefixes: Vec<(String, String)>,

    prepared_anchor: Option<String>,
    prepared_tag: Option<String>,
    analysis: Option<ScalarAnalysis>,
    style: Option<ScalarStyle>,

    best_indent: usize,
    best_width: usize,
}

impl Emitter {
    /// Create an emitter with the given options.
    pub fn new(opts: EmitOptions) -> Self {
        let best_indent = opts.best_indent();
        let best_width = opts.best_width();
        let encoding = opts.encoding;
        Self {
            opts,
            out: String::new(),
            state: State::StreamStart,
            states: Vec::new(),
            events: VecDeque::new(),
            indents: Vec::new(),
            indent: None,
            flow_level: 0,
            root_context: false,
            mapping_context: false,
            simple_key_context: false,
            line: 0,
            column: 0,
            whitespace: true,
            indention: true,
            open_ended: false,
            encoding,
            tag_prefixes: Vec::new(),
            prepared_anchor: None,
            prepared_tag: None,
            analysis: None,
            style: None,
            best_indent,
            best_width,
        }
    }

    /// The options this emitter was built with.
    pub fn options(&self) -> &EmitOptions {
        &self.opts
    }

    /// Feed one event. Output is produced as soon as enough lookahead is
    /// available.
    pub fn emit(&mut self, event: Event) -> Result<(), EmitError> {
        trace!("emit {}", event.kind.describe());
        self.events.push_back(event);
        while !self.need_more_events() {
            let event = self.events.pop_front().expect("queue checked non-empty");
            self.run_state(&event)?;
        }
        Ok(())
    }

    /// The emitted text.
    pub fn into_string(self) -> String {
        self.out
    }

    /// The emitted bytes in the configured encoding, with a BOM for the
    /// UTF-16 encodings.
    pub fn finish(self) -> Vec<u8> {
        match self.encoding {
            None | Some(Encoding::Utf8) => self.out.into_bytes(),
            Some(Encoding::Utf16Le) => {
                let mut bytes = vec![0xff, 0xfe];
                for unit in self.out.encode_utf16() {
                    bytes.extend_from_slice(&unit.to_le_bytes());
                }
                bytes
            }
            Some(Encoding::Utf16Be) => {
                let mut bytes = vec![0xfe, 0xff];
                for unit in self.out.encode_utf16() {
                    bytes.extend_from_slice(&unit.to_be_bytes());
                }
                bytes
            }
        }
    }

    // Lookahead.

    fn need_more_events(&self) -> bool {
        let Some(event) = self.events.front() else {
            return true;
        };
        match event.kind {
            EventKind::DocumentStart { .. } => self.need_events(1),
            EventKind::SequenceStart { .. } => self.need_events(2),
            EventKind::MappingStart { .. } => self.need_events(3),
            _ => false,
        }
    }

    fn need_events(&self, count: usize) -> bool {
        let mut level: i64 = 0;
        for event in self.events.iter().skip(1) {
            match event.kind {
                EventKind::DocumentStart { .. }
                | EventKind::SequenceStart { .. }
                | EventKind::MappingStart { .. } => level += 1,
                EventKind::DocumentEnd { .. }
                | EventKind::SequenceEnd
                | EventKind::MappingEnd => level -= 1,
                EventKind::StreamEnd => level = -1,
                _ => {}
            }
            if level < 0 {
                return false;
            }
        }
        self.events.len() < count + 1
    }

    fn run_state(&mut self, event: &Event) -> Result<(), EmitError> {
        match self.state {
            State::StreamStart => self.expect_stream_start(event),
            State::FirstDocumentStart => self.expect_document_start(event, true),
            State::DocumentStart => self.expect_document_start(event, false),
            State::DocumentRoot => self.expect_document_root(event),
            State::DocumentEnd => self.expect_document_end(event),
            State::Nothing => Err(EmitError::new(format!(
                "expected nothing, but got {}",
                event.kind.describe()
            ))),
            State::FlowSequenceFirstItem => self.expect_flow_sequence_item(event, true),
            State::FlowSequenceItem => self.expect_flow_sequence_item(event, false),
            State::FlowMappingFirstKey => self.expect_flow_mapping_key(event, true),
            State::FlowMappingKey => self.expect_flow_mapping_key(event, false),
            State::FlowMappingSimpleValue => self.expect_flow_mapping_simple_value(event),
            State::FlowMappingValue => self.expect_flow_mapping_value(event),
            State::BlockSequenceFirstItem => self.expect_block_sequence_item(event, true),
            State::BlockSequenceItem => self.expect_block_sequence_item(event, false),
            State::BlockMappingFirstKey => self.expect_block_mapping_key(event, true),
            State::BlockMappingKey => self.expect_block_mapping_key(event, false),
            State::BlockMappingSimpleValue => self.expect_block_mapping_simple_value(event),
            State::BlockMappingValue => self.expect_block_mapping_value(event),
        }
    }

    fn pop_state(&mut self) -> State {
        self.states.pop().expect("emitter state stack underflow")
    }

    // Stream and document states.

    fn expect_stream_start(&mut self, event: &Event) -> Result<(), EmitError> {
        let EventKind::StreamStart { encoding } = &event.kind else {
            return Err(EmitError::new(format!(
                "expected StreamStartEvent, but got {}",
                event.kind.describe()
            )));
        };
        if self.encoding.is_none() {
            self.encoding = *encoding;
        }
        self.state = State::FirstDocumentStart;
        Ok(())
    }

    fn expect_document_start(&mut self, event: &Event, first: bool) -> Result<(), EmitError> {
        match &event.kind {
            EventKind::DocumentStart {
                explicit,
                version,
                tags,
            } => {
                let version = (*version).or(self.opts.version);
                let explicit = *explicit || self.opts.explicit_start;
                if (version.is_some() || !tags.is_empty()) && self.open_ended {
                    self.write_indicator("...", true, false, false);
                    self.write_indent();
                }
                if let Some(version) = version {
                    let text = prepare_version(version)?;
                    self.write_version_directive(&text);
                }
                self.tag_prefixes = vec![
                    ("!".to_string(), "!".to_string()),
                    ("tag:yaml.org,2002:".to_string(), "!!".to_string()),
                ];
                let mut directives: Vec<(String, String)> = tags.clone();
                for (handle, prefix) in &self.opts.tags {
                    if !directives.iter().any(|(h, _)| h == handle) {
                        directives.push((handle.clone(), prefix.clone()));
                    }
                }
                directives.sort();
                let has_directives = !directives.is_empty();
                for (handle, prefix) in directives {
                    prepare_tag_handle(&handle)?;
                    prepare_tag_prefix(&prefix)?;
                    self.tag_prefixes.push((prefix.clone(), handle.clone()));
                    self.write_tag_directive(&handle, &prefix);
                }
                let implicit = first
                    && !explicit
                    && !self.opts.canonical
                    && version.is_none()
                    && !has_directives
                    && !self.check_empty_document(event);
                if !implicit {
                    self.write_indent();
                    self.write_indicator("---", true, false, false);
                    if self.opts.canonical {
                        self.write_indent();
                    }
                }
                self.state = State::DocumentRoot;
                Ok(())
            }
            EventKind::StreamEnd => {
                if self.open_ended {
                    self.write_indicator("...", true, false, false);
                    self.write_indent();
                }
                self.state = State::Nothing;
                Ok(())
            }
            other => Err(EmitError::new(format!(
                "expected DocumentStartEvent, but got {}",
                other.describe()
            ))),
        }
    }

    fn expect_document_root(&mut self, event: &Event) -> Result<(), EmitError> {
        self.states.push(State::DocumentEnd);
        self.expect_node(event, true, false, false)
    }

    fn expect_document_end(&mut self, event: &Event) -> Result<(), EmitError> {
        let EventKind::DocumentEnd { explicit } = &event.kind else {
            return Err(EmitError::new(format!(
                "expected DocumentEndEvent, but got {}",
                event.kind.describe()
            )));
        };
        self.write_indent();
        if *explicit || self.opts.explicit_end {
            self.write_indicator("...", true, false, false);
            self.write_indent();
            self.open_ended = false;
        }
        self.state = State::DocumentStart;
        Ok(())
    }

    // Node states.

    fn expect_node(
        &mut self,
        event: &Event,
        root: bool,
        mapping: bool,
        simple_key: bool,
    ) -> Result<(), EmitError> {
        self.root_context = root;
        self.mapping_context = mapping;
        self.simple_key_context = simple_key;
        match &event.kind {
            EventKind::Alias { .. } => self.expect_alias(event),
            EventKind::Scalar { .. } => {
                self.process_anchor(event, "&")?;
                self.process_tag(event)?;
                self.expect_scalar(event)
            }
            EventKind::SequenceStart { flow_style, .. } => {
                self.process_anchor(event, "&")?;
                self.process_tag(event)?;
                let flow = (*flow_style).or(self.opts.default_flow_style).unwrap_or(false);
                if self.flow_level > 0
                    || self.opts.canonical
                    || flow
                    || self.check_empty_sequence(event)
                {
                    self.expect_flow_sequence();
                } else {
                    self.expect_block_sequence();
                }
                Ok(())
            }
            EventKind::MappingStart { flow_style, .. } => {
                self.process_anchor(event, "&")?;
                self.process_tag(event)?;
                let flow = (*flow_style).or(self.opts.default_flow_style).unwrap_or(false);
                if self.flow_level > 0
                    || self.opts.canonical
                    || flow
                    || self.check_empty_mapping(event)
                {
                    self.expect_flow_mapping();
                } else {
                    self.expect_block_mapping();
                }
                Ok(())
            }
            other => Err(EmitError::new(format!(
                "expected NodeEvent, but got {}",
                other.describe()
            ))),
        }
    }

    fn expect_alias(&mut self, event: &Event) -> Result<(), EmitError> {
        let EventKind::Alias { anchor } = &event.kind else {
            unreachable!("checked by caller");
        };
        if anchor.is_empty() {
            return Err(EmitError::new("anchor is not specified for alias"));
        }
        self.process_anchor(event, "*")?;
        self.state = self.pop_state();
        Ok(())
    }

    fn expect_scalar(&mut self, event: &Event) -> Result<(), EmitError> {
        self.increase_indent(true, false);
        self.process_scalar(event)?;
        self.indent = self.indents.pop().expect("matching indent");
        self.state = self.pop_state();
        Ok(())
    }

    // Flow sequence.

    fn expect_flow_sequence(&mut self) {
        self.write_indicator("[", true, true, false);
        self.flow_level += 1;
        self.increase_indent(true, false);
        self.state = State::FlowSequenceFirstItem;
    }

    fn expect_flow_sequence_item(&mut self, event: &Event, first: bool) -> Result<(), EmitError> {
        if matches!(event.kind, EventKind::SequenceEnd) {
            self.indent = self.indents.pop().expect("matching indent");
            self.flow_level -= 1;
            if !first && self.opts.canonical {
                self.write_indicator(",", false, false, false);
                self.write_indent();
            }
            self.write_indicator("]", false, false, false);
            self.state = self.pop_state();
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false);
        }
        if self.opts.canonical || self.column > self.best_width {
            self.write_indent();
        }
        self.states.push(State::FlowSequenceItem);
        self.expect_node(event, false, false, false)
    }

    // Flow mapping.

    fn expect_flow_mapping(&mut self) {
        self.write_indicator("{", true, true, false);
        self.flow_level += 1;
        self.increase_indent(true, false);
        self.state = State::FlowMappingFirstKey;
    }

    fn expect_flow_mapping_key(&mut self, event: &Event, first: bool) -> Result<(), EmitError> {
        if matches!(event.kind, EventKind::MappingEnd) {
            self.indent = self.indents.pop().expect("matching indent");
            self.flow_level -= 1;
            if !first && self.opts.canonical {
                self.write_indicator(",", false, false, false);
                self.write_indent();
            }
            self.write_indicator("}", false, false, false);
            self.state = self.pop_state();
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false);
        }
        if self.opts.canonical || self.column > self.best_width {
            self.write_indent();
        }
        if !self.opts.canonical && self.check_simple_key(event) {
            self.states.push(State::FlowMappingSimpleValue);
            self.expect_node(event, false, true, true)
        } else {
            self.write_indicator("?", true, false, false);
            self.states.push(State::FlowMappingValue);
            self.expect_node(event, false, true, false)
        }
    }

    fn expect_flow_mapping_simple_value(&mut self, event: &Event) -> Result<(), EmitError> {
        self.write_indicator(":", false, false, false);
        self.states.push(State::FlowMappingKey);
        self.expect_node(event, false, true, false)
    }

    fn expect_flow_mapping_value(&mut self, event: &Event) -> Result<(), EmitError> {
        if self.opts.canonical || self.column > self.best_width {
            self.write_indent();
        }
        self.write_indicator(":", true, false, false);
        self.states.push(State::FlowMappingKey);
        self.expect_node(event, false, true, false)
    }

    // Block sequence.

    fn expect_block_sequence(&mut self) {
        let indentless = self.mapping_context && !self.indention;
        self.increase_indent(false, indentless);
        self.state = State::BlockSequenceFirstItem;
    }

    fn expect_block_sequence_item(&mut self, event: &Event, first: bool) -> Result<(), EmitError> {
        if !first && matches!(event.kind, EventKind::SequenceEnd) {
            self.indent = self.indents.pop().expect("matching indent");
            self.state = self.pop_state();
            return Ok(());
        }
        self.write_indent();
        self.write_indicator("-", true, false, true);
        self.states.push(State::BlockSequenceItem);
        self.expect_node(event, false, false, false)
    }

    // Block mapping.

    fn expect_block_mapping(&mut self) {
        self.increase_indent(false, false);
        self.state = State::BlockMappingFirstKey;
    }

    fn expect_block_mapping_key(&mut self, event: &Event, first: bool) -> Result<(), EmitError> {
        if !first && matches!(event.kind, EventKind::MappingEnd) {
            self.indent = self.indents.pop().expect("matching indent");
            self.state = self.pop_state();
            return Ok(());
        }
        self.write_indent();
        if self.check_simple_key(event) {
            self.states.push(State::BlockMappingSimpleValue);
            self.expect_node(event, false, true, true)
        } else {
            self.write_indicator("?", true, false, true);
            self.states.push(State::BlockMappingValue);
            self.expect_node(event, false, true, false)
        }
    }

    fn expect_block_mapping_simple_value(&mut self, event: &Event) -> Result<(), EmitError> {
        self.write_indicator(":", false, false, false);
        self.states.push(State::BlockMappingKey);
        self.expect_node(event, false, true, false)
    }

    fn expect_block_mapping_value(&mut self, event: &Event) -> Result<(), EmitError> {
        self.write_indent();
        self.write_indicator(":", true, false, true);
        self.states.push(State::BlockMappingKey);
        self.expect_node(event, false, true, false)
    }

    // Lookahead checks.

    fn check_empty_sequence(&self, event: &Event) -> bool {
        matches!(event.kind, EventKind::SequenceStart { .. })
            && matches!(
                self.events.front().map(|e| &e.kind),
                Some(EventKind::SequenceEnd)
            )
    }

    fn check_empty_mapping(&self, event: &Event) -> bool {
        matches!(event.kind, EventKind::MappingStart { .. })
            && matches!(
                self.events.front().map(|e| &e.kind),
                Some(EventKind::MappingEnd)
            )
    }

    fn check_empty_document(&self, event: &Event) -> bool {
        if !matches!(event.kind, EventKind::DocumentStart { .. }) {
            return false;
        }
        match self.events.front().map(|e| &e.kind) {
            Some(EventKind::Scalar {
                anchor: None,
                tag: None,
                implicit,
                value,
                ..
            }) => (implicit.0 || implicit.1) && value.is_empty(),
            _ => false,
        }
    }

    fn check_simple_key(&mut self, event: &Event) -> bool {
        let mut length = 0;
        if let Some(anchor) = event.kind.anchor() {
            if self.prepared_anchor.is_none() {
                self.prepared_anchor = prepare_anchor(anchor).ok();
            }
            length += self
                .prepared_anchor
                .as_ref()
                .map(|a| a.chars().count())
                .unwrap_or(0);
        }
        let tag = match &event.kind {
            EventKind::Scalar { tag, .. }
            | EventKind::SequenceStart { tag, .. }
            | EventKind::MappingStart { tag, .. } => tag.as_deref(),
            _ => None,
        };
        if let Some(tag) = tag {
            if self.prepared_tag.is_none() {
                self.prepared_tag = self.prepare_tag(tag).ok();
            }
            length += self
                .prepared_tag
                .as_ref()
                .map(|t| t.chars().count())
                .unwrap_or(0);
        }
        if let EventKind::Scalar { value, .. } = &event.kind {
            if self.analysis.is_none() {
                self.analysis = Some(analyze_scalar(value, self.opts.allow_unicode));
            }
            length += self
                .analysis
                .as_ref()
                .map(|a| a.scalar.chars().count())
                .unwrap_or(0);
        }
        length < 128
            && (matches!(event.kind, EventKind::Alias { .. })
                || (matches!(event.kind, EventKind::Scalar { .. })
                    && self
                        .analysis
                        .as_ref()
                        .is_some_and(|a| !a.empty && !a.multiline))
                || self.check_empty_sequence(event)
                || self.check_empty_mapping(event))
    }

    // Anchor, tag, and scalar processing.

    fn process_anchor(&mut self, event: &Event, indicator: &str) -> Result<(), EmitError> {
        let anchor = match &event.kind {
            EventKind::Alias { anchor } => Some(anchor.as_str()),
            other => other.anchor(),
        };
        let Some(anchor) = anchor else {
            self.prepared_anchor = None;
            return Ok(());
        };
        if self.prepared_anchor.is_none() {
            self.prepared_anchor = Some(prepare_anchor(anchor)?);
        }
        if let Some(prepared) = self.prepared_anchor.take() {
            let text = format!("{indicator}{prepared}");
            self.write_indicator(&text, true, false, false);
        }
        Ok(())
    }

    fn process_tag(&mut self, event: &Event) -> Result<(), EmitError> {
        let mut tag: Option<String>;
        match &event.kind {
            EventKind::Scalar { tag: t, implicit, .. } => {
                tag = t.clone();
                if self.style.is_none() {
                    self.style = Some(self.choose_scalar_style(event));
                }
                let style = self.style.expect("style chosen above");
                if (!self.opts.canonical || tag.is_none())
                    && ((style == ScalarStyle::Plain && implicit.0)
                        || (style != ScalarStyle::Plain && implicit.1))
                {
                    self.prepared_tag = None;
                    return Ok(());
                }
                if implicit.0 && tag.is_none() {
                    tag = Some("!".to_string());
                    self.prepared_tag = None;
                }
            }
            EventKind::SequenceStart { tag: t, implicit, .. }
            | EventKind::MappingStart { tag: t, implicit, .. } => {
                tag = t.clone();
                if (!self.opts.canonical || tag.is_none()) && *implicit {
                    self.prepared_tag = None;
                    return Ok(());
                }
            }
            _ => unreachable!("checked by caller"),
        }
        let Some(tag) = tag else {
            return Err(EmitError::new("tag is not specified"));
        };
        if self.prepared_tag.is_none() {
            self.prepared_tag = Some(self.prepare_tag(&tag)?);
        }
        if let Some(prepared) = self.prepared_tag.take() {
            if !prepared.is_empty() {
                self.write_indicator(&prepared, true, false, false);
            }
        }
        Ok(())
    }

    fn choose_scalar_style(&mut self, event: &Event) -> ScalarStyle {
        let EventKind::Scalar {
            implicit,
            value,
            style,
            ..
        } = &event.kind
        else {
            unreachable!("checked by caller");
        };
        if self.analysis.is_none() {
            self.analysis = Some(analyze_scalar(value, self.opts.allow_unicode));
        }
        let analysis = self.analysis.as_ref().expect("analysis computed above");
        let style = (*style).or(self.opts.default_style);

        if style == Some(ScalarStyle::DoubleQuoted) || self.opts.canonical {
            return ScalarStyle::DoubleQuoted;
        }
        if matches!(style, None | Some(ScalarStyle::Plain)) && implicit.0 {
            let allowed = if self.flow_level > 0 {
                analysis.allow_flow_plain
            } else {
                analysis.allow_block_plain
            };
            if allowed && !(self.simple_key_context && (analysis.empty || analysis.multiline)) {
                return ScalarStyle::Plain;
            }
        }
        if let Some(block_style @ (ScalarStyle::Literal | ScalarStyle::Folded)) = style {
            if self.flow_level == 0 && !self.simple_key_context && analysis.allow_block {
                return block_style;
            }
        }
        if matches!(
            style,
            None | Some(ScalarStyle::Plain) | Some(ScalarStyle::SingleQuoted)
        ) && analysis.allow_single_quoted
            && !(self.simple_key_context && analysis.multiline)
        {
            return ScalarStyle::SingleQuoted;
        }
        ScalarStyle::DoubleQuoted
    }

    fn process_scalar(&mut self, event: &Event) -> Result<(), EmitError> {
        if self.style.is_none() {
            self.style = Some(self.choose_scalar_style(event));
        }
        let style = self.style.take().expect("style chosen above");
        let analysis = match self.analysis.take() {
            Some(analysis) => analysis,
            None => {
                let EventKind::Scalar { value, .. } = &event.kind else {
                    unreachable!("checked by caller");
                };
                analyze_scalar(value, self.opts.allow_unicode)
            }
        };
        let split = !self.simple_key_context;
        match style {
            ScalarStyle::DoubleQuoted => self.write_double_quoted(&analysis.scalar, split)?,
            ScalarStyle::SingleQuoted => self.write_single_quoted(&analysis.scalar, split),
            ScalarStyle::Folded => self.write_folded(&analysis.scalar),
            ScalarStyle::Literal => self.write_literal(&analysis.scalar),
            ScalarStyle::Plain => self.write_plain(&analysis.scalar, split),
        }
        Ok(())
    }

    fn prepare_tag(&self, tag: &str) -> Result<String, EmitError> {
        if tag.is_empty() {
            return Err(EmitError::new("tag must not be empty"));
        }
        if tag == "!" {
            return Ok(tag.to_string());
        }
        let mut handle: Option<&str> = None;
        let mut suffix = tag;
        let mut prefixes: Vec<&(String, String)> = self.tag_prefixes.iter().collect();
        prefixes.sort();
        for (prefix, prefix_handle) in prefixes {
            if tag.starts_with(prefix.as_str()) && (prefix == "!" || prefix.len() < tag.len()) {
                handle = Some(prefix_handle);
                suffix = &tag[prefix.len()..];
            }
        }
        let mut suffix_text = String::new();
        for ch in suffix.chars() {
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
                        | '~'
                        | '*'
                        | '\''
                        | '('
                        | ')'
                        | '['
                        | ']'
                )
                || (ch == '!' && handle != Some("!"))
            {
                suffix_text.push(ch);
            } else {
                let mut buffer = [0u8; 4];
                for byte in ch.encode_utf8(&mut buffer).as_bytes() {
                    suffix_text.push_str(&format!("%{byte:02X}"));
                }
            }
        }
        Ok(match handle {
            Some(handle) => format!("{handle}{suffix_text}"),
            None => format!("!<{suffix_text}>"),
        })
    }

    // Indentation.

    fn increase_indent(&mut self, flow: bool, indentless: bool) {
        self.indents.push(self.indent);
        match self.indent {
            None => self.indent = Some(if flow { self.best_indent } else { 0 }),
            Some(indent) if !indentless => self.indent = Some(indent + self.best_indent),
            Some(_) => {}
        }
    }

    // Writers.

    fn write(&mut self, data: &str) {
        self.out.push_str(data);
    }

    fn write_indicator(
        &mut self,
        indicator: &str,
        need_whitespace: bool,
        whitespace: bool,
        indention: bool,
    ) {
        let prefix = if self.whitespace || !need_whitespace {
            ""
        } else {
            " "
        };
        self.whitespace = whitespace;
        self.indention = self.indention && indention;
        self.column += prefix.len() + indicator.chars().count();
        self.open_ended = false;
        let text = format!("{prefix}{indicator}");
        self.write(&text);
    }

    fn write_indent(&mut self) {
        let indent = self.indent.unwrap_or(0);
        if !self.indention || self.column > indent || (self.column == indent && !self.whitespace) {
            self.write_line_break(None);
        }
        if self.column < indent {
            self.whitespace = true;
            let data = " ".repeat(indent - self.column);
            self.column = indent;
            self.write(&data);
        }
    }

    fn write_line_break(&mut self, data: Option<char>) {
        self.whitespace = true;
        self.indention = true;
        self.line += 1;
        self.column = 0;
        match data {
            Some(br) => {
                let mut buffer = [0u8; 4];
                let text = br.encode_utf8(&mut buffer).to_string();
                self.write(&text);
            }
            None => {
                let text = self.opts.line_break.as_str();
                self.out.push_str(text);
            }
        }
    }

    fn write_version_directive(&mut self, version_text: &str) {
        let text = format!("%YAML {version_text}");
        self.write(&text);
        self.write_line_break(None);
    }

    fn write_tag_directive(&mut self, handle: &str, prefix: &str) {
        let text = format!("%TAG {handle} {prefix}");
        self.write(&text);
        self.write_line_break(None);
    }

    fn write_single_quoted(&mut self, text: &str, split: bool) {
        self.write_indicator("'", true, false, false);
        let chars: Vec<char> = text.chars().collect();
        let mut spaces = false;
        let mut breaks = false;
        let mut start = 0;
        let mut end = 0;
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            if spaces {
                if ch != Some(' ') {
                    if start + 1 == end
                        && self.column > self.best_width
                        && split
                        && start != 0
                        && end != chars.len()
                    {
                        self.write_indent();
                    } else {
                        let data: String = chars[start..end].iter().collect();
                        self.column += end - start;
                        self.write(&data);
                    }
                    start = end;
                }
            } else if breaks {
                if ch.is_none() || !is_break_char(ch.unwrap()) {
                    if chars[start] == '\n' {
                        self.write_line_break(None);
                    }
                    for &br in &chars[start..end] {
                        if br == '\n' {
                            self.write_line_break(None);
                        } else {
                            self.write_line_break(Some(br));
                        }
                    }
                    self.write_indent();
                    start = end;
                }
            } else if (ch.is_none() || is_break_char(ch.unwrap()) || ch == Some(' ') || ch == Some('\''))
                && start < end
            {
                let data: String = chars[start..end].iter().collect();
                self.column += end - start;
                self.write(&data);
                start = end;
            }
            if ch == Some('\'') {
                self.column += 2;
                self.write("''");
                start = end + 1;
            }
            if let Some(ch) = ch {
                spaces = ch == ' ';
                breaks = is_break_char(ch);
            }
            end += 1;
        }
        self.write_indicator("'", false, false, false);
    }

    fn write_double_quoted(&mut self, text: &str, split: bool) -> Result<(), EmitError> {
        self.write_indicator("\"", true, false, false);
        let chars: Vec<char> = text.chars().collect();
        let mut start = 0;
        let mut end = 0;
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            let needs_escape = match ch {
                None => true,
                Some(c) => {
                    matches!(c, '"' | '\\' | '\u{85}' | '\u{2028}' | '\u{2029}' | '\u{feff}')
                        || !((' '..='\x7e').contains(&c)
                            || (self.opts.allow_unicode && is_allowed_unicode(c)))
                }
            };
            if needs_escape {
                if start < end {
                    let data: String = chars[start..end].iter().collect();
                    self.column += end - start;
                    self.write(&data);
                    start = end;
                }
                if let Some(c) = ch {
                    let data = match escape_char(c) {
                        Some(short) => format!("\\{short}"),
                        None => {
                            let code = c as u32;
                            if code <= 0xff {
                                format!("\\x{code:02X}")
                            } else if code <= 0xffff {
                                format!("\\u{code:04X}")
                            } else {
                                format!("\\U{code:08X}")
                            }
                        }
                    };
                    self.column += data.chars().count();
                    self.write(&data);
                    start = end + 1;
                }
            }
            if end > 0
                && end < chars.len().saturating_sub(1)
                && (ch == Some(' ') || start >= end)
                && self.column + end.saturating_sub(start) > self.best_width
                && split
            {
                let mut data: String = if start < end {
                    chars[start..end].iter().collect()
                } else {
                    String::new()
                };
                data.push('\\');
                if start < end {
                    start = end;
                }
                self.column += data.chars().count();
                self.write(&data);
                self.write_indent();
                self.whitespace = false;
                self.indention = false;
                if chars.get(start) == Some(&' ') {
                    self.column += 1;
                    self.write("\\");
                }
            }
            end += 1;
        }
        self.write_indicator("\"", false, false, false);
        Ok(())
    }

    fn determine_block_hints(&self, chars: &[char]) -> String {
        let mut hints = String::new();
        if let Some(&first) = chars.first() {
            if first == ' ' || is_break_char(first) {
                hints.push_str(&self.best_indent.to_string());
            }
        }
        match chars.last() {
            Some(&last) if !is_break_char(last) => hints.push('-'),
            Some(_) => {
                if chars.len() == 1 || is_break_char(chars[chars.len() - 2]) {
                    hints.push('+');
                }
            }
            None => {}
        }
        hints
    }

    fn write_folded(&mut self, text: &str) {
        let chars: Vec<char> = text.chars().collect();
        let hints = self.determine_block_hints(&chars);
        let indicator = format!(">{hints}");
        self.write_indicator(&indicator, true, false, false);
        if hints.ends_with('+') {
            self.open_ended = true;
        }
        self.write_line_break(None);
        let mut leading_space = true;
        let mut spaces = false;
        let mut breaks = true;
        let mut start = 0;
        let mut end = 0;
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            if breaks {
                if ch.is_none() || !is_break_char(ch.unwrap()) {
                    if !leading_space && ch.is_some() && ch != Some(' ') && chars[start] == '\n' {
                        self.write_line_break(None);
                    }
                    leading_space = ch == Some(' ');
                    for &br in &chars[start..end] {
                        if br == '\n' {
                            self.write_line_break(None);
                        } else {
                            self.write_line_break(Some(br));
                        }
                    }
                    if ch.is_some() {
                        self.write_indent();
                    }
                    start = end;
                }
            } else if spaces {
                if ch != Some(' ') {
                    if start + 1 == end && self.column > self.best_width {
                        self.write_indent();
                    } else {
                        let data: String = chars[start..end].iter().collect();
                        self.column += end - start;
                        self.write(&data);
                    }
                    start = end;
                }
            } else if ch.is_none() || ch == Some(' ') || is_break_char(ch.unwrap()) {
                let data: String = chars[start..end].iter().collect();
                self.column += end - start;
                self.write(&data);
                if ch.is_none() {
                    self.write_line_break(None);
                }
                start = end;
            }
            if let Some(ch) = ch {
                breaks = is_break_char(ch);
                spaces = ch == ' ';
            }
            end += 1;
        }
    }

    fn write_literal(&mut self, text: &str) {
        let chars: Vec<char> = text.chars().collect();
        let hints = self.determine_block_hints(&chars);
        let indicator = format!("|{hints}");
        self.write_indicator(&indicator, true, false, false);
        if hints.ends_with('+') {
            self.open_ended = true;
        }
        self.write_line_break(None);
        let mut breaks = true;
        let mut start = 0;
        let mut end = 0;
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            if breaks {
                if ch.is_none() || !is_break_char(ch.unwrap()) {
                    for &br in &chars[start..end] {
                        if br == '\n' {
                            self.write_line_break(None);
                        } else {
                            self.write_line_break(Some(br));
                        }
                    }
                    if ch.is_some() {
                        self.write_indent();
                    }
                    start = end;
                }
            } else if ch.is_none() || is_break_char(ch.unwrap()) {
                let data: String = chars[start..end].iter().collect();
                self.write(&data);
                if ch.is_none() {
                    self.write_line_break(None);
                }
                start = end;
            }
            if let Some(ch) = ch {
                breaks = is_break_char(ch);
            }
            end += 1;
        }
    }

    fn write_plain(&mut self, text: &str, split: bool) {
        if self.root_context {
            self.open_ended = true;
        }
        if text.is_empty() {
            return;
        }
        if !self.whitespace {
            self.column += 1;
            self.write(" ");
        }
        self.whitespace = false;
        self.indention = false;
        let chars: Vec<char> = text.chars().collect();
        let mut spaces = false;
        let mut breaks = false;
        let mut start = 0;
        let mut end = 0;
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            if spaces {
                if ch != Some(' ') {
                    if start + 1 == end
                        && self.column > self.best_width
                        && split
                        && start != 0
                        && end != chars.len()
                    {
                        self.write_indent();
                        self.whitespace = false;
                        self.indention = false;
                    } else {
                        let data: String = chars[start..end].iter().collect();
                        self.column += end - start;
                        self.write(&data);
                    }
                    start = end;
                }
            } else if breaks {
                if ch.is_none() || !is_break_char(ch.unwrap()) {
                    if chars[start] == '\n' {
                        self.write_line_break(None);
                    }
                    for &br in &chars[start..end] {
                        if br == '\n' {
                            self.write_line_break(None);
                        } else {
                            self.write_line_break(Some(br));
                        }
                    }
                    self.write_indent();
                    self.whitespace = false;
                    self.indention = false;
                    start = end;
                }
            } else if (ch.is_none() || ch == Some(' ') || is_break_char(ch.unwrap())) && start < end
            {
                let data: String = chars[start..end].iter().collect();
                self.column += end - start;
                self.write(&data);
                start = end;
            }
            if let Some(ch) = ch {
                spaces = ch == ' ';
                breaks = is_break_char(ch);
            }
            end += 1;
        }
    }
}

#[inline]
fn is_break_char(ch: char) -> bool {
    matches!(ch, '\n' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

fn escape_char(ch: char) -> Option<char> {
    Some(match ch {
        '\0' => '0',
        '\x07' => 'a',
        '\x08' => 'b',
        '\t' => 't',
        '\n' => 'n',
        '\x0b' => 'v',
        '\x0c' => 'f',
        '\r' => 'r',
        '\x1b' => 'e',
        '"' => '"',
        '\\' => '\\',
        '\u{85}' => 'N',
        '\u{a0}' => '_',
        '\u{2028}' => 'L',
        '\u{2029}' => 'P',
        _ => return None,
    })
}

fn prepare_version((major, minor): (u32, u32)) -> Result<String, EmitError> {
    if major != 1 {
        return Err(EmitError::new(format!(
            "unsupported YAML version: {major}.{minor}"
        )));
    }
    Ok(format!("{major}.{minor}"))
}

fn prepare_anchor(anchor: &str) -> Result<String, EmitError> {
    if anchor.is_empty() {
        return Err(EmitError::new("anchor must not be empty"));
    }
    for ch in anchor.chars() {
        if !(ch.is_ascii_alphanumeric() || ch == '-' || ch == '_') {
            return Err(EmitError::new(format!(
                "invalid character {ch:?} in the anchor: {anchor:?}"
            )));
        }
    }
    Ok(anchor.to_string())
}

fn prepare_tag_handle(handle: &str) -> Result<(), EmitError> {
    if handle.is_empty() {
        return Err(EmitError::new("tag handle must not be empty"));
    }
    if !handle.starts_with('!') || !handle.ends_with('!') {
        return Err(EmitError::new(format!(
            "tag handle must start and end with '!': {handle:?}"
        )));
    }
    for ch in handle[1..handle.len() - 1].chars() {
        if !(ch.is_ascii_alphanumeric() || ch == '-' || ch == '_') {
            return Err(EmitError::new(format!(
                "invalid character {ch:?} in the tag handle: {handle:?}"
            )));
        }
    }
    Ok(())
}

fn prepare_tag_prefix(prefix: &str) -> Result<(), EmitError> {
    if prefix.is_empty() {
        return Err(EmitError::new("tag prefix must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit_events(kinds: Vec<EventKind>) -> String {
        emit_events_with(kinds, EmitOptions::default())
    }

    fn emit_events_with(kinds: Vec<EventKind>, opts: EmitOptions) -> String {
        let mut emitter = Emitter::new(opts);
        for kind in kinds {
            emitter.emit(Event::synthetic(kind)).unwrap();
        }
        emitter.into_string()
    }

    fn doc_start() -> EventKind {
        EventKind::DocumentStart {
            explicit: false,
            version: None,
            tags: Vec::new(),
        }
    }

    fn doc_end() -> EventKind {
        EventKind::DocumentEnd { explicit: false }
    }

    fn plain(value: &str) -> EventKind {
        EventKind::Scalar {
            anchor: None,
            tag: None,
            implicit: (true, false),
            value: value.to_string(),
            style: None,
        }
    }

    fn stream(kinds: Vec<EventKind>) -> Vec<EventKind> {
        let mut events = vec![EventKind::StreamStart { encoding: None }, doc_start()];
        events.extend(kinds);
        events.push(doc_end());
        events.push(EventKind::StreamEnd);
        events
    }

    #[test]
    fn test_plain_scalar_document() {
        // A plain root scalar leaves the document open-ended, so the
        // stream is closed with an explicit end marker.
        assert_eq!(emit_events(stream(vec![plain("hello")])), "hello\n...\n");
    }

    #[test]
    fn test_block_mapping_output() {
        let events = stream(vec![
            EventKind::MappingStart {
                anchor: None,
                tag: None,
                implicit: true,
                flow_style: Some(false),
            },
            plain("a"),
            plain("1"),
            EventKind::MappingEnd,
        ]);
        assert_eq!(emit_events(events), "a: 1\n");
    }

    #[test]
    fn test_flow_sequence_output() {
        let events = stream(vec![
            EventKind::SequenceStart {
                anchor: None,
                tag: None,
                implicit: true,
                flow_style: Some(true),
            },
            plain("1"),
            plain("2"),
            plain("3"),
            EventKind::SequenceEnd,
        ]);
        assert_eq!(emit_events(events), "[1, 2, 3]\n");
    }

    #[test]
    fn test_block_sequence_output() {
        let events = stream(vec![
            EventKind::SequenceStart {
                anchor: None,
                tag: None,
                implicit: true,
                flow_style: Some(false),
            },
            plain("a"),
            plain("b"),
            EventKind::SequenceEnd,
        ]);
        assert_eq!(emit_events(events), "- a\n- b\n");
    }

    #[test]
    fn test_empty_collection_falls_back_to_flow() {
        let events = stream(vec![
            EventKind::SequenceStart {
                anchor: None,
                tag: None,
                implicit: true,
                flow_style: Some(false),
            },
            EventKind::SequenceEnd,
        ]);
        assert_eq!(emit_events(events), "[]\n");
    }

    #[test]
    fn test_quoting_of_special_values() {
        let events = stream(vec![
            EventKind::MappingStart {
                anchor: None,
                tag: None,
                implicit: true,
                flow_style: Some(false),
            },
            plain("key"),
            EventKind::Scalar {
                anchor: None,
                tag: None,
                implicit: (false, true),
                value: "has: colon".to_string(),
                style: None,
            },
            EventKind::MappingEnd,
        ]);
        assert_eq!(emit_events(events), "key: 'has: colon'\n");
    }

    #[test]
    fn test_double_quotes_for_control_characters() {
        let events = stream(vec![EventKind::Scalar {
            anchor: None,
            tag: None,
            implicit: (false, true),
            value: "bell\u{7}".to_string(),
            style: None,
        }]);
        assert_eq!(emit_events(events), "\"bell\\a\"\n");
    }

    #[test]
    fn test_unicode_escaped_unless_allowed() {
        let scalar = EventKind::Scalar {
            anchor: None,
            tag: None,
            implicit: (true, false),
            value: "caf\u{e9}".to_string(),
            style: None,
        };
        assert_eq!(emit_events(stream(vec![scalar.clone()])), "\"caf\\xE9\"\n");
        assert_eq!(
            emit_events_with(stream(vec![scalar]), EmitOptions::new().allow_unicode()),
            "caf\u{e9}\n...\n"
        );
    }

    #[test]
    fn test_anchor_and_alias_output() {
        let events = stream(vec![
            EventKind::SequenceStart {
                anchor: None,
                tag: None,
                implicit: true,
                flow_style: Some(false),
            },
            EventKind::Scalar {
                anchor: Some("shared".to_string()),
                tag: None,
                implicit: (true, false),
                value: "x".to_string(),
                style: None,
            },
            EventKind::Alias {
                anchor: "shared".to_string(),
            },
            EventKind::SequenceEnd,
        ]);
        assert_eq!(emit_events(events), "- &shared x\n- *shared\n");
    }

    #[test]
    fn test_explicit_markers_option() {
        let opts = EmitOptions::new().explicit_start().explicit_end();
        let text = emit_events_with(stream(vec![plain("x")]), opts);
        assert_eq!(text, "--- x\n...\n");
    }

    #[test]
    fn test_version_directive_output() {
        let opts = EmitOptions::new().version(1, 1);
        let text = emit_events_with(stream(vec![plain("x")]), opts);
        assert_eq!(text, "%YAML 1.1\n--- x\n...\n");
    }

    #[test]
    fn test_literal_style_preserved() {
        let events = stream(vec![EventKind::Scalar {
            anchor: None,
            tag: None,
            implicit: (false, true),
            value: "line 1\nline 2\n".to_string(),
            style: Some(ScalarStyle::Literal),
        }]);
        assert_eq!(emit_events(events), "|\n  line 1\n  line 2\n");
    }

    #[test]
    fn test_bad_anchor_name_is_rejected() {
        let mut emitter = Emitter::new(EmitOptions::default());
        emitter
            .emit(Event::synthetic(EventKind::StreamStart { encoding: None }))
            .unwrap();
        emitter.emit(Event::synthetic(doc_start())).unwrap();
        let err = emitter
            .emit(Event::synthetic(EventKind::Scalar {
                anchor: Some("not valid".to_string()),
                tag: None,
                implicit: (true, false),
                value: "x".to_string(),
                style: None,
            }))
            .unwrap_err();
        assert!(err.problem.contains("invalid character"));
    }
}
