//! Composer: events in, node graph out.

use std::collections::HashMap;
use std::fmt;

use crate::{
    Document, Event, EventKind, Mark, NodeId, NodeKind, ParseError, Parser, ReaderError,
    ScalarStyle, TagResolver,
};

/// A structural error above the grammar level: anchors, aliases, and
/// document multiplicity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeError {
    pub context: Option<String>,
    pub context_mark: Option<Mark>,
    pub problem: String,
    pub problem_mark: Mark,
}

impl ComposeError {
    fn new(problem: impl Into<String>, problem_mark: Mark) -> Self {
        Self {
            context: None,
            context_mark: None,
            problem: problem.into(),
            problem_mark,
        }
    }

    fn with_context(
        context: impl Into<String>,
        context_mark: Mark,
        problem: impl Into<String>,
        problem_mark: Mark,
    ) -> Self {
        Self {
            context: Some(context.into()),
            context_mark: Some(context_mark),
            problem: problem.into(),
            problem_mark,
        }
    }
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{context}")?;
            if let Some(mark) = &self.context_mark {
                write!(f, " {mark}")?;
            }
            write!(f, ": ")?;
        }
        write!(f, "{} {}", self.problem, self.problem_mark)
    }
}

impl std::error::Error for ComposeError {}

/// Root error category for the load side of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    /// Input could not be decoded or validated.
    Reader(ReaderError),
    /// Lexical or grammar failure.
    Parse(ParseError),
    /// Composition failure.
    Compose(ComposeError),
}

impl From<ReaderError> for LoadError {
    fn from(err: ReaderError) -> Self {
        LoadError::Reader(err)
    }
}

impl From<ParseError> for LoadError {
    fn from(err: ParseError) -> Self {
        LoadError::Parse(err)
    }
}

impl From<ComposeError> for LoadError {
    fn from(err: ComposeError) -> Self {
        LoadError::Compose(err)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Reader(err) => err.fmt(f),
            LoadError::Parse(err) => err.fmt(f),
            LoadError::Compose(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for LoadError {}

/// Builds one [`Document`] per composed YAML document, resolving anchors
/// and aliases into shared node identities.
pub struct Composer<'r> {
    parser: Parser,
    resolver: &'r dyn TagResolver,
    /// Anchor name to node id and first-occurrence mark; reset per document.
    anchors: HashMap<String, (NodeId, Mark)>,
}

impl<'r> Composer<'r> {
    /// Create a composer over the given parser.
    pub fn new(parser: Parser, resolver: &'r dyn TagResolver) -> Self {
        Self {
            parser,
            resolver,
            anchors: HashMap::new(),
        }
    }

    /// Create a composer directly from a string.
    pub fn from_str(source: &str, resolver: &'r dyn TagResolver) -> Result<Self, LoadError> {
        Ok(Self::new(Parser::from_str(source)?, resolver))
    }

    /// Whether another document is available.
    pub fn check_node(&mut self) -> Result<bool, LoadError> {
        if self.parser.peek_event()?.is_none() {
            return Ok(false);
        }
        if matches!(self.peek_kind()?, EventKind::StreamStart { .. }) {
            self.next_event()?;
        }
        match self.parser.peek_event()? {
            Some(event) => Ok(!matches!(event.kind, EventKind::StreamEnd)),
            None => Ok(false),
        }
    }

    /// Compose the next document, or `None` at the end of the stream.
    pub fn get_node(&mut self) -> Result<Option<Document>, LoadError> {
        if !self.check_node()? {
            // Drain the trailing STREAM-END, if it is still pending.
            if self.parser.peek_event()?.is_some() {
                self.parser.get_event()?;
            }
            return Ok(None);
        }
        self.compose_document().map(Some)
    }

    /// Compose a stream expected to hold at most one document. A second
    /// document is an error; an empty stream yields `None`.
    pub fn get_single_node(&mut self) -> Result<Option<Document>, LoadError> {
        let document = self.get_node()?;
        if let Some(document) = &document {
            if !matches!(self.peek_kind()?, EventKind::StreamEnd) {
                let event = self.next_event()?;
                let context_mark = document
                    .root()
                    .and_then(|root| span_start(document, root))
                    .unwrap_or_else(Mark::synthetic);
                return Err(ComposeError::with_context(
                    "expected a single document in the stream",
                    context_mark,
                    "but found another document",
                    event.start,
                )
                .into());
            }
            self.next_event()?;
        }
        Ok(document)
    }

    fn peek_kind(&mut self) -> Result<&EventKind, LoadError> {
        match self.parser.peek_event()? {
            Some(event) => Ok(&event.kind),
            None => Err(ComposeError::new(
                "unexpected end of the event stream",
                Mark::synthetic(),
            )
            .into()),
        }
    }

    fn next_event(&mut self) -> Result<Event, LoadError> {
        match self.parser.get_event()? {
            Some(event) => Ok(event),
            None => Err(ComposeError::new(
                "unexpected end of the event stream",
                Mark::synthetic(),
            )
            .into()),
        }
    }

    fn compose_document(&mut self) -> Result<Document, LoadError> {
        // DOCUMENT-START
        self.next_event()?;
        let mut document = Document::new();
        let root = self.compose_node(&mut document)?;
        document.set_root(root);
        // DOCUMENT-END
        self.next_event()?;
        // Anchors never leak across documents.
        self.anchors.clear();
        Ok(document)
    }

    fn compose_node(&mut self, document: &mut Document) -> Result<NodeId, LoadError> {
        if matches!(self.peek_kind()?, EventKind::Alias { .. }) {
            let event = self.next_event()?;
            let EventKind::Alias { anchor } = event.kind else {
                unreachable!("peeked an alias event");
            };
            return match self.anchors.get(&anchor) {
                Some((id, _)) => Ok(*id),
                None => Err(ComposeError::new(
                    format!("found undefined alias {anchor:?}"),
                    event.start,
                )
                .into()),
            };
        }

        let anchor_name = self.peek_kind()?.anchor().map(str::to_string);
        if let Some(name) = &anchor_name {
            if let Some((_, first_mark)) = self.anchors.get(name) {
                let first_mark = first_mark.clone();
                let second_mark = self
                    .parser
                    .peek_event()?
                    .map(|event| event.start.clone())
                    .unwrap_or_else(Mark::synthetic);
                return Err(ComposeError::with_context(
                    format!("found duplicate anchor {name:?}; first occurrence"),
                    first_mark,
                    "second occurrence",
                    second_mark,
                )
                .into());
            }
        }

        match self.peek_kind()? {
            EventKind::Scalar { .. } => self.compose_scalar(document),
            EventKind::SequenceStart { .. } => self.compose_sequence(document),
            EventKind::MappingStart { .. } => self.compose_mapping(document),
            other => {
                let found = other.describe();
                let mark = self
                    .parser
                    .peek_event()?
                    .map(|event| event.start.clone())
                    .unwrap_or_else(Mark::synthetic);
                Err(ComposeError::new(format!("expected a node, but found {found}"), mark).into())
            }
        }
    }

    fn compose_scalar(&mut self, document: &mut Document) -> Result<NodeId, LoadError> {
        let event = self.next_event()?;
        let EventKind::Scalar {
            anchor,
            tag,
            implicit,
            value,
            style,
        } = event.kind
        else {
            unreachable!("peeked a scalar event");
        };
        let tag = self.resolve_tag(tag, NodeKind::Scalar, Some(&value), implicit);
        let id = document.push_scalar(tag, value);
        set_scalar_extras(document, id, style, (event.start.clone(), event.end));
        if let Some(name) = anchor {
            self.anchors.insert(name, (id, event.start));
        }
        Ok(id)
    }

    fn compose_sequence(&mut self, document: &mut Document) -> Result<NodeId, LoadError> {
        let event = self.next_event()?;
        let EventKind::SequenceStart {
            anchor,
            tag,
            implicit,
            flow_style,
        } = event.kind
        else {
            unreachable!("peeked a sequence start event");
        };
        let tag = self.resolve_tag(tag, NodeKind::Sequence, None, (implicit, false));
        let id = document.push_sequence(tag, flow_style);
        // Bind the anchor before composing children so aliases may refer
        // back to the node being built.
        if let Some(name) = anchor {
            self.anchors.insert(name, (id, event.start.clone()));
        }
        while !matches!(self.peek_kind()?, EventKind::SequenceEnd) {
            let item = self.compose_node(document)?;
            document.append(id, item);
        }
        let end_event = self.next_event()?;
        set_span(document, id, (event.start, end_event.end));
        Ok(id)
    }

    fn compose_mapping(&mut self, document: &mut Document) -> Result<NodeId, LoadError> {
        let event = self.next_event()?;
        let EventKind::MappingStart {
            anchor,
            tag,
            implicit,
            flow_style,
        } = event.kind
        else {
            unreachable!("peeked a mapping start event");
        };
        let tag = self.resolve_tag(tag, NodeKind::Mapping, None, (implicit, false));
        let id = document.push_mapping(tag, flow_style);
        if let Some(name) = anchor {
            self.anchors.insert(name, (id, event.start.clone()));
        }
        while !matches!(self.peek_kind()?, EventKind::MappingEnd) {
            let key = self.compose_node(document)?;
            let value = self.compose_node(document)?;
            document.insert(id, key, value);
        }
        let end_event = self.next_event()?;
        set_span(document, id, (event.start, end_event.end));
        Ok(id)
    }

    fn resolve_tag(
        &self,
        tag: Option<String>,
        kind: NodeKind,
        value: Option<&str>,
        implicit: (bool, bool),
    ) -> String {
        match tag {
            Some(tag) if tag != "!" => tag,
            _ => self.resolver.resolve(kind, value, implicit),
        }
    }
}

fn span_start(document: &Document, id: NodeId) -> Option<Mark> {
    let span = match document.node(id) {
        crate::Node::Scalar(node) => &node.span,
        crate::Node::Sequence(node) => &node.span,
        crate::Node::Mapping(node) => &node.span,
    };
    span.as_ref().map(|(start, _)| start.clone())
}

fn set_span(document: &mut Document, id: NodeId, span: (Mark, Mark)) {
    match document.node_mut(id) {
        crate::Node::Scalar(node) => node.span = Some(span),
        crate::Node::Sequence(node) => node.span = Some(span),
        crate::Node::Mapping(node) => node.span = Some(span),
    }
}

fn set_scalar_extras(
    document: &mut Document,
    id: NodeId,
    style: Option<ScalarStyle>,
    span: (Mark, Mark),
) {
    if let crate::Node::Scalar(node) = document.node_mut(id) {
        node.style = style;
        node.span = Some(span);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CoreResolver, Node};

    fn compose(source: &str) -> Document {
        let resolver = CoreResolver::new();
        crate::load(source, &resolver).unwrap().unwrap()
    }

    fn compose_err(source: &str) -> LoadError {
        let resolver = CoreResolver::new();
        match crate::load(source, &resolver) {
            Ok(_) => panic!("expected a compose error for {source:?}"),
            Err(err) => err,
        }
    }

    #[test]
    fn test_nested_mapping_shape() {
        let doc = compose("a: 1\nb:\n  c: 3\n  d: 4\n");
        let root = doc.root().unwrap();
        let mapping = doc.node(root).as_mapping().unwrap();
        assert_eq!(mapping.tag, "tag:yaml.org,2002:map");
        assert_eq!(mapping.entries.len(), 2);

        let a = doc.get(root, "a").unwrap();
        assert_eq!(doc.node(a).as_scalar().unwrap().tag, "tag:yaml.org,2002:int");

        let b = doc.get(root, "b").unwrap();
        let inner = doc.node(b).as_mapping().unwrap();
        assert_eq!(inner.entries.len(), 2);
        assert_eq!(doc.scalar_value(doc.get(b, "d").unwrap()), Some("4"));
    }

    #[test]
    fn test_alias_shares_identity() {
        let doc = compose("- &a x\n- *a\n");
        let root = doc.root().unwrap();
        let seq = doc.node(root).as_sequence().unwrap();
        assert_eq!(seq.items[0], seq.items[1]);
    }

    #[test]
    fn test_self_referential_sequence() {
        let doc = compose("&A [*A]");
        let root = doc.root().unwrap();
        let seq = doc.node(root).as_sequence().unwrap();
        assert_eq!(seq.items.len(), 1);
        assert_eq!(seq.items[0], root);
    }

    #[test]
    fn test_explicit_tag_wins_over_resolver() {
        let doc = compose("!!str 123\n");
        let root = doc.root().unwrap();
        let scalar = doc.node(root).as_scalar().unwrap();
        assert_eq!(scalar.tag, "tag:yaml.org,2002:str");
        assert_eq!(scalar.value, "123");
    }

    #[test]
    fn test_undefined_alias_is_rejected() {
        let err = compose_err("- *nowhere\n");
        let LoadError::Compose(err) = err else {
            panic!("expected a compose error, got {err:?}");
        };
        assert_eq!(err.problem, "found undefined alias \"nowhere\"");
    }

    #[test]
    fn test_duplicate_anchor_cites_both_marks() {
        let err = compose_err("- &A 1\n- &A 2\n");
        let LoadError::Compose(err) = err else {
            panic!("expected a compose error, got {err:?}");
        };
        assert!(err.context.as_deref().unwrap().contains("duplicate anchor"));
        let context_mark = err.context_mark.unwrap();
        assert_eq!((context_mark.line, context_mark.column), (0, 2));
        assert_eq!((err.problem_mark.line, err.problem_mark.column), (1, 2));
    }

    #[test]
    fn test_single_document_api_rejects_second_document() {
        let resolver = CoreResolver::new();
        let err = crate::load("---\na: 1\n---\nb: 2\n", &resolver).unwrap_err();
        let LoadError::Compose(err) = err else {
            panic!("expected a compose error, got {err:?}");
        };
        assert_eq!(err.problem, "but found another document");
    }

    #[test]
    fn test_anchor_table_resets_between_documents() {
        let resolver = CoreResolver::new();
        let err = crate::load_all("---\n- &a 1\n- *a\n---\n- *a\n", &resolver).unwrap_err();
        let LoadError::Compose(err) = err else {
            panic!("expected a compose error, got {err:?}");
        };
        assert!(err.problem.contains("undefined alias"));
    }

    #[test]
    fn test_flow_styles_are_recorded() {
        let doc = compose("block:\n- 1\nflow: [2]\n");
        let root = doc.root().unwrap();
        let block = doc.get(root, "block").unwrap();
        let flow = doc.get(root, "flow").unwrap();
        assert_eq!(doc.node(block).as_sequence().unwrap().flow_style, Some(false));
        assert_eq!(doc.node(flow).as_sequence().unwrap().flow_style, Some(true));
    }

    #[test]
    fn test_merge_key_resolution() {
        let doc = compose("base: &b {x: 1}\nderived:\n  <<: *b\n  y: 2\n");
        let root = doc.root().unwrap();
        let derived = doc.get(root, "derived").unwrap();
        let mapping = doc.node(derived).as_mapping().unwrap();
        let (merge_key, _) = mapping.entries[0];
        assert_eq!(
            doc.node(merge_key).as_scalar().unwrap().tag,
            "tag:yaml.org,2002:merge"
        );
    }

    #[test]
    fn test_composed_spans_point_into_source() {
        let doc = compose("a: 1\n");
        let root = doc.root().unwrap();
        let Node::Mapping(mapping) = doc.node(root) else {
            panic!("expected a mapping root");
        };
        let (start, _) = mapping.span.clone().unwrap();
        assert_eq!((start.line, start.column), (0, 0));
    }
}
