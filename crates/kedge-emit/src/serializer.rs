//! Serializer: node graphs in, events out.
//!
//! Two passes per document. The anchor pass walks the graph once and gives
//! every node reached twice a generated `idNNN` anchor; the serialize pass
//! walks it again, emitting an alias for nodes already written. Cycles
//! terminate because the second sighting always takes the alias path.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::{
    Document, EmitError, Emitter, Event, EventKind, Node, NodeId, NodeKind, TagResolver,
};

/// Serializer misuse or a formatting failure bubbled up from the emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerializeError {
    /// `serialize` or `close` before `open`.
    NotOpened,
    /// `open` called twice.
    AlreadyOpened,
    /// `open` or `serialize` after `close`.
    Closed,
    /// The document has no root node.
    MissingRoot,
    /// The emitter rejected a request.
    Emit(EmitError),
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializeError::NotOpened => write!(f, "serializer is not opened"),
            SerializeError::AlreadyOpened => write!(f, "serializer is already opened"),
            SerializeError::Closed => write!(f, "serializer is closed"),
            SerializeError::MissingRoot => write!(f, "document has no root node"),
            SerializeError::Emit(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for SerializeError {}

impl From<EmitError> for SerializeError {
    fn from(err: EmitError) -> Self {
        SerializeError::Emit(err)
    }
}

/// Walks node graphs and feeds the emitter one event stream.
pub struct Serializer<'r> {
    emitter: Emitter,
    resolver: &'r dyn TagResolver,
    opened: bool,
    closed: bool,
    serialized: HashSet<NodeId>,
    /// Node id to assigned anchor; `None` until a second sighting.
    anchors: HashMap<NodeId, Option<String>>,
    last_anchor_id: usize,
}

impl<'r> Serializer<'r> {
    /// Create a serializer writing through the given emitter.
    pub fn new(emitter: Emitter, resolver: &'r dyn TagResolver) -> Self {
        Self {
            emitter,
            resolver,
            opened: false,
            closed: false,
            serialized: HashSet::new(),
            anchors: HashMap::new(),
            last_anchor_id: 0,
        }
    }

    /// Start the stream.
    pub fn open(&mut self) -> Result<(), SerializeError> {
        if self.closed {
            return Err(SerializeError::Closed);
        }
        if self.opened {
            return Err(SerializeError::AlreadyOpened);
        }
        self.emitter
            .emit(Event::synthetic(EventKind::StreamStart { encoding: None }))?;
        self.opened = true;
        Ok(())
    }

    /// End the stream.
    pub fn close(&mut self) -> Result<(), SerializeError> {
        if !self.opened {
            return Err(SerializeError::NotOpened);
        }
        if !self.closed {
            self.emitter.emit(Event::synthetic(EventKind::StreamEnd))?;
            self.closed = true;
        }
        Ok(())
    }

    /// Serialize one document.
    pub fn serialize(&mut self, document: &Document) -> Result<(), SerializeError> {
        if self.closed {
            return Err(SerializeError::Closed);
        }
        if !self.opened {
            return Err(SerializeError::NotOpened);
        }
        let root = document.root().ok_or(SerializeError::MissingRoot)?;
        self.emitter.emit(Event::synthetic(EventKind::DocumentStart {
            explicit: false,
            version: None,
            tags: Vec::new(),
        }))?;
        self.anchor_node(document, root);
        self.serialize_node(document, root)?;
        self.emitter
            .emit(Event::synthetic(EventKind::DocumentEnd { explicit: false }))?;
        self.serialized.clear();
        self.anchors.clear();
        self.last_anchor_id = 0;
        Ok(())
    }

    /// Give back the emitter, e.g. to take the output text.
    pub fn into_emitter(self) -> Emitter {
        self.emitter
    }

    /// First pass: any node sighted twice gets a generated anchor.
    fn anchor_node(&mut self, document: &Document, id: NodeId) {
        if let Some(anchor) = self.anchors.get_mut(&id) {
            if anchor.is_none() {
                self.last_anchor_id += 1;
                *anchor = Some(format!("id{:03}", self.last_anchor_id));
            }
            return;
        }
        self.anchors.insert(id, None);
        match document.node(id) {
            Node::Scalar(_) => {}
            Node::Sequence(node) => {
                for &item in &node.items {
                    self.anchor_node(document, item);
                }
            }
            Node::Mapping(node) => {
                for &(key, value) in &node.entries {
                    self.anchor_node(document, key);
                    self.anchor_node(document, value);
                }
            }
        }
    }

    /// Second pass: emit events, aliasing nodes already written.
    fn serialize_node(&mut self, document: &Document, id: NodeId) -> Result<(), SerializeError> {
        let anchor = self.anchors.get(&id).cloned().flatten();
        if self.serialized.contains(&id) {
            let anchor = anchor.expect("a re-sighted node was assigned an anchor");
            self.emitter
                .emit(Event::synthetic(EventKind::Alias { anchor }))?;
            return Ok(());
        }
        self.serialized.insert(id);
        match document.node(id) {
            Node::Scalar(node) => {
                // Re-derive the implicit flags so an ordinary tag needs no
                // `!!` in the output; the resolver must agree with the one
                // used at composition time.
                let detected =
                    self.resolver
                        .resolve(NodeKind::Scalar, Some(&node.value), (true, false));
                let default =
                    self.resolver
                        .resolve(NodeKind::Scalar, Some(&node.value), (false, true));
                let implicit = (node.tag == detected, node.tag == default);
                self.emitter.emit(Event::synthetic(EventKind::Scalar {
                    anchor,
                    tag: Some(node.tag.clone()),
                    implicit,
                    value: node.value.clone(),
                    style: node.style,
                }))?;
            }
            Node::Sequence(node) => {
                let implicit =
                    node.tag == self.resolver.resolve(NodeKind::Sequence, None, (true, false));
                let flow_style =
                    self.decide_flow_style(document, node.flow_style, &node.items);
                self.emitter.emit(Event::synthetic(EventKind::SequenceStart {
                    anchor,
                    tag: Some(node.tag.clone()),
                    implicit,
                    flow_style,
                }))?;
                for &item in &node.items {
                    self.serialize_node(document, item)?;
                }
                self.emitter.emit(Event::synthetic(EventKind::SequenceEnd))?;
            }
            Node::Mapping(node) => {
                let implicit =
                    node.tag == self.resolver.resolve(NodeKind::Mapping, None, (true, false));
                let children: Vec<NodeId> = node
                    .entries
                    .iter()
                    .flat_map(|&(key, value)| [key, value])
                    .collect();
                let flow_style = self.decide_flow_style(document, node.flow_style, &children);
                self.emitter.emit(Event::synthetic(EventKind::MappingStart {
                    anchor,
                    tag: Some(node.tag.clone()),
                    implicit,
                    flow_style,
                }))?;
                for &(key, value) in &node.entries {
                    self.serialize_node(document, key)?;
                    self.serialize_node(document, value)?;
                }
                self.emitter.emit(Event::synthetic(EventKind::MappingEnd))?;
            }
        }
        Ok(())
    }

    /// Collection style: an explicit per-node style wins, then the
    /// emitter's configured default, then the auto rule - block when any
    /// direct child is a collection, flow otherwise.
    fn decide_flow_style(
        &self,
        document: &Document,
        own: Option<bool>,
        children: &[NodeId],
    ) -> Option<bool> {
        if own.is_some() {
            return own;
        }
        if self.emitter.options().default_flow_style.is_some() {
            return None;
        }
        let has_nested_collection = children
            .iter()
            .any(|&child| !matches!(document.node(child), Node::Scalar(_)));
        Some(!has_nested_collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CoreResolver, EmitOptions, DEFAULT_MAPPING_TAG, DEFAULT_SCALAR_TAG, DEFAULT_SEQUENCE_TAG};

    fn int_scalar(document: &mut Document, value: &str) -> NodeId {
        document.push_scalar("tag:yaml.org,2002:int", value)
    }

    fn dump_one(document: &Document) -> String {
        let resolver = CoreResolver::new();
        crate::dump(document, &resolver, EmitOptions::default()).unwrap()
    }

    #[test]
    fn test_scalar_only_collections_use_flow() {
        let mut doc = Document::new();
        let seq = doc.push_sequence(DEFAULT_SEQUENCE_TAG, None);
        for value in ["1", "2", "3"] {
            let item = int_scalar(&mut doc, value);
            doc.append(seq, item);
        }
        doc.set_root(seq);
        assert_eq!(dump_one(&doc), "[1, 2, 3]\n");
    }

    #[test]
    fn test_nested_collection_forces_block() {
        let mut doc = Document::new();
        let root = doc.push_mapping(DEFAULT_MAPPING_TAG, None);
        let key = doc.push_scalar(DEFAULT_SCALAR_TAG, "b");
        let inner = doc.push_mapping(DEFAULT_MAPPING_TAG, None);
        let inner_key = doc.push_scalar(DEFAULT_SCALAR_TAG, "c");
        let inner_value = int_scalar(&mut doc, "3");
        doc.insert(inner, inner_key, inner_value);
        doc.insert(root, key, inner);
        doc.set_root(root);
        assert_eq!(dump_one(&doc), "b: {c: 3}\n");
    }

    #[test]
    fn test_shared_node_gets_anchor() {
        let mut doc = Document::new();
        let shared = doc.push_scalar(DEFAULT_SCALAR_TAG, "x");
        let seq = doc.push_sequence(DEFAULT_SEQUENCE_TAG, Some(false));
        doc.append(seq, shared);
        doc.append(seq, shared);
        doc.set_root(seq);
        assert_eq!(dump_one(&doc), "- &id001 x\n- *id001\n");
    }

    #[test]
    fn test_cyclic_sequence_emits_anchor_and_alias() {
        let mut doc = Document::new();
        let seq = doc.push_sequence(DEFAULT_SEQUENCE_TAG, None);
        doc.append(seq, seq);
        doc.set_root(seq);
        assert_eq!(dump_one(&doc), "&id001\n- *id001\n");
    }

    #[test]
    fn test_str_tagged_number_is_quoted() {
        let mut doc = Document::new();
        let scalar = doc.push_scalar(DEFAULT_SCALAR_TAG, "123");
        doc.set_root(scalar);
        // Plain "123" would be re-resolved as an int, so the emitter
        // quotes it; quoted scalars resolve to str and need no tag.
        assert_eq!(dump_one(&doc), "'123'\n");
    }

    #[test]
    fn test_serialize_before_open_is_rejected() {
        let resolver = CoreResolver::new();
        let mut serializer = Serializer::new(Emitter::new(EmitOptions::default()), &resolver);
        let mut doc = Document::new();
        let root = doc.push_scalar(DEFAULT_SCALAR_TAG, "x");
        doc.set_root(root);
        assert_eq!(
            serializer.serialize(&doc),
            Err(SerializeError::NotOpened)
        );
    }

    #[test]
    fn test_double_open_is_rejected() {
        let resolver = CoreResolver::new();
        let mut serializer = Serializer::new(Emitter::new(EmitOptions::default()), &resolver);
        serializer.open().unwrap();
        assert_eq!(serializer.open(), Err(SerializeError::AlreadyOpened));
    }

    #[test]
    fn test_serialize_after_close_is_rejected() {
        let resolver = CoreResolver::new();
        let mut serializer = Serializer::new(Emitter::new(EmitOptions::default()), &resolver);
        serializer.open().unwrap();
        serializer.close().unwrap();
        let mut doc = Document::new();
        let root = doc.push_scalar(DEFAULT_SCALAR_TAG, "x");
        doc.set_root(root);
        assert_eq!(serializer.serialize(&doc), Err(SerializeError::Closed));
    }
}
