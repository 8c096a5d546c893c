//! The representation graph: arena-backed nodes with index identity.
//!
//! Nodes live in a [`Document`] arena and refer to each other by [`NodeId`].
//! A node may be referenced from several parents, and cycles are allowed;
//! identity is the index, so no reference counting or weak pointers are
//! needed and ids stay valid for as long as the document lives.

use std::collections::HashSet;

use crate::{Mark, ScalarStyle};

/// Identity of a node within one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// A scalar node.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarNode {
    /// Resolved tag, e.g. `tag:yaml.org,2002:str`.
    pub tag: String,
    pub value: String,
    /// Requested output style; `None` lets the emitter choose.
    pub style: Option<ScalarStyle>,
    /// Source span (`None` if built programmatically).
    pub span: Option<(Mark, Mark)>,
}

/// A sequence node; items are ids into the owning document.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceNode {
    pub tag: String,
    pub items: Vec<NodeId>,
    /// `Some(true)` flow, `Some(false)` block, `None` undecided.
    pub flow_style: Option<bool>,
    pub span: Option<(Mark, Mark)>,
}

/// A mapping node; entries keep source order and may hold duplicate keys.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingNode {
    pub tag: String,
    pub entries: Vec<(NodeId, NodeId)>,
    pub flow_style: Option<bool>,
    pub span: Option<(Mark, Mark)>,
}

/// One node of the representation graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(ScalarNode),
    Sequence(SequenceNode),
    Mapping(MappingNode),
}

impl Node {
    /// Get as scalar.
    pub fn as_scalar(&self) -> Option<&ScalarNode> {
        match self {
            Node::Scalar(node) => Some(node),
            _ => None,
        }
    }

    /// Get as sequence.
    pub fn as_sequence(&self) -> Option<&SequenceNode> {
        match self {
            Node::Sequence(node) => Some(node),
            _ => None,
        }
    }

    /// Get as mapping.
    pub fn as_mapping(&self) -> Option<&MappingNode> {
        match self {
            Node::Mapping(node) => Some(node),
            _ => None,
        }
    }

    /// The node's tag.
    pub fn tag(&self) -> &str {
        match self {
            Node::Scalar(node) => &node.tag,
            Node::Sequence(node) => &node.tag,
            Node::Mapping(node) => &node.tag,
        }
    }
}

/// One document's node graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// The root node, once one has been set.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Set the root node.
    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Borrow a node mutably.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Add a scalar node.
    pub fn push_scalar(&mut self, tag: impl Into<String>, value: impl Into<String>) -> NodeId {
        self.push(Node::Scalar(ScalarNode {
            tag: tag.into(),
            value: value.into(),
            style: None,
            span: None,
        }))
    }

    /// Add an empty sequence node.
    pub fn push_sequence(&mut self, tag: impl Into<String>, flow_style: Option<bool>) -> NodeId {
        self.push(Node::Sequence(SequenceNode {
            tag: tag.into(),
            items: Vec::new(),
            flow_style,
            span: None,
        }))
    }

    /// Add an empty mapping node.
    pub fn push_mapping(&mut self, tag: impl Into<String>, flow_style: Option<bool>) -> NodeId {
        self.push(Node::Mapping(MappingNode {
            tag: tag.into(),
            entries: Vec::new(),
            flow_style,
            span: None,
        }))
    }

    /// Append an item to a sequence node.
    pub fn append(&mut self, sequence: NodeId, item: NodeId) {
        if let Node::Sequence(node) = self.node_mut(sequence) {
            node.items.push(item);
        } else {
            debug_assert!(false, "append on a non-sequence node");
        }
    }

    /// Append a key/value entry to a mapping node.
    pub fn insert(&mut self, mapping: NodeId, key: NodeId, value: NodeId) {
        if let Node::Mapping(node) = self.node_mut(mapping) {
            node.entries.push((key, value));
        } else {
            debug_assert!(false, "insert on a non-mapping node");
        }
    }

    /// Look up a mapping entry by scalar key text.
    pub fn get(&self, mapping: NodeId, key: &str) -> Option<NodeId> {
        let node = self.node(mapping).as_mapping()?;
        node.entries
            .iter()
            .find(|(k, _)| {
                self.node(*k)
                    .as_scalar()
                    .is_some_and(|scalar| scalar.value == key)
            })
            .map(|(_, v)| *v)
    }

    /// The text of a scalar node, if `id` names one.
    pub fn scalar_value(&self, id: NodeId) -> Option<&str> {
        self.node(id).as_scalar().map(|scalar| scalar.value.as_str())
    }

    /// Structural equality with another document: same tags, same scalar
    /// values, same collection shapes. Styles and source positions are
    /// ignored. Cycle-safe: a pair of nodes already under comparison is
    /// assumed equal, so two graphs that tie the same knot compare equal.
    pub fn same_structure(&self, other: &Document) -> bool {
        match (self.root, other.root) {
            (Some(a), Some(b)) => {
                let mut visited = HashSet::new();
                self.same_node(a, other, b, &mut visited)
            }
            (None, None) => true,
            _ => false,
        }
    }

    fn same_node(
        &self,
        a: NodeId,
        other: &Document,
        b: NodeId,
        visited: &mut HashSet<(usize, usize)>,
    ) -> bool {
        if !visited.insert((a.0, b.0)) {
            return true;
        }
        match (self.node(a), other.node(b)) {
            (Node::Scalar(x), Node::Scalar(y)) => x.tag == y.tag && x.value == y.value,
            (Node::Sequence(x), Node::Sequence(y)) => {
                x.tag == y.tag
                    && x.items.len() == y.items.len()
                    && x.items
                        .iter()
                        .zip(&y.items)
                        .all(|(&i, &j)| self.same_node(i, other, j, visited))
            }
            (Node::Mapping(x), Node::Mapping(y)) => {
                x.tag == y.tag
                    && x.entries.len() == y.entries.len()
                    && x.entries.iter().zip(&y.entries).all(|(&(ka, va), &(kb, vb))| {
                        self.same_node(ka, other, kb, visited)
                            && self.same_node(va, other, vb, visited)
                    })
            }
            _ => false,
        }
    }
}
