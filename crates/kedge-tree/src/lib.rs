//! Node graph composition for YAML 1.1 event streams.
//!
//! The composer consumes parser events and builds a [`Document`]: an
//! arena-backed graph of scalar, sequence, and mapping nodes in which
//! anchors and aliases resolve to shared node identities, including cycles.

pub use kedge_parse::{
    Encoding, Event, EventKind, Mark, ParseError, Parser, ReaderError, ScalarStyle, ScanError,
    Scanner,
};

mod node;
pub use node::{Document, MappingNode, Node, NodeId, ScalarNode, SequenceNode};

mod resolve;
pub use resolve::{
    CoreResolver, NodeKind, TagResolver, DEFAULT_MAPPING_TAG, DEFAULT_SCALAR_TAG,
    DEFAULT_SEQUENCE_TAG,
};

mod composer;
pub use composer::{ComposeError, Composer, LoadError};

mod diagnostic;

/// Compose every document in the stream.
pub fn load_all(source: &str, resolver: &dyn TagResolver) -> Result<Vec<Document>, LoadError> {
    let mut composer = Composer::from_str(source, resolver)?;
    let mut documents = Vec::new();
    while let Some(document) = composer.get_node()? {
        documents.push(document);
    }
    Ok(documents)
}

/// Compose a stream that is expected to hold at most one document.
pub fn load(source: &str, resolver: &dyn TagResolver) -> Result<Option<Document>, LoadError> {
    Composer::from_str(source, resolver)?.get_single_node()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_simple_mapping() {
        let resolver = CoreResolver::new();
        let doc = load("a: 1\n", &resolver).unwrap().unwrap();
        let root = doc.root().unwrap();
        let value = doc.get(root, "a").unwrap();
        let scalar = doc.node(value).as_scalar().unwrap();
        assert_eq!(scalar.value, "1");
        assert_eq!(scalar.tag, "tag:yaml.org,2002:int");
    }

    #[test]
    fn test_load_empty_stream() {
        let resolver = CoreResolver::new();
        assert!(load("", &resolver).unwrap().is_none());
    }

    #[test]
    fn test_load_all_two_documents() {
        let resolver = CoreResolver::new();
        let docs = load_all("---\na: 1\n---\nb: 2\n", &resolver).unwrap();
        assert_eq!(docs.len(), 2);
        let second_root = docs[1].root().unwrap();
        assert!(docs[1].get(second_root, "b").is_some());
    }
}
