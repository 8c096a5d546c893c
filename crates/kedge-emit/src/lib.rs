//! Serializer and emitter for YAML 1.1 node graphs.
//!
//! The inverse of composition: the serializer walks a [`Document`] graph,
//! assigns anchors to shared and cyclic nodes, and feeds events to the
//! emitter, which renders them as YAML text.

pub use kedge_parse::{Encoding, Event, EventKind, Mark, ScalarStyle};
pub use kedge_tree::{
    CoreResolver, Document, Node, NodeId, NodeKind, TagResolver, DEFAULT_MAPPING_TAG,
    DEFAULT_SCALAR_TAG, DEFAULT_SEQUENCE_TAG,
};

mod options;
pub use options::{EmitOptions, LineBreak};

mod scalar;
pub use scalar::{analyze_scalar, ScalarAnalysis};

mod emitter;
pub use emitter::{EmitError, Emitter};

mod serializer;
pub use serializer::{SerializeError, Serializer};

/// Serialize several documents into one YAML stream.
pub fn dump_all(
    documents: &[Document],
    resolver: &dyn TagResolver,
    options: EmitOptions,
) -> Result<String, SerializeError> {
    let mut serializer = Serializer::new(Emitter::new(options), resolver);
    serializer.open()?;
    for document in documents {
        serializer.serialize(document)?;
    }
    serializer.close()?;
    Ok(serializer.into_emitter().into_string())
}

/// Serialize a single document.
pub fn dump(
    document: &Document,
    resolver: &dyn TagResolver,
    options: EmitOptions,
) -> Result<String, SerializeError> {
    dump_all(std::slice::from_ref(document), resolver, options)
}
