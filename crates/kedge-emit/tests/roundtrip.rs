//! End-to-end pipeline tests: compose a graph, serialize it back out, and
//! compare against the original.

use kedge_emit::{
    dump, dump_all, CoreResolver, Document, EmitOptions, Emitter, NodeKind, Serializer,
    TagResolver, DEFAULT_MAPPING_TAG, DEFAULT_SEQUENCE_TAG,
};
use kedge_tree::{load, load_all, Scanner};
use proptest::prelude::*;

fn transcode(source: &str) -> String {
    let resolver = CoreResolver::new();
    let document = load(source, &resolver).unwrap().unwrap();
    dump(&document, &resolver, EmitOptions::default()).unwrap()
}

#[test]
fn test_nested_block_mapping_roundtrips_exactly() {
    let source = "a: 1\nb:\n  c: 3\n  d: 4\n";
    assert_eq!(transcode(source), source);
}

#[test]
fn test_flow_sequence_roundtrips_exactly() {
    assert_eq!(transcode("[1, 2, 3]"), "[1, 2, 3]\n");
}

#[test]
fn test_self_referential_graph_roundtrips_via_anchor() {
    let resolver = CoreResolver::new();
    let document = load("&A [*A]", &resolver).unwrap().unwrap();
    let text = dump(&document, &resolver, EmitOptions::default()).unwrap();
    assert_eq!(text, "&id001 [*id001]\n");

    // Re-composing ties the same knot instead of looping forever.
    let again = load(&text, &resolver).unwrap().unwrap();
    assert!(document.same_structure(&again));
    let root = again.root().unwrap();
    let seq = again.node(root).as_sequence().unwrap();
    assert_eq!(seq.items[0], root);
}

#[test]
fn test_block_styled_cycle_uses_anchor_form() {
    let resolver = CoreResolver::new();
    let mut document = Document::new();
    let seq = document.push_sequence(DEFAULT_SEQUENCE_TAG, None);
    document.append(seq, seq);
    document.set_root(seq);
    let text = dump(&document, &resolver, EmitOptions::default()).unwrap();
    assert_eq!(text, "&id001\n- *id001\n");
}

#[test]
fn test_multi_document_stream_roundtrips() {
    let resolver = CoreResolver::new();
    let documents = load_all("---\na: 1\n---\nb: 2\n", &resolver).unwrap();
    assert_eq!(documents.len(), 2);
    let text = dump_all(&documents, &resolver, EmitOptions::default()).unwrap();
    let again = load_all(&text, &resolver).unwrap();
    assert_eq!(again.len(), 2);
    for (before, after) in documents.iter().zip(&again) {
        assert!(before.same_structure(after));
    }
}

#[test]
fn test_shared_subtrees_survive_roundtrip() {
    let resolver = CoreResolver::new();
    let source = "base: &b\n  x: 1\nleft: *b\nright: *b\n";
    let document = load(source, &resolver).unwrap().unwrap();
    let text = dump(&document, &resolver, EmitOptions::default()).unwrap();
    let again = load(&text, &resolver).unwrap().unwrap();
    assert!(document.same_structure(&again));

    // The re-composed aliases still point at one node.
    let root = again.root().unwrap();
    assert_eq!(again.get(root, "left"), again.get(root, "right"));
}

#[test]
fn test_quoted_scalars_keep_their_type_on_reload() {
    let resolver = CoreResolver::new();
    let document = load("version: '1.10'\n", &resolver).unwrap().unwrap();
    let text = dump(&document, &resolver, EmitOptions::default()).unwrap();
    let again = load(&text, &resolver).unwrap().unwrap();
    let root = again.root().unwrap();
    let version = again.get(root, "version").unwrap();
    assert_eq!(
        again.node(version).as_scalar().unwrap().tag,
        "tag:yaml.org,2002:str"
    );
}

#[test]
fn test_utf16_output_reads_back() {
    let resolver = CoreResolver::new();
    let document = load("a: 1\n", &resolver).unwrap().unwrap();
    let options = EmitOptions::new().encoding(kedge_emit::Encoding::Utf16Le);
    let mut serializer = Serializer::new(Emitter::new(options), &resolver);
    serializer.open().unwrap();
    serializer.serialize(&document).unwrap();
    serializer.close().unwrap();
    let bytes = serializer.into_emitter().finish();
    assert_eq!(&bytes[..2], &[0xff, 0xfe]);

    let mut scanner = Scanner::from_bytes("roundtrip", &bytes).unwrap();
    let mut token_count = 0;
    while scanner.get_token().unwrap().is_some() {
        token_count += 1;
    }
    assert!(token_count > 4);
}

// Property: acyclic graphs survive serialize -> emit -> compose with the
// same tags, scalar values, and collection shapes.

#[derive(Debug, Clone)]
enum TestValue {
    Scalar(String),
    Seq(Vec<TestValue>),
    Map(Vec<(String, TestValue)>),
}

fn test_value_strategy() -> impl Strategy<Value = TestValue> {
    let leaf = prop_oneof![
        "[a-z]{1,8}".prop_map(TestValue::Scalar),
        "[1-9][0-9]{0,3}".prop_map(TestValue::Scalar),
        Just(TestValue::Scalar("true".to_string())),
        Just(TestValue::Scalar("null".to_string())),
        Just(TestValue::Scalar("3.14".to_string())),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(TestValue::Seq),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..4).prop_map(TestValue::Map),
        ]
    })
}

fn build_node(document: &mut Document, value: &TestValue, resolver: &CoreResolver) -> kedge_emit::NodeId {
    match value {
        TestValue::Scalar(text) => {
            let tag = resolver.resolve(NodeKind::Scalar, Some(text), (true, false));
            document.push_scalar(tag, text.clone())
        }
        TestValue::Seq(items) => {
            let id = document.push_sequence(DEFAULT_SEQUENCE_TAG, None);
            for item in items {
                let child = build_node(document, item, resolver);
                document.append(id, child);
            }
            id
        }
        TestValue::Map(entries) => {
            let id = document.push_mapping(DEFAULT_MAPPING_TAG, None);
            for (key, value) in entries {
                let key_tag = resolver.resolve(NodeKind::Scalar, Some(key), (true, false));
                let key_id = document.push_scalar(key_tag, key.clone());
                let value_id = build_node(document, value, resolver);
                document.insert(id, key_id, value_id);
            }
            id
        }
    }
}

proptest! {
    #[test]
    fn prop_acyclic_graphs_roundtrip(value in test_value_strategy()) {
        let resolver = CoreResolver::new();
        let mut document = Document::new();
        let root = build_node(&mut document, &value, &resolver);
        document.set_root(root);

        let text = dump(&document, &resolver, EmitOptions::default()).unwrap();
        let reloaded = load(&text, &resolver).unwrap().unwrap();
        prop_assert!(
            document.same_structure(&reloaded),
            "round-trip changed the graph:\n{text}"
        );
    }
}
