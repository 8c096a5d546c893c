use super::*;
use crate::Encoding;

fn parse(source: &str) -> Vec<EventKind> {
    Parser::from_str(source)
        .unwrap()
        .parse_to_vec()
        .unwrap()
        .into_iter()
        .map(|event| event.kind)
        .collect()
}

fn parse_err(source: &str) -> ParseError {
    let parser = Parser::from_str(source).unwrap();
    for event in parser {
        if let Err(err) = event {
            return err;
        }
    }
    panic!("expected a parse error for {source:?}");
}

fn plain_scalar(value: &str) -> EventKind {
    EventKind::Scalar {
        anchor: None,
        tag: None,
        implicit: (true, false),
        value: value.to_string(),
        style: Some(ScalarStyle::Plain),
    }
}

#[test]
fn test_empty_stream() {
    assert_eq!(
        parse(""),
        vec![
            EventKind::StreamStart {
                encoding: Some(Encoding::Utf8)
            },
            EventKind::StreamEnd,
        ]
    );
}

#[test]
fn test_flow_sequence_events() {
    assert_eq!(
        parse("[1, 2, 3]"),
        vec![
            EventKind::StreamStart {
                encoding: Some(Encoding::Utf8)
            },
            EventKind::DocumentStart {
                explicit: false,
                version: None,
                tags: Vec::new(),
            },
            EventKind::SequenceStart {
                anchor: None,
                tag: None,
                implicit: true,
                flow_style: Some(true),
            },
            plain_scalar("1"),
            plain_scalar("2"),
            plain_scalar("3"),
            EventKind::SequenceEnd,
            EventKind::DocumentEnd { explicit: false },
            EventKind::StreamEnd,
        ]
    );
}

#[test]
fn test_block_mapping_events() {
    let block_mapping_start = EventKind::MappingStart {
        anchor: None,
        tag: None,
        implicit: true,
        flow_style: Some(false),
    };
    assert_eq!(
        parse("a: 1\nb:\n  c: 3\n"),
        vec![
            EventKind::StreamStart {
                encoding: Some(Encoding::Utf8)
            },
            EventKind::DocumentStart {
                explicit: false,
                version: None,
                tags: Vec::new(),
            },
            block_mapping_start.clone(),
            plain_scalar("a"),
            plain_scalar("1"),
            plain_scalar("b"),
            block_mapping_start,
            plain_scalar("c"),
            plain_scalar("3"),
            EventKind::MappingEnd,
            EventKind::MappingEnd,
            EventKind::DocumentEnd { explicit: false },
            EventKind::StreamEnd,
        ]
    );
}

#[test]
fn test_start_end_events_balance() {
    let source = "a:\n- 1\n- {x: [y, z], w: {}}\n- [[1], [2, [3]]]\n";
    let mut depth = 0usize;
    let mut starts = 0;
    let mut ends = 0;
    for kind in parse(source) {
        match kind {
            EventKind::SequenceStart { .. } | EventKind::MappingStart { .. } => {
                depth += 1;
                starts += 1;
            }
            EventKind::SequenceEnd | EventKind::MappingEnd => {
                depth = depth.checked_sub(1).expect("end without matching start");
                ends += 1;
            }
            _ => {}
        }
    }
    assert_eq!(depth, 0);
    assert_eq!(starts, ends);
}

#[test]
fn test_two_documents() {
    let events = parse("---\na: 1\n---\nb: 2\n");
    let doc_starts = events
        .iter()
        .filter(|e| matches!(e, EventKind::DocumentStart { explicit: true, .. }))
        .count();
    assert_eq!(doc_starts, 2);
    let doc_ends = events
        .iter()
        .filter(|e| matches!(e, EventKind::DocumentEnd { .. }))
        .count();
    assert_eq!(doc_ends, 2);
}

#[test]
fn test_flow_mapping_single_entry_shorthand() {
    // `{a}` is the same as `{a: null}`: the value is a synthesized empty
    // scalar.
    let events = parse("{a}");
    assert_eq!(
        events[2..6],
        [
            EventKind::MappingStart {
                anchor: None,
                tag: None,
                implicit: true,
                flow_style: Some(true),
            },
            plain_scalar("a"),
            plain_scalar(""),
            EventKind::MappingEnd,
        ]
    );
}

#[test]
fn test_missing_value_is_synthesized() {
    let events = parse("a:\n");
    assert!(events.contains(&plain_scalar("")));
}

#[test]
fn test_indentless_sequence() {
    let events = parse("seq:\n- a\n- b\n");
    assert!(events.contains(&EventKind::SequenceStart {
        anchor: None,
        tag: None,
        implicit: true,
        flow_style: Some(false),
    }));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, EventKind::SequenceEnd))
            .count(),
        1
    );
}

#[test]
fn test_anchor_and_tag_attach_in_either_order() {
    let anchored_first = parse("- &a !!str x\n");
    let tagged_first = parse("- !!str &a x\n");
    let expected = EventKind::Scalar {
        anchor: Some("a".to_string()),
        tag: Some("tag:yaml.org,2002:str".to_string()),
        implicit: (false, false),
        value: "x".to_string(),
        style: Some(ScalarStyle::Plain),
    };
    assert!(anchored_first.contains(&expected));
    assert!(tagged_first.contains(&expected));
}

#[test]
fn test_tag_directive_expands_handle() {
    let events = parse("%TAG !e! tag:example.com,2000:\n---\n!e!thing x\n");
    assert!(events.contains(&EventKind::Scalar {
        anchor: None,
        tag: Some("tag:example.com,2000:thing".to_string()),
        implicit: (false, false),
        value: "x".to_string(),
        style: Some(ScalarStyle::Plain),
    }));
}

#[test]
fn test_undefined_tag_handle_is_rejected() {
    let err = parse_err("!x!int 3\n");
    assert!(err.problem.contains("undefined tag handle"));
}

#[test]
fn test_duplicate_yaml_directive_is_rejected() {
    let err = parse_err("%YAML 1.1\n%YAML 1.1\n---\nx\n");
    assert_eq!(err.problem, "found duplicate YAML directive");
}

#[test]
fn test_incompatible_version_is_rejected() {
    let err = parse_err("%YAML 2.0\n---\nx\n");
    assert!(err.problem.contains("incompatible YAML document"));
}

#[test]
fn test_unbalanced_flow_indicator_in_block_context() {
    let err = parse_err("key: ]");
    assert_eq!(err.problem, "expected the node content, but found ']'");
    assert_eq!(err.problem_mark.line, 0);
    assert_eq!(err.problem_mark.column, 5);
}

#[test]
fn test_explicit_key_form() {
    let events = parse("? a\n: b\n");
    assert_eq!(
        events[2..6],
        [
            EventKind::MappingStart {
                anchor: None,
                tag: None,
                implicit: true,
                flow_style: Some(false),
            },
            plain_scalar("a"),
            plain_scalar("b"),
            EventKind::MappingEnd,
        ]
    );
}

#[test]
fn test_document_end_marker_is_explicit() {
    let events = parse("a\n...\n");
    assert!(events.contains(&EventKind::DocumentEnd { explicit: true }));
}

#[test]
fn test_alias_event() {
    let events = parse("[&a x, *a]");
    assert!(events.contains(&EventKind::Alias {
        anchor: "a".to_string()
    }));
}
