//! Event types produced by the parser and consumed by the emitter.

use crate::{Encoding, Mark, ScalarStyle};

/// The kind of a parsing event, with its payload.
///
/// Start events are always eventually matched by exactly one corresponding
/// end event at the same nesting depth; the parser enforces this and the
/// consumers rely on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    StreamStart {
        encoding: Option<Encoding>,
    },
    StreamEnd,
    DocumentStart {
        /// Whether `---` appeared in the source (or must appear in output).
        explicit: bool,
        version: Option<(u32, u32)>,
        /// `%TAG` handle/prefix pairs declared for this document.
        tags: Vec<(String, String)>,
    },
    DocumentEnd {
        explicit: bool,
    },
    Alias {
        anchor: String,
    },
    Scalar {
        anchor: Option<String>,
        tag: Option<String>,
        /// Whether the value round-trips through the resolver untagged when
        /// written (plain, non-plain).
        implicit: (bool, bool),
        value: String,
        style: Option<ScalarStyle>,
    },
    SequenceStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        /// `Some(true)` flow, `Some(false)` block, `None` undecided.
        flow_style: Option<bool>,
    },
    SequenceEnd,
    MappingStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        flow_style: Option<bool>,
    },
    MappingEnd,
}

impl EventKind {
    /// Short description used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            EventKind::StreamStart { .. } => "<stream start>",
            EventKind::StreamEnd => "<stream end>",
            EventKind::DocumentStart { .. } => "<document start>",
            EventKind::DocumentEnd { .. } => "<document end>",
            EventKind::Alias { .. } => "<alias>",
            EventKind::Scalar { .. } => "<scalar>",
            EventKind::SequenceStart { .. } => "<sequence start>",
            EventKind::SequenceEnd => "<sequence end>",
            EventKind::MappingStart { .. } => "<mapping start>",
            EventKind::MappingEnd => "<mapping end>",
        }
    }

    /// The anchor attached to this event, if any.
    pub fn anchor(&self) -> Option<&str> {
        match self {
            EventKind::Scalar { anchor, .. }
            | EventKind::SequenceStart { anchor, .. }
            | EventKind::MappingStart { anchor, .. } => anchor.as_deref(),
            _ => None,
        }
    }
}

/// An event with its source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub start: Mark,
    pub end: Mark,
}

impl Event {
    /// Create a new event.
    pub fn new(kind: EventKind, start: Mark, end: Mark) -> Self {
        Self { kind, start, end }
    }

    /// Create an event with no meaningful source position.
    pub fn synthetic(kind: EventKind) -> Self {
        Self {
            kind,
            start: Mark::synthetic(),
            end: Mark::synthetic(),
        }
    }
}
