//! Event-based parser for YAML 1.1 token streams.

pub use kedge_scanner::{
    Directive, Encoding, Mark, ReaderError, ScalarStyle, ScanError, Scanner, Token, TokenKind,
};

mod event;
pub use event::{Event, EventKind};

mod error;
pub use error::ParseError;

mod parser;
pub use parser::Parser;
