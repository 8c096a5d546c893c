//! Parser error type.

use std::fmt;

use crate::{Mark, ScanError};

/// A grammar violation in the token stream, or a lexical error carried up
/// from the scanner. Same shape as [`ScanError`]: an optional context pair
/// pointing at the surrounding construct, plus the problem itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub context: Option<String>,
    pub context_mark: Option<Mark>,
    pub problem: String,
    pub problem_mark: Mark,
}

impl ParseError {
    pub(crate) fn new(problem: impl Into<String>, problem_mark: Mark) -> Self {
        Self {
            context: None,
            context_mark: None,
            problem: problem.into(),
            problem_mark,
        }
    }

    pub(crate) fn with_context(
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

impl From<ScanError> for ParseError {
    fn from(err: ScanError) -> Self {
        Self {
            context: err.context,
            context_mark: err.context_mark,
            problem: err.problem,
            problem_mark: err.problem_mark,
        }
    }
}

impl fmt::Display for ParseError {
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

impl std::error::Error for ParseError {}
