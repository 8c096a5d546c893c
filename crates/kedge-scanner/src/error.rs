//! Error types for the reader and scanner.

use std::fmt;

use crate::Mark;

/// Failure while decoding or validating raw input.
///
/// Raised for malformed byte sequences and for characters outside the YAML
/// printable set. `position` counts characters (or bytes, for decode
/// failures) from the start of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderError {
    /// Name of the stream.
    pub name: String,
    /// Offset at which the bad input was found.
    pub position: usize,
    /// The offending character, if the input decoded far enough to have one.
    pub character: Option<char>,
    /// What went wrong.
    pub problem: String,
}

impl ReaderError {
    pub(crate) fn new(
        name: &str,
        position: usize,
        character: Option<char>,
        problem: impl Into<String>,
    ) -> Self {
        Self {
            name: name.to_string(),
            position,
            character,
            problem: problem.into(),
        }
    }
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.character {
            Some(ch) => write!(
                f,
                "{}: {:?}: {} (position {})",
                self.name, ch, self.problem, self.position
            ),
            None => write!(f, "{}: {} (position {})", self.name, self.problem, self.position),
        }
    }
}

impl std::error::Error for ReaderError {}

/// A lexical error, pointing at where the conflict was detected and,
/// when useful, at where the surrounding construct began.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    /// What was being scanned when the problem appeared.
    pub context: Option<String>,
    /// Where the surrounding construct began.
    pub context_mark: Option<Mark>,
    /// What went wrong.
    pub problem: String,
    /// Where the problem was detected.
    pub problem_mark: Mark,
}

impl ScanError {
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

impl fmt::Display for ScanError {
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

impl std::error::Error for ScanError {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_scan_error_display() {
        let err = ScanError::with_context(
            "while scanning a double-quoted scalar",
            Mark::new(Arc::from("t"), 0, 0, 0),
            "found unexpected end of stream",
            Mark::new(Arc::from("t"), 7, 0, 7),
        );
        let text = err.to_string();
        assert!(text.contains("double-quoted scalar"));
        assert!(text.contains("line 1, column 1"));
        assert!(text.contains("line 1, column 8"));
    }
}
