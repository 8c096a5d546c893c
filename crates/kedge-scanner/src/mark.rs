//! Position tracking for source locations.

use std::fmt;
use std::sync::Arc;

/// A position in an input stream.
///
/// All fields are 0-based; `index` counts characters from the start of the
/// decoded stream. Marks are attached to every token, event, and error so a
/// failure can always point back at the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mark {
    /// Name of the stream (file name, `"<string>"`, ...).
    pub name: Arc<str>,
    /// Character offset from the start of the stream.
    pub index: usize,
    /// Line number.
    pub line: usize,
    /// Column number.
    pub column: usize,
}

impl Mark {
    /// Create a new mark.
    pub fn new(name: Arc<str>, index: usize, line: usize, column: usize) -> Self {
        Self {
            name,
            index,
            line,
            column,
        }
    }

    /// A mark for generated content that has no source position.
    pub fn synthetic() -> Self {
        Self {
            name: Arc::from("<generated>"),
            index: 0,
            line: 0,
            column: 0,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "in \"{}\", line {}, column {}",
            self.name,
            self.line + 1,
            self.column + 1
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_one_based() {
        let mark = Mark::new(Arc::from("test.yaml"), 12, 2, 4);
        assert_eq!(mark.to_string(), "in \"test.yaml\", line 3, column 5");
    }
}
