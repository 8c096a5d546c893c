//! Formatting options for the emitter.

use crate::{Encoding, ScalarStyle};

/// Line-break flavor for emitted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineBreak {
    Cr,
    #[default]
    Lf,
    CrLf,
}

impl LineBreak {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            LineBreak::Cr => "\r",
            LineBreak::Lf => "\n",
            LineBreak::CrLf => "\r\n",
        }
    }
}

/// Options for emitting YAML text.
#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Fully explicit tags and quoting.
    pub canonical: bool,
    /// Spaces per indentation level; values outside 2-9 fall back to 2.
    pub indent: usize,
    /// Preferred maximum line length; `None` disables wrapping.
    pub width: Option<usize>,
    /// Emit non-ASCII characters raw instead of escaped.
    pub allow_unicode: bool,
    /// Line-break flavor (default LF).
    pub line_break: LineBreak,
    /// Output byte encoding used by [`Emitter::finish`]; `None` means
    /// native string output.
    ///
    /// [`Emitter::finish`]: crate::Emitter::finish
    pub encoding: Option<Encoding>,
    /// Force a `---` before every document.
    pub explicit_start: bool,
    /// Force a `...` after every document.
    pub explicit_end: bool,
    /// Force a `%YAML` directive.
    pub version: Option<(u32, u32)>,
    /// Force `%TAG` directives, as (handle, prefix) pairs.
    pub tags: Vec<(String, String)>,
    /// Fallback scalar style when an event does not carry one.
    pub default_style: Option<ScalarStyle>,
    /// Fallback collection style: `Some(true)` flow, `Some(false)` block.
    pub default_flow_style: Option<bool>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            canonical: false,
            indent: 2,
            width: Some(80),
            allow_unicode: false,
            line_break: LineBreak::Lf,
            encoding: None,
            explicit_start: false,
            explicit_end: false,
            version: None,
            tags: Vec::new(),
            default_style: None,
            default_flow_style: None,
        }
    }
}

impl EmitOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request canonical output.
    pub fn canonical(mut self) -> Self {
        self.canonical = true;
        self
    }

    /// Set the indentation width.
    pub fn indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Set the preferred line width; `None` disables wrapping.
    pub fn width(mut self, width: Option<usize>) -> Self {
        self.width = width;
        self
    }

    /// Emit non-ASCII characters without escaping.
    pub fn allow_unicode(mut self) -> Self {
        self.allow_unicode = true;
        self
    }

    /// Set the output line break.
    pub fn line_break(mut self, line_break: LineBreak) -> Self {
        self.line_break = line_break;
        self
    }

    /// Set the output byte encoding.
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Force `---` document start markers.
    pub fn explicit_start(mut self) -> Self {
        self.explicit_start = true;
        self
    }

    /// Force `...` document end markers.
    pub fn explicit_end(mut self) -> Self {
        self.explicit_end = true;
        self
    }

    /// Force a `%YAML` directive.
    pub fn version(mut self, major: u32, minor: u32) -> Self {
        self.version = Some((major, minor));
        self
    }

    /// Force a `%TAG` directive.
    pub fn tag_directive(mut self, handle: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.tags.push((handle.into(), prefix.into()));
        self
    }

    /// Set the fallback scalar style.
    pub fn default_style(mut self, style: ScalarStyle) -> Self {
        self.default_style = Some(style);
        self
    }

    /// Set the fallback collection style.
    pub fn default_flow_style(mut self, flow: bool) -> Self {
        self.default_flow_style = Some(flow);
        self
    }

    pub(crate) fn best_indent(&self) -> usize {
        if (2..10).contains(&self.indent) {
            self.indent
        } else {
            2
        }
    }

    pub(crate) fn best_width(&self) -> usize {
        match self.width {
            Some(width) if width > self.best_indent() * 2 => width,
            Some(_) => 80,
            None => usize::MAX / 2,
        }
    }
}
