//! Scalar analysis: which output styles can represent a given value.

/// What the emitter learned about one scalar value.
///
/// The allow flags narrow the style choice: plain > single-quoted >
/// double-quoted > block, with double-quoted always possible.
#[derive(Debug, Clone)]
pub struct ScalarAnalysis {
    /// The analyzed text.
    pub scalar: String,
    pub empty: bool,
    pub multiline: bool,
    pub allow_flow_plain: bool,
    pub allow_block_plain: bool,
    pub allow_single_quoted: bool,
    pub allow_double_quoted: bool,
    pub allow_block: bool,
}

#[inline]
fn is_break(ch: char) -> bool {
    matches!(ch, '\n' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

#[inline]
fn is_space_or_break(ch: char) -> bool {
    matches!(ch, '\0' | ' ' | '\t' | '\r') || is_break(ch)
}

/// Whether a character may appear raw in output when unicode is allowed.
pub(crate) fn is_allowed_unicode(ch: char) -> bool {
    matches!(ch,
        '\u{a0}'..='\u{d7ff}' | '\u{e000}'..='\u{fffd}' | '\u{10000}'..='\u{10ffff}')
        && ch != '\u{feff}'
}

/// Analyze a scalar value and work out which styles can carry it.
pub fn analyze_scalar(scalar: &str, allow_unicode: bool) -> ScalarAnalysis {
    if scalar.is_empty() {
        // Only quoted styles can write an empty string.
        return ScalarAnalysis {
            scalar: String::new(),
            empty: true,
            multiline: false,
            allow_flow_plain: false,
            allow_block_plain: true,
            allow_single_quoted: true,
            allow_double_quoted: true,
            allow_block: false,
        };
    }

    let chars: Vec<char> = scalar.chars().collect();

    let mut block_indicators = false;
    let mut flow_indicators = false;
    let mut line_breaks = false;
    let mut special_characters = false;

    let mut leading_space = false;
    let mut leading_break = false;
    let mut trailing_space = false;
    let mut trailing_break = false;
    let mut break_space = false;
    let mut space_break = false;

    if scalar.starts_with("---") || scalar.starts_with("...") {
        block_indicators = true;
        flow_indicators = true;
    }

    let mut preceded_by_whitespace = true;
    let mut followed_by_whitespace = chars.len() == 1 || is_space_or_break(chars[1]);
    let mut previous_space = false;
    let mut previous_break = false;

    for (index, &ch) in chars.iter().enumerate() {
        if index == 0 {
            if matches!(
                ch,
                '#' | ',' | '[' | ']' | '{' | '}' | '&' | '*' | '!' | '|' | '>' | '\'' | '"'
                    | '%' | '@' | '`'
            ) {
                flow_indicators = true;
                block_indicators = true;
            }
            if matches!(ch, '?' | ':') {
                flow_indicators = true;
                if followed_by_whitespace {
                    block_indicators = true;
                }
            }
            if ch == '-' && followed_by_whitespace {
                flow_indicators = true;
                block_indicators = true;
            }
        } else {
            if matches!(ch, ',' | '?' | '[' | ']' | '{' | '}') {
                flow_indicators = true;
            }
            if ch == ':' {
                flow_indicators = true;
                if followed_by_whitespace {
                    block_indicators = true;
                }
            }
            if ch == '#' && preceded_by_whitespace {
                flow_indicators = true;
                block_indicators = true;
            }
        }

        if is_break(ch) {
            line_breaks = true;
        }
        if !(ch == '\n' || (' '..='\x7e').contains(&ch)) {
            if ch != '\u{85}' && !is_allowed_unicode(ch) {
                special_characters = true;
            } else if !allow_unicode {
                special_characters = true;
            }
        }

        if ch == ' ' {
            if index == 0 {
                leading_space = true;
            }
            if index == chars.len() - 1 {
                trailing_space = true;
            }
            if previous_break {
                break_space = true;
            }
            previous_space = true;
            previous_break = false;
        } else if is_break(ch) {
            if index == 0 {
                leading_break = true;
            }
            if index == chars.len() - 1 {
                trailing_break = true;
            }
            if previous_space {
                space_break = true;
            }
            previous_space = false;
            previous_break = true;
        } else {
            previous_space = false;
            previous_break = false;
        }

        preceded_by_whitespace = is_space_or_break(ch);
        followed_by_whitespace =
            index + 2 >= chars.len() || is_space_or_break(chars[index + 2]);
    }

    let mut allow_flow_plain = true;
    let mut allow_block_plain = true;
    let mut allow_single_quoted = true;
    let allow_double_quoted = true;
    let mut allow_block = true;

    // Leading and trailing whitespace rules out plain styles.
    if leading_space || leading_break || trailing_space || trailing_break {
        allow_flow_plain = false;
        allow_block_plain = false;
    }
    if trailing_space {
        allow_block = false;
    }
    // Spaces at the start of a line survive only in block scalars.
    if break_space {
        allow_flow_plain = false;
        allow_block_plain = false;
        allow_single_quoted = false;
    }
    // A space before a break, or a special character, needs double quotes.
    if space_break || special_characters {
        allow_flow_plain = false;
        allow_block_plain = false;
        allow_single_quoted = false;
        allow_block = false;
    }
    // Multiline plain scalars are never emitted.
    if line_breaks {
        allow_flow_plain = false;
        allow_block_plain = false;
    }
    if flow_indicators {
        allow_flow_plain = false;
    }
    if block_indicators {
        allow_block_plain = false;
    }

    ScalarAnalysis {
        scalar: scalar.to_string(),
        empty: false,
        multiline: line_breaks,
        allow_flow_plain,
        allow_block_plain,
        allow_single_quoted,
        allow_double_quoted,
        allow_block,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinary_word_allows_everything() {
        let analysis = analyze_scalar("hello", false);
        assert!(analysis.allow_flow_plain);
        assert!(analysis.allow_block_plain);
        assert!(analysis.allow_single_quoted);
        assert!(analysis.allow_block);
        assert!(!analysis.multiline);
    }

    #[test]
    fn test_leading_space_blocks_plain() {
        let analysis = analyze_scalar(" padded", false);
        assert!(!analysis.allow_flow_plain);
        assert!(!analysis.allow_block_plain);
        assert!(analysis.allow_single_quoted);
    }

    #[test]
    fn test_flow_indicator_blocks_flow_plain_only() {
        let analysis = analyze_scalar("a,b", false);
        assert!(!analysis.allow_flow_plain);
        assert!(analysis.allow_block_plain);
    }

    #[test]
    fn test_colon_space_blocks_plain_everywhere() {
        let analysis = analyze_scalar("a: b", false);
        assert!(!analysis.allow_flow_plain);
        assert!(!analysis.allow_block_plain);
        assert!(analysis.allow_single_quoted);
    }

    #[test]
    fn test_line_break_forces_non_plain() {
        let analysis = analyze_scalar("two\nlines", false);
        assert!(analysis.multiline);
        assert!(!analysis.allow_flow_plain);
        assert!(!analysis.allow_block_plain);
        assert!(analysis.allow_block);
    }

    #[test]
    fn test_control_character_needs_double_quotes() {
        let analysis = analyze_scalar("bell\u{7}", false);
        assert!(!analysis.allow_single_quoted);
        assert!(!analysis.allow_block);
        assert!(analysis.allow_double_quoted);
    }

    #[test]
    fn test_unicode_depends_on_allow_unicode() {
        let escaped = analyze_scalar("caf\u{e9}", false);
        assert!(!escaped.allow_single_quoted);
        let raw = analyze_scalar("caf\u{e9}", true);
        assert!(raw.allow_flow_plain);
    }

    #[test]
    fn test_document_marker_prefix_is_special() {
        let analysis = analyze_scalar("--- not a doc", false);
        assert!(!analysis.allow_flow_plain);
        assert!(!analysis.allow_block_plain);
    }
}
