//! Diagnostic rendering for load errors.
//!
//! Errors stay plain data; this module turns them into annotated source
//! reports. The context mark (where the surrounding construct began) gets a
//! secondary label, the problem mark a primary one.

use ariadne::{Color, Label, Report, ReportKind, Source};

use crate::LoadError;

impl LoadError {
    /// Render this error with ariadne against the source it came from.
    pub fn render(&self, filename: &str, source: &str) -> String {
        let mut output = Vec::new();
        self.write_report(filename, source, &mut output);
        String::from_utf8(output).unwrap_or_else(|_| self.to_string())
    }

    /// Write the annotated report to a writer.
    pub fn write_report<W: std::io::Write>(&self, filename: &str, source: &str, writer: W) {
        let (context, problem, problem_mark) = match self {
            LoadError::Reader(err) => {
                let range = byte_range_at(source, err.position);
                let report = Report::build(ReportKind::Error, (filename, range.clone()))
                    .with_message(&err.problem)
                    .with_label(
                        Label::new((filename, range))
                            .with_message("invalid input here")
                            .with_color(Color::Red),
                    );
                let _ = report.finish().write((filename, Source::from(source)), writer);
                return;
            }
            LoadError::Parse(err) => (
                err.context.as_deref().map(|c| (c, err.context_mark.clone())),
                err.problem.as_str(),
                err.problem_mark.clone(),
            ),
            LoadError::Compose(err) => (
                err.context.as_deref().map(|c| (c, err.context_mark.clone())),
                err.problem.as_str(),
                err.problem_mark.clone(),
            ),
        };

        let problem_range = byte_range_at(source, problem_mark.index);
        let mut report = Report::build(ReportKind::Error, (filename, problem_range.clone()))
            .with_message(problem)
            .with_label(
                Label::new((filename, problem_range))
                    .with_message(problem)
                    .with_color(Color::Red),
            );
        if let Some((context, Some(mark))) = context {
            report = report.with_label(
                Label::new((filename, byte_range_at(source, mark.index)))
                    .with_message(context)
                    .with_color(Color::Blue),
            );
        }
        let _ = report.finish().write((filename, Source::from(source)), writer);
    }
}

/// A one-character byte range at the given character index, clamped to the
/// source. [`Mark`] counts characters; ariadne wants byte offsets.
fn byte_range_at(source: &str, char_index: usize) -> std::ops::Range<usize> {
    let start = source
        .char_indices()
        .nth(char_index)
        .map(|(offset, _)| offset)
        .unwrap_or(source.len());
    let end = source[start..]
        .chars()
        .next()
        .map(|ch| start + ch.len_utf8())
        .unwrap_or(start);
    start..end.max(start)
}

#[cfg(test)]
mod tests {
    use crate::CoreResolver;

    fn load_err(source: &str) -> crate::LoadError {
        let resolver = CoreResolver::new();
        crate::load_all(source, &resolver).unwrap_err()
    }

    fn render_stripped(source: &str) -> String {
        let err = load_err(source);
        String::from_utf8(strip_ansi_escapes::strip(err.render("test.yaml", source))).unwrap()
    }

    #[test]
    fn test_duplicate_anchor_report_shows_both_sites() {
        let report = render_stripped("- &A 1\n- &A 2\n");
        assert!(report.contains("second occurrence"), "{report}");
        assert!(report.contains("first occurrence"), "{report}");
        assert!(report.contains("test.yaml"), "{report}");
    }

    #[test]
    fn test_parse_error_report_points_at_problem() {
        let report = render_stripped("key: ]");
        assert!(report.contains("expected the node content"), "{report}");
    }

    #[test]
    fn test_error_display_carries_both_positions() {
        let err = load_err("- &A 1\n- &A 2\n");
        insta::assert_snapshot!(
            err.to_string(),
            @r#"found duplicate anchor "A"; first occurrence in "<string>", line 1, column 3: second occurrence in "<string>", line 2, column 3"#
        );
    }

    #[test]
    fn test_reader_error_report() {
        let err = {
            let resolver = CoreResolver::new();
            crate::load("a\u{0}b", &resolver).unwrap_err()
        };
        let report =
            String::from_utf8(strip_ansi_escapes::strip(err.render("test.yaml", "a?b"))).unwrap();
        assert!(report.contains("special characters are not allowed"), "{report}");
    }
}
