use std::fmt::Display;

use crate::error::Location;

fn get_line(source: &str, line: usize) -> &str {
    source.lines().nth(line.saturating_sub(1)).unwrap_or("")
}

/// Formats an error message with the offending source line and a caret under
/// the reported column.
/// ```text
/// (3:5): expected `:`, found identifier `Integer`
///
///     x Integer
///       ^
/// ```
pub fn format_error(source: &str, location: &Location, error: impl Display) -> String {
    let line = location.line;
    let column = location.column;
    let line_contents = get_line(source, line);
    let marker_line = " ".repeat(column.saturating_sub(1)) + "^";
    format!("({line}:{column}): {error}\n\n{line_contents}\n{marker_line}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caret_points_at_column() {
        let source = "AREA A 1 1 {\n  COMPOSITE\n}";
        let location = Location::new(None, 2, 3);
        let text = format_error(source, &location, "expected type name");
        assert_eq!(text, "(2:3): expected type name\n\n  COMPOSITE\n  ^");
    }

    #[test]
    fn test_line_past_end_is_empty() {
        let text = format_error("", &Location::new(None, 4, 1), "unexpected end of file");
        assert!(text.ends_with("\n\n\n^"));
    }
}
