//! DOT format helpers for Graphviz output.

/// Escapes a string for use inside a quoted DOT label.
///
/// Handles quotes, backslashes, line breaks and the record-shape delimiters
/// `<`, `>`, `{`, `}` and `|` which appear frequently in rendered IR.
#[must_use]
pub fn escape_dot(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\l"),
            '\r' => {}
            '<' | '>' | '{' | '}' | '|' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_dot_plain() {
        assert_eq!(escape_dot("l0 = 1"), "l0 = 1");
    }

    #[test]
    fn test_escape_dot_quotes_and_backslash() {
        assert_eq!(escape_dot("a\"b\\c"), "a\\\"b\\\\c");
    }

    #[test]
    fn test_escape_dot_lines_left_justified() {
        assert_eq!(escape_dot("s0 = 1\r\ns1 = 2\n"), "s0 = 1\\ls1 = 2\\l");
    }

    #[test]
    fn test_escape_dot_record_delimiters() {
        assert_eq!(escape_dot("if (a < b) {"), "if (a \\< b) \\{");
        assert_eq!(escape_dot("a | b"), "a \\| b");
    }
}
