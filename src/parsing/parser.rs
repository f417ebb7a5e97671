//! The per-language parser trait and shared tree-walking utilities.

use crate::parsing::common::{ParsedFile, ParserError};

/// Common interface every language extractor implements (spec.md §4.2).
///
/// Implementations must be partial-tolerant: a syntax error must not
/// discard symbols that were recovered above the error point.
pub trait LanguageParser: Send {
    fn parse(&mut self, path: &str, content: &[u8]) -> (ParsedFile, Vec<ParserError>);
}

/// Maximum recursion depth for AST traversal, guarding against stack
/// overflow on pathologically deep generated code.
pub const MAX_AST_DEPTH: usize = 500;

#[inline]
pub fn check_recursion_depth(depth: usize) -> bool {
    depth <= MAX_AST_DEPTH
}

/// Safely truncate a UTF-8 string at a character boundary at or before
/// `max_bytes`.
#[inline]
pub fn safe_truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut boundary = max_bytes;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }
    &s[..boundary]
}

/// Threshold under which an AST node's source text is inlined (spec.md §3).
pub const AST_INLINE_TEXT_THRESHOLD: usize = 100;

/// Strip common comment-syntax decoration (`/** */`, `///`, `#`, `"""`)
/// from a raw comment block, yielding the prose docstring body.
pub fn clean_doc_comment(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("/**")
        .or_else(|| trimmed.strip_prefix("/*!"))
        .or_else(|| trimmed.strip_prefix("/*"))
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("*/").unwrap_or(trimmed);
    let trimmed = trimmed
        .strip_prefix("\"\"\"")
        .and_then(|s| s.strip_suffix("\"\"\""))
        .unwrap_or(trimmed);

    trimmed
        .lines()
        .map(|line| {
            let line = line.trim();
            line.trim_start_matches("///")
                .trim_start_matches("//!")
                .trim_start_matches("//")
                .trim_start_matches('#')
                .trim_start_matches('*')
                .trim()
        })
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_utf8_boundaries() {
        let s = "Status: 🔍 Active";
        let truncated = safe_truncate_str(s, 10);
        assert!(truncated.len() <= 10);
        assert!(s.starts_with(truncated));
    }

    #[test]
    fn cleans_block_comment() {
        let raw = "/** authentication middleware\n * handles bearer tokens\n */";
        assert_eq!(clean_doc_comment(raw), "authentication middleware handles bearer tokens");
    }

    #[test]
    fn cleans_line_comments() {
        let raw = "/// Parses the request body\n/// and validates it";
        assert_eq!(clean_doc_comment(raw), "Parses the request body and validates it");
    }

    #[test]
    fn cleans_python_docstring() {
        let raw = "\"\"\"authentication middleware\"\"\"";
        assert_eq!(clean_doc_comment(raw), "authentication middleware");
    }
}
