//! Finding a raw alias inside a frontmatter block.
//!
//! Aliases may be written bare, quoted, YAML-escaped, inside a flow list
//! (`[a, "b"]`) or as block list items (`  - a`). The locator tries the forms
//! from most to least specific and then widens the match so that deleting the
//! selection leaves a well-formed list behind.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::frontmatter::block_range;

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n|\r|\n").expect("line break pattern is valid"));

static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ +- ").expect("list item pattern is valid"));

/// 0-based line and character column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub from: Position,
    pub to: Position,
}

/// Locate the `occurrence`-th (1-based) appearance of `raw_alias` in a
/// frontmatter block. Lines are counted from the start of the block.
pub fn locate(block: &str, raw_alias: &str, occurrence: usize) -> Option<Selection> {
    if raw_alias.is_empty() {
        return None;
    }

    let escaped = regex::escape(raw_alias);
    let mut selection_len = raw_alias.chars().count();

    let mut start = search(block, &format!(r#"" *{escaped} *""#), occurrence)
        .or_else(|| search(block, &format!(r"\b{escaped}\b"), occurrence));

    if start.is_none() && (raw_alias.contains('"') || raw_alias.contains('\\')) {
        let escape_count = raw_alias.chars().filter(|c| matches!(c, '"' | '\\')).count();
        let yaml_escaped = raw_alias.replace('\\', r"\\").replace('"', r#"\""#);
        start = search(block, &format!(r#"" *{} *""#, regex::escape(&yaml_escaped)), occurrence);
        if start.is_some() {
            selection_len += escape_count;
        }
    }

    let start = start.or_else(|| search(block, &escaped, occurrence))?;

    let (line_no, line, line_start) = line_at(block, start);
    let column_from = block[line_start..start].chars().count();
    Some(adjust_selection(line, line_no, column_from, selection_len))
}

/// Like [`locate`], on a whole document. `None` without a frontmatter block.
pub fn locate_in_document(content: &str, raw_alias: &str, occurrence: usize) -> Option<Selection> {
    let range = block_range(content)?;
    locate(&content[range], raw_alias, occurrence)
}

/// Byte offset of the nth match, restarting one character after each match
/// start. `None` when there are fewer than `occurrence` matches.
fn search(text: &str, pattern: &str, occurrence: usize) -> Option<usize> {
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => {
            tracing::debug!(pattern, error = %e, "could not build locator pattern");
            return None;
        }
    };

    let mut found = re.find(text)?.start();
    for _ in 1..occurrence {
        let step = text[found..].chars().next().map_or(1, char::len_utf8);
        match re.find_at(text, found + step) {
            Some(m) => found = m.start(),
            None => return None,
        }
    }
    Some(found)
}

/// Line number, line text and line start offset for a byte offset.
fn line_at(text: &str, offset: usize) -> (usize, &str, usize) {
    let mut line_no = 0;
    let mut line_start = 0;
    let mut line_end = text.len();

    for br in LINE_BREAK.find_iter(text) {
        if br.end() <= offset {
            line_no += 1;
            line_start = br.end();
        } else {
            line_end = br.start();
            break;
        }
    }

    (line_no, &text[line_start..line_end], line_start)
}

fn adjust_selection(line: &str, line_no: usize, column_from: usize, selection_len: usize) -> Selection {
    let chars: Vec<char> = line.chars().collect();
    let at = |i: usize| chars.get(i).copied();

    let mut from = column_from;
    let mut len = selection_len;

    if from > 0 {
        if LIST_ITEM.is_match(line) {
            // Whole item including its line break.
            return Selection {
                from: Position::new(line_no, 0),
                to: Position::new(line_no + 1, 0),
            };
        }

        if at(from) == Some('"') {
            len += 1;
        }
        if at(from + len) == Some('"') {
            len += 1;
        }

        // Last item of a flow list: take the separator in front instead.
        if from >= 2 && chars[from - 2..from] == [',', ' '] {
            from -= 2;
            len += 2;
            return Selection {
                from: Position::new(line_no, from),
                to: Position::new(line_no, from + len),
            };
        }

        if at(from + len) == Some(',') {
            len += 1;
        }
        if at(from + len) == Some(' ') {
            len += 1;
        }
        if at(from + len) == Some(']') && matches!(at(from - 1), Some(' ' | ',')) {
            from -= 1;
            len += 1;
        }
    }

    Selection {
        from: Position::new(line_no, from),
        to: Position::new(line_no, from + len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(selection: Selection) -> (usize, usize, usize, usize) {
        (selection.from.line, selection.from.column, selection.to.line, selection.to.column)
    }

    #[test]
    fn test_quoted_flow_list_occurrences() {
        let block = "---\naliases: [\"x\", \"x\"]\n---";
        assert_eq!(locate(block, "x", 1).map(span), Some((1, 10, 1, 15)));
        assert_eq!(locate(block, "x", 2).map(span), Some((1, 13, 1, 18)));
    }

    #[test]
    fn test_missing_occurrence_is_not_found() {
        let block = "---\naliases: [\"x\"]\n---";
        assert!(locate(block, "x", 1).is_some());
        assert!(locate(block, "x", 3).is_none());
    }

    #[test]
    fn test_mixed_quoted_and_bare_occurrences() {
        // The quoted search has one match, so the second occurrence comes
        // from the word-bounded search.
        let block = "---\naliases: [\"x\", x]\n---";
        assert_eq!(locate(block, "x", 1).map(span), Some((1, 10, 1, 15)));
        assert_eq!(locate(block, "x", 2).map(span), Some((1, 13, 1, 16)));
        assert!(locate(block, "x", 3).is_none());
    }

    #[test]
    fn test_unquoted_flow_list() {
        let block = "---\naliases: [a, b]\n---";
        assert_eq!(locate(block, "b", 1).map(span), Some((1, 11, 1, 14)));
        assert_eq!(locate(block, "a", 1).map(span), Some((1, 10, 1, 13)));
    }

    #[test]
    fn test_block_list_item_selects_whole_line() {
        let block = "---\naliases:\n  - one\n  - two\n---";
        assert_eq!(locate(block, "two", 1).map(span), Some((3, 0, 4, 0)));
    }

    #[test]
    fn test_yaml_escaped_alias() {
        let block = "---\naliases: [\"say \\\"hi\\\"\"]\n---";
        assert_eq!(locate(block, "say \"hi\"", 1).map(span), Some((1, 10, 1, 22)));
    }

    #[test]
    fn test_scalar_value() {
        let block = "---\naliases: solo\n---";
        assert_eq!(locate(block, "solo", 1).map(span), Some((1, 9, 1, 13)));
    }

    #[test]
    fn test_not_found() {
        assert!(locate("---\naliases: [a]\n---", "zzz", 1).is_none());
        assert!(locate("---\naliases: [a]\n---", "", 1).is_none());
    }

    #[test]
    fn test_locate_in_document_crlf() {
        let content = "---\r\naliases: [a, b]\r\n---\r\nbody b";
        assert_eq!(locate_in_document(content, "b", 1).map(span), Some((1, 11, 1, 14)));
        assert!(locate_in_document("no frontmatter", "b", 1).is_none());
    }
}
