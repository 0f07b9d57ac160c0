//! The caret sentinel.
//!
//! During a rewrite a single marker character is inserted at the caret so its
//! logical position can be recovered from whatever markup the rewrite
//! produces. Content comparisons elsewhere in the crate go through
//! [`same_content`] so a marker never makes two snapshots look different.

use std::borrow::Cow;

/// Sentinel inserted at the caret for the duration of a rewrite.
pub const MARKER: char = '\u{2603}';

/// Whether `s` contains the marker.
pub fn contains_marker(s: &str) -> bool {
    s.contains(MARKER)
}

/// Remove every marker from `s`, borrowing when there is nothing to remove.
pub fn strip_markers(s: &str) -> Cow<'_, str> {
    if contains_marker(s) {
        Cow::Owned(s.chars().filter(|&c| c != MARKER).collect())
    } else {
        Cow::Borrowed(s)
    }
}

/// Byte index of the first marker in `s`.
pub fn marker_index(s: &str) -> Option<usize> {
    s.find(MARKER)
}

/// Content equality with markers ignored.
pub fn same_content(a: &str, b: &str) -> bool {
    let mut left = a.chars().filter(|&c| c != MARKER);
    let mut right = b.chars().filter(|&c| c != MARKER);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return true,
            (Some(l), Some(r)) if l == r => continue,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_borrows_without_marker() {
        assert!(matches!(strip_markers("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_strip_removes_all_markers() {
        let s = format!("a{MARKER}b{MARKER}");
        assert_eq!(strip_markers(&s), "ab");
    }

    #[test]
    fn test_same_content_ignores_marker() {
        let marked = format!("ab{MARKER}cd");
        assert!(same_content(&marked, "abcd"));
        assert!(same_content("abcd", &marked));
        assert!(!same_content(&marked, "abc"));
        assert!(!same_content("abce", "abcd"));
    }

    #[test]
    fn test_marker_index_is_byte_offset() {
        let s = format!("é{MARKER}");
        assert_eq!(marker_index(&s), Some('é'.len_utf8()));
        assert_eq!(marker_index("none"), None);
    }
}
