//! Undo/redo history over content snapshots.
//!
//! Provides:
//! - `HistoryEntry` - an immutable content snapshot
//! - `History` - a bounded linear undo/redo stack with a cursor
//!
//! History never decides *when* to record; the session controller does that.
//! All it guarantees is the linear model: pushing after stepping back discards
//! the redo branch, and a snapshot equal to the current one (markers ignored)
//! is never recorded twice in a row.

use std::fmt;

use crate::marker;

/// Default number of snapshots kept before the oldest are dropped.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// A recorded content snapshot.
///
/// May still contain the caret marker if it was captured during a rewrite;
/// installing such an entry puts the caret back where it was.
#[derive(Clone, PartialEq, Eq)]
pub struct HistoryEntry(String);

impl HistoryEntry {
    pub fn new(content: impl Into<String>) -> Self {
        Self(content.into())
    }

    /// Raw snapshot, marker included.
    pub fn content(&self) -> &str {
        &self.0
    }

    /// Whether this snapshot holds the same content as `other`, ignoring markers.
    pub fn same_content(&self, other: &str) -> bool {
        marker::same_content(&self.0, other)
    }
}

impl fmt::Debug for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HistoryEntry")
            .field(&marker::strip_markers(&self.0))
            .finish()
    }
}

impl AsRef<str> for HistoryEntry {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Linear undo/redo stack.
///
/// Always holds at least one entry and `position` always indexes a valid one.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistoryEntry>,
    position: usize,
    limit: usize,
}

impl History {
    /// Create a history seeded with `initial`.
    pub fn new(initial: impl Into<String>) -> Self {
        Self::with_limit(initial, DEFAULT_HISTORY_LIMIT)
    }

    /// Create a history seeded with `initial` that keeps at most `limit` entries.
    pub fn with_limit(initial: impl Into<String>, limit: usize) -> Self {
        Self {
            entries: vec![HistoryEntry::new(initial)],
            position: 0,
            limit: limit.max(1),
        }
    }

    /// Record `content` as the newest step.
    ///
    /// Entries past `position` are dropped first. Content equal to the entry
    /// at `position` is not appended, but the redo branch is still discarded.
    pub fn push(&mut self, content: impl Into<String>) {
        let content = content.into();
        self.entries.truncate(self.position + 1);

        if self.entries[self.position].same_content(&content) {
            tracing::trace!(
                target: "retype::history",
                position = self.position,
                "skipping duplicate snapshot"
            );
            return;
        }

        self.entries.push(HistoryEntry::new(content));

        // Trim if over limit
        if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            self.entries.drain(..excess);
        }
        self.position = self.entries.len() - 1;

        tracing::trace!(
            target: "retype::history",
            position = self.position,
            len = self.entries.len(),
            "pushed snapshot"
        );
    }

    /// Step back one entry, staying put at the oldest.
    pub fn prev(&mut self) -> &HistoryEntry {
        if self.position > 0 {
            self.position -= 1;
        }
        &self.entries[self.position]
    }

    /// Step forward one entry, staying put at the newest.
    pub fn next(&mut self) -> &HistoryEntry {
        if self.position < self.last_index() {
            self.position += 1;
        }
        &self.entries[self.position]
    }

    /// Whether the cursor is on the newest entry.
    pub fn is_last(&self) -> bool {
        self.position == self.last_index()
    }

    /// Entry under the cursor.
    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.position]
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; kept alongside `len` for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    fn last_index(&self) -> usize {
        self.entries.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::MARKER;

    fn contents(history: &History) -> Vec<&str> {
        history.entries().iter().map(|e| e.content()).collect()
    }

    #[test]
    fn test_push_and_step() {
        let mut history = History::new("A");
        history.push("B");
        history.push("C");
        assert_eq!(contents(&history), ["A", "B", "C"]);
        assert_eq!(history.position(), 2);
        assert!(history.is_last());

        assert_eq!(history.prev().content(), "B");
        assert!(!history.is_last());
        assert_eq!(history.next().content(), "C");
        assert!(history.is_last());
    }

    #[test]
    fn test_prev_and_next_are_idempotent_at_edges() {
        let mut history = History::new("A");
        history.push("B");

        assert_eq!(history.prev().content(), "A");
        assert_eq!(history.prev().content(), "A");
        assert_eq!(history.position(), 0);

        assert_eq!(history.next().content(), "B");
        assert_eq!(history.next().content(), "B");
        assert_eq!(history.position(), 1);
    }

    #[test]
    fn test_push_after_prev_prunes_redo_branch() {
        let mut history = History::new("A");
        history.push("B");
        history.push("C");

        assert_eq!(history.prev().content(), "B");
        history.push("D");

        assert_eq!(contents(&history), ["A", "B", "D"]);
        assert_eq!(history.position(), 2);
    }

    #[test]
    fn test_push_after_k_prevs_discards_k_entries() {
        let mut history = History::new("0");
        for i in 1..=5 {
            history.push(i.to_string());
        }
        history.prev();
        history.prev();
        history.prev();
        history.push("x");
        assert_eq!(contents(&history), ["0", "1", "2", "x"]);
    }

    #[test]
    fn test_duplicate_push_is_ignored() {
        let mut history = History::new("A");
        history.push("A");
        assert_eq!(history.len(), 1);

        let marked = format!("A{MARKER}");
        history.push(marked);
        assert_eq!(history.len(), 1);
        assert_eq!(history.position(), 0);
    }

    #[test]
    fn test_duplicate_push_still_discards_redo_branch() {
        let mut history = History::new("A");
        history.push("B");
        history.prev();
        history.push("A");
        assert_eq!(contents(&history), ["A"]);
        assert!(history.is_last());
    }

    #[test]
    fn test_prev_then_next_returns_to_same_entry() {
        let mut history = History::new("A");
        history.push("B");
        history.push("C");
        history.prev();

        let before = history.current().clone();
        history.prev();
        assert_eq!(history.next(), &before);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::with_limit("a", 3);
        history.push("b");
        history.push("c");
        history.push("d");

        assert_eq!(contents(&history), ["b", "c", "d"]);
        assert_eq!(history.position(), 2);
        assert!(history.is_last());
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let mut history = History::with_limit("a", 0);
        history.push("b");
        assert_eq!(contents(&history), ["b"]);
        assert_eq!(history.position(), 0);
    }

    #[test]
    fn test_position_stays_in_bounds() {
        let mut history = History::with_limit("", 4);
        let script = ["p:a", "p:b", "<", "<", "<", "p:c", ">", ">", "p:c", "p:d", "p:e", "<"];
        for step in script {
            match step {
                "<" => {
                    history.prev();
                }
                ">" => {
                    history.next();
                }
                push => history.push(&push[2..]),
            }
            assert!(history.position() < history.len());
            assert!(!history.is_empty());
        }
    }
}
