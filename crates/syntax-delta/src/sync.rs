//! Rope-backed text mirror kept in sync from [`TreeDelta`]s.
//!
//! The mirror never re-serializes the whole tree: after a transaction it replays the span edits
//! of the event's delta, copying only the inserted text out of the tree.

use crate::arena::SyntaxTree;
use crate::delta::TreeDelta;
use ropey::Rope;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced while applying a delta to a [`DocumentMirror`].
pub enum SyncError {
    #[error("delta expects a document of {expected} chars, mirror has {actual}")]
    /// The delta was computed against a different document state.
    LengthMismatch {
        /// `before_len` of the delta.
        expected: usize,
        /// Current length of the mirror.
        actual: usize,
    },

    #[error("span {start}..{end} is out of bounds for length {len}")]
    /// A span points past the end of the mirror or of the tree.
    OutOfBounds {
        /// Span start.
        start: usize,
        /// Span end (exclusive).
        end: usize,
        /// Length the span was checked against.
        len: usize,
    },
}

/// Plain-text copy of a syntax tree, updated incrementally.
#[derive(Debug, Clone)]
pub struct DocumentMirror {
    rope: Rope,
    version: u64,
}

impl DocumentMirror {
    /// Snapshot the current text of `tree`.
    pub fn new(tree: &SyntaxTree) -> Self {
        Self {
            rope: Rope::from_str(&tree.text(tree.root())),
            version: 0,
        }
    }

    /// Apply the edits of one transaction.
    ///
    /// `tree` must be in its post-transaction state; inserted text is read from it. The mirror
    /// is left untouched when the delta does not fit.
    pub fn apply(&mut self, delta: &TreeDelta, tree: &SyntaxTree) -> Result<(), SyncError> {
        let actual = self.rope.len_chars();
        if delta.before_len != actual {
            return Err(SyncError::LengthMismatch {
                expected: delta.before_len,
                actual,
            });
        }
        let tree_len = tree.text_len(tree.root());
        if tree_len != delta.after_len {
            return Err(SyncError::LengthMismatch {
                expected: delta.after_len,
                actual: tree_len,
            });
        }

        // Validate every span against the evolving length before mutating anything.
        let mut len = actual;
        for edit in &delta.edits {
            if edit.old_end() > len {
                return Err(SyncError::OutOfBounds {
                    start: edit.start,
                    end: edit.old_end(),
                    len,
                });
            }
            if edit.new_end() > tree_len {
                return Err(SyncError::OutOfBounds {
                    start: edit.start,
                    end: edit.new_end(),
                    len: tree_len,
                });
            }
            len = len - edit.old_len + edit.new_len;
        }

        for edit in &delta.edits {
            if edit.old_len > 0 {
                self.rope.remove(edit.start..edit.old_end());
            }
            if edit.new_len > 0 {
                let inserted = tree.text_in_range(edit.start, edit.new_len);
                self.rope.insert(edit.start, &inserted);
            }
        }
        self.version += 1;
        tracing::debug!(
            version = self.version,
            edits = delta.edits.len(),
            len = self.rope.len_chars(),
            "applied tree delta"
        );
        Ok(())
    }

    /// Full text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Length in chars.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Number of lines (an empty document has one).
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Line and column of a char offset, clamped to the document end.
    pub fn position(&self, char_offset: usize) -> (usize, usize) {
        let char_offset = char_offset.min(self.rope.len_chars());
        let line = self.rope.char_to_line(char_offset);
        (line, char_offset - self.rope.line_to_char(line))
    }

    /// Number of deltas applied so far.
    pub fn version(&self) -> u64 {
        self.version
    }
}
