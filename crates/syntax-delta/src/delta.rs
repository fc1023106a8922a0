//! Span deltas derived from a change event.
//!
//! Consumers that mirror the tree's text (document sync, incremental re-lexing, indexing)
//! do not want node identities; they want the text ranges that changed. [`TreeDelta`] turns
//! the tracked parents of a [`TreeChangeEvent`] into an ordered list of span edits expressed in
//! **character offsets** (Unicode scalar values), without ever reading the old text.

use crate::access::TreeAccess;
use crate::event::TreeChangeEvent;
use std::fmt;
use std::hash::Hash;

/// One replaced span.
///
/// Semantics:
/// - `start` is a character offset in the document **at the time this edit is applied**.
/// - `old_len` characters starting at `start` are replaced by `new_len` characters.
/// - Edits inside a [`TreeDelta`] must be applied **in order**; the inserted text of an edit is
///   the post-transaction text at `start..start + new_len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanEdit {
    /// Start character offset of the edit.
    pub start: usize,
    /// Number of characters removed.
    pub old_len: usize,
    /// Number of characters inserted.
    pub new_len: usize,
}

impl SpanEdit {
    /// Exclusive end of the removed range.
    pub fn old_end(&self) -> usize {
        self.start.saturating_add(self.old_len)
    }

    /// Exclusive end of the inserted range.
    pub fn new_end(&self) -> usize {
        self.start.saturating_add(self.new_len)
    }
}

/// A structured description of the text change caused by one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeDelta {
    /// Character count before the transaction.
    pub before_len: usize,
    /// Character count after the transaction.
    pub after_len: usize,
    /// Ordered, non-overlapping edits that transform the "before" text into the "after" text.
    pub edits: Vec<SpanEdit>,
}

impl TreeDelta {
    /// Returns `true` if this delta contains no edits.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

impl fmt::Display for TreeDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.before_len, self.after_len)?;
        for edit in &self.edits {
            write!(f, " [{}+{}=>{}]", edit.start, edit.old_len, edit.new_len)?;
        }
        Ok(())
    }
}

impl<N> TreeChangeEvent<N>
where
    N: Copy + Eq + Hash + fmt::Debug,
{
    /// Compute the span edits described by this event.
    ///
    /// Every tracked parent contributes one edit covering its whole current text; the removed
    /// length is the parent's length before the transaction. Tracked parents never nest, so the
    /// edits never overlap.
    pub fn to_delta<T>(&self, tree: &T) -> TreeDelta
    where
        T: TreeAccess<Node = N> + ?Sized,
    {
        let mut edits: Vec<SpanEdit> = self
            .iter()
            .map(|change| SpanEdit {
                start: tree.text_offset(change.parent()),
                old_len: change.folded_len(tree),
                new_len: tree.text_len(change.parent()),
            })
            .collect();
        // Spans that vanished entirely sort before a span starting at the same offset: in
        // document order they precede it, or they would not share its start.
        edits.sort_by_key(|edit| (edit.start, edit.new_len > 0));

        let after_len = tree.text_len(self.root());
        let inserted: usize = edits.iter().map(|edit| edit.new_len).sum();
        let removed: usize = edits.iter().map(|edit| edit.old_len).sum();
        TreeDelta {
            before_len: after_len + removed - inserted,
            after_len,
            edits,
        }
    }
}
