//! Elementary change records.
//!
//! A [`ChangeInfo`] describes one edit applied to one child of a tracked parent, together with
//! the length the affected subtree had before the transaction started. Lengths are what later
//! lets consumers turn a set of changed nodes into text spans without keeping the old text.

use crate::access::TreeAccess;
use std::fmt;

/// Kind of an elementary change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The node was inserted during the transaction.
    Add,
    /// The node was detached during the transaction.
    Removed,
    /// The node took the slot of another node.
    Replace,
    /// Something inside the node changed; the node itself stayed in place.
    ContentsChanged,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "ADD",
            Self::Removed => "REMOVED",
            Self::Replace => "REPLACE",
            Self::ContentsChanged => "CONTENTS_CHANGED",
        };
        f.write_str(name)
    }
}

/// One elementary change to a single child node.
///
/// `old_len` is the length (in chars) the affected slot had before the transaction. An added
/// node did not exist before, so [`ChangeInfo::Add`] always reports `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeInfo<N> {
    /// The node was inserted.
    Add,
    /// The node was removed.
    Removed {
        /// Length of the removed subtree.
        old_len: usize,
    },
    /// The node replaced `replaced`.
    Replace {
        /// Length of the original occupant of the slot.
        old_len: usize,
        /// The original occupant of the slot (after chain collapsing).
        replaced: N,
    },
    /// The node's contents changed.
    ContentsChanged {
        /// Length of the node before its contents changed.
        old_len: usize,
    },
}

impl<N: Copy + fmt::Debug> ChangeInfo<N> {
    /// Record for a freshly inserted node.
    pub fn added() -> Self {
        Self::Add
    }

    /// Record for `node` being removed.
    ///
    /// Must be built while `node` is still attached, so the length is the pre-edit one.
    pub fn removed<T>(tree: &T, node: N) -> Self
    where
        T: TreeAccess<Node = N> + ?Sized,
    {
        Self::Removed {
            old_len: tree.text_len(node),
        }
    }

    /// Record for a node that took the slot of `replaced`.
    pub fn replaced<T>(tree: &T, replaced: N) -> Self
    where
        T: TreeAccess<Node = N> + ?Sized,
    {
        Self::Replace {
            old_len: tree.text_len(replaced),
            replaced,
        }
    }

    /// Record for a node whose contents changed; `old_len` is its length before the edit.
    pub fn contents_changed(old_len: usize) -> Self {
        Self::ContentsChanged { old_len }
    }

    /// Kind of this change.
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Add => ChangeKind::Add,
            Self::Removed { .. } => ChangeKind::Removed,
            Self::Replace { .. } => ChangeKind::Replace,
            Self::ContentsChanged { .. } => ChangeKind::ContentsChanged,
        }
    }

    /// Length of the affected slot before the transaction.
    pub fn old_len(&self) -> usize {
        match *self {
            Self::Add => 0,
            Self::Removed { old_len }
            | Self::Replace { old_len, .. }
            | Self::ContentsChanged { old_len } => old_len,
        }
    }

    /// The replaced node, for [`ChangeInfo::Replace`] records.
    pub fn replaced_node(&self) -> Option<N> {
        match *self {
            Self::Replace { replaced, .. } => Some(replaced),
            _ => None,
        }
    }

    /// How much longer the slot was before this change than it is now.
    ///
    /// `current_len` is the current length of the node the record is keyed by; it is ignored
    /// for removals because a removed node no longer contributes to its parent.
    pub fn length_delta(&self, current_len: usize) -> isize {
        match *self {
            Self::Add => -(current_len as isize),
            Self::Removed { old_len } => old_len as isize,
            Self::Replace { old_len, .. } | Self::ContentsChanged { old_len } => {
                old_len as isize - current_len as isize
            }
        }
    }

    /// Re-target a replacement chain to `replaced`, reporting `old_len` as its length.
    ///
    /// # Panics
    ///
    /// Panics if the record is not a [`ChangeInfo::Replace`].
    pub fn set_replaced(&mut self, replaced: N, old_len: usize) {
        match self {
            Self::Replace {
                old_len: len,
                replaced: node,
            } => {
                *len = old_len;
                *node = replaced;
            }
            other => panic!("set_replaced called on a {} record", other.kind()),
        }
    }

    /// Fold the change of one of this node's descendants into `old_len`.
    ///
    /// Used when a more specific change below a node is summarised as a change of the node
    /// itself. Added nodes keep reporting `0`.
    pub fn absorb_child_change<T>(&mut self, tree: &T, child_info: &ChangeInfo<N>, child: N)
    where
        T: TreeAccess<Node = N> + ?Sized,
    {
        let current_len = match child_info {
            Self::Removed { .. } => 0,
            _ => tree.text_len(child),
        };
        self.shift_old_len(child_info.length_delta(current_len));
    }

    pub(crate) fn shift_old_len(&mut self, delta: isize) {
        if delta == 0 {
            return;
        }
        if let Self::Removed { old_len }
        | Self::Replace { old_len, .. }
        | Self::ContentsChanged { old_len } = self
        {
            *old_len = shift_len(*old_len, delta);
        }
    }
}

/// Apply a signed length adjustment.
///
/// # Panics
///
/// Panics if the result would be negative: lengths only go below zero when the tree and the
/// reported changes are out of sync.
pub(crate) fn shift_len(len: usize, delta: isize) -> usize {
    len.checked_add_signed(delta)
        .unwrap_or_else(|| panic!("change length underflow: {len} {delta:+}"))
}

impl<N: Copy + fmt::Debug> fmt::Display for ChangeInfo<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => f.write_str("ADD"),
            Self::Replace { old_len, replaced } => {
                write!(f, "REPLACE(old_len={old_len}, replaced={replaced:?})")
            }
            other => write!(f, "{}(old_len={})", other.kind(), other.old_len()),
        }
    }
}
