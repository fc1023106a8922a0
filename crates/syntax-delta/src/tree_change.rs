//! Per-parent changesets.
//!
//! A [`TreeChange`] collects the changes of the direct children of one tracked parent and
//! merges every newly reported change with whatever was already recorded for the same slot.
//! The merge rules are what keeps the result minimal: a node added and removed again within a
//! transaction disappears, replacements of the same slot collapse into one, and a token that
//! is re-created next to itself is not reported at all.

use crate::access::{TextSlot, TreeAccess};
use crate::change::{ChangeInfo, ChangeKind};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::fmt;
use std::hash::Hash;

/// Changes recorded for the direct children of one parent node, in first-recorded order.
#[derive(Debug, Clone)]
pub struct TreeChange<N> {
    parent: N,
    changes: IndexMap<N, ChangeInfo<N>, FxBuildHasher>,
    /// Leaves whose removal was their first recorded change, as they were when removed.
    pristine_removals: FxHashMap<N, RemovedLeaf<N>>,
    coalesce_leaves: bool,
}

/// Text and neighbours of a leaf at the time it was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RemovedLeaf<N> {
    slot: TextSlot,
    prev: Option<N>,
    next: Option<N>,
}

impl<N: Copy> RemovedLeaf<N> {
    fn capture<T>(tree: &T, leaf: N) -> Option<Self>
    where
        T: TreeAccess<Node = N> + ?Sized,
    {
        Some(Self {
            slot: tree.leaf_slot(leaf)?,
            prev: tree.prev_sibling(leaf),
            next: tree.next_sibling(leaf),
        })
    }
}

impl<N> TreeChange<N>
where
    N: Copy + Eq + Hash + fmt::Debug,
{
    /// Create an empty changeset for `parent`.
    pub fn new(parent: N) -> Self {
        Self::with_leaf_coalescing(parent, true)
    }

    pub(crate) fn with_leaf_coalescing(parent: N, coalesce_leaves: bool) -> Self {
        Self {
            parent,
            changes: IndexMap::default(),
            pristine_removals: FxHashMap::default(),
            coalesce_leaves,
        }
    }

    /// The parent whose children this changeset describes.
    pub fn parent(&self) -> N {
        self.parent
    }

    /// Number of children with a recorded change.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns `true` if every recorded change cancelled out.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Children with a recorded change, in the order their changes were first recorded.
    pub fn affected_children(&self) -> impl Iterator<Item = N> + '_ {
        self.changes.keys().copied()
    }

    /// The change recorded for `child`, if any.
    pub fn change_by_child(&self, child: N) -> Option<&ChangeInfo<N>> {
        self.changes.get(&child)
    }

    /// Children and their changes, in first-recorded order.
    pub fn iter(&self) -> impl Iterator<Item = (N, &ChangeInfo<N>)> + '_ {
        self.changes.iter().map(|(child, info)| (*child, info))
    }

    /// Merge a change of `child` into this changeset.
    ///
    /// # Panics
    ///
    /// Panics if `child` is not currently a child of [`parent`](Self::parent), or if a
    /// replacement names a node already recorded as removed.
    ///
    /// A removed node that comes back only cancels its removal if it is a leaf with the text
    /// and the neighbours it had when removed. Anything else is recorded as a contents change
    /// carrying the length from before the transaction.
    pub fn add_change<T>(&mut self, tree: &T, child: N, info: ChangeInfo<N>)
    where
        T: TreeAccess<Node = N> + ?Sized,
    {
        assert!(
            tree.parent(child) == Some(self.parent),
            "{child:?} is not a child of {:?}",
            self.parent
        );

        let current = self.changes.get(&child).copied();

        if current.is_some() && info.kind() == ChangeKind::ContentsChanged {
            return;
        }

        if let ChangeInfo::Replace { replaced, .. } = info {
            self.add_replacement(tree, child, info, replaced);
            return;
        }

        match (current, info) {
            (Some(ChangeInfo::Removed { .. }), ChangeInfo::Add) => self.reinsert(tree, child),
            (Some(ChangeInfo::Add), ChangeInfo::Removed { .. }) => {
                tracing::trace!(?child, parent = ?self.parent, "insertion cancelled by removal");
                self.changes.shift_remove(&child);
            }
            (Some(ChangeInfo::Removed { .. } | ChangeInfo::Add), _) => {}
            (current, ChangeInfo::Removed { old_len }) => {
                if current.is_none() && self.coalesce_leaves && self.coalesce_leaf(tree, child) {
                    return;
                }
                if current.is_none()
                    && let Some(removed) = RemovedLeaf::capture(tree, child)
                {
                    self.pristine_removals.insert(child, removed);
                }
                let old_len = current.map_or(old_len, |previous| previous.old_len());
                self.changes.insert(child, ChangeInfo::Removed { old_len });
            }
            (None, info) => {
                self.changes.insert(child, info);
            }
            (Some(_), _) => {}
        }
    }

    /// `child` was recorded as removed and is a child again.
    fn reinsert<T>(&mut self, tree: &T, child: N)
    where
        T: TreeAccess<Node = N> + ?Sized,
    {
        let removed = self.pristine_removals.remove(&child);
        if removed.is_some() && removed == RemovedLeaf::capture(tree, child) {
            tracing::trace!(?child, parent = ?self.parent, "removal cancelled by re-insertion");
            self.changes.shift_remove(&child);
            return;
        }
        if let Some(entry) = self.changes.get_mut(&child) {
            tracing::trace!(?child, parent = ?self.parent, "re-inserted node moved or changed");
            *entry = ChangeInfo::contents_changed(entry.old_len());
        }
    }

    fn add_replacement<T>(&mut self, tree: &T, child: N, info: ChangeInfo<N>, replaced: N)
    where
        T: TreeAccess<Node = N> + ?Sized,
    {
        if matches!(self.changes.get(&child), Some(ChangeInfo::Removed { .. })) {
            self.vacate(replaced, info.old_len());
            self.reinsert(tree, child);
            return;
        }

        let merged = match self.changes.get(&replaced).copied() {
            None => info,
            Some(ChangeInfo::Replace {
                old_len,
                replaced: original,
            }) => {
                tracing::trace!(?child, ?replaced, ?original, "collapsing replacement chain");
                let mut collapsed = info;
                collapsed.set_replaced(original, old_len);
                collapsed
            }
            Some(ChangeInfo::Add) => {
                tracing::trace!(?child, ?replaced, "replacement of a fresh node is an insertion");
                ChangeInfo::Add
            }
            Some(ChangeInfo::ContentsChanged { old_len }) => {
                let mut inherited = info;
                inherited.set_replaced(replaced, old_len);
                inherited
            }
            Some(ChangeInfo::Removed { .. }) => {
                panic!("{replaced:?} was removed from {:?} and cannot be replaced", self.parent)
            }
        };
        if replaced != child {
            self.changes.shift_remove(&replaced);
        }
        self.changes.insert(child, merged);
    }

    /// Record that `replaced`, `old_len` chars long before the transaction unless an earlier
    /// entry says otherwise, left its slot for a sibling that had been removed.
    fn vacate(&mut self, replaced: N, old_len: usize) {
        let removal = match self.changes.get(&replaced).copied() {
            None => Some(old_len),
            Some(ChangeInfo::Add) => None,
            Some(ChangeInfo::Replace { old_len, .. } | ChangeInfo::ContentsChanged { old_len }) => {
                Some(old_len)
            }
            Some(ChangeInfo::Removed { .. }) => {
                panic!("{replaced:?} was removed from {:?} and cannot be replaced", self.parent)
            }
        };
        tracing::trace!(?replaced, parent = ?self.parent, "slot taken over by a removed sibling");
        match removal {
            Some(old_len) => {
                self.changes.insert(replaced, ChangeInfo::Removed { old_len });
            }
            None => {
                self.changes.shift_remove(&replaced);
            }
        }
    }

    /// Drop the pending insertion of an adjacent leaf with the same text instead of recording
    /// the removal of `child`.
    fn coalesce_leaf<T>(&mut self, tree: &T, child: N) -> bool
    where
        T: TreeAccess<Node = N> + ?Sized,
    {
        let Some(slot) = tree.leaf_slot(child) else {
            return false;
        };
        for sibling in [tree.next_sibling(child), tree.prev_sibling(child)]
            .into_iter()
            .flatten()
        {
            let pending_add = matches!(self.changes.get(&sibling), Some(ChangeInfo::Add));
            if pending_add && tree.leaf_slot(sibling) == Some(slot) {
                tracing::trace!(?child, ?sibling, "removed leaf matches an inserted neighbour");
                self.changes.shift_remove(&sibling);
                return true;
            }
        }
        false
    }

    /// The parent's length before the transaction, derived from its current length and every
    /// recorded change.
    pub fn folded_len<T>(&self, tree: &T) -> usize
    where
        T: TreeAccess<Node = N> + ?Sized,
    {
        let mut folded = ChangeInfo::<N>::contents_changed(tree.text_len(self.parent));
        for (child, info) in &self.changes {
            folded.absorb_child_change(tree, info, *child);
        }
        folded.old_len()
    }
}

impl<N: Copy + fmt::Debug> fmt::Display for TreeChange<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: [", self.parent)?;
        for (idx, (child, info)) in self.changes.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{child:?}: {info}")?;
        }
        f.write_str("]")
    }
}
