//! Transaction-wide change aggregation.
//!
//! A [`TreeChangeEvent`] receives every elementary change of one edit transaction and keeps
//! the smallest set of per-parent changesets that still describes the whole edit:
//!
//! - A change is recorded at the closest ancestor that is already tracked. If the change
//!   happened deeper than that ancestor's direct children, it is recorded there as a
//!   contents change of the child on the path.
//! - When a new parent becomes tracked, every tracked node below it is folded into one
//!   contents change per subtree (compaction), so tracked nodes never nest.
//!
//! Tracked nodes are also indexed by the depth they were tracked at, which lets compaction
//! visit candidates deepest first.
//!
//! # Example
//!
//! ```rust
//! use syntax_delta::{Aspect, NodeKind, SyntaxTree, TreeChangeEvent};
//!
//! let mut tree = SyntaxTree::new(NodeKind::new(0));
//! let root = tree.root();
//! let mut event = TreeChangeEvent::new(Aspect::SYNTAX_TREE, root);
//!
//! let leaf = tree.alloc_leaf(NodeKind::new(1), "hello");
//! tree.edit(&mut event).unwrap().append_child(root, leaf).unwrap();
//!
//! let change = event.changes_by_element(root).unwrap();
//! assert_eq!(change.affected_children().collect::<Vec<_>>(), vec![leaf]);
//! ```

use crate::access::TreeAccess;
use crate::change::ChangeInfo;
use crate::config::TrackerConfig;
use crate::tree_change::TreeChange;
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use std::fmt;
use std::hash::Hash;

/// Opaque tag naming what an event describes.
///
/// Hosts that run several change streams over the same tree (e.g. structural edits vs.
/// reformatting) use it to tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Aspect(pub u32);

impl Aspect {
    /// Create an aspect from a raw numeric identifier.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Structural edits of a syntax tree.
    pub const SYNTAX_TREE: Self = Self(1);
}

#[derive(Debug, Clone)]
struct Tracked<N> {
    depth: usize,
    change: TreeChange<N>,
}

/// All changes of one edit transaction, grouped by parent node.
#[derive(Debug, Clone)]
pub struct TreeChangeEvent<N> {
    aspect: Aspect,
    root: N,
    config: TrackerConfig,
    changed_elements: IndexMap<N, Tracked<N>, FxBuildHasher>,
    /// `depth_buckets[d]` holds the tracked nodes that were at depth `d` when tracked.
    depth_buckets: Vec<IndexSet<N, FxBuildHasher>>,
}

impl<N> TreeChangeEvent<N>
where
    N: Copy + Eq + Hash + fmt::Debug,
{
    /// Create an empty event for the tree rooted at `root`.
    pub fn new(aspect: Aspect, root: N) -> Self {
        Self::with_config(aspect, root, TrackerConfig::default())
    }

    /// Create an empty event with an explicit configuration.
    pub fn with_config(aspect: Aspect, root: N, config: TrackerConfig) -> Self {
        Self {
            aspect,
            root,
            config,
            changed_elements: IndexMap::default(),
            depth_buckets: Vec::new(),
        }
    }

    /// The aspect this event was created for.
    pub fn aspect(&self) -> Aspect {
        self.aspect
    }

    /// Root of the tree this event observes.
    pub fn root(&self) -> N {
        self.root
    }

    /// Active configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of tracked parents.
    pub fn len(&self) -> usize {
        self.changed_elements.len()
    }

    /// Returns `true` if nothing (or only cancelling edits) has been recorded.
    pub fn is_empty(&self) -> bool {
        self.changed_elements.is_empty()
    }

    /// Tracked parents, in the order they became tracked.
    pub fn changed_elements(&self) -> impl Iterator<Item = N> + '_ {
        self.changed_elements.keys().copied()
    }

    /// The changeset of `node`, if it is tracked.
    pub fn changes_by_element(&self, node: N) -> Option<&TreeChange<N>> {
        self.changed_elements.get(&node).map(|tracked| &tracked.change)
    }

    /// All changesets, in the order their parents became tracked.
    pub fn iter(&self) -> impl Iterator<Item = &TreeChange<N>> + '_ {
        self.changed_elements.values().map(|tracked| &tracked.change)
    }

    /// Depth `node` was tracked at, if it is tracked.
    pub fn tracked_depth(&self, node: N) -> Option<usize> {
        self.changed_elements.get(&node).map(|tracked| tracked.depth)
    }

    /// Tracked nodes in the bucket for `depth`.
    pub fn tracked_at_depth(&self, depth: usize) -> impl Iterator<Item = N> + '_ {
        self.depth_buckets.get(depth).into_iter().flatten().copied()
    }

    /// Forget every recorded change so the event can be reused.
    pub fn clear(&mut self) {
        self.changed_elements.clear();
        self.depth_buckets.clear();
    }

    /// Record one elementary change of `node`.
    ///
    /// Call it right after the mutation for additions, replacements and contents changes, and
    /// right before detaching `node` for removals. Changes of a node without a parent are
    /// discarded.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not part of the tree rooted at [`root`](Self::root), or if the
    /// reported change contradicts what was already recorded (see
    /// [`TreeChange::add_change`]).
    pub fn add_elementary_change<T>(&mut self, tree: &T, node: N, info: ChangeInfo<N>)
    where
        T: TreeAccess<Node = N> + ?Sized,
    {
        self.record_elementary_change(tree, node, info);
        if self.config.verify_invariants {
            self.verify_invariants(tree);
        }
    }

    fn record_elementary_change<T>(&mut self, tree: &T, node: N, mut info: ChangeInfo<N>)
    where
        T: TreeAccess<Node = N> + ?Sized,
    {
        let Some(parent) = tree.parent(node) else {
            tracing::trace!(?node, kind = %info.kind(), "discarding change of a parentless node");
            return;
        };

        if let ChangeInfo::Replace { replaced, .. } = info {
            let shift = self.release_subtree(tree, replaced);
            info.shift_old_len(shift);
        }

        let mut current = Some(parent);
        let mut prev = node;
        let mut chain_len = 0usize;
        while let Some(ancestor) = current {
            if let Some(tracked) = self.changed_elements.get(&ancestor) {
                if prev != node {
                    if tracked.change.change_by_child(prev).is_some() {
                        return;
                    }
                    info = summarize(tree, prev, node, &info);
                }
                let depth = tracked.depth;
                self.record(tree, ancestor, depth, prev, info);
                return;
            }
            chain_len += 1;
            prev = ancestor;
            current = tree.parent(ancestor);
        }

        assert!(
            prev == self.root,
            "{node:?} does not belong to the tree rooted at {:?}",
            self.root
        );
        let depth = chain_len - 1;
        self.compact_changes(tree, parent, depth);
        self.record(tree, parent, depth, node, info);
    }

    fn record<T>(&mut self, tree: &T, parent: N, depth: usize, child: N, info: ChangeInfo<N>)
    where
        T: TreeAccess<Node = N> + ?Sized,
    {
        let change = self.track(parent, depth);
        change.add_change(tree, child, info);
        if change.is_empty() {
            self.remove_associated_changes(parent);
        }
    }

    fn track(&mut self, parent: N, depth: usize) -> &mut TreeChange<N> {
        let coalesce_leaves = self.config.coalesce_leaves;
        let buckets = &mut self.depth_buckets;
        &mut self
            .changed_elements
            .entry(parent)
            .or_insert_with(|| {
                tracing::debug!(?parent, depth, "tracking node");
                if buckets.len() <= depth {
                    buckets.resize_with(depth + 1, IndexSet::default);
                }
                buckets[depth].insert(parent);
                Tracked {
                    depth,
                    change: TreeChange::with_leaf_coalescing(parent, coalesce_leaves),
                }
            })
            .change
    }

    fn remove_associated_changes(&mut self, parent: N) -> Option<TreeChange<N>> {
        let tracked = self.changed_elements.shift_remove(&parent)?;
        if let Some(bucket) = self.depth_buckets.get_mut(tracked.depth) {
            bucket.shift_remove(&parent);
        }
        tracing::debug!(?parent, "untracking node");
        Some(tracked.change)
    }

    /// Fold every tracked descendant of `parent` into contents changes, deepest first, until
    /// they all hang off `parent` itself.
    fn compact_changes<T>(&mut self, tree: &T, parent: N, depth: usize)
    where
        T: TreeAccess<Node = N> + ?Sized,
    {
        let mut bucket_depth = self.depth_buckets.len();
        while bucket_depth > depth + 1 {
            bucket_depth -= 1;
            let Some(bucket) = self.depth_buckets.get(bucket_depth) else {
                continue;
            };
            let nested: SmallVec<[N; 8]> = bucket
                .iter()
                .copied()
                .filter(|&candidate| tree.is_ancestor(parent, candidate))
                .collect();

            for node in nested {
                let Some(change) = self.remove_associated_changes(node) else {
                    continue;
                };
                let Some(up) = tree.parent(node) else {
                    continue;
                };
                let old_len = change.folded_len(tree);
                tracing::debug!(?node, ?up, old_len, "folding nested changes");
                self.fold_into(tree, up, node, old_len);
            }
        }
    }

    /// Record the folded changes of `node` as a contents change of `node` under its parent.
    ///
    /// `up` never already holds an entry for `node`: `node` was tracked, so `up` could only
    /// have become tracked during this compaction, through one of `node`'s siblings.
    fn fold_into<T>(&mut self, tree: &T, up: N, node: N, old_len: usize)
    where
        T: TreeAccess<Node = N> + ?Sized,
    {
        let depth = self
            .changed_elements
            .get(&up)
            .map_or_else(|| tree.depth(up), |tracked| tracked.depth);
        self.record(tree, up, depth, node, ChangeInfo::contents_changed(old_len));
    }

    /// Stop tracking everything inside a subtree that was just detached, returning how much
    /// longer the subtree was before the transaction than it is now.
    fn release_subtree<T>(&mut self, tree: &T, subtree: N) -> isize
    where
        T: TreeAccess<Node = N> + ?Sized,
    {
        let nested: SmallVec<[N; 8]> = self
            .changed_elements
            .keys()
            .copied()
            .filter(|&node| node == subtree || tree.is_ancestor(subtree, node))
            .collect();

        let mut shift = 0isize;
        for node in nested {
            if let Some(change) = self.remove_associated_changes(node) {
                shift += change.folded_len(tree) as isize - tree.text_len(node) as isize;
            }
        }
        if shift != 0 {
            tracing::trace!(?subtree, shift, "released changes of a replaced subtree");
        }
        shift
    }

    /// Assert the structural invariants of the event.
    ///
    /// - every tracked node sits in exactly one depth bucket, the one it was tracked at;
    /// - no tracked node has a tracked ancestor;
    /// - no changeset is empty.
    ///
    /// # Panics
    ///
    /// Panics on the first violated invariant.
    pub fn verify_invariants<T>(&self, tree: &T)
    where
        T: TreeAccess<Node = N> + ?Sized,
    {
        let bucketed: usize = self.depth_buckets.iter().map(|bucket| bucket.len()).sum();
        assert_eq!(
            bucketed,
            self.changed_elements.len(),
            "depth buckets out of sync with tracked nodes"
        );
        for (node, tracked) in &self.changed_elements {
            assert!(
                self.depth_buckets
                    .get(tracked.depth)
                    .is_some_and(|bucket| bucket.contains(node)),
                "{node:?} missing from depth bucket {}",
                tracked.depth
            );
            assert!(
                !tracked.change.is_empty(),
                "{node:?} tracks an empty changeset"
            );
            let mut ancestor = tree.parent(*node);
            while let Some(above) = ancestor {
                assert!(
                    !self.changed_elements.contains_key(&above),
                    "{node:?} is tracked below tracked ancestor {above:?}"
                );
                ancestor = tree.parent(above);
            }
        }
    }
}

/// Describe a change of `node` as a contents change of its ancestor `container`.
fn summarize<T, N>(tree: &T, container: N, node: N, info: &ChangeInfo<N>) -> ChangeInfo<N>
where
    T: TreeAccess<Node = N> + ?Sized,
    N: Copy + fmt::Debug,
{
    let mut summary = ChangeInfo::contents_changed(tree.text_len(container));
    // Removals are reported while the node is still attached, so `container` still has its
    // pre-edit length.
    if !matches!(info, ChangeInfo::Removed { .. }) {
        summary.absorb_child_change(tree, info, node);
    }
    summary
}

impl<N: Copy + fmt::Debug> fmt::Display for TreeChangeEvent<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TreeChangeEvent({:?}, root={:?})", self.aspect, self.root)?;
        for tracked in self.changed_elements.values() {
            writeln!(f, "  {}", tracked.change)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{NodeId, NodeKind, SyntaxTree, TreeBuilder};
    use crate::change::ChangeKind;

    const BLOCK: NodeKind = NodeKind::new(1);
    const TOKEN: NodeKind = NodeKind::new(2);

    /// `Root[A[B[x, y], C[z]]]`
    fn nested_tree() -> (SyntaxTree, [NodeId; 3]) {
        let mut builder = TreeBuilder::new(BLOCK);
        builder.start_node(BLOCK);
        builder.start_node(BLOCK);
        builder.token(TOKEN, "xx");
        builder.token(TOKEN, "yyy");
        builder.finish_node();
        builder.start_node(BLOCK);
        builder.token(TOKEN, "z");
        builder.finish_node();
        builder.finish_node();
        let tree = builder.finish().unwrap();
        let a = tree.first_child(tree.root()).unwrap();
        let b = tree.first_child(a).unwrap();
        let c = tree.last_child(a).unwrap();
        (tree, [a, b, c])
    }

    #[test]
    fn test_depth_buckets_follow_tracking() {
        let (mut tree, [a, b, c]) = nested_tree();
        let mut event = TreeChangeEvent::new(Aspect::SYNTAX_TREE, tree.root());
        let x = tree.first_child(b).unwrap();
        let z = tree.first_child(c).unwrap();

        tree.edit(&mut event).unwrap().set_leaf_text(x, "x").unwrap();
        tree.edit(&mut event).unwrap().set_leaf_text(z, "zzzz").unwrap();
        assert_eq!(event.tracked_depth(b), Some(2));
        assert_eq!(event.tracked_depth(c), Some(2));
        assert_eq!(event.tracked_at_depth(2).collect::<Vec<_>>(), vec![b, c]);

        // A change directly under `a` folds both tracked children into it.
        let w = tree.alloc_leaf(TOKEN, "w");
        tree.edit(&mut event).unwrap().append_child(a, w).unwrap();
        assert_eq!(event.changed_elements().collect::<Vec<_>>(), vec![a]);
        assert_eq!(event.tracked_at_depth(2).count(), 0);
        assert_eq!(event.tracked_depth(a), Some(1));

        let change = event.changes_by_element(a).unwrap();
        assert_eq!(
            change.change_by_child(b),
            Some(&ChangeInfo::ContentsChanged { old_len: 5 })
        );
        assert_eq!(
            change.change_by_child(c),
            Some(&ChangeInfo::ContentsChanged { old_len: 1 })
        );
        assert_eq!(change.change_by_child(w), Some(&ChangeInfo::Add));
        event.verify_invariants(&tree);
    }

    #[test]
    fn test_compaction_folds_through_parents_tracked_on_the_way() {
        // Root[A[B[C[x]], D[y]]]
        let mut builder = TreeBuilder::new(BLOCK);
        builder.start_node(BLOCK);
        builder.start_node(BLOCK);
        builder.start_node(BLOCK);
        builder.token(TOKEN, "x");
        builder.finish_node();
        builder.finish_node();
        builder.start_node(BLOCK);
        builder.token(TOKEN, "y");
        builder.finish_node();
        builder.finish_node();
        let mut tree = builder.finish().unwrap();
        let a = tree.first_child(tree.root()).unwrap();
        let b = tree.first_child(a).unwrap();
        let c = tree.first_child(b).unwrap();
        let d = tree.last_child(a).unwrap();
        let x = tree.first_child(c).unwrap();
        let y = tree.first_child(d).unwrap();
        let config = TrackerConfig::new().with_invariant_checks(true);
        let mut event = TreeChangeEvent::with_config(Aspect::SYNTAX_TREE, tree.root(), config);

        let mut edit = tree.edit(&mut event).unwrap();
        edit.set_leaf_text(x, "xxx").unwrap();
        edit.set_leaf_text(y, "").unwrap();
        assert_eq!(edit.event().changed_elements().collect::<Vec<_>>(), vec![c, d]);

        let w = tree.alloc_leaf(TOKEN, "w");
        tree.edit(&mut event).unwrap().append_child(a, w).unwrap();

        assert_eq!(event.changed_elements().collect::<Vec<_>>(), vec![a]);
        assert_eq!((2..4).map(|d| event.tracked_at_depth(d).count()).sum::<usize>(), 0);
        let change = event.changes_by_element(a).unwrap();
        assert_eq!(
            change.iter().map(|(child, info)| (child, *info)).collect::<Vec<_>>(),
            vec![
                (d, ChangeInfo::ContentsChanged { old_len: 1 }),
                (b, ChangeInfo::ContentsChanged { old_len: 1 }),
                (w, ChangeInfo::Add),
            ]
        );
        assert_eq!(change.folded_len(&tree), 2);
    }

    #[test]
    fn test_deeper_change_under_tracked_ancestor_is_summarised() {
        let (mut tree, [a, b, _]) = nested_tree();
        let mut event = TreeChangeEvent::new(Aspect::SYNTAX_TREE, tree.root());
        let marker = tree.alloc_leaf(TOKEN, "!");
        tree.edit(&mut event).unwrap().append_child(a, marker).unwrap();

        let y = tree.last_child(b).unwrap();
        let extra = tree.alloc_leaf(TOKEN, "four");
        tree.edit(&mut event).unwrap().insert_before(y, extra).unwrap();

        assert_eq!(event.len(), 1);
        let change = event.changes_by_element(a).unwrap();
        let summary = change.change_by_child(b).unwrap();
        assert_eq!(summary.kind(), ChangeKind::ContentsChanged);
        assert_eq!(summary.old_len(), 5);

        // Further edits below `b` are already covered by that summary.
        tree.edit(&mut event).unwrap().set_leaf_text(y, "").unwrap();
        assert_eq!(
            event.changes_by_element(a).unwrap().change_by_child(b),
            Some(&ChangeInfo::ContentsChanged { old_len: 5 })
        );
    }

    #[test]
    fn test_change_of_root_is_discarded() {
        let (tree, _) = nested_tree();
        let mut event = TreeChangeEvent::new(Aspect::SYNTAX_TREE, tree.root());
        event.add_elementary_change(&tree, tree.root(), ChangeInfo::contents_changed(3));
        assert!(event.is_empty());
    }

    #[test]
    #[should_panic(expected = "does not belong to the tree rooted at")]
    fn test_foreign_node_panics() {
        let (mut tree, _) = nested_tree();
        let mut event = TreeChangeEvent::new(Aspect::SYNTAX_TREE, tree.root());
        let orphan_parent = tree.alloc_node(BLOCK, []).unwrap();
        let child = tree.alloc_leaf(TOKEN, "q");
        tree.attach(orphan_parent, None, child).unwrap();
        event.add_elementary_change(&tree, child, ChangeInfo::Add);
    }

    #[test]
    fn test_clear_resets_everything() {
        let (mut tree, [a, ..]) = nested_tree();
        let mut event = TreeChangeEvent::new(Aspect::new(7), tree.root());
        let leaf = tree.alloc_leaf(TOKEN, "q");
        tree.edit(&mut event).unwrap().append_child(a, leaf).unwrap();
        assert!(!event.is_empty());

        event.clear();
        assert!(event.is_empty());
        assert_eq!(event.tracked_at_depth(1).count(), 0);
        assert_eq!(event.aspect(), Aspect::new(7));
    }

    #[test]
    fn test_display_lists_tracked_parents() {
        let (mut tree, [a, ..]) = nested_tree();
        let mut event = TreeChangeEvent::new(Aspect::SYNTAX_TREE, tree.root());
        let leaf = tree.alloc_leaf(TOKEN, "q");
        tree.edit(&mut event).unwrap().append_child(a, leaf).unwrap();
        let dump = event.to_string();
        assert!(dump.starts_with("TreeChangeEvent(Aspect(1)"));
        assert!(dump.contains("ADD"));
    }
}
