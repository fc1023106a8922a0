use super::error::TreeError;
use super::tree::{NodeId, SyntaxTree};
use crate::change::ChangeInfo;
use crate::event::TreeChangeEvent;

impl SyntaxTree {
    /// Open an edit session that reports every mutation to `event`.
    ///
    /// Fails with [`TreeError::ForeignEvent`] if the event was created for another root.
    pub fn edit<'a>(
        &'a mut self,
        event: &'a mut TreeChangeEvent<NodeId>,
    ) -> Result<TreeEdit<'a>, TreeError> {
        if event.root() != self.root() {
            return Err(TreeError::ForeignEvent {
                event_root: event.root(),
                tree_root: self.root(),
            });
        }
        Ok(TreeEdit { tree: self, event })
    }
}

/// Mutable view of a [`SyntaxTree`] paired with the event observing it.
///
/// Every operation validates its arguments before touching the tree, so an `Err` leaves both
/// the tree and the event unchanged. Edits inside detached subtrees are applied but not
/// reported: such a subtree is reported as a whole once it is inserted. A node removed
/// earlier in the same transaction comes back as a contents change, unless it is a leaf
/// whose text is the one it had when removed.
///
/// Raw insertion is not available outside an edit session:
///
/// ```compile_fail
/// use syntax_delta::{NodeKind, SyntaxTree};
///
/// let mut tree = SyntaxTree::new(NodeKind::new(0));
/// let root = tree.root();
/// let leaf = tree.alloc_leaf(NodeKind::new(1), "x");
/// tree.attach(root, None, leaf).unwrap();
/// ```
pub struct TreeEdit<'a> {
    tree: &'a mut SyntaxTree,
    event: &'a mut TreeChangeEvent<NodeId>,
}

impl TreeEdit<'_> {
    /// The tree being edited.
    pub fn tree(&self) -> &SyntaxTree {
        &*self.tree
    }

    /// The event receiving the changes.
    pub fn event(&self) -> &TreeChangeEvent<NodeId> {
        &*self.event
    }

    /// Insert `child` as the `index`-th child of `parent`.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), TreeError> {
        let before = self.tree.child_at(parent, index)?;
        self.insert(parent, before, child)
    }

    /// Insert `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.insert(parent, None, child)
    }

    /// Insert `child` right before `anchor`.
    pub fn insert_before(&mut self, anchor: NodeId, child: NodeId) -> Result<(), TreeError> {
        let parent = self.tree.check_detach(anchor)?;
        self.insert(parent, Some(anchor), child)
    }

    /// Insert `child` right after `anchor`.
    pub fn insert_after(&mut self, anchor: NodeId, child: NodeId) -> Result<(), TreeError> {
        let parent = self.tree.check_detach(anchor)?;
        let before = self.tree.next_sibling(anchor);
        self.insert(parent, before, child)
    }

    fn insert(
        &mut self,
        parent: NodeId,
        before: Option<NodeId>,
        child: NodeId,
    ) -> Result<(), TreeError> {
        self.tree.check_insert(parent, before, child)?;
        self.tree.link(parent, before, child);
        if self.tree.is_live(child) {
            self.event
                .add_elementary_change(&*self.tree, child, ChangeInfo::added());
        }
        Ok(())
    }

    /// Detach `node` from its parent.
    ///
    /// The node stays allocated and readable.
    pub fn remove(&mut self, node: NodeId) -> Result<(), TreeError> {
        self.tree.check_detach(node)?;
        if self.tree.is_live(node) {
            let info = ChangeInfo::removed(&*self.tree, node);
            self.event.add_elementary_change(&*self.tree, node, info);
        }
        self.tree.detach(node)
    }

    /// Put the detached `new` in the slot of `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), TreeError> {
        self.tree.check_replace(old, new)?;
        let live = self.tree.is_live(old);
        self.tree.replace_node(old, new)?;
        if live {
            let info = ChangeInfo::replaced(&*self.tree, old);
            self.event.add_elementary_change(&*self.tree, new, info);
        }
        Ok(())
    }

    /// Replace the text of a leaf.
    pub fn set_leaf_text(&mut self, leaf: NodeId, text: &str) -> Result<(), TreeError> {
        let old_len = self.tree.set_text(leaf, text)?;
        if self.tree.is_live(leaf) {
            self.event.add_elementary_change(
                &*self.tree,
                leaf,
                ChangeInfo::contents_changed(old_len),
            );
        }
        Ok(())
    }
}
