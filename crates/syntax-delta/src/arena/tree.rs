use super::error::TreeError;
use super::text_table::TextTable;
use crate::access::{TextSlot, TreeAccess};
use crate::change::shift_len;
use smallvec::SmallVec;
use std::fmt;

/// Handle of a node inside a [`SyntaxTree`].
///
/// Ids are never reused within one arena: a detached node keeps its id (and stays readable)
/// until the tree is [compacted](SyntaxTree::compacted).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Host-defined node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKind(pub u16);

impl NodeKind {
    /// Create a kind from a raw numeric identifier.
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    child_count: usize,
    /// Subtree length in chars.
    len: usize,
    /// `Some` for leaves.
    slot: Option<TextSlot>,
}

impl NodeData {
    fn new(kind: NodeKind, slot: Option<TextSlot>, len: usize) -> Self {
        Self {
            kind,
            parent: None,
            prev: None,
            next: None,
            first_child: None,
            last_child: None,
            child_count: 0,
            len,
            slot,
        }
    }
}

/// Arena-backed syntax tree with doubly linked children and cached subtree lengths.
///
/// Leaves hold interned text; composite nodes hold children. The root is always composite and
/// never gets a parent. Mutations that must be observed by a change event go through
/// [`SyntaxTree::edit`]; the raw mutators in this module are crate-private.
///
/// The arena and its [`TextTable`] only grow: detached nodes and texts no leaf uses anymore
/// are kept until [`compacted`](Self::compacted) copies the live tree into a fresh arena.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    texts: TextTable,
    root: NodeId,
}

impl SyntaxTree {
    /// Create a tree holding just an empty root of `root_kind`.
    pub fn new(root_kind: NodeKind) -> Self {
        Self {
            nodes: vec![NodeData::new(root_kind, None, 0)],
            texts: TextTable::new(),
            root: NodeId(0),
        }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of allocated nodes, detached ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if `node` was allocated by this tree.
    pub fn contains(&self, node: NodeId) -> bool {
        node.index() < self.nodes.len()
    }

    /// Interned leaf texts.
    pub fn texts(&self) -> &TextTable {
        &self.texts
    }

    /// Copy the live tree into a fresh arena, dropping detached nodes and unused texts.
    ///
    /// Node ids are reassigned in document order, so ids of the old tree must not be used
    /// with the copy. Do it between transactions, once every event for the old tree was
    /// consumed.
    pub fn compacted(&self) -> SyntaxTree {
        let mut out = SyntaxTree::new(self.nodes[self.root.index()].kind);
        let mut stack: Vec<(NodeId, NodeId)> = Vec::new();
        push_children_reversed(self, self.root, out.root, &mut stack);
        while let Some((node, parent)) = stack.pop() {
            let kind = self.nodes[node.index()].kind;
            let copy = match self.leaf_text(node) {
                Some(text) => out.alloc_leaf(kind, text),
                None => out.alloc_composite(kind),
            };
            out.link(parent, None, copy);
            push_children_reversed(self, node, copy, &mut stack);
        }
        tracing::debug!(
            before = self.nodes.len(),
            after = out.nodes.len(),
            texts = out.texts.len(),
            "compacted syntax tree"
        );
        out
    }

    /// Allocate a detached leaf holding `text`.
    pub fn alloc_leaf(&mut self, kind: NodeKind, text: &str) -> NodeId {
        let slot = self.texts.intern(text);
        self.push(NodeData::new(kind, Some(slot), text.chars().count()))
    }

    /// Allocate a detached composite node owning `children`, in order.
    ///
    /// Every child must be a detached, non-root node of this tree, listed once.
    pub fn alloc_node(
        &mut self,
        kind: NodeKind,
        children: impl IntoIterator<Item = NodeId>,
    ) -> Result<NodeId, TreeError> {
        let children: SmallVec<[NodeId; 8]> = children.into_iter().collect();
        for (idx, &child) in children.iter().enumerate() {
            self.check_insertable(child)?;
            if children[..idx].contains(&child) {
                return Err(TreeError::AlreadyAttached(child));
            }
        }

        let node = self.alloc_composite(kind);
        for child in children {
            self.link(node, None, child);
        }
        Ok(node)
    }

    pub(crate) fn alloc_composite(&mut self, kind: NodeKind) -> NodeId {
        self.push(NodeData::new(kind, None, 0))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(data);
        id
    }

    fn data(&self, node: NodeId) -> Result<&NodeData, TreeError> {
        self.nodes
            .get(node.index())
            .ok_or(TreeError::UnknownNode(node))
    }

    /// Kind of `node`.
    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(node.index()).map(|data| data.kind)
    }

    /// Returns `true` if `node` is a leaf.
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.nodes
            .get(node.index())
            .is_some_and(|data| data.slot.is_some())
    }

    /// Text of a leaf; `None` for composite nodes.
    pub fn leaf_text(&self, node: NodeId) -> Option<&str> {
        let slot = self.nodes.get(node.index())?.slot?;
        self.texts.get(slot)
    }

    /// Parent of `node`.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.index())?.parent
    }

    /// First child of `node`.
    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.index())?.first_child
    }

    /// Last child of `node`.
    pub fn last_child(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.index())?.last_child
    }

    /// Next sibling of `node`.
    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.index())?.next
    }

    /// Previous sibling of `node`.
    pub fn prev_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.index())?.prev
    }

    /// Number of direct children of `node`.
    pub fn child_count(&self, node: NodeId) -> usize {
        self.nodes.get(node.index()).map_or(0, |data| data.child_count)
    }

    /// Direct children of `node`, in order.
    pub fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.first_child(node), move |&child| self.next_sibling(child))
    }

    /// Length of the subtree rooted at `node`, in chars.
    pub fn text_len(&self, node: NodeId) -> usize {
        self.nodes.get(node.index()).map_or(0, |data| data.len)
    }

    /// Returns `true` if `node` is the root or hangs below it.
    pub fn is_live(&self, node: NodeId) -> bool {
        node == self.root || TreeAccess::is_ancestor(self, self.root, node)
    }

    /// Concatenated leaf text of the subtree rooted at `node`.
    pub fn text(&self, node: NodeId) -> String {
        let mut out = String::with_capacity(self.text_len(node));
        self.collect_text(node, 0, usize::MAX, &mut out);
        out
    }

    /// `len` chars of the subtree text of the root, starting at char offset `start`.
    ///
    /// Subtrees entirely outside the range are skipped using their cached lengths.
    pub fn text_in_range(&self, start: usize, len: usize) -> String {
        let mut out = String::with_capacity(len);
        self.collect_text(self.root, start, start.saturating_add(len), &mut out);
        out
    }

    /// Append the part of `node`'s text that falls into `[from, to)` (relative to `node`).
    fn collect_text(&self, node: NodeId, from: usize, to: usize, out: &mut String) {
        let mut stack: SmallVec<[(NodeId, usize); 16]> = SmallVec::new();
        stack.push((node, 0));
        while let Some((current, offset)) = stack.pop() {
            let len = self.text_len(current);
            if offset >= to || offset + len <= from {
                continue;
            }
            if let Some(text) = self.leaf_text(current) {
                let skip = from.saturating_sub(offset);
                let take = to.min(offset + len) - offset - skip;
                out.extend(text.chars().skip(skip).take(take));
                continue;
            }
            // Push children in reverse so they pop in document order.
            let mut end = offset + len;
            let mut child = self.last_child(current);
            while let Some(c) = child {
                end -= self.text_len(c);
                stack.push((c, end));
                child = self.prev_sibling(c);
            }
        }
    }

    /// Child of `parent` at `index`; `None` when `index` equals the child count.
    pub(crate) fn child_at(&self, parent: NodeId, index: usize) -> Result<Option<NodeId>, TreeError> {
        let len = self.data(parent)?.child_count;
        if index > len {
            return Err(TreeError::IndexOutOfBounds { parent, index, len });
        }
        Ok(self.children(parent).nth(index))
    }

    /// `node` can be inserted somewhere: it exists, is not the root and has no parent.
    fn check_insertable(&self, node: NodeId) -> Result<(), TreeError> {
        if node == self.root {
            return Err(TreeError::RootNotMovable);
        }
        if self.data(node)?.parent.is_some() {
            return Err(TreeError::AlreadyAttached(node));
        }
        Ok(())
    }

    /// `node` can become a child of `parent`.
    fn check_attach(&self, parent: NodeId, node: NodeId) -> Result<(), TreeError> {
        if self.data(parent)?.slot.is_some() {
            return Err(TreeError::NotComposite(parent));
        }
        self.check_insertable(node)?;
        if parent == node || TreeAccess::is_ancestor(self, node, parent) {
            return Err(TreeError::WouldCreateCycle { parent, node });
        }
        Ok(())
    }

    /// Validate an [`attach`](Self::attach) without performing it.
    pub(crate) fn check_insert(
        &self,
        parent: NodeId,
        before: Option<NodeId>,
        child: NodeId,
    ) -> Result<(), TreeError> {
        self.check_attach(parent, child)?;
        if let Some(anchor) = before
            && self.data(anchor)?.parent != Some(parent)
        {
            return Err(TreeError::NotAChild { parent, anchor });
        }
        Ok(())
    }

    /// Insert the detached `child` under `parent`, before `before` or at the end.
    ///
    /// This does not report anything to a change event.
    pub(crate) fn attach(
        &mut self,
        parent: NodeId,
        before: Option<NodeId>,
        child: NodeId,
    ) -> Result<(), TreeError> {
        self.check_insert(parent, before, child)?;
        self.link(parent, before, child);
        Ok(())
    }

    /// Validate a [`detach`](Self::detach) without performing it.
    pub(crate) fn check_detach(&self, node: NodeId) -> Result<NodeId, TreeError> {
        self.data(node)?.parent.ok_or(TreeError::NotAttached(node))
    }

    pub(crate) fn detach(&mut self, node: NodeId) -> Result<(), TreeError> {
        let parent = self.check_detach(node)?;
        let (prev, next, len) = {
            let data = &self.nodes[node.index()];
            (data.prev, data.next, data.len)
        };
        match prev {
            Some(prev) => self.nodes[prev.index()].next = next,
            None => self.nodes[parent.index()].first_child = next,
        }
        match next {
            Some(next) => self.nodes[next.index()].prev = prev,
            None => self.nodes[parent.index()].last_child = prev,
        }
        self.nodes[parent.index()].child_count -= 1;
        let data = &mut self.nodes[node.index()];
        data.parent = None;
        data.prev = None;
        data.next = None;
        self.propagate_len(Some(parent), -(len as isize));
        Ok(())
    }

    /// Validate a [`replace_node`](Self::replace_node) without performing it.
    pub(crate) fn check_replace(&self, old: NodeId, new: NodeId) -> Result<NodeId, TreeError> {
        let parent = self.check_detach(old)?;
        self.check_insertable(new)?;
        if TreeAccess::is_ancestor(self, new, parent) || new == parent {
            return Err(TreeError::WouldCreateCycle { parent, node: new });
        }
        Ok(parent)
    }

    /// Put the detached `new` in the slot of `old`, detaching `old`.
    pub(crate) fn replace_node(&mut self, old: NodeId, new: NodeId) -> Result<(), TreeError> {
        let parent = self.check_replace(old, new)?;
        let (prev, next, old_len) = {
            let data = &mut self.nodes[old.index()];
            let links = (data.prev, data.next, data.len);
            data.parent = None;
            data.prev = None;
            data.next = None;
            links
        };
        match prev {
            Some(prev) => self.nodes[prev.index()].next = Some(new),
            None => self.nodes[parent.index()].first_child = Some(new),
        }
        match next {
            Some(next) => self.nodes[next.index()].prev = Some(new),
            None => self.nodes[parent.index()].last_child = Some(new),
        }
        let new_len = {
            let data = &mut self.nodes[new.index()];
            data.parent = Some(parent);
            data.prev = prev;
            data.next = next;
            data.len
        };
        self.propagate_len(Some(parent), new_len as isize - old_len as isize);
        Ok(())
    }

    /// Replace the text of a leaf, returning its previous length.
    pub(crate) fn set_text(&mut self, leaf: NodeId, text: &str) -> Result<usize, TreeError> {
        if self.data(leaf)?.slot.is_none() {
            return Err(TreeError::NotLeaf(leaf));
        }
        let slot = self.texts.intern(text);
        let new_len = text.chars().count();
        let data = &mut self.nodes[leaf.index()];
        let old_len = data.len;
        data.slot = Some(slot);
        data.len = new_len;
        let parent = data.parent;
        self.propagate_len(parent, new_len as isize - old_len as isize);
        Ok(old_len)
    }

    /// Link an already validated `child` under `parent`.
    pub(crate) fn link(&mut self, parent: NodeId, before: Option<NodeId>, child: NodeId) {
        let prev = match before {
            Some(anchor) => self.nodes[anchor.index()].prev,
            None => self.nodes[parent.index()].last_child,
        };
        match prev {
            Some(prev) => self.nodes[prev.index()].next = Some(child),
            None => self.nodes[parent.index()].first_child = Some(child),
        }
        match before {
            Some(anchor) => self.nodes[anchor.index()].prev = Some(child),
            None => self.nodes[parent.index()].last_child = Some(child),
        }
        self.nodes[parent.index()].child_count += 1;
        let data = &mut self.nodes[child.index()];
        data.parent = Some(parent);
        data.prev = prev;
        data.next = before;
        let len = data.len;
        self.propagate_len(Some(parent), len as isize);
    }

    fn propagate_len(&mut self, from: Option<NodeId>, delta: isize) {
        if delta == 0 {
            return;
        }
        let mut current = from;
        while let Some(node) = current {
            let data = &mut self.nodes[node.index()];
            data.len = shift_len(data.len, delta);
            current = data.parent;
        }
    }
}

/// Queue the children of `node` so they pop in document order, each paired with `copy`.
fn push_children_reversed(
    tree: &SyntaxTree,
    node: NodeId,
    copy: NodeId,
    stack: &mut Vec<(NodeId, NodeId)>,
) {
    let mut child = tree.last_child(node);
    while let Some(c) = child {
        stack.push((c, copy));
        child = tree.prev_sibling(c);
    }
}

impl TreeAccess for SyntaxTree {
    type Node = NodeId;

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        SyntaxTree::parent(self, node)
    }

    fn prev_sibling(&self, node: NodeId) -> Option<NodeId> {
        SyntaxTree::prev_sibling(self, node)
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        SyntaxTree::next_sibling(self, node)
    }

    fn text_len(&self, node: NodeId) -> usize {
        SyntaxTree::text_len(self, node)
    }

    fn leaf_slot(&self, node: NodeId) -> Option<TextSlot> {
        self.nodes.get(node.index())?.slot
    }
}
