//! Read-only view of the tree being edited.
//!
//! The change-tracking engine never owns or mutates the tree. Everything it needs (parent and
//! sibling navigation, subtree lengths, and the text slot of a leaf) is reached through
//! [`TreeAccess`], so the same engine works over the bundled [`SyntaxTree`](crate::SyntaxTree)
//! arena or over a host's own tree type.

use std::fmt;
use std::hash::Hash;

/// Interned text storage slot of a leaf.
///
/// Two leaves share a slot exactly when they hold identical text. The engine uses slots to
/// recognise a removed token that was re-created next to itself during the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextSlot(pub u32);

impl TextSlot {
    /// Create a slot from a raw numeric identifier.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Navigation and measurement contract the engine expects from a tree.
///
/// Lengths are expressed in characters (Unicode scalar values) and always describe the
/// *current* state of the tree.
pub trait TreeAccess {
    /// Stable node handle, compared by identity.
    type Node: Copy + Eq + Hash + fmt::Debug;

    /// Parent of `node`, or `None` for the root and for detached nodes.
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// Sibling immediately before `node`.
    fn prev_sibling(&self, node: Self::Node) -> Option<Self::Node>;

    /// Sibling immediately after `node`.
    fn next_sibling(&self, node: Self::Node) -> Option<Self::Node>;

    /// Serialized text length of the subtree rooted at `node`.
    fn text_len(&self, node: Self::Node) -> usize;

    /// Text slot of a leaf; `None` for composite nodes.
    fn leaf_slot(&self, node: Self::Node) -> Option<TextSlot>;

    /// Number of ancestors of `node` (the root has depth 0).
    fn depth(&self, node: Self::Node) -> usize {
        let mut depth = 0;
        let mut current = self.parent(node);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    /// Returns `true` if `ancestor` is a strict ancestor of `node`.
    fn is_ancestor(&self, ancestor: Self::Node, node: Self::Node) -> bool {
        let mut current = self.parent(node);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Absolute character offset at which `node` starts.
    ///
    /// The default walks previous siblings at every level, which is linear in the number of
    /// nodes on the way; trees with cached offsets should override it.
    fn text_offset(&self, node: Self::Node) -> usize {
        let mut offset = 0;
        let mut current = node;
        loop {
            let mut sibling = self.prev_sibling(current);
            while let Some(prev) = sibling {
                offset += self.text_len(prev);
                sibling = self.prev_sibling(prev);
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return offset,
            }
        }
    }
}
