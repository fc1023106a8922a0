use super::tree::NodeId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by the arena tree, its edit session and its builder.
pub enum TreeError {
    #[error("unknown node {0:?}")]
    /// The id does not belong to this tree.
    UnknownNode(NodeId),

    #[error("node {0:?} is not attached to a parent")]
    /// The operation needs an attached node.
    NotAttached(NodeId),

    #[error("node {0:?} is already attached to a parent")]
    /// Only detached nodes can be inserted.
    AlreadyAttached(NodeId),

    #[error("the root node cannot be moved")]
    /// The root never gets a parent.
    RootNotMovable,

    #[error("node {0:?} is a leaf and cannot have children")]
    /// Children can only be inserted into composite nodes.
    NotComposite(NodeId),

    #[error("node {0:?} is not a leaf")]
    /// Text can only be set on leaves.
    NotLeaf(NodeId),

    #[error("node {anchor:?} is not a child of {parent:?}")]
    /// An insertion anchor is not a child of the target parent.
    NotAChild {
        /// Expected parent.
        parent: NodeId,
        /// The offending anchor.
        anchor: NodeId,
    },

    #[error("child index {index} out of bounds for {parent:?} with {len} children")]
    /// An insertion index is past the end of the parent's children.
    IndexOutOfBounds {
        /// Target parent.
        parent: NodeId,
        /// Requested index.
        index: usize,
        /// Current number of children.
        len: usize,
    },

    #[error("inserting {node:?} under {parent:?} would create a cycle")]
    /// The inserted node is the target parent or one of its ancestors.
    WouldCreateCycle {
        /// Target parent.
        parent: NodeId,
        /// The node being inserted.
        node: NodeId,
    },

    #[error("event tracks root {event_root:?} but the tree root is {tree_root:?}")]
    /// An edit session was opened with an event created for another tree.
    ForeignEvent {
        /// Root recorded in the event.
        event_root: NodeId,
        /// Root of the tree being edited.
        tree_root: NodeId,
    },

    #[error("unbalanced tree builder: {open} node(s) left open, {overclosed} extra finish call(s)")]
    /// `start_node` / `finish_node` calls did not pair up.
    UnbalancedBuilder {
        /// Nodes still open at `finish`.
        open: usize,
        /// `finish_node` calls without an open node.
        overclosed: usize,
    },
}
