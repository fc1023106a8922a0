use super::error::TreeError;
use super::tree::{NodeId, NodeKind, SyntaxTree};

/// Event-style constructor for a [`SyntaxTree`].
///
/// ```rust
/// use syntax_delta::{NodeKind, TreeBuilder};
///
/// let mut builder = TreeBuilder::new(NodeKind::new(0));
/// builder.start_node(NodeKind::new(1));
/// builder.token(NodeKind::new(2), "let");
/// builder.token(NodeKind::new(3), " ");
/// builder.finish_node();
/// let tree = builder.finish().unwrap();
/// assert_eq!(tree.text(tree.root()), "let ");
/// ```
#[derive(Debug)]
pub struct TreeBuilder {
    tree: SyntaxTree,
    stack: Vec<NodeId>,
    overclosed: usize,
}

impl TreeBuilder {
    /// Start a tree whose root has kind `root_kind`.
    pub fn new(root_kind: NodeKind) -> Self {
        let tree = SyntaxTree::new(root_kind);
        let stack = vec![tree.root()];
        Self {
            tree,
            stack,
            overclosed: 0,
        }
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(self.tree.root())
    }

    /// Open a composite node as the last child of the current node.
    pub fn start_node(&mut self, kind: NodeKind) {
        let node = self.tree.alloc_composite(kind);
        let parent = self.current();
        self.tree.link(parent, None, node);
        self.stack.push(node);
    }

    /// Append a leaf to the current node.
    pub fn token(&mut self, kind: NodeKind, text: &str) {
        let leaf = self.tree.alloc_leaf(kind, text);
        let parent = self.current();
        self.tree.link(parent, None, leaf);
    }

    /// Close the node opened by the matching [`start_node`](Self::start_node).
    pub fn finish_node(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        } else {
            self.overclosed += 1;
        }
    }

    /// Finish building.
    ///
    /// Fails if `start_node` and `finish_node` calls did not pair up.
    pub fn finish(self) -> Result<SyntaxTree, TreeError> {
        let open = self.stack.len() - 1;
        if open > 0 || self.overclosed > 0 {
            return Err(TreeError::UnbalancedBuilder {
                open,
                overclosed: self.overclosed,
            });
        }
        Ok(self.tree)
    }
}
