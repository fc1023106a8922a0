//! Line-oriented plain-text lexer.
//!
//! Produces a two-level tree: one `LINE` node per line (newline included), each holding
//! `WORD`, `WHITESPACE`, `PUNCT` and `NEWLINE` leaves. The tree text always equals the input.

use super::tree::{NodeId, NodeKind, SyntaxTree};
use regex::Regex;
use std::sync::LazyLock;

/// Root kind.
pub const FILE: NodeKind = NodeKind::new(0);
/// One line, including its trailing newline.
pub const LINE: NodeKind = NodeKind::new(1);
/// Run of word characters.
pub const WORD: NodeKind = NodeKind::new(2);
/// Run of non-newline whitespace.
pub const WHITESPACE: NodeKind = NodeKind::new(3);
/// Any other single character.
pub const PUNCT: NodeKind = NodeKind::new(4);
/// `\n`.
pub const NEWLINE: NodeKind = NodeKind::new(5);

// Every char matches exactly one alternative, so tokens tile the input.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<word>\w+)|(?P<space>[^\S\n]+)|(?P<newline>\n)|[^\w\s]")
        .expect("valid token regex")
});

/// Lex `text` into a `FILE → LINE → token` tree.
///
/// An empty input yields a root without lines; a trailing newline does not open an empty line.
pub fn lex_lines(text: &str) -> SyntaxTree {
    let mut tree = SyntaxTree::new(FILE);
    let root = tree.root();
    for line in text.split_inclusive('\n') {
        let node = lex_line(&mut tree, line);
        tree.link(root, None, node);
    }
    tree
}

/// Allocate a detached `LINE` node holding the tokens of `text`.
///
/// Used to re-lex a single line: the result can replace the old line through
/// [`TreeEdit::replace`](super::TreeEdit::replace).
pub fn lex_line(tree: &mut SyntaxTree, text: &str) -> NodeId {
    let line = tree.alloc_composite(LINE);
    for caps in TOKEN_RE.captures_iter(text) {
        let kind = if caps.name("word").is_some() {
            WORD
        } else if caps.name("space").is_some() {
            WHITESPACE
        } else if caps.name("newline").is_some() {
            NEWLINE
        } else {
            PUNCT
        };
        let token = tree.alloc_leaf(kind, &caps[0]);
        tree.link(line, None, token);
    }
    line
}
