//! Arena-backed syntax tree used as the reference host for the tracking engine.
//!
//! [`SyntaxTree`] owns its nodes in a flat arena addressed by [`NodeId`]; mutations that must
//! be observed go through a [`TreeEdit`] session, which reports every elementary change to a
//! [`TreeChangeEvent`](crate::TreeChangeEvent) at the right moment.

mod builder;
mod edit;
mod error;
pub mod lexer;
mod text_table;
mod tree;

pub use builder::TreeBuilder;
pub use edit::TreeEdit;
pub use error::TreeError;
pub use lexer::{lex_line, lex_lines};
pub use text_table::TextTable;
pub use tree::{NodeId, NodeKind, SyntaxTree};
