#![warn(missing_docs)]
//! Syntax Delta - Incremental Change Tracking for Syntax Trees
//!
//! # Overview
//!
//! `syntax-delta` records the structural edits applied to a syntax tree during one transaction
//! and reduces them to a minimal, consistent description: for every affected parent node, which
//! direct children were added, removed, replaced or had their contents changed, together with
//! the length each affected slot had before the transaction started.
//!
//! # Core Features
//!
//! - **Merge Rules**: add-then-remove cancels, replacement chains collapse, re-created tokens vanish
//! - **Compaction**: tracked parents never nest; deeper changes fold into their ancestors
//! - **Depth Index**: tracked nodes bucketed by depth for deepest-first compaction
//! - **Span Deltas**: changes turned into ordered char-offset edits without keeping old text
//! - **Host Agnostic**: the engine reads the tree through the [`TreeAccess`] trait
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  DocumentMirror (Rope-based)                │  ← Consumer
//! ├─────────────────────────────────────────────┤
//! │  TreeDelta / SpanEdit                       │  ← Span Diff
//! ├─────────────────────────────────────────────┤
//! │  TreeChangeEvent (compaction, buckets)      │  ← Aggregation
//! ├─────────────────────────────────────────────┤
//! │  TreeChange / ChangeInfo (merge rules)      │  ← Per-Parent Records
//! ├─────────────────────────────────────────────┤
//! │  TreeAccess  ←  SyntaxTree + TreeEdit       │  ← Tree Host
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use syntax_delta::{Aspect, DocumentMirror, TreeChangeEvent, lex_line, lex_lines};
//!
//! let mut tree = lex_lines("let x = 1;\nlet y = 2;\n");
//! let mut mirror = DocumentMirror::new(&tree);
//! let mut event = TreeChangeEvent::new(Aspect::SYNTAX_TREE, tree.root());
//!
//! // Re-lex the first line and swap it in.
//! let old_line = tree.first_child(tree.root()).unwrap();
//! let new_line = lex_line(&mut tree, "let x = 42;\n");
//! tree.edit(&mut event).unwrap().replace(old_line, new_line).unwrap();
//!
//! let delta = event.to_delta(&tree);
//! assert_eq!(delta.edits.len(), 1);
//! mirror.apply(&delta, &tree).unwrap();
//! assert_eq!(mirror.text(), "let x = 42;\nlet y = 2;\n");
//! ```
//!
//! # Module Description
//!
//! - [`access`] - Tree navigation contract used by the engine
//! - [`change`] - Elementary change records
//! - [`tree_change`] - Per-parent changesets and merge rules
//! - [`event`] - Transaction-wide aggregation and compaction
//! - [`delta`] - Span deltas derived from an event
//! - [`arena`] - Arena syntax tree, edit session, builder and line lexer
//! - [`sync`] - Rope-backed document mirror
//!
//! # Memory
//!
//! [`SyntaxTree`] never frees a node or an interned text on its own, so every re-lexed line
//! leaves its old nodes behind. Long-lived documents should swap in
//! [`SyntaxTree::compacted`] between transactions. The copy has the same text, so a
//! [`DocumentMirror`] stays in sync, but stored [`NodeId`]s and open events must be dropped.
//!
//! # Logging
//!
//! Tracking decisions are emitted through `tracing` (`debug` for tracked / untracked parents
//! and compaction, `trace` for merge rules). The crate never installs a subscriber.

pub mod access;
pub mod arena;
pub mod change;
pub mod config;
pub mod delta;
pub mod event;
pub mod sync;
pub mod tree_change;

pub use access::{TextSlot, TreeAccess};
pub use arena::{
    NodeId, NodeKind, SyntaxTree, TextTable, TreeBuilder, TreeEdit, TreeError, lex_line, lex_lines,
};
pub use change::{ChangeInfo, ChangeKind};
pub use config::TrackerConfig;
pub use delta::{SpanEdit, TreeDelta};
pub use event::{Aspect, TreeChangeEvent};
pub use sync::{DocumentMirror, SyncError};
pub use tree_change::TreeChange;
