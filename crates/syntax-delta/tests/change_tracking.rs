use pretty_assertions::assert_eq;
use syntax_delta::{
    Aspect, ChangeInfo, ChangeKind, NodeId, NodeKind, SyntaxTree, TrackerConfig, TreeAccess,
    TreeBuilder, TreeChangeEvent,
};

const BLOCK: NodeKind = NodeKind::new(1);
const TOKEN: NodeKind = NodeKind::new(2);

/// `Root[A[B, C]]` with `B = "bbb"` and `C = "ccccc"`.
fn root_a_b_c() -> (SyntaxTree, NodeId, NodeId, NodeId) {
    let mut builder = TreeBuilder::new(BLOCK);
    builder.start_node(BLOCK);
    builder.token(TOKEN, "bbb");
    builder.token(TOKEN, "ccccc");
    builder.finish_node();
    let tree = builder.finish().unwrap();
    let a = tree.first_child(tree.root()).unwrap();
    let b = tree.first_child(a).unwrap();
    let c = tree.last_child(a).unwrap();
    (tree, a, b, c)
}

fn entries(event: &TreeChangeEvent<NodeId>, parent: NodeId) -> Vec<(NodeId, ChangeInfo<NodeId>)> {
    event
        .changes_by_element(parent)
        .map(|change| change.iter().map(|(child, info)| (child, *info)).collect())
        .unwrap_or_default()
}

#[test]
fn test_edit_scenario_on_root_a_b_c() {
    let (mut tree, a, b, c) = root_a_b_c();
    let mut event = TreeChangeEvent::new(Aspect::SYNTAX_TREE, tree.root());

    tree.edit(&mut event).unwrap().remove(b).unwrap();
    assert_eq!(event.changed_elements().collect::<Vec<_>>(), vec![a]);
    assert_eq!(entries(&event, a), vec![(b, ChangeInfo::Removed { old_len: 3 })]);

    let d = tree.alloc_leaf(TOKEN, "dd");
    tree.edit(&mut event).unwrap().append_child(a, d).unwrap();
    assert_eq!(
        entries(&event, a),
        vec![(b, ChangeInfo::Removed { old_len: 3 }), (d, ChangeInfo::Add)]
    );

    let e = tree.alloc_leaf(TOKEN, "e");
    tree.edit(&mut event).unwrap().replace(c, e).unwrap();
    assert_eq!(
        entries(&event, a),
        vec![
            (b, ChangeInfo::Removed { old_len: 3 }),
            (d, ChangeInfo::Add),
            (
                e,
                ChangeInfo::Replace {
                    old_len: 5,
                    replaced: c
                }
            ),
        ]
    );

    tree.edit(&mut event).unwrap().remove(d).unwrap();
    assert_eq!(
        entries(&event, a),
        vec![
            (b, ChangeInfo::Removed { old_len: 3 }),
            (
                e,
                ChangeInfo::Replace {
                    old_len: 5,
                    replaced: c
                }
            ),
        ]
    );
    assert_eq!(event.len(), 1);
}

#[test]
fn test_add_then_remove_leaves_parent_untracked() {
    let (mut tree, a, ..) = root_a_b_c();
    let mut event = TreeChangeEvent::new(Aspect::SYNTAX_TREE, tree.root());
    let fresh = tree.alloc_leaf(TOKEN, "zz");

    let mut edit = tree.edit(&mut event).unwrap();
    edit.insert_child(a, 1, fresh).unwrap();
    edit.remove(fresh).unwrap();
    assert!(edit.event().changes_by_element(a).is_none());
    assert!(event.is_empty());
}

#[test]
fn test_replacement_chain_reports_original_length() {
    let (mut tree, a, _, c) = root_a_b_c();
    let mut event = TreeChangeEvent::new(Aspect::SYNTAX_TREE, tree.root());
    let first = tree.alloc_leaf(TOKEN, "1");
    let second = tree.alloc_leaf(TOKEN, "22");
    let third = tree.alloc_leaf(TOKEN, "333");

    let mut edit = tree.edit(&mut event).unwrap();
    edit.replace(c, first).unwrap();
    edit.replace(first, second).unwrap();
    edit.replace(second, third).unwrap();

    assert_eq!(
        entries(&event, a),
        vec![(
            third,
            ChangeInfo::Replace {
                old_len: 5,
                replaced: c
            }
        )]
    );
}

#[test]
fn test_replacing_a_changed_subtree_reports_its_original_length() {
    // Root[A[B[x, y]]]
    let mut builder = TreeBuilder::new(BLOCK);
    builder.start_node(BLOCK);
    builder.start_node(BLOCK);
    builder.token(TOKEN, "xx");
    builder.token(TOKEN, "yyy");
    builder.finish_node();
    builder.finish_node();
    let mut tree = builder.finish().unwrap();
    let a = tree.first_child(tree.root()).unwrap();
    let b = tree.first_child(a).unwrap();
    let x = tree.first_child(b).unwrap();
    let mut event = TreeChangeEvent::new(Aspect::SYNTAX_TREE, tree.root());

    tree.edit(&mut event).unwrap().set_leaf_text(x, "xxxxxxx").unwrap();
    assert_eq!(event.changed_elements().collect::<Vec<_>>(), vec![b]);

    let g = tree.alloc_leaf(TOKEN, "g");
    tree.edit(&mut event).unwrap().replace(b, g).unwrap();

    assert_eq!(event.changed_elements().collect::<Vec<_>>(), vec![a]);
    assert_eq!(
        entries(&event, a),
        vec![(
            g,
            ChangeInfo::Replace {
                old_len: 5,
                replaced: b
            }
        )]
    );
}

#[test]
fn test_ancestor_change_compacts_everything_below() {
    // Root[A[P[Q[q], r]], s]
    let mut builder = TreeBuilder::new(BLOCK);
    builder.start_node(BLOCK);
    builder.start_node(BLOCK);
    builder.start_node(BLOCK);
    builder.token(TOKEN, "q");
    builder.finish_node();
    builder.token(TOKEN, "r");
    builder.finish_node();
    builder.finish_node();
    builder.token(TOKEN, "s");
    let mut tree = builder.finish().unwrap();
    let root = tree.root();
    let a = tree.first_child(root).unwrap();
    let p = tree.first_child(a).unwrap();
    let q_node = tree.first_child(p).unwrap();
    let q = tree.first_child(q_node).unwrap();
    let r = tree.last_child(p).unwrap();
    let mut event = TreeChangeEvent::new(Aspect::SYNTAX_TREE, root);

    let mut edit = tree.edit(&mut event).unwrap();
    edit.set_leaf_text(q, "qqq").unwrap();
    edit.set_leaf_text(r, "").unwrap();
    assert_eq!(edit.event().changed_elements().collect::<Vec<_>>(), vec![p]);

    let t = edit.tree().last_child(root).unwrap();
    edit.set_leaf_text(t, "ss").unwrap();

    assert_eq!(event.changed_elements().collect::<Vec<_>>(), vec![root]);
    for node in [a, p, q_node] {
        assert_eq!(event.changes_by_element(node).map(|c| c.len()), None);
    }
    assert_eq!(
        entries(&event, root),
        vec![
            (a, ChangeInfo::ContentsChanged { old_len: 2 }),
            (t, ChangeInfo::ContentsChanged { old_len: 1 }),
        ]
    );
    assert_eq!(event.tracked_at_depth(0).collect::<Vec<_>>(), vec![root]);
    assert_eq!((1..4).map(|d| event.tracked_at_depth(d).count()).sum::<usize>(), 0);
}

#[test]
fn test_affected_children_follow_first_recorded_order() {
    let mut builder = TreeBuilder::new(BLOCK);
    for text in ["a", "b", "c", "d"] {
        builder.token(TOKEN, text);
    }
    let mut tree = builder.finish().unwrap();
    let root = tree.root();
    let kids: Vec<NodeId> = tree.children(root).collect();
    let mut event = TreeChangeEvent::new(Aspect::SYNTAX_TREE, root);

    let mut edit = tree.edit(&mut event).unwrap();
    edit.set_leaf_text(kids[3], "dd").unwrap();
    edit.remove(kids[1]).unwrap();
    edit.set_leaf_text(kids[0], "aa").unwrap();
    edit.set_leaf_text(kids[3], "ddd").unwrap();

    let change = event.changes_by_element(root).unwrap();
    assert_eq!(
        change.affected_children().collect::<Vec<_>>(),
        vec![kids[3], kids[1], kids[0]]
    );
    assert_eq!(
        change.change_by_child(kids[3]).map(ChangeInfo::kind),
        Some(ChangeKind::ContentsChanged)
    );
    assert_eq!(change.change_by_child(kids[3]).map(ChangeInfo::old_len), Some(1));
}

#[test]
fn test_retyping_a_removed_token_is_not_a_change() {
    let mut builder = TreeBuilder::new(BLOCK);
    for text in ["if", " ", "x"] {
        builder.token(TOKEN, text);
    }
    let mut tree = builder.finish().unwrap();
    let root = tree.root();
    let x = tree.last_child(root).unwrap();
    let mut event = TreeChangeEvent::new(Aspect::SYNTAX_TREE, root);

    let twin = tree.alloc_leaf(TOKEN, "x");
    let mut edit = tree.edit(&mut event).unwrap();
    edit.insert_after(x, twin).unwrap();
    edit.remove(x).unwrap();
    assert!(event.is_empty());
}

#[test]
fn test_retyping_before_a_removed_token_is_not_a_change() {
    let mut builder = TreeBuilder::new(BLOCK);
    for text in ["if", " ", "x"] {
        builder.token(TOKEN, text);
    }
    let mut tree = builder.finish().unwrap();
    let root = tree.root();
    let x = tree.last_child(root).unwrap();
    let mut event = TreeChangeEvent::new(Aspect::SYNTAX_TREE, root);

    let twin = tree.alloc_leaf(TOKEN, "x");
    let mut edit = tree.edit(&mut event).unwrap();
    edit.insert_before(x, twin).unwrap();
    edit.remove(x).unwrap();
    assert!(event.is_empty());
    assert_eq!(tree.text(root), "if x");
}

#[test]
fn test_removed_token_put_back_unchanged_is_not_a_change() {
    let (mut tree, a, b, c) = root_a_b_c();
    let mut event = TreeChangeEvent::new(Aspect::SYNTAX_TREE, tree.root());

    let mut edit = tree.edit(&mut event).unwrap();
    edit.remove(b).unwrap();
    edit.set_leaf_text(b, "zz").unwrap();
    edit.set_leaf_text(b, "bbb").unwrap();
    edit.insert_before(c, b).unwrap();
    assert!(event.is_empty());

    let mut edit = tree.edit(&mut event).unwrap();
    edit.remove(b).unwrap();
    edit.set_leaf_text(b, "zz").unwrap();
    edit.insert_before(c, b).unwrap();
    assert_eq!(
        entries(&event, a),
        vec![(b, ChangeInfo::ContentsChanged { old_len: 3 })]
    );
}

#[test]
fn test_retyped_token_is_reported_without_coalescing() {
    let mut builder = TreeBuilder::new(BLOCK);
    builder.token(TOKEN, "x");
    let mut tree = builder.finish().unwrap();
    let root = tree.root();
    let x = tree.first_child(root).unwrap();
    let config = TrackerConfig::new().with_leaf_coalescing(false);
    let mut event = TreeChangeEvent::with_config(Aspect::SYNTAX_TREE, root, config);

    let twin = tree.alloc_leaf(TOKEN, "x");
    let mut edit = tree.edit(&mut event).unwrap();
    edit.insert_before(x, twin).unwrap();
    edit.remove(x).unwrap();
    assert_eq!(
        entries(&event, root),
        vec![(twin, ChangeInfo::Add), (x, ChangeInfo::Removed { old_len: 1 })]
    );
}

#[test]
fn test_bucket_consistency_during_edits() {
    let mut builder = TreeBuilder::new(BLOCK);
    for _ in 0..3 {
        builder.start_node(BLOCK);
        builder.start_node(BLOCK);
        builder.token(TOKEN, "leaf");
        builder.finish_node();
        builder.finish_node();
    }
    let mut tree = builder.finish().unwrap();
    let root = tree.root();
    let leaves: Vec<NodeId> = tree
        .children(root)
        .map(|outer| {
            let inner = tree.first_child(outer).unwrap();
            tree.first_child(inner).unwrap()
        })
        .collect();
    let config = TrackerConfig::new().with_invariant_checks(true);
    let mut event = TreeChangeEvent::with_config(Aspect::SYNTAX_TREE, root, config);

    let check = |event: &TreeChangeEvent<NodeId>, tree: &SyntaxTree| {
        let bucketed: usize = (0..8).map(|d| event.tracked_at_depth(d).count()).sum();
        assert_eq!(bucketed, event.len());
        for node in event.changed_elements() {
            let depth = event.tracked_depth(node).unwrap();
            assert_eq!(depth, tree.depth(node));
            assert!(event.tracked_at_depth(depth).any(|n| n == node));
        }
    };

    for (idx, leaf) in leaves.iter().enumerate() {
        tree.edit(&mut event)
            .unwrap()
            .set_leaf_text(*leaf, &"n".repeat(idx))
            .unwrap();
        check(&event, &tree);
    }
    assert_eq!(event.len(), 3);
    assert_eq!(event.tracked_at_depth(2).count(), 3);

    let extra = tree.alloc_leaf(TOKEN, "!");
    tree.edit(&mut event).unwrap().append_child(root, extra).unwrap();
    check(&event, &tree);
    assert_eq!(event.changed_elements().collect::<Vec<_>>(), vec![root]);
    event.verify_invariants(&tree);
}
