//! Integration tests for keyed reconciliation
//!
//! Identity, reorder and static budget behaviour of the diff engine.

use nodom_vdom::{compare, ChangeKind, Differ, ModuleId, RenderDom};

const OWNER: ModuleId = ModuleId(7);

fn item(key: &str) -> RenderDom {
    let mut node = RenderDom::element(key, "li", OWNER);
    node.set_prop("data-id", key);
    node.children
        .push(RenderDom::text(format!("{key}:text"), key, OWNER));
    node
}

fn list(keys: &[&str]) -> RenderDom {
    let mut root = RenderDom::element("root", "div", OWNER);
    let mut ul = RenderDom::element("ul", "ul", OWNER);
    ul.children = keys.iter().map(|k| item(k)).collect();
    root.children.push(ul);
    root
}

fn only_moves(new: &[&str], old: &[&str]) -> bool {
    let (new, old) = (list(new), list(old));
    compare(&new, &old)
        .iter()
        .all(|c| c.kind == ChangeKind::Move)
}

// ============================================================================
// IDENTITY
// ============================================================================

#[test]
fn test_compare_with_itself_is_empty() {
    let tree = list(&["a", "b", "c", "d"]);
    assert!(compare(&tree, &tree).is_empty());

    let copy = tree.clone();
    assert!(compare(&copy, &tree).is_empty());
}

#[test]
fn test_empty_children_both_sides() {
    let tree = list(&[]);
    assert!(compare(&tree, &tree.clone()).is_empty());
}

// ============================================================================
// REORDER
// ============================================================================

#[test]
fn test_rotation_yields_only_moves() {
    assert!(only_moves(&["c", "a", "b"], &["a", "b", "c"]));
    assert!(only_moves(&["b", "c", "a"], &["a", "b", "c"]));
}

#[test]
fn test_reverse_yields_only_moves() {
    assert!(only_moves(&["e", "d", "c", "b", "a"], &["a", "b", "c", "d", "e"]));
}

#[test]
fn test_shuffle_yields_only_moves() {
    let (new, old) = (list(&["d", "a", "e", "b", "c"]), list(&["a", "b", "c", "d", "e"]));
    let changes = compare(&new, &old);
    assert!(!changes.is_empty());
    assert!(changes.iter().all(|c| c.kind == ChangeKind::Move));

    let mut moved: Vec<_> = changes.iter().map(|c| c.node.key.as_str()).collect();
    moved.sort();
    moved.dedup();
    assert_eq!(moved.len(), changes.len(), "a key is moved at most once");
}

#[test]
fn test_same_content_different_keys_not_coalesced() {
    let old = list(&["a"]);
    let mut new = list(&["a"]);
    let ul = &mut new.children[0];
    ul.children[0].key = "z".into();

    let changes = compare(&new, &old);
    let kinds: Vec<_> = changes.iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![ChangeKind::Delete, ChangeKind::Add]);
}

#[test]
fn test_insert_in_middle() {
    let (new, old) = (list(&["a", "x", "b"]), list(&["a", "b"]));
    let changes = compare(&new, &old);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].kind, ChangeKind::Add);
    assert_eq!(changes[0].node.key, "x");
    assert_eq!(changes[0].index, 1);
    assert_eq!(changes[0].parent.map(|p| p.key.as_str()), Some("ul"));
}

#[test]
fn test_move_with_update() {
    let old = list(&["a", "b"]);
    let mut new = list(&["b", "a"]);
    new.children[0].children[0].set_prop("data-id", "changed");

    let changes = compare(&new, &old);
    assert!(changes.iter().any(|c| c.kind == ChangeKind::Move));
    assert!(changes
        .iter()
        .any(|c| c.kind == ChangeKind::Update && c.node.key == "b"));
    assert!(changes.iter().all(|c| c.kind != ChangeKind::Delete));
}

// ============================================================================
// STATIC BUDGET
// ============================================================================

#[test]
fn test_frozen_nodes_never_compared() {
    let mut old = list(&["a", "b"]);
    let mut new = list(&["a", "b"]);
    for tree in [&mut old, &mut new] {
        for li in &mut tree.children[0].children {
            li.static_num = 0;
            li.children[0].static_num = 0;
        }
    }
    new.set_prop("title", "unrelated change");

    let differ = Differ::new().compare(&new, &old);
    assert!(!differ.was_compared("a"));
    assert!(!differ.was_compared("b:text"));
    assert!(differ.was_compared("root"));
    assert_eq!(differ.stats().skipped, 4);
    assert_eq!(differ.changes().len(), 1);
}
