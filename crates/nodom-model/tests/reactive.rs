//! Integration tests for nodom-model
//!
//! Wrapper identity, per-key notification and dirty marking.

use std::cell::RefCell;
use std::rc::Rc;

use nodom_model::{DirtyQueue, Model, OwnerId, Value};
use serde_json::json;

// ============================================================================
// IDENTITY
// ============================================================================

#[test]
fn test_nested_object_wrapper_is_cached() {
    let model = Model::detached(json!({"user": {"name": "ann", "tags": ["a", "b"]}}));

    let first = model.get_model("user").unwrap();
    let second = model.get_model("user").unwrap();
    assert!(first.ptr_eq(&second));
    assert_eq!(first.id(), second.id());

    let tags = first.get_model("tags").unwrap();
    let same_tags = model.get_model("user.tags").unwrap();
    assert!(tags.ptr_eq(&same_tags));
}

#[test]
fn test_sibling_objects_get_distinct_wrappers() {
    let model = Model::detached(json!({"rows": [{"x": 1}, {"x": 2}]}));
    let a = model.get_model("rows.0").unwrap();
    let b = model.get_model("rows.1").unwrap();
    assert!(!a.ptr_eq(&b));
    assert_ne!(a.id(), b.id());
    assert!(a.same_root(&b));
}

#[test]
fn test_root_model_from_nested() {
    let model = Model::detached(json!({"a": {"b": {}}}));
    let nested = model.get_model("a.b").unwrap();
    assert!(nested.root_model().ptr_eq(&model));
    assert!(model.is_root());
    assert!(!nested.is_root());
}

// ============================================================================
// WATCHERS
// ============================================================================

#[test]
fn test_watchers_fire_only_for_their_key() {
    let model = Model::detached(json!({"a": 1, "b": 1}));
    let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

    let sink = log.clone();
    model.watch("a", move |_, key, old, new| {
        sink.borrow_mut().push(format!("a:{key}:{old}->{new}"));
    });
    let sink = log.clone();
    model.watch("b", move |_, key, _, _| {
        sink.borrow_mut().push(format!("b:{key}"));
    });

    model.set("a", json!(2)).unwrap();
    assert_eq!(*log.borrow(), vec!["a:a:1->2".to_string()]);
}

#[test]
fn test_watcher_on_nested_path_through_wrapper() {
    let model = Model::detached(json!({"user": {"name": "ann"}}));
    let user = model.get_model("user").unwrap();
    let seen = Rc::new(RefCell::new(Value::Null));

    let sink = seen.clone();
    user.watch("name", move |_, _, _, new| *sink.borrow_mut() = new.clone());

    model.set("user.name", json!("bob")).unwrap();
    assert_eq!(*seen.borrow(), json!("bob"));
}

#[test]
fn test_mutation_applied_before_watcher_runs() {
    let model = Model::detached(json!({"n": 0}));
    let observed = Rc::new(RefCell::new(None));

    let sink = observed.clone();
    model.watch("n", move |m, _, _, _| *sink.borrow_mut() = m.get("n"));

    model.set("n", json!(5)).unwrap();
    assert_eq!(*observed.borrow(), Some(json!(5)));
}

#[test]
fn test_watcher_may_write_back() {
    let model = Model::detached(json!({"n": 0, "double": 0}));
    model.watch("n", |m, _, _, new| {
        let n = new.as_i64().unwrap_or(0);
        m.set("double", json!(n * 2)).unwrap();
    });

    model.set("n", json!(4)).unwrap();
    assert_eq!(model.get("double"), Some(json!(8)));
}

// ============================================================================
// DIRTY MARKING
// ============================================================================

#[test]
fn test_change_marks_every_bound_owner_once() {
    let queue = DirtyQueue::new();
    let model = Model::new(json!({"a": 1, "b": 2}), queue.clone());
    model.bind_owner(OwnerId(1));
    model.bind_owner(OwnerId(2));
    model.bind_owner(OwnerId(1));

    model.set("a", json!(10)).unwrap();
    model.set("b", json!(20)).unwrap();

    assert_eq!(queue.drain(), vec![OwnerId(1), OwnerId(2)]);
}

#[test]
fn test_nested_write_marks_root_owner() {
    let queue = DirtyQueue::new();
    let model = Model::new(json!({"rows": [{"x": 1}]}), queue.clone());
    model.bind_owner(OwnerId(9));

    let row = model.get_model("rows.0").unwrap();
    row.set("x", json!(2)).unwrap();
    assert_eq!(queue.drain(), vec![OwnerId(9)]);
}

#[test]
fn test_unbound_owner_not_marked() {
    let queue = DirtyQueue::new();
    let model = Model::new(json!({"a": 1}), queue.clone());
    model.bind_owner(OwnerId(3));
    model.unbind_owner(OwnerId(3));

    model.set("a", json!(2)).unwrap();
    assert!(queue.is_empty());
    assert!(model.owners().is_empty());
}

#[test]
fn test_array_append_through_path() {
    let model = Model::detached(json!({"list": []}));
    model.set("list.0", json!("x")).unwrap();
    model.set("list.1", json!("y")).unwrap();
    assert_eq!(model.get_model("list").unwrap().array_len(), Some(2));
    assert!(model.set("list.9", json!("z")).is_err());
}
