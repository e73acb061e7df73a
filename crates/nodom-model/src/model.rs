//! Model - path-addressed reactive wrapper
//!
//! A [`Model`] is a cheap handle: a shared root holding the data tree plus a
//! wrapper naming the path this handle looks at. Wrappers for nested
//! objects/arrays are created on first access and cached in the root's
//! identity map, so `get_model("a")` always returns the same wrapper and the
//! same [`ModelId`].

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::Value;

use crate::{path, DirtyQueue, ModelError, OwnerId};

static NEXT_MODEL_ID: AtomicU32 = AtomicU32::new(1);

/// Stable identity of a model wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub u32);

impl ModelId {
    fn fresh() -> Self {
        ModelId(NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Watcher handle, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatcherId(u32);

/// Watcher callback: (model written through, relative key, old value, new value)
pub type WatchFn = Rc<dyn Fn(&Model, &str, &Value, &Value)>;

struct Watcher {
    id: WatcherId,
    callback: WatchFn,
}

/// Shared state of one data tree
struct ModelRoot {
    data: RefCell<Value>,
    /// Identity map: absolute path -> wrapper
    wrappers: RefCell<HashMap<String, Rc<Wrapper>>>,
    /// Watchers keyed by absolute path
    watchers: RefCell<HashMap<String, Vec<Watcher>>>,
    owners: RefCell<Vec<OwnerId>>,
    queue: Option<DirtyQueue>,
    next_watcher: Cell<u32>,
}

#[derive(Debug)]
struct Wrapper {
    id: ModelId,
    path: String,
}

/// Reactive model handle
#[derive(Clone)]
pub struct Model {
    root: Rc<ModelRoot>,
    wrapper: Rc<Wrapper>,
}

impl Model {
    /// Create a model whose changes flag owners in `queue`
    pub fn new(data: Value, queue: DirtyQueue) -> Self {
        Self::with_queue(data, Some(queue))
    }

    /// Create a model that notifies watchers only (no owners are flagged)
    pub fn detached(data: Value) -> Self {
        Self::with_queue(data, None)
    }

    fn with_queue(data: Value, queue: Option<DirtyQueue>) -> Self {
        let wrapper = Rc::new(Wrapper {
            id: ModelId::fresh(),
            path: String::new(),
        });
        let mut wrappers = HashMap::new();
        wrappers.insert(String::new(), wrapper.clone());

        let root = Rc::new(ModelRoot {
            data: RefCell::new(data),
            wrappers: RefCell::new(wrappers),
            watchers: RefCell::new(HashMap::new()),
            owners: RefCell::new(Vec::new()),
            queue,
            next_watcher: Cell::new(1),
        });
        Self { root, wrapper }
    }

    /// Wrapper identity (stable for the lifetime of the root)
    pub fn id(&self) -> ModelId {
        self.wrapper.id
    }

    /// Absolute path of this wrapper inside its root
    pub fn path(&self) -> &str {
        &self.wrapper.path
    }

    pub fn is_root(&self) -> bool {
        self.wrapper.path.is_empty()
    }

    /// Same wrapper (reference equality)
    pub fn ptr_eq(&self, other: &Model) -> bool {
        Rc::ptr_eq(&self.wrapper, &other.wrapper)
    }

    /// Same underlying data tree
    pub fn same_root(&self, other: &Model) -> bool {
        Rc::ptr_eq(&self.root, &other.root)
    }

    /// Model for the whole data tree
    pub fn root_model(&self) -> Model {
        let wrapper = self.root.wrappers.borrow().get("").cloned();
        match wrapper {
            Some(wrapper) => Model {
                root: self.root.clone(),
                wrapper,
            },
            None => self.clone(),
        }
    }

    /// Read a value relative to this model (cloned)
    pub fn get(&self, key: &str) -> Option<Value> {
        self.with_value(key, |v| v.cloned())
    }

    /// Borrow a value relative to this model
    pub fn with_value<R>(&self, key: &str, f: impl FnOnce(Option<&Value>) -> R) -> R {
        let full = path::join(&self.wrapper.path, key);
        let data = self.root.data.borrow();
        f(path::lookup(&data, &full))
    }

    /// Snapshot of the value this model looks at
    pub fn value(&self) -> Value {
        self.get("").unwrap_or(Value::Null)
    }

    /// Whether a key exists relative to this model
    pub fn contains(&self, key: &str) -> bool {
        self.with_value(key, |v| v.is_some())
    }

    /// Object keys of this model's value
    pub fn keys(&self) -> Vec<String> {
        self.with_value("", |v| match v {
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        })
    }

    /// Length when this model looks at an array
    pub fn array_len(&self) -> Option<usize> {
        self.with_value("", |v| v.and_then(Value::as_array).map(Vec::len))
    }

    /// Write a value relative to this model.
    ///
    /// Returns `Ok(false)` when the value is unchanged. Owners are flagged and
    /// watchers run after the write has been applied.
    pub fn set(&self, key: &str, value: Value) -> Result<bool, ModelError> {
        let full = path::join(&self.wrapper.path, key);
        let old = {
            let mut data = self.root.data.borrow_mut();
            if path::lookup(&data, &full) == Some(&value) {
                return Ok(false);
            }
            path::assign(&mut data, &full, value.clone())?
        };

        if path::is_reserved(&full) {
            tracing::trace!("Reserved key '{}' written silently", full);
            return Ok(true);
        }

        self.notify(&full, key, &old, &value);
        Ok(true)
    }

    fn notify(&self, full: &str, key: &str, old: &Value, new: &Value) {
        if let Some(queue) = &self.root.queue {
            for owner in self.root.owners.borrow().iter() {
                queue.mark(*owner);
            }
        }

        let callbacks: Vec<WatchFn> = self
            .root
            .watchers
            .borrow()
            .get(full)
            .map(|list| list.iter().map(|w| w.callback.clone()).collect())
            .unwrap_or_default();

        for callback in callbacks {
            callback(self, key, old, new);
        }
    }

    /// Wrapper for a nested object or array, cached per path.
    ///
    /// Returns `None` when the value is missing or primitive.
    pub fn get_model(&self, key: &str) -> Option<Model> {
        let full = path::join(&self.wrapper.path, key);
        if full == self.wrapper.path {
            return Some(self.clone());
        }

        let is_container = {
            let data = self.root.data.borrow();
            matches!(
                path::lookup(&data, &full),
                Some(Value::Object(_) | Value::Array(_))
            )
        };
        if !is_container {
            return None;
        }

        let wrapper = self
            .root
            .wrappers
            .borrow_mut()
            .entry(full.clone())
            .or_insert_with(|| {
                Rc::new(Wrapper {
                    id: ModelId::fresh(),
                    path: full,
                })
            })
            .clone();

        Some(Model {
            root: self.root.clone(),
            wrapper,
        })
    }

    /// Register a watcher for a key relative to this model
    pub fn watch(
        &self,
        key: &str,
        callback: impl Fn(&Model, &str, &Value, &Value) + 'static,
    ) -> WatcherId {
        let id = WatcherId(self.root.next_watcher.get());
        self.root.next_watcher.set(id.0 + 1);

        let full = path::join(&self.wrapper.path, key);
        self.root
            .watchers
            .borrow_mut()
            .entry(full)
            .or_default()
            .push(Watcher {
                id,
                callback: Rc::new(callback),
            });
        id
    }

    /// Remove a watcher. Returns false if it was not registered.
    pub fn unwatch(&self, id: WatcherId) -> bool {
        let mut watchers = self.root.watchers.borrow_mut();
        for list in watchers.values_mut() {
            if let Some(pos) = list.iter().position(|w| w.id == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Bind an owner: it is flagged dirty on every change of this data tree
    pub fn bind_owner(&self, owner: OwnerId) {
        let mut owners = self.root.owners.borrow_mut();
        if !owners.contains(&owner) {
            owners.push(owner);
        }
    }

    pub fn unbind_owner(&self, owner: OwnerId) {
        self.root.owners.borrow_mut().retain(|o| *o != owner);
    }

    /// Owners bound to this data tree
    pub fn owners(&self) -> Vec<OwnerId> {
        self.root.owners.borrow().clone()
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.wrapper.id)
            .field("path", &self.wrapper.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_and_set() {
        let model = Model::detached(json!({"a": {"b": 2}}));
        assert_eq!(model.get("a.b"), Some(json!(2)));

        assert_eq!(model.set("a.b", json!(3)), Ok(true));
        assert_eq!(model.get("a.b"), Some(json!(3)));
        assert_eq!(model.set("a.b", json!(3)), Ok(false));
    }

    #[test]
    fn test_nested_model_reads_live_data() {
        let model = Model::detached(json!({"user": {"name": "ann"}}));
        let user = model.get_model("user").unwrap();
        assert_eq!(user.path(), "user");

        model.set("user.name", json!("bob")).unwrap();
        assert_eq!(user.get("name"), Some(json!("bob")));

        user.set("name", json!("cid")).unwrap();
        assert_eq!(model.get("user.name"), Some(json!("cid")));
    }

    #[test]
    fn test_primitive_has_no_model() {
        let model = Model::detached(json!({"n": 1}));
        assert!(model.get_model("n").is_none());
        assert!(model.get_model("missing").is_none());
    }

    #[test]
    fn test_owner_flagged_on_change() {
        let queue = DirtyQueue::new();
        let model = Model::new(json!({"x": 1}), queue.clone());
        model.bind_owner(OwnerId(4));

        model.set("x", json!(1)).unwrap();
        assert!(queue.is_empty());

        model.set("x", json!(2)).unwrap();
        assert_eq!(queue.drain(), vec![OwnerId(4)]);
    }

    #[test]
    fn test_reserved_key_is_silent() {
        let queue = DirtyQueue::new();
        let model = Model::new(json!({}), queue.clone());
        model.bind_owner(OwnerId(1));
        model.set("$index", json!(3)).unwrap();
        assert!(queue.is_empty());
        assert_eq!(model.get("$index"), Some(json!(3)));
    }

    #[test]
    fn test_unwatch() {
        let model = Model::detached(json!({"a": 1}));
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let id = model.watch("a", move |_, _, _, _| counter.set(counter.get() + 1));

        model.set("a", json!(2)).unwrap();
        assert!(model.unwatch(id));
        model.set("a", json!(3)).unwrap();
        assert_eq!(hits.get(), 1);
    }
}
