//! Router
//!
//! Maps paths to module classes for router views and keeps the active-field
//! registry used by `x-route`: every registered `(path, model, field)` gets
//! `field = true` while the current path lies under `path`. Entries belong to
//! the module that registered them and go away with it.

use nodom_model::Model;
use nodom_vdom::ModuleId;
use serde_json::Value;

/// Router collaborator
pub trait Router {
    fn current_path(&self) -> &str;

    /// Switch to `path`. Returns false when already there.
    fn navigate(&mut self, path: &str) -> bool;

    /// Module class for the router view at `path`
    fn resolve(&self, path: &str) -> Option<String>;

    /// Whether `path` is the current path or one of its ancestors
    fn is_active(&self, path: &str) -> bool {
        path_matches(self.current_path(), path)
    }

    /// Keep `model.field` in sync with `is_active(path)` for as long as
    /// `owner` lives
    fn register_active(&mut self, owner: ModuleId, path: &str, model: &Model, field: &str);

    /// Drop every active field `owner` registered
    fn release(&mut self, owner: ModuleId);
}

/// `current` equals `prefix` or continues it at a segment boundary
pub fn path_matches(current: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match current.strip_prefix(prefix.trim_end_matches('/')) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[derive(Debug, Clone)]
struct Route {
    path: String,
    class_name: String,
}

struct ActiveField {
    owner: ModuleId,
    path: String,
    model: Model,
    field: String,
}

/// Default router with an in-memory history
pub struct BasicRouter {
    routes: Vec<Route>,
    current: String,
    history: Vec<String>,
    active: Vec<ActiveField>,
}

impl Default for BasicRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicRouter {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            current: "/".into(),
            history: Vec::new(),
            active: Vec::new(),
        }
    }

    /// Register a route
    pub fn route(mut self, path: &str, class_name: &str) -> Self {
        self.add_route(path, class_name);
        self
    }

    pub fn add_route(&mut self, path: &str, class_name: &str) {
        self.routes.push(Route {
            path: path.to_string(),
            class_name: class_name.to_string(),
        });
    }

    /// Paths navigated away from, oldest first
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Active fields currently tracked
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Return to the previous path
    pub fn back(&mut self) -> bool {
        let Some(previous) = self.history.pop() else {
            return false;
        };
        self.current = previous;
        self.sync_active();
        true
    }

    fn sync_active(&self) {
        for entry in &self.active {
            let active = path_matches(&self.current, &entry.path);
            if let Err(e) = entry.model.set(&entry.field, Value::Bool(active)) {
                tracing::warn!("Cannot update active field '{}': {}", entry.field, e);
            }
        }
    }
}

impl Router for BasicRouter {
    fn current_path(&self) -> &str {
        &self.current
    }

    fn navigate(&mut self, path: &str) -> bool {
        if self.current == path {
            return false;
        }
        tracing::info!("Navigate {} -> {}", self.current, path);
        let previous = std::mem::replace(&mut self.current, path.to_string());
        self.history.push(previous);
        self.sync_active();
        true
    }

    fn resolve(&self, path: &str) -> Option<String> {
        self.routes
            .iter()
            .filter(|r| path_matches(path, &r.path))
            .max_by_key(|r| r.path.len())
            .map(|r| r.class_name.clone())
    }

    fn register_active(&mut self, owner: ModuleId, path: &str, model: &Model, field: &str) {
        let known = self
            .active
            .iter()
            .any(|a| a.owner == owner && a.path == path && a.field == field && a.model.ptr_eq(model));
        if !known {
            self.active.push(ActiveField {
                owner,
                path: path.to_string(),
                model: model.clone(),
                field: field.to_string(),
            });
        }
    }

    fn release(&mut self, owner: ModuleId) {
        self.active.retain(|a| a.owner != owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_matches() {
        assert!(path_matches("/user/1", "/user"));
        assert!(path_matches("/user", "/user/"));
        assert!(!path_matches("/users", "/user"));
        assert!(path_matches("/anything", "/"));
    }

    #[test]
    fn test_resolve_longest_prefix() {
        let router = BasicRouter::new()
            .route("/", "home")
            .route("/user", "user-list")
            .route("/user/detail", "user-detail");
        assert_eq!(router.resolve("/user/detail/3").as_deref(), Some("user-detail"));
        assert_eq!(router.resolve("/user").as_deref(), Some("user-list"));
        assert_eq!(router.resolve("/about").as_deref(), Some("home"));
    }

    #[test]
    fn test_active_fields_follow_navigation() {
        let mut router = BasicRouter::new();
        let model = Model::detached(json!({"userActive": false}));
        router.register_active(ModuleId(1), "/user", &model, "userActive");
        router.register_active(ModuleId(1), "/user", &model, "userActive");
        assert_eq!(router.active_count(), 1);

        assert!(router.navigate("/user/2"));
        assert_eq!(model.get("userActive"), Some(json!(true)));
        assert!(!router.navigate("/user/2"));

        router.navigate("/home");
        assert_eq!(model.get("userActive"), Some(json!(false)));
        assert!(router.back());
        assert_eq!(router.current_path(), "/user/2");
        assert_eq!(model.get("userActive"), Some(json!(true)));
    }

    #[test]
    fn test_release_drops_owner_entries() {
        let mut router = BasicRouter::new();
        let kept = Model::detached(json!({"on": false}));
        let gone = Model::detached(json!({"on": false}));
        router.register_active(ModuleId(1), "/a", &kept, "on");
        router.register_active(ModuleId(2), "/a", &gone, "on");

        router.release(ModuleId(2));
        assert_eq!(router.active_count(), 1);

        router.navigate("/a");
        assert_eq!(kept.get("on"), Some(json!(true)));
        assert_eq!(gone.get("on"), Some(json!(false)));
    }
}
