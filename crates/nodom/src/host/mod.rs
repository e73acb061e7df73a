//! Host DOM contract
//!
//! The narrow set of node operations the renderer and patcher need. The host
//! never reports layout; it only stores nodes, attributes, properties and
//! listener registrations.

mod memory;
mod serializer;

use std::any::Any;

use serde_json::Value;

pub use memory::{MemoryHost, MutationStats};
pub use serializer::{HtmlSerializer, RAW_TEXT_ELEMENTS, VOID_ELEMENTS};

/// Host node handle. The generation tells a reused slot from the node
/// that was removed from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostNodeId {
    pub index: u32,
    pub generation: u32,
}

impl std::fmt::Display for HostNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "h{}v{}", self.index, self.generation)
    }
}

/// Host DOM operations
pub trait HostDom {
    fn create_element(&mut self, tag: &str) -> HostNodeId;

    fn create_text(&mut self, text: &str) -> HostNodeId;

    fn set_attribute(&mut self, node: HostNodeId, name: &str, value: &str);

    fn remove_attribute(&mut self, node: HostNodeId, name: &str);

    /// Object property (`value`, `checked`), never serialised
    fn set_property(&mut self, node: HostNodeId, name: &str, value: &Value);

    fn property(&self, node: HostNodeId, name: &str) -> Option<Value>;

    fn set_text(&mut self, node: HostNodeId, text: &str);

    /// Insert `child` before `before`, or append when `before` is `None`.
    /// A child that already has a parent is moved.
    fn insert_before(&mut self, parent: HostNodeId, child: HostNodeId, before: Option<HostNodeId>);

    fn append_child(&mut self, parent: HostNodeId, child: HostNodeId) {
        self.insert_before(parent, child, None);
    }

    /// Detach a node from its parent
    fn remove(&mut self, node: HostNodeId);

    /// Put `new` where `old` is and detach `old`
    fn replace(&mut self, old: HostNodeId, new: HostNodeId);

    fn add_listener(&mut self, node: HostNodeId, event: &str, capture: bool);

    fn parent(&self, node: HostNodeId) -> Option<HostNodeId>;

    fn children(&self, node: HostNodeId) -> Vec<HostNodeId>;

    fn as_any(&self) -> &dyn Any;
}
