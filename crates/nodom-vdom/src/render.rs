//! Render tree
//!
//! Fresh every pass. Props and assets hold evaluated values; diffing compares
//! two of these trees.

use std::collections::BTreeMap;

use nodom_expr::to_display;
use nodom_model::Model;
use serde_json::Value;

use crate::node::{EventDescriptor, EventId};
use crate::ModuleId;

/// Event binding carried by a render node
#[derive(Debug, Clone, PartialEq)]
pub struct BoundEvent {
    pub id: EventId,
    pub descriptor: EventDescriptor,
}

/// Render tree node
#[derive(Debug, Clone)]
pub struct RenderDom {
    pub key: String,
    pub tag_name: Option<String>,
    pub text_content: Option<String>,
    pub props: BTreeMap<String, Value>,
    pub assets: BTreeMap<String, Value>,
    pub events: Vec<BoundEvent>,
    pub children: Vec<RenderDom>,
    /// Model this node was rendered against
    pub model: Option<Model>,
    /// Copied from the origin node at render time
    pub static_num: i32,
    /// Set when this node is the container of a sub-module
    pub module_id: Option<ModuleId>,
    /// Module whose template (and methods) produced this node
    pub owner: ModuleId,
}

impl RenderDom {
    pub fn element(key: impl Into<String>, tag: impl Into<String>, owner: ModuleId) -> Self {
        Self {
            key: key.into(),
            tag_name: Some(tag.into()),
            text_content: None,
            props: BTreeMap::new(),
            assets: BTreeMap::new(),
            events: Vec::new(),
            children: Vec::new(),
            model: None,
            static_num: -1,
            module_id: None,
            owner,
        }
    }

    pub fn text(key: impl Into<String>, content: impl Into<String>, owner: ModuleId) -> Self {
        Self {
            tag_name: None,
            text_content: Some(content.into()),
            ..Self::element(key, "", owner)
        }
    }

    pub fn is_text(&self) -> bool {
        self.tag_name.is_none()
    }

    pub fn tag(&self) -> &str {
        self.tag_name.as_deref().unwrap_or("")
    }

    /// Prop rendered as attribute text
    pub fn prop_text(&self, name: &str) -> Option<String> {
        self.props.get(name).map(to_display)
    }

    pub fn set_prop(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.props.insert(name.into(), value.into());
    }

    /// Whether this node and `other` are the same kind of host node
    pub fn same_kind(&self, other: &RenderDom) -> bool {
        self.tag_name == other.tag_name && self.module_id == other.module_id
    }

    /// Depth-first search by key
    pub fn find(&self, key: &str) -> Option<&RenderDom> {
        if self.key == key {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(key))
    }

    pub fn find_mut(&mut self, key: &str) -> Option<&mut RenderDom> {
        if self.key == key {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(key))
    }

    /// Keys from this node down to `key` (inclusive), if present
    pub fn path_to(&self, key: &str) -> Option<Vec<&RenderDom>> {
        if self.key == key {
            return Some(vec![self]);
        }
        for child in &self.children {
            if let Some(mut path) = child.path_to(key) {
                path.insert(0, self);
                return Some(path);
            }
        }
        None
    }

    /// Concatenated text of this subtree
    pub fn text_of(&self) -> String {
        match &self.text_content {
            Some(t) => t.clone(),
            None => self.children.iter().map(RenderDom::text_of).collect(),
        }
    }

    /// Visit every node, parents first
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a RenderDom)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn owner() -> ModuleId {
        ModuleId(1)
    }

    #[test]
    fn test_prop_text() {
        let mut node = RenderDom::element("1", "div", owner());
        node.set_prop("count", json!(3));
        node.set_prop("title", "hi");
        assert_eq!(node.prop_text("count").as_deref(), Some("3"));
        assert_eq!(node.prop_text("title").as_deref(), Some("hi"));
    }

    #[test]
    fn test_path_to() {
        let mut root = RenderDom::element("r", "div", owner());
        let mut mid = RenderDom::element("m", "p", owner());
        mid.children.push(RenderDom::text("t", "x", owner()));
        root.children.push(mid);

        let keys: Vec<_> = root
            .path_to("t")
            .unwrap()
            .iter()
            .map(|n| n.key.as_str())
            .collect();
        assert_eq!(keys, vec!["r", "m", "t"]);
        assert_eq!(root.text_of(), "x");
    }
}
