//! In-memory host DOM
//!
//! Arena-backed node tree implementing [`HostDom`]. Removing a node frees
//! its whole subtree; freed slots are reused with a bumped generation, so a
//! stale handle resolves to nothing. A document node is created up front and
//! insertions under it are counted as live mutations.

use std::any::Any;
use std::collections::BTreeMap;

use serde_json::Value;

use super::serializer::HtmlSerializer;
use super::{HostDom, HostNodeId};

/// Node payload
#[derive(Debug, Clone, PartialEq)]
pub enum HostNodeData {
    Element {
        tag: String,
        /// Insertion ordered
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct HostNode {
    parent: Option<HostNodeId>,
    children: Vec<HostNodeId>,
    data: HostNodeData,
    properties: BTreeMap<String, Value>,
    /// (event, capture)
    listeners: Vec<(String, bool)>,
}

/// Mutation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationStats {
    pub created: usize,
    /// Insertions whose parent is connected to the document
    pub live_insertions: usize,
    pub removals: usize,
    pub attribute_writes: usize,
    pub text_writes: usize,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<HostNode>,
}

/// In-memory host
#[derive(Debug, Clone)]
pub struct MemoryHost {
    slots: Vec<Slot>,
    free: Vec<u32>,
    document: HostNodeId,
    stats: MutationStats,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        let mut host = Self {
            slots: Vec::new(),
            free: Vec::new(),
            document: HostNodeId {
                index: 0,
                generation: 0,
            },
            stats: MutationStats::default(),
        };
        host.document = host.alloc(HostNodeData::Element {
            tag: "body".into(),
            attrs: Vec::new(),
        });
        host.stats = MutationStats::default();
        host
    }

    /// Document body
    pub fn document(&self) -> HostNodeId {
        self.document
    }

    /// New element appended to the document, for use as a mount target
    pub fn create_container(&mut self, tag: &str, id: &str) -> HostNodeId {
        let node = self.create_element(tag);
        self.set_attribute(node, "id", id);
        let document = self.document;
        self.append_child(document, node);
        self.stats = MutationStats::default();
        node
    }

    /// Nodes currently allocated, the document included
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn stats(&self) -> MutationStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = MutationStats::default();
    }

    pub fn data(&self, node: HostNodeId) -> Option<&HostNodeData> {
        self.get(node).map(|n| &n.data)
    }

    pub fn child_ids(&self, node: HostNodeId) -> &[HostNodeId] {
        self.get(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn tag(&self, node: HostNodeId) -> Option<&str> {
        match self.data(node)? {
            HostNodeData::Element { tag, .. } => Some(tag),
            HostNodeData::Text(_) => None,
        }
    }

    pub fn attribute(&self, node: HostNodeId, name: &str) -> Option<&str> {
        match self.data(node)? {
            HostNodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            HostNodeData::Text(_) => None,
        }
    }

    pub fn listeners(&self, node: HostNodeId) -> &[(String, bool)] {
        self.get(node).map(|n| n.listeners.as_slice()).unwrap_or(&[])
    }

    /// Concatenated text of a subtree
    pub fn text_content(&self, node: HostNodeId) -> String {
        match self.data(node) {
            Some(HostNodeData::Text(t)) => t.clone(),
            Some(HostNodeData::Element { .. }) => self
                .child_ids(node)
                .iter()
                .map(|c| self.text_content(*c))
                .collect(),
            None => String::new(),
        }
    }

    /// First element below `node` (depth first) with the given tag
    pub fn find_by_tag(&self, node: HostNodeId, tag: &str) -> Option<HostNodeId> {
        self.find(node, &|host, id| host.tag(id) == Some(tag))
    }

    /// First element below `node` (depth first) with attribute `name="value"`
    pub fn find_by_attribute(&self, node: HostNodeId, name: &str, value: &str) -> Option<HostNodeId> {
        self.find(node, &|host, id| host.attribute(id, name) == Some(value))
    }

    fn find(&self, node: HostNodeId, pred: &dyn Fn(&Self, HostNodeId) -> bool) -> Option<HostNodeId> {
        if pred(self, node) {
            return Some(node);
        }
        self.child_ids(node)
            .iter()
            .find_map(|c| self.find(*c, pred))
    }

    /// Whether the node is attached under the document
    pub fn is_connected(&self, node: HostNodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.document {
                return true;
            }
            current = self.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// outerHTML
    pub fn to_html(&self, node: HostNodeId) -> String {
        HtmlSerializer::new().serialize_outer(self, node)
    }

    /// innerHTML
    pub fn inner_html(&self, node: HostNodeId) -> String {
        HtmlSerializer::new().serialize_inner(self, node)
    }

    fn alloc(&mut self, data: HostNodeData) -> HostNodeId {
        let node = HostNode {
            parent: None,
            children: Vec::new(),
            data,
            properties: BTreeMap::new(),
            listeners: Vec::new(),
        };
        self.stats.created += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation += 1;
            slot.node = Some(node);
            return HostNodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        HostNodeId { index, generation: 0 }
    }

    fn get(&self, node: HostNodeId) -> Option<&HostNode> {
        let slot = self.slots.get(node.index as usize)?;
        if slot.generation != node.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn get_mut(&mut self, node: HostNodeId) -> Option<&mut HostNode> {
        let slot = self.slots.get_mut(node.index as usize)?;
        if slot.generation != node.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Release `node` and its descendants
    fn free_subtree(&mut self, node: HostNodeId) {
        let mut pending = vec![node];
        while let Some(id) = pending.pop() {
            let Some(slot) = self.slots.get_mut(id.index as usize) else {
                continue;
            };
            if slot.generation != id.generation {
                continue;
            }
            if let Some(n) = slot.node.take() {
                pending.extend(n.children);
                self.free.push(id.index);
            }
        }
    }

    fn detach(&mut self, node: HostNodeId) {
        let Some(parent) = self.get(node).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|c| *c != node);
        }
        if let Some(n) = self.get_mut(node) {
            n.parent = None;
        }
    }
}

impl HostDom for MemoryHost {
    fn create_element(&mut self, tag: &str) -> HostNodeId {
        self.alloc(HostNodeData::Element {
            tag: tag.to_string(),
            attrs: Vec::new(),
        })
    }

    fn create_text(&mut self, text: &str) -> HostNodeId {
        self.alloc(HostNodeData::Text(text.to_string()))
    }

    fn set_attribute(&mut self, node: HostNodeId, name: &str, value: &str) {
        if let Some(HostNode {
            data: HostNodeData::Element { attrs, .. },
            ..
        }) = self.get_mut(node)
        {
            match attrs.iter_mut().find(|(n, _)| n == name) {
                Some(slot) => slot.1 = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
            self.stats.attribute_writes += 1;
        }
    }

    fn remove_attribute(&mut self, node: HostNodeId, name: &str) {
        if let Some(HostNode {
            data: HostNodeData::Element { attrs, .. },
            ..
        }) = self.get_mut(node)
        {
            attrs.retain(|(n, _)| n != name);
            self.stats.attribute_writes += 1;
        }
    }

    fn set_property(&mut self, node: HostNodeId, name: &str, value: &Value) {
        if let Some(n) = self.get_mut(node) {
            n.properties.insert(name.to_string(), value.clone());
        }
    }

    fn property(&self, node: HostNodeId, name: &str) -> Option<Value> {
        self.get(node)?.properties.get(name).cloned()
    }

    fn set_text(&mut self, node: HostNodeId, text: &str) {
        if let Some(HostNode {
            data: HostNodeData::Text(content),
            ..
        }) = self.get_mut(node)
        {
            *content = text.to_string();
            self.stats.text_writes += 1;
        }
    }

    fn insert_before(&mut self, parent: HostNodeId, child: HostNodeId, before: Option<HostNodeId>) {
        if parent == child || self.get(parent).is_none() || self.get(child).is_none() {
            tracing::warn!("Invalid insertion of {} into {}", child, parent);
            return;
        }
        self.detach(child);

        let Some(p) = self.get_mut(parent) else {
            return;
        };
        let index = before
            .and_then(|b| p.children.iter().position(|c| *c == b))
            .unwrap_or(p.children.len());
        p.children.insert(index, child);
        if let Some(c) = self.get_mut(child) {
            c.parent = Some(parent);
        }

        if self.is_connected(parent) {
            self.stats.live_insertions += 1;
        }
    }

    fn remove(&mut self, node: HostNodeId) {
        let Some(n) = self.get(node) else {
            return;
        };
        if node == self.document {
            return;
        }
        if n.parent.is_some() {
            self.detach(node);
            self.stats.removals += 1;
        }
        self.free_subtree(node);
    }

    fn replace(&mut self, old: HostNodeId, new: HostNodeId) {
        let Some(parent) = self.get(old).and_then(|n| n.parent) else {
            return;
        };
        self.insert_before(parent, new, Some(old));
        self.remove(old);
    }

    fn add_listener(&mut self, node: HostNodeId, event: &str, capture: bool) {
        if let Some(n) = self.get_mut(node) {
            let entry = (event.to_string(), capture);
            if !n.listeners.contains(&entry) {
                n.listeners.push(entry);
            }
        }
    }

    fn parent(&self, node: HostNodeId) -> Option<HostNodeId> {
        self.get(node)?.parent
    }

    fn children(&self, node: HostNodeId) -> Vec<HostNodeId> {
        self.child_ids(node).to_vec()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
