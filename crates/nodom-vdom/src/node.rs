//! Origin tree nodes
//!
//! A [`VirtualDom`] is either an element (`tag_name` set) or a text node.
//! Only one of `children` and `text_content`/`expressions` is meaningful.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::Value;

use crate::arena::GenIndex;

static NEXT_KEY: AtomicU32 = AtomicU32::new(1);

/// Fresh key, unique across every tree of the process
pub fn next_key() -> String {
    NEXT_KEY.fetch_add(1, Ordering::Relaxed).to_string()
}

/// Handle of a compiled expression in its template's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub GenIndex);

/// Handle of an event descriptor in its template's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub GenIndex);

/// Literal text or expression, as found between `{{ }}` spans
#[derive(Debug, Clone, PartialEq)]
pub enum TextPart {
    Literal(String),
    Expr(ExprId),
}

/// Attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Static(String),
    /// Re-evaluated every pass. A single expression part keeps its raw value.
    Dynamic(Vec<TextPart>),
}

impl PropValue {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, PropValue::Dynamic(_))
    }
}

/// Directive value
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveValue {
    Static(String),
    Expr(ExprId),
}

/// Directive instance attached to one node
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    /// Copied from the directive type; lower runs first
    pub priority: u32,
    pub value: DirectiveValue,
    /// Conditional chain this directive belongs to (if/elseif/else/endif)
    pub group: Option<u32>,
}

impl Directive {
    pub fn new(name: impl Into<String>, priority: u32, value: DirectiveValue) -> Self {
        Self {
            name: name.into(),
            priority,
            value,
            group: None,
        }
    }

    /// Static text of the value (empty for expression values)
    pub fn static_value(&self) -> &str {
        match &self.value {
            DirectiveValue::Static(s) => s,
            DirectiveValue::Expr(_) => "",
        }
    }
}

/// What an event does when fired
#[derive(Debug, Clone, PartialEq)]
pub enum EventHandler {
    /// Call a method of the owning module
    Method(String),
    /// Write the host control's value back into the model (`x-field`)
    FieldSync { field: String },
    /// Navigate to the node's `path` prop (`x-route`)
    Navigate,
}

/// Event binding (`e-click="save:nopopo:once"`)
#[derive(Debug, Clone, PartialEq)]
pub struct EventDescriptor {
    pub name: String,
    pub handler: EventHandler,
    /// Listener sits on the parent host node
    pub delegate: bool,
    pub stop_propagation: bool,
    pub once: bool,
    pub capture: bool,
}

impl EventDescriptor {
    pub fn new(name: impl Into<String>, handler: EventHandler) -> Self {
        Self {
            name: name.into(),
            handler,
            delegate: false,
            stop_propagation: false,
            once: false,
            capture: false,
        }
    }

    /// Parse `method:mod:mod`; modifiers are `delg`, `nopopo`, `once`, `capture`
    pub fn parse(name: &str, spec: &str, separator: char) -> Self {
        let mut parts = spec.split(separator).map(str::trim);
        let method = parts.next().unwrap_or_default().to_string();
        let mut event = Self::new(name, EventHandler::Method(method));
        for modifier in parts {
            match modifier {
                "delg" => event.delegate = true,
                "nopopo" => event.stop_propagation = true,
                "once" => event.once = true,
                "capture" => event.capture = true,
                "" => {}
                other => tracing::warn!("Unknown event modifier '{}' on '{}'", other, name),
            }
        }
        event
    }
}

/// Origin tree node
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualDom {
    pub key: String,
    pub tag_name: Option<String>,
    pub props: BTreeMap<String, PropValue>,
    /// Host object properties, never serialised as attributes
    pub assets: BTreeMap<String, Value>,
    /// Priority sorted
    pub directives: Vec<Directive>,
    pub events: BTreeMap<String, Vec<EventId>>,
    pub children: Vec<VirtualDom>,
    pub text_content: Option<String>,
    pub expressions: Option<Vec<TextPart>>,
    /// Passes left that must re-diff this node (0 frozen, negative always)
    pub static_num: Cell<i32>,
}

impl VirtualDom {
    /// New element with a fresh key
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            key: next_key(),
            tag_name: Some(tag.into()),
            props: BTreeMap::new(),
            assets: BTreeMap::new(),
            directives: Vec::new(),
            events: BTreeMap::new(),
            children: Vec::new(),
            text_content: None,
            expressions: None,
            static_num: Cell::new(1),
        }
    }

    /// New text node with a fresh key
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            tag_name: None,
            text_content: Some(content.into()),
            ..Self::element("")
        }
    }

    pub fn is_text(&self) -> bool {
        self.tag_name.is_none()
    }

    pub fn tag(&self) -> &str {
        self.tag_name.as_deref().unwrap_or("")
    }

    pub fn has_directive(&self, name: &str) -> bool {
        self.directives.iter().any(|d| d.name == name)
    }

    pub fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives.iter().find(|d| d.name == name)
    }

    pub fn add_directive(&mut self, directive: Directive) {
        self.directives.push(directive);
    }

    /// Sort directives by priority (stable, so declaration order breaks ties)
    pub fn sort_directives(&mut self) {
        self.directives.sort_by_key(|d| d.priority);
    }

    pub fn remove_directive(&mut self, name: &str) {
        self.directives.retain(|d| d.name != name);
    }

    pub fn add_event(&mut self, name: impl Into<String>, id: EventId) {
        self.events.entry(name.into()).or_default().push(id);
    }

    /// Static prop text
    pub fn static_prop(&self, name: &str) -> Option<&str> {
        match self.props.get(name)? {
            PropValue::Static(s) => Some(s),
            PropValue::Dynamic(_) => None,
        }
    }

    pub fn set_prop(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.props
            .insert(name.into(), PropValue::Static(value.into()));
    }

    pub fn has_dynamic_props(&self) -> bool {
        self.props.values().any(PropValue::is_dynamic)
    }

    /// Deep clone with fresh keys for this node and every descendant
    pub fn clone_with_new_keys(&self) -> Self {
        let mut copy = self.clone();
        copy.rekey();
        copy
    }

    fn rekey(&mut self) {
        self.key = next_key();
        for child in &mut self.children {
            child.rekey();
        }
    }

    /// Number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(VirtualDom::node_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_unique() {
        let a = VirtualDom::element("div");
        let b = VirtualDom::element("div");
        assert_ne!(a.key, b.key);
    }

    #[test]
    fn test_text_node() {
        let t = VirtualDom::text("hi");
        assert!(t.is_text());
        assert_eq!(t.text_content.as_deref(), Some("hi"));
    }

    #[test]
    fn test_directives_sorted_by_priority() {
        let mut node = VirtualDom::element("div");
        node.add_directive(Directive::new("field", 10, DirectiveValue::Static("x".into())));
        node.add_directive(Directive::new("repeat", 2, DirectiveValue::Static("rows".into())));
        node.add_directive(Directive::new("model", 1, DirectiveValue::Static("m".into())));
        node.sort_directives();

        let names: Vec<_> = node.directives.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["model", "repeat", "field"]);
    }

    #[test]
    fn test_event_modifiers() {
        let e = EventDescriptor::parse("click", "save:nopopo:once", ':');
        assert_eq!(e.handler, EventHandler::Method("save".into()));
        assert!(e.stop_propagation && e.once);
        assert!(!e.delegate && !e.capture);
    }

    #[test]
    fn test_clone_with_new_keys() {
        let mut node = VirtualDom::element("ul");
        node.children.push(VirtualDom::element("li"));
        let copy = node.clone_with_new_keys();
        assert_ne!(copy.key, node.key);
        assert_ne!(copy.children[0].key, node.children[0].key);
    }
}
