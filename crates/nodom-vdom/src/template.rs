//! Compiled Template
//!
//! The origin tree of a module together with the arenas owning its
//! expressions and event descriptors. A module holds one behind an `Rc` and
//! replaces it wholesale on recompile, which drops every handle of the old
//! generation.

use nodom_expr::Expression;

use crate::arena::GenArena;
use crate::node::{EventDescriptor, EventId, ExprId, VirtualDom};

/// `<style>` block found while compiling
#[derive(Debug, Clone, PartialEq)]
pub struct StyleBlock {
    pub css: String,
    /// `scope` attribute present: selectors get the module scope prefix
    pub scoped: bool,
}

/// Compiled template
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    pub root: VirtualDom,
    pub expressions: GenArena<Expression>,
    pub events: GenArena<EventDescriptor>,
    pub styles: Vec<StyleBlock>,
}

impl CompiledTemplate {
    pub fn new(root: VirtualDom) -> Self {
        Self {
            root,
            expressions: GenArena::new(),
            events: GenArena::new(),
            styles: Vec::new(),
        }
    }

    pub fn add_expression(&mut self, expr: Expression) -> ExprId {
        ExprId(self.expressions.insert(expr))
    }

    pub fn add_event(&mut self, event: EventDescriptor) -> EventId {
        EventId(self.events.insert(event))
    }

    pub fn expression(&self, id: ExprId) -> Option<&Expression> {
        self.expressions.get(id.0)
    }

    pub fn event(&self, id: EventId) -> Option<&EventDescriptor> {
        self.events.get(id.0)
    }

    /// Number of origin nodes
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }
}

impl Default for CompiledTemplate {
    fn default() -> Self {
        Self::new(VirtualDom::element("div"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::EventHandler;

    #[test]
    fn test_handles_resolve_in_own_template() {
        let mut template = CompiledTemplate::default();
        let e = template.add_expression(Expression::new("a + 1"));
        let ev = template.add_event(EventDescriptor::new("click", EventHandler::Navigate));

        assert_eq!(template.expression(e).map(Expression::source), Some("a + 1"));
        assert_eq!(template.event(ev).map(|d| d.name.as_str()), Some("click"));
        assert_eq!(template.node_count(), 1);
    }
}
