//! Directive execution context

use nodom_expr::{to_display, Expression};
use nodom_model::Model;
use nodom_vdom::{Directive, DirectiveValue, ModuleId, RenderDom, VirtualDom};
use serde_json::Value;

use crate::config::Config;
use crate::render::{Frame, RenderPass, Siblings};

/// What a directive handler sees while one node renders
pub struct DirectiveCtx<'p, 'a> {
    pub pass: &'p mut RenderPass<'a>,
    /// Template and owning module of `src`
    pub frame: &'p Frame,
    /// Origin node
    pub src: &'p VirtualDom,
    pub directive: &'p Directive,
    /// Position of `directive` in `src.directives`
    pub index: usize,
    /// Evaluated value (static text as a string)
    pub value: Value,
    /// Render node being built
    pub dst: &'p mut RenderDom,
    /// Siblings rendered so far under the same parent
    pub out: &'p mut Siblings,
    /// Sub-module whose container is the parent of this node
    pub parent_module: Option<ModuleId>,
    pub dedup: Option<&'p str>,
    /// Set when the handler rendered `dst.children` itself
    pub children_handled: bool,
}

impl DirectiveCtx<'_, '_> {
    /// Model of the node being rendered
    pub fn model(&self) -> Model {
        self.dst
            .model
            .clone()
            .unwrap_or_else(|| Model::detached(Value::Null))
    }

    pub fn value_text(&self) -> String {
        to_display(&self.value)
    }

    /// Model path named by the value: the static text, or the field chain
    /// of a plain path expression
    pub fn path(&self) -> Option<String> {
        match &self.directive.value {
            DirectiveValue::Static(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            DirectiveValue::Expr(id) => self
                .frame
                .template
                .expression(*id)
                .and_then(Expression::as_path),
        }
    }

    pub fn config(&self) -> &Config {
        self.pass.config()
    }

    /// Module whose template is rendering
    pub fn module(&self) -> ModuleId {
        self.pass.module()
    }
}
