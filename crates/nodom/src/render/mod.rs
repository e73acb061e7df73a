//! Renderer
//!
//! Compute phase of a module render: walks the origin tree against the
//! model and builds a fresh [`RenderDom`]. Nothing touches the host here;
//! [`patch`] commits the result.
//!
//! Per element:
//! 1. a leading `model` directive runs first and alone
//! 2. props are evaluated, events bound, the remaining directives run in
//!    priority order (`false` drops the node)
//! 3. children render against the node's (possibly switched) model
//!
//! Keys of nodes rendered more than once from the same origin node (repeat
//! clones, slot content, recursion) get a dedup suffix.

pub(crate) mod patch;

use std::fmt;
use std::rc::Rc;

use nodom_expr::{to_display, MethodHost, Scope};
use nodom_model::{Model, ModelId};
use nodom_vdom::{
    BoundEvent, CompiledTemplate, DirectiveValue, ExprId, ModuleId, PropValue, RenderDom, TextPart, VirtualDom,
};
use serde_json::Value;

use crate::app::App;
use crate::config::Config;
use crate::directive::DirectiveCtx;
use crate::error::NodomError;
use crate::module::{MethodCtx, ModuleClass};

/// Template plus the module whose methods its expressions and events use
#[derive(Clone)]
pub struct Frame {
    pub template: Rc<CompiledTemplate>,
    pub owner: ModuleId,
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("owner", &self.owner)
            .field("nodes", &self.template.node_count())
            .finish()
    }
}

/// Open conditional chain among siblings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chain {
    pub group: u32,
    /// A member of the chain already rendered
    pub satisfied: bool,
}

/// Rendered children of one parent
#[derive(Debug, Default)]
pub struct Siblings {
    pub nodes: Vec<RenderDom>,
    pub chain: Option<Chain>,
}

/// Module methods exposed to expressions
struct ModuleMethods<'m> {
    module: ModuleId,
    class: &'m dyn ModuleClass,
    module_model: &'m Model,
}

impl MethodHost for ModuleMethods<'_> {
    fn invoke(&self, name: &str, args: &[Value], model: &Model) -> Option<Value> {
        let ctx = MethodCtx {
            module: self.module,
            model,
            module_model: self.module_model,
            args,
            event: None,
        };
        self.class.call(name, &ctx)
    }
}

/// One render of one module
pub struct RenderPass<'a> {
    pub(crate) app: &'a mut App,
    module: ModuleId,
    first_render: bool,
    children_used: Vec<ModuleId>,
    /// Recursion producers being rendered, innermost last
    recursion: Vec<(String, ModelId)>,
}

impl<'a> RenderPass<'a> {
    pub(crate) fn new(app: &'a mut App, module: ModuleId, first_render: bool) -> Self {
        Self {
            app,
            module,
            first_render,
            children_used: Vec::new(),
            recursion: Vec::new(),
        }
    }

    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn is_first_render(&self) -> bool {
        self.first_render
    }

    pub fn config(&self) -> &Config {
        self.app.config()
    }

    pub fn app(&mut self) -> &mut App {
        self.app
    }

    /// Record a sub-module embedded by this pass
    pub(crate) fn use_child(&mut self, child: ModuleId) {
        if !self.children_used.contains(&child) {
            self.children_used.push(child);
        }
    }

    pub(crate) fn into_children_used(self) -> Vec<ModuleId> {
        self.children_used
    }

    /// Whether producer `name` is already rendering against `model`
    pub(crate) fn is_recursing(&self, name: &str, model: &Model) -> bool {
        let id = model.id();
        self.recursion.iter().any(|(n, m)| n == name && *m == id)
    }

    pub(crate) fn enter_recursion(&mut self, name: &str, model: &Model) {
        self.recursion.push((name.to_string(), model.id()));
    }

    pub(crate) fn leave_recursion(&mut self) {
        self.recursion.pop();
    }

    /// Render the root of `frame`; `None` when a directive dropped it
    pub fn render_root(&mut self, frame: &Frame, model: &Model) -> Result<Option<RenderDom>, NodomError> {
        let mut out = Siblings::default();
        self.render_dom(frame, &frame.template.root, model, None, None, &mut out)?;
        if out.nodes.len() > 1 {
            tracing::warn!("Module {} root rendered {} times, keeping the first", self.module, out.nodes.len());
        }
        Ok(out.nodes.into_iter().next())
    }

    /// Render `children` under one parent
    pub fn render_children(
        &mut self,
        frame: &Frame,
        children: &[VirtualDom],
        model: &Model,
        parent_module: Option<ModuleId>,
        dedup: Option<&str>,
    ) -> Result<Vec<RenderDom>, NodomError> {
        let mut out = Siblings::default();
        for child in children {
            self.render_dom(frame, child, model, parent_module, dedup, &mut out)?;
        }
        Ok(out.nodes)
    }

    /// Render one origin node into `out` (zero, one or many render nodes)
    pub fn render_dom(
        &mut self,
        frame: &Frame,
        src: &VirtualDom,
        model: &Model,
        parent_module: Option<ModuleId>,
        dedup: Option<&str>,
        out: &mut Siblings,
    ) -> Result<(), NodomError> {
        let key = match dedup {
            Some(d) => format!("{}_{}", src.key, d),
            None => src.key.clone(),
        };

        if src.is_text() {
            let text = match &src.expressions {
                Some(parts) => to_display(&self.eval_parts(frame, parts, model)),
                None => src.text_content.clone().unwrap_or_default(),
            };
            let mut node = RenderDom::text(key, text, frame.owner);
            node.static_num = src.static_num.get();
            self.spend_budget(src);
            out.nodes.push(node);
            return Ok(());
        }

        let mut dst = RenderDom::element(key, src.tag(), frame.owner);
        dst.static_num = src.static_num.get();
        dst.assets = src.assets.clone();
        dst.model = Some(model.clone());
        self.render_element_from(frame, src, dst, 0, parent_module, dedup, out)
    }

    /// Continue rendering element `dst` from directive `start`. Repeat
    /// clones re-enter here just past the repeat directive.
    #[allow(clippy::too_many_arguments)]
    pub fn render_element_from(
        &mut self,
        frame: &Frame,
        src: &VirtualDom,
        mut dst: RenderDom,
        start: usize,
        parent_module: Option<ModuleId>,
        dedup: Option<&str>,
        out: &mut Siblings,
    ) -> Result<(), NodomError> {
        let mut start = start;
        if start == 0 && src.directives.first().is_some_and(|d| d.name == "model") {
            let (keep, _) = self.run_directive(frame, src, 0, &mut dst, parent_module, dedup, out)?;
            if !keep {
                return Ok(());
            }
            start = 1;
        }

        let model = dst
            .model
            .clone()
            .unwrap_or_else(|| Model::detached(Value::Null));
        for (name, prop) in &src.props {
            let value = match prop {
                PropValue::Static(s) => Value::String(s.clone()),
                PropValue::Dynamic(parts) => self.eval_parts(frame, parts, &model),
            };
            dst.props.insert(name.clone(), value);
        }
        for ids in src.events.values() {
            for id in ids {
                if let Some(descriptor) = frame.template.event(*id) {
                    dst.events.push(BoundEvent {
                        id: *id,
                        descriptor: descriptor.clone(),
                    });
                }
            }
        }

        let mut children_handled = false;
        for index in start..src.directives.len() {
            let (keep, handled) =
                self.run_directive(frame, src, index, &mut dst, parent_module, dedup, out)?;
            if !keep {
                return Ok(());
            }
            children_handled |= handled;
        }

        if !children_handled {
            let model = dst
                .model
                .clone()
                .unwrap_or_else(|| Model::detached(Value::Null));
            dst.children = self.render_children(frame, &src.children, &model, dst.module_id, dedup)?;
        }
        self.spend_budget(src);
        out.nodes.push(dst);
        Ok(())
    }

    /// Returns (keep node, children rendered by the handler)
    #[allow(clippy::too_many_arguments)]
    fn run_directive(
        &mut self,
        frame: &Frame,
        src: &VirtualDom,
        index: usize,
        dst: &mut RenderDom,
        parent_module: Option<ModuleId>,
        dedup: Option<&str>,
        out: &mut Siblings,
    ) -> Result<(bool, bool), NodomError> {
        let directive = &src.directives[index];
        let Some(handle) = self.app.directives.get(&directive.name).map(|t| t.handle.clone()) else {
            tracing::warn!("Directive '{}' is not registered", directive.name);
            return Ok((true, false));
        };

        let value = match &directive.value {
            DirectiveValue::Static(s) => Value::String(s.clone()),
            DirectiveValue::Expr(id) => {
                let model = dst
                    .model
                    .clone()
                    .unwrap_or_else(|| Model::detached(Value::Null));
                self.eval(frame, *id, &model)
            }
        };

        let mut ctx = DirectiveCtx {
            pass: self,
            frame,
            src,
            directive,
            index,
            value,
            dst,
            out,
            parent_module,
            dedup,
            children_handled: false,
        };
        let keep = handle(&mut ctx)?;
        Ok((keep, ctx.children_handled))
    }

    /// Evaluate an expression of `frame` against `model`, with the owning
    /// module's methods and its root model as fallback
    pub fn eval(&self, frame: &Frame, id: ExprId, model: &Model) -> Value {
        let Some(expr) = frame.template.expression(id) else {
            return Value::Null;
        };
        let Some(owner) = self.app.modules.get(&frame.owner) else {
            return expr.eval(&Scope::new(model));
        };
        let methods = ModuleMethods {
            module: owner.id,
            class: owner.class.as_ref(),
            module_model: &owner.model,
        };
        let mut scope = Scope::new(model).with_methods(&methods);
        if !model.ptr_eq(&owner.model) {
            scope = scope.with_fallback(&owner.model);
        }
        expr.eval(&scope)
    }

    /// A lone expression keeps its raw value, anything else concatenates
    fn eval_parts(&self, frame: &Frame, parts: &[TextPart], model: &Model) -> Value {
        if let [TextPart::Expr(id)] = parts {
            return self.eval(frame, *id, model);
        }
        let text = parts
            .iter()
            .map(|part| match part {
                TextPart::Literal(s) => s.clone(),
                TextPart::Expr(id) => to_display(&self.eval(frame, *id, model)),
            })
            .collect::<String>();
        Value::String(text)
    }

    /// Static nodes count down their re-diff budget on every later pass
    fn spend_budget(&self, src: &VirtualDom) {
        if self.first_render {
            return;
        }
        let n = src.static_num.get();
        if n > 0 {
            src.static_num.set(n - 1);
        }
    }
}
