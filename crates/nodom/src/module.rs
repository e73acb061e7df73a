//! Modules
//!
//! A [`ModuleClass`] is the user-written definition (template, initial data,
//! methods, lifecycle hooks). A [`Module`] is one live instance of a class:
//! its model, compiled template, last render tree and place in the module
//! tree.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use nodom_model::Model;
use nodom_vdom::{CompiledTemplate, EventId, ModuleId, RenderDom, VirtualDom};
use serde_json::{Map, Value};

use crate::host::HostNodeId;
use crate::render::Frame;

/// Where a module's template text comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Template text. Recompiled whenever it differs from the last compile.
    Text(String),
    /// Fetched through the resource loader and cached by URL
    Url(String),
}

impl From<&str> for TemplateSource {
    fn from(text: &str) -> Self {
        TemplateSource::Text(text.to_string())
    }
}

impl From<String> for TemplateSource {
    fn from(text: String) -> Self {
        TemplateSource::Text(text)
    }
}

/// Event being dispatched to a handler
#[derive(Debug, Clone, PartialEq)]
pub struct DomEvent {
    pub name: String,
    /// Host node the event was fired on
    pub target: HostNodeId,
    /// Render key of the node whose handler runs
    pub current_key: String,
    /// Free-form data supplied by the dispatcher
    pub payload: Value,
}

/// Arguments of a module method call
pub struct MethodCtx<'a> {
    pub module: ModuleId,
    /// Model in scope where the call was made (a repeat item, for example)
    pub model: &'a Model,
    /// Root model of the module
    pub module_model: &'a Model,
    pub args: &'a [Value],
    /// Set when the call comes from an event binding
    pub event: Option<&'a DomEvent>,
}

/// Module definition.
///
/// Implement this trait and register it with `App::register_class` under a
/// tag name; templates then embed instances with that tag.
pub trait ModuleClass {
    /// Template for an instance with the given props
    fn template(&self, props: &BTreeMap<String, Value>) -> TemplateSource;

    /// Initial model data of a new instance
    fn data(&self) -> Value {
        Value::Object(Map::new())
    }

    /// Run a method. Returns `None` when the class has no such method.
    fn call(&self, method: &str, ctx: &MethodCtx<'_>) -> Option<Value> {
        let _ = ctx;
        tracing::debug!("No method '{}'", method);
        None
    }

    fn on_init(&self, _model: &Model) {}

    fn on_before_render(&self, _model: &Model) {}

    fn on_first_render(&self, _model: &Model) {}

    fn on_render(&self, _model: &Model) {}

    fn on_mount(&self, _model: &Model) {}

    fn on_unmount(&self, _model: &Model) {}
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Uninitialized,
    Initialized,
    Rendered,
}

/// Content captured by a slot producer for a sub-module
#[derive(Debug, Clone)]
pub struct SlotContent {
    /// Template and owner the content was written in
    pub frame: Frame,
    /// Producer node; its children are the content
    pub node: VirtualDom,
    pub model: Model,
}

/// Live module instance
pub struct Module {
    pub id: ModuleId,
    pub class_name: String,
    pub class: Rc<dyn ModuleClass>,
    pub model: Model,
    pub props: BTreeMap<String, Value>,
    pub state: ModuleState,
    pub parent: Option<ModuleId>,
    pub children: Vec<ModuleId>,

    pub template: Option<Rc<CompiledTemplate>>,
    /// Text the current template was compiled from
    pub(crate) template_text: Option<String>,
    /// Baseline for the next diff
    pub render_tree: Option<RenderDom>,

    /// Host node the module root is rendered into
    pub container: Option<HostNodeId>,
    /// Render key of the container node in the parent's tree
    pub(crate) container_key: Option<String>,
    /// Render key -> host node
    pub(crate) host_nodes: HashMap<String, HostNodeId>,

    /// Slot name -> captured content, refilled by the parent every pass
    pub(crate) slots: HashMap<String, SlotContent>,
    /// Container render key -> sub-module created for it
    pub(crate) child_map: HashMap<String, ModuleId>,
    /// Recursion producers by name
    pub(crate) recurs: HashMap<String, VirtualDom>,
    /// `once` handlers already fired, by render key
    pub(crate) fired_once: HashSet<(String, EventId)>,
    /// Props changed since the last render
    pub(crate) props_changed: bool,
}

impl Module {
    pub(crate) fn new(id: ModuleId, class_name: &str, class: Rc<dyn ModuleClass>, model: Model) -> Self {
        Self {
            id,
            class_name: class_name.to_string(),
            class,
            model,
            props: BTreeMap::new(),
            state: ModuleState::Uninitialized,
            parent: None,
            children: Vec::new(),
            template: None,
            template_text: None,
            render_tree: None,
            container: None,
            container_key: None,
            host_nodes: HashMap::new(),
            slots: HashMap::new(),
            child_map: HashMap::new(),
            recurs: HashMap::new(),
            fired_once: HashSet::new(),
            props_changed: false,
        }
    }

    /// Bind the model and run `on_init`
    pub(crate) fn init(&mut self) {
        if self.state != ModuleState::Uninitialized {
            return;
        }
        self.model.bind_owner(self.id);
        self.state = ModuleState::Initialized;
        self.class.on_init(&self.model);
        tracing::debug!("Module {} ({}) initialized", self.id, self.class_name);
    }

    /// Host node of a render key
    pub fn host_node(&self, key: &str) -> Option<HostNodeId> {
        self.host_nodes.get(key).copied()
    }

    /// Host node of the module root
    pub fn root_host(&self) -> Option<HostNodeId> {
        let key = &self.render_tree.as_ref()?.key;
        self.host_node(key)
    }

    /// Update props, noting whether anything changed
    pub(crate) fn set_props(&mut self, props: BTreeMap<String, Value>) {
        if self.props != props {
            self.props = props;
            self.props_changed = true;
        }
    }

    /// Drop every cache derived from the compiled template
    pub(crate) fn clear_template_caches(&mut self) {
        self.recurs.clear();
        self.fired_once.clear();
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id)
            .field("class_name", &self.class_name)
            .field("state", &self.state)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("container", &self.container)
            .finish()
    }
}

/// Module class built from closures, handy for small modules and tests
pub struct FnModule {
    template: Box<dyn Fn(&BTreeMap<String, Value>) -> TemplateSource>,
    data: Value,
    methods: HashMap<String, Box<dyn Fn(&MethodCtx<'_>) -> Value>>,
}

impl FnModule {
    pub fn new(template: impl Into<TemplateSource>) -> Self {
        let source = template.into();
        Self {
            template: Box::new(move |_| source.clone()),
            data: Value::Object(Map::new()),
            methods: HashMap::new(),
        }
    }

    /// Template computed from props
    pub fn dynamic(template: impl Fn(&BTreeMap<String, Value>) -> TemplateSource + 'static) -> Self {
        Self {
            template: Box::new(template),
            data: Value::Object(Map::new()),
            methods: HashMap::new(),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_method(mut self, name: &str, method: impl Fn(&MethodCtx<'_>) -> Value + 'static) -> Self {
        self.methods.insert(name.to_string(), Box::new(method));
        self
    }
}

impl ModuleClass for FnModule {
    fn template(&self, props: &BTreeMap<String, Value>) -> TemplateSource {
        (self.template)(props)
    }

    fn data(&self) -> Value {
        self.data.clone()
    }

    fn call(&self, method: &str, ctx: &MethodCtx<'_>) -> Option<Value> {
        self.methods.get(method).map(|m| m(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fn_module_methods() {
        let class = FnModule::new("<div></div>").with_method("double", |ctx| {
            json!(ctx.args.first().and_then(Value::as_i64).unwrap_or(0) * 2)
        });
        let model = Model::detached(json!({}));
        let ctx = MethodCtx {
            module: ModuleId(1),
            model: &model,
            module_model: &model,
            args: &[json!(21)],
            event: None,
        };
        assert_eq!(class.call("double", &ctx), Some(json!(42)));
        assert_eq!(class.call("missing", &ctx), None);
    }

    #[test]
    fn test_init_binds_owner_once() {
        let model = Model::detached(json!({}));
        let mut module = Module::new(ModuleId(3), "m", Rc::new(FnModule::new("<p></p>")), model);
        module.init();
        module.init();
        assert_eq!(module.model.owners(), vec![ModuleId(3)]);
        assert_eq!(module.state, ModuleState::Initialized);
    }

    #[test]
    fn test_set_props_tracks_change() {
        let model = Model::detached(json!({}));
        let mut module = Module::new(ModuleId(4), "m", Rc::new(FnModule::new("<p></p>")), model);
        let mut props = BTreeMap::new();
        props.insert("title".to_string(), json!("a"));
        module.set_props(props.clone());
        assert!(module.props_changed);
        module.props_changed = false;
        module.set_props(props);
        assert!(!module.props_changed);
    }
}
