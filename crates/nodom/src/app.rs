//! Application
//!
//! Owns every live module, the registries, the host DOM and the
//! collaborators. Rendering a module:
//! 1. resolve its container host node
//! 2. compile its template if the source changed
//! 3. compute a fresh render tree (guarded against self-marking)
//! 4. first render materialises it; later renders diff and patch
//! 5. render the sub-modules the pass embedded
//!
//! Model writes only mark modules dirty. [`App::render`] flushes the modules
//! queued at the time of the call; anything marked during the flush waits for
//! the next one.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use nodom_model::{DirtyQueue, Model};
use nodom_vdom::{compare, CompiledTemplate, ModuleId, VirtualDom};
use serde_json::Value;

use crate::compiler::{compile, CompileCtx, CompileEnv, ElementRegistry};
use crate::config::Config;
use crate::css::{CssManager, ScopedCss, SCOPE_ATTRIBUTE};
use crate::directive::{DirectiveRegistry, DirectiveType};
use crate::error::{CompileError, NodomError};
use crate::host::{HostDom, HostNodeId};
use crate::loader::{MemoryLoader, ResourceLoader, TemplateCache};
use crate::module::{Module, ModuleClass, ModuleState, TemplateSource};
use crate::render::{patch, Frame, RenderPass};
use crate::router::{BasicRouter, Router};
use crate::scheduler::Scheduler;

/// What a container hands to its sub-module on every parent pass
#[derive(Debug, Clone)]
pub struct ChildBinding {
    /// Render key of the container node
    pub container_key: String,
    pub props: BTreeMap<String, Value>,
    /// `$`-prefixed props, written into the child model
    pub data: Vec<(String, Value)>,
    /// Container model when the child shares it
    pub shared: Option<Model>,
}

/// Application
pub struct App {
    pub(crate) config: Config,
    pub(crate) modules: HashMap<ModuleId, Module>,
    classes: HashMap<String, Rc<dyn ModuleClass>>,
    pub(crate) directives: DirectiveRegistry,
    elements: ElementRegistry,
    pub(crate) host: Box<dyn HostDom>,
    /// Host node -> (module whose tree holds it, render key)
    pub(crate) host_index: HashMap<HostNodeId, (ModuleId, String)>,
    queue: DirtyQueue,
    pub(crate) router: Box<dyn Router>,
    /// Modules whose template holds a router view
    pub(crate) router_views: HashSet<ModuleId>,
    css: Box<dyn CssManager>,
    loader: Box<dyn ResourceLoader>,
    template_cache: TemplateCache,
    scheduler: Scheduler,
    main: Option<ModuleId>,
    next_module: u32,
}

impl App {
    pub fn new(host: impl HostDom + 'static) -> Self {
        Self {
            config: Config::default(),
            modules: HashMap::new(),
            classes: HashMap::new(),
            directives: DirectiveRegistry::new(),
            elements: ElementRegistry::new(),
            host: Box::new(host),
            host_index: HashMap::new(),
            queue: DirtyQueue::new(),
            router: Box::new(BasicRouter::new()),
            router_views: HashSet::new(),
            css: Box::new(ScopedCss::new()),
            loader: Box::new(MemoryLoader::new()),
            template_cache: TemplateCache::new(),
            scheduler: Scheduler::new(),
            main: None,
            next_module: 0,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_router(mut self, router: impl Router + 'static) -> Self {
        self.router = Box::new(router);
        self
    }

    pub fn with_css(mut self, css: impl CssManager + 'static) -> Self {
        self.css = Box::new(css);
        self
    }

    pub fn with_loader(mut self, loader: impl ResourceLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    /// Register a module class under the tag name templates use for it
    pub fn register_class(&mut self, name: &str, class: impl ModuleClass + 'static) {
        self.classes.insert(name.to_string(), Rc::new(class));
    }

    pub fn register_directive(&mut self, ty: DirectiveType) {
        self.directives.register(ty);
    }

    /// Register a custom element transform
    pub fn register_element(
        &mut self,
        tag: &str,
        transform: impl Fn(&mut VirtualDom, &mut CompileCtx<'_>) -> Result<(), CompileError> + 'static,
    ) {
        self.elements.register(tag, transform);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn host(&self) -> &dyn HostDom {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> &mut dyn HostDom {
        self.host.as_mut()
    }

    /// Concrete host, e.g. `app.host_as::<MemoryHost>()`
    pub fn host_as<T: 'static>(&self) -> Option<&T> {
        self.host.as_any().downcast_ref::<T>()
    }

    pub fn router(&self) -> &dyn Router {
        self.router.as_ref()
    }

    pub fn css(&self) -> &dyn CssManager {
        self.css.as_ref()
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn template_cache(&self) -> &TemplateCache {
        &self.template_cache
    }

    pub fn queue(&self) -> &DirtyQueue {
        &self.queue
    }

    pub fn main(&self) -> Option<ModuleId> {
        self.main
    }

    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(&id)
    }

    pub fn model(&self, id: ModuleId) -> Option<Model> {
        self.modules.get(&id).map(|m| m.model.clone())
    }

    /// First live module of a class, lowest id first
    pub fn find_module(&self, class_name: &str) -> Option<ModuleId> {
        self.modules
            .values()
            .filter(|m| m.class_name == class_name)
            .map(|m| m.id)
            .min()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Fetch a JSON resource through the loader
    pub fn load_data(&mut self, url: &str) -> Result<Value, NodomError> {
        let resource = self.loader.load(url)?;
        Ok(resource.json(url)?)
    }

    /// Make an instance of `class_name` the main module, rendered into
    /// `container`. A previous main module is destroyed.
    pub fn mount(&mut self, class_name: &str, container: HostNodeId) -> Result<ModuleId, NodomError> {
        if let Some(old) = self.main.take() {
            self.destroy(old);
        }
        let id = self.create_module(class_name, None)?;
        if let Some(m) = self.modules.get_mut(&id) {
            m.container = Some(container);
        }
        self.main = Some(id);
        tracing::info!("Mounted '{}' as main module {}", class_name, id);
        self.render_module(id)?;
        Ok(id)
    }

    /// Instantiate and initialise a module
    pub fn create_module(&mut self, class_name: &str, parent: Option<ModuleId>) -> Result<ModuleId, NodomError> {
        let class = self
            .classes
            .get(class_name)
            .cloned()
            .ok_or_else(|| NodomError::UnknownModuleClass(class_name.to_string()))?;

        self.next_module += 1;
        let id = ModuleId(self.next_module);
        let model = Model::new(class.data(), self.queue.clone());
        let mut module = Module::new(id, class_name, class, model);
        module.parent = parent;
        module.init();
        self.modules.insert(id, module);

        if let Some(p) = parent.and_then(|p| self.modules.get_mut(&p)) {
            p.children.push(id);
        }
        Ok(id)
    }

    /// Flush the dirty queue. Every queued module renders once; the first
    /// error is returned after the rest have rendered.
    pub fn render(&mut self) -> Result<(), NodomError> {
        let dirty = self.queue.drain();
        if dirty.is_empty() {
            return Ok(());
        }
        tracing::debug!("Flushing {} dirty modules", dirty.len());

        let mut first_error = None;
        for id in dirty {
            if !self.modules.contains_key(&id) {
                continue;
            }
            if let Err(e) = self.render_module(id) {
                tracing::warn!("Render of module {} failed: {}", id, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Flush until nothing is dirty, bounded by `max_render_passes`
    pub fn settle(&mut self) -> Result<(), NodomError> {
        for _ in 0..self.config.max_render_passes {
            if self.queue.is_empty() {
                return Ok(());
            }
            self.render()?;
        }
        if !self.queue.is_empty() {
            tracing::warn!("Still {} dirty modules after {} passes", self.queue.len(), self.config.max_render_passes);
        }
        Ok(())
    }

    /// One scheduler tick: periodic tasks, then a flush
    pub fn tick(&mut self) -> Result<(), NodomError> {
        self.scheduler.run();
        self.render()
    }

    /// Render one module now (and the sub-modules it embeds)
    pub fn render_module(&mut self, id: ModuleId) -> Result<(), NodomError> {
        let mut done = HashSet::new();
        self.render_inner(id, &mut done)
    }

    fn render_inner(&mut self, id: ModuleId, done: &mut HashSet<ModuleId>) -> Result<(), NodomError> {
        if !done.insert(id) {
            return Ok(());
        }
        if !self.modules.contains_key(&id) {
            return Err(NodomError::ModuleNotFound(id));
        }

        let container = self.resolve_container(id).ok_or(NodomError::NoContainer(id))?;
        let previous = self.modules.get(&id).and_then(|m| m.container);
        if previous.is_some_and(|p| p != container) {
            tracing::debug!("Module {} moved from {:?} to {}", id, previous, container);
            self.release_host(id);
        }
        if let Some(m) = self.modules.get_mut(&id) {
            m.container = Some(container);
        }

        self.ensure_template(id)?;

        self.queue.remove(id);
        self.queue.guard(id);
        let result = self.render_pass(id, container);
        self.queue.unguard(id);
        let used = result?;

        self.sync_children(id, &used, done)
    }

    /// Compute, then commit. Returns the sub-modules the pass embedded.
    fn render_pass(&mut self, id: ModuleId, container: HostNodeId) -> Result<Vec<ModuleId>, NodomError> {
        let Some(m) = self.modules.get(&id) else {
            return Err(NodomError::ModuleNotFound(id));
        };
        let class = m.class.clone();
        let class_name = m.class_name.clone();
        let model = m.model.clone();
        let first = m.render_tree.is_none();
        let Some(template) = m.template.clone() else {
            return Err(NodomError::ModuleNotFound(id));
        };

        class.on_before_render(&model);

        let frame = Frame {
            template: template.clone(),
            owner: id,
        };
        let mut pass = RenderPass::new(self, id, first);
        let tree = pass.render_root(&frame, &model)?;
        let used = pass.into_children_used();

        let Some(mut tree) = tree else {
            tracing::debug!("Module {} root suppressed", id);
            self.release_host(id);
            return Ok(used);
        };
        if template.styles.iter().any(|s| s.scoped) {
            tree.set_prop(SCOPE_ATTRIBUTE, class_name.as_str());
        }

        let old = self.modules.get_mut(&id).and_then(|m| m.render_tree.take());
        match &old {
            None => {
                patch::render_to_html(self, id, &tree, container, None);
            }
            Some(old) => {
                let changes = compare(&tree, old);
                patch::apply(self, id, container, &changes);
            }
        }

        if let Some(m) = self.modules.get_mut(&id) {
            m.render_tree = Some(tree);
            m.state = ModuleState::Rendered;
            m.props_changed = false;
        }
        if first {
            class.on_first_render(&model);
        }
        class.on_render(&model);
        if first {
            class.on_mount(&model);
        }
        Ok(used)
    }

    /// Unactivate sub-modules the pass no longer embeds, render the ones
    /// that need it
    fn sync_children(&mut self, id: ModuleId, used: &[ModuleId], done: &mut HashSet<ModuleId>) -> Result<(), NodomError> {
        let children = self.modules.get(&id).map(|m| m.children.clone()).unwrap_or_default();
        for child in children {
            if !used.contains(&child) {
                self.unactive(child);
            }
        }

        for &child in used {
            let Some(m) = self.modules.get(&child) else {
                continue;
            };
            // slot content is re-captured on every parent pass
            let stale = m.render_tree.is_none()
                || m.props_changed
                || !m.slots.is_empty()
                || self.queue.contains(child)
                || self.resolve_container(child) != m.container;
            if stale {
                self.render_inner(child, done)?;
            }
        }
        Ok(())
    }

    /// Host node a module renders into: its own for the main module, the
    /// container node of the parent's tree otherwise
    fn resolve_container(&self, id: ModuleId) -> Option<HostNodeId> {
        let m = self.modules.get(&id)?;
        match m.parent {
            None => m.container,
            Some(parent) => {
                let key = m.container_key.as_ref()?;
                self.modules.get(&parent)?.host_node(key)
            }
        }
    }

    /// Compile the module template when its source changed
    fn ensure_template(&mut self, id: ModuleId) -> Result<(), NodomError> {
        let Some(m) = self.modules.get(&id) else {
            return Err(NodomError::ModuleNotFound(id));
        };
        let source = m.class.template(&m.props);
        let marker = match &source {
            TemplateSource::Text(text) => text.clone(),
            TemplateSource::Url(url) => format!("url:{url}"),
        };
        if m.template.is_some() && m.template_text.as_deref() == Some(marker.as_str()) {
            return Ok(());
        }
        let class_name = m.class_name.clone();

        let template = match source {
            TemplateSource::Text(text) => Rc::new(self.compile_text(&text)?),
            TemplateSource::Url(url) => {
                let cached = match self.template_cache.get(&url) {
                    Some(t) => t,
                    None => {
                        let resource = self.loader.load(&url)?;
                        let compiled = Rc::new(self.compile_text(&resource.content)?);
                        self.template_cache.insert(&url, compiled.clone());
                        compiled
                    }
                };
                // static budgets are per instance
                Rc::new(CompiledTemplate::clone(&cached))
            }
        };

        if !template.styles.is_empty() {
            self.css.add_styles(id, &class_name, &template.styles);
        }
        if let Some(m) = self.modules.get_mut(&id) {
            m.template = Some(template);
            m.template_text = Some(marker);
            m.clear_template_caches();
        }
        tracing::debug!("Module {} ({}) compiled", id, class_name);
        Ok(())
    }

    fn compile_text(&self, text: &str) -> Result<CompiledTemplate, NodomError> {
        let classes = &self.classes;
        let is_module_class = |tag: &str| classes.contains_key(tag);
        let env = CompileEnv {
            config: &self.config,
            directives: &self.directives,
            elements: &self.elements,
            is_module_class: &is_module_class,
        };
        Ok(compile(text, &env)?)
    }

    /// Sub-module of `parent` for the container with render key `key`,
    /// created on first use. `None` when the class is unknown.
    pub(crate) fn attach_child(
        &mut self,
        parent: ModuleId,
        key: &str,
        class_name: &str,
    ) -> Result<Option<ModuleId>, NodomError> {
        let existing = self
            .modules
            .get(&parent)
            .and_then(|p| p.child_map.get(key).copied());
        if let Some(child) = existing {
            let same_class = self
                .modules
                .get(&child)
                .is_some_and(|c| c.class_name == class_name);
            if same_class {
                return Ok(Some(child));
            }
            self.destroy(child);
        }

        if !self.classes.contains_key(class_name) {
            return Ok(None);
        }
        let child = self.create_module(class_name, Some(parent))?;
        if let Some(p) = self.modules.get_mut(&parent) {
            p.child_map.insert(key.to_string(), child);
        }
        tracing::debug!("Module {} embeds '{}' as {}", parent, class_name, child);
        Ok(Some(child))
    }

    pub(crate) fn configure_child(&mut self, child: ModuleId, binding: ChildBinding) -> Result<(), NodomError> {
        let m = self
            .modules
            .get_mut(&child)
            .ok_or(NodomError::ModuleNotFound(child))?;
        m.set_props(binding.props);
        m.container_key = Some(binding.container_key);
        m.slots.clear();

        if let Some(shared) = binding.shared
            && !m.model.ptr_eq(&shared)
        {
            m.model.unbind_owner(child);
            shared.bind_owner(child);
            m.model = shared;
            m.props_changed = true;
        }

        let model = m.model.clone();
        for (field, value) in binding.data {
            model.set(&field, value)?;
        }
        Ok(())
    }

    /// Take a module out of the host tree. Its model, template and
    /// sub-modules stay; the next render is a first render.
    pub fn unactive(&mut self, id: ModuleId) {
        let Some(m) = self.modules.get(&id) else {
            return;
        };
        if m.render_tree.is_none() {
            return;
        }
        let children = m.children.clone();
        for child in children {
            self.unactive(child);
        }

        self.release_host(id);
        if let Some(m) = self.modules.get_mut(&id) {
            if m.parent.is_some() {
                m.container = None;
            }
            m.state = ModuleState::Initialized;
            m.class.clone().on_unmount(&m.model);
        }
        tracing::debug!("Module {} unactivated", id);
    }

    /// Detach the module's host subtree and forget its host nodes
    fn release_host(&mut self, id: ModuleId) {
        let Some(m) = self.modules.get_mut(&id) else {
            return;
        };
        let root = m.root_host();
        m.render_tree = None;
        let nodes: Vec<HostNodeId> = m.host_nodes.drain().map(|(_, h)| h).collect();
        for node in nodes {
            self.host_index.remove(&node);
        }
        if let Some(root) = root {
            self.host.remove(root);
        }
    }

    /// Unactivate and drop a module and its whole subtree
    pub fn destroy(&mut self, id: ModuleId) {
        self.unactive(id);
        let Some(m) = self.modules.remove(&id) else {
            return;
        };
        for child in &m.children {
            self.destroy(*child);
        }

        m.model.unbind_owner(id);
        self.queue.remove(id);
        self.router_views.remove(&id);
        self.router.release(id);
        self.css.remove_module(id);
        if let Some(p) = m.parent.and_then(|p| self.modules.get_mut(&p)) {
            p.children.retain(|c| *c != id);
            p.child_map.retain(|_, c| *c != id);
        }
        if self.main == Some(id) {
            self.main = None;
        }
        tracing::info!("Module {} ({}) destroyed", id, m.class_name);
    }

    /// Navigate the router and re-render the router views
    pub fn navigate(&mut self, path: &str) -> Result<bool, NodomError> {
        if !self.router.navigate(path) {
            return Ok(false);
        }
        for view in &self.router_views {
            self.queue.mark(*view);
        }
        self.render()?;
        Ok(true)
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("modules", &self.modules.len())
            .field("main", &self.main)
            .field("dirty", &self.queue.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use crate::module::FnModule;
    use serde_json::json;

    fn app_with(template: &str, data: Value) -> (App, HostNodeId) {
        let mut host = MemoryHost::new();
        let root = host.create_container("div", "app");
        let mut app = App::new(host);
        app.register_class("main", FnModule::new(template).with_data(data));
        (app, root)
    }

    fn html(app: &App, node: HostNodeId) -> String {
        app.host_as::<MemoryHost>()
            .map(|h| h.inner_html(node))
            .unwrap_or_default()
    }

    #[test]
    fn test_mount_renders_main() {
        let (mut app, root) = app_with("<p>{{name}}</p>", json!({"name": "x"}));
        let id = app.mount("main", root).unwrap();
        assert_eq!(app.main(), Some(id));
        assert_eq!(html(&app, root), "<p>x</p>");
        assert_eq!(app.module(id).map(|m| m.state), Some(ModuleState::Rendered));
    }

    #[test]
    fn test_unknown_class() {
        let (mut app, root) = app_with("<p></p>", json!({}));
        assert!(matches!(
            app.mount("nope", root),
            Err(NodomError::UnknownModuleClass(_))
        ));
    }

    #[test]
    fn test_render_flushes_only_dirty() {
        let (mut app, root) = app_with("<p>{{n}}</p>", json!({"n": 1}));
        let id = app.mount("main", root).unwrap();
        assert!(app.queue().is_empty());

        app.model(id).unwrap().set("n", json!(2)).unwrap();
        assert!(app.queue().contains(id));
        app.render().unwrap();
        assert!(app.queue().is_empty());
        assert_eq!(html(&app, root), "<p>2</p>");
    }

    #[test]
    fn test_remount_destroys_previous_main() {
        let (mut app, root) = app_with("<p>a</p>", json!({}));
        let first = app.mount("main", root).unwrap();
        let second = app.mount("main", root).unwrap();
        assert!(app.module(first).is_none());
        assert_eq!(app.module_count(), 1);
        assert_eq!(html(&app, root), "<p>a</p>");
        assert_ne!(first, second);
    }

    #[test]
    fn test_compile_error_reaches_caller() {
        let (mut app, root) = app_with("<div><p></div>", json!({}));
        assert!(matches!(app.mount("main", root), Err(NodomError::Compile(_))));
    }

    #[test]
    fn test_url_template_cached_once() {
        let mut host = MemoryHost::new();
        let root = host.create_container("div", "app");
        let loader = MemoryLoader::new().with_template("/t.html", "<span>{{v}}</span>");
        let mut app = App::new(host).with_loader(loader);
        app.register_class(
            "main",
            FnModule::new(TemplateSource::Url("/t.html".into())).with_data(json!({"v": 7})),
        );
        app.mount("main", root).unwrap();
        assert_eq!(html(&app, root), "<span>7</span>");
        assert_eq!(app.template_cache().len(), 1);
    }
}
