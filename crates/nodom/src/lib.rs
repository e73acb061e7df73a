//! Nodom - Module based UI framework
//!
//! Modules own a reactive [`Model`] and a template. Rendering is two-phase:
//! the template's origin tree is evaluated into a fresh render tree, then the
//! host DOM is patched from the diff against the previous render tree.
//!
//! ```ignore
//! let mut host = MemoryHost::new();
//! let root = host.create_container("div", "app");
//! let mut app = App::new(host);
//! app.register_class("main", FnModule::new("<p>{{msg}}</p>").with_data(json!({"msg": "hi"})));
//! app.mount("main", root)?;
//! ```

mod app;
pub mod compiler;
mod config;
pub mod css;
pub mod directive;
mod error;
mod event;
pub mod host;
pub mod loader;
mod module;
pub mod render;
pub mod router;
pub mod scheduler;

pub use app::{App, ChildBinding};
pub use compiler::{compile, CompileCtx, CompileEnv, ElementRegistry};
pub use config::{Config, SlotModel};
pub use css::{CssManager, ScopedCss};
pub use directive::{DirectiveCtx, DirectiveRegistry, DirectiveType, ValueKind};
pub use error::{CompileError, LoadError, NodomError};
pub use host::{HostDom, HostNodeId, MemoryHost};
pub use loader::{MemoryLoader, Resource, ResourceKind, ResourceLoader, TemplateCache};
pub use module::{
    DomEvent, FnModule, MethodCtx, Module, ModuleClass, ModuleState, SlotContent, TemplateSource,
};
pub use router::{BasicRouter, Router};
pub use scheduler::{Scheduler, TaskId};

pub use nodom_expr::Expression;
pub use nodom_model::{DirtyQueue, Model, ModelError};
pub use nodom_vdom::{CompiledTemplate, ModuleId, RenderDom, VirtualDom};
