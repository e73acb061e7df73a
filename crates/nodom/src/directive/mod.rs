//! Directive Engine
//!
//! A directive type is a name, a priority, how its attribute value is read,
//! an optional compile-time `init` and the `handle` run on every render of a
//! node carrying it. Lower priorities run first; `handle` returning `false`
//! drops the node from this pass only.

mod builtins;
mod ctx;

use std::collections::HashMap;
use std::rc::Rc;

use nodom_vdom::{Directive, VirtualDom};

use crate::compiler::CompileCtx;
use crate::error::{CompileError, NodomError};

pub use ctx::DirectiveCtx;

/// How an attribute value becomes a directive value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Required; plain text is compiled as an expression
    Expression,
    /// Required; plain text is taken literally
    Static,
    /// May be omitted; plain text is taken literally
    Optional,
}

/// Compile-time hook, may rewrite the node
pub type InitFn =
    Rc<dyn Fn(&mut VirtualDom, &Directive, &mut CompileCtx<'_>) -> Result<(), CompileError>>;

/// Render-time hook
pub type HandleFn = Rc<dyn Fn(&mut DirectiveCtx<'_, '_>) -> Result<bool, NodomError>>;

/// Directive type
#[derive(Clone)]
pub struct DirectiveType {
    pub name: String,
    pub priority: u32,
    pub value: ValueKind,
    pub init: Option<InitFn>,
    pub handle: HandleFn,
}

impl DirectiveType {
    pub fn new(
        name: &str,
        priority: u32,
        value: ValueKind,
        handle: impl Fn(&mut DirectiveCtx<'_, '_>) -> Result<bool, NodomError> + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            priority,
            value,
            init: None,
            handle: Rc::new(handle),
        }
    }

    pub fn with_init(
        mut self,
        init: impl Fn(&mut VirtualDom, &Directive, &mut CompileCtx<'_>) -> Result<(), CompileError>
            + 'static,
    ) -> Self {
        self.init = Some(Rc::new(init));
        self
    }
}

impl std::fmt::Debug for DirectiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectiveType")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("value", &self.value)
            .field("init", &self.init.is_some())
            .finish()
    }
}

/// Directive registry
#[derive(Debug, Clone)]
pub struct DirectiveRegistry {
    types: HashMap<String, DirectiveType>,
}

impl Default for DirectiveRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectiveRegistry {
    /// Registry with the built-in directives
    pub fn new() -> Self {
        let mut registry = Self::empty();
        builtins::register_all(&mut registry);
        registry
    }

    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// Register (or replace) a directive type
    pub fn register(&mut self, ty: DirectiveType) {
        tracing::debug!("Directive '{}' registered (priority {})", ty.name, ty.priority);
        self.types.insert(ty.name.clone(), ty);
    }

    pub fn get(&self, name: &str) -> Option<&DirectiveType> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn priority(&self, name: &str) -> Option<u32> {
        self.get(name).map(|ty| ty.priority)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
