//! Nodom VDom - Origin trees, render trees and diff
//!
//! - [`VirtualDom`]: the compiled origin tree (directives, expressions, events)
//! - [`CompiledTemplate`]: origin tree plus its expression/event arenas
//! - [`RenderDom`]: the fully evaluated per-pass tree
//! - [`diff`]: keyed reconciliation of two render trees

pub mod arena;
pub mod diff;
mod node;
mod render;
mod template;

pub use arena::{GenArena, GenIndex};
pub use diff::{compare, Change, ChangeKind, DiffStats, Differ};
pub use node::{
    next_key, Directive, DirectiveValue, EventDescriptor, EventHandler, EventId, ExprId,
    PropValue, TextPart, VirtualDom,
};
pub use render::{BoundEvent, RenderDom};
pub use template::{CompiledTemplate, StyleBlock};

/// Module identity (modules are the owners of models)
pub use nodom_model::OwnerId as ModuleId;
