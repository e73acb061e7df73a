//! Nodom Model - Reactive data
//!
//! Explicit change interception over a JSON data tree.
//!
//! Every module owns a [`Model`]. Reads go through `get(path)`, writes through
//! `set(path, value)`. A write that changes a value:
//! - flags every owner bound to the model's root as dirty in the [`DirtyQueue`]
//! - runs the watchers registered for exactly that path
//!
//! Nested objects and arrays are wrapped lazily and cached per path, so asking
//! for the same nested object twice yields the same wrapper.

mod model;
mod queue;
pub mod path;

pub use model::{Model, ModelId, WatcherId, WatchFn};
pub use queue::DirtyQueue;
pub use serde_json::Value;

/// Identifier of a model owner (a module)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(pub u32);

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Model error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("Empty model path")]
    EmptyPath,

    #[error("Cannot descend into non-container value at '{0}'")]
    NotContainer(String),

    #[error("Invalid array index '{0}'")]
    InvalidIndex(String),

    #[error("Array index {index} out of bounds (len {len})")]
    OutOfBounds { index: usize, len: usize },
}
