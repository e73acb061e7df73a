//! Error types

use nodom_model::ModelError;
use nodom_vdom::ModuleId;

/// Template compilation error. Compilation never yields a partial tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("Unclosed expression starting at {0}")]
    UnclosedExpression(usize),

    #[error("Unclosed comment starting at {0}")]
    UnclosedComment(usize),

    #[error("Malformed tag at {0}")]
    MalformedTag(usize),

    #[error("Unexpected closing tag </{found}> at {position}")]
    UnexpectedClose { found: String, position: usize },

    #[error("Mismatched closing tag at {position}: expected </{expected}>, found </{found}>")]
    MismatchedTag {
        expected: String,
        found: String,
        position: usize,
    },

    #[error("Unclosed tag <{0}>")]
    UnclosedTag(String),

    #[error("Template has no root element")]
    NoRoot,

    #[error("Template must have a single root element")]
    MultipleRoots,

    #[error("Text outside the root element at {0}")]
    TextOutsideRoot(usize),

    #[error("Unknown directive '{0}'")]
    UnknownDirective(String),

    #[error("Directive '{0}' requires a value")]
    MissingDirectiveValue(String),

    #[error("Event '{0}' has no handler")]
    EmptyEvent(String),

    #[error("'{0}' does not follow an if")]
    OrphanBranch(String),
}

/// Resource loading error. Not retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to load {url}: {message}")]
    Network { url: String, message: String },

    #[error("Failed to parse {url}: {message}")]
    Parse { url: String, message: String },
}

/// Framework error
#[derive(Debug, thiserror::Error)]
pub enum NodomError {
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Unknown module class '{0}'")]
    UnknownModuleClass(String),

    #[error("Module {0} not found")]
    ModuleNotFound(ModuleId),

    #[error("Module {0} has no container")]
    NoContainer(ModuleId),
}
