//! Nodom Expr - Template expressions
//!
//! Compiles the `{{ ... }}` expression subset into a reusable evaluator bound
//! to a [`Model`] at call time.
//!
//! # Resolution
//! - bare identifiers read fields of the bound model
//! - `name(...)` calls a method of the owning module through [`MethodHost`]
//! - `value.method(...)` calls a built-in (`trim`, `join`, `toFixed`, ...)
//! - string/template literal contents and object-literal keys are never
//!   treated as identifiers
//!
//! # Failure policy
//! A malformed expression compiles to one that always yields `Null`, and
//! evaluation errors are swallowed into `Null` by [`Expression::eval`].
//! [`Expression::try_compile`] and [`Expression::try_eval`] expose the errors.

pub mod ast;
mod builtins;
mod eval;
mod lexer;
mod parser;
pub mod token;
pub mod value;

use std::fmt;

use nodom_model::Model;
use serde_json::Value;

pub use ast::Expr;
pub use parser::Parser;
pub use value::{to_display, truthy};

/// Expression error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    #[error("Syntax error at {position}: {message}")]
    Syntax { message: String, position: u32 },

    #[error("Unknown method '{0}'")]
    UnknownMethod(String),

    #[error("'{0}' is a model field, not a method")]
    NotAMethod(String),

    #[error("No method host bound for call to '{0}'")]
    NoMethodHost(String),

    #[error("Cannot read '{property}' of null")]
    NullAccess { property: String },

    #[error("Method '{method}' is not available on {kind}")]
    UnsupportedCall { method: String, kind: &'static str },
}

/// Module methods callable from templates
pub trait MethodHost {
    /// Invoke `name`; `None` when no such method exists
    fn invoke(&self, name: &str, args: &[Value], model: &Model) -> Option<Value>;
}

/// Evaluation environment
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    /// Model bare identifiers resolve against
    pub model: &'a Model,
    /// One-hop fallback for direct fields missing from `model`
    pub fallback: Option<&'a Model>,
    pub methods: Option<&'a dyn MethodHost>,
}

impl<'a> Scope<'a> {
    pub fn new(model: &'a Model) -> Self {
        Self {
            model,
            fallback: None,
            methods: None,
        }
    }

    pub fn with_fallback(mut self, fallback: &'a Model) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_methods(mut self, methods: &'a dyn MethodHost) -> Self {
        self.methods = Some(methods);
        self
    }
}

/// Compiled expression
#[derive(Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Option<Expr>,
    all_model_field: bool,
}

impl Expression {
    /// Compile, degrading to an always-`Null` expression on syntax errors
    pub fn new(source: &str) -> Self {
        match Self::try_compile(source) {
            Ok(expr) => expr,
            Err(e) => {
                tracing::warn!("Malformed expression '{}': {}", source, e);
                Self {
                    source: source.to_string(),
                    ast: None,
                    all_model_field: false,
                }
            }
        }
    }

    /// Compile, reporting syntax errors
    pub fn try_compile(source: &str) -> Result<Self, ExprError> {
        let ast = Parser::new(source).parse()?;
        let all_model_field = direct_fields_only(&ast);
        Ok(Self {
            source: source.to_string(),
            ast: Some(ast),
            all_model_field,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> Option<&Expr> {
        self.ast.as_ref()
    }

    /// Whether compilation succeeded
    pub fn is_valid(&self) -> bool {
        self.ast.is_some()
    }

    /// True when every free identifier is a direct (non-dotted) model field
    /// and no module method is called.
    pub fn all_model_field(&self) -> bool {
        self.all_model_field
    }

    /// Model path for pure field chains (`user.name`, `rows[0]`)
    pub fn as_path(&self) -> Option<String> {
        self.ast.as_ref().and_then(Expr::as_path)
    }

    /// Root field names referenced by the expression, in first-use order
    pub fn fields(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        if let Some(ast) = &self.ast {
            ast.walk(&mut |e| {
                if let Expr::Field(name) = e {
                    if !out.contains(name) {
                        out.push(name.clone());
                    }
                }
            });
        }
        out
    }

    /// Evaluate; any failure yields `Null`
    pub fn eval(&self, scope: &Scope<'_>) -> Value {
        match self.try_eval(scope) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!("Expression '{}' failed: {}", self.source, e);
                Value::Null
            }
        }
    }

    /// Evaluate, reporting failures
    pub fn try_eval(&self, scope: &Scope<'_>) -> Result<Value, ExprError> {
        let Some(ast) = &self.ast else {
            return Ok(Value::Null);
        };
        eval::Evaluator::new(scope, self.all_model_field).eval(ast)
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("source", &self.source)
            .field("all_model_field", &self.all_model_field)
            .finish()
    }
}

/// A field used as the object of a member access is dotted; method calls
/// are not fields at all.
fn direct_fields_only(ast: &Expr) -> bool {
    let mut direct = true;
    ast.walk(&mut |e| match e {
        Expr::MethodCall { .. } => direct = false,
        Expr::Member { object, .. } | Expr::Index { object, .. } | Expr::Call { object, .. } => {
            if matches!(object.as_ref(), Expr::Field(_)) {
                direct = false;
            }
        }
        _ => {}
    });
    direct
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_malformed_expression_yields_null() {
        let expr = Expression::new("a +");
        assert!(!expr.is_valid());
        let model = Model::detached(json!({"a": 1}));
        assert_eq!(expr.eval(&Scope::new(&model)), Value::Null);
    }

    #[test]
    fn test_all_model_field_flag() {
        assert!(Expression::new("a + b").all_model_field());
        assert!(Expression::new("'literal'").all_model_field());
        assert!(!Expression::new("a.b").all_model_field());
        assert!(!Expression::new("save()").all_model_field());
        assert!(!Expression::new("name.trim()").all_model_field());
    }

    #[test]
    fn test_fields() {
        let expr = Expression::new("a + b.c + a + `${d}` + {k: e}.k");
        assert_eq!(expr.fields(), vec!["a", "b", "d", "e"]);
    }
}
