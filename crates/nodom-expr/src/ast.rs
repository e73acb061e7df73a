//! Abstract Syntax Tree
//!
//! Expression nodes. Bare identifiers are already classified by the parser:
//! a name followed by `(` is a module method call, any other name is a model
//! field.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
    Plus,
    Typeof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    LessThan,
    LessThanEq,
    GreaterThan,
    GreaterThanEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

/// Template literal part
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Expr(Expr),
}

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Template(Vec<TemplatePart>),
    /// Bare identifier, resolved against the bound model
    Field(String),
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        optional: bool,
    },
    /// Built-in method on a value (`name.toUpperCase()`)
    Call {
        object: Box<Expr>,
        method: String,
        args: Vec<Expr>,
        optional: bool,
    },
    /// Bare call (`foo(1)`), invokes a method of the owning module
    MethodCall { name: String, args: Vec<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
}

impl Expr {
    /// Visit this node and every sub-expression, parents first
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match self {
            Expr::Literal(_) | Expr::Field(_) => {}
            Expr::Template(parts) => {
                for part in parts {
                    if let TemplatePart::Expr(e) = part {
                        e.walk(f);
                    }
                }
            }
            Expr::Member { object, .. } => object.walk(f),
            Expr::Index { object, index, .. } => {
                object.walk(f);
                index.walk(f);
            }
            Expr::Call { object, args, .. } => {
                object.walk(f);
                for arg in args {
                    arg.walk(f);
                }
            }
            Expr::MethodCall { args, .. } | Expr::Array(args) => {
                for arg in args {
                    arg.walk(f);
                }
            }
            Expr::Unary { operand, .. } => operand.walk(f),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                test.walk(f);
                consequent.walk(f);
                alternate.walk(f);
            }
            Expr::Object(entries) => {
                for (_, value) in entries {
                    value.walk(f);
                }
            }
        }
    }

    /// Dotted model path for pure field/member/index chains (`rows.0.name`)
    pub fn as_path(&self) -> Option<String> {
        match self {
            Expr::Field(name) => Some(name.clone()),
            Expr::Member {
                object,
                property,
                optional: false,
            } => Some(format!("{}.{}", object.as_path()?, property)),
            Expr::Index {
                object,
                index,
                optional: false,
            } => {
                let seg = match index.as_ref() {
                    Expr::Literal(Value::String(s)) => s.clone(),
                    Expr::Literal(Value::Number(n)) => n.as_u64()?.to_string(),
                    _ => return None,
                };
                Some(format!("{}.{}", object.as_path()?, seg))
            }
            _ => None,
        }
    }
}
