//! Evaluator
//!
//! Tree-walking evaluation against a [`Scope`]. Errors are returned to
//! `Expression::try_eval`; `Expression::eval` turns them into `Null`.

use serde_json::{Map, Value};

use crate::ast::{BinaryOp, Expr, LogicalOp, TemplatePart, UnaryOp};
use crate::builtins::{call_method, get_property, index_key, type_of};
use crate::value::{loose_equals, number, strict_equals, to_display, to_number, truthy};
use crate::{ExprError, Scope};

pub(crate) struct Evaluator<'s, 'a> {
    scope: &'s Scope<'a>,
    /// Whether bare fields may fall back to the scope's fallback model
    use_fallback: bool,
}

impl<'s, 'a> Evaluator<'s, 'a> {
    pub(crate) fn new(scope: &'s Scope<'a>, use_fallback: bool) -> Self {
        Self {
            scope,
            use_fallback,
        }
    }

    pub(crate) fn eval(&self, expr: &Expr) -> Result<Value, ExprError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(t) => out.push_str(t),
                        TemplatePart::Expr(e) => out.push_str(&to_display(&self.eval(e)?)),
                    }
                }
                Ok(Value::String(out))
            }
            Expr::Field(name) => Ok(self.field(name)),
            Expr::Member {
                object,
                property,
                optional,
            } => {
                // Fast path: read nested model paths without cloning parents
                if let Some(path) = expr.as_path() {
                    if let Some(v) = self.scope.model.get(&path) {
                        return Ok(v);
                    }
                }
                let target = self.eval(object)?;
                self.member(&target, property, *optional)
            }
            Expr::Index {
                object,
                index,
                optional,
            } => {
                let target = self.eval(object)?;
                let key = index_key(&self.eval(index)?);
                self.member(&target, &key, *optional)
            }
            Expr::Call {
                object,
                method,
                args,
                optional,
            } => {
                let target = self.eval(object)?;
                if target.is_null() {
                    return if *optional {
                        Ok(Value::Null)
                    } else {
                        Err(ExprError::NullAccess {
                            property: method.clone(),
                        })
                    };
                }
                let args = self.eval_list(args)?;
                call_method(&target, method, &args)
            }
            Expr::MethodCall { name, args } => self.method_call(name, args),
            Expr::Unary { op, operand } => {
                let v = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!truthy(&v)),
                    UnaryOp::Minus => number(-to_number(&v)),
                    UnaryOp::Plus => number(to_number(&v)),
                    UnaryOp::Typeof => type_of(&v),
                })
            }
            Expr::Binary { op, left, right } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                Ok(binary(*op, &l, &r))
            }
            Expr::Logical { op, left, right } => {
                let l = self.eval(left)?;
                let short_circuit = match op {
                    LogicalOp::And => !truthy(&l),
                    LogicalOp::Or => truthy(&l),
                    LogicalOp::Nullish => !l.is_null(),
                };
                if short_circuit { Ok(l) } else { self.eval(right) }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if truthy(&self.eval(test)?) {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
            Expr::Array(items) => Ok(Value::Array(self.eval_list(items)?)),
            Expr::Object(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), self.eval(value)?);
                }
                Ok(Value::Object(map))
            }
        }
    }

    fn eval_list(&self, items: &[Expr]) -> Result<Vec<Value>, ExprError> {
        items.iter().map(|e| self.eval(e)).collect()
    }

    fn field(&self, name: &str) -> Value {
        if let Some(v) = self.scope.model.get(name) {
            return v;
        }
        if self.use_fallback {
            if let Some(v) = self.scope.fallback.and_then(|m| m.get(name)) {
                return v;
            }
        }
        Value::Null
    }

    fn member(&self, target: &Value, key: &str, optional: bool) -> Result<Value, ExprError> {
        if target.is_null() {
            return if optional {
                Ok(Value::Null)
            } else {
                Err(ExprError::NullAccess {
                    property: key.to_string(),
                })
            };
        }
        Ok(get_property(target, key))
    }

    fn method_call(&self, name: &str, args: &[Expr]) -> Result<Value, ExprError> {
        if self.scope.model.contains(name) {
            return Err(ExprError::NotAMethod(name.to_string()));
        }
        let host = self
            .scope
            .methods
            .ok_or_else(|| ExprError::NoMethodHost(name.to_string()))?;
        let args = self.eval_list(args)?;
        host.invoke(name, &args, self.scope.model)
            .ok_or_else(|| ExprError::UnknownMethod(name.to_string()))
    }
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            if l.is_string() || r.is_string() {
                Value::String(format!("{}{}", to_display(l), to_display(r)))
            } else {
                number(to_number(l) + to_number(r))
            }
        }
        BinaryOp::Sub => number(to_number(l) - to_number(r)),
        BinaryOp::Mul => number(to_number(l) * to_number(r)),
        BinaryOp::Div => number(to_number(l) / to_number(r)),
        BinaryOp::Mod => number(to_number(l) % to_number(r)),
        BinaryOp::Equal => Value::Bool(loose_equals(l, r)),
        BinaryOp::NotEqual => Value::Bool(!loose_equals(l, r)),
        BinaryOp::StrictEqual => Value::Bool(strict_equals(l, r)),
        BinaryOp::StrictNotEqual => Value::Bool(!strict_equals(l, r)),
        BinaryOp::LessThan
        | BinaryOp::LessThanEq
        | BinaryOp::GreaterThan
        | BinaryOp::GreaterThanEq => Value::Bool(compare(op, l, r)),
    }
}

fn compare(op: BinaryOp, l: &Value, r: &Value) -> bool {
    let ordering = match (l, r) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => to_number(l).partial_cmp(&to_number(r)),
    };
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        BinaryOp::LessThan => ordering.is_lt(),
        BinaryOp::LessThanEq => ordering.is_le(),
        BinaryOp::GreaterThan => ordering.is_gt(),
        _ => ordering.is_ge(),
    }
}
