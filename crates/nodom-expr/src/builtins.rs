//! Built-in properties and methods on values

use serde_json::Value;

use crate::value::{strict_equals, to_display, to_number, type_name};
use crate::ExprError;

/// Property read (`obj.key`, `list[0]`, `text.length`)
pub fn get_property(target: &Value, key: &str) -> Value {
    match target {
        Value::Object(map) => map.get(key).cloned().unwrap_or(Value::Null),
        Value::Array(items) => {
            if key == "length" {
                return Value::from(items.len());
            }
            key.parse::<usize>()
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(Value::Null)
        }
        Value::String(s) => {
            if key == "length" {
                return Value::from(s.chars().count());
            }
            key.parse::<usize>()
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::String(c.to_string()))
                .unwrap_or(Value::Null)
        }
        _ => Value::Null,
    }
}

/// Index key text for a computed member access
pub fn index_key(index: &Value) -> String {
    to_display(index)
}

fn arg_str(args: &[Value], i: usize) -> String {
    args.get(i).map(to_display).unwrap_or_default()
}

fn arg_int(args: &[Value], i: usize) -> Option<i64> {
    let n = to_number(args.get(i)?);
    (!n.is_nan()).then_some(n as i64)
}

/// Resolve JS-style relative `start`/`end` slice bounds
fn bounds(len: usize, start: Option<i64>, end: Option<i64>) -> (usize, usize) {
    let len_i = len as i64;
    let clamp = |v: i64| -> usize {
        let v = if v < 0 { (len_i + v).max(0) } else { v.min(len_i) };
        v as usize
    };
    let s = start.map(clamp).unwrap_or(0);
    let e = end.map(clamp).unwrap_or(len);
    (s, e.max(s))
}

/// Call a built-in method on a value
pub fn call_method(target: &Value, method: &str, args: &[Value]) -> Result<Value, ExprError> {
    let unsupported = || ExprError::UnsupportedCall {
        method: method.to_string(),
        kind: type_name(target),
    };

    if method == "toString" {
        return Ok(Value::String(to_display(target)));
    }

    match target {
        Value::String(s) => {
            let out = match method {
                "toUpperCase" => Value::String(s.to_uppercase()),
                "toLowerCase" => Value::String(s.to_lowercase()),
                "trim" => Value::String(s.trim().to_string()),
                "includes" => Value::Bool(s.contains(&arg_str(args, 0))),
                "startsWith" => Value::Bool(s.starts_with(&arg_str(args, 0))),
                "endsWith" => Value::Bool(s.ends_with(&arg_str(args, 0))),
                "indexOf" => {
                    let needle = arg_str(args, 0);
                    match s.find(&needle) {
                        Some(byte) => Value::from(s[..byte].chars().count()),
                        None => Value::from(-1),
                    }
                }
                "slice" | "substring" => {
                    let chars: Vec<char> = s.chars().collect();
                    let (start, end) = bounds(chars.len(), arg_int(args, 0), arg_int(args, 1));
                    Value::String(chars[start..end].iter().collect())
                }
                "split" => {
                    let sep = arg_str(args, 0);
                    let parts: Vec<Value> = if sep.is_empty() {
                        s.chars().map(|c| Value::String(c.to_string())).collect()
                    } else {
                        s.split(sep.as_str()).map(|p| Value::String(p.to_string())).collect()
                    };
                    Value::Array(parts)
                }
                _ => return Err(unsupported()),
            };
            Ok(out)
        }
        Value::Array(items) => {
            let out = match method {
                "includes" => {
                    let needle = args.first().cloned().unwrap_or(Value::Null);
                    Value::Bool(items.iter().any(|v| strict_equals(v, &needle)))
                }
                "indexOf" => {
                    let needle = args.first().cloned().unwrap_or(Value::Null);
                    items
                        .iter()
                        .position(|v| strict_equals(v, &needle))
                        .map(Value::from)
                        .unwrap_or_else(|| Value::from(-1))
                }
                "join" => {
                    let sep = if args.is_empty() {
                        ",".to_string()
                    } else {
                        arg_str(args, 0)
                    };
                    Value::String(items.iter().map(to_display).collect::<Vec<_>>().join(&sep))
                }
                "slice" => {
                    let (start, end) = bounds(items.len(), arg_int(args, 0), arg_int(args, 1));
                    Value::Array(items[start..end].to_vec())
                }
                _ => return Err(unsupported()),
            };
            Ok(out)
        }
        Value::Number(_) => match method {
            "toFixed" => {
                let digits = arg_int(args, 0).unwrap_or(0).clamp(0, 20) as usize;
                Ok(Value::String(format!("{:.*}", digits, to_number(target))))
            }
            _ => Err(unsupported()),
        },
        _ => Err(unsupported()),
    }
}

/// Result of `typeof` applied to a value
pub fn type_of(v: &Value) -> Value {
    Value::String(type_name(v).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_length_property() {
        assert_eq!(get_property(&json!([1, 2, 3]), "length"), json!(3));
        assert_eq!(get_property(&json!("héllo"), "length"), json!(5));
        assert_eq!(get_property(&json!({"length": 9}), "length"), json!(9));
    }

    #[test]
    fn test_string_methods() {
        let s = json!(" Hello ");
        assert_eq!(call_method(&s, "trim", &[]).unwrap(), json!("Hello"));
        assert_eq!(call_method(&json!("abc"), "slice", &[json!(-2)]).unwrap(), json!("bc"));
        assert_eq!(call_method(&json!("a,b"), "split", &[json!(",")]).unwrap(), json!(["a", "b"]));
    }

    #[test]
    fn test_array_methods() {
        let list = json!([1, 2, 3]);
        assert_eq!(call_method(&list, "join", &[json!("-")]).unwrap(), json!("1-2-3"));
        assert_eq!(call_method(&list, "indexOf", &[json!(3)]).unwrap(), json!(2));
        assert_eq!(call_method(&list, "includes", &[json!(5)]).unwrap(), json!(false));
    }

    #[test]
    fn test_to_fixed() {
        assert_eq!(call_method(&json!(1.005), "toFixed", &[json!(1)]).unwrap(), json!("1.0"));
    }

    #[test]
    fn test_unsupported_method() {
        assert!(call_method(&json!(true), "trim", &[]).is_err());
    }
}
