//! Integration tests for nodom-expr
//!
//! Evaluation against models, module method calls and failure handling.

use nodom_expr::{ExprError, Expression, MethodHost, Scope};
use nodom_model::Model;
use serde_json::{json, Value};

struct Methods;

impl MethodHost for Methods {
    fn invoke(&self, name: &str, args: &[Value], model: &Model) -> Option<Value> {
        match name {
            "foo" => Some(json!(5)),
            "add" => {
                let sum: i64 = args.iter().filter_map(Value::as_i64).sum();
                Some(json!(sum))
            }
            "label" => Some(json!(format!("#{}", model.get("id")?))),
            _ => None,
        }
    }
}

fn eval(src: &str, data: Value) -> Value {
    let model = Model::detached(data);
    Expression::new(src).eval(&Scope::new(&model))
}

// ============================================================================
// MODEL RESOLUTION
// ============================================================================

#[test]
fn test_member_arithmetic() {
    assert_eq!(eval("a.b + 1", json!({"a": {"b": 2}})), json!(3));
}

#[test]
fn test_missing_field_is_null() {
    assert_eq!(eval("missing", json!({})), Value::Null);
    assert_eq!(eval("missing.deep", json!({})), Value::Null);
    assert_eq!(eval("missing?.deep", json!({})), Value::Null);
}

#[test]
fn test_index_and_length() {
    let data = json!({"rows": [{"x": 1}, {"x": 2}], "i": 1});
    assert_eq!(eval("rows[i].x", data.clone()), json!(2));
    assert_eq!(eval("rows.length", data.clone()), json!(2));
    assert_eq!(eval("rows[0]['x'] * 10", data), json!(10));
}

#[test]
fn test_string_concatenation_and_template() {
    let data = json!({"first": "Ada", "n": 3});
    assert_eq!(eval("first + ' ' + n", data.clone()), json!("Ada 3"));
    assert_eq!(eval("`${first} has ${n * 2} items`", data), json!("Ada has 6 items"));
}

#[test]
fn test_string_literal_is_not_rewritten() {
    assert_eq!(eval("'a.b + c'", json!({"a": {"b": 1}, "c": 2})), json!("a.b + c"));
}

#[test]
fn test_logical_and_conditional() {
    let data = json!({"on": false, "name": "", "fallback": "anon"});
    assert_eq!(eval("on ? 'yes' : 'no'", data.clone()), json!("no"));
    assert_eq!(eval("name || fallback", data.clone()), json!("anon"));
    assert_eq!(eval("name ?? fallback", data.clone()), json!(""));
    assert_eq!(eval("!on && 1", data), json!(1));
}

#[test]
fn test_comparisons_and_equality() {
    let data = json!({"a": 2, "s": "2"});
    assert_eq!(eval("a == s", data.clone()), json!(true));
    assert_eq!(eval("a === s", data.clone()), json!(false));
    assert_eq!(eval("a >= 2 && a < 3", data.clone()), json!(true));
    assert_eq!(eval("'b' > 'a'", data), json!(true));
}

#[test]
fn test_builtin_methods() {
    let data = json!({"name": "  ada ", "tags": ["x", "y"], "price": 2.5});
    assert_eq!(eval("name.trim().toUpperCase()", data.clone()), json!("ADA"));
    assert_eq!(eval("tags.join('|')", data.clone()), json!("x|y"));
    assert_eq!(eval("price.toFixed(2)", data.clone()), json!("2.50"));
    assert_eq!(eval("tags.includes('y')", data), json!(true));
}

#[test]
fn test_nested_model_scope() {
    let root = Model::detached(json!({"rows": [{"x": 7}]}));
    let row = root.get_model("rows.0").unwrap();
    assert_eq!(Expression::new("x").eval(&Scope::new(&row)), json!(7));
}

// ============================================================================
// MODULE METHODS
// ============================================================================

#[test]
fn test_bare_call_invokes_module_method() {
    let model = Model::detached(json!({}));
    let scope = Scope::new(&model).with_methods(&Methods);
    assert_eq!(Expression::new("foo()").eval(&scope), json!(5));
    assert_eq!(Expression::new("add(1, 2, 3) + 1").eval(&scope), json!(7));
}

#[test]
fn test_method_receives_bound_model() {
    let model = Model::detached(json!({"id": 42}));
    let scope = Scope::new(&model).with_methods(&Methods);
    assert_eq!(Expression::new("label()").eval(&scope), json!("#42"));
}

#[test]
fn test_model_field_is_not_callable() {
    let model = Model::detached(json!({"foo": 1}));
    let scope = Scope::new(&model).with_methods(&Methods);
    let expr = Expression::new("foo()");
    assert_eq!(expr.try_eval(&scope), Err(ExprError::NotAMethod("foo".into())));
    assert_eq!(expr.eval(&scope), Value::Null);
}

#[test]
fn test_unknown_method_degrades_to_null() {
    let model = Model::detached(json!({}));
    let scope = Scope::new(&model).with_methods(&Methods);
    assert_eq!(Expression::new("nope()").eval(&scope), Value::Null);
    assert!(matches!(
        Expression::new("nope()").try_eval(&Scope::new(&model)),
        Err(ExprError::NoMethodHost(_))
    ));
}

// ============================================================================
// FALLBACK
// ============================================================================

#[test]
fn test_direct_fields_fall_back_to_module_model() {
    let module = Model::detached(json!({"title": "T", "user": {"name": "u"}}));
    let item = Model::detached(json!({"x": 1}));
    let scope = Scope::new(&item).with_fallback(&module);

    assert_eq!(Expression::new("title").eval(&scope), json!("T"));
    assert_eq!(Expression::new("x").eval(&scope), json!(1));
    // dotted access does not use the fallback
    assert_eq!(Expression::new("user.name").eval(&scope), Value::Null);
}

#[test]
fn test_compile_errors_are_reported() {
    assert!(matches!(
        Expression::try_compile("a ="),
        Err(ExprError::Syntax { .. })
    ));
    assert!(Expression::try_compile("{a: 1, b: [1, 2]}").is_ok());
}
