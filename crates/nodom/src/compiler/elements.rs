//! Custom elements
//!
//! Tag name -> transform closure run on the freshly opened node. The
//! built-in elements turn into a container tag (`div`, or the `tag` prop)
//! carrying the matching directive, so `<for cond={{rows}}>` behaves like
//! `<div x-repeat={{rows}}>`.

use std::collections::HashMap;
use std::rc::Rc;

use nodom_vdom::{PropValue, VirtualDom};

use super::CompileCtx;
use crate::error::CompileError;

/// Element transform
pub type ElementTransform =
    Rc<dyn Fn(&mut VirtualDom, &mut CompileCtx<'_>) -> Result<(), CompileError>>;

/// Custom element registry
#[derive(Clone)]
pub struct ElementRegistry {
    transforms: HashMap<String, ElementTransform>,
}

impl Default for ElementRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementRegistry {
    /// Registry with the built-in elements
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_builtins();
        registry
    }

    pub fn empty() -> Self {
        Self {
            transforms: HashMap::new(),
        }
    }

    /// Register (or replace) a transform for `tag`
    pub fn register(
        &mut self,
        tag: &str,
        transform: impl Fn(&mut VirtualDom, &mut CompileCtx<'_>) -> Result<(), CompileError> + 'static,
    ) {
        self.transforms.insert(tag.to_string(), Rc::new(transform));
    }

    pub fn get(&self, tag: &str) -> Option<&ElementTransform> {
        self.transforms.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.transforms.contains_key(tag)
    }

    fn register_builtins(&mut self) {
        self.register("for", |node, ctx| to_directive(node, ctx, "repeat", Some("cond")));
        self.register("if", |node, ctx| to_directive(node, ctx, "if", Some("cond")));
        self.register("elseif", |node, ctx| to_directive(node, ctx, "elseif", Some("cond")));
        self.register("else", |node, ctx| to_directive(node, ctx, "else", None));
        self.register("endif", |node, ctx| to_directive(node, ctx, "endif", None));
        self.register("show", |node, ctx| to_directive(node, ctx, "show", Some("cond")));
        self.register("slot", |node, ctx| to_directive(node, ctx, "slot", Some("name")));
        self.register("route", |node, ctx| to_directive(node, ctx, "route", Some("path")));
        self.register("router", |node, ctx| to_directive(node, ctx, "router", None));
        self.register("module", |node, ctx| to_directive(node, ctx, "module", Some("name")));
        self.register("recur", |node, ctx| {
            // a consumer carries `ref` and no condition
            if node.props.contains_key("ref") {
                to_directive(node, ctx, "recur", None)
            } else {
                to_directive(node, ctx, "recur", Some("cond"))
            }
        });
    }
}

/// Rename the node to its container tag and attach `directive`, its value
/// taken from `value_prop`
fn to_directive(
    node: &mut VirtualDom,
    ctx: &mut CompileCtx<'_>,
    directive: &str,
    value_prop: Option<&str>,
) -> Result<(), CompileError> {
    let tag = match node.props.remove("tag") {
        Some(PropValue::Static(tag)) if !tag.is_empty() => tag,
        _ => ctx.config().container_tag.clone(),
    };
    node.tag_name = Some(tag);

    let prop = value_prop
        .and_then(|p| node.props.remove(p))
        .filter(|p| !matches!(p, PropValue::Static(s) if s.trim().is_empty()));
    match prop {
        Some(prop) => {
            let kind = ctx.value_kind(directive)?;
            let value = ctx.prop_to_value(kind, prop);
            ctx.attach_directive(node, directive, value)
        }
        None => ctx.add_directive(node, directive, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{compile, CompileEnv};
    use crate::config::Config;
    use crate::directive::DirectiveRegistry;
    use nodom_vdom::DirectiveValue;

    fn compile_root(text: &str) -> Result<VirtualDom, CompileError> {
        let config = Config::default();
        let directives = DirectiveRegistry::new();
        let elements = ElementRegistry::new();
        let env = CompileEnv {
            config: &config,
            directives: &directives,
            elements: &elements,
            is_module_class: &|_| false,
        };
        compile(text, &env).map(|t| t.root)
    }

    #[test]
    fn test_for_becomes_repeat() {
        let root = compile_root("<div><for cond={{rows}} tag=\"li\" index=\"i\">x</for></div>").unwrap();
        let li = &root.children[0];
        assert_eq!(li.tag(), "li");
        assert!(matches!(li.directive("repeat").unwrap().value, DirectiveValue::Expr(_)));
        assert!(!li.props.contains_key("cond"));
        assert_eq!(li.static_prop("index"), Some("i"));
    }

    #[test]
    fn test_if_else_elements() {
        let root = compile_root("<div><if cond={{a}}>A</if><else>B</else><endif/></div>").unwrap();
        assert!(root.children[0].has_directive("if"));
        assert!(root.children[1].has_directive("else"));
        assert!(root.children[2].has_directive("endif"));
        assert_eq!(root.children[0].tag(), "div");
    }

    #[test]
    fn test_recur_producer_and_consumer() {
        let root =
            compile_root("<recur cond=\"items\" name=\"r\"><span></span><recur ref=\"r\"/></recur>")
                .unwrap();
        assert_eq!(root.directive("recur").unwrap().static_value(), "items");
        let consumer = &root.children[1];
        assert_eq!(consumer.directive("recur").unwrap().static_value(), "");
        assert_eq!(consumer.static_prop("ref"), Some("r"));
    }

    #[test]
    fn test_missing_required_value() {
        assert_eq!(
            compile_root("<div><for>x</for></div>").unwrap_err(),
            CompileError::MissingDirectiveValue("repeat".into())
        );
    }

    #[test]
    fn test_custom_transform() {
        let mut elements = ElementRegistry::empty();
        elements.register("card", |node, _ctx| {
            node.tag_name = Some("section".into());
            node.set_prop("class", "card");
            Ok(())
        });
        let config = Config::default();
        let directives = DirectiveRegistry::new();
        let env = CompileEnv {
            config: &config,
            directives: &directives,
            elements: &elements,
            is_module_class: &|_| false,
        };
        let root = compile("<card></card>", &env).unwrap().root;
        assert_eq!(root.tag(), "section");
        assert_eq!(root.static_prop("class"), Some("card"));
    }
}
