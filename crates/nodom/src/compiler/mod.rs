//! Template Compiler
//!
//! Turns template text into a [`CompiledTemplate`]:
//! - comments stripped, then one scan over tags and text
//! - `x-` attributes become directives, `e-` attributes events, the rest props
//! - `{{ }}` spans in text and props compile to expressions in the template
//!   arena
//! - registered module tags become containers with a `module` directive,
//!   registered custom elements are transformed in place
//! - `<style>` blocks are lifted out of the tree
//!
//! Errors are fatal: no partial tree is ever returned.

mod elements;
mod scanner;

use nodom_expr::Expression;
use nodom_vdom::{
    CompiledTemplate, Directive, DirectiveValue, EventDescriptor, EventId, ExprId, PropValue,
    StyleBlock, TextPart, VirtualDom,
};

use crate::config::Config;
use crate::directive::{DirectiveRegistry, ValueKind};
use crate::error::CompileError;
use crate::host::VOID_ELEMENTS;

pub use elements::{ElementRegistry, ElementTransform};
use scanner::{Piece, RawAttr};

/// Everything compilation looks up
pub struct CompileEnv<'a> {
    pub config: &'a Config,
    pub directives: &'a DirectiveRegistry,
    pub elements: &'a ElementRegistry,
    /// Whether a tag names a registered module class
    pub is_module_class: &'a dyn Fn(&str) -> bool,
}

/// Compile template text
pub fn compile(text: &str, env: &CompileEnv<'_>) -> Result<CompiledTemplate, CompileError> {
    let mut ctx = CompileCtx::new(env);
    let root = ctx.build(text)?;
    let mut template = ctx.template;
    template.root = root;
    tracing::debug!(
        "Compiled template: {} nodes, {} expressions, {} events",
        template.node_count(),
        template.expressions.len(),
        template.events.len()
    );
    Ok(template)
}

/// Compilation state, handed to element transforms and directive inits
pub struct CompileCtx<'e> {
    env: &'e CompileEnv<'e>,
    template: CompiledTemplate,
    next_group: u32,
}

impl<'e> CompileCtx<'e> {
    fn new(env: &'e CompileEnv<'e>) -> Self {
        Self {
            env,
            template: CompiledTemplate::default(),
            next_group: 0,
        }
    }

    pub fn config(&self) -> &Config {
        self.env.config
    }

    pub fn add_expression(&mut self, source: &str) -> ExprId {
        self.template.add_expression(Expression::new(source.trim()))
    }

    pub fn add_event(&mut self, event: EventDescriptor) -> EventId {
        self.template.add_event(event)
    }

    pub fn expression(&self, id: ExprId) -> Option<&Expression> {
        self.template.expression(id)
    }

    /// How values of directive `name` are read
    pub fn value_kind(&self, name: &str) -> Result<ValueKind, CompileError> {
        self.env
            .directives
            .get(name)
            .map(|ty| ty.value)
            .ok_or_else(|| CompileError::UnknownDirective(name.to_string()))
    }

    /// Attach directive `name` to `node`, running its compile-time init
    pub fn add_directive(
        &mut self,
        node: &mut VirtualDom,
        name: &str,
        raw: Option<&str>,
    ) -> Result<(), CompileError> {
        let kind = self.value_kind(name)?;
        let value = match raw.map(str::trim).filter(|v| !v.is_empty()) {
            Some(raw) => self.directive_value(kind, raw),
            None if kind == ValueKind::Optional => DirectiveValue::Static(String::new()),
            None => return Err(CompileError::MissingDirectiveValue(name.to_string())),
        };
        self.attach_directive(node, name, value)
    }

    /// Attach a directive whose value is already built
    pub fn attach_directive(
        &mut self,
        node: &mut VirtualDom,
        name: &str,
        value: DirectiveValue,
    ) -> Result<(), CompileError> {
        let ty = self
            .env
            .directives
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::UnknownDirective(name.to_string()))?;
        let directive = Directive::new(name, ty.priority, value);
        if let Some(init) = &ty.init {
            init(node, &directive, self)?;
        }
        node.add_directive(directive);
        Ok(())
    }

    /// Convert a prop into a directive value (custom element attributes)
    pub fn prop_to_value(&mut self, kind: ValueKind, prop: PropValue) -> DirectiveValue {
        match prop {
            PropValue::Static(s) => self.directive_value(kind, &s),
            PropValue::Dynamic(parts) => {
                match parts.iter().find_map(|p| match p {
                    TextPart::Expr(id) => Some(*id),
                    TextPart::Literal(_) => None,
                }) {
                    Some(id) => DirectiveValue::Expr(id),
                    None => DirectiveValue::Static(String::new()),
                }
            }
        }
    }

    /// `{{expr}}` is that expression; text mixing literals and spans becomes
    /// a template literal; plain text is an expression or static per `kind`.
    fn directive_value(&mut self, kind: ValueKind, raw: &str) -> DirectiveValue {
        if !raw.contains("{{") {
            return match kind {
                ValueKind::Expression => DirectiveValue::Expr(self.add_expression(raw)),
                ValueKind::Static | ValueKind::Optional => DirectiveValue::Static(raw.to_string()),
            };
        }
        if let Some(inner) = raw.strip_prefix("{{").and_then(|r| r.strip_suffix("}}")) {
            if !inner.contains("{{") {
                return DirectiveValue::Expr(self.add_expression(inner));
            }
        }
        let mut literal = String::from("`");
        for (is_expr, chunk) in split_spans(raw) {
            if is_expr {
                literal.push_str("${");
                literal.push_str(chunk);
                literal.push('}');
            } else {
                literal.push_str(&chunk.replace('\\', "\\\\").replace('`', "\\`").replace("${", "\\${"));
            }
        }
        literal.push('`');
        DirectiveValue::Expr(self.add_expression(&literal))
    }

    /// Literal/expression parts of text
    fn parse_text(&mut self, text: &str) -> Vec<TextPart> {
        let mut parts = Vec::new();
        for (is_expr, chunk) in split_spans(text) {
            if is_expr {
                parts.push(TextPart::Expr(self.add_expression(chunk)));
            } else if !chunk.is_empty() {
                parts.push(TextPart::Literal(scanner::decode_entities(chunk)));
            }
        }
        parts
    }

    fn build(&mut self, text: &str) -> Result<VirtualDom, CompileError> {
        let src = scanner::strip_comments(text)?;
        let pieces = scanner::scan(&src)?;

        // open tag names as written, alongside the nodes being built
        let mut stack: Vec<(String, VirtualDom)> = Vec::new();
        let mut root: Option<VirtualDom> = None;

        for piece in pieces {
            match piece {
                Piece::Text {
                    text,
                    position,
                    raw,
                } => {
                    if stack.is_empty() {
                        if !text.trim().is_empty() {
                            return Err(CompileError::TextOutsideRoot(position));
                        }
                        continue;
                    }
                    let preserve = stack
                        .iter()
                        .any(|(name, _)| self.config().preserves_whitespace(name));
                    let node = if raw {
                        Some(VirtualDom::text(text))
                    } else {
                        self.text_node(&text, preserve)
                    };
                    if let (Some(node), Some((_, parent))) = (node, stack.last_mut()) {
                        parent.children.push(node);
                    }
                }
                Piece::Open {
                    name,
                    attrs,
                    self_closing,
                    ..
                } => {
                    let node = self.open_tag(&name, attrs)?;
                    if self_closing || VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str()) {
                        let node = self.finish(node)?;
                        self.attach(&mut stack, &mut root, &name, node)?;
                    } else {
                        stack.push((name, node));
                    }
                }
                Piece::Close { name, position } => {
                    let Some((open, node)) = stack.pop() else {
                        return Err(CompileError::UnexpectedClose {
                            found: name,
                            position,
                        });
                    };
                    if !open.eq_ignore_ascii_case(&name) {
                        return Err(CompileError::MismatchedTag {
                            expected: open,
                            found: name,
                            position,
                        });
                    }
                    let node = self.finish(node)?;
                    self.attach(&mut stack, &mut root, &open, node)?;
                }
            }
        }

        if let Some((name, _)) = stack.last() {
            return Err(CompileError::UnclosedTag(name.clone()));
        }
        root.ok_or(CompileError::NoRoot)
    }

    fn attach(
        &mut self,
        stack: &mut [(String, VirtualDom)],
        root: &mut Option<VirtualDom>,
        name: &str,
        node: VirtualDom,
    ) -> Result<(), CompileError> {
        if name.eq_ignore_ascii_case("style") && !stack.is_empty() {
            let css = node
                .children
                .iter()
                .filter_map(|c| c.text_content.as_deref())
                .collect::<String>();
            self.template.styles.push(StyleBlock {
                css,
                scoped: node.props.contains_key("scope"),
            });
            return Ok(());
        }
        match stack.last_mut() {
            Some((_, parent)) => parent.children.push(node),
            None if root.is_some() => return Err(CompileError::MultipleRoots),
            None => *root = Some(node),
        }
        Ok(())
    }

    fn text_node(&mut self, text: &str, preserve: bool) -> Option<VirtualDom> {
        if text.trim().is_empty() && !preserve {
            return None;
        }
        if !text.contains("{{") {
            return Some(VirtualDom::text(scanner::decode_entities(text)));
        }
        let parts = self.parse_text(text);
        let mut node = VirtualDom::text("");
        node.text_content = None;
        node.expressions = Some(parts);
        node.static_num.set(-1);
        Some(node)
    }

    fn open_tag(&mut self, name: &str, attrs: Vec<RawAttr>) -> Result<VirtualDom, CompileError> {
        let mut node = VirtualDom::element(name);
        let directive_prefix = self.config().directive_prefix.clone();
        let event_prefix = self.config().event_prefix.clone();

        for attr in attrs {
            if let Some(directive) = attr.name.strip_prefix(directive_prefix.as_str()) {
                self.add_directive(&mut node, directive, attr.value.as_deref())?;
            } else if let Some(event) = attr.name.strip_prefix(event_prefix.as_str()) {
                let spec = attr.value.unwrap_or_default();
                if spec.trim().is_empty() {
                    return Err(CompileError::EmptyEvent(event.to_string()));
                }
                let descriptor =
                    EventDescriptor::parse(event, &spec, self.config().modifier_separator);
                let id = self.add_event(descriptor);
                node.add_event(event, id);
            } else {
                let value = match attr.value {
                    None => PropValue::Static(String::new()),
                    Some(v) if v.contains("{{") => PropValue::Dynamic(self.parse_text(&v)),
                    Some(v) => PropValue::Static(scanner::decode_entities(&v)),
                };
                node.props.insert(attr.name, value);
            }
        }

        let env = self.env;
        if (env.is_module_class)(name) {
            node.tag_name = Some(self.config().container_tag.clone());
            self.attach_directive(&mut node, "module", DirectiveValue::Static(name.to_string()))?;
        } else if let Some(transform) = env.elements.get(name) {
            transform(&mut node, self)?;
        }
        Ok(node)
    }

    /// Close-time work: default slot grouping, conditional groups among the
    /// children, directive order and the initial static budget
    fn finish(&mut self, mut node: VirtualDom) -> Result<VirtualDom, CompileError> {
        if node.has_directive("module") {
            self.group_default_slot(&mut node)?;
        }
        self.assign_groups(&mut node)?;
        node.sort_directives();
        if !node.directives.is_empty() || node.has_dynamic_props() {
            node.static_num.set(-1);
        }
        Ok(node)
    }

    fn group_default_slot(&mut self, node: &mut VirtualDom) -> Result<(), CompileError> {
        let (mut slots, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut node.children)
            .into_iter()
            .partition(|c| c.has_directive("slot"));
        if !rest.is_empty() {
            let mut wrapper = VirtualDom::element(self.config().container_tag.clone());
            self.attach_directive(&mut wrapper, "slot", DirectiveValue::Static("default".into()))?;
            wrapper.children = rest;
            slots.push(self.finish(wrapper)?);
        }
        node.children = slots;
        Ok(())
    }

    fn assign_groups(&mut self, node: &mut VirtualDom) -> Result<(), CompileError> {
        let mut current: Option<u32> = None;
        for child in &mut node.children {
            let Some(branch) = child
                .directives
                .iter()
                .map(|d| d.name.as_str())
                .find(|n| matches!(*n, "if" | "elseif" | "else" | "endif"))
                .map(str::to_string)
            else {
                current = None;
                continue;
            };

            let group = match branch.as_str() {
                "if" => {
                    self.next_group += 1;
                    self.next_group
                }
                "endif" => current.unwrap_or_default(),
                other => current.ok_or_else(|| CompileError::OrphanBranch(other.to_string()))?,
            };
            for directive in &mut child.directives {
                if directive.name == branch {
                    directive.group = Some(group);
                }
            }
            current = match branch.as_str() {
                "if" | "elseif" => Some(group),
                _ => None,
            };
        }
        Ok(())
    }
}

/// Split text into `(is_expression, chunk)` runs on `{{ }}` spans.
/// Unclosed spans have been rejected by the scanner.
fn split_spans(text: &str) -> Vec<(bool, &str)> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        if start > 0 {
            out.push((false, &rest[..start]));
        }
        out.push((true, rest[start + 2..start + 2 + len].trim()));
        rest = &rest[start + 2 + len + 2..];
    }
    if !rest.is_empty() {
        out.push((false, rest));
    }
    out
}
