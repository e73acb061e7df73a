//! Built-in directives

use std::collections::BTreeMap;

use nodom_expr::{to_display, truthy};
use nodom_model::Model;
use nodom_vdom::{Directive, DirectiveValue, EventDescriptor, EventHandler, RenderDom, VirtualDom};
use serde_json::{json, Value};

use super::{DirectiveCtx, DirectiveRegistry, DirectiveType, ValueKind};
use crate::app::ChildBinding;
use crate::compiler::CompileCtx;
use crate::config::SlotModel;
use crate::error::{CompileError, NodomError};
use crate::module::SlotContent;
use crate::render::Chain;

pub(super) fn register_all(registry: &mut DirectiveRegistry) {
    use ValueKind::*;

    registry.register(DirectiveType::new("model", 1, Static, model));
    registry.register(DirectiveType::new("repeat", 2, Expression, repeat));
    registry.register(DirectiveType::new("recur", 2, Optional, recur));
    registry.register(DirectiveType::new("if", 5, Expression, if_));
    registry.register(DirectiveType::new("elseif", 5, Expression, elseif));
    registry.register(DirectiveType::new("else", 5, Optional, else_));
    registry.register(DirectiveType::new("endif", 5, Optional, endif));
    registry.register(DirectiveType::new("show", 5, Expression, show));
    registry.register(DirectiveType::new("slot", 5, Optional, slot));
    registry.register(DirectiveType::new("module", 8, Static, module));
    registry.register(DirectiveType::new("field", 10, Static, field).with_init(field_init));
    registry.register(DirectiveType::new("route", 10, Static, route).with_init(route_init));
    registry.register(DirectiveType::new("router", 10, Optional, router));
}

/// Switch the model scope of the node and its subtree
fn model(ctx: &mut DirectiveCtx<'_, '_>) -> Result<bool, NodomError> {
    let Some(path) = ctx.path() else {
        return Ok(true);
    };
    match ctx.model().get_model(&path) {
        Some(scoped) => {
            ctx.dst.model = Some(scoped);
            Ok(true)
        }
        None => {
            tracing::debug!("x-model '{}' missing, node skipped", path);
            Ok(false)
        }
    }
}

/// One clone per list item; the template node itself is dropped
fn repeat(ctx: &mut DirectiveCtx<'_, '_>) -> Result<bool, NodomError> {
    let items = repeat_items(ctx);
    if items.is_empty() {
        return Ok(false);
    }

    let key_field = ctx.config().repeat_key_field.clone();
    let index_field = ctx.src.static_prop("index").map(str::to_string);

    for (i, item) in items.into_iter().enumerate() {
        if let Some(field) = &index_field {
            if let Err(e) = item.set(field, json!(i)) {
                tracing::warn!("Cannot write repeat index '{}': {}", field, e);
            }
        }
        let item_key = item
            .get(&key_field)
            .filter(|v| !v.is_null())
            .map(|v| to_display(&v))
            .unwrap_or_else(|| item.id().to_string());
        let dedup = match ctx.dedup {
            Some(d) => format!("{d}_{item_key}"),
            None => item_key,
        };

        let mut clone = RenderDom::element(
            format!("{}_{}", ctx.src.key, dedup),
            ctx.src.tag(),
            ctx.frame.owner,
        );
        clone.static_num = ctx.dst.static_num;
        clone.assets = ctx.src.assets.clone();
        clone.model = Some(item);
        ctx.pass.render_element_from(
            ctx.frame,
            ctx.src,
            clone,
            ctx.index + 1,
            ctx.parent_module,
            Some(dedup.as_str()),
            ctx.out,
        )?;
    }
    Ok(false)
}

/// Item models: live wrappers when the value names a model list, detached
/// copies for computed lists. Primitive items are exposed as `$value`.
fn repeat_items(ctx: &DirectiveCtx<'_, '_>) -> Vec<Model> {
    let scope = ctx.model();
    let list = ctx.path().and_then(|path| {
        scope.get_model(&path).or_else(|| {
            let owner = ctx.pass.app.modules.get(&ctx.frame.owner)?;
            owner.model.get_model(&path)
        })
    });

    match list {
        Some(list) if list.array_len().is_some() => {
            let len = list.array_len().unwrap_or(0);
            (0..len)
                .filter_map(|i| {
                    let key = i.to_string();
                    list.get_model(&key)
                        .or_else(|| list.get(&key).map(|v| Model::detached(json!({ "$value": v }))))
                })
                .collect()
        }
        _ => match &ctx.value {
            Value::Array(items) => items
                .iter()
                .map(|v| match v {
                    Value::Object(_) => Model::detached(v.clone()),
                    other => Model::detached(json!({ "$value": other })),
                })
                .collect(),
            _ => Vec::new(),
        },
    }
}

/// Producer stores itself by name and renders its children; a consumer
/// (`ref`) renders the stored producer against the nested data when the
/// current model has it. A consumer that would re-enter a producer already
/// rendering against the same model is skipped.
fn recur(ctx: &mut DirectiveCtx<'_, '_>) -> Result<bool, NodomError> {
    let module = ctx.module();

    if let Some(name) = ctx.src.static_prop("ref") {
        ctx.dst.props.remove("ref");
        let producer = ctx
            .pass
            .app
            .modules
            .get(&module)
            .and_then(|m| m.recurs.get(name).cloned());
        let Some(producer) = producer else {
            tracing::debug!("Recursion '{}' has no producer yet", name);
            return Ok(false);
        };
        let cond = producer
            .directive("recur")
            .map(|d| d.static_value().to_string())
            .unwrap_or_default();

        let scope = ctx.model();
        let nested = scope.get(&cond).filter(|v| !v.is_null());
        if nested.is_none() {
            return Ok(false);
        }
        let model = match scope.get_model(&cond) {
            Some(m) if m.array_len().is_none() => m,
            _ => scope,
        };
        let producer_name = producer.static_prop("name").unwrap_or("rec");
        if ctx.pass.is_recursing(producer_name, &model) {
            tracing::debug!("Recursion '{}' makes no progress on '{}', skipped", name, cond);
            return Ok(false);
        }

        let dedup = ctx.dst.key.clone();
        ctx.dst.children = ctx.pass.render_children(
            ctx.frame,
            std::slice::from_ref(&producer),
            &model,
            None,
            Some(dedup.as_str()),
        )?;
        ctx.children_handled = true;
        return Ok(true);
    }

    let name = ctx.src.static_prop("name").unwrap_or("rec").to_string();
    ctx.dst.props.remove("name");
    if let Some(m) = ctx.pass.app.modules.get_mut(&module) {
        m.recurs.entry(name.clone()).or_insert_with(|| ctx.src.clone());
    }

    let model = ctx.model();
    ctx.pass.enter_recursion(&name, &model);
    let children = ctx.pass.render_children(
        ctx.frame,
        &ctx.src.children,
        &model,
        ctx.dst.module_id,
        ctx.dedup,
    );
    ctx.pass.leave_recursion();
    ctx.dst.children = children?;
    ctx.children_handled = true;
    Ok(true)
}

fn group_of(ctx: &DirectiveCtx<'_, '_>) -> u32 {
    ctx.directive.group.unwrap_or_default()
}

fn if_(ctx: &mut DirectiveCtx<'_, '_>) -> Result<bool, NodomError> {
    let satisfied = truthy(&ctx.value);
    ctx.out.chain = Some(Chain {
        group: group_of(ctx),
        satisfied,
    });
    Ok(satisfied)
}

fn elseif(ctx: &mut DirectiveCtx<'_, '_>) -> Result<bool, NodomError> {
    let group = group_of(ctx);
    match ctx.out.chain {
        Some(chain) if chain.group == group && chain.satisfied => Ok(false),
        _ => {
            let satisfied = truthy(&ctx.value);
            ctx.out.chain = Some(Chain { group, satisfied });
            Ok(satisfied)
        }
    }
}

fn else_(ctx: &mut DirectiveCtx<'_, '_>) -> Result<bool, NodomError> {
    let group = group_of(ctx);
    let render = match ctx.out.chain.take() {
        Some(chain) if chain.group == group => !chain.satisfied,
        _ => true,
    };
    Ok(render)
}

fn endif(ctx: &mut DirectiveCtx<'_, '_>) -> Result<bool, NodomError> {
    ctx.out.chain = None;
    Ok(false)
}

fn show(ctx: &mut DirectiveCtx<'_, '_>) -> Result<bool, NodomError> {
    if !truthy(&ctx.value) {
        let style = ctx.dst.prop_text("style").unwrap_or_default();
        let style = style.trim().trim_end_matches(';');
        let hidden = if style.is_empty() {
            "display:none".to_string()
        } else {
            format!("{style};display:none")
        };
        ctx.dst.set_prop("style", hidden);
    }
    Ok(true)
}

/// Inside a sub-module container: capture content for that module.
/// Elsewhere: render the content captured for this module under the name,
/// or the node's own children when nothing was captured.
fn slot(ctx: &mut DirectiveCtx<'_, '_>) -> Result<bool, NodomError> {
    let name = match ctx.value_text().trim() {
        "" => "default".to_string(),
        name => name.to_string(),
    };

    if let Some(target) = ctx.parent_module {
        let content = SlotContent {
            frame: ctx.frame.clone(),
            node: ctx.src.clone(),
            model: ctx.model(),
        };
        if let Some(m) = ctx.pass.app.modules.get_mut(&target) {
            m.slots.insert(name, content);
        }
        return Ok(false);
    }

    let inner = ctx.dst.props.remove("inner-render").is_some()
        || ctx.config().slot_model == SlotModel::Inner;
    let module = ctx.module();
    let content = ctx
        .pass
        .app
        .modules
        .get(&module)
        .and_then(|m| m.slots.get(&name).cloned());
    let Some(content) = content else {
        return Ok(true);
    };

    let model = if inner { ctx.model() } else { content.model.clone() };
    let dedup = ctx.dst.key.clone();
    ctx.dst.children = ctx.pass.render_children(
        &content.frame,
        &content.node.children,
        &model,
        None,
        Some(dedup.as_str()),
    )?;
    ctx.children_handled = true;
    Ok(true)
}

fn module(ctx: &mut DirectiveCtx<'_, '_>) -> Result<bool, NodomError> {
    let class_name = ctx.value_text();
    attach_module(ctx, &class_name)
}

/// Resolve or create the sub-module for this container and hand it the
/// container's props: `$name` props go into its model, `share-model` shares
/// the container's model, everything else becomes module props
fn attach_module(ctx: &mut DirectiveCtx<'_, '_>, class_name: &str) -> Result<bool, NodomError> {
    let parent = ctx.module();
    let key = ctx.dst.key.clone();
    let Some(child) = ctx.pass.app.attach_child(parent, &key, class_name)? else {
        tracing::warn!("Unknown module class '{}', container skipped", class_name);
        return Ok(false);
    };

    let data_prefix = ctx.config().data_prefix.clone();
    let share_prop = ctx.config().share_model_prop.clone();
    let mut props = BTreeMap::new();
    let mut data = Vec::new();
    let mut share = false;
    for (name, value) in std::mem::take(&mut ctx.dst.props) {
        if name == share_prop {
            share = true;
        } else if let Some(field) = name.strip_prefix(data_prefix.as_str()) {
            data.push((field.to_string(), value));
        } else {
            props.insert(name.clone(), value.clone());
            ctx.dst.props.insert(name, value);
        }
    }

    ctx.dst.module_id = Some(child);
    let shared = share.then(|| ctx.model());
    ctx.pass.app.configure_child(
        child,
        ChildBinding {
            container_key: key,
            props,
            data,
            shared,
        },
    )?;
    ctx.pass.use_child(child);
    Ok(true)
}

fn field_path(directive: &Directive, ctx: &CompileCtx<'_>) -> String {
    match &directive.value {
        DirectiveValue::Static(s) => s.trim().to_string(),
        DirectiveValue::Expr(id) => ctx
            .expression(*id)
            .and_then(|e| e.as_path())
            .unwrap_or_default(),
    }
}

fn field_init(
    node: &mut VirtualDom,
    directive: &Directive,
    ctx: &mut CompileCtx<'_>,
) -> Result<(), CompileError> {
    let field = field_path(directive, ctx);
    if field.is_empty() {
        return Err(CompileError::MissingDirectiveValue("field".into()));
    }
    let id = ctx.add_event(EventDescriptor::new("change", EventHandler::FieldSync { field }));
    node.add_event("change", id);
    Ok(())
}

/// Push the bound model value into the control
fn field(ctx: &mut DirectiveCtx<'_, '_>) -> Result<bool, NodomError> {
    let Some(path) = ctx.path() else {
        return Ok(true);
    };
    let current = ctx.model().get(&path).unwrap_or(Value::Null);
    let input_type = ctx
        .dst
        .prop_text("type")
        .unwrap_or_default()
        .to_ascii_lowercase();

    match input_type.as_str() {
        "checkbox" => {
            let yes = ctx
                .dst
                .props
                .get("yes-value")
                .map(to_display)
                .unwrap_or_else(|| "true".into());
            let checked = to_display(&current) == yes;
            ctx.dst.assets.insert("checked".into(), Value::Bool(checked));
        }
        "radio" => {
            let checked = ctx.dst.prop_text("value") == Some(to_display(&current));
            ctx.dst.assets.insert("checked".into(), Value::Bool(checked));
        }
        _ => {
            ctx.dst
                .assets
                .insert("value".into(), Value::String(to_display(&current)));
        }
    }
    Ok(true)
}

fn route_init(
    node: &mut VirtualDom,
    _directive: &Directive,
    ctx: &mut CompileCtx<'_>,
) -> Result<(), CompileError> {
    let id = ctx.add_event(EventDescriptor::new("click", EventHandler::Navigate));
    node.add_event("click", id);
    Ok(())
}

/// Bind the path prop and keep the `active` field in sync with the router
fn route(ctx: &mut DirectiveCtx<'_, '_>) -> Result<bool, NodomError> {
    let path = ctx.value_text();
    ctx.dst.set_prop("path", path.clone());

    if let Some(field) = ctx.src.static_prop("active") {
        ctx.dst.props.remove("active");
        let model = ctx.model();
        let owner = ctx.module();
        let router = &mut ctx.pass.app.router;
        router.register_active(owner, &path, &model, field);
        let active = router.is_active(&path);
        if let Err(e) = model.set(field, Value::Bool(active)) {
            tracing::warn!("Cannot write active field '{}': {}", field, e);
        }
    }
    Ok(true)
}

/// Router view: embeds the module the router resolves for the current path
fn router(ctx: &mut DirectiveCtx<'_, '_>) -> Result<bool, NodomError> {
    let module = ctx.module();
    ctx.pass.app.router_views.insert(module);
    let path = ctx.pass.app.router.current_path().to_string();
    match ctx.pass.app.router.resolve(&path) {
        Some(class_name) => attach_module(ctx, &class_name),
        None => {
            tracing::debug!("No route for '{}'", path);
            Ok(true)
        }
    }
}
