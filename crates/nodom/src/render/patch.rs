//! Host patching
//!
//! Commit phase. A first render builds the whole host subtree detached and
//! inserts it with one live insertion. Later renders apply the diff in a
//! fixed order: deletes, replaces, updates, adds, then a reorder of every
//! parent whose children were added or moved.

use std::collections::HashSet;

use nodom_expr::to_display;
use nodom_vdom::{Change, ChangeKind, ModuleId, RenderDom};
use serde_json::Value;

use crate::app::App;
use crate::host::{HostDom, HostNodeId};

/// Write a prop as an attribute. `null` and `false` remove it, `true`
/// writes an empty value.
pub(crate) fn write_attribute(host: &mut dyn HostDom, node: HostNodeId, name: &str, value: &Value) {
    match value {
        Value::Null | Value::Bool(false) => host.remove_attribute(node, name),
        Value::Bool(true) => host.set_attribute(node, name, ""),
        other => host.set_attribute(node, name, &to_display(other)),
    }
}

/// Build `node` and insert it under `parent` before `before`
pub(crate) fn render_to_html(
    app: &mut App,
    module: ModuleId,
    node: &RenderDom,
    parent: HostNodeId,
    before: Option<HostNodeId>,
) -> HostNodeId {
    let id = build(app, module, node, Some(parent));
    app.host.insert_before(parent, id, before);
    id
}

/// Create the host subtree of `node` without attaching it. A key that
/// already has a host node is updated in place instead.
fn build(app: &mut App, module: ModuleId, node: &RenderDom, parent: Option<HostNodeId>) -> HostNodeId {
    if let Some(existing) = host_of(app, module, &node.key) {
        if node.is_text() {
            app.host
                .set_text(existing, node.text_content.as_deref().unwrap_or_default());
        } else {
            for (name, value) in &node.props {
                write_attribute(app.host.as_mut(), existing, name, value);
            }
            for (name, value) in &node.assets {
                app.host.set_property(existing, name, value);
            }
        }
        return existing;
    }

    let id = if node.is_text() {
        app.host.create_text(node.text_content.as_deref().unwrap_or_default())
    } else {
        let id = app.host.create_element(node.tag());
        for (name, value) in &node.props {
            write_attribute(app.host.as_mut(), id, name, value);
        }
        for (name, value) in &node.assets {
            app.host.set_property(id, name, value);
        }
        for event in &node.events {
            let target = if event.descriptor.delegate {
                parent.unwrap_or(id)
            } else {
                id
            };
            app.host.add_listener(target, &event.descriptor.name, event.descriptor.capture);
        }
        for child in &node.children {
            let child_id = build(app, module, child, Some(id));
            app.host.append_child(id, child_id);
        }
        id
    };
    register(app, module, &node.key, id);
    id
}

/// Apply a diff of `module`'s render tree
pub(crate) fn apply(app: &mut App, module: ModuleId, container: HostNodeId, changes: &[Change<'_>]) {
    let of_kind = |kind: ChangeKind| changes.iter().filter(move |c| c.kind == kind);

    for change in of_kind(ChangeKind::Delete) {
        if let Some(id) = host_of(app, module, &change.node.key) {
            app.host.remove(id);
        }
        unregister_tree(app, module, change.node);
    }

    for change in of_kind(ChangeKind::Replace) {
        let Some(old) = change.reference else {
            continue;
        };
        let old_host = host_of(app, module, &old.key);
        unregister_tree(app, module, old);
        let parent_host = change
            .parent
            .and_then(|p| host_of(app, module, &p.key))
            .unwrap_or(container);
        let new_host = build(app, module, change.node, Some(parent_host));
        match old_host {
            Some(old_host) => app.host.replace(old_host, new_host),
            None => app.host.append_child(parent_host, new_host),
        }
    }

    for change in of_kind(ChangeKind::Update) {
        let (Some(old), Some(id)) = (change.reference, host_of(app, module, &change.node.key)) else {
            continue;
        };
        if change.node.is_text() {
            app.host
                .set_text(id, change.node.text_content.as_deref().unwrap_or_default());
        } else {
            update_element(app.host.as_mut(), id, change.node, old);
        }
    }

    for change in of_kind(ChangeKind::Add) {
        let Some(parent) = change.parent else {
            continue;
        };
        let Some(parent_host) = host_of(app, module, &parent.key) else {
            tracing::warn!("Module {}: no host node for parent '{}'", module, parent.key);
            continue;
        };
        let before = parent.children[change.index + 1..]
            .iter()
            .filter_map(|sibling| host_of(app, module, &sibling.key))
            .find(|h| app.host.parent(*h) == Some(parent_host));
        render_to_html(app, module, change.node, parent_host, before);
    }

    let mut seen = HashSet::new();
    for change in changes {
        if !matches!(change.kind, ChangeKind::Add | ChangeKind::Move) {
            continue;
        }
        if let Some(parent) = change.parent
            && seen.insert(parent.key.as_str())
        {
            reorder(app, module, parent);
        }
    }

    tracing::debug!("Module {}: applied {} changes", module, changes.len());
}

/// Make the host children of `parent` follow its render order
fn reorder(app: &mut App, module: ModuleId, parent: &RenderDom) {
    let Some(parent_host) = host_of(app, module, &parent.key) else {
        return;
    };
    let desired: Vec<HostNodeId> = parent
        .children
        .iter()
        .filter_map(|child| host_of(app, module, &child.key))
        .collect();
    let current: Vec<HostNodeId> = app
        .host
        .children(parent_host)
        .into_iter()
        .filter(|h| desired.contains(h))
        .collect();
    if current == desired {
        return;
    }
    for i in (0..desired.len()).rev() {
        app.host
            .insert_before(parent_host, desired[i], desired.get(i + 1).copied());
    }
}

fn update_element(host: &mut dyn HostDom, id: HostNodeId, new: &RenderDom, old: &RenderDom) {
    for (name, value) in &new.props {
        if old.props.get(name) != Some(value) {
            write_attribute(host, id, name, value);
        }
    }
    for name in old.props.keys() {
        if !new.props.contains_key(name) {
            host.remove_attribute(id, name);
        }
    }
    for (name, value) in &new.assets {
        if old.assets.get(name) != Some(value) {
            host.set_property(id, name, value);
        }
    }
    for name in old.assets.keys() {
        if !new.assets.contains_key(name) {
            host.set_property(id, name, &Value::Null);
        }
    }
}

fn host_of(app: &App, module: ModuleId, key: &str) -> Option<HostNodeId> {
    app.modules.get(&module)?.host_node(key)
}

fn register(app: &mut App, module: ModuleId, key: &str, id: HostNodeId) {
    if let Some(m) = app.modules.get_mut(&module) {
        m.host_nodes.insert(key.to_string(), id);
    }
    app.host_index.insert(id, (module, key.to_string()));
}

/// Forget the host nodes of `node` and its descendants
pub(crate) fn unregister_tree(app: &mut App, module: ModuleId, node: &RenderDom) {
    let mut keys = Vec::new();
    node.walk(&mut |n| keys.push(n.key.as_str()));
    let Some(m) = app.modules.get_mut(&module) else {
        return;
    };
    for key in keys {
        if let Some(id) = m.host_nodes.remove(key) {
            app.host_index.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    #[test]
    fn test_write_attribute_values() {
        let mut host = MemoryHost::new();
        let node = host.create_element("input");

        write_attribute(&mut host, node, "disabled", &Value::Bool(true));
        write_attribute(&mut host, node, "size", &serde_json::json!(3));
        assert_eq!(host.attribute(node, "disabled"), Some(""));
        assert_eq!(host.attribute(node, "size"), Some("3"));

        write_attribute(&mut host, node, "disabled", &Value::Bool(false));
        write_attribute(&mut host, node, "size", &Value::Null);
        assert_eq!(host.attribute(node, "disabled"), None);
        assert_eq!(host.attribute(node, "size"), None);
    }

    #[test]
    fn test_update_element_writes_only_deltas() {
        let mut host = MemoryHost::new();
        let node = host.create_element("p");
        let owner = ModuleId(1);

        let mut old = RenderDom::element("k", "p", owner);
        old.set_prop("class", "a");
        old.set_prop("title", "t");
        let mut new = RenderDom::element("k", "p", owner);
        new.set_prop("class", "b");
        new.set_prop("title", "t");

        host.set_attribute(node, "class", "a");
        host.set_attribute(node, "title", "t");
        host.reset_stats();
        update_element(&mut host, node, &new, &old);

        assert_eq!(host.stats().attribute_writes, 1);
        assert_eq!(host.attribute(node, "class"), Some("b"));
    }
}
