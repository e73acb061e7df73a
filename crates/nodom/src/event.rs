//! Event dispatch
//!
//! Host events are routed back to the render node that bound them. The path
//! from the module root to the target is walked twice: capture handlers
//! root to target, then bubble handlers target to root. Propagation ends at
//! the root of the module whose tree holds the target.

use nodom_expr::to_display;
use nodom_model::Model;
use nodom_vdom::{BoundEvent, EventHandler, ModuleId};
use serde_json::Value;

use crate::app::App;
use crate::error::NodomError;
use crate::host::HostNodeId;
use crate::module::{DomEvent, MethodCtx};

/// Handler found on the propagation path
struct Pending {
    key: String,
    owner: ModuleId,
    model: Option<Model>,
    path_prop: Option<String>,
    input_type: String,
    yes_value: Option<Value>,
    no_value: Option<Value>,
    radio_value: Option<String>,
    event: BoundEvent,
}

impl App {
    /// Fire `event` at a host node. Returns whether any handler ran.
    /// Model writes made by handlers are flushed by the next render.
    pub fn dispatch(&mut self, target: HostNodeId, event: &str) -> Result<bool, NodomError> {
        self.dispatch_with(target, event, Value::Null)
    }

    pub fn dispatch_with(&mut self, target: HostNodeId, event: &str, payload: Value) -> Result<bool, NodomError> {
        let Some((module, key)) = self.owning_node(target) else {
            tracing::debug!("No render node for {}", target);
            return Ok(false);
        };

        let path = self.handler_path(module, &key, event);
        if path.is_empty() {
            return Ok(false);
        }

        let capture = path.iter().filter(|p| p.event.descriptor.capture);
        let bubble = path.iter().rev().filter(|p| !p.event.descriptor.capture);
        let mut fired = false;
        for pending in capture.chain(bubble) {
            if !self.take_once(module, pending) {
                continue;
            }
            let dom_event = DomEvent {
                name: event.to_string(),
                target,
                current_key: pending.key.clone(),
                payload: payload.clone(),
            };
            self.run_handler(module, pending, &dom_event)?;
            fired = true;
            if pending.event.descriptor.stop_propagation {
                tracing::debug!("Propagation of '{}' stopped at {}", event, pending.key);
                break;
            }
        }
        Ok(fired)
    }

    /// Closest host ancestor (or self) that a module tree knows
    fn owning_node(&self, target: HostNodeId) -> Option<(ModuleId, String)> {
        let mut current = Some(target);
        while let Some(node) = current {
            if let Some(found) = self.host_index.get(&node) {
                return Some(found.clone());
            }
            current = self.host.parent(node);
        }
        None
    }

    /// Handlers for `event` along the root-to-target path
    fn handler_path(&self, module: ModuleId, key: &str, event: &str) -> Vec<Pending> {
        let Some(tree) = self.modules.get(&module).and_then(|m| m.render_tree.as_ref()) else {
            return Vec::new();
        };
        let Some(nodes) = tree.path_to(key) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for node in nodes {
            for bound in node.events.iter().filter(|e| e.descriptor.name == event) {
                out.push(Pending {
                    key: node.key.clone(),
                    owner: node.owner,
                    model: node.model.clone(),
                    path_prop: node.prop_text("path"),
                    input_type: node.prop_text("type").unwrap_or_default().to_ascii_lowercase(),
                    yes_value: node.props.get("yes-value").cloned(),
                    no_value: node.props.get("no-value").cloned(),
                    radio_value: node.prop_text("value"),
                    event: bound.clone(),
                });
            }
        }
        out
    }

    /// False when a `once` handler already fired for this node
    fn take_once(&mut self, module: ModuleId, pending: &Pending) -> bool {
        if !pending.event.descriptor.once {
            return true;
        }
        let Some(m) = self.modules.get_mut(&module) else {
            return false;
        };
        m.fired_once.insert((pending.key.clone(), pending.event.id))
    }

    fn run_handler(&mut self, module: ModuleId, pending: &Pending, event: &DomEvent) -> Result<(), NodomError> {
        match &pending.event.descriptor.handler {
            EventHandler::Method(name) => {
                let Some(owner) = self.modules.get(&pending.owner) else {
                    return Ok(());
                };
                let class = owner.class.clone();
                let module_model = owner.model.clone();
                let model = pending.model.clone().unwrap_or_else(|| module_model.clone());
                let ctx = MethodCtx {
                    module: pending.owner,
                    model: &model,
                    module_model: &module_model,
                    args: &[],
                    event: Some(event),
                };
                if class.call(name, &ctx).is_none() {
                    tracing::warn!("Module {} has no method '{}'", pending.owner, name);
                }
            }
            EventHandler::FieldSync { field } => {
                let Some(model) = &pending.model else {
                    return Ok(());
                };
                let host_node = self.modules.get(&module).and_then(|m| m.host_node(&pending.key));
                let Some(value) = host_node.and_then(|node| self.field_value(node, pending, model, field))
                else {
                    return Ok(());
                };
                model.set(field, value)?;
            }
            EventHandler::Navigate => {
                let Some(path) = &pending.path_prop else {
                    return Ok(());
                };
                self.navigate(path)?;
            }
        }
        Ok(())
    }

    /// Value a bound control holds, shaped like the model field it writes
    fn field_value(&self, node: HostNodeId, pending: &Pending, model: &Model, field: &str) -> Option<Value> {
        let checked = || matches!(self.host.property(node, "checked"), Some(Value::Bool(true)));
        match pending.input_type.as_str() {
            "checkbox" => Some(if checked() {
                pending.yes_value.clone().unwrap_or(Value::Bool(true))
            } else {
                pending.no_value.clone().unwrap_or(Value::Bool(false))
            }),
            "radio" => checked().then(|| Value::String(pending.radio_value.clone().unwrap_or_default())),
            _ => {
                let raw = self.host.property(node, "value")?;
                let text = to_display(&raw);
                let current = model.get(field);
                match current {
                    Some(Value::Number(_)) => Some(
                        text.trim()
                            .parse::<i64>()
                            .map(Value::from)
                            .or_else(|_| text.trim().parse::<f64>().map(Value::from))
                            .unwrap_or(Value::String(text)),
                    ),
                    _ => Some(Value::String(text)),
                }
            }
        }
    }
}
