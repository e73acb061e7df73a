//! Framework Configuration

use serde::{Deserialize, Serialize};

use crate::error::NodomError;

/// Which model captured slot content renders against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotModel {
    /// Model of the module that wrote the content
    Captured,
    /// Model in scope at the consuming `slot` node
    Inner,
}

/// Framework configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Attribute prefix marking directives
    pub directive_prefix: String,

    /// Attribute prefix marking event bindings
    pub event_prefix: String,

    /// Prop prefix whose values are written into a sub-module's model
    pub data_prefix: String,

    /// Separator between an event method and its modifiers
    pub modifier_separator: char,

    /// Tag used for module containers and custom elements without `tag`
    pub container_tag: String,

    /// Tags inside which whitespace-only text is kept
    pub preserve_whitespace_tags: Vec<String>,

    /// Field used as the repeat key when an item has it
    pub repeat_key_field: String,

    /// Default slot model binding, overridable per slot with `inner-render`
    pub slot_model: SlotModel,

    /// Container prop making a sub-module share the container's model
    pub share_model_prop: String,

    /// Upper bound on flushes run by `App::settle`
    pub max_render_passes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directive_prefix: "x-".into(),
            event_prefix: "e-".into(),
            data_prefix: "$".into(),
            modifier_separator: ':',
            container_tag: "div".into(),
            preserve_whitespace_tags: vec!["pre".into()],
            repeat_key_field: "id".into(),
            slot_model: SlotModel::Captured,
            share_model_prop: "share-model".into(),
            max_render_passes: 16,
        }
    }
}

impl Config {
    /// Parse from JSON; missing fields keep their defaults
    pub fn from_json(text: &str) -> Result<Self, NodomError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn preserves_whitespace(&self, tag: &str) -> bool {
        self.preserve_whitespace_tags
            .iter()
            .any(|t| t.eq_ignore_ascii_case(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.directive_prefix, "x-");
        assert_eq!(config.event_prefix, "e-");
        assert_eq!(config.modifier_separator, ':');
        assert!(config.preserves_whitespace("PRE"));
    }

    #[test]
    fn test_from_json_partial() {
        let config = Config::from_json(r#"{"repeat_key_field": "uid", "slot_model": "inner"}"#)
            .unwrap();
        assert_eq!(config.repeat_key_field, "uid");
        assert_eq!(config.slot_model, SlotModel::Inner);
        assert_eq!(config.container_tag, "div");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(Config::from_json("{").is_err());
    }
}
