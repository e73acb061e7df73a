//! Resource Loader
//!
//! Fetches templates and data by URL. Template content is compiled by the
//! app before it lands in the [`TemplateCache`], so a URL is parsed once.

use std::collections::HashMap;
use std::rc::Rc;

use nodom_vdom::CompiledTemplate;
use serde_json::Value;

use crate::error::LoadError;

/// Resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Template,
    Data,
    Text,
}

/// Loaded resource
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub content: String,
}

impl Resource {
    /// Parse data content as JSON
    pub fn json(&self, url: &str) -> Result<Value, LoadError> {
        serde_json::from_str(&self.content).map_err(|e| LoadError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Loader collaborator
pub trait ResourceLoader {
    fn load(&mut self, url: &str) -> Result<Resource, LoadError>;
}

/// Loader serving resources registered up front
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    resources: HashMap<String, Resource>,
    requests: usize,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: &str, kind: ResourceKind, content: &str) {
        self.resources.insert(
            url.to_string(),
            Resource {
                kind,
                content: content.to_string(),
            },
        );
    }

    pub fn with_template(mut self, url: &str, content: &str) -> Self {
        self.insert(url, ResourceKind::Template, content);
        self
    }

    pub fn with_data(mut self, url: &str, content: &str) -> Self {
        self.insert(url, ResourceKind::Data, content);
        self
    }

    /// Number of `load` calls served
    pub fn requests(&self) -> usize {
        self.requests
    }
}

impl ResourceLoader for MemoryLoader {
    fn load(&mut self, url: &str) -> Result<Resource, LoadError> {
        self.requests += 1;
        tracing::info!("LOAD {}", url);
        self.resources
            .get(url)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(url.to_string()))
    }
}

/// Compiled templates by URL
#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: HashMap<String, Rc<CompiledTemplate>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<Rc<CompiledTemplate>> {
        self.entries.get(url).cloned()
    }

    pub fn insert(&mut self, url: &str, template: Rc<CompiledTemplate>) {
        self.entries.insert(url.to_string(), template);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_loader() {
        let mut loader = MemoryLoader::new()
            .with_template("/t.html", "<div></div>")
            .with_data("/d.json", r#"{"a": 1}"#);

        let template = loader.load("/t.html").unwrap();
        assert_eq!(template.kind, ResourceKind::Template);

        let data = loader.load("/d.json").unwrap();
        assert_eq!(data.json("/d.json").unwrap(), json!({"a": 1}));

        assert_eq!(loader.load("/nope"), Err(LoadError::NotFound("/nope".into())));
        assert_eq!(loader.requests(), 3);
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        let resource = Resource {
            kind: ResourceKind::Data,
            content: "{oops".into(),
        };
        assert!(matches!(resource.json("/x"), Err(LoadError::Parse { .. })));
    }
}
