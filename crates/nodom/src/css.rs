//! CSS Manager
//!
//! Receives the `<style>` blocks of compiled templates. [`ScopedCss`] keeps
//! one stylesheet per module class; blocks marked `scope` get every selector
//! prefixed with the class scope attribute, which the renderer puts on the
//! module root as `data-scope`.

use nodom_vdom::{ModuleId, StyleBlock};

/// Attribute carrying the scope of a module root
pub const SCOPE_ATTRIBUTE: &str = "data-scope";

/// CSS collaborator
pub trait CssManager {
    /// Styles of a module's freshly compiled template
    fn add_styles(&mut self, module: ModuleId, scope: &str, blocks: &[StyleBlock]);

    /// Module destroyed
    fn remove_module(&mut self, module: ModuleId);

    /// Current stylesheet text
    fn to_css(&self) -> String;
}

/// CSS rule with its scoped selector
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedRule {
    pub selector: String,
    pub scoped_selector: String,
    pub body: String,
}

/// Stylesheet of one module class
#[derive(Debug, Clone)]
pub struct ScopedStyleSheet {
    pub scope: String,
    pub rules: Vec<ScopedRule>,
    users: Vec<ModuleId>,
}

impl ScopedStyleSheet {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
            rules: Vec::new(),
            users: Vec::new(),
        }
    }

    /// Parse `selector { body }` rules, scoping them when asked
    pub fn add_css(&mut self, css: &str, scoped: bool) {
        for chunk in css.split('}') {
            let Some((selectors, body)) = chunk.split_once('{') else {
                continue;
            };
            let selectors = selectors.trim();
            if selectors.is_empty() {
                continue;
            }
            let scoped_selector = if scoped {
                selectors
                    .split(',')
                    .map(|s| self.scope_selector(s.trim()))
                    .collect::<Vec<_>>()
                    .join(", ")
            } else {
                selectors.to_string()
            };
            self.rules.push(ScopedRule {
                selector: selectors.to_string(),
                scoped_selector,
                body: body.trim().to_string(),
            });
        }
    }

    /// Scope a selector
    pub fn scope_selector(&self, selector: &str) -> String {
        if let Some(rest) = selector.strip_prefix(":host") {
            return format!("[{}=\"{}\"]{}", SCOPE_ATTRIBUTE, self.scope, rest);
        }
        format!("[{}=\"{}\"] {}", SCOPE_ATTRIBUTE, self.scope, selector)
    }

    pub fn to_css(&self) -> String {
        self.rules
            .iter()
            .map(|rule| format!("{} {{ {} }}", rule.scoped_selector, rule.body))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Default CSS manager
#[derive(Debug, Clone, Default)]
pub struct ScopedCss {
    sheets: Vec<ScopedStyleSheet>,
}

impl ScopedCss {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(&self, scope: &str) -> Option<&ScopedStyleSheet> {
        self.sheets.iter().find(|s| s.scope == scope)
    }
}

impl CssManager for ScopedCss {
    fn add_styles(&mut self, module: ModuleId, scope: &str, blocks: &[StyleBlock]) {
        if blocks.is_empty() {
            return;
        }
        let index = match self.sheets.iter().position(|s| s.scope == scope) {
            Some(i) => i,
            None => {
                let mut sheet = ScopedStyleSheet::new(scope);
                for block in blocks {
                    sheet.add_css(&block.css, block.scoped);
                }
                tracing::debug!("Stylesheet '{}' added with {} rules", scope, sheet.rules.len());
                self.sheets.push(sheet);
                self.sheets.len() - 1
            }
        };
        let sheet = &mut self.sheets[index];
        if !sheet.users.contains(&module) {
            sheet.users.push(module);
        }
    }

    fn remove_module(&mut self, module: ModuleId) {
        for sheet in &mut self.sheets {
            sheet.users.retain(|m| *m != module);
        }
        self.sheets.retain(|s| !s.users.is_empty());
    }

    fn to_css(&self) -> String {
        self.sheets
            .iter()
            .map(ScopedStyleSheet::to_css)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_selector() {
        let sheet = ScopedStyleSheet::new("card");
        assert_eq!(sheet.scope_selector("div"), "[data-scope=\"card\"] div");
        assert_eq!(sheet.scope_selector(":host"), "[data-scope=\"card\"]");
        assert_eq!(sheet.scope_selector(":host.big"), "[data-scope=\"card\"].big");
    }

    #[test]
    fn test_unscoped_rules_untouched() {
        let mut sheet = ScopedStyleSheet::new("card");
        sheet.add_css("p, a { color: red; } .x{margin:0}", false);
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[0].scoped_selector, "p, a");
        assert_eq!(sheet.to_css(), "p, a { color: red; }\n.x { margin:0 }");
    }

    #[test]
    fn test_sheet_shared_per_scope_and_dropped_with_last_user() {
        let mut css = ScopedCss::new();
        let blocks = vec![StyleBlock {
            css: "p { color: red }".into(),
            scoped: true,
        }];
        css.add_styles(ModuleId(1), "card", &blocks);
        css.add_styles(ModuleId(2), "card", &blocks);
        assert_eq!(css.sheet("card").map(|s| s.rules.len()), Some(1));
        assert!(css.to_css().contains("[data-scope=\"card\"] p"));

        css.remove_module(ModuleId(1));
        assert!(css.sheet("card").is_some());
        css.remove_module(ModuleId(2));
        assert!(css.sheet("card").is_none());
    }
}
