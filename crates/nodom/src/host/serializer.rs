//! HTML Serialization
//!
//! outerHTML/innerHTML of the in-memory host tree.

use super::memory::{HostNodeData, MemoryHost};
use super::HostNodeId;

/// Void elements (self-closing, no end tag)
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Raw text elements (no escaping for content)
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// HTML serializer
#[derive(Debug, Clone, Default)]
pub struct HtmlSerializer;

impl HtmlSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Serialize a node and its descendants
    pub fn serialize_outer(&self, host: &MemoryHost, node: HostNodeId) -> String {
        let mut output = String::new();
        self.serialize_node(host, node, &mut output);
        output
    }

    /// Serialize the children of a node
    pub fn serialize_inner(&self, host: &MemoryHost, node: HostNodeId) -> String {
        let mut output = String::new();
        for child in host.child_ids(node) {
            self.serialize_node(host, *child, &mut output);
        }
        output
    }

    fn serialize_node(&self, host: &MemoryHost, node: HostNodeId, output: &mut String) {
        let Some(data) = host.data(node) else {
            return;
        };

        match data {
            HostNodeData::Element { tag, attrs } => {
                let is_void = VOID_ELEMENTS.contains(&tag.as_str());
                let is_raw = RAW_TEXT_ELEMENTS.contains(&tag.as_str());

                output.push('<');
                output.push_str(tag);
                for (name, value) in attrs {
                    output.push(' ');
                    output.push_str(name);
                    if !value.is_empty() {
                        output.push_str("=\"");
                        escape_attribute(value, output);
                        output.push('"');
                    }
                }

                if is_void {
                    output.push_str(" />");
                    return;
                }
                output.push('>');
                for child in host.child_ids(node) {
                    match host.data(*child) {
                        Some(HostNodeData::Text(text)) if is_raw => output.push_str(text),
                        _ => self.serialize_node(host, *child, output),
                    }
                }
                output.push_str("</");
                output.push_str(tag);
                output.push('>');
            }
            HostNodeData::Text(text) => escape_text(text, output),
        }
    }
}

/// Escape text content for HTML
fn escape_text(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            _ => output.push(c),
        }
    }
}

/// Escape attribute value
fn escape_attribute(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '"' => output.push_str("&quot;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            _ => output.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostDom;

    #[test]
    fn test_escaping_and_void() {
        let mut host = MemoryHost::new();
        let div = host.create_element("div");
        host.set_attribute(div, "title", "a\"b");
        let input = host.create_element("input");
        let text = host.create_text("1 < 2 & 3");
        host.append_child(div, input);
        host.append_child(div, text);

        assert_eq!(
            HtmlSerializer::new().serialize_outer(&host, div),
            "<div title=\"a&quot;b\"><input />1 &lt; 2 &amp; 3</div>"
        );
    }

    #[test]
    fn test_raw_text_not_escaped() {
        let mut host = MemoryHost::new();
        let style = host.create_element("style");
        let css = host.create_text("a > b {}");
        host.append_child(style, css);
        assert_eq!(host.to_html(style), "<style>a > b {}</style>");
    }
}
