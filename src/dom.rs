// DOM Module - In-memory document tree that every front-end draws from
use std::collections::BTreeMap;
use std::fmt::Write as _;
use thiserror::Error;

// Element ids making up the dashboard document contract
pub const STATUS: &str = "status";
pub const MQTT_STATUS: &str = "mqtt_status";
pub const MODE_SELECT: &str = "mode_select";
pub const LED_RESULTS: &str = "led_results";
pub const COLOR_PICKER: &str = "color_picker";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("no element with id '{0}' in the document")]
    MissingElement(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub padding: Option<String>,
    pub display: Option<String>,
    pub cursor: Option<String>,
}

impl Style {
    fn to_css(&self) -> String {
        let mut css = String::new();
        let props = [
            ("color", &self.color),
            ("background-color", &self.background_color),
            ("padding", &self.padding),
            ("display", &self.display),
            ("cursor", &self.cursor),
        ];
        for (name, value) in props {
            if let Some(value) = value {
                let _ = write!(css, "{}:{};", name, value);
            }
        }
        css
    }
}

/// A node in the dashboard document.
///
/// `text` is the node's own text content and is emitted before `children`.
/// `command` marks a clickable node: activating it sends that backend path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub class: Option<String>,
    pub text: String,
    pub title: Option<String>,
    pub style: Style,
    pub attrs: BTreeMap<String, String>,
    pub command: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Element {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.class = Some(class.to_string());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn with_command(mut self, path: impl Into<String>) -> Self {
        self.command = Some(path.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class
            .as_deref()
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn append_child(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    pub fn find(&self, id: &str) -> Option<&Element> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Element> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    fn write_html(&self, out: &mut String) {
        // Clickable nodes become links into the mirror's command route
        let tag = if self.command.is_some() { "a" } else { self.tag.as_str() };

        let _ = write!(out, "<{}", tag);
        if let Some(id) = &self.id {
            let _ = write!(out, " id=\"{}\"", escape_html(id));
        }
        if let Some(class) = &self.class {
            let _ = write!(out, " class=\"{}\"", escape_html(class));
        }
        if let Some(title) = &self.title {
            let _ = write!(out, " title=\"{}\"", escape_html(title));
        }
        let css = self.style.to_css();
        if !css.is_empty() {
            let _ = write!(out, " style=\"{}\"", escape_html(&css));
        }
        if let Some(path) = &self.command {
            let _ = write!(out, " href=\"/command{}\"", escape_html(path));
        }
        for (name, value) in &self.attrs {
            let _ = write!(out, " {}=\"{}\"", name, escape_html(value));
        }
        out.push('>');
        out.push_str(&escape_html(&self.text));
        for child in &self.children {
            child.write_html(out);
        }
        let _ = write!(out, "</{}>", tag);
    }
}

/// The dashboard page: a root element holding every target the poll loop
/// and the command dispatcher write into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    pub fn dashboard() -> Self {
        let root = Element::new("body")
            .with_child(
                Element::new("div")
                    .with_class("header")
                    .with_child(
                        Element::new("span")
                            .with_id(MQTT_STATUS)
                            .with_text("⬤ MQTT"),
                    )
                    .with_child(Element::new("div").with_id(STATUS)),
            )
            .with_child(
                Element::new("select")
                    .with_id(MODE_SELECT)
                    .with_class("dropdownModeButton")
                    .with_attr("onchange", "location.href='/command/mode/'+this.value"),
            )
            .with_child(Element::new("div").with_id(COLOR_PICKER))
            .with_child(Element::new("div").with_id(LED_RESULTS));
        Document { root }
    }

    pub fn element(&self, id: &str) -> Result<&Element, DomError> {
        self.root
            .find(id)
            .ok_or_else(|| DomError::MissingElement(id.to_string()))
    }

    pub fn element_mut(&mut self, id: &str) -> Result<&mut Element, DomError> {
        self.root
            .find_mut(id)
            .ok_or_else(|| DomError::MissingElement(id.to_string()))
    }

    /// Remove an element (and its subtree) from the document.
    #[cfg(test)]
    pub fn remove(&mut self, id: &str) -> Option<Element> {
        fn take(parent: &mut Element, id: &str) -> Option<Element> {
            if let Some(pos) = parent.children.iter().position(|c| c.id.as_deref() == Some(id)) {
                return Some(parent.children.remove(pos));
            }
            parent.children.iter_mut().find_map(|c| take(c, id))
        }
        take(&mut self.root, id)
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.root.write_html(&mut out);
        out
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_has_all_targets() {
        let doc = Document::dashboard();
        for id in [STATUS, MQTT_STATUS, MODE_SELECT, LED_RESULTS, COLOR_PICKER] {
            assert!(doc.element(id).is_ok(), "missing {}", id);
        }
    }

    #[test]
    fn test_missing_element() {
        let mut doc = Document::dashboard();
        assert!(doc.remove(LED_RESULTS).is_some());
        assert_eq!(
            doc.element_mut(LED_RESULTS).unwrap_err(),
            DomError::MissingElement(LED_RESULTS.to_string())
        );
    }

    #[test]
    fn test_html_serialization() {
        let mut el = Element::new("span")
            .with_class("led")
            .with_text("⬤")
            .with_title("Name: <A> & \"B\"");
        el.style.color = Some("#ff0000".to_string());

        let mut out = String::new();
        el.write_html(&mut out);
        assert_eq!(
            out,
            "<span class=\"led\" title=\"Name: &lt;A&gt; &amp; &quot;B&quot;\" style=\"color:#ff0000;\">⬤</span>"
        );
    }

    #[test]
    fn test_command_nodes_render_as_links() {
        let el = Element::new("span").with_text("⬤").with_command("/color/Red");
        let mut out = String::new();
        el.write_html(&mut out);
        assert_eq!(out, "<a href=\"/command/color/Red\">⬤</a>");
    }
}
