//! Declarative view tree.
//!
//! Pages describe their DOM as a [`ViewNode`] tree; the browser shell materialises it.
//! Attribute keys are routed by [`Element::attr`]:
//!
//! * `on:<event>` binds a listener carrying an [`Action`],
//! * `disabled`/`checked`/`selected`/`open` become live boolean properties,
//! * everything else is a plain string attribute.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde_json::Value;

use crate::actions::Action;

pub const BOOLEAN_PROPERTIES: [&str; 4] = ["disabled", "checked", "selected", "open"];
pub const EVENT_PREFIX: &str = "on:";

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Bool(bool),
    Action(Action),
}

impl AttrValue {
    /// Coercion used for boolean properties. `"false"`, `"0"` and `""` are false.
    pub fn truthy(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Text(value) => {
                let value = value.trim();
                !(value.is_empty() || value.eq_ignore_ascii_case("false") || value == "0")
            }
            Self::Action(_) => true,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for AttrValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u64> for AttrValue {
    fn from(value: u64) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Action> for AttrValue {
    fn from(value: Action) -> Self {
        Self::Action(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listener {
    pub event: String,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub properties: BTreeMap<String, bool>,
    pub listeners: Vec<Listener>,
    pub children: Vec<ViewNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewNode {
    Element(Element),
    Text(String),
    /// Pre-escaped markup produced by this module's renderers.
    Markup(String),
}

/// Builds an element from a tag, an attribute/event map and its children.
pub fn el<'a>(
    tag: &str,
    attrs: impl IntoIterator<Item = (&'a str, AttrValue)>,
    children: impl IntoIterator<Item = ViewNode>,
) -> ViewNode {
    let mut element = Element::new(tag);
    for (key, value) in attrs {
        element.set(key, value);
    }
    element.children.extend(children);
    ViewNode::Element(element)
}

pub fn h(tag: &str) -> Element {
    Element::new(tag)
}

pub fn text(value: impl Into<String>) -> ViewNode {
    ViewNode::Text(value.into())
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn set(&mut self, key: &str, value: AttrValue) {
        if let Some(event) = key.strip_prefix(EVENT_PREFIX) {
            match value {
                AttrValue::Action(action) => self.listeners.push(Listener {
                    event: event.to_string(),
                    action,
                }),
                other => tracing::warn!(key, ?other, "event key without an action ignored"),
            }
            return;
        }

        if BOOLEAN_PROPERTIES.contains(&key) {
            self.properties.insert(key.to_string(), value.truthy());
            return;
        }

        match value {
            AttrValue::Text(text) => {
                self.attributes.insert(key.to_string(), text);
            }
            AttrValue::Bool(flag) => {
                self.attributes.insert(key.to_string(), flag.to_string());
            }
            AttrValue::Action(action) => {
                tracing::warn!(key, ?action, "action bound to a non-event key ignored");
            }
        }
    }

    pub fn attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.set(key, value.into());
        self
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id.into())
    }

    pub fn class(self, class: impl Into<String>) -> Self {
        self.attr("class", class.into())
    }

    pub fn on(self, event: &str, action: Action) -> Self {
        self.attr(&format!("{EVENT_PREFIX}{event}"), action)
    }

    pub fn child(mut self, child: impl Into<ViewNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = ViewNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn text(self, value: impl Into<String>) -> Self {
        self.child(ViewNode::Text(value.into()))
    }

    pub fn property(&self, name: &str) -> bool {
        self.properties.get(name).copied().unwrap_or(false)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn build(self) -> ViewNode {
        ViewNode::Element(self)
    }
}

impl From<Element> for ViewNode {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<&str> for ViewNode {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ViewNode {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl ViewNode {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Depth-first search for the first element matching `predicate`.
    pub fn find(&self, predicate: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        let element = self.as_element()?;
        if predicate(element) {
            return Some(element);
        }
        element
            .children
            .iter()
            .find_map(|child| child.find(predicate))
    }

    pub fn find_all<'a>(&'a self, predicate: &dyn Fn(&Element) -> bool, out: &mut Vec<&'a Element>) {
        if let Some(element) = self.as_element() {
            if predicate(element) {
                out.push(element);
            }
            for child in &element.children {
                child.find_all(predicate, out);
            }
        }
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        self.find(&|element| element.attribute("id") == Some(id))
    }

    /// Every action reachable from this subtree, in document order.
    pub fn actions(&self) -> Vec<&Action> {
        let mut out = Vec::new();
        self.collect_actions(&mut out);
        out
    }

    fn collect_actions<'a>(&'a self, out: &mut Vec<&'a Action>) {
        if let Some(element) = self.as_element() {
            out.extend(element.listeners.iter().map(|listener| &listener.action));
            for child in &element.children {
                child.collect_actions(out);
            }
        }
    }

    /// Visible text, with markup stripped and entities decoded.
    pub fn text_content(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Markup(markup) => markup_text(markup),
            Self::Element(element) => element
                .children
                .iter()
                .map(ViewNode::text_content)
                .collect(),
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Self::Text(value) => out.push_str(&escape_html(value)),
            Self::Markup(markup) => out.push_str(markup),
            Self::Element(element) => {
                let _ = write!(out, "<{}", element.tag);
                for (key, value) in &element.attributes {
                    let _ = write!(out, " {key}=\"{}\"", escape_attribute(value));
                }
                for (key, enabled) in &element.properties {
                    if *enabled {
                        let _ = write!(out, " {key}");
                    }
                }
                out.push('>');
                for child in &element.children {
                    child.write_html(out);
                }
                let _ = write!(out, "</{}>", element.tag);
            }
        }
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

pub fn escape_attribute(raw: &str) -> String {
    escape_html(raw).replace('"', "&quot;")
}

fn unescape_html(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Strips tags from markup produced by this module and decodes entities.
pub fn markup_text(markup: &str) -> String {
    let mut visible = String::with_capacity(markup.len());
    let mut in_tag = false;
    for ch in markup.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            other if !in_tag => visible.push(other),
            _ => {}
        }
    }
    unescape_html(&visible)
}

const JSON_INDENT: &str = "  ";

/// Syntax-highlighted, indented markup for an arbitrary JSON value.
pub fn json_markup(value: &Value) -> String {
    let mut out = String::new();
    write_json(&mut out, value, 0);
    out
}

fn write_json(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Null => out.push_str(r#"<span class="json-null">null</span>"#),
        Value::Bool(flag) => {
            let class = if *flag { "json-true" } else { "json-false" };
            let _ = write!(out, r#"<span class="json-bool {class}">{flag}</span>"#);
        }
        Value::Number(number) => {
            let _ = write!(out, r#"<span class="json-num">{number}</span>"#);
        }
        Value::String(string) => {
            let _ = write!(
                out,
                r#"<span class="json-str">{}</span>"#,
                escape_html(&quoted(string))
            );
        }
        Value::Array(items) => {
            if items.is_empty() {
                out.push_str("[]");
                return;
            }
            out.push_str("[\n");
            for (index, item) in items.iter().enumerate() {
                push_indent(out, depth + 1);
                write_json(out, item, depth + 1);
                if index + 1 < items.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            push_indent(out, depth);
            out.push(']');
        }
        Value::Object(map) => {
            if map.is_empty() {
                out.push_str("{}");
                return;
            }
            out.push_str("{\n");
            for (index, (key, item)) in map.iter().enumerate() {
                push_indent(out, depth + 1);
                let _ = write!(
                    out,
                    r#"<span class="json-key">{}</span>: "#,
                    escape_html(&quoted(key))
                );
                write_json(out, item, depth + 1);
                if index + 1 < map.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            push_indent(out, depth);
            out.push('}');
        }
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(JSON_INDENT);
    }
}

fn quoted(raw: &str) -> String {
    serde_json::to_string(raw).unwrap_or_else(|_| format!("\"{raw}\""))
}

pub fn json_view(value: &Value) -> ViewNode {
    h("pre")
        .class("json")
        .child(ViewNode::Markup(json_markup(value)))
        .build()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Warning,
    Error,
    Info,
    Neutral,
}

impl Tone {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Info => "info",
            Self::Neutral => "neutral",
        }
    }
}

pub fn badge(label: impl Into<String>, tone: Tone) -> ViewNode {
    h("span")
        .class(format!("badge badge-{}", tone.as_str()))
        .text(label)
        .build()
}

pub fn flag_badge(flag: bool, yes: &str, no: &str) -> ViewNode {
    if flag {
        badge(yes, Tone::Success)
    } else {
        badge(no, Tone::Neutral)
    }
}

pub fn status_dot(tone: Tone) -> ViewNode {
    h("span")
        .class(format!("status-dot status-{}", tone.as_str()))
        .build()
}

pub fn card(title: &str) -> Element {
    h("section")
        .class("card")
        .child(h("h3").class("card-title").text(title))
}

pub fn stat(label: &str, id: Option<&str>, value: impl Into<String>) -> ViewNode {
    let mut value_node = h("span").class("stat-value").text(value);
    if let Some(id) = id {
        value_node = value_node.id(id);
    }
    h("div")
        .class("stat")
        .child(h("span").class("stat-label").text(label))
        .child(value_node)
        .build()
}

pub fn button(label: &str, class: &str, action: Action) -> Element {
    h("button")
        .attr("type", "button")
        .class(format!("btn {class}"))
        .on("click", action)
        .text(label)
}

pub fn loading(message: &str) -> ViewNode {
    h("div")
        .class("loading")
        .child(h("span").class("spinner"))
        .text(message)
        .build()
}

pub fn empty_state(message: &str) -> ViewNode {
    h("div").class("empty").text(message).build()
}

pub fn error_panel(message: &str, raw: Option<&str>) -> ViewNode {
    let mut panel = h("div")
        .class("error-panel")
        .child(h("p").text(message));
    if let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) {
        panel = panel.child(h("pre").class("raw").text(raw));
    }
    panel.build()
}

pub fn table(headers: &[&str], rows: Vec<ViewNode>) -> ViewNode {
    let head = h("tr").children(
        headers
            .iter()
            .map(|header| h("th").text(*header).build()),
    );
    h("table")
        .class("table")
        .child(h("thead").child(head))
        .child(h("tbody").children(rows))
        .build()
}

pub fn text_input(id: &str, value: &str, placeholder: &str) -> ViewNode {
    h("input")
        .id(id)
        .attr("type", "text")
        .attr("value", value)
        .attr("placeholder", placeholder)
        .build()
}

pub fn checkbox(id: &str, checked: bool) -> ViewNode {
    h("input")
        .id(id)
        .attr("type", "checkbox")
        .attr("checked", checked)
        .build()
}

pub fn select(id: &str, options: &[&str], selected: &str) -> ViewNode {
    h("select")
        .id(id)
        .children(options.iter().map(|option| {
            h("option")
                .attr("value", *option)
                .attr("selected", *option == selected)
                .text(*option)
                .build()
        }))
        .build()
}

pub fn field(label: &str, control: ViewNode) -> ViewNode {
    h("label")
        .class("field")
        .child(h("span").class("field-label").text(label))
        .child(control)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn boolean_keys_become_live_properties() {
        let node = el(
            "button",
            [
                ("disabled", AttrValue::Bool(false)),
                ("checked", AttrValue::from("false")),
                ("open", AttrValue::Bool(true)),
                ("title", AttrValue::from("hi")),
            ],
            [text("Go")],
        );
        let element = node.as_element().expect("element");
        assert!(!element.property("disabled"));
        assert!(!element.property("checked"));
        assert!(element.property("open"));
        assert!(element.attribute("disabled").is_none());
        assert_eq!(element.attribute("title"), Some("hi"));
        assert_eq!(node.to_html(), r#"<button title="hi" open>Go</button>"#);
    }

    #[test]
    fn event_keys_bind_listeners_not_attributes() {
        let node = el(
            "button",
            [("on:click", AttrValue::Action(Action::StartLoop))],
            Vec::<ViewNode>::new(),
        );
        let element = node.as_element().expect("element");
        assert!(element.attributes.is_empty());
        assert_eq!(
            element.listeners,
            vec![Listener {
                event: "click".to_string(),
                action: Action::StartLoop
            }]
        );
    }

    #[test]
    fn text_children_are_escaped() {
        let node = h("p").text("<b>&</b>").build();
        assert_eq!(node.to_html(), "<p>&lt;b&gt;&amp;&lt;/b&gt;</p>");
        assert_eq!(node.text_content(), "<b>&</b>");
    }

    #[test]
    fn json_markup_renders_empty_containers_inline() {
        assert_eq!(markup_text(&json_markup(&json!([]))), "[]");
        assert_eq!(markup_text(&json_markup(&json!({}))), "{}");
        assert_eq!(
            markup_text(&json_markup(&json!({"a": [1, true, null]}))),
            "{\n  \"a\": [\n    1,\n    true,\n    null\n  ]\n}"
        );
    }

    #[test]
    fn json_markup_escapes_hostile_strings() {
        let markup = json_markup(&json!({"<k>": "</span><script>&"}));
        assert!(!markup.contains("<script>"));
        assert!(markup.contains("&lt;/span&gt;&lt;script&gt;&amp;"));
        assert!(markup.contains(r#"class="json-key""#));
    }

    #[test]
    fn booleans_are_color_coded() {
        assert!(json_markup(&json!(true)).contains("json-true"));
        assert!(json_markup(&json!(false)).contains("json-false"));
    }

    #[test]
    fn select_marks_chosen_option_as_property() {
        let node = select("net", &["mainnet", "testnet11"], "testnet11");
        let options: Vec<bool> = node
            .as_element()
            .expect("select")
            .children
            .iter()
            .filter_map(ViewNode::as_element)
            .map(|option| option.property("selected"))
            .collect();
        assert_eq!(options, vec![false, true]);
    }
}
