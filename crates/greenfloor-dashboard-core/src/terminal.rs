use serde_json::Value;

use crate::sse::StreamEvent;
use crate::surface::Surface;
use crate::view::{ViewNode, h};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonSeverity {
    Error,
    Warning,
    Success,
    Neutral,
}

const SUCCESS_MARKERS: [&str; 4] = ["ok", "success", "confirm", "done"];

/// Severity of a structured output line. `ok: false` always wins; otherwise the
/// event name (`event`, falling back to `type`) is searched for error, warning and
/// success markers in that order.
pub fn classify_json_line(payload: &Value) -> JsonSeverity {
    let ok = payload.get("ok").and_then(Value::as_bool);
    let name = ["event", "type"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str).filter(|name| !name.is_empty()))
        .unwrap_or_default()
        .to_ascii_lowercase();

    if ok == Some(false) || name.contains("error") || name.contains("fail") {
        JsonSeverity::Error
    } else if name.contains("warn") {
        JsonSeverity::Warning
    } else if SUCCESS_MARKERS.iter().any(|marker| name.contains(marker)) {
        JsonSeverity::Success
    } else {
        JsonSeverity::Neutral
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Command,
    Json(JsonSeverity),
    Text,
    Stderr,
    Done { ok: bool },
    Failure,
}

impl LineKind {
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Command => "term-cmd",
            Self::Json(JsonSeverity::Error) => "term-json-error",
            Self::Json(JsonSeverity::Warning) => "term-json-warn",
            Self::Json(JsonSeverity::Success) => "term-json-ok",
            Self::Json(JsonSeverity::Neutral) => "term-json",
            Self::Text => "term-text",
            Self::Stderr => "term-stderr",
            Self::Done { ok: true } => "term-done-ok",
            Self::Done { ok: false } => "term-done-fail",
            Self::Failure => "term-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalLine {
    pub kind: LineKind,
    pub text: String,
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl TerminalLine {
    pub fn from_event(event: &StreamEvent) -> Self {
        let (kind, text) = match event {
            StreamEvent::Cmd { cmd } => (LineKind::Command, format!("$ {cmd}")),
            StreamEvent::JsonLine(payload) => (
                LineKind::Json(classify_json_line(payload)),
                display_value(payload),
            ),
            StreamEvent::TextLine(text) => (LineKind::Text, text.clone()),
            StreamEvent::StderrText(payload) | StreamEvent::StderrLine(payload) => {
                (LineKind::Stderr, display_value(payload))
            }
            StreamEvent::Done { exit_code, ok } => {
                let code = exit_code.map_or_else(|| "?".to_string(), |code| code.to_string());
                let verdict = if *ok { "✔ completed" } else { "✘ failed" };
                (LineKind::Done { ok: *ok }, format!("{verdict} (exit code {code})"))
            }
            StreamEvent::Error { message } => (LineKind::Failure, format!("error: {message}")),
        };
        Self { kind, text }
    }

    pub fn view(&self) -> ViewNode {
        h("div")
            .class(format!("term-line {}", self.kind.css_class()))
            .text(self.text.clone())
            .build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    Empty,
    HasLines,
}

/// Append-only output log bound to one terminal element.
#[derive(Debug)]
pub struct Terminal {
    id: String,
    state: TerminalState,
    lines: usize,
}

impl Terminal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: TerminalState::Empty,
            lines: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> TerminalState {
        self.state
    }

    pub fn line_count(&self) -> usize {
        self.lines
    }

    pub fn placeholder_id(id: &str) -> String {
        format!("{id}-placeholder")
    }

    /// Initial markup: an empty log showing `placeholder`.
    pub fn view(id: &str, placeholder: &str) -> ViewNode {
        h("div")
            .id(id)
            .class("terminal")
            .child(
                h("div")
                    .id(Self::placeholder_id(id))
                    .class("term-placeholder")
                    .text(placeholder),
            )
            .build()
    }

    /// Appends one line. Returns `false` once the terminal element is gone.
    pub fn accept(&mut self, event: &StreamEvent, surface: &dyn Surface) -> bool {
        let line = TerminalLine::from_event(event);
        let first = self.state == TerminalState::Empty;
        if !surface.append_terminal_line(&self.id, line.view(), first) {
            return false;
        }
        self.state = TerminalState::HasLines;
        self.lines += 1;
        true
    }
}
