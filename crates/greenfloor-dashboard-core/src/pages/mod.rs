//! One controller per named page.
//!
//! A controller resets nothing itself: the shell has already cleared the page and
//! opened a fresh [`PageScope`]. Each controller renders its top bar first, shows a
//! loading state, fetches, then swaps in the finished content. Every write after an
//! await goes through [`PageCx`], which drops it once the visit is over.

pub mod build;
pub mod coins;
pub mod config;
pub mod dashboard;
pub mod markets;
pub mod offers;
pub mod settings;

use std::rc::Rc;

use crate::api::{DashboardApi, StreamRequest};
use crate::error::ApiError;
use crate::models::CommandOutput;
use crate::navigation::Page;
use crate::runtime::{PageScope, TimerGuard};
use crate::services::Services;
use crate::sse::{StreamEvent, StreamOutcome};
use crate::surface::{ControlState, Surface};
use crate::terminal::Terminal;
use crate::view::{Tone, ViewNode, badge, error_panel, h, json_view, loading};

/// Handle a controller holds for one page visit.
#[derive(Clone)]
pub struct PageCx {
    pub services: Rc<Services>,
    pub scope: Rc<PageScope>,
}

impl PageCx {
    pub fn new(services: Rc<Services>, scope: Rc<PageScope>) -> Self {
        Self { services, scope }
    }

    pub fn api(&self) -> &dyn DashboardApi {
        self.services.api.as_ref()
    }

    pub fn surface(&self) -> &dyn Surface {
        self.services.surface.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.scope.is_live()
    }

    pub fn show(&self, node: ViewNode) -> bool {
        if !self.is_live() {
            return false;
        }
        self.surface().set_content(node);
        true
    }

    pub fn replace(&self, id: &str, node: ViewNode) -> bool {
        self.is_live() && self.surface().replace(id, node)
    }

    pub fn set_control(&self, id: &str, state: &ControlState) -> bool {
        self.is_live() && self.surface().set_control(id, state)
    }

    pub fn set_text(&self, id: &str, text: &str) -> bool {
        self.is_live() && self.surface().set_text(id, text)
    }

    pub fn input(&self, id: &str) -> String {
        self.surface()
            .input_value(id)
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    }

    pub fn checked(&self, id: &str) -> bool {
        self.surface().checkbox_value(id).unwrap_or(false)
    }

    pub fn toast(&self, message: &str, tone: Tone) {
        self.surface().toast(message, tone);
    }

    /// Keeps a transient timer alive until the visit ends.
    pub fn hold(&self, guard: TimerGuard) {
        self.scope.hold(guard);
    }

    pub fn top_bar(&self, nodes: Vec<ViewNode>) {
        self.surface().set_top_bar(nodes);
    }

    pub fn loading(&self, message: &str) {
        self.show(loading(message));
    }
}

pub async fn render(page: Page, cx: &PageCx) {
    tracing::debug!(page = page.name(), "rendering page");
    match page {
        Page::Dashboard => dashboard::render(cx).await,
        Page::Markets => markets::render(cx).await,
        Page::Offers => offers::render(cx).await,
        Page::Coins => coins::render(cx).await,
        Page::Build => build::render(cx).await,
        Page::Config => config::render(cx).await,
        Page::Settings => settings::render(cx).await,
    }
}

/// Placeholder for a failed fetch, with the raw body when one was captured.
pub fn fetch_failure(what: &str, error: &ApiError) -> ViewNode {
    error_panel(
        &format!("Could not load {what}. {}", error.operator_message()),
        error.raw_text(),
    )
}

/// Output of a manager CLI run: parsed JSON when available, raw text otherwise.
pub fn command_output_view(output: &CommandOutput) -> ViewNode {
    let status = match (output.ok, output.exit_code) {
        (true, _) => badge("ok", Tone::Success),
        (false, Some(code)) => badge(format!("exit {code}"), Tone::Error),
        (false, None) => badge("failed", Tone::Error),
    };
    let mut view = h("div")
        .class("command-output")
        .child(
            h("div")
                .class("command-header")
                .child(status)
                .child(h("code").class("muted").text(output.command_line())),
        );

    if let Some(error) = output.error.as_deref().filter(|error| !error.is_empty()) {
        view = view.child(h("p").class("error").text(crate::error::describe_backend_error(error)));
    }
    view = match output.parsed() {
        Some(parsed) => view.child(json_view(parsed)),
        None if !output.raw.trim().is_empty() => {
            view.child(h("pre").class("raw").text(output.raw.clone()))
        }
        None => view.child(h("p").class("muted").text("No output.")),
    };
    if !output.stderr.trim().is_empty() {
        view = view.child(h("pre").class("stderr").text(output.stderr.clone()));
    }
    view.build()
}

/// Resets a terminal element, streams a command into it and re-enables `control`.
pub async fn run_streamed(cx: &PageCx, request: StreamRequest, terminal_id: &str, control: (&str, &str)) {
    let (control_id, label) = control;
    if !cx.replace(terminal_id, Terminal::view(terminal_id, "Starting…")) {
        return;
    }
    cx.set_control(control_id, &ControlState::busy("Running…"));

    let mut terminal = Terminal::new(terminal_id);
    let token = cx.scope.token();
    let surface = Rc::clone(&cx.services.surface);
    let outcome = cx
        .api()
        .stream(&request, &token, &mut |event| {
            terminal.accept(&event, surface.as_ref());
        })
        .await;

    match outcome {
        Ok(StreamOutcome::Completed { delivered }) => {
            tracing::info!(path = request.path(), delivered, "command stream finished");
        }
        Ok(StreamOutcome::Abandoned) => {
            tracing::debug!(path = request.path(), "command stream abandoned");
            return;
        }
        Err(error) => {
            tracing::warn!(%error, path = request.path(), "command stream failed");
            if cx.is_live() {
                terminal.accept(
                    &StreamEvent::Error {
                        message: error.operator_message(),
                    },
                    cx.surface(),
                );
            }
        }
    }
    cx.set_control(control_id, &ControlState::ready(label));
}

/// Turns an operator-entered amount into a positive integer.
pub fn parse_positive(raw: &str, field: &str) -> Result<u64, String> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| format!("{field} must be a positive whole number"))
}

/// Element id fragment for a backend identifier.
pub fn dom_id(raw: &str) -> String {
    raw.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '-' })
        .collect()
}
