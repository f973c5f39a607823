use crate::actions::Action;
use crate::navigation::Page;
use crate::patcher::CardPatch;
use crate::view::{Tone, ViewNode};

/// Enabled state and optional replacement label for a button-like control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    pub disabled: bool,
    pub label: Option<String>,
}

impl ControlState {
    pub fn busy(label: impl Into<String>) -> Self {
        Self {
            disabled: true,
            label: Some(label.into()),
        }
    }

    pub fn ready(label: impl Into<String>) -> Self {
        Self {
            disabled: false,
            label: Some(label.into()),
        }
    }

    pub fn enabled() -> Self {
        Self {
            disabled: false,
            label: None,
        }
    }
}

/// The mutable document the controllers drive.
///
/// Id-addressed writes return `false` when no element with that id is attached,
/// which is how a stale continuation learns its page is gone.
pub trait Surface {
    /// Highlights the nav entry and sets the page title.
    fn set_active_page(&self, page: Page);
    /// Clears the content region and the top bar, releasing their listeners.
    fn reset_page(&self);
    fn set_top_bar(&self, nodes: Vec<ViewNode>);
    fn set_content(&self, node: ViewNode);
    /// Replaces the element with `id` by `node`.
    fn replace(&self, id: &str, node: ViewNode) -> bool;
    fn set_text(&self, id: &str, text: &str) -> bool;
    fn set_control(&self, id: &str, state: &ControlState) -> bool;
    fn input_value(&self, id: &str) -> Option<String>;
    fn checkbox_value(&self, id: &str) -> Option<bool>;
    /// Appends a line to a terminal and scrolls it to the bottom. `clear_placeholder`
    /// is set for the first line only.
    fn append_terminal_line(&self, terminal_id: &str, line: ViewNode, clear_placeholder: bool) -> bool;
    /// Patches the market loop card in place. `false` when the card is gone.
    fn patch_loop_card(&self, patch: &CardPatch) -> bool;
    /// Shows a modal over a backdrop; clicking the backdrop dispatches `backdrop`.
    fn show_modal(&self, body: ViewNode, backdrop: Action);
    fn close_modal(&self);
    fn toast(&self, message: &str, tone: Tone);
    /// Blocking notice for destructive or start-blocking failures.
    fn alert(&self, message: &str);
}
