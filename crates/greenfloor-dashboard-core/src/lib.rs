//! Rendering, live-state sync and pre-flight engine for the GreenFloor operator dashboard.
//!
//! Target independent: the browser is reached only through the [`DashboardApi`],
//! [`Surface`] and [`Runtime`] seams, so every controller runs and is tested on the host.

pub mod actions;
pub mod api;
pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod navigation;
pub mod pages;
pub mod patcher;
pub mod preflight;
pub mod runtime;
pub mod services;
pub mod shell;
pub mod sse;
pub mod surface;
pub mod terminal;
pub mod view;

#[cfg(test)]
mod testing;

pub use actions::Action;
pub use api::{ApiClient, ByteStream, DashboardApi, HttpTransport, RawReply, StreamRequest};
pub use config::{ConfigError, DashboardConfig};
pub use error::{ApiError, StartBlocked};
pub use navigation::{Handoff, Page, PageContext};
pub use runtime::{LiveToken, PageScope, PollSlot, Runtime, TimerGuard};
pub use services::Services;
pub use shell::DashboardShell;
pub use sse::{SseDecoder, StreamEvent, StreamOutcome};
pub use surface::{ControlState, Surface};
pub use view::{Element, ViewNode};
