pub mod boot_config;
#[cfg(target_arch = "wasm32")]
mod wasm_constants;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use futures::StreamExt;
    use futures::future::LocalBoxFuture;
    use gloo_net::http::{Request, Response};
    use gloo_timers::callback::{Interval, Timeout};
    use gloo_timers::future::TimeoutFuture;
    use greenfloor_dashboard_core::error::decode_reply;
    use greenfloor_dashboard_core::navigation::nav_view;
    use greenfloor_dashboard_core::patcher::{CardPatch, loop_card_class};
    use greenfloor_dashboard_core::view::{Tone, ViewNode, h};
    use greenfloor_dashboard_core::{
        Action, ApiClient, ApiError, ByteStream, DashboardShell, HttpTransport, Page, RawReply,
        Runtime, Services, Surface, TimerGuard,
    };
    use greenfloor_dashboard_core::surface::ControlState;
    use serde_json::Value;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::{JsFuture, spawn_local};
    use web_sys::{Document, Element, Event, Node, Window};

    use crate::boot_config;
    use crate::wasm_constants::*;

    mod dom;
    mod lifecycle;
    mod network;
    mod routing;

    use dom::*;
    use lifecycle::*;
    use network::*;
    use routing::*;

    thread_local! {
        static SHELL: RefCell<Option<Rc<DashboardShell>>> = const { RefCell::new(None) };
        static LISTENERS: RefCell<ListenerRegistry> = RefCell::new(ListenerRegistry::default());
    }

    #[wasm_bindgen(start)]
    pub fn start() {
        console_error_panic_hook::set_once();
        install_tracing();
        if let Err(error) = boot() {
            report_boot_error(&error);
        }
    }

    /// Shows `page` by name; unknown names land on the dashboard.
    #[wasm_bindgen]
    pub fn navigate(page: String) {
        with_shell(|shell| shell.navigate_to(&page));
    }

    #[wasm_bindgen]
    pub fn current_page() -> String {
        SHELL
            .with(|slot| slot.borrow().as_ref().map(|shell| shell.current_page()))
            .unwrap_or(Page::Dashboard)
            .name()
            .to_string()
    }

    fn boot() -> Result<(), String> {
        let window = web_sys::window().ok_or_else(|| "window is unavailable".to_string())?;
        let document = window
            .document()
            .ok_or_else(|| "document is unavailable".to_string())?;

        let published = published_config(&window);
        let query = window.location().search().unwrap_or_default();
        let boot = boot_config::resolve(published.as_deref(), &query);
        for rejected in &boot.rejected {
            tracing::warn!(error = %rejected, "ignoring rejected configuration layer");
        }
        let config = boot.config;
        tracing::info!(
            api = %config.api_base_url,
            poll_ms = config.poll_interval_ms,
            network = %config.network,
            "booting dashboard"
        );

        ensure_shell_dom(&document)?;

        let api = ApiClient::new(BrowserTransport::new(config.api_base_url.clone()));
        let services = Services::new(
            Rc::new(api),
            Rc::new(BrowserSurface::new(document.clone())),
            Rc::new(BrowserRuntime),
            config,
        );
        let shell = DashboardShell::new(Rc::new(services));
        SHELL.with(|slot| slot.replace(Some(Rc::clone(&shell))));

        render_nav(&document)?;
        shell.navigate(Page::Dashboard, None);
        Ok(())
    }

    /// The host page may publish a configuration object on `window` before loading us.
    fn published_config(window: &Window) -> Option<String> {
        let value = js_sys::Reflect::get(window, &JsValue::from_str(CONFIG_GLOBAL)).ok()?;
        if value.is_undefined() || value.is_null() {
            return None;
        }
        js_sys::JSON::stringify(&value)
            .ok()
            .and_then(|json| json.as_string())
    }
}
