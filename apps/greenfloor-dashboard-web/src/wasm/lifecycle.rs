use super::*;

use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;

/// Timers on the browser event loop, futures on the microtask queue.
pub(super) struct BrowserRuntime;

enum BrowserTimer {
    Once(Timeout),
    Every(Interval),
}

/// Cancels its timer on drop. The callback closure is released on the next tick
/// because the guard may be dropped from inside that callback.
struct TimerHandle(Option<BrowserTimer>);

impl Drop for TimerHandle {
    fn drop(&mut self) {
        match self.0.take() {
            Some(BrowserTimer::Once(timeout)) => {
                let callback = timeout.cancel();
                spawn_local(async move { drop(callback) });
            }
            Some(BrowserTimer::Every(interval)) => {
                let callback = interval.cancel();
                spawn_local(async move { drop(callback) });
            }
            None => {}
        }
    }
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

impl Runtime for BrowserRuntime {
    fn interval(&self, period: Duration, mut tick: Box<dyn FnMut()>) -> TimerGuard {
        let interval = Interval::new(millis(period), move || tick());
        TimerGuard::new(TimerHandle(Some(BrowserTimer::Every(interval))))
    }

    fn timeout(&self, delay: Duration, fire: Box<dyn FnOnce()>) -> TimerGuard {
        let timeout = Timeout::new(millis(delay), fire);
        TimerGuard::new(TimerHandle(Some(BrowserTimer::Once(timeout))))
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        spawn_local(task);
    }
}

/// Routes formatted tracing lines to the matching `console` method.
struct ConsoleWriter;

impl<'a> MakeWriter<'a> for ConsoleWriter {
    type Writer = ConsoleLine;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleLine::new(Level::INFO)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleLine::new(*meta.level())
    }
}

struct ConsoleLine {
    level: Level,
    buffer: Vec<u8>,
}

impl ConsoleLine {
    fn new(level: Level) -> Self {
        Self {
            level,
            buffer: Vec::new(),
        }
    }
}

impl io::Write for ConsoleLine {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleLine {
    fn drop(&mut self) {
        let line = String::from_utf8_lossy(&self.buffer);
        let line = JsValue::from_str(line.trim_end());
        if self.level == Level::ERROR {
            web_sys::console::error_1(&line);
        } else if self.level == Level::WARN {
            web_sys::console::warn_1(&line);
        } else if self.level == Level::INFO {
            web_sys::console::info_1(&line);
        } else {
            web_sys::console::debug_1(&line);
        }
    }
}

pub(super) fn install_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_writer(ConsoleWriter)
        .with_ansi(false)
        .without_time()
        .with_max_level(Level::DEBUG)
        .try_init();
    if installed.is_err() {
        web_sys::console::warn_1(&JsValue::from_str("tracing subscriber already installed"));
    }
}

fn shell_layout() -> ViewNode {
    h("div")
        .id(APP_ROOT_ID)
        .child(h("nav").id(NAV_ID))
        .child(
            h("main")
                .child(
                    h("header")
                        .class("page-header")
                        .child(h("h1").id(PAGE_TITLE_ID))
                        .child(h("div").id(TOP_BAR_ID)),
                )
                .child(h("div").id(CONTENT_ID)),
        )
        .child(h("div").id(MODAL_ROOT_ID))
        .child(h("div").id(TOAST_ROOT_ID))
        .build()
}

/// Installs the stylesheet and the page skeleton once.
pub(super) fn ensure_shell_dom(document: &Document) -> Result<(), String> {
    let body = document
        .body()
        .ok_or_else(|| "document body is unavailable".to_string())?;

    if document.get_element_by_id(STYLE_ID).is_none() {
        let head = document
            .head()
            .ok_or_else(|| "document head is unavailable".to_string())?;
        let style = document
            .create_element("style")
            .map_err(|_| "failed to create stylesheet".to_string())?;
        style.set_id(STYLE_ID);
        style.set_text_content(Some(DASHBOARD_CSS));
        head.append_child(&style)
            .map_err(|_| "failed to attach stylesheet".to_string())?;
    }

    if document.get_element_by_id(APP_ROOT_ID).is_none() {
        let layout = materialize(document, &shell_layout(), Region::Chrome)
            .map_err(|_| "failed to build dashboard layout".to_string())?;
        body.append_child(&layout)
            .map_err(|_| "failed to attach dashboard layout".to_string())?;
    }
    Ok(())
}

/// Leaves a visible notice when the dashboard cannot start.
pub(super) fn report_boot_error(error: &str) {
    tracing::error!(error, "dashboard boot failed");
    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        return;
    };
    let Some(body) = document.body() else {
        return;
    };
    let status = match document.get_element_by_id(BOOT_STATUS_ID) {
        Some(existing) => existing,
        None => {
            let Ok(element) = document.create_element("div") else {
                return;
            };
            element.set_id(BOOT_STATUS_ID);
            element.set_class_name("error-panel");
            if body.append_child(&element).is_err() {
                return;
            }
            element
        }
    };
    status.set_text_content(Some(format!("Dashboard failed to start: {error}").as_str()));
}
