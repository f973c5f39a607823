//! In-crate fakes for the three seams: a scripted transport, a surface that keeps a
//! real view tree, and a runtime with a simulated clock.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::oneshot;
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::stream;
use futures::task::LocalSpawnExt;
use serde_json::Value;

use crate::actions::Action;
use crate::api::{ApiClient, ByteStream, HttpTransport, RawReply};
use crate::config::DashboardConfig;
use crate::error::ApiError;
use crate::navigation::Page;
use crate::patcher::{CardPatch, LOOP_CARD_ID, LOOP_TOGGLE_SLOT_ID};
use crate::runtime::{Runtime, TimerGuard};
use crate::services::Services;
use crate::surface::{ControlState, Surface};
use crate::view::{Element, Tone, ViewNode};

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TransportState {
    queued: HashMap<String, VecDeque<RawReply>>,
    sticky: HashMap<String, RawReply>,
    streams: HashMap<String, Vec<Vec<u8>>>,
    calls: Vec<String>,
    bodies: Vec<(String, Value)>,
    stalled: BTreeSet<String>,
    waiting: Vec<(String, oneshot::Sender<()>)>,
}

/// Replies keyed by `"METHOD path"`, path including the query string.
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Rc<RefCell<TransportState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every matching request with `200` and `body`.
    pub fn respond(&self, key: &str, body: &str) {
        self.respond_with(key, 200, body);
    }

    pub fn respond_with(&self, key: &str, status: u16, body: &str) {
        self.state.borrow_mut().sticky.insert(
            key.to_string(),
            RawReply {
                status,
                body: body.to_string(),
            },
        );
    }

    /// Answers the next matching request only; queued replies win over sticky ones.
    pub fn respond_once(&self, key: &str, body: &str) {
        self.state
            .borrow_mut()
            .queued
            .entry(key.to_string())
            .or_default()
            .push_back(RawReply::ok(body));
    }

    pub fn stream(&self, path: &str, chunks: Vec<Vec<u8>>) {
        self.state.borrow_mut().streams.insert(path.to_string(), chunks);
    }

    pub fn count(&self, key: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| call.as_str() == key)
            .count()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn posted(&self, path: &str) -> Vec<Value> {
        self.state
            .borrow()
            .bodies
            .iter()
            .filter(|(posted, _)| posted == path)
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// Holds matching requests open until [`FakeTransport::release`].
    pub fn stall(&self, key: &str) {
        self.state.borrow_mut().stalled.insert(key.to_string());
    }

    pub fn release(&self, key: &str) {
        let mut state = self.state.borrow_mut();
        state.stalled.remove(key);
        let (released, still_waiting) = std::mem::take(&mut state.waiting)
            .into_iter()
            .partition::<Vec<_>, _>(|(waiting, _)| waiting == key);
        state.waiting = still_waiting;
        drop(state);
        for (_, waiter) in released {
            let _ = waiter.send(());
        }
    }

    /// Records the call and, for a stalled key, hands back the gate to wait on.
    fn begin(&self, key: &str) -> Option<oneshot::Receiver<()>> {
        let mut state = self.state.borrow_mut();
        state.calls.push(key.to_string());
        if !state.stalled.contains(key) {
            return None;
        }
        let (open, gate) = oneshot::channel();
        state.waiting.push((key.to_string(), open));
        Some(gate)
    }

    async fn reply(&self, key: String) -> Result<RawReply, ApiError> {
        if let Some(gate) = self.begin(&key) {
            let _ = gate.await;
        }
        let mut state = self.state.borrow_mut();
        if let Some(reply) = state.queued.get_mut(&key).and_then(VecDeque::pop_front) {
            return Ok(reply);
        }
        state
            .sticky
            .get(&key)
            .cloned()
            .ok_or_else(|| ApiError::network(format!("no reply scripted for {key}")))
    }
}

#[async_trait(?Send)]
impl HttpTransport for FakeTransport {
    async fn get(&self, path: &str) -> Result<RawReply, ApiError> {
        self.reply(format!("GET {path}")).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<RawReply, ApiError> {
        self.state
            .borrow_mut()
            .bodies
            .push((path.to_string(), body.clone()));
        self.reply(format!("POST {path}")).await
    }

    async fn post_stream(&self, path: &str, body: &Value) -> Result<ByteStream, ApiError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(format!("POST {path}"));
        state.bodies.push((path.to_string(), body.clone()));
        let chunks = state
            .streams
            .get(path)
            .cloned()
            .ok_or_else(|| ApiError::network(format!("no stream scripted for {path}")))?;
        Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
    }
}

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SurfaceState {
    content: Option<ViewNode>,
    top_bar: Vec<ViewNode>,
    modal: Option<(ViewNode, Action)>,
    phantom: BTreeSet<String>,
    active_page: Option<Page>,
    toasts: Vec<(String, Tone)>,
    alerts: Vec<String>,
    inputs: HashMap<String, String>,
    checks: HashMap<String, bool>,
    controls: HashMap<String, ControlState>,
    terminal_lines: HashMap<String, Vec<ViewNode>>,
    patches: usize,
}

impl SurfaceState {
    fn roots_mut(&mut self) -> impl Iterator<Item = &mut ViewNode> {
        self.content
            .iter_mut()
            .chain(self.top_bar.iter_mut())
            .chain(self.modal.iter_mut().map(|(body, _)| body))
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.roots_mut().find_map(|root| find_mut(root, id))
    }

    fn find(&self, id: &str) -> Option<&Element> {
        self.content
            .iter()
            .chain(self.top_bar.iter())
            .chain(self.modal.iter().map(|(body, _)| body))
            .find_map(|root| root.find_by_id(id))
    }

    fn is_attached(&self, id: &str) -> bool {
        self.phantom.contains(id) || self.find(id).is_some()
    }
}

fn find_mut<'a>(node: &'a mut ViewNode, id: &str) -> Option<&'a mut Element> {
    let ViewNode::Element(element) = node else {
        return None;
    };
    if element.attribute("id") == Some(id) {
        return Some(element);
    }
    element
        .children
        .iter_mut()
        .find_map(|child| find_mut(child, id))
}

fn replace_in(node: &mut ViewNode, id: &str, replacement: &mut Option<ViewNode>) -> bool {
    let ViewNode::Element(element) = node else {
        return false;
    };
    if element.attribute("id") == Some(id) {
        if let Some(new) = replacement.take() {
            *node = new;
        }
        return true;
    }
    element
        .children
        .iter_mut()
        .any(|child| replace_in(child, id, replacement))
}

/// Keeps the rendered tree so tests can read back what a controller produced.
/// Ids registered with [`FakeSurface::attach`] count as attached without markup.
#[derive(Default)]
pub struct FakeSurface {
    state: RefCell<SurfaceState>,
}

impl FakeSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, id: &str) {
        self.state.borrow_mut().phantom.insert(id.to_string());
    }

    pub fn detach(&self, id: &str) {
        let mut state = self.state.borrow_mut();
        state.phantom.remove(id);
        let mut removal = Some(ViewNode::Text(String::new()));
        state
            .roots_mut()
            .any(|root| replace_in(root, id, &mut removal));
    }

    pub fn patch_count(&self) -> usize {
        self.state.borrow().patches
    }

    pub fn toasts(&self) -> Vec<(String, Tone)> {
        self.state.borrow().toasts.clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.state.borrow().alerts.clone()
    }

    pub fn modal(&self) -> Option<ViewNode> {
        self.state.borrow().modal.as_ref().map(|(body, _)| body.clone())
    }

    pub fn active_page(&self) -> Option<Page> {
        self.state.borrow().active_page
    }

    pub fn content(&self) -> Option<ViewNode> {
        self.state.borrow().content.clone()
    }

    pub fn content_text(&self) -> String {
        self.content().map(|node| node.text_content()).unwrap_or_default()
    }

    pub fn top_bar_actions(&self) -> Vec<Action> {
        self.state
            .borrow()
            .top_bar
            .iter()
            .flat_map(|node| node.actions().into_iter().cloned())
            .collect()
    }

    pub fn element(&self, id: &str) -> Option<Element> {
        self.state.borrow().find(id).cloned()
    }

    pub fn control(&self, id: &str) -> Option<ControlState> {
        self.state.borrow().controls.get(id).cloned()
    }

    pub fn terminal_lines(&self, id: &str) -> Vec<ViewNode> {
        self.state
            .borrow()
            .terminal_lines
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Types into an input, overriding whatever the markup carried.
    pub fn set_input(&self, id: &str, value: &str) {
        self.state
            .borrow_mut()
            .inputs
            .insert(id.to_string(), value.to_string());
    }

    pub fn set_checked(&self, id: &str, checked: bool) {
        self.state.borrow_mut().checks.insert(id.to_string(), checked);
    }

    pub fn input(&self, id: &str) -> Option<String> {
        self.input_value(id)
    }
}

fn select_value(element: &Element) -> Option<String> {
    let options: Vec<&Element> = element
        .children
        .iter()
        .filter_map(ViewNode::as_element)
        .filter(|option| option.tag == "option")
        .collect();
    options
        .iter()
        .find(|option| option.property("selected"))
        .or_else(|| options.first())
        .and_then(|option| option.attribute("value"))
        .map(str::to_string)
}

impl Surface for FakeSurface {
    fn set_active_page(&self, page: Page) {
        self.state.borrow_mut().active_page = Some(page);
    }

    fn reset_page(&self) {
        let mut state = self.state.borrow_mut();
        state.content = None;
        state.top_bar.clear();
        state.inputs.clear();
        state.checks.clear();
    }

    fn set_top_bar(&self, nodes: Vec<ViewNode>) {
        self.state.borrow_mut().top_bar = nodes;
    }

    fn set_content(&self, node: ViewNode) {
        self.state.borrow_mut().content = Some(node);
    }

    fn replace(&self, id: &str, node: ViewNode) -> bool {
        let mut state = self.state.borrow_mut();
        let mut replacement = Some(node);
        let replaced = state
            .roots_mut()
            .any(|root| replace_in(root, id, &mut replacement));
        replaced || state.phantom.contains(id)
    }

    fn set_text(&self, id: &str, text: &str) -> bool {
        let mut state = self.state.borrow_mut();
        if let Some(element) = state.find_mut(id) {
            element.children = vec![ViewNode::Text(text.to_string())];
            return true;
        }
        state.phantom.contains(id)
    }

    fn set_control(&self, id: &str, control: &ControlState) -> bool {
        let mut state = self.state.borrow_mut();
        let attached = match state.find_mut(id) {
            Some(element) => {
                element.properties.insert("disabled".to_string(), control.disabled);
                if let Some(label) = &control.label {
                    element.children = vec![ViewNode::Text(label.clone())];
                }
                true
            }
            None => state.phantom.contains(id),
        };
        if attached {
            state.controls.insert(id.to_string(), control.clone());
        }
        attached
    }

    fn input_value(&self, id: &str) -> Option<String> {
        let state = self.state.borrow();
        if let Some(value) = state.inputs.get(id) {
            return Some(value.clone());
        }
        let element = state.find(id)?;
        if element.tag == "select" {
            return select_value(element);
        }
        Some(element.attribute("value").unwrap_or_default().to_string())
    }

    fn checkbox_value(&self, id: &str) -> Option<bool> {
        let state = self.state.borrow();
        if let Some(checked) = state.checks.get(id) {
            return Some(*checked);
        }
        state.find(id).map(|element| element.property("checked"))
    }

    fn append_terminal_line(&self, terminal_id: &str, line: ViewNode, clear_placeholder: bool) -> bool {
        let mut state = self.state.borrow_mut();
        let placeholder = crate::terminal::Terminal::placeholder_id(terminal_id);
        let attached = match state.find_mut(terminal_id) {
            Some(terminal) => {
                if clear_placeholder {
                    terminal.children.retain(|child| {
                        child
                            .as_element()
                            .is_none_or(|element| element.attribute("id") != Some(placeholder.as_str()))
                    });
                }
                terminal.children.push(line.clone());
                true
            }
            None => state.phantom.contains(terminal_id),
        };
        if attached {
            state
                .terminal_lines
                .entry(terminal_id.to_string())
                .or_default()
                .push(line);
        }
        attached
    }

    fn patch_loop_card(&self, patch: &CardPatch) -> bool {
        let mut state = self.state.borrow_mut();
        if !state.is_attached(LOOP_CARD_ID) {
            return false;
        }
        state.patches += 1;
        for (id, text) in &patch.stats {
            if let Some(element) = state.find_mut(id) {
                element.children = vec![ViewNode::Text(text.clone())];
            }
        }
        if let Some(slot) = state.find_mut(LOOP_TOGGLE_SLOT_ID) {
            slot.children = vec![patch.toggle.clone()];
        }
        true
    }

    fn show_modal(&self, body: ViewNode, backdrop: Action) {
        self.state.borrow_mut().modal = Some((body, backdrop));
    }

    fn close_modal(&self) {
        self.state.borrow_mut().modal = None;
    }

    fn toast(&self, message: &str, tone: Tone) {
        self.state.borrow_mut().toasts.push((message.to_string(), tone));
    }

    fn alert(&self, message: &str) {
        self.state.borrow_mut().alerts.push(message.to_string());
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

struct Cancelled(Rc<Cell<bool>>);

impl Drop for Cancelled {
    fn drop(&mut self) {
        self.0.set(true);
    }
}

enum Callback {
    Repeat(Box<dyn FnMut()>),
    Once(Box<dyn FnOnce()>),
}

struct Timer {
    id: u64,
    due: Duration,
    period: Duration,
    callback: Callback,
    cancelled: Rc<Cell<bool>>,
}

/// Simulated clock plus a single-threaded task pool. Nothing runs until the test
/// advances time or drains the pool.
pub struct FakeRuntime {
    now: Cell<Duration>,
    next_id: Cell<u64>,
    timers: RefCell<Vec<Timer>>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            now: Cell::new(Duration::ZERO),
            next_id: Cell::new(0),
            timers: RefCell::new(Vec::new()),
            pool: RefCell::new(pool),
            spawner,
        }
    }
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now.get()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers
            .borrow()
            .iter()
            .filter(|timer| !timer.cancelled.get())
            .count()
    }

    pub fn run_until_stalled(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }

    /// Moves the clock forward, firing due timers in order and draining spawned
    /// tasks after each one.
    pub fn advance(&self, by: Duration) {
        let target = self.now.get() + by;
        self.run_until_stalled();
        while let Some(mut timer) = self.next_due(target) {
            self.now.set(timer.due);
            match timer.callback {
                Callback::Once(fire) => fire(),
                Callback::Repeat(ref mut tick) => {
                    tick();
                    if !timer.cancelled.get() {
                        timer.due += timer.period;
                        self.timers.borrow_mut().push(timer);
                    }
                }
            }
            self.run_until_stalled();
        }
        self.now.set(target);
    }

    fn next_due(&self, target: Duration) -> Option<Timer> {
        let mut timers = self.timers.borrow_mut();
        timers.retain(|timer| !timer.cancelled.get());
        let index = timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= target)
            .min_by_key(|(_, timer)| (timer.due, timer.id))
            .map(|(index, _)| index)?;
        Some(timers.remove(index))
    }

    fn schedule(&self, delay: Duration, period: Duration, callback: Callback) -> TimerGuard {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let cancelled = Rc::new(Cell::new(false));
        self.timers.borrow_mut().push(Timer {
            id,
            due: self.now.get() + delay,
            period,
            callback,
            cancelled: Rc::clone(&cancelled),
        });
        TimerGuard::new(Cancelled(cancelled))
    }
}

impl Runtime for FakeRuntime {
    fn interval(&self, period: Duration, tick: Box<dyn FnMut()>) -> TimerGuard {
        self.schedule(period, period, Callback::Repeat(tick))
    }

    fn timeout(&self, delay: Duration, fire: Box<dyn FnOnce()>) -> TimerGuard {
        self.schedule(delay, Duration::ZERO, Callback::Once(fire))
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(error) = self.spawner.spawn_local(task) {
            tracing::warn!(%error, "fake runtime refused a task");
        }
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Services wired to fakes, with handles kept for scripting and inspection.
pub struct Harness {
    pub transport: FakeTransport,
    pub surface: Rc<FakeSurface>,
    pub runtime: Rc<FakeRuntime>,
    pub services: Rc<Services>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(DashboardConfig::default())
    }

    pub fn with_config(config: DashboardConfig) -> Self {
        let transport = FakeTransport::new();
        let surface = Rc::new(FakeSurface::new());
        let runtime = Rc::new(FakeRuntime::new());
        let services = Rc::new(Services::new(
            Rc::new(ApiClient::new(transport.clone())),
            Rc::clone(&surface) as Rc<dyn Surface>,
            Rc::clone(&runtime) as Rc<dyn Runtime>,
            config,
        ));
        Self {
            transport,
            surface,
            runtime,
            services,
        }
    }
}
