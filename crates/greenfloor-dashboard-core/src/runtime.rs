use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalBoxFuture;

/// Owns a scheduled timer. Dropping the guard cancels it.
pub struct TimerGuard(Option<Box<dyn Any>>);

impl TimerGuard {
    pub fn new(handle: impl Any) -> Self {
        Self(Some(Box::new(handle)))
    }

    pub fn cancel(mut self) {
        self.0.take();
    }
}

impl std::fmt::Debug for TimerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerGuard")
            .field("armed", &self.0.is_some())
            .finish()
    }
}

/// Event-loop services the controllers need: timers and local task spawning.
pub trait Runtime {
    fn interval(&self, period: Duration, tick: Box<dyn FnMut()>) -> TimerGuard;
    fn timeout(&self, delay: Duration, fire: Box<dyn FnOnce()>) -> TimerGuard;
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

/// Shared liveness flag for one page visit. Every post-await write checks it.
#[derive(Debug, Clone)]
pub struct LiveToken(Rc<Cell<bool>>);

impl LiveToken {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn is_live(&self) -> bool {
        self.0.get()
    }

    pub fn revoke(&self) {
        self.0.set(false);
    }
}

impl Default for LiveToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds at most one recurring poll timer. Installing cancels the previous one first.
#[derive(Debug, Default)]
pub struct PollSlot {
    guard: RefCell<Option<TimerGuard>>,
}

impl PollSlot {
    pub fn install(&self, guard: TimerGuard) {
        let previous = self.guard.borrow_mut().take();
        if previous.is_some() {
            tracing::debug!("replacing installed poll timer");
        }
        drop(previous);
        *self.guard.borrow_mut() = Some(guard);
    }

    pub fn cancel(&self) {
        let previous = self.guard.borrow_mut().take();
        drop(previous);
    }

    pub fn is_active(&self) -> bool {
        self.guard.borrow().is_some()
    }
}

/// Lifetime of one page visit: the liveness token, the page's poll slot and any
/// transient timers (feedback resets, modal auto-confirm).
#[derive(Debug, Default)]
pub struct PageScope {
    token: LiveToken,
    poll: PollSlot,
    timers: RefCell<Vec<TimerGuard>>,
}

impl PageScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> LiveToken {
        self.token.clone()
    }

    pub fn is_live(&self) -> bool {
        self.token.is_live()
    }

    pub fn poll(&self) -> &PollSlot {
        &self.poll
    }

    pub fn hold(&self, guard: TimerGuard) {
        if self.is_live() {
            self.timers.borrow_mut().push(guard);
        }
    }

    pub fn dispose(&self) {
        self.token.revoke();
        self.poll.cancel();
        let timers = std::mem::take(&mut *self.timers.borrow_mut());
        drop(timers);
    }
}

impl Drop for PageScope {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flag(Rc<Cell<bool>>);

    impl Drop for Flag {
        fn drop(&mut self) {
            self.0.set(true);
        }
    }

    #[test]
    fn poll_slot_cancels_previous_on_install() {
        let first = Rc::new(Cell::new(false));
        let second = Rc::new(Cell::new(false));
        let slot = PollSlot::default();
        slot.install(TimerGuard::new(Flag(first.clone())));
        slot.install(TimerGuard::new(Flag(second.clone())));
        assert!(first.get());
        assert!(!second.get());
        slot.cancel();
        assert!(second.get());
        assert!(!slot.is_active());
    }

    #[test]
    fn disposing_scope_revokes_token_and_timers() {
        let cancelled = Rc::new(Cell::new(false));
        let scope = PageScope::new();
        let token = scope.token();
        scope.hold(TimerGuard::new(Flag(cancelled.clone())));
        scope.dispose();
        assert!(!token.is_live());
        assert!(cancelled.get());

        let late = Rc::new(Cell::new(false));
        scope.hold(TimerGuard::new(Flag(late.clone())));
        assert!(late.get());
    }
}
