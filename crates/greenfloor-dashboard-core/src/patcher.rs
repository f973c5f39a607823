//! In-place refresh of the market loop card.
//!
//! The card is rendered once by the dashboard controller. Each poll tick builds a
//! [`CardPatch`] from a fresh snapshot and the surface applies it without replacing
//! the card element, so focus and scroll inside it survive.

use std::cell::Cell;
use std::rc::Rc;

use crate::actions::Action;
use crate::format::{format_time_of_day, format_timestamp};
use crate::models::StatusSnapshot;
use crate::runtime::PageScope;
use crate::services::Services;
use crate::view::{Tone, ViewNode, badge, button, h, stat};

pub const LOOP_CARD_ID: &str = "loop-card";
pub const LOOP_HEADER_ID: &str = "loop-card-header";
pub const LOOP_TITLE_ID: &str = "loop-card-title";
pub const LOOP_TOGGLE_SLOT_ID: &str = "loop-toggle-slot";
pub const LOOP_TOGGLE_ID: &str = "loop-toggle";
pub const LOOP_TRIGGER_ID: &str = "loop-trigger";
pub const LOOP_NOTE_ID: &str = "loop-card-note";
pub const LOOP_EVENTS_ID: &str = "loop-events";
pub const STAT_CYCLES_ID: &str = "loop-cycles";
pub const STAT_ERRORS_ID: &str = "loop-errors";
pub const STAT_LAST_CYCLE_ID: &str = "loop-last-cycle";

pub const TRIGGER_LABEL: &str = "Run once";

/// Containers whose children every patch replaces. Listeners rendered inside them
/// live only until the next patch.
pub const PATCHED_CONTAINER_IDS: [&str; 3] = [LOOP_HEADER_ID, LOOP_TOGGLE_SLOT_ID, LOOP_EVENTS_ID];

pub fn is_patched_container(id: &str) -> bool {
    PATCHED_CONTAINER_IDS.contains(&id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardBorder {
    Running,
    Ready,
    Idle,
}

impl CardBorder {
    /// Running beats eligible-to-start beats neutral.
    pub fn for_snapshot(snapshot: &StatusSnapshot) -> Self {
        if snapshot.running {
            Self::Running
        } else if snapshot.can_start {
            Self::Ready
        } else {
            Self::Idle
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Self::Running => "border-running",
            Self::Ready => "border-ready",
            Self::Idle => "border-idle",
        }
    }
}

pub fn loop_card_class(border: CardBorder) -> String {
    format!("card loop-card {}", border.css_class())
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardPatch {
    pub border: CardBorder,
    /// Replaces every sibling after the title anchor.
    pub badges: Vec<ViewNode>,
    /// Fresh start/stop button, listeners included.
    pub toggle: ViewNode,
    /// `(element id, text)` for the statistic displays.
    pub stats: Vec<(&'static str, String)>,
    /// New children of the event log, newest first.
    pub events: Vec<ViewNode>,
}

pub fn card_patch(snapshot: &StatusSnapshot) -> CardPatch {
    CardPatch {
        border: CardBorder::for_snapshot(snapshot),
        badges: badges(snapshot),
        toggle: toggle_button(snapshot.running),
        stats: vec![
            (STAT_CYCLES_ID, snapshot.cycle_count.to_string()),
            (STAT_ERRORS_ID, snapshot.error_count.to_string()),
            (STAT_LAST_CYCLE_ID, format_timestamp(snapshot.last_cycle_at.as_ref())),
        ],
        events: event_rows(snapshot),
    }
}

fn badges(snapshot: &StatusSnapshot) -> Vec<ViewNode> {
    let running = if snapshot.running {
        badge("Running", Tone::Success)
    } else {
        badge("Stopped", Tone::Neutral)
    };
    let wallet = if snapshot.sage_connected {
        badge("Wallet connected", Tone::Success)
    } else {
        badge("Wallet offline", Tone::Error)
    };
    let markets_tone = if snapshot.enabled_markets > 0 {
        Tone::Info
    } else {
        Tone::Warning
    };
    let markets = badge(
        format!("{} enabled markets", snapshot.enabled_markets),
        markets_tone,
    );
    vec![running, wallet, markets]
}

pub fn toggle_button(running: bool) -> ViewNode {
    let control = if running {
        button("Stop loop", "btn-danger", Action::StopLoop)
    } else {
        button("Start loop", "btn-primary", Action::StartLoop)
    };
    control.id(LOOP_TOGGLE_ID).build()
}

fn event_rows(snapshot: &StatusSnapshot) -> Vec<ViewNode> {
    if snapshot.recent_events.is_empty() {
        return vec![h("div").class("event empty").text("No loop activity yet").build()];
    }
    snapshot
        .events_newest_first()
        .map(|event| {
            h("div")
                .class(format!("event event-{}", event.kind.tone().as_str()))
                .child(
                    h("span")
                        .class("event-time")
                        .text(format_time_of_day(event.at.as_ref())),
                )
                .child(h("span").class("event-kind").text(event.kind.as_str()))
                .child(h("span").class("event-message").text(event.message.clone()))
                .build()
        })
        .collect()
}

/// Full initial render of the card. A later patch with the same snapshot is a no-op.
pub fn loop_card(snapshot: &StatusSnapshot, note: Option<&str>) -> ViewNode {
    let patch = card_patch(snapshot);
    let stat_value = |id: &str| {
        patch
            .stats
            .iter()
            .find(|(stat_id, _)| *stat_id == id)
            .map(|(_, value)| value.clone())
            .unwrap_or_default()
    };

    h("section")
        .id(LOOP_CARD_ID)
        .class(loop_card_class(patch.border))
        .child(
            h("div")
                .id(LOOP_HEADER_ID)
                .class("card-header")
                .child(h("h3").id(LOOP_TITLE_ID).class("card-title").text("Market Loop"))
                .children(patch.badges.clone()),
        )
        .child(
            h("div")
                .class("loop-actions")
                .child(h("span").id(LOOP_TOGGLE_SLOT_ID).child(patch.toggle.clone()))
                .child(
                    button(TRIGGER_LABEL, "btn-secondary", Action::TriggerLoop).id(LOOP_TRIGGER_ID),
                ),
        )
        .child(
            h("div")
                .class("stats")
                .child(stat("Cycles", Some(STAT_CYCLES_ID), stat_value(STAT_CYCLES_ID)))
                .child(stat("Errors", Some(STAT_ERRORS_ID), stat_value(STAT_ERRORS_ID)))
                .child(stat(
                    "Last cycle",
                    Some(STAT_LAST_CYCLE_ID),
                    stat_value(STAT_LAST_CYCLE_ID),
                )),
        )
        .child(
            h("p")
                .id(LOOP_NOTE_ID)
                .class("card-note")
                .text(note.unwrap_or_default()),
        )
        .child(
            h("div")
                .id(LOOP_EVENTS_ID)
                .class("event-log")
                .children(patch.events),
        )
        .build()
}

/// Fetches a fresh snapshot and patches the card. Returns `false` once the card
/// or its page is gone, which tells the poller to stop.
pub async fn refresh_loop_card(services: &Services, scope: &PageScope) -> bool {
    let fetched = services.api.loop_status().await;
    if !scope.is_live() {
        return false;
    }
    match fetched {
        Ok(snapshot) => {
            let patched = services.surface.patch_loop_card(&card_patch(&snapshot));
            if patched {
                services.surface.set_text(LOOP_NOTE_ID, "");
            }
            patched
        }
        Err(error) => {
            tracing::warn!(%error, "loop status poll failed");
            services
                .surface
                .set_text(LOOP_NOTE_ID, &error.operator_message())
        }
    }
}

/// Installs the card's recurring poll in the scope's slot, replacing any earlier one.
/// A tick that lands while the previous refresh is still waiting on the backend is skipped.
pub fn install_loop_poll(services: &Rc<Services>, scope: &Rc<PageScope>) {
    let tick_services = Rc::clone(services);
    let tick_scope = Rc::downgrade(scope);
    let in_flight = Rc::new(Cell::new(false));
    let guard = services.runtime.interval(
        services.config.poll_interval(),
        Box::new(move || {
            let Some(scope) = tick_scope.upgrade() else {
                return;
            };
            if !scope.is_live() {
                return;
            }
            if in_flight.get() {
                tracing::debug!("loop card refresh still in flight, skipping tick");
                return;
            }
            tracing::debug!("loop card poll tick");
            in_flight.set(true);
            let services = Rc::clone(&tick_services);
            let in_flight = Rc::clone(&in_flight);
            tick_services.runtime.spawn(Box::pin(async move {
                let attached = refresh_loop_card(&services, &scope).await;
                in_flight.set(false);
                if !attached {
                    tracing::debug!("loop card detached, stopping poll");
                    scope.poll().cancel();
                }
            }));
        }),
    );
    scope.poll().install(guard);
}
