use std::cell::RefCell;
use std::rc::Rc;

use crate::actions::Action;
use crate::error::ApiError;
use crate::format::format_mojos;
use crate::models::{Market, Rung};
use crate::navigation::{Page, PageContext};
use crate::pages::{PageCx, dom_id, fetch_failure};
use crate::preflight::{preflight_loading, preflight_view, run_preflight};
use crate::runtime::TimerGuard;
use crate::surface::ControlState;
use crate::view::{Tone, ViewNode, badge, button, card, empty_state, h, table};

pub async fn render(cx: &PageCx) {
    cx.top_bar(vec![
        button("Reload", "btn-secondary", Action::RefreshPage).build(),
    ]);
    cx.loading("Loading markets…");

    let markets = cx.api().markets().await;
    if !cx.is_live() {
        return;
    }
    let content = match markets {
        Err(error) => fetch_failure("markets", &error),
        Ok(markets) if markets.is_empty() => empty_state("No markets configured."),
        Ok(markets) => h("div")
            .class("market-list")
            .children(markets.iter().map(market_card))
            .build(),
    };
    cx.show(content);
}

pub fn card_id(market_id: &str) -> String {
    format!("market-{}", dom_id(market_id))
}

pub fn toggle_id(market_id: &str) -> String {
    format!("market-toggle-{}", dom_id(market_id))
}

fn toggle_label(enabled: bool) -> &'static str {
    if enabled { "Disable" } else { "Enable" }
}

fn ladder_table(rungs: &[Rung]) -> ViewNode {
    let rows = rungs
        .iter()
        .map(|rung| {
            let excess = rung
                .combine_when_excess_factor
                .as_ref()
                .map_or_else(String::new, ToString::to_string);
            h("tr")
                .child(h("td").text(rung.size_base_units.to_string()))
                .child(h("td").text(rung.target_count.to_string()))
                .child(h("td").text(rung.split_buffer_count.to_string()))
                .child(h("td").text(excess))
                .build()
        })
        .collect();
    table(&["Size", "Target", "Buffer", "Combine at"], rows)
}

pub fn market_card(market: &Market) -> ViewNode {
    let state = if market.enabled {
        badge("enabled", Tone::Success)
    } else {
        badge("disabled", Tone::Neutral)
    };
    let mut body = card(market.label())
        .id(card_id(&market.id))
        .class(if market.enabled { "card market enabled" } else { "card market" })
        .child(
            h("div")
                .class("market-meta")
                .child(h("span").class("pair").text(market.display_pair()))
                .child(badge(market.mode.as_str(), Tone::Info))
                .child(state),
        );

    for (label, rungs) in [("Sell ladder", &market.ladders.sell), ("Buy ladder", &market.ladders.buy)] {
        if let Some(rungs) = rungs.as_ref().filter(|rungs| !rungs.is_empty()) {
            body = body
                .child(h("h4").text(label))
                .child(ladder_table(rungs));
        }
    }

    body.child(
        h("div")
            .class("card-actions")
            .child(
                button(
                    toggle_label(market.enabled),
                    if market.enabled { "btn-secondary" } else { "btn-primary" },
                    Action::ToggleMarket {
                        market_id: market.id.clone(),
                        enable: !market.enabled,
                    },
                )
                .id(toggle_id(&market.id)),
            )
            .child(button(
                "Build offer",
                "btn-secondary",
                Action::NavigateWith(
                    Page::Build,
                    Box::new(PageContext::BuildMarket(Box::new(market.clone()))),
                ),
            )),
    )
    .build()
}

/// Re-reads the market list, flips one market's flag and overwrites the list.
async fn write_enabled(cx: &PageCx, market_id: &str, enabled: bool) -> Result<Market, ApiError> {
    let mut markets = cx.api().markets().await?;
    let Some(market) = markets.iter_mut().find(|market| market.id == market_id) else {
        return Err(ApiError::backend(404, format!("market {market_id} no longer exists")));
    };
    market.enabled = enabled;
    let updated = market.clone();
    cx.api().write_markets(&markets).await?;
    tracing::info!(market = market_id, enabled, "market list written");
    Ok(updated)
}

async fn apply_toggle(cx: &PageCx, market_id: &str, enabled: bool) {
    let control = toggle_id(market_id);
    cx.set_control(&control, &ControlState::busy("Saving…"));
    match write_enabled(cx, market_id, enabled).await {
        Ok(updated) => {
            let verb = if enabled { "Enabled" } else { "Disabled" };
            cx.toast(&format!("{verb} {market_id}"), Tone::Success);
            cx.replace(&card_id(market_id), market_card(&updated));
        }
        Err(error) => {
            tracing::warn!(%error, market = market_id, "market toggle failed");
            cx.toast(&error.operator_message(), Tone::Error);
            cx.set_control(&control, &ControlState::ready(toggle_label(!enabled)));
        }
    }
}

pub async fn disable(cx: &PageCx, market_id: &str) {
    apply_toggle(cx, market_id, false).await;
}

struct PendingEnable {
    market_id: String,
    generation: u64,
    autoconfirm: Option<TimerGuard>,
}

/// The single open "enable market" confirmation, if any.
#[derive(Default)]
pub struct EnableFlow {
    pending: RefCell<Option<PendingEnable>>,
    generation: std::cell::Cell<u64>,
}

impl EnableFlow {
    pub fn is_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }

    pub fn pending_market(&self) -> Option<String> {
        self.pending
            .borrow()
            .as_ref()
            .map(|pending| pending.market_id.clone())
    }

    fn open(&self, market_id: &str) -> u64 {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        *self.pending.borrow_mut() = Some(PendingEnable {
            market_id: market_id.to_string(),
            generation,
            autoconfirm: None,
        });
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.pending
            .borrow()
            .as_ref()
            .is_some_and(|pending| pending.generation == generation)
    }

    fn arm(&self, generation: u64, guard: TimerGuard) {
        if let Some(pending) = self
            .pending
            .borrow_mut()
            .as_mut()
            .filter(|pending| pending.generation == generation)
        {
            pending.autoconfirm = Some(guard);
        }
    }

    fn take(&self) -> Option<String> {
        let taken = self.pending.borrow_mut().take();
        taken.map(|pending| pending.market_id)
    }

    /// Drops any pending confirmation without touching the page.
    pub fn abandon(&self) -> bool {
        self.take().is_some()
    }
}

/// Opens the pre-flight modal for `market_id`. Auto-confirms when every side passes.
pub async fn begin_enable(cx: &PageCx, flow: &Rc<EnableFlow>, market_id: &str) {
    let surface = cx.surface();
    cx.set_control(&toggle_id(market_id), &ControlState::busy("Checking…"));
    let generation = flow.open(market_id);

    let markets = match cx.api().markets().await {
        Ok(markets) => markets,
        Err(error) => {
            if flow.is_current(generation) {
                flow.take();
                cx.toast(&error.operator_message(), Tone::Error);
            }
            cx.set_control(&toggle_id(market_id), &ControlState::ready(toggle_label(false)));
            return;
        }
    };
    let Some(market) = markets.into_iter().find(|market| market.id == market_id) else {
        if flow.is_current(generation) {
            flow.take();
            cx.toast(&format!("Market {market_id} no longer exists."), Tone::Error);
        }
        cx.set_control(&toggle_id(market_id), &ControlState::ready(toggle_label(false)));
        return;
    };
    if !flow.is_current(generation) || !cx.is_live() {
        return;
    }
    surface.show_modal(preflight_loading(&market), Action::CancelEnable);

    let preflight = run_preflight(cx.api(), &market, &cx.services.config).await;
    if !flow.is_current(generation) || !cx.is_live() {
        return;
    }
    for side in &preflight.sides {
        tracing::debug!(
            side = side.side.label(),
            required = ?side.required_mojos,
            available = %format_mojos(side.available_mojos, side.precision),
            ok = side.ok,
            "pre-flight side"
        );
    }
    surface.show_modal(
        preflight_view(&preflight, cx.services.config.split_suggestion_buffer),
        Action::CancelEnable,
    );

    if preflight.all_ok() {
        let confirm_cx = cx.clone();
        let confirm_flow = Rc::clone(flow);
        let runtime = Rc::clone(&cx.services.runtime);
        let guard = cx.services.runtime.timeout(
            cx.services.config.preflight_autoconfirm(),
            Box::new(move || {
                runtime.spawn(Box::pin(async move {
                    confirm_enable(&confirm_cx, &confirm_flow).await;
                }));
            }),
        );
        flow.arm(generation, guard);
    }
}

pub async fn confirm_enable(cx: &PageCx, flow: &EnableFlow) {
    let Some(market_id) = flow.take() else {
        return;
    };
    cx.surface().close_modal();
    apply_toggle(cx, &market_id, true).await;
}

pub fn cancel_enable(cx: &PageCx, flow: &EnableFlow) {
    let Some(market_id) = flow.take() else {
        cx.surface().close_modal();
        return;
    };
    tracing::info!(market = %market_id, "enable cancelled");
    cx.surface().close_modal();
    cx.set_control(&toggle_id(&market_id), &ControlState::ready(toggle_label(false)));
}
