use serde_json::Value;

use crate::actions::Action;
use crate::error::ApiError;
use crate::format::{EMPTY_PLACEHOLDER, format_timestamp, parse_timestamp, short_id};
use crate::models::{CommandOutput, OffersQuery, ReconcileRequest};
use crate::pages::{PageCx, command_output_view, dom_id, fetch_failure};
use crate::surface::ControlState;
use crate::view::{Tone, ViewNode, badge, button, card, empty_state, h, loading, stat, table};

pub const OFFERS_STATUS_ID: &str = "offers-status";
pub const RECONCILE_RESULT_ID: &str = "reconcile-result";
pub const CANCEL_ALL_ID: &str = "offers-cancel-all";
pub const RECONCILE_ID: &str = "offers-reconcile";
const RECONCILE_LIMIT: u32 = 200;

/// One row of the offers-status report, normalised from the manager's JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferRow {
    pub offer_id: Option<String>,
    pub market_id: Option<String>,
    pub state: String,
    pub pair: String,
    pub taker_signal: Option<String>,
    pub created_at: Option<String>,
    pub expires_at: Option<String>,
    pub event_count: usize,
}

fn text_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .filter(|text| !text.is_empty())
}

impl OfferRow {
    pub fn from_value(value: &Value) -> Self {
        let base = text_field(value, &["base_symbol"]).unwrap_or_else(|| "?".to_string());
        let quote = text_field(value, &["quote_asset"]).unwrap_or_else(|| "?".to_string());
        Self {
            offer_id: text_field(value, &["offer_id", "id"]),
            market_id: text_field(value, &["market_id"]),
            state: text_field(value, &["state", "offer_state"]).unwrap_or_else(|| "?".to_string()),
            pair: format!("{base}:{quote}"),
            taker_signal: text_field(value, &["taker_signal"]),
            created_at: text_field(value, &["created_at"]),
            expires_at: text_field(value, &["expires_at"]),
            event_count: value.get("events").and_then(Value::as_array).map_or(0, Vec::len),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.contains("active")
    }

    /// Offers still on the books can be withdrawn.
    pub fn is_cancellable(&self) -> bool {
        self.offer_id.is_some() && (self.is_active() || self.state == "open" || self.state == "pending")
    }

    pub fn state_tone(&self) -> Tone {
        match self.state.as_str() {
            "active" => Tone::Success,
            "taken" => Tone::Info,
            "expired" => Tone::Neutral,
            _ => Tone::Warning,
        }
    }
}

/// Offers listed in a report: `offers`, else `results`, else a bare array.
pub fn offer_rows(parsed: &Value) -> Vec<OfferRow> {
    let list = parsed
        .get("offers")
        .or_else(|| parsed.get("results"))
        .and_then(Value::as_array)
        .or_else(|| parsed.as_array());
    list.map(|offers| offers.iter().map(OfferRow::from_value).collect())
        .unwrap_or_default()
}

pub fn cancel_button_id(offer_id: &str) -> String {
    format!("offer-cancel-{}", dom_id(offer_id))
}

fn when(raw: Option<&str>) -> String {
    match raw {
        Some(raw) => parse_timestamp(raw).map_or_else(|| raw.to_string(), |at| format_timestamp(Some(&at))),
        None => EMPTY_PLACEHOLDER.to_string(),
    }
}

fn offer_row(offer: &OfferRow) -> ViewNode {
    let id = offer.offer_id.as_deref().unwrap_or(EMPTY_PLACEHOLDER);
    let signal = match offer.taker_signal.as_deref() {
        Some(signal) if signal != "none" => badge(signal, Tone::Info),
        other => h("span").class("muted").text(other.unwrap_or(EMPTY_PLACEHOLDER)).build(),
    };
    let action = match offer.offer_id.as_deref() {
        Some(offer_id) if offer.is_cancellable() => button(
            "Cancel",
            "btn-danger btn-small",
            Action::CancelOffer {
                offer_id: offer_id.to_string(),
            },
        )
        .id(cancel_button_id(offer_id))
        .build(),
        _ => h("span").build(),
    };
    h("tr")
        .child(h("td").child(h("span").class("mono").attr("title", id).text(short_id(id))))
        .child(h("td").text(offer.market_id.as_deref().unwrap_or(EMPTY_PLACEHOLDER)))
        .child(h("td").child(badge(offer.state.as_str(), offer.state_tone())))
        .child(h("td").text(offer.pair.as_str()))
        .child(h("td").child(signal))
        .child(h("td").text(when(offer.created_at.as_deref())))
        .child(h("td").text(when(offer.expires_at.as_deref())))
        .child(h("td").text(offer.event_count.to_string()))
        .child(h("td").child(action))
        .build()
}

fn event_rows(parsed: &Value) -> Option<ViewNode> {
    let events = parsed.get("events").and_then(Value::as_array)?;
    if events.is_empty() {
        return None;
    }
    let rows = events
        .iter()
        .map(|event| {
            h("tr")
                .child(h("td").text(when(text_field(event, &["at", "created_at", "timestamp"]).as_deref())))
                .child(h("td").text(text_field(event, &["event", "type"]).unwrap_or_default()))
                .child(h("td").text(text_field(event, &["offer_id"]).map(|id| short_id(&id)).unwrap_or_default()))
                .build()
        })
        .collect();
    Some(
        h("div")
            .child(h("h4").text("Recent events"))
            .child(table(&["When", "Event", "Offer"], rows))
            .build(),
    )
}

pub fn status_view(output: &CommandOutput) -> ViewNode {
    let body = match output.parsed() {
        None => h("pre")
            .class("terminal raw")
            .text(if output.raw.trim().is_empty() {
                output.error.clone().unwrap_or_else(|| "No output".to_string())
            } else {
                output.raw.clone()
            })
            .build(),
        Some(parsed) => {
            let offers = offer_rows(parsed);
            if offers.is_empty() {
                empty_state("No offers found.")
            } else {
                let active = offers.iter().filter(|offer| offer.is_active()).count();
                let mut body = h("div")
                    .child(
                        h("div")
                            .class("stats")
                            .child(stat("Total", None, offers.len().to_string()))
                            .child(stat("Active", None, active.to_string()))
                            .child(stat("Other", None, (offers.len() - active).to_string())),
                    )
                    .child(table(
                        &["Offer", "Market", "State", "Pair", "Taker signal", "Created", "Expires", "Events", ""],
                        offers.iter().map(offer_row).collect(),
                    ));
                if let Some(events) = event_rows(parsed) {
                    body = body.child(events);
                }
                body.build()
            }
        }
    };
    card("Offers Status").id(OFFERS_STATUS_ID).child(body).build()
}

fn offers_query(cx: &PageCx) -> OffersQuery {
    OffersQuery {
        limit: cx.services.config.offers_limit,
        events_limit: cx.services.config.offers_events_limit,
        market_id: None,
    }
}

pub async fn render(cx: &PageCx) {
    cx.top_bar(vec![
        button("Reconcile", "btn-primary", Action::ReconcileOffers).id(RECONCILE_ID).build(),
        button("Cancel all", "btn-danger", Action::CancelAllOffers).id(CANCEL_ALL_ID).build(),
        button("Refresh", "btn-secondary", Action::RefreshPage).build(),
    ]);
    cx.loading("Loading offers…");

    let status = cx.api().offers_status(&offers_query(cx)).await;
    if !cx.is_live() {
        return;
    }
    let status_card = match status {
        Ok(output) => status_view(&output),
        Err(error) => card("Offers Status")
            .id(OFFERS_STATUS_ID)
            .child(fetch_failure("offers", &error))
            .build(),
    };
    cx.show(
        h("div")
            .child(status_card)
            .child(h("div").id(RECONCILE_RESULT_ID))
            .build(),
    );
}

pub async fn cancel_offer(cx: &PageCx, offer_id: &str) {
    let control = cancel_button_id(offer_id);
    cx.set_control(&control, &ControlState::busy("Cancelling…"));
    match cx.api().cancel_offer(offer_id).await {
        Ok(_) => {
            tracing::info!(offer = offer_id, "offer cancelled");
            cx.toast(&format!("Cancelled offer {}", short_id(offer_id)), Tone::Success);
            render(cx).await;
        }
        Err(error) => {
            tracing::warn!(%error, offer = offer_id, "offer cancel failed");
            cx.surface()
                .alert(&format!("Could not cancel offer {offer_id}. {}", error.operator_message()));
            cx.set_control(&control, &ControlState::ready("Cancel"));
        }
    }
}

async fn open_offer_ids(cx: &PageCx) -> Result<Vec<String>, ApiError> {
    let output = cx.api().offers_status(&offers_query(cx)).await?;
    Ok(output
        .parsed()
        .map(offer_rows)
        .unwrap_or_default()
        .into_iter()
        .filter(OfferRow::is_cancellable)
        .filter_map(|offer| offer.offer_id)
        .collect())
}

pub async fn cancel_all(cx: &PageCx) {
    cx.set_control(CANCEL_ALL_ID, &ControlState::busy("Cancelling…"));
    let result = match open_offer_ids(cx).await {
        Ok(ids) if ids.is_empty() => {
            cx.toast("No open offers to cancel.", Tone::Info);
            cx.set_control(CANCEL_ALL_ID, &ControlState::ready("Cancel all"));
            return;
        }
        Ok(ids) => cx.api().cancel_all_offers(&ids).await.map(|_| ids.len()),
        Err(error) => Err(error),
    };
    match result {
        Ok(count) => {
            tracing::info!(count, "open offers cancelled");
            cx.toast(&format!("Cancelled {count} offers"), Tone::Success);
            render(cx).await;
        }
        Err(error) => {
            tracing::warn!(%error, "cancel all failed");
            cx.surface()
                .alert(&format!("Could not cancel all offers. {}", error.operator_message()));
            cx.set_control(CANCEL_ALL_ID, &ControlState::ready("Cancel all"));
        }
    }
}

pub async fn reconcile(cx: &PageCx) {
    cx.set_control(RECONCILE_ID, &ControlState::busy("Reconciling…"));
    cx.replace(
        RECONCILE_RESULT_ID,
        card("Reconcile Output")
            .id(RECONCILE_RESULT_ID)
            .child(loading("Reconciling…"))
            .build(),
    );
    let request = ReconcileRequest {
        limit: RECONCILE_LIMIT,
        market_id: None,
    };
    let body = match cx.api().reconcile_offers(&request).await {
        Ok(output) => command_output_view(&output),
        Err(error) => {
            tracing::warn!(%error, "reconcile failed");
            fetch_failure("reconcile output", &error)
        }
    };
    cx.replace(
        RECONCILE_RESULT_ID,
        card("Reconcile Output").id(RECONCILE_RESULT_ID).child(body).build(),
    );
    cx.set_control(RECONCILE_ID, &ControlState::ready("Reconcile"));
}
