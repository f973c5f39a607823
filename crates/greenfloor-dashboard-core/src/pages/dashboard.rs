use std::rc::Rc;

use futures::join;

use crate::actions::Action;
use crate::error::{ApiError, StartBlocked};
use crate::format::EMPTY_PLACEHOLDER;
use crate::models::{Market, PriceFeed, StatusSnapshot, WalletStatus};
use crate::navigation::Page;
use crate::pages::{PageCx, fetch_failure};
use crate::patcher::{
    LOOP_TOGGLE_ID, LOOP_TRIGGER_ID, TRIGGER_LABEL, install_loop_poll, loop_card, refresh_loop_card,
};
use crate::surface::ControlState;
use crate::view::{Tone, ViewNode, badge, button, card, empty_state, flag_badge, h, stat, table};

pub async fn render(cx: &PageCx) {
    cx.top_bar(vec![
        button("Refresh", "btn-secondary", Action::RefreshPage).build(),
    ]);
    cx.loading("Loading dashboard…");

    let api = cx.api();
    let (status, wallet, prices, markets) =
        join!(api.loop_status(), api.wallet_status(), api.prices(), api.markets());
    if !cx.is_live() {
        return;
    }

    let loop_view = match &status {
        Ok(snapshot) => loop_card(snapshot, None),
        Err(error) => {
            tracing::warn!(%error, "initial loop status failed");
            loop_card(&StatusSnapshot::default(), Some(&error.operator_message()))
        }
    };
    let enabled: Vec<Market> = markets
        .as_ref()
        .map(|markets| markets.iter().filter(|market| market.enabled).cloned().collect())
        .unwrap_or_default();

    let content = h("div")
        .class("grid")
        .child(loop_view)
        .child(wallet_card(&wallet))
        .child(price_card(&prices, &enabled))
        .child(markets_card(&markets))
        .build();
    if cx.show(content) {
        install_loop_poll(&cx.services, &cx.scope);
    }
}

fn wallet_card(wallet: &Result<WalletStatus, ApiError>) -> ViewNode {
    let body = match wallet {
        Err(error) => fetch_failure("wallet status", error),
        Ok(status) => {
            let mut body = h("div")
                .class("stats")
                .child(
                    h("div")
                        .class("stat")
                        .child(h("span").class("stat-label").text("Connection"))
                        .child(flag_badge(status.connected, "Connected", "Disconnected")),
                )
                .child(stat(
                    "Version",
                    None,
                    status.version_label().unwrap_or_else(|| EMPTY_PLACEHOLDER.to_string()),
                ))
                .child(stat(
                    "Sync",
                    None,
                    status.sync_label().unwrap_or_else(|| EMPTY_PLACEHOLDER.to_string()),
                ))
                .child(stat("Active key", None, active_key_label(status)));
            if let Some(error) = status.error.as_deref() {
                body = body.child(h("p").class("card-note error").text(error));
            }
            body.build()
        }
    };
    card("Sage Wallet").id("wallet-card").child(body).build()
}

fn active_key_label(status: &WalletStatus) -> String {
    match (status.active_key_name(), status.active_fingerprint()) {
        (Some(name), Some(fingerprint)) => format!("{name} ({fingerprint})"),
        (None, Some(fingerprint)) => fingerprint.to_string(),
        (Some(name), None) => name,
        (None, None) => EMPTY_PLACEHOLDER.to_string(),
    }
}

fn price_card(prices: &Result<PriceFeed, ApiError>, enabled: &[Market]) -> ViewNode {
    let body = match prices {
        Err(error) => fetch_failure("prices", error),
        Ok(feed) => {
            let native = feed
                .native_usd()
                .map_or_else(|| EMPTY_PLACEHOLDER.to_string(), |price| format!("${price:.2}"));
            let rows: Vec<ViewNode> = enabled
                .iter()
                .map(|market| {
                    let last = feed
                        .ticker_for(&market.base_symbol)
                        .and_then(|ticker| ticker.last_price)
                        .map_or_else(|| EMPTY_PLACEHOLDER.to_string(), |price| format!("{price:.6}"));
                    h("tr")
                        .child(h("td").text(market.display_pair()))
                        .child(h("td").text(last))
                        .build()
                })
                .collect();
            let mut body = h("div").child(stat("XCH / USD", Some("price-xch-usd"), native));
            if !rows.is_empty() {
                body = body.child(table(&["Market", "Last price"], rows));
            }
            body.build()
        }
    };
    card("Prices").id("price-card").child(body).build()
}

fn markets_card(markets: &Result<Vec<Market>, ApiError>) -> ViewNode {
    let body = match markets {
        Err(error) => fetch_failure("markets", error),
        Ok(markets) if markets.is_empty() => empty_state("No markets configured."),
        Ok(markets) => {
            let rows = markets
                .iter()
                .map(|market| {
                    h("tr")
                        .child(h("td").text(market.label()))
                        .child(h("td").text(market.display_pair()))
                        .child(h("td").text(market.mode.as_str()))
                        .child(
                            h("td").child(if market.enabled {
                                badge("enabled", Tone::Success)
                            } else {
                                badge("disabled", Tone::Neutral)
                            }),
                        )
                        .build()
                })
                .collect();
            table(&["Market", "Pair", "Mode", "State"], rows)
        }
    };
    card("Markets")
        .id("markets-summary")
        .child(body)
        .child(button("Manage markets", "btn-link", Action::Navigate(Page::Markets)))
        .build()
}

/// The checks the backend applies, run against a fresh snapshot before asking it to start.
pub fn start_precondition(status: &StatusSnapshot) -> Result<(), StartBlocked> {
    if !status.sage_connected {
        return Err(StartBlocked::WalletDisconnected);
    }
    if status.enabled_markets == 0 {
        return Err(StartBlocked::NoEnabledMarkets);
    }
    Ok(())
}

pub async fn start_loop(cx: &PageCx) {
    cx.set_control(LOOP_TOGGLE_ID, &ControlState::busy("Checking…"));
    match cx.api().loop_status().await {
        Err(error) => {
            tracing::warn!(%error, "could not verify loop status before start");
            cx.surface().alert(&format!(
                "Could not verify the loop status. {}",
                error.operator_message()
            ));
        }
        Ok(status) => match start_precondition(&status) {
            Err(blocked) => {
                tracing::info!(?blocked, "loop start blocked");
                cx.surface().alert(&blocked.to_string());
            }
            Ok(()) => {
                cx.set_control(LOOP_TOGGLE_ID, &ControlState::busy("Starting…"));
                match cx.api().start_loop().await {
                    Ok(_) => tracing::info!("market loop started"),
                    Err(error) => {
                        tracing::warn!(%error, "market loop start failed");
                        cx.surface().alert(&format!(
                            "Could not start the market loop. {}",
                            error.operator_message()
                        ));
                    }
                }
            }
        },
    }
    cx.set_control(LOOP_TOGGLE_ID, &ControlState::enabled());
    refresh_loop_card(&cx.services, &cx.scope).await;
}

pub async fn stop_loop(cx: &PageCx) {
    cx.set_control(LOOP_TOGGLE_ID, &ControlState::busy("Stopping…"));
    match cx.api().stop_loop().await {
        Ok(_) => tracing::info!("market loop stopped"),
        Err(error) => {
            tracing::warn!(%error, "market loop stop failed");
            cx.toast(&error.operator_message(), Tone::Error);
        }
    }
    cx.set_control(LOOP_TOGGLE_ID, &ControlState::enabled());
    refresh_loop_card(&cx.services, &cx.scope).await;
}

pub async fn trigger_loop(cx: &PageCx) {
    cx.set_control(LOOP_TRIGGER_ID, &ControlState::busy("Running…"));
    let result = cx.api().trigger_loop().await;
    let label = match &result {
        Ok(_) => {
            tracing::info!("manual cycle finished");
            "✔ Done"
        }
        Err(error) => {
            tracing::warn!(%error, "manual cycle failed");
            cx.toast(&error.operator_message(), Tone::Error);
            "✘ Failed"
        }
    };
    if !cx.set_control(LOOP_TRIGGER_ID, &ControlState::busy(label)) {
        return;
    }

    let surface = Rc::clone(&cx.services.surface);
    let token = cx.scope.token();
    let revert = cx.services.runtime.timeout(
        cx.services.config.trigger_feedback(),
        Box::new(move || {
            if token.is_live() {
                surface.set_control(LOOP_TRIGGER_ID, &ControlState::ready(TRIGGER_LABEL));
            }
        }),
    );
    cx.hold(revert);

    if result.is_ok() {
        refresh_loop_card(&cx.services, &cx.scope).await;
    }
}
