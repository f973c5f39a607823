use futures::join;

use crate::actions::Action;
use crate::api::{CoinCombineRequest, CoinSplitRequest, StreamRequest};
use crate::error::ApiError;
use crate::format::{format_amount, short_id};
use crate::models::{
    Coin, CoinQuery, TokenInfo, canonical_asset_id, coins_from_cli_output, spendable_totals,
};
use crate::navigation::{PageContext, SplitContext};
use crate::pages::{PageCx, fetch_failure, parse_positive, run_streamed};
use crate::terminal::Terminal;
use crate::view::{
    Tone, ViewNode, badge, button, card, checkbox, empty_state, field, h, select, stat, table,
    text_input,
};

pub const COINS_TERMINAL_ID: &str = "coins-terminal";
pub const SPLIT_RUN_ID: &str = "split-run";
pub const COMBINE_RUN_ID: &str = "combine-run";
pub const NETWORKS: [&str; 2] = ["mainnet", "testnet11"];

const SPLIT_LABEL: &str = "Split";
const COMBINE_LABEL: &str = "Combine";

/// Where a coin listing came from; the CLI inventory is the fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum CoinListing {
    Wallet(Vec<Coin>),
    Cli { coins: Vec<Coin>, wallet_error: String },
}

impl CoinListing {
    pub fn coins(&self) -> &[Coin] {
        match self {
            Self::Wallet(coins) | Self::Cli { coins, .. } => coins,
        }
    }
}

/// Lists coins for one asset, falling back to the manager's CLI inventory when the
/// wallet bridge cannot answer.
pub async fn load_coins(cx: &PageCx, asset_id: Option<&str>) -> Result<CoinListing, ApiError> {
    let query = CoinQuery {
        asset_id: asset_id.map(str::to_string),
        limit: cx.services.config.coin_page_size,
        offset: 0,
    };
    match cx.api().wallet_coins(&query).await {
        Ok(page) => Ok(CoinListing::Wallet(page.coins)),
        Err(wallet_error) => {
            tracing::warn!(error = %wallet_error, "wallet coin listing failed, using CLI inventory");
            let output = cx.api().cli_coins(asset_id).await?;
            let wanted = canonical_asset_id(asset_id);
            let coins = output
                .parsed()
                .map(coins_from_cli_output)
                .unwrap_or_default()
                .into_iter()
                .filter(|coin| asset_id.is_none() || coin.asset_id == wanted)
                .collect();
            Ok(CoinListing::Cli {
                coins,
                wallet_error: wallet_error.operator_message(),
            })
        }
    }
}

fn asset_tabs(tokens: &[TokenInfo], selected: Option<&str>) -> ViewNode {
    let native = button(
        "XCH",
        if selected.is_none() { "tab active" } else { "tab" },
        Action::SelectCoinAsset { asset_id: None },
    );
    h("div")
        .class("tabs")
        .child(native)
        .children(tokens.iter().map(|token| {
            let active = selected == Some(token.asset_id.as_str());
            button(
                &token.label(),
                if active { "tab active" } else { "tab" },
                Action::SelectCoinAsset {
                    asset_id: Some(token.asset_id.clone()),
                },
            )
            .build()
        }))
        .build()
}

fn coin_table(coins: &[Coin], precision: u32, symbol: &str) -> ViewNode {
    let rows = coins
        .iter()
        .map(|coin| {
            let state = coin.state.as_deref().unwrap_or(if coin.spendable { "spendable" } else { "locked" });
            h("tr")
                .child(
                    h("td").child(
                        h("span")
                            .class("mono")
                            .attr("title", coin.coin_id.as_str())
                            .text(short_id(&coin.coin_id)),
                    ),
                )
                .child(h("td").text(format_amount(coin.amount, precision, symbol)))
                .child(h("td").child(badge(state, if coin.spendable { Tone::Success } else { Tone::Warning })))
                .child(h("td").child(badge(
                    if coin.spendable { "yes" } else { "no" },
                    if coin.spendable { Tone::Success } else { Tone::Neutral },
                )))
                .child(h("td").class("muted").text(coin.source.as_str()))
                .build()
        })
        .collect();
    table(&["Coin", "Amount", "State", "Spendable", "Source"], rows)
}

pub fn coin_list_view(listing: &CoinListing, precision: u32, symbol: &str) -> ViewNode {
    let coins = listing.coins();
    let mut body = card(&format!("{symbol} Coins")).id("coin-list");
    if let CoinListing::Cli { wallet_error, .. } = listing {
        body = body.child(
            h("p")
                .class("card-note warning")
                .text(format!("Wallet bridge unavailable ({wallet_error}); showing CLI inventory.")),
        );
    }
    if coins.is_empty() {
        return body.child(empty_state("No coins found.")).build();
    }
    let (mass, count) = spendable_totals(coins);
    body.child(
        h("div")
            .class("stats")
            .child(stat("Total coins", None, coins.len().to_string()))
            .child(stat("Spendable", None, count.to_string()))
            .child(stat("Locked", None, (coins.len() as u64 - count).to_string()))
            .child(stat("Spendable amount", None, format_amount(mass, precision, symbol))),
    )
    .child(coin_table(coins, precision, symbol))
    .build()
}

pub fn split_form(prefill: Option<&SplitContext>, network: &str) -> ViewNode {
    let pair = prefill.map_or("", |context| context.pair.as_str());
    let amount = prefill.map(|context| context.amount_per_coin.to_string()).unwrap_or_default();
    let count = prefill.map(|context| context.number_of_coins.to_string()).unwrap_or_default();
    let mut form = card("Split Coin").id("split-form");
    if let Some(context) = prefill {
        form = form.child(h("p").class("card-note").text(format!(
            "Suggested by the pre-flight check: split {} into {} coins of {}.",
            context.symbol, context.number_of_coins, context.amount_per_coin
        )));
    }
    form.child(
        h("div")
            .class("form-row")
            .child(field("Pair", text_input("split-pair", pair, "e.g. BYC:xch")))
            .child(field("Amount per coin", text_input("split-amount", &amount, "e.g. 1000")))
            .child(field("Number of coins", text_input("split-count", &count, "e.g. 10")))
            .child(field("Coin ID (optional)", text_input("split-coin-id", "", "auto-select"))),
    )
    .child(
        h("div")
            .class("form-row")
            .child(field("Network", select("split-network", &NETWORKS, network)))
            .child(field("Don't wait for confirmation", checkbox("split-no-wait", false))),
    )
    .child(button(SPLIT_LABEL, "btn-primary", Action::RunSplit).id(SPLIT_RUN_ID))
    .build()
}

pub fn combine_form(asset_id: Option<&str>, network: &str) -> ViewNode {
    card("Combine Coins")
        .id("combine-form")
        .child(
            h("div")
                .class("form-row")
                .child(field("Pair", text_input("combine-pair", "", "e.g. BYC:xch")))
                .child(field("Input coin count", text_input("combine-count", "2", "e.g. 10")))
                .child(field(
                    "Asset ID (optional)",
                    text_input("combine-asset", asset_id.unwrap_or(""), "xch or CAT asset id"),
                )),
        )
        .child(
            h("div")
                .class("form-row")
                .child(field("Network", select("combine-network", &NETWORKS, network)))
                .child(field("Don't wait for confirmation", checkbox("combine-no-wait", false))),
        )
        .child(button(COMBINE_LABEL, "btn-primary", Action::RunCombine).id(COMBINE_RUN_ID))
        .build()
}

pub async fn render(cx: &PageCx) {
    let (asset_id, split) = match cx.services.handoff.take() {
        Some(PageContext::SplitCoins(context)) => (context.asset_id.clone(), Some(context)),
        Some(PageContext::CoinAsset(asset_id)) => (asset_id, None),
        Some(other) => {
            tracing::debug!(?other, "ignoring handoff meant for another page");
            (None, None)
        }
        None => (None, None),
    };
    let asset_id = canonical_asset_id(asset_id.as_deref());

    cx.top_bar(vec![
        button("Refresh", "btn-secondary", Action::SelectCoinAsset { asset_id: asset_id.clone() }).build(),
    ]);
    cx.loading("Loading coins…");

    let (tokens, listing) = join!(cx.api().wallet_tokens(), load_coins(cx, asset_id.as_deref()));
    if !cx.is_live() {
        return;
    }
    let tokens = tokens.unwrap_or_else(|error| {
        tracing::warn!(%error, "token list unavailable");
        Vec::new()
    });
    let token = asset_id
        .as_deref()
        .and_then(|asset| tokens.iter().find(|token| token.asset_id.eq_ignore_ascii_case(asset)));
    let (precision, symbol) = match (&asset_id, token) {
        (None, _) => (cx.services.config.native_precision, "XCH".to_string()),
        (Some(_), Some(token)) => (
            token.precision.unwrap_or(cx.services.config.token_precision),
            token.label(),
        ),
        (Some(asset), None) => (cx.services.config.token_precision, short_id(asset)),
    };

    let list = match &listing {
        Ok(listing) => coin_list_view(listing, precision, &symbol),
        Err(error) => card(&format!("{symbol} Coins"))
            .id("coin-list")
            .child(fetch_failure("coins", error))
            .build(),
    };
    let network = cx.services.config.network.clone();
    cx.show(
        h("div")
            .child(asset_tabs(&tokens, asset_id.as_deref()))
            .child(list)
            .child(split_form(split.as_ref(), &network))
            .child(combine_form(asset_id.as_deref(), &network))
            .child(
                card("Output")
                    .child(Terminal::view(COINS_TERMINAL_ID, "Run a split or combine to see its output.")),
            )
            .build(),
    );
}

fn optional(raw: String) -> Option<String> {
    Some(raw).filter(|value| !value.is_empty())
}

fn network_choice(cx: &PageCx, id: &str) -> String {
    optional(cx.input(id)).unwrap_or_else(|| cx.services.config.network.clone())
}

pub fn read_split(cx: &PageCx) -> Result<CoinSplitRequest, String> {
    let pair = cx.input("split-pair");
    if pair.is_empty() {
        return Err("Pair is required".to_string());
    }
    Ok(CoinSplitRequest {
        pair,
        coin_id: optional(cx.input("split-coin-id")),
        amount_per_coin: parse_positive(&cx.input("split-amount"), "Amount per coin")?,
        number_of_coins: parse_positive(&cx.input("split-count"), "Number of coins")?,
        network: network_choice(cx, "split-network"),
        no_wait: cx.checked("split-no-wait"),
    })
}

pub fn read_combine(cx: &PageCx) -> Result<CoinCombineRequest, String> {
    let pair = cx.input("combine-pair");
    if pair.is_empty() {
        return Err("Pair is required".to_string());
    }
    Ok(CoinCombineRequest {
        pair,
        input_coin_count: parse_positive(&cx.input("combine-count"), "Input coin count")?,
        asset_id: optional(cx.input("combine-asset")),
        network: network_choice(cx, "combine-network"),
        no_wait: cx.checked("combine-no-wait"),
    })
}

pub async fn run_split(cx: &PageCx) {
    match read_split(cx) {
        Err(message) => cx.toast(&message, Tone::Warning),
        Ok(request) => {
            tracing::info!(pair = %request.pair, coins = request.number_of_coins, "coin split requested");
            run_streamed(
                cx,
                StreamRequest::CoinSplit(request),
                COINS_TERMINAL_ID,
                (SPLIT_RUN_ID, SPLIT_LABEL),
            )
            .await;
        }
    }
}

pub async fn run_combine(cx: &PageCx) {
    match read_combine(cx) {
        Err(message) => cx.toast(&message, Tone::Warning),
        Ok(request) => {
            tracing::info!(pair = %request.pair, inputs = request.input_coin_count, "coin combine requested");
            run_streamed(
                cx,
                StreamRequest::CoinCombine(request),
                COINS_TERMINAL_ID,
                (COMBINE_RUN_ID, COMBINE_LABEL),
            )
            .await;
        }
    }
}
