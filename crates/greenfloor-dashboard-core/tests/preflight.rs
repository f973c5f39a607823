use std::cell::RefCell;
use std::collections::HashMap;

use async_trait::async_trait;
use futures::executor::block_on;
use greenfloor_dashboard_core::models::{Market, Rung};
use greenfloor_dashboard_core::preflight::{
    Preflight, Requirement, Side, Verdict, preflight_view, run_preflight,
};
use greenfloor_dashboard_core::{
    Action, ApiClient, ApiError, ByteStream, DashboardConfig, HttpTransport, Page, PageContext,
    RawReply,
};
use serde_json::{Value, json};

/// Answers GETs from a fixed table and records every path asked for.
#[derive(Default)]
struct CoinWallet {
    replies: HashMap<String, String>,
    asked: RefCell<Vec<String>>,
}

impl CoinWallet {
    fn with(mut self, path: &str, body: Value) -> Self {
        self.replies.insert(path.to_string(), body.to_string());
        self
    }
}

#[async_trait(?Send)]
impl HttpTransport for CoinWallet {
    async fn get(&self, path: &str) -> Result<RawReply, ApiError> {
        self.asked.borrow_mut().push(path.to_string());
        self.replies
            .get(path)
            .map(|body| RawReply::ok(body.clone()))
            .ok_or_else(|| ApiError::network(format!("unreachable: {path}")))
    }

    async fn post(&self, path: &str, _body: &Value) -> Result<RawReply, ApiError> {
        Err(ApiError::network(format!("unexpected POST {path}")))
    }

    async fn post_stream(&self, path: &str, _body: &Value) -> Result<ByteStream, ApiError> {
        Err(ApiError::network(format!("unexpected stream {path}")))
    }
}

const NATIVE_COINS: &str = "/api/sage-rpc/coins?limit=500&offset=0";

fn coins(amounts: &[u64]) -> Value {
    let coins: Vec<Value> = amounts
        .iter()
        .enumerate()
        .map(|(index, amount)| json!({"coin_id": format!("c{index}"), "amount": amount}))
        .collect();
    json!({"coins": coins, "total": amounts.len()})
}

/// A market selling the native asset with one rung of two units, five target coins
/// and one coin of split headroom.
fn native_sell_market() -> Market {
    let mut market = Market::named("xch-sell");
    market.base_asset = "xch".to_string();
    market.base_symbol = "XCH".to_string();
    market.quote_asset = "a1b2c3".to_string();
    market.ladders.sell = Some(vec![Rung::new(2, 5, 1)]);
    market
}

fn preflight_with(amounts: &[u64]) -> Preflight {
    let api = ApiClient::new(CoinWallet::default().with(NATIVE_COINS, coins(amounts)));
    block_on(run_preflight(&api, &native_sell_market(), &DashboardConfig::default()))
}

#[test]
fn mass_shortfall_has_no_split_suggestion() {
    let preflight = preflight_with(&[
        2_000_000_000_000,
        2_000_000_000_000,
        2_000_000_000_000,
        2_000_000_000_000,
        1_000_000_000_000,
        1_000_000_000_000,
    ]);
    assert_eq!(preflight.sides.len(), 1);
    let side = &preflight.sides[0];
    assert_eq!(side.side, Side::Sell);
    assert_eq!(side.required_count, 6);
    assert_eq!(side.required_mojos, Requirement::Known(12_000_000_000_000));
    assert_eq!(side.available_mojos, 10_000_000_000_000);
    assert_eq!(side.available_count, 6);
    assert!(!side.ok);
    assert_eq!(
        side.verdict(2),
        Verdict::Shortfall {
            gap: 2_000_000_000_000
        }
    );

    let view = preflight_view(&preflight, 2);
    assert!(view.text_content().contains("Short by 2 XCH"));
    assert!(!view.text_content().contains("Needs splitting"));
    assert!(view.actions().contains(&&Action::ConfirmEnable));
}

#[test]
fn enough_mass_in_too_few_coins_needs_splitting() {
    let preflight = preflight_with(&[4_000_000_000_000, 4_000_000_000_000, 4_000_000_000_000]);
    let side = &preflight.sides[0];
    assert!(side.ok);
    assert!(!side.count_ok());
    assert_eq!(side.verdict(2), Verdict::NeedsSplitting { split_target: 8 });
    assert!(preflight.all_ok());

    let view = preflight_view(&preflight, 2);
    let text = view.text_content();
    assert!(text.contains("Needs splitting"));
    assert!(!text.contains("Short by"));
    let split = view.actions().into_iter().find_map(|action| match action {
        Action::NavigateWith(Page::Coins, context) => match context.as_ref() {
            PageContext::SplitCoins(split) => Some(split.clone()),
            _ => None,
        },
        _ => None,
    });
    let split = split.expect("split handoff");
    assert_eq!(split.number_of_coins, 8);
    assert_eq!(split.amount_per_coin, 2);
    assert_eq!(split.asset_id, None);
}

#[test]
fn coins_held_in_offers_do_not_count() {
    let body = json!({"coins": [
        {"coin_id": "a", "amount": 6_000_000_000_000_u64},
        {"coin_id": "b", "amount": 6_000_000_000_000_u64, "offer_id": "o1"},
        {"coin_id": "c", "amount": 6_000_000_000_000_u64, "spent_height": 812_000},
    ], "total": 3});
    let api = ApiClient::new(CoinWallet::default().with(NATIVE_COINS, body));
    let preflight = block_on(run_preflight(&api, &native_sell_market(), &DashboardConfig::default()));
    let side = &preflight.sides[0];
    assert_eq!(side.available_mojos, 6_000_000_000_000);
    assert_eq!(side.available_count, 1);
    assert!(!side.ok);
}

#[test]
fn full_pages_are_followed() {
    let config = DashboardConfig {
        coin_page_size: 2,
        ..DashboardConfig::default()
    };
    let wallet = CoinWallet::default()
        .with(
            "/api/sage-rpc/coins?limit=2&offset=0",
            json!({"coins": [{"coin_id": "a", "amount": 5}, {"coin_id": "b", "amount": 5}]}),
        )
        .with(
            "/api/sage-rpc/coins?limit=2&offset=2",
            json!({"coins": [{"coin_id": "c", "amount": 5}]}),
        );
    let api = ApiClient::new(wallet);
    let preflight = block_on(run_preflight(&api, &native_sell_market(), &config));
    assert_eq!(preflight.sides[0].available_count, 3);
    assert_eq!(preflight.sides[0].available_mojos, 15);
    assert_eq!(api.transport().asked.borrow().len(), 2);
}

#[test]
fn unreachable_wallet_reports_per_side() {
    let api = ApiClient::new(CoinWallet::default());
    let preflight = block_on(run_preflight(&api, &native_sell_market(), &DashboardConfig::default()));
    let side = &preflight.sides[0];
    assert!(!side.ok);
    assert!(side.fetch_error.is_some());
    assert!(!preflight.all_ok());
}
