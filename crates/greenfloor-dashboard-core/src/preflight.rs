//! Coin sufficiency check run before a market is enabled.
//!
//! For each ladder side the market configures, the required coin mass and count
//! are compared with the spendable coins the wallet holds for that side's asset.

use crate::actions::Action;
use crate::api::DashboardApi;
use crate::config::DashboardConfig;
use crate::error::ApiError;
use crate::format::format_amount;
use crate::models::{CoinQuery, Market, PriceFeed, Rung, canonical_asset_id, is_native_asset};
use crate::navigation::{Page, PageContext, SplitContext};
use crate::view::{Tone, ViewNode, badge, button, h};

pub const PREFLIGHT_MODAL_ID: &str = "preflight-modal";
const MAX_COIN_PAGES: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Sell,
    Buy,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Self::Sell => "Sell",
            Self::Buy => "Buy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Known(u64),
    /// No price is configured to convert the ladder into quote units.
    Unknown,
}

/// What one side of a ladder needs, before looking at the wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct SideRequirement {
    pub side: Side,
    pub symbol: String,
    pub asset_id: Option<String>,
    pub precision: u32,
    pub required_mojos: Requirement,
    pub required_count: u64,
    pub rungs: Vec<Rung>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Unknown,
    Shortfall { gap: u64 },
    NeedsSplitting { split_target: u64 },
    Ready,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SidePreflight {
    pub side: Side,
    pub symbol: String,
    pub asset_id: Option<String>,
    pub precision: u32,
    pub required_mojos: Requirement,
    pub required_count: u64,
    pub available_mojos: u64,
    pub available_count: u64,
    /// Mass sufficiency only; coin count is judged separately.
    pub ok: bool,
    pub rungs: Vec<Rung>,
    pub fetch_error: Option<String>,
}

impl SidePreflight {
    pub fn evaluate(requirement: SideRequirement, available_mojos: u64, available_count: u64) -> Self {
        let ok = matches!(
            requirement.required_mojos,
            Requirement::Known(required) if available_mojos >= required
        );
        Self {
            side: requirement.side,
            symbol: requirement.symbol,
            asset_id: requirement.asset_id,
            precision: requirement.precision,
            required_mojos: requirement.required_mojos,
            required_count: requirement.required_count,
            available_mojos,
            available_count,
            ok,
            rungs: requirement.rungs,
            fetch_error: None,
        }
    }

    pub fn count_ok(&self) -> bool {
        self.available_count >= self.required_count
    }

    pub fn verdict(&self, split_buffer: u64) -> Verdict {
        match self.required_mojos {
            Requirement::Unknown => Verdict::Unknown,
            Requirement::Known(required) if !self.ok => Verdict::Shortfall {
                gap: required.saturating_sub(self.available_mojos),
            },
            Requirement::Known(_) if !self.count_ok() => Verdict::NeedsSplitting {
                split_target: self.required_count.saturating_add(split_buffer),
            },
            Requirement::Known(_) => Verdict::Ready,
        }
    }

    /// Smallest rung size, used as the per-coin amount of a suggested split.
    pub fn smallest_rung_size(&self) -> u64 {
        self.rungs
            .iter()
            .map(|rung| rung.size().ceil() as u64)
            .filter(|size| *size > 0)
            .min()
            .unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Preflight {
    pub market: Market,
    pub sides: Vec<SidePreflight>,
}

impl Preflight {
    pub fn all_ok(&self) -> bool {
        self.sides.iter().all(|side| side.ok)
    }
}

fn precision_for(asset_id: Option<&str>, config: &DashboardConfig) -> u32 {
    if is_native_asset(asset_id) {
        config.native_precision
    } else {
        config.token_precision
    }
}

/// Scales to minimal units and rounds up. Values within float noise of a whole
/// unit snap to it instead of gaining a spurious extra mojo.
fn scaled_ceil(amount: f64, precision: u32) -> u64 {
    let scaled = amount * 10_f64.powi(precision as i32);
    if !scaled.is_finite() || scaled <= 0.0 {
        return 0;
    }
    let nearest = scaled.round();
    if (scaled - nearest).abs() <= nearest * 1e-12 {
        nearest as u64
    } else {
        scaled.ceil() as u64
    }
}

/// Quote units paid per base unit on the buy side, if any price source applies.
pub fn buy_quote_per_base(market: &Market, prices: Option<&PriceFeed>) -> Option<f64> {
    let usd_derived = market
        .quote_is_native()
        .then(|| {
            let usd_per_base = market.pricing_number("buy_usd_per_base")?;
            let native_usd = prices?.native_usd()?;
            Some(usd_per_base / native_usd)
        })
        .flatten();
    usd_derived.or_else(|| market.pricing_number("min_price_quote_per_base"))
}

pub fn required_for_side(
    market: &Market,
    side: Side,
    prices: Option<&PriceFeed>,
    config: &DashboardConfig,
) -> Option<SideRequirement> {
    let rungs = match side {
        Side::Sell => market.ladders.sell.as_ref(),
        Side::Buy => market.ladders.buy.as_ref(),
    }
    .filter(|rungs| !rungs.is_empty())?;

    let required_count = rungs.iter().map(Rung::coin_count).sum();
    let base_units: f64 = rungs
        .iter()
        .map(|rung| rung.coin_count() as f64 * rung.size())
        .sum();

    let (symbol, asset) = match side {
        Side::Sell => (market.base_symbol.clone(), market.base_asset.as_str()),
        Side::Buy => (market.quote_symbol(), market.quote_asset.as_str()),
    };
    let precision = precision_for(Some(asset), config);
    let required_mojos = match side {
        Side::Sell => Requirement::Known(scaled_ceil(base_units, precision)),
        Side::Buy => buy_quote_per_base(market, prices).map_or(Requirement::Unknown, |price| {
            Requirement::Known(scaled_ceil(base_units * price, precision))
        }),
    };

    Some(SideRequirement {
        side,
        symbol,
        asset_id: canonical_asset_id(Some(asset)),
        precision,
        required_mojos,
        required_count,
        rungs: rungs.clone(),
    })
}

/// Sums spendable coins for an asset, walking the wallet's coin pages.
pub async fn spendable_coins(
    api: &dyn DashboardApi,
    asset_id: Option<&str>,
    page_size: u32,
) -> Result<(u64, u64), ApiError> {
    let mut mass = 0_u64;
    let mut count = 0_u64;
    for page_index in 0..MAX_COIN_PAGES {
        let page = api
            .wallet_coins(&CoinQuery {
                asset_id: asset_id.map(str::to_string),
                limit: page_size,
                offset: page_index * u64::from(page_size),
            })
            .await?;
        let fetched = page.coins.len() as u64;
        for coin in page.coins.iter().filter(|coin| coin.spendable) {
            mass = mass.saturating_add(coin.amount);
            count += 1;
        }
        let seen = (page_index + 1) * u64::from(page_size);
        if fetched < u64::from(page_size) || page.total.is_some_and(|total| seen >= total) {
            break;
        }
    }
    Ok((mass, count))
}

pub async fn run_preflight(
    api: &dyn DashboardApi,
    market: &Market,
    config: &DashboardConfig,
) -> Preflight {
    let needs_prices = market.ladders.buy.as_ref().is_some_and(|rungs| !rungs.is_empty())
        && market.quote_is_native();
    let prices = if needs_prices {
        api.prices()
            .await
            .inspect_err(|error| tracing::warn!(%error, "price feed unavailable for pre-flight"))
            .ok()
    } else {
        None
    };

    let mut sides = Vec::new();
    for side in [Side::Sell, Side::Buy] {
        let Some(requirement) = required_for_side(market, side, prices.as_ref(), config) else {
            continue;
        };
        let asset_id = requirement.asset_id.clone();
        let evaluated = match spendable_coins(api, asset_id.as_deref(), config.coin_page_size).await {
            Ok((mass, count)) => SidePreflight::evaluate(requirement, mass, count),
            Err(error) => {
                tracing::warn!(%error, side = side.label(), "coin fetch failed during pre-flight");
                let mut evaluated = SidePreflight::evaluate(requirement, 0, 0);
                evaluated.fetch_error = Some(error.operator_message());
                evaluated
            }
        };
        sides.push(evaluated);
    }

    tracing::info!(
        market = %market.id,
        all_ok = sides.iter().all(|side| side.ok),
        "pre-flight complete"
    );
    Preflight {
        market: market.clone(),
        sides,
    }
}

fn amount_line(side: &SidePreflight, mojos: u64, count: u64) -> String {
    format!(
        "{} in {count} coins",
        format_amount(mojos, side.precision, &side.symbol)
    )
}

pub fn split_context(market: &Market, side: &SidePreflight, split_target: u64) -> SplitContext {
    SplitContext {
        pair: market.pair(),
        asset_id: side.asset_id.clone(),
        symbol: side.symbol.clone(),
        number_of_coins: split_target,
        amount_per_coin: side.smallest_rung_size(),
    }
}

fn verdict_view(market: &Market, side: &SidePreflight, split_buffer: u64) -> ViewNode {
    match side.verdict(split_buffer) {
        Verdict::Ready => h("div")
            .class("verdict verdict-ok")
            .child(badge("Ready", Tone::Success))
            .build(),
        Verdict::Unknown => h("div")
            .class("verdict verdict-unknown")
            .child(badge("Unknown", Tone::Warning))
            .text(" Cannot determine requirement: no buy price or minimum quote price is configured.")
            .build(),
        Verdict::Shortfall { gap } => h("div")
            .class("verdict verdict-shortfall")
            .child(badge("Shortfall", Tone::Error))
            .text(format!(
                " Short by {}. Fund the wallet before enabling.",
                format_amount(gap, side.precision, &side.symbol)
            ))
            .build(),
        Verdict::NeedsSplitting { split_target } => {
            let context = split_context(market, side, split_target);
            h("div")
                .class("verdict verdict-split")
                .child(badge("Needs splitting", Tone::Warning))
                .text(format!(
                    " Enough {} in total, but only {} of {} coins. Split into {split_target} coins.",
                    side.symbol, side.available_count, side.required_count
                ))
                .child(button(
                    "Split coins",
                    "btn-secondary",
                    Action::NavigateWith(Page::Coins, Box::new(PageContext::SplitCoins(context))),
                ))
                .build()
        }
    }
}

fn side_panel(market: &Market, side: &SidePreflight, split_buffer: u64) -> ViewNode {
    let required = match side.required_mojos {
        Requirement::Known(mojos) => amount_line(side, mojos, side.required_count),
        Requirement::Unknown => format!("unknown in {} coins", side.required_count),
    };
    let mut panel = h("div")
        .class(format!(
            "preflight-side {}",
            if side.ok { "side-ok" } else { "side-short" }
        ))
        .child(h("h4").text(format!("{} side · {}", side.side.label(), side.symbol)))
        .child(
            h("div")
                .class("preflight-row")
                .child(h("span").class("row-label").text("Required"))
                .child(h("span").class("row-value").text(required)),
        )
        .child(
            h("div")
                .class("preflight-row")
                .child(h("span").class("row-label").text("Available"))
                .child(
                    h("span")
                        .class("row-value")
                        .text(amount_line(side, side.available_mojos, side.available_count)),
                ),
        );
    if let Some(error) = &side.fetch_error {
        panel = panel.child(h("p").class("preflight-error").text(error.clone()));
    }
    panel.child(verdict_view(market, side, split_buffer)).build()
}

/// Modal body for a finished pre-flight.
pub fn preflight_view(preflight: &Preflight, split_buffer: u64) -> ViewNode {
    let market = &preflight.market;
    let mut body = h("div")
        .id(PREFLIGHT_MODAL_ID)
        .class("modal preflight")
        .child(h("h3").text(format!("Enable {}?", market.label())))
        .child(h("p").class("muted").text(market.display_pair()));

    if preflight.sides.is_empty() {
        body = body.child(h("p").text("No ladder is configured; nothing to check."));
    }
    body = body.children(
        preflight
            .sides
            .iter()
            .map(|side| side_panel(market, side, split_buffer)),
    );

    let footer = if preflight.all_ok() {
        h("div")
            .class("modal-footer all-clear")
            .child(badge("All clear", Tone::Success))
            .text(" Enabling…")
    } else {
        h("div")
            .class("modal-footer")
            .child(button("Cancel", "btn-secondary", Action::CancelEnable).id("preflight-cancel"))
            .child(button("Enable anyway", "btn-warning", Action::ConfirmEnable).id("preflight-confirm"))
    };
    body.child(footer).build()
}

pub fn preflight_loading(market: &Market) -> ViewNode {
    h("div")
        .id(PREFLIGHT_MODAL_ID)
        .class("modal preflight")
        .child(h("h3").text(format!("Enable {}?", market.label())))
        .child(crate::view::loading("Checking coins…"))
        .child(
            h("div")
                .class("modal-footer")
                .child(button("Cancel", "btn-secondary", Action::CancelEnable)),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ladders;
    use serde_json::json;

    fn sell_market(rungs: Vec<Rung>) -> Market {
        let mut market = Market::named("m1");
        market.base_symbol = "XCH".to_string();
        market.base_asset = "xch".to_string();
        market.quote_asset = "wusdc".to_string();
        market.ladders = Ladders {
            sell: Some(rungs),
            ..Ladders::default()
        };
        market
    }

    #[test]
    fn sell_requirement_scales_by_native_precision() {
        let market = sell_market(vec![Rung::new(2, 5, 1)]);
        let requirement =
            required_for_side(&market, Side::Sell, None, &DashboardConfig::default()).expect("side");
        assert_eq!(requirement.required_count, 6);
        assert_eq!(requirement.required_mojos, Requirement::Known(12_000_000_000_000));
        assert!(requirement.asset_id.is_none());
        assert!(required_for_side(&market, Side::Buy, None, &DashboardConfig::default()).is_none());
    }

    #[test]
    fn token_sides_use_fallback_precision() {
        let mut market = Market::named("m2");
        market.base_symbol = "BYC".to_string();
        market.base_asset = "ae1536f5".to_string();
        market.ladders.sell = Some(vec![Rung::new(10, 2, 0), Rung::new(1, 1, 1)]);
        let requirement =
            required_for_side(&market, Side::Sell, None, &DashboardConfig::default()).expect("side");
        assert_eq!(requirement.precision, 3);
        assert_eq!(requirement.required_count, 4);
        assert_eq!(requirement.required_mojos, Requirement::Known(22_000));
        assert_eq!(requirement.asset_id.as_deref(), Some("ae1536f5"));
    }

    #[test]
    fn buy_side_converts_usd_through_native_price() {
        let mut market = Market::named("m3");
        market.base_symbol = "BYC".to_string();
        market.quote_asset = "xch".to_string();
        market.pricing = json!({"buy_usd_per_base": 1.0}).as_object().cloned().unwrap_or_default();
        market.ladders.buy = Some(vec![Rung::new(1, 3, 0)]);
        let prices = PriceFeed {
            xch_usd: Some(4.0),
            tickers: Vec::new(),
        };
        let requirement = required_for_side(
            &market,
            Side::Buy,
            Some(&prices),
            &DashboardConfig::default(),
        )
        .expect("side");
        // 3 coins * 1 base * 0.25 XCH
        assert_eq!(requirement.required_mojos, Requirement::Known(750_000_000_000));
    }

    #[test]
    fn buy_side_falls_back_to_min_price_then_unknown() {
        let mut market = Market::named("m4");
        market.quote_asset = "xch".to_string();
        market.ladders.buy = Some(vec![Rung::new(1, 1, 0)]);
        let config = DashboardConfig::default();

        let unknown = required_for_side(&market, Side::Buy, None, &config).expect("side");
        assert_eq!(unknown.required_mojos, Requirement::Unknown);

        market.pricing = json!({"buy_usd_per_base": 0.5, "min_price_quote_per_base": 0.25})
            .as_object()
            .cloned()
            .unwrap_or_default();
        let fallback = required_for_side(&market, Side::Buy, None, &config).expect("side");
        assert_eq!(fallback.required_mojos, Requirement::Known(250_000_000_000));
    }

    #[test]
    fn unknown_requirement_is_never_ok() {
        let mut market = Market::named("m5");
        market.ladders.buy = Some(vec![Rung::new(1, 1, 0)]);
        let requirement =
            required_for_side(&market, Side::Buy, None, &DashboardConfig::default()).expect("side");
        let side = SidePreflight::evaluate(requirement, u64::MAX, 100);
        assert!(!side.ok);
        assert_eq!(side.verdict(2), Verdict::Unknown);
    }

    #[test]
    fn split_context_uses_smallest_rung_and_pair() {
        let market = sell_market(vec![Rung::new(5, 1, 0), Rung::new(2, 1, 0)]);
        let requirement =
            required_for_side(&market, Side::Sell, None, &DashboardConfig::default()).expect("side");
        let side = SidePreflight::evaluate(requirement, 7_000_000_000_000, 1);
        assert_eq!(side.verdict(2), Verdict::NeedsSplitting { split_target: 4 });
        let context = split_context(&market, &side, 4);
        assert_eq!(context.pair, "xch:wusdc");
        assert_eq!(context.amount_per_coin, 2);
        assert_eq!(context.number_of_coins, 4);
    }

    #[test]
    fn float_noise_does_not_add_a_mojo() {
        assert_eq!(scaled_ceil(0.1 * 3.0, 3), 300);
        assert_eq!(scaled_ceil(0.3001, 3), 301);
        assert_eq!(scaled_ceil(0.0, 12), 0);
    }

    #[test]
    fn failing_view_offers_enable_anyway_and_cancel() {
        let market = sell_market(vec![Rung::new(2, 5, 1)]);
        let requirement =
            required_for_side(&market, Side::Sell, None, &DashboardConfig::default()).expect("side");
        let preflight = Preflight {
            market,
            sides: vec![SidePreflight::evaluate(requirement, 0, 0)],
        };
        let view = preflight_view(&preflight, 2);
        let actions = view.actions();
        assert!(actions.contains(&&Action::ConfirmEnable));
        assert!(actions.contains(&&Action::CancelEnable));
        assert!(view.text_content().contains("Short by 12 XCH"));
    }
}
