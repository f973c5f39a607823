use crate::actions::Action;
use crate::api::{BuildOfferRequest, StreamRequest};
use crate::models::Market;
use crate::pages::coins::NETWORKS;
use crate::pages::{PageCx, parse_positive, run_streamed};
use crate::terminal::Terminal;
use crate::view::{Tone, ViewNode, button, card, checkbox, field, h, select, text_input};

pub const BUILD_TERMINAL_ID: &str = "build-terminal";
pub const BUILD_RUN_ID: &str = "build-run";
pub const VENUES: [&str; 3] = [DEFAULT_VENUE, "dexie", "splash"];

const DEFAULT_VENUE: &str = "(default)";
const DEFAULT_PAIR: &str = "CARBON22:xch";
const DRY_RUN_LABEL: &str = "Build offer (dry run)";
const POST_LABEL: &str = "Build & post offer";

/// Form values, optionally prefilled from a market handed over by the markets page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPrefill {
    pub pair: String,
    pub size_base_units: u64,
}

impl BuildPrefill {
    /// A handed-over market fills in its pair and smallest sell rung.
    pub fn from_market(market: &Market) -> Self {
        let size = market
            .ladders
            .sell
            .iter()
            .flatten()
            .map(|rung| rung.size().ceil() as u64)
            .filter(|size| *size > 0)
            .min()
            .unwrap_or(1);
        Self {
            pair: market.pair(),
            size_base_units: size,
        }
    }
}

impl Default for BuildPrefill {
    fn default() -> Self {
        Self {
            pair: DEFAULT_PAIR.to_string(),
            size_base_units: 1,
        }
    }
}

pub fn build_form(prefill: &BuildPrefill, network: &str, source: Option<&str>) -> ViewNode {
    let mut form = card("Build & Post Offer").id("build-form");
    if let Some(market) = source {
        form = form.child(h("p").class("card-note").text(format!("Prefilled from market {market}.")));
    }
    form.child(
        h("div")
            .class("form-row")
            .child(field("Pair", text_input("build-pair", &prefill.pair, "e.g. CARBON22:xch")))
            .child(field(
                "Size (base units)",
                text_input("build-size", &prefill.size_base_units.to_string(), "1"),
            )),
    )
    .child(
        h("div")
            .class("form-row")
            .child(field("Network", select("build-network", &NETWORKS, network)))
            .child(field("Venue", select("build-venue", &VENUES, DEFAULT_VENUE))),
    )
    .child(field("Dry run (no actual posting)", checkbox("build-dry-run", true)))
    .child(
        h("p")
            .class("form-hint")
            .text("Uncheck dry run only when keys are onboarded and the vault is funded."),
    )
    .child(button(DRY_RUN_LABEL, "btn-secondary", Action::RunBuild).id(BUILD_RUN_ID))
    .child(Terminal::view(BUILD_TERMINAL_ID, "Build output appears here."))
    .build()
}

pub async fn render(cx: &PageCx) {
    cx.top_bar(Vec::new());
    let market = cx.services.handoff.take_build_market();
    let prefill = market.as_ref().map(BuildPrefill::from_market).unwrap_or_default();
    if let Some(market) = &market {
        tracing::debug!(market = %market.id, "build form prefilled from market");
    }
    cx.show(build_form(
        &prefill,
        &cx.services.config.network,
        market.as_ref().map(|market| market.id.as_str()),
    ));
}

pub fn read_request(cx: &PageCx) -> Result<BuildOfferRequest, String> {
    let pair = cx.input("build-pair");
    if pair.is_empty() {
        return Err("Pair is required".to_string());
    }
    let venue = cx.input("build-venue");
    let network = cx.input("build-network");
    Ok(BuildOfferRequest {
        pair,
        size_base_units: parse_positive(&cx.input("build-size"), "Size")?,
        network: if network.is_empty() {
            cx.services.config.network.clone()
        } else {
            network
        },
        dry_run: cx.checked("build-dry-run"),
        venue: Some(venue).filter(|venue| !venue.is_empty() && venue != DEFAULT_VENUE),
    })
}

pub async fn run_build(cx: &PageCx) {
    match read_request(cx) {
        Err(message) => cx.toast(&message, Tone::Warning),
        Ok(request) => {
            let label = if request.dry_run { DRY_RUN_LABEL } else { POST_LABEL };
            tracing::info!(pair = %request.pair, size = request.size_base_units, dry_run = request.dry_run, "offer build requested");
            run_streamed(cx, StreamRequest::BuildOffer(request), BUILD_TERMINAL_ID, (BUILD_RUN_ID, label)).await;
        }
    }
}
