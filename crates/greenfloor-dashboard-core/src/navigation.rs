use std::cell::RefCell;

use crate::actions::Action;
use crate::models::Market;
use crate::view::{ViewNode, h};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Dashboard,
    Markets,
    Offers,
    Coins,
    Build,
    Config,
    Settings,
}

impl Page {
    pub const ALL: [Page; 7] = [
        Page::Dashboard,
        Page::Markets,
        Page::Offers,
        Page::Coins,
        Page::Build,
        Page::Config,
        Page::Settings,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Markets => "markets",
            Self::Offers => "offers",
            Self::Coins => "coins",
            Self::Build => "build",
            Self::Config => "config",
            Self::Settings => "settings",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Markets => "Markets",
            Self::Offers => "Offers",
            Self::Coins => "Coins",
            Self::Build => "Build Offer",
            Self::Config => "Config",
            Self::Settings => "Settings",
        }
    }

    /// Unknown names land on the dashboard.
    pub fn from_name(raw: &str) -> Self {
        let normalized = raw.trim().trim_start_matches('#').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|page| page.name() == normalized)
            .unwrap_or(Self::Dashboard)
    }

    pub fn nav_id(self) -> String {
        format!("nav-{}", self.name())
    }
}

/// Sidebar links. Navigation stays in memory: entries are plain buttons, so a click
/// never touches the location or the history stack.
pub fn nav_view(brand: &str) -> ViewNode {
    h("div")
        .class("nav-links")
        .child(h("div").class("brand").text(brand))
        .children(Page::ALL.into_iter().map(|page| {
            h("button")
                .attr("type", "button")
                .id(page.nav_id())
                .class("nav-link")
                .on("click", Action::Navigate(page))
                .text(page.title())
                .build()
        }))
        .build()
}

/// Prefill for the coin split form, produced by the pre-flight "needs splitting" hint.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitContext {
    pub pair: String,
    pub asset_id: Option<String>,
    pub symbol: String,
    pub number_of_coins: u64,
    pub amount_per_coin: u64,
}

/// Context carried from one page to the next.
#[derive(Debug, Clone, PartialEq)]
pub enum PageContext {
    BuildMarket(Box<Market>),
    SplitCoins(SplitContext),
    /// Coin view filtered to one asset; `None` is the native asset.
    CoinAsset(Option<String>),
}

/// Single-slot, single-consumer mailbox between pages. A read always clears it.
#[derive(Debug, Default)]
pub struct Handoff {
    slot: RefCell<Option<PageContext>>,
}

impl Handoff {
    pub fn put(&self, context: PageContext) {
        if let Some(previous) = self.slot.borrow_mut().replace(context) {
            tracing::debug!(?previous, "handoff overwritten before it was consumed");
        }
    }

    pub fn take(&self) -> Option<PageContext> {
        self.slot.borrow_mut().take()
    }

    pub fn take_build_market(&self) -> Option<Market> {
        match self.take() {
            Some(PageContext::BuildMarket(market)) => Some(*market),
            _ => None,
        }
    }

    pub fn take_split(&self) -> Option<SplitContext> {
        match self.take() {
            Some(PageContext::SplitCoins(context)) => Some(context),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slot.borrow().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::Listener;

    #[test]
    fn page_names_round_trip() {
        for page in Page::ALL {
            assert_eq!(Page::from_name(page.name()), page);
        }
        assert_eq!(Page::from_name("#Coins"), Page::Coins);
        assert_eq!(Page::from_name("nowhere"), Page::Dashboard);
    }

    #[test]
    fn nav_entries_navigate_without_links() {
        let nav = nav_view("GreenFloor");
        let children = match &nav {
            ViewNode::Element(nav) => nav.children.as_slice(),
            _ => &[],
        };
        let entries: Vec<_> = children
            .iter()
            .filter_map(|child| match child {
                ViewNode::Element(entry) if entry.tag == "button" => Some(entry),
                _ => None,
            })
            .collect();
        assert_eq!(entries.len(), Page::ALL.len());
        for (entry, page) in entries.into_iter().zip(Page::ALL) {
            assert!(!entry.attributes.contains_key("href"));
            assert_eq!(entry.attributes.get("id"), Some(&page.nav_id()));
            assert_eq!(
                entry.listeners,
                vec![Listener {
                    event: "click".to_string(),
                    action: Action::Navigate(page),
                }]
            );
        }
    }

    #[test]
    fn handoff_is_consumed_once() {
        let handoff = Handoff::default();
        handoff.put(PageContext::BuildMarket(Box::new(Market::named("m1"))));
        assert_eq!(handoff.take_build_market().map(|m| m.id), Some("m1".to_string()));
        assert!(handoff.take_build_market().is_none());
    }

    #[test]
    fn mismatched_read_still_clears() {
        let handoff = Handoff::default();
        handoff.put(PageContext::BuildMarket(Box::new(Market::named("m1"))));
        assert!(handoff.take_split().is_none());
        assert!(handoff.is_empty());
    }
}
