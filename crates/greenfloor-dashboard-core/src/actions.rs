use crate::navigation::{Page, PageContext};

/// Operator intent bound to a control in the view tree.
///
/// Listeners carry data, not closures, so a view tree can be built, compared and
/// tested without a browser. The shell routes each action to its controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate(Page),
    NavigateWith(Page, Box<PageContext>),
    RefreshPage,

    StartLoop,
    StopLoop,
    TriggerLoop,

    ToggleMarket { market_id: String, enable: bool },
    ConfirmEnable,
    CancelEnable,

    CancelOffer { offer_id: String },
    CancelAllOffers,
    ReconcileOffers,

    SelectCoinAsset { asset_id: Option<String> },
    RunSplit,
    RunCombine,
    RunBuild,

    RunDoctor,
    ValidateConfig,
    ApplyConfigPatch,

    SaveSettings,
    LoginKey { fingerprint: u64 },
}

impl Action {
    /// Name used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Navigate(_) => "navigate",
            Self::NavigateWith(..) => "navigate_with",
            Self::RefreshPage => "refresh_page",
            Self::StartLoop => "start_loop",
            Self::StopLoop => "stop_loop",
            Self::TriggerLoop => "trigger_loop",
            Self::ToggleMarket { .. } => "toggle_market",
            Self::ConfirmEnable => "confirm_enable",
            Self::CancelEnable => "cancel_enable",
            Self::CancelOffer { .. } => "cancel_offer",
            Self::CancelAllOffers => "cancel_all_offers",
            Self::ReconcileOffers => "reconcile_offers",
            Self::SelectCoinAsset { .. } => "select_coin_asset",
            Self::RunSplit => "run_split",
            Self::RunCombine => "run_combine",
            Self::RunBuild => "run_build",
            Self::RunDoctor => "run_doctor",
            Self::ValidateConfig => "validate_config",
            Self::ApplyConfigPatch => "apply_config_patch",
            Self::SaveSettings => "save_settings",
            Self::LoginKey { .. } => "login_key",
        }
    }
}
