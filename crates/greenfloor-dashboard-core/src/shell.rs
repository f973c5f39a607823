//! Navigation shell: owns the current page scope and routes operator actions.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use crate::actions::Action;
use crate::navigation::{Page, PageContext};
use crate::pages::{self, PageCx, build, coins, config, dashboard, markets, offers, settings};
use crate::pages::markets::EnableFlow;
use crate::runtime::PageScope;
use crate::services::Services;

pub struct DashboardShell {
    services: Rc<Services>,
    current: Cell<Page>,
    scope: RefCell<Rc<PageScope>>,
    enable_flow: Rc<EnableFlow>,
}

impl DashboardShell {
    pub fn new(services: Rc<Services>) -> Rc<Self> {
        Rc::new(Self {
            services,
            current: Cell::new(Page::Dashboard),
            scope: RefCell::new(Rc::new(PageScope::new())),
            enable_flow: Rc::new(EnableFlow::default()),
        })
    }

    pub fn services(&self) -> &Rc<Services> {
        &self.services
    }

    pub fn current_page(&self) -> Page {
        self.current.get()
    }

    pub fn enable_flow(&self) -> &EnableFlow {
        &self.enable_flow
    }

    /// Context for the page currently shown.
    pub fn page_cx(&self) -> PageCx {
        PageCx::new(Rc::clone(&self.services), self.scope.borrow().clone())
    }

    /// Tears down the current page and renders `page`, handing `context` to it.
    pub fn navigate(self: &Rc<Self>, page: Page, context: Option<PageContext>) {
        let previous = self.scope.replace(Rc::new(PageScope::new()));
        previous.dispose();
        if self.enable_flow.abandon() {
            self.services.surface.close_modal();
        }
        if let Some(context) = context {
            self.services.handoff.put(context);
        }

        tracing::debug!(from = self.current.get().name(), to = page.name(), "navigating");
        self.current.set(page);
        let surface = &self.services.surface;
        surface.reset_page();
        surface.set_active_page(page);

        let cx = self.page_cx();
        self.spawn(async move { pages::render(page, &cx).await });
    }

    /// Navigates by page name; unknown names land on the dashboard.
    pub fn navigate_to(self: &Rc<Self>, name: &str) {
        self.navigate(Page::from_name(name), None);
    }

    fn spawn(&self, task: impl Future<Output = ()> + 'static) {
        self.services.runtime.spawn(Box::pin(task));
    }

    pub fn dispatch(self: &Rc<Self>, action: Action) {
        tracing::info!(action = action.label(), page = self.current.get().name(), "operator action");
        let cx = self.page_cx();
        match action {
            Action::Navigate(page) => self.navigate(page, None),
            Action::NavigateWith(page, context) => self.navigate(page, Some(*context)),
            Action::RefreshPage => self.navigate(self.current.get(), None),

            Action::StartLoop => self.spawn(async move { dashboard::start_loop(&cx).await }),
            Action::StopLoop => self.spawn(async move { dashboard::stop_loop(&cx).await }),
            Action::TriggerLoop => self.spawn(async move { dashboard::trigger_loop(&cx).await }),

            Action::ToggleMarket {
                market_id,
                enable: true,
            } => {
                let flow = Rc::clone(&self.enable_flow);
                self.spawn(async move { markets::begin_enable(&cx, &flow, &market_id).await });
            }
            Action::ToggleMarket {
                market_id,
                enable: false,
            } => self.spawn(async move { markets::disable(&cx, &market_id).await }),
            Action::ConfirmEnable => {
                let flow = Rc::clone(&self.enable_flow);
                self.spawn(async move { markets::confirm_enable(&cx, &flow).await });
            }
            Action::CancelEnable => markets::cancel_enable(&cx, &self.enable_flow),

            Action::CancelOffer { offer_id } => {
                self.spawn(async move { offers::cancel_offer(&cx, &offer_id).await });
            }
            Action::CancelAllOffers => self.spawn(async move { offers::cancel_all(&cx).await }),
            Action::ReconcileOffers => self.spawn(async move { offers::reconcile(&cx).await }),

            Action::SelectCoinAsset { asset_id } => {
                self.navigate(Page::Coins, Some(PageContext::CoinAsset(asset_id)));
            }
            Action::RunSplit => self.spawn(async move { coins::run_split(&cx).await }),
            Action::RunCombine => self.spawn(async move { coins::run_combine(&cx).await }),
            Action::RunBuild => self.spawn(async move { build::run_build(&cx).await }),

            Action::RunDoctor => self.spawn(async move { config::run_doctor(&cx).await }),
            Action::ValidateConfig => self.spawn(async move { config::validate(&cx).await }),
            Action::ApplyConfigPatch => self.spawn(async move { config::apply_patch(&cx).await }),

            Action::SaveSettings => self.spawn(async move { settings::save(&cx).await }),
            Action::LoginKey { fingerprint } => {
                self.spawn(async move { settings::login(&cx, fingerprint).await });
            }
        }
    }
}
