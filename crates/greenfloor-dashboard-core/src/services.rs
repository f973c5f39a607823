use std::rc::Rc;

use crate::api::DashboardApi;
use crate::config::DashboardConfig;
use crate::navigation::Handoff;
use crate::runtime::Runtime;
use crate::surface::Surface;

/// Collaborators shared by the shell and every page controller.
pub struct Services {
    pub api: Rc<dyn DashboardApi>,
    pub surface: Rc<dyn Surface>,
    pub runtime: Rc<dyn Runtime>,
    pub config: DashboardConfig,
    pub handoff: Handoff,
}

impl Services {
    pub fn new(
        api: Rc<dyn DashboardApi>,
        surface: Rc<dyn Surface>,
        runtime: Rc<dyn Runtime>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            api,
            surface,
            runtime,
            config,
            handoff: Handoff::default(),
        }
    }
}
