//! Boot-time configuration: the object the host page publishes, then URL query overrides.

use greenfloor_dashboard_core::{ConfigError, DashboardConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct BootConfig {
    pub config: DashboardConfig,
    /// Every layer that was rejected, in the order it was applied.
    pub rejected: Vec<ConfigError>,
}

/// A rejected layer is skipped; the layers below it still apply.
pub fn resolve(published: Option<&str>, query: &str) -> BootConfig {
    let mut rejected = Vec::new();
    let base = match published {
        Some(raw) => DashboardConfig::from_json(raw).unwrap_or_else(|error| {
            rejected.push(error);
            DashboardConfig::default()
        }),
        None => DashboardConfig::default(),
    };
    let config = match base.clone().apply_query(query) {
        Ok(config) => config,
        Err(error) => {
            rejected.push(error);
            base
        }
    };
    BootConfig { config, rejected }
}
