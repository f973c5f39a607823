use futures::join;
use serde_json::{Map, Value};

use crate::actions::Action;
use crate::error::ApiError;
use crate::format::EMPTY_PLACEHOLDER;
use crate::models::{ConfigDocument, WalletKey, WalletStatus, value_as_u64};
use crate::pages::{PageCx, fetch_failure, parse_positive};
use crate::surface::ControlState;
use crate::view::{
    Tone, ViewNode, badge, button, card, checkbox, empty_state, field, flag_badge, h, table,
    text_input,
};

pub const SETTINGS_SAVE_ID: &str = "settings-save";
pub const SAGE_ENABLED_ID: &str = "sage-enabled";
pub const SAGE_PORT_ID: &str = "sage-port";
pub const SAGE_CERT_ID: &str = "sage-cert-path";
pub const SAGE_KEY_ID: &str = "sage-key-path";
pub const DEFAULT_SAGE_PORT: u64 = 9257;

/// Wallet-bridge RPC settings as stored under `sage_rpc` in the program config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SageSettings {
    pub enabled: bool,
    pub port: u64,
    pub cert_path: String,
    pub key_path: String,
}

impl Default for SageSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            port: DEFAULT_SAGE_PORT,
            cert_path: String::new(),
            key_path: String::new(),
        }
    }
}

impl SageSettings {
    pub fn from_document(document: &ConfigDocument) -> Self {
        let text = |key: &str| {
            document
                .lookup(&format!("sage_rpc.{key}"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let defaults = Self::default();
        Self {
            enabled: document
                .lookup("sage_rpc.enabled")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.enabled),
            port: document
                .lookup("sage_rpc.port")
                .map(value_as_u64)
                .filter(|port| *port > 0)
                .unwrap_or(defaults.port),
            cert_path: text("cert_path"),
            key_path: text("key_path"),
        }
    }

    /// Dotted-path patches; empty paths are written as null so the backend uses its defaults.
    pub fn patches(&self) -> Map<String, Value> {
        let path = |raw: &str| {
            if raw.is_empty() {
                Value::Null
            } else {
                Value::String(raw.to_string())
            }
        };
        let mut patches = Map::new();
        patches.insert("sage_rpc.enabled".to_string(), Value::Bool(self.enabled));
        patches.insert("sage_rpc.port".to_string(), Value::from(self.port));
        patches.insert("sage_rpc.cert_path".to_string(), path(&self.cert_path));
        patches.insert("sage_rpc.key_path".to_string(), path(&self.key_path));
        patches
    }
}

pub fn login_button_id(fingerprint: u64) -> String {
    format!("key-login-{fingerprint}")
}

fn settings_form(settings: &SageSettings) -> ViewNode {
    card("Sage Wallet RPC")
        .id("sage-settings")
        .child(field("Enabled", checkbox(SAGE_ENABLED_ID, settings.enabled)))
        .child(
            h("div")
                .class("form-row")
                .child(field("Port", text_input(SAGE_PORT_ID, &settings.port.to_string(), "9257")))
                .child(field("Certificate path", text_input(SAGE_CERT_ID, &settings.cert_path, "default")))
                .child(field("Key path", text_input(SAGE_KEY_ID, &settings.key_path, "default"))),
        )
        .child(button("Save", "btn-primary", Action::SaveSettings).id(SETTINGS_SAVE_ID))
        .build()
}

fn keys_card(keys: &Result<Vec<WalletKey>, ApiError>, active: Option<u64>) -> ViewNode {
    let body = match keys {
        Err(error) => fetch_failure("wallet keys", error),
        Ok(keys) if keys.is_empty() => empty_state("No keys in the wallet."),
        Ok(keys) => {
            let rows = keys
                .iter()
                .map(|key| {
                    let is_active = active == Some(key.fingerprint);
                    let login = button(
                        if is_active { "Active" } else { "Log in" },
                        "btn-secondary btn-small",
                        Action::LoginKey {
                            fingerprint: key.fingerprint,
                        },
                    )
                    .id(login_button_id(key.fingerprint))
                    .attr("disabled", is_active);
                    h("tr")
                        .child(h("td").class("mono").text(key.fingerprint.to_string()))
                        .child(h("td").text(key.name.as_deref().unwrap_or(EMPTY_PLACEHOLDER)))
                        .child(h("td").text(key.kind.as_deref().unwrap_or(EMPTY_PLACEHOLDER)))
                        .child(h("td").child(flag_badge(is_active, "active", "idle")))
                        .child(h("td").child(login))
                        .build()
                })
                .collect();
            table(&["Fingerprint", "Name", "Kind", "State", ""], rows)
        }
    };
    card("Wallet Keys").id("wallet-keys").child(body).build()
}

pub async fn render(cx: &PageCx) {
    cx.top_bar(vec![
        button("Refresh", "btn-secondary", Action::RefreshPage).build(),
    ]);
    cx.loading("Loading settings…");

    let api = cx.api();
    let (document, keys, status) = join!(api.read_config(), api.wallet_keys(), api.wallet_status());
    if !cx.is_live() {
        return;
    }
    let settings = match &document {
        Ok(document) => settings_form(&SageSettings::from_document(document)),
        Err(error) => card("Sage Wallet RPC")
            .child(fetch_failure("the program config", error))
            .build(),
    };
    let (connection, active) = match &status {
        Ok(status) => (connection_badge(status), status.active_fingerprint()),
        Err(error) => {
            tracing::warn!(%error, "wallet status unavailable");
            (badge("unknown", Tone::Warning), None)
        }
    };
    cx.show(
        h("div")
            .child(h("div").class("section-header").text("Wallet bridge ").child(connection))
            .child(settings)
            .child(keys_card(&keys, active))
            .build(),
    );
}

fn connection_badge(status: &WalletStatus) -> ViewNode {
    flag_badge(status.connected, "connected", "disconnected")
}

pub fn read_settings(cx: &PageCx) -> Result<SageSettings, String> {
    Ok(SageSettings {
        enabled: cx.checked(SAGE_ENABLED_ID),
        port: parse_positive(&cx.input(SAGE_PORT_ID), "Port")?,
        cert_path: cx.input(SAGE_CERT_ID),
        key_path: cx.input(SAGE_KEY_ID),
    })
}

pub async fn save(cx: &PageCx) {
    let settings = match read_settings(cx) {
        Ok(settings) => settings,
        Err(message) => {
            cx.toast(&message, Tone::Warning);
            return;
        }
    };
    cx.set_control(SETTINGS_SAVE_ID, &ControlState::busy("Saving…"));
    match cx.api().write_config(&settings.patches()).await {
        Ok(_) => {
            tracing::info!(enabled = settings.enabled, port = settings.port, "wallet bridge settings saved");
            cx.toast("Settings saved", Tone::Success);
        }
        Err(error) => {
            tracing::warn!(%error, "saving settings failed");
            cx.toast(&error.operator_message(), Tone::Error);
        }
    }
    cx.set_control(SETTINGS_SAVE_ID, &ControlState::ready("Save"));
}

pub async fn login(cx: &PageCx, fingerprint: u64) {
    let control = login_button_id(fingerprint);
    cx.set_control(&control, &ControlState::busy("Logging in…"));
    match cx.api().wallet_login(fingerprint).await {
        Ok(_) => {
            tracing::info!(fingerprint, "wallet key activated");
            cx.toast(&format!("Logged in to key {fingerprint}"), Tone::Success);
            render(cx).await;
        }
        Err(error) => {
            tracing::warn!(%error, fingerprint, "wallet login failed");
            cx.toast(&error.operator_message(), Tone::Error);
            cx.set_control(&control, &ControlState::ready("Log in"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settings_read_from_config_with_defaults() {
        let document = ConfigDocument {
            path: None,
            config: json!({"sage_rpc": {"enabled": true, "cert_path": "/certs/wallet.crt"}}),
        };
        let settings = SageSettings::from_document(&document);
        assert!(settings.enabled);
        assert_eq!(settings.port, DEFAULT_SAGE_PORT);
        assert_eq!(settings.cert_path, "/certs/wallet.crt");
        assert_eq!(settings.key_path, "");
    }

    #[test]
    fn empty_paths_patch_to_null() {
        let patches = SageSettings::default().patches();
        assert_eq!(patches.get("sage_rpc.port"), Some(&json!(9257)));
        assert_eq!(patches.get("sage_rpc.key_path"), Some(&Value::Null));
        assert_eq!(patches.len(), 4);
    }

    #[test]
    fn active_key_cannot_log_in_again() {
        let keys = Ok(vec![
            WalletKey {
                fingerprint: 1,
                name: Some("hot".to_string()),
                kind: None,
            },
            WalletKey {
                fingerprint: 2,
                name: None,
                kind: None,
            },
        ]);
        let view = keys_card(&keys, Some(1));
        let active = view.find_by_id(&login_button_id(1)).map(|button| button.property("disabled"));
        let idle = view.find_by_id(&login_button_id(2)).map(|button| button.property("disabled"));
        assert_eq!(active, Some(true));
        assert_eq!(idle, Some(false));
    }
}
