use futures::join;
use serde_json::Map;

use crate::actions::Action;
use crate::error::ApiError;
use crate::models::{CommandOutput, ConfigDocument, ConfigPaths, parse_patch_value};
use crate::pages::{PageCx, command_output_view, fetch_failure};
use crate::surface::ControlState;
use crate::view::{Tone, ViewNode, button, card, field, h, json_view, loading, text_input};

pub const CONFIG_RESULT_ID: &str = "config-result";
pub const DOCTOR_ID: &str = "config-doctor";
pub const VALIDATE_ID: &str = "config-validate";
pub const PATCH_PATH_ID: &str = "patch-path";
pub const PATCH_VALUE_ID: &str = "patch-value";
pub const PATCH_APPLY_ID: &str = "patch-apply";

fn paths_card(paths: &ConfigPaths) -> ViewNode {
    let entries = [
        ("Program config", &paths.program_config),
        ("Markets config", &paths.markets_config),
        ("Manager command", &paths.manager_cmd),
        ("Python", &paths.python),
    ];
    card("Config Paths & Environment")
        .id("config-paths")
        .child(
            h("div").class("check-list").children(entries.iter().map(|(label, value)| {
                h("div")
                    .class("check-item")
                    .child(h("div").class("ci-key").text(*label))
                    .child(h("div").class("ci-val mono").text(value.as_str()))
                    .build()
            })),
        )
        .build()
}

fn document_card(document: &ConfigDocument) -> ViewNode {
    let mut view = card("Program Config").id("config-document");
    if let Some(path) = document.path.as_deref() {
        view = view.child(h("p").class("muted mono").text(path));
    }
    view.child(json_view(&document.config)).build()
}

fn patch_editor() -> ViewNode {
    card("Patch Config")
        .id("config-patch")
        .child(
            h("p")
                .class("form-hint")
                .text("Dotted path such as sage_rpc.port. The value is read as JSON, or as text if it is not valid JSON."),
        )
        .child(
            h("div")
                .class("form-row")
                .child(field("Path", text_input(PATCH_PATH_ID, "", "section.key")))
                .child(field("Value", text_input(PATCH_VALUE_ID, "", "value"))),
        )
        .child(button("Apply", "btn-primary", Action::ApplyConfigPatch).id(PATCH_APPLY_ID))
        .build()
}

pub async fn render(cx: &PageCx) {
    cx.top_bar(vec![
        button("Doctor", "btn-secondary", Action::RunDoctor).id(DOCTOR_ID).build(),
        button("Validate config", "btn-primary", Action::ValidateConfig).id(VALIDATE_ID).build(),
        button("Refresh", "btn-secondary", Action::RefreshPage).build(),
    ]);
    cx.loading("Loading config…");

    let (document, paths) = join!(cx.api().read_config(), cx.api().config_paths());
    if !cx.is_live() {
        return;
    }
    let paths = match paths {
        Ok(paths) => paths_card(&paths),
        Err(error) => card("Config Paths & Environment")
            .child(fetch_failure("config paths", &error))
            .build(),
    };
    let document = match document {
        Ok(document) => document_card(&document),
        Err(error) => card("Program Config")
            .child(fetch_failure("the program config", &error))
            .build(),
    };
    cx.show(
        h("div")
            .child(paths)
            .child(h("div").id(CONFIG_RESULT_ID))
            .child(patch_editor())
            .child(document)
            .build(),
    );
}

async fn run_check(
    cx: &PageCx,
    title: &str,
    control: (&str, &str),
    check: impl std::future::Future<Output = Result<CommandOutput, ApiError>>,
) {
    let (control_id, label) = control;
    cx.set_control(control_id, &ControlState::busy("Running…"));
    cx.replace(
        CONFIG_RESULT_ID,
        card(title).id(CONFIG_RESULT_ID).child(loading("Running…")).build(),
    );
    let body = match check.await {
        Ok(output) => {
            tracing::info!(check = title, ok = output.ok, "config check finished");
            command_output_view(&output)
        }
        Err(error) => {
            tracing::warn!(%error, check = title, "config check failed");
            fetch_failure(title, &error)
        }
    };
    cx.replace(CONFIG_RESULT_ID, card(title).id(CONFIG_RESULT_ID).child(body).build());
    cx.set_control(control_id, &ControlState::ready(label));
}

pub async fn run_doctor(cx: &PageCx) {
    run_check(cx, "Doctor", (DOCTOR_ID, "Doctor"), cx.api().doctor()).await;
}

pub async fn validate(cx: &PageCx) {
    run_check(
        cx,
        "Config Validation",
        (VALIDATE_ID, "Validate config"),
        cx.api().validate_config(),
    )
    .await;
}

pub async fn apply_patch(cx: &PageCx) {
    let path = cx.input(PATCH_PATH_ID);
    if path.is_empty() || path.split('.').any(str::is_empty) {
        cx.toast("Enter a dotted config path such as sage_rpc.port", Tone::Warning);
        return;
    }
    let value = parse_patch_value(&cx.input(PATCH_VALUE_ID));
    let mut patches = Map::new();
    patches.insert(path.clone(), value);

    cx.set_control(PATCH_APPLY_ID, &ControlState::busy("Saving…"));
    match cx.api().write_config(&patches).await {
        Ok(_) => {
            tracing::info!(path = %path, "config patch applied");
            cx.toast(&format!("Saved {path}"), Tone::Success);
            render(cx).await;
        }
        Err(error) => {
            tracing::warn!(%error, path = %path, "config patch failed");
            cx.toast(&error.operator_message(), Tone::Error);
            cx.set_control(PATCH_APPLY_ID, &ControlState::ready("Apply"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_renders_through_json_markup() {
        let document = ConfigDocument {
            path: Some("/etc/greenfloor/program.yaml".to_string()),
            config: json!({"sage_rpc": {"port": 9257}}),
        };
        let view = document_card(&document);
        assert!(view.find(&|element| element.has_class("json")).is_some());
        assert!(view.text_content().contains("program.yaml"));
    }

    #[test]
    fn paths_card_lists_every_path() {
        let paths = ConfigPaths {
            program_config: "/a".to_string(),
            markets_config: "/b".to_string(),
            manager_cmd: "greenfloor-manager".to_string(),
            python: "python3".to_string(),
        };
        let text = paths_card(&paths).text_content();
        for expected in ["/a", "/b", "greenfloor-manager", "python3"] {
            assert!(text.contains(expected));
        }
    }
}
