pub(crate) const CONFIG_GLOBAL: &str = "__GREENFLOOR_DASHBOARD__";
pub(crate) const APP_ROOT_ID: &str = "greenfloor-dashboard";
pub(crate) const STYLE_ID: &str = "greenfloor-dashboard-style";
pub(crate) const NAV_ID: &str = "greenfloor-nav";
pub(crate) const PAGE_TITLE_ID: &str = "page-title";
pub(crate) const TOP_BAR_ID: &str = "top-bar";
pub(crate) const CONTENT_ID: &str = "content";
pub(crate) const MODAL_ROOT_ID: &str = "modal-root";
pub(crate) const TOAST_ROOT_ID: &str = "toast-root";
pub(crate) const BOOT_STATUS_ID: &str = "boot-status";
pub(crate) const DOCUMENT_TITLE_SUFFIX: &str = "GreenFloor";
pub(crate) const TOAST_LIFETIME_MS: u32 = 4_000;

pub(crate) const DASHBOARD_CSS: &str = r#"
:root {
  --bg: #0b0f14; --panel: #121821; --border: #233040; --text: #d6dde6; --muted: #7b8a9c;
  --green: #3ddc84; --amber: #f5b942; --red: #f06a6a; --blue: #5aa9f5;
  font-family: "Inter", system-ui, sans-serif; font-size: 14px;
}
body { margin: 0; background: var(--bg); color: var(--text); }
#greenfloor-dashboard { display: grid; grid-template-columns: 200px 1fr; min-height: 100vh; }
#greenfloor-nav { background: var(--panel); border-right: 1px solid var(--border); padding: 16px 0; }
#greenfloor-nav .brand { font-weight: 700; padding: 0 16px 16px; color: var(--green); }
#greenfloor-nav .nav-link { display: block; width: 100%; padding: 8px 16px; border: 0; background: none; color: var(--muted); font: inherit; text-align: left; cursor: pointer; }
#greenfloor-nav .nav-link.active { color: var(--text); background: var(--border); }
main { padding: 16px 24px; overflow: auto; }
header.page-header { display: flex; align-items: center; justify-content: space-between; margin-bottom: 16px; }
#top-bar { display: flex; gap: 8px; }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(360px, 1fr)); gap: 16px; }
.card { background: var(--panel); border: 1px solid var(--border); border-radius: 8px; padding: 16px; margin-bottom: 16px; }
.card-title { margin: 0 0 12px; font-size: 15px; }
.card-header { display: flex; align-items: center; gap: 8px; flex-wrap: wrap; }
.loop-card.border-running { border-color: var(--green); }
.loop-card.border-ready { border-color: var(--amber); }
.stats { display: flex; gap: 24px; flex-wrap: wrap; margin: 12px 0; }
.stat-label { color: var(--muted); font-size: 12px; }
.stat-value { font-size: 18px; }
.badge { display: inline-block; padding: 2px 8px; border-radius: 999px; font-size: 12px; background: var(--border); }
.badge-success { color: var(--green); } .badge-warning { color: var(--amber); }
.badge-error { color: var(--red); } .badge-info { color: var(--blue); }
.btn { border: 1px solid var(--border); border-radius: 6px; padding: 6px 12px; background: var(--border); color: var(--text); cursor: pointer; }
.btn:disabled { opacity: 0.5; cursor: default; }
.btn-primary { background: #1d6b45; } .btn-danger { background: #7a2d2d; } .btn-warning { background: #7a5a1d; }
.btn-link { background: none; border: none; color: var(--blue); padding: 0; }
.btn-small { padding: 2px 8px; font-size: 12px; }
table { width: 100%; border-collapse: collapse; }
th, td { text-align: left; padding: 6px 8px; border-bottom: 1px solid var(--border); }
th { color: var(--muted); font-weight: 500; }
.mono, code, pre { font-family: "JetBrains Mono", ui-monospace, monospace; font-size: 12px; }
.muted { color: var(--muted); }
.form-row { display: flex; gap: 12px; flex-wrap: wrap; }
.field { display: flex; flex-direction: column; gap: 4px; margin-bottom: 12px; }
.field input, .field select { background: var(--bg); color: var(--text); border: 1px solid var(--border); border-radius: 4px; padding: 6px; }
.terminal { background: #05080b; border: 1px solid var(--border); border-radius: 6px; padding: 8px; height: 260px; overflow-y: auto; }
.term-line { white-space: pre-wrap; }
.term-cmd { color: var(--blue); } .term-json-ok, .term-done-ok { color: var(--green); }
.term-json-warn, .term-stderr { color: var(--amber); }
.term-json-error, .term-done-fail, .term-error { color: var(--red); }
.term-placeholder { color: var(--muted); }
pre.json { background: #05080b; padding: 12px; border-radius: 6px; overflow: auto; }
.json-key { color: var(--blue); } .json-str { color: #c3e88d; } .json-num { color: #f78c6c; }
.json-true { color: var(--green); } .json-false { color: var(--red); } .json-null { color: var(--muted); }
.event { display: flex; gap: 8px; padding: 2px 0; }
.event-error { color: var(--red); } .event-warning { color: var(--amber); } .event-success { color: var(--green); }
.modal-backdrop { position: fixed; inset: 0; background: rgba(0, 0, 0, 0.6); display: flex; align-items: center; justify-content: center; z-index: 40; }
.modal { background: var(--panel); border: 1px solid var(--border); border-radius: 8px; padding: 20px; min-width: 420px; max-width: 640px; }
.modal-footer { display: flex; gap: 8px; justify-content: flex-end; margin-top: 16px; }
.preflight-side { border-left: 3px solid var(--border); padding-left: 12px; margin: 12px 0; }
.preflight-side.side-ok { border-color: var(--green); } .preflight-side.side-short { border-color: var(--red); }
.preflight-row { display: flex; justify-content: space-between; }
#toast-root { position: fixed; right: 16px; bottom: 16px; display: flex; flex-direction: column; gap: 8px; z-index: 50; }
.toast { padding: 10px 14px; border-radius: 6px; background: var(--panel); border: 1px solid var(--border); }
.toast-success { border-color: var(--green); } .toast-error { border-color: var(--red); }
.toast-warning { border-color: var(--amber); } .toast-info { border-color: var(--blue); }
.error-panel { color: var(--red); }
.loading, .empty-state { color: var(--muted); padding: 12px 0; }
"#;
