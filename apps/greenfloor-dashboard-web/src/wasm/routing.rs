use super::*;

/// Runs `run` against the booted shell. The `Rc` is cloned out first so the
/// thread-local is not borrowed while the shell re-enters it.
pub(super) fn with_shell(run: impl FnOnce(&Rc<DashboardShell>)) {
    let shell = SHELL.with(|slot| slot.borrow().clone());
    match shell {
        Some(shell) => run(&shell),
        None => tracing::warn!("dashboard shell is not booted"),
    }
}

pub(super) fn dispatch(action: Action) {
    with_shell(|shell| shell.dispatch(action));
}

/// Dispatches on the next tick, outside the event listener that produced `action`.
pub(super) fn dispatch_deferred(action: Action) {
    spawn_local(async move { dispatch(action) });
}

/// Builds the sidebar once. Page changes are tracked in memory only.
pub(super) fn render_nav(document: &Document) -> Result<(), String> {
    let nav = document
        .get_element_by_id(NAV_ID)
        .ok_or_else(|| "navigation element is missing".to_string())?;
    nav.set_inner_html("");
    let links = materialize(document, &nav_view(DOCUMENT_TITLE_SUFFIX), Region::Chrome)
        .map_err(|_| "failed to build navigation".to_string())?;
    nav.append_child(&links)
        .map_err(|_| "failed to attach navigation".to_string())?;
    Ok(())
}
