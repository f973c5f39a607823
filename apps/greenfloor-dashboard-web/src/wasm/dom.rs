use super::*;

use greenfloor_dashboard_core::patcher::{
    LOOP_CARD_ID, LOOP_EVENTS_ID, LOOP_TITLE_ID, LOOP_TOGGLE_SLOT_ID, is_patched_container,
};
use greenfloor_dashboard_core::terminal::Terminal;
use greenfloor_dashboard_core::view::Element as ViewElement;
use web_sys::{HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement};

/// Which part of the document a listener belongs to. Listeners are released with their region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Region {
    Chrome,
    Page,
    LoopCard,
    Modal,
}

#[derive(Default)]
pub(super) struct ListenerRegistry {
    held: Vec<(Region, Closure<dyn FnMut(Event)>)>,
}

impl ListenerRegistry {
    fn hold(&mut self, region: Region, closure: Closure<dyn FnMut(Event)>) {
        self.held.push((region, closure));
    }

    fn release(&mut self, region: Region) -> Vec<Closure<dyn FnMut(Event)>> {
        let (released, kept) = std::mem::take(&mut self.held)
            .into_iter()
            .partition::<Vec<_>, _>(|(owner, _)| *owner == region);
        self.held = kept;
        released.into_iter().map(|(_, closure)| closure).collect()
    }
}

pub(super) fn hold_listener(region: Region, closure: Closure<dyn FnMut(Event)>) {
    LISTENERS.with(|registry| registry.borrow_mut().hold(region, closure));
}

/// Drops the region's closures on the next tick; one of them may be on the stack.
pub(super) fn release_region(region: Region) {
    let released = LISTENERS.with(|registry| registry.borrow_mut().release(region));
    if !released.is_empty() {
        spawn_local(async move { drop(released) });
    }
}

fn listen(target: &Element, event: &str, region: Region, action: Action) -> Result<(), JsValue> {
    let submit = event == "submit";
    let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        if submit {
            event.prevent_default();
        }
        dispatch_deferred(action.clone());
    });
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    hold_listener(region, closure);
    Ok(())
}

/// Builds live DOM for a view node, wiring its listeners into `region`.
pub(super) fn materialize(document: &Document, node: &ViewNode, region: Region) -> Result<Node, JsValue> {
    match node {
        ViewNode::Text(value) => Ok(document.create_text_node(value).into()),
        ViewNode::Markup(markup) => {
            let holder = document.create_element("span")?;
            holder.set_inner_html(markup);
            Ok(holder.into())
        }
        ViewNode::Element(element) => {
            let target = document.create_element(&element.tag)?;
            for (name, value) in &element.attributes {
                target.set_attribute(name, value)?;
            }
            for listener in &element.listeners {
                listen(&target, &listener.event, region, listener.action.clone())?;
            }
            append_children(document, &target, &element.children, child_region(element, region))?;
            for (name, flag) in &element.properties {
                js_sys::Reflect::set(&target, &JsValue::from_str(name), &JsValue::from_bool(*flag))?;
            }
            Ok(target.into())
        }
    }
}

/// Page content inside a loop card container belongs to the card's patch cycle, so the
/// first patch releases the listeners of the initial render.
fn child_region(element: &ViewElement, region: Region) -> Region {
    let patched = element
        .attributes
        .get("id")
        .is_some_and(|id| is_patched_container(id));
    if region == Region::Page && patched {
        Region::LoopCard
    } else {
        region
    }
}

fn append_children(
    document: &Document,
    parent: &Element,
    children: &[ViewNode],
    region: Region,
) -> Result<(), JsValue> {
    for child in children {
        match child {
            ViewNode::Markup(markup) => parent.insert_adjacent_html("beforeend", markup)?,
            other => {
                parent.append_child(&materialize(document, other, region)?)?;
            }
        }
    }
    Ok(())
}

fn logged(result: Result<(), JsValue>, what: &str) -> bool {
    match result {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(error = ?error, "{what} failed");
            false
        }
    }
}

pub(super) struct BrowserSurface {
    document: Document,
}

impl BrowserSurface {
    pub(super) fn new(document: Document) -> Self {
        Self { document }
    }

    fn element(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn fill(&self, id: &str, nodes: &[ViewNode], region: Region) -> Result<bool, JsValue> {
        let Some(target) = self.element(id) else {
            return Ok(false);
        };
        target.set_inner_html("");
        append_children(&self.document, &target, nodes, region)?;
        Ok(true)
    }

    fn fill_logged(&self, id: &str, nodes: &[ViewNode], region: Region) -> bool {
        match self.fill(id, nodes, region) {
            Ok(found) => found,
            Err(error) => {
                tracing::warn!(id, error = ?error, "filling element failed");
                false
            }
        }
    }

    fn in_modal(element: &Element) -> bool {
        element
            .closest(&format!("#{MODAL_ROOT_ID}"))
            .ok()
            .flatten()
            .is_some()
    }

    fn patch_card(&self, card: &Element, patch: &CardPatch) -> Result<(), JsValue> {
        release_region(Region::LoopCard);
        card.set_class_name(&loop_card_class(patch.border));

        if let Some(title) = self.element(LOOP_TITLE_ID) {
            while let Some(stale) = title.next_element_sibling() {
                stale.remove();
            }
            if let Some(header) = title.parent_element() {
                append_children(&self.document, &header, &patch.badges, Region::LoopCard)?;
            }
        }

        for (id, value) in &patch.stats {
            if let Some(stat) = self.element(id) {
                stat.set_text_content(Some(value.as_str()));
            }
        }

        self.fill(LOOP_TOGGLE_SLOT_ID, std::slice::from_ref(&patch.toggle), Region::LoopCard)?;
        self.fill(LOOP_EVENTS_ID, &patch.events, Region::LoopCard)?;
        Ok(())
    }

    fn mount_modal(&self, root: &Element, body: &ViewNode, backdrop: Action) -> Result<(), JsValue> {
        let layer = self.document.create_element("div")?;
        layer.set_class_name("modal-backdrop");
        let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let on_backdrop = match (event.target(), event.current_target()) {
                (Some(target), Some(current)) => js_sys::Object::is(&target, &current),
                _ => false,
            };
            if on_backdrop {
                dispatch_deferred(backdrop.clone());
            }
        });
        layer.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
        hold_listener(Region::Modal, closure);
        layer.append_child(&materialize(&self.document, body, Region::Modal)?)?;
        root.append_child(&layer)?;
        Ok(())
    }

    fn mount_toast(&self, root: &Element, message: &str, tone: Tone) -> Result<Element, JsValue> {
        let toast = self.document.create_element("div")?;
        toast.set_class_name(&format!("toast toast-{}", tone.as_str()));
        toast.set_text_content(Some(message));
        root.append_child(&toast)?;
        Ok(toast)
    }
}

impl Surface for BrowserSurface {
    fn set_active_page(&self, page: Page) {
        for candidate in Page::ALL {
            if let Some(link) = self.element(&candidate.nav_id()) {
                let _ = link.class_list().toggle_with_force("active", candidate == page);
            }
        }
        self.set_text(PAGE_TITLE_ID, page.title());
        self.document
            .set_title(&format!("{} · {DOCUMENT_TITLE_SUFFIX}", page.title()));
    }

    fn reset_page(&self) {
        release_region(Region::Page);
        release_region(Region::LoopCard);
        for id in [CONTENT_ID, TOP_BAR_ID] {
            if let Some(region) = self.element(id) {
                region.set_inner_html("");
            }
        }
    }

    fn set_top_bar(&self, nodes: Vec<ViewNode>) {
        self.fill_logged(TOP_BAR_ID, &nodes, Region::Page);
    }

    fn set_content(&self, node: ViewNode) {
        self.fill_logged(CONTENT_ID, std::slice::from_ref(&node), Region::Page);
    }

    fn replace(&self, id: &str, node: ViewNode) -> bool {
        let Some(existing) = self.element(id) else {
            return false;
        };
        let region = if Self::in_modal(&existing) {
            Region::Modal
        } else {
            Region::Page
        };
        logged(
            materialize(&self.document, &node, region)
                .and_then(|fresh| existing.replace_with_with_node_1(&fresh)),
            "replacing element",
        )
    }

    fn set_text(&self, id: &str, text: &str) -> bool {
        let Some(element) = self.element(id) else {
            return false;
        };
        element.set_text_content(Some(text));
        true
    }

    fn set_control(&self, id: &str, state: &ControlState) -> bool {
        let Some(control) = self.element(id) else {
            return false;
        };
        if let Some(label) = &state.label {
            control.set_text_content(Some(label.as_str()));
        }
        logged(
            js_sys::Reflect::set(
                &control,
                &JsValue::from_str("disabled"),
                &JsValue::from_bool(state.disabled),
            )
            .map(|_| ()),
            "setting control state",
        )
    }

    fn input_value(&self, id: &str) -> Option<String> {
        let element = self.element(id)?;
        if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
            return Some(input.value());
        }
        if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
            return Some(select.value());
        }
        element
            .dyn_ref::<HtmlTextAreaElement>()
            .map(HtmlTextAreaElement::value)
    }

    fn checkbox_value(&self, id: &str) -> Option<bool> {
        self.element(id)?
            .dyn_ref::<HtmlInputElement>()
            .map(HtmlInputElement::checked)
    }

    fn append_terminal_line(&self, terminal_id: &str, line: ViewNode, clear_placeholder: bool) -> bool {
        let Some(terminal) = self.element(terminal_id) else {
            return false;
        };
        if clear_placeholder {
            if let Some(placeholder) = self.element(&Terminal::placeholder_id(terminal_id)) {
                placeholder.remove();
            }
        }
        let appended = materialize(&self.document, &line, Region::Page)
            .and_then(|node| terminal.append_child(&node).map(|_| ()));
        terminal.set_scroll_top(terminal.scroll_height());
        logged(appended, "appending terminal line")
    }

    fn patch_loop_card(&self, patch: &CardPatch) -> bool {
        let Some(card) = self.element(LOOP_CARD_ID) else {
            return false;
        };
        logged(self.patch_card(&card, patch), "patching loop card")
    }

    fn show_modal(&self, body: ViewNode, backdrop: Action) {
        release_region(Region::Modal);
        let Some(root) = self.element(MODAL_ROOT_ID) else {
            tracing::warn!("modal root is missing");
            return;
        };
        root.set_inner_html("");
        logged(self.mount_modal(&root, &body, backdrop), "showing modal");
    }

    fn close_modal(&self) {
        release_region(Region::Modal);
        if let Some(root) = self.element(MODAL_ROOT_ID) {
            root.set_inner_html("");
        }
    }

    fn toast(&self, message: &str, tone: Tone) {
        let Some(root) = self.element(TOAST_ROOT_ID) else {
            return;
        };
        match self.mount_toast(&root, message, tone) {
            Ok(toast) => spawn_local(async move {
                TimeoutFuture::new(TOAST_LIFETIME_MS).await;
                toast.remove();
            }),
            Err(error) => tracing::warn!(error = ?error, "showing toast failed"),
        }
    }

    fn alert(&self, message: &str) {
        let shown = self
            .document
            .default_view()
            .ok_or_else(|| JsValue::from_str("window is unavailable"))
            .and_then(|window| window.alert_with_message(message));
        logged(shown, "alert");
    }
}
