//! WebAssembly entry point and DOM surface adapter.

use kurbo::{Point, Size};
use panelkit_core::{
    ControllerRegistry, ElementId, EventKind, EventOutcome, Instant, InteractionError,
    InteractionResult, ListenTarget, ListenerHandle, ListenerTable, Surface, UiEvent,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement, Window};

/// Attribute carrying the id a DOM element was assigned.
const NODE_ATTRIBUTE: &str = "data-panelkit-node";
/// How often throttled scroll positions are evaluated.
const TICK_INTERVAL_MS: i32 = 50;
/// Detached elements are dropped from the id map every this many ticks.
const PRUNE_EVERY_TICKS: u32 = 40;
const DOCUMENT_EVENTS: [&str; 5] = [
    "pointerdown",
    "pointermove",
    "pointerup",
    "keydown",
    "click",
];

/// [`Surface`] backed by the live browser document.
///
/// DOM elements get an [`ElementId`] the first time the adapter sees them.
/// Listener registrations are bookkeeping only; [`run_wasm`] installs one
/// delegated listener per event type and routes through the table.
pub struct DomSurface {
    window: Window,
    document: Document,
    body: ElementId,
    elements: RefCell<HashMap<ElementId, Element>>,
    next_id: Cell<u64>,
    listeners: ListenerTable,
}

impl DomSurface {
    pub fn new() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("No document"))?;
        let body: Element = document
            .body()
            .ok_or_else(|| JsValue::from_str("No body"))?
            .into();

        let surface = Self {
            window,
            document,
            body: ElementId(0),
            elements: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
            listeners: ListenerTable::new(),
        };
        let body = surface.register(&body);
        Ok(Self { body, ..surface })
    }

    /// Id for a DOM element, assigning one on first sight.
    pub fn register(&self, element: &Element) -> ElementId {
        let known = element
            .get_attribute(NODE_ATTRIBUTE)
            .and_then(|value| value.parse::<u64>().ok())
            .map(ElementId)
            .filter(|id| self.elements.borrow().contains_key(id));
        if let Some(id) = known {
            return id;
        }

        let id = ElementId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        if let Err(e) = element.set_attribute(NODE_ATTRIBUTE, &id.0.to_string()) {
            log::warn!("Failed to tag element {}: {:?}", id, e);
        }
        self.elements.borrow_mut().insert(id, element.clone());
        id
    }

    fn element(&self, id: ElementId) -> Option<Element> {
        self.elements.borrow().get(&id).cloned()
    }

    fn html(&self, id: ElementId) -> Option<HtmlElement> {
        self.element(id)?.dyn_into::<HtmlElement>().ok()
    }

    /// Forget every element no longer attached to the document. Returns how
    /// many were dropped. Elements created but not yet appended count as
    /// detached, so append before the next prune.
    pub fn prune(&self) -> usize {
        let mut elements = self.elements.borrow_mut();
        let before = elements.len();
        elements.retain(|id, element| *id == self.body || element.is_connected());
        let dropped = before - elements.len();
        if dropped > 0 {
            log::debug!("Pruned {} detached elements", dropped);
        }
        dropped
    }

    /// Computed margin on one side, in pixels.
    fn margin(&self, element: &Element, side: &str) -> f64 {
        self.window
            .get_computed_style(element)
            .ok()
            .flatten()
            .and_then(|style| style.get_property_value(&format!("margin-{}", side)).ok())
            .and_then(|value| value.trim_end_matches("px").parse().ok())
            .unwrap_or(0.0)
    }

    fn set_style(&self, id: ElementId, property: &str, value: &str) {
        let Some(element) = self.html(id) else {
            return;
        };
        if let Err(e) = element.style().set_property(property, value) {
            log::warn!("Failed to set {} on {}: {:?}", property, id, e);
        }
    }
}

impl Surface for DomSurface {
    fn body(&self) -> ElementId {
        self.body
    }

    fn exists(&self, id: ElementId) -> bool {
        self.element(id).is_some_and(|element| element.is_connected())
    }

    fn parent(&self, id: ElementId) -> Option<ElementId> {
        let parent = self.element(id)?.parent_element()?;
        Some(self.register(&parent))
    }

    fn query_all(&self, selector: &str) -> Vec<ElementId> {
        let nodes = match self.document.query_selector_all(selector) {
            Ok(nodes) => nodes,
            Err(e) => {
                log::warn!("Invalid selector {}: {:?}", selector, e);
                return Vec::new();
            }
        };
        (0..nodes.length())
            .filter_map(|i| nodes.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(|element| self.register(&element))
            .collect()
    }

    fn create_element(&mut self, tag: &str) -> InteractionResult<ElementId> {
        let element = self
            .document
            .create_element(tag)
            .map_err(|e| InteractionError::Surface(format!("create <{}>: {:?}", tag, e)))?;
        Ok(self.register(&element))
    }

    fn append_child(&mut self, parent: ElementId, child: ElementId) {
        let (Some(parent), Some(child)) = (self.element(parent), self.element(child)) else {
            return;
        };
        if let Err(e) = parent.append_child(&child) {
            log::warn!("Failed to append child: {:?}", e);
        }
    }

    fn set_text(&mut self, id: ElementId, text: &str) {
        if let Some(element) = self.element(id) {
            element.set_text_content(Some(text));
        }
    }

    fn remove(&mut self, id: ElementId) {
        let removed = self.elements.borrow_mut().remove(&id);
        if let Some(element) = removed {
            element.remove();
            self.prune();
        }
    }

    // Offsets include the margin; style `left`/`top` do not.
    fn position(&self, id: ElementId) -> Point {
        self.html(id).map_or(Point::ZERO, |element| {
            Point::new(
                element.offset_left() as f64 - self.margin(&element, "left"),
                element.offset_top() as f64 - self.margin(&element, "top"),
            )
        })
    }

    fn size(&self, id: ElementId) -> Size {
        self.html(id).map_or(Size::ZERO, |element| {
            Size::new(element.offset_width() as f64, element.offset_height() as f64)
        })
    }

    fn scroll_position(&self) -> f64 {
        self.window.scroll_y().unwrap_or(0.0)
    }

    fn set_position(&mut self, id: ElementId, position: Point) {
        self.set_style(id, "left", &format!("{}px", position.x));
        self.set_style(id, "top", &format!("{}px", position.y));
    }

    // Written as border-box so it matches the offset size read back.
    fn set_size(&mut self, id: ElementId, size: Size) {
        self.set_style(id, "box-sizing", "border-box");
        self.set_style(id, "width", &format!("{}px", size.width));
        self.set_style(id, "height", &format!("{}px", size.height));
    }

    fn set_visible(&mut self, id: ElementId, visible: bool) {
        self.set_style(id, "display", if visible { "" } else { "none" });
    }

    fn is_visible(&self, id: ElementId) -> bool {
        self.html(id).is_some_and(|element| {
            element
                .style()
                .get_property_value("display")
                .map_or(true, |display| display != "none")
        })
    }

    // The browser picks the animation duration for smooth scrolling.
    fn scroll_to(&mut self, y: f64, _duration: Duration) {
        let options = web_sys::ScrollToOptions::new();
        options.set_top(y);
        options.set_behavior(web_sys::ScrollBehavior::Smooth);
        self.window.scroll_to_with_scroll_to_options(&options);
    }

    fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.element(id)
            .is_some_and(|element| element.class_list().contains(class))
    }

    fn add_class(&mut self, id: ElementId, class: &str) {
        if let Some(element) = self.element(id) {
            if let Err(e) = element.class_list().add_1(class) {
                log::warn!("Failed to add class {}: {:?}", class, e);
            }
        }
    }

    fn remove_class(&mut self, id: ElementId, class: &str) {
        if let Some(element) = self.element(id) {
            if let Err(e) = element.class_list().remove_1(class) {
                log::warn!("Failed to remove class {}: {:?}", class, e);
            }
        }
    }

    fn data(&self, id: ElementId, key: &str) -> Option<String> {
        self.element(id)?.get_attribute(&format!("data-{}", key))
    }

    fn set_data(&mut self, id: ElementId, key: &str, value: &str) {
        if let Some(element) = self.element(id) {
            if let Err(e) = element.set_attribute(&format!("data-{}", key), value) {
                log::warn!("Failed to set data-{}: {:?}", key, e);
            }
        }
    }

    fn remove_data(&mut self, id: ElementId, key: &str) {
        if let Some(element) = self.element(id) {
            if let Err(e) = element.remove_attribute(&format!("data-{}", key)) {
                log::warn!("Failed to remove data-{}: {:?}", key, e);
            }
        }
    }

    fn add_listener(&mut self, target: ListenTarget, kind: EventKind) -> ListenerHandle {
        self.listeners.register(target, kind)
    }

    fn remove_listener(&mut self, handle: ListenerHandle) {
        self.listeners.unregister(handle);
    }

    fn route(&self, event: &UiEvent) -> Vec<ListenerHandle> {
        self.listeners.route(event, |id| self.parent(id))
    }
}

struct Page {
    surface: DomSurface,
    registry: ControllerRegistry,
}

/// Translate a browser event into a [`UiEvent`].
fn convert_event(surface: &DomSurface, event: &web_sys::Event) -> Option<UiEvent> {
    let kind = event.type_();
    match kind.as_str() {
        "keydown" => {
            let key = event.dyn_ref::<web_sys::KeyboardEvent>()?.key();
            Some(UiEvent::KeyDown { key })
        }
        "scroll" => Some(UiEvent::Scroll {
            position: surface.scroll_position(),
        }),
        kind => {
            let target = event.target()?.dyn_into::<Element>().ok()?;
            let target = surface.register(&target);
            if kind == "click" {
                return Some(UiEvent::Click { target });
            }
            // Pointer events extend MouseEvent.
            let mouse = event.dyn_ref::<web_sys::MouseEvent>()?;
            let position = Point::new(mouse.client_x() as f64, mouse.client_y() as f64);
            match kind {
                "pointerdown" => Some(UiEvent::PointerDown { target, position }),
                "pointermove" => Some(UiEvent::PointerMove { target, position }),
                "pointerup" => Some(UiEvent::PointerUp { target, position }),
                _ => None,
            }
        }
    }
}

fn dispatch(page: &Rc<RefCell<Page>>, event: &web_sys::Event) {
    let Ok(mut page) = page.try_borrow_mut() else {
        log::warn!("Dropped re-entrant {} event", event.type_());
        return;
    };
    let Page { surface, registry } = &mut *page;
    let Some(ui_event) = convert_event(surface, event) else {
        return;
    };
    if registry.dispatch(surface, &ui_event, Instant::now()) == EventOutcome::PreventDefault {
        event.prevent_default();
    }
}

/// Initialize and run the WASM application.
#[wasm_bindgen(start)]
pub fn run_wasm() -> Result<(), JsValue> {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    console_log::init_with_level(log::Level::Info)
        .map_err(|e| JsValue::from_str(&format!("Failed to initialize logger: {}", e)))?;

    log::info!("Starting PanelKit (WASM)");

    let mut surface = DomSurface::new()?;
    let mut registry = ControllerRegistry::new();
    let report = registry.scan(&mut surface);
    log::info!(
        "Bound {} panels, {} toggles, {} scroll watchers ({} skipped)",
        report.panels,
        report.toggles,
        report.scroll_watchers,
        report.skipped
    );

    let window = surface.window.clone();
    let document = surface.document.clone();
    let page = Rc::new(RefCell::new(Page { surface, registry }));

    for event_type in DOCUMENT_EVENTS {
        let page = page.clone();
        let handler = Closure::wrap(Box::new(move |event: web_sys::Event| {
            dispatch(&page, &event);
        }) as Box<dyn Fn(web_sys::Event)>);
        document.add_event_listener_with_callback(event_type, handler.as_ref().unchecked_ref())?;
        handler.forget();
    }

    // Scroll fires on the window, not the document element.
    let scroll_page = page.clone();
    let on_scroll = Closure::wrap(Box::new(move |event: web_sys::Event| {
        dispatch(&scroll_page, &event);
    }) as Box<dyn Fn(web_sys::Event)>);
    window.add_event_listener_with_callback("scroll", on_scroll.as_ref().unchecked_ref())?;
    on_scroll.forget();

    let ticks = Cell::new(0u32);
    let on_tick = Closure::wrap(Box::new(move || {
        if let Ok(mut page) = page.try_borrow_mut() {
            let Page { surface, registry } = &mut *page;
            registry.tick(surface, Instant::now());
            ticks.set(ticks.get().wrapping_add(1));
            if ticks.get() % PRUNE_EVERY_TICKS == 0 {
                surface.prune();
            }
        }
    }) as Box<dyn Fn()>);
    window.set_interval_with_callback_and_timeout_and_arguments_0(
        on_tick.as_ref().unchecked_ref(),
        TICK_INTERVAL_MS,
    )?;
    on_tick.forget();

    Ok(())
}
