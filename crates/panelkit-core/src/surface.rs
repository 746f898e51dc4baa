//! Surface adapter abstraction.
//!
//! Controllers never touch a document directly. Everything they read or
//! mutate goes through [`Surface`]: the web shell implements it over the DOM,
//! and [`MemorySurface`] implements it in memory for tests and headless hosts.

use crate::error::InteractionResult;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

/// Opaque handle to an element owned by a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle returned when a listener is registered. Needed to unregister it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle(pub u64);

/// Where a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenTarget {
    /// The whole document. Observes every event of its kind.
    Document,
    /// A single element. Observes events targeting it or its descendants.
    Element(ElementId),
}

/// Kinds of raw input a listener can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    PointerDown,
    PointerMove,
    PointerUp,
    KeyDown,
    Click,
    Scroll,
}

/// A raw input event delivered by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UiEvent {
    PointerDown { target: ElementId, position: Point },
    PointerMove { target: ElementId, position: Point },
    PointerUp { target: ElementId, position: Point },
    KeyDown { key: String },
    Click { target: ElementId },
    /// Viewport scrolled to the given vertical offset.
    Scroll { position: f64 },
}

impl UiEvent {
    /// The listener kind that observes this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::PointerDown { .. } => EventKind::PointerDown,
            Self::PointerMove { .. } => EventKind::PointerMove,
            Self::PointerUp { .. } => EventKind::PointerUp,
            Self::KeyDown { .. } => EventKind::KeyDown,
            Self::Click { .. } => EventKind::Click,
            Self::Scroll { .. } => EventKind::Scroll,
        }
    }

    /// Element the event originated on, if any.
    pub fn target(&self) -> Option<ElementId> {
        match self {
            Self::PointerDown { target, .. }
            | Self::PointerMove { target, .. }
            | Self::PointerUp { target, .. }
            | Self::Click { target } => Some(*target),
            Self::KeyDown { .. } | Self::Scroll { .. } => None,
        }
    }
}

/// What a controller did with an event.
///
/// Ordered so that merging outcomes from several listeners keeps the
/// strongest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum EventOutcome {
    #[default]
    Ignored,
    Handled,
    /// Handled, and the host should suppress the default action.
    PreventDefault,
}

impl EventOutcome {
    /// Combine two outcomes for the same event.
    pub fn merge(self, other: Self) -> Self {
        self.max(other)
    }

    pub fn is_handled(self) -> bool {
        self != Self::Ignored
    }
}

/// Capability set a host provides to the controllers.
///
/// Geometry getters are total: asking about a missing element yields zero
/// values rather than an error.
pub trait Surface {
    // Tree

    /// The document body.
    fn body(&self) -> ElementId;

    /// Whether the element is still attached to this surface.
    fn exists(&self, id: ElementId) -> bool;

    fn parent(&self, id: ElementId) -> Option<ElementId>;

    /// Whether `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: ElementId, node: ElementId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Elements matching a selector, in document order.
    fn query_all(&self, selector: &str) -> Vec<ElementId>;

    fn create_element(&mut self, tag: &str) -> InteractionResult<ElementId>;

    fn append_child(&mut self, parent: ElementId, child: ElementId);

    fn set_text(&mut self, id: ElementId, text: &str);

    /// Detach an element (and its subtree) from its parent.
    fn remove(&mut self, id: ElementId);

    // Geometry

    /// Top-left corner of the element.
    fn position(&self, id: ElementId) -> Point;

    fn size(&self, id: ElementId) -> Size;

    /// Vertical scroll offset of the viewport.
    fn scroll_position(&self) -> f64;

    fn set_position(&mut self, id: ElementId, position: Point);

    fn set_size(&mut self, id: ElementId, size: Size);

    fn set_visible(&mut self, id: ElementId, visible: bool);

    fn is_visible(&self, id: ElementId) -> bool;

    /// Request a smooth viewport scroll.
    fn scroll_to(&mut self, y: f64, duration: Duration);

    // Classes and data attributes

    fn has_class(&self, id: ElementId, class: &str) -> bool;

    fn add_class(&mut self, id: ElementId, class: &str);

    fn remove_class(&mut self, id: ElementId, class: &str);

    /// Read data attribute `data-{key}`.
    fn data(&self, id: ElementId, key: &str) -> Option<String>;

    fn set_data(&mut self, id: ElementId, key: &str, value: &str);

    fn remove_data(&mut self, id: ElementId, key: &str);

    // Listeners

    fn add_listener(&mut self, target: ListenTarget, kind: EventKind) -> ListenerHandle;

    fn remove_listener(&mut self, handle: ListenerHandle);

    /// Listeners that observe `event`, in delivery order.
    fn route(&self, event: &UiEvent) -> Vec<ListenerHandle>;
}

#[derive(Debug, Clone, Copy)]
struct ListenerEntry {
    handle: ListenerHandle,
    target: ListenTarget,
    kind: EventKind,
}

/// Registration bookkeeping shared by surface implementations.
///
/// Routing mirrors DOM bubbling: listeners on the target element first, then
/// on each ancestor, then on the document. Within one node, registration
/// order decides.
#[derive(Debug, Clone, Default)]
pub struct ListenerTable {
    entries: Vec<ListenerEntry>,
    next_handle: u64,
}

impl ListenerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, target: ListenTarget, kind: EventKind) -> ListenerHandle {
        self.next_handle += 1;
        let handle = ListenerHandle(self.next_handle);
        self.entries.push(ListenerEntry { handle, target, kind });
        handle
    }

    /// Returns false if the handle was not registered.
    pub fn unregister(&mut self, handle: ListenerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn route(
        &self,
        event: &UiEvent,
        parent: impl Fn(ElementId) -> Option<ElementId>,
    ) -> Vec<ListenerHandle> {
        let kind = event.kind();
        let mut handles = Vec::new();

        // Skip the ancestor walk when nothing listens on elements for this
        // kind, so hosts never resolve parents for document-only events.
        let bubbles = self
            .entries
            .iter()
            .any(|e| e.kind == kind && e.target != ListenTarget::Document);
        let mut node = event.target().filter(|_| bubbles);
        while let Some(id) = node {
            handles.extend(
                self.entries
                    .iter()
                    .filter(|e| e.kind == kind && e.target == ListenTarget::Element(id))
                    .map(|e| e.handle),
            );
            node = parent(id);
        }

        handles.extend(
            self.entries
                .iter()
                .filter(|e| e.kind == kind && e.target == ListenTarget::Document)
                .map(|e| e.handle),
        );
        handles
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    dom_id: Option<String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    classes: Vec<String>,
    data: BTreeMap<String, String>,
    text: String,
    position: Point,
    size: Size,
    visible: bool,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            dom_id: None,
            parent: None,
            children: Vec::new(),
            classes: Vec::new(),
            data: BTreeMap::new(),
            text: String::new(),
            position: Point::ZERO,
            size: Size::ZERO,
            visible: true,
        }
    }
}

/// A parsed single-part selector.
enum Selector<'a> {
    Class(&'a str),
    Id(&'a str),
    Data(&'a str),
    Tag(&'a str),
}

impl<'a> Selector<'a> {
    fn parse(raw: &'a str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(class) = raw.strip_prefix('.') {
            return Some(Self::Class(class));
        }
        if let Some(id) = raw.strip_prefix('#') {
            return Some(Self::Id(id));
        }
        if let Some(attr) = raw.strip_prefix("[data-").and_then(|s| s.strip_suffix(']')) {
            return Some(Self::Data(attr));
        }
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Some(Self::Tag(raw));
        }
        None
    }

    fn matches(&self, node: &Node) -> bool {
        match self {
            Self::Class(class) => node.classes.iter().any(|c| c == class),
            Self::Id(id) => node.dom_id.as_deref() == Some(*id),
            Self::Data(key) => node.data.contains_key(*key),
            Self::Tag(tag) => node.tag.eq_ignore_ascii_case(tag),
        }
    }
}

/// In-memory document for tests, demos and headless hosts.
///
/// Scroll requests complete immediately; the requested durations are
/// recorded so callers can inspect them.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    nodes: HashMap<ElementId, Node>,
    body: ElementId,
    next_id: u64,
    scroll_y: f64,
    scroll_requests: Vec<(f64, Duration)>,
    listeners: ListenerTable,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySurface {
    /// Create a document containing only a body.
    pub fn new() -> Self {
        let body = ElementId(1);
        let mut nodes = HashMap::new();
        nodes.insert(body, Node::new("body"));
        Self {
            nodes,
            body,
            next_id: 1,
            scroll_y: 0.0,
            scroll_requests: Vec::new(),
            listeners: ListenerTable::new(),
        }
    }

    /// Create an element and append it to `parent`.
    pub fn create_child(&mut self, parent: ElementId, tag: &str) -> ElementId {
        let id = self.alloc(tag);
        self.append_child(parent, id);
        id
    }

    /// Set the `id` attribute used by `#id` selectors.
    pub fn set_dom_id(&mut self, id: ElementId, dom_id: &str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.dom_id = Some(dom_id.to_string());
        }
    }

    /// Move the viewport without going through `scroll_to`.
    pub fn set_scroll_position(&mut self, y: f64) {
        self.scroll_y = y;
    }

    /// Every `scroll_to` request received so far.
    pub fn scroll_requests(&self) -> &[(f64, Duration)] {
        &self.scroll_requests
    }

    pub fn children(&self, id: ElementId) -> Vec<ElementId> {
        self.nodes
            .get(&id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn text(&self, id: ElementId) -> Option<&str> {
        self.nodes.get(&id).map(|n| n.text.as_str())
    }

    pub fn listeners(&self) -> &ListenerTable {
        &self.listeners
    }

    /// Serialize an element subtree as HTML-like markup.
    pub fn markup(&self, id: ElementId) -> String {
        let mut out = String::new();
        self.write_markup(id, &mut out);
        out
    }

    fn write_markup(&self, id: ElementId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        out.push('<');
        out.push_str(&node.tag);
        if let Some(dom_id) = &node.dom_id {
            out.push_str(&format!(" id=\"{}\"", dom_id));
        }
        if !node.classes.is_empty() {
            out.push_str(&format!(" class=\"{}\"", node.classes.join(" ")));
        }
        for (key, value) in &node.data {
            out.push_str(&format!(" data-{}=\"{}\"", key, value));
        }
        if !node.visible {
            out.push_str(" hidden");
        }
        out.push('>');
        out.push_str(&node.text);
        for child in &node.children {
            self.write_markup(*child, out);
        }
        out.push_str(&format!("</{}>", node.tag));
    }

    fn alloc(&mut self, tag: &str) -> ElementId {
        self.next_id += 1;
        let id = ElementId(self.next_id);
        self.nodes.insert(id, Node::new(tag));
        id
    }

    fn detach(&mut self, id: ElementId) {
        let parent = self.nodes.get_mut(&id).and_then(|n| n.parent.take());
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != id);
        }
    }

    fn collect_matches(&self, id: ElementId, selector: &Selector<'_>, out: &mut Vec<ElementId>) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if selector.matches(node) {
            out.push(id);
        }
        for child in &node.children {
            self.collect_matches(*child, selector, out);
        }
    }
}

impl Surface for MemorySurface {
    fn body(&self) -> ElementId {
        self.body
    }

    fn exists(&self, id: ElementId) -> bool {
        self.nodes.contains_key(&id)
    }

    fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    fn query_all(&self, selector: &str) -> Vec<ElementId> {
        let mut out = Vec::new();
        match Selector::parse(selector) {
            Some(parsed) => self.collect_matches(self.body, &parsed, &mut out),
            None => log::warn!("Unsupported selector: {}", selector),
        }
        out
    }

    fn create_element(&mut self, tag: &str) -> InteractionResult<ElementId> {
        Ok(self.alloc(tag))
    }

    fn append_child(&mut self, parent: ElementId, child: ElementId) {
        if !self.nodes.contains_key(&parent) || !self.nodes.contains_key(&child) {
            return;
        }
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
    }

    fn set_text(&mut self, id: ElementId, text: &str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.text = text.to_string();
        }
    }

    fn remove(&mut self, id: ElementId) {
        if id == self.body {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                stack.extend(node.children);
            }
        }
    }

    fn position(&self, id: ElementId) -> Point {
        self.nodes.get(&id).map(|n| n.position).unwrap_or(Point::ZERO)
    }

    fn size(&self, id: ElementId) -> Size {
        self.nodes.get(&id).map(|n| n.size).unwrap_or(Size::ZERO)
    }

    fn scroll_position(&self) -> f64 {
        self.scroll_y
    }

    fn set_position(&mut self, id: ElementId, position: Point) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.position = position;
        }
    }

    fn set_size(&mut self, id: ElementId, size: Size) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.size = size;
        }
    }

    fn set_visible(&mut self, id: ElementId, visible: bool) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.visible = visible;
        }
    }

    fn is_visible(&self, id: ElementId) -> bool {
        self.nodes.get(&id).is_some_and(|n| n.visible)
    }

    fn scroll_to(&mut self, y: f64, duration: Duration) {
        self.scroll_requests.push((y, duration));
        self.scroll_y = y;
    }

    fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.nodes
            .get(&id)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    fn add_class(&mut self, id: ElementId, class: &str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            if !node.classes.iter().any(|c| c == class) {
                node.classes.push(class.to_string());
            }
        }
    }

    fn remove_class(&mut self, id: ElementId, class: &str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.classes.retain(|c| c != class);
        }
    }

    fn data(&self, id: ElementId, key: &str) -> Option<String> {
        self.nodes.get(&id).and_then(|n| n.data.get(key).cloned())
    }

    fn set_data(&mut self, id: ElementId, key: &str, value: &str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.data.insert(key.to_string(), value.to_string());
        }
    }

    fn remove_data(&mut self, id: ElementId, key: &str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.data.remove(key);
        }
    }

    fn add_listener(&mut self, target: ListenTarget, kind: EventKind) -> ListenerHandle {
        self.listeners.register(target, kind)
    }

    fn remove_listener(&mut self, handle: ListenerHandle) {
        if !self.listeners.unregister(handle) {
            log::trace!("Listener {:?} was already removed", handle);
        }
    }

    fn route(&self, event: &UiEvent) -> Vec<ListenerHandle> {
        self.listeners.route(event, |id| self.parent(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_and_contains() {
        let mut surface = MemorySurface::new();
        let body = surface.body();
        let panel = surface.create_child(body, "div");
        let header = surface.create_child(panel, "header");

        assert_eq!(surface.parent(header), Some(panel));
        assert!(surface.contains(panel, header));
        assert!(surface.contains(panel, panel));
        assert!(!surface.contains(header, panel));
    }

    #[test]
    fn test_remove_drops_subtree() {
        let mut surface = MemorySurface::new();
        let body = surface.body();
        let panel = surface.create_child(body, "div");
        let header = surface.create_child(panel, "header");

        surface.remove(panel);

        assert!(!surface.exists(panel));
        assert!(!surface.exists(header));
        assert!(surface.children(body).is_empty());
    }

    #[test]
    fn test_query_selectors() {
        let mut surface = MemorySurface::new();
        let body = surface.body();
        let a = surface.create_child(body, "button");
        let b = surface.create_child(body, "aside");
        surface.add_class(a, "btn");
        surface.set_data(a, "toggle", "");
        surface.set_dom_id(b, "sidebar");

        assert_eq!(surface.query_all(".btn"), vec![a]);
        assert_eq!(surface.query_all("#sidebar"), vec![b]);
        assert_eq!(surface.query_all("[data-toggle]"), vec![a]);
        assert_eq!(surface.query_all("aside"), vec![b]);
        assert!(surface.query_all("div > span").is_empty());
    }

    #[test]
    fn test_route_bubbles_then_document() {
        let mut surface = MemorySurface::new();
        let body = surface.body();
        let panel = surface.create_child(body, "div");
        let header = surface.create_child(panel, "header");

        let doc = surface.add_listener(ListenTarget::Document, EventKind::PointerDown);
        let on_panel = surface.add_listener(ListenTarget::Element(panel), EventKind::PointerDown);
        let on_header = surface.add_listener(ListenTarget::Element(header), EventKind::PointerDown);
        let _other_kind = surface.add_listener(ListenTarget::Element(header), EventKind::Click);

        let event = UiEvent::PointerDown {
            target: header,
            position: Point::ZERO,
        };
        assert_eq!(surface.route(&event), vec![on_header, on_panel, doc]);

        surface.remove_listener(on_panel);
        assert_eq!(surface.route(&event), vec![on_header, doc]);
    }

    #[test]
    fn test_route_skips_ancestors_without_element_listeners() {
        let mut table = ListenerTable::new();
        let doc = table.register(ListenTarget::Document, EventKind::PointerMove);
        let _click = table.register(ListenTarget::Element(ElementId(3)), EventKind::Click);
        let lookups = std::cell::Cell::new(0);

        let routed = table.route(
            &UiEvent::PointerMove {
                target: ElementId(7),
                position: Point::ZERO,
            },
            |id| {
                lookups.set(lookups.get() + 1);
                (id.0 > 1).then(|| ElementId(id.0 - 1))
            },
        );

        assert_eq!(routed, vec![doc]);
        assert_eq!(lookups.get(), 0);
    }

    #[test]
    fn test_keydown_routes_to_document_only() {
        let mut surface = MemorySurface::new();
        let body = surface.body();
        let _element = surface.add_listener(ListenTarget::Element(body), EventKind::KeyDown);
        let doc = surface.add_listener(ListenTarget::Document, EventKind::KeyDown);

        let routed = surface.route(&UiEvent::KeyDown {
            key: "Escape".to_string(),
        });
        assert_eq!(routed, vec![doc]);
    }

    #[test]
    fn test_class_list_has_no_duplicates() {
        let mut surface = MemorySurface::new();
        let body = surface.body();
        let el = surface.create_child(body, "div");
        surface.add_class(el, "open");
        surface.add_class(el, "open");

        assert_eq!(surface.markup(el), "<div class=\"open\"></div>");
    }

    #[test]
    fn test_outcome_merge_keeps_strongest() {
        assert_eq!(
            EventOutcome::Ignored.merge(EventOutcome::Handled),
            EventOutcome::Handled
        );
        assert_eq!(
            EventOutcome::PreventDefault.merge(EventOutcome::Handled),
            EventOutcome::PreventDefault
        );
        assert!(!EventOutcome::default().is_handled());
    }
}
