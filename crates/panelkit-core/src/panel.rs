//! Modal dialog panel.
//!
//! A panel claims an element, builds its chrome (header with title and close
//! button, content, optional footer, optional resize grip) and then moves
//! between `Closed` and `Open`. Dragging and resizing are delegated to a
//! [`DragResizeController`]; dismissal comes from Escape, clicks outside the
//! panel, or the close button.

use crate::config::PanelConfig;
use crate::error::{InteractionError, InteractionResult};
use crate::gesture::{DragResizeController, GestureMode};
use crate::surface::{
    ElementId, EventKind, EventOutcome, ListenTarget, ListenerHandle, Surface, UiEvent,
};
use kurbo::{Point, Size};

/// Data attribute marking an element as claimed by a panel.
pub const BOUND_MARKER: &str = "panel-bound";

pub const PANEL_CLASS: &str = "panel";
pub const HEADER_CLASS: &str = "panel-header";
pub const TITLE_CLASS: &str = "panel-title";
pub const CLOSE_CLASS: &str = "panel-close";
pub const CONTENT_CLASS: &str = "panel-content";
pub const FOOTER_CLASS: &str = "panel-footer";
pub const RESIZE_CLASS: &str = "panel-resize";

/// Lifecycle state of a panel. Destruction consumes the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelState {
    #[default]
    Closed,
    Open,
}

/// Elements built inside the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelParts {
    pub header: ElementId,
    pub title: ElementId,
    pub close_button: ElementId,
    pub content: ElementId,
    pub footer: Option<ElementId>,
    pub resize_handle: Option<ElementId>,
}

#[derive(Debug)]
pub struct PanelController {
    element: ElementId,
    config: PanelConfig,
    state: PanelState,
    parts: PanelParts,
    gesture: Option<DragResizeController>,
    escape_listener: Option<ListenerHandle>,
    outside_listener: Option<ListenerHandle>,
    close_listener: ListenerHandle,
}

impl PanelController {
    /// Claim `element` and build the panel inside it.
    ///
    /// Fails with `AlreadyBound` if another panel claimed the element; use
    /// [`ControllerRegistry::attach_panel`](crate::registry::ControllerRegistry::attach_panel)
    /// for idempotent construction.
    pub fn new(
        surface: &mut dyn Surface,
        element: ElementId,
        config: PanelConfig,
    ) -> InteractionResult<Self> {
        if !surface.exists(element) {
            return Err(InteractionError::MissingElement("panel"));
        }
        if surface.data(element, BOUND_MARKER).is_some() {
            return Err(InteractionError::AlreadyBound(element));
        }

        let parts = build_parts(surface, element, &config)?;
        surface.set_data(element, BOUND_MARKER, "true");
        surface.add_class(element, PANEL_CLASS);
        surface.set_size(element, Size::new(config.width, config.height));
        if config.left.is_some() || config.top.is_some() {
            let current = surface.position(element);
            let position = Point::new(
                config.left.unwrap_or(current.x),
                config.top.unwrap_or(current.y),
            );
            surface.set_position(element, position);
        }
        surface.set_visible(element, false);

        let gesture = if config.draggable || config.resizable {
            let handle = config.draggable.then_some(parts.header);
            let gesture =
                DragResizeController::new(surface, element, handle, parts.resize_handle)?
                    .with_drag_bounds(config.drag_bounds);
            Some(gesture)
        } else {
            None
        };

        let escape_listener = config
            .close_on_escape
            .then(|| surface.add_listener(ListenTarget::Document, EventKind::KeyDown));
        let outside_listener = config
            .close_on_outside_click
            .then(|| surface.add_listener(ListenTarget::Document, EventKind::PointerDown));
        let close_listener =
            surface.add_listener(ListenTarget::Element(parts.close_button), EventKind::Click);

        log::debug!(
            "Panel {} built (draggable: {}, resizable: {})",
            element,
            config.draggable,
            config.resizable
        );

        let auto_open = config.auto_open;
        let mut panel = Self {
            element,
            config,
            state: PanelState::Closed,
            parts,
            gesture,
            escape_listener,
            outside_listener,
            close_listener,
        };
        if auto_open {
            panel.open(surface);
        }
        Ok(panel)
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == PanelState::Open
    }

    pub fn parts(&self) -> &PanelParts {
        &self.parts
    }

    /// Current gesture mode, `Idle` when gestures are disabled.
    pub fn gesture_mode(&self) -> GestureMode {
        self.gesture
            .as_ref()
            .map_or(GestureMode::Idle, DragResizeController::mode)
    }

    pub fn gesture_mut(&mut self) -> Option<&mut DragResizeController> {
        self.gesture.as_mut()
    }

    pub fn open(&mut self, surface: &mut dyn Surface) {
        surface.set_visible(self.element, true);
        self.state = PanelState::Open;
        log::debug!("Panel {} opened", self.element);
    }

    pub fn close(&mut self, surface: &mut dyn Surface) {
        surface.set_visible(self.element, false);
        self.state = PanelState::Closed;
        log::debug!("Panel {} closed", self.element);
    }

    pub fn handle_event(
        &mut self,
        surface: &mut dyn Surface,
        listener: ListenerHandle,
        event: &UiEvent,
    ) -> EventOutcome {
        if let Some(gesture) = self.gesture.as_mut().filter(|g| g.owns(listener)) {
            return gesture.handle_event(surface, listener, event);
        }

        match event {
            UiEvent::KeyDown { key } if Some(listener) == self.escape_listener => {
                if self.is_open() && is_escape(key) {
                    self.close(surface);
                    EventOutcome::Handled
                } else {
                    EventOutcome::Ignored
                }
            }
            UiEvent::PointerDown { target, .. } if Some(listener) == self.outside_listener => {
                if self.is_open() && !surface.contains(self.element, *target) {
                    self.close(surface);
                    EventOutcome::Handled
                } else {
                    EventOutcome::Ignored
                }
            }
            UiEvent::Click { .. } if listener == self.close_listener => {
                self.close(surface);
                EventOutcome::PreventDefault
            }
            _ => EventOutcome::Ignored,
        }
    }

    pub fn listeners(&self) -> Vec<ListenerHandle> {
        let mut listeners: Vec<_> = self
            .gesture
            .as_ref()
            .map(DragResizeController::listeners)
            .unwrap_or_default();
        listeners.extend(self.escape_listener);
        listeners.extend(self.outside_listener);
        listeners.push(self.close_listener);
        listeners
    }

    /// Unregister every listener and remove the panel from its container.
    pub fn destroy(self, surface: &mut dyn Surface) {
        if let Some(gesture) = self.gesture {
            gesture.destroy(surface);
        }
        for listener in self
            .escape_listener
            .into_iter()
            .chain(self.outside_listener)
            .chain([self.close_listener])
        {
            surface.remove_listener(listener);
        }
        surface.remove(self.element);
        log::debug!("Panel {} destroyed", self.element);
    }
}

fn is_escape(key: &str) -> bool {
    matches!(key, "Escape" | "Esc")
}

fn build_parts(
    surface: &mut dyn Surface,
    element: ElementId,
    config: &PanelConfig,
) -> InteractionResult<PanelParts> {
    let header = child(surface, element, "header", HEADER_CLASS)?;
    let title = child(surface, header, "span", TITLE_CLASS)?;
    surface.set_text(title, &config.title);
    let close_button = child(surface, header, "button", CLOSE_CLASS)?;
    surface.set_text(close_button, "\u{00d7}");

    let content = child(surface, element, "div", CONTENT_CLASS)?;
    surface.set_text(content, &config.content);

    let footer = match &config.footer {
        Some(text) => {
            let footer = child(surface, element, "footer", FOOTER_CLASS)?;
            surface.set_text(footer, text);
            Some(footer)
        }
        None => None,
    };

    let resize_handle = if config.resizable {
        Some(child(surface, element, "div", RESIZE_CLASS)?)
    } else {
        None
    };

    Ok(PanelParts {
        header,
        title,
        close_button,
        content,
        footer,
        resize_handle,
    })
}

fn child(
    surface: &mut dyn Surface,
    parent: ElementId,
    tag: &str,
    class: &str,
) -> InteractionResult<ElementId> {
    let id = surface.create_element(tag)?;
    surface.add_class(id, class);
    surface.append_child(parent, id);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;

    fn setup(config: PanelConfig) -> (MemorySurface, ElementId, PanelController) {
        let mut surface = MemorySurface::new();
        let body = surface.body();
        let element = surface.create_child(body, "div");
        let panel = PanelController::new(&mut surface, element, config).unwrap();
        (surface, element, panel)
    }

    fn send(
        surface: &mut MemorySurface,
        panel: &mut PanelController,
        event: UiEvent,
    ) -> EventOutcome {
        let mut outcome = EventOutcome::Ignored;
        for listener in surface.route(&event) {
            outcome = outcome.merge(panel.handle_event(surface, listener, &event));
        }
        outcome
    }

    fn escape() -> UiEvent {
        UiEvent::KeyDown {
            key: "Escape".to_string(),
        }
    }

    #[test]
    fn test_builds_chrome() {
        let config = PanelConfig {
            title: "Edit location".to_string(),
            content: "Body".to_string(),
            footer: Some("Save".to_string()),
            resizable: true,
            ..PanelConfig::default()
        };
        let (surface, element, panel) = setup(config);
        let parts = *panel.parts();

        assert_eq!(
            surface.children(element),
            vec![parts.header, parts.content, parts.footer.unwrap(), parts.resize_handle.unwrap()]
        );
        assert_eq!(surface.text(parts.title), Some("Edit location"));
        assert!(surface.has_class(element, PANEL_CLASS));
        assert_eq!(surface.size(element), Size::new(480.0, 320.0));
        assert!(!surface.is_visible(element));
        assert_eq!(panel.state(), PanelState::Closed);
    }

    #[test]
    fn test_open_close() {
        let (mut surface, element, mut panel) = setup(PanelConfig::default());

        panel.open(&mut surface);
        assert!(surface.is_visible(element));
        assert!(panel.is_open());

        panel.close(&mut surface);
        assert!(!surface.is_visible(element));
        assert_eq!(panel.state(), PanelState::Closed);
    }

    #[test]
    fn test_auto_open() {
        let config = PanelConfig {
            auto_open: true,
            ..PanelConfig::default()
        };
        let (surface, element, panel) = setup(config);

        assert!(panel.is_open());
        assert!(surface.is_visible(element));
    }

    #[test]
    fn test_escape_closes_only_when_open() {
        let (mut surface, _, mut panel) = setup(PanelConfig::default());

        assert_eq!(send(&mut surface, &mut panel, escape()), EventOutcome::Ignored);
        assert_eq!(panel.state(), PanelState::Closed);

        panel.open(&mut surface);
        assert_eq!(send(&mut surface, &mut panel, escape()), EventOutcome::Handled);
        assert_eq!(panel.state(), PanelState::Closed);
    }

    #[test]
    fn test_other_keys_do_not_close() {
        let (mut surface, _, mut panel) = setup(PanelConfig::default());
        panel.open(&mut surface);

        send(
            &mut surface,
            &mut panel,
            UiEvent::KeyDown {
                key: "Enter".to_string(),
            },
        );

        assert!(panel.is_open());
    }

    #[test]
    fn test_escape_disabled() {
        let config = PanelConfig {
            close_on_escape: false,
            auto_open: true,
            ..PanelConfig::default()
        };
        let (mut surface, _, mut panel) = setup(config);

        send(&mut surface, &mut panel, escape());

        assert!(panel.is_open());
    }

    #[test]
    fn test_outside_click_closes() {
        let (mut surface, _, mut panel) = setup(PanelConfig::default());
        let body = surface.body();
        let content = panel.parts().content;
        panel.open(&mut surface);

        send(
            &mut surface,
            &mut panel,
            UiEvent::PointerDown {
                target: content,
                position: Point::new(10.0, 10.0),
            },
        );
        assert!(panel.is_open());

        send(
            &mut surface,
            &mut panel,
            UiEvent::PointerDown {
                target: body,
                position: Point::new(900.0, 900.0),
            },
        );
        assert!(!panel.is_open());
    }

    #[test]
    fn test_close_button() {
        let (mut surface, _, mut panel) = setup(PanelConfig::default());
        let close_button = panel.parts().close_button;
        panel.open(&mut surface);

        let outcome = send(
            &mut surface,
            &mut panel,
            UiEvent::Click {
                target: close_button,
            },
        );

        assert_eq!(outcome, EventOutcome::PreventDefault);
        assert!(!panel.is_open());
    }

    #[test]
    fn test_drag_header() {
        let config = PanelConfig {
            left: Some(40.0),
            top: Some(60.0),
            auto_open: true,
            ..PanelConfig::default()
        };
        let (mut surface, element, mut panel) = setup(config);
        let header = panel.parts().header;
        let body = surface.body();

        send(
            &mut surface,
            &mut panel,
            UiEvent::PointerDown {
                target: header,
                position: Point::new(50.0, 70.0),
            },
        );
        assert_eq!(panel.gesture_mode(), GestureMode::Dragging);
        send(
            &mut surface,
            &mut panel,
            UiEvent::PointerMove {
                target: body,
                position: Point::new(100.0, 100.0),
            },
        );
        send(
            &mut surface,
            &mut panel,
            UiEvent::PointerUp {
                target: body,
                position: Point::new(100.0, 100.0),
            },
        );

        assert_eq!(surface.position(element), Point::new(90.0, 90.0));
        assert_eq!(panel.gesture_mode(), GestureMode::Idle);
        assert!(panel.is_open());
    }

    #[test]
    fn test_not_draggable_has_no_gesture() {
        let config = PanelConfig {
            draggable: false,
            ..PanelConfig::default()
        };
        let (_, _, mut panel) = setup(config);

        assert!(panel.gesture_mut().is_none());
        assert_eq!(panel.listeners().len(), 3);
    }

    #[test]
    fn test_second_claim_rejected() {
        let (mut surface, element, _panel) = setup(PanelConfig::default());
        let before = surface.children(element).len();

        let result = PanelController::new(&mut surface, element, PanelConfig::default());

        assert!(matches!(result, Err(InteractionError::AlreadyBound(id)) if id == element));
        assert_eq!(surface.children(element).len(), before);
    }

    #[test]
    fn test_destroy_removes_surface_and_listeners() {
        let config = PanelConfig {
            resizable: true,
            ..PanelConfig::default()
        };
        let (mut surface, element, panel) = setup(config);
        assert_eq!(surface.listeners().len(), panel.listeners().len());

        panel.destroy(&mut surface);

        assert!(!surface.exists(element));
        assert!(surface.listeners().is_empty());
        assert!(surface.children(surface.body()).is_empty());
    }
}
