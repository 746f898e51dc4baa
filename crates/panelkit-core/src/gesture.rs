//! Pointer-driven drag and resize of a surface.

use crate::error::{InteractionError, InteractionResult};
use crate::surface::{
    ElementId, EventKind, EventOutcome, ListenTarget, ListenerHandle, Surface, UiEvent,
};
use kurbo::{Point, Rect, Size, Vec2};

/// Which gesture, if any, is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureMode {
    #[default]
    Idle,
    Dragging,
    Resizing,
}

/// Gesture state. `origin_offset` is captured at gesture start and used for
/// every subsequent move.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GestureState {
    pub mode: GestureMode,
    /// Pointer minus surface top-left (drag) or pointer minus surface size
    /// (resize).
    pub origin_offset: Vec2,
}

/// Geometry captured when a gesture starts, restored by `cancel`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StartGeometry {
    position: Point,
    size: Size,
}

/// Drags a surface by its handle and resizes it by its resize handle.
///
/// Both gestures share one document-level move listener and one
/// release listener, dispatching on the current mode.
#[derive(Debug)]
pub struct DragResizeController {
    element: ElementId,
    handle: Option<ElementId>,
    resize_handle: Option<ElementId>,
    drag_bounds: Option<Rect>,
    state: GestureState,
    start: Option<StartGeometry>,
    handle_down: Option<ListenerHandle>,
    resize_down: Option<ListenerHandle>,
    move_listener: ListenerHandle,
    release_listener: ListenerHandle,
}

impl DragResizeController {
    /// Wire gestures for `element`. Pass `None` to disable either gesture.
    pub fn new(
        surface: &mut dyn Surface,
        element: ElementId,
        handle: Option<ElementId>,
        resize_handle: Option<ElementId>,
    ) -> InteractionResult<Self> {
        if !surface.exists(element) {
            return Err(InteractionError::MissingElement("gesture surface"));
        }
        if handle.is_some_and(|h| !surface.exists(h)) {
            return Err(InteractionError::MissingElement("drag handle"));
        }
        if resize_handle.is_some_and(|h| !surface.exists(h)) {
            return Err(InteractionError::MissingElement("resize handle"));
        }

        let handle_down =
            handle.map(|h| surface.add_listener(ListenTarget::Element(h), EventKind::PointerDown));
        let resize_down = resize_handle
            .map(|h| surface.add_listener(ListenTarget::Element(h), EventKind::PointerDown));
        let move_listener = surface.add_listener(ListenTarget::Document, EventKind::PointerMove);
        let release_listener = surface.add_listener(ListenTarget::Document, EventKind::PointerUp);

        Ok(Self {
            element,
            handle,
            resize_handle,
            drag_bounds: None,
            state: GestureState::default(),
            start: None,
            handle_down,
            resize_down,
            move_listener,
            release_listener,
        })
    }

    /// Clamp the dragged top-left corner so the surface stays inside `bounds`.
    pub fn with_drag_bounds(mut self, bounds: Option<Rect>) -> Self {
        self.drag_bounds = bounds;
        self
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn mode(&self) -> GestureMode {
        self.state.mode
    }

    pub fn is_active(&self) -> bool {
        self.state.mode != GestureMode::Idle
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn begin_drag(&mut self, surface: &dyn Surface, pointer: Point) {
        let position = surface.position(self.element);
        self.capture(surface);
        self.state = GestureState {
            mode: GestureMode::Dragging,
            origin_offset: pointer - position,
        };
        log::debug!("Drag started on {} at {:?}", self.element, pointer);
    }

    pub fn begin_resize(&mut self, surface: &dyn Surface, pointer: Point) {
        let size = surface.size(self.element);
        self.capture(surface);
        self.state = GestureState {
            mode: GestureMode::Resizing,
            origin_offset: pointer.to_vec2() - size.to_vec2(),
        };
        log::debug!("Resize started on {} at {:?}", self.element, pointer);
    }

    /// Apply a pointer move. Returns true if the surface changed.
    pub fn pointer_moved(&mut self, surface: &mut dyn Surface, pointer: Point) -> bool {
        match self.state.mode {
            GestureMode::Idle => false,
            GestureMode::Dragging => {
                let mut position = pointer - self.state.origin_offset;
                if let Some(bounds) = self.drag_bounds {
                    position = clamp_to_bounds(position, surface.size(self.element), bounds);
                }
                surface.set_position(self.element, position);
                true
            }
            GestureMode::Resizing => {
                // No minimum: dragging past the origin yields degenerate sizes.
                let size = (pointer.to_vec2() - self.state.origin_offset).to_size();
                surface.set_size(self.element, size);
                true
            }
        }
    }

    /// End whatever gesture is active.
    pub fn release(&mut self) {
        if self.is_active() {
            log::debug!("{:?} ended on {}", self.state.mode, self.element);
        }
        self.state.mode = GestureMode::Idle;
        self.start = None;
    }

    /// Abort the active gesture and restore the geometry it started from.
    pub fn cancel(&mut self, surface: &mut dyn Surface) {
        if let Some(start) = self.start.take() {
            surface.set_position(self.element, start.position);
            surface.set_size(self.element, start.size);
            log::debug!("{:?} cancelled on {}", self.state.mode, self.element);
        }
        self.state.mode = GestureMode::Idle;
    }

    /// Whether `listener` was registered by this controller.
    pub fn owns(&self, listener: ListenerHandle) -> bool {
        self.listeners().contains(&listener)
    }

    pub fn handle_event(
        &mut self,
        surface: &mut dyn Surface,
        listener: ListenerHandle,
        event: &UiEvent,
    ) -> EventOutcome {
        match *event {
            UiEvent::PointerDown { target, position } if Some(listener) == self.handle_down => {
                if self.is_drag_target(surface, target) {
                    self.begin_drag(surface, position);
                    EventOutcome::Handled
                } else {
                    EventOutcome::Ignored
                }
            }
            UiEvent::PointerDown { target, position } if Some(listener) == self.resize_down => {
                match self.resize_handle {
                    Some(h) if surface.contains(h, target) => {
                        self.begin_resize(surface, position);
                        EventOutcome::Handled
                    }
                    _ => EventOutcome::Ignored,
                }
            }
            UiEvent::PointerMove { position, .. } if listener == self.move_listener => {
                if self.pointer_moved(surface, position) {
                    EventOutcome::Handled
                } else {
                    EventOutcome::Ignored
                }
            }
            UiEvent::PointerUp { .. } if listener == self.release_listener => {
                let was_active = self.is_active();
                self.release();
                if was_active {
                    EventOutcome::Handled
                } else {
                    EventOutcome::Ignored
                }
            }
            _ => EventOutcome::Ignored,
        }
    }

    pub fn listeners(&self) -> Vec<ListenerHandle> {
        self.handle_down
            .into_iter()
            .chain(self.resize_down)
            .chain([self.move_listener, self.release_listener])
            .collect()
    }

    /// Unregister every listener this controller added.
    pub fn destroy(self, surface: &mut dyn Surface) {
        for listener in self.listeners() {
            surface.remove_listener(listener);
        }
    }

    /// The handle itself or one of its direct children starts a drag.
    fn is_drag_target(&self, surface: &dyn Surface, target: ElementId) -> bool {
        match self.handle {
            Some(handle) => target == handle || surface.parent(target) == Some(handle),
            None => false,
        }
    }

    fn capture(&mut self, surface: &dyn Surface) {
        self.start = Some(StartGeometry {
            position: surface.position(self.element),
            size: surface.size(self.element),
        });
    }
}

fn clamp_to_bounds(position: Point, size: Size, bounds: Rect) -> Point {
    let max_x = (bounds.x1 - size.width).max(bounds.x0);
    let max_y = (bounds.y1 - size.height).max(bounds.y0);
    Point::new(
        position.x.clamp(bounds.x0, max_x),
        position.y.clamp(bounds.y0, max_y),
    )
}
