//! Scroll-position watcher with a "back to top" affordance.
//!
//! Raw scroll events are throttled; each evaluated position decides whether
//! the body carries the boundary marker. Clicking the watcher's element
//! scrolls smoothly back to the top.

use crate::config::ScrollConfig;
use crate::error::{InteractionError, InteractionResult};
use crate::events::{EventBus, names};
use crate::surface::{
    ElementId, EventKind, EventOutcome, ListenTarget, ListenerHandle, Surface, UiEvent,
};
use crate::throttle::{Instant, Throttle};

const MARKER_VALUE: &str = "true";

/// Snapshot handed to scroll event handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollContext {
    pub element: ElementId,
    pub scrolled: bool,
    pub position: f64,
}

pub type ScrollEvents = EventBus<ScrollContext>;

#[derive(Debug)]
pub struct ScrollWatcher {
    element: ElementId,
    config: ScrollConfig,
    throttle: Throttle<f64>,
    scrolled: bool,
    last_position: f64,
    events: ScrollEvents,
    scroll_listener: ListenerHandle,
    click_listener: ListenerHandle,
}

impl ScrollWatcher {
    pub fn new(
        surface: &mut dyn Surface,
        element: ElementId,
        config: ScrollConfig,
    ) -> InteractionResult<Self> {
        if !surface.exists(element) {
            return Err(InteractionError::MissingElement("scroll-top"));
        }

        let scrolled = surface.data(surface.body(), &config.marker).is_some();
        let scroll_listener = surface.add_listener(ListenTarget::Document, EventKind::Scroll);
        let click_listener = surface.add_listener(ListenTarget::Element(element), EventKind::Click);

        log::debug!(
            "Scroll watcher on {} (offset {}, every {:?})",
            element,
            config.offset,
            config.interval()
        );

        Ok(Self {
            element,
            throttle: Throttle::new(config.interval()),
            config,
            scrolled,
            last_position: surface.scroll_position(),
            events: ScrollEvents::new(),
            scroll_listener,
            click_listener,
        })
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn config(&self) -> &ScrollConfig {
        &self.config
    }

    /// Whether the last evaluated position was past the offset.
    pub fn is_scrolled(&self) -> bool {
        self.scrolled
    }

    pub fn events_mut(&mut self) -> &mut ScrollEvents {
        &mut self.events
    }

    pub fn on(&mut self, event_name: &str, handler: impl FnMut(&ScrollContext, &()) + 'static) {
        self.events.on(event_name, handler);
    }

    pub fn once(&mut self, event_name: &str, handler: impl FnMut(&ScrollContext, &()) + 'static) {
        self.events.once(event_name, handler);
    }

    pub fn handle_event(
        &mut self,
        surface: &mut dyn Surface,
        listener: ListenerHandle,
        event: &UiEvent,
        now: Instant,
    ) -> EventOutcome {
        match *event {
            UiEvent::Scroll { position } if listener == self.scroll_listener => {
                self.throttle.push(position, now);
                EventOutcome::Handled
            }
            UiEvent::Click { .. } if listener == self.click_listener => {
                self.scroll_to_top(surface);
                EventOutcome::PreventDefault
            }
            _ => EventOutcome::Ignored,
        }
    }

    /// Evaluate the pending position if its throttle window has elapsed.
    /// Returns true when an evaluation ran.
    pub fn tick(&mut self, surface: &mut dyn Surface, now: Instant) -> bool {
        match self.throttle.poll(now) {
            Some(position) => {
                self.evaluate(surface, position);
                true
            }
            None => false,
        }
    }

    /// Mirror `position > offset` onto the body marker.
    pub fn evaluate(&mut self, surface: &mut dyn Surface, position: f64) {
        self.last_position = position;
        let past = position > self.config.offset;
        let body = surface.body();
        let marked = surface.data(body, &self.config.marker).is_some();

        if past == self.scrolled && past == marked {
            return;
        }

        let changed = past != self.scrolled;
        if changed {
            self.emit(names::BEFORE_TOGGLE);
        }
        if past {
            surface.set_data(body, &self.config.marker, MARKER_VALUE);
        } else {
            surface.remove_data(body, &self.config.marker);
        }
        self.scrolled = past;
        if changed {
            log::debug!("Scroll boundary crossed at {} (past: {})", position, past);
            self.emit(names::TOGGLE);
            self.emit(names::AFTER_TOGGLE);
        }
    }

    /// Smoothly scroll the viewport back to the top.
    pub fn scroll_to_top(&mut self, surface: &mut dyn Surface) {
        self.emit(names::SCROLL_TOP);
        surface.scroll_to(0.0, self.config.duration());
    }

    pub fn listeners(&self) -> Vec<ListenerHandle> {
        vec![self.scroll_listener, self.click_listener]
    }

    /// Unregister listeners and clear the body marker.
    pub fn destroy(self, surface: &mut dyn Surface) {
        surface.remove_listener(self.scroll_listener);
        surface.remove_listener(self.click_listener);
        let body = surface.body();
        surface.remove_data(body, &self.config.marker);
    }

    fn emit(&mut self, event_name: &str) {
        let context = ScrollContext {
            element: self.element,
            scrolled: self.scrolled,
            position: self.last_position,
        };
        self.events.trigger(event_name, &context, &());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn setup(config: ScrollConfig) -> (MemorySurface, ElementId, ScrollWatcher) {
        let mut surface = MemorySurface::new();
        let body = surface.body();
        let link = surface.create_child(body, "a");
        let watcher = ScrollWatcher::new(&mut surface, link, config).unwrap();
        (surface, link, watcher)
    }

    fn scroll(watcher: &mut ScrollWatcher, surface: &mut MemorySurface, y: f64, now: Instant) {
        let event = UiEvent::Scroll { position: y };
        for listener in surface.route(&event) {
            watcher.handle_event(surface, listener, &event, now);
        }
    }

    #[test]
    fn test_marker_follows_ticks() {
        let (mut surface, _, mut watcher) = setup(ScrollConfig::default());
        let body = surface.body();
        let interval = watcher.config().interval();
        let start = Instant::now();

        let mut observed = Vec::new();
        for (i, y) in [0.0, 100.0, 400.0, 200.0].into_iter().enumerate() {
            let at = start + interval * (i as u32 * 2);
            scroll(&mut watcher, &mut surface, y, at);
            assert!(watcher.tick(&mut surface, at + interval));
            observed.push(surface.data(body, "scrolled").is_some());
        }

        assert_eq!(observed, vec![false, false, true, false]);
    }

    #[test]
    fn test_burst_is_coalesced() {
        let (mut surface, _, mut watcher) = setup(ScrollConfig::default());
        let body = surface.body();
        let start = Instant::now();

        scroll(&mut watcher, &mut surface, 500.0, start);
        scroll(&mut watcher, &mut surface, 50.0, start + Duration::from_millis(100));
        assert!(!watcher.tick(&mut surface, start + Duration::from_millis(150)));
        assert!(watcher.tick(&mut surface, start + Duration::from_millis(200)));

        assert!(!watcher.is_scrolled());
        assert_eq!(surface.data(body, "scrolled"), None);
    }

    #[test]
    fn test_toggle_events_fire_only_on_change() {
        let (mut surface, _, mut watcher) = setup(ScrollConfig::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        watcher.on(names::TOGGLE, move |ctx: &ScrollContext, _: &()| {
            sink.borrow_mut().push(ctx.scrolled);
        });

        for y in [350.0, 500.0, 10.0, 20.0] {
            watcher.evaluate(&mut surface, y);
        }

        assert_eq!(seen.borrow().as_slice(), [true, false]);
    }

    #[test]
    fn test_custom_offset_and_marker() {
        let config = ScrollConfig {
            offset: 50.0,
            marker: "past-fold".to_string(),
            ..ScrollConfig::default()
        };
        let (mut surface, _, mut watcher) = setup(config);
        let body = surface.body();

        watcher.evaluate(&mut surface, 51.0);

        assert_eq!(surface.data(body, "past-fold").as_deref(), Some("true"));
    }

    #[test]
    fn test_click_scrolls_to_top() {
        let (mut surface, link, mut watcher) = setup(ScrollConfig::default());
        surface.set_scroll_position(900.0);
        let event = UiEvent::Click { target: link };

        let listeners = surface.route(&event);
        let outcome = watcher.handle_event(&mut surface, listeners[0], &event, Instant::now());

        assert_eq!(outcome, EventOutcome::PreventDefault);
        assert_eq!(
            surface.scroll_requests(),
            [(0.0, Duration::from_millis(600))]
        );
        assert_eq!(surface.scroll_position(), 0.0);
    }

    #[test]
    fn test_missing_element() {
        let mut surface = MemorySurface::new();
        let result = ScrollWatcher::new(&mut surface, ElementId(99), ScrollConfig::default());
        assert!(matches!(result, Err(InteractionError::MissingElement(_))));
    }

    #[test]
    fn test_destroy_clears_marker_and_listeners() {
        let (mut surface, _, mut watcher) = setup(ScrollConfig::default());
        let body = surface.body();
        watcher.evaluate(&mut surface, 1000.0);

        watcher.destroy(&mut surface);

        assert_eq!(surface.data(body, "scrolled"), None);
        assert!(surface.listeners().is_empty());
    }
}
