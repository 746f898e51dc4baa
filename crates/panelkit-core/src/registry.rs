//! Controller registry owned by the application shell.
//!
//! Holds every live controller, maps listener handles back to their owners,
//! and auto-initializes controllers from markup on an explicit [`scan`].
//!
//! [`scan`]: ControllerRegistry::scan

use crate::config::{PanelConfig, ScrollConfig, ToggleConfig, parse_config};
use crate::error::{InteractionError, InteractionResult};
use crate::panel::PanelController;
use crate::scroll::ScrollWatcher;
use crate::surface::{ElementId, EventOutcome, ListenerHandle, Surface, UiEvent};
use crate::throttle::Instant;
use crate::toggle::ToggleController;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Data attribute (and selector) marking panels for auto-initialization.
pub const PANEL_KEY: &str = "panel";
pub const PANEL_SELECTOR: &str = "[data-panel]";
pub const TOGGLE_KEY: &str = "toggle";
pub const TOGGLE_SELECTOR: &str = "[data-toggle]";
pub const SCROLL_TOP_KEY: &str = "scroll-top";
pub const SCROLL_TOP_SELECTOR: &str = "[data-scroll-top]";

/// Identifies a controller by kind and the element it is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerKey {
    Panel(ElementId),
    /// Keyed on the toggle element, not the target.
    Toggle(ElementId),
    ScrollWatcher(ElementId),
}

/// Outcome of a [`ControllerRegistry::scan`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub panels: usize,
    pub toggles: usize,
    pub scroll_watchers: usize,
    /// Elements already bound by an earlier scan or attach.
    pub reused: usize,
    /// Elements whose construction failed.
    pub skipped: usize,
}

impl ScanReport {
    pub fn created(&self) -> usize {
        self.panels + self.toggles + self.scroll_watchers
    }
}

#[derive(Debug, Default)]
pub struct ControllerRegistry {
    panels: HashMap<ElementId, PanelController>,
    toggles: HashMap<ElementId, ToggleController>,
    scroll_watchers: HashMap<ElementId, ScrollWatcher>,
    routes: HashMap<ListenerHandle, ControllerKey>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the panel bound to `element`, building it on first use.
    pub fn attach_panel(
        &mut self,
        surface: &mut dyn Surface,
        element: ElementId,
        config: PanelConfig,
    ) -> InteractionResult<&mut PanelController> {
        match self.panels.entry(element) {
            Entry::Occupied(entry) => {
                log::debug!("Panel {} already initialized, reusing", element);
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                let panel = PanelController::new(surface, element, config)?;
                for listener in panel.listeners() {
                    self.routes.insert(listener, ControllerKey::Panel(element));
                }
                Ok(entry.insert(panel))
            }
        }
    }

    /// Return the toggle bound to `toggle`, building it on first use.
    pub fn attach_toggle(
        &mut self,
        surface: &mut dyn Surface,
        toggle: ElementId,
        target: ElementId,
        config: ToggleConfig,
    ) -> InteractionResult<&mut ToggleController> {
        match self.toggles.entry(toggle) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let controller = ToggleController::new(surface, toggle, target, config)?;
                for listener in controller.listeners() {
                    self.routes.insert(listener, ControllerKey::Toggle(toggle));
                }
                Ok(entry.insert(controller))
            }
        }
    }

    /// Return the scroll watcher bound to `element`, building it on first use.
    pub fn attach_scroll_watcher(
        &mut self,
        surface: &mut dyn Surface,
        element: ElementId,
        config: ScrollConfig,
    ) -> InteractionResult<&mut ScrollWatcher> {
        match self.scroll_watchers.entry(element) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let watcher = ScrollWatcher::new(surface, element, config)?;
                for listener in watcher.listeners() {
                    self.routes.insert(listener, ControllerKey::ScrollWatcher(element));
                }
                Ok(entry.insert(watcher))
            }
        }
    }

    /// Initialize every marked element on the surface.
    ///
    /// Construction failures are logged and skipped so one bad element does
    /// not stop the rest of the page from initializing.
    pub fn scan(&mut self, surface: &mut dyn Surface) -> ScanReport {
        let mut report = ScanReport::default();

        for element in surface.query_all(PANEL_SELECTOR) {
            if self.panels.contains_key(&element) {
                report.reused += 1;
                continue;
            }
            let result = self.scan_panel(surface, element);
            tally(&mut report.panels, &mut report.skipped, element, result);
        }

        for element in surface.query_all(TOGGLE_SELECTOR) {
            if self.toggles.contains_key(&element) {
                report.reused += 1;
                continue;
            }
            let result = self.scan_toggle(surface, element);
            tally(&mut report.toggles, &mut report.skipped, element, result);
        }

        for element in surface.query_all(SCROLL_TOP_SELECTOR) {
            if self.scroll_watchers.contains_key(&element) {
                report.reused += 1;
                continue;
            }
            let result = self.scan_scroll_watcher(surface, element);
            tally(
                &mut report.scroll_watchers,
                &mut report.skipped,
                element,
                result,
            );
        }

        log::info!(
            "Scan complete: {} panels, {} toggles, {} scroll watchers ({} reused, {} skipped)",
            report.panels,
            report.toggles,
            report.scroll_watchers,
            report.reused,
            report.skipped
        );
        report
    }

    /// Deliver an event to every listener the surface routes it to.
    pub fn dispatch(
        &mut self,
        surface: &mut dyn Surface,
        event: &UiEvent,
        now: Instant,
    ) -> EventOutcome {
        let mut outcome = EventOutcome::Ignored;
        for listener in surface.route(event) {
            let Some(key) = self.routes.get(&listener).copied() else {
                log::trace!("No controller owns listener {:?}", listener);
                continue;
            };
            let result = match key {
                ControllerKey::Panel(id) => match self.panels.get_mut(&id) {
                    Some(panel) => panel.handle_event(surface, listener, event),
                    None => EventOutcome::Ignored,
                },
                ControllerKey::Toggle(id) => match self.toggles.get_mut(&id) {
                    Some(toggle) => toggle.handle_event(surface, listener, event),
                    None => EventOutcome::Ignored,
                },
                ControllerKey::ScrollWatcher(id) => match self.scroll_watchers.get_mut(&id) {
                    Some(watcher) => watcher.handle_event(surface, listener, event, now),
                    None => EventOutcome::Ignored,
                },
            };
            outcome = outcome.merge(result);
        }
        outcome
    }

    /// Drive throttle timers. Returns the number of evaluations that ran.
    pub fn tick(&mut self, surface: &mut dyn Surface, now: Instant) -> usize {
        let mut evaluated = 0;
        for watcher in self.scroll_watchers.values_mut() {
            if watcher.tick(surface, now) {
                evaluated += 1;
            }
        }
        evaluated
    }

    pub fn panel(&self, element: ElementId) -> Option<&PanelController> {
        self.panels.get(&element)
    }

    pub fn panel_mut(&mut self, element: ElementId) -> Option<&mut PanelController> {
        self.panels.get_mut(&element)
    }

    pub fn toggle(&self, element: ElementId) -> Option<&ToggleController> {
        self.toggles.get(&element)
    }

    pub fn toggle_mut(&mut self, element: ElementId) -> Option<&mut ToggleController> {
        self.toggles.get_mut(&element)
    }

    pub fn scroll_watcher(&self, element: ElementId) -> Option<&ScrollWatcher> {
        self.scroll_watchers.get(&element)
    }

    pub fn scroll_watcher_mut(&mut self, element: ElementId) -> Option<&mut ScrollWatcher> {
        self.scroll_watchers.get_mut(&element)
    }

    /// Owner of a listener handle.
    pub fn owner(&self, listener: ListenerHandle) -> Option<ControllerKey> {
        self.routes.get(&listener).copied()
    }

    pub fn len(&self) -> usize {
        self.panels.len() + self.toggles.len() + self.scroll_watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn destroy_panel(&mut self, surface: &mut dyn Surface, element: ElementId) -> bool {
        match self.panels.remove(&element) {
            Some(panel) => {
                self.forget(&panel.listeners());
                panel.destroy(surface);
                true
            }
            None => false,
        }
    }

    pub fn destroy_toggle(&mut self, surface: &mut dyn Surface, element: ElementId) -> bool {
        match self.toggles.remove(&element) {
            Some(toggle) => {
                self.forget(&toggle.listeners());
                toggle.destroy(surface);
                true
            }
            None => false,
        }
    }

    pub fn destroy_scroll_watcher(
        &mut self,
        surface: &mut dyn Surface,
        element: ElementId,
    ) -> bool {
        match self.scroll_watchers.remove(&element) {
            Some(watcher) => {
                self.forget(&watcher.listeners());
                watcher.destroy(surface);
                true
            }
            None => false,
        }
    }

    /// Tear down every controller.
    pub fn destroy_all(&mut self, surface: &mut dyn Surface) {
        for (_, panel) in self.panels.drain() {
            panel.destroy(surface);
        }
        for (_, toggle) in self.toggles.drain() {
            toggle.destroy(surface);
        }
        for (_, watcher) in self.scroll_watchers.drain() {
            watcher.destroy(surface);
        }
        self.routes.clear();
    }

    fn scan_panel(
        &mut self,
        surface: &mut dyn Surface,
        element: ElementId,
    ) -> InteractionResult<()> {
        let config = parse_config(surface.data(element, PANEL_KEY).as_deref())?;
        self.attach_panel(surface, element, config)?;
        Ok(())
    }

    fn scan_toggle(
        &mut self,
        surface: &mut dyn Surface,
        element: ElementId,
    ) -> InteractionResult<()> {
        let config: ToggleConfig = parse_config(surface.data(element, TOGGLE_KEY).as_deref())?;
        let target = resolve_target(surface, &config)?;
        self.attach_toggle(surface, element, target, config)?;
        Ok(())
    }

    fn scan_scroll_watcher(
        &mut self,
        surface: &mut dyn Surface,
        element: ElementId,
    ) -> InteractionResult<()> {
        let config = parse_config(surface.data(element, SCROLL_TOP_KEY).as_deref())?;
        self.attach_scroll_watcher(surface, element, config)?;
        Ok(())
    }

    fn forget(&mut self, listeners: &[ListenerHandle]) {
        for listener in listeners {
            self.routes.remove(listener);
        }
    }
}

fn resolve_target(surface: &dyn Surface, config: &ToggleConfig) -> InteractionResult<ElementId> {
    let selector = config
        .target
        .as_deref()
        .ok_or(InteractionError::MissingElement("toggle target"))?;
    surface
        .query_all(selector)
        .into_iter()
        .next()
        .ok_or_else(|| InteractionError::UnknownSelector(selector.to_string()))
}

fn tally(
    created: &mut usize,
    skipped: &mut usize,
    element: ElementId,
    result: InteractionResult<()>,
) {
    match result {
        Ok(()) => *created += 1,
        Err(err) => {
            log::warn!("Skipping {}: {}", element, err);
            *skipped += 1;
        }
    }
}
