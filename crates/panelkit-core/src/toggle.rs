//! Binary on/off controller mirrored onto a target surface.
//!
//! A toggle element (usually a button) flips a target element between on and
//! off by adding/removing a class or a data attribute. Every transition
//! function receives the binding and the explicit [`ToggleModel`], so no
//! state hides in captured variables.

use crate::config::{ToggleConfig, ToggleMode};
use crate::error::{InteractionError, InteractionResult};
use crate::events::{EventBus, names};
use crate::surface::{
    ElementId, EventKind, EventOutcome, ListenTarget, ListenerHandle, Surface, UiEvent,
};

const ON_VALUE: &str = "on";
const OFF_VALUE: &str = "off";

/// On/off state of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToggleState {
    #[default]
    Off,
    On,
}

/// Mutable toggle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleModel {
    pub state: ToggleState,
    /// String form of the state. In attribute mode this is the attribute's
    /// value as first read from the target.
    pub value: String,
}

/// Snapshot handed to toggle event handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleContext {
    pub state: ToggleState,
    pub value: String,
    pub toggle: ElementId,
    pub target: ElementId,
}

pub type ToggleEvents = EventBus<ToggleContext>;

/// Elements and configuration a toggle is bound to.
#[derive(Debug, Clone)]
struct ToggleBinding {
    toggle: ElementId,
    target: ElementId,
    config: ToggleConfig,
    /// The toggle carried its indicator class while the target was off.
    /// Switching off leaves such a class in place.
    preset_indicator: bool,
}

/// Toggles a target surface on pointer release.
#[derive(Debug)]
pub struct ToggleController {
    binding: ToggleBinding,
    model: ToggleModel,
    events: ToggleEvents,
    release_listener: ListenerHandle,
}

impl ToggleController {
    /// Bind `toggle` to `target`. Fails if either element is missing.
    pub fn new(
        surface: &mut dyn Surface,
        toggle: ElementId,
        target: ElementId,
        config: ToggleConfig,
    ) -> InteractionResult<Self> {
        if !surface.exists(toggle) {
            return Err(InteractionError::MissingElement("toggle"));
        }
        if !surface.exists(target) {
            return Err(InteractionError::MissingElement("toggle target"));
        }

        let mut binding = ToggleBinding {
            toggle,
            target,
            config,
            preset_indicator: false,
        };
        let model = read_model(surface, &binding);
        binding.preset_indicator = model.state == ToggleState::Off
            && binding
                .config
                .toggle_state
                .as_deref()
                .is_some_and(|class| surface.has_class(toggle, class));
        let release_listener =
            surface.add_listener(ListenTarget::Element(toggle), EventKind::PointerUp);

        log::debug!(
            "Toggle {} bound to {} ({:?}, initially {:?})",
            toggle,
            target,
            binding.config.target_toggle_mode,
            model.state
        );

        Ok(Self {
            binding,
            model,
            events: ToggleEvents::new(),
            release_listener,
        })
    }

    pub fn state(&self) -> ToggleState {
        self.model.state
    }

    pub fn is_on(&self) -> bool {
        self.model.state == ToggleState::On
    }

    pub fn value(&self) -> &str {
        &self.model.value
    }

    pub fn toggle_element(&self) -> ElementId {
        self.binding.toggle
    }

    pub fn target_element(&self) -> ElementId {
        self.binding.target
    }

    pub fn config(&self) -> &ToggleConfig {
        &self.binding.config
    }

    pub fn events_mut(&mut self) -> &mut ToggleEvents {
        &mut self.events
    }

    /// Subscribe a persistent handler.
    pub fn on(&mut self, event_name: &str, handler: impl FnMut(&ToggleContext, &()) + 'static) {
        self.events.on(event_name, handler);
    }

    /// Subscribe a one-shot handler.
    pub fn once(&mut self, event_name: &str, handler: impl FnMut(&ToggleContext, &()) + 'static) {
        self.events.once(event_name, handler);
    }

    /// Flip the state.
    pub fn toggle(&mut self, surface: &mut dyn Surface) {
        self.emit(names::BEFORE_TOGGLE);
        match self.model.state {
            ToggleState::On => self.toggle_off(surface),
            ToggleState::Off => self.toggle_on(surface),
        }
        self.emit(names::AFTER_TOGGLE);
    }

    pub fn toggle_on(&mut self, surface: &mut dyn Surface) {
        self.emit(names::BEFORE_TOGGLE_ON);
        switch_on(surface, &self.binding, &mut self.model);
        self.emit(names::TOGGLE);
        self.emit(names::AFTER_TOGGLE_ON);
    }

    pub fn toggle_off(&mut self, surface: &mut dyn Surface) {
        self.emit(names::BEFORE_TOGGLE_OFF);
        switch_off(surface, &self.binding, &mut self.model);
        self.emit(names::TOGGLE);
        self.emit(names::AFTER_TOGGLE_OFF);
    }

    /// React to a routed event. Only the toggle's pointer release matters.
    pub fn handle_event(
        &mut self,
        surface: &mut dyn Surface,
        listener: ListenerHandle,
        event: &UiEvent,
    ) -> EventOutcome {
        match event {
            UiEvent::PointerUp { .. } if listener == self.release_listener => {
                self.toggle(surface);
                EventOutcome::Handled
            }
            _ => EventOutcome::Ignored,
        }
    }

    pub fn listeners(&self) -> Vec<ListenerHandle> {
        vec![self.release_listener]
    }

    /// Unbind from the toggle element. The target keeps its current state.
    pub fn destroy(self, surface: &mut dyn Surface) {
        surface.remove_listener(self.release_listener);
        log::debug!("Toggle {} destroyed", self.binding.toggle);
    }

    fn context(&self) -> ToggleContext {
        ToggleContext {
            state: self.model.state,
            value: self.model.value.clone(),
            toggle: self.binding.toggle,
            target: self.binding.target,
        }
    }

    fn emit(&mut self, event_name: &str) {
        let context = self.context();
        self.events.trigger(event_name, &context, &());
    }
}

/// Derive the initial model from the target surface.
fn read_model(surface: &dyn Surface, binding: &ToggleBinding) -> ToggleModel {
    let key = &binding.config.target_state;
    match binding.config.target_toggle_mode {
        ToggleMode::Class => {
            let state = if surface.has_class(binding.target, key) {
                ToggleState::On
            } else {
                ToggleState::Off
            };
            ToggleModel {
                state,
                value: state_value(state).to_string(),
            }
        }
        ToggleMode::Attribute => match surface.data(binding.target, key) {
            Some(value) => ToggleModel {
                state: ToggleState::On,
                value,
            },
            None => ToggleModel {
                state: ToggleState::Off,
                value: OFF_VALUE.to_string(),
            },
        },
    }
}

fn switch_on(surface: &mut dyn Surface, binding: &ToggleBinding, model: &mut ToggleModel) {
    let key = &binding.config.target_state;
    match binding.config.target_toggle_mode {
        ToggleMode::Class => surface.add_class(binding.target, key),
        ToggleMode::Attribute => surface.set_data(binding.target, key, ON_VALUE),
    }
    if let Some(toggle_class) = &binding.config.toggle_state {
        surface.add_class(binding.toggle, toggle_class);
    }
    model.state = ToggleState::On;
    model.value = ON_VALUE.to_string();
    log::debug!("Toggle {} on", binding.toggle);
}

fn switch_off(surface: &mut dyn Surface, binding: &ToggleBinding, model: &mut ToggleModel) {
    let key = &binding.config.target_state;
    match binding.config.target_toggle_mode {
        ToggleMode::Class => surface.remove_class(binding.target, key),
        ToggleMode::Attribute => surface.remove_data(binding.target, key),
    }
    if !binding.preset_indicator {
        if let Some(toggle_class) = &binding.config.toggle_state {
            surface.remove_class(binding.toggle, toggle_class);
        }
    }
    model.state = ToggleState::Off;
    model.value = OFF_VALUE.to_string();
    log::debug!("Toggle {} off", binding.toggle);
}

fn state_value(state: ToggleState) -> &'static str {
    match state {
        ToggleState::On => ON_VALUE,
        ToggleState::Off => OFF_VALUE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;
    use kurbo::Point;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn setup() -> (MemorySurface, ElementId, ElementId) {
        let mut surface = MemorySurface::new();
        let body = surface.body();
        let button = surface.create_child(body, "button");
        let sidebar = surface.create_child(body, "aside");
        surface.add_class(sidebar, "sidebar");
        (surface, button, sidebar)
    }

    fn class_config(state: &str) -> ToggleConfig {
        ToggleConfig {
            target_state: state.to_string(),
            ..ToggleConfig::default()
        }
    }

    #[test]
    fn test_toggle_class_round_trip() {
        let (mut surface, button, sidebar) = setup();
        let mut toggle =
            ToggleController::new(&mut surface, button, sidebar, class_config("collapsed"))
                .unwrap();
        assert_eq!(toggle.state(), ToggleState::Off);

        toggle.toggle(&mut surface);
        assert_eq!(toggle.state(), ToggleState::On);
        assert!(surface.has_class(sidebar, "collapsed"));

        toggle.toggle(&mut surface);
        assert_eq!(toggle.state(), ToggleState::Off);
        assert!(!surface.has_class(sidebar, "collapsed"));
    }

    #[test]
    fn test_on_then_off_restores_markup() {
        let (mut surface, button, sidebar) = setup();
        let config = ToggleConfig {
            toggle_state: Some("active".to_string()),
            ..class_config("collapsed")
        };
        let before = surface.markup(surface.body());
        let mut toggle = ToggleController::new(&mut surface, button, sidebar, config).unwrap();

        toggle.toggle_on(&mut surface);
        assert!(surface.has_class(button, "active"));
        toggle.toggle_off(&mut surface);

        assert_eq!(surface.markup(surface.body()), before);
    }

    #[test]
    fn test_preset_indicator_survives_on_off() {
        let (mut surface, button, sidebar) = setup();
        surface.add_class(button, "active");
        let config = ToggleConfig {
            toggle_state: Some("active".to_string()),
            ..class_config("collapsed")
        };
        let before = surface.markup(surface.body());
        let mut toggle = ToggleController::new(&mut surface, button, sidebar, config).unwrap();

        toggle.toggle_on(&mut surface);
        toggle.toggle_off(&mut surface);

        assert!(surface.has_class(button, "active"));
        assert_eq!(surface.markup(surface.body()), before);
    }

    #[test]
    fn test_indicator_cleared_when_initially_on() {
        let (mut surface, button, sidebar) = setup();
        surface.add_class(sidebar, "collapsed");
        surface.add_class(button, "active");
        let config = ToggleConfig {
            toggle_state: Some("active".to_string()),
            ..class_config("collapsed")
        };
        let mut toggle = ToggleController::new(&mut surface, button, sidebar, config).unwrap();

        toggle.toggle_off(&mut surface);

        assert!(!surface.has_class(button, "active"));
    }

    #[test]
    fn test_initial_state_read_from_class() {
        let (mut surface, button, sidebar) = setup();
        surface.add_class(sidebar, "collapsed");

        let toggle =
            ToggleController::new(&mut surface, button, sidebar, class_config("collapsed"))
                .unwrap();

        assert!(toggle.is_on());
        assert_eq!(toggle.value(), "on");
    }

    #[test]
    fn test_attribute_mode() {
        let (mut surface, button, sidebar) = setup();
        let config = ToggleConfig {
            target_toggle_mode: ToggleMode::Attribute,
            ..class_config("expanded")
        };
        let before = surface.markup(sidebar);
        let mut toggle = ToggleController::new(&mut surface, button, sidebar, config).unwrap();
        assert_eq!(toggle.value(), "off");

        toggle.toggle(&mut surface);
        assert_eq!(surface.data(sidebar, "expanded").as_deref(), Some("on"));
        assert!(!surface.has_class(sidebar, "expanded"));

        toggle.toggle(&mut surface);
        assert_eq!(surface.data(sidebar, "expanded"), None);
        assert_eq!(surface.markup(sidebar), before);
    }

    #[test]
    fn test_attribute_mode_keeps_initial_value() {
        let (mut surface, button, sidebar) = setup();
        surface.set_data(sidebar, "expanded", "partial");
        let config = ToggleConfig {
            target_toggle_mode: ToggleMode::Attribute,
            ..class_config("expanded")
        };

        let toggle = ToggleController::new(&mut surface, button, sidebar, config).unwrap();

        assert!(toggle.is_on());
        assert_eq!(toggle.value(), "partial");
    }

    #[test]
    fn test_missing_element_fails_construction() {
        let (mut surface, button, sidebar) = setup();
        surface.remove(sidebar);

        let result = ToggleController::new(&mut surface, button, sidebar, class_config("x"));

        assert!(matches!(
            result,
            Err(InteractionError::MissingElement("toggle target"))
        ));
        assert!(surface.listeners().is_empty());
    }

    #[test]
    fn test_event_order() {
        let (mut surface, button, sidebar) = setup();
        let mut toggle =
            ToggleController::new(&mut surface, button, sidebar, class_config("open")).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in [
            names::BEFORE_TOGGLE,
            names::BEFORE_TOGGLE_ON,
            names::TOGGLE,
            names::AFTER_TOGGLE_ON,
            names::AFTER_TOGGLE,
        ] {
            let log = log.clone();
            toggle.on(name, move |ctx: &ToggleContext, _: &()| {
                log.borrow_mut().push(format!("{}:{:?}", name, ctx.state));
            });
        }

        toggle.toggle(&mut surface);

        assert_eq!(
            log.borrow().as_slice(),
            [
                "beforeToggle:Off",
                "beforeToggleOn:Off",
                "toggle:On",
                "afterToggleOn:On",
                "afterToggle:On",
            ]
        );
    }

    #[test]
    fn test_pointer_release_toggles() {
        let (mut surface, button, sidebar) = setup();
        let mut toggle =
            ToggleController::new(&mut surface, button, sidebar, class_config("open")).unwrap();
        let event = UiEvent::PointerUp {
            target: button,
            position: Point::new(5.0, 5.0),
        };

        let listeners = surface.route(&event);
        assert_eq!(listeners, toggle.listeners());
        let outcome = toggle.handle_event(&mut surface, listeners[0], &event);

        assert_eq!(outcome, EventOutcome::Handled);
        assert!(surface.has_class(sidebar, "open"));
    }

    #[test]
    fn test_destroy_unregisters_listener() {
        let (mut surface, button, sidebar) = setup();
        let toggle =
            ToggleController::new(&mut surface, button, sidebar, class_config("open")).unwrap();
        assert_eq!(surface.listeners().len(), 1);

        toggle.destroy(&mut surface);

        assert!(surface.listeners().is_empty());
    }
}
