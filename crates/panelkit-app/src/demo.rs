//! Scripted demo page driven through an in-memory surface.
//!
//! The page mirrors a typical layout: a sidebar toggle, a draggable dialog
//! declared through `data-panel`, and a "back to top" link. A JSON script
//! replays timed input against it.

use kurbo::Point;
use panelkit_core::{
    ControllerRegistry, ElementId, Instant, MemorySurface, PanelState, ScanReport, Surface,
    UiEvent,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Script replayed by the `panelkit` binary when no file is given.
pub const DEFAULT_SCRIPT: &str = include_str!("../assets/demo_script.json");

const SIDEBAR_STATE: &str = "collapsed";

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("Invalid script: {0}")]
    Script(#[from] serde_json::Error),
    #[error("Selector matched nothing: {0}")]
    Selector(String),
}

/// A single input in a demo script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptAction {
    /// Press at `(x, y)`. Targets the body when no selector is given.
    PointerDown {
        #[serde(default)]
        selector: Option<String>,
        x: f64,
        y: f64,
    },
    PointerMove {
        #[serde(default)]
        selector: Option<String>,
        x: f64,
        y: f64,
    },
    PointerUp {
        #[serde(default)]
        selector: Option<String>,
        x: f64,
        y: f64,
    },
    Key {
        key: String,
    },
    Click {
        selector: String,
    },
    Scroll {
        y: f64,
    },
    /// Only advances the clock.
    Tick,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// Offset from the start of the run.
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: ScriptAction,
}

/// Final state of the demo page after a run.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoReport {
    pub scan: ScanReport,
    pub steps: usize,
    /// Steps some controller handled.
    pub handled: usize,
    pub panel_state: PanelState,
    pub panel_position: Point,
    pub sidebar_collapsed: bool,
    pub scrolled: bool,
    pub scroll_requests: usize,
}

pub fn parse_script(json: &str) -> Result<Vec<ScriptStep>, DemoError> {
    Ok(serde_json::from_str(json)?)
}

/// The demo document together with the controllers bound to it.
pub struct DemoPage {
    pub surface: MemorySurface,
    pub registry: ControllerRegistry,
    pub dialog: ElementId,
    pub sidebar: ElementId,
    pub toggle: ElementId,
    pub back_to_top: ElementId,
    scan: ScanReport,
}

impl DemoPage {
    /// Build the markup and bind controllers with a registry scan.
    pub fn build() -> Self {
        let mut surface = MemorySurface::new();
        let body = surface.body();

        let topbar = surface.create_child(body, "header");
        let toggle = surface.create_child(topbar, "button");
        surface.set_text(toggle, "Menu");
        surface.set_data(
            toggle,
            "toggle",
            r##"{"target":"#sidebar","targetState":"collapsed","toggleState":"active"}"##,
        );

        let sidebar = surface.create_child(body, "aside");
        surface.set_dom_id(sidebar, "sidebar");

        let dialog = surface.create_child(body, "div");
        surface.set_dom_id(dialog, "camera-dialog");
        surface.set_data(
            dialog,
            "panel",
            concat!(
                r#"{"title":"Edit camera","content":"Adjust the viewport","footer":"Save","#,
                r#""left":200,"top":120,"resizable":true,"autoOpen":true}"#,
            ),
        );

        let back_to_top = surface.create_child(body, "a");
        surface.set_dom_id(back_to_top, "back-to-top");
        surface.set_text(back_to_top, "Top");
        surface.set_data(back_to_top, "scroll-top", r#"{"offset":300}"#);

        let mut registry = ControllerRegistry::new();
        let scan = registry.scan(&mut surface);
        log::info!(
            "Scan bound {} controllers ({} skipped)",
            scan.created(),
            scan.skipped
        );

        Self {
            surface,
            registry,
            dialog,
            sidebar,
            toggle,
            back_to_top,
            scan,
        }
    }

    /// Replay `steps` with `start` as time zero. Throttle timers are driven
    /// before every step. Returns the number of steps that were handled.
    pub fn run(&mut self, steps: &[ScriptStep], start: Instant) -> Result<usize, DemoError> {
        let mut handled = 0;
        for step in steps {
            let now = start + Duration::from_millis(step.at_ms);
            let evaluated = self.registry.tick(&mut self.surface, now);
            if evaluated > 0 {
                log::debug!("{}ms: {} throttled evaluations", step.at_ms, evaluated);
            }

            let Some(event) = self.event_for(&step.action)? else {
                continue;
            };
            let outcome = self.registry.dispatch(&mut self.surface, &event, now);
            log::info!("{}ms: {:?} -> {:?}", step.at_ms, event.kind(), outcome);
            if outcome.is_handled() {
                handled += 1;
            }
        }
        Ok(handled)
    }

    pub fn report(&self, steps: usize, handled: usize) -> DemoReport {
        let body = self.surface.body();
        let panel = self.registry.panel(self.dialog);
        DemoReport {
            scan: self.scan,
            steps,
            handled,
            panel_state: panel.map_or(PanelState::Closed, |panel| panel.state()),
            panel_position: self.surface.position(self.dialog),
            sidebar_collapsed: self.surface.has_class(self.sidebar, SIDEBAR_STATE),
            scrolled: self.surface.data(body, "scrolled").is_some(),
            scroll_requests: self.surface.scroll_requests().len(),
        }
    }

    fn resolve(&self, selector: Option<&str>) -> Result<ElementId, DemoError> {
        match selector {
            None => Ok(self.surface.body()),
            Some(selector) => self
                .surface
                .query_all(selector)
                .first()
                .copied()
                .ok_or_else(|| DemoError::Selector(selector.to_string())),
        }
    }

    fn event_for(&self, action: &ScriptAction) -> Result<Option<UiEvent>, DemoError> {
        let event = match action {
            ScriptAction::PointerDown { selector, x, y } => UiEvent::PointerDown {
                target: self.resolve(selector.as_deref())?,
                position: Point::new(*x, *y),
            },
            ScriptAction::PointerMove { selector, x, y } => UiEvent::PointerMove {
                target: self.resolve(selector.as_deref())?,
                position: Point::new(*x, *y),
            },
            ScriptAction::PointerUp { selector, x, y } => UiEvent::PointerUp {
                target: self.resolve(selector.as_deref())?,
                position: Point::new(*x, *y),
            },
            ScriptAction::Key { key } => UiEvent::KeyDown { key: key.clone() },
            ScriptAction::Click { selector } => UiEvent::Click {
                target: self.resolve(Some(selector))?,
            },
            ScriptAction::Scroll { y } => UiEvent::Scroll { position: *y },
            ScriptAction::Tick => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// Parse `script`, replay it against a fresh demo page and report the result.
pub fn run_demo(script: &str) -> Result<DemoReport, DemoError> {
    let steps = parse_script(script)?;
    let mut page = DemoPage::build();
    let handled = page.run(&steps, Instant::now())?;
    Ok(page.report(steps.len(), handled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelkit_core::EventOutcome;

    #[test]
    fn test_default_script() {
        let report = run_demo(DEFAULT_SCRIPT).unwrap();

        assert_eq!(report.scan.created(), 3);
        assert_eq!(report.scan.skipped, 0);
        assert_eq!(report.steps, 12);
        // Every step but the two bare ticks reaches a controller.
        assert_eq!(report.handled, 10);
        assert_eq!(report.panel_state, PanelState::Closed);
        assert_eq!(report.panel_position, Point::new(250.0, 150.0));
        assert!(report.sidebar_collapsed);
        assert!(!report.scrolled);
        assert_eq!(report.scroll_requests, 1);
    }

    #[test]
    fn test_build_binds_controllers() {
        let page = DemoPage::build();

        assert!(page.registry.panel(page.dialog).is_some_and(|p| p.is_open()));
        assert!(page.registry.toggle(page.toggle).is_some());
        assert!(page.registry.scroll_watcher(page.back_to_top).is_some());
        assert!(page.surface.has_class(page.dialog, "panel"));
    }

    #[test]
    fn test_parse_script_step() {
        let steps = parse_script(
            r##"[
                {"at_ms": 5, "type": "click", "selector": "#back-to-top"},
                {"at_ms": 9, "type": "tick"}
            ]"##,
        )
        .unwrap();

        assert_eq!(
            steps[0],
            ScriptStep {
                at_ms: 5,
                action: ScriptAction::Click {
                    selector: "#back-to-top".to_string()
                },
            }
        );
        assert_eq!(steps[1].action, ScriptAction::Tick);
    }

    #[test]
    fn test_pointer_selector_is_optional() {
        let steps =
            parse_script(r#"[{"at_ms": 0, "type": "pointer_move", "x": 1, "y": 2}]"#).unwrap();

        assert_eq!(
            steps[0].action,
            ScriptAction::PointerMove {
                selector: None,
                x: 1.0,
                y: 2.0
            }
        );
    }

    #[test]
    fn test_invalid_script() {
        let result = run_demo(r#"[{"at_ms": 0, "type": "teleport"}]"#);
        assert!(matches!(result, Err(DemoError::Script(_))));
    }

    #[test]
    fn test_unknown_selector() {
        let result = run_demo(r#"[{"at_ms": 0, "type": "click", "selector": ".missing"}]"#);
        assert!(matches!(result, Err(DemoError::Selector(s)) if s == ".missing"));
    }

    #[test]
    fn test_scroll_marker_waits_for_throttle() {
        let mut page = DemoPage::build();
        let body = page.surface.body();
        let start = Instant::now();
        let steps = parse_script(
            r#"[{"at_ms": 0, "type": "scroll", "y": 800}, {"at_ms": 150, "type": "tick"}]"#,
        )
        .unwrap();

        page.run(&steps, start).unwrap();
        assert_eq!(page.surface.data(body, "scrolled"), None);

        page.registry
            .tick(&mut page.surface, start + Duration::from_millis(200));
        assert_eq!(page.surface.data(body, "scrolled").as_deref(), Some("true"));
    }

    #[test]
    fn test_back_to_top_prevents_default() {
        let mut page = DemoPage::build();
        let event = UiEvent::Click {
            target: page.back_to_top,
        };

        let outcome = page
            .registry
            .dispatch(&mut page.surface, &event, Instant::now());

        assert_eq!(outcome, EventOutcome::PreventDefault);
    }
}
