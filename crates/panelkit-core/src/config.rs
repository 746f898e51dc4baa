//! Controller configuration.
//!
//! Every config deserializes from the JSON carried in an element's data
//! attribute (`data-panel='{"draggable":true}'`). Missing fields fall back to
//! the defaults below, and an empty attribute means "all defaults".

use crate::error::InteractionResult;
use kurbo::Rect;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default scroll offset (px) beyond which the boundary marker is set.
pub const DEFAULT_SCROLL_OFFSET: f64 = 300.0;
/// Default scroll-to-top animation duration in milliseconds.
pub const DEFAULT_SCROLL_DURATION_MS: u64 = 600;
/// Default body data attribute mirroring the scroll flag.
pub const DEFAULT_SCROLL_MARKER: &str = "scrolled";

pub const DEFAULT_PANEL_WIDTH: f64 = 480.0;
pub const DEFAULT_PANEL_HEIGHT: f64 = 320.0;

/// How a toggle mirrors its state onto the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleMode {
    /// Add/remove a class named after `target_state`.
    #[default]
    Class,
    /// Set/remove a data attribute named after `target_state`.
    Attribute,
}

/// Configuration for a [`ToggleController`](crate::toggle::ToggleController).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToggleConfig {
    /// Selector for the target element. Only used by the registry scan.
    pub target: Option<String>,
    /// Class or data attribute name marking the target as on.
    pub target_state: String,
    /// Class mirrored onto the toggle element itself.
    pub toggle_state: Option<String>,
    pub target_toggle_mode: ToggleMode,
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self {
            target: None,
            target_state: "active".to_string(),
            toggle_state: None,
            target_toggle_mode: ToggleMode::Class,
        }
    }
}

/// Configuration for a [`PanelController`](crate::panel::PanelController).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PanelConfig {
    pub title: String,
    pub content: String,
    /// Footer text; no footer is built when absent.
    pub footer: Option<String>,
    pub width: f64,
    pub height: f64,
    /// Initial left edge. Leaves the surface's position alone when absent.
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub draggable: bool,
    pub resizable: bool,
    pub auto_open: bool,
    pub close_on_escape: bool,
    pub close_on_outside_click: bool,
    /// Area the top-left corner is clamped to while dragging.
    pub drag_bounds: Option<Rect>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            footer: None,
            width: DEFAULT_PANEL_WIDTH,
            height: DEFAULT_PANEL_HEIGHT,
            left: None,
            top: None,
            draggable: true,
            resizable: false,
            auto_open: false,
            close_on_escape: true,
            close_on_outside_click: true,
            drag_bounds: None,
        }
    }
}

/// Configuration for a [`ScrollWatcher`](crate::scroll::ScrollWatcher).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrollConfig {
    /// Scroll position (px) beyond which the marker is set.
    pub offset: f64,
    /// Throttle window for scroll evaluation.
    pub interval_ms: u64,
    /// Scroll-to-top animation duration.
    pub duration_ms: u64,
    /// Data attribute placed on the body while past `offset`.
    pub marker: String,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            offset: DEFAULT_SCROLL_OFFSET,
            interval_ms: crate::throttle::DEFAULT_THROTTLE_INTERVAL_MS,
            duration_ms: DEFAULT_SCROLL_DURATION_MS,
            marker: DEFAULT_SCROLL_MARKER.to_string(),
        }
    }
}

impl ScrollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Parse a config from an optional JSON attribute value.
///
/// `None` and blank strings yield `T::default()`.
pub fn parse_config<T>(raw: Option<&str>) -> InteractionResult<T>
where
    T: DeserializeOwned + Default,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(T::default()),
        Some(json) => Ok(serde_json::from_str(json)?),
    }
}
