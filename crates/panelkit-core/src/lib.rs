//! PanelKit Core Library
//!
//! Platform-agnostic interaction framework: a single-winner event bus,
//! pointer-driven drag/resize and toggle controllers, a throttled scroll
//! watcher and a modal panel, all talking to the page through the
//! [`Surface`] adapter trait.

pub mod config;
pub mod error;
pub mod events;
pub mod gesture;
pub mod panel;
pub mod registry;
pub mod scroll;
pub mod surface;
pub mod throttle;
pub mod toggle;

pub use config::{PanelConfig, ScrollConfig, ToggleConfig, ToggleMode, parse_config};
pub use error::{InteractionError, InteractionResult};
pub use events::EventBus;
pub use gesture::{DragResizeController, GestureMode, GestureState};
pub use panel::{PanelController, PanelParts, PanelState};
pub use registry::{ControllerKey, ControllerRegistry, ScanReport};
pub use scroll::{ScrollContext, ScrollWatcher};
pub use surface::{
    ElementId, EventKind, EventOutcome, ListenTarget, ListenerHandle, ListenerTable,
    MemorySurface, Surface, UiEvent,
};
pub use throttle::{Instant, Throttle};
pub use toggle::{ToggleContext, ToggleController, ToggleModel, ToggleState};
