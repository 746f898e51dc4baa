//! PanelKit Application
//!
//! The application shell: a scripted demo page for native runs and a DOM
//! surface adapter for the browser.

mod demo;

pub use demo::{
    DEFAULT_SCRIPT, DemoError, DemoPage, DemoReport, ScriptAction, ScriptStep, parse_script,
    run_demo,
};

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::{DomSurface, run_wasm};
