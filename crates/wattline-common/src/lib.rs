//! ---
//! wl_section: "01-core-functionality"
//! wl_subsection: "module"
//! wl_type: "source"
//! wl_scope: "code"
//! wl_description: "Shared primitives and utilities for the WattLine runtime."
//! wl_version: "v0.1.0"
//! wl_owner: "tbd"
//! ---
//! Core shared primitives for the WattLine workspace.
//! This crate exposes the canonical telemetry sample model together with
//! configuration loading and logging utilities consumed across the workspace.

pub mod config;
pub mod logging;
pub mod sample;

pub use config::{
    AppConfig, InsightsConfig, LoggingConfig, StreamConfig, WindowConfig, WINDOW_MINUTE_OPTIONS,
};
pub use logging::{init_tracing, LogFormat};
pub use sample::{DeviceSample, DeviceState};
