//! jtt-inspect library entry point.
//!
//! Shares the configuration and inspection modules between the binary in
//! `main.rs` and the integration tests in `tests/`.

pub mod config;
pub mod inspect;

pub use config::{load_config, ConfigError, InspectConfig, OutputFormat};
pub use inspect::{FrameInspector, FrameStatus, InspectError, Inspection};
