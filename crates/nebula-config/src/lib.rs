//! Configuration system for the Nebula graph explorer.
//!
//! Provides runtime-configurable settings that persist to disk as RON files.
//! Supports CLI overrides via clap, hot-reload detection, and forward/backward
//! compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CameraConfig, CameraEasing, Config, DebugConfig, GraphConfig, HighlightConfig, InputConfig,
    RenderConfig, SimilaritySetting, WindowConfig,
};
pub use error::ConfigError;
