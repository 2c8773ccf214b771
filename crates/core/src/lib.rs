//! Climate API Core Library
//!
//! Shared utilities for the API service:
//! - Configuration loading (XDG-compliant)
//! - Common constants

mod config;

pub use config::{find_config_file, load_config, ConfigSource};

/// Application name used for XDG paths
pub const APP_NAME: &str = "climate-api";

/// Default API port
pub const DEFAULT_API_PORT: u16 = 9200;
