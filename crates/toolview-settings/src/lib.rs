//! Toolview Settings Crate
//!
//! Rendering and machine configuration loaded from TOML. Configuration is a
//! plain value handed to the mesh builder and renderer; nothing here is
//! global.

pub mod config;
pub mod error;

pub use config::{
    find_config_file, Config, MachineConfig, MovementColors, RenderConfig, SelectionStyle,
    CONFIG_FILE_NAMES,
};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
