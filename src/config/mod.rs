//! Configuration module for pgcompose.
//!
//! Handles the TOML settings file used by the command-line front end.

mod settings;

pub use settings::{OutputSettings, Settings, SettingsError, CONFIG_ENV, LOCAL_CONFIG};
