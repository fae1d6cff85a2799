//! TOML-based configuration for pgcompose.
//!
//! A config file (`pgcompose.toml`) carries a default relation catalog and
//! output options for the command-line front end.
//!
//! Example configuration:
//! ```toml
//! [output]
//! semicolon = true
//!
//! [relations.albums]
//! type = "MANY"
//! table = "albums"
//! field = "artist_id"
//! referenceTable = "artist"
//! referenceField = "id"
//!
//! [relations.tags]
//! type = "MANY"
//! table = "tags"
//! field = "id"
//! referenceTable = "posts"
//! referenceField = "id"
//! junction = { table = "post_tags", field = "tag_id", referenceField = "post_id" }
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::Relations;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "PGCOMPOSE_CONFIG";

/// File name looked up in the working directory.
pub const LOCAL_CONFIG: &str = "pgcompose.toml";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Default relation catalog.
    pub relations: Relations,

    /// Output formatting.
    pub output: OutputSettings,
}

/// Output formatting options.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Terminate printed statements with `;`.
    pub semicolon: bool,
}

impl OutputSettings {
    /// Apply the output options to a finished statement.
    pub fn finish(&self, sql: &str) -> String {
        if self.semicolon && !sql.ends_with(';') {
            format!("{sql};")
        } else {
            sql.to_string()
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `PGCOMPOSE_CONFIG`
    /// 2. `./pgcompose.toml`
    /// 3. `~/.config/pgcompose/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG);
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("pgcompose").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Load from an explicit path when given, otherwise search.
    pub fn load_from(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::load(),
        }
    }

    /// The configured catalog overlaid with `overrides`.
    ///
    /// Entries in `overrides` replace configured relations of the same name
    /// in place; new names are appended.
    pub fn relations_with(&self, overrides: &Relations) -> Relations {
        let mut relations = self.relations.clone();
        for (name, relation) in overrides {
            relations.insert(name.clone(), relation.clone());
        }
        relations
    }

    /// Reject relations with blank table or column names.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (name, relation) in &self.relations {
            let mut fields = vec![
                ("table", &relation.table),
                ("field", &relation.field),
                ("referenceTable", &relation.reference_table),
                ("referenceField", &relation.reference_field),
            ];
            if let Some(junction) = &relation.junction {
                fields.push(("junction.table", &junction.table));
                fields.push(("junction.field", &junction.field));
                fields.push(("junction.referenceField", &junction.reference_field));
            }
            if let Some((key, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
                return Err(SettingsError::InvalidConfig(format!(
                    "relation '{name}' has an empty {key}"
                )));
            }
        }
        Ok(())
    }
}
