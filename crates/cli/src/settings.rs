//! CLI settings
//!
//! Loaded from `<config_dir>/autosave/config.toml` (or `--config`), then
//! overridden by command-line flags. A missing file means defaults.

use anyhow::{Context, Result};
use autosave_core::AutosaveConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Session tuning
    pub session: AutosaveConfig,
    /// Snapshot storage
    pub store: StoreSettings,
}

/// `[store]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Journal directory (default: `<data_dir>/autosave`)
    pub path: Option<PathBuf>,
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub store: Option<PathBuf>,
    pub frequency_ms: Option<u64>,
}

impl Settings {
    /// Parse a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).context("Failed to parse configuration file")
    }

    /// Apply command-line overrides
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(store) = &overrides.store {
            self.store.path = Some(store.clone());
        }
        if let Some(frequency_ms) = overrides.frequency_ms {
            self.session.frequency_ms = frequency_ms;
        }
    }

    /// Validate all values
    pub fn validate(&self) -> Result<()> {
        self.session
            .validate()
            .context("Invalid [session] configuration")?;

        if let Some(path) = &self.store.path {
            if path.as_os_str().is_empty() {
                anyhow::bail!("Invalid [store] configuration: path must not be empty");
            }
        }

        Ok(())
    }

    /// Journal directory to use
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store.path {
            Some(path) => Ok(path.clone()),
            None => default_store_path()
                .context("Could not determine data directory; pass --store"),
        }
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Default config file location
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("autosave").join("config.toml"))
}

/// Default journal directory
pub fn default_store_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("autosave"))
}

/// Load settings from `path`, falling back to defaults if it does not exist
pub fn load_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    Settings::from_toml_str(&contents)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}

/// Load settings from `explicit` or the default location, apply overrides
/// and validate
pub fn resolve(explicit: Option<&Path>, overrides: &Overrides) -> Result<Settings> {
    let mut settings = match explicit.map(Path::to_path_buf).or_else(config_file_path) {
        Some(path) => load_from(&path)?,
        None => Settings::default(),
    };

    settings.apply(overrides);
    settings.validate()?;
    Ok(settings)
}

/// Example configuration file
pub fn example_config() -> &'static str {
    r#"# Autosave configuration
# Location: ~/.config/autosave/config.toml (Linux)

[session]
# Quiet period after the last change before saving (1-3600000 ms)
frequency_ms = 1000

# How save completions that finish out of order are folded:
#   "highest-wins"  an older save landing late never marks the document unsaved
#   "last-arrived"  the most recent completion always decides
completion_order = "highest-wins"

[store]
# Snapshot journal directory (default: platform data dir + /autosave)
# path = "/home/me/.local/share/autosave"
"#
}
