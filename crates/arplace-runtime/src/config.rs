//! Configuration – reads/writes `~/.arplace/config.toml`.
//!
//! ```toml
//! [session]
//! dom_overlay_root = "overlay"
//! transient_input_profile = "generic-touchscreen"
//! request_hit_test = true
//! request_anchors = true
//!
//! [[models]]
//! id = "chair"
//! display_name = "Chair"
//! source_url = "https://example.com/chair.glb"
//! normalization_scale = 0.4
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use arplace_types::ModelCatalog;

use crate::session::SessionConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Persisted application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub session: SessionConfig,

    /// Models offered for placement.
    #[serde(default)]
    pub models: ModelCatalog,
}

/// Return the path to `~/.arplace/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".arplace").join("config.toml")
}

/// Load the config from the default path. `None` if the file does not exist.
pub fn load() -> Result<Option<AppConfig>, ConfigError> {
    load_from(&config_path())
}

/// Load the config from `path`, then apply environment overrides.
pub fn load_from(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file; using defaults");
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut cfg: AppConfig = toml::from_str(&raw)?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `ARPLACE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ARPLACE_DOM_OVERLAY_ROOT` | `session.dom_overlay_root` (empty disables) |
/// | `ARPLACE_INPUT_PROFILE` | `session.transient_input_profile` |
pub fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Ok(v) = std::env::var("ARPLACE_DOM_OVERLAY_ROOT") {
        cfg.session.dom_overlay_root = (!v.is_empty()).then_some(v);
    }
    if let Ok(v) = std::env::var("ARPLACE_INPUT_PROFILE")
        && !v.is_empty()
    {
        cfg.session.transient_input_profile = v;
    }
}

/// Save the config to the default path.
pub fn save(cfg: &AppConfig) -> Result<(), ConfigError> {
    save_to(cfg, &config_path())
}

/// Save the config to `path`, creating parent directories as needed.
pub fn save_to(cfg: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let raw = toml::to_string_pretty(cfg)?;
    fs::write(path, raw).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
