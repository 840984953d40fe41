//! Layered configuration loader.
//!
//! Discovers configuration layers (system/user/project/cwd/runtime), validates
//! their schema, merges them in precedence order and produces a final
//! `BuddyConfig`.

mod layer_io;
mod merge;
mod schema;
mod utils;

#[cfg(test)]
mod tests;

use crate::{BuddyConfig, ConfigError};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "buddy.json5";
/// Default config directory under the user's home.
const DEFAULT_CONFIG_DIR: &str = ".buddy";
/// Marker files/dirs that identify a project root.
const DEFAULT_PROJECT_ROOT_MARKERS: &[&str] = &[".git"];

#[cfg(unix)]
/// Default system config path on Unix.
const SYSTEM_CONFIG_PATH: &str = "/etc/buddy/buddy.json5";
#[cfg(windows)]
/// Default system config path on Windows.
const SYSTEM_CONFIG_PATH: &str = "C:\\ProgramData\\buddy\\buddy.json5";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: BuddyConfig,
    /// Metadata for each layer merged during load.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// System-wide configuration.
    System,
    /// User-specific configuration.
    User,
    /// Project root configuration.
    Project,
    /// Current working directory configuration.
    Cwd,
    /// Runtime overrides (highest precedence).
    Runtime,
}

/// Metadata about a config layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    /// Layer origin (system, user, runtime, etc).
    pub source: ConfigLayerSource,
    /// Location on disk.
    pub path: PathBuf,
}

/// Schema validation mode for layered configs.
#[derive(Debug, Clone, Copy)]
enum SchemaMode {
    /// Partial validation for non-final layers.
    Partial,
    /// Full validation for the effective config.
    Full,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to find the project root and cwd layer.
    pub cwd: PathBuf,
    /// Optional system config path (defaults to `/etc/buddy/buddy.json5` on Unix).
    pub system_config_path: Option<PathBuf>,
    /// Optional user config path (defaults to `~/.buddy/buddy.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied last.
    pub runtime_paths: Vec<PathBuf>,
    /// Marker files/dirs used to detect the project root.
    pub project_root_markers: Vec<String>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_config_path: layer_io::default_system_config_path(),
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
            project_root_markers: DEFAULT_PROJECT_ROOT_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }

    /// Add a runtime override config path that is applied last.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl BuddyConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        config_from_value(value, "config")
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load a layered config stack using the default layer locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        info!(
            "loading layered config with defaults (cwd={})",
            cwd.as_ref().display()
        );
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack using explicit layer locations and overrides.
    ///
    /// Layer precedence (low -> high): system, user, project, cwd, runtime
    /// overrides. Missing optional layers are skipped; a missing runtime layer
    /// is an error.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = utils::normalize_path(&options.cwd)?;
        debug!("normalized cwd for config load: {}", cwd.display());
        let mut layers = Vec::new();
        let mut merge_layers = Vec::new();
        let mut seen_paths = HashSet::new();

        let project_root = utils::find_project_root(&cwd, &options.project_root_markers);
        match project_root.as_ref() {
            Some(root) => debug!("resolved project root: {}", root.display()),
            None => debug!("project root not found; skipping project layer"),
        }

        let mut candidates = vec![
            (ConfigLayerSource::System, options.system_config_path.clone()),
            (ConfigLayerSource::User, options.user_config_path.clone()),
        ];
        if let Some(root) = project_root.as_ref() {
            candidates.push((
                ConfigLayerSource::Project,
                Some(root.join(DEFAULT_CONFIG_FILE)),
            ));
        }
        candidates.push((ConfigLayerSource::Cwd, Some(cwd.join(DEFAULT_CONFIG_FILE))));

        for (source, path) in candidates {
            let Some(path) = path else {
                continue;
            };
            if !seen_paths.insert(utils::unique_path(&path)) {
                debug!(
                    "skipping duplicate layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            if let Some(layer) = layer_io::load_optional_layer(source, &path)? {
                layers.push(layer.meta.clone());
                merge_layers.push(layer);
            }
        }

        for runtime_path in &options.runtime_paths {
            let loaded = layer_io::load_required_layer(ConfigLayerSource::Runtime, runtime_path)?;
            debug!("loaded runtime layer (path={})", runtime_path.display());
            layers.push(loaded.meta.clone());
            merge_layers.push(loaded);
        }

        let mut merged = Value::Object(serde_json::Map::new());
        for layer in merge_layers {
            merge::merge_json_values(&mut merged, &layer.value);
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Validate configuration invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory.recall_k == 0 {
            return Err(ConfigError::InvalidField {
                path: "memory.recall_k".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        for (path, model) in [
            ("embedding.model", &self.embedding.model),
            ("generation.model", &self.generation.model),
        ] {
            if model.trim().is_empty() {
                return Err(ConfigError::InvalidField {
                    path: path.to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        }
        for (path, url) in [
            ("embedding.base_url", &self.embedding.base_url),
            ("generation.base_url", &self.generation.base_url),
        ] {
            if !utils::is_http_url(url) {
                return Err(ConfigError::InvalidField {
                    path: path.to_string(),
                    message: format!("expected http(s) URL, got `{url}`"),
                });
            }
        }
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidField {
                path: "server.bind".to_string(),
                message: format!("expected socket address, got `{}`", self.server.bind),
            });
        }
        if self.memory.path.as_deref().is_some_and(|path| path.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "memory.path must not be empty when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Snapshot path: the configured `memory.path`, else `~/.buddy/memory.jsonl`.
    pub fn memory_path(&self) -> Result<PathBuf, ConfigError> {
        match self.memory.path.as_deref() {
            Some(path) => Ok(utils::expand_home(path)),
            None => layer_io::default_memory_path().ok_or_else(|| {
                ConfigError::Invalid("home directory unavailable for memory.path".to_string())
            }),
        }
    }
}

/// Internal representation of a loaded config layer.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<BuddyConfig, ConfigError> {
    schema::validate_layer_schema(&value, SchemaMode::Full, label)?;
    let config: BuddyConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
