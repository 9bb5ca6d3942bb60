//! Locating and layering config files.
//!
//! Two layers are read, later ones overriding earlier ones: `config.toml`
//! in the user config dir, then `harness.toml` in the project directory.
//! Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use crate::{ConfigError, HarnessConfig, Result};

/// Overrides the user config directory.
const CONFIG_DIR_ENV: &str = "HARNESS_CONFIG_DIR";

/// One config file that was consulted.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub path: PathBuf,
    /// False when the file is absent or failed to parse.
    pub loaded: bool,
}

/// The merged configuration plus how it was assembled.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: HarnessConfig,
    /// Files consulted, lowest precedence first.
    pub layers: Vec<ConfigLayer>,
    /// One entry per file that exists but could not be loaded.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of the layers that contributed to the config.
    pub fn loaded_paths(&self) -> impl Iterator<Item = &Path> {
        self.layers
            .iter()
            .filter(|layer| layer.loaded)
            .map(|layer| layer.path.as_path())
    }
}

/// Discover and merge the user and project config files.
///
/// Never fails: missing files are skipped and broken ones become warnings.
/// `project_dir` defaults to the current directory.
pub fn load_config(project_dir: Option<&Path>) -> LoadedConfig {
    let user = user_config_dir().map(|dir| dir.join("config.toml"));
    let project = match project_dir {
        Some(dir) => dir.join("harness.toml"),
        None => PathBuf::from("harness.toml"),
    };
    merge_layers(user.into_iter().chain([project]))
}

/// Load exactly one file, failing on read or parse errors.
pub fn load_config_file(path: &Path) -> Result<HarnessConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    HarnessConfig::from_toml(&contents)
}

/// `$HARNESS_CONFIG_DIR` if set, else `<platform config dir>/harness`.
pub fn user_config_dir() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|dir| dir.join("harness")),
    }
}

fn merge_layers(paths: impl IntoIterator<Item = PathBuf>) -> LoadedConfig {
    let mut loaded = LoadedConfig {
        config: HarnessConfig::new(),
        layers: Vec::new(),
        warnings: Vec::new(),
    };

    for path in paths {
        let mut ok = false;
        if path.is_file() {
            match load_config_file(&path) {
                Ok(layer) => {
                    loaded.config.merge(layer);
                    ok = true;
                }
                Err(e) => loaded
                    .warnings
                    .push(format!("Failed to load {}: {}", path.display(), e)),
            }
        }
        loaded.layers.push(ConfigLayer { path, loaded: ok });
    }

    loaded
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
