//! Configuration loading and root folder resolution
//!
//! Root folder resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`FOLIO_ROOT_FOLDER`)
//! 3. TOML config file (`root_folder`)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable config file is never fatal: a warning is logged and
//! compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "FOLIO_ROOT_FOLDER";

/// Default identifier pool file name inside the root folder
pub const DEFAULT_POOL_FILE: &str = "identifier_pool.json";

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set ("trace".."error")
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file path (stdout when absent)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_file: None,
        }
    }
}

/// Application config file (`folio.toml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Working folder for pool file and outputs
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Identifier pool file; relative paths resolve against the root folder
    #[serde(default)]
    pub pool_file: Option<PathBuf>,

    /// Optional TOML file overriding the built-in lookup tables
    #[serde(default)]
    pub lookup_tables: Option<PathBuf>,

    /// Upper bound on records compiled concurrently in one batch
    #[serde(default)]
    pub max_parallel_records: Option<usize>,
}

impl TomlConfig {
    /// Pool file path resolved against the given root folder
    pub fn pool_path(&self, root_folder: &Path) -> PathBuf {
        match &self.pool_file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => root_folder.join(path),
            None => root_folder.join(DEFAULT_POOL_FILE),
        }
    }
}

/// Compiled, platform-dependent defaults
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: default_log_level(),
        }
    }
}

/// Read a TOML config file
///
/// Errors are returned to the caller; use [`load_toml_config_or_default`] for
/// the graceful-degradation path.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Read a TOML config file, falling back to defaults with a warning
pub fn load_toml_config_or_default(path: &Path) -> TomlConfig {
    match load_toml_config(path) {
        Ok(config) => {
            debug!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!(
                "Config file {} unavailable ({}), using compiled defaults",
                path.display(),
                e
            );
            TomlConfig::default()
        }
    }
}

/// Write bytes to `path` via a sibling temporary file and rename
///
/// Readers never observe a partially written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::InvalidInput(format!("Not a file path: {}", path.display())))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Root folder resolver
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_config: Option<TomlConfig>,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_arg: None,
            toml_config: None,
        }
    }

    /// Command-line override (priority 1)
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Parsed TOML config (priority 3)
    pub fn with_toml_config(mut self, config: &TomlConfig) -> Self {
        self.toml_config = Some(config.clone());
        self
    }

    /// Resolve the root folder; never fails
    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            debug!(module = %self.module_name, "Root folder from command line");
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                debug!(module = %self.module_name, "Root folder from {}", ROOT_FOLDER_ENV);
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = self.toml_config.as_ref().and_then(|c| c.root_folder.clone()) {
            debug!(module = %self.module_name, "Root folder from TOML config");
            return path;
        }

        // Priority 4: OS-dependent compiled default
        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/folio
        dirs::data_local_dir()
            .map(|d| d.join("folio"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/folio"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("folio"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/folio"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("folio"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\folio"))
    } else {
        PathBuf::from("./folio_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_path_relative_and_absolute() {
        let root = PathBuf::from("/data/folio");

        let config = TomlConfig::default();
        assert_eq!(config.pool_path(&root), root.join(DEFAULT_POOL_FILE));

        let config = TomlConfig {
            pool_file: Some(PathBuf::from("pools/main.json")),
            ..Default::default()
        };
        assert_eq!(config.pool_path(&root), root.join("pools/main.json"));

        let config = TomlConfig {
            pool_file: Some(PathBuf::from("/srv/pool.json")),
            ..Default::default()
        };
        assert_eq!(config.pool_path(&root), PathBuf::from("/srv/pool.json"));
    }

    #[test]
    fn test_cli_arg_wins() {
        let config = TomlConfig {
            root_folder: Some(PathBuf::from("/from/toml")),
            ..Default::default()
        };
        let resolved = RootFolderResolver::new("test")
            .with_cli_arg(Some(PathBuf::from("/from/cli")))
            .with_toml_config(&config)
            .resolve();
        assert_eq!(resolved, PathBuf::from("/from/cli"));
    }

    #[test]
    fn test_logging_defaults_when_section_missing() {
        let config: TomlConfig = toml::from_str("root_folder = \"/tmp/x\"").unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.log_file.is_none());
    }
}
