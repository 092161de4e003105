//! # fsbridge-config
//!
//! Configuration for the fsbridge tools.
//!
//! Loads configuration from:
//! 1. `~/.fsbridge/config.toml` (global)
//! 2. `.fsbridge/config.toml` (project-local, overrides global)
//! 3. Environment variables (highest priority)

pub mod logging;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub use logging::LogLevel;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub behavior: BehaviorConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config from standard locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(
            Self::global_config_path().as_deref(),
            Path::new(".fsbridge/config.toml"),
        )
    }

    /// Load from explicit global/project paths, then apply env overrides.
    /// Missing files are skipped. Every key present in the project file
    /// overrides the global one, even when it spells out the default.
    pub fn load_from(global: Option<&Path>, project: &Path) -> Result<Self, ConfigError> {
        let mut merged = toml::Table::new();

        if let Some(global_path) = global {
            if global_path.exists() {
                debug!("Loading global config from {:?}", global_path);
                merged = read_table(global_path)?;
            }
        }

        if project.exists() {
            debug!("Loading project config from {:?}", project);
            merge_tables(&mut merged, read_table(project)?);
        }

        let mut config: Config = toml::Value::Table(merged).try_into()?;
        config.apply_env_overrides();

        Ok(config)
    }

    /// Global config path: ~/.fsbridge/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".fsbridge/config.toml"))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(size) = std::env::var("FSBRIDGE_MAX_FILE_SIZE_MB") {
            if let Ok(n) = size.parse() {
                self.behavior.max_file_size_mb = n;
            }
        }
        if let Ok(tests) = std::env::var("FSBRIDGE_QUICKCHECK_TESTS") {
            if let Ok(n) = tests.parse() {
                self.behavior.quickcheck_tests = n;
            }
        }
        if let Ok(root) = std::env::var("FSBRIDGE_TEST_ROOT") {
            self.behavior.test_root = Some(PathBuf::from(root));
        }
        if let Ok(level) = std::env::var("FSBRIDGE_LOG_LEVEL") {
            if let Ok(level) = level.parse() {
                self.logging.level = level;
            }
        }
    }

    /// Generate default config TOML string
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Config::default()).unwrap_or_default()
    }
}

/// Differential behaviour test settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Largest file a generated command sequence may produce, in MiB
    pub max_file_size_mb: usize,
    /// Number of random command sequences per `compare` run
    pub quickcheck_tests: u64,
    /// Directory for scratch files (None = system temp dir)
    pub test_root: Option<PathBuf>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 16,
            quickcheck_tests: 100,
            test_root: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents.parse::<toml::Table>()?)
}

/// Overlay `top` onto `base`: nested tables merge key by key, any other
/// value present in `top` replaces the one in `base`.
fn merge_tables(base: &mut toml::Table, top: toml::Table) {
    for (key, value) in top {
        let overlay = match value {
            toml::Value::Table(overlay) => overlay,
            value => {
                base.insert(key, value);
                continue;
            }
        };
        if let Some(toml::Value::Table(inner)) = base.get_mut(&key) {
            merge_tables(inner, overlay);
            continue;
        }
        base.insert(key, toml::Value::Table(overlay));
    }
}
