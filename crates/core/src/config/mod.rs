//! Engine configuration
//!
//! The engine reads an optional TOML file that selects the cache strategy,
//! the default binding flags and the log level:
//!
//! ```toml
//! version = 1
//! debug = false
//! log_level = "info"
//! default_flags = ["INSTANCE_ANY_VISIBILITY"]
//! lock_timeout_ms = 5000
//!
//! [cache]
//! strategy = "temporary"
//! soft_limit = 4096
//! ```
//!
//! # Example
//!
//! ```ignore
//! use rapidflect_core::{engine_config_path, EngineConfig, Reflector};
//!
//! let config = EngineConfig::load(&engine_config_path())?;
//! let reflector = Reflector::with_config(&config)?;
//! ```

mod loader;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheStrategy;
use crate::flags::Flags;

pub use loader::{config_dir, engine_config_path, CONFIG_DIR_ENV, ENGINE_CONFIG_FILE};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A `default_flags` entry names no binding flag
    #[error("Unknown binding flag: {0}")]
    InvalidFlag(String),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Accessor cache settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub strategy: CacheStrategy,

    /// Entry count past which a temporary cache reclaims unheld accessors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_limit: Option<usize>,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Enable debug logging
    pub debug: bool,

    /// Filter directive used when `RUST_LOG` is unset
    pub log_level: String,

    /// Flag constant names combined into the flags of method, constructor
    /// and mapping requests that do not pass their own
    pub default_flags: Vec<String>,

    /// Longest wait, in milliseconds, for an object locked by another thread
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_timeout_ms: Option<u64>,

    pub cache: CacheConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: 1,
            debug: false,
            log_level: "info".to_string(),
            default_flags: vec!["INSTANCE_ANY_VISIBILITY".to_string()],
            lock_timeout_ms: None,
            cache: CacheConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load config from `path`, creating a default file if missing.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config = Self::from_toml_str(&content)?;
            tracing::debug!("Loaded engine config from {:?}", path);
            Ok(config)
        } else {
            let default = Self::default();
            default.save(path)?;
            tracing::info!("Created default engine config at {:?}", path);
            Ok(default)
        }
    }

    /// Save config to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved engine config to {:?}", path);
        Ok(())
    }

    /// Reload config from `path`.
    pub fn reload(&mut self, path: &Path) -> ConfigResult<()> {
        let content = std::fs::read_to_string(path)?;
        *self = Self::from_toml_str(&content)?;
        tracing::debug!("Reloaded engine config from {:?}", path);
        Ok(())
    }

    /// Parses and validates TOML content.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.flags()?;
        Ok(config)
    }

    /// `default_flags` combined; an empty list selects [`Flags::DEFAULT`].
    pub fn flags(&self) -> ConfigResult<Flags> {
        if self.default_flags.is_empty() {
            return Ok(Flags::DEFAULT);
        }
        self.default_flags.iter().try_fold(Flags::empty(), |acc, name| {
            Flags::parse_name(name)
                .map(|flag| acc | flag)
                .ok_or_else(|| ConfigError::InvalidFlag(name.clone()))
        })
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }

    /// Filter directive for the log subscriber; `debug` forces `debug`.
    pub fn log_filter(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_level
        }
    }
}
