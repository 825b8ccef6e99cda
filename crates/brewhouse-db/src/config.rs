//! # Store Configuration
//!
//! Selects and configures the engine behind `dyn Store`.
//!
//! ## Configuration Sources (Priority Order)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment variables (highest priority)                           │
//! │     BREWHOUSE_BACKEND=sqlite                                           │
//! │     BREWHOUSE_SQLITE_PATH=/var/lib/brewhouse/store.db                  │
//! │     BREWHOUSE_SQLITE_MAX_CONNECTIONS=8                                 │
//! │                                                                         │
//! │  2. Config file (store.toml)                                           │
//! │     backend = "sqlite"                                                 │
//! │     [sqlite]                                                            │
//! │     path = "./brewhouse.db"                                            │
//! │                                                                         │
//! │  3. Default values (lowest priority)                                   │
//! │     backend = memory                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use brewhouse_core::StoreResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::memory::MemoryStore;
use crate::pool::{Database, DbConfig};
use crate::sql_store::SqlStore;
use crate::store::Store;

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Backend
// =============================================================================

/// Which engine serves the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Process-local, single lock. Nothing survives a restart.
    #[default]
    Memory,
    /// SQLite file through a connection pool.
    Sqlite,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Memory => write!(f, "memory"),
            Backend::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" => Ok(Backend::Memory),
            "sqlite" | "sql" => Ok(Backend::Sqlite),
            other => Err(ConfigError::Invalid(format!(
                "Unknown backend: '{}'. Valid options: memory, sqlite",
                other
            ))),
        }
    }
}

// =============================================================================
// SQLite Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteSettings {
    /// Database file. `:memory:` gives a private in-memory database.
    #[serde(default = "default_sqlite_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("brewhouse.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for SqliteSettings {
    fn default() -> Self {
        SqliteSettings {
            path: default_sqlite_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl SqliteSettings {
    /// Pool configuration for these settings.
    pub fn db_config(&self) -> DbConfig {
        let base = if self.path.as_os_str() == ":memory:" {
            DbConfig::in_memory()
        } else {
            DbConfig::new(self.path.clone())
                .max_connections(self.max_connections)
                .min_connections(self.min_connections)
        };
        base.connect_timeout(Duration::from_secs(self.connect_timeout_secs))
    }
}

// =============================================================================
// Store Configuration
// =============================================================================

/// Top-level store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: Backend,

    #[serde(default)]
    pub sqlite: SqliteSettings,
}

impl StoreConfig {
    /// Loads configuration: defaults, then the TOML file (explicit path or
    /// the platform config dir), then `BREWHOUSE_*` overrides, then
    /// validation.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading store config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.backend == Backend::Sqlite {
            if self.sqlite.path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("sqlite.path must not be empty".into()));
            }
            if self.sqlite.max_connections == 0 {
                return Err(ConfigError::Invalid(
                    "sqlite.max_connections must be greater than 0".into(),
                ));
            }
            if self.sqlite.min_connections > self.sqlite.max_connections {
                return Err(ConfigError::Invalid(
                    "sqlite.min_connections must not exceed max_connections".into(),
                ));
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(backend) = std::env::var("BREWHOUSE_BACKEND") {
            match backend.parse() {
                Ok(parsed) => {
                    debug!(backend = %backend, "Overriding backend from environment");
                    self.backend = parsed;
                }
                Err(_) => warn!(backend = %backend, "Unknown backend in environment"),
            }
        }

        if let Ok(path) = std::env::var("BREWHOUSE_SQLITE_PATH") {
            debug!(path = %path, "Overriding sqlite path from environment");
            self.sqlite.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("BREWHOUSE_SQLITE_MAX_CONNECTIONS") {
            if let Ok(max) = max.parse::<u32>() {
                self.sqlite.max_connections = max;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "brewhouse", "store")
            .map(|dirs| dirs.config_dir().join("store.toml"))
    }
}

// =============================================================================
// Construction
// =============================================================================

/// Opens the configured engine.
///
/// ## Example
/// ```rust,ignore
/// let config = StoreConfig::load(None)?;
/// let store = open_store(&config).await?;
/// let checkout = Checkout::new(store.clone());
/// ```
pub async fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn Store>> {
    info!(backend = %config.backend, "Opening store");

    match config.backend {
        Backend::Memory => Ok(Arc::new(MemoryStore::new())),
        Backend::Sqlite => {
            let db = Database::new(config.sqlite.db_config()).await?;
            Ok(Arc::new(SqlStore::new(db)))
        }
    }
}
