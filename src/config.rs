//! Store configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding [`StoreConfig::path`]
pub const ENV_PATH: &str = "TEMPORAL_KV_PATH";
/// Environment variable overriding [`StoreConfig::read_only`]
pub const ENV_READ_ONLY: &str = "TEMPORAL_KV_READ_ONLY";
/// Environment variable overriding [`StoreConfig::sync_writes`]
pub const ENV_SYNC_WRITES: &str = "TEMPORAL_KV_SYNC_WRITES";

/// Configuration for opening a [`KvStore`](crate::storage::KvStore)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the engine's files
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Reject every write. The directory must already exist.
    #[serde(default)]
    pub read_only: bool,

    /// Flush the engine before each write returns.
    /// Turning this off acknowledges writes that a crash can still lose.
    #[serde(default = "default_true")]
    pub sync_writes: bool,

    /// Page cache size handed to the engine
    /// Default: 64 MiB
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity_bytes: u64,

    /// Background flush interval for deferred writes; `None` disables it
    #[serde(default)]
    pub flush_every_ms: Option<u64>,

    /// Throwaway database removed when the store is dropped
    #[serde(default)]
    pub temporary: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            read_only: false,
            sync_writes: true,
            cache_capacity_bytes: default_cache_capacity(),
            flush_every_ms: None,
            temporary: false,
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Load a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)?;
        serde_json::from_slice(&raw).map_err(|e| {
            Error::Configuration(format!("{}: {}", path.display(), e))
        })
    }

    /// Apply overrides from `TEMPORAL_KV_*` environment variables
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(path) = std::env::var(ENV_PATH) {
            self.path = PathBuf::from(path);
        }
        if let Ok(raw) = std::env::var(ENV_READ_ONLY) {
            self.read_only = parse_flag(ENV_READ_ONLY, &raw)?;
        }
        if let Ok(raw) = std::env::var(ENV_SYNC_WRITES) {
            self.sync_writes = parse_flag(ENV_SYNC_WRITES, &raw)?;
        }
        Ok(self)
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    pub fn with_cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity_bytes = bytes;
        self
    }

    pub fn with_flush_every_ms(mut self, every_ms: Option<u64>) -> Self {
        self.flush_every_ms = every_ms;
        self
    }

    pub fn with_temporary(mut self, temporary: bool) -> Self {
        self.temporary = temporary;
        self
    }

    /// Reject combinations the store cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() && !self.temporary {
            return Err(Error::Configuration("path must not be empty".to_string()));
        }
        if self.cache_capacity_bytes == 0 {
            return Err(Error::Configuration(
                "cache_capacity_bytes must be greater than zero".to_string(),
            ));
        }
        if self.read_only && self.temporary {
            return Err(Error::Configuration(
                "a temporary store cannot be read-only".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Configuration(format!(
            "{} must be a boolean, got {:?}",
            name, other
        ))),
    }
}

fn default_path() -> PathBuf {
    PathBuf::from("./data")
}

fn default_cache_capacity() -> u64 {
    64 * 1024 * 1024
}

fn default_true() -> bool {
    true
}
