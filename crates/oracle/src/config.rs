//! Configuration system for the oracle.
//!
//! This module defines the configuration structures used to assemble a session. It provides:
//! 1. **Defaults:** Baseline cache geometry and DRAM size of the reference machine.
//! 2. **Structures:** Hierarchical config for the session endpoints, memory, and cache hierarchy.
//! 3. **Loading:** JSON parsing from a string or a file.
//!
//! Every field is optional in JSON; `Config::default()` yields the reference machine with no
//! executable or socket configured. Those two must be supplied (from JSON or the CLI) before
//! a session can be opened.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::{OracleError, Result};

/// Default configuration constants for the oracle.
mod defaults {
    /// Size of simulated DRAM (512 MiB, lazily mapped).
    pub const RAM_SIZE: usize = 512 * 1024 * 1024;

    /// Cache line size in bytes shared by every level.
    pub const CACHE_LINE: usize = 64;

    /// L1 instruction cache size (16 KiB).
    pub const L1_I_SIZE: usize = 16 * 1024;

    /// L1 data cache size (64 KiB).
    pub const L1_D_SIZE: usize = 64 * 1024;

    /// Associativity of both L1 caches.
    pub const L1_WAYS: usize = 2;

    /// L2 cache size (256 KiB).
    pub const L2_SIZE: usize = 256 * 1024;

    /// L2 associativity.
    pub const L2_WAYS: usize = 8;
}

/// Root configuration structure.
///
/// # Example
///
/// ```
/// use rvsim_oracle::config::Config;
///
/// let json = r#"{
///     "general": {
///         "executable_path": "build/ARM/revizor/base",
///         "socket_name": "revizor-0"
///     },
///     "cache": {
///         "l1_d": { "size_bytes": 32768, "ways": 4 }
///     }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.general.socket_name.as_deref(), Some("revizor-0"));
/// assert_eq!(config.cache.l1_d.size_bytes, 32768);
/// assert_eq!(config.cache.l1_d.line_bytes, 64);
/// assert_eq!(config.cache.l2.ways, 8);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Session endpoints
    #[serde(default)]
    pub general: GeneralConfig,
    /// Simulated DRAM configuration
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Cache hierarchy configuration
    #[serde(default)]
    pub cache: CacheHierarchyConfig,
}

impl Config {
    /// Parses a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|source| OracleError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Returns the configured executable path.
    pub fn executable_path(&self) -> Result<&Path> {
        self.general
            .executable_path
            .as_deref()
            .ok_or(OracleError::MissingConfig("executable_path"))
    }

    /// Returns the configured abstract socket name.
    pub fn socket_name(&self) -> Result<&str> {
        self.general
            .socket_name
            .as_deref()
            .ok_or(OracleError::MissingConfig("socket_name"))
    }
}

/// Session endpoints: which image to inject into and where the fuzzer listens.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneralConfig {
    /// Path of the static guest executable defining `code`, `sandbox`, and `registers`.
    #[serde(default)]
    pub executable_path: Option<PathBuf>,

    /// Name of the abstract-namespace socket, without the leading NUL byte.
    #[serde(default)]
    pub socket_name: Option<String>,
}

/// Simulated DRAM configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// RAM size in bytes
    #[serde(default = "MemoryConfig::default_ram_size")]
    pub ram_size: usize,
}

impl MemoryConfig {
    /// Returns the default RAM size in bytes.
    const fn default_ram_size() -> usize {
        defaults::RAM_SIZE
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            ram_size: defaults::RAM_SIZE,
        }
    }
}

/// Cache hierarchy configuration (the three inspectable caches).
#[derive(Debug, Clone, Deserialize)]
pub struct CacheHierarchyConfig {
    /// L1 instruction cache
    #[serde(default = "CacheConfig::l1_i")]
    pub l1_i: CacheConfig,
    /// L1 data cache; its validity bitmap is the leakage signal
    #[serde(default = "CacheConfig::l1_d")]
    pub l1_d: CacheConfig,
    /// Unified L2 cache
    #[serde(default = "CacheConfig::l2")]
    pub l2: CacheConfig,
}

impl Default for CacheHierarchyConfig {
    fn default() -> Self {
        Self {
            l1_i: CacheConfig::l1_i(),
            l1_d: CacheConfig::l1_d(),
            l2: CacheConfig::l2(),
        }
    }
}

/// Individual cache level configuration.
///
/// Fields left out of a JSON object take the L1 data cache defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Total capacity in bytes
    pub size_bytes: usize,
    /// Line size in bytes
    pub line_bytes: usize,
    /// Associativity
    pub ways: usize,
}

impl CacheConfig {
    /// Default L1 instruction cache geometry.
    pub const fn l1_i() -> Self {
        Self {
            size_bytes: defaults::L1_I_SIZE,
            line_bytes: defaults::CACHE_LINE,
            ways: defaults::L1_WAYS,
        }
    }

    /// Default L1 data cache geometry.
    pub const fn l1_d() -> Self {
        Self {
            size_bytes: defaults::L1_D_SIZE,
            line_bytes: defaults::CACHE_LINE,
            ways: defaults::L1_WAYS,
        }
    }

    /// Default L2 cache geometry.
    pub const fn l2() -> Self {
        Self {
            size_bytes: defaults::L2_SIZE,
            line_bytes: defaults::CACHE_LINE,
            ways: defaults::L2_WAYS,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::l1_d()
    }
}
