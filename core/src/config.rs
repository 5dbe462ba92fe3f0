//! Configuration for the core crate
//!
//! This module provides configuration options for the engine, including
//! the schema compilation limits and chain constants.

use serde::{Deserialize, Serialize};

/// Limits enforced by the schema compiler
///
/// Defaults match the platform consensus rules; tests may relax them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaLimits {
    /// Minimum subschema name length
    pub min_name_len: usize,

    /// Maximum subschema name length
    pub max_name_len: usize,

    /// Minimum schema title length
    pub min_title_len: usize,

    /// Maximum schema title length
    pub max_title_len: usize,

    /// Maximum number of subschemas in one DAP schema
    pub max_subschemas: usize,
}

impl Default for SchemaLimits {
    fn default() -> Self {
        SchemaLimits {
            min_name_len: 3,
            max_name_len: 24,
            min_title_len: 3,
            max_title_len: 24,
            max_subschemas: 1000,
        }
    }
}

/// Chain constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Credits granted to a newly derived identity
    pub initial_credits: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig {
            initial_credits: 100_000,
        }
    }
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Schema compilation limits
    pub schema: SchemaLimits,

    /// Chain constants
    pub chain: ChainConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to enable debug mode
    #[serde(default)]
    pub debug_mode: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        CoreConfig {
            schema: SchemaLimits::default(),
            chain: ChainConfig::default(),
            log_level: default_log_level(),
            debug_mode: false,
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &str) -> Result<Self, crate::error::CoreError> {
        let file = std::fs::File::open(path)?;

        let config = serde_json::from_reader(file)?;

        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file(&self, path: &str) -> Result<(), crate::error::CoreError> {
        let file = std::fs::File::create(path)?;

        serde_json::to_writer_pretty(file, self)?;

        Ok(())
    }

    /// Create a development configuration
    pub fn development() -> Self {
        let mut config = Self::new();
        config.debug_mode = true;
        config.log_level = "debug".to_string();
        config
    }

    /// Create a testing configuration
    pub fn testing() -> Self {
        let mut config = Self::development();
        config.chain.initial_credits = 1_000;
        config
    }
}
