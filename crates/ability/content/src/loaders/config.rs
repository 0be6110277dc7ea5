//! Simulation configuration loader.

use std::path::{Path, PathBuf};

use ability_core::{RuntimeConfig, TimeMs};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Optional overrides for the content files a simulation reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPaths {
    pub timelines: Option<PathBuf>,
    pub attributes: Option<PathBuf>,
}

/// Top-level simulation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed logic step.
    pub tick_ms: TimeMs,
    /// Simulated time after which the run stops.
    pub duration_ms: TimeMs,
    /// When set, logs are also written to this file.
    pub log_file: Option<PathBuf>,
    pub runtime: RuntimeConfig,
    pub content: ContentPaths,
}

impl SimConfig {
    pub const DEFAULT_TICK_MS: TimeMs = 100;
    pub const DEFAULT_DURATION_MS: TimeMs = 5_000;
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_ms: Self::DEFAULT_TICK_MS,
            duration_ms: Self::DEFAULT_DURATION_MS,
            log_file: None,
            runtime: RuntimeConfig::default(),
            content: ContentPaths::default(),
        }
    }
}

/// Loader for simulation configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> LoadResult<SimConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<SimConfig> {
        let config: SimConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;
        if config.tick_ms == 0 {
            anyhow::bail!("tick_ms must be positive");
        }
        Ok(config)
    }

    /// Configuration compiled into the crate.
    pub fn embedded() -> LoadResult<SimConfig> {
        Self::parse(include_str!("../../data/sim.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = ConfigLoader::parse("duration_ms = 800\n").unwrap();
        assert_eq!(config.tick_ms, SimConfig::DEFAULT_TICK_MS);
        assert_eq!(config.duration_ms, 800);
        assert_eq!(config.runtime, RuntimeConfig::default());
        assert!(config.content.timelines.is_none());
    }

    #[test]
    fn nested_tables_parse() {
        let config = ConfigLoader::parse(
            "tick_ms = 50\n\
             log_file = \"sim.log\"\n\
             [runtime]\n\
             missing_attribute_value = -1.0\n\
             [content]\n\
             timelines = \"data/timelines.ron\"\n",
        )
        .unwrap();
        assert_eq!(config.tick_ms, 50);
        assert_eq!(config.log_file, Some(PathBuf::from("sim.log")));
        assert_eq!(config.runtime.missing_attribute_value, -1.0);
        assert_eq!(
            config.content.timelines,
            Some(PathBuf::from("data/timelines.ron"))
        );
    }

    #[test]
    fn zero_tick_is_rejected() {
        assert!(ConfigLoader::parse("tick_ms = 0\n").is_err());
    }

    #[test]
    fn embedded_config_parses() {
        assert!(ConfigLoader::embedded().unwrap().tick_ms > 0);
    }
}
