//! Process environment overrides for the simulator.
use std::env;
use std::path::PathBuf;

use ability_content::{ConfigLoader, SimConfig};
use ability_core::TimeMs;
use anyhow::Result;

/// Settings read from the environment, layered over the TOML config.
#[derive(Clone, Debug, Default)]
pub struct SimEnv {
    pub config_path: Option<PathBuf>,
    pub tick_ms: Option<TimeMs>,
    pub duration_ms: Option<TimeMs>,
    pub log_file: Option<PathBuf>,
}

impl SimEnv {
    /// Construct overrides from process environment variables.
    ///
    /// Environment variables:
    /// - `SIM_CONFIG` - Path to a TOML config (default: embedded `sim.toml`)
    /// - `SIM_TICK_MS` - Fixed logic step in milliseconds
    /// - `SIM_DURATION_MS` - Simulated time before the run stops
    /// - `SIM_LOG_FILE` - Also write logs to this file
    pub fn from_env() -> Self {
        Self {
            config_path: env::var_os("SIM_CONFIG").map(PathBuf::from),
            tick_ms: read_env::<TimeMs>("SIM_TICK_MS"),
            duration_ms: read_env::<TimeMs>("SIM_DURATION_MS"),
            log_file: env::var_os("SIM_LOG_FILE").map(PathBuf::from),
        }
    }

    /// Loads the base config and applies the overrides on top.
    pub fn resolve(&self) -> Result<SimConfig> {
        let mut config = match &self.config_path {
            Some(path) => ConfigLoader::load(path)?,
            None => ConfigLoader::embedded()?,
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut SimConfig) {
        if let Some(tick_ms) = self.tick_ms {
            config.tick_ms = tick_ms.max(1);
        }
        if let Some(duration_ms) = self.duration_ms {
            config.duration_ms = duration_ms;
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = Some(log_file.clone());
        }
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_config_values() {
        let overrides = SimEnv {
            tick_ms: Some(0),
            duration_ms: Some(1200),
            log_file: Some(PathBuf::from("run.log")),
            ..SimEnv::default()
        };
        let config = overrides.resolve().unwrap();
        assert_eq!(config.tick_ms, 1);
        assert_eq!(config.duration_ms, 1200);
        assert_eq!(config.log_file, Some(PathBuf::from("run.log")));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let overrides = SimEnv {
            config_path: Some(PathBuf::from("/nonexistent/sim.toml")),
            ..SimEnv::default()
        };
        assert!(overrides.resolve().is_err());
    }
}
