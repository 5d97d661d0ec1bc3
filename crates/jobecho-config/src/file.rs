use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use jobecho_logs::{EchoSettings, LevelGate};
use jobecho_types::{LevelGroup, Stream};

use crate::convert::{JobsValue, TypesValue};
use crate::error::ConfigError;

/// Top-level configuration file
///
/// ```toml
/// [echo]
/// jobs = "0,2-4"
/// types = { stdout = "", stderr = "^[^&]" }
/// levels = ["critical", "info"]
/// interval_ms = 500
/// done_file = "job.rc"
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub echo: EchoConfig,
}

impl ConfigFile {
    /// Load and parse a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// The `[echo]` table
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EchoConfig {
    /// Jobs whose output is echoed; none by default
    pub jobs: JobsValue,

    /// Streams to echo and their filters; both unfiltered by default
    pub types: TypesValue,

    /// Severity tiers the output sink lets through
    pub levels: Vec<LevelGroup>,

    /// Poll interval in milliseconds
    pub interval_ms: u64,

    /// File whose appearance in a job directory marks the job as finished
    pub done_file: String,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            jobs: JobsValue::default(),
            types: TypesValue::default(),
            levels: vec![LevelGroup::Critical, LevelGroup::Info],
            interval_ms: 1000,
            done_file: "job.rc".to_string(),
        }
    }
}

impl EchoConfig {
    /// Validate and compile into router settings
    pub fn settings(&self) -> Result<EchoSettings, ConfigError> {
        let jobs = self.jobs.indices()?;
        let types = self.types.echo_types()?;
        Ok(EchoSettings::new(
            jobs,
            types.filter(Stream::Stdout)?,
            types.filter(Stream::Stderr)?,
        ))
    }

    /// Level gate for output sinks
    pub fn level_gate(&self) -> LevelGate {
        LevelGate::new(self.levels.iter().copied())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
