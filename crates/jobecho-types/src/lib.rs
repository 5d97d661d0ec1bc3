//! Shared types for jobecho
//!
//! This crate contains data structures used across multiple jobecho crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Source tag attached to every record produced by the echo router
pub const ECHO_PLUGIN: &str = "echo";

// ============================================================================
// Job Stream Types
// ============================================================================

/// One of the two capture streams of a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    /// Both streams, stdout first
    pub const ALL: [Stream; 2] = [Stream::Stdout, Stream::Stderr];

    /// Parse a stream name as used in configuration
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "stdout" => Some(Self::Stdout),
            "stderr" => Some(Self::Stderr),
            _ => None,
        }
    }

    /// Configuration name of the stream
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }

    /// Name of the capture file inside a job directory
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Stdout => "job.stdout",
            Self::Stderr => "job.stderr",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Log Level Types
// ============================================================================

/// Severity tier a level name belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelGroup {
    Critical,
    Info,
    Debug,
}

/// Level an echoed line is logged at
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum Level {
    /// Plain line from the stdout capture
    Stdout,
    /// Plain line from the stderr capture
    Stderr,
    /// Level token parsed from a structured stderr line.
    /// Never suppressed by level-based filtering.
    Unfiltered(String),
}

impl Level {
    /// Level name as seen by the sink, e.g. `STDOUT` or `_WARN`
    pub fn name(&self) -> String {
        match self {
            Self::Stdout => "STDOUT".to_string(),
            Self::Stderr => "STDERR".to_string(),
            Self::Unfiltered(token) => format!("_{}", token.to_uppercase()),
        }
    }

    /// Whether the level bypasses severity-based suppression
    pub fn is_unfiltered(&self) -> bool {
        matches!(self, Self::Unfiltered(_))
    }

    /// Level token with any unfiltered marker removed, lowercased
    pub fn token(&self) -> String {
        match self {
            Self::Stdout => "stdout".to_string(),
            Self::Stderr => "stderr".to_string(),
            Self::Unfiltered(token) => token.to_lowercase(),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        level.name()
    }
}

/// Mapping of level names to the tier they are reported under
#[derive(Clone, Debug)]
pub struct LevelRegistry {
    groups: HashMap<String, LevelGroup>,
}

impl LevelRegistry {
    /// Registry holding the standard level names
    pub fn new() -> Self {
        let mut registry = Self {
            groups: HashMap::new(),
        };
        for name in ["CRITICAL", "ERROR", "WARNING"] {
            registry.register(name, LevelGroup::Critical);
        }
        registry.register("INFO", LevelGroup::Info);
        registry.register("DEBUG", LevelGroup::Debug);
        registry
    }

    /// Register (or move) a level name under a tier
    pub fn register(&mut self, name: &str, group: LevelGroup) {
        self.groups.insert(name.to_uppercase(), group);
    }

    /// Tier of a level name, if known
    pub fn group_of(&self, name: &str) -> Option<LevelGroup> {
        self.groups.get(&name.to_uppercase()).copied()
    }

    /// Level names registered under a tier, sorted
    pub fn members(&self, group: LevelGroup) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .groups
            .iter()
            .filter(|(_, g)| **g == group)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

impl Default for LevelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Log Record Types
// ============================================================================

/// A single line handed to a log sink
#[derive(Clone, Debug, Serialize)]
pub struct LogRecord {
    /// Index of the job the line came from
    pub job: usize,

    /// Level the line is logged at
    pub level: Level,

    /// Line content, without the line terminator
    pub message: String,

    /// Source tag
    pub plugin: &'static str,

    /// When the line was picked up
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    /// Create a record stamped with the current time
    pub fn new(job: usize, level: Level, message: String) -> Self {
        Self {
            job,
            level,
            message,
            plugin: ECHO_PLUGIN,
            timestamp: Utc::now(),
        }
    }
}
