use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid echo configuration, reported before any job is polled
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid job index '{0}'")]
    InvalidIndex(String),

    #[error("job range '{0}' runs backwards")]
    ReversedRange(String),

    #[error("unknown stream '{0}', expected stdout, stderr or all")]
    UnknownStream(String),

    #[error("invalid {stream} filter: {source}")]
    Filter {
        stream: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}
