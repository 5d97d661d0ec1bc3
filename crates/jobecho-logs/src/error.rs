use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while echoing a job's capture files
#[derive(Debug, Error)]
pub enum EchoError {
    /// Capture file could not be opened; the job directory is expected to exist
    /// with both capture files before the first poll
    #[error("cannot open capture file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read capture file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("log sink failed: {0}")]
    Sink(#[from] io::Error),
}
