//! Capture-file echoing for jobecho
//!
//! This crate tails the stdout/stderr captures of running jobs, filters the
//! lines and forwards them to a log sink.

mod buffer;
mod error;
mod filter;
mod parser;
mod reader;
mod router;
mod sink;

pub use buffer::LogBuffer;
pub use error::EchoError;
pub use filter::EchoFilter;
pub use parser::{DEFAULT_LEVEL, STRUCTURED_MARKER, StructuredLine};
pub use reader::{StreamCursor, split_lines};
pub use router::{EchoRouter, EchoSettings, JobEcho};
pub use sink::{ECHO_TARGET, JsonLinesSink, LevelGate, LogSink, TracingSink, register_echo_levels};

// Re-export types used in our public API
pub use jobecho_types::{Level, LevelGroup, LogRecord, Stream};
