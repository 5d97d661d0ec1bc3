use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use jobecho_types::{Level, LogRecord, Stream};

use crate::error::EchoError;
use crate::filter::EchoFilter;
use crate::parser::StructuredLine;
use crate::reader::StreamCursor;
use crate::sink::{LogSink, register_echo_levels};

/// Process-level echo settings, already validated
#[derive(Clone, Debug, Default)]
pub struct EchoSettings {
    /// Indices of the jobs whose output is echoed
    pub jobs: BTreeSet<usize>,

    /// Filter applied to stdout lines
    pub stdout: EchoFilter,

    /// Filter applied to plain stderr lines
    pub stderr: EchoFilter,
}

impl EchoSettings {
    pub fn new(
        jobs: impl IntoIterator<Item = usize>,
        stdout: EchoFilter,
        stderr: EchoFilter,
    ) -> Self {
        Self {
            jobs: jobs.into_iter().collect(),
            stdout,
            stderr,
        }
    }

    /// Check if a job takes part in echoing
    pub fn echoes(&self, index: usize) -> bool {
        self.jobs.contains(&index)
    }
}

/// Per-job echo state: one cursor per capture stream
#[derive(Debug)]
pub struct JobEcho {
    index: usize,
    dir: PathBuf,
    stdout: StreamCursor,
    stderr: StreamCursor,
}

impl JobEcho {
    /// Echo state for the job at `index`, whose captures live in `dir`
    pub fn new(index: usize, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            index,
            stdout: StreamCursor::new(dir.join(Stream::Stdout.file_name())),
            stderr: StreamCursor::new(dir.join(Stream::Stderr.file_name())),
            dir,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cursor of one capture stream
    pub fn cursor(&self, stream: Stream) -> &StreamCursor {
        match stream {
            Stream::Stdout => &self.stdout,
            Stream::Stderr => &self.stderr,
        }
    }

    /// Close both capture files and drop their residue
    pub fn close(&mut self) {
        self.stdout.close();
        self.stderr.close();
    }
}

/// Moves new capture lines of a job into a log sink
///
/// Called once per poll tick per job. Polls of the same job must not overlap.
#[derive(Debug)]
pub struct EchoRouter {
    settings: EchoSettings,
}

impl EchoRouter {
    /// Create a router and register the echo levels with the sink it will feed
    pub fn new(settings: EchoSettings, sink: &mut dyn LogSink) -> Self {
        register_echo_levels(sink);
        debug!(
            jobs = ?settings.jobs,
            stdout = ?settings.stdout,
            stderr = ?settings.stderr,
            "echo router configured"
        );
        Self { settings }
    }

    /// Echo whatever the job wrote since the previous poll.
    ///
    /// With `is_final`, unterminated tails are flushed as lines and both capture
    /// files are closed afterwards.
    ///
    /// A failing sink or capture file does not cut the poll short: every line
    /// read is still offered to the sink, the final poll still closes both
    /// files, and the first error is returned at the end.
    pub fn on_poll(
        &self,
        job: &mut JobEcho,
        is_final: bool,
        sink: &mut dyn LogSink,
    ) -> Result<(), EchoError> {
        if !self.settings.echoes(job.index) {
            return Ok(());
        }

        let mut failure = None;
        for cursor in [&mut job.stdout, &mut job.stderr] {
            if let Err(err) = cursor.open() {
                failure.get_or_insert(err);
            }
        }

        if !self.settings.stdout.is_disabled() {
            match job.stdout.flush(is_final) {
                Ok(lines) => {
                    for line in lines {
                        let line = strip_newline(&line);
                        if self.settings.stdout.admits(line) {
                            let record = LogRecord::new(job.index, Level::Stdout, line.to_string());
                            deliver(sink, record, &mut failure);
                        }
                    }
                }
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }

        // stderr is always read: structured lines get through even when plain
        // stderr echoing is disabled
        match job.stderr.flush(is_final) {
            Ok(lines) => {
                for line in lines {
                    if let Some(structured) = StructuredLine::parse(&line) {
                        deliver(sink, structured.into_record(job.index), &mut failure);
                        continue;
                    }
                    let line = strip_newline(&line);
                    if self.settings.stderr.admits(line) {
                        let record = LogRecord::new(job.index, Level::Stderr, line.to_string());
                        deliver(sink, record, &mut failure);
                    } else {
                        trace!(job = job.index, line, "stderr line filtered out");
                    }
                }
            }
            Err(err) => {
                failure.get_or_insert(err);
            }
        }

        if is_final {
            job.close();
        }
        failure.map_or(Ok(()), Err)
    }
}

/// Hand a record to the sink, keeping only the first failure
fn deliver(sink: &mut dyn LogSink, record: LogRecord, failure: &mut Option<EchoError>) {
    if let Err(err) = sink.log(record) {
        warn!(error = %err, "sink rejected echoed line");
        failure.get_or_insert(err);
    }
}

fn strip_newline(line: &str) -> &str {
    line.strip_suffix('\n').unwrap_or(line)
}
