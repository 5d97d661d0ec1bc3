use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use jobecho_logs::{EchoError, EchoRouter, JobEcho, LogSink, Stream};

/// Poll bookkeeping for one job directory
struct WatchedJob {
    echo: JobEcho,
    /// Both capture files have been seen
    started: bool,
    /// Final poll done
    finished: bool,
}

impl WatchedJob {
    fn captures_exist(&self) -> bool {
        Stream::ALL
            .iter()
            .all(|stream| self.echo.dir().join(stream.file_name()).is_file())
    }
}

/// Drives the echo router over a set of job directories on a fixed tick
pub struct JobPoller {
    router: EchoRouter,
    jobs: Vec<WatchedJob>,
    done_file: String,
}

impl JobPoller {
    /// Watch `dirs`; the job index of each directory is its position
    pub fn new(router: EchoRouter, dirs: Vec<PathBuf>, done_file: impl Into<String>) -> Self {
        let jobs = dirs
            .into_iter()
            .enumerate()
            .map(|(index, dir)| WatchedJob {
                echo: JobEcho::new(index, dir),
                started: false,
                finished: false,
            })
            .collect();

        Self {
            router,
            jobs,
            done_file: done_file.into(),
        }
    }

    /// Check if every job had its final poll
    pub fn is_finished(&self) -> bool {
        self.jobs.iter().all(|job| job.finished)
    }

    /// Poll every unfinished job once. With `shutdown`, each started job gets its
    /// final poll and jobs that never started are dropped.
    pub fn poll_once(&mut self, sink: &mut dyn LogSink, shutdown: bool) -> Result<(), EchoError> {
        for job in self.jobs.iter_mut().filter(|job| !job.finished) {
            if !job.started {
                // Capture files are only read once the job has created both
                if !job.captures_exist() {
                    job.finished = shutdown;
                    continue;
                }
                job.started = true;
                debug!(job = job.echo.index(), dir = %job.echo.dir().display(), "job started");
            }

            // Check completion before reading so everything written before the
            // done file appeared is part of the final flush
            let done = shutdown || job.echo.dir().join(&self.done_file).exists();
            self.router.on_poll(&mut job.echo, done, sink)?;

            if done {
                job.finished = true;
                info!(job = job.echo.index(), "job finished");
            }
        }
        Ok(())
    }

    /// Poll until every job is finished or `cancel` fires
    pub async fn run(
        mut self,
        sink: &mut dyn LogSink,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Result<(), EchoError> {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("shutdown requested, flushing jobs");
                    self.poll_once(sink, true)?;
                    break;
                }

                _ = ticker.tick() => {
                    self.poll_once(sink, false)?;
                    if self.is_finished() {
                        break;
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobecho_logs::{EchoFilter, EchoSettings, LogBuffer};
    use std::fs::{self, OpenOptions};
    use std::io::Write;
    use std::path::Path;

    fn poller(dirs: &[&Path], sink: &mut LogBuffer) -> JobPoller {
        let settings = EchoSettings::new(
            0..dirs.len(),
            EchoFilter::Unfiltered,
            EchoFilter::Unfiltered,
        );
        let router = EchoRouter::new(settings, sink);
        JobPoller::new(router, dirs.iter().map(|d| d.to_path_buf()).collect(), "job.rc")
    }

    fn start_job(dir: &Path, stdout: &str, stderr: &str) {
        fs::write(dir.join("job.stdout"), stdout).unwrap();
        fs::write(dir.join("job.stderr"), stderr).unwrap();
    }

    fn append(path: &Path, data: &str) {
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(data.as_bytes()).unwrap();
    }

    #[test]
    fn test_waits_for_capture_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = LogBuffer::new(100);
        let mut poller = poller(&[dir.path()], &mut sink);

        poller.poll_once(&mut sink, false).unwrap();
        assert!(sink.is_empty());
        assert!(!poller.is_finished());

        start_job(dir.path(), "hello\n", "");
        poller.poll_once(&mut sink, false).unwrap();
        assert_eq!(sink.messages_at("STDOUT"), vec!["hello"]);
    }

    #[test]
    fn test_done_file_triggers_final_poll() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = LogBuffer::new(100);
        let mut poller = poller(&[dir.path()], &mut sink);

        start_job(dir.path(), "partial", "");
        poller.poll_once(&mut sink, false).unwrap();
        assert!(sink.is_empty());

        append(&dir.path().join("job.stdout"), " line");
        fs::write(dir.path().join("job.rc"), "0").unwrap();
        poller.poll_once(&mut sink, false).unwrap();

        assert_eq!(sink.messages_at("STDOUT"), vec!["partial line"]);
        assert!(poller.is_finished());

        // finished jobs are not polled again
        append(&dir.path().join("job.stdout"), "late\n");
        poller.poll_once(&mut sink, false).unwrap();
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_shutdown_drops_unstarted_jobs() {
        let started = tempfile::tempdir().unwrap();
        let pending = tempfile::tempdir().unwrap();
        let mut sink = LogBuffer::new(100);
        let mut poller = poller(&[started.path(), pending.path()], &mut sink);

        start_job(started.path(), "", "tail");
        poller.poll_once(&mut sink, true).unwrap();

        assert!(poller.is_finished());
        assert_eq!(sink.messages_at("STDERR"), vec!["tail"]);
        assert_eq!(sink.all()[0].job, 0);
    }

    #[tokio::test]
    async fn test_run_until_done() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = LogBuffer::new(100);
        let poller = poller(&[dir.path()], &mut sink);

        start_job(dir.path(), "out\n", "pyppl.logger.warn: low disk\n");
        fs::write(dir.path().join("job.rc"), "0").unwrap();

        poller
            .run(&mut sink, Duration::from_millis(10), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(sink.messages_at("STDOUT"), vec!["out"]);
        assert_eq!(sink.messages_at("_WARN"), vec!["low disk"]);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = LogBuffer::new(100);
        let poller = poller(&[dir.path()], &mut sink);
        start_job(dir.path(), "unterminated", "");

        let cancel = CancellationToken::new();
        cancel.cancel();
        poller
            .run(&mut sink, Duration::from_millis(10), cancel)
            .await
            .unwrap();

        assert_eq!(sink.messages_at("STDOUT"), vec!["unterminated"]);
    }
}
