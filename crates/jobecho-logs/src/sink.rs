use std::collections::HashSet;
use std::io::Write;

use jobecho_types::{Level, LevelGroup, LevelRegistry, LogRecord};

use crate::error::EchoError;

/// Tracing target echoed lines are emitted under
pub const ECHO_TARGET: &str = "jobecho::echo";

/// Receiver of echoed lines
pub trait LogSink {
    /// Make a level name known to the sink under a severity tier
    fn register_level(&mut self, name: &str, group: LevelGroup);

    /// Hand one record to the sink
    fn log(&mut self, record: LogRecord) -> Result<(), EchoError>;
}

/// Register the `STDOUT`/`STDERR` levels under the informational tier
pub fn register_echo_levels(sink: &mut dyn LogSink) {
    sink.register_level(&Level::Stdout.name(), LevelGroup::Info);
    sink.register_level(&Level::Stderr.name(), LevelGroup::Info);
}

/// Level-based suppression shared by the output sinks
#[derive(Clone, Debug)]
pub struct LevelGate {
    registry: LevelRegistry,
    enabled: HashSet<LevelGroup>,
}

impl LevelGate {
    /// Gate letting through the given tiers
    pub fn new(enabled: impl IntoIterator<Item = LevelGroup>) -> Self {
        Self {
            registry: LevelRegistry::new(),
            enabled: enabled.into_iter().collect(),
        }
    }

    pub fn register(&mut self, name: &str, group: LevelGroup) {
        self.registry.register(name, group);
    }

    /// Unfiltered levels always pass; other levels pass when registered under an
    /// enabled tier
    pub fn admits(&self, level: &Level) -> bool {
        level.is_unfiltered()
            || self
                .registry
                .group_of(&level.name())
                .is_some_and(|group| self.enabled.contains(&group))
    }
}

impl Default for LevelGate {
    fn default() -> Self {
        Self::new([LevelGroup::Critical, LevelGroup::Info])
    }
}

/// Sink that re-emits records as `tracing` events
#[derive(Clone, Debug, Default)]
pub struct TracingSink {
    gate: LevelGate,
}

impl TracingSink {
    pub fn new(gate: LevelGate) -> Self {
        Self { gate }
    }
}

impl LogSink for TracingSink {
    fn register_level(&mut self, name: &str, group: LevelGroup) {
        self.gate.register(name, group);
    }

    fn log(&mut self, record: LogRecord) -> Result<(), EchoError> {
        if !self.gate.admits(&record.level) {
            return Ok(());
        }

        // Echoed lines are never emitted below INFO, so a debug token from the
        // job still reaches a subscriber filtering at the default level
        let severity = record.level.name();
        let (job, plugin, message) = (record.job, record.plugin, record.message.as_str());
        match record.level.token().as_str() {
            "error" | "critical" => {
                tracing::error!(target: ECHO_TARGET, job, %severity, plugin, "{message}")
            }
            "warn" | "warning" => {
                tracing::warn!(target: ECHO_TARGET, job, %severity, plugin, "{message}")
            }
            _ => tracing::info!(target: ECHO_TARGET, job, %severity, plugin, "{message}"),
        }
        Ok(())
    }
}

/// Sink writing one JSON object per record
pub struct JsonLinesSink<W: Write> {
    writer: W,
    gate: LevelGate,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W, gate: LevelGate) -> Self {
        Self { writer, gate }
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> LogSink for JsonLinesSink<W> {
    fn register_level(&mut self, name: &str, group: LevelGroup) {
        self.gate.register(name, group);
    }

    fn log(&mut self, record: LogRecord) -> Result<(), EchoError> {
        if !self.gate.admits(&record.level) {
            return Ok(());
        }
        serde_json::to_writer(&mut self.writer, &record).map_err(std::io::Error::from)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt::MakeWriter;

    /// Writer collecting formatted tracing output in memory
    #[derive(Clone, Default)]
    struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

    impl CapturedOutput {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl Write for CapturedOutput {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedOutput {
        type Writer = CapturedOutput;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn record(level: Level, message: &str) -> LogRecord {
        LogRecord::new(0, level, message.to_string())
    }

    #[test]
    fn test_gate_requires_registration() {
        let mut gate = LevelGate::default();
        assert!(!gate.admits(&Level::Stdout));

        gate.register("STDOUT", LevelGroup::Info);
        assert!(gate.admits(&Level::Stdout));
    }

    #[test]
    fn test_gate_unfiltered_bypasses_tiers() {
        let gate = LevelGate::new(Vec::new());
        assert!(gate.admits(&Level::Unfiltered("msg".to_string())));
        assert!(!gate.admits(&Level::Stderr));
    }

    #[test]
    fn test_gate_disabled_tier() {
        let mut gate = LevelGate::new([LevelGroup::Critical]);
        gate.register("STDERR", LevelGroup::Info);
        assert!(!gate.admits(&Level::Stderr));
    }

    #[test]
    fn test_json_lines_sink() {
        let mut sink = JsonLinesSink::new(Vec::new(), LevelGate::default());
        register_echo_levels(&mut sink);

        sink.log(record(Level::Stdout, "out: line1")).unwrap();
        sink.log(record(Level::Unfiltered("warn".to_string()), "careful")).unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["level"], "STDOUT");
        assert_eq!(lines[0]["message"], "out: line1");
        assert_eq!(lines[0]["plugin"], "echo");
        assert_eq!(lines[1]["level"], "_WARN");
    }

    #[test]
    fn test_json_lines_sink_suppresses_unregistered() {
        let mut sink = JsonLinesSink::new(Vec::new(), LevelGate::default());
        sink.log(record(Level::Stderr, "dropped")).unwrap();
        assert!(sink.into_inner().is_empty());
    }

    #[test]
    fn test_tracing_sink_accepts_all_levels() {
        let mut sink = TracingSink::default();
        register_echo_levels(&mut sink);
        for level in [
            Level::Stdout,
            Level::Stderr,
            Level::Unfiltered("error".to_string()),
            Level::Unfiltered("warning".to_string()),
            Level::Unfiltered("debug".to_string()),
            Level::Unfiltered("log".to_string()),
        ] {
            assert!(sink.log(record(level, "line")).is_ok());
        }
    }

    #[test]
    fn test_tracing_sink_unfiltered_levels_pass_info_filter() {
        let output = CapturedOutput::default();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::default().add_directive(tracing::Level::INFO.into()))
            .with_writer(output.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut sink = TracingSink::default();
            register_echo_levels(&mut sink);
            sink.log(record(Level::Unfiltered("debug".to_string()), "debug from job"))
                .unwrap();
            sink.log(record(Level::Unfiltered("warn".to_string()), "warning from job"))
                .unwrap();
            sink.log(record(Level::Stdout, "plain output")).unwrap();
        });

        let text = output.contents();
        assert!(text.contains("debug from job"));
        assert!(text.contains("severity=_DEBUG"));
        assert!(text.contains("warning from job"));
        assert!(text.contains("plain output"));
    }
}
