use jobecho_types::{Level, LogRecord};

/// Prefix that marks a stderr line as a leveled log message
pub const STRUCTURED_MARKER: &str = "pyppl.logger";

/// Level used when a structured line carries no level token
pub const DEFAULT_LEVEL: &str = "log";

/// Leveled message embedded in the stderr stream
///
/// Wire format: `<marker>.<level>: <message>`. The level part and the colon are
/// both optional; `<marker>` alone yields level `log` with an empty message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructuredLine {
    pub level: String,
    pub message: String,
}

impl StructuredLine {
    /// Parse a raw stderr line, returning `None` when it lacks the marker
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix(STRUCTURED_MARKER)?;
        let rest = rest.strip_suffix('\n').unwrap_or(rest).trim_start();

        let (token, message) = rest.split_once(':').unwrap_or((rest, ""));

        // Drop the sigil separating the level from the marker
        let mut chars = token.trim_end().chars();
        chars.next();
        let level = match chars.as_str() {
            "" => DEFAULT_LEVEL,
            level => level,
        };

        Some(Self {
            level: level.to_string(),
            message: message.trim_start().to_string(),
        })
    }

    /// Turn the line into a record that bypasses level suppression
    pub fn into_record(self, job: usize) -> LogRecord {
        LogRecord::new(job, Level::Unfiltered(self.level), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> (String, String) {
        let parsed = StructuredLine::parse(line).unwrap();
        (parsed.level, parsed.message)
    }

    #[test]
    fn test_level_and_message() {
        assert_eq!(
            parse("pyppl.logger.warn: disk almost full\n"),
            ("warn".to_string(), "disk almost full".to_string())
        );
        assert_eq!(
            parse("pyppl.logger.msg: hello world!"),
            ("msg".to_string(), "hello world!".to_string())
        );
    }

    #[test]
    fn test_marker_alone() {
        assert_eq!(parse("pyppl.logger\n"), ("log".to_string(), String::new()));
        assert_eq!(parse("pyppl.logger"), ("log".to_string(), String::new()));
    }

    #[test]
    fn test_level_without_colon() {
        assert_eq!(parse("pyppl.logger.abc\n"), ("abc".to_string(), String::new()));
    }

    #[test]
    fn test_empty_level_defaults_to_log() {
        assert_eq!(
            parse("pyppl.logger: plain message"),
            ("log".to_string(), "plain message".to_string())
        );
        assert_eq!(parse("pyppl.logger.: x"), ("log".to_string(), "x".to_string()));
    }

    #[test]
    fn test_message_keeps_later_colons() {
        assert_eq!(
            parse("pyppl.logger.info: key: value"),
            ("info".to_string(), "key: value".to_string())
        );
    }

    #[test]
    fn test_unmarked_line() {
        assert!(StructuredLine::parse("err: line1\n").is_none());
        assert!(StructuredLine::parse(" pyppl.logger.warn: indented").is_none());
    }

    #[test]
    fn test_record_is_unfiltered() {
        let record = StructuredLine::parse("pyppl.logger.warn: x").unwrap().into_record(3);
        assert_eq!(record.job, 3);
        assert_eq!(record.level, Level::Unfiltered("warn".to_string()));
        assert_eq!(record.level.name(), "_WARN");
    }
}
