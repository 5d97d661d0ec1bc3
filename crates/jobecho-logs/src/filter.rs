use regex::Regex;

/// Line filter for one capture stream
#[derive(Clone, Default)]
pub enum EchoFilter {
    /// Every line is echoed
    #[default]
    Unfiltered,

    /// Lines are echoed when the pattern matches anywhere in them
    Pattern(Regex),

    /// The stream is never echoed
    Disabled,
}

impl EchoFilter {
    /// Build a filter from an optional pattern; a missing or empty pattern lets
    /// everything through
    pub fn from_pattern(pattern: Option<&str>) -> Result<Self, regex::Error> {
        match pattern {
            None | Some("") => Ok(Self::Unfiltered),
            Some(pattern) => Ok(Self::Pattern(Regex::new(pattern)?)),
        }
    }

    /// Check whether the stream is switched off entirely
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    /// Check if a line (without its terminator) should be echoed
    pub fn admits(&self, line: &str) -> bool {
        match self {
            Self::Unfiltered => true,
            Self::Pattern(re) => re.is_match(line),
            Self::Disabled => false,
        }
    }

    /// Get the original pattern
    pub fn pattern(&self) -> Option<&str> {
        match self {
            Self::Pattern(re) => Some(re.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for EchoFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unfiltered => f.write_str("Unfiltered"),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::Disabled => f.write_str("Disabled"),
        }
    }
}
