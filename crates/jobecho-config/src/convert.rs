use std::collections::BTreeMap;

use serde::Deserialize;

use jobecho_logs::EchoFilter;
use jobecho_types::Stream;

use crate::error::ConfigError;

/// Key in a filter map that applies one pattern to both streams
const ALL_STREAMS: &str = "all";

// ============================================================================
// Job Selection
// ============================================================================

/// Job selection as written in configuration: a single index, a range string
/// such as `"0,3-5,7"`, or an explicit list
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum JobsValue {
    Index(i64),
    Spec(String),
    List(Vec<i64>),
}

impl Default for JobsValue {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl JobsValue {
    /// Normalise to the list of selected job indices
    pub fn indices(&self) -> Result<Vec<usize>, ConfigError> {
        match self {
            Self::Index(index) => Ok(vec![to_index(*index)?]),
            Self::Spec(spec) => expand_numbers(spec),
            Self::List(list) => list.iter().map(|i| to_index(*i)).collect(),
        }
    }
}

fn to_index(value: i64) -> Result<usize, ConfigError> {
    usize::try_from(value).map_err(|_| ConfigError::InvalidIndex(value.to_string()))
}

fn parse_index(text: &str) -> Result<usize, ConfigError> {
    text.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidIndex(text.trim().to_string()))
}

/// Expand a description like `"0,3-5,7"` into `[0, 3, 4, 5, 7]`.
///
/// Ranges are inclusive. Order is kept as written; blank items are skipped.
pub fn expand_numbers(spec: &str) -> Result<Vec<usize>, ConfigError> {
    let mut numbers = Vec::new();
    for item in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match item.split_once('-') {
            None => numbers.push(parse_index(item)?),
            Some((start, end)) => {
                let (start, end) = (parse_index(start)?, parse_index(end)?);
                if start > end {
                    return Err(ConfigError::ReversedRange(item.to_string()));
                }
                numbers.extend(start..=end);
            }
        }
    }
    Ok(numbers)
}

// ============================================================================
// Stream Filters
// ============================================================================

/// Filter selection as written in configuration: a bare stream name (echo that
/// stream unfiltered) or a map of stream name to pattern
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TypesValue {
    Stream(String),
    Map(BTreeMap<String, Option<String>>),
}

impl Default for TypesValue {
    fn default() -> Self {
        Self::Stream(String::new())
    }
}

impl TypesValue {
    /// Build from command-line items of the form `name` or `name=pattern`
    pub fn from_args<S: AsRef<str>>(items: impl IntoIterator<Item = S>) -> Self {
        let map = items
            .into_iter()
            .map(|item| match item.as_ref().split_once('=') {
                Some((name, pattern)) => (name.trim().to_string(), Some(pattern.to_string())),
                None => (item.as_ref().trim().to_string(), None),
            })
            .collect();
        Self::Map(map)
    }

    /// Normalise to a per-stream pattern map
    pub fn echo_types(&self) -> Result<EchoTypes, ConfigError> {
        let map = match self {
            Self::Stream(name) if name.is_empty() => {
                return Ok(EchoTypes::broadcast(None));
            }
            Self::Map(map) if map.is_empty() => return Ok(EchoTypes::broadcast(None)),
            Self::Stream(name) => BTreeMap::from([(name.clone(), None)]),
            Self::Map(map) => map.clone(),
        };

        if let Some(pattern) = map.get(ALL_STREAMS) {
            return Ok(EchoTypes::broadcast(pattern.clone()));
        }

        let mut patterns = BTreeMap::new();
        for (name, pattern) in map {
            let stream =
                Stream::from_name(&name).ok_or_else(|| ConfigError::UnknownStream(name.clone()))?;
            patterns.insert(stream, pattern);
        }
        Ok(EchoTypes(patterns))
    }
}

/// Pattern per echoed stream. A stream missing from the map is not echoed; a
/// `None` or empty pattern echoes every line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EchoTypes(pub BTreeMap<Stream, Option<String>>);

impl EchoTypes {
    /// Same pattern for both streams
    pub fn broadcast(pattern: Option<String>) -> Self {
        Self(
            Stream::ALL
                .into_iter()
                .map(|stream| (stream, pattern.clone()))
                .collect(),
        )
    }

    /// Pattern configured for a stream; `None` when the stream is not echoed
    pub fn get(&self, stream: Stream) -> Option<Option<&str>> {
        self.0.get(&stream).map(Option::as_deref)
    }

    /// Compile the filter for a stream
    pub fn filter(&self, stream: Stream) -> Result<EchoFilter, ConfigError> {
        match self.get(stream) {
            None => Ok(EchoFilter::Disabled),
            Some(pattern) => EchoFilter::from_pattern(pattern).map_err(|source| {
                ConfigError::Filter {
                    stream: stream.as_str(),
                    source,
                }
            }),
        }
    }
}
