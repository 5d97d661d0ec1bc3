use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;

use jobecho_types::{LevelGroup, LevelRegistry, LogRecord};

use crate::error::EchoError;
use crate::sink::LogSink;

/// Thread-safe ring buffer capturing echoed records
///
/// Keeps every record it is given, regardless of level. Clones share storage,
/// so one handle can be passed to the router while another is inspected.
#[derive(Clone)]
pub struct LogBuffer {
    /// Internal storage
    records: Arc<RwLock<VecDeque<LogRecord>>>,

    /// Levels registered through the sink interface
    registry: Arc<RwLock<LevelRegistry>>,

    /// Maximum capacity
    capacity: usize,
}

impl LogBuffer {
    /// Create a new log buffer with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            registry: Arc::new(RwLock::new(LevelRegistry::new())),
            capacity,
        }
    }

    /// Push a new record, evicting oldest if at capacity
    pub fn push(&self, record: LogRecord) {
        let mut records = self.records.write();
        if records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Get all records (cloned)
    pub fn all(&self) -> Vec<LogRecord> {
        self.records.read().iter().cloned().collect()
    }

    /// Get the messages logged at a level name such as `STDOUT` or `_MSG`
    pub fn messages_at(&self, level: &str) -> Vec<String> {
        self.records
            .read()
            .iter()
            .filter(|r| r.level.name() == level)
            .map(|r| r.message.clone())
            .collect()
    }

    /// Get record count per level name
    pub fn level_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records.read().iter() {
            *counts.entry(record.level.name()).or_insert(0) += 1;
        }
        counts
    }

    /// Level names registered under a tier
    pub fn registered(&self, group: LevelGroup) -> Vec<String> {
        self.registry
            .read()
            .members(group)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Total record count
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Export all messages, one per line
    pub fn export_raw(&self) -> String {
        self.records
            .read()
            .iter()
            .map(|r| r.message.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Clear all records
    pub fn clear(&self) {
        self.records.write().clear();
    }
}

impl LogSink for LogBuffer {
    fn register_level(&mut self, name: &str, group: LevelGroup) {
        self.registry.write().register(name, group);
    }

    fn log(&mut self, record: LogRecord) -> Result<(), EchoError> {
        self.push(record);
        Ok(())
    }
}
