use std::collections::VecDeque;
use std::fmt;

use crate::state::{JobId, Millis};

/// Maximum number of entries kept in the pipeline log stream.
pub const LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Info,
    Success,
    Error,
    System,
}

/// Who an entry is about: one job, or the pipeline as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    System,
    Job(JobId),
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSource::System => write!(f, "SYSTEM"),
            LogSource::Job(id) => write!(f, "#{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: Millis,
    pub source: LogSource,
    pub message: String,
    pub kind: LogKind,
}

/// Append-only stream of recent events; the oldest entry is dropped once
/// [`LOG_CAPACITY`] is exceeded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogSink {
    entries: VecDeque<LogEntry>,
}

impl LogSink {
    pub fn push(
        &mut self,
        timestamp: Millis,
        source: LogSource,
        message: impl Into<String>,
        kind: LogKind,
    ) {
        self.entries.push_back(LogEntry {
            timestamp,
            source,
            message: message.into(),
            kind,
        });
        while self.entries.len() > LOG_CAPACITY {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + '_ {
        self.entries.iter()
    }
}
