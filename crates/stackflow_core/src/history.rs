use std::collections::VecDeque;

use chrono::{Local, TimeZone};

use crate::state::Millis;

/// Number of completed-job durations kept for the moving average.
pub const HISTORY_CAPACITY: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySample {
    /// Local wall-clock time of completion, `HH:MM:SS`.
    pub time: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistoryBuffer {
    samples: VecDeque<HistorySample>,
}

impl HistoryBuffer {
    pub fn push(&mut self, at: Millis, duration_ms: u64) {
        self.samples.push_back(HistorySample {
            time: format_time(at),
            duration_ms,
        });
        while self.samples.len() > HISTORY_CAPACITY {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistorySample> + '_ {
        self.samples.iter()
    }

    /// Rounded mean duration, 0 when empty.
    pub fn average_duration_ms(&self) -> u64 {
        if self.samples.is_empty() {
            return 0;
        }
        let total: u64 = self.samples.iter().map(|s| s.duration_ms).sum();
        (total as f64 / self.samples.len() as f64).round() as u64
    }
}

fn format_time(at: Millis) -> String {
    Local
        .timestamp_millis_opt(at)
        .single()
        .map(|time| time.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}
