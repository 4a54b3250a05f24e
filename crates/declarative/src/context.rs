//! Per-run context and observer traits
//!
//! Operations never write to a global buffer. Each run owns a [`RunLog`]
//! that is passed down the call chain and flushed once at the boundary.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Severity of a run log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
}

impl From<Level> for log::Level {
    fn from(level: Level) -> Self {
        match level {
            Level::Debug => log::Level::Debug,
            Level::Info => log::Level::Info,
            Level::Warn => log::Level::Warn,
        }
    }
}

/// One entry of a run log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub at: DateTime<Utc>,
    pub level: Level,
    pub message: String,
}

/// Messages collected during one reconciliation run
#[derive(Debug, Default)]
pub struct RunLog {
    entries: Vec<Entry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: Level, message: impl Into<String>) {
        self.entries.push(Entry {
            at: Utc::now(),
            level,
            message: message.into(),
        });
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.push(Level::Debug, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Level::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(Level::Warn, message);
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any warning was recorded
    pub fn has_warnings(&self) -> bool {
        self.entries.iter().any(|e| e.level == Level::Warn)
    }

    /// Emit every entry through the `log` facade and return them as
    /// printable lines. The log is empty afterwards.
    pub fn flush(&mut self) -> Vec<String> {
        self.entries
            .drain(..)
            .map(|entry| {
                log::log!(entry.level.into(), "{}", entry.message);
                format!(
                    "{} {:?} {}",
                    entry.at.format("%H:%M:%S%.3f"),
                    entry.level,
                    entry.message
                )
            })
            .collect()
    }
}

/// Observer for long-running polls
///
/// Implement this trait to show progress while waiting for a remote job.
pub trait PollObserver {
    /// Called before each status check
    fn on_check(&mut self, attempt: u32, elapsed: Duration);

    /// Called once when polling ends, whatever the outcome
    fn on_finish(&mut self, summary: &str);
}

/// Observer that ignores all events
pub struct NoObserver;

impl PollObserver for NoObserver {
    fn on_check(&mut self, _attempt: u32, _elapsed: Duration) {}
    fn on_finish(&mut self, _summary: &str) {}
}
