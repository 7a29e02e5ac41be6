use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// Severity levels honored by the ingestion logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size-based rotation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRotationPolicy {
    pub max_bytes: usize,
    pub max_files: usize,
}

impl Default for LogRotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 1 << 20,
            max_files: 4,
        }
    }
}

/// Lines accumulated for one log segment.
#[derive(Debug, Default, Clone)]
pub struct LogSegment {
    lines: Vec<String>,
    bytes_written: usize,
}

impl LogSegment {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }
}

/// Deterministic JSON-line logger for the ingestion path. Records carry the
/// channel name and offset id so a failed confirmation can be correlated with
/// the submission that produced it.
#[derive(Debug, Clone)]
pub struct IngestLogger {
    policy: LogRotationPolicy,
    current_level: LogLevel,
    segments: VecDeque<LogSegment>,
    active: LogSegment,
}

impl Default for IngestLogger {
    fn default() -> Self {
        Self::new(LogRotationPolicy::default())
    }
}

impl IngestLogger {
    pub fn new(policy: LogRotationPolicy) -> Self {
        Self {
            policy,
            current_level: LogLevel::Info,
            segments: VecDeque::new(),
            active: LogSegment::default(),
        }
    }

    pub fn level(&self) -> LogLevel {
        self.current_level
    }

    /// Lowers or raises the filter; entries below the level are dropped.
    pub fn set_level(&mut self, level: LogLevel) {
        self.current_level = level;
    }

    /// Emits one JSON-line record.
    pub fn log(
        &mut self,
        ts_ms: u64,
        level: LogLevel,
        component: &str,
        channel: &str,
        offset_id: u64,
        message: &str,
    ) -> Result<(), LoggingError> {
        if level < self.current_level {
            return Ok(());
        }
        let record = LogRecord {
            ts: ts_ms,
            level: level.as_str(),
            component,
            channel,
            offset_id,
            message,
        };
        let line = serde_json::to_string(&record).map_err(LoggingError::Serialize)?;
        self.rotate_if_needed(line.len());
        self.active.bytes_written = self.active.bytes_written.saturating_add(line.len());
        self.active.lines.push(line);
        Ok(())
    }

    /// Rotated history followed by the active segment.
    pub fn segments(&self) -> impl Iterator<Item = &LogSegment> {
        self.segments.iter().chain(std::iter::once(&self.active))
    }

    fn rotate_if_needed(&mut self, next_line_len: usize) {
        if self.active.bytes_written + next_line_len <= self.policy.max_bytes {
            return;
        }
        if !self.active.lines.is_empty() {
            self.segments.push_back(std::mem::take(&mut self.active));
            while self.segments.len() > self.policy.max_files {
                self.segments.pop_front();
            }
        }
        self.active = LogSegment::default();
    }
}

/// Errors surfaced while serializing log records.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to serialize log record: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct LogRecord<'a> {
    ts: u64,
    level: &'a str,
    component: &'a str,
    channel: &'a str,
    offset_id: u64,
    message: &'a str,
}
