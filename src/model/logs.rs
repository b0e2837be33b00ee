use chrono::{DateTime, Utc};

/// One log line pulled from the log service.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    /// Stream name abbreviated to its last path segment (12 chars max).
    pub stream: String,
    pub message: String,
}

impl LogEvent {
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Events fetched by a tail poll plus the watermark to resume from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogBatch {
    pub events: Vec<LogEvent>,
    pub watermark_ms: i64,
}
