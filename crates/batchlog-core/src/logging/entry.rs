//! Structured log record rendered as one JSON line.
//!
//! Records are self-contained, so a batch of them can be appended to a
//! JSONL file in one write and read back line by line.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Severity;

/// A single structured log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// ISO 8601 timestamp (e.g., "2026-10-15T14:30:45.123Z")
    pub ts: String,

    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Name of the emitting process or component
    pub instance: String,

    /// Module path / target (e.g., "batchlog_cli::pipe")
    pub target: String,

    /// Human-readable message
    pub msg: String,

    /// Optional structured fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Value>,

    /// Span path (`outer > inner`) if emitted inside spans
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<String>,
}

impl LogRecord {
    /// Create a record stamped with the current time.
    pub fn new(
        level: impl Into<String>,
        instance: impl Into<String>,
        target: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            level: level.into(),
            instance: instance.into(),
            target: target.into(),
            msg: msg.into(),
            fields: None,
            span: None,
        }
    }

    pub fn with_fields(mut self, fields: Value) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_span(mut self, span: impl Into<String>) -> Self {
        self.span = Some(span.into());
        self
    }

    /// Severity parsed from `level`, if it is a known name.
    pub fn severity(&self) -> Option<Severity> {
        self.level.parse().ok()
    }

    /// Serialize to a single JSON line (no trailing newline).
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Human-oriented single-line rendering.
    pub fn to_text_line(&self) -> String {
        let mut line = format!(
            "{} {:<5} [{}] {}: {}",
            self.ts,
            self.level.to_uppercase(),
            self.instance,
            self.target,
            self.msg
        );
        if let Some(fields) = &self.fields {
            line.push(' ');
            line.push_str(&fields.to_string());
        }
        line
    }
}

/// Renders as a JSON line, which makes a `LogRecord` usable with
/// [`WriterSink`](crate::WriterSink) directly.
impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = self.to_json_line().map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serialization() {
        let record = LogRecord::new("info", "worker-1", "batchlog::pipe", "Started");

        let json = record.to_json_line().unwrap();
        assert!(json.contains("\"level\":\"info\""));
        assert!(json.contains("\"instance\":\"worker-1\""));
        assert!(json.contains("\"msg\":\"Started\""));
        assert!(!json.contains("\"fields\""));
        assert!(!json.contains("\"span\""));

        let parsed = LogRecord::from_json_line(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_display_is_json_line() {
        let record = LogRecord::new("warn", "w", "t", "line\nbreak").with_span("outer > inner");
        let rendered = record.to_string();
        assert!(!rendered.contains('\n'));
        assert!(rendered.contains("\"span\":\"outer > inner\""));
    }

    #[test]
    fn test_text_line_includes_fields() {
        let record = LogRecord::new("error", "w", "db", "Query failed")
            .with_fields(serde_json::json!({ "attempt": 3 }));

        let text = record.to_text_line();
        assert!(text.contains("ERROR [w] db: Query failed"));
        assert!(text.ends_with("{\"attempt\":3}"));
        assert_eq!(record.severity(), Some(Severity::Error));
    }
}
