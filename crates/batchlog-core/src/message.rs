//! Message decorators: severity, timestamp and call site.
//!
//! Each wrapper is a plain value around an inner message. They nest freely,
//! e.g. `WithTimestamp<WithSeverity<String>>`, and render as a single line
//! through `Display`:
//!
//! ```text
//! [2026-10-15T10:00:00.000Z] [Error] disk full (src/main.rs:10:5)
//! ```

use std::fmt;
use std::panic::Location;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::logger::Logger;

/// Syslog severity levels, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// System is unusable.
    Emergency,
    /// Action must be taken immediately.
    Alert,
    Critical,
    Error,
    Warning,
    /// Normal but significant condition.
    Notice,
    Informational,
    Debug,
}

impl Severity {
    pub const ALL: [Severity; 8] = [
        Severity::Emergency,
        Severity::Alert,
        Severity::Critical,
        Severity::Error,
        Severity::Warning,
        Severity::Notice,
        Severity::Informational,
        Severity::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Emergency => "Emergency",
            Severity::Alert => "Alert",
            Severity::Critical => "Critical",
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Notice => "Notice",
            Severity::Informational => "Informational",
            Severity::Debug => "Debug",
        }
    }

    /// `true` if `self` is as severe as `threshold` or more.
    pub fn is_at_least(&self, threshold: Severity) -> bool {
        *self <= threshold
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown severity name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity: {0}")]
pub struct ParseSeverityError(String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "emergency" | "emerg" => Ok(Severity::Emergency),
            "alert" => Ok(Severity::Alert),
            "critical" | "crit" => Ok(Severity::Critical),
            "error" | "err" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            "notice" => Ok(Severity::Notice),
            "informational" | "info" => Ok(Severity::Informational),
            "debug" | "trace" => Ok(Severity::Debug),
            _ => Err(ParseSeverityError(s.to_string())),
        }
    }
}

impl From<tracing::Level> for Severity {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => Severity::Error,
            tracing::Level::WARN => Severity::Warning,
            tracing::Level::INFO => Severity::Informational,
            tracing::Level::DEBUG | tracing::Level::TRACE => Severity::Debug,
        }
    }
}

/// A message tagged with a [`Severity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithSeverity<M> {
    pub severity: Severity,
    pub msg: M,
}

impl<M> WithSeverity<M> {
    pub fn new(severity: Severity, msg: M) -> Self {
        Self { severity, msg }
    }

    pub fn map<N>(self, f: impl FnOnce(M) -> N) -> WithSeverity<N> {
        WithSeverity {
            severity: self.severity,
            msg: f(self.msg),
        }
    }

    pub fn into_inner(self) -> M {
        self.msg
    }
}

impl<M: fmt::Display> fmt::Display for WithSeverity<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.msg)
    }
}

/// A message tagged with the time it was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithTimestamp<M> {
    pub timestamp: DateTime<Utc>,
    pub msg: M,
}

impl<M> WithTimestamp<M> {
    pub fn new(timestamp: DateTime<Utc>, msg: M) -> Self {
        Self { timestamp, msg }
    }

    pub fn map<N>(self, f: impl FnOnce(M) -> N) -> WithTimestamp<N> {
        WithTimestamp {
            timestamp: self.timestamp,
            msg: f(self.msg),
        }
    }

    pub fn into_inner(self) -> M {
        self.msg
    }
}

impl<M: fmt::Display> fmt::Display for WithTimestamp<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.msg
        )
    }
}

/// Stamp `msg` with the current time.
pub fn timestamp_now<M>(msg: M) -> WithTimestamp<M> {
    WithTimestamp::new(Utc::now(), msg)
}

/// A message tagged with the source location that emitted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithCallSite<M> {
    pub location: &'static Location<'static>,
    pub msg: M,
}

impl<M> WithCallSite<M> {
    /// Capture the caller's location.
    #[track_caller]
    pub fn new(msg: M) -> Self {
        Self {
            location: Location::caller(),
            msg,
        }
    }

    pub fn map<N>(self, f: impl FnOnce(M) -> N) -> WithCallSite<N> {
        WithCallSite {
            location: self.location,
            msg: f(self.msg),
        }
    }

    pub fn into_inner(self) -> M {
        self.msg
    }
}

impl<M: fmt::Display> fmt::Display for WithCallSite<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}:{}:{})",
            self.msg,
            self.location.file(),
            self.location.line(),
            self.location.column()
        )
    }
}

/// Emit `msg` at `severity`.
pub async fn log_with_severity<L, M>(logger: &L, severity: Severity, msg: M)
where
    L: Logger<WithSeverity<M>>,
{
    logger.log_message(WithSeverity::new(severity, msg)).await
}

pub async fn log_error<L, M>(logger: &L, msg: M)
where
    L: Logger<WithSeverity<M>>,
{
    log_with_severity(logger, Severity::Error, msg).await
}

pub async fn log_warning<L, M>(logger: &L, msg: M)
where
    L: Logger<WithSeverity<M>>,
{
    log_with_severity(logger, Severity::Warning, msg).await
}

pub async fn log_info<L, M>(logger: &L, msg: M)
where
    L: Logger<WithSeverity<M>>,
{
    log_with_severity(logger, Severity::Informational, msg).await
}

pub async fn log_debug<L, M>(logger: &L, msg: M)
where
    L: Logger<WithSeverity<M>>,
{
    log_with_severity(logger, Severity::Debug, msg).await
}
