//! Dual emission of one event to the span and the log stream.
//!
//! Every emission captures a single [`Stamp`] (instant + call line) and
//! hands the same value to both paths, so a span event and its log record
//! always agree on when and where they happened.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::attrs::{self, Map};
use crate::backend::{KeyValue, LogRecord, Logger, Span, Status, Timestamp};
use crate::context::Context;

/// Event severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Severity {
    /// Canonical text form attached to log records.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    /// Severity number in the OpenTelemetry log data model.
    pub const fn number(&self) -> u8 {
        match self {
            Severity::Trace => 1,
            Severity::Debug => 5,
            Severity::Info => 9,
            Severity::Warn => 13,
            Severity::Error => 17,
            Severity::Fatal => 21,
        }
    }

    /// Error-class severities mark the span status.
    pub fn is_error(&self) -> bool {
        *self >= Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One instant and one call line, captured once per emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    pub at: Timestamp,
    pub line: u32,
}

impl Stamp {
    pub fn now(line: u32) -> Self {
        Self {
            at: Utc::now(),
            line,
        }
    }
}

/// Attributes identifying the origin of a record.
pub(crate) fn origin_attributes(function: &str, file: &str, line: u32) -> Vec<KeyValue> {
    vec![
        KeyValue::new("function", function),
        KeyValue::new("file", file),
        KeyValue::new("line", line),
    ]
}

/// Where an event came from: the unit's identity plus its context.
pub(crate) struct Origin<'a> {
    pub function: &'a str,
    pub file: &'a str,
    pub context: &'a Context,
}

/// Fan one event out to the span (if present) and the logger (if present).
///
/// Each path builds its own attribute list from `attributes`.
pub(crate) fn dispatch(
    origin: Origin<'_>,
    span: Option<&mut Box<dyn Span>>,
    logger: Option<&dyn Logger>,
    name: &str,
    severity: Severity,
    attributes: &[Map],
    stamp: Stamp,
) {
    if let Some(span) = span {
        let mut span_attributes = attrs::flatten(attributes);
        span_attributes.push(KeyValue::new("file", origin.file));
        span_attributes.push(KeyValue::new("line", stamp.line));
        span.add_event(name, stamp.at, span_attributes);
        if severity.is_error() {
            span.set_status(Status::error(name));
        }
    }

    if let Some(logger) = logger {
        let mut record_attributes = origin_attributes(origin.function, origin.file, stamp.line);
        record_attributes.extend(attrs::flatten(attributes));
        logger.emit(
            origin.context,
            LogRecord::new(stamp.at, severity, name, record_attributes),
        );
    }
}
