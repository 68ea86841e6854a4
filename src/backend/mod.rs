//! Backend capability interfaces.
//!
//! The tracing, logging, and metrics backends are supplied by the host
//! application. This module defines the narrow surface `sig` calls into:
//! - [`Tracer`] opens spans; a [`Span`] takes events, a status, and an end
//! - [`Logger`] takes severity-tagged [`LogRecord`]s
//! - [`Meter`] is held for callers and never invoked by a unit of work
//!
//! Two implementations ship with the crate: [`memory`] records every call
//! for inspection, and `bridge` (feature `tracing-backend`) forwards to the
//! `tracing` crate.

#[cfg(feature = "tracing-backend")]
pub mod bridge;
pub mod memory;

use chrono::{DateTime, Utc};
use std::fmt;

use crate::context::Context;
use crate::emit::Severity;

/// Wall-clock instant attached to spans, events, and records.
pub type Timestamp = DateTime<Utc>;

/// An attribute value as handed to a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Str(String),
    Int(i64),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Str(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

/// A single backend attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyValue {
    pub key: String,
    pub value: Value,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Look up `key` in an attribute list; the last occurrence wins.
pub fn lookup<'a>(attributes: &'a [KeyValue], key: &str) -> Option<&'a Value> {
    attributes
        .iter()
        .rev()
        .find(|kv| kv.key == key)
        .map(|kv| &kv.value)
}

/// Outcome recorded on a span.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Unset,
    Ok,
    Error {
        description: String,
    },
}

impl Status {
    pub fn error(description: impl Into<String>) -> Self {
        Status::Error {
            description: description.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error { .. })
    }
}

/// A structured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: Timestamp,
    pub severity: Severity,
    pub severity_text: &'static str,
    pub body: String,
    pub attributes: Vec<KeyValue>,
}

impl LogRecord {
    /// Build a record whose severity text is the canonical form of `severity`.
    pub fn new(
        timestamp: Timestamp,
        severity: Severity,
        body: impl Into<String>,
        attributes: Vec<KeyValue>,
    ) -> Self {
        Self {
            timestamp,
            severity,
            severity_text: severity.as_str(),
            body: body.into(),
            attributes,
        }
    }

    /// Attribute value for `key`, last occurrence wins.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        lookup(&self.attributes, key)
    }
}

/// Distributed tracing backend.
pub trait Tracer: Send + Sync {
    /// Open a span as a child of `cx`.
    ///
    /// Returns the child context the unit of work carries from now on, and
    /// the span handle it owns until `end`.
    fn start_span(
        &self,
        cx: &Context,
        name: &str,
        at: Timestamp,
        attributes: Vec<KeyValue>,
    ) -> (Context, Box<dyn Span>);
}

/// An open span owned by exactly one unit of work.
pub trait Span: Send {
    fn add_event(&mut self, name: &str, at: Timestamp, attributes: Vec<KeyValue>);

    fn set_status(&mut self, status: Status);

    /// Close the span. Called at most once by a unit of work.
    fn end(&mut self, at: Timestamp);
}

/// Structured logging backend.
pub trait Logger: Send + Sync {
    fn emit(&self, cx: &Context, record: LogRecord);
}

/// Metrics backend, held by the registry for direct use by callers.
pub trait Meter: Send + Sync {
    /// Add `value` to a monotonic counter.
    fn add(&self, name: &str, value: u64, attributes: &[KeyValue]);

    /// Record one sample into a histogram.
    fn record(&self, name: &str, value: f64, attributes: &[KeyValue]);
}
