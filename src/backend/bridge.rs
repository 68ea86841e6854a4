//! Backends that forward to the `tracing` crate.
//!
//! Spans become `tracing` spans named `unit_of_work` with the resolved
//! function recorded as a field; log records become `tracing` events at the
//! matching level. Whatever subscriber the process installed decides where
//! they end up.
//!
//! `tracing` stamps spans and events with its own clock and needs static
//! field names, so the shared timestamp and the attributes are carried as
//! rendered fields (`at`, `attributes`).

use tracing::field::Empty;
use tracing::Level;

use super::{KeyValue, LogRecord, Logger, Span, Status, Timestamp, Tracer};
use crate::attrs::render;
use crate::context::{Context, SpanContext};
use crate::emit::Severity;

/// Target for everything the bridge emits.
pub const TARGET: &str = "sig";

/// Tracer producing `tracing` spans.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTracer;

impl TracingTracer {
    pub fn new() -> Self {
        Self
    }
}

impl Tracer for TracingTracer {
    fn start_span(
        &self,
        cx: &Context,
        name: &str,
        at: Timestamp,
        attributes: Vec<KeyValue>,
    ) -> (Context, Box<dyn Span>) {
        let parent = cx.span_context();
        let context = SpanContext::child_of(parent);
        let parent_id = parent.map(|p| p.span_id.to_string()).unwrap_or_default();
        // Linkage lives in the ids, not in the subscriber's current span.
        let span = tracing::info_span!(
            target: TARGET,
            parent: None,
            "unit_of_work",
            function = %name,
            trace_id = %context.trace_id,
            span_id = %context.span_id,
            parent_id = %parent_id,
            at = %at.to_rfc3339(),
            attributes = %render(&attributes),
            otel.status_code = Empty,
            otel.status_description = Empty,
            closed_at = Empty
        );
        (cx.with_span(context), Box::new(TracingSpan { span }))
    }
}

/// Handle around an open `tracing` span.
#[derive(Debug)]
pub struct TracingSpan {
    span: tracing::Span,
}

impl Span for TracingSpan {
    fn add_event(&mut self, name: &str, at: Timestamp, attributes: Vec<KeyValue>) {
        tracing::event!(
            target: TARGET,
            parent: &self.span,
            Level::DEBUG,
            at = %at.to_rfc3339(),
            attributes = %render(&attributes),
            "{name}"
        );
    }

    fn set_status(&mut self, status: Status) {
        match status {
            Status::Unset => {}
            Status::Ok => {
                self.span.record("otel.status_code", "OK");
            }
            Status::Error { description } => {
                self.span.record("otel.status_code", "ERROR");
                self.span
                    .record("otel.status_description", description.as_str());
            }
        }
    }

    fn end(&mut self, at: Timestamp) {
        self.span.record("closed_at", at.to_rfc3339().as_str());
        // The span closes once its last handle is gone.
        self.span = tracing::Span::none();
    }
}

/// Logger producing `tracing` events. Fatal maps to `ERROR`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

macro_rules! log_event {
    ($level:expr, $record:expr, $trace_id:expr, $correlation_id:expr) => {
        tracing::event!(
            target: TARGET,
            $level,
            severity = $record.severity_text,
            at = %$record.timestamp.to_rfc3339(),
            trace_id = %$trace_id,
            correlation_id = %$correlation_id,
            attributes = %render(&$record.attributes),
            "{}",
            $record.body
        )
    };
}

impl Logger for TracingLogger {
    fn emit(&self, cx: &Context, record: LogRecord) {
        let trace_id = cx
            .span_context()
            .map(|s| s.trace_id.to_string())
            .unwrap_or_default();
        let correlation_id = cx
            .correlation_id()
            .map(|c| c.as_str())
            .unwrap_or_default();
        match record.severity {
            Severity::Trace => log_event!(Level::TRACE, record, trace_id, correlation_id),
            Severity::Debug => log_event!(Level::DEBUG, record, trace_id, correlation_id),
            Severity::Info => log_event!(Level::INFO, record, trace_id, correlation_id),
            Severity::Warn => log_event!(Level::WARN, record, trace_id, correlation_id),
            Severity::Error | Severity::Fatal => {
                log_event!(Level::ERROR, record, trace_id, correlation_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_tracer_returns_child_context() {
        let root = Context::new();
        let (cx, mut span) = TracingTracer::new().start_span(&root, "op", Utc::now(), Vec::new());
        assert!(cx.span_context().is_some());
        span.add_event("step", Utc::now(), vec![KeyValue::new("k", "v")]);
        span.set_status(Status::error("failed"));
        span.end(Utc::now());
        // Ending twice must not panic even without a subscriber.
        span.end(Utc::now());
    }

    #[test]
    fn test_logger_emits_every_severity() {
        let logger = TracingLogger::new();
        for severity in [
            Severity::Trace,
            Severity::Debug,
            Severity::Info,
            Severity::Warn,
            Severity::Error,
            Severity::Fatal,
        ] {
            logger.emit(
                &Context::new(),
                LogRecord::new(Utc::now(), severity, "event", Vec::new()),
            );
        }
    }
}
