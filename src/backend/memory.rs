//! In-memory backends that record every call.
//!
//! Clones share storage, so a test can keep one handle and give another to
//! the registry.

use std::fmt;
use std::sync::{Arc, Mutex};

use super::{lookup, KeyValue, LogRecord, Logger, Meter, Span, Status, Timestamp, Tracer, Value};
use crate::context::{Context, SpanContext};

/// A span event as received by [`MemoryTracer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventData {
    pub name: String,
    pub timestamp: Timestamp,
    pub attributes: Vec<KeyValue>,
}

impl EventData {
    /// Attribute value for `key`, last occurrence wins.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        lookup(&self.attributes, key)
    }
}

/// Everything a span received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanData {
    pub name: String,
    pub context: SpanContext,
    pub parent: Option<SpanContext>,
    pub start: Timestamp,
    pub attributes: Vec<KeyValue>,
    pub events: Vec<EventData>,
    pub status: Status,
    pub status_calls: usize,
    pub end: Option<Timestamp>,
    pub end_calls: usize,
}

impl SpanData {
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        lookup(&self.attributes, key)
    }
}

/// Tracer that keeps every span in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTracer {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl MemoryTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all spans in start order.
    pub fn spans(&self) -> Vec<SpanData> {
        self.spans.lock().expect("mutex poisoned").clone()
    }

    /// Total number of span operations received (starts, events, statuses, ends).
    pub fn operation_count(&self) -> usize {
        self.spans
            .lock()
            .expect("mutex poisoned")
            .iter()
            .map(|s| 1 + s.events.len() + s.status_calls + s.end_calls)
            .sum()
    }

    pub fn reset(&self) {
        self.spans.lock().expect("mutex poisoned").clear();
    }
}

impl Tracer for MemoryTracer {
    fn start_span(
        &self,
        cx: &Context,
        name: &str,
        at: Timestamp,
        attributes: Vec<KeyValue>,
    ) -> (Context, Box<dyn Span>) {
        let parent = cx.span_context().copied();
        let context = SpanContext::child_of(parent.as_ref());
        let mut spans = self.spans.lock().expect("mutex poisoned");
        spans.push(SpanData {
            name: name.to_string(),
            context,
            parent,
            start: at,
            attributes,
            events: Vec::new(),
            status: Status::Unset,
            status_calls: 0,
            end: None,
            end_calls: 0,
        });
        let span = MemorySpan {
            spans: self.spans.clone(),
            index: spans.len() - 1,
        };
        (cx.with_span(context), Box::new(span))
    }
}

/// Handle to one recorded span.
#[derive(Debug)]
pub struct MemorySpan {
    spans: Arc<Mutex<Vec<SpanData>>>,
    index: usize,
}

impl MemorySpan {
    fn update(&self, f: impl FnOnce(&mut SpanData)) {
        let mut spans = self.spans.lock().expect("mutex poisoned");
        // A reset tracer forgets its spans; late updates go nowhere.
        if let Some(span) = spans.get_mut(self.index) {
            f(span);
        }
    }
}

impl Span for MemorySpan {
    fn add_event(&mut self, name: &str, at: Timestamp, attributes: Vec<KeyValue>) {
        self.update(|span| {
            span.events.push(EventData {
                name: name.to_string(),
                timestamp: at,
                attributes,
            })
        });
    }

    fn set_status(&mut self, status: Status) {
        self.update(|span| {
            span.status = status;
            span.status_calls += 1;
        });
    }

    fn end(&mut self, at: Timestamp) {
        self.update(|span| {
            span.end = Some(at);
            span.end_calls += 1;
        });
    }
}

/// A record together with the context it was emitted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRecord {
    pub context: Context,
    pub record: LogRecord,
}

/// Logger that keeps every record in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogger {
    records: Arc<Mutex<Vec<CapturedRecord>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records in emission order.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .expect("mutex poisoned")
            .iter()
            .map(|c| c.record.clone())
            .collect()
    }

    /// Records with their contexts.
    pub fn captured(&self) -> Vec<CapturedRecord> {
        self.records.lock().expect("mutex poisoned").clone()
    }

    /// Record bodies in emission order.
    pub fn bodies(&self) -> Vec<String> {
        self.records
            .lock()
            .expect("mutex poisoned")
            .iter()
            .map(|c| c.record.body.clone())
            .collect()
    }

    pub fn reset(&self) {
        self.records.lock().expect("mutex poisoned").clear();
    }
}

impl Logger for MemoryLogger {
    fn emit(&self, cx: &Context, record: LogRecord) {
        self.records
            .lock()
            .expect("mutex poisoned")
            .push(CapturedRecord {
                context: cx.clone(),
                record,
            });
    }
}

/// Instrument a meter call went to, with the value passed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    Add(u64),
    Record(f64),
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::Add(v) => write!(f, "add {v}"),
            Measurement::Record(v) => write!(f, "record {v}"),
        }
    }
}

/// One call received by [`MemoryMeter`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeterCall {
    pub name: String,
    pub measurement: Measurement,
    pub attributes: Vec<KeyValue>,
}

/// Meter that keeps every call in memory, as received.
#[derive(Debug, Clone, Default)]
pub struct MemoryMeter {
    calls: Arc<Mutex<Vec<MeterCall>>>,
}

impl MemoryMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all calls in order.
    pub fn calls(&self) -> Vec<MeterCall> {
        self.calls.lock().expect("mutex poisoned").clone()
    }

    pub fn reset(&self) {
        self.calls.lock().expect("mutex poisoned").clear();
    }

    fn push(&self, name: &str, measurement: Measurement, attributes: &[KeyValue]) {
        self.calls.lock().expect("mutex poisoned").push(MeterCall {
            name: name.to_string(),
            measurement,
            attributes: attributes.to_vec(),
        });
    }
}

impl Meter for MemoryMeter {
    fn add(&self, name: &str, value: u64, attributes: &[KeyValue]) {
        self.push(name, Measurement::Add(value), attributes);
    }

    fn record(&self, name: &str, value: f64, attributes: &[KeyValue]) {
        self.push(name, Measurement::Record(value), attributes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::Severity;
    use chrono::Utc;

    #[test]
    fn test_tracer_links_parent() {
        let tracer = MemoryTracer::new();
        let (outer_cx, _outer) = tracer.start_span(&Context::new(), "outer", Utc::now(), Vec::new());
        let (inner_cx, _inner) = tracer.start_span(&outer_cx, "inner", Utc::now(), Vec::new());

        let spans = tracer.spans();
        assert_eq!(spans[0].parent, None);
        assert_eq!(spans[1].parent, outer_cx.span_context().copied());
        assert_eq!(
            inner_cx.span_context().map(|s| s.trace_id),
            outer_cx.span_context().map(|s| s.trace_id)
        );
    }

    #[test]
    fn test_span_records_operations() {
        let tracer = MemoryTracer::new();
        let (_, mut span) = tracer.start_span(&Context::new(), "op", Utc::now(), Vec::new());
        span.add_event("step", Utc::now(), vec![KeyValue::new("k", "v")]);
        span.set_status(Status::error("boom"));
        span.end(Utc::now());

        let spans = tracer.spans();
        let data = &spans[0];
        assert_eq!(data.events[0].attribute("k"), Some(&Value::from("v")));
        assert_eq!(data.status, Status::error("boom"));
        assert_eq!(data.end_calls, 1);
        assert_eq!(tracer.operation_count(), 4);
    }

    #[test]
    fn test_logger_shares_storage_across_clones() {
        let logger = MemoryLogger::new();
        let handle = logger.clone();
        logger.emit(
            &Context::new(),
            LogRecord::new(Utc::now(), Severity::Info, "hello", Vec::new()),
        );
        assert_eq!(handle.bodies(), ["hello"]);
        handle.reset();
        assert!(logger.records().is_empty());
    }

    #[test]
    fn test_update_after_reset_is_ignored() {
        let tracer = MemoryTracer::new();
        let (_, mut span) = tracer.start_span(&Context::new(), "op", Utc::now(), Vec::new());
        tracer.reset();
        span.end(Utc::now());
        assert!(tracer.spans().is_empty());
    }

    #[test]
    fn test_meter_keeps_calls_unaggregated() {
        let meter = MemoryMeter::new();
        let handle = meter.clone();
        meter.add("jobs", 1, &[KeyValue::new("queue", "emails")]);
        meter.add("jobs", 1, &[KeyValue::new("queue", "emails")]);
        meter.record("job_ms", 12.5, &[]);

        let calls = handle.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].measurement, Measurement::Add(1));
        assert_eq!(calls[1], calls[0]);
        assert_eq!(calls[2].name, "job_ms");
        assert_eq!(calls[2].measurement.to_string(), "record 12.5");

        handle.reset();
        assert!(meter.calls().is_empty());
    }
}
