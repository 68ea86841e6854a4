//! Propagation context carried across nested units of work.
//!
//! A [`Context`] links a unit of work to its parent span and carries an
//! optional correlation id. Trace and span ids are generated from the session
//! start time and a process-wide counter, so they are unique within a process.

use once_cell::sync::Lazy;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Counter for unique ids within a session
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Millis at first id generation; offsets the counter so ids differ across runs.
static SESSION: Lazy<u64> = Lazy::new(|| {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
});

/// Next id: a bijective mix of `SESSION + counter`, so distinct draws never collide.
fn next_id() -> u64 {
    let seed = SESSION.wrapping_add(COUNTER.fetch_add(1, Ordering::Relaxed));
    let mut z = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Identifier shared by every span of one trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(u128);

impl TraceId {
    /// Generate a new unique trace id.
    pub fn generate() -> Self {
        Self((u128::from(next_id()) << 64) | u128::from(next_id()))
    }

    pub const fn from_u128(id: u128) -> Self {
        Self(id)
    }

    pub const fn to_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Identifier of a single span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(u64);

impl SpanId {
    /// Generate a new unique span id.
    pub fn generate() -> Self {
        Self(next_id())
    }

    pub const fn from_u64(id: u64) -> Self {
        Self(id)
    }

    pub const fn to_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Trace linkage of the span a context points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanContext {
    pub trace_id: TraceId,
    pub span_id: SpanId,
}

impl SpanContext {
    /// Linkage for a new span under `parent`.
    ///
    /// A child keeps the parent's trace id; a root span starts a new trace.
    pub fn child_of(parent: Option<&SpanContext>) -> Self {
        Self {
            trace_id: parent.map_or_else(TraceId::generate, |p| p.trace_id),
            span_id: SpanId::generate(),
        }
    }
}

/// A unique correlation id for relating records that share no span.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a new unique correlation id.
    ///
    /// Format: `{session_ms}-{id}`
    pub fn new() -> Self {
        Self(format!("{}-{:x}", *SESSION, next_id()))
    }

    /// Create a correlation id from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Execution context carrying trace linkage across nested operations.
///
/// Cloning is cheap; a context is passed by value into `start` and the unit
/// of work hands out the child context its tracer returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    span: Option<SpanContext>,
    correlation_id: Option<CorrelationId>,
}

impl Context {
    /// The root context: no active span, no correlation id.
    pub fn new() -> Self {
        Self::default()
    }

    /// The active span this context points at, if any.
    pub fn span_context(&self) -> Option<&SpanContext> {
        self.span.as_ref()
    }

    /// A copy of this context pointing at `span`.
    pub fn with_span(&self, span: SpanContext) -> Self {
        Self {
            span: Some(span),
            correlation_id: self.correlation_id.clone(),
        }
    }

    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    pub fn with_correlation_id(mut self, id: CorrelationId) -> Self {
        self.correlation_id = Some(id);
        self
    }
}
