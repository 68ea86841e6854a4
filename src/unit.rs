//! Unit of work: one instrumented logical operation, bounded by start and end.
//!
//! Starting a unit opens a span (tracing present) and writes a `started`
//! record (logging present) that share one captured instant. Events fan out
//! to both. [`UnitOfWork::end`] writes `ended` and closes the span.
//!
//! `end` is terminal. A second `end`, or any event after it, is dropped with
//! a debug diagnostic, so a span is never closed twice. Dropping a unit
//! without calling `end` leaves its span open.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use tracing::debug;

use crate::attrs::Map;
use crate::backend::{KeyValue, LogRecord, Span};
use crate::caller::Caller;
use crate::context::Context;
use crate::emit::{self, Origin, Severity, Stamp};
use crate::registry::Registry;

/// Body of the record written when a unit starts.
pub const STARTED: &str = "started";
/// Body of the record written when a unit ends.
pub const ENDED: &str = "ended";

/// Lifecycle state of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Active,
    Ended,
}

/// Handle for an instrumented operation.
///
/// Owned by one call chain; it is `Send` but every operation takes
/// `&mut self`. Hand children the [`context`](Self::context) instead of
/// sharing the unit.
pub struct UnitOfWork {
    registry: Arc<Registry>,
    function: String,
    file: String,
    context: Context,
    span: Option<Box<dyn Span>>,
    state: State,
}

impl UnitOfWork {
    /// A unit that emits nothing. Its context is the incoming one.
    pub(crate) fn inert(registry: Arc<Registry>, cx: Context) -> Self {
        Self {
            registry,
            function: String::new(),
            file: String::new(),
            context: cx,
            span: None,
            state: State::Active,
        }
    }

    /// Open the span and write `started`, both at `stamp`.
    ///
    /// `stamp` is taken before the caller is resolved, so resolution cost
    /// never shows up as span start latency.
    pub(crate) fn open(
        registry: Arc<Registry>,
        cx: Context,
        caller: Caller,
        stamp: Stamp,
    ) -> Self {
        let Caller { function, file, .. } = caller;

        let mut context = cx;
        let mut span = None;
        if let Some(tracer) = registry.tracer() {
            let attributes = vec![
                KeyValue::new("file", file.as_str()),
                KeyValue::new("line", stamp.line),
            ];
            let name = span_name(&function, &file, stamp.line);
            let (child, handle) = tracer.start_span(&context, &name, stamp.at, attributes);
            context = child;
            span = Some(handle);
        }

        if let Some(logger) = registry.logger() {
            logger.emit(
                &context,
                LogRecord::new(
                    stamp.at,
                    Severity::Trace,
                    STARTED,
                    emit::origin_attributes(&function, &file, stamp.line),
                ),
            );
        }

        Self {
            registry,
            function,
            file,
            context,
            span,
            state: State::Active,
        }
    }

    /// Propagation context for work nested under this unit.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Function that started the unit; blank when unresolved or inert.
    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_ended(&self) -> bool {
        self.state == State::Ended
    }

    /// Whether any backend sees this unit.
    pub fn is_observed(&self) -> bool {
        self.registry.is_observed()
    }

    #[track_caller]
    pub fn trace(&mut self, event: &str, attributes: &[Map]) {
        self.emit(event, Severity::Trace, attributes);
    }

    #[track_caller]
    pub fn debug(&mut self, event: &str, attributes: &[Map]) {
        self.emit(event, Severity::Debug, attributes);
    }

    #[track_caller]
    pub fn info(&mut self, event: &str, attributes: &[Map]) {
        self.emit(event, Severity::Info, attributes);
    }

    #[track_caller]
    pub fn warn(&mut self, event: &str, attributes: &[Map]) {
        self.emit(event, Severity::Warn, attributes);
    }

    /// Record an error: the event text is the error's message and the span
    /// is marked failed. `None` is a no-op.
    ///
    /// Pass `result.as_ref().err()` to report a `Result` without branching.
    #[track_caller]
    pub fn error<E>(&mut self, err: Option<&E>, attributes: &[Map])
    where
        E: fmt::Display + ?Sized,
    {
        if let Some(err) = err {
            self.emit(&err.to_string(), Severity::Error, attributes);
        }
    }

    /// Like [`error`](Self::error) at fatal severity.
    #[track_caller]
    pub fn fatal<E>(&mut self, err: Option<&E>, attributes: &[Map])
    where
        E: fmt::Display + ?Sized,
    {
        if let Some(err) = err {
            self.emit(&err.to_string(), Severity::Fatal, attributes);
        }
    }

    /// Emit `event` at `severity` to every present backend.
    ///
    /// An empty `event` below [`Severity::Error`] is dropped. Error and fatal
    /// events are named by their error message and always go out.
    #[track_caller]
    pub fn emit(&mut self, event: &str, severity: Severity, attributes: &[Map]) {
        let line = Location::caller().line();
        if !self.registry.is_observed() || (event.is_empty() && !severity.is_error()) {
            return;
        }
        if self.state == State::Ended {
            debug!(
                target: "sig::unit",
                function = %self.function,
                %event,
                "event after end dropped"
            );
            return;
        }

        let stamp = Stamp::now(line);
        let origin = Origin {
            function: &self.function,
            file: &self.file,
            context: &self.context,
        };
        emit::dispatch(
            origin,
            self.span.as_mut(),
            self.registry.logger().map(|logger| &**logger),
            event,
            severity,
            attributes,
            stamp,
        );
    }

    /// Finish the unit: write `ended` and close the span at one instant.
    ///
    /// The recorded line is the line of this call.
    #[track_caller]
    pub fn end(&mut self) {
        let line = Location::caller().line();
        if self.state == State::Ended {
            if self.registry.is_observed() {
                debug!(target: "sig::unit", function = %self.function, "unit already ended");
            }
            return;
        }
        self.state = State::Ended;
        if !self.registry.is_observed() {
            return;
        }

        let stamp = Stamp::now(line);
        if let Some(logger) = self.registry.logger() {
            logger.emit(
                &self.context,
                LogRecord::new(
                    stamp.at,
                    Severity::Trace,
                    ENDED,
                    emit::origin_attributes(&self.function, &self.file, stamp.line),
                ),
            );
        }
        if let Some(mut span) = self.span.take() {
            span.end(stamp.at);
        }
    }

}

/// Span name for a unit: the function, or `file:line` when unresolved.
fn span_name(function: &str, file: &str, line: u32) -> String {
    if function.is_empty() {
        format!("{file}:{line}")
    } else {
        function.to_string()
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("function", &self.function)
            .field("file", &self.file)
            .field("context", &self.context)
            .field("span", &self.span.is_some())
            .field("state", &self.state)
            .finish()
    }
}
