//! sig - correlated signals from one call site.
//!
//! Instrument a unit of work once and get a trace span, structured log
//! records, and access to metrics from whichever backends are configured:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sig::backend::bridge::{TracingLogger, TracingTracer};
//! use sig::{attrs, Context, Registry};
//!
//! let registry = Arc::new(
//!     Registry::builder()
//!         .tracer(Arc::new(TracingTracer::new()))
//!         .logger(Arc::new(TracingLogger::new()))
//!         .build(),
//! );
//!
//! let mut unit = sig::start!(registry, Context::new());
//! unit.info("processing", &[attrs! { "user_id" => 123 }]);
//! let result = charge();
//! unit.error(result.as_ref().err(), &[]);
//! unit.end();
//! ```
//!
//! # Naming units
//!
//! Prefer [`start!`]: it names the unit after the enclosing function at
//! compile time and works in stripped release builds. [`start`] and
//! [`Registry::start`] find the function name in a captured backtrace, which
//! needs symbols; without them the function stays blank and the span is
//! named `file:line` instead.
//!
//! # Degrading
//!
//! With no tracer and no logger every operation is a no-op. Empty event
//! names and `None` errors are dropped. Nothing here returns an error or
//! interrupts the code being observed.
//!
//! # Feature Flags
//!
//! - `tracing-backend` (default): [`backend::bridge`] onto the `tracing` crate
//! - `release-logs`: Strip debug/trace diagnostics at compile time
//! - `max-perf`: Disable all internal tracing

pub mod attrs;
pub mod backend;
pub mod caller;
pub mod context;
pub mod emit;
pub mod error;
pub mod init;
pub mod registry;
pub mod unit;

pub use attrs::Map;
pub use caller::{BacktraceResolver, Caller, LocationResolver, ResolveCaller};
pub use context::{Context, CorrelationId, SpanContext, SpanId, TraceId};
pub use emit::Severity;
pub use error::InitError;
pub use registry::{configure, install, registry, Registry, RegistryBuilder};
pub use unit::UnitOfWork;

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}

/// Begin a unit of work on the process-wide registry.
#[track_caller]
pub fn start(cx: Context) -> UnitOfWork {
    registry().start(cx)
}

/// Begin a unit of work on the process-wide registry with an explicit caller.
pub fn start_with(cx: Context, caller: Caller) -> UnitOfWork {
    registry().start_with(cx, caller)
}

/// Begin a unit of work named after the enclosing function.
///
/// `start!(cx)` uses the process-wide registry; `start!(registry, cx)` takes
/// an `Arc<Registry>`.
#[macro_export]
macro_rules! start {
    ($registry:expr, $cx:expr $(,)?) => {
        $crate::Registry::start_with(&$registry, $cx, $crate::caller!())
    };
    ($cx:expr $(,)?) => {
        $crate::start_with($cx, $crate::caller!())
    };
}
