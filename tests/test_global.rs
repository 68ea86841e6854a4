//! Process-wide registry tests.
//!
//! Kept to a single test so the shared registry is mutated in one order.

use std::sync::Arc;

use sig::backend::memory::{MemoryLogger, MemoryMeter, MemoryTracer};
use sig::{attrs, Context, Registry};

#[test]
fn test_configure_and_start() {
    // Nothing configured yet: units are inert.
    assert!(!sig::registry().is_observed());
    let mut unit = sig::start(Context::new());
    unit.info("nobody hears this", &[]);
    unit.end();

    // Logging only.
    let logger = MemoryLogger::new();
    sig::configure(None, None, Some(Arc::new(logger.clone())));
    assert!(sig::registry().logging_enabled());
    assert!(!sig::registry().tracing_enabled());

    let mut unit = sig::start(Context::new());
    unit.info("processing", &[attrs! { "user_id" => 123 }]);
    unit.end();
    assert_eq!(logger.bodies(), ["started", "processing", "ended"]);

    // Adding a tracer keeps the logger.
    let tracer = MemoryTracer::new();
    sig::configure(Some(Arc::new(tracer.clone())), Some(Arc::new(MemoryMeter::new())), None);
    let registry = sig::registry();
    assert!(registry.tracing_enabled());
    assert!(registry.metrics_enabled());
    assert!(registry.logging_enabled());

    logger.reset();
    let mut unit = sig::start!(Context::new());
    unit.warn("slow", &[]);
    unit.end();
    assert_eq!(tracer.spans().len(), 1);
    assert!(tracer.spans()[0].name.ends_with("test_configure_and_start"));
    assert_eq!(logger.bodies(), ["started", "slow", "ended"]);

    // A unit started before reconfiguration keeps its registry.
    let mut early = sig::start(Context::new());
    sig::install(Registry::disabled());
    early.info("still observed", &[]);
    early.end();
    assert_eq!(logger.bodies().last().map(String::as_str), Some("ended"));
    assert!(!sig::registry().is_observed());
}
