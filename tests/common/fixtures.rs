//! Test fixtures wiring recording backends into a registry.
//!
//! Provides a `SignalsBuilder` for picking which backends are present,
//! keeping handles to the recording backends for assertions.

use std::sync::Arc;

use sig::backend::memory::{MemoryLogger, MemoryMeter, MemoryTracer};
use sig::{LocationResolver, Registry};

/// A registry plus handles to everything its backends recorded.
pub struct SignalsFixture {
    pub registry: Arc<Registry>,
    pub tracer: MemoryTracer,
    pub logger: MemoryLogger,
    pub meter: MemoryMeter,
}

impl SignalsFixture {
    /// Span operations plus log records received so far.
    pub fn backend_calls(&self) -> usize {
        self.tracer.operation_count() + self.logger.records().len()
    }
}

/// Builder choosing which backends the fixture registry carries.
#[derive(Default)]
pub struct SignalsBuilder {
    tracing: bool,
    logging: bool,
    metrics: bool,
    location_only: bool,
}

impl SignalsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracing(mut self) -> Self {
        self.tracing = true;
        self
    }

    pub fn logging(mut self) -> Self {
        self.logging = true;
        self
    }

    pub fn metrics(mut self) -> Self {
        self.metrics = true;
        self
    }

    /// Resolve callers from `#[track_caller]` alone, without backtraces.
    pub fn location_only(mut self) -> Self {
        self.location_only = true;
        self
    }

    pub fn build(self) -> SignalsFixture {
        let tracer = MemoryTracer::new();
        let logger = MemoryLogger::new();
        let meter = MemoryMeter::new();

        let mut builder = Registry::builder();
        if self.tracing {
            builder = builder.tracer(Arc::new(tracer.clone()));
        }
        if self.logging {
            builder = builder.logger(Arc::new(logger.clone()));
        }
        if self.metrics {
            builder = builder.meter(Arc::new(meter.clone()));
        }
        if self.location_only {
            builder = builder.resolver(Arc::new(LocationResolver));
        }

        SignalsFixture {
            registry: Arc::new(builder.build()),
            tracer,
            logger,
            meter,
        }
    }
}

/// Tracing and logging, both recording.
pub fn both() -> SignalsFixture {
    SignalsBuilder::new().tracing().logging().build()
}
