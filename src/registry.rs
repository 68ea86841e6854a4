//! Capability registry: which backends are present, and the handles to them.
//!
//! A [`Registry`] is immutable once built. Units of work hold an `Arc` to the
//! registry they were started from, so reconfiguring later never changes the
//! behavior of a unit that is already running.
//!
//! A process-wide registry backs [`configure`] and [`crate::start`] for
//! applications that prefer to wire backends once at startup.

use once_cell::sync::Lazy;
use std::fmt;
use std::panic::Location;
use std::sync::{Arc, PoisonError, RwLock};

use crate::backend::{Logger, Meter, Tracer};
use crate::caller::{BacktraceResolver, Caller, ResolveCaller};
use crate::context::Context;
use crate::emit::Stamp;
use crate::unit::UnitOfWork;

/// Backends available to units of work. Each is either present or absent.
#[derive(Clone)]
pub struct Registry {
    tracer: Option<Arc<dyn Tracer>>,
    meter: Option<Arc<dyn Meter>>,
    logger: Option<Arc<dyn Logger>>,
    resolver: Arc<dyn ResolveCaller>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// A registry with no backends. Every unit of work started from it is inert.
    pub fn disabled() -> Self {
        Self {
            tracer: None,
            meter: None,
            logger: None,
            resolver: Arc::new(BacktraceResolver),
        }
    }

    pub fn tracing_enabled(&self) -> bool {
        self.tracer.is_some()
    }

    pub fn metrics_enabled(&self) -> bool {
        self.meter.is_some()
    }

    pub fn logging_enabled(&self) -> bool {
        self.logger.is_some()
    }

    /// Whether a unit of work started here emits anything at all.
    ///
    /// Metrics alone do not count: units of work never call the meter.
    pub fn is_observed(&self) -> bool {
        self.tracing_enabled() || self.logging_enabled()
    }

    pub fn tracer(&self) -> Option<&Arc<dyn Tracer>> {
        self.tracer.as_ref()
    }

    pub fn meter(&self) -> Option<&Arc<dyn Meter>> {
        self.meter.as_ref()
    }

    pub fn logger(&self) -> Option<&Arc<dyn Logger>> {
        self.logger.as_ref()
    }

    /// A copy with each given backend replaced; `None` keeps the current one.
    pub fn merge(
        &self,
        tracer: Option<Arc<dyn Tracer>>,
        meter: Option<Arc<dyn Meter>>,
        logger: Option<Arc<dyn Logger>>,
    ) -> Self {
        Self {
            tracer: tracer.or_else(|| self.tracer.clone()),
            meter: meter.or_else(|| self.meter.clone()),
            logger: logger.or_else(|| self.logger.clone()),
            resolver: self.resolver.clone(),
        }
    }

    /// Begin a unit of work as a child of `cx`.
    ///
    /// The caller identity is the code calling this method.
    #[track_caller]
    pub fn start(self: &Arc<Self>, cx: Context) -> UnitOfWork {
        let site = Location::caller();
        if !self.is_observed() {
            return UnitOfWork::inert(self.clone(), cx);
        }
        let stamp = Stamp::now(site.line());
        let caller = self.resolver.resolve(site);
        UnitOfWork::open(self.clone(), cx, caller, stamp)
    }

    /// Begin a unit of work with an explicitly supplied caller identity.
    pub fn start_with(self: &Arc<Self>, cx: Context, caller: Caller) -> UnitOfWork {
        if !self.is_observed() {
            return UnitOfWork::inert(self.clone(), cx);
        }
        let stamp = Stamp::now(caller.line);
        UnitOfWork::open(self.clone(), cx, caller, stamp)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::disabled()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("tracing", &self.tracing_enabled())
            .field("metrics", &self.metrics_enabled())
            .field("logging", &self.logging_enabled())
            .finish()
    }
}

/// Builder for [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    tracer: Option<Arc<dyn Tracer>>,
    meter: Option<Arc<dyn Meter>>,
    logger: Option<Arc<dyn Logger>>,
    resolver: Option<Arc<dyn ResolveCaller>>,
}

impl RegistryBuilder {
    pub fn tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn meter(mut self, meter: Arc<dyn Meter>) -> Self {
        self.meter = Some(meter);
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Replace the default [`BacktraceResolver`].
    pub fn resolver(mut self, resolver: Arc<dyn ResolveCaller>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            tracer: self.tracer,
            meter: self.meter,
            logger: self.logger,
            resolver: self
                .resolver
                .unwrap_or_else(|| Arc::new(BacktraceResolver)),
        }
    }
}

/// Process-wide registry instance.
static GLOBAL_REGISTRY: Lazy<RwLock<Arc<Registry>>> =
    Lazy::new(|| RwLock::new(Arc::new(Registry::disabled())));

/// Set process-wide backends. A `None` argument leaves that backend as it was.
///
/// Meant to be called during startup, before any unit of work begins.
pub fn configure(
    tracer: Option<Arc<dyn Tracer>>,
    meter: Option<Arc<dyn Meter>>,
    logger: Option<Arc<dyn Logger>>,
) {
    let mut current = GLOBAL_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    let merged = current.merge(tracer, meter, logger);
    *current = Arc::new(merged);
}

/// Replace the process-wide registry wholesale.
pub fn install(registry: Registry) {
    *GLOBAL_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner) = Arc::new(registry);
}

/// Snapshot of the process-wide registry.
pub fn registry() -> Arc<Registry> {
    GLOBAL_REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryLogger, MemoryMeter, MemoryTracer};

    #[test]
    fn test_disabled_registry() {
        let registry = Registry::disabled();
        assert!(!registry.tracing_enabled());
        assert!(!registry.metrics_enabled());
        assert!(!registry.logging_enabled());
        assert!(!registry.is_observed());
    }

    #[test]
    fn test_builder_flags_follow_handles() {
        let registry = Registry::builder()
            .logger(Arc::new(MemoryLogger::new()))
            .build();
        assert!(registry.logging_enabled());
        assert!(registry.logger().is_some());
        assert!(!registry.tracing_enabled());
        assert!(registry.tracer().is_none());
        assert!(registry.is_observed());
    }

    #[test]
    fn test_metrics_only_is_not_observed() {
        let registry = Registry::builder().meter(Arc::new(MemoryMeter::new())).build();
        assert!(registry.metrics_enabled());
        assert!(!registry.is_observed());
    }

    #[test]
    fn test_merge_overwrites_only_present() {
        let first: Arc<dyn Logger> = Arc::new(MemoryLogger::new());
        let second: Arc<dyn Logger> = Arc::new(MemoryLogger::new());
        let base = Registry::builder().logger(first.clone()).build();

        let kept = base.merge(Some(Arc::new(MemoryTracer::new())), None, None);
        assert!(kept.tracing_enabled());
        assert!(Arc::ptr_eq(kept.logger().unwrap(), &first));

        let replaced = kept.merge(None, None, Some(second.clone()));
        assert!(replaced.tracing_enabled());
        assert!(Arc::ptr_eq(replaced.logger().unwrap(), &second));
    }

    #[test]
    fn test_debug_shows_flags() {
        let registry = Registry::builder().tracer(Arc::new(MemoryTracer::new())).build();
        let rendered = format!("{registry:?}");
        assert!(rendered.contains("tracing: true"));
        assert!(rendered.contains("logging: false"));
    }
}
