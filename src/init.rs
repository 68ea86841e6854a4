//! Subscriber initialization.
//!
//! Installs the `tracing` subscriber that the bridge backends and the
//! crate's own diagnostics write to.

use serde::{Deserialize, Deserializer};
use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::error::InitError;

/// Environment variable holding a filter directive.
pub const FILTER_ENV: &str = "SIG_LOG";
/// Environment variable selecting `compact` or `full` output.
pub const FORMAT_ENV: &str = "SIG_LOG_FORMAT";

/// Configuration for subscriber initialization.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubscriberConfig {
    /// Default log level
    #[serde(deserialize_with = "deserialize_level")]
    pub default_level: Level,
    /// Whether to include span enter/exit events
    pub include_span_events: bool,
    /// Whether to include file and line numbers
    pub include_file_line: bool,
    /// Whether to include the target (module path)
    pub include_target: bool,
    /// Whether to use ANSI colors
    pub ansi_colors: bool,
    /// Whether to use compact format
    pub compact: bool,
    /// Custom filter directive (overrides default_level if set)
    pub filter_directive: Option<String>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            include_span_events: false,
            include_file_line: false,
            include_target: true,
            ansi_colors: true,
            compact: true,
            filter_directive: None,
        }
    }
}

impl SubscriberConfig {
    /// Create a development configuration (everything `sig` emits).
    pub fn development() -> Self {
        Self {
            default_level: Level::TRACE,
            include_span_events: true,
            include_file_line: true,
            include_target: true,
            ansi_colors: true,
            compact: false,
            filter_directive: None,
        }
    }

    /// Create a production configuration (minimal overhead).
    pub fn production() -> Self {
        Self {
            default_level: Level::WARN,
            include_span_events: false,
            include_file_line: false,
            include_target: false,
            ansi_colors: false,
            compact: true,
            filter_directive: None,
        }
    }

    /// Default configuration adjusted by `SIG_LOG` and `SIG_LOG_FORMAT`.
    pub fn from_env() -> Result<Self, InitError> {
        Self::default().with_overrides(
            std::env::var(FILTER_ENV).ok(),
            std::env::var(FORMAT_ENV).ok(),
        )
    }

    /// Apply a filter directive and an output format name, if given.
    pub fn with_overrides(
        mut self,
        filter: Option<String>,
        format: Option<String>,
    ) -> Result<Self, InitError> {
        if let Some(filter) = filter.filter(|f| !f.trim().is_empty()) {
            self.filter_directive = Some(filter);
        }
        if let Some(format) = format {
            self.compact = match format.trim().to_ascii_lowercase().as_str() {
                "compact" => true,
                "full" => false,
                _ => return Err(InitError::UnknownFormat(format)),
            };
        }
        Ok(self)
    }

    fn env_filter(&self) -> Result<EnvFilter, InitError> {
        if let Some(ref directive) = self.filter_directive {
            return Ok(EnvFilter::try_new(directive)?);
        }
        Ok(EnvFilter::from_default_env()
            .add_directive(self.default_level.into())
            .add_directive(format!("sig={}", self.default_level).parse()?))
    }
}

fn deserialize_level<'de, D>(deserializer: D) -> Result<Level, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse::<Level>().map_err(serde::de::Error::custom)
}

/// Guard that keeps the subscriber active.
pub struct SubscriberGuard {
    #[allow(dead_code)]
    _private: (),
}

/// Install the global subscriber described by `config`.
///
/// Returns a guard that must be kept alive for the duration of the application.
///
/// # Example
///
/// ```rust,ignore
/// use sig::init::{init_subscriber, SubscriberConfig};
///
/// fn main() -> anyhow::Result<()> {
///     let config = SubscriberConfig::from_env()?;
///     let _guard = init_subscriber(&config)?;
///
///     // Application code...
///     Ok(())
/// }
/// ```
pub fn init_subscriber(config: &SubscriberConfig) -> Result<SubscriberGuard, InitError> {
    let filter = config.env_filter()?;

    let span_events = if config.include_span_events {
        fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE
    } else {
        fmt::format::FmtSpan::NONE
    };

    let fmt_layer = fmt::layer()
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .with_file(config.include_file_line)
        .with_line_number(config.include_file_line)
        .with_span_events(span_events);

    let fmt_layer = if config.compact {
        fmt_layer.compact().boxed()
    } else {
        fmt_layer.boxed()
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer);

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(SubscriberGuard { _private: () })
}
