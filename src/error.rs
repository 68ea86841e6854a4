use thiserror::Error;

/// Errors from setting up a `tracing` subscriber.
///
/// Units of work never fail; only process setup can.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("Invalid filter directive: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Unknown log format '{0}' (expected compact or full)")]
    UnknownFormat(String),

    #[error("Global subscriber already installed: {0}")]
    AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),
}
