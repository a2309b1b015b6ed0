use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Failure to install the global subscriber.
#[derive(Error, Debug)]
pub enum LoggingError {
    /// The filter directive could not be parsed.
    #[error("invalid log level {level:?}: {source}")]
    InvalidLogLevel {
        /// The rejected directive.
        level: String,
        /// Parser error.
        source: tracing_subscriber::filter::ParseError,
    },

    /// A global subscriber is already installed.
    #[error("failed to initialize logging: {0}")]
    Initialization(#[from] tracing_subscriber::util::TryInitError),
}

/// Builds the filter for a `LOG_LEVEL` style directive such as `info` or `finder=debug,warn`.
///
/// # Errors
///
/// Returns `LoggingError::InvalidLogLevel` if the directive does not parse.
pub fn filter(level: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(level).map_err(|source| LoggingError::InvalidLogLevel {
        level: level.to_string(),
        source,
    })
}

/// Installs a human-readable console subscriber filtered by `level`.
///
/// # Errors
///
/// Returns a `LoggingError` if the level is invalid or logging was already initialized.
pub fn init_logging(level: &str) -> Result<(), LoggingError> {
    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(filter(level)?)
        .with(console_layer)
        .try_init()?;
    Ok(())
}
