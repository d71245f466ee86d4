//! Error types for the Strata loading library.
//!
//! All errors raised by the loading pipeline, the format decoders and the
//! scoped configuration store are represented by [`StrataError`], derived
//! with `thiserror`.

use thiserror::Error;

/// The main error type for the Strata library.
#[derive(Error, Debug)]
pub enum StrataError {
    /// A location used a scheme that no loader handles.
    #[error("cannot handle the URI scheme: {scheme}")]
    UnsupportedScheme {
        /// The offending scheme, e.g. `ftp`
        scheme: String,
    },

    /// A source ended before a complete field could be decoded.
    #[error("{0}")]
    Translation(String),

    /// The number of merged cubes did not match the caller's expectation.
    #[error("{0}")]
    ConstraintMismatch(String),

    /// `load_cube` was given something other than exactly one constraint.
    #[error("only a single constraint is allowed (found {found})")]
    Arity {
        /// Number of constraints actually supplied
        found: usize,
    },

    /// An option name outside the fixed `Future` option set.
    #[error("'Future' object has no attribute '{name}'")]
    UnknownOption {
        /// The rejected option name
        name: String,
    },

    /// Raised by decoders on truncated or empty sources.
    ///
    /// The load entry points never return this variant; they rewrite it as
    /// [`StrataError::Translation`].
    #[error("unexpected end of stream: {0}")]
    UnexpectedEof(String),

    /// A location string could not be decoded.
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// Error from a loader or format decoder.
    #[error("Data source error: {message}")]
    DataSource {
        /// Kind of source (e.g. "file", "json", "http")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from JSON (de)serialisation.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from network requests.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Error when an operation is not supported.
    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

/// A type alias for `Result<T, StrataError>`.
pub type Result<T> = std::result::Result<T, StrataError>;

impl StrataError {
    /// Creates a new data source error.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new data source error with a source error.
    pub fn data_source_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Rewrites a premature end of stream as a [`StrataError::Translation`].
    ///
    /// Every other error passes through untouched.
    pub fn into_translation(self) -> Self {
        match self {
            Self::UnexpectedEof(detail) => Self::Translation(format!(
                "The file appears empty or incomplete: {detail:?}"
            )),
            other => other,
        }
    }

    /// Prefixes the message with `msg`, keeping end-of-stream signals intact.
    pub(crate) fn in_context(self, msg: &str) -> Self {
        match self {
            Self::UnexpectedEof(detail) => Self::UnexpectedEof(format!("{msg}: {detail}")),
            Self::DataSource {
                source_type,
                message,
                source,
            } => Self::DataSource {
                source_type,
                message: format!("{msg}: {message}"),
                source,
            },
            other => Self::data_source_with_source("context", msg, Box::new(other)),
        }
    }

    /// Returns true if this is a premature end-of-stream signal.
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::UnexpectedEof(_))
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<StrataError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| e.into().in_context(msg))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().in_context(&f()))
    }
}
