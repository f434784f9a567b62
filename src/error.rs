//! Unified error types for gatekeeper.
//!
//! Guards never surface these errors to the agent directly: a guard that
//! cannot read its inputs degrades to a documented verdict (see
//! [`crate::guards`]). Errors propagate only out of the trace commands
//! (`store`, `query`, `init`, `outcome`), where configuration and transport
//! failures are fatal.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for gatekeeper operations.
#[derive(Error, Debug)]
pub enum GateError {
    /// I/O errors from state, evidence, or collection files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Missing credential or invalid configuration.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Embedding provider unreachable or rejected the request.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// A vector did not match the collection dimensionality.
    #[error("dimension mismatch: collection expects {expected} dimensions, got {actual}")]
    Dimension { expected: usize, actual: usize },

    /// No trace with the given id exists in the collection.
    #[error("trace not found: {trace_id}")]
    TraceNotFound { trace_id: String },

    /// An outcome update that the trace lifecycle does not allow.
    #[error("invalid outcome update: {message}")]
    InvalidOutcome { message: String },

    /// Caller supplied an unusable argument.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

/// A specialized Result type for gatekeeper operations.
pub type Result<T> = std::result::Result<T, GateError>;

impl GateError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a dimension mismatch error.
    pub fn dimension(expected: usize, actual: usize) -> Self {
        Self::Dimension { expected, actual }
    }

    /// Create a trace not found error.
    pub fn trace_not_found(trace_id: impl Into<String>) -> Self {
        Self::TraceNotFound {
            trace_id: trace_id.into(),
        }
    }

    /// Create an invalid outcome error.
    pub fn invalid_outcome(message: impl Into<String>) -> Self {
        Self::InvalidOutcome {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Whether this error came from reading malformed data.
    ///
    /// Guards treat these as "cannot interpret" and fail open.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Serde { .. })
    }
}

impl From<io::Error> for GateError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for GateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Log the error and continue with a safe default instead of propagating.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the gatekeeper CLI.
///
/// Hook invocations report their verdict through the exit code; the agent
/// harness treats 2 as a hard block and shows stderr to the agent.
pub mod exit_codes {
    /// The attempted write may proceed.
    pub const ALLOW: i32 = 0;

    /// Non-blocking diagnostic (hooks only).
    pub const ADVISORY: i32 = 1;

    /// A command failed (configuration, transport, storage).
    pub const ERROR: i32 = 1;

    /// The attempted write is vetoed.
    pub const BLOCK: i32 = 2;

    /// Panic; the harness treats it as a non-blocking error.
    pub const CRASH: i32 = 3;
}
