//! Domain errors raised by bridge operations.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors carried inside
//! [`BridgeError`] are wrapped in `Arc` to keep the `Result` payload small.

use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by the line transport while exchanging with the child.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The child closed its output stream.
    #[error("child process closed its output stream")]
    Closed,

    /// No response line arrived within the deadline.
    #[error("no response within {timeout:?}")]
    TimedOut {
        /// The deadline that expired.
        timeout: Duration,
    },
}

/// Errors arising while supervising a plugin process or calling into it.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Writing the responder script to disk failed.
    #[error("failed to materialize responder script: {source}")]
    Script {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The plugin runtime binary was not found.
    #[error("plugin runtime not found: {command}")]
    RuntimeNotFound {
        /// The command that was not found.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The plugin process could not be spawned.
    #[error("plugin '{name}' failed to start: {message}")]
    SpawnFailed {
        /// Plugin name.
        name: String,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying I/O error.
        #[source]
        source: Option<Arc<std::io::Error>>,
    },

    /// The plugin process exited during the startup grace period.
    #[error("plugin '{name}' exited during startup ({status}): {stderr}")]
    StartupExited {
        /// Plugin name.
        name: String,
        /// Exit status reported by the child.
        status: ExitStatus,
        /// Diagnostics captured from the child's stderr.
        stderr: String,
    },

    /// A call was issued while no plugin process is running.
    #[error("plugin '{name}' process is not running")]
    NotRunning {
        /// Plugin name.
        name: String,
    },

    /// The request envelope could not be serialized.
    #[error("failed to serialise request for '{method}': {source}")]
    Encode {
        /// Method being called.
        method: String,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// An I/O failure occurred while exchanging a call.
    #[error("I/O error calling '{method}' on plugin '{name}': {source}")]
    Io {
        /// Plugin name.
        name: String,
        /// Method being called.
        method: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The child closed the pipe while a call was outstanding.
    #[error("plugin '{name}' closed the pipe while '{method}' was outstanding")]
    Disconnected {
        /// Plugin name.
        name: String,
        /// Method being called.
        method: String,
    },

    /// The call deadline expired before a response line arrived.
    #[error("call '{method}' on plugin '{name}' timed out after {timeout:?}")]
    Timeout {
        /// Plugin name.
        name: String,
        /// Method being called.
        method: String,
        /// The deadline that expired.
        timeout: Duration,
    },

    /// The response line could not be parsed as a protocol envelope.
    #[error("invalid response to '{method}' from plugin '{name}': {message}")]
    Decode {
        /// Plugin name.
        name: String,
        /// Method being called.
        method: String,
        /// Description of the parse failure.
        message: String,
    },

    /// The response id does not match the outstanding request id.
    #[error(
        "response id {received:?} does not match request id {expected} \
         for '{method}' on plugin '{name}'"
    )]
    IdMismatch {
        /// Plugin name.
        name: String,
        /// Method being called.
        method: String,
        /// The id that was sent.
        expected: i64,
        /// The id that came back.
        received: Option<i64>,
    },

    /// The plugin answered the call with an error envelope.
    #[error("plugin '{name}' returned error {code} for '{method}': {message}")]
    Remote {
        /// Plugin name.
        name: String,
        /// Method being called.
        method: String,
        /// Protocol error code.
        code: i64,
        /// Error message reported by the plugin.
        message: String,
    },
}

impl BridgeError {
    /// Maps a transport failure into a call error carrying method context.
    #[must_use]
    pub fn from_transport(name: &str, method: &str, error: TransportError) -> Self {
        match error {
            TransportError::Io(source) => Self::Io {
                name: name.to_owned(),
                method: method.to_owned(),
                source: Arc::new(source),
            },
            TransportError::Closed => Self::Disconnected {
                name: name.to_owned(),
                method: method.to_owned(),
            },
            TransportError::TimedOut { timeout } => Self::Timeout {
                name: name.to_owned(),
                method: method.to_owned(),
                timeout,
            },
        }
    }
}
