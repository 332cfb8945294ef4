//! Domain errors raised by plugin loading and dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use tether_bridge::BridgeError;

/// Errors arising from plugin descriptor handling and function dispatch.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The package descriptor file does not exist.
    #[error("package descriptor not found at '{}'", path.display())]
    DescriptorNotFound {
        /// Path that was checked.
        path: PathBuf,
    },

    /// The package descriptor could not be read.
    #[error("failed to read package descriptor at '{}': {source}", path.display())]
    DescriptorRead {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The package descriptor is not valid JSON.
    #[error("invalid package descriptor at '{}': {source}", path.display())]
    DescriptorParse {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A plugin with the same name is already registered.
    #[error("plugin '{name}' is already registered")]
    AlreadyRegistered {
        /// The duplicate name.
        name: String,
    },

    /// No plugin with the given name is registered.
    #[error("plugin '{name}' is not registered")]
    NotRegistered {
        /// Name that was looked up.
        name: String,
    },

    /// The plugin does not expose the requested function.
    #[error("plugin '{plugin}' does not expose function '{function}'")]
    UnknownFunction {
        /// Plugin name.
        plugin: String,
        /// Function that was requested.
        function: String,
    },

    /// A forwarded plugin function failed.
    ///
    /// `message` carries the plugin's own failure message verbatim when the
    /// plugin reported one, or the transport failure description otherwise.
    #[error("function '{function}' on plugin '{plugin}' failed: {message}")]
    Function {
        /// Plugin name.
        plugin: String,
        /// Function that was invoked.
        function: String,
        /// The failure message.
        message: String,
    },

    /// A bridge operation failed outside function dispatch.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}
