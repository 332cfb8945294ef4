//! Host-side facade for one loaded plugin.
//!
//! A [`PluginFacade`] owns the plugin's parsed identity, its declared
//! permissions, and the channel to its responder process. It drives the
//! fixed lifecycle methods (`initialize`, `cleanup`, `health_check`) and
//! turns the names discovered via `get_mcp_functions` into host-callable
//! operations.
//!
//! The facade is the failure boundary: everything below it reports errors
//! as values, and the facade converts lifecycle failures into logged
//! booleans. Only [`PluginFacade::call_function`] surfaces an error to the
//! caller, carrying the plugin's own message. Each facade owns its own
//! bridge and function table, so two loaded plugin instances never share
//! state.

use std::collections::BTreeSet;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use tether_bridge::{BridgeConfig, BridgeError, PluginBridge, PluginChannel};

use crate::descriptor::{PackageDescriptor, PluginMetadata};
use crate::error::PluginError;
use crate::permissions::PermissionSet;

/// Tracing target for facade operations.
const FACADE_TARGET: &str = "tether_plugins::facade";

/// A loaded plugin: identity, permissions, and its callable surface.
pub struct PluginFacade<C> {
    metadata: PluginMetadata,
    permissions: PermissionSet,
    channel: C,
    functions: BTreeSet<String>,
    initialized: bool,
}

/// Production facade driving a Node.js plugin package.
pub type NpmPlugin = PluginFacade<PluginBridge>;

impl NpmPlugin {
    /// Opens the plugin package at `package_dir`.
    ///
    /// Reads the package descriptor and builds the process bridge, but does
    /// not start any process; call [`PluginFacade::initialize`] for that.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] when the descriptor is missing or invalid.
    pub fn open(package_dir: impl AsRef<Path>, config: BridgeConfig) -> Result<Self, PluginError> {
        let dir = package_dir.as_ref();
        let descriptor = PackageDescriptor::load(dir)?;
        let metadata = descriptor.metadata();
        let permissions = descriptor.permissions();
        let bridge = PluginBridge::new(metadata.name().to_owned(), dir, config);
        Ok(Self::with_channel(metadata, permissions, bridge))
    }
}

impl<C: PluginChannel> PluginFacade<C> {
    /// Builds a facade over a prepared channel.
    #[must_use]
    pub const fn with_channel(
        metadata: PluginMetadata,
        permissions: PermissionSet,
        channel: C,
    ) -> Self {
        Self {
            metadata,
            permissions,
            channel,
            functions: BTreeSet::new(),
            initialized: false,
        }
    }

    /// Returns the plugin's parsed identity.
    #[must_use]
    pub const fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    /// Returns the plugin's declared permissions.
    #[must_use]
    pub const fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Returns whether `initialize` has completed successfully.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Names of the plugin functions discovered at initialization.
    #[must_use]
    pub const fn functions(&self) -> &BTreeSet<String> {
        &self.functions
    }

    /// Returns the underlying channel, for supervision-level access.
    #[must_use]
    pub const fn channel(&self) -> &C {
        &self.channel
    }

    /// Starts the plugin process and performs the `initialize` handshake.
    ///
    /// Returns `true` only when both the process start and the `initialize`
    /// call succeed. Function discovery runs afterwards; a discovery failure
    /// is logged and leaves the facade with zero functions, but does not
    /// retroactively fail initialization. Failures are logged, never raised,
    /// and there is no automatic retry.
    pub fn initialize(&mut self, host_config: &Map<String, Value>) -> bool {
        match self.try_initialize(host_config) {
            Ok(()) => {
                self.initialized = true;
                info!(
                    target: FACADE_TARGET,
                    plugin = %self.metadata.name(),
                    functions = self.functions.len(),
                    "plugin initialized"
                );
                true
            }
            Err(err) => {
                error!(
                    target: FACADE_TARGET,
                    plugin = %self.metadata.name(),
                    error = %err,
                    "plugin initialization failed"
                );
                false
            }
        }
    }

    fn try_initialize(&mut self, host_config: &Map<String, Value>) -> Result<(), PluginError> {
        self.channel.start()?;

        let mut params = Map::new();
        params.insert(
            String::from("config"),
            Value::Object(host_config.clone()),
        );
        self.channel.call("initialize", params)?;

        self.load_functions();
        Ok(())
    }

    /// Discovers the plugin's callable surface via `get_mcp_functions`.
    fn load_functions(&mut self) {
        match self.channel.call("get_mcp_functions", Map::new()) {
            Ok(value) => {
                self.functions = function_names(&value);
                debug!(
                    target: FACADE_TARGET,
                    plugin = %self.metadata.name(),
                    count = self.functions.len(),
                    "discovered plugin functions"
                );
            }
            Err(err) => {
                warn!(
                    target: FACADE_TARGET,
                    plugin = %self.metadata.name(),
                    error = %err,
                    "failed to discover plugin functions"
                );
                self.functions.clear();
            }
        }
    }

    /// Asks the plugin to clean up, then stops its process.
    ///
    /// The `cleanup` call is best-effort: its result is ignored and its
    /// failure logged, because shutdown must always proceed.
    pub fn cleanup(&mut self) {
        if self.channel.is_running() {
            if let Err(err) = self.channel.call("cleanup", Map::new()) {
                debug!(
                    target: FACADE_TARGET,
                    plugin = %self.metadata.name(),
                    error = %err,
                    "cleanup call failed"
                );
            }
        }
        self.channel.stop();
        self.initialized = false;
    }

    /// Returns `true` only when the `health_check` call succeeds and its
    /// payload is truthy.
    ///
    /// A dead or unresponsive plugin yields `false`, never an error.
    pub fn health_check(&self) -> bool {
        match self.channel.call("health_check", Map::new()) {
            Ok(value) => is_truthy(&value),
            Err(err) => {
                debug!(
                    target: FACADE_TARGET,
                    plugin = %self.metadata.name(),
                    error = %err,
                    "health check failed"
                );
                false
            }
        }
    }

    /// Invokes a discovered plugin function with keyword arguments.
    ///
    /// Only names returned by the plugin's `get_mcp_functions` are callable;
    /// anything else fails without touching the wire.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::UnknownFunction`] for undiscovered names and
    /// [`PluginError::Function`] carrying the plugin's failure message when
    /// the forwarded call fails.
    pub fn call_function(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, PluginError> {
        if !self.functions.contains(name) {
            return Err(PluginError::UnknownFunction {
                plugin: self.metadata.name().to_owned(),
                function: name.to_owned(),
            });
        }

        self.channel
            .call(name, arguments)
            .map_err(|err| PluginError::Function {
                plugin: self.metadata.name().to_owned(),
                function: name.to_owned(),
                message: failure_message(err),
            })
    }
}

impl<C> std::fmt::Debug for PluginFacade<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginFacade")
            .field("name", &self.metadata.name())
            .field("initialized", &self.initialized)
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

/// The plugin's own message for remote failures, the bridge description
/// otherwise.
fn failure_message(error: BridgeError) -> String {
    match error {
        BridgeError::Remote { message, .. } => message,
        other => other.to_string(),
    }
}

/// Extracts the declared function names from a discovery payload.
///
/// Non-array payloads and non-string entries yield no names.
fn function_names(value: &Value) -> BTreeSet<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

/// Truthiness of a JSON payload: `null`, `false`, zero, and empty
/// containers are falsy, everything else is truthy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(entries) => !entries.is_empty(),
    }
}
