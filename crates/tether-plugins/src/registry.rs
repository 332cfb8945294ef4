//! Registry of loaded plugins.
//!
//! The [`PluginRegistry`] stores facades keyed by plugin name. Each entry
//! owns its own process bridge, so plugins fail and shut down independently:
//! one misbehaving plugin never prevents the others from operating.

use std::collections::BTreeMap;

use tracing::debug;

use tether_bridge::PluginChannel;

use crate::error::PluginError;
use crate::facade::PluginFacade;

/// Tracing target for registry operations.
const REGISTRY_TARGET: &str = "tether_plugins::registry";

/// Name-keyed storage of loaded plugins.
///
/// Iteration order is the lexical order of plugin names, which keeps
/// shutdown deterministic.
#[derive(Debug, Default)]
pub struct PluginRegistry<C> {
    plugins: BTreeMap<String, PluginFacade<C>>,
}

impl<C: PluginChannel> PluginRegistry<C> {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            plugins: BTreeMap::new(),
        }
    }

    /// Registers a loaded plugin under its metadata name.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::AlreadyRegistered`] when a plugin with the
    /// same name is present.
    pub fn register(&mut self, plugin: PluginFacade<C>) -> Result<(), PluginError> {
        let name = plugin.metadata().name().to_owned();
        if self.plugins.contains_key(&name) {
            return Err(PluginError::AlreadyRegistered { name });
        }
        debug!(target: REGISTRY_TARGET, plugin = %name, "registered plugin");
        self.plugins.insert(name, plugin);
        Ok(())
    }

    /// Looks up a plugin by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PluginFacade<C>> {
        self.plugins.get(name)
    }

    /// Looks up a plugin by name for mutation.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut PluginFacade<C>> {
        self.plugins.get_mut(name)
    }

    /// Removes a plugin, cleaning it up first.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotRegistered`] when no plugin with the given
    /// name is present.
    pub fn remove(&mut self, name: &str) -> Result<(), PluginError> {
        let mut plugin = self
            .plugins
            .remove(name)
            .ok_or_else(|| PluginError::NotRegistered {
                name: name.to_owned(),
            })?;
        plugin.cleanup();
        Ok(())
    }

    /// Returns the registered plugin names in lexical order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    /// Returns the number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` when no plugins are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Cleans up and drops every plugin.
    ///
    /// Cleanup is per-plugin and infallible, so one plugin failing to shut
    /// down cleanly never blocks the rest.
    pub fn shutdown_all(&mut self) {
        for (name, plugin) in &mut self.plugins {
            debug!(target: REGISTRY_TARGET, plugin = %name, "shutting down plugin");
            plugin.cleanup();
        }
        self.plugins.clear();
    }
}
