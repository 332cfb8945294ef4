//! Plugin loading and dispatch for the tether host.
//!
//! The `tether-plugins` crate sits on top of `tether-bridge` and gives the
//! host a typed view of a plugin package: the parsed `package.json`
//! descriptor, the declared [`PermissionSet`], and a [`PluginFacade`] that
//! drives the responder process through its fixed lifecycle (`initialize`,
//! `cleanup`, `health_check`) and forwards the functions the plugin
//! declared via `get_mcp_functions`.
//!
//! Permissions are parsed and exposed here but enforced by the host's
//! policy layer, not by this crate. Every facade owns its own bridge, so
//! independently loaded plugins share no state and fail independently.
//!
//! # Example
//!
//! ```rust,no_run
//! use serde_json::Map;
//! use tether_bridge::BridgeConfig;
//! use tether_plugins::NpmPlugin;
//!
//! let mut plugin = NpmPlugin::open(
//!     "/opt/plugins/browser-tools",
//!     BridgeConfig::node_default(),
//! )?;
//! if plugin.initialize(&Map::new()) {
//!     for name in plugin.functions() {
//!         println!("plugin exposes {name}");
//!     }
//! }
//! plugin.cleanup();
//! # Ok::<(), tether_plugins::PluginError>(())
//! ```

pub mod descriptor;
pub mod error;
pub mod facade;
pub mod permissions;
pub mod registry;

#[cfg(test)]
mod tests;

pub use self::descriptor::{
    DESCRIPTOR_FILE, PackageDescriptor, PluginCapability, PluginMetadata,
};
pub use self::error::PluginError;
pub use self::facade::{NpmPlugin, PluginFacade, is_truthy};
pub use self::permissions::PermissionSet;
pub use self::registry::PluginRegistry;
