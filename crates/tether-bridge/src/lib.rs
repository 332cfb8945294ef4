//! Process bridge for driving plugins over JSON-RPC on standard streams.
//!
//! The `tether-bridge` crate implements the host side of the plugin
//! protocol: it materializes the Node.js responder shim that turns an
//! arbitrary plugin module into a line-oriented JSON-RPC responder, spawns
//! and supervises the child process running that shim, and exchanges
//! correlated request/response lines over the child's stdin and stdout.
//!
//! # Architecture
//!
//! - [`script`]: generates the responder shim and writes it to a temporary
//!   file that lives as long as the process run.
//! - [`config::BridgeConfig`]: runtime command, startup grace period, and
//!   per-call deadline.
//! - [`jsonrpc`]: the wire envelopes and the per-bridge request id sequence.
//! - [`transport::LineTransport`]: newline-delimited payloads over the
//!   child's streams, with a background reader so receives honour a
//!   deadline.
//! - [`process::PluginBridge`]: owns one child process and its streams,
//!   from spawn through graceful termination.
//! - [`channel::PluginChannel`]: the call seam the plugin facade layer
//!   programs against.
//!
//! A hung plugin blocks only calls addressed to it, and only until the
//! configured deadline; recovery from any transport failure is `stop`
//! followed by a fresh `start`, which replaces the child process. Pending
//! calls are never carried across that boundary.
//!
//! # Example
//!
//! ```rust,no_run
//! use serde_json::Map;
//! use tether_bridge::{BridgeConfig, PluginBridge, PluginChannel};
//!
//! let bridge = PluginBridge::new(
//!     "browser-tools",
//!     "/opt/plugins/browser-tools",
//!     BridgeConfig::node_default(),
//! );
//! bridge.start()?;
//! let functions = bridge.call("get_mcp_functions", Map::new())?;
//! bridge.stop();
//! # Ok::<(), tether_bridge::BridgeError>(())
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod jsonrpc;
pub mod process;
pub mod script;
pub mod state;
pub mod transport;

#[cfg(test)]
mod tests;

pub use self::channel::PluginChannel;
pub use self::config::{BridgeConfig, ResponderSource};
pub use self::error::{BridgeError, TransportError};
pub use self::jsonrpc::{
    INTERNAL_ERROR, METHOD_NOT_FOUND, PROTOCOL_VERSION, RequestIdSequence, RpcError, RpcRequest,
    RpcResponse,
};
pub use self::process::PluginBridge;
pub use self::script::{MaterializedScript, materialize_shim, shim_source};
pub use self::state::ProcessState;
pub use self::transport::{LineTransport, Transport};
