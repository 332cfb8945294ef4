//! JSON-RPC 2.0 envelope types for the plugin wire protocol.
//!
//! The protocol is line-delimited: one serialized envelope per line, requests
//! on the child's stdin and responses on its stdout. Every request carries an
//! integer id drawn from a [`RequestIdSequence`]; the matching response must
//! echo that id.

use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol version tag carried by every envelope.
pub const PROTOCOL_VERSION: &str = "2.0";

/// Error code reported when the plugin does not expose the requested method.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Error code reported when a plugin method raised while handling a request.
pub const INTERNAL_ERROR: i64 = -32603;

/// Allocator for request ids, monotonically increasing from 1.
///
/// Each bridge owns its own sequence so that ids are unique for the lifetime
/// of that bridge and two plugin processes never share id space.
#[derive(Debug)]
pub struct RequestIdSequence(AtomicI64);

impl RequestIdSequence {
    /// Creates a sequence whose first id is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicI64::new(1))
    }

    /// Returns the next id, advancing the sequence.
    pub fn next_id(&self) -> i64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for RequestIdSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// An outbound request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    /// Protocol version, always "2.0".
    pub jsonrpc: &'static str,
    /// The plugin method to invoke.
    pub method: String,
    /// Keyword arguments for the method; an empty mapping when none.
    pub params: Value,
    /// Correlation id echoed by the response.
    pub id: i64,
}

impl RpcRequest {
    /// Creates a request envelope for the given method, arguments, and id.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Map<String, Value>, id: i64) -> Self {
        Self {
            jsonrpc: PROTOCOL_VERSION,
            method: method.into(),
            params: Value::Object(params),
            id,
        }
    }
}

/// An inbound response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    /// Protocol version as reported by the responder.
    #[serde(default)]
    pub jsonrpc: String,
    /// Correlation id; `null` when the responder could not parse the request.
    #[serde(default)]
    pub id: Option<i64>,
    /// Success payload. Absent when the responder returned no value.
    #[serde(default)]
    pub result: Option<Value>,
    /// Error payload. Present exactly when the call failed.
    #[serde(default)]
    pub error: Option<RpcError>,
}

/// The error member of a response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    /// Protocol error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional data.
    #[serde(default)]
    pub data: Option<Value>,
}
