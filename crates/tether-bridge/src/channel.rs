//! The RPC call channel over a running plugin process.
//!
//! A call is one complete round trip: allocate the next request id, write
//! one envelope line, read exactly one response line under the configured
//! deadline, and correlate it back by id. The state lock is held for the
//! whole exchange, so calls against the same bridge are serialized and
//! responses arrive in send order.

use std::time::Duration;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{BridgeError, TransportError};
use crate::jsonrpc::RpcRequest;
use crate::process::{BRIDGE_TARGET, PluginBridge};
use crate::state::ProcessState;
use crate::transport::Transport;

/// Host-side handle for driving one plugin process.
///
/// Implemented by [`PluginBridge`] in production; the plugin facade layer
/// accepts any implementation so tests can substitute scripted channels.
pub trait PluginChannel {
    /// Starts the plugin process. A no-op when it is already running.
    ///
    /// # Errors
    ///
    /// Returns a [`BridgeError`] describing the launch failure.
    fn start(&self) -> Result<(), BridgeError>;

    /// Stops the plugin process. Never fails; safe when not running.
    fn stop(&self);

    /// Returns whether the plugin process is currently running.
    fn is_running(&self) -> bool;

    /// Issues one request and waits for its matching response.
    ///
    /// # Errors
    ///
    /// Returns a [`BridgeError`] when the process is not running, the
    /// exchange fails at the transport level, the response violates the
    /// protocol, or the plugin reports an error.
    fn call(&self, method: &str, params: Map<String, Value>) -> Result<Value, BridgeError>;
}

impl PluginChannel for PluginBridge {
    fn start(&self) -> Result<(), BridgeError> {
        Self::start(self)
    }

    fn stop(&self) {
        Self::stop(self);
    }

    fn is_running(&self) -> bool {
        Self::is_running(self)
    }

    fn call(&self, method: &str, params: Map<String, Value>) -> Result<Value, BridgeError> {
        let mut state = self.lock_state();
        let ProcessState::Running { transport, .. } = &mut *state else {
            return Err(BridgeError::NotRunning {
                name: self.name().to_owned(),
            });
        };

        let request = RpcRequest::new(method, params, self.ids().next_id());
        debug!(
            target: BRIDGE_TARGET,
            plugin = %self.name(),
            method = %request.method,
            id = request.id,
            "sending request"
        );
        exchange(self.name(), transport, &request, self.config().call_timeout)
    }
}

/// Performs one request/response exchange on the transport.
///
/// The response line must parse as a protocol envelope and echo the request
/// id; an error member becomes [`BridgeError::Remote`]. When the envelope
/// has no `result` member the whole decoded payload is the result (the
/// responder returned a bare value rather than a mapping).
pub(crate) fn exchange(
    name: &str,
    transport: &mut dyn Transport,
    request: &RpcRequest,
    timeout: Duration,
) -> Result<Value, BridgeError> {
    let payload = serde_json::to_vec(request).map_err(|source| BridgeError::Encode {
        method: request.method.clone(),
        source,
    })?;

    transport
        .send(&payload)
        .map_err(|error| BridgeError::from_transport(name, &request.method, error))?;

    let line = transport
        .receive(timeout)
        .map_err(|error| BridgeError::from_transport(name, &request.method, error))?;

    decode_response(name, request, &line)
}

fn decode_response(name: &str, request: &RpcRequest, line: &str) -> Result<Value, BridgeError> {
    let raw: Value = serde_json::from_str(line.trim()).map_err(|error| BridgeError::Decode {
        name: name.to_owned(),
        method: request.method.clone(),
        message: format!("invalid JSON response: {error}"),
    })?;

    let response: crate::jsonrpc::RpcResponse =
        serde_json::from_value(raw.clone()).map_err(|error| BridgeError::Decode {
            name: name.to_owned(),
            method: request.method.clone(),
            message: format!("malformed response envelope: {error}"),
        })?;

    let response_id = response.id;
    let correlated = response_id == Some(request.id);

    if let Some(error) = response.error {
        // A responder that failed to parse the request reports a null id.
        if correlated || response_id.is_none() {
            return Err(BridgeError::Remote {
                name: name.to_owned(),
                method: request.method.clone(),
                code: error.code,
                message: error.message,
            });
        }
    }

    if !correlated {
        return Err(BridgeError::IdMismatch {
            name: name.to_owned(),
            method: request.method.clone(),
            expected: request.id,
            received: response_id,
        });
    }

    // Read `result` off the raw payload: a responder may legitimately answer
    // with `"result": null`, which must not be confused with an absent
    // member.
    Ok(raw.get("result").cloned().unwrap_or(raw))
}
