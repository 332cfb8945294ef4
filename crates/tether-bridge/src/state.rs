//! Internal lifecycle state for a supervised plugin process.

use std::process::Child;

use crate::script::MaterializedScript;
use crate::transport::LineTransport;

/// Lifecycle state of a plugin process.
pub enum ProcessState {
    /// No process has been started yet.
    NotStarted,
    /// Process is running and ready for calls.
    Running {
        /// The child process handle.
        child: Child,
        /// The line transport over the child's standard streams.
        transport: LineTransport,
        /// The materialized shim file; removed when this state is torn down.
        /// `None` when the bridge launched a caller-supplied script.
        script: Option<MaterializedScript>,
    },
    /// Process has been stopped or has exited.
    Stopped,
}
