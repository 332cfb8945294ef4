//! Configuration for spawning plugin responder processes.

use std::path::PathBuf;
use std::time::Duration;

/// Default runtime used to execute the responder shim.
pub const DEFAULT_RUNTIME: &str = "node";

const DEFAULT_STARTUP_GRACE: Duration = Duration::from_millis(100);
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of the responder program launched inside the child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResponderSource {
    /// Materialize the built-in Node.js shim into a temporary file at start.
    #[default]
    GeneratedShim,
    /// Launch an existing responder script at the given path.
    ScriptFile(PathBuf),
}

/// Configuration for spawning and driving one plugin process.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// The runtime executable or command name.
    pub runtime: PathBuf,
    /// Arguments passed to the runtime before the responder script.
    pub runtime_args: Vec<String>,
    /// Working directory for the spawned process.
    pub working_dir: Option<PathBuf>,
    /// How long to wait before checking whether the child failed fast.
    pub startup_grace: Duration,
    /// Deadline applied to every request/response round trip.
    pub call_timeout: Duration,
    /// Which responder program the child runs.
    pub responder: ResponderSource,
}

impl BridgeConfig {
    /// Default configuration: the Node.js shim run with `node` from PATH.
    #[must_use]
    pub fn node_default() -> Self {
        Self {
            runtime: PathBuf::from(DEFAULT_RUNTIME),
            runtime_args: Vec::new(),
            working_dir: None,
            startup_grace: DEFAULT_STARTUP_GRACE,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            responder: ResponderSource::GeneratedShim,
        }
    }

    /// Overrides the runtime command.
    #[must_use]
    pub fn with_runtime(mut self, runtime: impl Into<PathBuf>) -> Self {
        self.runtime = runtime.into();
        self
    }

    /// Appends arguments passed to the runtime ahead of the script path.
    #[must_use]
    pub fn with_runtime_args(mut self, args: Vec<String>) -> Self {
        self.runtime_args = args;
        self
    }

    /// Sets a custom working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Overrides the startup grace period.
    #[must_use]
    pub const fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.startup_grace = grace;
        self
    }

    /// Overrides the per-call deadline.
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Launches an existing responder script instead of the generated shim.
    #[must_use]
    pub fn with_responder_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.responder = ResponderSource::ScriptFile(path.into());
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::node_default()
    }
}
