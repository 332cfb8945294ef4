//! Plugin process supervision.
//!
//! [`PluginBridge`] owns exactly one child process and its three standard
//! streams. It materializes the responder script, spawns the runtime with
//! the plugin path as argument, checks for fast startup failures, drains
//! the child's stderr into the log, and terminates the child gracefully on
//! [`PluginBridge::stop`].

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::{BridgeConfig, ResponderSource};
use crate::error::BridgeError;
use crate::jsonrpc::RequestIdSequence;
use crate::script::{self, MaterializedScript};
use crate::state::ProcessState;
use crate::transport::LineTransport;

/// Tracing target for bridge process operations.
pub(crate) const BRIDGE_TARGET: &str = "tether_bridge::process";

/// How long `stop` waits for a graceful exit before killing the child.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

/// Poll interval while waiting for the child to exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Supervisor and call channel for one plugin process.
///
/// The bridge is the exclusive owner of the child's standard streams; no
/// other component reads or writes them. Calls are serialized: the state
/// lock is held for a whole request/response round trip, so at most one
/// request is in flight per bridge at any time.
///
/// # Example
///
/// ```rust,no_run
/// use tether_bridge::{BridgeConfig, PluginBridge, PluginChannel};
/// use serde_json::Map;
///
/// let bridge = PluginBridge::new(
///     "browser-tools",
///     "/opt/plugins/browser-tools",
///     BridgeConfig::node_default(),
/// );
/// bridge.start()?;
/// let healthy = bridge.call("health_check", Map::new())?;
/// bridge.stop();
/// # Ok::<(), tether_bridge::BridgeError>(())
/// ```
pub struct PluginBridge {
    name: String,
    plugin_path: PathBuf,
    config: BridgeConfig,
    ids: RequestIdSequence,
    state: Mutex<ProcessState>,
}

impl PluginBridge {
    /// Creates a bridge for the plugin at `plugin_path`. No process is
    /// started until [`PluginBridge::start`] is called.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        plugin_path: impl Into<PathBuf>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            name: name.into(),
            plugin_path: plugin_path.into(),
            config,
            ids: RequestIdSequence::new(),
            state: Mutex::new(ProcessState::NotStarted),
        }
    }

    /// Returns the plugin name this bridge supervises.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the plugin location passed to the responder.
    #[must_use]
    pub fn plugin_path(&self) -> &Path {
        &self.plugin_path
    }

    /// Returns the bridge configuration.
    #[must_use]
    pub const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns the child's process id while it is running.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        match &*self.lock_state() {
            ProcessState::Running { child, .. } => Some(child.id()),
            ProcessState::NotStarted | ProcessState::Stopped => None,
        }
    }

    /// Returns whether a child process is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(&*self.lock_state(), ProcessState::Running { .. })
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, ProcessState> {
        // Recover from poisoning so shutdown can still proceed after a panic.
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    pub(crate) const fn ids(&self) -> &RequestIdSequence {
        &self.ids
    }

    /// Starts the plugin process.
    ///
    /// A no-op returning `Ok` when the process is already running. Otherwise
    /// materializes the responder script, spawns the runtime with the plugin
    /// path as argument, waits out the startup grace period, and reports a
    /// launch failure if the child has already exited.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Script`], [`BridgeError::RuntimeNotFound`],
    /// [`BridgeError::SpawnFailed`], or [`BridgeError::StartupExited`].
    pub fn start(&self) -> Result<(), BridgeError> {
        let mut state = self.lock_state();
        if matches!(&*state, ProcessState::Running { .. }) {
            debug!(
                target: BRIDGE_TARGET,
                plugin = %self.name,
                "start requested while already running"
            );
            return Ok(());
        }

        let (script, script_path) = self.resolve_responder()?;
        let mut child = self.spawn_runtime(&script_path)?;

        let stdin = child.stdin.take().ok_or_else(|| BridgeError::SpawnFailed {
            name: self.name.clone(),
            message: String::from("failed to capture stdin"),
            source: None,
        })?;
        let stdout = child.stdout.take().ok_or_else(|| BridgeError::SpawnFailed {
            name: self.name.clone(),
            message: String::from("failed to capture stdout"),
            source: None,
        })?;
        let stderr = child.stderr.take();

        // Give the runtime a moment to fail fast on a missing module.
        thread::sleep(self.config.startup_grace);

        match child.try_wait() {
            Ok(Some(status)) => {
                let diagnostics = collect_stderr(stderr);
                warn!(
                    target: BRIDGE_TARGET,
                    plugin = %self.name,
                    ?status,
                    stderr = %diagnostics,
                    "plugin responder exited during startup"
                );
                return Err(BridgeError::StartupExited {
                    name: self.name.clone(),
                    status,
                    stderr: diagnostics,
                });
            }
            Ok(None) => {}
            Err(error) => {
                return Err(BridgeError::SpawnFailed {
                    name: self.name.clone(),
                    message: String::from("failed to poll process status"),
                    source: Some(Arc::new(error)),
                });
            }
        }

        if let Some(handle) = stderr {
            spawn_stderr_drain(self.name.clone(), handle);
        }

        info!(
            target: BRIDGE_TARGET,
            plugin = %self.name,
            pid = child.id(),
            "plugin responder started"
        );

        *state = ProcessState::Running {
            child,
            transport: LineTransport::new(stdin, stdout),
            script,
        };
        Ok(())
    }

    /// Stops the plugin process.
    ///
    /// Safe to call at any time, including when no process was ever started
    /// or after a previous `stop`. Failures during termination are logged
    /// and swallowed so shutdown always proceeds.
    pub fn stop(&self) {
        let mut state = self.lock_state();
        if let ProcessState::Running {
            mut child,
            transport,
            script,
        } = std::mem::replace(&mut *state, ProcessState::Stopped)
        {
            // Closing stdin lets a responder that is between requests exit
            // on its own.
            drop(transport);
            terminate_child(&self.name, &mut child);
            drop(script);
        }
    }

    fn resolve_responder(&self) -> Result<(Option<MaterializedScript>, PathBuf), BridgeError> {
        match &self.config.responder {
            ResponderSource::GeneratedShim => {
                let materialized = script::materialize_shim()?;
                let path = materialized.path().to_path_buf();
                Ok((Some(materialized), path))
            }
            ResponderSource::ScriptFile(path) => Ok((None, path.clone())),
        }
    }

    fn spawn_runtime(&self, script_path: &Path) -> Result<Child, BridgeError> {
        let mut command = Command::new(&self.config.runtime);
        command
            .args(&self.config.runtime_args)
            .arg(script_path)
            .arg(&self.plugin_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        debug!(
            target: BRIDGE_TARGET,
            plugin = %self.name,
            runtime = %self.config.runtime.display(),
            script = %script_path.display(),
            plugin_path = %self.plugin_path.display(),
            "spawning plugin responder"
        );

        command.spawn().map_err(|error| {
            if error.kind() == std::io::ErrorKind::NotFound {
                BridgeError::RuntimeNotFound {
                    command: self.config.runtime.display().to_string(),
                    source: Arc::new(error),
                }
            } else {
                BridgeError::SpawnFailed {
                    name: self.name.clone(),
                    message: format!("failed to start {}", self.config.runtime.display()),
                    source: Some(Arc::new(error)),
                }
            }
        })
    }
}

impl Drop for PluginBridge {
    fn drop(&mut self) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        };

        if let ProcessState::Running { mut child, .. } =
            std::mem::replace(&mut *state, ProcessState::Stopped)
        {
            if let Err(error) = child.kill() {
                warn!(
                    target: BRIDGE_TARGET,
                    plugin = %self.name,
                    error = %error,
                    "failed to kill plugin process on drop"
                );
            } else {
                drop(child.wait());
            }
        }
    }
}

impl std::fmt::Debug for PluginBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state_desc = match &*self.lock_state() {
            ProcessState::NotStarted => "not_started".to_owned(),
            ProcessState::Running { child, .. } => format!("running (pid: {})", child.id()),
            ProcessState::Stopped => "stopped".to_owned(),
        };

        f.debug_struct("PluginBridge")
            .field("name", &self.name)
            .field("plugin_path", &self.plugin_path)
            .field("state", &state_desc)
            .finish_non_exhaustive()
    }
}

/// Reads whatever the dead child left on stderr, for the launch error.
fn collect_stderr(stderr: Option<ChildStderr>) -> String {
    let Some(handle) = stderr else {
        return String::new();
    };
    let mut buffer = String::new();
    if BufReader::new(handle).read_to_string(&mut buffer).is_err() {
        return String::new();
    }
    buffer.trim().to_owned()
}

/// Logs every stderr line of the running child until its pipe closes.
fn spawn_stderr_drain(name: String, stderr: ChildStderr) {
    thread::spawn(move || {
        let reader = BufReader::new(stderr);
        for read in reader.lines() {
            match read {
                Ok(text) => {
                    if !text.trim().is_empty() {
                        debug!(
                            target: BRIDGE_TARGET,
                            plugin = %name,
                            stderr = %text,
                            "plugin stderr output"
                        );
                    }
                }
                Err(_) => break,
            }
        }
    });
}

/// Terminates the child: signals it, waits through the grace window, then
/// kills on overrun. Every failure is logged, none propagate.
fn terminate_child(name: &str, child: &mut Child) {
    #[cfg(unix)]
    request_terminate(name, child);

    let deadline = Instant::now() + SHUTDOWN_GRACE;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(
                    target: BRIDGE_TARGET,
                    plugin = %name,
                    ?status,
                    "plugin responder exited"
                );
                return;
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    break;
                }
                thread::sleep(EXIT_POLL_INTERVAL);
            }
            Err(error) => {
                warn!(
                    target: BRIDGE_TARGET,
                    plugin = %name,
                    error = %error,
                    "failed to poll plugin process status"
                );
                break;
            }
        }
    }

    warn!(
        target: BRIDGE_TARGET,
        plugin = %name,
        "plugin responder did not exit in time, killing"
    );
    if let Err(error) = child.kill() {
        warn!(
            target: BRIDGE_TARGET,
            plugin = %name,
            error = %error,
            "failed to kill plugin process"
        );
    }
    drop(child.wait());
}

/// Delivers SIGTERM so the responder can run its cleanup hook before exit.
#[cfg(unix)]
fn request_terminate(name: &str, child: &Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Ok(pid) = i32::try_from(child.id()) else {
        warn!(
            target: BRIDGE_TARGET,
            plugin = %name,
            pid = child.id(),
            "process id out of range for signalling"
        );
        return;
    };

    if let Err(error) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
        debug!(
            target: BRIDGE_TARGET,
            plugin = %name,
            error = %error,
            "failed to signal plugin process"
        );
    }
}
