//! Crate-level integration tests driving real responder processes.
//!
//! Most tests run a small Python stub responder so they exercise the full
//! supervisor/transport/channel stack without requiring Node.js. Tests are
//! skipped when the needed interpreter is not installed.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use rstest::rstest;
use serde_json::{Map, Value, json};
use tempfile::TempDir;

use crate::channel::PluginChannel;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::jsonrpc::{INTERNAL_ERROR, METHOD_NOT_FOUND};
use crate::process::PluginBridge;

/// Stub responder speaking the wire protocol, independent of any plugin.
const STUB_RESPONDER: &str = concat!(
    "import json\n",
    "import sys\n",
    "import time\n",
    "\n",
    "for raw in sys.stdin:\n",
    "    text = raw.strip()\n",
    "    if not text:\n",
    "        continue\n",
    "    try:\n",
    "        request = json.loads(text)\n",
    "    except ValueError:\n",
    "        reply = {\"jsonrpc\": \"2.0\", \"error\": {\"code\": -32603, \"message\": \"parse error\"}, \"id\": None}\n",
    "        sys.stdout.write(json.dumps(reply) + \"\\n\")\n",
    "        sys.stdout.flush()\n",
    "        continue\n",
    "    method = request.get(\"method\")\n",
    "    params = request.get(\"params\", {})\n",
    "    rid = request.get(\"id\")\n",
    "    if method in (\"initialize\", \"health_check\"):\n",
    "        reply = {\"jsonrpc\": \"2.0\", \"result\": True, \"id\": rid}\n",
    "    elif method == \"echo\":\n",
    "        reply = {\"jsonrpc\": \"2.0\", \"result\": params, \"id\": rid}\n",
    "    elif method == \"get_mcp_functions\":\n",
    "        reply = {\"jsonrpc\": \"2.0\", \"result\": [\"echo\"], \"id\": rid}\n",
    "    elif method == \"cleanup\":\n",
    "        reply = {\"jsonrpc\": \"2.0\", \"result\": None, \"id\": rid}\n",
    "    elif method == \"bare\":\n",
    "        reply = {\"jsonrpc\": \"2.0\", \"id\": rid}\n",
    "    elif method == \"sleep\":\n",
    "        time.sleep(3)\n",
    "        reply = {\"jsonrpc\": \"2.0\", \"result\": None, \"id\": rid}\n",
    "    elif method == \"boom\":\n",
    "        reply = {\"jsonrpc\": \"2.0\", \"error\": {\"code\": -32603, \"message\": \"boom\"}, \"id\": rid}\n",
    "    else:\n",
    "        reply = {\"jsonrpc\": \"2.0\", \"error\": {\"code\": -32601, \"message\": \"Method %s not found\" % method}, \"id\": rid}\n",
    "    sys.stdout.write(json.dumps(reply) + \"\\n\")\n",
    "    sys.stdout.flush()\n",
);

fn interpreter_available(command: &str) -> bool {
    Command::new(command)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

struct StubHarness {
    _dir: TempDir,
    bridge: PluginBridge,
}

fn write_stub(dir: &TempDir) -> PathBuf {
    let script_path = dir.path().join("stub_responder.py");
    std::fs::write(&script_path, STUB_RESPONDER).expect("write stub responder");
    script_path
}

fn stub_config(script_path: PathBuf) -> BridgeConfig {
    BridgeConfig::node_default()
        .with_runtime("python3")
        .with_runtime_args(vec!["-u".to_owned()])
        .with_startup_grace(Duration::from_millis(150))
        .with_call_timeout(Duration::from_secs(5))
        .with_responder_script(script_path)
}

fn stub_harness() -> Option<StubHarness> {
    if !interpreter_available("python3") {
        eprintln!("skipping: python3 not available");
        return None;
    }

    let dir = tempfile::tempdir().expect("create tempdir");
    let config = stub_config(write_stub(&dir));
    let bridge = PluginBridge::new("stub", dir.path(), config);

    Some(StubHarness { _dir: dir, bridge })
}

fn object(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), value.clone()))
        .collect()
}

#[rstest]
fn call_before_start_fails_without_touching_the_wire() {
    let Some(harness) = stub_harness() else { return };

    let error = harness
        .bridge
        .call("health_check", Map::new())
        .expect_err("should fail");

    assert!(matches!(error, BridgeError::NotRunning { .. }));
}

#[rstest]
fn start_call_stop_round_trip() {
    let Some(harness) = stub_harness() else { return };

    harness.bridge.start().expect("start failed");
    assert!(harness.bridge.is_running());

    let healthy = harness
        .bridge
        .call("health_check", Map::new())
        .expect("health_check failed");
    assert_eq!(healthy, json!(true));

    let echoed = harness
        .bridge
        .call("echo", object(&[("x", json!(1))]))
        .expect("echo failed");
    assert_eq!(echoed, json!({"x": 1}));

    let functions = harness
        .bridge
        .call("get_mcp_functions", Map::new())
        .expect("discovery failed");
    assert_eq!(functions, json!(["echo"]));

    harness.bridge.stop();
    assert!(!harness.bridge.is_running());
}

#[rstest]
fn sequential_calls_stay_correlated() {
    let Some(harness) = stub_harness() else { return };

    harness.bridge.start().expect("start failed");
    for round in 1..=4_i64 {
        let echoed = harness
            .bridge
            .call("echo", object(&[("round", json!(round))]))
            .expect("echo failed");
        assert_eq!(echoed, json!({"round": round}));
    }
    harness.bridge.stop();
}

#[rstest]
fn remote_errors_carry_the_plugin_message() {
    let Some(harness) = stub_harness() else { return };

    harness.bridge.start().expect("start failed");

    let error = harness
        .bridge
        .call("boom", Map::new())
        .expect_err("should fail");
    assert!(matches!(
        error,
        BridgeError::Remote { code: INTERNAL_ERROR, ref message, .. } if message == "boom"
    ));

    let missing = harness
        .bridge
        .call("does_not_exist", Map::new())
        .expect_err("should fail");
    assert!(matches!(
        missing,
        BridgeError::Remote {
            code: METHOD_NOT_FOUND,
            ..
        }
    ));

    harness.bridge.stop();
}

#[rstest]
fn bare_response_yields_the_whole_payload() {
    let Some(harness) = stub_harness() else { return };

    harness.bridge.start().expect("start failed");
    let payload = harness
        .bridge
        .call("bare", Map::new())
        .expect("bare call failed");

    assert_eq!(payload.get("jsonrpc"), Some(&json!("2.0")));
    assert!(payload.get("result").is_none());

    harness.bridge.stop();
}

#[rstest]
fn stop_is_idempotent_and_safe_when_never_started() {
    let Some(harness) = stub_harness() else { return };

    // Never started.
    harness.bridge.stop();
    assert!(!harness.bridge.is_running());

    harness.bridge.start().expect("start failed");
    harness.bridge.stop();
    harness.bridge.stop();
    assert!(!harness.bridge.is_running());
}

#[rstest]
fn start_while_running_is_a_no_op() {
    let Some(harness) = stub_harness() else { return };

    harness.bridge.start().expect("start failed");
    let pid = harness.bridge.pid().expect("pid while running");

    harness.bridge.start().expect("second start failed");
    assert_eq!(harness.bridge.pid(), Some(pid));

    harness.bridge.stop();
}

#[cfg(unix)]
#[rstest]
fn killed_process_turns_calls_into_failures_not_hangs() {
    let Some(harness) = stub_harness() else { return };

    harness.bridge.start().expect("start failed");
    let healthy = harness
        .bridge
        .call("health_check", Map::new())
        .expect("health_check failed");
    assert_eq!(healthy, json!(true));

    let pid = harness.bridge.pid().expect("pid while running");
    let killed = Command::new("kill")
        .arg("-9")
        .arg(pid.to_string())
        .status()
        .expect("spawn kill");
    assert!(killed.success());

    let error = harness
        .bridge
        .call("health_check", Map::new())
        .expect_err("call against a dead process should fail");
    assert!(matches!(
        error,
        BridgeError::Disconnected { .. } | BridgeError::Io { .. }
    ));

    harness.bridge.stop();
}

#[rstest]
fn expired_deadline_fails_the_call() {
    if !interpreter_available("python3") {
        eprintln!("skipping: python3 not available");
        return;
    }

    let dir = tempfile::tempdir().expect("create tempdir");
    let config = stub_config(write_stub(&dir)).with_call_timeout(Duration::from_millis(300));
    let bridge = PluginBridge::new("stub", dir.path(), config);

    bridge.start().expect("start failed");
    let error = bridge.call("sleep", Map::new()).expect_err("should time out");
    assert!(matches!(error, BridgeError::Timeout { .. }));

    bridge.stop();
}

#[rstest]
fn fast_exit_during_grace_period_is_a_launch_failure() {
    if !interpreter_available("python3") {
        eprintln!("skipping: python3 not available");
        return;
    }

    let dir = tempfile::tempdir().expect("create tempdir");
    let script_path = dir.path().join("fails_fast.py");
    std::fs::write(
        &script_path,
        "import sys\nsys.stderr.write(\"no such module\\n\")\nsys.exit(3)\n",
    )
    .expect("write failing responder");

    let config = BridgeConfig::node_default()
        .with_runtime("python3")
        .with_startup_grace(Duration::from_millis(500))
        .with_responder_script(script_path);
    let bridge = PluginBridge::new("broken", dir.path(), config);

    let error = bridge.start().expect_err("start should fail");
    assert!(matches!(
        error,
        BridgeError::StartupExited { ref stderr, .. } if stderr.contains("no such module")
    ));
    assert!(!bridge.is_running());
}

#[rstest]
fn missing_runtime_is_reported_as_not_found() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let config = BridgeConfig::node_default().with_runtime("definitely-not-a-runtime-7f3a");
    let bridge = PluginBridge::new("orphan", dir.path(), config);

    let error = bridge.start().expect_err("start should fail");
    assert!(matches!(error, BridgeError::RuntimeNotFound { .. }));
}

/// End-to-end through the real generated shim, when Node.js is installed.
#[rstest]
fn generated_shim_end_to_end_with_node() {
    if !interpreter_available("node") {
        eprintln!("skipping: node not available");
        return;
    }

    let dir = tempfile::tempdir().expect("create tempdir");
    let plugin_path = dir.path().join("plugin.js");
    std::fs::write(
        &plugin_path,
        concat!(
            "module.exports = {\n",
            "  version: '1.2.3',\n",
            "  initialize: (params) => true,\n",
            "  health_check: () => true,\n",
            "  echo: (params) => params,\n",
            "  get_mcp_functions: () => ['echo'],\n",
            "  boom: () => { throw new Error('boom'); },\n",
            "};\n",
        ),
    )
    .expect("write plugin module");

    let config = BridgeConfig::node_default()
        .with_startup_grace(Duration::from_millis(300))
        .with_call_timeout(Duration::from_secs(10));
    let bridge = PluginBridge::new("node-plugin", plugin_path, config);

    bridge.start().expect("start failed");

    let initialized = bridge
        .call("initialize", object(&[("config", json!({}))]))
        .expect("initialize failed");
    assert_eq!(initialized, json!(true));

    let echoed = bridge
        .call("echo", object(&[("x", json!(1))]))
        .expect("echo failed");
    assert_eq!(echoed, json!({"x": 1}));

    let functions = bridge
        .call("get_mcp_functions", Map::new())
        .expect("discovery failed");
    assert_eq!(functions, json!(["echo"]));

    // Non-invocable members are returned as values.
    let version = bridge
        .call("version", Map::new())
        .expect("member lookup failed");
    assert_eq!(version, json!("1.2.3"));

    let error = bridge.call("boom", Map::new()).expect_err("should fail");
    assert!(matches!(
        error,
        BridgeError::Remote { code: INTERNAL_ERROR, ref message, .. } if message == "boom"
    ));

    let missing = bridge
        .call("not_a_member", Map::new())
        .expect_err("should fail");
    assert!(matches!(
        missing,
        BridgeError::Remote {
            code: METHOD_NOT_FOUND,
            ..
        }
    ));

    bridge.stop();
}

/// A shim pointed at a missing module must fail fast with a diagnostic.
#[rstest]
fn generated_shim_rejects_a_missing_module() {
    if !interpreter_available("node") {
        eprintln!("skipping: node not available");
        return;
    }

    let config = BridgeConfig::node_default().with_startup_grace(Duration::from_millis(800));
    let bridge = PluginBridge::new(
        "missing",
        PathBuf::from("/nonexistent/plugin/location"),
        config,
    );

    let error = bridge.start().expect_err("start should fail");
    assert!(matches!(
        error,
        BridgeError::StartupExited { ref stderr, .. } if stderr.contains("failed to load plugin")
    ));
}
