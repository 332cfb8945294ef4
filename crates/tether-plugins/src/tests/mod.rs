//! Crate-level integration tests running a real responder process.
//!
//! The tests drive an [`NpmPlugin`] end-to-end against a Python stub
//! responder, so the whole facade/bridge/transport stack is exercised
//! without requiring Node.js. Skipped when `python3` is not installed.

use std::process::Command;
use std::time::Duration;

use rstest::rstest;
use serde_json::{Map, json};
use tempfile::TempDir;

use tether_bridge::BridgeConfig;

use crate::error::PluginError;
use crate::facade::NpmPlugin;

/// Stub responder exposing `echo` and a failing `boom` function.
const STUB_RESPONDER: &str = concat!(
    "import json\n",
    "import sys\n",
    "\n",
    "for raw in sys.stdin:\n",
    "    text = raw.strip()\n",
    "    if not text:\n",
    "        continue\n",
    "    request = json.loads(text)\n",
    "    method = request.get(\"method\")\n",
    "    params = request.get(\"params\", {})\n",
    "    rid = request.get(\"id\")\n",
    "    if method in (\"initialize\", \"health_check\"):\n",
    "        reply = {\"jsonrpc\": \"2.0\", \"result\": True, \"id\": rid}\n",
    "    elif method == \"echo\":\n",
    "        reply = {\"jsonrpc\": \"2.0\", \"result\": params, \"id\": rid}\n",
    "    elif method == \"get_mcp_functions\":\n",
    "        reply = {\"jsonrpc\": \"2.0\", \"result\": [\"echo\", \"boom\"], \"id\": rid}\n",
    "    elif method == \"cleanup\":\n",
    "        reply = {\"jsonrpc\": \"2.0\", \"result\": None, \"id\": rid}\n",
    "    elif method == \"boom\":\n",
    "        reply = {\"jsonrpc\": \"2.0\", \"error\": {\"code\": -32603, \"message\": \"boom\"}, \"id\": rid}\n",
    "    else:\n",
    "        reply = {\"jsonrpc\": \"2.0\", \"error\": {\"code\": -32601, \"message\": \"Method %s not found\" % method}, \"id\": rid}\n",
    "    sys.stdout.write(json.dumps(reply) + \"\\n\")\n",
    "    sys.stdout.flush()\n",
);

const PACKAGE_JSON: &str = r#"{
    "name": "stub-plugin",
    "version": "1.0.0",
    "description": "Integration test stub",
    "main": "index.js",
    "mcp": {
        "capabilities": ["system_info"],
        "permissions": {"can_access_network": true}
    }
}"#;

fn python3_available() -> bool {
    Command::new("python3")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn stub_plugin() -> Option<(TempDir, NpmPlugin)> {
    if !python3_available() {
        eprintln!("skipping: python3 not available");
        return None;
    }

    let dir = tempfile::tempdir().expect("create tempdir");
    std::fs::write(dir.path().join("package.json"), PACKAGE_JSON).expect("write package.json");
    let script_path = dir.path().join("stub_responder.py");
    std::fs::write(&script_path, STUB_RESPONDER).expect("write stub responder");

    let config = BridgeConfig::node_default()
        .with_runtime("python3")
        .with_runtime_args(vec!["-u".to_owned()])
        .with_startup_grace(Duration::from_millis(150))
        .with_call_timeout(Duration::from_secs(5))
        .with_responder_script(script_path);
    let plugin = NpmPlugin::open(dir.path(), config).expect("open plugin");

    Some((dir, plugin))
}

#[rstest]
fn open_parses_the_descriptor_without_starting() {
    let Some((_dir, plugin)) = stub_plugin() else { return };

    assert_eq!(plugin.metadata().name(), "stub-plugin");
    assert_eq!(plugin.metadata().version(), "1.0.0");
    assert!(plugin.permissions().can_access_network);
    assert!(!plugin.is_initialized());
    assert!(!plugin.channel().is_running());
}

#[rstest]
fn full_lifecycle_against_a_live_responder() {
    let Some((_dir, mut plugin)) = stub_plugin() else { return };

    assert!(plugin.initialize(&Map::new()));
    assert!(plugin.is_initialized());

    let names: Vec<&str> = plugin.functions().iter().map(String::as_str).collect();
    assert_eq!(names, vec!["boom", "echo"]);

    assert!(plugin.health_check());

    let mut arguments = Map::new();
    arguments.insert(String::from("x"), json!(1));
    let echoed = plugin.call_function("echo", arguments).expect("echo failed");
    assert_eq!(echoed, json!({"x": 1}));

    let error = plugin
        .call_function("boom", Map::new())
        .expect_err("boom should fail");
    assert!(matches!(
        error,
        PluginError::Function { ref message, .. } if message == "boom"
    ));

    plugin.cleanup();
    assert!(!plugin.is_initialized());
    assert!(!plugin.channel().is_running());
}

#[cfg(unix)]
#[rstest]
fn health_check_is_false_after_the_process_dies() {
    let Some((_dir, mut plugin)) = stub_plugin() else { return };

    assert!(plugin.initialize(&Map::new()));
    assert!(plugin.health_check());

    let pid = plugin.channel().pid().expect("pid while running");
    let killed = Command::new("kill")
        .arg("-9")
        .arg(pid.to_string())
        .status()
        .expect("spawn kill");
    assert!(killed.success());

    assert!(!plugin.health_check());

    plugin.cleanup();
}

#[rstest]
fn missing_package_json_fails_open() {
    let dir = tempfile::tempdir().expect("create tempdir");

    let error = NpmPlugin::open(dir.path(), BridgeConfig::node_default())
        .expect_err("open should fail");

    assert!(matches!(error, PluginError::DescriptorNotFound { .. }));
}
