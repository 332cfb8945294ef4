//! Materialization of the Node.js responder shim.
//!
//! The shim is the program that runs inside every plugin child process. It
//! loads the plugin module named by its single positional argument and then
//! answers line-delimited JSON-RPC requests on stdin with one response line
//! on stdout per request. Diagnostics go to stderr only; stdout carries
//! nothing but response lines.

use std::io::Write as _;
use std::path::Path;

use tempfile::TempPath;
use tracing::debug;

use crate::error::BridgeError;

/// Tracing target for script materialization.
const SCRIPT_TARGET: &str = "tether_bridge::script";

/// Source of the Node.js responder shim.
///
/// Contract: one response line per request line, flushed immediately.
/// Unknown methods answer with code -32601; a handler that throws answers
/// with code -32603 carrying the thrown message; a request line that does
/// not parse answers with code -32603 and a null id. SIGTERM runs the
/// module's optional `cleanup` member before a zero exit. A handler that
/// returns `undefined` produces a response without a `result` member.
const RESPONDER_SHIM: &str = concat!(
    "'use strict';\n",
    "const readline = require('readline');\n",
    "const path = require('path');\n",
    "\n",
    "const pluginPath = process.argv[2];\n",
    "if (!pluginPath) {\n",
    "  process.stderr.write('plugin path not provided\\n');\n",
    "  process.exit(1);\n",
    "}\n",
    "\n",
    "let plugin;\n",
    "try {\n",
    "  plugin = require(path.resolve(pluginPath));\n",
    "} catch (error) {\n",
    "  process.stderr.write('failed to load plugin: ' + error.message + '\\n');\n",
    "  process.exit(1);\n",
    "}\n",
    "\n",
    "const respond = (body) => {\n",
    "  process.stdout.write(JSON.stringify(body) + '\\n');\n",
    "};\n",
    "\n",
    "const rl = readline.createInterface({ input: process.stdin, terminal: false });\n",
    "\n",
    "rl.on('line', async (line) => {\n",
    "  let request = null;\n",
    "  try {\n",
    "    request = JSON.parse(line);\n",
    "    const { method, params, id } = request;\n",
    "    if (!(method in Object(plugin))) {\n",
    "      respond({\n",
    "        jsonrpc: '2.0',\n",
    "        error: { code: -32601, message: 'Method ' + method + ' not found' },\n",
    "        id: id,\n",
    "      });\n",
    "      return;\n",
    "    }\n",
    "    let result;\n",
    "    if (typeof plugin[method] === 'function') {\n",
    "      result = await plugin[method](params || {});\n",
    "    } else {\n",
    "      result = plugin[method];\n",
    "    }\n",
    "    respond({ jsonrpc: '2.0', result: result, id: id });\n",
    "  } catch (error) {\n",
    "    const id = request && request.id !== undefined ? request.id : null;\n",
    "    respond({\n",
    "      jsonrpc: '2.0',\n",
    "      error: { code: -32603, message: error.message },\n",
    "      id: id,\n",
    "    });\n",
    "  }\n",
    "});\n",
    "\n",
    "process.on('SIGTERM', () => {\n",
    "  if (plugin && typeof plugin.cleanup === 'function') {\n",
    "    plugin.cleanup();\n",
    "  }\n",
    "  process.exit(0);\n",
    "});\n",
);

/// A responder script written to a uniquely named temporary file.
///
/// The file is removed when the value is dropped, so the script lives
/// exactly as long as the process that runs it.
#[derive(Debug)]
pub struct MaterializedScript {
    path: TempPath,
}

impl MaterializedScript {
    /// Returns the on-disk location of the script.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Returns the responder shim source.
#[must_use]
pub const fn shim_source() -> &'static str {
    RESPONDER_SHIM
}

/// Writes the built-in Node.js shim to a temporary `.js` file.
///
/// # Errors
///
/// Returns [`BridgeError::Script`] if the file cannot be created or written.
pub fn materialize_shim() -> Result<MaterializedScript, BridgeError> {
    let mut file = tempfile::Builder::new()
        .prefix("tether-responder-")
        .suffix(".js")
        .tempfile()
        .map_err(|source| BridgeError::Script { source })?;

    file.write_all(RESPONDER_SHIM.as_bytes())
        .map_err(|source| BridgeError::Script { source })?;
    file.flush().map_err(|source| BridgeError::Script { source })?;

    let path = file.into_temp_path();
    debug!(
        target: SCRIPT_TARGET,
        path = %path.display(),
        bytes = RESPONDER_SHIM.len(),
        "materialized responder shim"
    );

    Ok(MaterializedScript { path })
}
