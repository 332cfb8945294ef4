//! Package descriptor parsing for NPM-style plugin packages.
//!
//! A plugin ships a `package.json` at its root. The descriptor is read once
//! when the plugin is loaded and is immutable afterwards: identity fields at
//! the top level, plus a nested `mcp` section carrying capability tags,
//! platform support, and the permission block.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PluginError;
use crate::permissions::PermissionSet;

/// Tracing target for descriptor operations.
const DESCRIPTOR_TARGET: &str = "tether_plugins::descriptor";

/// File name of the package descriptor inside a plugin package.
pub const DESCRIPTOR_FILE: &str = "package.json";

fn default_name() -> String {
    String::from("unknown")
}

fn default_version() -> String {
    String::from("0.0.0")
}

fn default_main() -> String {
    String::from("index.js")
}

fn default_platforms() -> Vec<String> {
    vec![
        String::from("windows"),
        String::from("linux"),
        String::from("darwin"),
    ]
}

/// Capability tags a plugin may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginCapability {
    /// Synthesizes mouse movement and clicks.
    MouseControl,
    /// Synthesizes keyboard input.
    KeyboardControl,
    /// Moves, resizes, or focuses windows.
    WindowManagement,
    /// Reads and writes the filesystem.
    FileSystem,
    /// Reports host and OS information.
    SystemInfo,
    /// Launches and controls applications.
    ApplicationControl,
    /// Captures the screen.
    Screenshot,
    /// Inspects and manages processes.
    ProcessManagement,
    /// Drives a web browser.
    WebAutomation,
}

impl PluginCapability {
    /// Returns the canonical tag string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MouseControl => "mouse_control",
            Self::KeyboardControl => "keyboard_control",
            Self::WindowManagement => "window_management",
            Self::FileSystem => "file_system",
            Self::SystemInfo => "system_info",
            Self::ApplicationControl => "application_control",
            Self::Screenshot => "screenshot",
            Self::ProcessManagement => "process_management",
            Self::WebAutomation => "web_automation",
        }
    }

    /// Parses a manifest tag, returning `None` for unknown tags.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "mouse_control" => Some(Self::MouseControl),
            "keyboard_control" => Some(Self::KeyboardControl),
            "window_management" => Some(Self::WindowManagement),
            "file_system" => Some(Self::FileSystem),
            "system_info" => Some(Self::SystemInfo),
            "application_control" => Some(Self::ApplicationControl),
            "screenshot" => Some(Self::Screenshot),
            "process_management" => Some(Self::ProcessManagement),
            "web_automation" => Some(Self::WebAutomation),
            _ => None,
        }
    }
}

impl std::fmt::Display for PluginCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `mcp` section of a package descriptor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct McpSection {
    /// Declared capability tags, as written in the manifest.
    #[serde(default)]
    capabilities: Vec<String>,
    /// Platforms the plugin supports.
    #[serde(default = "default_platforms")]
    platforms: Vec<String>,
    /// Declared permissions.
    #[serde(default)]
    permissions: PermissionSet,
}

/// Static identity of a plugin package, as stored in `package.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageDescriptor {
    #[serde(default = "default_name")]
    name: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_main")]
    main: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    mcp: McpSection,
}

impl PackageDescriptor {
    /// Loads the descriptor from `package.json` inside `package_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::DescriptorNotFound`] when the file is absent,
    /// [`PluginError::DescriptorRead`] when it cannot be read, and
    /// [`PluginError::DescriptorParse`] when it is not valid JSON.
    pub fn load(package_dir: &Path) -> Result<Self, PluginError> {
        let path = package_dir.join(DESCRIPTOR_FILE);
        if !path.exists() {
            return Err(PluginError::DescriptorNotFound { path });
        }

        let contents =
            std::fs::read_to_string(&path).map_err(|source| PluginError::DescriptorRead {
                path: path.clone(),
                source: std::sync::Arc::new(source),
            })?;

        serde_json::from_str(&contents)
            .map_err(|source| PluginError::DescriptorParse { path, source })
    }

    /// Returns the package name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the package version.
    #[must_use]
    pub const fn version(&self) -> &str {
        self.version.as_str()
    }

    /// Returns the human-readable description.
    #[must_use]
    pub const fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the entry-point path relative to the package root.
    #[must_use]
    pub const fn main(&self) -> &str {
        self.main.as_str()
    }

    /// Returns the declared keywords.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Returns the dependency mapping.
    #[must_use]
    pub const fn dependencies(&self) -> &BTreeMap<String, String> {
        &self.dependencies
    }

    /// Returns the declared permissions.
    #[must_use]
    pub fn permissions(&self) -> PermissionSet {
        self.mcp.permissions.clone()
    }

    /// Derives the parsed plugin metadata.
    ///
    /// Unknown capability tags are logged and skipped; they never fail the
    /// load.
    #[must_use]
    pub fn metadata(&self) -> PluginMetadata {
        let capabilities = self
            .mcp
            .capabilities
            .iter()
            .filter_map(|tag| {
                let parsed = PluginCapability::from_tag(tag);
                if parsed.is_none() {
                    warn!(
                        target: DESCRIPTOR_TARGET,
                        plugin = %self.name,
                        capability = %tag,
                        "unknown capability tag"
                    );
                }
                parsed
            })
            .collect();

        PluginMetadata {
            name: self.name.clone(),
            version: self.version.clone(),
            description: self.description.clone(),
            author: self
                .author
                .clone()
                .unwrap_or_else(|| String::from("Unknown")),
            capabilities,
            platforms: self.mcp.platforms.clone(),
            dependencies: self.dependencies.keys().cloned().collect(),
        }
    }
}

/// Parsed identity of a loaded plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMetadata {
    name: String,
    version: String,
    description: String,
    author: String,
    capabilities: Vec<PluginCapability>,
    platforms: Vec<String>,
    dependencies: Vec<String>,
}

impl PluginMetadata {
    /// Creates metadata with the given identity and defaults elsewhere.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            author: String::from("Unknown"),
            capabilities: Vec::new(),
            platforms: default_platforms(),
            dependencies: Vec::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Sets the parsed capabilities.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Vec<PluginCapability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Returns the plugin name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the plugin version.
    #[must_use]
    pub const fn version(&self) -> &str {
        self.version.as_str()
    }

    /// Returns the plugin description.
    #[must_use]
    pub const fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the author.
    #[must_use]
    pub const fn author(&self) -> &str {
        self.author.as_str()
    }

    /// Returns the parsed capability tags.
    #[must_use]
    pub fn capabilities(&self) -> &[PluginCapability] {
        &self.capabilities
    }

    /// Returns the supported platforms.
    #[must_use]
    pub fn platforms(&self) -> &[String] {
        &self.platforms
    }

    /// Returns the names of the declared dependencies.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}
