//! Plugin permission declarations.
//!
//! A [`PermissionSet`] is parsed once from the package descriptor's `mcp`
//! section and never changes afterwards. The bridge does not enforce any of
//! it; the set exists for the host's policy layer to consult before letting
//! a plugin function run.

use serde::{Deserialize, Serialize};

/// What a plugin declares it is allowed to do.
///
/// Every flag defaults to the restrictive value, except
/// `confirmation_required`, which defaults to `true` so that destructive
/// calls from an undeclared plugin still prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionSet {
    /// May create, change, or delete files.
    pub can_modify_files: bool,
    /// May open network connections.
    pub can_access_network: bool,
    /// May spawn other processes.
    pub can_execute_processes: bool,
    /// May read or write the clipboard.
    pub can_access_clipboard: bool,
    /// May synthesize mouse or keyboard input.
    pub can_control_input: bool,
    /// May capture the screen.
    pub can_take_screenshots: bool,
    /// Directories the plugin may touch when modifying files.
    pub allowed_directories: Vec<String>,
    /// Application names the plugin must never control.
    pub blocked_applications: Vec<String>,
    /// Whether destructive calls require user confirmation.
    pub confirmation_required: bool,
}

impl Default for PermissionSet {
    fn default() -> Self {
        Self {
            can_modify_files: false,
            can_access_network: false,
            can_execute_processes: false,
            can_access_clipboard: false,
            can_control_input: false,
            can_take_screenshots: false,
            allowed_directories: Vec::new(),
            blocked_applications: Vec::new(),
            confirmation_required: true,
        }
    }
}
