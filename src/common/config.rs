//! Configuration file handling
//!
//! [`Config`] mirrors `config.toml`. [`HarnessConfig`] is the resolved value
//! handed to the scenario driver at construction; nothing in the harness reads
//! configuration from global state.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::{self, config_path};
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Child process launch settings
    #[serde(default)]
    pub launcher: LauncherConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Overrides for the built-in panzoom suite
    #[serde(default)]
    pub panzoom: DemoOverrides,

    /// Overrides for the built-in serialization suite
    #[serde(default)]
    pub serialize: DemoOverrides,

    /// Rendered artifact handling
    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    /// Tools used to display the rendered strip
    #[serde(default)]
    pub viscat: ViscatConfig,
}

/// Environment policy for demo processes
#[derive(Debug, Deserialize, Clone)]
pub struct LauncherConfig {
    /// Variable forced to the empty string so the demo does not block on
    /// session bus discovery
    #[serde(default = "default_bus_address_var")]
    pub bus_address_var: String,

    /// Additional environment variables for every demo process
    #[serde(default)]
    pub extra_env: BTreeMap<String, String>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            bus_address_var: default_bus_address_var(),
            extra_env: BTreeMap::new(),
        }
    }
}

fn default_bus_address_var() -> String {
    "DBUS_SESSION_BUS_ADDRESS".to_string()
}

/// Timeout settings
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// Upper bound on waiting for a demo process to exit, 0 waits forever
    #[serde(default = "default_child_exit")]
    pub child_exit_secs: u64,

    /// Time between SIGTERM and SIGKILL for a timed-out demo process
    #[serde(default = "default_kill_grace")]
    pub kill_grace_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            child_exit_secs: default_child_exit(),
            kill_grace_ms: default_kill_grace(),
        }
    }
}

fn default_child_exit() -> u64 {
    60
}
fn default_kill_grace() -> u64 {
    500
}

/// Optional replacements for a built-in suite's binary and UI files
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DemoOverrides {
    pub binary: Option<String>,
    pub ui_files: Option<Vec<String>>,
}

/// Rendered artifact settings
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ArtifactsConfig {
    /// Keep per-test artifact directories instead of removing them at teardown
    #[serde(default)]
    pub keep: bool,
}

/// External tools used by `--viscat`
#[derive(Debug, Deserialize, Clone)]
pub struct ViscatConfig {
    /// Command that concatenates images horizontally; the input paths and then
    /// the output path are appended
    #[serde(default = "default_concat_command")]
    pub concat_command: Vec<String>,

    /// Image viewer opened on the concatenated strip
    #[serde(default = "default_viewer")]
    pub viewer: String,
}

impl Default for ViscatConfig {
    fn default() -> Self {
        Self {
            concat_command: default_concat_command(),
            viewer: default_viewer(),
        }
    }
}

fn default_concat_command() -> Vec<String> {
    vec!["convert".to_string(), "+append".to_string()]
}
fn default_viewer() -> String {
    "eog".to_string()
}

impl Config {
    /// Load configuration from an explicit path, or from the default config
    /// file location
    ///
    /// Returns default configuration if no explicit path was given and the
    /// default file doesn't exist
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    /// Parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }
}

/// Resolved settings for one harness run
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Directory containing the demo binaries and UI files
    pub bindir: PathBuf,
    /// Show the concatenated artifact strip after each panzoom test
    pub viscat: bool,
    /// Keep artifact directories after teardown
    pub keep_artifacts: bool,
    pub launcher: LauncherConfig,
    pub timeouts: Timeouts,
    pub viscat_tools: ViscatConfig,
}

impl HarnessConfig {
    /// Resolve a harness configuration for `bindir`
    pub fn new(bindir: &Path, config: &Config) -> Result<Self> {
        Ok(Self {
            bindir: paths::resolve_bindir(bindir)?,
            viscat: false,
            keep_artifacts: config.artifacts.keep,
            launcher: config.launcher.clone(),
            timeouts: config.timeouts.clone(),
            viscat_tools: config.viscat.clone(),
        })
    }

    /// Bounded wait for child exit, `None` when unbounded
    pub fn exit_timeout(&self) -> Option<Duration> {
        match self.timeouts.child_exit_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Grace period between SIGTERM and SIGKILL
    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.timeouts.kill_grace_ms)
    }
}
