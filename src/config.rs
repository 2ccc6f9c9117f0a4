//! Configuration system for nvg.
//!
//! Supports layered configuration from multiple sources:
//! 1. Environment variables (highest priority)
//! 2. Explicit config file (`NVG_CONFIG`)
//! 3. Project config (.nvg.toml, searched up to the repo root)
//! 4. User config (~/.config/nvg/config.toml)
//! 5. System config (/etc/nvg/config.toml)
//! 6. Compiled defaults (lowest priority)
//!
//! Configuration only controls presentation and logging. What counts as a
//! verification bypass is fixed in code.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LoggingConfig;

/// Environment variable prefix for all config options.
const ENV_PREFIX: &str = "NVG";

/// Default config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Project-level config file name.
const PROJECT_CONFIG_NAME: &str = ".nvg.toml";

/// Default upper bound on the raw hook request read from stdin.
pub const DEFAULT_MAX_HOOK_INPUT_BYTES: usize = 256 * 1024;

/// Default upper bound on a single command line.
pub const DEFAULT_MAX_COMMAND_BYTES: usize = 64 * 1024;

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,

    /// Structured decision log.
    pub logging: LoggingConfig,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Parse a mode name, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Always => "always",
            Self::Never => "never",
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// General configuration options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Color output mode: "auto", "always", "never".
    pub color: ColorMode,

    /// Path to log file for blocked commands (optional).
    pub log_file: Option<String>,

    /// Whether to show verbose output.
    pub verbose: bool,

    /// Maximum hook request size read from stdin, in bytes.
    pub max_hook_input_bytes: Option<usize>,

    /// Maximum command length evaluated, in bytes.
    pub max_command_bytes: Option<usize>,
}

impl GeneralConfig {
    #[must_use]
    pub fn max_hook_input_bytes(&self) -> usize {
        self.max_hook_input_bytes
            .unwrap_or(DEFAULT_MAX_HOOK_INPUT_BYTES)
    }

    #[must_use]
    pub fn max_command_bytes(&self) -> usize {
        self.max_command_bytes.unwrap_or(DEFAULT_MAX_COMMAND_BYTES)
    }
}

impl Config {
    /// Load configuration from all sources, merging them in priority order.
    #[must_use]
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load system config (lowest priority of file configs)
        if let Some(system_config) = Self::load_system_config() {
            config.merge(system_config);
        }

        if let Some(user_config) = Self::load_user_config() {
            config.merge(user_config);
        }

        if let Some(project_config) = env::current_dir()
            .ok()
            .and_then(|cwd| Self::load_project_config(&cwd))
        {
            config.merge(project_config);
        }

        if let Some(explicit) = env::var_os(format!("{ENV_PREFIX}_CONFIG"))
            .and_then(|path| Self::load_from_file(Path::new(&path)))
        {
            config.merge(explicit);
        }

        // Apply environment variable overrides (highest priority)
        config.apply_env_overrides(|name| env::var(name).ok());

        config
    }

    /// Load configuration from a specific file.
    ///
    /// A missing or unparsable file yields `None`.
    #[must_use]
    pub fn load_from_file(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        toml::from_str(&content).ok()
    }

    fn load_system_config() -> Option<Self> {
        let path = PathBuf::from("/etc/nvg").join(CONFIG_FILE_NAME);
        Self::load_from_file(&path)
    }

    fn load_user_config() -> Option<Self> {
        let config_dir = dirs::config_dir()?;
        let path = config_dir.join("nvg").join(CONFIG_FILE_NAME);
        Self::load_from_file(&path)
    }

    fn load_project_config(start: &Path) -> Option<Self> {
        Self::find_project_config(start).and_then(|path| Self::load_from_file(&path))
    }

    /// Find `.nvg.toml` in `start` or its ancestors, stopping at the first
    /// directory that contains `.git`.
    #[must_use]
    pub fn find_project_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_CONFIG_NAME);
            if config_path.exists() {
                return Some(config_path);
            }

            // Repo root reached without a project config
            if current.join(".git").exists() {
                return None;
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Merge another config into this one (other takes priority).
    fn merge(&mut self, other: Self) {
        let general = other.general;
        if general.color != ColorMode::Auto {
            self.general.color = general.color;
        }
        if general.log_file.is_some() {
            self.general.log_file = general.log_file;
        }
        if general.verbose {
            self.general.verbose = true;
        }
        if general.max_hook_input_bytes.is_some() {
            self.general.max_hook_input_bytes = general.max_hook_input_bytes;
        }
        if general.max_command_bytes.is_some() {
            self.general.max_command_bytes = general.max_command_bytes;
        }

        // A layer that says anything about logging replaces the section whole.
        if other.logging != LoggingConfig::default() {
            self.logging = other.logging;
        }
    }

    /// Apply environment variable overrides, reading variables through `var`.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // NVG_VERBOSE=1
        if var(&format!("{ENV_PREFIX}_VERBOSE")).is_some() {
            self.general.verbose = true;
        }

        // NVG_COLOR=never (unknown values are ignored)
        if let Some(color) = var(&format!("{ENV_PREFIX}_COLOR")).and_then(|v| ColorMode::parse(&v))
        {
            self.general.color = color;
        }

        // NVG_LOG_FILE=~/.local/share/nvg/blocked.log
        if let Some(path) = var(&format!("{ENV_PREFIX}_LOG_FILE")).filter(|p| !p.is_empty()) {
            self.general.log_file = Some(path);
        }
    }

    /// Check if the bypass flag is set (escape hatch).
    #[must_use]
    pub fn is_bypassed() -> bool {
        env::var_os(format!("{ENV_PREFIX}_BYPASS")).is_some()
    }

    /// Path of the user config file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join("nvg").join(CONFIG_FILE_NAME))
    }

    /// Render the effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if the configuration cannot be rendered.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Generate a sample configuration string with comments.
    #[must_use]
    pub fn generate_sample_config() -> String {
        r#"# nvg configuration
#
# Layers, lowest to highest priority:
#   /etc/nvg/config.toml
#   ~/.config/nvg/config.toml
#   .nvg.toml (project, searched up to the repo root)
#   $NVG_CONFIG
#   NVG_* environment variables

[general]
# Color output: "auto" | "always" | "never"
color = "auto"

# Log blocked commands to file (optional)
# log_file = "~/.local/share/nvg/blocked.log"

# Verbose output
verbose = false

# Requests larger than this are allowed without evaluation (bytes)
# max_hook_input_bytes = 262144

# Commands longer than this are allowed without evaluation (bytes)
# max_command_bytes = 65536

[logging]
# Structured decision log
enabled = false
# file = "~/.local/share/nvg/decisions.log"

# "text" | "json"
format = "text"

[logging.events]
block = true
allow = false

[logging.redaction]
enabled = false
# "none" | "arguments" | "full"
mode = "arguments"
max_argument_len = 50
"#
        .to_string()
    }
}
