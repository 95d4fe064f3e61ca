//! Configuration file support for mpiconf.
//!
//! mpiconf reads two configuration files:
//! - Global: `~/.mpiconf/config.toml` - User-wide defaults
//! - Project: `mpiconf.toml` in the work directory - Project-specific overrides
//!
//! Project config takes precedence over global config. Command-line flags and
//! the `MPICC`/`CC` environment variables take precedence over both.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default compiler wrapper name.
pub const DEFAULT_WRAPPER: &str = "mpicc";

/// Default host C compiler name.
pub const DEFAULT_CC: &str = "cc";

/// Default bound on every external process, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Project config file name.
pub const PROJECT_CONFIG_FILE: &str = "mpiconf.toml";

/// mpiconf configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Toolchain settings
    pub toolchain: ToolchainSettings,

    /// Input and output file names
    pub files: FileSettings,

    /// Generator invocation
    pub generator: GeneratorSettings,
}

/// Toolchain settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// MPI compiler wrapper (e.g., /usr/bin/mpicc)
    pub wrapper: Option<PathBuf>,

    /// Host C compiler used for the size probe (e.g., /usr/bin/cc)
    pub cc: Option<PathBuf>,

    /// Bound on each external process in seconds; 0 disables the bound
    pub timeout_secs: Option<u64>,
}

/// File names, relative to the work directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    /// Size probe source (default `sizes.c`)
    pub size_probe: Option<PathBuf>,

    /// Placeholder source replaced by the generator output (default `Unsafe.cs`)
    pub placeholder: Option<PathBuf>,

    /// Generator output installed over the placeholder (default `CustomUnsafe.cs`)
    pub generated: Option<PathBuf>,

    /// Generated C bridge source (default `cbridge.c`)
    pub bridge: Option<PathBuf>,
}

/// Generator invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Program to run (default `perl`)
    pub program: Option<PathBuf>,

    /// Leading arguments before the positional facts (default `["Unsafe.pl"]`)
    pub args: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = crate::util::fs::read_to_string(path)?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Toolchain settings
        if other.toolchain.wrapper.is_some() {
            self.toolchain.wrapper = other.toolchain.wrapper;
        }
        if other.toolchain.cc.is_some() {
            self.toolchain.cc = other.toolchain.cc;
        }
        if other.toolchain.timeout_secs.is_some() {
            self.toolchain.timeout_secs = other.toolchain.timeout_secs;
        }

        // File settings
        if other.files.size_probe.is_some() {
            self.files.size_probe = other.files.size_probe;
        }
        if other.files.placeholder.is_some() {
            self.files.placeholder = other.files.placeholder;
        }
        if other.files.generated.is_some() {
            self.files.generated = other.files.generated;
        }
        if other.files.bridge.is_some() {
            self.files.bridge = other.files.bridge;
        }

        // Generator settings
        if other.generator.program.is_some() {
            self.generator.program = other.generator.program;
        }
        if other.generator.args.is_some() {
            self.generator.args = other.generator.args;
        }
    }

    /// Process bound from config, falling back to the default.
    pub fn timeout(&self) -> Option<Duration> {
        timeout_from_secs(self.toolchain.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

/// Convert a seconds setting into a process bound; 0 means unbounded.
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (mpiconf.toml)
/// 2. Global config (~/.mpiconf/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    // Load global config first
    if global_path.exists() {
        let global = Config::load_or_default(global_path);
        config.merge(global);
    }

    // Project config overrides global
    if project_path.exists() {
        let project = Config::load_or_default(project_path);
        config.merge(project);
    }

    config
}

/// Get the global mpiconf config directory (~/.mpiconf).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".mpiconf"))
}

/// Get the global config path (~/.mpiconf/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (mpiconf.toml in the work directory).
pub fn project_config_path(work_dir: &Path) -> PathBuf {
    work_dir.join(PROJECT_CONFIG_FILE)
}
