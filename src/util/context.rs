//! Global context for mpiconf operations.
//!
//! Holds the work directory and the merged configuration, and turns them
//! plus command-line overrides into [`ConfigureOptions`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::generate::{GeneratorCommand, HandoffFiles};
use crate::ops::ConfigureOptions;
use crate::sizes::SIZE_PROBE_FILE;
use crate::util::config::{
    global_config_path, load_config, project_config_path, timeout_from_secs, Config, DEFAULT_CC,
    DEFAULT_WRAPPER,
};
use crate::util::process::resolve_program;

/// Environment variable naming the MPI compiler wrapper.
pub const MPICC_ENV: &str = "MPICC";

/// Environment variable naming the host C compiler.
pub const CC_ENV: &str = "CC";

fn system_env(key: &str) -> Option<OsString> {
    std::env::var_os(key)
}

/// Values given on the command line; they beat every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub wrapper: Option<PathBuf>,
    pub cc: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub no_generate: bool,
}

/// Global context for an mpiconf run.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Work directory
    work_dir: PathBuf,

    /// Merged configuration
    config: Config,

    /// Environment lookup, replaceable in tests
    env: fn(&str) -> Option<OsString>,
}

impl GlobalContext {
    /// Create a context rooted at `work_dir` (or the current directory).
    ///
    /// `config_path` replaces the global config file. Unlike the default
    /// locations, an explicitly named file must exist and parse.
    pub fn new(work_dir: Option<PathBuf>, config_path: Option<&Path>) -> Result<Self> {
        let work_dir = match work_dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("failed to get current directory")?,
        };
        if !work_dir.is_dir() {
            anyhow::bail!("work directory does not exist: {}", work_dir.display());
        }

        let project = project_config_path(&work_dir);
        let config = match config_path {
            Some(path) => {
                let mut config = Config::load(path)?;
                if project.exists() {
                    config.merge(Config::load_or_default(&project));
                }
                config
            }
            None => {
                let global = global_config_path().unwrap_or_default();
                load_config(&global, &project)
            }
        };

        Ok(GlobalContext::with_config(work_dir, config))
    }

    /// Create a context from an already loaded configuration.
    pub fn with_config(work_dir: PathBuf, config: Config) -> Self {
        GlobalContext {
            work_dir,
            config,
            env: system_env,
        }
    }

    /// Get the work directory.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Get the merged configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn env_path(&self, key: &str) -> Option<PathBuf> {
        (self.env)(key)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    /// Pick a program: flag, then environment, then config, then default.
    fn pick_program(
        &self,
        flag: Option<&PathBuf>,
        env_key: &str,
        configured: Option<&PathBuf>,
        default: &str,
    ) -> PathBuf {
        let chosen = flag
            .cloned()
            .or_else(|| self.env_path(env_key))
            .or_else(|| configured.cloned())
            .unwrap_or_else(|| PathBuf::from(default));
        resolve_program(&chosen)
    }

    /// Build configure options from flags, environment and configuration.
    pub fn configure_options(&self, overrides: &Overrides) -> ConfigureOptions {
        let config = &self.config;

        let wrapper = self.pick_program(
            overrides.wrapper.as_ref(),
            MPICC_ENV,
            config.toolchain.wrapper.as_ref(),
            DEFAULT_WRAPPER,
        );
        let cc = self.pick_program(
            overrides.cc.as_ref(),
            CC_ENV,
            config.toolchain.cc.as_ref(),
            DEFAULT_CC,
        );

        let timeout = match overrides.timeout_secs {
            Some(secs) => timeout_from_secs(secs),
            None => config.timeout(),
        };

        let defaults = HandoffFiles::default();
        let files = HandoffFiles {
            placeholder: config.files.placeholder.clone().unwrap_or(defaults.placeholder),
            generated: config.files.generated.clone().unwrap_or(defaults.generated),
            bridge: config.files.bridge.clone().unwrap_or(defaults.bridge),
        };

        let default_generator = GeneratorCommand::default();
        let generator = GeneratorCommand {
            program: config
                .generator
                .program
                .clone()
                .unwrap_or(default_generator.program),
            args: config
                .generator
                .args
                .clone()
                .unwrap_or(default_generator.args),
        };

        tracing::debug!(
            "wrapper: {}, cc: {}, timeout: {:?}",
            wrapper.display(),
            cc.display(),
            timeout
        );

        ConfigureOptions {
            work_dir: self.work_dir.clone(),
            wrapper,
            cc,
            timeout,
            size_probe: config
                .files
                .size_probe
                .clone()
                .unwrap_or_else(|| PathBuf::from(SIZE_PROBE_FILE)),
            files,
            generator,
            generate: !overrides.no_generate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<OsString> {
        None
    }

    fn fake_env(key: &str) -> Option<OsString> {
        match key {
            MPICC_ENV => Some(OsString::from("/env/mpicc")),
            CC_ENV => Some(OsString::from("/env/cc")),
            _ => None,
        }
    }

    fn context(config: Config, env: fn(&str) -> Option<OsString>) -> GlobalContext {
        GlobalContext {
            env,
            ..GlobalContext::with_config(PathBuf::from("/work"), config)
        }
    }

    #[test]
    fn test_defaults() {
        let ctx = context(Config::default(), no_env);
        let opts = ctx.configure_options(&Overrides::default());

        assert_eq!(opts.work_dir, PathBuf::from("/work"));
        assert_eq!(opts.timeout, Some(Duration::from_secs(300)));
        assert_eq!(opts.size_probe, PathBuf::from("sizes.c"));
        assert_eq!(opts.files, HandoffFiles::default());
        assert_eq!(opts.generator, GeneratorCommand::default());
        assert!(opts.generate);
    }

    #[test]
    fn test_env_beats_config() {
        let mut config = Config::default();
        config.toolchain.wrapper = Some(PathBuf::from("/config/mpicc"));
        config.toolchain.cc = Some(PathBuf::from("/config/cc"));

        let opts = context(config, fake_env).configure_options(&Overrides::default());

        assert_eq!(opts.wrapper, PathBuf::from("/env/mpicc"));
        assert_eq!(opts.cc, PathBuf::from("/env/cc"));
    }

    #[test]
    fn test_flags_beat_env() {
        let overrides = Overrides {
            wrapper: Some(PathBuf::from("/flag/mpicc")),
            cc: Some(PathBuf::from("/flag/cc")),
            timeout_secs: Some(0),
            no_generate: true,
        };

        let opts = context(Config::default(), fake_env).configure_options(&overrides);

        assert_eq!(opts.wrapper, PathBuf::from("/flag/mpicc"));
        assert_eq!(opts.cc, PathBuf::from("/flag/cc"));
        assert_eq!(opts.timeout, None);
        assert!(!opts.generate);
    }

    #[test]
    fn test_config_files_and_generator() {
        let mut config = Config::default();
        config.toolchain.wrapper = Some(PathBuf::from("/config/mpicc"));
        config.toolchain.timeout_secs = Some(10);
        config.files.placeholder = Some(PathBuf::from("Interop.cs"));
        config.generator.program = Some(PathBuf::from("python3"));
        config.generator.args = Some(vec!["gen.py".to_string()]);

        let opts = context(config, no_env).configure_options(&Overrides::default());

        assert_eq!(opts.wrapper, PathBuf::from("/config/mpicc"));
        assert_eq!(opts.timeout, Some(Duration::from_secs(10)));
        assert_eq!(opts.files.placeholder, PathBuf::from("Interop.cs"));
        assert_eq!(opts.files.generated, PathBuf::from("CustomUnsafe.cs"));
        assert_eq!(opts.generator.program, PathBuf::from("python3"));
        assert_eq!(opts.generator.args, vec!["gen.py"]);
    }

    #[test]
    fn test_new_reads_project_config() {
        let tmp = TempDir::new().unwrap();
        let explicit = tmp.path().join("explicit.toml");
        std::fs::write(&explicit, "[toolchain]\ntimeout_secs = 5\ncc = \"/explicit/cc\"\n").unwrap();
        std::fs::write(
            tmp.path().join("mpiconf.toml"),
            "[toolchain]\ntimeout_secs = 7\n",
        )
        .unwrap();

        let ctx = GlobalContext::new(Some(tmp.path().to_path_buf()), Some(&explicit)).unwrap();

        assert_eq!(ctx.config().toolchain.timeout_secs, Some(7));
        assert_eq!(ctx.config().toolchain.cc, Some(PathBuf::from("/explicit/cc")));
    }

    #[test]
    fn test_new_rejects_missing_explicit_config() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing.toml");
        assert!(GlobalContext::new(Some(tmp.path().to_path_buf()), Some(&missing)).is_err());
    }

    #[test]
    fn test_new_rejects_missing_work_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(GlobalContext::new(Some(tmp.path().join("nope")), None).is_err());
    }
}
