//! Layered configuration for every ensemble crate.
//!
//! Sources, later ones overriding earlier ones:
//! 1. Bundled defaults (`include_str!` of `ensemble.toml`)
//! 2. `~/.config/ensemble/ensemble.toml`
//! 3. `./ensemble.toml`
//! 4. `ENSEMBLE__<SECTION>__<KEY>` environment variables

use crate::RetryPolicy;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use ensemble_error::{ConfigError, EnsembleError, EnsembleResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Bundled default configuration
const DEFAULT_CONFIG: &str = include_str!("../../../ensemble.toml");

/// Where transcripts live on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory holding one directory per run
    pub logs_dir: PathBuf,
    /// Name of the event log inside each run directory
    pub log_file: String,
    /// fsync the log after every append
    pub sync_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            logs_dir: PathBuf::from("my_logs"),
            log_file: "log.jsonl".to_string(),
            sync_writes: false,
        }
    }
}

/// How runs are driven.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Agent role whose messages carry the final answer
    pub orchestrator_role: String,
    /// Events buffered between the driver and a slow renderer
    pub render_buffer: usize,
    /// How long to keep draining events after the task invocation returned
    pub drain_grace_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            orchestrator_role: "Orchestrator".to_string(),
            render_buffer: 64,
            drain_grace_ms: 5000,
        }
    }
}

/// External orchestration helper launched for each run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Program to execute; runs cannot start without one
    pub command: Option<String>,
    /// Arguments placed before the task text
    pub args: Vec<String>,
    /// Environment variables that must be set and non-empty
    pub required_env: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            required_env: vec!["OPENAI_API_KEY".to_string()],
        }
    }
}

/// Top-level ensemble configuration.
///
/// # Example
///
/// ```no_run
/// use ensemble_rate_limit::EnsembleConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = EnsembleConfig::load()?;
/// println!("Transcripts under {}", config.storage.logs_dir.display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Transcript storage
    pub storage: StorageConfig,
    /// Rate-limit retry
    pub retry: RetryPolicy,
    /// Run driving
    pub run: RunConfig,
    /// Orchestration engine
    pub engine: EngineConfig,
}

impl EnsembleConfig {
    /// Load configuration from a specific file path only.
    ///
    /// Missing keys take their built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> EnsembleResult<Self> {
        debug!("Loading configuration from file");
        let builder = Config::builder().add_source(File::from(path.as_ref()));
        Self::finish(builder)
    }

    /// Load configuration with precedence: env > current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped if not found.
    #[instrument]
    pub fn load() -> EnsembleResult<Self> {
        Self::load_with(None)
    }

    /// Like [`load`](Self::load), but an explicit file replaces the user files.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing or any source fails to parse.
    #[instrument]
    pub fn load_with(explicit: Option<&Path>) -> EnsembleResult<Self> {
        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        match explicit {
            Some(path) => {
                debug!(path = %path.display(), "Using explicit configuration file");
                builder = builder.add_source(File::from(path));
            }
            None => {
                if let Some(home) = dirs::home_dir() {
                    let home_config = home.join(".config/ensemble/ensemble.toml");
                    builder = builder.add_source(File::from(home_config).required(false));
                }
                builder = builder.add_source(File::with_name("ensemble").required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("ENSEMBLE")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("engine.args")
                .with_list_parse_key("engine.required_env"),
        );

        Self::finish(builder)
    }

    /// Check values that would make the crates misbehave.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first offending key.
    pub fn validate(&self) -> EnsembleResult<()> {
        let fail = |msg: &str| Err(EnsembleError::from(ConfigError::new(msg)));
        if self.retry.max_attempts == 0 {
            return fail("retry.max_attempts must be at least 1");
        }
        if self.retry.multiplier == 0 {
            return fail("retry.multiplier must be at least 1");
        }
        if self.retry.min_delay_ms > self.retry.max_delay_ms {
            return fail("retry.min_delay_ms must not exceed retry.max_delay_ms");
        }
        if self.run.render_buffer == 0 {
            return fail("run.render_buffer must be at least 1");
        }
        if self.run.orchestrator_role.trim().is_empty() {
            return fail("run.orchestrator_role must not be empty");
        }
        if self.storage.log_file.is_empty() || self.storage.log_file.contains(['/', '\\']) {
            return fail("storage.log_file must be a plain file name");
        }
        Ok(())
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> EnsembleResult<Self> {
        let config: Self = builder
            .build()
            .map_err(|e| {
                EnsembleError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                EnsembleError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }
}
