//! Configuration loading.
//!
//! Loads `config.toml` from `$HASHGEN_CONFIG_PATH` or `~/.hashgen/`.
//! Precedence: env vars > config file > defaults. A missing file means
//! defaults; a malformed one is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::engine::EngineConfig;
use crate::script::Limits;

/// Env var naming the config file.
pub const CONFIG_PATH_ENV: &str = "HASHGEN_CONFIG_PATH";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HashgenConfig {
    /// Engine limits.
    pub engine: EngineSection,
    /// Algorithm store location.
    pub store: StoreSection,
    /// Logging.
    pub logging: LoggingSection,
}

/// `[engine]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Wall-clock budget per invocation in milliseconds; `0` disables it.
    pub timeout_ms: u64,
    /// Interpreter step budget; `0` means unlimited.
    pub max_steps: u64,
    /// Deepest chain of nested calls.
    pub max_call_depth: usize,
    /// Longest failure detail in characters.
    pub max_detail_len: usize,
    /// Worker thread stack size in KiB.
    pub worker_stack_kib: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_steps: 10_000_000,
            max_call_depth: 64,
            max_detail_len: 512,
            worker_stack_kib: 8_192,
        }
    }
}

impl From<&EngineSection> for EngineConfig {
    fn from(section: &EngineSection) -> Self {
        Self {
            timeout: (section.timeout_ms > 0).then(|| Duration::from_millis(section.timeout_ms)),
            limits: Limits {
                max_steps: section.max_steps,
                max_call_depth: section.max_call_depth,
            },
            max_detail_len: section.max_detail_len,
            worker_stack_size: section.worker_stack_kib.saturating_mul(1024),
        }
    }
}

/// `[store]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Snippet file; `None` means `<config dir>/snippets.json`.
    pub path: Option<PathBuf>,
    /// Seed the default algorithms into a newly created file.
    pub seed_defaults: bool,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: None,
            seed_defaults: true,
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for daily-rotated JSON logs; unset disables file logging.
    pub logs_dir: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            logs_dir: None,
        }
    }
}

impl HashgenConfig {
    /// Load with env overrides from the process environment.
    ///
    /// `explicit_path` (e.g. from `--config`) wins over `$HASHGEN_CONFIG_PATH`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        Self::load_with(explicit_path, |key| std::env::var(key).ok())
    }

    /// Load using a custom env resolver (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_with(
        explicit_path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let path = match explicit_path {
            Some(p) => p.to_path_buf(),
            None => config_path_with(&env)?,
        };
        let mut config = Self::load_from_file(&path)?;
        config.apply_overrides(&env);
        Ok(config)
    }

    /// Parse TOML text with no env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).context("failed to parse config TOML")
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::debug!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("invalid config at {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config at {}: {e}",
                path.display()
            )),
        }
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function so tests need not mutate the process env.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        // Engine.
        if let Some(n) = parse_override(&env, "HASHGEN_TIMEOUT_MS") {
            self.engine.timeout_ms = n;
        }
        if let Some(n) = parse_override(&env, "HASHGEN_MAX_STEPS") {
            self.engine.max_steps = n;
        }

        // Store.
        if let Some(v) = env("HASHGEN_SNIPPETS_PATH").filter(|v| !v.trim().is_empty()) {
            self.store.path = Some(PathBuf::from(v));
        }

        // Logging.
        if let Some(v) = env("HASHGEN_LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            self.logging.level = v;
        }
        if let Some(v) = env("HASHGEN_LOGS_DIR").filter(|v| !v.trim().is_empty()) {
            self.logging.logs_dir = Some(PathBuf::from(v));
        }
    }

    /// Engine settings derived from `[engine]`.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::from(&self.engine)
    }

    /// Resolved snippet file path.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the home directory
    /// cannot be determined.
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store.path {
            Some(p) => Ok(p.clone()),
            None => Ok(config_dir()?.join("snippets.json")),
        }
    }
}

fn parse_override(env: &impl Fn(&str) -> Option<String>, var: &'static str) -> Option<u64> {
    let value = env(var)?;
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(var, value = %value, "ignoring invalid env override");
            None
        }
    }
}

fn config_path_with(env: &impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(p) = env(CONFIG_PATH_ENV).filter(|p| !p.trim().is_empty()) {
        return Ok(PathBuf::from(p));
    }
    Ok(config_dir()?.join("config.toml"))
}

/// Resolve the default config directory (`~/.hashgen/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".hashgen"))
}
