//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and the
//! `SC_*` environment variables, and merging them with proper precedence
//! rules. CLI arguments are applied on top by the binary.

use crate::error::SniCheckError;
use crate::types::{CheckConfig, MAX_CONCURRENCY};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default hostname list read when no file is given.
pub const DEFAULT_INPUT_FILE: &str = "sni.txt";

/// Default working-hosts output file.
pub const DEFAULT_WORKING_FILE: &str = "working_sni.txt";

/// Default client configuration output file.
pub const DEFAULT_CLIENT_CONFIG_FILE: &str = "xui_reality_config.txt";

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for probing options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Input and output file locations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<FilesConfig>,
}

/// Default values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Number of concurrent workers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Per-request timeout (as string, e.g., "5s", "30s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_port: Option<u16>,
}

/// File locations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FilesConfig {
    /// Hostname list to read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    /// Working-hosts output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working: Option<String>,

    /// Client configuration output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_config: Option<String>,
}

impl FileConfig {
    /// Apply the `[defaults]` section on top of `config`.
    pub fn apply_to(&self, mut config: CheckConfig) -> CheckConfig {
        if let Some(defaults) = &self.defaults {
            if let Some(concurrency) = defaults.concurrency {
                config = config.with_concurrency(concurrency);
            }
            if let Some(timeout) = defaults.timeout.as_deref().and_then(parse_timeout_string) {
                config = config.with_timeout(timeout);
            }
            if let Some(port) = defaults.http_port {
                config.http_port = port;
            }
            if let Some(port) = defaults.https_port {
                config.https_port = port;
            }
        }
        config
    }

    pub fn input_file(&self) -> Option<&str> {
        self.files.as_ref().and_then(|f| f.input.as_deref())
    }

    pub fn working_file(&self) -> Option<&str> {
        self.files.as_ref().and_then(|f| f.working.as_deref())
    }

    pub fn client_config_file(&self) -> Option<&str> {
        self.files.as_ref().and_then(|f| f.client_config.as_deref())
    }
}

/// Configuration discovery and loading functionality.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    local_dir: Option<PathBuf>,
    home_dir: Option<PathBuf>,
    xdg_dir: Option<PathBuf>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// Look in the current directory, `$HOME`, and `$XDG_CONFIG_HOME`
    /// (falling back to `~/.config`).
    pub fn new() -> Self {
        let home_dir = env::var_os("HOME").map(PathBuf::from);
        let xdg_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| home_dir.as_ref().map(|home| home.join(".config")));

        Self {
            local_dir: Some(PathBuf::from(".")),
            home_dir,
            xdg_dir,
        }
    }

    /// Search explicit directories instead of the process environment.
    pub fn with_dirs(
        local_dir: Option<PathBuf>,
        home_dir: Option<PathBuf>,
        xdg_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            local_dir,
            home_dir,
            xdg_dir,
        }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, SniCheckError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SniCheckError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            SniCheckError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;
        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG is lowest, then the home directory, then the current directory.
    /// Files that fail to parse are skipped with a warning.
    pub fn discover_and_load(&self) -> FileConfig {
        let mut merged = FileConfig::default();

        let candidates = [
            self.xdg_config_path(),
            self.global_config_path(),
            self.local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded configuration file");
                    merged = merge_configs(merged, config);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring configuration file"),
            }
        }

        merged
    }

    fn local_config_path(&self) -> Option<PathBuf> {
        let dir = self.local_dir.as_ref()?;
        ["sni-check.toml", ".sni-check.toml"]
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    fn global_config_path(&self) -> Option<PathBuf> {
        let home = self.home_dir.as_ref()?;
        [".sni-check.toml", "sni-check.toml"]
            .iter()
            .map(|name| home.join(name))
            .find(|path| path.exists())
    }

    fn xdg_config_path(&self) -> Option<PathBuf> {
        let path = self.xdg_dir.as_ref()?.join("sni-check").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    fn validate_config(&self, config: &FileConfig) -> Result<(), SniCheckError> {
        if let Some(defaults) = &config.defaults {
            if let Some(concurrency) = defaults.concurrency {
                if concurrency == 0 || concurrency > MAX_CONCURRENCY {
                    return Err(SniCheckError::config(format!(
                        "Concurrency must be between 1 and {}",
                        MAX_CONCURRENCY
                    )));
                }
            }

            if let Some(timeout_str) = &defaults.timeout {
                if parse_timeout_string(timeout_str).is_none() {
                    return Err(SniCheckError::config(format!(
                        "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
                        timeout_str
                    )));
                }
            }

            if defaults.http_port == Some(0) || defaults.https_port == Some(0) {
                return Err(SniCheckError::config("Ports must be between 1 and 65535"));
            }
        }

        if let Some(files) = &config.files {
            for (key, value) in [
                ("input", &files.input),
                ("working", &files.working),
                ("client_config", &files.client_config),
            ] {
                if matches!(value, Some(v) if v.trim().is_empty()) {
                    return Err(SniCheckError::config(format!(
                        "File path '{}' cannot be empty",
                        key
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Merge two configurations; values from `higher` win.
fn merge_configs(lower: FileConfig, higher: FileConfig) -> FileConfig {
    let defaults = match (lower.defaults, higher.defaults) {
        (Some(lower), Some(higher)) => Some(DefaultsConfig {
            concurrency: higher.concurrency.or(lower.concurrency),
            timeout: higher.timeout.or(lower.timeout),
            http_port: higher.http_port.or(lower.http_port),
            https_port: higher.https_port.or(lower.https_port),
        }),
        (lower, higher) => higher.or(lower),
    };

    let files = match (lower.files, higher.files) {
        (Some(lower), Some(higher)) => Some(FilesConfig {
            input: higher.input.or(lower.input),
            working: higher.working.or(lower.working),
            client_config: higher.client_config.or(lower.client_config),
        }),
        (lower, higher) => higher.or(lower),
    };

    FileConfig { defaults, files }
}

/// Values read from `SC_*` environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub timeout: Option<Duration>,
    pub file: Option<String>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Apply the environment values on top of `config`.
    pub fn apply_to(&self, mut config: CheckConfig) -> CheckConfig {
        if let Some(concurrency) = self.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        config
    }
}

/// Load configuration from environment variables.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Same as [`load_env_config`] with an explicit variable lookup.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    // SC_CONCURRENCY - worker count
    if let Some(val) = lookup("SC_CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(concurrency) if (1..=MAX_CONCURRENCY).contains(&concurrency) => {
                env_config.concurrency = Some(concurrency);
            }
            _ => warn!(
                "Invalid SC_CONCURRENCY='{}', must be 1-{}",
                val, MAX_CONCURRENCY
            ),
        }
    }

    // SC_TIMEOUT - per-request timeout
    if let Some(val) = lookup("SC_TIMEOUT") {
        match parse_timeout_string(&val) {
            Some(timeout) => env_config.timeout = Some(timeout),
            None => warn!("Invalid SC_TIMEOUT='{}', use format like '5s', '30s', '2m'", val),
        }
    }

    // SC_FILE - hostname list
    if let Some(path) = lookup("SC_FILE") {
        if !path.trim().is_empty() {
            env_config.file = Some(path);
        }
    }

    // SC_CONFIG - explicit config file
    if let Some(path) = lookup("SC_CONFIG") {
        if !path.trim().is_empty() {
            env_config.config = Some(path);
        }
    }

    env_config
}

/// Parse a timeout string like "5s", "30s", "2m" (bare numbers are seconds).
///
/// Zero and values that overflow a `u64` of seconds are rejected.
pub fn parse_timeout_string(timeout_str: &str) -> Option<Duration> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let secs = if let Some(s) = timeout_str.strip_suffix('s') {
        s.parse::<u64>().ok()
    } else if let Some(m) = timeout_str.strip_suffix('m') {
        m.parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        timeout_str.parse::<u64>().ok()
    }?;

    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}
