use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file name, looked up in each candidate directory
pub const CONFIG_FILE: &str = "formbridge.yaml";

/// Main formbridge configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    pub paths: PathsConfig,
    pub http: HttpConfig,
    pub discovery: DiscoveryConfig,
    pub observability: ObservabilityConfig,
    /// Drop submission log entries older than this many days after each dispatch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_retention_days: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// One sub-folder per integration, each with an integration.yaml
    pub integrations: PathBuf,
    /// Global per-integration settings (credentials)
    pub settings: PathBuf,
    /// Per-form integration settings
    pub forms: PathBuf,
    /// Submission log
    pub logs: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Register every built-in integration when the integrations directory is missing
    pub builtin_fallback: bool,
}

/// Observability sink type
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ObservabilitySink {
    /// Append to events.jsonl under the logs path
    File,
    /// Print to the console (stderr, so stdout stays machine-readable)
    Stdout,
    /// POST to an HTTP endpoint
    Http,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub enabled: bool,
    pub sinks: Vec<ObservabilitySink>,
    pub http_endpoint: Option<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let base = Config::base_dir();

        Self {
            integrations: base.join("integrations"),
            settings: base.join("settings"),
            forms: base.join("forms"),
            logs: base.join("logs"),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: format!("formbridge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self { builtin_fallback: true }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sinks: vec![ObservabilitySink::File],
            http_endpoint: None,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // An explicit path must load
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        if let Ok(env_path) = std::env::var("FORMBRIDGE_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => log::warn!("Failed to load config from FORMBRIDGE_CONFIG: {}", e),
                }
            }
        }

        if let Ok(dir) = std::env::var("FORMBRIDGE_DIR") {
            let path = PathBuf::from(dir).join(CONFIG_FILE);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => log::warn!("Failed to load config from FORMBRIDGE_DIR: {}", e),
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("formbridge").join(CONFIG_FILE);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => log::warn!("Failed to load config from {}: {}", path.display(), e),
                }
            }
        }

        // Development checkout
        let local_config = PathBuf::from(CONFIG_FILE);
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => log::warn!("Failed to load local config: {}", e),
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// The formbridge directory (config, integrations, settings, forms, logs)
    pub fn base_dir() -> PathBuf {
        std::env::var("FORMBRIDGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("formbridge"))
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }

    pub fn integrations_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.integrations)
    }

    pub fn settings_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.settings)
    }

    pub fn forms_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.forms)
    }

    pub fn logs_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.logs)
    }
}
