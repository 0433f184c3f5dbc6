use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable holding the OpenUV API key.
pub const UV_API_KEY_ENV: &str = "SUNALERT_OPENUV_KEY";

/// Environment variable holding the mirror service bearer token.
pub const MIRROR_TOKEN_ENV: &str = "SUNALERT_MIRROR_TOKEN";

/// One problem found by [`Config::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Problems found in a configuration. Errors block startup; warnings are
/// only logged.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigIssue>,
    pub warnings: Vec<ConfigIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(ConfigIssue {
            field,
            message: message.into(),
        });
    }

    fn warn(&mut self, field: &'static str, message: impl Into<String>) {
        self.warnings.push(ConfigIssue {
            field,
            message: message.into(),
        });
    }

    /// All errors on one line, for the startup failure message.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `config.toml`
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Local history database
    #[serde(default)]
    pub storage: StorageConfig,

    /// UV index API settings
    #[serde(default)]
    pub uv: UvConfig,

    /// Remote history mirror settings
    #[serde(default)]
    pub mirror: MirrorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the SQLite history database
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sunalert")
        .join("sunalert.db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UvConfig {
    /// Base URL of the OpenUV API
    #[serde(default = "default_uv_api_url")]
    pub api_url: String,

    /// API key sent as `x-access-token` (optional, can be set via environment)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_uv_api_url() -> String {
    "https://api.openuv.io/api/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for UvConfig {
    fn default() -> Self {
        Self {
            api_url: default_uv_api_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Base URL of the document/object service
    #[serde(default = "default_mirror_url")]
    pub base_url: String,

    /// Bearer token for the mirror service (optional, can be set via environment)
    #[serde(default)]
    pub api_token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_mirror_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            base_url: default_mirror_url(),
            api_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sunalert")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            storage: StorageConfig::default(),
            uv: UvConfig::default(),
            mirror: MirrorConfig::default(),
        }
    }
}

impl Config {
    /// Load `config.toml` from the platform config directory.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, writing defaults there if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let mut config = Self::default();
            config.save_to(config_path)?;
            config.apply_env_secrets();
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.apply_env_secrets();
        Ok(config)
    }

    /// Secrets left out of the file fall back to the environment.
    fn apply_env_secrets(&mut self) {
        if self.uv.api_key.is_none() {
            self.uv.api_key = std::env::var(UV_API_KEY_ENV).ok();
        }
        if self.mirror.api_token.is_none() {
            self.mirror.api_token = std::env::var(MIRROR_TOKEN_ENV).ok();
        }
    }

    /// Load the configuration and refuse to start on validation errors.
    /// Warnings are logged and returned alongside the config.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!("Invalid configuration: {}", validation.error_summary());
        }
        for warning in &validation.warnings {
            tracing::warn!("Config: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        for (field, raw) in [
            ("uv.api_url", self.uv.api_url.as_str()),
            ("mirror.base_url", self.mirror.base_url.as_str()),
        ] {
            if let Err(message) = check_service_url(raw) {
                result.error(field, message);
            }
        }

        for (field, secs) in [
            ("uv.timeout_secs", self.uv.timeout_secs),
            ("mirror.timeout_secs", self.mirror.timeout_secs),
        ] {
            if secs == 0 {
                result.error(field, "timeout must be at least one second");
            }
        }

        if is_blank(self.uv.api_key.as_deref()) {
            result.warn(
                "uv.api_key",
                format!("not set (config or {}); UV checks will fail", UV_API_KEY_ENV),
            );
        }
        if is_blank(self.mirror.api_token.as_deref()) {
            result.warn(
                "mirror.api_token",
                format!("not set (config or {}); mirror requests are unauthenticated", MIRROR_TOKEN_ENV),
            );
        }

        let db = &self.storage.database_path;
        if db.as_os_str().is_empty() {
            result.error("storage.database_path", "must not be empty");
        } else if db.is_dir() {
            result.error(
                "storage.database_path",
                format!("{} is a directory, expected a file", db.display()),
            );
        }

        result
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;

        Ok(())
    }

    /// `<config dir>/sunalert/config.toml`
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("No platform config directory")?
            .join("sunalert");

        Ok(config_dir.join("config.toml"))
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Accept absolute http(s) URLs with a host.
fn check_service_url(raw: &str) -> std::result::Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("not a valid URL ({}): {}", e, raw))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("expected http or https, got {}", other)),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("URL has no host".to_string());
    }
    Ok(())
}
