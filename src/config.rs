use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

pub const DEFAULT_TOKEN_URL: &str = "https://secure.soundcloud.com/oauth/token";
pub const DEFAULT_API_BASE_URL: &str = "https://api.soundcloud.com";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LIMIT: u32 = 10;
/// Largest page the tracks endpoint accepts
pub const MAX_LIMIT: u32 = 200;

const CONFIG_FILE_NAME: &str = "soundcloud-stats.toml";
const CONFIG_DIR_NAME: &str = "soundcloud-stats";

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub soundcloud: SoundCloudConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SoundCloudConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_limit")]
    pub default_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

impl Default for SoundCloudConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            token_url: default_token_url(),
            api_base_url: default_api_base_url(),
            http_timeout_secs: default_http_timeout_secs(),
            default_limit: default_limit(),
        }
    }
}

// The secret must never end up in logs or panic messages.
impl fmt::Debug for SoundCloudConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundCloudConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("token_url", &self.token_url)
            .field("api_base_url", &self.api_base_url)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("default_limit", &self.default_limit)
            .finish()
    }
}

pub(crate) fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Some("info".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then apply environment variable overrides.
    ///
    /// A missing file is not an error: the configuration is then built from
    /// environment variables and defaults alone.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config_file = match config_path {
            Some(path) => Some(path),
            None => Self::find_config_file(),
        };

        let mut config = match config_file {
            Some(path) if path.exists() => {
                tracing::debug!("Loading config from: {}", path.display());
                let content = std::fs::read_to_string(&path)?;
                toml::from_str::<Config>(&content)?
            }
            _ => {
                tracing::debug!("No config file found, using environment variables only");
                Config {
                    soundcloud: SoundCloudConfig::default(),
                    logging: None,
                }
            }
        };

        config.apply_env_overrides()?;

        if config.logging.is_none() {
            config.logging = Some(LoggingConfig::default());
        }

        config.validate()?;

        Ok(config)
    }

    /// Config path named by the SOUNDCLOUD_STATS_CONFIG environment variable, if set
    pub fn path_from_env() -> Option<PathBuf> {
        env::var("SOUNDCLOUD_STATS_CONFIG")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from)
    }

    /// Find the configuration file: SOUNDCLOUD_STATS_CONFIG first, then the
    /// current directory, then the XDG config directory
    fn find_config_file() -> Option<PathBuf> {
        if let Some(path) = Self::path_from_env() {
            return Some(path);
        }

        let current_dir_config = PathBuf::from(CONFIG_FILE_NAME);
        if current_dir_config.exists() {
            return Some(current_dir_config);
        }

        let config_home = env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(dirs::config_dir)?;

        let xdg_config = config_home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        if xdg_config.exists() {
            Some(xdg_config)
        } else {
            None
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(client_id) = env::var("SOUNDCLOUD_CLIENT_ID") {
            self.soundcloud.client_id = client_id;
        }
        if let Ok(client_secret) = env::var("SOUNDCLOUD_CLIENT_SECRET") {
            self.soundcloud.client_secret = client_secret;
        }
        if let Ok(token_url) = env::var("SOUNDCLOUD_TOKEN_URL") {
            self.soundcloud.token_url = token_url;
        }
        if let Ok(api_base_url) = env::var("SOUNDCLOUD_API_BASE_URL") {
            self.soundcloud.api_base_url = api_base_url;
        }
        if let Ok(timeout) = env::var("SOUNDCLOUD_HTTP_TIMEOUT_SECS") {
            self.soundcloud.http_timeout_secs = timeout.parse().map_err(|_| {
                ConfigError::InvalidValue(
                    "SOUNDCLOUD_HTTP_TIMEOUT_SECS must be a valid number".to_string(),
                )
            })?;
        }
        if let Ok(limit) = env::var("SOUNDCLOUD_DEFAULT_LIMIT") {
            self.soundcloud.default_limit = limit.parse().map_err(|_| {
                ConfigError::InvalidValue(
                    "SOUNDCLOUD_DEFAULT_LIMIT must be a valid number".to_string(),
                )
            })?;
        }

        if let Ok(level) = env::var("SOUNDCLOUD_LOG_LEVEL") {
            let logging = self.logging.get_or_insert_with(LoggingConfig::default);
            logging.level = Some(level);
        }

        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url("soundcloud.token_url", &self.soundcloud.token_url)?;
        validate_http_url("soundcloud.api_base_url", &self.soundcloud.api_base_url)?;

        if self.soundcloud.http_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "soundcloud.http_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.soundcloud.default_limit > MAX_LIMIT {
            return Err(ConfigError::InvalidValue(format!(
                "soundcloud.default_limit must be at most {MAX_LIMIT}"
            )));
        }

        Ok(())
    }

    /// Get the logging configuration with defaults
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidValue(format!("{field} is not a valid URL: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::InvalidValue(format!(
            "{field} must use http or https, got {scheme}"
        ))),
    }
}
