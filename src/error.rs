use crate::config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("SoundCloud API error: {0}")]
    SoundCloud(#[from] SoundCloudError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SoundCloudError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Profile not found: {profile_url}")]
    NotFound { profile_url: String },

    #[error("Invalid SoundCloud profile URL: {url}")]
    InvalidProfileUrl { url: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("API request failed: {0}")]
    ApiRequestFailed(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),
}

impl SoundCloudError {
    /// Map a transport-level reqwest failure (connect, timeout, TLS) to a network error
    pub(crate) fn from_transport(context: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            SoundCloudError::Network(format!("{context}: request timed out: {error}"))
        } else {
            SoundCloudError::Network(format!("{context}: {error}"))
        }
    }

    pub fn is_authentication_error(&self) -> bool {
        matches!(self, SoundCloudError::AuthenticationFailed(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SoundCloudError::NotFound { .. })
    }

    pub fn is_network_error(&self) -> bool {
        matches!(self, SoundCloudError::Network(_))
    }
}

impl StatsError {
    /// The underlying API error, if this failure came from SoundCloud
    pub fn as_soundcloud(&self) -> Option<&SoundCloudError> {
        match self {
            StatsError::SoundCloud(inner) => Some(inner),
            _ => None,
        }
    }
}
