use crate::config::{redact, ConfigError, SoundCloudConfig};
use crate::error::SoundCloudError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info};
use url::Url;

pub const CLIENT_CREDENTIALS_GRANT: &str = "client_credentials";

/// Application credentials used for the token exchange
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Read both credentials from configuration, failing if either is missing
    pub fn from_config(config: &SoundCloudConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client_id: get_client_id(config)?,
            client_secret: get_client_secret(config)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .finish()
    }
}

pub fn get_client_id(config: &SoundCloudConfig) -> Result<String, ConfigError> {
    required_value(
        &config.client_id,
        "soundcloud.client_id or SOUNDCLOUD_CLIENT_ID",
    )
}

pub fn get_client_secret(config: &SoundCloudConfig) -> Result<String, ConfigError> {
    required_value(
        &config.client_secret,
        "soundcloud.client_secret or SOUNDCLOUD_CLIENT_SECRET",
    )
}

fn required_value(value: &str, name: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::MissingRequired(name.to_string()));
    }
    Ok(value.to_string())
}

/// Bearer token returned by the token endpoint
#[derive(Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub obtained_at: DateTime<Utc>,
}

impl AccessToken {
    /// When the token stops being valid, if the endpoint reported a lifetime.
    ///
    /// A lifetime too large to represent counts as no known expiry.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let lifetime = ChronoDuration::try_seconds(self.expires_in?)?;
        self.obtained_at.checked_add_signed(lifetime)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }

    pub fn secret(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &redact(&self.access_token))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field(
                "refresh_token",
                &self.refresh_token.as_deref().map(redact),
            )
            .field("scope", &self.scope)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// Form body of the token request
#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

/// OAuth2 error body (RFC 6749 section 5.2)
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Exchange client credentials for a token and return the bearer string
pub async fn get_access_token(
    http_client: &Client,
    token_endpoint: &str,
    client_id: &str,
    client_secret: &str,
    grant_type: &str,
) -> Result<String, SoundCloudError> {
    let token = request_token(
        http_client,
        token_endpoint,
        client_id,
        client_secret,
        grant_type,
    )
    .await?;
    Ok(token.access_token)
}

/// Exchange client credentials for a token, keeping the full token response
pub async fn request_token(
    http_client: &Client,
    token_endpoint: &str,
    client_id: &str,
    client_secret: &str,
    grant_type: &str,
) -> Result<AccessToken, SoundCloudError> {
    let endpoint = parse_endpoint(token_endpoint)?;

    if grant_type.trim().is_empty() {
        return Err(SoundCloudError::AuthenticationFailed(
            "grant_type must not be empty".to_string(),
        ));
    }

    debug!(
        "Requesting access token: endpoint={}, grant_type={}",
        endpoint, grant_type
    );

    let form = TokenRequest {
        client_id,
        client_secret,
        grant_type,
    };

    let response = http_client
        .post(endpoint)
        .header("Accept", "application/json")
        .form(&form)
        .send()
        .await
        .map_err(|e| SoundCloudError::from_transport("Token request failed", e))?;

    let token = parse_token_response(response).await?;

    info!(
        "Obtained SoundCloud access token (expires_in={:?})",
        token.expires_in
    );
    Ok(token)
}

fn parse_endpoint(token_endpoint: &str) -> Result<Url, SoundCloudError> {
    let url = Url::parse(token_endpoint)
        .map_err(|e| SoundCloudError::InvalidUrl(format!("{token_endpoint}: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(SoundCloudError::InvalidUrl(format!(
            "{token_endpoint}: unsupported scheme {scheme}"
        ))),
    }
}

async fn parse_token_response(response: Response) -> Result<AccessToken, SoundCloudError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| SoundCloudError::from_transport("Failed to read token response", e))?;

    if !status.is_success() {
        let reason = match serde_json::from_str::<OAuthErrorResponse>(&body) {
            Ok(oauth_error) => match oauth_error.error_description {
                Some(description) => format!("{}: {}", oauth_error.error, description),
                None => oauth_error.error,
            },
            Err(_) => body,
        };
        error!("Token request rejected with status {}: {}", status, reason);
        return Err(SoundCloudError::AuthenticationFailed(format!(
            "token endpoint returned {status}: {reason}"
        )));
    }

    let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
        SoundCloudError::AuthenticationFailed(format!("unreadable token response: {e}"))
    })?;

    token_from_response(token_response, Utc::now())
}

fn token_from_response(
    response: TokenResponse,
    obtained_at: DateTime<Utc>,
) -> Result<AccessToken, SoundCloudError> {
    let access_token = response
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            SoundCloudError::AuthenticationFailed(
                "token response did not contain an access_token".to_string(),
            )
        })?;

    Ok(AccessToken {
        access_token,
        token_type: response.token_type,
        expires_in: response.expires_in,
        refresh_token: response.refresh_token,
        scope: response.scope,
        obtained_at,
    })
}
