use crate::account::{self, AccountStats};
use crate::auth::{self, AccessToken, Credentials, CLIENT_CREDENTIALS_GRANT};
use crate::config::{Config, ConfigError, SoundCloudConfig};
use crate::error::{SoundCloudError, StatsError};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Build the HTTP client shared by the token exchange and the stats calls
pub fn build_http_client(config: &SoundCloudConfig) -> Result<Client, SoundCloudError> {
    Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .user_agent(format!("soundcloud-stats/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SoundCloudError::HttpClient(e.to_string()))
}

/// SoundCloud API client: credentials -> access token -> account stats
#[derive(Debug, Clone)]
pub struct SoundCloudClient {
    config: SoundCloudConfig,
    http_client: Client,
}

impl SoundCloudClient {
    pub fn new(config: SoundCloudConfig) -> Result<Self, SoundCloudError> {
        let http_client = build_http_client(&config)?;
        debug!(
            "Created SoundCloud client: api_base_url={}, timeout={}s",
            config.api_base_url, config.http_timeout_secs
        );

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, SoundCloudError> {
        Self::new(config.soundcloud.clone())
    }

    pub fn config(&self) -> &SoundCloudConfig {
        &self.config
    }

    pub fn client_id(&self) -> Result<String, ConfigError> {
        auth::get_client_id(&self.config)
    }

    pub fn client_secret(&self) -> Result<String, ConfigError> {
        auth::get_client_secret(&self.config)
    }

    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        Credentials::from_config(&self.config)
    }

    /// Request a fresh token for the configured credentials
    pub async fn request_token(&self) -> Result<AccessToken, StatsError> {
        let credentials = self.credentials()?;

        let token = auth::request_token(
            &self.http_client,
            &self.config.token_url,
            &credentials.client_id,
            &credentials.client_secret,
            CLIENT_CREDENTIALS_GRANT,
        )
        .await?;

        Ok(token)
    }

    pub async fn access_token(&self) -> Result<String, StatsError> {
        Ok(self.request_token().await?.access_token)
    }

    pub async fn account_stats(
        &self,
        profile_url: &str,
        access_token: &str,
        limit: u32,
    ) -> Result<AccountStats, SoundCloudError> {
        account::get_account_stats(
            &self.http_client,
            &self.config.api_base_url,
            profile_url,
            access_token,
            limit,
        )
        .await
    }

    /// Fetch stats, requesting a token first when none is given.
    ///
    /// Without an explicit limit the configured `default_limit` applies.
    pub async fn fetch_account_stats(
        &self,
        profile_url: &str,
        access_token: Option<&str>,
        limit: Option<u32>,
    ) -> Result<AccountStats, StatsError> {
        let token = match access_token {
            Some(token) => token.to_string(),
            None => {
                info!("No access token supplied, requesting one");
                self.access_token().await?
            }
        };

        let limit = limit.unwrap_or(self.config.default_limit);
        let stats = self.account_stats(profile_url, &token, limit).await?;
        Ok(stats)
    }
}
