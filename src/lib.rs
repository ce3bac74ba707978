//! Public account statistics from the SoundCloud API.
//!
//! [`auth`] turns the application's client credentials into a bearer token,
//! [`account`] resolves a profile URL and collects its statistics, and
//! [`SoundCloudClient`] runs both in sequence.

pub mod account;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;

pub use account::{AccountStats, TrackSummary};
pub use auth::{AccessToken, Credentials};
pub use client::SoundCloudClient;
pub use config::{Config, ConfigError, SoundCloudConfig};
pub use error::{SoundCloudError, StatsError};
