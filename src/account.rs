use crate::config::MAX_LIMIT;
use crate::error::SoundCloudError;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

/// SoundCloud user as returned by the resolve endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub permalink_url: String,
    pub followers_count: u64,
    pub followings_count: u64,
    pub track_count: u64,
    pub public_favorites_count: Option<u64>,
    pub reposts_count: Option<u64>,
    pub playlist_count: Option<u64>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: u64,
    pub title: String,
    pub permalink_url: String,
    pub created_at: String,
    #[serde(rename = "favoritings_count")]
    pub likes_count: Option<u64>,
    pub playback_count: Option<u64>,
    pub reposts_count: Option<u64>,
    pub comment_count: Option<u64>,
    pub download_count: Option<u64>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub artwork_url: Option<String>,
    /// Milliseconds
    pub duration: Option<u64>,
}

/// One page of a linked-partitioning collection
#[derive(Debug, Deserialize)]
pub struct TracksCollection {
    pub collection: Vec<Track>,
    pub next_href: Option<String>,
}

/// Just enough of a resolved resource to tell users apart from tracks and playlists
#[derive(Debug, Deserialize)]
struct ResolvedKind {
    kind: Option<String>,
}

/// Public statistics of a SoundCloud account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountStats {
    pub username: String,
    pub followers_count: u64,
    pub followings_count: u64,
    pub track_count: u64,
    pub profile_url: String,
    pub public_favorites_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reposts_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub recent_tracks: Vec<TrackSummary>,
    pub total_recent_likes: u64,
    pub total_recent_reposts: u64,
    pub total_recent_plays: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub id: u64,
    pub title: String,
    pub permalink_url: String,
    pub created_at: String,
    pub likes_count: u64,
    pub reposts_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_formatted: Option<String>,
}

impl From<&Track> for TrackSummary {
    fn from(track: &Track) -> Self {
        let duration_seconds = track.duration.map(|millis| millis / 1000);

        Self {
            id: track.id,
            title: track.title.clone(),
            permalink_url: track.permalink_url.clone(),
            created_at: track.created_at.clone(),
            likes_count: track.likes_count.unwrap_or(0),
            reposts_count: track.reposts_count.unwrap_or(0),
            playback_count: track.playback_count,
            comment_count: track.comment_count,
            download_count: track.download_count,
            description: track.description.clone(),
            genre: track.genre.clone(),
            artwork_url: track.artwork_url.clone(),
            duration_seconds,
            duration_formatted: duration_seconds.map(format_duration),
        }
    }
}

/// Format whole seconds as `m:ss`
pub fn format_duration(total_seconds: u64) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

impl AccountStats {
    /// Combine a resolved user with (up to) their most recent tracks
    pub fn from_parts(user: User, tracks: &[Track]) -> Self {
        let total_recent_likes: u64 = tracks.iter().filter_map(|t| t.likes_count).sum();
        let total_recent_reposts: u64 = tracks.iter().filter_map(|t| t.reposts_count).sum();
        let total_recent_plays: u64 = tracks.iter().filter_map(|t| t.playback_count).sum();

        Self {
            username: user.username,
            followers_count: user.followers_count,
            followings_count: user.followings_count,
            track_count: user.track_count,
            profile_url: user.permalink_url,
            public_favorites_count: user.public_favorites_count.unwrap_or(0),
            reposts_count: user.reposts_count,
            playlist_count: user.playlist_count,
            avatar_url: user.avatar_url,
            description: user.description,
            city: user.city,
            country: user.country,
            recent_tracks: tracks.iter().map(TrackSummary::from).collect(),
            total_recent_likes,
            total_recent_reposts,
            total_recent_plays,
        }
    }
}

/// Check that a profile URL points at soundcloud.com before spending a request on it
pub fn validate_profile_url(profile_url: &str) -> Result<Url, SoundCloudError> {
    let invalid = || SoundCloudError::InvalidProfileUrl {
        url: profile_url.to_string(),
    };

    let url = Url::parse(profile_url.trim()).map_err(|_| invalid())?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }

    let host = url.host_str().ok_or_else(invalid)?.to_ascii_lowercase();
    if host != "soundcloud.com" && !host.ends_with(".soundcloud.com") {
        return Err(invalid());
    }

    if url.path().trim_matches('/').is_empty() {
        return Err(invalid());
    }

    Ok(url)
}

/// Resolve a public profile URL and collect the account's statistics.
///
/// `limit` caps how many recent tracks are summarized (at most 200); it has no
/// effect on the follower, following and track counts. A limit of 0 skips the
/// tracks request entirely.
pub async fn get_account_stats(
    http_client: &Client,
    api_base_url: &str,
    profile_url: &str,
    access_token: &str,
    limit: u32,
) -> Result<AccountStats, SoundCloudError> {
    let profile = validate_profile_url(profile_url)?;

    if access_token.trim().is_empty() {
        return Err(SoundCloudError::AuthenticationFailed(
            "access token must not be empty".to_string(),
        ));
    }

    let limit = if limit > MAX_LIMIT {
        warn!("Requested limit {} exceeds {}, capping", limit, MAX_LIMIT);
        MAX_LIMIT
    } else {
        limit
    };

    let api = StatsApi {
        http_client,
        base_url: api_base_url.trim_end_matches('/'),
        access_token,
        profile_url,
    };

    let user = api.resolve_user(&profile).await?;
    debug!(
        "Resolved {} to user id={} (@{})",
        profile_url, user.id, user.username
    );

    let mut tracks = if limit == 0 {
        Vec::new()
    } else {
        api.recent_tracks(user.id, limit).await?
    };
    tracks.truncate(limit as usize);

    let stats = AccountStats::from_parts(user, &tracks);
    info!(
        "Fetched stats for {}: followers={}, followings={}, tracks={}, recent_tracks={}",
        stats.username,
        stats.followers_count,
        stats.followings_count,
        stats.track_count,
        stats.recent_tracks.len()
    );

    Ok(stats)
}

/// Per-call request context for the stats endpoints
struct StatsApi<'a> {
    http_client: &'a Client,
    base_url: &'a str,
    access_token: &'a str,
    profile_url: &'a str,
}

impl StatsApi<'_> {
    async fn resolve_user(&self, profile: &Url) -> Result<User, SoundCloudError> {
        let url = format!("{}/resolve", self.base_url);
        debug!("Resolving profile URL: {}", profile);

        let response = self
            .http_client
            .get(&url)
            .query(&[("url", profile.as_str())])
            .bearer_auth(self.access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SoundCloudError::from_transport("Resolve request failed", e))?;

        let body = self.read_body(response, "resolve profile").await?;

        let resolved: ResolvedKind = parse_json(&body, "resolved resource")?;
        if let Some(kind) = resolved.kind.as_deref() {
            if kind != "user" {
                warn!("{} resolved to a {}, not a user", self.profile_url, kind);
                return Err(SoundCloudError::NotFound {
                    profile_url: self.profile_url.to_string(),
                });
            }
        }

        parse_json(&body, "user data")
    }

    async fn recent_tracks(&self, user_id: u64, limit: u32) -> Result<Vec<Track>, SoundCloudError> {
        let url = format!("{}/users/{}/tracks", self.base_url, user_id);
        debug!("Fetching up to {} recent tracks for user {}", limit, user_id);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("linked_partitioning", "true".to_string()),
                ("limit", limit.to_string()),
            ])
            .bearer_auth(self.access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SoundCloudError::from_transport("Tracks request failed", e))?;

        let body = self.read_body(response, "get user tracks").await?;
        let page: TracksCollection = parse_json(&body, "tracks data")?;

        if page.next_href.is_some() {
            debug!("More tracks available beyond the first page, not following");
        }

        Ok(page.collection)
    }

    /// Map the status to an error kind, or hand back the body of a successful response
    async fn read_body(&self, response: Response, action: &str) -> Result<String, SoundCloudError> {
        let status = response.status();

        if status.is_success() {
            return response.text().await.map_err(|e| {
                SoundCloudError::from_transport(&format!("Failed to read {action} response"), e)
            });
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error response".to_string());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(SoundCloudError::AuthenticationFailed(format!(
                    "Failed to {action}: {status} - {error_text}"
                )))
            }
            StatusCode::NOT_FOUND => Err(SoundCloudError::NotFound {
                profile_url: self.profile_url.to_string(),
            }),
            _ => Err(SoundCloudError::ApiRequestFailed(format!(
                "Failed to {action}: {status} - {error_text}"
            ))),
        }
    }
}

fn parse_json<T: DeserializeOwned>(body: &str, what: &str) -> Result<T, SoundCloudError> {
    serde_json::from_str(body)
        .map_err(|e| SoundCloudError::InvalidResponse(format!("Failed to parse {what}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_json() -> serde_json::Value {
        json!({
            "id": 1234,
            "kind": "user",
            "username": "Chachi",
            "permalink_url": "https://soundcloud.com/chachiofficial",
            "followers_count": 150000,
            "followings_count": 321,
            "track_count": 87,
            "public_favorites_count": 12,
            "reposts_count": null,
            "playlist_count": 4,
            "city": "Los Angeles",
            "country": null,
            "description": "DJ / producer",
            "avatar_url": "https://i1.sndcdn.com/avatars-large.jpg"
        })
    }

    fn track(id: u64, likes: Option<u64>, reposts: Option<u64>, plays: Option<u64>) -> Track {
        Track {
            id,
            title: format!("Track {id}"),
            permalink_url: format!("https://soundcloud.com/chachiofficial/track-{id}"),
            created_at: "2024/05/01 10:00:00 +0000".to_string(),
            likes_count: likes,
            playback_count: plays,
            reposts_count: reposts,
            comment_count: None,
            download_count: None,
            description: None,
            genre: Some("House".to_string()),
            artwork_url: None,
            duration: Some(245_678),
        }
    }

    #[test]
    fn test_user_deserialization() {
        let user: User = serde_json::from_value(user_json()).unwrap();
        assert_eq!(user.id, 1234);
        assert_eq!(user.username, "Chachi");
        assert_eq!(user.followers_count, 150000);
        assert_eq!(user.reposts_count, None);
        assert_eq!(user.playlist_count, Some(4));
        assert_eq!(user.kind.as_deref(), Some("user"));
    }

    #[test]
    fn test_user_missing_core_count_is_rejected() {
        let mut value = user_json();
        value.as_object_mut().unwrap().remove("followers_count");
        let result: Result<User, _> = parse_json(&value.to_string(), "user data");
        assert!(matches!(result, Err(SoundCloudError::InvalidResponse(_))));
    }

    #[test]
    fn test_tracks_collection_deserialization() {
        let page: TracksCollection = serde_json::from_value(json!({
            "collection": [{
                "id": 1,
                "title": "Intro",
                "permalink_url": "https://soundcloud.com/chachiofficial/intro",
                "created_at": "2024/05/01 10:00:00 +0000",
                "favoritings_count": 40,
                "playback_count": 1000,
                "reposts_count": 3,
                "comment_count": 2,
                "duration": 61000
            }],
            "next_href": "https://api.soundcloud.com/users/1234/tracks?cursor=abc"
        }))
        .unwrap();

        assert_eq!(page.collection.len(), 1);
        assert_eq!(page.collection[0].likes_count, Some(40));
        assert_eq!(page.collection[0].download_count, None);
        assert!(page.next_href.is_some());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(245), "4:05");
        assert_eq!(format_duration(3600), "60:00");
    }

    #[test]
    fn test_track_summary_defaults_missing_counts() {
        let summary = TrackSummary::from(&track(7, None, None, None));
        assert_eq!(summary.likes_count, 0);
        assert_eq!(summary.reposts_count, 0);
        assert_eq!(summary.playback_count, None);
        assert_eq!(summary.duration_seconds, Some(245));
        assert_eq!(summary.duration_formatted.as_deref(), Some("4:05"));
    }

    #[test]
    fn test_account_stats_totals() {
        let user: User = serde_json::from_value(user_json()).unwrap();
        let tracks = vec![
            track(1, Some(10), Some(1), Some(100)),
            track(2, None, Some(2), Some(200)),
            track(3, Some(5), None, None),
        ];

        let stats = AccountStats::from_parts(user, &tracks);
        assert_eq!(stats.username, "Chachi");
        assert_eq!(stats.profile_url, "https://soundcloud.com/chachiofficial");
        assert_eq!(stats.public_favorites_count, 12);
        assert_eq!(stats.recent_tracks.len(), 3);
        assert_eq!(stats.total_recent_likes, 15);
        assert_eq!(stats.total_recent_reposts, 3);
        assert_eq!(stats.total_recent_plays, 300);
    }

    #[test]
    fn test_account_stats_mapping_keys() {
        let user: User = serde_json::from_value(user_json()).unwrap();
        let stats = AccountStats::from_parts(user, &[]);
        let value = serde_json::to_value(&stats).unwrap();
        let map = value.as_object().unwrap();

        for key in ["username", "followers_count", "followings_count", "track_count"] {
            assert!(map.contains_key(key), "missing key {key}");
        }
        assert_eq!(map["followers_count"], 150000);
        assert!(!map.contains_key("reposts_count"));
        assert!(!map.contains_key("country"));
        assert_eq!(map["city"], "Los Angeles");
        assert_eq!(map["recent_tracks"], json!([]));
        assert_eq!(map["total_recent_plays"], 0);
    }

    #[test]
    fn test_validate_profile_url() {
        assert!(validate_profile_url("https://soundcloud.com/chachiofficial").is_ok());
        assert!(validate_profile_url("https://m.soundcloud.com/chachiofficial").is_ok());
        assert!(validate_profile_url("http://SoundCloud.com/chachiofficial/").is_ok());

        for bad in [
            "",
            "chachiofficial",
            "https://soundcloud.com/",
            "https://example.com/chachiofficial",
            "https://notsoundcloud.com/chachiofficial",
            "ftp://soundcloud.com/chachiofficial",
        ] {
            match validate_profile_url(bad) {
                Err(SoundCloudError::InvalidProfileUrl { url }) => assert_eq!(url, bad),
                other => panic!("Expected InvalidProfileUrl for {bad:?}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_empty_token_is_rejected_without_request() {
        let client = Client::new();
        let result = get_account_stats(
            &client,
            "https://api.soundcloud.com",
            "https://soundcloud.com/chachiofficial",
            "",
            10,
        )
        .await;
        assert!(matches!(
            result,
            Err(SoundCloudError::AuthenticationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_profile_url_is_rejected_before_token_check() {
        let client = Client::new();
        let result = get_account_stats(
            &client,
            "https://api.soundcloud.com",
            "https://example.com/someone",
            "",
            10,
        )
        .await;
        assert!(matches!(
            result,
            Err(SoundCloudError::InvalidProfileUrl { .. })
        ));
    }
}
