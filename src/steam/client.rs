//! Steam Web API client - fetches player summaries and owned games over HTTP.
//!
//! The [`SteamWebClient`] calls two read-only endpoints of the Steam Web API:
//! `ISteamUser/GetPlayerSummaries` for profiles and `IPlayerService/GetOwnedGames`
//! for library contents. Both require an API key, passed as a query parameter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::model::{AppId, PlayerProfile, SteamId};

use super::{ProfileSource, SteamError};

/// Default Steam Web API base URL.
const DEFAULT_BASE_URL: &str = "https://api.steampowered.com";

const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 30;

const SUMMARIES_ENDPOINT: &str = "ISteamUser/GetPlayerSummaries/v0002";
const OWNED_GAMES_ENDPOINT: &str = "IPlayerService/GetOwnedGames/v0001";

// ==================== Steam API Response Types ====================

/// Top-level envelope for `GetPlayerSummaries`.
#[derive(Debug, Deserialize)]
struct PlayerSummariesEnvelope {
    response: PlayerSummariesBody,
}

#[derive(Debug, Deserialize)]
struct PlayerSummariesBody {
    #[serde(default)]
    players: Vec<PlayerSummary>,
}

/// One player entry. Steam serializes the 64-bit ID as a JSON string.
#[derive(Debug, Deserialize)]
struct PlayerSummary {
    steamid: String,
    personaname: String,
}

/// Top-level envelope for `GetOwnedGames`.
#[derive(Debug, Deserialize)]
struct OwnedGamesEnvelope {
    response: OwnedGamesBody,
}

/// The `response` object is empty (no `games` key) for private profiles.
#[derive(Debug, Default, Deserialize)]
struct OwnedGamesBody {
    games: Option<Vec<OwnedGame>>,
}

#[derive(Debug, Deserialize)]
struct OwnedGame {
    appid: u32,
}

// ==================== SteamWebClient ====================

/// HTTP client for the Steam Web API profile and library endpoints.
///
/// Free games are excluded from owned-game lists
/// (`include_played_free_games=0`), matching the comparison semantics of
/// purchased libraries. App metadata is not requested
/// (`include_appinfo=0`); only app IDs matter here.
pub struct SteamWebClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SteamWebClient {
    /// Creates a client against the public Steam Web API.
    ///
    /// # Errors
    ///
    /// Returns [`SteamError`] if HTTP client construction fails.
    pub fn new(api_key: impl Into<String>) -> Result<Self, SteamError> {
        Self::build(api_key.into(), DEFAULT_BASE_URL.to_string())
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SteamError`] if HTTP client construction fails.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, SteamError> {
        Self::build(api_key.into(), base_url.into())
    }

    fn build(api_key: String, base_url: String) -> Result<Self, SteamError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .user_agent(concat!("libcomparer/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .map_err(|e| SteamError::network("http client construction", e))?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Response, SteamError> {
        let url = format!("{}/{}/", self.base_url, endpoint);
        self.client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| SteamError::network(endpoint, e))
    }
}

impl std::fmt::Debug for SteamWebClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // api_key intentionally omitted
        f.debug_struct("SteamWebClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProfileSource for SteamWebClient {
    #[tracing::instrument(skip(self), fields(steam_id = %id))]
    async fn fetch_profile(&self, id: SteamId) -> Result<PlayerProfile, SteamError> {
        let response = self
            .get(
                SUMMARIES_ENDPOINT,
                &[
                    ("key", self.api_key.clone()),
                    ("steamids", id.to_string()),
                ],
            )
            .await?;

        check_status(SUMMARIES_ENDPOINT, &response)?;

        let envelope: PlayerSummariesEnvelope = response
            .json()
            .await
            .map_err(|e| SteamError::decode(SUMMARIES_ENDPOINT, e.to_string()))?;

        // An unknown account is not an HTTP error: the API answers 200 with
        // an empty players array.
        let Some(player) = envelope.response.players.into_iter().next() else {
            debug!("no player summary returned; treating account as not found");
            return Err(SteamError::NotFound { id });
        };

        let steam_id = player
            .steamid
            .parse::<u64>()
            .map_err(|_| {
                SteamError::decode(
                    SUMMARIES_ENDPOINT,
                    format!("non-numeric steamid {:?}", player.steamid),
                )
            })?;

        debug!(persona_name = %player.personaname, "fetched player summary");

        Ok(PlayerProfile {
            id: SteamId(steam_id),
            persona_name: player.personaname,
        })
    }

    #[tracing::instrument(skip(self), fields(steam_id = %id))]
    async fn fetch_owned_games(&self, id: SteamId) -> Result<Vec<AppId>, SteamError> {
        let response = self
            .get(
                OWNED_GAMES_ENDPOINT,
                &[
                    ("key", self.api_key.clone()),
                    ("steamid", id.to_string()),
                    ("include_appinfo", "0".to_string()),
                    ("include_played_free_games", "0".to_string()),
                    ("format", "json".to_string()),
                ],
            )
            .await?;

        // 401/403 here means the profile blocks library access.
        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            debug!(status = status.as_u16(), "owned games endpoint denied access");
            return Err(SteamError::PrivateLibrary { id });
        }
        check_status(OWNED_GAMES_ENDPOINT, &response)?;

        let envelope: OwnedGamesEnvelope = response
            .json()
            .await
            .map_err(|e| SteamError::decode(OWNED_GAMES_ENDPOINT, e.to_string()))?;

        // A private profile answers 200 with an empty response object
        // (no games key at all). An empty but public library still has
        // the key with an empty array.
        let Some(games) = envelope.response.games else {
            debug!("empty owned games envelope; treating library as private");
            return Err(SteamError::PrivateLibrary { id });
        };

        debug!(game_count = games.len(), "fetched owned games");

        Ok(games.into_iter().map(|g| AppId(g.appid)).collect())
    }
}

/// Maps throttling and error statuses to [`SteamError`], passing 2xx through.
fn check_status(endpoint: &str, response: &Response) -> Result<(), SteamError> {
    let status = response.status();

    if status.as_u16() == 429 {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        warn!(endpoint, ?retry_after, "steam api rate limited the request");
        return Err(SteamError::RateLimited { retry_after });
    }

    if !status.is_success() {
        warn!(endpoint, status = status.as_u16(), "steam api error status");
        return Err(SteamError::status(endpoint, status.as_u16()));
    }

    Ok(())
}
