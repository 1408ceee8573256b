//! Team roster lookup.
//!
//! Teams attending an event are fetched from a read-only API and cached in
//! the slot store under `teamsCache_<event>` so the list survives going
//! offline. When no roster is available at all, scouts type team numbers by
//! hand ([`parse_manual_team`]).

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RosterConfig;
use crate::error::{Error, Result};
use crate::storage::KeyValueStore;

/// Header carrying the read key.
const AUTH_HEADER: &str = "X-TBA-Auth-Key";

/// Most search hits returned.
pub const MAX_SEARCH_RESULTS: usize = 15;

/// A team at the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    /// Team number.
    pub number: u32,
    /// Display name.
    pub name: String,
}

/// One entry of the `teams/simple` response.
#[derive(Debug, Deserialize)]
struct ApiTeam {
    team_number: u32,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl From<ApiTeam> for TeamInfo {
    fn from(team: ApiTeam) -> Self {
        let name = [team.nickname, team.name]
            .into_iter()
            .flatten()
            .find(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Team {}", team.team_number));
        Self {
            number: team.team_number,
            name,
        }
    }
}

fn normalize(raw: Vec<ApiTeam>) -> Vec<TeamInfo> {
    let mut teams: Vec<TeamInfo> = raw.into_iter().map(TeamInfo::from).collect();
    teams.sort_by_key(|t| t.number);
    teams
}

/// Store slot holding the cached roster for `event_key`.
#[must_use]
pub fn cache_key(event_key: &str) -> String {
    format!("teamsCache_{event_key}")
}

/// HTTP client for the roster API.
#[derive(Debug, Clone)]
pub struct RosterClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RosterClient {
    /// Create a client for `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Create a client from configuration. `None` when lookups are disabled.
    #[must_use]
    pub fn from_config(config: &RosterConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(&config.base_url, config.api_key.clone()))
    }

    /// URL listing the teams at `event_key`.
    #[must_use]
    pub fn teams_url(&self, event_key: &str) -> String {
        format!(
            "{}/event/{}/teams/simple",
            self.base_url.trim_end_matches('/'),
            event_key
        )
    }

    /// Fetch the event's teams, sorted by number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Roster`] on transport failure, a non-success status,
    /// or an unreadable body.
    pub async fn fetch(&self, event_key: &str) -> Result<Vec<TeamInfo>> {
        let url = self.teams_url(event_key);
        debug!("Fetching roster from {}", url);

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header(AUTH_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::roster(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::roster(format!("HTTP {status}")));
        }

        let raw: Vec<ApiTeam> = response
            .json()
            .await
            .map_err(|e| Error::roster(format!("invalid roster response: {e}")))?;
        Ok(normalize(raw))
    }
}

/// Where a loaded roster came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterSource {
    /// Fetched just now.
    Fresh,
    /// Fetch failed or was skipped; read from the cache.
    Cached,
    /// Nothing fetched and nothing cached.
    Unavailable,
    /// Lookups are turned off.
    Disabled,
}

/// A loaded team list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    /// Teams, sorted by number.
    pub teams: Vec<TeamInfo>,
    /// Where they came from.
    pub source: RosterSource,
}

impl Roster {
    fn empty(source: RosterSource) -> Self {
        Self {
            teams: Vec::new(),
            source,
        }
    }
}

/// Read the cached roster. Missing, empty or corrupt caches read as `None`.
pub fn cached_teams<S: KeyValueStore>(store: &S, event_key: &str) -> Option<Vec<TeamInfo>> {
    let key = cache_key(event_key);
    let raw = match store.get(&key) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!("Could not read roster cache {}: {}", key, e);
            return None;
        }
    };
    match serde_json::from_str::<Vec<TeamInfo>>(&raw) {
        Ok(teams) if !teams.is_empty() => Some(teams),
        Ok(_) => None,
        Err(e) => {
            warn!("Roster cache {} is corrupt: {}", key, e);
            None
        }
    }
}

fn save_cache<S: KeyValueStore>(store: &S, event_key: &str, teams: &[TeamInfo]) {
    let key = cache_key(event_key);
    let result = serde_json::to_string(teams)
        .map_err(Error::from)
        .and_then(|json| store.set(&key, &json));
    match result {
        Ok(()) => debug!("Cached {} teams under {}", teams.len(), key),
        Err(e) => warn!("Could not cache roster under {}: {}", key, e),
    }
}

/// Load the event's teams: cache first, then a fresh fetch that overwrites it.
///
/// A failed fetch falls back to whatever was cached. `client` is `None` when
/// lookups are disabled.
pub async fn load_teams<S: KeyValueStore>(
    client: Option<&RosterClient>,
    store: &S,
    event_key: &str,
) -> Roster {
    let Some(client) = client else {
        debug!("Roster lookup disabled");
        return Roster::empty(RosterSource::Disabled);
    };

    let cached = cached_teams(store, event_key);
    if let Some(teams) = &cached {
        debug!("Loaded {} teams from cache", teams.len());
    }

    match client.fetch(event_key).await {
        Ok(teams) => {
            info!("Loaded {} teams for {}", teams.len(), event_key);
            save_cache(store, event_key, &teams);
            Roster {
                teams,
                source: RosterSource::Fresh,
            }
        }
        Err(e) => {
            warn!("Failed to load teams for {}: {}", event_key, e);
            match cached {
                Some(teams) => Roster {
                    teams,
                    source: RosterSource::Cached,
                },
                None => Roster::empty(RosterSource::Unavailable),
            }
        }
    }
}

/// Teams whose number contains `query`, or whose name contains it ignoring case.
///
/// Returns at most [`MAX_SEARCH_RESULTS`]; an empty query matches nothing.
#[must_use]
pub fn search<'a>(teams: &'a [TeamInfo], query: &str) -> Vec<&'a TeamInfo> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    teams
        .iter()
        .filter(|t| t.number.to_string().contains(&query) || t.name.to_lowercase().contains(&query))
        .take(MAX_SEARCH_RESULTS)
        .collect()
}

/// Parse a hand-typed team number: a leading positive integer, anything after ignored.
#[must_use]
pub fn parse_manual_team(text: &str) -> Option<u32> {
    let text = text.trim_start();
    let text = text.strip_prefix('+').unwrap_or(text);
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    text[..end].parse::<u32>().ok().filter(|n| *n > 0)
}
