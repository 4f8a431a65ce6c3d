// Spotify Web API client for queue manipulation
// This module provides bearer-token access to the player and search endpoints
// and refreshes tokens through the Spotify accounts service

use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::{Device, QueueState, Track, TransportCommand};
use crate::helpers::http_client::{HttpClient, HttpClientError};
use crate::queue::provider::{ProviderError, QueueProvider, Result, TrackSearch};

const SPOTIFY_DEFAULT_API_URL: &str = "https://api.spotify.com/v1/";
const SPOTIFY_DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

// Spotify caps search offsets at 1000
const SEARCH_PAGE_SIZE: usize = 50;
const SEARCH_MAX_OFFSET: usize = 1000;

// Refresh tokens this many seconds before they expire
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 60;

// Application credentials compiled in from secrets.txt, see build.rs
fn default_client_id() -> Option<String> {
    option_env!("QUEUESPLICE_DEFAULT_CLIENT_ID").map(|s| s.to_string())
}

fn default_client_secret() -> Option<String> {
    option_env!("QUEUESPLICE_DEFAULT_CLIENT_SECRET").map(|s| s.to_string())
}

// Spotify token data structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp when the token expires, if known
    pub expires_at: Option<u64>,
}

// Spotify player structures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyDevice {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(default)]
    pub is_active: bool,
    pub volume_percent: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTrack {
    pub id: Option<String>,
    pub name: String,
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    pub album: Option<SpotifyAlbum>,
    #[serde(default)]
    pub uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyArtist {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyAlbum {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyQueue {
    pub currently_playing: Option<SpotifyTrack>,
    #[serde(default)]
    pub queue: Vec<SpotifyTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SpotifyDeviceList {
    devices: Vec<SpotifyDevice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SpotifyPaging<T> {
    items: Vec<T>,
    next: Option<String>,
    #[serde(default)]
    offset: usize,
    #[serde(default)]
    limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SpotifySearchResponse {
    tracks: SpotifyPaging<SpotifyTrack>,
}

// Spotify token refresh response
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SpotifyTokenResponse {
    access_token: String,
    token_type: String,
    scope: Option<String>,
    expires_in: u64,
    refresh_token: Option<String>,
}

// Spotify user profile data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyUserProfile {
    pub id: String,
    pub display_name: Option<String>,
}

impl From<SpotifyTrack> for Track {
    fn from(track: SpotifyTrack) -> Self {
        Track {
            id: track.id,
            name: track.name,
            duration_ms: track.duration_ms,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            album: track.album.map(|a| a.name),
            uri: track.uri,
        }
    }
}

/// Spotify configuration structure
#[derive(Debug, Clone, Default)]
pub struct SpotifyConfig {
    pub api_url: String,
    pub token_url: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl SpotifyConfig {
    /// Read the `spotify` service section of the configuration file
    pub fn from_json(spotify_config: &Value) -> Self {
        let get = |key: &str| spotify_config.get(key).and_then(|v| v.as_str()).map(|s| s.to_string());

        SpotifyConfig {
            api_url: non_empty(get("api_url")).unwrap_or_else(|| SPOTIFY_DEFAULT_API_URL.to_string()),
            token_url: non_empty(get("token_url")).unwrap_or_else(|| SPOTIFY_DEFAULT_TOKEN_URL.to_string()),
            access_token: non_empty(get("access_token")),
            refresh_token: non_empty(get("refresh_token")),
            client_id: non_empty(get("client_id")),
            client_secret: non_empty(get("client_secret")),
        }
    }

    /// Apply `SPOTIFY_*` environment overrides and compiled-in application credentials
    pub fn with_env_overrides(mut self) -> Self {
        let env = |key: &str| non_empty(std::env::var(key).ok());

        if let Some(token) = env("SPOTIFY_ACCESS_TOKEN") {
            debug!("Using Spotify access token from environment");
            self.access_token = Some(token);
        }
        if let Some(token) = env("SPOTIFY_REFRESH_TOKEN") {
            self.refresh_token = Some(token);
        }
        self.client_id = env("SPOTIFY_CLIENT_ID").or(self.client_id).or_else(default_client_id);
        self.client_secret = env("SPOTIFY_CLIENT_SECRET").or(self.client_secret).or_else(default_client_secret);
        self
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Extract a track id from a bare id, a `spotify:track:` URI or an open.spotify.com URL
pub fn track_id_from_reference(reference: &str) -> Option<String> {
    let reference = reference.trim();
    let id = if let Some(rest) = reference.strip_prefix("spotify:track:") {
        rest
    } else if let Some(pos) = reference.find("open.spotify.com/") {
        let path = &reference[pos + "open.spotify.com/".len()..];
        let path = path.split(['?', '#']).next().unwrap_or("");
        // Localized links look like open.spotify.com/intl-de/track/<id>
        let mut segments = path.split('/').skip_while(|s| *s != "track");
        segments.next()?;
        segments.next()?
    } else {
        reference
    };

    if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(id.to_string())
    } else {
        None
    }
}

/// Spotify Web API client for the queue tools
pub struct SpotifyClient {
    config: SpotifyConfig,
    http: Box<dyn HttpClient>,
    tokens: Mutex<SpotifyTokens>,
}

impl SpotifyClient {
    /// Create a client from configuration, using `http` for every request
    pub fn new(mut config: SpotifyConfig, http: Box<dyn HttpClient>) -> Result<Self> {
        if !config.api_url.starts_with("http://") && !config.api_url.starts_with("https://") {
            return Err(ProviderError::ConfigError(format!(
                "Invalid API URL: '{}' - must start with http:// or https://",
                config.api_url
            )));
        }

        // Ensure the API URL has a trailing slash
        if !config.api_url.ends_with('/') {
            config.api_url.push('/');
        }

        let tokens = match (&config.access_token, &config.refresh_token) {
            (Some(access), refresh) => SpotifyTokens {
                access_token: access.clone(),
                refresh_token: refresh.clone(),
                expires_at: None,
            },
            (None, Some(refresh)) => SpotifyTokens {
                access_token: String::new(),
                refresh_token: Some(refresh.clone()),
                expires_at: Some(0),
            },
            (None, None) => {
                return Err(ProviderError::AuthError(
                    "No Spotify access or refresh token configured".to_string(),
                ))
            }
        };

        info!("Spotify client initialized for {}", config.api_url);
        Ok(Self {
            config,
            http,
            tokens: Mutex::new(tokens),
        })
    }

    fn tokens(&self) -> MutexGuard<'_, SpotifyTokens> {
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Refresh the access token using the refresh token
    pub fn refresh_token(&self) -> Result<SpotifyTokens> {
        let current = self.tokens().clone();
        let refresh_token = current
            .refresh_token
            .clone()
            .ok_or_else(|| ProviderError::AuthError("Access token expired and no refresh token is configured".to_string()))?;

        let basic;
        let mut form = vec![("grant_type", "refresh_token"), ("refresh_token", refresh_token.as_str())];
        let mut headers = Vec::new();
        match (&self.config.client_id, &self.config.client_secret) {
            (Some(id), Some(secret)) => {
                basic = format!("Basic {}", BASE64.encode(format!("{}:{}", id, secret)));
                headers.push(("Authorization", basic.as_str()));
            }
            (Some(id), None) => form.push(("client_id", id.as_str())),
            _ => {
                return Err(ProviderError::ConfigError(
                    "Token refresh requires a Spotify client_id".to_string(),
                ))
            }
        }

        info!("Refreshing Spotify access token");
        let response = self
            .http
            .post_form_json(&self.config.token_url, &form, &headers)
            .map_err(|e| {
                error!("Failed to refresh Spotify token: {}", e);
                ProviderError::AuthError(format!("Token refresh failed: {}", e))
            })?;
        let token_response: SpotifyTokenResponse = serde_json::from_value(response)?;

        let new_tokens = SpotifyTokens {
            access_token: token_response.access_token,
            // If we got a new refresh token, use it; otherwise keep the old one
            refresh_token: token_response.refresh_token.or(Some(refresh_token)),
            expires_at: Some(now_secs() + token_response.expires_in),
        };
        *self.tokens() = new_tokens.clone();

        info!("Successfully refreshed Spotify access token");
        Ok(new_tokens)
    }

    /// Ensure we have a valid token, refreshing if necessary
    pub fn ensure_valid_token(&self) -> Result<String> {
        let tokens = self.tokens().clone();
        match tokens.expires_at {
            Some(expires_at) if expires_at <= now_secs() + TOKEN_EXPIRY_MARGIN_SECS => {
                info!("Spotify token is expired or about to expire, refreshing");
                Ok(self.refresh_token()?.access_token)
            }
            _ => Ok(tokens.access_token),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url, path)
    }

    /// Perform an authorized request, refreshing the token once on 401
    fn authorized<T>(&self, call: impl Fn(&[(&str, &str)]) -> std::result::Result<T, HttpClientError>) -> Result<T> {
        let access_token = self.ensure_valid_token()?;
        let bearer = format!("Bearer {}", access_token);
        let can_refresh = self.tokens().refresh_token.is_some();

        match call(&[("Authorization", bearer.as_str())]) {
            Err(e) if e.status() == Some(401) && can_refresh => {
                warn!("Spotify rejected the access token, refreshing and retrying");
                let refreshed = self.refresh_token()?;
                let bearer = format!("Bearer {}", refreshed.access_token);
                call(&[("Authorization", bearer.as_str())]).map_err(map_http_error)
            }
            result => result.map_err(map_http_error),
        }
    }

    /// GET a JSON document; `None` means the API answered without content
    fn api_get(&self, path: &str) -> Result<Option<Value>> {
        let url = self.url(path);
        match self.authorized(|headers| self.http.get_json_with_headers(&url, headers)) {
            Ok(value) if value.is_null() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(ProviderError::Http(HttpClientError::EmptyResponse)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Get the current user's profile
    pub fn current_user(&self) -> Result<SpotifyUserProfile> {
        let value = self
            .api_get("me")?
            .ok_or_else(|| ProviderError::ApiError("Empty user profile".to_string()))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Get the user's queue
    ///
    /// See: https://developer.spotify.com/documentation/web-api/reference/get-queue
    pub fn get_queue(&self) -> Result<SpotifyQueue> {
        match self.api_get("me/player/queue")? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(SpotifyQueue { currently_playing: None, queue: Vec::new() }),
        }
    }

    /// Send a transport command (next, previous, pause) to a device
    pub fn send_command(&self, command: TransportCommand, device_id: &str) -> Result<()> {
        let url = self.url(&format!("me/player/{}?device_id={}", command, urlencoding::encode(device_id)));
        debug!("Sending Spotify command {} to device {}", command, device_id);

        let result = self.authorized(|headers| match command.http_method() {
            "PUT" => self.http.put_with_headers(&url, None, headers),
            _ => self.http.post_with_headers(&url, None, headers),
        });

        match result {
            Ok(_) => Ok(()),
            // Spotify answers 403 when pausing a player that is already paused
            Err(ProviderError::Http(e)) if command == TransportCommand::Pause && e.status() == Some(403) => {
                debug!("Pause ignored, playback already paused");
                Ok(())
            }
            Err(e) => {
                error!("Spotify command {} failed: {}", command, e);
                Err(e)
            }
        }
    }

    /// Add a track to the end of the user's queue
    pub fn add_to_queue(&self, uri: &str, device_id: &str) -> Result<()> {
        let url = self.url(&format!(
            "me/player/queue?uri={}&device_id={}",
            urlencoding::encode(uri),
            urlencoding::encode(device_id)
        ));
        info!("Adding {} to the Spotify queue", uri);
        self.authorized(|headers| self.http.post_with_headers(&url, None, headers))
            .map(|_| ())
    }

    /// Fetch a track by id, URI or share URL
    pub fn get_track(&self, reference: &str) -> Result<Track> {
        let id = track_id_from_reference(reference)
            .ok_or_else(|| ProviderError::TrackNotFound(reference.to_string()))?;
        let value = self
            .api_get(&format!("tracks/{}", id))?
            .ok_or_else(|| ProviderError::TrackNotFound(reference.to_string()))?;
        let track: SpotifyTrack = serde_json::from_value(value)?;
        Ok(track.into())
    }

    /// Search tracks by title and artist, following every result page
    pub fn search(&self, title: &str, artist: &str) -> Result<Vec<SpotifyTrack>> {
        let query = format!("{} artist:{}", title, artist);
        let mut results = Vec::new();
        let mut offset = 0;

        loop {
            let path = format!(
                "search?q={}&type=track&limit={}&offset={}",
                urlencoding::encode(&query),
                SEARCH_PAGE_SIZE,
                offset
            );
            let page = match self.api_get(&path)? {
                Some(value) => serde_json::from_value::<SpotifySearchResponse>(value)?.tracks,
                None => break,
            };

            let fetched = page.items.len();
            results.extend(page.items);

            if page.next.is_none() || fetched == 0 {
                break;
            }
            offset = page.offset + page.limit.max(fetched);
            if offset >= SEARCH_MAX_OFFSET {
                warn!("Stopping search for '{}' after {} results", query, results.len());
                break;
            }
        }

        debug!("Search for '{}' returned {} tracks", query, results.len());
        Ok(results)
    }
}

fn map_http_error(e: HttpClientError) -> ProviderError {
    match e.status() {
        Some(401) => ProviderError::AuthError(format!("Authentication failed: {}", e)),
        Some(404) => ProviderError::ApiError(format!("No active device or resource not found: {}", e)),
        _ => ProviderError::Http(e),
    }
}

impl QueueProvider for SpotifyClient {
    fn devices(&self) -> Result<Vec<Device>> {
        let list: SpotifyDeviceList = match self.api_get("me/player/devices")? {
            Some(value) => serde_json::from_value(value)?,
            None => return Ok(Vec::new()),
        };

        // Restricted devices have no id and cannot be controlled
        Ok(list
            .devices
            .into_iter()
            .filter_map(|d| {
                d.id.map(|id| Device {
                    id,
                    name: d.name,
                    kind: d.device_type,
                    is_active: d.is_active,
                })
            })
            .collect())
    }

    fn queue_state(&self) -> Result<QueueState> {
        let queue = self.get_queue()?;

        if let Some(track) = &queue.currently_playing {
            debug!("Currently playing: {}", track.name);
        }
        Ok(QueueState {
            currently_playing: queue.currently_playing.map(Track::from),
            upcoming: queue.queue.into_iter().map(Track::from).collect(),
        })
    }

    fn transport(&self, command: TransportCommand, device_id: &str) -> Result<()> {
        self.send_command(command, device_id)
    }

    fn enqueue(&self, uri: &str, device_id: &str) -> Result<()> {
        self.add_to_queue(uri, device_id)
    }

    fn track(&self, reference: &str) -> Result<Track> {
        self.get_track(reference)
    }
}

impl TrackSearch for SpotifyClient {
    fn search_tracks(&self, title: &str, artist: &str) -> Result<Vec<Track>> {
        Ok(self
            .search(title, artist)?
            .into_iter()
            .map(Track::from)
            .filter(|t| t.has_artist(artist))
            .collect())
    }
}
