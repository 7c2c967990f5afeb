//! Blocking Web API client implementing [`SpotifyService`].

use crate::config::{token_cache_path, CachedToken, Credentials};
use crate::error::{MixtapeError, Result};
use crate::ids::track_uri;
use crate::seeder::RecommendationSeeds;
use crate::service::{ArtistRef, AudioFeatures, Page, PlaylistRef, SpotifyService, Track, DEFAULT_RETRY_AFTER};
use log::{debug, info};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

const API_BASE: &str = "https://api.spotify.com/v1";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Page size for the current user's playlist listing
const USER_PLAYLISTS_PAGE: usize = 50;

pub struct SpotifyClient {
    client: Client,
    access_token: String,
}

impl SpotifyClient {
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            access_token: access_token.into(),
        })
    }

    /// Build a client from the token cache next to `config_path`,
    /// refreshing the token once if it has expired.
    pub fn from_token_cache(config_path: &Path, credentials: &Credentials) -> anyhow::Result<Self> {
        use anyhow::Context;

        let cache_path = token_cache_path(config_path);
        let mut token = CachedToken::load(&cache_path)?;

        if token.is_expired(chrono::Utc::now().timestamp()) {
            info!("Access token expired, refreshing");
            token = refresh_token(&token, credentials).context("Failed to refresh the access token")?;
            token.save(&cache_path)?;
        }

        Ok(Self::new(token.access_token)?)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        debug!("GET {path}");
        self.client
            .get(format!("{API_BASE}{path}"))
            .bearer_auth(&self.access_token)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        debug!("POST {path}");
        self.client
            .post(format!("{API_BASE}{path}"))
            .bearer_auth(&self.access_token)
    }

    fn put(&self, path: &str) -> RequestBuilder {
        debug!("PUT {path}");
        self.client
            .put(format!("{API_BASE}{path}"))
            .bearer_auth(&self.access_token)
    }

    fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = check_status(request.send()?, what)?;
        let text = response.text()?;
        serde_json::from_str(&text)
            .map_err(|e| MixtapeError::ExternalService(format!("unexpected response for {what}: {e}")))
    }

    fn execute(&self, request: RequestBuilder, what: &str) -> Result<()> {
        check_status(request.send()?, what)?;
        Ok(())
    }
}

fn check_status(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = parse_retry_after(
        response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok()),
    );
    let body = response
        .text()
        .unwrap_or_else(|_| "Could not read error body".to_string());

    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => MixtapeError::RateLimited { retry_after },
        StatusCode::NOT_FOUND => MixtapeError::NotFound(what.to_string()),
        StatusCode::UNAUTHORIZED => {
            MixtapeError::ExternalService(format!("{what}: access token rejected, authorize again"))
        }
        _ => MixtapeError::ExternalService(format!("{what}: {} {}", status.as_u16(), body.trim())),
    })
}

/// Seconds from a `Retry-After` header, or the default wait.
pub fn parse_retry_after(header: Option<&str>) -> Duration {
    header
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

fn refresh_token(token: &CachedToken, credentials: &Credentials) -> anyhow::Result<CachedToken> {
    use anyhow::anyhow;

    let refresh = token
        .refresh_token
        .as_deref()
        .ok_or_else(|| anyhow!("The cached token has no refresh token; authorize again"))?;
    let (Some(client_id), Some(client_secret)) = (&credentials.client_id, &credentials.client_secret) else {
        return Err(anyhow!("client_id and client_secret are needed to refresh the token"));
    };

    #[derive(Deserialize)]
    struct TokenResponse {
        access_token: String,
        expires_in: i64,
        refresh_token: Option<String>,
    }

    let response = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?
        .post(TOKEN_URL)
        .basic_auth(client_id, Some(client_secret))
        .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh)])
        .send()?;
    let fresh: TokenResponse = check_status(response, "token refresh")?.json()?;

    Ok(CachedToken {
        access_token: fresh.access_token,
        refresh_token: fresh.refresh_token.or_else(|| token.refresh_token.clone()),
        expires_at: chrono::Utc::now().timestamp() + fresh.expires_in,
    })
}

#[derive(Deserialize)]
struct UserDto {
    id: String,
}

#[derive(Deserialize)]
struct NameDto {
    name: String,
}

#[derive(Deserialize)]
struct PlaylistItemsDto {
    items: Vec<PlaylistItemDto>,
    total: usize,
}

#[derive(Deserialize)]
struct PlaylistItemDto {
    track: Option<TrackDto>,
}

#[derive(Deserialize)]
struct TrackDto {
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<ArtistDto>,
    #[serde(default)]
    is_local: bool,
}

#[derive(Deserialize)]
struct ArtistDto {
    id: Option<String>,
    name: String,
}

impl TrackDto {
    /// `None` for local files and tracks without an id
    fn into_track(self) -> Option<Track> {
        if self.is_local {
            return None;
        }
        Some(Track {
            id: self.id?,
            name: self.name,
            artists: self
                .artists
                .into_iter()
                .map(|a| ArtistRef { id: a.id, name: a.name })
                .collect(),
        })
    }
}

#[derive(Deserialize)]
struct AudioFeaturesResponse {
    audio_features: Vec<Option<AudioFeaturesDto>>,
}

#[derive(Deserialize)]
struct AudioFeaturesDto {
    id: String,
    danceability: Option<f64>,
    energy: Option<f64>,
    valence: Option<f64>,
    instrumentalness: Option<f64>,
    acousticness: Option<f64>,
    speechiness: Option<f64>,
    liveness: Option<f64>,
    tempo: Option<f64>,
    key: Option<i32>,
    mode: Option<i32>,
}

impl From<AudioFeaturesDto> for AudioFeatures {
    fn from(dto: AudioFeaturesDto) -> Self {
        Self {
            danceability: dto.danceability,
            energy: dto.energy,
            valence: dto.valence,
            instrumentalness: dto.instrumentalness,
            acousticness: dto.acousticness,
            speechiness: dto.speechiness,
            liveness: dto.liveness,
            tempo: dto.tempo,
            key: dto.key,
            mode: dto.mode,
        }
    }
}

#[derive(Deserialize)]
struct ArtistsResponse {
    artists: Vec<Option<ArtistGenresDto>>,
}

#[derive(Deserialize)]
struct ArtistGenresDto {
    id: String,
    #[serde(default)]
    genres: Vec<String>,
}

#[derive(Deserialize)]
struct RecommendationsDto {
    tracks: Vec<RecommendedTrackDto>,
}

#[derive(Deserialize)]
struct RecommendedTrackDto {
    id: Option<String>,
}

#[derive(Deserialize)]
struct CreatedDto {
    id: String,
}

#[derive(Deserialize)]
struct UserPlaylistsDto {
    items: Vec<Option<UserPlaylistDto>>,
    total: usize,
}

#[derive(Deserialize)]
struct UserPlaylistDto {
    id: String,
    name: String,
    owner: UserDto,
}

/// Query parameters for the recommendations endpoint.
pub fn recommendation_query(seeds: &RecommendationSeeds, limit: usize) -> Vec<(String, String)> {
    let mut query = vec![("limit".to_string(), limit.to_string())];
    for (key, values) in [
        ("seed_tracks", &seeds.seed_tracks),
        ("seed_artists", &seeds.seed_artists),
        ("seed_genres", &seeds.seed_genres),
    ] {
        if !values.is_empty() {
            query.push((key.to_string(), values.join(",")));
        }
    }
    for (feature, value) in &seeds.target_features {
        query.push((format!("target_{feature}"), format!("{value:.3}")));
    }
    query
}

impl SpotifyService for SpotifyClient {
    fn current_user_id(&self) -> Result<String> {
        let user: UserDto = self.fetch(self.get("/me"), "current user")?;
        Ok(user.id)
    }

    fn playlist_name(&self, playlist_id: &str) -> Result<String> {
        let request = self
            .get(&format!("/playlists/{playlist_id}"))
            .query(&[("fields", "name")]);
        let dto: NameDto = self.fetch(request, &format!("playlist {playlist_id}"))?;
        Ok(dto.name)
    }

    fn playlist_tracks_page(&self, playlist_id: &str, offset: usize, limit: usize) -> Result<Page<Track>> {
        let request = self.get(&format!("/playlists/{playlist_id}/tracks")).query(&[
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
            ("fields", "items(track(id,name,is_local,artists(id,name))),total".to_string()),
        ]);
        let dto: PlaylistItemsDto = self.fetch(request, &format!("playlist {playlist_id}"))?;

        let end = offset + dto.items.len();
        let items = dto
            .items
            .into_iter()
            .filter_map(|item| item.track.and_then(TrackDto::into_track))
            .collect();
        Ok(Page {
            items,
            total: dto.total,
            next_offset: (end < dto.total && end > offset).then_some(end),
        })
    }

    fn audio_features(&self, track_ids: &[String]) -> Result<HashMap<String, AudioFeatures>> {
        let request = self.get("/audio-features").query(&[("ids", track_ids.join(","))]);
        let dto: AudioFeaturesResponse = self.fetch(request, "audio features")?;
        Ok(dto
            .audio_features
            .into_iter()
            .flatten()
            .map(|f| (f.id.clone(), AudioFeatures::from(f)))
            .collect())
    }

    fn artist_genres(&self, artist_ids: &[String]) -> Result<HashMap<String, Vec<String>>> {
        let request = self.get("/artists").query(&[("ids", artist_ids.join(","))]);
        let dto: ArtistsResponse = self.fetch(request, "artists")?;
        Ok(dto.artists.into_iter().flatten().map(|a| (a.id, a.genres)).collect())
    }

    fn recommendations(&self, seeds: &RecommendationSeeds, limit: usize) -> Result<Vec<String>> {
        let request = self.get("/recommendations").query(&recommendation_query(seeds, limit));
        let dto: RecommendationsDto = self.fetch(request, "recommendations")?;
        Ok(dto.tracks.into_iter().filter_map(|t| t.id).collect())
    }

    fn create_playlist(&self, owner_id: &str, name: &str) -> Result<String> {
        let request = self.post(&format!("/users/{owner_id}/playlists")).json(&json!({
            "name": name,
            "public": false,
            "description": "Created by mixtape",
        }));
        let created: CreatedDto = self.fetch(request, "create playlist")?;
        Ok(created.id)
    }

    fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        let uris: Vec<String> = track_ids.iter().map(|id| track_uri(id)).collect();
        let request = self
            .post(&format!("/playlists/{playlist_id}/tracks"))
            .json(&json!({ "uris": uris }));
        self.execute(request, &format!("playlist {playlist_id}"))
    }

    fn save_tracks(&self, track_ids: &[String]) -> Result<()> {
        let request = self.put("/me/tracks").json(&json!({ "ids": track_ids }));
        self.execute(request, "liked songs")
    }

    fn user_playlists(&self) -> Result<Vec<PlaylistRef>> {
        let me = self.current_user_id()?;
        let mut playlists = Vec::new();
        let mut offset = 0;

        loop {
            let request = self.get("/me/playlists").query(&[
                ("offset", offset.to_string()),
                ("limit", USER_PLAYLISTS_PAGE.to_string()),
            ]);
            let page: UserPlaylistsDto = self.fetch(request, "user playlists")?;
            let fetched = page.items.len();

            playlists.extend(
                page.items
                    .into_iter()
                    .flatten()
                    .filter(|p| p.owner.id == me)
                    .map(|p| PlaylistRef::new(p.id, p.name)),
            );

            offset += fetched;
            if fetched == 0 || offset >= page.total {
                break;
            }
        }

        debug!("Current user owns {} playlists", playlists.len());
        Ok(playlists)
    }
}
