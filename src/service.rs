//! # Streaming service capabilities
//!
//! [`SpotifyService`] is the only way the core talks to the remote service.
//! The production implementation lives in [`crate::spotify`]; tests use
//! in-memory fakes. Every method is a single blocking call, and every batch
//! argument must already respect the ceilings declared here.
//!
//! [`Throttled`] wraps any implementation and retries a single throttled call
//! after the wait the service asked for.

use crate::error::{MixtapeError, Result};
use crate::seeder::RecommendationSeeds;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

/// Page size used when listing playlist items
pub const PLAYLIST_PAGE_SIZE: usize = 100;
/// Max ids per audio-features request
pub const AUDIO_FEATURES_BATCH: usize = 100;
/// Max ids per several-artists request
pub const ARTISTS_BATCH: usize = 50;
/// Max tracks per add-to-playlist request
pub const ADD_TRACKS_BATCH: usize = 100;
/// Max ids per save-to-library request
pub const SAVE_TRACKS_BATCH: usize = 50;
/// Upper bound the recommendations endpoint accepts for `limit`
pub const MAX_RECOMMENDATIONS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistRef {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<ArtistRef>,
}

impl Track {
    /// Id of the first credited artist, if it has one.
    pub fn primary_artist_id(&self) -> Option<&str> {
        self.artists.first().and_then(|a| a.id.as_deref())
    }

    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A resolved playlist: id plus display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistRef {
    pub id: String,
    pub name: String,
}

impl PlaylistRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One page of an offset-paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    /// Offset of the next page, `None` on the last page
    pub next_offset: Option<usize>,
}

/// Numeric audio attributes of one track. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioFeatures {
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub valence: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub acousticness: Option<f64>,
    pub speechiness: Option<f64>,
    pub liveness: Option<f64>,
    pub tempo: Option<f64>,
    /// Pitch class, 0 = C
    pub key: Option<i32>,
    /// 1 = major, 0 = minor
    pub mode: Option<i32>,
}

/// The averaged features, in the order they are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AudioFeature {
    Danceability,
    Energy,
    Valence,
    Instrumentalness,
    Acousticness,
    Speechiness,
    Liveness,
    Tempo,
}

impl AudioFeature {
    pub const ALL: [AudioFeature; 8] = [
        AudioFeature::Danceability,
        AudioFeature::Energy,
        AudioFeature::Valence,
        AudioFeature::Instrumentalness,
        AudioFeature::Acousticness,
        AudioFeature::Speechiness,
        AudioFeature::Liveness,
        AudioFeature::Tempo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AudioFeature::Danceability => "danceability",
            AudioFeature::Energy => "energy",
            AudioFeature::Valence => "valence",
            AudioFeature::Instrumentalness => "instrumentalness",
            AudioFeature::Acousticness => "acousticness",
            AudioFeature::Speechiness => "speechiness",
            AudioFeature::Liveness => "liveness",
            AudioFeature::Tempo => "tempo",
        }
    }

    pub fn value(self, features: &AudioFeatures) -> Option<f64> {
        match self {
            AudioFeature::Danceability => features.danceability,
            AudioFeature::Energy => features.energy,
            AudioFeature::Valence => features.valence,
            AudioFeature::Instrumentalness => features.instrumentalness,
            AudioFeature::Acousticness => features.acousticness,
            AudioFeature::Speechiness => features.speechiness,
            AudioFeature::Liveness => features.liveness,
            AudioFeature::Tempo => features.tempo,
        }
    }
}

impl fmt::Display for AudioFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Remote operations the core depends on.
pub trait SpotifyService {
    /// Id of the authenticated user
    fn current_user_id(&self) -> Result<String>;

    /// Display name of a playlist
    fn playlist_name(&self, playlist_id: &str) -> Result<String>;

    /// One page of a playlist's tracks. Unplayable/local items are dropped
    /// from `items` but still counted by `next_offset`.
    fn playlist_tracks_page(&self, playlist_id: &str, offset: usize, limit: usize) -> Result<Page<Track>>;

    /// Features for at most [`AUDIO_FEATURES_BATCH`] ids. Ids without data
    /// are absent from the map.
    fn audio_features(&self, track_ids: &[String]) -> Result<HashMap<String, AudioFeatures>>;

    /// Genre tags for at most [`ARTISTS_BATCH`] artist ids.
    fn artist_genres(&self, artist_ids: &[String]) -> Result<HashMap<String, Vec<String>>>;

    /// Recommended track ids for the given seeds.
    fn recommendations(&self, seeds: &RecommendationSeeds, limit: usize) -> Result<Vec<String>>;

    /// Creates a playlist owned by `owner_id` and returns its id.
    fn create_playlist(&self, owner_id: &str, name: &str) -> Result<String>;

    /// Appends at most [`ADD_TRACKS_BATCH`] tracks, in order.
    fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()>;

    /// Saves at most [`SAVE_TRACKS_BATCH`] tracks to the user's liked songs.
    fn save_tracks(&self, track_ids: &[String]) -> Result<()>;

    /// Playlists owned by the current user
    fn user_playlists(&self) -> Result<Vec<PlaylistRef>>;

    /// Case-insensitive name lookup among the user's playlists.
    fn search_playlists_by_name(&self, name: &str) -> Result<Vec<PlaylistRef>> {
        let wanted = name.to_lowercase();
        Ok(self
            .user_playlists()?
            .into_iter()
            .filter(|p| p.name.to_lowercase() == wanted)
            .collect())
    }
}

/// Fetch every track of a playlist, page by page, in playlist order.
///
/// A `NotFound` on the first page means the playlist itself is unreadable
/// and is passed through unchanged.
pub fn list_playlist_tracks(service: &dyn SpotifyService, playlist_id: &str) -> Result<Vec<Track>> {
    let mut tracks = Vec::new();
    let mut offset = 0;

    loop {
        let page = service.playlist_tracks_page(playlist_id, offset, PLAYLIST_PAGE_SIZE)?;
        debug!(
            "Fetched {} tracks of playlist {playlist_id} at offset {offset} (total {})",
            page.items.len(),
            page.total
        );
        tracks.extend(page.items);

        match page.next_offset {
            Some(next) if next > offset => offset = next,
            _ => break,
        }
    }

    Ok(tracks)
}

/// Audio features of the given tracks, requested once per distinct id in
/// batches of [`AUDIO_FEATURES_BATCH`].
///
/// A failed batch is logged and simply contributes nothing.
pub fn fetch_audio_features(service: &dyn SpotifyService, tracks: &[Track]) -> HashMap<String, AudioFeatures> {
    let ids = unique_in_order(tracks.iter().map(|t| t.id.as_str()));
    let mut features = HashMap::with_capacity(ids.len());

    for (i, batch) in ids.chunks(AUDIO_FEATURES_BATCH).enumerate() {
        match service.audio_features(batch) {
            Ok(found) => {
                debug!("Audio features batch {}: {}/{} tracks", i + 1, found.len(), batch.len());
                features.extend(found);
            }
            Err(e) => warn!(
                "Audio features unavailable for {} tracks (batch {}): {e}",
                batch.len(),
                i + 1
            ),
        }
    }

    features
}

pub(crate) fn unique_in_order<'s>(values: impl Iterator<Item = &'s str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// Resolve configured playlist names to the user's playlists.
///
/// Returns the matches in configured order and the names that did not match.
/// Exact matches win; otherwise a unique case-insensitive match is used.
pub fn resolve_playlist_names(
    owned: &[PlaylistRef],
    names: &[String],
) -> (Vec<PlaylistRef>, Vec<String>) {
    let mut found = Vec::new();
    let mut missing = Vec::new();

    for name in names {
        if let Some(exact) = owned.iter().find(|p| &p.name == name) {
            found.push(exact.clone());
            continue;
        }
        let lowered = name.to_lowercase();
        let loose: Vec<&PlaylistRef> = owned
            .iter()
            .filter(|p| p.name.to_lowercase() == lowered)
            .collect();
        match loose.as_slice() {
            [only] => found.push((*only).clone()),
            _ => missing.push(name.clone()),
        }
    }

    (found, missing)
}

/// Wait used when the service throttles without saying how long
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Retries granted to a single throttled call
pub const MAX_THROTTLE_RETRIES: u32 = 1;

/// Decorator that retries a throttled call after the indicated wait.
///
/// Only [`MixtapeError::RateLimited`] is retried, and only the call that was
/// throttled. Once [`MAX_THROTTLE_RETRIES`] are used up the throttle becomes
/// an [`MixtapeError::ExternalService`].
pub struct Throttled<S> {
    inner: S,
    sleep: Box<dyn Fn(Duration)>,
}

impl<S: SpotifyService> Throttled<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            sleep: Box::new(std::thread::sleep),
        }
    }

    /// Replace the sleeping function; tests use this to avoid real waits.
    pub fn with_sleep(mut self, sleep: impl Fn(Duration) + 'static) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn call<T>(&self, operation: &str, mut f: impl FnMut(&S) -> Result<T>) -> Result<T> {
        let mut retries = 0;
        loop {
            match f(&self.inner) {
                Err(MixtapeError::RateLimited { retry_after }) if retries < MAX_THROTTLE_RETRIES => {
                    retries += 1;
                    warn!(
                        "{operation} was rate limited, waiting {}s before retry {retries}/{}",
                        retry_after.as_secs(),
                        MAX_THROTTLE_RETRIES
                    );
                    (self.sleep)(retry_after);
                }
                Err(MixtapeError::RateLimited { .. }) => {
                    return Err(MixtapeError::ExternalService(format!(
                        "{operation} still rate limited after {retries} retr{}",
                        if retries == 1 { "y" } else { "ies" }
                    )));
                }
                other => return other,
            }
        }
    }
}

impl<S: SpotifyService> SpotifyService for Throttled<S> {
    fn current_user_id(&self) -> Result<String> {
        self.call("current_user_id", |s| s.current_user_id())
    }

    fn playlist_name(&self, playlist_id: &str) -> Result<String> {
        self.call("playlist_name", |s| s.playlist_name(playlist_id))
    }

    fn playlist_tracks_page(&self, playlist_id: &str, offset: usize, limit: usize) -> Result<Page<Track>> {
        self.call("playlist_tracks_page", |s| s.playlist_tracks_page(playlist_id, offset, limit))
    }

    fn audio_features(&self, track_ids: &[String]) -> Result<HashMap<String, AudioFeatures>> {
        self.call("audio_features", |s| s.audio_features(track_ids))
    }

    fn artist_genres(&self, artist_ids: &[String]) -> Result<HashMap<String, Vec<String>>> {
        self.call("artist_genres", |s| s.artist_genres(artist_ids))
    }

    fn recommendations(&self, seeds: &RecommendationSeeds, limit: usize) -> Result<Vec<String>> {
        self.call("recommendations", |s| s.recommendations(seeds, limit))
    }

    fn create_playlist(&self, owner_id: &str, name: &str) -> Result<String> {
        self.call("create_playlist", |s| s.create_playlist(owner_id, name))
    }

    fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        self.call("add_tracks", |s| s.add_tracks(playlist_id, track_ids))
    }

    fn save_tracks(&self, track_ids: &[String]) -> Result<()> {
        self.call("save_tracks", |s| s.save_tracks(track_ids))
    }

    fn user_playlists(&self) -> Result<Vec<PlaylistRef>> {
        self.call("user_playlists", |s| s.user_playlists())
    }
}
