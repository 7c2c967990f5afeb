//! In-memory [`SpotifyService`] used by unit tests. Records every call and
//! enforces the per-call batch ceilings so tests catch oversized requests.

use crate::error::{MixtapeError, Result};
use crate::seeder::RecommendationSeeds;
use crate::service::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Default)]
struct State {
    playlists: Vec<(PlaylistRef, Vec<Track>)>,
    features: HashMap<String, AudioFeatures>,
    genres: HashMap<String, Vec<String>>,
    recommendations: Vec<String>,
    liked: Vec<String>,
    calls: Vec<(String, String)>,
    add_batches: Vec<(String, usize)>,
    throttles: HashMap<String, (u32, Duration)>,
    failing_ops: HashMap<String, String>,
    failing_playlists: HashMap<String, String>,
    last_seeds: Option<RecommendationSeeds>,
    created: u32,
}

#[derive(Default)]
pub struct FakeSpotify {
    state: RefCell<State>,
}

impl FakeSpotify {
    pub fn new() -> Self {
        Self::default()
    }

    /// `n` tracks `{prefix}0..`, each by its own artist `{prefix}-artist{i}`.
    pub fn tracks(prefix: &str, n: usize) -> Vec<Track> {
        (0..n)
            .map(|i| track(&format!("{prefix}{i}"), &format!("{prefix}-artist{i}")))
            .collect()
    }

    pub fn add_playlist(&self, id: &str, name: &str, tracks: Vec<Track>) {
        self.state
            .borrow_mut()
            .playlists
            .push((PlaylistRef::new(id, name), tracks));
    }

    pub fn set_features(&self, track_id: &str, features: AudioFeatures) {
        self.state.borrow_mut().features.insert(track_id.to_string(), features);
    }

    pub fn set_artist_genres(&self, artist_id: &str, genres: &[&str]) {
        self.state
            .borrow_mut()
            .genres
            .insert(artist_id.to_string(), genres.iter().map(|g| g.to_string()).collect());
    }

    pub fn set_recommendations(&self, ids: &[&str]) {
        self.state.borrow_mut().recommendations = ids.iter().map(|s| s.to_string()).collect();
    }

    /// Make the next `times` calls of `operation` fail with a throttle.
    pub fn throttle_next(&self, operation: &str, times: u32, retry_after: Duration) {
        self.state
            .borrow_mut()
            .throttles
            .insert(operation.to_string(), (times, retry_after));
    }

    /// Make every call of `operation` fail with an external-service error.
    pub fn fail_operation(&self, operation: &str, message: &str) {
        self.state
            .borrow_mut()
            .failing_ops
            .insert(operation.to_string(), message.to_string());
    }

    /// Make additions to one playlist fail.
    pub fn fail_playlist(&self, playlist_id: &str, message: &str) {
        self.state
            .borrow_mut()
            .failing_playlists
            .insert(playlist_id.to_string(), message.to_string());
    }

    pub fn calls_named(&self, operation: &str) -> usize {
        self.state.borrow().calls.iter().filter(|(op, _)| op == operation).count()
    }

    pub fn call_log(&self) -> Vec<String> {
        self.state.borrow().calls.iter().map(|(op, _)| op.clone()).collect()
    }

    /// Sizes of each add_tracks call made against `playlist_id`.
    pub fn add_batch_sizes(&self, playlist_id: &str) -> Vec<usize> {
        self.state
            .borrow()
            .add_batches
            .iter()
            .filter(|(id, _)| id == playlist_id)
            .map(|(_, n)| *n)
            .collect()
    }

    pub fn playlist_track_ids(&self, playlist_id: &str) -> Vec<String> {
        self.state
            .borrow()
            .playlists
            .iter()
            .find(|(p, _)| p.id == playlist_id)
            .map(|(_, tracks)| tracks.iter().map(|t| t.id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn liked(&self) -> Vec<String> {
        self.state.borrow().liked.clone()
    }

    pub fn last_seeds(&self) -> Option<RecommendationSeeds> {
        self.state.borrow().last_seeds.clone()
    }

    fn enter(&self, operation: &str, detail: String) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push((operation.to_string(), detail));

        if let Some((remaining, retry_after)) = state.throttles.get_mut(operation) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(MixtapeError::RateLimited { retry_after: *retry_after });
            }
        }
        if let Some(message) = state.failing_ops.get(operation) {
            return Err(MixtapeError::ExternalService(message.clone()));
        }
        Ok(())
    }
}

/// Track with a single artist.
pub fn track(id: &str, artist_id: &str) -> Track {
    Track {
        id: id.to_string(),
        name: format!("Song {id}"),
        artists: vec![ArtistRef {
            id: Some(artist_id.to_string()),
            name: format!("Artist {artist_id}"),
        }],
    }
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl SpotifyService for FakeSpotify {
    fn current_user_id(&self) -> Result<String> {
        self.enter("current_user_id", String::new())?;
        Ok("me".to_string())
    }

    fn playlist_name(&self, playlist_id: &str) -> Result<String> {
        self.enter("playlist_name", playlist_id.to_string())?;
        self.state
            .borrow()
            .playlists
            .iter()
            .find(|(p, _)| p.id == playlist_id)
            .map(|(p, _)| p.name.clone())
            .ok_or_else(|| MixtapeError::NotFound(format!("playlist {playlist_id}")))
    }

    fn playlist_tracks_page(&self, playlist_id: &str, offset: usize, limit: usize) -> Result<Page<Track>> {
        self.enter("playlist_tracks_page", format!("{playlist_id}@{offset}"))?;
        assert!(limit <= PLAYLIST_PAGE_SIZE, "page size {limit} over ceiling");
        let state = self.state.borrow();
        let (_, tracks) = state
            .playlists
            .iter()
            .find(|(p, _)| p.id == playlist_id)
            .ok_or_else(|| MixtapeError::NotFound(format!("playlist {playlist_id}")))?;

        let items: Vec<Track> = tracks.iter().skip(offset).take(limit).cloned().collect();
        let end = offset + items.len();
        Ok(Page {
            items,
            total: tracks.len(),
            next_offset: (end < tracks.len()).then_some(end),
        })
    }

    fn audio_features(&self, track_ids: &[String]) -> Result<HashMap<String, AudioFeatures>> {
        self.enter("audio_features", track_ids.len().to_string())?;
        assert!(track_ids.len() <= AUDIO_FEATURES_BATCH, "features batch over ceiling");
        let state = self.state.borrow();
        Ok(track_ids
            .iter()
            .filter_map(|id| state.features.get(id).map(|f| (id.clone(), f.clone())))
            .collect())
    }

    fn artist_genres(&self, artist_ids: &[String]) -> Result<HashMap<String, Vec<String>>> {
        self.enter("artist_genres", artist_ids.len().to_string())?;
        assert!(artist_ids.len() <= ARTISTS_BATCH, "artists batch over ceiling");
        let state = self.state.borrow();
        Ok(artist_ids
            .iter()
            .map(|id| (id.clone(), state.genres.get(id).cloned().unwrap_or_default()))
            .collect())
    }

    fn recommendations(&self, seeds: &RecommendationSeeds, limit: usize) -> Result<Vec<String>> {
        self.enter("recommendations", limit.to_string())?;
        let mut state = self.state.borrow_mut();
        state.last_seeds = Some(seeds.clone());
        Ok(state.recommendations.iter().take(limit).cloned().collect())
    }

    fn create_playlist(&self, owner_id: &str, name: &str) -> Result<String> {
        self.enter("create_playlist", format!("{owner_id}:{name}"))?;
        let mut state = self.state.borrow_mut();
        state.created += 1;
        let id = format!("new{}", state.created);
        state.playlists.push((PlaylistRef::new(id.clone(), name), Vec::new()));
        Ok(id)
    }

    fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        self.enter("add_tracks", playlist_id.to_string())?;
        assert!(track_ids.len() <= ADD_TRACKS_BATCH, "add batch over ceiling");
        let mut state = self.state.borrow_mut();
        state.add_batches.push((playlist_id.to_string(), track_ids.len()));
        if let Some(message) = state.failing_playlists.get(playlist_id) {
            return Err(MixtapeError::ExternalService(message.clone()));
        }
        let (_, tracks) = state
            .playlists
            .iter_mut()
            .find(|(p, _)| p.id == playlist_id)
            .ok_or_else(|| MixtapeError::NotFound(format!("playlist {playlist_id}")))?;
        tracks.extend(track_ids.iter().map(|id| track(id, "unknown")));
        Ok(())
    }

    fn save_tracks(&self, track_ids: &[String]) -> Result<()> {
        self.enter("save_tracks", track_ids.len().to_string())?;
        assert!(track_ids.len() <= SAVE_TRACKS_BATCH, "save batch over ceiling");
        self.state.borrow_mut().liked.extend(track_ids.iter().cloned());
        Ok(())
    }

    fn user_playlists(&self) -> Result<Vec<PlaylistRef>> {
        self.enter("user_playlists", String::new())?;
        Ok(self.state.borrow().playlists.iter().map(|(p, _)| p.clone()).collect())
    }
}
