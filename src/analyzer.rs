//! # Playlist analysis
//!
//! Reads a whole playlist and condenses it into an [`AnalysisResult`]:
//! the most frequent artist genres, the mean of each numeric audio feature
//! and a handful of seed tracks.
//!
//! ## Aggregation rules
//!
//! - A track contributes each genre at most once (the union of its artists'
//!   genres). Genres are ranked by count, ties going to the genre seen first
//!   in playlist order.
//! - A feature's mean only divides by the tracks that reported that feature.
//!   Missing data is excluded, never treated as zero.
//! - Seeds are simply the first tracks in playlist order.
//!
//! The aggregation helpers are pure so they can be tested and benchmarked
//! without a service.

use crate::error::{MixtapeError, Result};
use crate::service::{
    fetch_audio_features, list_playlist_tracks, unique_in_order, AudioFeature, AudioFeatures, SpotifyService,
    Track, ARTISTS_BATCH,
};
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};

/// How many genres are kept
pub const TOP_GENRES: usize = 5;
/// How many seed tracks are selected
pub const SEED_TRACKS: usize = 5;

/// Condensed character of a playlist. Lives for one curation run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub source_playlist_id: String,
    pub track_count: usize,
    /// At most [`TOP_GENRES`], most frequent first
    pub top_genres: Vec<String>,
    /// Only features at least one track reported
    pub average_features: BTreeMap<AudioFeature, f64>,
    /// At most [`SEED_TRACKS`], in playlist order
    pub seed_track_ids: Vec<String>,
    /// Primary artist of each seed track that has one, in seed order
    pub seed_track_artists: Vec<String>,
}

pub struct PlaylistAnalyzer<'a> {
    service: &'a dyn SpotifyService,
}

impl<'a> PlaylistAnalyzer<'a> {
    pub fn new(service: &'a dyn SpotifyService) -> Self {
        Self { service }
    }

    /// # Errors
    ///
    /// - [`MixtapeError::NotFound`] if the playlist cannot be read
    /// - [`MixtapeError::EmptyInput`] if it has no tracks
    /// - any other service error raised while paging through the playlist
    ///
    /// Failures while fetching features or genres only cost that batch's data.
    pub fn analyze(&self, playlist_id: &str) -> Result<AnalysisResult> {
        info!("Analyzing playlist {playlist_id}");

        let tracks = list_playlist_tracks(self.service, playlist_id).map_err(|e| match e {
            MixtapeError::NotFound(_) => {
                MixtapeError::NotFound(format!("source playlist {playlist_id} could not be read"))
            }
            other => other,
        })?;

        if tracks.is_empty() {
            return Err(MixtapeError::EmptyInput(format!(
                "playlist {playlist_id} has no tracks to analyze"
            )));
        }
        info!("Found {} tracks in playlist {playlist_id}", tracks.len());

        let features = fetch_audio_features(self.service, &tracks);
        let artist_genres = self.fetch_artist_genres(&tracks);

        let per_track_genres: Vec<Vec<String>> = tracks
            .iter()
            .map(|track| track_genres(track, &artist_genres))
            .collect();

        let top_genres = rank_genres(&per_track_genres, TOP_GENRES);
        let average_features =
            average_features(tracks.iter().filter_map(|t| features.get(&t.id)));
        let seeds = select_seed_tracks(&tracks, SEED_TRACKS);

        debug!("Top genres: {top_genres:?}");
        debug!("Average features: {average_features:?}");

        Ok(AnalysisResult {
            source_playlist_id: playlist_id.to_string(),
            track_count: tracks.len(),
            top_genres,
            average_features,
            seed_track_ids: seeds.iter().map(|t| t.id.clone()).collect(),
            seed_track_artists: seeds
                .iter()
                .filter_map(|t| t.primary_artist_id().map(str::to_string))
                .collect(),
        })
    }

    fn fetch_artist_genres(&self, tracks: &[Track]) -> HashMap<String, Vec<String>> {
        let artist_ids = unique_in_order(
            tracks
                .iter()
                .flat_map(|t| t.artists.iter().filter_map(|a| a.id.as_deref())),
        );
        let mut genres = HashMap::with_capacity(artist_ids.len());

        for batch in artist_ids.chunks(ARTISTS_BATCH) {
            match self.service.artist_genres(batch) {
                Ok(found) => genres.extend(found),
                Err(e) => warn!("Genres unavailable for {} artists: {e}", batch.len()),
            }
        }

        genres
    }
}

/// Union of the genres of a track's artists, first-seen order.
pub fn track_genres(track: &Track, artist_genres: &HashMap<String, Vec<String>>) -> Vec<String> {
    let mut genres: Vec<String> = Vec::new();
    for artist_id in track.artists.iter().filter_map(|a| a.id.as_ref()) {
        for genre in artist_genres.get(artist_id).into_iter().flatten() {
            if !genres.contains(genre) {
                genres.push(genre.clone());
            }
        }
    }
    genres
}

/// Most frequent genres across tracks, ties broken by first occurrence.
pub fn rank_genres(per_track: &[Vec<String>], limit: usize) -> Vec<String> {
    // genre -> (count, first position)
    let mut histogram: HashMap<&str, (usize, usize)> = HashMap::new();
    let mut position = 0;

    for genres in per_track {
        for genre in genres {
            let entry = histogram.entry(genre.as_str()).or_insert((0, position));
            entry.0 += 1;
            position += 1;
        }
    }

    let mut ranked: Vec<(&str, (usize, usize))> = histogram.into_iter().collect();
    ranked.sort_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
        count_b.cmp(count_a).then(first_a.cmp(first_b))
    });
    ranked
        .into_iter()
        .take(limit)
        .map(|(genre, _)| genre.to_string())
        .collect()
}

/// Mean of each feature over the tracks that reported it.
pub fn average_features<'f>(
    features: impl IntoIterator<Item = &'f AudioFeatures>,
) -> BTreeMap<AudioFeature, f64> {
    let mut sums: BTreeMap<AudioFeature, (f64, u32)> = BTreeMap::new();

    for track_features in features {
        for feature in AudioFeature::ALL {
            if let Some(value) = feature.value(track_features) {
                let entry = sums.entry(feature).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }
    }

    sums.into_iter()
        .map(|(feature, (sum, count))| (feature, sum / f64::from(count)))
        .collect()
}

/// First `n` tracks in playlist order.
pub fn select_seed_tracks(tracks: &[Track], n: usize) -> &[Track] {
    &tracks[..tracks.len().min(n)]
}
