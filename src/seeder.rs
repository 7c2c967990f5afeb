//! Turns an [`AnalysisResult`] into the seed set for one recommendation call.

use crate::analyzer::AnalysisResult;
use crate::service::AudioFeature;
use log::debug;
use std::collections::BTreeMap;

/// Combined ceiling over tracks, artists and genres
pub const SEED_CEILING: usize = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationSeeds {
    pub seed_tracks: Vec<String>,
    pub seed_artists: Vec<String>,
    pub seed_genres: Vec<String>,
    /// Desired value per feature, sent as `target_<feature>`
    pub target_features: BTreeMap<AudioFeature, f64>,
}

impl RecommendationSeeds {
    pub fn total(&self) -> usize {
        self.seed_tracks.len() + self.seed_artists.len() + self.seed_genres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Fill the seed budget with tracks first, then artists, then genres.
pub fn build_seeds(analysis: &AnalysisResult) -> RecommendationSeeds {
    let mut budget = SEED_CEILING;

    let seed_tracks = take_budget(analysis.seed_track_ids.iter().cloned(), &mut budget);

    let mut artists: Vec<String> = Vec::new();
    for artist in &analysis.seed_track_artists {
        if !artists.contains(artist) {
            artists.push(artist.clone());
        }
    }
    let seed_artists = take_budget(artists.into_iter(), &mut budget);
    let seed_genres = take_budget(analysis.top_genres.iter().cloned(), &mut budget);

    let seeds = RecommendationSeeds {
        seed_tracks,
        seed_artists,
        seed_genres,
        target_features: analysis.average_features.clone(),
    };
    debug!(
        "Seeds: {} tracks, {} artists, {} genres, {} targets",
        seeds.seed_tracks.len(),
        seeds.seed_artists.len(),
        seeds.seed_genres.len(),
        seeds.target_features.len()
    );
    seeds
}

fn take_budget(values: impl Iterator<Item = String>, budget: &mut usize) -> Vec<String> {
    let taken: Vec<String> = values.take(*budget).collect();
    *budget -= taken.len();
    taken
}
