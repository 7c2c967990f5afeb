//! Tempo and key overview of a playlist, with Camelot wheel codes for
//! harmonic mixing.

use crate::error::{MixtapeError, Result};
use crate::service::{fetch_audio_features, list_playlist_tracks, AudioFeatures, SpotifyService, Track};
use log::info;
use std::collections::HashMap;
use std::fmt;

const PITCH_CLASSES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Major,
    Minor,
}

/// A musical key as reported by the service (pitch class 0 = C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub pitch_class: u8,
    pub mode: Mode,
}

impl Key {
    /// Build from the service's raw `key`/`mode` values; `-1` means unknown.
    pub fn from_raw(key: Option<i32>, mode: Option<i32>) -> Option<Self> {
        let pitch_class = u8::try_from(key?).ok().filter(|k| *k < 12)?;
        let mode = match mode? {
            1 => Mode::Major,
            0 => Mode::Minor,
            _ => return None,
        };
        Some(Self { pitch_class, mode })
    }

    /// Position on the Camelot wheel, `B` for major and `A` for minor.
    pub fn camelot(self) -> String {
        match self.mode {
            Mode::Major => format!("{}B", camelot_number(self.pitch_class)),
            // A minor key shares its number with its relative major
            Mode::Minor => format!("{}A", camelot_number((self.pitch_class + 3) % 12)),
        }
    }
}

/// C major is 8B; each step around the circle of fifths adds one.
fn camelot_number(major_pitch_class: u8) -> u8 {
    (major_pitch_class * 7 + 7) % 12 + 1
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            Mode::Major => "Major",
            Mode::Minor => "Minor",
        };
        write!(f, "{} {mode}", PITCH_CLASSES[usize::from(self.pitch_class)])
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoStats {
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackKeyInfo {
    pub track_name: String,
    pub artists: String,
    pub tempo: Option<f64>,
    pub key: Option<Key>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioSummary {
    pub track_count: usize,
    /// `None` when no track reported a tempo
    pub tempo: Option<TempoStats>,
    /// Most common key first, ties in first-seen order
    pub key_distribution: Vec<(Key, usize)>,
    pub tracks: Vec<TrackKeyInfo>,
}

/// Fetch a playlist and its features, then summarize tempo and keys.
pub fn summarize_playlist(service: &dyn SpotifyService, playlist_id: &str) -> Result<AudioSummary> {
    let tracks = list_playlist_tracks(service, playlist_id)?;
    if tracks.is_empty() {
        return Err(MixtapeError::EmptyInput(format!("playlist {playlist_id} has no tracks")));
    }
    info!("Summarizing {} tracks of {playlist_id}", tracks.len());

    let features = fetch_audio_features(service, &tracks);
    Ok(summarize(&tracks, &features))
}

pub fn summarize(tracks: &[Track], features: &HashMap<String, AudioFeatures>) -> AudioSummary {
    let infos: Vec<TrackKeyInfo> = tracks
        .iter()
        .map(|track| {
            let f = features.get(&track.id);
            TrackKeyInfo {
                track_name: track.name.clone(),
                artists: track.artist_names(),
                tempo: f.and_then(|f| f.tempo),
                key: f.and_then(|f| Key::from_raw(f.key, f.mode)),
            }
        })
        .collect();

    AudioSummary {
        track_count: tracks.len(),
        tempo: tempo_stats(infos.iter().filter_map(|i| i.tempo)),
        key_distribution: key_distribution(infos.iter().filter_map(|i| i.key)),
        tracks: infos,
    }
}

fn tempo_stats(tempos: impl Iterator<Item = f64>) -> Option<TempoStats> {
    let mut count = 0u32;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for tempo in tempos {
        count += 1;
        sum += tempo;
        min = min.min(tempo);
        max = max.max(tempo);
    }
    (count > 0).then(|| TempoStats {
        average: sum / f64::from(count),
        min,
        max,
    })
}

fn key_distribution(keys: impl Iterator<Item = Key>) -> Vec<(Key, usize)> {
    let mut counts: Vec<(Key, usize)> = Vec::new();
    for key in keys {
        match counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += 1,
            None => counts.push((key, 1)),
        }
    }
    // Stable sort keeps first-seen order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
