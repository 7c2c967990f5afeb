//! # Track distribution
//!
//! [`TrackDistributor`] sends a list of tracks to several playlists and,
//! optionally, to the user's liked songs. Every (track, target) pair ends up
//! as exactly one [`BatchResult`]; nothing short of a programming error makes
//! `distribute` fail as a whole.
//!
//! Calls are grouped per target: liked songs first in batches of
//! [`SAVE_TRACKS_BATCH`], then each playlist in configured order in batches of
//! [`ADD_TRACKS_BATCH`]. Input order is kept inside every batch. A locked
//! playlist is recorded as a failure with reason [`LOCKED_REASON`] for every
//! track and never called.

use crate::error::{MixtapeError, Result};
use crate::service::{
    list_playlist_tracks, PlaylistRef, SpotifyService, ADD_TRACKS_BATCH, SAVE_TRACKS_BATCH,
};
use crate::store::{LockGuard, Unguarded};
use log::{debug, info, warn};
use std::fmt;

/// Reason recorded for targets skipped because of a lock
pub const LOCKED_REASON: &str = "locked";
/// Target name used for the liked-songs save
pub const LIKED_SONGS: &str = "Liked Songs";

/// Outcome of one track against one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub target_name: String,
    pub succeeded: bool,
    pub reason: Option<String>,
}

impl BatchResult {
    fn ok(target_name: &str) -> Self {
        Self {
            target_name: target_name.to_string(),
            succeeded: true,
            reason: None,
        }
    }

    fn failed(target_name: &str, reason: impl Into<String>) -> Self {
        Self {
            target_name: target_name.to_string(),
            succeeded: false,
            reason: Some(reason.into()),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.reason.as_deref() == Some(LOCKED_REASON)
    }
}

/// All results for one input track, liked songs first, then targets in
/// configured order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackOutcome {
    pub track_id: String,
    pub results: Vec<BatchResult>,
}

impl TrackOutcome {
    /// At least one target took the track
    pub fn succeeded(&self) -> bool {
        self.results.iter().any(|r| r.succeeded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every attempt succeeded, or there was nothing to attempt
    Complete,
    /// Some attempts failed but at least one track landed somewhere
    Partial,
    /// Nothing succeeded
    Failed,
}

impl RunStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Complete => 0,
            RunStatus::Failed => 2,
            RunStatus::Partial => 3,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStatus::Complete => "complete",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionSummary {
    pub tracks: Vec<TrackOutcome>,
}

impl DistributionSummary {
    /// Number of (track, target) attempts
    pub fn total_targets(&self) -> usize {
        self.tracks.iter().map(|t| t.results.len()).sum()
    }

    pub fn succeeded_count(&self) -> usize {
        self.tracks
            .iter()
            .flat_map(|t| &t.results)
            .filter(|r| r.succeeded)
            .count()
    }

    /// Tracks that landed in at least one target
    pub fn tracks_succeeded(&self) -> usize {
        self.tracks.iter().filter(|t| t.succeeded()).count()
    }

    /// `Complete` when there was nothing to place or every attempt landed,
    /// `Failed` when no track landed anywhere, `Partial` otherwise.
    pub fn status(&self) -> RunStatus {
        let placed = self.tracks_succeeded();
        if self.tracks.is_empty() || (placed == self.tracks.len() && self.succeeded_count() == self.total_targets()) {
            RunStatus::Complete
        } else if placed == 0 {
            RunStatus::Failed
        } else {
            RunStatus::Partial
        }
    }
}

pub struct TrackDistributor<'a> {
    service: &'a dyn SpotifyService,
    guard: &'a dyn LockGuard,
}

impl<'a> TrackDistributor<'a> {
    pub fn new(service: &'a dyn SpotifyService, guard: &'a dyn LockGuard) -> Self {
        Self { service, guard }
    }

    pub fn distribute(
        &self,
        track_ids: &[String],
        targets: &[PlaylistRef],
        also_like: bool,
    ) -> DistributionSummary {
        let mut outcomes: Vec<TrackOutcome> = track_ids
            .iter()
            .map(|id| TrackOutcome {
                track_id: id.clone(),
                results: Vec::with_capacity(targets.len() + usize::from(also_like)),
            })
            .collect();

        if track_ids.is_empty() {
            debug!("Nothing to distribute");
            return DistributionSummary { tracks: outcomes };
        }

        if also_like {
            self.save_liked(track_ids, &mut outcomes);
        }

        for target in targets {
            if !self.guard.may_modify(&target.id) {
                info!("Skipping locked playlist '{}' ({})", target.name, target.id);
                for outcome in &mut outcomes {
                    outcome.results.push(BatchResult::failed(&target.name, LOCKED_REASON));
                }
                continue;
            }
            self.add_to_playlist(target, track_ids, &mut outcomes);
        }

        DistributionSummary { tracks: outcomes }
    }

    fn save_liked(&self, track_ids: &[String], outcomes: &mut [TrackOutcome]) {
        for (batch, slots) in track_ids
            .chunks(SAVE_TRACKS_BATCH)
            .zip(outcomes.chunks_mut(SAVE_TRACKS_BATCH))
        {
            let result = match self.service.save_tracks(batch) {
                Ok(()) => {
                    debug!("Saved {} tracks to liked songs", batch.len());
                    BatchResult::ok(LIKED_SONGS)
                }
                Err(e) => {
                    warn!("Saving {} tracks to liked songs failed: {e}", batch.len());
                    BatchResult::failed(LIKED_SONGS, e.to_string())
                }
            };
            for slot in slots {
                slot.results.push(result.clone());
            }
        }
    }

    fn add_to_playlist(&self, target: &PlaylistRef, track_ids: &[String], outcomes: &mut [TrackOutcome]) {
        for (i, (batch, slots)) in track_ids
            .chunks(ADD_TRACKS_BATCH)
            .zip(outcomes.chunks_mut(ADD_TRACKS_BATCH))
            .enumerate()
        {
            let result = match self.service.add_tracks(&target.id, batch) {
                Ok(()) => {
                    debug!("Added batch {} ({} tracks) to '{}'", i + 1, batch.len(), target.name);
                    BatchResult::ok(&target.name)
                }
                Err(e) => {
                    warn!("Adding {} tracks to '{}' failed: {e}", batch.len(), target.name);
                    BatchResult::failed(&target.name, e.to_string())
                }
            };
            for slot in slots {
                slot.results.push(result.clone());
            }
        }
    }
}

/// A finished copy: where the tracks went and how each one fared.
#[derive(Debug, Clone)]
pub struct CopyReport {
    pub playlist: PlaylistRef,
    pub summary: DistributionSummary,
}

/// Copy every track of `source_id` into a new playlist named `new_name`.
///
/// # Errors
///
/// - [`MixtapeError::NotFound`] if the source cannot be read
/// - [`MixtapeError::Creation`] if the destination cannot be created
pub fn copy_playlist(service: &dyn SpotifyService, source_id: &str, new_name: &str) -> Result<CopyReport> {
    let tracks = list_playlist_tracks(service, source_id)?;
    info!("Copying {} tracks from {source_id} to '{new_name}'", tracks.len());

    let owner = service
        .current_user_id()
        .map_err(|e| MixtapeError::Creation(format!("could not identify the current user: {e}")))?;
    let new_id = service
        .create_playlist(&owner, new_name)
        .map_err(|e| MixtapeError::Creation(format!("'{new_name}': {e}")))?;
    let playlist = PlaylistRef::new(new_id, new_name);

    let track_ids: Vec<String> = tracks.into_iter().map(|t| t.id).collect();
    // A playlist created a moment ago cannot be locked
    let summary = TrackDistributor::new(service, &Unguarded).distribute(
        &track_ids,
        std::slice::from_ref(&playlist),
        false,
    );

    Ok(CopyReport { playlist, summary })
}
