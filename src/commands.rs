//! Command handlers: turn parsed arguments into core calls and print the
//! results. Handlers that move tracks return the run's [`RunStatus`] so
//! `main` can pick the exit code.

use crate::audio_summary::summarize_playlist;
use crate::curator::{CurationOutcome, CurationStage, PlaylistCurator, ProgressSink};
use crate::distributor::{copy_playlist, DistributionSummary, RunStatus, TrackDistributor};
use crate::error::MixtapeError;
use crate::ids::{playlist_url, require_playlist_id, require_track_id};
use crate::service::{resolve_playlist_names, SpotifyService};
use crate::setup::{build_genre_group, Prompt};
use crate::store::{ConfigStore, LockGuard, LockOutcome, LockedPlaylistRef, PutOutcome, Unguarded};
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;

/// Prints curation stages as they happen.
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn stage_started(&mut self, stage: CurationStage) {
        println!("{stage}...");
    }

    fn stage_finished(&mut self, _stage: CurationStage, detail: &str) {
        println!("   ✅ {detail}");
    }

    fn aborted(&mut self, stage: CurationStage, error: &MixtapeError) {
        println!("   ❌ Stopped at stage {}: {error}", stage.number());
    }
}

pub fn add_tracks(
    service: &dyn SpotifyService,
    store: &ConfigStore,
    inputs: &[String],
    genre: Option<&str>,
    force: bool,
) -> Result<RunStatus> {
    let track_ids = inputs
        .iter()
        .map(|input| require_track_id(input))
        .collect::<Result<Vec<_>, _>>()?;
    let group = store.genre_or_default(genre)?;
    info!("Adding {} tracks using genre '{}'", track_ids.len(), group.name);

    let owned = service
        .user_playlists()
        .context("Failed to list your playlists")?;
    let (targets, missing) = resolve_playlist_names(&owned, &group.playlist_names);
    for name in &missing {
        warn!("Playlist '{name}' from genre '{}' was not found", group.name);
        println!("⚠️  Playlist not found: {name}");
    }

    if targets.is_empty() && !group.save_to_liked {
        println!("❌ No playlists of genre '{}' could be found; nothing to do", group.name);
        return Ok(RunStatus::Failed);
    }

    let guard: &dyn LockGuard = if force { &Unguarded } else { store };
    let summary = TrackDistributor::new(service, guard).distribute(&track_ids, &targets, group.save_to_liked);

    print_summary(&summary);
    Ok(summary.status())
}

pub fn copy(service: &dyn SpotifyService, source: &str, name: &str) -> Result<RunStatus> {
    let source_id = require_playlist_id(source)?;
    let report = copy_playlist(service, &source_id, name)?;

    println!("📋 Created '{}': {}", report.playlist.name, playlist_url(&report.playlist.id));
    print_summary(&report.summary);
    Ok(report.summary.status())
}

pub fn curate(
    service: &dyn SpotifyService,
    store: &ConfigStore,
    source: &str,
    name: Option<&str>,
    limit: usize,
) -> Result<RunStatus> {
    let source_id = require_playlist_id(source)?;
    let curator = PlaylistCurator::new(service, store).with_limit(limit);

    match curator.curate(&source_id, name, &mut ConsoleProgress) {
        CurationOutcome::Completed(report) => {
            println!();
            println!("🎉 Curated playlist '{}'", report.playlist.name);
            println!("🔗 {}", playlist_url(&report.playlist.id));
            print_summary(&report.summary);
            Ok(report.summary.status())
        }
        CurationOutcome::Aborted { stage, error } => {
            Err(anyhow::Error::new(error).context(format!("Curation stopped at stage {}", stage.number())))
        }
    }
}

pub fn lock(service: &dyn SpotifyService, store: &mut ConfigStore, playlist: &str) -> Result<()> {
    let id = require_playlist_id(playlist)?;
    if store.is_locked(&id) {
        println!("🔒 Playlist {id} is already locked");
        return Ok(());
    }

    let name = service
        .playlist_name(&id)
        .with_context(|| format!("Failed to look up playlist {id}"))?;
    match store.lock(LockedPlaylistRef { id: id.clone(), name: name.clone() }) {
        LockOutcome::Locked => println!("🔒 Locked '{name}' ({id})"),
        LockOutcome::AlreadyLocked => println!("🔒 '{name}' is already locked"),
    }
    Ok(())
}

pub fn unlock(store: &mut ConfigStore, playlist: &str) -> Result<()> {
    let id = require_playlist_id(playlist)?;
    if store.unlock(&id) {
        println!("🔓 Unlocked {id}");
    } else {
        println!("ℹ️  Playlist {id} was not locked");
    }
    Ok(())
}

pub fn list_locked(store: &ConfigStore) {
    let locked = store.list_locked();
    if locked.is_empty() {
        println!("No locked playlists");
        return;
    }
    println!("🔒 Locked playlists");
    println!("═════════════════");
    for entry in locked {
        println!("  {} ({})", entry.name, entry.id);
    }
}

pub fn show_config(store: &ConfigStore, config_path: &Path) {
    println!("⚙️  Configuration: {}", config_path.display());
    println!();
    println!("🎸 Genre groups");
    println!("═════════════");
    for group in store.list_genres() {
        let playlists = if group.playlist_names.is_empty() {
            "(no playlists)".to_string()
        } else {
            group.playlist_names.join(", ")
        };
        let liked = if group.save_to_liked { " + Liked Songs" } else { "" };
        println!("  {}: {playlists}{liked}", group.name);
    }
    println!();
    list_locked(store);
}

pub fn setup_genre(prompt: &mut dyn Prompt, store: &mut ConfigStore) -> Result<()> {
    let group = build_genre_group(prompt, store)?;
    let name = group.name.clone();
    let summary = format!(
        "   📋 Playlists: {}\n   ❤️  Liked Songs: {}",
        group.playlist_names.join(", "),
        if group.save_to_liked { "Yes" } else { "No" }
    );

    let verb = match store.put_genre(group) {
        PutOutcome::Created => "Created",
        PutOutcome::Replaced => "Replaced",
    };
    println!("🎉 {verb} genre '{name}' with:");
    println!("{summary}");
    println!("💡 Usage: mixtape add-tracks <track> --genre {name}");
    Ok(())
}

pub fn audio_summary(service: &dyn SpotifyService, playlist: &str) -> Result<()> {
    let id = require_playlist_id(playlist)?;
    let summary = summarize_playlist(service, &id)?;

    println!("🎵 {} tracks", summary.track_count);
    match summary.tempo {
        Some(tempo) => println!(
            "🥁 Tempo: avg {:.1} BPM (min {:.1}, max {:.1})",
            tempo.average, tempo.min, tempo.max
        ),
        None => println!("🥁 Tempo: unavailable"),
    }

    println!();
    println!("🎹 Keys");
    println!("══════");
    for (key, count) in &summary.key_distribution {
        println!("  {:<9} {:>4}  {count} tracks", key.to_string(), key.camelot());
    }

    println!();
    for track in &summary.tracks {
        let tempo = track
            .tempo
            .map(|t| format!("{t:.0} BPM"))
            .unwrap_or_else(|| "? BPM".to_string());
        let key = track
            .key
            .map(|k| format!("{k} ({})", k.camelot()))
            .unwrap_or_else(|| "unknown key".to_string());
        println!("  {} - {}: {tempo}, {key}", track.artists, track.track_name);
    }
    Ok(())
}

fn print_summary(summary: &DistributionSummary) {
    for outcome in &summary.tracks {
        let marker = if outcome.succeeded() { "✅" } else { "❌" };
        println!("{marker} {}", outcome.track_id);
        for result in &outcome.results {
            match &result.reason {
                None => println!("     ✓ {}", result.target_name),
                Some(reason) => println!("     ✗ {} ({reason})", result.target_name),
            }
        }
    }

    let status = summary.status();
    println!();
    println!(
        "📊 {}/{} additions succeeded, {}/{} tracks placed ({status})",
        summary.succeeded_count(),
        summary.total_targets(),
        summary.tracks_succeeded(),
        summary.tracks.len()
    );
    if status == RunStatus::Failed && summary.total_targets() > 0 {
        println!("💡 Nothing was added. Check locks with `mixtape list-locked` or use --force.");
    }
}
