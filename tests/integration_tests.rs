//! # Integration Tests for Mixtape
//!
//! End-to-end tests through the public API with an in-memory service, plus a
//! few runs of the built binary against a temporary configuration file.

use anyhow::Result;
use chrono::NaiveDate;
use mixtape::config::Config;
use mixtape::curator::{CurationOutcome, CurationStage, NoProgress, PlaylistCurator};
use mixtape::distributor::{copy_playlist, RunStatus, TrackDistributor, LOCKED_REASON};
use mixtape::error::{MixtapeError, Result as CoreResult};
use mixtape::seeder::RecommendationSeeds;
use mixtape::service::{
    resolve_playlist_names, ArtistRef, AudioFeatures, Page, PlaylistRef, SpotifyService, Track,
};
use mixtape::store::{ConfigStore, GenreGroup, LockedPlaylistRef};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Minimal stand-in for the remote service.
#[derive(Default)]
struct MemoryService {
    playlists: RefCell<Vec<(PlaylistRef, Vec<String>)>>,
    genres: HashMap<String, Vec<String>>,
    recommendations: Vec<String>,
    calls: RefCell<Vec<String>>,
}

impl MemoryService {
    fn with_playlist(self, id: &str, name: &str, tracks: usize) -> Self {
        let ids = (0..tracks).map(|i| format!("{id}-t{i}")).collect();
        self.playlists.borrow_mut().push((PlaylistRef::new(id, name), ids));
        self
    }

    fn tracks_of(&self, id: &str) -> Vec<String> {
        self.playlists
            .borrow()
            .iter()
            .find(|(p, _)| p.id == id)
            .map(|(_, t)| t.clone())
            .unwrap_or_default()
    }

    fn count(&self, op: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.starts_with(op)).count()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl SpotifyService for MemoryService {
    fn current_user_id(&self) -> CoreResult<String> {
        Ok("me".into())
    }

    fn playlist_name(&self, playlist_id: &str) -> CoreResult<String> {
        self.playlists
            .borrow()
            .iter()
            .find(|(p, _)| p.id == playlist_id)
            .map(|(p, _)| p.name.clone())
            .ok_or_else(|| MixtapeError::NotFound(playlist_id.into()))
    }

    fn playlist_tracks_page(&self, playlist_id: &str, offset: usize, limit: usize) -> CoreResult<Page<Track>> {
        self.record(format!("page {playlist_id} {offset}"));
        let ids = self.tracks_of(playlist_id);
        if !self.playlists.borrow().iter().any(|(p, _)| p.id == playlist_id) {
            return Err(MixtapeError::NotFound(playlist_id.into()));
        }
        let items: Vec<Track> = ids
            .iter()
            .skip(offset)
            .take(limit)
            .map(|id| Track {
                id: id.clone(),
                name: id.clone(),
                artists: vec![ArtistRef { id: Some(format!("artist-{id}")), name: "A".into() }],
            })
            .collect();
        let end = offset + items.len();
        Ok(Page {
            items,
            total: ids.len(),
            next_offset: (end < ids.len()).then_some(end),
        })
    }

    fn audio_features(&self, track_ids: &[String]) -> CoreResult<HashMap<String, AudioFeatures>> {
        Ok(track_ids
            .iter()
            .map(|id| (id.clone(), AudioFeatures { energy: Some(0.5), ..Default::default() }))
            .collect())
    }

    fn artist_genres(&self, artist_ids: &[String]) -> CoreResult<HashMap<String, Vec<String>>> {
        Ok(artist_ids
            .iter()
            .filter_map(|id| self.genres.get(id).map(|g| (id.clone(), g.clone())))
            .collect())
    }

    fn recommendations(&self, _seeds: &RecommendationSeeds, limit: usize) -> CoreResult<Vec<String>> {
        Ok(self.recommendations.iter().take(limit).cloned().collect())
    }

    fn create_playlist(&self, _owner_id: &str, name: &str) -> CoreResult<String> {
        self.record(format!("create {name}"));
        let id = format!("created-{}", self.playlists.borrow().len());
        self.playlists
            .borrow_mut()
            .push((PlaylistRef::new(id.clone(), name), Vec::new()));
        Ok(id)
    }

    fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> CoreResult<()> {
        assert!(track_ids.len() <= 100);
        self.record(format!("add {playlist_id} {}", track_ids.len()));
        let mut playlists = self.playlists.borrow_mut();
        let (_, tracks) = playlists
            .iter_mut()
            .find(|(p, _)| p.id == playlist_id)
            .ok_or_else(|| MixtapeError::NotFound(playlist_id.into()))?;
        tracks.extend_from_slice(track_ids);
        Ok(())
    }

    fn save_tracks(&self, track_ids: &[String]) -> CoreResult<()> {
        self.record(format!("save {}", track_ids.len()));
        Ok(())
    }

    fn user_playlists(&self) -> CoreResult<Vec<PlaylistRef>> {
        Ok(self.playlists.borrow().iter().map(|(p, _)| p.clone()).collect())
    }
}

/// Test helper to create a configuration file in a temporary directory
fn create_test_config(contents: &str) -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, contents)?;
    Ok((temp_dir, path))
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    #[test]
    fn test_genre_group_with_locked_playlist() -> Result<()> {
        let service = MemoryService::default()
            .with_playlist("p-locked", "Vault", 0)
            .with_playlist("p-open", "Open", 0);
        let mut store = ConfigStore::new();
        store.put_genre(GenreGroup::new("mix", vec!["Vault".into(), "Open".into()], false));
        store.lock(LockedPlaylistRef { id: "p-locked".into(), name: "Vault".into() });

        let group = store.genre_or_default(Some("mix"))?;
        let (targets, missing) = resolve_playlist_names(&service.user_playlists()?, &group.playlist_names);
        assert!(missing.is_empty());

        let summary = TrackDistributor::new(&service, &store).distribute(&["track-1".to_string()], &targets, false);

        let results = &summary.tracks[0].results;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].reason.as_deref(), Some(LOCKED_REASON));
        assert!(results[1].succeeded);
        assert!(summary.tracks[0].succeeded());
        assert_eq!(summary.status(), RunStatus::Partial);
        Ok(())
    }

    #[test]
    fn test_copy_splits_batches() -> Result<()> {
        let service = MemoryService::default().with_playlist("src", "Source", 150);

        let report = copy_playlist(&service, "src", "Copy")?;

        assert_eq!(service.count("page src"), 2);
        let adds: Vec<String> = service
            .calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with("add"))
            .cloned()
            .collect();
        assert_eq!(
            adds,
            vec![format!("add {} 100", report.playlist.id), format!("add {} 50", report.playlist.id)]
        );
        assert_eq!(service.tracks_of(&report.playlist.id), service.tracks_of("src"));
        assert_eq!(service.count("save"), 0);
        Ok(())
    }

    #[test]
    fn test_curation_default_name() {
        let mut service = MemoryService::default().with_playlist("src", "Top Hits", 12);
        service.recommendations = vec!["rec-1".into(), "rec-2".into()];
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let outcome = PlaylistCurator::new(&service, &ConfigStore::new())
            .with_date(date)
            .curate("src", None, &mut NoProgress);

        match outcome {
            CurationOutcome::Completed(report) => {
                assert_eq!(report.playlist.name, "Curated - Top Hits - 2024-03-01");
                assert_eq!(service.tracks_of(&report.playlist.id), vec!["rec-1", "rec-2"]);
                assert_eq!(report.analysis.track_count, 12);
            }
            CurationOutcome::Aborted { stage, error } => panic!("aborted at {stage}: {error}"),
        }
    }

    #[test]
    fn test_curation_of_empty_playlist_aborts() {
        let service = MemoryService::default().with_playlist("src", "Nothing", 0);

        let outcome = PlaylistCurator::new(&service, &ConfigStore::new()).curate("src", None, &mut NoProgress);

        assert!(matches!(
            outcome,
            CurationOutcome::Aborted { stage: CurationStage::Analyze, error: MixtapeError::EmptyInput(_) }
        ));
        assert_eq!(service.count("create"), 0);
    }

    #[test]
    fn test_config_roundtrip_preserves_locks_and_groups() -> Result<()> {
        let (_dir, path) = create_test_config(
            r#"{ "genres": { "default": { "playlists": ["A"], "save_to_liked": true } } }"#,
        )?;

        let mut config = Config::load(&path)?;
        assert!(!config.store.is_dirty());
        config.store.put_genre(GenreGroup::new("edm", vec!["Drops".into()], false));
        config.store.lock(LockedPlaylistRef { id: "x".into(), name: "X".into() });
        config.save_if_dirty()?;

        let reloaded = Config::load(&path)?;
        assert_eq!(reloaded.store.list_genres().count(), 2);
        assert!(reloaded.store.get_genre("default").unwrap().save_to_liked);
        assert!(reloaded.store.is_locked("x"));
        Ok(())
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    fn mixtape() -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_mixtape"));
        cmd.env_remove("MIXTAPE_CONFIG");
        cmd
    }

    #[test]
    fn test_cli_help_displays_correctly() {
        let output = mixtape().arg("--help").output().expect("Failed to run help command");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(output.status.success());
        assert!(stdout.contains("add-tracks"));
        assert!(stdout.contains("curate-playlist"));
    }

    #[test]
    fn test_show_config() -> Result<()> {
        let (_dir, path) = create_test_config(
            r#"{
                "genres": { "default": { "playlists": ["Favorites"], "save_to_liked": true } },
                "locked_playlists": [ { "id": "37i9dQZF1DXcBWIGoYBM5M", "name": "Top Hits" } ]
            }"#,
        )?;

        let output = mixtape().arg("--config").arg(&path).arg("show-config").output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(output.status.success());
        assert!(stdout.contains("Favorites"));
        assert!(stdout.contains("Top Hits"));
        Ok(())
    }

    #[test]
    fn test_unlock_saves_configuration() -> Result<()> {
        let (_dir, path) = create_test_config(
            r#"{ "locked_playlists": [ { "id": "37i9dQZF1DXcBWIGoYBM5M", "name": "Top Hits" } ] }"#,
        )?;

        let output = mixtape()
            .arg("--config")
            .arg(&path)
            .args(["unlock", "spotify:playlist:37i9dQZF1DXcBWIGoYBM5M"])
            .output()?;
        assert!(output.status.success());

        let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(saved["locked_playlists"], serde_json::json!([]));
        assert!(saved["genres"]["default"].is_object());
        Ok(())
    }

    #[test]
    fn test_bad_playlist_reference_fails() -> Result<()> {
        let (_dir, path) = create_test_config("{}")?;

        let output = mixtape()
            .arg("--config")
            .arg(&path)
            .args(["unlock", "https://open.spotify.com/artist/4r6sFBIZ7WHrlgAbK01Dr0"])
            .output()?;

        assert_eq!(output.status.code(), Some(1));
        Ok(())
    }

    #[test]
    fn test_complete_genres() -> Result<()> {
        let (_dir, path) = create_test_config(r#"{ "genres": { "rock": { "playlists": ["R"] } } }"#)?;

        let output = mixtape().arg("--config").arg(&path).arg("complete-genres").output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let genres: Vec<&str> = stdout.lines().collect();
        assert_eq!(genres, vec!["default", "rock"]);
        Ok(())
    }
}
