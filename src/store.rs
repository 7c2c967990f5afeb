//! # Genre groups and playlist locks
//!
//! [`ConfigStore`] is the single in-memory owner of the genre-group table and
//! the locked-playlist set. It is loaded once per process by
//! [`crate::config`], handed by `&mut` to the command that needs to change it,
//! and written back only when [`ConfigStore::is_dirty`] says so.
//!
//! Everything else sees the store through read-only borrows or through the
//! [`LockGuard`] seam, which is all the distributor needs to know.

use crate::error::{MixtapeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the group used when no genre is given
pub const DEFAULT_GENRE: &str = "default";

/// A named set of playlists that new tracks get distributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreGroup {
    pub name: String,
    pub playlist_names: Vec<String>,
    pub save_to_liked: bool,
}

impl GenreGroup {
    pub fn new(name: impl Into<String>, playlist_names: Vec<String>, save_to_liked: bool) -> Self {
        Self {
            name: name.into(),
            playlist_names,
            save_to_liked,
        }
    }

    /// Empty group, used to seed `default`
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new(), false)
    }
}

/// A playlist protected against automated additions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedPlaylistRef {
    pub id: String,
    pub name: String,
}

/// Result of [`ConfigStore::lock`]; only affects what the user is told.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    Locked,
    AlreadyLocked,
}

/// Result of [`ConfigStore::put_genre`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    Replaced,
}

/// Answers whether automated additions may touch a playlist.
pub trait LockGuard {
    fn may_modify(&self, playlist_id: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    genres: BTreeMap<String, GenreGroup>,
    locked: Vec<LockedPlaylistRef>,
    dirty: bool,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// Fresh store holding only an empty `default` group.
    pub fn new() -> Self {
        let mut genres = BTreeMap::new();
        genres.insert(DEFAULT_GENRE.to_string(), GenreGroup::empty(DEFAULT_GENRE));
        Self {
            genres,
            locked: Vec::new(),
            dirty: false,
        }
    }

    /// Build from persisted parts. A missing `default` group is added and
    /// duplicate lock ids are collapsed; either repair marks the store dirty.
    pub fn from_parts(groups: Vec<GenreGroup>, locked: Vec<LockedPlaylistRef>) -> Self {
        let mut store = Self {
            genres: groups.into_iter().map(|g| (g.name.clone(), g)).collect(),
            locked: Vec::new(),
            dirty: false,
        };
        let mut repaired = false;

        if !store.genres.contains_key(DEFAULT_GENRE) {
            store
                .genres
                .insert(DEFAULT_GENRE.to_string(), GenreGroup::empty(DEFAULT_GENRE));
            repaired = true;
        }

        for entry in locked {
            repaired |= store.lock(entry) == LockOutcome::AlreadyLocked;
        }

        // Replaying persisted locks is not a change by itself
        store.dirty = repaired;
        store
    }

    pub fn get_genre(&self, name: &str) -> Option<&GenreGroup> {
        self.genres.get(name)
    }

    /// Group for `name`, or `default` when no name is given.
    pub fn genre_or_default(&self, name: Option<&str>) -> Result<&GenreGroup> {
        let wanted = name.unwrap_or(DEFAULT_GENRE);
        self.genres.get(wanted).ok_or_else(|| {
            let available: Vec<&str> = self.genres.keys().map(String::as_str).collect();
            MixtapeError::NotFound(format!(
                "genre '{wanted}' is not configured (available: {})",
                available.join(", ")
            ))
        })
    }

    /// Insert or replace a group by name.
    pub fn put_genre(&mut self, group: GenreGroup) -> PutOutcome {
        self.dirty = true;
        match self.genres.insert(group.name.clone(), group) {
            Some(_) => PutOutcome::Replaced,
            None => PutOutcome::Created,
        }
    }

    /// Groups in name order
    pub fn list_genres(&self) -> impl Iterator<Item = &GenreGroup> {
        self.genres.values()
    }

    pub fn lock(&mut self, entry: LockedPlaylistRef) -> LockOutcome {
        if self.is_locked(&entry.id) {
            return LockOutcome::AlreadyLocked;
        }
        self.locked.push(entry);
        self.dirty = true;
        LockOutcome::Locked
    }

    /// Remove a lock. Returns `false` if the id was not locked.
    pub fn unlock(&mut self, playlist_id: &str) -> bool {
        let before = self.locked.len();
        self.locked.retain(|entry| entry.id != playlist_id);
        let removed = self.locked.len() != before;
        self.dirty |= removed;
        removed
    }

    pub fn is_locked(&self, playlist_id: &str) -> bool {
        self.locked.iter().any(|entry| entry.id == playlist_id)
    }

    /// Locked playlists in the order they were locked
    pub fn list_locked(&self) -> &[LockedPlaylistRef] {
        &self.locked
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force a save, e.g. after migrating an older file layout.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Called by the persistence layer after a successful save.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

impl LockGuard for ConfigStore {
    fn may_modify(&self, playlist_id: &str) -> bool {
        !self.is_locked(playlist_id)
    }
}

/// Guard that allows everything; used for `--force` and for freshly
/// created playlists that cannot be locked yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unguarded;

impl LockGuard for Unguarded {
    fn may_modify(&self, _playlist_id: &str) -> bool {
        true
    }
}
