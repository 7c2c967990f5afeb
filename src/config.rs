//! # Configuration Module
//!
//! Loads and saves the JSON configuration file that backs the [`ConfigStore`],
//! and the access-token cache kept next to it.
//!
//! ## File Location
//!
//! Unless `--config` / `MIXTAPE_CONFIG` points elsewhere, the file lives in
//! the platform configuration directory:
//! - Linux: `~/.config/mixtape/config.json`
//! - macOS: `~/Library/Application Support/mixtape/config.json`
//! - Windows: `%APPDATA%\mixtape\config.json`
//!
//! ## Format
//!
//! ```json
//! {
//!   "client_id": "...",
//!   "client_secret": "...",
//!   "redirect_uri": "http://localhost:8080",
//!   "genres": {
//!     "default": { "playlists": ["Favorites"], "save_to_liked": true },
//!     "trance": { "playlists": ["Uplifting"], "save_to_liked": false }
//!   },
//!   "locked_playlists": [ { "id": "37i9dQZF1DXcBWIGoYBM5M", "name": "Today's Top Hits" } ]
//! }
//! ```
//!
//! The older flat layout `{ "playlists": [...] }` is still read and becomes
//! the `default` group. Keys this module does not know about are written back
//! untouched.
//!
//! ## Saving
//!
//! Writes go to a temporary file in the same directory which is then renamed
//! over the target, so an interrupted save never leaves a truncated file.

use crate::store::{ConfigStore, GenreGroup, LockedPlaylistRef, DEFAULT_GENRE};
use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const TOKEN_FILE_NAME: &str = "token.json";

/// Returns the platform-appropriate configuration file path.
///
/// # Errors
///
/// Fails if the platform has no standard configuration directory.
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        anyhow!("Could not determine the system configuration directory. Pass --config explicitly.")
    })?;
    Ok(config_dir.join("mixtape").join(CONFIG_FILE_NAME))
}

/// Absolute path of the configuration file to use.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path
            .absolutize()
            .with_context(|| format!("Invalid config path {}", path.display()))?
            .into_owned()),
        None => default_config_path(),
    }
}

/// Token cache sits next to the configuration file.
pub fn token_cache_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|dir| dir.join(TOKEN_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(TOKEN_FILE_NAME))
}

/// App credentials used for token refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GenreEntry {
    #[serde(default)]
    playlists: Vec<String>,
    #[serde(default)]
    save_to_liked: bool,
}

/// On-disk shape of the configuration file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(flatten)]
    credentials: Credentials,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    genres: Option<BTreeMap<String, GenreEntry>>,
    /// Legacy flat list, only read
    #[serde(default, skip_serializing)]
    playlists: Option<Vec<String>>,
    #[serde(default)]
    locked_playlists: Vec<LockedPlaylistRef>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// Everything read from the configuration file, plus where it came from.
#[derive(Debug)]
pub struct Config {
    pub path: PathBuf,
    pub credentials: Credentials,
    pub store: ConfigStore,
    extra: serde_json::Map<String, serde_json::Value>,
}

impl Config {
    /// Load `path`. A missing file yields an empty configuration.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No configuration at {}, starting empty", path.display());
            return Ok(Self {
                path: path.to_path_buf(),
                credentials: Credentials::default(),
                store: ConfigStore::new(),
                extra: serde_json::Map::new(),
            });
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        let config = Self::parse(path, &text)?;
        debug!(
            "Loaded {} genre groups and {} locked playlists from {}",
            config.store.list_genres().count(),
            config.store.list_locked().len(),
            path.display()
        );
        Ok(config)
    }

    fn parse(path: &Path, text: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(text)
            .with_context(|| format!("Configuration file {} is not valid JSON", path.display()))?;

        let mut migrated = false;
        let groups: Vec<GenreGroup> = match (file.genres, file.playlists) {
            (Some(genres), _) => genres
                .into_iter()
                .map(|(name, entry)| GenreGroup::new(name, entry.playlists, entry.save_to_liked))
                .collect(),
            (None, Some(playlists)) => {
                info!("Migrating flat playlist list into the '{DEFAULT_GENRE}' genre");
                migrated = true;
                vec![GenreGroup::new(DEFAULT_GENRE, playlists, false)]
            }
            (None, None) => Vec::new(),
        };

        let mut store = ConfigStore::from_parts(groups, file.locked_playlists);
        if migrated {
            store.mark_dirty();
        }

        Ok(Self {
            path: path.to_path_buf(),
            credentials: file.credentials,
            store,
            extra: file.extra,
        })
    }

    fn to_file(&self) -> ConfigFile {
        let genres = self
            .store
            .list_genres()
            .map(|group| {
                (
                    group.name.clone(),
                    GenreEntry {
                        playlists: group.playlist_names.clone(),
                        save_to_liked: group.save_to_liked,
                    },
                )
            })
            .collect();

        ConfigFile {
            credentials: self.credentials.clone(),
            genres: Some(genres),
            playlists: None,
            locked_playlists: self.store.list_locked().to_vec(),
            extra: self.extra.clone(),
        }
    }

    /// Write the configuration and mark the store clean.
    pub fn save(&mut self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_file()).context("Failed to serialize configuration")?;
        write_atomic(&self.path, json.as_bytes())?;
        self.store.mark_clean();
        info!("Saved configuration to {}", self.path.display());
        Ok(())
    }

    /// Save only if something changed since loading.
    pub fn save_if_dirty(&mut self) -> Result<bool> {
        if !self.store.is_dirty() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }
}

/// Cached OAuth token written by the authorization flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Unix timestamp, seconds
    pub expires_at: i64,
}

impl CachedToken {
    /// Treats tokens within a minute of expiry as expired.
    pub fn is_expired(&self, now: i64) -> bool {
        now + 60 >= self.expires_at
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| {
            format!(
                "No access token at {}. Authorize mixtape with Spotify first.",
                path.display()
            )
        })?;
        serde_json::from_str(&text).with_context(|| format!("Token cache {} is corrupt", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize token")?;
        write_atomic(path, json.as_bytes())
    }
}

/// Replace `path` with `contents` via a temporary file in the same directory.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}. Please check file permissions.", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;
    tmp.write_all(contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
