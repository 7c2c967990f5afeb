//! # Command-Line Interface Module
//!
//! Clap derive definitions for `mixtape`. Every operation is one variant of
//! [`Command`] carrying its typed arguments; `main` dispatches on it with a
//! single `match`.
//!
//! ## Commands
//!
//! - `add-tracks`: Add tracks to every playlist of a genre group
//! - `copy-playlist`: Copy a playlist into a new one
//! - `curate-playlist`: Build a new playlist from recommendations seeded by another
//! - `lock` / `unlock` / `list-locked`: Protect playlists from automated additions
//! - `setup-genre`: Create or replace a genre group interactively
//! - `show-config`: Print genre groups and locked playlists
//! - `audio-summary`: Tempo, key and Camelot overview of a playlist
//!
//! ## Examples
//!
//! ```bash
//! mixtape add-tracks https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC --genre trance
//! mixtape curate-playlist spotify:playlist:37i9dQZF1DXcBWIGoYBM5M --limit 40
//! mixtape lock https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "mixtape")]
#[command(about = "Mixtape: genre-grouped playlist distribution & curated playlists for Spotify")]
#[command(version)]
pub struct Args {
    /// Configuration file to use instead of the platform default
    #[arg(long, global = true, env = "MIXTAPE_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add tracks to all playlists of a genre group
    ///
    /// Each track goes to every playlist the group names, and to Liked Songs
    /// when the group says so. Locked playlists are skipped unless --force
    /// is given.
    AddTracks {
        /// Track URLs, URIs or ids
        #[arg(required = true, num_args = 1..)]
        tracks: Vec<String>,

        /// Genre group to use (defaults to "default")
        #[arg(short, long)]
        genre: Option<String>,

        /// Ignore playlist locks for this run
        #[arg(long)]
        force: bool,
    },

    /// Copy all tracks of a playlist into a new playlist
    CopyPlaylist {
        /// Source playlist URL, URI or id
        source: String,

        /// Name of the new playlist
        name: String,
    },

    /// Create a playlist of recommendations based on another playlist
    ///
    /// Analyzes the source playlist's genres and audio features, asks for
    /// recommendations seeded by it and saves them as a new playlist.
    CuratePlaylist {
        /// Source playlist URL, URI or id
        source: String,

        /// Name of the new playlist (defaults to "Curated - <source> - <date>")
        #[arg(short, long)]
        name: Option<String>,

        /// Number of recommendations to request (1-100)
        #[arg(short, long, default_value_t = crate::curator::DEFAULT_LIMIT)]
        limit: usize,
    },

    /// Protect a playlist from automated additions
    Lock {
        /// Playlist URL, URI or id
        playlist: String,
    },

    /// Remove the protection from a playlist
    Unlock {
        /// Playlist URL, URI or id
        playlist: String,
    },

    /// List locked playlists
    ListLocked,

    /// Create or replace a genre group interactively
    SetupGenre,

    /// Show configured genre groups and locked playlists
    ShowConfig,

    /// Show tempo (BPM), key distribution and Camelot codes of a playlist
    AudioSummary {
        /// Playlist URL, URI or id
        playlist: String,
    },

    /// Generate shell completion scripts
    ///
    /// Outputs completion script for the specified shell to stdout.
    /// Redirect to the appropriate file for your shell.
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// List configured genre names (used by completion scripts)
    #[command(hide = true)]
    CompleteGenres,
}
