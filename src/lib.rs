//! Genre-grouped playlist distribution and curated playlists for Spotify.
//!
//! Core modules:
//! - [`store`] - Genre groups, playlist locks and the [`store::LockGuard`] seam
//! - [`distributor`] - Batched, lock-aware track distribution with per-target results
//! - [`analyzer`] - Genre histogram, averaged audio features and seed tracks of a playlist
//! - [`seeder`] - Bounded recommendation seeds built from an analysis
//! - [`curator`] - The five-stage curated-playlist pipeline
//! - [`service`] - The [`service::SpotifyService`] capability, pagination and throttling
//!
//! ### Supporting Modules
//!
//! - [`spotify`] - Blocking Web API client
//! - [`config`] - Configuration file and token cache persistence
//! - [`ids`] - Track/playlist id extraction from URLs and URIs
//! - [`audio_summary`] - Tempo, key and Camelot overview
//! - [`setup`] - Interactive genre setup behind a [`setup::Prompt`]
//! - [`cli`], [`commands`], [`completion`] - Command-line surface
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use mixtape::config::{resolve_config_path, Config};
//! use mixtape::curator::{PlaylistCurator, NoProgress, CurationOutcome};
//! use mixtape::service::Throttled;
//! use mixtape::spotify::SpotifyClient;
//!
//! let config = Config::load(&resolve_config_path(None)?)?;
//! let service = Throttled::new(SpotifyClient::from_token_cache(&config.path, &config.credentials)?);
//!
//! let curator = PlaylistCurator::new(&service, &config.store).with_limit(30);
//! match curator.curate("37i9dQZF1DXcBWIGoYBM5M", None, &mut NoProgress) {
//!     CurationOutcome::Completed(report) => println!("Created {}", report.playlist.name),
//!     CurationOutcome::Aborted { stage, error } => eprintln!("Stopped at {stage}: {error}"),
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Core components return [`error::MixtapeError`]; the command layer and
//! configuration I/O use `anyhow` with context. Per-track failures during
//! distribution are never errors: they are recorded in the
//! [`distributor::DistributionSummary`].

pub mod analyzer;
pub mod audio_summary;
pub mod cli;
pub mod commands;
pub mod completion;
pub mod config;
pub mod curator;
pub mod distributor;
pub mod error;
pub mod ids;
pub mod seeder;
pub mod service;
pub mod setup;
pub mod spotify;
pub mod store;

#[cfg(test)]
mod testing;
