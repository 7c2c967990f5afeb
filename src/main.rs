//! # Mixtape
//!
//! Command-line front end: parses arguments, loads the configuration once,
//! dispatches to [`mixtape::commands`] and saves the configuration once if a
//! command changed it.
//!
//! ## Exit Codes
//!
//! - `0`: everything succeeded
//! - `1`: the command failed (bad input, unreadable source, aborted curation, I/O)
//! - `2`: tracks were to be added but none landed anywhere
//! - `3`: some additions succeeded and some failed

use anyhow::Result;
use clap::{CommandFactory, Parser};
use log::debug;
use mixtape::cli::{Args, Command};
use mixtape::config::{self, Config};
use mixtape::distributor::RunStatus;
use mixtape::service::Throttled;
use mixtape::setup::StdinPrompt;
use mixtape::spotify::SpotifyClient;
use mixtape::{commands, completion};
use std::process::ExitCode;

/// Authenticated, throttling-aware service client.
fn connect(config: &Config) -> Result<Throttled<SpotifyClient>> {
    let client = SpotifyClient::from_token_cache(&config.path, &config.credentials)?;
    Ok(Throttled::new(client))
}

/// Main entry point for Mixtape.
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=debug mixtape add-tracks ...` - Enable debug logging
/// - `RUST_LOG=mixtape::distributor=debug mixtape ...` - Module-specific logging
fn main() -> Result<ExitCode> {
    env_logger::init();

    let args = Args::parse();
    let config_path = config::resolve_config_path(args.config.as_deref())?;
    debug!("Using configuration {}", config_path.display());

    // Commands that never touch the configuration store or the network
    match &args.command {
        Command::Completion { shell } => {
            let mut cmd = Args::command();
            completion::generate_completions(
                completion::shell_to_completion_shell(*shell),
                &mut cmd,
                &mut std::io::stdout(),
            );
            return Ok(ExitCode::SUCCESS);
        }
        Command::CompleteGenres => {
            completion::print_genre_completions(&config_path)?;
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let mut config = Config::load(&config_path)?;

    let status = match args.command {
        Command::AddTracks { tracks, genre, force } => {
            let service = connect(&config)?;
            commands::add_tracks(&service, &config.store, &tracks, genre.as_deref(), force)?
        }
        Command::CopyPlaylist { source, name } => {
            let service = connect(&config)?;
            commands::copy(&service, &source, &name)?
        }
        Command::CuratePlaylist { source, name, limit } => {
            let service = connect(&config)?;
            commands::curate(&service, &config.store, &source, name.as_deref(), limit)?
        }
        Command::Lock { playlist } => {
            let service = connect(&config)?;
            commands::lock(&service, &mut config.store, &playlist)?;
            RunStatus::Complete
        }
        Command::Unlock { playlist } => {
            commands::unlock(&mut config.store, &playlist)?;
            RunStatus::Complete
        }
        Command::ListLocked => {
            commands::list_locked(&config.store);
            RunStatus::Complete
        }
        Command::SetupGenre => {
            commands::setup_genre(&mut StdinPrompt, &mut config.store)?;
            RunStatus::Complete
        }
        Command::ShowConfig => {
            commands::show_config(&config.store, &config.path);
            RunStatus::Complete
        }
        Command::AudioSummary { playlist } => {
            let service = connect(&config)?;
            commands::audio_summary(&service, &playlist)?;
            RunStatus::Complete
        }
        Command::Completion { .. } | Command::CompleteGenres => RunStatus::Complete,
    };

    config.save_if_dirty()?;
    Ok(ExitCode::from(status.exit_code()))
}
