//! Interactive genre group setup.
//!
//! The questions are asked through a [`Prompt`] so the flow can be driven by a
//! script in tests; validation lives in small pure helpers.

use crate::store::{ConfigStore, GenreGroup};
use anyhow::{bail, Context, Result};
use std::io::{self, BufRead, Write};

/// Synchronous question/answer channel with the user.
pub trait Prompt {
    /// Ask `question` and return the raw answer line.
    fn ask(&mut self, question: &str) -> Result<String>;

    /// Show a message that needs no answer.
    fn tell(&mut self, message: &str);
}

/// Prompt on stdin/stdout.
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask(&mut self, question: &str) -> Result<String> {
        print!("{question} ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
        if read == 0 {
            bail!("Input closed before setup finished");
        }
        Ok(line)
    }

    fn tell(&mut self, message: &str) {
        println!("{message}");
    }
}

/// Trimmed, lower-cased genre name, or `None` when blank.
pub fn normalize_genre_name(raw: &str) -> Option<String> {
    let name = raw.trim().to_lowercase();
    (!name.is_empty()).then_some(name)
}

/// Split a comma-separated list, dropping blank entries.
pub fn split_playlist_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// `y`/`yes` and `n`/`no`, case-insensitive.
pub fn parse_yes_no(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Ask for a genre name, its playlists and the liked-songs flag.
///
/// Re-asks until each answer is valid. Declining to overwrite an existing
/// group goes back to the name question.
pub fn build_genre_group(prompt: &mut dyn Prompt, store: &ConfigStore) -> Result<GenreGroup> {
    let name = loop {
        let answer = prompt.ask("Enter genre name (e.g., trance, dubstep, rock):")?;
        let Some(name) = normalize_genre_name(&answer) else {
            prompt.tell("Genre name cannot be empty. Please try again.");
            continue;
        };
        if store.get_genre(&name).is_some() {
            let overwrite = prompt.ask(&format!("Genre '{name}' already exists. Overwrite? (y/n):"))?;
            if parse_yes_no(&overwrite) != Some(true) {
                continue;
            }
        }
        break name;
    };

    let playlist_names = loop {
        let answer = prompt.ask("Enter playlist names (comma-separated):")?;
        let names = split_playlist_names(&answer);
        if names.is_empty() {
            prompt.tell("Please enter at least one playlist name.");
            continue;
        }
        break names;
    };

    let save_to_liked = loop {
        let answer = prompt.ask("Save to Liked Songs for this genre? (y/n):")?;
        match parse_yes_no(&answer) {
            Some(flag) => break flag,
            None => prompt.tell("Please enter 'y' or 'n'."),
        }
    };

    Ok(GenreGroup::new(name, playlist_names, save_to_liked))
}
