//! # Shell Completion Module
//!
//! Static completion scripts come from `clap_complete`. Genre names for
//! `--genre` are dynamic: completion scripts call the hidden
//! `complete-genres` command, which reads the configuration file.
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! mixtape completion bash > ~/.local/share/bash-completion/completions/mixtape
//!
//! # Generate zsh completions
//! mixtape completion zsh > ~/.config/zsh/completions/_mixtape
//! ```

use crate::cli::Shell;
use crate::config::Config;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io::{self, Write};
use std::path::Path;

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command, out: &mut dyn Write) {
    let name = cmd.get_name().to_string();
    generate(gen, cmd, name, out);
}

/// Convert our Shell enum to clap_complete's Shell enum
pub fn shell_to_completion_shell(shell: Shell) -> CompletionShell {
    match shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    }
}

/// Configured genre names in name order. Any problem reading the
/// configuration yields an empty list; completion must never fail loudly.
pub fn genre_completions(config_path: &Path) -> Vec<String> {
    match Config::load(config_path) {
        Ok(config) => config.store.list_genres().map(|g| g.name.clone()).collect(),
        Err(_) => Vec::new(),
    }
}

pub fn print_genre_completions(config_path: &Path) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for genre in genre_completions(config_path) {
        writeln!(out, "{genre}")?;
    }
    Ok(())
}
