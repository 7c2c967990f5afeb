//! Spotify id extraction from URLs, URIs and bare ids.

use crate::error::{MixtapeError, Result};
use regex::Regex;

lazy_static::lazy_static! {
    static ref TRACK_URL: Regex = Regex::new(r"https://open\.spotify\.com/track/([a-zA-Z0-9]+)").unwrap();
    static ref TRACK_URI: Regex = Regex::new(r"spotify:track:([a-zA-Z0-9]+)").unwrap();
    static ref PLAYLIST_URL: Regex = Regex::new(r"https://open\.spotify\.com/playlist/([a-zA-Z0-9]+)").unwrap();
    static ref PLAYLIST_URI: Regex = Regex::new(r"spotify:playlist:([a-zA-Z0-9]+)").unwrap();
    static ref BARE_ID: Regex = Regex::new(r"^[a-zA-Z0-9]{22}$").unwrap();
}

/// Extract a track id from a share URL, a `spotify:track:` URI or a bare id.
pub fn extract_track_id(input: &str) -> Option<String> {
    let input = input.trim();
    TRACK_URL
        .captures(input)
        .or_else(|| TRACK_URI.captures(input))
        .map(|caps| caps[1].to_string())
        .or_else(|| BARE_ID.is_match(input).then(|| input.to_string()))
}

/// Extract a playlist id from a share URL, a `spotify:playlist:` URI or a bare id.
pub fn extract_playlist_id(input: &str) -> Option<String> {
    let input = input.trim();
    PLAYLIST_URL
        .captures(input)
        .or_else(|| PLAYLIST_URI.captures(input))
        .map(|caps| caps[1].to_string())
        .or_else(|| BARE_ID.is_match(input).then(|| input.to_string()))
}

/// Like [`extract_track_id`] but with an error explaining what went wrong.
pub fn require_track_id(input: &str) -> Result<String> {
    extract_track_id(input).ok_or_else(|| {
        if input.contains("spotify.link/") {
            MixtapeError::InvalidInput(format!(
                "`{input}` is a short link; open it in a browser and use the full track URL"
            ))
        } else {
            MixtapeError::InvalidInput(format!("Could not extract a track id from `{input}`"))
        }
    })
}

/// Like [`extract_playlist_id`] but with an error.
pub fn require_playlist_id(input: &str) -> Result<String> {
    extract_playlist_id(input)
        .ok_or_else(|| MixtapeError::InvalidInput(format!("Could not extract a playlist id from `{input}`")))
}

/// Canonical track URI used by playlist mutation endpoints.
pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{track_id}")
}

/// Public web URL for a playlist.
pub fn playlist_url(playlist_id: &str) -> String {
    format!("https://open.spotify.com/playlist/{playlist_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_full_url() {
        assert_eq!(
            extract_playlist_id("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M").as_deref(),
            Some("37i9dQZF1DXcBWIGoYBM5M")
        );
        assert_eq!(
            extract_playlist_id("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=something").as_deref(),
            Some("37i9dQZF1DXcBWIGoYBM5M")
        );
    }

    #[test]
    fn test_playlist_uri_and_bare_id() {
        assert_eq!(
            extract_playlist_id("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M").as_deref(),
            Some("37i9dQZF1DXcBWIGoYBM5M")
        );
        assert_eq!(
            extract_playlist_id("1z2x3c4v5b6n7m8l9k0j2p").as_deref(),
            Some("1z2x3c4v5b6n7m8l9k0j2p")
        );
    }

    #[test]
    fn test_playlist_rejects_other_inputs() {
        assert!(extract_playlist_id("").is_none());
        assert!(extract_playlist_id("http://google.com").is_none());
        assert!(extract_playlist_id("spotify:track:37i9dQZF1DXcBWIGoYBM5M").is_none());
        assert!(extract_playlist_id("InvalidPlaylistID").is_none());
        assert!(extract_playlist_id("https://open.spotify.com/artist/4r6sFBIZ7WHrlgAbK01Dr0").is_none());
        assert!(extract_playlist_id("abcdefghijklmnopqrstu").is_none());
        assert!(extract_playlist_id("abcdefghijklmnopqrstuvw").is_none());
        assert!(extract_playlist_id("abcdefghijklmnopqrstu!").is_none());
    }

    #[test]
    fn test_track_formats() {
        assert_eq!(
            extract_track_id("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=abc").as_deref(),
            Some("4uLU6hMCjMI75M1A2tKUQC")
        );
        assert_eq!(
            extract_track_id("spotify:track:4uLU6hMCjMI75M1A2tKUQC").as_deref(),
            Some("4uLU6hMCjMI75M1A2tKUQC")
        );
        assert_eq!(extract_track_id(" 4uLU6hMCjMI75M1A2tKUQC ").as_deref(), Some("4uLU6hMCjMI75M1A2tKUQC"));
        assert!(extract_track_id("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M").is_none());
    }

    #[test]
    fn test_short_link_gets_specific_error() {
        let err = require_track_id("https://spotify.link/abc123").unwrap_err();
        assert!(err.to_string().contains("short link"));
    }

    #[test]
    fn test_uri_helpers() {
        assert_eq!(track_uri("abc"), "spotify:track:abc");
        assert_eq!(playlist_url("xyz"), "https://open.spotify.com/playlist/xyz");
    }
}
