use serde::{Serialize, Deserialize};
use std::fmt;

/// Represents a playable track as reported by the queue provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Provider identifier (e.g. the Spotify track id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Track name
    pub name: String,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Artist names, in the order the provider lists them
    #[serde(default)]
    pub artists: Vec<String>,
    /// Album name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// Playable resource locator used for enqueueing
    pub uri: String,
}

impl Track {
    /// Create a new Track without artist or album information
    pub fn new(id: &str, name: &str, duration_ms: u64) -> Self {
        Self {
            id: Some(id.to_string()),
            name: name.to_string(),
            duration_ms,
            artists: Vec::new(),
            album: None,
            uri: format!("spotify:track:{}", id),
        }
    }

    /// Builder-style helper to attach artists
    pub fn with_artists(mut self, artists: &[&str]) -> Self {
        self.artists = artists.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Builder-style helper to attach an album
    pub fn with_album(mut self, album: &str) -> Self {
        self.album = Some(album.to_string());
        self
    }

    /// Identity of this track within a queue walk.
    ///
    /// Uses the provider id when present, then the URI, then the name.
    pub fn key(&self) -> String {
        match &self.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ if !self.uri.is_empty() => self.uri.clone(),
            _ => self.name.clone(),
        }
    }

    /// Artists joined as a comma-separated list
    pub fn artist_list(&self) -> String {
        self.artists.join(", ")
    }

    /// True if any of the track artists matches `artist` exactly
    pub fn has_artist(&self, artist: &str) -> bool {
        self.artists.iter().any(|a| a == artist)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.artists.is_empty() {
            write!(f, "\"{}\"", self.name)
        } else {
            write!(f, "\"{}\" by \"{}\"", self.name, self.artist_list())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefers_id() {
        let track = Track::new("abc", "Song", 1000);
        assert_eq!(track.key(), "abc");
    }

    #[test]
    fn test_key_falls_back_to_uri_then_name() {
        let mut track = Track::new("abc", "Song", 1000);
        track.id = None;
        assert_eq!(track.key(), "spotify:track:abc");

        track.uri.clear();
        assert_eq!(track.key(), "Song");
    }

    #[test]
    fn test_display_with_artists() {
        let track = Track::new("1", "Hey Jude", 431000).with_artists(&["The Beatles"]);
        assert_eq!(track.to_string(), "\"Hey Jude\" by \"The Beatles\"");
        assert_eq!(Track::new("2", "Untitled", 1).to_string(), "\"Untitled\"");
    }

    #[test]
    fn test_has_artist_is_exact() {
        let track = Track::new("1", "Song", 1).with_artists(&["Queen", "David Bowie"]);
        assert!(track.has_artist("David Bowie"));
        assert!(!track.has_artist("david bowie"));
        assert_eq!(track.artist_list(), "Queen, David Bowie");
    }
}
