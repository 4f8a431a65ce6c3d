use serde::{Serialize, Deserialize};
use super::Track;

/// Snapshot of the remote queue as seen by a single observation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueState {
    /// The track under the play cursor, if the provider reports one
    pub currently_playing: Option<Track>,
    /// Upcoming tracks, in provider order
    #[serde(default)]
    pub upcoming: Vec<Track>,
}

impl QueueState {
    pub fn current_name(&self) -> Option<&str> {
        self.currently_playing.as_ref().map(|t| t.name.as_str())
    }
}
