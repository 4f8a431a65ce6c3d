use thiserror::Error;

use crate::data::{Device, QueueState, Track, TransportCommand};
use crate::helpers::http_client::HttpClientError;

/// Errors reported by a queue provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("HTTP error: {0}")]
    Http(#[from] HttpClientError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Track not found: {0}")]
    TrackNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Capability object for a remote playback queue
///
/// Every call is a blocking round trip to a queue the tool does not own.
/// Implementations must keep the cursor moving one track per `next`/`previous`
/// in the provider's own queue order.
pub trait QueueProvider {
    /// List the playback devices available to the user
    fn devices(&self) -> Result<Vec<Device>>;

    /// Observe the current track and playback status
    fn queue_state(&self) -> Result<QueueState>;

    /// Send a transport command to the given device
    fn transport(&self, command: TransportCommand, device_id: &str) -> Result<()>;

    /// Append a track to the device's queue
    fn enqueue(&self, uri: &str, device_id: &str) -> Result<()>;

    /// Fetch full track metadata by id, URI or share URL
    fn track(&self, reference: &str) -> Result<Track>;

    /// Advance the play cursor one track
    fn next_track(&self, device_id: &str) -> Result<()> {
        self.transport(TransportCommand::Next, device_id)
    }

    /// Move the play cursor back one track
    fn previous_track(&self, device_id: &str) -> Result<()> {
        self.transport(TransportCommand::Previous, device_id)
    }

    /// Pause playback on the device
    fn pause(&self, device_id: &str) -> Result<()> {
        self.transport(TransportCommand::Pause, device_id)
    }
}

/// Free-text track lookup
pub trait TrackSearch {
    /// Return every track matching `title` whose artist list contains `artist`
    fn search_tracks(&self, title: &str, artist: &str) -> Result<Vec<Track>>;
}
