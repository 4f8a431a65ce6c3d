/// Tracks, devices and transport commands
pub mod data;

/// Queue offset resolution, planning and commit
pub mod queue;

/// Helper utilities: duration codec, HTTP, retry and the Spotify client
pub mod helpers;

/// Interactive console session
pub mod cli;

pub mod config;
pub mod logging;

pub use data::{Device, QueueState, Track, TransportCommand};
pub use queue::{InMemoryQueue, InsertionPlan, QueueProvider, Resolution, Session, TrackSearch};
