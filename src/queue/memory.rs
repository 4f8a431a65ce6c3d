//! In-process queue provider
//!
//! Keeps a track list and a play cursor in memory and journals every call.
//! Used by the tests and by the `--simulate` mode of the CLI to rehearse an
//! insertion session without touching a real device.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use log::debug;
use serde::Deserialize;

use crate::data::{Device, QueueState, Track, TransportCommand};
use super::provider::{ProviderError, QueueProvider, Result, TrackSearch};

/// A call received by an [`InMemoryQueue`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Devices,
    QueueState,
    Transport(TransportCommand),
    Enqueue(String),
    Track(String),
}

#[derive(Debug, Default)]
struct QueueInner {
    tracks: Vec<Track>,
    cursor: usize,
    // user-queued tracks sitting directly after the cursor
    queued: usize,
    playing: bool,
    unavailable_polls: usize,
    failing_uris: HashSet<String>,
    calls: Vec<ProviderCall>,
}

/// Queue file format used by `--simulate`
#[derive(Debug, Deserialize)]
struct SimulatedQueue {
    #[serde(default)]
    devices: Vec<Device>,
    queue: Vec<Track>,
    #[serde(default)]
    catalog: Vec<Track>,
    #[serde(default)]
    position: usize,
}

/// In-memory implementation of [`QueueProvider`] and [`TrackSearch`]
#[derive(Debug)]
pub struct InMemoryQueue {
    inner: Mutex<QueueInner>,
    catalog: Vec<Track>,
    devices: Vec<Device>,
}

impl InMemoryQueue {
    /// Create a queue positioned on the first of `tracks`
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                tracks,
                ..QueueInner::default()
            }),
            catalog: Vec::new(),
            devices: vec![Device::new("memory", "In-memory player", "Computer")],
        }
    }

    /// Load a simulated queue from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ProviderError::ConfigError(format!("Failed to read queue file: {}", e)))?;
        Self::from_json(&content)
    }

    /// Load a simulated queue from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let file: SimulatedQueue = serde_json::from_str(json)?;
        let mut queue = Self::new(file.queue).with_catalog(file.catalog);
        if !file.devices.is_empty() {
            queue = queue.with_devices(file.devices);
        }
        queue.lock().cursor = file.position;
        Ok(queue)
    }

    /// Tracks that can be found by search or enqueued in addition to the queue itself
    pub fn with_catalog(mut self, catalog: Vec<Track>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_devices(mut self, devices: Vec<Device>) -> Self {
        self.devices = devices;
        self
    }

    /// Report no current track for the next `polls` observations
    pub fn unavailable_for(self, polls: usize) -> Self {
        self.lock().unavailable_polls = polls;
        self
    }

    /// Make every enqueue of `uri` fail
    pub fn fail_enqueue(self, uri: &str) -> Self {
        self.lock().failing_uris.insert(uri.to_string());
        self
    }

    /// Index of the play cursor
    pub fn position(&self) -> usize {
        self.lock().cursor
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    /// Names of all tracks in queue order, including already played ones
    pub fn track_names(&self) -> Vec<String> {
        self.lock().tracks.iter().map(|t| t.name.clone()).collect()
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.lock().calls.clone()
    }

    /// Calls that change remote state (transport and enqueue)
    pub fn mutations(&self) -> Vec<ProviderCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, ProviderCall::Transport(_) | ProviderCall::Enqueue(_)))
            .collect()
    }

    /// How many times a transport command was received
    pub fn count(&self, command: TransportCommand) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| **c == ProviderCall::Transport(command))
            .count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        // A panicking test thread must not hide the journal from the others
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn find_known(&self, inner: &QueueInner, reference: &str) -> Option<Track> {
        self.catalog
            .iter()
            .chain(inner.tracks.iter())
            .find(|t| t.uri == reference || t.id.as_deref() == Some(reference))
            .cloned()
    }

    fn check_device(&self, device_id: &str) -> Result<()> {
        if self.devices.iter().any(|d| d.id == device_id) {
            Ok(())
        } else {
            Err(ProviderError::ApiError(format!("Device not found: {}", device_id)))
        }
    }
}

impl QueueProvider for InMemoryQueue {
    fn devices(&self) -> Result<Vec<Device>> {
        self.lock().calls.push(ProviderCall::Devices);
        Ok(self.devices.clone())
    }

    fn queue_state(&self) -> Result<QueueState> {
        let mut inner = self.lock();
        inner.calls.push(ProviderCall::QueueState);

        if inner.unavailable_polls > 0 {
            inner.unavailable_polls -= 1;
            return Ok(QueueState::default());
        }

        let start = (inner.cursor + 1).min(inner.tracks.len());
        Ok(QueueState {
            currently_playing: inner.tracks.get(inner.cursor).cloned(),
            upcoming: inner.tracks[start..].to_vec(),
        })
    }

    fn transport(&self, command: TransportCommand, device_id: &str) -> Result<()> {
        self.check_device(device_id)?;
        let mut inner = self.lock();
        inner.calls.push(ProviderCall::Transport(command));

        match command {
            TransportCommand::Next => {
                if inner.cursor < inner.tracks.len() {
                    inner.cursor += 1;
                    inner.queued = inner.queued.saturating_sub(1);
                }
                inner.playing = true;
            }
            TransportCommand::Previous => {
                inner.cursor = inner.cursor.saturating_sub(1);
                inner.playing = true;
            }
            TransportCommand::Pause => inner.playing = false,
        }
        debug!("In-memory queue: {} -> cursor {}", command, inner.cursor);
        Ok(())
    }

    fn enqueue(&self, uri: &str, device_id: &str) -> Result<()> {
        self.check_device(device_id)?;
        let mut inner = self.lock();
        inner.calls.push(ProviderCall::Enqueue(uri.to_string()));

        if inner.failing_uris.contains(uri) {
            return Err(ProviderError::ApiError(format!("Enqueue of {} rejected", uri)));
        }

        let track = self
            .find_known(&inner, uri)
            .ok_or_else(|| ProviderError::TrackNotFound(uri.to_string()))?;

        let at = (inner.cursor + 1 + inner.queued).min(inner.tracks.len());
        inner.tracks.insert(at, track);
        inner.queued += 1;
        Ok(())
    }

    fn track(&self, reference: &str) -> Result<Track> {
        let mut inner = self.lock();
        inner.calls.push(ProviderCall::Track(reference.to_string()));
        self.find_known(&inner, reference)
            .ok_or_else(|| ProviderError::TrackNotFound(reference.to_string()))
    }
}

impl TrackSearch for InMemoryQueue {
    fn search_tracks(&self, title: &str, artist: &str) -> Result<Vec<Track>> {
        let title = title.to_lowercase();
        Ok(self
            .catalog
            .iter()
            .filter(|t| t.name.to_lowercase().contains(&title) && t.has_artist(artist))
            .cloned()
            .collect())
    }
}
