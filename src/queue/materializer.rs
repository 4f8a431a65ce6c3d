//! Commits a resolved insertion plan to the remote queue

use std::fmt;
use log::{error, info};

use crate::data::Track;
use super::plan::InsertionPlan;
use super::provider::{ProviderError, QueueProvider};

/// One step of a plan commit
#[derive(Debug, Clone, PartialEq)]
pub enum MaterializeStep {
    /// Enqueue a song from the leading block
    EnqueueLeading(Track),
    /// Enqueue the track that was playing, so it follows the leading block
    RequeueCurrent(Option<Track>),
    /// Enqueue a song planned after an anchor
    EnqueueAfter { anchor: Track, song: Track },
    /// Skip to the first leading song and pause
    StartLeading,
}

impl fmt::Display for MaterializeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaterializeStep::EnqueueLeading(song) => write!(f, "add {} to the start of the queue", song),
            MaterializeStep::RequeueCurrent(Some(track)) => write!(f, "re-add current track {}", track),
            MaterializeStep::RequeueCurrent(None) => write!(f, "re-add current track"),
            MaterializeStep::EnqueueAfter { anchor, song } => write!(f, "insert {} after {}", song, anchor),
            MaterializeStep::StartLeading => write!(f, "skip to the first inserted song"),
        }
    }
}

/// A step that the provider refused
#[derive(Debug)]
pub struct MaterializeFailure {
    pub step: MaterializeStep,
    pub error: ProviderError,
}

/// What a commit did. Failed steps are not rolled back.
#[derive(Debug, Default)]
pub struct MaterializeReport {
    /// Completed steps, in the order they were issued
    pub applied: Vec<MaterializeStep>,
    pub failures: Vec<MaterializeFailure>,
}

impl MaterializeReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, step: MaterializeStep, result: Result<(), ProviderError>) {
        match result {
            Ok(()) => {
                info!("Done: {}", step);
                self.applied.push(step);
            }
            Err(error) => {
                error!("Failed to {}: {}", step, error);
                self.failures.push(MaterializeFailure { step, error });
            }
        }
    }
}

/// Replay `plan` against the remote queue.
///
/// Order: leading songs, the re-queued current track (only with leading
/// songs), anchored songs in timeline order, then a single skip and pause to
/// start at the first leading song. A failing call is recorded and the
/// remaining steps still run.
pub fn materialize(provider: &dyn QueueProvider, device_id: &str, plan: InsertionPlan) -> MaterializeReport {
    let mut report = MaterializeReport::default();
    info!("Committing {} planned insertions", plan.len());

    for song in plan.leading() {
        let result = provider.enqueue(&song.uri, device_id);
        report.record(MaterializeStep::EnqueueLeading(song.clone()), result);
    }

    let has_leading = !plan.leading().is_empty();
    if has_leading {
        match provider.queue_state() {
            Ok(state) => match state.currently_playing {
                Some(current) => {
                    let result = provider.enqueue(&current.uri, device_id);
                    report.record(MaterializeStep::RequeueCurrent(Some(current)), result);
                }
                None => report.record(
                    MaterializeStep::RequeueCurrent(None),
                    Err(ProviderError::ApiError("No current track to re-queue".to_string())),
                ),
            },
            Err(e) => report.record(MaterializeStep::RequeueCurrent(None), Err(e)),
        }
    }

    for planned in plan.after_in_timeline_order() {
        let result = provider.enqueue(&planned.song.uri, device_id);
        report.record(
            MaterializeStep::EnqueueAfter {
                anchor: planned.anchor.clone(),
                song: planned.song.clone(),
            },
            result,
        );
    }

    if has_leading {
        let result = provider
            .next_track(device_id)
            .and_then(|_| provider.pause(device_id));
        report.record(MaterializeStep::StartLeading, result);
    }

    report
}
