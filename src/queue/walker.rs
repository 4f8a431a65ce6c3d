// Insertion point search over the remote queue
//
// The walker observes the current track, adds its duration and the duration
// of any song already planned after it, and skips forward until the target
// offset is reached. Every skip is undone before it returns, so the remote
// queue ends up where it started, paused.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::data::Track;
use crate::helpers::duration::format_duration;
use crate::helpers::retry::RetryPolicy;
use super::plan::InsertionPlan;
use super::provider::{ProviderError, QueueProvider};

/// Answer to a retry question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Proceed,
    Abort,
}

/// Asks the user whether to retry after the provider reported no current track
pub trait RetryPrompt {
    /// `attempt` is the 1-based number of the failed observation
    fn confirm_retry(&mut self, attempt: usize) -> Confirmation;
}

impl<F> RetryPrompt for F
where
    F: FnMut(usize) -> Confirmation,
{
    fn confirm_retry(&mut self, attempt: usize) -> Confirmation {
        self(attempt)
    }
}

/// A song to place at an offset from the current play position
#[derive(Debug, Clone)]
pub struct InsertionRequest {
    pub song: Track,
    pub offset_ms: u64,
}

impl InsertionRequest {
    pub fn new(song: Track, offset_ms: u64) -> Self {
        Self { song, offset_ms }
    }
}

/// Why a request could not be planned
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectReason {
    #[error("the songs inserted at the beginning of the queue already last {}, past {}",
        fmt_ms(.leading_ms), fmt_ms(.target_ms))]
    LeadingExceedsTarget { leading_ms: u64, target_ms: u64 },

    #[error("a song is already planned after {anchor}; choose a different time")]
    AnchorAlreadyUsed { anchor: Track, anchor_end_ms: u64 },

    #[error("the queue runs out after {}, before {}", fmt_ms(.queue_end_ms), fmt_ms(.target_ms))]
    PastQueueEnd { queue_end_ms: u64, target_ms: u64 },
}

fn fmt_ms(ms: &u64) -> String {
    format_duration(*ms)
}

/// Outcome of resolving one request
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Placed in the leading block at `position`
    Leading { position: usize },
    /// Placed after `anchor`, which ends at `anchor_end_ms` in the planned timeline
    Anchored { anchor: Track, anchor_end_ms: u64, skipped: usize },
    Rejected(RejectReason),
    /// The user gave up while the queue was unavailable, or the walk was interrupted
    Aborted,
}

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("Queue provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("No current track after {attempts} attempts")]
    QueueUnavailable { attempts: usize },
}

/// Scoped forward probe over the remote queue.
///
/// Counts every skip and rewinds the same number of tracks when restored or
/// dropped, so no exit path leaves the cursor displaced.
pub struct QueueProbe<'a> {
    provider: &'a dyn QueueProvider,
    device_id: &'a str,
    skipped: usize,
}

impl<'a> QueueProbe<'a> {
    pub fn new(provider: &'a dyn QueueProvider, device_id: &'a str) -> Self {
        Self { provider, device_id, skipped: 0 }
    }

    /// Number of skips not yet rewound
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Skip to the next track and keep playback paused
    pub fn advance(&mut self) -> Result<(), ProviderError> {
        self.provider.next_track(self.device_id)?;
        self.skipped += 1;
        self.provider.pause(self.device_id)
    }

    /// Rewind all skips and pause. Returns the number of tracks rewound.
    pub fn restore(mut self) -> Result<usize, ProviderError> {
        let skipped = self.skipped;
        self.rewind()?;
        Ok(skipped)
    }

    fn rewind(&mut self) -> Result<(), ProviderError> {
        debug!("Rewinding {} skipped tracks", self.skipped);
        while self.skipped > 0 {
            self.provider.previous_track(self.device_id)?;
            self.skipped -= 1;
        }
        self.provider.pause(self.device_id)
    }
}

impl Drop for QueueProbe<'_> {
    fn drop(&mut self) {
        if self.skipped == 0 {
            return;
        }
        warn!("Queue probe ended early, restoring {} skipped tracks", self.skipped);
        if let Err(e) = self.rewind() {
            error!("Failed to restore queue position, {} tracks still skipped: {}", self.skipped, e);
        }
    }
}

/// Resolves insertion requests against a remote queue
pub struct QueueWalker<'a> {
    provider: &'a dyn QueueProvider,
    device_id: &'a str,
    retry: RetryPolicy,
    running: Option<Arc<AtomicBool>>,
}

impl<'a> QueueWalker<'a> {
    pub fn new(provider: &'a dyn QueueProvider, device_id: &'a str) -> Self {
        Self {
            provider,
            device_id,
            retry: RetryPolicy::default(),
            running: None,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Stop walking as soon as `running` is cleared
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    /// Resolve `request` and record the result in `plan`
    pub fn resolve(
        &self,
        plan: &mut InsertionPlan,
        request: InsertionRequest,
        prompt: &mut dyn RetryPrompt,
    ) -> Result<Resolution, WalkError> {
        let InsertionRequest { song, offset_ms: target } = request;

        if target == 0 {
            info!("{} will be inserted at the beginning of the queue", song);
            let position = plan.push_leading(song);
            return Ok(Resolution::Leading { position });
        }

        let leading_ms = plan.leading_duration_ms();
        if leading_ms > target {
            info!("Rejecting {}: leading insertions last {} ms, target is {} ms", song, leading_ms, target);
            return Ok(Resolution::Rejected(RejectReason::LeadingExceedsTarget {
                leading_ms,
                target_ms: target,
            }));
        }
        if leading_ms == target {
            // The offset is exactly the end of the leading block
            let position = plan.push_leading(song);
            return Ok(Resolution::Leading { position });
        }

        info!("Searching for insertion point at {} for {}", format_duration(target), song);
        let mut probe = QueueProbe::new(self.provider, self.device_id);
        let mut elapsed = leading_ms;

        let anchor = loop {
            if self.interrupted() {
                info!("Insertion point search interrupted");
                return Ok(Resolution::Aborted);
            }

            let (current, more_queued) = match self.observe_current(prompt)? {
                Some(observed) => observed,
                None => return Ok(Resolution::Aborted),
            };
            elapsed = elapsed.saturating_add(current.duration_ms);

            if let Some(planned) = plan.successor_of(&current.key()) {
                debug!("Folding planned {} after {} into the timeline", planned.song, current);
                elapsed = elapsed.saturating_add(planned.song.duration_ms);
            }
            debug!("Walked past {} ({})", current, format_duration(elapsed));

            if elapsed < target && !more_queued {
                let skipped = probe.restore()?;
                info!("Queue ends at {} after {} tracks, {} is out of reach", format_duration(elapsed), skipped + 1, format_duration(target));
                return Ok(Resolution::Rejected(RejectReason::PastQueueEnd {
                    queue_end_ms: elapsed,
                    target_ms: target,
                }));
            }

            probe.advance()?;
            if elapsed >= target {
                break current;
            }
        };

        let skipped = probe.restore()?;

        match plan.insert_after(anchor.clone(), song, elapsed) {
            Ok(()) => {
                info!("Insertion point found after {} ({}), {} tracks probed", anchor, format_duration(elapsed), skipped);
                Ok(Resolution::Anchored { anchor, anchor_end_ms: elapsed, skipped })
            }
            Err(refused) => {
                warn!("{} already has {} planned after it", refused.anchor, refused.song);
                Ok(Resolution::Rejected(RejectReason::AnchorAlreadyUsed {
                    anchor: refused.anchor,
                    anchor_end_ms: elapsed,
                }))
            }
        }
    }

    /// Observe the current track and whether anything is queued after it,
    /// retrying while the provider reports no current track
    ///
    /// Returns `None` when the user declines a retry or the walk is interrupted.
    fn observe_current(&self, prompt: &mut dyn RetryPrompt) -> Result<Option<(Track, bool)>, WalkError> {
        let mut retry = self.retry.handler();

        loop {
            let state = self.provider.queue_state()?;
            if let Some(track) = state.currently_playing {
                return Ok(Some((track, !state.upcoming.is_empty())));
            }

            let attempt = retry.attempt() + 1;
            warn!("Queue provider reported no current track (attempt {})", attempt);

            if !retry.should_retry() {
                return Err(WalkError::QueueUnavailable { attempts: attempt });
            }
            if prompt.confirm_retry(attempt) == Confirmation::Abort {
                return Ok(None);
            }
            if !retry.wait(self.running.as_ref()) {
                return Ok(None);
            }
        }
    }

    fn interrupted(&self) -> bool {
        self.running
            .as_ref()
            .map(|r| !r.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TransportCommand;
    use crate::queue::memory::{InMemoryQueue, ProviderCall};

    const DEVICE: &str = "memory";

    fn abc() -> InMemoryQueue {
        InMemoryQueue::new(vec![
            Track::new("A", "A", 180_000),
            Track::new("B", "B", 200_000),
            Track::new("C", "C", 150_000),
            Track::new("D", "D", 210_000),
        ])
    }

    fn proceed(_: usize) -> Confirmation {
        Confirmation::Proceed
    }

    fn resolve(queue: &InMemoryQueue, plan: &mut InsertionPlan, song: Track, offset_ms: u64) -> Resolution {
        QueueWalker::new(queue, DEVICE)
            .with_retry_policy(RetryPolicy::immediate(3))
            .resolve(plan, InsertionRequest::new(song, offset_ms), &mut proceed)
            .unwrap()
    }

    #[test]
    fn test_anchor_is_first_cumulative_sum_reaching_target() {
        let queue = abc();
        let mut plan = InsertionPlan::new();

        let resolution = resolve(&queue, &mut plan, Track::new("y", "Y", 1), 300_000);

        match resolution {
            Resolution::Anchored { anchor, anchor_end_ms, skipped } => {
                assert_eq!(anchor.name, "B");
                assert_eq!(anchor_end_ms, 380_000);
                assert_eq!(skipped, 2);
            }
            other => panic!("unexpected resolution {:?}", other),
        }
        assert_eq!(plan.successor_of("B").unwrap().song.name, "Y");
        assert_eq!(queue.position(), 0);
        assert_eq!(queue.count(TransportCommand::Next), 2);
        assert_eq!(queue.count(TransportCommand::Previous), 2);
        assert!(!queue.is_playing());
    }

    #[test]
    fn test_exact_boundary_stops_on_that_track() {
        let queue = abc();
        let mut plan = InsertionPlan::new();

        let resolution = resolve(&queue, &mut plan, Track::new("y", "Y", 1), 180_000);
        assert!(matches!(resolution, Resolution::Anchored { skipped: 1, .. }));
        assert!(plan.is_anchor("A"));
    }

    #[test]
    fn test_zero_offset_is_leading_without_remote_calls() {
        let queue = abc();
        let mut plan = InsertionPlan::new();

        assert_eq!(resolve(&queue, &mut plan, Track::new("x", "X", 1), 0), Resolution::Leading { position: 0 });
        assert!(queue.calls().is_empty());
    }

    #[test]
    fn test_leading_longer_than_target_is_rejected_without_remote_calls() {
        let queue = abc();
        let mut plan = InsertionPlan::new();
        plan.push_leading(Track::new("x", "X", 240_000));

        let resolution = resolve(&queue, &mut plan, Track::new("y", "Y", 1), 120_000);
        assert_eq!(
            resolution,
            Resolution::Rejected(RejectReason::LeadingExceedsTarget { leading_ms: 240_000, target_ms: 120_000 })
        );
        assert!(queue.calls().is_empty());
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_leading_equal_to_target_joins_leading_block() {
        let queue = abc();
        let mut plan = InsertionPlan::new();
        plan.push_leading(Track::new("x", "X", 120_000));

        let resolution = resolve(&queue, &mut plan, Track::new("y", "Y", 1), 120_000);
        assert_eq!(resolution, Resolution::Leading { position: 1 });
        assert!(queue.calls().is_empty());
    }

    #[test]
    fn test_leading_duration_seeds_the_walk() {
        let queue = abc();
        let mut plan = InsertionPlan::new();
        plan.push_leading(Track::new("x", "X", 150_000));

        // 150000 + 180000 = 330000 >= 300000
        let resolution = resolve(&queue, &mut plan, Track::new("y", "Y", 1), 300_000);
        assert!(matches!(resolution, Resolution::Anchored { ref anchor, skipped: 1, .. } if anchor.name == "A"));
    }

    #[test]
    fn test_planned_insertions_are_folded_into_the_walk() {
        let queue = abc();
        let mut plan = InsertionPlan::new();
        plan.insert_after(Track::new("A", "A", 180_000), Track::new("y", "Y", 150_000), 180_000).unwrap();

        // A + Y = 330000, B ends at 530000
        let resolution = resolve(&queue, &mut plan, Track::new("z", "Z", 1), 400_000);
        match resolution {
            Resolution::Anchored { anchor, anchor_end_ms, skipped } => {
                assert_eq!(anchor.name, "B");
                assert_eq!(anchor_end_ms, 530_000);
                assert_eq!(skipped, 2);
            }
            other => panic!("unexpected resolution {:?}", other),
        }
    }

    #[test]
    fn test_target_inside_planned_successor_hits_used_anchor() {
        let queue = abc();
        let mut plan = InsertionPlan::new();
        plan.insert_after(Track::new("A", "A", 180_000), Track::new("y", "Y", 60_000), 180_000).unwrap();

        let resolution = resolve(&queue, &mut plan, Track::new("z", "Z", 1), 200_000);
        assert!(matches!(
            resolution,
            Resolution::Rejected(RejectReason::AnchorAlreadyUsed { ref anchor, anchor_end_ms: 240_000 }) if anchor.name == "A"
        ));
        assert_eq!(plan.successor_of("A").unwrap().song.name, "Y");
        assert_eq!(queue.position(), 0);
    }

    #[test]
    fn test_offset_past_queue_end_is_rejected_and_rewound() {
        let queue = abc();
        let mut plan = InsertionPlan::new();
        let mut asked = Vec::new();

        let resolution = QueueWalker::new(&queue, DEVICE)
            .with_retry_policy(RetryPolicy::immediate(3))
            .resolve(&mut plan, InsertionRequest::new(Track::new("z", "Z", 1), 3_600_000), &mut |attempt: usize| {
                asked.push(attempt);
                Confirmation::Proceed
            })
            .unwrap();

        assert_eq!(
            resolution,
            Resolution::Rejected(RejectReason::PastQueueEnd { queue_end_ms: 740_000, target_ms: 3_600_000 })
        );
        assert!(asked.is_empty());
        assert!(plan.is_empty());
        assert_eq!(queue.position(), 0);
        assert_eq!(queue.count(TransportCommand::Next), 3);
        assert_eq!(queue.count(TransportCommand::Previous), 3);
    }

    #[test]
    fn test_last_track_reaching_target_is_still_an_anchor() {
        let queue = abc();
        let mut plan = InsertionPlan::new();

        let resolution = resolve(&queue, &mut plan, Track::new("z", "Z", 1), 740_000);
        assert!(matches!(resolution, Resolution::Anchored { ref anchor, skipped: 4, .. } if anchor.name == "D"));
        assert_eq!(queue.position(), 0);
    }

    #[test]
    fn test_unavailable_queue_retries_then_resolves() {
        let queue = abc().unavailable_for(2);
        let mut plan = InsertionPlan::new();
        let mut asked = Vec::new();

        let resolution = QueueWalker::new(&queue, DEVICE)
            .with_retry_policy(RetryPolicy::immediate(3))
            .resolve(&mut plan, InsertionRequest::new(Track::new("y", "Y", 1), 100_000), &mut |attempt: usize| {
                asked.push(attempt);
                Confirmation::Proceed
            })
            .unwrap();

        assert!(matches!(resolution, Resolution::Anchored { skipped: 1, .. }));
        assert_eq!(asked, vec![1, 2]);
    }

    #[test]
    fn test_abort_while_unavailable_leaves_queue_untouched() {
        let queue = abc().unavailable_for(1);
        let mut plan = InsertionPlan::new();

        let resolution = QueueWalker::new(&queue, DEVICE)
            .resolve(&mut plan, InsertionRequest::new(Track::new("y", "Y", 1), 100_000), &mut |_: usize| Confirmation::Abort)
            .unwrap();

        assert_eq!(resolution, Resolution::Aborted);
        assert!(queue.mutations().is_empty());
        assert!(plan.is_empty());
    }

    #[test]
    fn test_retries_are_bounded() {
        let queue = abc().unavailable_for(10);
        let mut plan = InsertionPlan::new();

        let result = QueueWalker::new(&queue, DEVICE)
            .with_retry_policy(RetryPolicy::immediate(2))
            .resolve(&mut plan, InsertionRequest::new(Track::new("y", "Y", 1), 100_000), &mut proceed);

        assert!(matches!(result, Err(WalkError::QueueUnavailable { attempts: 3 })));
    }

    #[test]
    fn test_abort_midway_rewinds_every_skip() {
        // A is observed, then the provider goes quiet and the user gives up
        let queue = abc();
        let mut plan = InsertionPlan::new();
        let mut polls = 0;

        struct QuietAfterFirst<'q> {
            queue: &'q InMemoryQueue,
        }
        impl QueueProvider for QuietAfterFirst<'_> {
            fn devices(&self) -> crate::queue::provider::Result<Vec<crate::data::Device>> {
                self.queue.devices()
            }
            fn queue_state(&self) -> crate::queue::provider::Result<crate::data::QueueState> {
                let state = self.queue.queue_state()?;
                if self.queue.position() > 0 {
                    return Ok(crate::data::QueueState::default());
                }
                Ok(state)
            }
            fn transport(&self, command: TransportCommand, device_id: &str) -> crate::queue::provider::Result<()> {
                self.queue.transport(command, device_id)
            }
            fn enqueue(&self, uri: &str, device_id: &str) -> crate::queue::provider::Result<()> {
                self.queue.enqueue(uri, device_id)
            }
            fn track(&self, reference: &str) -> crate::queue::provider::Result<Track> {
                self.queue.track(reference)
            }
        }

        let provider = QuietAfterFirst { queue: &queue };
        let resolution = QueueWalker::new(&provider, DEVICE)
            .resolve(&mut plan, InsertionRequest::new(Track::new("y", "Y", 1), 300_000), &mut |_: usize| {
                polls += 1;
                Confirmation::Abort
            })
            .unwrap();

        assert_eq!(resolution, Resolution::Aborted);
        assert_eq!(polls, 1);
        assert_eq!(queue.position(), 0);
        assert_eq!(queue.count(TransportCommand::Next), 1);
        assert_eq!(queue.count(TransportCommand::Previous), 1);
        assert_eq!(queue.mutations().last(), Some(&ProviderCall::Transport(TransportCommand::Pause)));
    }

    #[test]
    fn test_cleared_running_flag_aborts_before_walking() {
        let queue = abc();
        let mut plan = InsertionPlan::new();
        let running = Arc::new(AtomicBool::new(false));

        let resolution = QueueWalker::new(&queue, DEVICE)
            .with_running_flag(running)
            .resolve(&mut plan, InsertionRequest::new(Track::new("y", "Y", 1), 300_000), &mut proceed)
            .unwrap();

        assert_eq!(resolution, Resolution::Aborted);
        assert!(queue.calls().is_empty());
    }

    #[test]
    fn test_probe_drop_rewinds() {
        let queue = abc();
        {
            let mut probe = QueueProbe::new(&queue, DEVICE);
            probe.advance().unwrap();
            probe.advance().unwrap();
            assert_eq!(probe.skipped(), 2);
            assert_eq!(queue.position(), 2);
        }
        assert_eq!(queue.position(), 0);
        assert_eq!(queue.count(TransportCommand::Previous), 2);
    }
}
