use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use log::info;

use crate::data::Track;
use crate::helpers::retry::RetryPolicy;
use super::materializer::{materialize, MaterializeReport};
use super::plan::InsertionPlan;
use super::provider::QueueProvider;
use super::walker::{InsertionRequest, QueueWalker, Resolution, RetryPrompt, WalkError};

/// Session state threaded through the walker and the materializer
pub struct Session<'a> {
    provider: &'a dyn QueueProvider,
    device_id: String,
    plan: InsertionPlan,
    retry: RetryPolicy,
    running: Option<Arc<AtomicBool>>,
}

impl<'a> Session<'a> {
    pub fn new(provider: &'a dyn QueueProvider, device_id: &str) -> Self {
        info!("Starting insertion session on device {}", device_id);
        Self {
            provider,
            device_id: device_id.to_string(),
            plan: InsertionPlan::new(),
            retry: RetryPolicy::default(),
            running: None,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Share a cancellation flag with the walker
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn plan(&self) -> &InsertionPlan {
        &self.plan
    }

    /// Resolve where `song` goes for an offset of `offset_ms` and add it to the plan
    pub fn request(
        &mut self,
        song: Track,
        offset_ms: u64,
        prompt: &mut dyn RetryPrompt,
    ) -> Result<Resolution, WalkError> {
        let mut walker = QueueWalker::new(self.provider, &self.device_id)
            .with_retry_policy(self.retry.clone());
        if let Some(running) = &self.running {
            walker = walker.with_running_flag(Arc::clone(running));
        }

        walker.resolve(&mut self.plan, InsertionRequest::new(song, offset_ms), prompt)
    }

    /// Commit the plan to the remote queue, ending the session
    pub fn commit(self) -> MaterializeReport {
        materialize(self.provider, &self.device_id, self.plan)
    }
}
