//! Queue-offset resolution and splice planning

pub mod materializer;
pub mod memory;
pub mod plan;
pub mod provider;
pub mod session;
pub mod walker;

pub use materializer::{materialize, MaterializeFailure, MaterializeReport, MaterializeStep};
pub use memory::{InMemoryQueue, ProviderCall};
pub use plan::{InsertionPlan, PlannedInsertion};
pub use provider::{ProviderError, QueueProvider, TrackSearch};
pub use session::Session;
pub use walker::{Confirmation, InsertionRequest, QueueProbe, QueueWalker, RejectReason, Resolution, RetryPrompt, WalkError};
