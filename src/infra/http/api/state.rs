use std::sync::Arc;
use std::time::Duration;

use crate::application::cache::SnapshotCache;
use crate::application::context::CallContext;
use crate::application::reactions::ReactionService;
use crate::application::repos::HealthCheck;

#[derive(Clone)]
pub struct ApiState {
    pub reactions: Arc<ReactionService>,
    pub health: Arc<dyn HealthCheck>,
    pub cache: Arc<dyn SnapshotCache>,
    /// Deadline applied to every request; `None` leaves requests unbounded.
    pub request_timeout: Option<Duration>,
}

impl ApiState {
    pub fn call_context(&self) -> CallContext {
        CallContext::unbounded().tightened(self.request_timeout)
    }
}
