//! Caller-supplied deadline propagated to every store and cache call.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, timeout_at};

/// Per-request deadline. Dropping the request future cancels in-flight calls as well;
/// the deadline additionally turns a slow call into a classified error.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded {
    pub operation: &'static str,
}

impl CallContext {
    pub fn unbounded() -> Self {
        Self { deadline: None }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The earlier of this deadline and `now + timeout`.
    pub fn tightened(&self, timeout: Option<Duration>) -> Self {
        let candidate = timeout.map(|timeout| Instant::now() + timeout);
        let deadline = match (self.deadline, candidate) {
            (Some(current), Some(candidate)) => Some(current.min(candidate)),
            (current, candidate) => current.or(candidate),
        };
        Self { deadline }
    }

    /// Run `call` under the deadline; an expired deadline drops the call.
    pub async fn run<F, T>(&self, operation: &'static str, call: F) -> Result<T, DeadlineExceeded>
    where
        F: Future<Output = T>,
    {
        match self.deadline {
            Some(deadline) => timeout_at(deadline, call)
                .await
                .map_err(|_| DeadlineExceeded { operation }),
            None => Ok(call.await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expired_deadline_aborts_call() {
        let ctx = CallContext::with_timeout(Duration::from_millis(50));
        let result = ctx
            .run("slow", tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert_eq!(result, Err(DeadlineExceeded { operation: "slow" }));
    }

    #[tokio::test]
    async fn unbounded_context_passes_through() {
        let ctx = CallContext::unbounded();
        let value = ctx.run("fast", async { 7 }).await;
        assert_eq!(value, Ok(7));
    }

    #[test]
    fn tightened_keeps_earliest_deadline() {
        let early = CallContext::with_timeout(Duration::from_millis(10));
        let tightened = early.tightened(Some(Duration::from_secs(60)));
        assert_eq!(tightened.deadline(), early.deadline());

        let open = CallContext::unbounded().tightened(Some(Duration::from_secs(1)));
        assert!(open.deadline().is_some());
        assert!(CallContext::unbounded().tightened(None).deadline().is_none());
    }
}
