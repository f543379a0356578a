//! Cancellable auto-advance after an internal verification completes.

use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;

/// Navigates to `target` once `delay` elapses unless cancelled first.
///
/// Dropping an armed countdown cancels it.
#[derive(Debug)]
pub struct AutoAdvance {
    target: String,
    deadline: Instant,
    handle: Option<JoinHandle<String>>,
}

impl AutoAdvance {
    /// Must be called from within a tokio runtime.
    pub fn arm(target: impl Into<String>, delay: Duration) -> Self {
        let target = target.into();
        let deadline = Instant::now() + delay;
        let fire = target.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            fire
        });
        Self {
            target,
            deadline,
            handle: Some(handle),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whole seconds left, rounded up, for the "continuing in N s" label.
    pub fn remaining_secs(&self) -> u64 {
        let left = self.deadline.saturating_duration_since(Instant::now());
        left.as_millis().div_ceil(1000) as u64
    }

    /// Handle for cancelling from elsewhere, e.g. a "stay on this page" action.
    pub fn abort_handle(&self) -> Option<AbortHandle> {
        self.handle.as_ref().map(JoinHandle::abort_handle)
    }

    pub fn cancel(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!(target = %self.target, "auto-advance cancelled");
        }
    }

    /// Resolves with the target when the countdown fires, or `None` if it was
    /// cancelled.
    pub async fn wait(mut self) -> Option<String> {
        let handle = self.handle.take()?;
        handle.await.ok()
    }
}

impl Drop for AutoAdvance {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fires_after_delay() {
        let advance = AutoAdvance::arm("/applications/app-1", Duration::from_millis(20));
        assert_eq!(advance.target(), "/applications/app-1");
        assert_eq!(advance.wait().await.as_deref(), Some("/applications/app-1"));
    }

    #[tokio::test]
    async fn cancelled_through_abort_handle_never_fires() {
        let advance = AutoAdvance::arm("/applications/app-1", Duration::from_secs(5));
        assert!(advance.remaining_secs() <= 5 && advance.remaining_secs() >= 4);
        advance.abort_handle().expect("armed").abort();
        assert_eq!(advance.wait().await, None);
    }
}
