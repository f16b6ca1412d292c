// Launch state - remote launch id and every outstanding remote call

use crate::client::{Completion, Operation};
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error};

enum Outstanding {
    /// Driven by the ambient tokio runtime as soon as it is tracked
    Spawned(Operation, JoinHandle<()>),
    /// No runtime was available; polled at the final barrier
    Deferred(BoxFuture<'static, ()>),
}

/// Collects every remote completion so run end can await them all.
///
/// Failures are logged and swallowed here; nothing is retried.
#[derive(Default)]
pub struct OperationTracker {
    outstanding: Vec<Outstanding>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, operation: Operation, completion: Completion) {
        let guarded = async move {
            if let Err(e) = completion.await {
                error!("{} {}", operation.failure_message(), e);
            }
        };

        let entry = match Handle::try_current() {
            Ok(handle) => Outstanding::Spawned(operation, handle.spawn(guarded)),
            Err(_) => Outstanding::Deferred(guarded.boxed()),
        };
        self.outstanding.push(entry);
    }

    /// Number of tracked operations not yet drained
    pub fn len(&self) -> usize {
        self.outstanding.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outstanding.is_empty()
    }

    /// Await every tracked operation, success or failure
    pub async fn wait_all(&mut self) {
        let outstanding = std::mem::take(&mut self.outstanding);
        debug!("Awaiting {} outstanding reporting call(s)", outstanding.len());

        join_all(outstanding.into_iter().map(|entry| async move {
            match entry {
                Outstanding::Spawned(operation, handle) => {
                    if let Err(e) = handle.await {
                        error!("{} {}", operation.failure_message(), e);
                    }
                }
                Outstanding::Deferred(fut) => fut.await,
            }
        }))
        .await;
    }
}

/// Process-wide state of one run
#[derive(Default)]
pub struct LaunchState {
    launch_id: Option<String>,
    external: bool,
    pub operations: OperationTracker,
}

impl LaunchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_launch(&mut self, launch_id: impl Into<String>, external: bool) {
        self.launch_id = Some(launch_id.into());
        self.external = external;
    }

    pub fn launch_id(&self) -> Option<&str> {
        self.launch_id.as_deref()
    }

    /// Launch owned by an outside orchestrator; must not be finished here
    pub fn is_external(&self) -> bool {
        self.external
    }

    pub fn track(&mut self, operation: Operation, completion: Completion) {
        self.operations.track(operation, completion);
    }

    pub fn clear(&mut self) {
        self.launch_id = None;
        self.external = false;
        self.operations = OperationTracker::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>, fail: bool) -> Completion {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            if fail {
                Err(ClientError::Transport("connection reset".to_string()))
            } else {
                Ok(())
            }
        }
        .boxed()
    }

    #[tokio::test]
    async fn test_wait_all_drains_spawned_operations() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut tracker = OperationTracker::new();
        tracker.track(Operation::StartItem, counting(&counter, false));
        tracker.track(Operation::FinishItem, counting(&counter, true));
        assert_eq!(tracker.len(), 2);

        tracker.wait_all().await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_deferred_operations_run_at_barrier() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut tracker = OperationTracker::new();

        // No runtime here, so nothing runs until the barrier
        tracker.track(Operation::SendLog, counting(&counter, false));
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio_test::block_on(tracker.wait_all());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_launch_state_clear() {
        let mut state = LaunchState::new();
        state.set_launch("launch-1", true);
        assert_eq!(state.launch_id(), Some("launch-1"));
        assert!(state.is_external());

        state.clear();
        assert!(state.launch_id().is_none());
        assert!(!state.is_external());
    }
}
