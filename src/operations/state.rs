//! Operation status and the shared handle passed to every driver callback.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;

/// Lifecycle of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Initializing,
    AwaitingReady,
    Running,
    Cancelled,
    TimedOut,
    Completed,
    Failed,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationStatus::Cancelled
                | OperationStatus::TimedOut
                | OperationStatus::Completed
                | OperationStatus::Failed
        )
    }

    fn rank(&self) -> u8 {
        match self {
            OperationStatus::Initializing => 0,
            OperationStatus::AwaitingReady => 1,
            OperationStatus::Running => 2,
            _ => 3,
        }
    }

    /// Forward-only: no transitions out of a terminal state, none backwards, and
    /// `Completed` only from `Running`
    pub fn can_transition_to(&self, next: OperationStatus) -> bool {
        if self.is_terminal() || next.rank() <= self.rank() {
            return false;
        }
        next != OperationStatus::Completed || *self == OperationStatus::Running
    }
}

/// How progress should be displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Only a running count is known (e.g. paging through a listing)
    Counter,
    /// Progress is `count / total`
    Determinate,
}

/// Point-in-time view of an operation, published to subscribers
#[derive(Debug, Clone)]
pub struct OperationSnapshot {
    pub title: String,
    pub owner: Option<String>,
    pub status: OperationStatus,
    pub status_text: String,
    pub progress: u64,
    pub total: Option<u64>,
    pub mode: ProgressMode,
    pub started_at: Instant,
}

impl OperationSnapshot {
    /// Fraction done for determinate operations
    pub fn fraction(&self) -> Option<f64> {
        match (self.mode, self.total) {
            (ProgressMode::Determinate, Some(total)) if total > 0 => {
                Some((self.progress as f64 / total as f64).min(1.0))
            }
            _ => None,
        }
    }
}

#[derive(Debug)]
struct HandleInner {
    state: watch::Sender<OperationSnapshot>,
    cancel: watch::Sender<bool>,
}

/// Cloneable handle to a single operation.
///
/// The driver writes through it and the UI reads or cancels through it. There is no
/// global "current operation": whoever needs the operation holds a handle.
#[derive(Debug, Clone)]
pub struct OperationHandle {
    inner: Arc<HandleInner>,
}

impl OperationHandle {
    pub fn new(
        title: impl Into<String>,
        owner: Option<String>,
        status_text: impl Into<String>,
        mode: ProgressMode,
        total: Option<u64>,
    ) -> Self {
        let snapshot = OperationSnapshot {
            title: title.into(),
            owner,
            status: OperationStatus::Initializing,
            status_text: status_text.into(),
            progress: 0,
            total,
            mode,
            started_at: Instant::now(),
        };
        let (state, _) = watch::channel(snapshot);
        let (cancel, _) = watch::channel(false);
        Self { inner: Arc::new(HandleInner { state, cancel }) }
    }

    pub fn snapshot(&self) -> OperationSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn status(&self) -> OperationStatus {
        self.inner.state.borrow().status
    }

    pub fn title(&self) -> String {
        self.inner.state.borrow().title.clone()
    }

    /// Receive every snapshot change
    pub fn subscribe(&self) -> watch::Receiver<OperationSnapshot> {
        self.inner.state.subscribe()
    }

    /// Ask the driver to stop. Requests already sent by the page are not aborted.
    pub fn cancel(&self) {
        self.inner.cancel.send_replace(true);
    }

    pub fn is_cancel_requested(&self) -> bool {
        *self.inner.cancel.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        let mut rx = self.inner.cancel.subscribe();
        // The sender lives in `self`, so the channel cannot close under us
        let _ = rx.wait_for(|requested| *requested).await;
    }

    /// Move to `next` if allowed, returning whether the transition happened
    pub(crate) fn transition(&self, next: OperationStatus) -> bool {
        let mut moved = false;
        self.inner.state.send_if_modified(|snapshot| {
            if snapshot.status.can_transition_to(next) {
                tracing::debug!(title = %snapshot.title, from = ?snapshot.status, to = ?next, "Operation transition");
                snapshot.status = next;
                moved = true;
            }
            moved
        });
        moved
    }

    pub(crate) fn set_status_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.inner.state.send_modify(|snapshot| snapshot.status_text = text);
    }

    /// Set progress to the counter published by the page, returning the delta.
    /// The counter is monotonic, so lower readings are ignored.
    pub(crate) fn record_progress(&self, counter: u64) -> u64 {
        let mut delta = 0;
        self.inner.state.send_if_modified(|snapshot| {
            if counter > snapshot.progress {
                delta = counter - snapshot.progress;
                snapshot.progress = counter;
                true
            } else {
                false
            }
        });
        delta
    }
}
