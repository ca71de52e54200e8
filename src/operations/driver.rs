//! Generic driver for one browser-mediated operation.
//!
//! ```text
//! Initializing ──launch──▶ AwaitingReady ──ready + settle──▶ Running ──poll done──▶ Completed
//!       │                        │                              │
//!       └────────────────────────┴──── cancel / timeout / error ┴──▶ Cancelled | TimedOut | Failed
//! ```
//!
//! The driver launches a session on the persistent profile, navigates to the entry
//! page, waits until the page path shows a logged-in view, then hands the task a
//! [`ReadyContext`] to build its script. After injecting the script it polls the page
//! globals until the task reports completion and merges the result into the store.
//!
//! A single deadline, measured from the start of [`OperationDriver::run`], bounds the
//! whole sequence. Launch and navigation failures do not retry: the operation sits
//! idle until that deadline. Cancellation only stops local work. Requests the page
//! has already sent are left to finish on their own.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::{Instant, MissedTickBehavior};
use url::Url;

use super::browser::{BrowserSession, SessionLauncher};
use super::script::{POLL_EXPRESSION, PollState, ScriptResult, decode_payload};
use super::state::{OperationHandle, OperationStatus, ProgressMode};
use crate::config::AppConfig;
use crate::error::{BrowserError, OperationError};
use crate::store::RecordStore;

/// Fixed inputs shared by every operation
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub profile_dir: PathBuf,
    pub entry_url: Url,
    pub ready_path_prefix: String,
    pub api_base: String,
    pub org_cookie: String,
    pub poll_interval: Duration,
    pub settle_delay: Duration,
}

impl DriverSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            profile_dir: config.profile_dir()?,
            entry_url: config.service.entry_url()?,
            ready_path_prefix: config.service.ready_path_prefix.clone(),
            api_base: config.service.api_base.trim_end_matches('/').to_string(),
            org_cookie: config.service.org_cookie.clone(),
            poll_interval: config.operations.poll_interval(),
            settle_delay: config.operations.settle_delay(),
        })
    }
}

/// What a task learns once the page is ready
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyContext {
    pub org_id: String,
    pub api_base: String,
}

/// One kind of bulk operation run by the driver
pub trait Task: Send {
    type Output: Send;

    fn title(&self) -> String;

    fn initial_status(&self) -> String;

    fn progress_mode(&self) -> ProgressMode;

    /// Item count for determinate progress
    fn total(&self) -> Option<u64> {
        None
    }

    fn timeout(&self) -> Duration;

    /// Build the script to inject. Called exactly once, after the page is ready.
    fn on_ready(
        &mut self,
        handle: &OperationHandle,
        ctx: &ReadyContext,
    ) -> Result<String, OperationError>;

    /// Apply the decoded result. Runs only when the page reported completion.
    fn merge(
        &mut self,
        result: ScriptResult,
        store: &mut RecordStore,
    ) -> Result<Self::Output, OperationError>;

    fn on_cancelled(&mut self, _handle: &OperationHandle) {}

    fn progress_text(&self, progress: u64, total: Option<u64>) -> String {
        match total {
            Some(total) => format!("Processed {} of {}", progress, total),
            None => format!("Processed {}", progress),
        }
    }
}

pub struct OperationDriver {
    launcher: Arc<dyn SessionLauncher>,
    settings: DriverSettings,
    owner: Option<String>,
}

impl OperationDriver {
    pub fn new(launcher: Arc<dyn SessionLauncher>, settings: DriverSettings) -> Self {
        Self { launcher, settings, owner: None }
    }

    /// Label the operations this driver creates (e.g. the window that started them)
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// Create the handle for `task` so the caller can subscribe or cancel before running
    pub fn prepare<T: Task>(&self, task: &T) -> OperationHandle {
        OperationHandle::new(
            task.title(),
            self.owner.clone(),
            task.initial_status(),
            task.progress_mode(),
            task.total(),
        )
    }

    /// Prepare and run in one step
    pub async fn execute<T: Task>(
        &self,
        task: &mut T,
        store: &mut RecordStore,
    ) -> (OperationHandle, Result<T::Output, OperationError>) {
        let handle = self.prepare(task);
        let outcome = self.run(task, &handle, store).await;
        (handle, outcome)
    }

    /// Drive `task` to a terminal state. The session is always closed on return.
    pub async fn run<T: Task>(
        &self,
        task: &mut T,
        handle: &OperationHandle,
        store: &mut RecordStore,
    ) -> Result<T::Output, OperationError> {
        let timeout = task.timeout();
        let deadline = Instant::now() + timeout;
        let mut session: Option<Box<dyn BrowserSession>> = None;

        tracing::info!(title = %handle.title(), ?timeout, "Starting operation");

        let outcome = tokio::select! {
            biased;
            _ = handle.cancelled() => Err(OperationError::Cancelled),
            _ = tokio::time::sleep_until(deadline) => Err(OperationError::TimedOut(timeout)),
            result = self.drive(task, handle, store, &mut session) => result,
        };

        match &outcome {
            Ok(_) => {
                handle.transition(OperationStatus::Completed);
                handle.set_status_text("Completed");
            }
            Err(OperationError::Cancelled) => {
                task.on_cancelled(handle);
                handle.transition(OperationStatus::Cancelled);
                handle.set_status_text("Cancelled");
            }
            Err(OperationError::TimedOut(_)) => {
                handle.transition(OperationStatus::TimedOut);
                handle.set_status_text("Timed out");
            }
            Err(e) => {
                handle.transition(OperationStatus::Failed);
                handle.set_status_text(format!("Failed: {}", e));
            }
        }

        if let Some(mut session) = session.take() {
            session.close().await;
        }

        match &outcome {
            Ok(_) => tracing::info!(title = %handle.title(), "Operation completed"),
            Err(e) => tracing::warn!(title = %handle.title(), status = ?handle.status(), error = %e, "Operation ended"),
        }
        outcome
    }

    async fn drive<T: Task>(
        &self,
        task: &mut T,
        handle: &OperationHandle,
        store: &mut RecordStore,
        slot: &mut Option<Box<dyn BrowserSession>>,
    ) -> Result<T::Output, OperationError> {
        handle.set_status_text("Opening browser session");
        let session = match self.launcher.launch(&self.settings.profile_dir).await {
            Ok(session) => slot.insert(session),
            Err(e) => return stall(handle, "Browser session failed to start", e).await,
        };

        handle.transition(OperationStatus::AwaitingReady);
        handle.set_status_text("Loading");
        if let Err(e) = session.navigate(&self.settings.entry_url).await {
            return stall(handle, "Navigation failed", e).await;
        }

        self.wait_until_ready(&mut **session, handle).await?;
        tokio::time::sleep(self.settings.settle_delay).await;

        handle.transition(OperationStatus::Running);
        handle.set_status_text(task.initial_status());

        let org_id = session
            .cookie(&self.settings.org_cookie)
            .await?
            .filter(|v| !v.is_empty())
            .ok_or(OperationError::NoOrganization)?;
        let ctx = ReadyContext { org_id, api_base: self.settings.api_base.clone() };

        let script = task.on_ready(handle, &ctx)?;
        session.evaluate(&script).await.map_err(|e| OperationError::Injection(e.to_string()))?;
        tracing::debug!(title = %handle.title(), bytes = script.len(), "Script injected");

        let result = self.poll_until_done(&*task, &mut **session, handle).await?;
        task.merge(result, store)
    }

    /// Check the page URL each poll interval until it shows the logged-in view
    async fn wait_until_ready(
        &self,
        session: &mut dyn BrowserSession,
        handle: &OperationHandle,
    ) -> Result<(), OperationError> {
        let mut prompted = false;
        loop {
            match session.current_url().await {
                Ok(url) if url.path().starts_with(&self.settings.ready_path_prefix) => return Ok(()),
                Ok(url) => {
                    if !prompted {
                        tracing::info!(path = %url.path(), "Waiting for login");
                        handle.set_status_text("Waiting for login in the browser window");
                        prompted = true;
                    }
                }
                Err(BrowserError::SessionClosed) => {
                    return Err(BrowserError::SessionClosed.into());
                }
                Err(e) => tracing::warn!(error = %e, "Failed to read current URL"),
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    async fn poll_until_done<T: Task>(
        &self,
        task: &T,
        session: &mut dyn BrowserSession,
        handle: &OperationHandle,
    ) -> Result<ScriptResult, OperationError> {
        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let raw = match session.evaluate(POLL_EXPRESSION).await {
                Ok(raw) => raw,
                Err(BrowserError::SessionClosed) => {
                    tracing::debug!("Session closed while polling, stopping");
                    return Err(BrowserError::SessionClosed.into());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Poll failed");
                    continue;
                }
            };

            let state: PollState = match decode_payload(raw) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(error = %e, "Unreadable poll state");
                    continue;
                }
            };

            let delta = handle.record_progress(state.progress);
            if delta > 0 {
                let snapshot = handle.snapshot();
                tracing::debug!(delta, progress = snapshot.progress, "Progress");
                handle.set_status_text(task.progress_text(snapshot.progress, snapshot.total));
            }

            if state.done {
                let result = state.result.ok_or_else(|| {
                    OperationError::Script("operation finished without a result".to_string())
                })?;
                return decode_payload(result);
            }
        }
    }
}

/// Report an unrecoverable setup failure and wait for the deadline or a cancel
async fn stall<T>(
    handle: &OperationHandle,
    what: &str,
    error: BrowserError,
) -> Result<T, OperationError> {
    tracing::error!(error = %error, "{}", what);
    handle.set_status_text(format!("{}: {}", what, error));
    std::future::pending().await
}
