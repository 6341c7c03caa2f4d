//! Periodic notification refresh.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::NotificationCache;
use crate::gateway::NotificationApi;

/// Default time between refreshes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Smallest accepted interval; shorter values are raised to this.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Handle to the background refresh task.
///
/// The task refreshes once immediately and then every `interval`.
/// [`shutdown`](Self::shutdown) stops it and waits for it to exit;
/// dropping the handle aborts it.
#[derive(Debug)]
pub struct NotificationPoller {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl NotificationPoller {
    /// Spawns the refresh loop on the current tokio runtime.
    pub fn spawn<A>(cache: Arc<NotificationCache>, api: Arc<A>, interval: Duration) -> Self
    where
        A: NotificationApi + 'static,
    {
        let interval = interval.max(MIN_POLL_INTERVAL);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_ms = interval.as_millis(), "notification poller started");
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        // Errors are recorded in the cache.
                        let _ = cache.refresh(api.as_ref()).await;
                    }
                }
            }
            tracing::info!("notification poller stopped");
        });
        Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Stops the loop and waits for it to finish. A refresh in flight is
    /// allowed to complete.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    /// Returns `true` once the background task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for NotificationPoller {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
