//! In-memory notification list with optimistic read flags.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::RwLock;

use taskboard_proto::{Notification, NotificationId};

use crate::gateway::{ApiError, NotificationApi};

#[derive(Debug, Default)]
struct CacheState {
    items: Arc<Vec<Notification>>,
    loading: bool,
    last_error: Option<String>,
}

/// Shared notification list.
///
/// Read flags set locally are sticky: a refresh that still reports an
/// item as unread does not clear a local `read = true`. Only a failed
/// mark-as-read confirmation turns a flag back off.
#[derive(Debug, Default)]
pub struct NotificationCache {
    state: RwLock<CacheState>,
}

/// Overlays local read flags onto a freshly fetched list.
///
/// Items that are read in `previous` stay read in the result; order and
/// membership come from `incoming`.
#[must_use]
pub fn merge_read_flags(previous: &[Notification], mut incoming: Vec<Notification>) -> Vec<Notification> {
    let read: HashSet<&NotificationId> = previous.iter().filter(|n| n.read).map(|n| &n.id).collect();
    for item in &mut incoming {
        if read.contains(&item.id) {
            item.read = true;
        }
    }
    incoming
}

impl NotificationCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current list, newest first as delivered by the server.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<Notification>> {
        Arc::clone(&self.state.read().items)
    }

    /// Number of unread items.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.state.read().items.iter().filter(|n| !n.read).count()
    }

    /// Whether a refresh is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    /// Message of the last failed refresh, cleared by the next success.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.state.read().last_error.clone()
    }

    /// Fetches the list and merges it with local read flags.
    ///
    /// On failure the current list is kept and the error recorded.
    ///
    /// # Errors
    ///
    /// Returns the gateway error after recording it.
    pub async fn refresh<A: NotificationApi>(&self, api: &A) -> Result<(), ApiError> {
        self.state.write().loading = true;
        let result = api.fetch_notifications().await;
        let mut state = self.state.write();
        state.loading = false;
        match result {
            Ok(incoming) => {
                let merged = merge_read_flags(&state.items, incoming);
                tracing::debug!(count = merged.len(), "notifications refreshed");
                state.items = Arc::new(merged);
                state.last_error = None;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "notification refresh failed");
                state.last_error = Some("Could not load notifications".to_string());
                Err(e)
            }
        }
    }

    /// Sets `read` on the given ids, copy-on-write.
    fn set_read(&self, ids: &HashSet<NotificationId>, read: bool) {
        let mut state = self.state.write();
        if !state.items.iter().any(|n| ids.contains(&n.id)) {
            return;
        }
        let next = state
            .items
            .iter()
            .map(|n| {
                if ids.contains(&n.id) {
                    Notification { read, ..n.clone() }
                } else {
                    n.clone()
                }
            })
            .collect();
        state.items = Arc::new(next);
    }

    /// Marks one notification read locally, then confirms. A failed
    /// confirmation reverts that item to unread and is not reported.
    ///
    /// Returns `true` if the server confirmed.
    pub async fn mark_as_read<A: NotificationApi>(&self, api: &A, id: &NotificationId) -> bool {
        let ids = HashSet::from([id.clone()]);
        self.set_read(&ids, true);
        match api.mark_notification_read(id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(%id, error = %e, "mark-as-read failed, reverting");
                self.set_read(&ids, false);
                false
            }
        }
    }

    /// Marks every currently unread notification read locally, then
    /// confirms each one independently. Each failure reverts only its own
    /// item.
    ///
    /// Returns the number of items that were reverted.
    pub async fn mark_all_as_read<A: NotificationApi>(&self, api: &A) -> usize {
        let unread: HashSet<NotificationId> = self
            .snapshot()
            .iter()
            .filter(|n| !n.read)
            .map(|n| n.id.clone())
            .collect();
        if unread.is_empty() {
            return 0;
        }
        self.set_read(&unread, true);

        let confirmations = unread.iter().map(|id| async move {
            (id, api.mark_notification_read(id).await)
        });
        let mut failed = HashSet::new();
        for (id, result) in join_all(confirmations).await {
            if let Err(e) = result {
                tracing::warn!(%id, error = %e, "mark-as-read failed, reverting");
                failed.insert(id.clone());
            }
        }
        if !failed.is_empty() {
            self.set_read(&failed, false);
        }
        failed.len()
    }
}
