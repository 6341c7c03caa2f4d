//! Degraded notification layer.
//!
//! When enabled, notification failures never reach the caller: a failed
//! fetch yields a fixed placeholder list and a failed mark-as-read is
//! logged and reported as success. Disabled, every call passes straight
//! through to the inner gateway.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use taskboard_proto::{Notification, NotificationId, UserId};

use super::{ApiError, NotificationApi};

/// Wraps a [`NotificationApi`] and optionally hides its failures.
#[derive(Debug)]
pub struct FallbackGateway<A> {
    inner: Arc<A>,
    enabled: bool,
}

impl<A> FallbackGateway<A> {
    /// Wraps `inner`. With `enabled == false` this is a pass-through.
    #[must_use]
    pub const fn new(inner: Arc<A>, enabled: bool) -> Self {
        Self { inner, enabled }
    }

    /// Whether failures are being masked.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The wrapped gateway.
    #[must_use]
    pub const fn inner(&self) -> &Arc<A> {
        &self.inner
    }
}

impl<A: NotificationApi> NotificationApi for FallbackGateway<A> {
    async fn fetch_notifications(&self) -> Result<Vec<Notification>, ApiError> {
        match self.inner.fetch_notifications().await {
            Ok(list) => Ok(list),
            Err(e) if self.enabled => {
                tracing::warn!(error = %e, "notification fetch failed, using placeholder list");
                Ok(placeholder_notifications(Utc::now()))
            }
            Err(e) => Err(e),
        }
    }

    async fn mark_notification_read(&self, id: &NotificationId) -> Result<(), ApiError> {
        match self.inner.mark_notification_read(id).await {
            Err(e) if self.enabled => {
                tracing::warn!(%id, error = %e, "mark-as-read failed, ignoring");
                Ok(())
            }
            other => other,
        }
    }
}

/// The list shown while the server's notification endpoint is unavailable.
///
/// Ids are stable (`n1`..`n3`) so read flags set locally survive later
/// polls that fail the same way.
#[must_use]
pub fn placeholder_notifications(now: DateTime<Utc>) -> Vec<Notification> {
    let user = UserId::from("local");
    vec![
        Notification {
            id: NotificationId::from("n1"),
            user_id: user.clone(),
            message: "You have been assigned a new task: Update design".to_string(),
            read: false,
            created_at: now,
        },
        Notification {
            id: NotificationId::from("n2"),
            user_id: user.clone(),
            message: "Your task status changed to: In progress".to_string(),
            read: false,
            created_at: now - Duration::hours(1),
        },
        Notification {
            id: NotificationId::from("n3"),
            user_id: user,
            message: "An administrator commented on your task".to_string(),
            read: true,
            created_at: now - Duration::days(1),
        },
    ]
}
