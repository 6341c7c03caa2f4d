//! Notifications produced server-side and polled by the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{NotificationId, UserId};

/// A notification addressed to the current user.
///
/// The client only ever toggles `read`, first locally and then on the
/// server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Server-assigned identifier.
    pub id: NotificationId,
    /// Recipient.
    pub user_id: UserId,
    /// Message text.
    pub message: String,
    /// Read flag.
    #[serde(default)]
    pub read: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}
