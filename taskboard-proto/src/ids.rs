//! Opaque string identifiers.
//!
//! The server mints every id (`"t1"`, `"column-1712"`, ...). The client
//! never parses them, so each id is a transparent newtype over `String`
//! that keeps task ids from being passed where column ids are expected.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a task card.
    TaskId
);
string_id!(
    /// Identifier of a board column (also the value of `Task::state`).
    ColumnId
);
string_id!(
    /// Identifier of a comment on a task.
    CommentId
);
string_id!(
    /// Identifier of a notification.
    NotificationId
);
string_id!(
    /// Identifier of a user account.
    UserId
);
