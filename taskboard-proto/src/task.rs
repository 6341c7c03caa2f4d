//! Task cards, comments, and the request bodies that create or edit them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ids::{ColumnId, CommentId, TaskId};
use crate::validate::{ValidationError, require_text};

/// Maximum allowed task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 256;

/// Maximum allowed comment length in characters.
pub const MAX_COMMENT_LENGTH: usize = 4000;

/// Task priority. The wire value is an integer where `1` is the most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    /// Wire value `1`.
    High,
    /// Wire value `2`.
    Medium,
    /// Wire value `3`.
    Low,
}

impl Priority {
    /// Integer used on the wire.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// Human-readable badge label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::High),
            2 => Ok(Self::Medium),
            3 => Ok(Self::Low),
            other => Err(ValidationError::InvalidPriority(other)),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Serde adapter for `Option<Priority>`.
///
/// The server writes `0` (or omits the field) for "no priority".
mod priority_field {
    use super::{Deserialize, Deserializer, Priority, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<Priority>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(p) => s.serialize_u8(p.as_u8()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Priority>, D::Error> {
        match Option::<u8>::deserialize(d)? {
            None | Some(0) => Ok(None),
            Some(n) => Priority::try_from(n)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Attachments are reported either as a bare count or as a list of
/// attachment objects; the client only ever needs the count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attachments {
    /// Server sent a number.
    Count(u32),
    /// Server sent the attachment records themselves.
    List(Vec<serde_json::Value>),
}

impl Attachments {
    /// Number of attachments regardless of representation.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Count(n) => *n as usize,
            Self::List(items) => items.len(),
        }
    }
}

impl Default for Attachments {
    fn default() -> Self {
        Self::Count(0)
    }
}

/// A comment left on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Server-assigned identifier.
    pub id: CommentId,
    /// Comment body.
    pub content: String,
    /// Display name of the author.
    pub author: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A task card on the board.
///
/// `state` is the id of the column that lists this task. The board store
/// keeps it in sync with `Column::task_ids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Server-assigned identifier.
    pub id: TaskId,
    /// Card title.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Optional priority (`1..=3`).
    #[serde(default, with = "priority_field")]
    pub priority: Option<Priority>,
    /// Display name of the assignee, if any.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "blank_as_none")]
    pub assignee: Option<String>,
    /// Owning column.
    pub state: ColumnId,
    /// Attachment count or list.
    #[serde(default)]
    pub attachments: Attachments,
    /// Comments in posting order.
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

fn blank_as_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(d)?.filter(|s| !s.trim().is_empty()))
}

/// Body of `POST /tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Card title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Optional priority.
    #[serde(with = "priority_field")]
    pub priority: Option<Priority>,
    /// Optional assignee display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Column the new task starts in.
    pub state: ColumnId,
}

impl CreateTaskRequest {
    /// Validates the form before submission.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the title is blank or longer than
    /// [`MAX_TASK_TITLE_LENGTH`], or the target column is empty.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title, MAX_TASK_TITLE_LENGTH)?;
        if self.state.as_str().trim().is_empty() {
            return Err(ValidationError::Empty { field: "state" });
        }
        Ok(())
    }
}

/// Body of `PATCH /tasks/{id}`. Only present fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New priority (wire integer, `0` clears it).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// New assignee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// New owning column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ColumnId>,
}

impl UpdateTaskRequest {
    /// Patch that only moves the task to another column.
    #[must_use]
    pub fn state_only(state: ColumnId) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    /// Returns `true` if the patch would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.assignee.is_none()
            && self.state.is_none()
    }

    /// Validates the present fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a blank/oversized title or a
    /// priority outside `0..=3`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            require_text("title", title, MAX_TASK_TITLE_LENGTH)?;
        }
        if let Some(p) = self.priority
            && p != 0
        {
            Priority::try_from(p)?;
        }
        Ok(())
    }
}

/// Body of `POST /tasks/{id}/comments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddCommentRequest {
    /// Comment body.
    pub content: String,
}

impl AddCommentRequest {
    /// Validates the comment body.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the body is blank or too long.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("content", &self.content, MAX_COMMENT_LENGTH)
    }
}
