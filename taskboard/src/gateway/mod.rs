//! Remote board gateway.
//!
//! Typed wrappers over the REST endpoints, split into three traits so each
//! store only depends on the calls it makes:
//! - [`BoardApi`]: board fetch and task/column mutations
//! - [`NotificationApi`]: notification polling and mark-as-read
//! - [`AccountApi`]: authentication and user management
//!
//! Implementations:
//! - [`http::HttpGateway`]: `reqwest` client against the real server
//! - [`memory::MemoryGateway`]: in-process board for offline demo mode and tests
//! - [`fallback::FallbackGateway`]: degraded layer that hides notification failures

pub mod fallback;
pub mod http;
pub mod memory;

use std::future::Future;

use taskboard_proto::auth::{AuthResponse, LoginRequest, RegisterRequest};
use taskboard_proto::task::{AddCommentRequest, CreateTaskRequest, UpdateTaskRequest};
use taskboard_proto::user::Role;
use taskboard_proto::{
    Board, ColumnId, ColumnUpdate, Comment, Notification, NotificationId, Task, TaskId, User,
    UserId, ValidationError,
};

/// Errors produced by gateway calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connect, timeout, TLS, ...).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error text extracted from the response body.
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured base URL (or a path joined onto it) is not a valid URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The request body failed local validation and was not sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The gateway is in offline mode.
    #[error("server unreachable (offline)")]
    Offline,
}

impl ApiError {
    /// HTTP status code, if the server answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` for 401/403 answers.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

/// Board and task endpoints.
pub trait BoardApi: Send + Sync {
    /// `GET /board`.
    fn fetch_board(&self) -> impl Future<Output = Result<Board, ApiError>> + Send;

    /// `PATCH /tasks/{id}` with `{ "state": column }`.
    ///
    /// Used to confirm cross-column moves.
    fn update_task_state(
        &self,
        task_id: &TaskId,
        column_id: &ColumnId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `PATCH /tasks/{id}` with arbitrary fields. Returns the updated task.
    fn update_task(
        &self,
        task_id: &TaskId,
        patch: &UpdateTaskRequest,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `POST /tasks`. Returns the created task with server-assigned id.
    fn create_task(
        &self,
        request: &CreateTaskRequest,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `DELETE /tasks/{id}`.
    fn delete_task(&self, task_id: &TaskId) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `POST /tasks/{id}/comments`. Returns the stored comment.
    fn add_comment(
        &self,
        task_id: &TaskId,
        request: &AddCommentRequest,
    ) -> impl Future<Output = Result<Comment, ApiError>> + Send;

    /// `PUT /board/columns` with the full ordered column list.
    fn update_columns(
        &self,
        columns: &[ColumnUpdate],
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Notification endpoints.
pub trait NotificationApi: Send + Sync {
    /// `GET /notifications`.
    fn fetch_notifications(&self) -> impl Future<Output = Result<Vec<Notification>, ApiError>> + Send;

    /// `PATCH /notifications/{id}/read`.
    fn mark_notification_read(
        &self,
        id: &NotificationId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Authentication and user administration endpoints.
pub trait AccountApi: Send + Sync {
    /// `POST /auth/login`.
    fn login(&self, request: &LoginRequest)
    -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    /// `POST /auth/register`.
    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    /// `GET /auth/me`.
    fn current_user(&self) -> impl Future<Output = Result<User, ApiError>> + Send;

    /// `GET /users`.
    fn list_users(&self) -> impl Future<Output = Result<Vec<User>, ApiError>> + Send;

    /// `PATCH /users/{id}/role`.
    fn update_user_role(
        &self,
        user_id: &UserId,
        role: Role,
    ) -> impl Future<Output = Result<User, ApiError>> + Send;

    /// `DELETE /users/{id}`.
    fn delete_user(&self, user_id: &UserId) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Everything the application needs from a backend.
pub trait Gateway: BoardApi + NotificationApi + AccountApi + 'static {}

impl<T: BoardApi + NotificationApi + AccountApi + 'static> Gateway for T {}
