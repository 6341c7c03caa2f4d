//! HTTP gateway backed by `reqwest`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use taskboard_proto::auth::{AuthResponse, LoginRequest, RegisterRequest};
use taskboard_proto::task::{AddCommentRequest, CreateTaskRequest, UpdateTaskRequest};
use taskboard_proto::user::{Role, RoleUpdate};
use taskboard_proto::{
    Board, ColumnId, ColumnUpdate, Comment, Notification, NotificationId, Task, TaskId, User,
    UserId,
};

use super::{AccountApi, ApiError, BoardApi, NotificationApi};
use crate::session::Session;

/// Gateway that talks JSON to the board server.
///
/// The bearer token is read from the [`Session`] on every request, so a
/// login or logout takes effect immediately. Without a token the
/// `Authorization` header is omitted.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
    session: Arc<Session>,
}

impl HttpGateway {
    /// Creates a gateway for `base_url` (e.g. `http://localhost:8080/api`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if `base_url` is not an absolute
    /// http(s) URL, or [`ApiError::Transport`] if the client cannot be built.
    pub fn new(base_url: &str, timeout: Duration, session: Arc<Session>) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "{base_url}: unsupported scheme {}",
                base_url.scheme()
            )));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    /// The configured base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| ApiError::InvalidUrl(format!("{joined}: {e}")))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(path)?;
        tracing::debug!(%method, %url, "api request");
        let request = self.client.request(method, url);
        Ok(match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T, ApiError> {
        let request = self.request(method, path)?;
        decode(request.send().await?).await
    }

    async fn send_json<B: Serialize + Sync + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.request(method, path)?.json(body);
        decode(request.send().await?).await
    }

    async fn send_empty<B: Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        let mut request = self.request(method, path)?;
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await?;
        Err(status_error(status.as_u16(), &body))
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        return Err(status_error(status.as_u16(), &body));
    }
    Ok(serde_json::from_slice(&body)?)
}

/// Builds [`ApiError::Status`], preferring the server's `error`/`message`
/// field over the raw body.
fn status_error(status: u16, body: &[u8]) -> ApiError {
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["error", "message"]
                .iter()
                .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());
    tracing::debug!(status, %message, "api error response");
    ApiError::Status { status, message }
}

#[derive(Serialize)]
struct StatePatch<'a> {
    state: &'a ColumnId,
}

impl BoardApi for HttpGateway {
    async fn fetch_board(&self) -> Result<Board, ApiError> {
        self.fetch(Method::GET, "board").await
    }

    async fn update_task_state(&self, task_id: &TaskId, column_id: &ColumnId) -> Result<(), ApiError> {
        let path = format!("tasks/{task_id}");
        self.send_empty(Method::PATCH, &path, Some(&StatePatch { state: column_id }))
            .await
    }

    async fn update_task(&self, task_id: &TaskId, patch: &UpdateTaskRequest) -> Result<Task, ApiError> {
        patch.validate()?;
        self.send_json(Method::PATCH, &format!("tasks/{task_id}"), patch)
            .await
    }

    async fn create_task(&self, request: &CreateTaskRequest) -> Result<Task, ApiError> {
        request.validate()?;
        self.send_json(Method::POST, "tasks", request).await
    }

    async fn delete_task(&self, task_id: &TaskId) -> Result<(), ApiError> {
        self.send_empty::<()>(Method::DELETE, &format!("tasks/{task_id}"), None)
            .await
    }

    async fn add_comment(&self, task_id: &TaskId, request: &AddCommentRequest) -> Result<Comment, ApiError> {
        request.validate()?;
        self.send_json(Method::POST, &format!("tasks/{task_id}/comments"), request)
            .await
    }

    async fn update_columns(&self, columns: &[ColumnUpdate]) -> Result<(), ApiError> {
        for column in columns {
            column.validate()?;
        }
        self.send_empty(Method::PUT, "board/columns", Some(columns))
            .await
    }
}

impl NotificationApi for HttpGateway {
    async fn fetch_notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.fetch(Method::GET, "notifications").await
    }

    async fn mark_notification_read(&self, id: &NotificationId) -> Result<(), ApiError> {
        self.send_empty::<()>(Method::PATCH, &format!("notifications/{id}/read"), None)
            .await
    }
}

impl AccountApi for HttpGateway {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        request.validate()?;
        self.send_json(Method::POST, "auth/login", request).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        request.validate()?;
        self.send_json(Method::POST, "auth/register", request).await
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        self.fetch(Method::GET, "auth/me").await
    }

    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.fetch(Method::GET, "users").await
    }

    async fn update_user_role(&self, user_id: &UserId, role: Role) -> Result<User, ApiError> {
        self.send_json(
            Method::PATCH,
            &format!("users/{user_id}/role"),
            &RoleUpdate { role },
        )
        .await
    }

    async fn delete_user(&self, user_id: &UserId) -> Result<(), ApiError> {
        self.send_empty::<()>(Method::DELETE, &format!("users/{user_id}"), None)
            .await
    }
}
