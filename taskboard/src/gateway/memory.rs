//! In-process gateway.
//!
//! Backs offline demo mode and the test suites. Behaves like the real
//! server for the subset of rules the client relies on (column membership
//! follows `state`, admins only for user listing), and exposes knobs for
//! injecting failures and latency.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use taskboard_proto::auth::{AuthResponse, LoginRequest, RegisterRequest};
use taskboard_proto::task::{AddCommentRequest, CreateTaskRequest, UpdateTaskRequest};
use taskboard_proto::user::Role;
use taskboard_proto::{
    Attachments, Board, Column, ColumnId, ColumnUpdate, Comment, CommentId, Notification,
    NotificationId, Priority, Task, TaskId, User, UserId,
};

use super::{AccountApi, ApiError, BoardApi, NotificationApi};

#[derive(Debug, Default)]
struct MemoryState {
    board: Board,
    notifications: Vec<Notification>,
    users: Vec<User>,
    passwords: HashMap<String, String>,
    current_user: Option<UserId>,
    offline: bool,
    latency: Duration,
    failing_reads: HashSet<NotificationId>,
    failing_tasks: HashSet<TaskId>,
    requests: Vec<String>,
}

/// Gateway holding the whole "server" in memory.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
}

fn not_found(what: &str) -> ApiError {
    ApiError::Status {
        status: 404,
        message: format!("{what} not found"),
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError::Status {
        status: 400,
        message: message.into(),
    }
}

fn injected_failure() -> ApiError {
    ApiError::Status {
        status: 500,
        message: "injected failure".to_string(),
    }
}

impl MemoryGateway {
    /// Empty board, no users, no notifications.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the given board.
    #[must_use]
    pub fn with_board(board: Board) -> Self {
        let gw = Self::new();
        gw.state.lock().board = board;
        gw
    }

    /// Seeded demo data: four columns, a handful of tasks, an admin
    /// (`admin@example.com` / `admin123`) and a regular user
    /// (`ann@example.com` / `password`), signed in as the admin.
    #[must_use]
    pub fn demo() -> Self {
        let gw = Self::with_board(demo_board());
        let now = Utc::now();
        let admin = User {
            id: UserId::from("u-admin"),
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            role: Role::Admin,
            created_at: now - chrono::Duration::days(30),
        };
        let ann = User {
            id: UserId::from("u-ann"),
            username: "ann".to_string(),
            email: "ann@example.com".to_string(),
            role: Role::User,
            created_at: now - chrono::Duration::days(12),
        };
        gw.add_user(admin.clone(), "admin123");
        gw.add_user(ann, "password");
        {
            let mut state = gw.state.lock();
            state.current_user = Some(admin.id.clone());
            state.notifications = vec![
                Notification {
                    id: NotificationId::from("demo-n1"),
                    user_id: admin.id.clone(),
                    message: "ann moved \"Write release notes\" to Review".to_string(),
                    read: false,
                    created_at: now - chrono::Duration::minutes(4),
                },
                Notification {
                    id: NotificationId::from("demo-n2"),
                    user_id: admin.id.clone(),
                    message: "New comment on \"Fix login redirect\"".to_string(),
                    read: false,
                    created_at: now - chrono::Duration::hours(3),
                },
                Notification {
                    id: NotificationId::from("demo-n3"),
                    user_id: admin.id,
                    message: "Welcome to the board".to_string(),
                    read: true,
                    created_at: now - chrono::Duration::days(8),
                },
            ];
        }
        gw
    }

    /// Makes every call fail with [`ApiError::Offline`].
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = latency;
    }

    /// Makes `PATCH /notifications/{id}/read` fail for this id.
    pub fn fail_mark_read(&self, id: NotificationId) {
        self.state.lock().failing_reads.insert(id);
    }

    /// Makes every `PATCH /tasks/{id}` fail for this id.
    pub fn fail_task_updates(&self, id: TaskId) {
        self.state.lock().failing_tasks.insert(id);
    }

    /// Clears all injected per-id failures.
    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.failing_reads.clear();
        state.failing_tasks.clear();
    }

    /// Server-side board.
    #[must_use]
    pub fn board(&self) -> Board {
        self.state.lock().board.clone()
    }

    /// Server-side notification list.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.state.lock().notifications.clone()
    }

    /// Replaces the server-side notification list.
    pub fn set_notifications(&self, notifications: Vec<Notification>) {
        self.state.lock().notifications = notifications;
    }

    /// Registers an account with the given password.
    pub fn add_user(&self, user: User, password: &str) {
        let mut state = self.state.lock();
        state
            .passwords
            .insert(user.email.to_ascii_lowercase(), password.to_string());
        state.users.push(user);
    }

    /// Every request seen so far, as `"METHOD /path"`.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().requests.clone()
    }

    /// Records the request, waits the configured latency, then checks
    /// offline mode.
    async fn enter(&self, request: String) -> Result<(), ApiError> {
        let latency = {
            let mut state = self.state.lock();
            state.requests.push(request);
            state.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.state.lock().offline {
            return Err(ApiError::Offline);
        }
        Ok(())
    }
}

impl MemoryState {
    fn current_username(&self) -> String {
        self.current_user
            .as_ref()
            .and_then(|id| self.users.iter().find(|u| &u.id == id))
            .map_or_else(|| "anonymous".to_string(), |u| u.username.clone())
    }

    /// Server rule: a task changing `state` is appended to its new column.
    fn relocate(&mut self, task_id: &TaskId, to: &ColumnId) -> Result<(), ApiError> {
        if !self.board.columns.contains_key(to) {
            return Err(bad_request(format!("unknown column {to}")));
        }
        let task = self
            .board
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| not_found("task"))?;
        if &task.state == to {
            return Ok(());
        }
        let from = std::mem::replace(&mut task.state, to.clone());
        task.updated_at = Utc::now();
        if let Some(column) = self.board.columns.get_mut(&from) {
            column.task_ids.retain(|id| id != task_id);
        }
        if let Some(column) = self.board.columns.get_mut(to) {
            column.task_ids.push(task_id.clone());
        }
        Ok(())
    }

    fn auth_for(&mut self, user: User) -> AuthResponse {
        self.current_user = Some(user.id.clone());
        AuthResponse {
            token: format!("demo-{}", Uuid::now_v7()),
            user,
        }
    }
}

impl BoardApi for MemoryGateway {
    async fn fetch_board(&self) -> Result<Board, ApiError> {
        self.enter("GET /board".to_string()).await?;
        Ok(self.state.lock().board.clone())
    }

    async fn update_task_state(&self, task_id: &TaskId, column_id: &ColumnId) -> Result<(), ApiError> {
        self.enter(format!("PATCH /tasks/{task_id}")).await?;
        let mut state = self.state.lock();
        if state.failing_tasks.contains(task_id) {
            return Err(injected_failure());
        }
        state.relocate(task_id, column_id)
    }

    async fn update_task(&self, task_id: &TaskId, patch: &UpdateTaskRequest) -> Result<Task, ApiError> {
        self.enter(format!("PATCH /tasks/{task_id}")).await?;
        patch.validate()?;
        let mut state = self.state.lock();
        if state.failing_tasks.contains(task_id) {
            return Err(injected_failure());
        }
        if let Some(column) = &patch.state {
            state.relocate(task_id, column)?;
        }
        let task = state
            .board
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| not_found("task"))?;
        if let Some(title) = &patch.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = &patch.description {
            task.description.clone_from(description);
        }
        if let Some(priority) = patch.priority {
            task.priority = Priority::try_from(priority).ok();
        }
        if let Some(assignee) = &patch.assignee {
            task.assignee = Some(assignee.trim().to_string()).filter(|a| !a.is_empty());
        }
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn create_task(&self, request: &CreateTaskRequest) -> Result<Task, ApiError> {
        self.enter("POST /tasks".to_string()).await?;
        request.validate()?;
        let mut state = self.state.lock();
        let now = Utc::now();
        let task = Task {
            id: TaskId::new(format!("task-{}", Uuid::now_v7())),
            title: request.title.trim().to_string(),
            description: request.description.clone(),
            priority: request.priority,
            assignee: request.assignee.clone(),
            state: request.state.clone(),
            attachments: Attachments::default(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let column = state
            .board
            .columns
            .get_mut(&request.state)
            .ok_or_else(|| bad_request(format!("unknown column {}", request.state)))?;
        column.task_ids.push(task.id.clone());
        state.board.tasks.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn delete_task(&self, task_id: &TaskId) -> Result<(), ApiError> {
        self.enter(format!("DELETE /tasks/{task_id}")).await?;
        let mut state = self.state.lock();
        let task = state
            .board
            .tasks
            .remove(task_id)
            .ok_or_else(|| not_found("task"))?;
        if let Some(column) = state.board.columns.get_mut(&task.state) {
            column.task_ids.retain(|id| id != task_id);
        }
        Ok(())
    }

    async fn add_comment(&self, task_id: &TaskId, request: &AddCommentRequest) -> Result<Comment, ApiError> {
        self.enter(format!("POST /tasks/{task_id}/comments")).await?;
        request.validate()?;
        let mut state = self.state.lock();
        let author = state.current_username();
        let task = state
            .board
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| not_found("task"))?;
        let comment = Comment {
            id: CommentId::new(format!("comment-{}", Uuid::now_v7())),
            content: request.content.trim().to_string(),
            author,
            created_at: Utc::now(),
        };
        task.comments.push(comment.clone());
        Ok(comment)
    }

    async fn update_columns(&self, columns: &[ColumnUpdate]) -> Result<(), ApiError> {
        self.enter("PUT /board/columns".to_string()).await?;
        let mut state = self.state.lock();
        let listed: HashSet<&ColumnId> = columns.iter().map(|c| &c.id).collect();
        if listed.len() != columns.len() || listed.len() != state.board.columns.len() {
            return Err(bad_request("column list must name every column once"));
        }
        for update in columns {
            update.validate()?;
            let column = state
                .board
                .columns
                .get_mut(&update.id)
                .ok_or_else(|| bad_request(format!("unknown column {}", update.id)))?;
            column.title.clone_from(&update.title);
        }
        let mut ordered: Vec<&ColumnUpdate> = columns.iter().collect();
        ordered.sort_by_key(|c| c.order);
        state.board.column_order = ordered.into_iter().map(|c| c.id.clone()).collect();
        Ok(())
    }
}

impl NotificationApi for MemoryGateway {
    async fn fetch_notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.enter("GET /notifications".to_string()).await?;
        Ok(self.state.lock().notifications.clone())
    }

    async fn mark_notification_read(&self, id: &NotificationId) -> Result<(), ApiError> {
        self.enter(format!("PATCH /notifications/{id}/read")).await?;
        let mut state = self.state.lock();
        if state.failing_reads.contains(id) {
            return Err(injected_failure());
        }
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| &n.id == id)
            .ok_or_else(|| not_found("notification"))?;
        notification.read = true;
        Ok(())
    }
}

impl AccountApi for MemoryGateway {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.enter("POST /auth/login".to_string()).await?;
        request.validate()?;
        let mut state = self.state.lock();
        let email = request.email.trim().to_ascii_lowercase();
        let valid = state.passwords.get(&email) == Some(&request.password);
        let user = state
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(&email))
            .filter(|_| valid)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: 401,
                message: "invalid credentials".to_string(),
            })?;
        Ok(state.auth_for(user))
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.enter("POST /auth/register".to_string()).await?;
        request.validate()?;
        let mut state = self.state.lock();
        let email = request.email.trim().to_ascii_lowercase();
        if state.passwords.contains_key(&email) {
            return Err(ApiError::Status {
                status: 409,
                message: "email already registered".to_string(),
            });
        }
        let user = User {
            id: UserId::new(format!("user-{}", Uuid::now_v7())),
            username: request.username.trim().to_string(),
            email: email.clone(),
            role: Role::User,
            created_at: Utc::now(),
        };
        state.passwords.insert(email, request.password.clone());
        state.users.push(user.clone());
        Ok(state.auth_for(user))
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        self.enter("GET /auth/me".to_string()).await?;
        let state = self.state.lock();
        state
            .current_user
            .as_ref()
            .and_then(|id| state.users.iter().find(|u| &u.id == id))
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: 401,
                message: "not signed in".to_string(),
            })
    }

    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.enter("GET /users".to_string()).await?;
        let state = self.state.lock();
        let is_admin = state
            .current_user
            .as_ref()
            .and_then(|id| state.users.iter().find(|u| &u.id == id))
            .is_some_and(|u| u.role.is_admin());
        if !is_admin {
            return Err(ApiError::Status {
                status: 403,
                message: "admin only".to_string(),
            });
        }
        Ok(state.users.clone())
    }

    async fn update_user_role(&self, user_id: &UserId, role: Role) -> Result<User, ApiError> {
        self.enter(format!("PATCH /users/{user_id}/role")).await?;
        let mut state = self.state.lock();
        let user = state
            .users
            .iter_mut()
            .find(|u| &u.id == user_id)
            .ok_or_else(|| not_found("user"))?;
        user.role = role;
        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: &UserId) -> Result<(), ApiError> {
        self.enter(format!("DELETE /users/{user_id}")).await?;
        let mut state = self.state.lock();
        let before = state.users.len();
        state.users.retain(|u| &u.id != user_id);
        if state.users.len() == before {
            return Err(not_found("user"));
        }
        Ok(())
    }
}

/// Board used by offline demo mode.
#[must_use]
pub fn demo_board() -> Board {
    let now = Utc::now();
    let columns = [
        ("todo", "To do"),
        ("in-progress", "In progress"),
        ("review", "Review"),
        ("done", "Done"),
    ];
    let tasks = [
        ("t1", "Update design", "todo", Some(Priority::High), Some("ann"), 3),
        ("t2", "Fix login redirect", "todo", Some(Priority::Medium), None, 30),
        ("t3", "Write onboarding guide", "todo", None, None, 60 * 24),
        ("t4", "Migrate CI runners", "in-progress", Some(Priority::Low), Some("admin"), 60 * 5),
        ("t5", "Write release notes", "review", Some(Priority::Medium), Some("ann"), 60 * 24 * 3),
        ("t6", "Set up staging", "done", None, Some("admin"), 60 * 24 * 40),
    ];

    let mut board = Board::default();
    for (id, title) in columns {
        let id = ColumnId::from(id);
        board.column_order.push(id.clone());
        board.columns.insert(
            id.clone(),
            Column {
                id,
                title: title.to_string(),
                task_ids: Vec::new(),
            },
        );
    }
    for (id, title, column, priority, assignee, age_minutes) in tasks {
        let task = Task {
            id: TaskId::from(id),
            title: title.to_string(),
            description: String::new(),
            priority,
            assignee: assignee.map(str::to_string),
            state: ColumnId::from(column),
            attachments: Attachments::default(),
            comments: Vec::new(),
            created_at: now - chrono::Duration::minutes(age_minutes),
            updated_at: now - chrono::Duration::minutes(age_minutes),
        };
        if let Some(column) = board.columns.get_mut(&task.state) {
            column.task_ids.push(task.id.clone());
        }
        board.tasks.insert(task.id.clone(), task);
    }
    board
}
