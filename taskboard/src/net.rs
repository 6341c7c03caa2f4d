//! Networking coordinator for wiring the TUI to the REST gateway.
//!
//! This module bridges the synchronous TUI event loop (crossterm poll-based)
//! with the async [`BoardStore`] / [`NotificationCache`] operations. It
//! spawns background tokio tasks and communicates with the main thread via
//! [`NetCommand`] / [`NetEvent`] channels.
//!
//! # Architecture
//!
//! ```text
//! TUI (main thread)  ←── NetEvent ───  tokio background tasks
//!                     ─── NetCommand →
//! ```
//!
//! Optimistic changes (card moves, read flags) are applied by the main
//! thread or the stores before the request leaves, so the next frame
//! already shows them. Each command runs in its own task; overlapping
//! commands are not serialized.

use std::sync::{Arc, Weak};

use tokio::sync::mpsc;

use taskboard_proto::auth::{AuthResponse, LoginRequest, RegisterRequest};
use taskboard_proto::task::{CreateTaskRequest, UpdateTaskRequest};
use taskboard_proto::{ColumnId, NotificationId, Role, TaskId, User, UserId};

use crate::board::{BoardError, BoardStore, PendingMove};
use crate::gateway::fallback::FallbackGateway;
use crate::gateway::{AccountApi, ApiError, BoardApi, Gateway};
use crate::notifications::NotificationCache;
use crate::session::Session;

/// Commands sent from the TUI main loop to the networking background tasks.
#[derive(Debug)]
pub enum NetCommand {
    /// Reload the board and the notification list.
    Refresh,
    /// Confirm a move that has already been applied locally.
    ConfirmMove(PendingMove),
    /// Create a task.
    CreateTask(CreateTaskRequest),
    /// Patch a task.
    UpdateTask {
        /// Task to change.
        task_id: TaskId,
        /// Fields to change.
        patch: UpdateTaskRequest,
    },
    /// Delete a task.
    DeleteTask(TaskId),
    /// Add a comment to a task.
    AddComment {
        /// Task to comment on.
        task_id: TaskId,
        /// Comment text.
        content: String,
    },
    /// Save column titles and order.
    RenameColumns(Vec<(ColumnId, String)>),
    /// Mark one notification read.
    MarkRead(NotificationId),
    /// Mark every unread notification read.
    MarkAllRead,
    /// Sign in.
    Login(LoginRequest),
    /// Create an account and sign in.
    Register(RegisterRequest),
    /// Load the account the stored token belongs to.
    FetchCurrentUser,
    /// List all accounts (admin).
    ListUsers,
    /// Change an account's role (admin).
    SetRole {
        /// Account to change.
        user_id: UserId,
        /// New role.
        role: Role,
    },
    /// Delete an account (admin).
    DeleteUser(UserId),
    /// Gracefully shut down the networking tasks.
    Shutdown,
}

/// Events sent from the networking background tasks to the TUI main loop.
///
/// Board and notification data are read from the shared stores; events
/// only carry what the UI needs for feedback and selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetEvent {
    /// The board was (re)loaded.
    BoardLoaded,
    /// The board could not be loaded; the previous copy is still shown.
    BoardLoadFailed(String),
    /// The server rejected a move and the board was restored.
    MoveRolledBack {
        /// The card that moved back.
        task_id: TaskId,
        /// Why the server refused.
        reason: String,
    },
    /// A task was created.
    TaskCreated(TaskId),
    /// A task was changed.
    TaskUpdated(TaskId),
    /// A task was deleted.
    TaskDeleted(TaskId),
    /// A comment was stored.
    CommentAdded(TaskId),
    /// Column titles and order were saved.
    ColumnsSaved,
    /// The account that is now signed in.
    SignedIn(User),
    /// The stored token was rejected and has been cleared.
    SignedOut,
    /// Result of listing accounts.
    Users(Vec<User>),
    /// An account's role changed.
    UserUpdated(User),
    /// An account was deleted.
    UserDeleted(UserId),
    /// A command failed.
    Error(String),
}

/// Shared state the command tasks work on.
///
/// The board is held weakly: once the UI drops its store, results of
/// requests still in flight are discarded.
pub struct NetContext<G> {
    api: Arc<FallbackGateway<G>>,
    board: Weak<BoardStore>,
    notifications: Arc<NotificationCache>,
    session: Arc<Session>,
}

impl<G> NetContext<G> {
    /// Bundle the gateway and stores for [`spawn_net`].
    #[must_use]
    pub fn new(
        api: Arc<FallbackGateway<G>>,
        board: &Arc<BoardStore>,
        notifications: Arc<NotificationCache>,
        session: Arc<Session>,
    ) -> Self {
        Self {
            api,
            board: Arc::downgrade(board),
            notifications,
            session,
        }
    }

    fn gateway(&self) -> &G {
        self.api.inner()
    }
}

/// Spawn the command handler and return channel handles.
///
/// Every received [`NetCommand`] runs in its own task; outcomes come back
/// as [`NetEvent`]s. [`NetCommand::Shutdown`] stops accepting commands.
#[must_use]
pub fn spawn_net<G: Gateway>(
    context: NetContext<G>,
    channel_capacity: usize,
) -> (mpsc::Sender<NetCommand>, mpsc::Receiver<NetEvent>) {
    let (cmd_tx, cmd_rx) = mpsc::channel::<NetCommand>(channel_capacity);
    let (evt_tx, evt_rx) = mpsc::channel::<NetEvent>(channel_capacity);
    let context = Arc::new(context);
    tokio::spawn(async move {
        command_handler(context, cmd_rx, evt_tx).await;
    });
    (cmd_tx, evt_rx)
}

/// Undo what a command that never reached the network tasks already
/// changed locally. A move's optimistic placement is rolled back.
///
/// Returns `true` if something was rolled back.
pub fn abandon_command(board: &BoardStore, cmd: NetCommand) -> bool {
    let NetCommand::ConfirmMove(pending) = cmd else {
        return false;
    };
    match board.settle_move(pending, Err(ApiError::Offline)) {
        Err(e) => {
            tracing::warn!(error = %e, "move not sent, rolled back");
            true
        }
        Ok(()) => false,
    }
}

/// Background task: dispatch commands from the TUI main loop.
async fn command_handler<G: Gateway>(
    context: Arc<NetContext<G>>,
    mut cmd_rx: mpsc::Receiver<NetCommand>,
    evt_tx: mpsc::Sender<NetEvent>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        if matches!(cmd, NetCommand::Shutdown) {
            tracing::info!("net command handler shutting down");
            break;
        }
        let context = Arc::clone(&context);
        let evt_tx = evt_tx.clone();
        tokio::spawn(async move {
            for event in execute(&context, cmd).await {
                if evt_tx.send(event).await.is_err() {
                    // TUI dropped; nothing left to notify.
                    break;
                }
            }
        });
    }
}

/// Run one command to completion and describe the outcome.
async fn execute<G: Gateway>(context: &NetContext<G>, cmd: NetCommand) -> Vec<NetEvent> {
    let api = context.gateway();
    match cmd {
        NetCommand::Refresh => {
            let mut events = Vec::new();
            if let Some(board) = context.board.upgrade() {
                events.push(match board.load(api).await {
                    Ok(()) => NetEvent::BoardLoaded,
                    Err(e) => NetEvent::BoardLoadFailed(remote_message(&e)),
                });
            }
            // Failures are recorded in the cache and shown by its view.
            let _ = context.notifications.refresh(context.api.as_ref()).await;
            events
        }
        NetCommand::ConfirmMove(pending) => {
            let task_id = pending.command().task_id.clone();
            let outcome = BoardStore::confirm(api, &pending).await;
            match BoardStore::settle_detached(&context.board, pending, outcome) {
                Some(Err(e)) => {
                    let mut events = vec![NetEvent::MoveRolledBack {
                        task_id,
                        reason: remote_message(&e),
                    }];
                    events.extend(expire_session(context, &e));
                    events
                }
                Some(Ok(())) | None => Vec::new(),
            }
        }
        cmd @ (NetCommand::CreateTask(_)
        | NetCommand::UpdateTask { .. }
        | NetCommand::DeleteTask(_)
        | NetCommand::AddComment { .. }
        | NetCommand::RenameColumns(_)) => {
            let Some(board) = context.board.upgrade() else {
                return Vec::new();
            };
            match board_command(&board, api, cmd).await {
                Ok(event) => event.into_iter().collect(),
                Err(e) => {
                    tracing::warn!(error = %e, "board command failed");
                    let mut events = vec![NetEvent::Error(remote_message(&e))];
                    events.extend(expire_session(context, &e));
                    events
                }
            }
        }
        NetCommand::MarkRead(id) => {
            context
                .notifications
                .mark_as_read(context.api.as_ref(), &id)
                .await;
            Vec::new()
        }
        NetCommand::MarkAllRead => {
            let reverted = context
                .notifications
                .mark_all_as_read(context.api.as_ref())
                .await;
            if reverted > 0 {
                tracing::warn!(reverted, "some notifications could not be marked read");
            }
            Vec::new()
        }
        NetCommand::Login(request) => sign_in(context, api.login(&request).await),
        NetCommand::Register(request) => sign_in(context, api.register(&request).await),
        NetCommand::FetchCurrentUser => account(context, api.current_user().await, NetEvent::SignedIn),
        NetCommand::ListUsers => account(context, api.list_users().await, NetEvent::Users),
        NetCommand::SetRole { user_id, role } => account(
            context,
            api.update_user_role(&user_id, role).await,
            NetEvent::UserUpdated,
        ),
        NetCommand::DeleteUser(user_id) => account(context, api.delete_user(&user_id).await, |()| {
            NetEvent::UserDeleted(user_id.clone())
        }),
        NetCommand::Shutdown => Vec::new(),
    }
}

/// Run a board command against a live store.
async fn board_command<A: BoardApi>(
    board: &BoardStore,
    api: &A,
    cmd: NetCommand,
) -> Result<Option<NetEvent>, BoardError> {
    let event = match cmd {
        NetCommand::CreateTask(request) => NetEvent::TaskCreated(board.create_task(api, &request).await?),
        NetCommand::UpdateTask { task_id, patch } => {
            board.update_task(api, &task_id, &patch).await?;
            NetEvent::TaskUpdated(task_id)
        }
        NetCommand::DeleteTask(task_id) => {
            board.delete_task(api, &task_id).await?;
            NetEvent::TaskDeleted(task_id)
        }
        NetCommand::AddComment { task_id, content } => {
            board.add_comment(api, &task_id, &content).await?;
            NetEvent::CommentAdded(task_id)
        }
        NetCommand::RenameColumns(ordered) => {
            board.rename_columns(api, &ordered).await?;
            NetEvent::ColumnsSaved
        }
        _ => return Ok(None),
    };
    Ok(Some(event))
}

/// Store the token from a login or registration.
fn sign_in<G>(context: &NetContext<G>, result: Result<AuthResponse, ApiError>) -> Vec<NetEvent> {
    match result {
        Ok(auth) => {
            if let Err(e) = context.session.set_token(Some(auth.token)) {
                tracing::warn!(error = %e, "could not persist session token");
            }
            tracing::info!(user = %auth.user.username, "signed in");
            vec![NetEvent::SignedIn(auth.user)]
        }
        Err(e) => vec![NetEvent::Error(format!("Sign-in failed: {}", api_message(&e)))],
    }
}

fn account<G, T>(
    context: &NetContext<G>,
    result: Result<T, ApiError>,
    on_success: impl FnOnce(T) -> NetEvent,
) -> Vec<NetEvent> {
    match result {
        Ok(value) => vec![on_success(value)],
        Err(e) => {
            tracing::warn!(error = %e, "account command failed");
            let mut events = vec![NetEvent::Error(api_message(&e))];
            if e.is_unauthorized() {
                events.extend(clear_session(context));
            }
            events
        }
    }
}

/// A 401 means the stored token is no longer valid.
fn expire_session<G>(context: &NetContext<G>, error: &BoardError) -> Option<NetEvent> {
    let api_error = match error {
        BoardError::Confirm(e) | BoardError::Remote(e) => e,
        _ => return None,
    };
    if api_error.is_unauthorized() {
        clear_session(context)
    } else {
        None
    }
}

fn clear_session<G>(context: &NetContext<G>) -> Option<NetEvent> {
    context.session.is_signed_in().then(|| {
        if let Err(e) = context.session.set_token(None) {
            tracing::warn!(error = %e, "could not clear session token");
        }
        tracing::info!("session expired");
        NetEvent::SignedOut
    })
}

/// User-facing text for a board error.
fn remote_message(error: &BoardError) -> String {
    match error {
        BoardError::Confirm(e) | BoardError::Remote(e) => api_message(e),
        other => other.to_string(),
    }
}

/// User-facing text for a gateway error.
fn api_message(error: &ApiError) -> String {
    match error {
        ApiError::Status { status: 401, .. } => "Please sign in (:login <email> <password>)".to_string(),
        ApiError::Status { status: 403, .. } => "Not allowed for your role".to_string(),
        ApiError::Status { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
