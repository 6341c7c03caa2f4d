//! Copy-on-write board store with optimistic moves.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use taskboard_proto::task::{AddCommentRequest, CreateTaskRequest, UpdateTaskRequest};
use taskboard_proto::{Board, ColumnId, ColumnUpdate, Comment, Task, TaskId};

use super::BoardError;
use super::reorder::{MoveCommand, apply_move};
use crate::gateway::{ApiError, BoardApi};

/// Progress of the most recent board fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// A fetch is in flight.
    Loading,
    /// The board reflects a successful fetch.
    Ready,
    /// The last fetch failed; the previous board (if any) is still shown.
    Failed(String),
}

/// A move that has been applied locally and awaits confirmation.
///
/// Holds the board exactly as it was before the move so a failed
/// confirmation can restore it.
#[derive(Debug, Clone)]
#[must_use = "a pending move must be settled"]
pub struct PendingMove {
    snapshot: Arc<Board>,
    command: MoveCommand,
}

impl PendingMove {
    /// The applied command.
    pub const fn command(&self) -> &MoveCommand {
        &self.command
    }

    /// The board before the move.
    pub fn snapshot(&self) -> &Board {
        &self.snapshot
    }

    /// Cross-column moves change `state` and must be confirmed with the
    /// server. Same-column reorders have no server-side representation.
    #[must_use]
    pub fn needs_confirmation(&self) -> bool {
        self.command.is_cross_column()
    }
}

/// Owns the current board.
///
/// Readers get a cheap `Arc<Board>` snapshot; writers clone, mutate and
/// swap. The lock is never held across an await point.
#[derive(Debug, Default)]
pub struct BoardStore {
    board: RwLock<Arc<Board>>,
    load_state: RwLock<LoadState>,
}

impl BoardStore {
    /// An empty store in [`LoadState::Idle`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store already holding `board`, in [`LoadState::Ready`].
    #[must_use]
    pub fn with_board(board: Board) -> Self {
        Self {
            board: RwLock::new(Arc::new(board)),
            load_state: RwLock::new(LoadState::Ready),
        }
    }

    /// Current board snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Board> {
        Arc::clone(&self.board.read())
    }

    /// State of the most recent fetch.
    #[must_use]
    pub fn load_state(&self) -> LoadState {
        self.load_state.read().clone()
    }

    /// Applies `mutate` to a private copy of the board and publishes it if
    /// it succeeds.
    fn mutate<T>(
        &self,
        mutate: impl FnOnce(&mut Board) -> Result<T, BoardError>,
    ) -> Result<T, BoardError> {
        let mut guard = self.board.write();
        let mut next = Board::clone(&guard);
        let value = mutate(&mut next)?;
        *guard = Arc::new(next);
        Ok(value)
    }

    /// Fetches the whole board and replaces the local copy.
    ///
    /// On failure the previously loaded board is kept and the load state
    /// becomes [`LoadState::Failed`], so a retry can be offered.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Remote`] if the fetch fails.
    pub async fn load<A: BoardApi>(&self, api: &A) -> Result<(), BoardError> {
        *self.load_state.write() = LoadState::Loading;
        match api.fetch_board().await {
            Ok(board) => {
                if let Err(e) = board.check_consistency() {
                    tracing::warn!(error = %e, "server returned an inconsistent board");
                }
                tracing::info!(
                    columns = board.column_order.len(),
                    tasks = board.tasks.len(),
                    "board loaded"
                );
                *self.board.write() = Arc::new(board);
                *self.load_state.write() = LoadState::Ready;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "board fetch failed");
                *self.load_state.write() = LoadState::Failed(e.to_string());
                Err(BoardError::Remote(e))
            }
        }
    }

    /// Validates and applies `command`, publishing the new board before
    /// returning.
    ///
    /// Returns `Ok(None)` for a no-op drop.
    ///
    /// # Errors
    ///
    /// Returns the precondition errors of
    /// [`validate_move`](super::reorder::validate_move); the board is
    /// unchanged in that case.
    pub fn begin_move(&self, command: MoveCommand) -> Result<Option<PendingMove>, BoardError> {
        let mut guard = self.board.write();
        let snapshot = Arc::clone(&guard);
        let mut next = Board::clone(&snapshot);
        if !apply_move(&mut next, &command)? {
            return Ok(None);
        }
        *guard = Arc::new(next);
        tracing::debug!(
            task = %command.task_id,
            from = %command.source_column,
            to = %command.dest_column,
            index = command.dest_index,
            "move applied locally"
        );
        Ok(Some(PendingMove { snapshot, command }))
    }

    /// Completes a pending move. On `Err` the pre-move board is restored.
    ///
    /// Restoring replaces the whole board, so other changes applied while
    /// this move was pending are lost as well.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Confirm`] wrapping the confirmation error.
    pub fn settle_move(
        &self,
        pending: PendingMove,
        outcome: Result<(), ApiError>,
    ) -> Result<(), BoardError> {
        match outcome {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    task = %pending.command.task_id,
                    error = %e,
                    "move rejected, rolling back"
                );
                *self.board.write() = pending.snapshot;
                Err(BoardError::Confirm(e))
            }
        }
    }

    /// Settles a pending move against a store that may have been dropped
    /// while the confirmation was in flight. Returns `None` if it was.
    pub fn settle_detached(
        store: &Weak<Self>,
        pending: PendingMove,
        outcome: Result<(), ApiError>,
    ) -> Option<Result<(), BoardError>> {
        let Some(store) = store.upgrade() else {
            tracing::debug!(
                task = %pending.command.task_id,
                "board store gone, discarding move confirmation"
            );
            return None;
        };
        Some(store.settle_move(pending, outcome))
    }

    /// Sends the confirming request for a pending move.
    ///
    /// Same-column moves have nothing to confirm and succeed immediately.
    ///
    /// # Errors
    ///
    /// Returns the gateway error of the `PATCH /tasks/{id}` call.
    pub async fn confirm<A: BoardApi>(api: &A, pending: &PendingMove) -> Result<(), ApiError> {
        if !pending.needs_confirmation() {
            return Ok(());
        }
        let command = pending.command();
        api.update_task_state(&command.task_id, &command.dest_column)
            .await
    }

    /// Moves a task optimistically and confirms with the server, rolling
    /// back on failure.
    ///
    /// # Errors
    ///
    /// Precondition errors as for [`begin_move`](Self::begin_move), or
    /// [`BoardError::Confirm`] after a rollback.
    pub async fn move_task<A: BoardApi>(&self, api: &A, command: MoveCommand) -> Result<(), BoardError> {
        let Some(pending) = self.begin_move(command)? else {
            return Ok(());
        };
        let outcome = Self::confirm(api, &pending).await;
        self.settle_move(pending, outcome)
    }

    /// Adds a task to the end of its owning column. A task already on the
    /// board under another column leaves that column first.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::UnknownColumn`] if `task.state` names no column.
    pub fn insert_task(&self, task: Task) -> Result<(), BoardError> {
        self.mutate(|board| {
            if !board.columns.contains_key(&task.state) {
                return Err(BoardError::UnknownColumn(task.state.clone()));
            }
            if let Some(old) = board
                .tasks
                .get(&task.id)
                .map(|t| t.state.clone())
                .filter(|old| *old != task.state)
                && let Some(column) = board.columns.get_mut(&old)
            {
                column.task_ids.retain(|id| *id != task.id);
            }
            let Some(column) = board.columns.get_mut(&task.state) else {
                return Err(BoardError::UnknownColumn(task.state.clone()));
            };
            if !column.task_ids.contains(&task.id) {
                column.task_ids.push(task.id.clone());
            }
            board.tasks.insert(task.id.clone(), task);
            Ok(())
        })
    }

    /// Replaces a task with a server-returned copy. If its `state` changed,
    /// the task is moved to the end of the new column.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::UnknownTask`] or [`BoardError::UnknownColumn`].
    pub fn replace_task(&self, task: Task) -> Result<(), BoardError> {
        self.mutate(|board| {
            let previous = board
                .tasks
                .get(&task.id)
                .ok_or_else(|| BoardError::UnknownTask(task.id.clone()))?;
            if previous.state != task.state {
                if !board.columns.contains_key(&task.state) {
                    return Err(BoardError::UnknownColumn(task.state.clone()));
                }
                let old = previous.state.clone();
                if let Some(column) = board.columns.get_mut(&old) {
                    column.task_ids.retain(|id| *id != task.id);
                }
                if let Some(column) = board.columns.get_mut(&task.state) {
                    column.task_ids.push(task.id.clone());
                }
            }
            board.tasks.insert(task.id.clone(), task);
            Ok(())
        })
    }

    /// Removes a task and its column membership. Returns the removed task.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::UnknownTask`].
    pub fn remove_task(&self, task_id: &TaskId) -> Result<Task, BoardError> {
        self.mutate(|board| {
            let task = board
                .tasks
                .remove(task_id)
                .ok_or_else(|| BoardError::UnknownTask(task_id.clone()))?;
            for column in board.columns.values_mut() {
                column.task_ids.retain(|id| id != task_id);
            }
            Ok(task)
        })
    }

    /// Appends a server-returned comment to a task.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::UnknownTask`].
    pub fn append_comment(&self, task_id: &TaskId, comment: Comment) -> Result<(), BoardError> {
        self.mutate(|board| {
            let task = board
                .tasks
                .get_mut(task_id)
                .ok_or_else(|| BoardError::UnknownTask(task_id.clone()))?;
            task.comments.push(comment);
            Ok(())
        })
    }

    /// Renames and reorders columns.
    ///
    /// `ordered` lists every column exactly once, in the new display
    /// order, with its new title. The server is updated first; the local
    /// board only changes once it accepts.
    ///
    /// # Errors
    ///
    /// - [`BoardError::UnknownColumn`] / [`BoardError::ColumnSetMismatch`]
    ///   if the list does not cover the board's columns exactly.
    /// - [`BoardError::Validation`] for blank or oversized titles.
    /// - [`BoardError::Remote`] if the server rejects the update.
    pub async fn rename_columns<A: BoardApi>(
        &self,
        api: &A,
        ordered: &[(ColumnId, String)],
    ) -> Result<(), BoardError> {
        let updates = ColumnUpdate::from_ordered(ordered);
        {
            let board = self.snapshot();
            let mut seen = HashSet::new();
            for update in &updates {
                if !board.columns.contains_key(&update.id) {
                    return Err(BoardError::UnknownColumn(update.id.clone()));
                }
                if !seen.insert(&update.id) {
                    return Err(BoardError::ColumnSetMismatch);
                }
                update.validate()?;
            }
            if seen.len() != board.columns.len() {
                return Err(BoardError::ColumnSetMismatch);
            }
        }

        api.update_columns(&updates).await?;

        // The board may have been reloaded while the request was in flight.
        // Vanished columns are skipped; columns the update did not list keep
        // their relative order after the listed ones.
        self.mutate(|board| {
            let mut order = Vec::with_capacity(board.column_order.len());
            for update in &updates {
                if let Some(column) = board.columns.get_mut(&update.id) {
                    column.title.clone_from(&update.title);
                    order.push(update.id.clone());
                }
            }
            let listed: HashSet<&ColumnId> = updates.iter().map(|u| &u.id).collect();
            let unlisted: Vec<ColumnId> = board
                .column_order
                .iter()
                .filter(|id| !listed.contains(id))
                .cloned()
                .collect();
            if !unlisted.is_empty() {
                tracing::debug!(count = unlisted.len(), "columns added during rename kept at the end");
            }
            order.extend(unlisted);
            board.column_order = order;
            Ok(())
        })
    }

    /// Creates a task on the server and adds the returned task locally.
    ///
    /// # Errors
    ///
    /// [`BoardError::Validation`] before any request, [`BoardError::Remote`]
    /// if the server rejects it, or [`BoardError::UnknownColumn`] if the
    /// column vanished meanwhile.
    pub async fn create_task<A: BoardApi>(
        &self,
        api: &A,
        request: &CreateTaskRequest,
    ) -> Result<TaskId, BoardError> {
        request.validate()?;
        let task = api.create_task(request).await?;
        let id = task.id.clone();
        self.insert_task(task)?;
        Ok(id)
    }

    /// Patches a task on the server and applies the returned copy.
    ///
    /// # Errors
    ///
    /// As for [`create_task`](Self::create_task), plus
    /// [`BoardError::UnknownTask`].
    pub async fn update_task<A: BoardApi>(
        &self,
        api: &A,
        task_id: &TaskId,
        patch: &UpdateTaskRequest,
    ) -> Result<(), BoardError> {
        patch.validate()?;
        let task = api.update_task(task_id, patch).await?;
        self.replace_task(task)
    }

    /// Deletes a task on the server, then locally.
    ///
    /// # Errors
    ///
    /// [`BoardError::Remote`] or [`BoardError::UnknownTask`].
    pub async fn delete_task<A: BoardApi>(&self, api: &A, task_id: &TaskId) -> Result<(), BoardError> {
        api.delete_task(task_id).await?;
        self.remove_task(task_id).map(drop)
    }

    /// Posts a comment and appends the stored copy.
    ///
    /// # Errors
    ///
    /// [`BoardError::Validation`], [`BoardError::Remote`] or
    /// [`BoardError::UnknownTask`].
    pub async fn add_comment<A: BoardApi>(
        &self,
        api: &A,
        task_id: &TaskId,
        content: &str,
    ) -> Result<(), BoardError> {
        let request = AddCommentRequest {
            content: content.trim().to_string(),
        };
        request.validate()?;
        let comment = api.add_comment(task_id, &request).await?;
        self.append_comment(task_id, comment)
    }
}
