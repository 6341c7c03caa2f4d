//! Board state store.
//!
//! Holds the current [`Board`] as a copy-on-write snapshot and owns the
//! optimistic move protocol:
//!
//! 1. [`BoardStore::begin_move`] validates a [`MoveCommand`], publishes the
//!    reordered board and returns a [`PendingMove`] carrying the previous
//!    snapshot.
//! 2. The caller confirms the move with the server (cross-column moves only).
//! 3. [`BoardStore::settle_move`] restores the snapshot if confirmation failed.
//!
//! [`BoardStore::move_task`] runs all three steps in one call.
//!
//! [`Board`]: taskboard_proto::Board

pub mod reorder;
pub mod store;

use taskboard_proto::{ColumnId, TaskId, ValidationError};

use crate::gateway::ApiError;

pub use reorder::{MoveCommand, apply_move};
pub use store::{BoardStore, LoadState, PendingMove};

/// Errors that can occur when reading or mutating the board.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// The named column does not exist.
    #[error("unknown column {0}")]
    UnknownColumn(ColumnId),

    /// The named task does not exist.
    #[error("unknown task {0}")]
    UnknownTask(TaskId),

    /// The task is not where the caller said it was.
    #[error("task {task} is not at index {index} of column {column}")]
    TaskNotAtIndex {
        /// Task being moved.
        task: TaskId,
        /// Column that was searched.
        column: ColumnId,
        /// Index that was expected to hold the task.
        index: usize,
    },

    /// An index lies outside the valid range for the column.
    #[error("index {index} out of range for column {column} (max {max})")]
    IndexOutOfRange {
        /// Column the index refers to.
        column: ColumnId,
        /// The offending index.
        index: usize,
        /// Largest valid index.
        max: usize,
    },

    /// A column rename/reorder list did not name every column exactly once.
    #[error("column list must contain every column exactly once")]
    ColumnSetMismatch,

    /// The server rejected a move that had already been applied locally.
    /// The board has been rolled back when this is returned.
    #[error("move not confirmed by server (rolled back): {0}")]
    Confirm(#[source] ApiError),

    /// A remote call that precedes a local update failed; nothing changed.
    #[error("server request failed: {0}")]
    Remote(#[from] ApiError),

    /// Form input failed local validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
