//! The column reorder algorithm.
//!
//! Pure functions over a [`Board`]; the store wraps them in its
//! copy-on-write snapshot handling.

use taskboard_proto::{Board, ColumnId, TaskId};

use super::BoardError;

/// A drop gesture: move `task_id` from `source_index` of `source_column`
/// to `dest_index` of `dest_column`.
///
/// For a same-column move `dest_index` is measured after the task has been
/// removed from its original slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoveCommand {
    /// Task being dragged.
    pub task_id: TaskId,
    /// Column the drag started in.
    pub source_column: ColumnId,
    /// Position the drag started at.
    pub source_index: usize,
    /// Column the task was dropped on.
    pub dest_column: ColumnId,
    /// Position the task was dropped at.
    pub dest_index: usize,
}

impl MoveCommand {
    /// Returns `true` if source and destination columns differ.
    #[must_use]
    pub fn is_cross_column(&self) -> bool {
        self.source_column != self.dest_column
    }

    /// Returns `true` if the drop position equals the start position.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.is_cross_column() && self.source_index == self.dest_index
    }
}

/// Checks every precondition of `command` against `board` without
/// modifying it.
///
/// # Errors
///
/// - [`BoardError::UnknownColumn`] if either column is missing.
/// - [`BoardError::IndexOutOfRange`] if `source_index` is past the end of
///   the source column, or `dest_index` is past the end of the destination
///   (after removal, for a same-column move).
/// - [`BoardError::TaskNotAtIndex`] if another task occupies `source_index`.
/// - [`BoardError::UnknownTask`] if the listed task has no entry in `tasks`.
pub fn validate_move(board: &Board, command: &MoveCommand) -> Result<(), BoardError> {
    let source = board
        .columns
        .get(&command.source_column)
        .ok_or_else(|| BoardError::UnknownColumn(command.source_column.clone()))?;
    let dest = board
        .columns
        .get(&command.dest_column)
        .ok_or_else(|| BoardError::UnknownColumn(command.dest_column.clone()))?;

    match source.task_ids.get(command.source_index) {
        None => {
            return Err(BoardError::IndexOutOfRange {
                column: command.source_column.clone(),
                index: command.source_index,
                max: source.task_ids.len().saturating_sub(1),
            });
        }
        Some(id) if *id != command.task_id => {
            return Err(BoardError::TaskNotAtIndex {
                task: command.task_id.clone(),
                column: command.source_column.clone(),
                index: command.source_index,
            });
        }
        Some(_) => {}
    }

    if !board.tasks.contains_key(&command.task_id) {
        return Err(BoardError::UnknownTask(command.task_id.clone()));
    }

    let max = if command.is_cross_column() {
        dest.task_ids.len()
    } else {
        dest.task_ids.len() - 1
    };
    if command.dest_index > max {
        return Err(BoardError::IndexOutOfRange {
            column: command.dest_column.clone(),
            index: command.dest_index,
            max,
        });
    }
    Ok(())
}

/// Applies `command` to `board` in place.
///
/// Returns `Ok(false)` for a no-op (same column, same index), leaving the
/// board untouched. On error the board is also untouched.
///
/// # Errors
///
/// See [`validate_move`].
pub fn apply_move(board: &mut Board, command: &MoveCommand) -> Result<bool, BoardError> {
    validate_move(board, command)?;
    if command.is_noop() {
        return Ok(false);
    }

    if let Some(source) = board.columns.get_mut(&command.source_column) {
        source.task_ids.remove(command.source_index);
    }
    if let Some(dest) = board.columns.get_mut(&command.dest_column) {
        dest.task_ids
            .insert(command.dest_index, command.task_id.clone());
    }
    if command.is_cross_column()
        && let Some(task) = board.tasks.get_mut(&command.task_id)
    {
        task.state = command.dest_column.clone();
    }
    Ok(true)
}
