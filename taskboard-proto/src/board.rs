//! The normalized board document returned by `GET /board`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{ColumnId, TaskId};
use crate::task::Task;
use crate::validate::{ValidationError, require_text};

/// Maximum allowed column title length in characters.
pub const MAX_COLUMN_TITLE_LENGTH: usize = 64;

/// A named, ordered bucket of task ids (a workflow stage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Column identifier; tasks in this column carry it as their `state`.
    pub id: ColumnId,
    /// Display title.
    pub title: String,
    /// Authoritative intra-column order.
    #[serde(default)]
    pub task_ids: Vec<TaskId>,
}

/// Whole-board snapshot: tasks and columns keyed by id plus column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// All tasks on the board.
    #[serde(default)]
    pub tasks: HashMap<TaskId, Task>,
    /// All columns on the board.
    #[serde(default)]
    pub columns: HashMap<ColumnId, Column>,
    /// Left-to-right display order of columns.
    #[serde(default)]
    pub column_order: Vec<ColumnId>,
}

/// A broken link between the board's maps and lists.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    /// `column_order` names a column that does not exist.
    #[error("column order references unknown column {0}")]
    UnknownOrderedColumn(ColumnId),
    /// `column_order` lists the same column twice.
    #[error("column {0} appears more than once in column order")]
    DuplicateOrderedColumn(ColumnId),
    /// A column exists but is missing from `column_order`.
    #[error("column {0} is missing from column order")]
    UnorderedColumn(ColumnId),
    /// A column's key differs from its `id` field.
    #[error("column stored under {key} has id {id}")]
    ColumnKeyMismatch {
        /// Map key.
        key: ColumnId,
        /// Embedded id.
        id: ColumnId,
    },
    /// A column lists a task that does not exist.
    #[error("column {column} lists unknown task {task}")]
    UnknownTask {
        /// Listing column.
        column: ColumnId,
        /// Missing task.
        task: TaskId,
    },
    /// A task is listed by more than one column (or twice by one).
    #[error("task {0} is listed more than once")]
    DuplicateTask(TaskId),
    /// A task's `state` does not name the column that lists it.
    #[error("task {task} has state {state} but is listed in {column}")]
    StateMismatch {
        /// The task.
        task: TaskId,
        /// Its `state` field.
        state: ColumnId,
        /// Column that lists it.
        column: ColumnId,
    },
}

impl Board {
    /// Columns in display order. Ids without a column are skipped.
    #[must_use]
    pub fn ordered_columns(&self) -> Vec<&Column> {
        self.column_order
            .iter()
            .filter_map(|id| self.columns.get(id))
            .collect()
    }

    /// Tasks of a column in display order. Unknown ids are skipped.
    #[must_use]
    pub fn tasks_in(&self, column_id: &ColumnId) -> Vec<&Task> {
        self.columns.get(column_id).map_or_else(Vec::new, |column| {
            column
                .task_ids
                .iter()
                .filter_map(|id| self.tasks.get(id))
                .collect()
        })
    }

    /// Locates a task: owning column id and index within it.
    #[must_use]
    pub fn position_of(&self, task_id: &TaskId) -> Option<(ColumnId, usize)> {
        self.column_order.iter().find_map(|column_id| {
            self.columns.get(column_id).and_then(|column| {
                column
                    .task_ids
                    .iter()
                    .position(|id| id == task_id)
                    .map(|index| (column_id.clone(), index))
            })
        })
    }

    /// Verifies the cross-references between `tasks`, `columns`, and
    /// `column_order`, returning the first violation found.
    ///
    /// Tasks that exist but are not listed by any column are tolerated:
    /// they are simply not rendered.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConsistencyError`] encountered.
    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        let mut seen_columns = HashSet::new();
        for id in &self.column_order {
            if !self.columns.contains_key(id) {
                return Err(ConsistencyError::UnknownOrderedColumn(id.clone()));
            }
            if !seen_columns.insert(id) {
                return Err(ConsistencyError::DuplicateOrderedColumn(id.clone()));
            }
        }

        let mut seen_tasks = HashSet::new();
        let mut keys: Vec<&ColumnId> = self.columns.keys().collect();
        keys.sort();
        for key in keys {
            let column = &self.columns[key];
            if !seen_columns.contains(key) {
                return Err(ConsistencyError::UnorderedColumn(key.clone()));
            }
            if column.id != *key {
                return Err(ConsistencyError::ColumnKeyMismatch {
                    key: key.clone(),
                    id: column.id.clone(),
                });
            }
            for task_id in &column.task_ids {
                let Some(task) = self.tasks.get(task_id) else {
                    return Err(ConsistencyError::UnknownTask {
                        column: key.clone(),
                        task: task_id.clone(),
                    });
                };
                if !seen_tasks.insert(task_id) {
                    return Err(ConsistencyError::DuplicateTask(task_id.clone()));
                }
                if task.state != *key {
                    return Err(ConsistencyError::StateMismatch {
                        task: task_id.clone(),
                        state: task.state.clone(),
                        column: key.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// One entry of the `PUT /board/columns` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnUpdate {
    /// Existing column id.
    pub id: ColumnId,
    /// New title.
    pub title: String,
    /// Zero-based display position.
    pub order: usize,
}

impl ColumnUpdate {
    /// Builds the request body from an ordered `(id, title)` list,
    /// numbering positions from zero.
    #[must_use]
    pub fn from_ordered(columns: &[(ColumnId, String)]) -> Vec<Self> {
        columns
            .iter()
            .enumerate()
            .map(|(order, (id, title))| Self {
                id: id.clone(),
                title: title.trim().to_string(),
                order,
            })
            .collect()
    }

    /// Validates the title.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for blank or oversized titles.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("column title", &self.title, MAX_COLUMN_TITLE_LENGTH)
    }
}
