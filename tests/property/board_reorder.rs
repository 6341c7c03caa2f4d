//! Property tests for the column reorder algorithm and the store's
//! optimistic rollback.
//!
//! 1. Any valid move keeps the board consistent and lands the task at the
//!    requested slot.
//! 2. Columns not involved in a move keep their exact order.
//! 3. A same-column move only permutes that column.
//! 4. A rejected move restores the pre-move board exactly.
//! 5. Out-of-range drops are refused without touching the board.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashSet;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use taskboard::board::{BoardError, BoardStore, MoveCommand, apply_move};
use taskboard::gateway::ApiError;
use taskboard_proto::{Attachments, Board, Column, ColumnId, Task, TaskId};

// --- Board generation ---

/// Builds a consistent board with one column per entry of `sizes`.
fn board_with(sizes: &[usize]) -> Board {
    let created = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    let mut board = Board::default();
    for (c, size) in sizes.iter().enumerate() {
        let column_id = ColumnId::new(format!("col-{c}"));
        let task_ids: Vec<TaskId> = (0..*size)
            .map(|t| TaskId::new(format!("task-{c}-{t}")))
            .collect();
        for id in &task_ids {
            board.tasks.insert(
                id.clone(),
                Task {
                    id: id.clone(),
                    title: format!("Card {id}"),
                    description: String::new(),
                    priority: None,
                    assignee: None,
                    state: column_id.clone(),
                    attachments: Attachments::default(),
                    comments: Vec::new(),
                    created_at: created,
                    updated_at: created,
                },
            );
        }
        board.column_order.push(column_id.clone());
        board.columns.insert(
            column_id.clone(),
            Column {
                id: column_id,
                title: format!("Column {c}"),
                task_ids,
            },
        );
    }
    board
}

/// Raw material for a move: column sizes plus four selectors that are
/// reduced modulo the valid ranges.
fn arb_layout() -> impl Strategy<Value = (Vec<usize>, usize, usize, usize, usize)> {
    (
        prop::collection::vec(0usize..6, 1..5),
        any::<usize>(),
        any::<usize>(),
        any::<usize>(),
        any::<usize>(),
    )
}

/// Turns the selectors into a valid move, or `None` if the board is empty.
fn pick_move(board: &Board, picks: (usize, usize, usize, usize)) -> Option<MoveCommand> {
    let (src_pick, idx_pick, dst_pick, dest_idx_pick) = picks;
    let non_empty: Vec<&ColumnId> = board
        .column_order
        .iter()
        .filter(|id| !board.columns[*id].task_ids.is_empty())
        .collect();
    if non_empty.is_empty() {
        return None;
    }
    let source_column = non_empty[src_pick % non_empty.len()].clone();
    let source = &board.columns[&source_column].task_ids;
    let source_index = idx_pick % source.len();
    let dest_column = board.column_order[dst_pick % board.column_order.len()].clone();
    let dest_len = board.columns[&dest_column].task_ids.len();
    let max = if dest_column == source_column {
        dest_len - 1
    } else {
        dest_len
    };
    Some(MoveCommand {
        task_id: source[source_index].clone(),
        source_column,
        source_index,
        dest_column,
        dest_index: dest_idx_pick % (max + 1),
    })
}

fn ids(board: &Board, column: &ColumnId) -> Vec<TaskId> {
    board.columns[column].task_ids.clone()
}

// --- Properties ---

proptest! {
    #[test]
    fn valid_move_keeps_board_consistent((sizes, a, b, c, d) in arb_layout()) {
        let before = board_with(&sizes);
        let Some(command) = pick_move(&before, (a, b, c, d)) else {
            return Ok(());
        };
        let mut after = before.clone();
        let changed = apply_move(&mut after, &command).unwrap();

        prop_assert_eq!(changed, !command.is_noop());
        prop_assert!(after.check_consistency().is_ok());
        prop_assert_eq!(after.tasks.len(), before.tasks.len());
        prop_assert_eq!(
            &after.columns[&command.dest_column].task_ids[command.dest_index],
            &command.task_id
        );
        prop_assert_eq!(&after.tasks[&command.task_id].state, &command.dest_column);
    }

    #[test]
    fn uninvolved_columns_keep_their_order((sizes, a, b, c, d) in arb_layout()) {
        let before = board_with(&sizes);
        let Some(command) = pick_move(&before, (a, b, c, d)) else {
            return Ok(());
        };
        let mut after = before.clone();
        apply_move(&mut after, &command).unwrap();

        for column in &before.column_order {
            if *column != command.source_column && *column != command.dest_column {
                prop_assert_eq!(ids(&after, column), ids(&before, column));
            }
        }
        // The rest of the source column keeps its relative order.
        let rest = |board: &Board| -> Vec<TaskId> {
            ids(board, &command.source_column)
                .into_iter()
                .filter(|id| *id != command.task_id)
                .collect()
        };
        prop_assert_eq!(rest(&after), rest(&before));
    }

    #[test]
    fn same_column_move_is_a_permutation((sizes, a, b, c, d) in arb_layout()) {
        let before = board_with(&sizes);
        let Some(mut command) = pick_move(&before, (a, b, c, d)) else {
            return Ok(());
        };
        let len = before.columns[&command.source_column].task_ids.len();
        command.dest_column = command.source_column.clone();
        command.dest_index = d % len;

        let mut after = before.clone();
        apply_move(&mut after, &command).unwrap();

        let old: HashSet<TaskId> = ids(&before, &command.source_column).into_iter().collect();
        let new: HashSet<TaskId> = ids(&after, &command.source_column).into_iter().collect();
        prop_assert_eq!(old, new);
        prop_assert_eq!(ids(&after, &command.source_column).len(), len);
        prop_assert_eq!(&after.tasks, &before.tasks);
    }

    #[test]
    fn rejected_move_restores_snapshot((sizes, a, b, c, d) in arb_layout()) {
        let before = board_with(&sizes);
        let Some(command) = pick_move(&before, (a, b, c, d)) else {
            return Ok(());
        };
        let store = BoardStore::with_board(before.clone());
        let Some(pending) = store.begin_move(command).unwrap() else {
            prop_assert_eq!(&*store.snapshot(), &before);
            return Ok(());
        };
        let result = store.settle_move(pending, Err(ApiError::Offline));

        prop_assert!(matches!(result, Err(BoardError::Confirm(ApiError::Offline))));
        prop_assert_eq!(&*store.snapshot(), &before);
    }

    #[test]
    fn out_of_range_drop_is_refused((sizes, a, b, c, d) in arb_layout(), overshoot in 1usize..4) {
        let before = board_with(&sizes);
        let Some(mut command) = pick_move(&before, (a, b, c, d)) else {
            return Ok(());
        };
        let dest_len = before.columns[&command.dest_column].task_ids.len();
        let max = if command.is_cross_column() { dest_len } else { dest_len - 1 };
        command.dest_index = max + overshoot;

        let mut after = before.clone();
        let is_out_of_range = matches!(
            apply_move(&mut after, &command),
            Err(BoardError::IndexOutOfRange { .. })
        );
        prop_assert!(is_out_of_range);
        prop_assert_eq!(after, before);
    }
}
