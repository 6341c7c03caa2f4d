//! Integration tests for optimistic board updates against the in-memory
//! gateway: publish-before-confirm, rollback to the exact snapshot, and
//! server-first column edits.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use taskboard::board::{BoardError, BoardStore, LoadState, MoveCommand};
use taskboard::gateway::ApiError;
use taskboard::gateway::memory::MemoryGateway;
use taskboard_proto::task::{CreateTaskRequest, UpdateTaskRequest};
use taskboard_proto::{ColumnId, Priority, TaskId};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn mv(task: &str, src: &str, si: usize, dst: &str, di: usize) -> MoveCommand {
    MoveCommand {
        task_id: TaskId::from(task),
        source_column: ColumnId::from(src),
        source_index: si,
        dest_column: ColumnId::from(dst),
        dest_index: di,
    }
}

fn column(store: &BoardStore, id: &str) -> Vec<String> {
    store.snapshot().columns[&ColumnId::from(id)]
        .task_ids
        .iter()
        .map(ToString::to_string)
        .collect()
}

async fn loaded(api: &MemoryGateway) -> BoardStore {
    let store = BoardStore::new();
    store.load(api).await.unwrap();
    store
}

// ===========================================================================
// Loading
// ===========================================================================

#[tokio::test]
async fn load_replaces_board_and_keeps_it_on_failure() {
    let api = MemoryGateway::demo();
    let store = loaded(&api).await;
    assert_eq!(store.load_state(), LoadState::Ready);
    let server_board = api.board();
    assert_eq!(*store.snapshot(), server_board);

    api.set_offline(true);
    let err = store.load(&api).await.unwrap_err();
    assert!(matches!(err, BoardError::Remote(ApiError::Offline)));
    assert!(matches!(store.load_state(), LoadState::Failed(_)));
    assert_eq!(*store.snapshot(), server_board);
}

// ===========================================================================
// Moves
// ===========================================================================

#[tokio::test]
async fn cross_column_move_is_confirmed_with_state_patch() {
    let api = MemoryGateway::demo();
    let store = loaded(&api).await;

    store
        .move_task(&api, mv("t1", "todo", 0, "review", 1))
        .await
        .unwrap();

    assert_eq!(column(&store, "todo"), ["t2", "t3"]);
    assert_eq!(column(&store, "review"), ["t5", "t1"]);
    assert_eq!(store.snapshot().tasks[&TaskId::from("t1")].state, ColumnId::from("review"));
    assert!(api.requests().contains(&"PATCH /tasks/t1".to_string()));
    assert_eq!(api.board().tasks[&TaskId::from("t1")].state, ColumnId::from("review"));
    store.snapshot().check_consistency().unwrap();
}

#[tokio::test]
async fn same_column_move_sends_nothing() {
    let api = MemoryGateway::demo();
    let store = loaded(&api).await;
    let before = api.requests().len();

    store.move_task(&api, mv("t1", "todo", 0, "todo", 2)).await.unwrap();

    assert_eq!(column(&store, "todo"), ["t2", "t3", "t1"]);
    assert_eq!(api.requests().len(), before);
}

#[tokio::test]
async fn rejected_move_restores_exact_snapshot() {
    let api = MemoryGateway::demo();
    let store = loaded(&api).await;
    let before = store.snapshot();
    api.fail_task_updates(TaskId::from("t2"));

    let err = store
        .move_task(&api, mv("t2", "todo", 1, "done", 0))
        .await
        .unwrap_err();

    assert!(matches!(err, BoardError::Confirm(ApiError::Status { status: 500, .. })));
    assert_eq!(*store.snapshot(), *before);
}

#[tokio::test]
async fn invalid_move_leaves_board_untouched() {
    let api = MemoryGateway::demo();
    let store = loaded(&api).await;
    let before = store.snapshot();

    let err = store
        .move_task(&api, mv("t1", "todo", 1, "done", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::TaskNotAtIndex { .. }));

    let err = store
        .move_task(&api, mv("t1", "todo", 0, "nowhere", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::UnknownColumn(_)));

    let err = store
        .move_task(&api, mv("t1", "todo", 0, "done", 5))
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::IndexOutOfRange { .. }));

    assert_eq!(*store.snapshot(), *before);
    assert!(!api.requests().iter().any(|r| r.starts_with("PATCH")));
}

#[tokio::test]
async fn optimistic_board_is_visible_while_confirmation_is_pending() {
    let api = Arc::new(MemoryGateway::demo());
    let store = Arc::new(loaded(&api).await);
    api.set_latency(Duration::from_millis(100));

    let pending = store
        .begin_move(mv("t4", "in-progress", 0, "done", 0))
        .unwrap()
        .expect("move is not a no-op");

    // Published before the request is even sent.
    assert_eq!(column(&store, "done"), ["t4", "t6"]);

    let confirm = {
        let api = Arc::clone(&api);
        let store = Arc::downgrade(&store);
        tokio::spawn(async move {
            let outcome = BoardStore::confirm(api.as_ref(), &pending).await;
            BoardStore::settle_detached(&store, pending, outcome)
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(column(&store, "done"), ["t4", "t6"]);

    let settled = confirm.await.unwrap();
    assert!(matches!(settled, Some(Ok(()))));
    assert_eq!(column(&store, "done"), ["t4", "t6"]);
}

#[tokio::test]
async fn confirmation_after_store_dropped_is_discarded() {
    let api = MemoryGateway::demo();
    api.fail_task_updates(TaskId::from("t1"));
    let store = Arc::new(loaded(&api).await);
    let pending = store
        .begin_move(mv("t1", "todo", 0, "done", 0))
        .unwrap()
        .unwrap();
    let weak = Arc::downgrade(&store);
    drop(store);

    let outcome = BoardStore::confirm(&api, &pending).await;
    assert!(outcome.is_err());
    assert!(BoardStore::settle_detached(&weak, pending, outcome).is_none());
}

// ===========================================================================
// Task edits
// ===========================================================================

#[tokio::test]
async fn create_edit_comment_delete() {
    let api = MemoryGateway::demo();
    let store = loaded(&api).await;

    let id = store
        .create_task(
            &api,
            &CreateTaskRequest {
                title: "Plan retro".to_string(),
                description: String::new(),
                priority: Some(Priority::Low),
                assignee: None,
                state: ColumnId::from("review"),
            },
        )
        .await
        .unwrap();
    assert_eq!(column(&store, "review").last(), Some(&id.to_string()));

    store
        .update_task(
            &api,
            &id,
            &UpdateTaskRequest {
                title: Some("Plan the retro".to_string()),
                priority: Some(1),
                ..UpdateTaskRequest::default()
            },
        )
        .await
        .unwrap();
    let task = store.snapshot().tasks[&id].clone();
    assert_eq!(task.title, "Plan the retro");
    assert_eq!(task.priority, Some(Priority::High));

    store.add_comment(&api, &id, "  bring snacks ").await.unwrap();
    assert_eq!(store.snapshot().tasks[&id].comments[0].content, "bring snacks");

    store.delete_task(&api, &id).await.unwrap();
    assert!(!store.snapshot().tasks.contains_key(&id));
    assert!(!column(&store, "review").contains(&id.to_string()));
    store.snapshot().check_consistency().unwrap();
}

#[tokio::test]
async fn blank_title_never_reaches_server() {
    let api = MemoryGateway::demo();
    let store = loaded(&api).await;
    let before = api.requests().len();

    let err = store
        .create_task(
            &api,
            &CreateTaskRequest {
                title: "   ".to_string(),
                description: String::new(),
                priority: None,
                assignee: None,
                state: ColumnId::from("todo"),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::Validation(_)));
    assert_eq!(api.requests().len(), before);
}

// ===========================================================================
// Columns
// ===========================================================================

#[tokio::test]
async fn rename_columns_updates_after_server_accepts() {
    let api = MemoryGateway::demo();
    let store = loaded(&api).await;
    let ordered = vec![
        (ColumnId::from("done"), "Shipped".to_string()),
        (ColumnId::from("todo"), "Backlog".to_string()),
        (ColumnId::from("in-progress"), "Doing".to_string()),
        (ColumnId::from("review"), "Review".to_string()),
    ];

    store.rename_columns(&api, &ordered).await.unwrap();

    let board = store.snapshot();
    let titles: Vec<&str> = board.ordered_columns().iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, ["Shipped", "Backlog", "Doing", "Review"]);
    assert_eq!(api.board().column_order, board.column_order);
}

#[tokio::test]
async fn rename_columns_failure_changes_nothing() {
    let api = MemoryGateway::demo();
    let store = loaded(&api).await;
    let before = store.snapshot();

    // Missing a column.
    let partial = vec![(ColumnId::from("todo"), "Backlog".to_string())];
    assert!(matches!(
        store.rename_columns(&api, &partial).await,
        Err(BoardError::ColumnSetMismatch)
    ));

    api.set_offline(true);
    let full: Vec<(ColumnId, String)> = before
        .ordered_columns()
        .iter()
        .map(|c| (c.id.clone(), format!("{}!", c.title)))
        .collect();
    assert!(matches!(
        store.rename_columns(&api, &full).await,
        Err(BoardError::Remote(ApiError::Offline))
    ));
    assert_eq!(*store.snapshot(), *before);
}
