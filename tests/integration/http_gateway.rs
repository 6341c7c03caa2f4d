//! Integration tests for the HTTP gateway against an in-process axum mock
//! of the board server: wire format, bearer handling, error mapping, and
//! the degraded notification layer.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
};
use parking_lot::Mutex;
use serde_json::{Value, json};

use taskboard::board::{BoardError, BoardStore, MoveCommand};
use taskboard::gateway::fallback::FallbackGateway;
use taskboard::gateway::http::HttpGateway;
use taskboard::gateway::{AccountApi, ApiError, BoardApi};
use taskboard::notifications::NotificationCache;
use taskboard::session::Session;
use taskboard_proto::auth::LoginRequest;
use taskboard_proto::task::CreateTaskRequest;
use taskboard_proto::{Attachments, ColumnId, Priority, Role, TaskId};

// ---------------------------------------------------------------------------
// Mock server
// ---------------------------------------------------------------------------

/// One request as seen by the mock.
#[derive(Debug, Clone)]
struct Seen {
    route: String,
    auth: Option<String>,
    body: Option<Value>,
}

#[derive(Clone, Default)]
struct Mock {
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Mock {
    fn record(&self, route: String, headers: &HeaderMap, body: Option<Value>) {
        let auth = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.seen.lock().push(Seen { route, auth, body });
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().clone()
    }
}

const CREATED: &str = "2024-05-01T10:00:00Z";

fn task_json(id: &str, state: &str) -> Value {
    json!({
        "id": id, "title": "Update design", "description": "", "priority": 1,
        "assignee": "ann", "state": state, "attachments": 2, "comments": [],
        "createdAt": CREATED, "updatedAt": CREATED
    })
}

fn board_json() -> Value {
    json!({
        "tasks": {
            "t1": task_json("t1", "todo"),
            "t2": {
                "id": "t2", "title": "Fix login redirect", "priority": 0, "assignee": "",
                "state": "todo", "attachments": [{"name": "trace.txt"}],
                "comments": [{"id": "c1", "content": "repro attached", "author": "bob", "createdAt": CREATED}],
                "createdAt": CREATED, "updatedAt": CREATED
            }
        },
        "columns": {
            "todo": {"id": "todo", "title": "To do", "taskIds": ["t1", "t2"]},
            "done": {"id": "done", "title": "Done", "taskIds": []}
        },
        "columnOrder": ["todo", "done"]
    })
}

async fn get_board(State(mock): State<Mock>, headers: HeaderMap) -> Json<Value> {
    mock.record("GET /board".to_string(), &headers, None);
    Json(board_json())
}

async fn patch_task(
    State(mock): State<Mock>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    mock.record(format!("PATCH /tasks/{id}"), &headers, Some(body.clone()));
    if id == "t2" {
        return (StatusCode::CONFLICT, Json(json!({"error": "task is locked"}))).into_response();
    }
    let state = body.get("state").and_then(Value::as_str).unwrap_or("todo");
    Json(task_json(&id, state)).into_response()
}

async fn create_task(State(mock): State<Mock>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    mock.record("POST /tasks".to_string(), &headers, Some(body.clone()));
    let state = body.get("state").and_then(Value::as_str).unwrap_or("todo");
    (StatusCode::CREATED, Json(task_json("t9", state))).into_response()
}

async fn put_columns(State(mock): State<Mock>, headers: HeaderMap, Json(body): Json<Value>) -> StatusCode {
    mock.record("PUT /board/columns".to_string(), &headers, Some(body));
    StatusCode::NO_CONTENT
}

async fn get_notifications(State(mock): State<Mock>, headers: HeaderMap) -> Response {
    mock.record("GET /notifications".to_string(), &headers, None);
    (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response()
}

async fn login(State(mock): State<Mock>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    mock.record("POST /auth/login".to_string(), &headers, Some(body.clone()));
    if body.get("password").and_then(Value::as_str) != Some("secret1") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "invalid credentials"}))).into_response();
    }
    Json(json!({
        "token": "tok-123",
        "user": {"id": "u1", "username": "admin", "email": "admin@example.com",
                 "role": "admin", "createdAt": CREATED}
    }))
    .into_response()
}

/// Starts the mock on an ephemeral port and returns its `/api` base URL.
async fn start_mock() -> (String, Mock) {
    let mock = Mock::default();
    let app = Router::new()
        .route("/api/board", get(get_board))
        .route("/api/tasks", post(create_task))
        .route("/api/tasks/{id}", patch(patch_task))
        .route("/api/board/columns", put(put_columns))
        .route("/api/notifications", get(get_notifications))
        .route("/api/auth/login", post(login))
        .with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/api"), mock)
}

fn gateway(base: &str, session: &Arc<Session>) -> HttpGateway {
    HttpGateway::new(base, Duration::from_secs(5), Arc::clone(session)).unwrap()
}

// ===========================================================================
// Wire format and auth
// ===========================================================================

#[tokio::test]
async fn fetch_board_decodes_wire_format_without_auth() {
    let (base, mock) = start_mock().await;
    let session = Arc::new(Session::in_memory());
    let board = gateway(&base, &session).fetch_board().await.unwrap();

    assert_eq!(board.column_order, [ColumnId::from("todo"), ColumnId::from("done")]);
    board.check_consistency().unwrap();
    let t1 = &board.tasks[&TaskId::from("t1")];
    assert_eq!(t1.priority, Some(Priority::High));
    assert_eq!(t1.attachments, Attachments::Count(2));
    let t2 = &board.tasks[&TaskId::from("t2")];
    assert_eq!(t2.priority, None);
    assert_eq!(t2.assignee, None);
    assert_eq!(t2.attachments.count(), 1);
    assert_eq!(t2.comments[0].author, "bob");

    let seen = mock.seen();
    assert_eq!(seen[0].route, "GET /board");
    assert_eq!(seen[0].auth, None);
}

#[tokio::test]
async fn login_token_is_sent_as_bearer_afterwards() {
    let (base, mock) = start_mock().await;
    let session = Arc::new(Session::in_memory());
    let api = gateway(&base, &session);

    let auth = api
        .login(&LoginRequest {
            email: "admin@example.com".to_string(),
            password: "secret1".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(auth.user.role, Role::Admin);
    session.set_token(Some(auth.token)).unwrap();

    api.fetch_board().await.unwrap();
    let seen = mock.seen();
    assert_eq!(seen[0].auth, None);
    assert_eq!(seen[1].auth.as_deref(), Some("Bearer tok-123"));
}

#[tokio::test]
async fn bad_credentials_map_to_unauthorized() {
    let (base, _mock) = start_mock().await;
    let session = Arc::new(Session::in_memory());
    let err = gateway(&base, &session)
        .login(&LoginRequest {
            email: "admin@example.com".to_string(),
            password: "nope".to_string(),
        })
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert!(matches!(err, ApiError::Status { ref message, .. } if message == "invalid credentials"));
}

#[tokio::test]
async fn invalid_request_is_never_sent() {
    let (base, mock) = start_mock().await;
    let session = Arc::new(Session::in_memory());
    let err = gateway(&base, &session)
        .create_task(&CreateTaskRequest {
            title: String::new(),
            description: String::new(),
            priority: None,
            assignee: None,
            state: ColumnId::from("todo"),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert!(mock.seen().is_empty());
}

// ===========================================================================
// Board store over HTTP
// ===========================================================================

#[tokio::test]
async fn move_sends_state_patch() {
    let (base, mock) = start_mock().await;
    let session = Arc::new(Session::in_memory());
    let api = gateway(&base, &session);
    let store = BoardStore::new();
    store.load(&api).await.unwrap();

    store
        .move_task(
            &api,
            MoveCommand {
                task_id: TaskId::from("t1"),
                source_column: ColumnId::from("todo"),
                source_index: 0,
                dest_column: ColumnId::from("done"),
                dest_index: 0,
            },
        )
        .await
        .unwrap();

    let seen = mock.seen();
    let patch = seen.iter().find(|s| s.route == "PATCH /tasks/t1").unwrap();
    assert_eq!(patch.body, Some(json!({"state": "done"})));
}

#[tokio::test]
async fn rejected_move_rolls_back_with_server_message() {
    let (base, _mock) = start_mock().await;
    let session = Arc::new(Session::in_memory());
    let api = gateway(&base, &session);
    let store = BoardStore::new();
    store.load(&api).await.unwrap();
    let before = store.snapshot();

    let err = store
        .move_task(
            &api,
            MoveCommand {
                task_id: TaskId::from("t2"),
                source_column: ColumnId::from("todo"),
                source_index: 1,
                dest_column: ColumnId::from("done"),
                dest_index: 0,
            },
        )
        .await
        .unwrap_err();

    match err {
        BoardError::Confirm(ApiError::Status { status, message }) => {
            assert_eq!(status, 409);
            assert_eq!(message, "task is locked");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(*store.snapshot(), *before);
}

#[tokio::test]
async fn column_update_body_lists_every_column_in_order() {
    let (base, mock) = start_mock().await;
    let session = Arc::new(Session::in_memory());
    let api = gateway(&base, &session);
    let store = BoardStore::new();
    store.load(&api).await.unwrap();

    store
        .rename_columns(
            &api,
            &[
                (ColumnId::from("done"), " Shipped ".to_string()),
                (ColumnId::from("todo"), "Backlog".to_string()),
            ],
        )
        .await
        .unwrap();

    let seen = mock.seen();
    let put = seen.iter().find(|s| s.route == "PUT /board/columns").unwrap();
    assert_eq!(
        put.body,
        Some(json!([
            {"id": "done", "title": "Shipped", "order": 0},
            {"id": "todo", "title": "Backlog", "order": 1}
        ]))
    );
    assert_eq!(store.snapshot().column_order, [ColumnId::from("done"), ColumnId::from("todo")]);
}

#[tokio::test]
async fn created_task_joins_its_column() {
    let (base, _mock) = start_mock().await;
    let session = Arc::new(Session::in_memory());
    let api = gateway(&base, &session);
    let store = BoardStore::new();
    store.load(&api).await.unwrap();

    let id = store
        .create_task(
            &api,
            &CreateTaskRequest {
                title: "Plan retro".to_string(),
                description: String::new(),
                priority: None,
                assignee: None,
                state: ColumnId::from("done"),
            },
        )
        .await
        .unwrap();
    assert_eq!(id, TaskId::from("t9"));
    assert_eq!(store.snapshot().columns[&ColumnId::from("done")].task_ids, [id]);
}

// ===========================================================================
// Failures
// ===========================================================================

#[tokio::test]
async fn notification_outage_is_hidden_only_when_fallback_enabled() {
    let (base, _mock) = start_mock().await;
    let session = Arc::new(Session::in_memory());
    let inner = Arc::new(gateway(&base, &session));

    let strict = FallbackGateway::new(Arc::clone(&inner), false);
    let cache = NotificationCache::new();
    let err = cache.refresh(&strict).await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(cache.snapshot().is_empty());

    let degraded = FallbackGateway::new(inner, true);
    cache.refresh(&degraded).await.unwrap();
    assert_eq!(cache.snapshot().len(), 3);
    assert_eq!(cache.unread_count(), 2);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let session = Arc::new(Session::in_memory());
    // Bind and drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = gateway(&format!("http://{addr}/api"), &session)
        .fetch_board()
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(err.status(), None);
}
