//! End-to-end HTTP tests against a throw-away SQLite file

use axum::Router;
use axum::body::Body;
use board_server::db::DbService;
use board_server::{AppState, Config, api};
use http::{Request, StatusCode};
use serde_json::{Value, json};
use shared::models::{BoardDetail, Task};
use shared::relay::{BoardEvent, BoardView, Reconcile, RelayMessage};
use tower::ServiceExt;

const OWNER: i64 = 100;

struct TestApp {
    _dir: tempfile::TempDir,
    state: AppState,
    app: Router,
}

async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("board.db");
    let db = DbService::new(path.to_str().unwrap()).await.unwrap();
    let state = AppState::with_pool(db.pool, Config::default());
    let app = api::create_router(state.clone());
    TestApp {
        _dir: dir,
        state,
        app,
    }
}

struct Reply {
    status: StatusCode,
    version: Option<i64>,
    body: Value,
}

impl TestApp {
    async fn call(&self, method: &str, uri: &str, user: Option<i64>, body: Option<Value>) -> Reply {
        self.call_as(method, uri, user, None, body).await
    }

    async fn call_as(
        &self,
        method: &str,
        uri: &str,
        user: Option<i64>,
        observer: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            req = req.header("X-User-Id", user.to_string());
        }
        if let Some(observer) = observer {
            req = req.header("X-Observer-Id", observer);
        }
        let req = match body {
            Some(body) => req
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let version = resp
            .headers()
            .get("x-board-version")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply {
            status,
            version,
            body,
        }
    }

    async fn create_board(&self) -> BoardDetail {
        let reply = self
            .call("POST", "/api/boards", Some(OWNER), Some(json!({ "title": "Sprint" })))
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        serde_json::from_value(reply.body).unwrap()
    }

    async fn create_task(&self, list_id: i64, title: &str) -> Task {
        let reply = self
            .call(
                "POST",
                "/api/tasks",
                Some(OWNER),
                Some(json!({ "title": title, "listId": list_id.to_string() })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        serde_json::from_value(reply.body).unwrap()
    }

    async fn list_order(&self, board_id: i64, list_id: i64) -> Vec<i64> {
        let reply = self
            .call("GET", &format!("/api/tasks/board/{board_id}"), Some(OWNER), None)
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        let tasks: Vec<Task> = serde_json::from_value(reply.body["tasks"].clone()).unwrap();
        tasks
            .into_iter()
            .filter(|t| t.list_id == list_id)
            .map(|t| t.id)
            .collect()
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let app = spawn_app().await;
    let reply = app.call("GET", "/api/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
    assert_eq!(reply.body["database"], "ok");
}

#[tokio::test]
async fn requests_without_identity_are_rejected() {
    let app = spawn_app().await;
    let reply = app.call("GET", "/api/boards", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["code"], 1001);
}

#[tokio::test]
async fn board_starts_with_default_lists() {
    let app = spawn_app().await;
    let board = app.create_board().await;
    let titles: Vec<&str> = board.lists.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["To Do", "In Progress", "Done"]);
    assert_eq!(board.members.len(), 1);

    let reply = app.call("GET", "/api/boards", Some(OWNER), None).await;
    assert_eq!(reply.body.as_array().unwrap().len(), 1);
    assert_eq!(reply.body[0]["list_count"], 3);

    // Invisible to anyone else
    let reply = app.call("GET", "/api/boards", Some(7), None).await;
    assert!(reply.body.as_array().unwrap().is_empty());
    let reply = app
        .call("GET", &format!("/api/boards/{}", board.board.id), Some(7), None)
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn move_reorders_and_reports_version() {
    let app = spawn_app().await;
    let board = app.create_board().await;
    let board_id = board.board.id;
    let todo = board.lists[0].id;

    let a = app.create_task(todo, "A").await;
    let b = app.create_task(todo, "B").await;
    let c = app.create_task(todo, "C").await;

    let reply = app
        .call(
            "PUT",
            &format!("/api/tasks/{}/move", a.id),
            Some(OWNER),
            Some(json!({ "targetCollectionId": todo.to_string(), "targetIndex": 2 })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.version, Some(4));
    assert_eq!(reply.body["id"], a.id);
    assert_eq!(app.list_order(board_id, todo).await, vec![b.id, c.id, a.id]);

    // Same place again: nothing to do, no version
    let reply = app
        .call(
            "POST",
            &format!("/api/tasks/{}/move", a.id),
            Some(OWNER),
            Some(json!({ "list_id": todo, "index": 2 })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.version, None);
}

#[tokio::test]
async fn move_validation_errors() {
    let app = spawn_app().await;
    let board = app.create_board().await;
    let todo = board.lists[0].id;
    let done = board.lists[2].id;
    let a = app.create_task(todo, "A").await;
    let uri = format!("/api/tasks/{}/move", a.id);

    let reply = app
        .call("POST", &uri, Some(OWNER), Some(json!({ "list_id": done, "index": -1 })))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["code"], 4202);

    let reply = app
        .call("POST", &uri, Some(OWNER), Some(json!({ "list_id": done, "index": 5 })))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app
        .call("POST", &uri, Some(OWNER), Some(json!({ "list_id": 1, "index": 0 })))
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["code"], 4101);

    let reply = app
        .call("POST", "/api/tasks/1/move", Some(OWNER), Some(json!({ "list_id": done, "index": 0 })))
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["code"], 4201);

    // List of another board
    let other = app.create_board().await;
    let reply = app
        .call(
            "POST",
            &uri,
            Some(OWNER),
            Some(json!({ "list_id": other.lists[0].id, "index": 0 })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["code"], 4102);
}

#[tokio::test]
async fn viewers_are_read_only_and_strangers_see_nothing() {
    let app = spawn_app().await;
    let board = app.create_board().await;
    let board_id = board.board.id;
    let todo = board.lists[0].id;
    let a = app.create_task(todo, "A").await;

    let reply = app
        .call(
            "POST",
            &format!("/api/boards/{board_id}/members"),
            Some(OWNER),
            Some(json!({ "userId": "5", "role": "VIEWER" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);

    let body = json!({ "list_id": board.lists[1].id, "index": 0 });
    let uri = format!("/api/tasks/{}/move", a.id);

    let reply = app.call("POST", &uri, Some(5), Some(body.clone())).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body["code"], 2101);

    let reply = app.call("POST", &uri, Some(6), Some(body)).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["code"], 2102);

    // The viewer can still read the board
    let reply = app
        .call("GET", &format!("/api/tasks/board/{board_id}"), Some(5), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    // Only the owner deletes the board
    let reply = app
        .call("DELETE", &format!("/api/boards/{board_id}"), Some(5), None)
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn observers_receive_changes_from_others_only() {
    let app = spawn_app().await;
    let board = app.create_board().await;
    let board_id = board.board.id;
    let todo = board.lists[0].id;
    let doing = board.lists[1].id;
    let a = app.create_task(todo, "A").await;

    // Two observers load the board and join it
    let reply = app
        .call("GET", &format!("/api/boards/{board_id}"), Some(OWNER), None)
        .await;
    let detail: BoardDetail = serde_json::from_value(reply.body).unwrap();
    let mut watcher_view = BoardView::from_detail(detail.clone());
    let mut mover_view = BoardView::from_detail(detail);

    let (mover, mut mover_rx) = app.state.relay.register();
    let (watcher, mut watcher_rx) = app.state.relay.register();
    app.state.relay.subscribe(&mover, board_id);
    app.state.relay.subscribe(&watcher, board_id);

    // The mover drags A into "In Progress" optimistically, then tells the server
    assert!(mover_view.apply_local_move(a.id, doing, 0));
    let reply = app
        .call_as(
            "POST",
            &format!("/api/tasks/{}/move", a.id),
            Some(OWNER),
            Some(mover.as_str()),
            Some(json!({ "list_id": doing, "index": 0 })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let moved: Task = serde_json::from_value(reply.body).unwrap();
    assert_eq!(
        mover_view.confirm(moved, reply.version.unwrap()),
        Reconcile::Patched
    );

    let msg = watcher_rx.recv().await.unwrap();
    let RelayMessage::Event { event } = msg else {
        panic!("Expected Event, got {msg:?}");
    };
    assert!(matches!(event, BoardEvent::TaskMoved { task_id, .. } if task_id == a.id));
    assert_eq!(watcher_view.apply(&event), Reconcile::Patched);

    assert!(mover_rx.try_recv().is_err());
    assert_eq!(watcher_view.list_order(doing), vec![a.id]);
    assert_eq!(mover_view.list_order(doing), vec![a.id]);
    assert_eq!(watcher_view.version(), mover_view.version());
}

#[tokio::test]
async fn list_and_task_lifecycle_emit_events() {
    let app = spawn_app().await;
    let board = app.create_board().await;
    let board_id = board.board.id;

    let (watcher, mut rx) = app.state.relay.register();
    app.state.relay.subscribe(&watcher, board_id);

    let reply = app
        .call(
            "POST",
            "/api/lists",
            Some(OWNER),
            Some(json!({ "boardId": board_id, "title": "Review" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let list_id = reply.body["id"].as_i64().unwrap();
    assert_eq!(reply.body["position"], 3);

    let task = app.create_task(list_id, "T").await;
    let reply = app
        .call(
            "PUT",
            &format!("/api/tasks/{}", task.id),
            Some(OWNER),
            Some(json!({ "status": "DONE" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["completed_at"].is_i64());

    let reply = app
        .call("DELETE", &format!("/api/lists/{list_id}"), Some(OWNER), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    let mut kinds = Vec::new();
    let mut versions = Vec::new();
    while let Ok(RelayMessage::Event { event }) = rx.try_recv() {
        kinds.push(event.kind());
        versions.push(event.version());
    }
    assert_eq!(
        kinds,
        vec!["list-created", "task-created", "task-updated", "list-deleted"]
    );
    assert_eq!(versions, vec![1, 2, 3, 4]);

    let reply = app
        .call("PUT", &format!("/api/tasks/{}", task.id), Some(OWNER), Some(json!({ "title": "x" })))
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn task_update_clears_fields_sent_as_null() {
    let app = spawn_app().await;
    let board = app.create_board().await;
    let todo = board.lists[0].id;

    let reply = app
        .call(
            "POST",
            "/api/tasks",
            Some(OWNER),
            Some(json!({
                "title": "Ship",
                "listId": todo,
                "description": "d",
                "assigneeId": 7,
                "dueDate": 1000
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    let task: Task = serde_json::from_value(reply.body).unwrap();
    assert_eq!(task.due_date, Some(1000));
    assert_eq!(task.assignee_id, Some(7));
    let uri = format!("/api/tasks/{}", task.id);

    // Fields left out keep their values
    let reply = app
        .call("PUT", &uri, Some(OWNER), Some(json!({ "priority": "HIGH" })))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["due_date"], 1000);
    assert_eq!(reply.body["assignee_id"], 7);
    assert_eq!(reply.body["description"], "d");

    let reply = app
        .call(
            "PUT",
            &uri,
            Some(OWNER),
            Some(json!({ "dueDate": null, "assigneeId": null, "description": null })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    let cleared: Task = serde_json::from_value(reply.body).unwrap();
    assert_eq!(cleared.due_date, None);
    assert_eq!(cleared.assignee_id, None);
    assert_eq!(cleared.description, None);
    assert_eq!(cleared.priority, shared::models::TaskPriority::High);
}
