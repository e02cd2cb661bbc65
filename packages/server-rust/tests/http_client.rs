//! End-to-end calls over a real TCP listener with the typed client.

use std::sync::Arc;

use cedar_core::contracts::echo::{Echo, EchoOp, EchoRequest};
use cedar_core::contracts::todos::{
    AddTodo, AddTodoRequest, DeleteTodo, DeleteTodoRequest, GetTodo, GetTodoRequest, GetTodos,
    GetTodosRequest, Status, Todos,
};
use cedar_core::{ClientError, RpcClient, Unit};
use cedar_server::network::{NetworkConfig, NetworkModule, ShutdownController};
use cedar_server::service::domain::{echo_service, todos_service, TodoStore};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestServer {
    base: String,
    shutdown: Arc<ShutdownController>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    async fn spawn() -> Self {
        let mut module = NetworkModule::new(NetworkConfig {
            host: "127.0.0.1".to_string(),
            ..NetworkConfig::default()
        });
        module
            .mount("/todos", todos_service(Arc::new(TodoStore::new())))
            .unwrap()
            .mount("/echo", echo_service())
            .unwrap();

        let port = module.start().await.unwrap();
        let shutdown = module.shutdown_controller();
        let (stop, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(module.serve(async move {
            let _ = rx.await;
        }));

        Self {
            base: format!("http://127.0.0.1:{port}"),
            shutdown,
            stop: Some(stop),
            task,
        }
    }

    fn todos(&self) -> RpcClient<Todos> {
        RpcClient::new(format!("{}/todos", self.base))
    }

    fn echo(&self) -> RpcClient<Echo> {
        RpcClient::new(format!("{}/echo", self.base))
    }

    async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.task.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn todo_lifecycle_over_http() {
    let server = TestServer::spawn().await;
    let client = server.todos();

    let first = client
        .call::<AddTodo>(&AddTodoRequest {
            deadline: "2024-01-01".to_string(),
            description: "x".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(first.id, 1);
    assert_eq!(first.status, Status::Todo);

    let second = client
        .call::<AddTodo>(&AddTodoRequest {
            deadline: "2024-02-01".to_string(),
            description: "y".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(second.id, 2);

    let all = client.call::<GetTodos>(&GetTodosRequest {}).await.unwrap();
    assert_eq!(all, vec![first.clone(), second.clone()]);

    for expected in [&first, &second] {
        let fetched = client
            .call::<GetTodo>(&GetTodoRequest { id: expected.id })
            .await
            .unwrap();
        assert_eq!(&fetched, expected);
    }

    let deleted = client
        .call::<DeleteTodo>(&DeleteTodoRequest { id: 1 })
        .await
        .unwrap();
    assert_eq!(deleted, Unit {});

    let err = client
        .call::<GetTodo>(&GetTodoRequest { id: 1 })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(matches!(
        err,
        ClientError::Rpc { ref message, .. } if message == "todo not found"
    ));

    let remaining = client.call::<GetTodos>(&GetTodosRequest {}).await.unwrap();
    assert_eq!(remaining, vec![second]);

    server.stop().await;
}

#[tokio::test]
async fn echo_over_http() {
    let server = TestServer::spawn().await;

    let reply = server
        .echo()
        .call::<EchoOp>(&EchoRequest {
            message: "hi".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(reply, "hi");

    server.stop().await;
}

#[tokio::test]
async fn raw_requests_get_taxonomy_statuses() {
    let server = TestServer::spawn().await;
    let http = reqwest::Client::new();

    let response = http
        .get(format!("{}/todos", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 405);
    assert_eq!(response.headers()["allow"], "POST");

    let response = http
        .post(format!("{}/todos?fn=nope", server.base))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "message": "invalid function: nope" }));

    let response = http
        .post(format!("{}/echo", server.base))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    server.stop().await;
}

#[tokio::test]
async fn health_reports_ready_then_stopped() {
    let server = TestServer::spawn().await;

    let health: serde_json::Value = reqwest::get(format!("{}/health", server.base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["state"], "ready");
    assert_eq!(health["services"].as_array().map(Vec::len), Some(2));

    let shutdown = Arc::clone(&server.shutdown);
    server.stop().await;
    assert_eq!(shutdown.health_state().as_str(), "stopped");
}
