//! Shared harness for the executor specs.

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use xj_adapters::FakeAdminClient;
use xj_daemon::{router, ServerCtx};
use xj_engine::{Dispatcher, DispatcherConfig, HandlerRegistry};
use xj_logstore::{MemoryLogStore, TaskLogStore};

pub struct Stack {
    pub app: Router,
    pub admin: FakeAdminClient,
    pub dispatcher: Arc<Dispatcher<FakeAdminClient>>,
    pub registry: Arc<HandlerRegistry>,
    pub logs: MemoryLogStore,
}

/// Full in-process executor stack backed by a fake admin client and an
/// in-memory log store.
pub fn stack(config: DispatcherConfig) -> Stack {
    let registry = Arc::new(HandlerRegistry::new());
    let admin = FakeAdminClient::new();
    let logs = MemoryLogStore::new().with_tail_lines(20);
    let dispatcher = Dispatcher::new(
        config,
        Arc::clone(&registry),
        Arc::new(admin.clone()),
        Arc::new(logs.clone()),
    );
    let ctx = Arc::new(ServerCtx {
        dispatcher: Arc::clone(&dispatcher),
        logs: Arc::new(logs.clone()) as Arc<dyn TaskLogStore>,
    });
    Stack {
        app: router(ctx),
        admin,
        dispatcher,
        registry,
        logs,
    }
}

pub fn default_stack() -> Stack {
    stack(DispatcherConfig {
        task_queue_length: 5,
        ..DispatcherConfig::default()
    })
}

/// Register an async handler that sleeps then returns "ok".
pub fn register_sleeper(registry: &HandlerRegistry, name: &str, secs: u64) {
    registry
        .register_async(name, move |_ctx| async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            Ok("ok".to_string())
        })
        .expect("register handler");
}

pub async fn post(app: &Router, path: &str, body: Value) -> Value {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request");
    let response = app.clone().oneshot(request).await.expect("send request");
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse reply")
}

pub fn run_body(job_id: i64, log_id: i64, handler: &str, strategy: &str) -> Value {
    json!({
        "jobId": job_id,
        "logId": log_id,
        "executorHandler": handler,
        "executorBlockStrategy": strategy,
    })
}

/// Wait until the fake admin saw `count` callbacks. Under paused-clock
/// runtimes the polling sleeps auto-advance virtual time.
pub async fn wait_for_callbacks(admin: &FakeAdminClient, count: usize) {
    for _ in 0..5_000 {
        if admin.callbacks().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {count} callbacks, saw {:?}",
        admin.callbacks().len()
    );
}
