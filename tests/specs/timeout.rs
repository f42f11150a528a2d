//! Timeouts: engine-issued cancellation after the effective deadline.

use crate::prelude::*;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn async_handler_exceeding_its_timeout_reports_timeout_error() {
    let stack = default_stack();
    register_sleeper(&stack.registry, "H", 3_600);

    let mut body = run_body(5, 51, "H", "SERIAL_EXECUTION");
    body["executorTimeout"] = json!(2);
    let started = tokio::time::Instant::now();
    post(&stack.app, "/run", body).await;

    wait_for_callbacks(&stack.admin, 1).await;

    let callbacks = stack.admin.callbacks();
    assert_eq!(callbacks[0].code, 500);
    assert_eq!(callbacks[0].msg.as_deref(), Some("TimeoutError"));
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert!(started.elapsed() < Duration::from_secs(60));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn blocking_handler_ignoring_everything_but_the_flag_still_times_out() {
    let stack = default_stack();
    let exited = Arc::new(AtomicBool::new(false));
    let exited_in_handler = Arc::clone(&exited);
    stack
        .registry
        .register_blocking("B", move |ctx| {
            let exited = Arc::clone(&exited_in_handler);
            // Polls the cancel flag between "computational steps".
            loop {
                if ctx.is_cancelled() {
                    exited.store(true, Ordering::SeqCst);
                    return Err(anyhow::anyhow!("stopped"));
                }
                std::thread::sleep(Duration::from_millis(100));
            }
        })
        .unwrap();

    let mut body = run_body(6, 61, "B", "SERIAL_EXECUTION");
    body["executorTimeout"] = json!(2);
    let started = std::time::Instant::now();
    post(&stack.app, "/run", body).await;

    // Callback within timeout + epsilon.
    for _ in 0..300 {
        if !stack.admin.callbacks().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    let callbacks = stack.admin.callbacks();
    assert_eq!(callbacks.len(), 1);
    assert_eq!(callbacks[0].code, 500);
    assert_eq!(callbacks[0].msg.as_deref(), Some("TimeoutError"));
    assert!(started.elapsed() < Duration::from_secs(3));

    // The worker notices the raised flag and exits shortly after.
    for _ in 0..100 {
        if exited.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(exited.load(Ordering::SeqCst));
}
