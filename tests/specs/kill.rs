//! /kill: cancel the running invocation and drain the pending queue.

use crate::prelude::*;
use serde_json::json;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn kill_cancels_running_and_discards_queued_runs() {
    let stack = default_stack();
    register_sleeper(&stack.registry, "H", 60);

    for log_id in [41, 42, 43] {
        let reply = post(
            &stack.app,
            "/run",
            run_body(4, log_id, "H", "SERIAL_EXECUTION"),
        )
        .await;
        assert_eq!(reply["code"], 200);
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let reply = post(&stack.app, "/kill", json!({"jobId": 4})).await;
    assert_eq!(reply["code"], 200);

    wait_for_callbacks(&stack.admin, 1).await;
    assert!(!stack.dispatcher.is_running(4));

    // Discarded queue entries never ran, so they never report back.
    tokio::time::sleep(Duration::from_secs(120)).await;
    let callbacks = stack.admin.callbacks();
    assert_eq!(callbacks.len(), 1);
    assert_eq!(callbacks[0].log_id, 41);
    assert_eq!(callbacks[0].code, 500);
    assert_eq!(callbacks[0].msg.as_deref(), Some("CancelledError"));

    let reply = post(&stack.app, "/idleBeat", json!({"jobId": 4})).await;
    assert_eq!(reply["code"], 200, "job reports idle after the kill");
}

#[tokio::test(start_paused = true)]
async fn kill_of_an_unknown_job_is_a_no_op() {
    let stack = default_stack();
    let reply = post(&stack.app, "/kill", json!({"jobId": 999})).await;
    assert_eq!(reply["code"], 200);
    assert!(stack.admin.callbacks().is_empty());
}
