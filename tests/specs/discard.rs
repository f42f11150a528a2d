//! DISCARD_LATER: a running job rejects newcomers outright.

use crate::prelude::*;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn second_submission_is_discarded_without_a_callback() {
    let stack = default_stack();
    register_sleeper(&stack.registry, "H", 3);

    let reply = post(&stack.app, "/run", run_body(2, 21, "H", "DISCARD_LATER")).await;
    assert_eq!(reply["code"], 200);

    tokio::time::sleep(Duration::from_millis(100)).await;

    let reply = post(&stack.app, "/run", run_body(2, 22, "H", "DISCARD_LATER")).await;
    assert_eq!(reply["code"], 500);
    assert!(reply["msg"].as_str().unwrap().contains("already running"));

    wait_for_callbacks(&stack.admin, 1).await;
    // Give a stray callback for the discarded run a chance to show up.
    tokio::time::sleep(Duration::from_secs(5)).await;

    let callbacks = stack.admin.callbacks();
    assert_eq!(callbacks.len(), 1);
    assert_eq!(callbacks[0].log_id, 21);
    assert_eq!(callbacks[0].code, 200);
    assert_eq!(callbacks[0].msg.as_deref(), Some("ok"));
}

#[tokio::test(start_paused = true)]
async fn job_is_free_again_after_completion() {
    let stack = default_stack();
    register_sleeper(&stack.registry, "H", 1);

    post(&stack.app, "/run", run_body(3, 31, "H", "DISCARD_LATER")).await;
    wait_for_callbacks(&stack.admin, 1).await;

    // The slot is released; a new run with the same jobId is accepted.
    for _ in 0..1_000 {
        let reply = post(&stack.app, "/run", run_body(3, 32, "H", "DISCARD_LATER")).await;
        if reply["code"] == 200 {
            wait_for_callbacks(&stack.admin, 2).await;
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job 3 never freed up after its first run completed");
}
