//! COVER_EARLY: cancel the in-flight run, then run the replacement.

use crate::prelude::*;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn replacement_cancels_the_running_invocation() {
    let stack = default_stack();
    register_sleeper(&stack.registry, "H", 5);

    post(&stack.app, "/run", run_body(3, 31, "H", "COVER_EARLY")).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let reply = post(&stack.app, "/run", run_body(3, 32, "H", "COVER_EARLY")).await;
    assert_eq!(reply["code"], 200);

    wait_for_callbacks(&stack.admin, 2).await;

    let callbacks = stack.admin.callbacks();
    assert_eq!(callbacks[0].log_id, 31, "cancelled run reports first");
    assert_eq!(callbacks[0].code, 500);
    assert_eq!(callbacks[0].msg.as_deref(), Some("CancelledError"));

    assert_eq!(callbacks[1].log_id, 32, "replacement runs to completion");
    assert_eq!(callbacks[1].code, 200);
    assert_eq!(callbacks[1].msg.as_deref(), Some("ok"));
}

#[tokio::test(start_paused = true)]
async fn replacement_is_admitted_even_when_the_serial_queue_is_full() {
    let stack = stack(xj_engine::DispatcherConfig {
        task_queue_length: 1,
        ..Default::default()
    });
    register_sleeper(&stack.registry, "H", 2);

    post(&stack.app, "/run", run_body(4, 41, "H", "SERIAL_EXECUTION")).await;
    post(&stack.app, "/run", run_body(4, 42, "H", "SERIAL_EXECUTION")).await;

    // The serial cap is exhausted; COVER_EARLY must not be dropped.
    let reply = post(&stack.app, "/run", run_body(4, 43, "H", "COVER_EARLY")).await;
    assert_eq!(reply["code"], 200);

    wait_for_callbacks(&stack.admin, 3).await;
    let callbacks = stack.admin.callbacks();
    assert_eq!(
        callbacks.iter().map(|cb| cb.log_id).collect::<Vec<_>>(),
        vec![41, 42, 43]
    );
    assert_eq!(callbacks[0].msg.as_deref(), Some("CancelledError"));
    assert_eq!(callbacks[2].code, 200);
}
