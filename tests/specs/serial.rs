//! SERIAL_EXECUTION: strict FIFO behind the running invocation.

use crate::prelude::*;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn three_in_a_row_complete_in_submission_order() {
    let stack = default_stack();
    register_sleeper(&stack.registry, "H", 2);
    let started = tokio::time::Instant::now();

    for log_id in [11, 12, 13] {
        let reply = post(
            &stack.app,
            "/run",
            run_body(1, log_id, "H", "SERIAL_EXECUTION"),
        )
        .await;
        assert_eq!(reply["code"], 200, "submit {log_id} accepted");
    }

    wait_for_callbacks(&stack.admin, 3).await;

    let callbacks = stack.admin.callbacks();
    assert_eq!(
        callbacks.iter().map(|cb| cb.log_id).collect::<Vec<_>>(),
        vec![11, 12, 13],
        "callbacks arrive in submission order"
    );
    for cb in &callbacks {
        assert_eq!(cb.code, 200);
        assert_eq!(cb.msg.as_deref(), Some("ok"));
    }
    assert!(
        started.elapsed() >= Duration::from_secs(6),
        "three serialized 2s runs take at least 6s"
    );
}

#[tokio::test(start_paused = true)]
async fn full_queue_rejects_with_job_duplicate() {
    let stack = stack(xj_engine::DispatcherConfig {
        task_queue_length: 2,
        ..Default::default()
    });
    register_sleeper(&stack.registry, "H", 60);

    for log_id in [21, 22, 23] {
        let reply = post(
            &stack.app,
            "/run",
            run_body(2, log_id, "H", "SERIAL_EXECUTION"),
        )
        .await;
        assert_eq!(reply["code"], 200);
    }

    let reply = post(&stack.app, "/run", run_body(2, 24, "H", "SERIAL_EXECUTION")).await;
    assert_eq!(reply["code"], 500);
    assert!(reply["msg"].as_str().unwrap().contains("queue is full"));
}

#[tokio::test(start_paused = true)]
async fn every_accepted_run_gets_exactly_one_callback() {
    let stack = default_stack();
    register_sleeper(&stack.registry, "H", 1);

    let mut accepted = Vec::new();
    for log_id in 31..=35 {
        let reply = post(
            &stack.app,
            "/run",
            run_body(3, log_id, "H", "SERIAL_EXECUTION"),
        )
        .await;
        if reply["code"] == 200 {
            accepted.push(log_id);
        }
    }

    wait_for_callbacks(&stack.admin, accepted.len()).await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    let callbacks = stack.admin.callbacks();
    assert_eq!(
        callbacks.iter().map(|cb| cb.log_id).collect::<Vec<_>>(),
        accepted,
        "one callback per accepted run, in order"
    );
}
