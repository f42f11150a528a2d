//! /log: paged reads of per-invocation transcripts.

use crate::prelude::*;
use serde_json::json;

/// A handler that writes 80 INFO lines through its scoped logger.
fn register_chatty(registry: &xj_engine::HandlerRegistry) {
    registry
        .register_async("chatty", |ctx| async move {
            for i in 1..=80 {
                ctx.logger().info(format!("work item {i}"));
            }
            Ok("done".to_string())
        })
        .expect("register handler");
}

#[tokio::test(start_paused = true)]
async fn pages_of_twenty_walk_the_whole_transcript() {
    let stack = default_stack();
    register_chatty(&stack.registry);

    post(&stack.app, "/run", run_body(6, 61, "chatty", "SERIAL_EXECUTION")).await;
    wait_for_callbacks(&stack.admin, 1).await;

    let reply = post(
        &stack.app,
        "/log",
        json!({"logDateTim": 0, "logId": 61, "fromLineNum": 1}),
    )
    .await;
    assert_eq!(reply["code"], 200);
    let content = &reply["content"];
    assert_eq!(content["fromLineNum"], 1);
    assert_eq!(content["toLineNum"], 20);
    assert_eq!(content["isEnd"], false);

    // The transcript is exactly the handler's 80 lines; one past the end
    // is an empty, final page.
    assert_eq!(stack.logs.lines(61).len(), 80);
    let reply = post(
        &stack.app,
        "/log",
        json!({"logDateTim": 0, "logId": 61, "fromLineNum": 81}),
    )
    .await;
    let content = &reply["content"];
    assert_eq!(content["fromLineNum"], 81);
    assert_eq!(content["toLineNum"], 81);
    assert_eq!(content["logContent"], "");
    assert_eq!(content["isEnd"], true);
}

#[tokio::test(start_paused = true)]
async fn concatenated_pages_equal_the_full_transcript() {
    let stack = default_stack();
    register_chatty(&stack.registry);

    post(&stack.app, "/run", run_body(7, 71, "chatty", "SERIAL_EXECUTION")).await;
    wait_for_callbacks(&stack.admin, 1).await;

    let mut assembled = String::new();
    let mut from = 1u64;
    loop {
        let reply = post(
            &stack.app,
            "/log",
            json!({"logDateTim": 0, "logId": 71, "fromLineNum": from}),
        )
        .await;
        let content = &reply["content"];
        assembled.push_str(content["logContent"].as_str().unwrap());
        if content["isEnd"].as_bool().unwrap() {
            break;
        }
        from = content["toLineNum"].as_u64().unwrap() + 1;
    }

    let stored: String = stack
        .logs
        .lines(71)
        .iter()
        .map(|line| format!("{line}\n"))
        .collect();
    assert_eq!(assembled, stored);
    assert!(assembled.contains("work item 1"));
    assert!(assembled.contains("work item 80"));
}

#[tokio::test(start_paused = true)]
async fn unknown_log_id_reports_no_such_log() {
    let stack = default_stack();
    let reply = post(
        &stack.app,
        "/log",
        json!({"logDateTim": 0, "logId": 12345, "fromLineNum": 1}),
    )
    .await;
    assert_eq!(reply["code"], 200);
    assert_eq!(reply["content"]["logContent"], "No such logid logs.");
    assert_eq!(reply["content"]["isEnd"], true);
}
