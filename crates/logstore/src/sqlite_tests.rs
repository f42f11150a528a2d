// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::NO_SUCH_LOG;

async fn write_lines(store: &SqliteLogStore, log_id: i64, count: usize) {
    let logger = store.open_logger(1, log_id).await;
    for i in 1..=count {
        logger.info(format!("line {i}"));
    }
    logger.close().await;
}

#[tokio::test]
async fn pages_match_disk_semantics() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteLogStore::new(dir.path(), 14)
        .unwrap()
        .with_tail_lines(20);
    write_lines(&store, 31, 80).await;

    let page = store.read_page(&LogRequest::new(31, 1)).await;
    assert_eq!(page.from_line_num, 1);
    assert_eq!(page.to_line_num, 20);
    assert!(!page.is_end);

    let last = store.read_page(&LogRequest::new(31, 61)).await;
    assert_eq!(last.to_line_num, 80);
    assert!(last.is_end);

    let past_end = store.read_page(&LogRequest::new(31, 81)).await;
    assert_eq!(past_end.to_line_num, 81);
    assert_eq!(past_end.log_content, "");
    assert!(past_end.is_end);
}

#[tokio::test]
async fn missing_log_reports_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteLogStore::new(dir.path(), 14).unwrap();

    let page = store.read_page(&LogRequest::new(555, 1)).await;
    assert_eq!(page.log_content, NO_SUCH_LOG);
    assert!(page.is_end);
    assert_eq!(store.read_all(555).await, None);
}

#[tokio::test]
async fn records_keep_program_order_and_level() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteLogStore::new(dir.path(), 14).unwrap();

    let logger = store.open_logger(1, 32).await;
    logger.info("first");
    logger.warn("second");
    logger.error("third");
    logger.close().await;

    let content = store.read_all(32).await.unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("INFO") && lines[0].ends_with("first"));
    assert!(lines[1].contains("WARN") && lines[1].ends_with("second"));
    assert!(lines[2].contains("ERROR") && lines[2].ends_with("third"));
}

#[tokio::test]
async fn two_invocations_share_the_database_without_mixing() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteLogStore::new(dir.path(), 14).unwrap();

    write_lines(&store, 33, 5).await;
    write_lines(&store, 34, 3).await;

    assert_eq!(store.read_all(33).await.unwrap().lines().count(), 5);
    assert_eq!(store.read_all(34).await.unwrap().lines().count(), 3);
}

#[tokio::test]
async fn zero_day_retention_expires_everything() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteLogStore::new(dir.path(), 0).unwrap();
    write_lines(&store, 35, 4).await;
    assert!(store.read_all(35).await.is_some());

    store.expire_once().await.unwrap();
    assert_eq!(store.read_all(35).await, None);
}

#[tokio::test]
async fn default_retention_keeps_fresh_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteLogStore::new(dir.path(), 14).unwrap();
    write_lines(&store, 36, 2).await;

    store.expire_once().await.unwrap();
    assert!(store.read_all(36).await.is_some());
}
