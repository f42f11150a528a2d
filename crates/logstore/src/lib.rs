// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Task log storage.
//!
//! Every invocation gets a [`TaskLogger`] scoped to its `(jobId, logId)`;
//! the scheduler reads the records back in pages through `/log`. Storage
//! is pluggable: local files, SQLite, or Redis.

mod disk;
mod logger;
mod page;
mod redis;
mod sqlite;

pub use disk::DiskLogStore;
pub use logger::{LogLevel, TaskLogger};
pub use page::{LogPage, LogRequest, NO_SUCH_LOG};
pub use redis::RedisLogStore;
pub use sqlite::SqliteLogStore;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod memory;
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryLogStore;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Cap on lines returned by a single `read_page` call.
pub const MAX_LOG_TAIL_LINES: usize = 1000;

/// Errors surfaced by log store maintenance operations.
///
/// Write-path errors never reach callers: they are logged to the
/// executor's own log and the record is dropped.
#[derive(Debug, Error)]
pub enum LogStoreError {
    #[error("log store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("log store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Capability contract every log backend implements.
#[async_trait]
pub trait TaskLogStore: Send + Sync + 'static {
    /// Open a logger whose records are addressable by `(job_id, log_id)`.
    /// The logger lives for the invocation; callers must `close` it on
    /// every exit path.
    async fn open_logger(&self, job_id: i64, log_id: i64) -> TaskLogger;

    /// Read up to the tail-lines cap of consecutive records starting at
    /// the 1-based `from_line_num`.
    async fn read_page(&self, request: &LogRequest) -> LogPage;

    /// Full transcript for one invocation, if any records exist.
    async fn read_all(&self, log_id: i64) -> Option<String>;

    /// Delete records older than the configured retention. Backends with
    /// native TTL may no-op.
    async fn expire_once(&self) -> Result<(), LogStoreError>;

    /// Periodically invoke [`expire_once`](Self::expire_once) until the
    /// owning task is cancelled.
    async fn expire_loop(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.expire_once().await {
                tracing::warn!(error = %e, "task log expiry failed");
            }
        }
    }
}
