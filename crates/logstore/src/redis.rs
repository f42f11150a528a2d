// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis log backend: one list per invocation, trimmed and TTL-expired.

use crate::logger::{LogLevel, LogSink, TaskLogger};
use crate::page::{LogPage, LogRequest};
use crate::{LogStoreError, TaskLogStore, MAX_LOG_TAIL_LINES};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

const KEY_PREFIX: &str = "xj:log";

/// Stores task logs as Redis lists keyed `xj:log:{app}:{logId}`.
///
/// Expiry is delegated to Redis key TTLs, so [`expire_once`]
/// (TaskLogStore::expire_once) is a no-op here.
pub struct RedisLogStore {
    conn: MultiplexedConnection,
    app: String,
    tail_lines: usize,
    ttl_seconds: i64,
    level: LogLevel,
}

impl RedisLogStore {
    /// Connect to `uri` and namespace keys under `app`.
    pub async fn connect(
        uri: &str,
        app: impl Into<String>,
        expired_days: u32,
    ) -> Result<Self, LogStoreError> {
        let client = redis::Client::open(uri).map_err(LogStoreError::Redis)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn,
            app: app.into(),
            tail_lines: MAX_LOG_TAIL_LINES,
            ttl_seconds: i64::from(expired_days) * 86_400,
            level: LogLevel::Info,
        })
    }

    pub fn with_tail_lines(mut self, tail_lines: usize) -> Self {
        self.tail_lines = tail_lines;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    fn key(&self, log_id: i64) -> String {
        list_key(&self.app, log_id)
    }
}

fn list_key(app: &str, log_id: i64) -> String {
    format!("{KEY_PREFIX}:{app}:{log_id}")
}

struct RedisSink {
    conn: MultiplexedConnection,
    key: String,
    ttl_seconds: i64,
    max_lines: isize,
}

#[async_trait]
impl LogSink for RedisSink {
    async fn write_line(&mut self, _level: LogLevel, line: &str) {
        let result: Result<(), redis::RedisError> = redis::pipe()
            .rpush(&self.key, line)
            .ltrim(&self.key, -self.max_lines, -1)
            .expire(&self.key, self.ttl_seconds)
            .query_async(&mut self.conn)
            .await;
        if let Err(e) = result {
            tracing::warn!(key = %self.key, error = %e, "task log push failed, record dropped");
        }
    }
}

#[async_trait]
impl TaskLogStore for RedisLogStore {
    async fn open_logger(&self, job_id: i64, log_id: i64) -> TaskLogger {
        let sink = RedisSink {
            conn: self.conn.clone(),
            key: self.key(log_id),
            ttl_seconds: self.ttl_seconds,
            max_lines: self.tail_lines as isize,
        };
        TaskLogger::spawn(job_id, log_id, self.level, Box::new(sink))
    }

    async fn read_page(&self, request: &LogRequest) -> LogPage {
        let key = self.key(request.log_id);
        let from = request.from_line_num.max(1);
        let mut conn = self.conn.clone();

        let total: usize = match conn.llen(&key).await {
            Ok(len) => len,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "task log llen failed");
                return LogPage::not_found(from);
            }
        };
        if total == 0 {
            return LogPage::not_found(from);
        }

        let start = (from - 1) as isize;
        let stop = start + self.tail_lines as isize - 1;
        let lines: Vec<String> = match conn.lrange(&key, start, stop).await {
            Ok(lines) => lines,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "task log lrange failed");
                return LogPage::not_found(from);
            }
        };

        LogPage::from_lines(from, total, lines)
    }

    async fn read_all(&self, log_id: i64) -> Option<String> {
        let key = self.key(log_id);
        let mut conn = self.conn.clone();
        let lines: Vec<String> = match conn.lrange(&key, 0, -1).await {
            Ok(lines) => lines,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "task log lrange failed");
                return None;
            }
        };
        if lines.is_empty() {
            return None;
        }
        let mut content = String::new();
        for line in lines {
            content.push_str(&line);
            content.push('\n');
        }
        Some(content)
    }

    /// Redis expires keys natively via the TTL set on every push.
    async fn expire_once(&self) -> Result<(), LogStoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "redis_tests.rs"]
mod tests;
