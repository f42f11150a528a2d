// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite log backend: one `logs` table, WAL mode, row-level expiry.

use crate::logger::{LogLevel, LogSink, TaskLogger};
use crate::page::{LogPage, LogRequest};
use crate::{LogStoreError, TaskLogStore, MAX_LOG_TAIL_LINES};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

const DB_FILE: &str = "xj.db";

/// Stores task logs in a single SQLite database under `dir`.
pub struct SqliteLogStore {
    db: Arc<Db>,
    tail_lines: usize,
    level: LogLevel,
}

/// Synchronous database guts; every async entry point hops through
/// `spawn_blocking` so the runtime never waits on SQLite I/O.
struct Db {
    conn: Mutex<Connection>,
    expired_seconds: u64,
}

impl Db {
    fn open(dir: &Path) -> Result<Connection, rusqlite::Error> {
        let conn = Connection::open(dir.join(DB_FILE))?;
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                log_id INTEGER NOT NULL,
                level TEXT NOT NULL,
                record TEXT NOT NULL,
                created_at_ms INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_logs_log_id ON logs(log_id);",
        )?;
        Ok(conn)
    }

    fn insert(&self, log_id: i64, level: LogLevel, record: &str) -> Result<(), rusqlite::Error> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let created_at_ms = now.as_millis() as i64;
        let expires_at = (now.as_secs() + self.expired_seconds) as i64;
        self.conn.lock().execute(
            "INSERT INTO logs (log_id, level, record, created_at_ms, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![log_id, level.as_str(), record, created_at_ms, expires_at],
        )?;
        Ok(())
    }

    /// `limit < 0` means unlimited, per SQLite's LIMIT semantics.
    fn query(
        &self,
        log_id: i64,
        from_line: usize,
        limit: i64,
    ) -> Result<(usize, Vec<String>), rusqlite::Error> {
        let conn = self.conn.lock();
        let total: usize = conn.query_row(
            "SELECT COUNT(*) FROM logs WHERE log_id = ?1",
            params![log_id],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT record FROM logs WHERE log_id = ?1 ORDER BY id LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt.query_map(
            params![log_id, limit, from_line.saturating_sub(1) as i64],
            |row| row.get::<_, String>(0),
        )?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok((total, records))
    }

    fn read_all(&self, log_id: i64) -> Result<Option<String>, rusqlite::Error> {
        let (total, records) = self.query(log_id, 1, -1)?;
        if total == 0 {
            return Ok(None);
        }
        let mut content = String::new();
        for record in records {
            content.push_str(&record);
            content.push('\n');
        }
        Ok(Some(content))
    }

    fn expire(&self, now_secs: i64) -> Result<usize, rusqlite::Error> {
        self.conn.lock().execute(
            "DELETE FROM logs WHERE expires_at <= ?1",
            params![now_secs],
        )
    }
}

impl SqliteLogStore {
    /// Open (or create) the database under `dir`.
    pub fn new(dir: impl Into<PathBuf>, expired_days: u32) -> Result<Self, LogStoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let conn = Db::open(&dir)?;
        Ok(Self {
            db: Arc::new(Db {
                conn: Mutex::new(conn),
                expired_seconds: u64::from(expired_days) * 86_400,
            }),
            tail_lines: MAX_LOG_TAIL_LINES,
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
}

struct SqliteSink {
    db: Arc<Db>,
    log_id: i64,
}

#[async_trait]
impl LogSink for SqliteSink {
    async fn write_line(&mut self, level: LogLevel, line: &str) {
        let db = Arc::clone(&self.db);
        let log_id = self.log_id;
        let line = line.to_string();
        let result =
            tokio::task::spawn_blocking(move || db.insert(log_id, level, &line)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(log_id, error = %e, "task log insert failed, record dropped"),
            Err(e) => tracing::warn!(log_id, error = %e, "task log writer task failed"),
        }
    }
}

#[async_trait]
impl TaskLogStore for SqliteLogStore {
    async fn open_logger(&self, job_id: i64, log_id: i64) -> TaskLogger {
        let sink = SqliteSink {
            db: Arc::clone(&self.db),
            log_id,
        };
        TaskLogger::spawn(job_id, log_id, self.level, Box::new(sink))
    }

    async fn read_page(&self, request: &LogRequest) -> LogPage {
        let db = Arc::clone(&self.db);
        let log_id = request.log_id;
        let from = request.from_line_num.max(1);
        let limit = self.tail_lines as i64;

        let result = tokio::task::spawn_blocking(move || db.query(log_id, from, limit)).await;
        match result {
            Ok(Ok((total, records))) => LogPage::from_lines(from, total, records),
            Ok(Err(e)) => {
                tracing::warn!(log_id, error = %e, "task log query failed");
                LogPage::not_found(from)
            }
            Err(e) => {
                tracing::warn!(log_id, error = %e, "task log query task failed");
                LogPage::not_found(from)
            }
        }
    }

    async fn read_all(&self, log_id: i64) -> Option<String> {
        let db = Arc::clone(&self.db);
        let result = tokio::task::spawn_blocking(move || db.read_all(log_id)).await;
        match result {
            Ok(Ok(content)) => content,
            Ok(Err(e)) => {
                tracing::warn!(log_id, error = %e, "task log read failed");
                None
            }
            Err(e) => {
                tracing::warn!(log_id, error = %e, "task log read task failed");
                None
            }
        }
    }

    async fn expire_once(&self) -> Result<(), LogStoreError> {
        let db = Arc::clone(&self.db);
        let now_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        let deleted = tokio::task::spawn_blocking(move || db.expire(now_secs)).await??;
        if deleted > 0 {
            tracing::info!(deleted, "deleted expired task log rows");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
