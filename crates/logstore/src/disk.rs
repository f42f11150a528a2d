// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local-file log backend: one append-only file per invocation.

use crate::logger::{LogLevel, LogSink, NullSink, TaskLogger};
use crate::page::{LogPage, LogRequest};
use crate::{LogStoreError, TaskLogStore, MAX_LOG_TAIL_LINES};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const LOG_FILE_PREFIX: &str = "xj-";
const LOG_FILE_SUFFIX: &str = ".log";

/// Stores task logs as `xj-{logId}.log` files under one directory.
pub struct DiskLogStore {
    dir: PathBuf,
    tail_lines: usize,
    expired_days: u32,
    level: LogLevel,
}

impl DiskLogStore {
    /// Create the store, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>, expired_days: u32) -> Result<Self, LogStoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            tail_lines: MAX_LOG_TAIL_LINES,
            expired_days,
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

    fn path_for(&self, log_id: i64) -> PathBuf {
        self.dir
            .join(format!("{LOG_FILE_PREFIX}{log_id}{LOG_FILE_SUFFIX}"))
    }
}

struct FileSink {
    file: File,
}

#[async_trait]
impl LogSink for FileSink {
    async fn write_line(&mut self, _level: LogLevel, line: &str) {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        if let Err(e) = self.file.write_all(&buf).await {
            tracing::warn!(error = %e, "task log write failed, record dropped");
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.file.flush().await {
            tracing::warn!(error = %e, "task log flush failed");
        }
    }
}

#[async_trait]
impl TaskLogStore for DiskLogStore {
    async fn open_logger(&self, job_id: i64, log_id: i64) -> TaskLogger {
        let path = self.path_for(log_id);
        let sink: Box<dyn LogSink> = match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
        {
            Ok(file) => Box::new(FileSink { file }),
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "failed to open task log file, records will be dropped"
                );
                Box::new(NullSink)
            }
        };
        TaskLogger::spawn(job_id, log_id, self.level, sink)
    }

    async fn read_page(&self, request: &LogRequest) -> LogPage {
        let path = self.path_for(request.log_id);
        let from = request.from_line_num.max(1);

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return LogPage::not_found(from);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "task log read failed");
                return LogPage::not_found(from);
            }
        };

        let mut lines = BufReader::new(file).lines();
        let mut content = String::new();
        let mut to = from;
        let mut included = 0usize;
        let mut index = 0usize;
        let is_end = loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    index += 1;
                    if index < from {
                        continue;
                    }
                    if included == self.tail_lines {
                        // Window full and at least one more line exists.
                        break false;
                    }
                    content.push_str(&line);
                    content.push('\n');
                    to = index;
                    included += 1;
                }
                Ok(None) => break true,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "task log read failed");
                    break true;
                }
            }
        };

        LogPage {
            from_line_num: from,
            to_line_num: to,
            log_content: content,
            is_end,
        }
    }

    async fn read_all(&self, log_id: i64) -> Option<String> {
        match tokio::fs::read_to_string(self.path_for(log_id)).await {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(log_id, error = %e, "task log read failed");
                None
            }
        }
    }

    async fn expire_once(&self) -> Result<(), LogStoreError> {
        let cutoff = SystemTime::now() - Duration::from_secs(u64::from(self.expired_days) * 86_400);
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut deleted = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_task_log(&path) {
                continue;
            }
            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(_) => continue,
            };
            if modified < cutoff {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(path = %path.display(), error = %e, "failed to delete expired log");
                } else {
                    deleted.push(path);
                }
            }
        }

        if !deleted.is_empty() {
            tracing::info!(
                count = deleted.len(),
                "deleted expired task logs: {}",
                deleted
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(" | ")
            );
        }
        Ok(())
    }
}

fn is_task_log(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX) && n.ends_with(LOG_FILE_SUFFIX))
}

#[cfg(test)]
#[path = "disk_tests.rs"]
mod tests;
