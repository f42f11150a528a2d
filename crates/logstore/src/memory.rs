// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory log store for tests.
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::logger::{LogLevel, LogSink, TaskLogger};
use crate::page::{LogPage, LogRequest};
use crate::{LogStoreError, TaskLogStore, MAX_LOG_TAIL_LINES};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Keeps every record in a map; never expires anything.
#[derive(Clone)]
pub struct MemoryLogStore {
    records: Arc<Mutex<HashMap<i64, Vec<String>>>>,
    tail_lines: usize,
    level: LogLevel,
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            tail_lines: MAX_LOG_TAIL_LINES,
            level: LogLevel::Debug,
        }
    }
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tail_lines(mut self, tail_lines: usize) -> Self {
        self.tail_lines = tail_lines;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Raw stored lines for assertions.
    pub fn lines(&self, log_id: i64) -> Vec<String> {
        self.records
            .lock()
            .get(&log_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Log ids that received at least one record.
    pub fn log_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.records.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

struct MemorySink {
    records: Arc<Mutex<HashMap<i64, Vec<String>>>>,
    log_id: i64,
}

#[async_trait]
impl LogSink for MemorySink {
    async fn write_line(&mut self, _level: LogLevel, line: &str) {
        self.records
            .lock()
            .entry(self.log_id)
            .or_default()
            .push(line.to_string());
    }
}

#[async_trait]
impl TaskLogStore for MemoryLogStore {
    async fn open_logger(&self, job_id: i64, log_id: i64) -> TaskLogger {
        let sink = MemorySink {
            records: Arc::clone(&self.records),
            log_id,
        };
        TaskLogger::spawn(job_id, log_id, self.level, Box::new(sink))
    }

    async fn read_page(&self, request: &LogRequest) -> LogPage {
        let from = request.from_line_num.max(1);
        let records = self.records.lock();
        let Some(all) = records.get(&request.log_id) else {
            return LogPage::not_found(from);
        };
        let start = (from - 1).min(all.len());
        let end = (start + self.tail_lines).min(all.len());
        LogPage::from_lines(from, all.len(), all[start..end].to_vec())
    }

    async fn read_all(&self, log_id: i64) -> Option<String> {
        let records = self.records.lock();
        let all = records.get(&log_id)?;
        let mut content = String::new();
        for line in all {
            content.push_str(line);
            content.push('\n');
        }
        Some(content)
    }

    async fn expire_once(&self) -> Result<(), LogStoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
