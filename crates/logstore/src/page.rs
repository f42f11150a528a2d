// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Paged log read request and response shapes.

use serde::{Deserialize, Serialize};

/// Body returned when no records exist for the requested `logId`.
pub const NO_SUCH_LOG: &str = "No such logid logs.";

/// Scheduler request for one page of task log, as posted to `/log`.
///
/// `logDateTim` is the protocol's own spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRequest {
    #[serde(default)]
    pub log_date_tim: i64,
    pub log_id: i64,
    /// 1-based first line to return.
    pub from_line_num: usize,
    /// Backends that shard by job may use this; others ignore it.
    #[serde(default)]
    pub job_id: Option<i64>,
}

impl LogRequest {
    pub fn new(log_id: i64, from_line_num: usize) -> Self {
        Self {
            log_date_tim: 0,
            log_id,
            from_line_num,
            job_id: None,
        }
    }
}

/// One page of task log records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPage {
    pub from_line_num: usize,
    pub to_line_num: usize,
    pub log_content: String,
    pub is_end: bool,
}

impl LogPage {
    /// Page for a `logId` with no stored records at all.
    pub fn not_found(from_line_num: usize) -> Self {
        Self {
            from_line_num,
            to_line_num: from_line_num,
            log_content: NO_SUCH_LOG.to_string(),
            is_end: true,
        }
    }

    /// Build a page from the records starting at `from_line_num`, given
    /// the total stored record count.
    ///
    /// Used by backends that fetch a line window as a vector (sqlite,
    /// redis, memory); the disk backend streams instead.
    pub(crate) fn from_lines(from_line_num: usize, total: usize, lines: Vec<String>) -> Self {
        if total == 0 {
            return Self::not_found(from_line_num);
        }
        let to_line_num = if lines.is_empty() {
            from_line_num
        } else {
            from_line_num + lines.len() - 1
        };
        let mut log_content = String::new();
        for line in &lines {
            log_content.push_str(line);
            log_content.push('\n');
        }
        Self {
            from_line_num,
            to_line_num,
            log_content,
            is_end: to_line_num >= total,
        }
    }
}

#[cfg(test)]
#[path = "page_tests.rs"]
mod tests;
