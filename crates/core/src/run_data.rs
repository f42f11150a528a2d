// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run request payload delivered by the scheduler.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Validation errors for an inbound run request.
#[derive(Debug, Error)]
pub enum RunDataError {
    #[error("jobId must be positive, got {0}")]
    InvalidJobId(i64),
    #[error("logId must be positive, got {0}")]
    InvalidLogId(i64),
    #[error("executorHandler must not be empty")]
    EmptyHandler,
}

/// Per-job policy selecting behavior when a new run arrives while a prior
/// one is still executing for the same `jobId`.
///
/// Unknown wire values are rejected at deserialization time, so a parsed
/// [`RunData`] always carries one of the three known strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockStrategy {
    /// Queue behind the running invocation, strict FIFO.
    #[serde(rename = "SERIAL_EXECUTION")]
    Serial,
    /// Reject the new run if one is already in flight.
    #[serde(rename = "DISCARD_LATER")]
    DiscardLater,
    /// Cancel the running invocation and run the new one in its place.
    #[serde(rename = "COVER_EARLY")]
    CoverEarly,
}

impl BlockStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockStrategy::Serial => "SERIAL_EXECUTION",
            BlockStrategy::DiscardLater => "DISCARD_LATER",
            BlockStrategy::CoverEarly => "COVER_EARLY",
        }
    }
}

impl fmt::Display for BlockStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One task invocation as dispatched by the scheduler.
///
/// Field names follow the XXL-JOB JSON protocol. Glue and broadcast fields
/// are carried through untouched; the executor never interprets them.
/// Unknown fields in the request body are tolerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunData {
    pub job_id: i64,
    pub log_id: i64,
    pub executor_handler: String,
    #[serde(rename = "executorBlockStrategy")]
    pub block_strategy: BlockStrategy,
    #[serde(default)]
    pub executor_params: Option<String>,
    /// Seconds; absent or zero means "use the configured default".
    #[serde(default)]
    pub executor_timeout: Option<u64>,
    /// Dispatch timestamp in ms since epoch, echoed back in the callback.
    #[serde(default)]
    pub log_date_time: Option<i64>,
    #[serde(default)]
    pub glue_type: Option<String>,
    #[serde(default)]
    pub glue_source: Option<String>,
    #[serde(default)]
    pub glue_updatetime: Option<i64>,
    #[serde(default)]
    pub broadcast_index: Option<i64>,
    #[serde(default)]
    pub broadcast_total: Option<i64>,
}

impl RunData {
    /// Check the invariants the engine relies on.
    pub fn validate(&self) -> Result<(), RunDataError> {
        if self.job_id <= 0 {
            return Err(RunDataError::InvalidJobId(self.job_id));
        }
        if self.log_id <= 0 {
            return Err(RunDataError::InvalidLogId(self.log_id));
        }
        if self.executor_handler.is_empty() {
            return Err(RunDataError::EmptyHandler);
        }
        Ok(())
    }

    /// Effective timeout in seconds given the configured default.
    pub fn effective_timeout(&self, default_secs: u64) -> u64 {
        match self.executor_timeout {
            Some(secs) if secs > 0 => secs,
            _ => default_secs,
        }
    }
}

#[cfg(test)]
#[path = "run_data_tests.rs"]
mod tests;
