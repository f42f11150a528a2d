// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admin client contract.

use async_trait::async_trait;
use thiserror::Error;

/// Handle code for a successful invocation.
pub const SUCCESS_CODE: i32 = 200;
/// Handle code for a failed, timed-out, or cancelled invocation.
pub const FAILURE_CODE: i32 = 500;

/// Errors from outbound admin calls.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("admin request failed after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("admin returned HTTP {status}")]
    Status { status: reqwest::StatusCode },
    #[error("admin rejected the call: code={code} msg={msg:?}")]
    Rejected { code: i64, msg: Option<String> },
    #[error("failed to decode admin reply: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("invalid admin client config: {0}")]
    Config(String),
}

/// Final status report for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCallback {
    pub log_id: i64,
    /// Invocation start in ms since epoch; echoed as `logDateTim`.
    pub log_date_tim: i64,
    /// [`SUCCESS_CODE`] or [`FAILURE_CODE`].
    pub code: i32,
    pub msg: Option<String>,
}

impl TaskCallback {
    pub fn success(log_id: i64, log_date_tim: i64, msg: impl Into<String>) -> Self {
        Self {
            log_id,
            log_date_tim,
            code: SUCCESS_CODE,
            msg: Some(msg.into()),
        }
    }

    pub fn failure(log_id: i64, log_date_tim: i64, msg: impl Into<String>) -> Self {
        Self {
            log_id,
            log_date_tim,
            code: FAILURE_CODE,
            msg: Some(msg.into()),
        }
    }
}

/// Outbound calls to the scheduler.
///
/// `register` retries transient connection failures with bounded spacing;
/// logical rejections (non-200 reply `code`) are returned immediately.
/// Callers of `callback` and `unregister` are expected to log-and-continue:
/// the dispatch engine must never stall on admin failures.
#[async_trait]
pub trait AdminClient: Send + Sync + 'static {
    /// Announce this executor under `app_name` at `executor_url`.
    async fn register(&self, app_name: &str, executor_url: &str) -> Result<(), AdminError>;

    /// Withdraw the announcement. Best-effort, single shot.
    async fn unregister(&self, app_name: &str, executor_url: &str) -> Result<(), AdminError>;

    /// Report the final status of one invocation.
    async fn callback(&self, callback: &TaskCallback) -> Result<(), AdminError>;
}
