// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake admin client for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::admin::{AdminClient, AdminError, TaskCallback};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCall {
    Register { key: String, value: String },
    Unregister { key: String, value: String },
    Callback(TaskCallback),
}

struct FakeAdminState {
    calls: Vec<AdminCall>,
}

/// Admin client that records calls instead of talking to a scheduler.
#[derive(Clone)]
pub struct FakeAdminClient {
    inner: Arc<Mutex<FakeAdminState>>,
    failing: Arc<AtomicBool>,
}

impl Default for FakeAdminClient {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeAdminState { calls: Vec::new() })),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl FakeAdminClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a logical rejection.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All recorded calls in arrival order.
    pub fn calls(&self) -> Vec<AdminCall> {
        self.inner.lock().calls.clone()
    }

    /// Recorded callbacks in arrival order.
    pub fn callbacks(&self) -> Vec<TaskCallback> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                AdminCall::Callback(cb) => Some(cb.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded register heartbeats.
    pub fn register_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|call| matches!(call, AdminCall::Register { .. }))
            .count()
    }

    fn record(&self, call: AdminCall) -> Result<(), AdminError> {
        self.inner.lock().calls.push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AdminError::Rejected {
                code: 500,
                msg: Some("fake admin failing".to_string()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AdminClient for FakeAdminClient {
    async fn register(&self, app_name: &str, executor_url: &str) -> Result<(), AdminError> {
        self.record(AdminCall::Register {
            key: app_name.to_string(),
            value: executor_url.to_string(),
        })
    }

    async fn unregister(&self, app_name: &str, executor_url: &str) -> Result<(), AdminError> {
        self.record(AdminCall::Unregister {
            key: app_name.to_string(),
            value: executor_url.to_string(),
        })
    }

    async fn callback(&self, callback: &TaskCallback) -> Result<(), AdminError> {
        self.record(AdminCall::Callback(callback.clone()))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
