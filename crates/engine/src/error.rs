// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for registration and dispatch

use thiserror::Error;
use xj_core::RunDataError;

/// Errors raised while populating the handler registry. Fatal at boot.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("handler {0} already registered")]
    Duplicate(String),
}

/// Errors returned by [`Dispatcher::submit`](crate::Dispatcher::submit).
///
/// All of these surface to the scheduler as `code=500` with the message
/// as `msg`; none of them mean an invocation was started.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("handler {0} not found.")]
    HandlerNotFound(String),
    #[error("job {job_id} is already running, logId {log_id} has been discarded")]
    Duplicate { job_id: i64, log_id: i64 },
    #[error("job {job_id} serial queue is full (max {cap}), logId {log_id} has been discarded")]
    QueueFull { job_id: i64, log_id: i64, cap: usize },
    #[error(transparent)]
    InvalidRun(#[from] RunDataError),
}
