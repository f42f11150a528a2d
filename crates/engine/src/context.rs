// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-invocation context handed to handler code.
//!
//! Async handlers receive the [`TaskContext`] as their argument. For
//! blocking handlers the engine additionally installs it in thread-local
//! storage for the duration of the call, so helper code deep in a call
//! stack can reach it via [`TaskContext::current`] without parameter
//! threading.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use xj_core::RunData;
use xj_logstore::TaskLogger;

/// Single-shot set/test cancellation primitive.
///
/// The engine sets it on cancel and on timeout; blocking handlers are
/// expected to poll it between computational steps. A handler that never
/// polls keeps its pool worker busy until it finishes naturally.
#[derive(Clone, Debug)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for CancelFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything an invocation's handler can reach: the run request, the
/// scoped task logger, and the cancellation flag.
#[derive(Clone)]
pub struct TaskContext {
    run_data: Arc<RunData>,
    logger: TaskLogger,
    cancel: CancelFlag,
}

thread_local! {
    static CURRENT: RefCell<Option<TaskContext>> = const { RefCell::new(None) };
}

impl TaskContext {
    pub fn new(run_data: Arc<RunData>, logger: TaskLogger, cancel: CancelFlag) -> Self {
        Self {
            run_data,
            logger,
            cancel,
        }
    }

    /// The context installed for the current blocking handler call, if any.
    pub fn current() -> Option<TaskContext> {
        CURRENT.with(|current| current.borrow().clone())
    }

    pub fn run_data(&self) -> &RunData {
        &self.run_data
    }

    pub fn job_id(&self) -> i64 {
        self.run_data.job_id
    }

    pub fn log_id(&self) -> i64 {
        self.run_data.log_id
    }

    /// Opaque params string from the scheduler, if any.
    pub fn params(&self) -> Option<&str> {
        self.run_data.executor_params.as_deref()
    }

    pub fn logger(&self) -> &TaskLogger {
        &self.logger
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_set()
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }
}

/// Installs a context into thread-local storage, restoring the previous
/// one on drop. Scoped to one blocking handler call.
pub(crate) struct ContextGuard {
    previous: Option<TaskContext>,
}

impl ContextGuard {
    pub(crate) fn enter(ctx: TaskContext) -> Self {
        let previous = CURRENT.with(|current| current.borrow_mut().replace(ctx));
        Self { previous }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
