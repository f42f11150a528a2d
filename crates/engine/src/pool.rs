// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded pool for blocking handlers.
//!
//! Admissions are capped at `limit` running plus `limit` queued; anything
//! beyond that is rejected immediately so a flood of blocking work cannot
//! queue unboundedly. The async dispatch path never runs here, so a
//! saturated pool cannot starve it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("blocking worker pool exhausted ({limit} running, {limit} queued)")]
    Saturated { limit: usize },
    #[error("blocking worker pool is shut down")]
    Closed,
    #[error("blocking handler panicked")]
    Panicked,
}

pub struct BlockingPool {
    semaphore: Arc<Semaphore>,
    admitted: Arc<AtomicUsize>,
    limit: usize,
}

/// Decrements the admitted count on every exit path, including the
/// caller's future being dropped while queued for a permit.
struct Admission(Arc<AtomicUsize>);

impl Drop for Admission {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl BlockingPool {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            admitted: Arc::new(AtomicUsize::new(0)),
            limit,
        }
    }

    /// Run `f` on a worker thread once a slot frees up.
    ///
    /// The slot is held until `f` returns, even if the caller stops
    /// waiting: a timed-out handler genuinely occupies its worker until
    /// it checks the cancel flag and exits.
    pub async fn run<T, F>(&self, f: F) -> Result<T, PoolError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let prior = self.admitted.fetch_add(1, Ordering::SeqCst);
        let admission = Admission(Arc::clone(&self.admitted));
        if prior >= self.limit * 2 {
            return Err(PoolError::Saturated { limit: self.limit });
        }

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        let result = tokio::task::spawn_blocking(move || {
            let value = f();
            drop(permit);
            drop(admission);
            value
        })
        .await;

        match result {
            Ok(value) => Ok(value),
            Err(e) if e.is_panic() => Err(PoolError::Panicked),
            Err(_) => Err(PoolError::Closed),
        }
    }

    /// Free worker slots right now.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
