// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task dispatch: per-job block-strategy state machine, invocation
//! lifecycle, cancellation, and shutdown.
//!
//! Locking model: one mutex per `jobId` (dispensed lazily from the jobs
//! map) guards that job's state machine; the map's own mutex is held only
//! to look slots up. Lock order is always map, then slot. No lock is ever
//! held across an await.

use crate::context::{CancelFlag, ContextGuard, TaskContext};
use crate::error::DispatchError;
use crate::pool::BlockingPool;
use crate::registry::{Handler, HandlerRegistry};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use xj_adapters::{AdminClient, TaskCallback};
use xj_core::{epoch_ms, BlockStrategy, ExecutorConfig, RunData};
use xj_logstore::TaskLogStore;

/// Dispatch knobs, usually derived from [`ExecutorConfig`].
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Default per-task timeout; a positive `executorTimeout` on the run
    /// request wins.
    pub task_timeout: Duration,
    /// Per-job pending queue cap for SERIAL_EXECUTION.
    pub task_queue_length: usize,
    /// Blocking worker pool size.
    pub max_workers: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            task_timeout: Duration::from_secs(600),
            task_queue_length: 30,
            max_workers: 30,
        }
    }
}

impl From<&ExecutorConfig> for DispatcherConfig {
    fn from(config: &ExecutorConfig) -> Self {
        Self {
            task_timeout: Duration::from_secs(config.task_timeout),
            task_queue_length: config.task_queue_length,
            max_workers: config.max_workers,
        }
    }
}

/// What `submit` did with an accepted run request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Spawned immediately.
    Running,
    /// Appended to the serial queue at this 1-based position.
    Queued { position: usize },
    /// Enqueued and the in-flight invocation is being cancelled.
    Replaced,
}

impl fmt::Display for SubmitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitOutcome::Running => write!(f, "Running"),
            SubmitOutcome::Queued { position } => write!(f, "queued at position {position}"),
            SubmitOutcome::Replaced => write!(f, "replaced running invocation"),
        }
    }
}

/// Bookkeeping for the one in-flight invocation of a job.
struct Running {
    log_id: i64,
    /// Cooperative cancellation for the async execution path.
    cancel: CancellationToken,
    /// Set/test primitive polled by blocking handlers.
    flag: CancelFlag,
    /// Latch the invocation trips once its finish protocol completed.
    done: CancellationToken,
}

#[derive(Default)]
struct JobState {
    running: Option<Running>,
    pending: VecDeque<Arc<RunData>>,
    /// Set when the slot was dropped from the jobs map; a submit holding
    /// a stale handle must fetch a fresh slot instead of reviving this one.
    retired: bool,
}

#[derive(Default)]
struct JobSlot {
    state: Mutex<JobState>,
}

enum Outcome {
    Success(String),
    Cancelled,
    TimedOut,
    Failed(String),
}

/// The dispatch engine.
pub struct Dispatcher<A: AdminClient> {
    registry: Arc<HandlerRegistry>,
    admin: Arc<A>,
    logs: Arc<dyn TaskLogStore>,
    jobs: Mutex<HashMap<i64, Arc<JobSlot>>>,
    pool: BlockingPool,
    config: DispatcherConfig,
}

impl<A: AdminClient> Dispatcher<A> {
    pub fn new(
        config: DispatcherConfig,
        registry: Arc<HandlerRegistry>,
        admin: Arc<A>,
        logs: Arc<dyn TaskLogStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            admin,
            logs,
            jobs: Mutex::new(HashMap::new()),
            pool: BlockingPool::new(config.max_workers),
            config,
        })
    }

    /// Accept a run request from the scheduler.
    ///
    /// Spawns immediately when the job is idle; otherwise the run's block
    /// strategy decides between rejection, queueing, and replacement.
    pub fn submit(self: &Arc<Self>, run_data: RunData) -> Result<SubmitOutcome, DispatchError> {
        run_data.validate()?;
        let handler = self
            .registry
            .lookup(&run_data.executor_handler)
            .ok_or_else(|| DispatchError::HandlerNotFound(run_data.executor_handler.clone()))?;
        let run = Arc::new(run_data);

        loop {
            let slot = {
                let mut jobs = self.jobs.lock();
                Arc::clone(jobs.entry(run.job_id).or_default())
            };
            let mut state = slot.state.lock();
            if state.retired {
                // Lost a race with slot cleanup; take a fresh slot.
                continue;
            }

            if state.running.is_none() && state.pending.is_empty() {
                self.spawn_invocation(&mut state, handler.clone(), Arc::clone(&run));
                return Ok(SubmitOutcome::Running);
            }

            return match run.block_strategy {
                BlockStrategy::DiscardLater => {
                    tracing::info!(
                        job_id = run.job_id,
                        log_id = run.log_id,
                        "job already executing, discarding later run"
                    );
                    Err(DispatchError::Duplicate {
                        job_id: run.job_id,
                        log_id: run.log_id,
                    })
                }
                BlockStrategy::CoverEarly => {
                    // Always enqueues, even past the serial cap: the
                    // strategy's contract is that the newest run must run.
                    tracing::warn!(
                        job_id = run.job_id,
                        log_id = run.log_id,
                        "COVER_EARLY replacing running invocation"
                    );
                    state.pending.push_back(Arc::clone(&run));
                    let replaced = state.running.as_ref().map(|running| running.log_id);
                    drop(state);
                    if let Some(replaced_log_id) = replaced {
                        let this = Arc::clone(self);
                        let job_id = run.job_id;
                        // The cancelled invocation's finish protocol
                        // promotes the queued replacement.
                        tokio::spawn(async move {
                            this.cancel_invocation(job_id, replaced_log_id).await;
                        });
                    }
                    Ok(SubmitOutcome::Replaced)
                }
                BlockStrategy::Serial => {
                    if state.pending.len() >= self.config.task_queue_length {
                        tracing::error!(
                            job_id = run.job_id,
                            log_id = run.log_id,
                            cap = self.config.task_queue_length,
                            "serial queue full, discarding run"
                        );
                        return Err(DispatchError::QueueFull {
                            job_id: run.job_id,
                            log_id: run.log_id,
                            cap: self.config.task_queue_length,
                        });
                    }
                    state.pending.push_back(Arc::clone(&run));
                    let position = state.pending.len();
                    tracing::info!(
                        job_id = run.job_id,
                        log_id = run.log_id,
                        position,
                        "queued serial invocation"
                    );
                    Ok(SubmitOutcome::Queued { position })
                }
            };
        }
    }

    /// True iff an invocation is in flight for `job_id` (queued runs do
    /// not count).
    pub fn is_running(&self, job_id: i64) -> bool {
        let slot = match self.jobs.lock().get(&job_id) {
            Some(slot) => Arc::clone(slot),
            None => return false,
        };
        let state = slot.state.lock();
        state.running.is_some()
    }

    /// Cancel the running invocation for `job_id`; with `include_queue`,
    /// also discard every pending run (discarded runs never produce a
    /// callback, because they never started).
    pub async fn cancel(&self, job_id: i64, include_queue: bool) {
        let slot = match self.jobs.lock().get(&job_id) {
            Some(slot) => Arc::clone(slot),
            None => return,
        };
        let waiter = {
            let mut state = slot.state.lock();
            if include_queue {
                for dropped in state.pending.drain(..) {
                    tracing::info!(
                        job_id,
                        log_id = dropped.log_id,
                        "discarding queued invocation"
                    );
                }
            }
            state.running.as_ref().map(|running| {
                running.flag.set();
                running.cancel.cancel();
                running.done.clone()
            })
        };
        match waiter {
            // Await outside the lock: the finish protocol takes it.
            Some(done) => done.cancelled().await,
            None => self.drop_slot_if_idle(job_id, &slot),
        }
    }

    /// Cancel the running invocation only if it is still the one observed
    /// at replacement time; a natural completion in the window between
    /// enqueue and cancel must not kill the promoted replacement.
    async fn cancel_invocation(&self, job_id: i64, log_id: i64) {
        let slot = match self.jobs.lock().get(&job_id) {
            Some(slot) => Arc::clone(slot),
            None => return,
        };
        let waiter = {
            let state = slot.state.lock();
            state
                .running
                .as_ref()
                .filter(|running| running.log_id == log_id)
                .map(|running| {
                    running.flag.set();
                    running.cancel.cancel();
                    running.done.clone()
                })
        };
        if let Some(done) = waiter {
            done.cancelled().await;
        }
    }

    /// Cancel everything and drop all queues.
    pub fn shutdown_now(&self) {
        let slots: Vec<(i64, Arc<JobSlot>)> = self
            .jobs
            .lock()
            .iter()
            .map(|(id, slot)| (*id, Arc::clone(slot)))
            .collect();
        for (job_id, slot) in slots {
            let mut state = slot.state.lock();
            let dropped = state.pending.len();
            state.pending.clear();
            if dropped > 0 {
                tracing::info!(job_id, dropped, "dropped pending queue on shutdown");
            }
            if let Some(running) = state.running.as_ref() {
                tracing::info!(job_id, log_id = running.log_id, "cancelling on shutdown");
                running.flag.set();
                running.cancel.cancel();
            }
        }
    }

    /// Let running and queued work drain; after `timeout`, escalate to
    /// [`shutdown_now`](Self::shutdown_now).
    pub async fn shutdown_graceful(&self, timeout: Duration) {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if !self.has_work() {
                return;
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!("graceful shutdown deadline reached, forcing cancellation");
                self.shutdown_now();
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Any invocation running or queued, on any job.
    pub fn has_work(&self) -> bool {
        let slots: Vec<Arc<JobSlot>> = self.jobs.lock().values().cloned().collect();
        slots.iter().any(|slot| {
            let state = slot.state.lock();
            state.running.is_some() || !state.pending.is_empty()
        })
    }

    /// Spawn an invocation for `run`. Caller holds the job's state lock.
    fn spawn_invocation(
        self: &Arc<Self>,
        state: &mut JobState,
        handler: Handler,
        run: Arc<RunData>,
    ) {
        let cancel = CancellationToken::new();
        let flag = CancelFlag::new();
        let done = CancellationToken::new();
        state.running = Some(Running {
            log_id: run.log_id,
            cancel: cancel.clone(),
            flag: flag.clone(),
            done,
        });
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run_invocation(handler, run, cancel, flag).await;
        });
    }

    async fn run_invocation(
        self: Arc<Self>,
        handler: Handler,
        run: Arc<RunData>,
        cancel: CancellationToken,
        flag: CancelFlag,
    ) {
        let start_ms = epoch_ms();
        let logger = self.logs.open_logger(run.job_id, run.log_id).await;
        let ctx = TaskContext::new(Arc::clone(&run), logger.clone(), flag.clone());
        let timeout =
            Duration::from_secs(run.effective_timeout(self.config.task_timeout.as_secs()));

        // The task transcript belongs to the handler; engine-side progress
        // goes to the executor's own log.
        tracing::info!(
            job_id = run.job_id,
            log_id = run.log_id,
            handler = %run.executor_handler,
            kind = %handler.kind(),
            "task started"
        );

        let outcome = self.execute(handler, ctx, timeout, &cancel, &flag).await;

        let callback = match outcome {
            Outcome::Success(msg) => {
                tracing::info!(job_id = run.job_id, log_id = run.log_id, "task finished");
                TaskCallback::success(run.log_id, start_ms, msg)
            }
            Outcome::Cancelled => {
                tracing::warn!(job_id = run.job_id, log_id = run.log_id, "task cancelled");
                TaskCallback::failure(run.log_id, start_ms, "CancelledError")
            }
            Outcome::TimedOut => {
                tracing::error!(
                    job_id = run.job_id,
                    log_id = run.log_id,
                    timeout_secs = timeout.as_secs(),
                    "task timed out"
                );
                TaskCallback::failure(run.log_id, start_ms, "TimeoutError")
            }
            Outcome::Failed(msg) => {
                tracing::error!(
                    job_id = run.job_id,
                    log_id = run.log_id,
                    error = %msg,
                    "task failed"
                );
                TaskCallback::failure(run.log_id, start_ms, msg)
            }
        };

        logger.close().await;

        // Callback before the finish protocol promotes the next pending
        // run, so per-job callback order matches submission order. The
        // client's retries are bounded; a dead admin cannot stall the job.
        if let Err(e) = self.admin.callback(&callback).await {
            tracing::error!(log_id = run.log_id, error = %e, "task callback failed");
        }

        self.finish(run.job_id);
    }

    async fn execute(
        &self,
        handler: Handler,
        ctx: TaskContext,
        timeout: Duration,
        cancel: &CancellationToken,
        flag: &CancelFlag,
    ) -> Outcome {
        let work = async {
            match handler {
                Handler::Async(f) => f(ctx.clone()).await,
                Handler::Blocking(f) => {
                    let call_ctx = ctx.clone();
                    let result = self
                        .pool
                        .run(move || {
                            let _guard = ContextGuard::enter(call_ctx.clone());
                            f(call_ctx)
                        })
                        .await;
                    match result {
                        Ok(handler_result) => handler_result,
                        Err(pool_error) => Err(anyhow::Error::new(pool_error)),
                    }
                }
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => Outcome::Cancelled,
            result = tokio::time::timeout(timeout, work) => match result {
                Ok(Ok(msg)) => Outcome::Success(msg),
                Ok(Err(e)) => Outcome::Failed(e.to_string()),
                Err(_) => {
                    // Blocking handlers learn about the timeout through
                    // the flag; the detached worker exits at its next poll.
                    flag.set();
                    Outcome::TimedOut
                }
            },
        }
    }

    /// Finish protocol: clear the running entry, promote the queue head,
    /// drop the slot when fully idle. The spawn happens under the lock so
    /// no parallel submit mistakes the handover gap for a free slot.
    fn finish(self: &Arc<Self>, job_id: i64) {
        let slot = match self.jobs.lock().get(&job_id) {
            Some(slot) => Arc::clone(slot),
            None => return,
        };
        let done = {
            let mut state = slot.state.lock();
            let done = state.running.take().map(|running| running.done);
            while let Some(next) = state.pending.pop_front() {
                match self.registry.lookup(&next.executor_handler) {
                    Some(handler) => {
                        tracing::info!(
                            job_id,
                            log_id = next.log_id,
                            remaining = state.pending.len(),
                            "promoting queued invocation"
                        );
                        self.spawn_invocation(&mut state, handler, next);
                        break;
                    }
                    None => {
                        // The registry changed underneath a queued run;
                        // report it so the accepted run still gets its
                        // one callback.
                        tracing::error!(
                            job_id,
                            log_id = next.log_id,
                            handler = %next.executor_handler,
                            "queued handler no longer registered"
                        );
                        let this = Arc::clone(self);
                        let name = next.executor_handler.clone();
                        let log_id = next.log_id;
                        tokio::spawn(async move {
                            let cb = TaskCallback::failure(
                                log_id,
                                epoch_ms(),
                                format!("handler {name} not found."),
                            );
                            if let Err(e) = this.admin.callback(&cb).await {
                                tracing::error!(log_id, error = %e, "task callback failed");
                            }
                        });
                    }
                }
            }
            done
        };
        self.drop_slot_if_idle(job_id, &slot);
        if let Some(done) = done {
            done.cancel();
        }
    }

    /// Drop the map entry for a fully idle job, marking the slot retired
    /// so a submit holding a stale handle re-fetches instead of reviving it.
    fn drop_slot_if_idle(&self, job_id: i64, slot: &Arc<JobSlot>) {
        let mut jobs = self.jobs.lock();
        let mut state = slot.state.lock();
        if state.running.is_none() && state.pending.is_empty() && !state.retired {
            state.retired = true;
            jobs.remove(&job_id);
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
