// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for engine unit tests.

use crate::context::{CancelFlag, TaskContext};
use crate::dispatch::{Dispatcher, DispatcherConfig};
use crate::registry::HandlerRegistry;
use std::sync::Arc;
use std::time::Duration;
use xj_adapters::FakeAdminClient;
use xj_core::{BlockStrategy, RunData};
use xj_logstore::{MemoryLogStore, TaskLogStore};

pub(crate) fn run_data(
    job_id: i64,
    log_id: i64,
    handler: &str,
    strategy: BlockStrategy,
) -> RunData {
    RunData {
        job_id,
        log_id,
        executor_handler: handler.to_string(),
        block_strategy: strategy,
        executor_params: None,
        executor_timeout: None,
        log_date_time: None,
        glue_type: None,
        glue_source: None,
        glue_updatetime: None,
        broadcast_index: None,
        broadcast_total: None,
    }
}

pub(crate) struct Harness {
    pub dispatcher: Arc<Dispatcher<FakeAdminClient>>,
    pub admin: FakeAdminClient,
    pub registry: Arc<HandlerRegistry>,
    pub logs: MemoryLogStore,
}

pub(crate) fn harness(config: DispatcherConfig) -> Harness {
    let registry = Arc::new(HandlerRegistry::new());
    let admin = FakeAdminClient::new();
    let logs = MemoryLogStore::new();
    let dispatcher = Dispatcher::new(
        config,
        Arc::clone(&registry),
        Arc::new(admin.clone()),
        Arc::new(logs.clone()),
    );
    Harness {
        dispatcher,
        admin,
        registry,
        logs,
    }
}

/// A context wired to a throwaway in-memory logger.
pub(crate) async fn noop_context() -> TaskContext {
    let logs = MemoryLogStore::new();
    let logger = logs.open_logger(1, 1).await;
    TaskContext::new(
        Arc::new(run_data(1, 1, "noop", BlockStrategy::Serial)),
        logger,
        CancelFlag::new(),
    )
}

/// Poll `condition` until it holds. Under `start_paused` runtimes the
/// sleeps auto-advance, so this is fast in virtual time too.
pub(crate) async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..2_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {what}");
}
