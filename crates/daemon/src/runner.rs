// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner: constructs the component stack, owns the periodic loops, and
//! drives orderly startup and shutdown.

use crate::server::{router, ServerCtx};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use xj_adapters::{AdminClient, AdminError};
use xj_core::{ConfigError, ExecutorConfig, LogBackend};
use xj_engine::{Dispatcher, DispatcherConfig, HandlerRegistry};
use xj_logstore::{
    DiskLogStore, LogLevel, LogStoreError, RedisLogStore, SqliteLogStore, TaskLogStore,
};

/// The admin marks a silent executor offline, so the heartbeat must keep
/// firing for the lifetime of the process.
const REGISTRATION_INTERVAL: Duration = Duration::from_secs(10);

/// Log expiry cadence.
const EXPIRY_INTERVAL: Duration = Duration::from_secs(3_600);

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    LogStore(#[from] LogStoreError),
    #[error(transparent)]
    Admin(#[from] AdminError),
    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the task log store selected by the configuration.
pub async fn build_log_store(
    config: &ExecutorConfig,
) -> Result<Arc<dyn TaskLogStore>, RunnerError> {
    let level = if config.debug {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let store: Arc<dyn TaskLogStore> = match config.log_backend {
        LogBackend::Disk => Arc::new(
            DiskLogStore::new(&config.log_local_dir, config.log_expired_days)?.with_level(level),
        ),
        LogBackend::Sqlite => Arc::new(
            SqliteLogStore::new(&config.log_local_dir, config.log_expired_days)?
                .with_level(level),
        ),
        LogBackend::Redis => {
            // Validation guarantees the URI is present for this backend.
            let uri = config.log_redis_uri.as_deref().unwrap_or_default();
            Arc::new(
                RedisLogStore::connect(uri, &config.app_name, config.log_expired_days)
                    .await?
                    .with_level(level),
            )
        }
    };
    Ok(store)
}

/// One executor instance: dispatcher, log store, admin client, HTTP server.
pub struct Runner<A: AdminClient> {
    config: ExecutorConfig,
    registry: Arc<HandlerRegistry>,
    admin: Arc<A>,
    logs: Arc<dyn TaskLogStore>,
    dispatcher: Arc<Dispatcher<A>>,
}

impl<A: AdminClient> Runner<A> {
    pub fn new(
        config: ExecutorConfig,
        registry: Arc<HandlerRegistry>,
        admin: Arc<A>,
        logs: Arc<dyn TaskLogStore>,
    ) -> Self {
        let dispatcher = Dispatcher::new(
            DispatcherConfig::from(&config),
            Arc::clone(&registry),
            Arc::clone(&admin),
            Arc::clone(&logs),
        );
        Self {
            config,
            registry,
            admin,
            logs,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher<A>> {
        Arc::clone(&self.dispatcher)
    }

    /// Serve the scheduler until `shutdown` resolves, then tear down in
    /// order: stop intake, stop the heartbeat, unregister, drain or
    /// cancel the engine, stop expiry.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), RunnerError> {
        let handlers = self.registry.list();
        if handlers.is_empty() {
            tracing::warn!("starting with an empty handler registry");
        } else {
            let described: Vec<String> = handlers
                .iter()
                .map(|(name, kind)| format!("{name} ({kind})"))
                .collect();
            tracing::info!(handlers = %described.join(", "), "registered handlers");
        }

        let register_task = self.spawn_register_loop();
        let expiry_task = self.spawn_expiry_loop();

        let ctx = Arc::new(ServerCtx {
            dispatcher: Arc::clone(&self.dispatcher),
            logs: Arc::clone(&self.logs),
        });
        let app = router(ctx);
        let addr = format!("{}:{}", self.config.listen_host, self.config.listen_port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!(addr = %addr, "executor listening");

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        self.teardown(register_task, expiry_task).await;
        served?;
        Ok(())
    }

    /// Heartbeat loop; the first tick fires immediately so the executor
    /// is registered as soon as it starts.
    fn spawn_register_loop(&self) -> JoinHandle<()> {
        let admin = Arc::clone(&self.admin);
        let app_name = self.config.app_name.clone();
        let executor_url = self.config.advertise_url();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REGISTRATION_INTERVAL);
            loop {
                ticker.tick().await;
                if let Err(e) = admin.register(&app_name, &executor_url).await {
                    tracing::warn!(error = %e, "registry heartbeat failed");
                }
            }
        })
    }

    fn spawn_expiry_loop(&self) -> JoinHandle<()> {
        let logs = Arc::clone(&self.logs);
        tokio::spawn(async move {
            logs.expire_loop(EXPIRY_INTERVAL).await;
        })
    }

    async fn teardown(&self, register_task: JoinHandle<()>, expiry_task: JoinHandle<()>) {
        tracing::info!("shutting down executor");
        register_task.abort();

        if let Err(e) = self
            .admin
            .unregister(&self.config.app_name, &self.config.advertise_url())
            .await
        {
            tracing::warn!(error = %e, "registry removal failed");
        }

        if self.config.graceful_close {
            self.dispatcher
                .shutdown_graceful(Duration::from_secs(self.config.graceful_timeout))
                .await;
        } else {
            self.dispatcher.shutdown_now();
        }

        expiry_task.abort();
        tracing::info!("executor stopped");
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
