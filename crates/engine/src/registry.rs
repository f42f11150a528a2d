// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler registry: the name-to-handler mapping populated at startup.

use crate::context::TaskContext;
use crate::error::RegistryError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future a registered async handler returns.
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send>>;

type AsyncHandlerFn = dyn Fn(TaskContext) -> HandlerFuture + Send + Sync;
type BlockingHandlerFn = dyn Fn(TaskContext) -> anyhow::Result<String> + Send + Sync;

/// Which execution path an invocation takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Awaited on the async worker set.
    Async,
    /// Submitted to the bounded blocking pool.
    Blocking,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerKind::Async => write!(f, "async"),
            HandlerKind::Blocking => write!(f, "blocking"),
        }
    }
}

/// A registered handler. Cloning is cheap; the function is shared.
#[derive(Clone)]
pub enum Handler {
    Async(Arc<AsyncHandlerFn>),
    Blocking(Arc<BlockingHandlerFn>),
}

impl Handler {
    pub fn kind(&self) -> HandlerKind {
        match self {
            Handler::Async(_) => HandlerKind::Async,
            Handler::Blocking(_) => HandlerKind::Blocking,
        }
    }
}

/// Concurrent name-to-handler mapping.
///
/// Writes happen at startup (later mutation is legal but rare); lookups
/// happen on every run request.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async handler under `name`. Fails if the name is taken.
    pub fn register_async<F, Fut>(&self, name: &str, handler: F) -> Result<(), RegistryError>
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        self.insert(
            name,
            Handler::Async(Arc::new(move |ctx| -> HandlerFuture {
                Box::pin(handler(ctx))
            })),
            false,
        )
    }

    /// Register a blocking handler under `name`. Fails if the name is taken.
    pub fn register_blocking<F>(&self, name: &str, handler: F) -> Result<(), RegistryError>
    where
        F: Fn(TaskContext) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.insert(name, Handler::Blocking(Arc::new(handler)), false)
    }

    /// Insert a handler, optionally replacing an existing one.
    pub fn insert(
        &self,
        name: &str,
        handler: Handler,
        replace: bool,
    ) -> Result<(), RegistryError> {
        let mut handlers = self.handlers.write();
        if !replace && handlers.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        tracing::debug!(name, kind = %handler.kind(), "handler registered");
        handlers.insert(name.to_string(), handler);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Handler> {
        self.handlers.read().get(name).cloned()
    }

    /// Snapshot of `(name, kind)` pairs, sorted by name.
    pub fn list(&self) -> Vec<(String, HandlerKind)> {
        let mut entries: Vec<(String, HandlerKind)> = self
            .handlers
            .read()
            .iter()
            .map(|(name, handler)| (name.clone(), handler.kind()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
