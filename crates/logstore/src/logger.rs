// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-invocation scoped logger.
//!
//! A [`TaskLogger`] is a cheap cloneable handle; rendered records flow
//! through an unbounded channel to a writer task that owns the backend
//! sink. Blocking handlers can therefore log without an async context,
//! and record order per `logId` is the send order.

use async_trait::async_trait;
use std::fmt;
use tokio::sync::{mpsc, oneshot};

/// Record severity. Records below the logger's level are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad() so width specifiers in the record format apply.
        f.pad(self.as_str())
    }
}

/// Destination for rendered records; one per open logger.
#[async_trait]
pub(crate) trait LogSink: Send {
    /// Persist one rendered record. Errors are the sink's to log and
    /// swallow; the task must keep running when its log storage is sick.
    async fn write_line(&mut self, level: LogLevel, line: &str);

    /// Flush and release backend resources.
    async fn close(&mut self) {}
}

/// Sink that drops everything. Stands in when a backend fails to open,
/// so the invocation still runs.
pub(crate) struct NullSink;

#[async_trait]
impl LogSink for NullSink {
    async fn write_line(&mut self, _level: LogLevel, _line: &str) {}
}

enum LoggerOp {
    Line { level: LogLevel, line: String },
    Close { ack: oneshot::Sender<()> },
}

/// Structured logger scoped to one invocation.
#[derive(Clone)]
pub struct TaskLogger {
    job_id: i64,
    log_id: i64,
    level: LogLevel,
    tx: mpsc::UnboundedSender<LoggerOp>,
}

impl TaskLogger {
    /// Spawn the writer task for `sink` and hand back the logger handle.
    pub(crate) fn spawn(
        job_id: i64,
        log_id: i64,
        level: LogLevel,
        sink: Box<dyn LogSink>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(rx, sink));
        Self {
            job_id,
            log_id,
            level,
            tx,
        }
    }

    pub fn job_id(&self) -> i64 {
        self.job_id
    }

    pub fn log_id(&self) -> i64 {
        self.log_id
    }

    pub fn debug(&self, msg: impl fmt::Display) {
        self.emit(LogLevel::Debug, &msg);
    }

    pub fn info(&self, msg: impl fmt::Display) {
        self.emit(LogLevel::Info, &msg);
    }

    pub fn warn(&self, msg: impl fmt::Display) {
        self.emit(LogLevel::Warn, &msg);
    }

    pub fn error(&self, msg: impl fmt::Display) {
        self.emit(LogLevel::Error, &msg);
    }

    fn emit(&self, level: LogLevel, msg: &dyn fmt::Display) {
        if level < self.level {
            return;
        }
        let ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let line = format!("{ts} {level:<5} [logId={}] {msg}", self.log_id);
        if self.tx.send(LoggerOp::Line { level, line }).is_err() {
            tracing::debug!(log_id = self.log_id, "task logger already closed, record dropped");
        }
    }

    /// Flush outstanding records and release the backend sink. Records
    /// sent through surviving clones after this point are dropped.
    pub async fn close(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(LoggerOp::Close { ack }).is_ok() {
            let _ = done.await;
        }
    }
}

async fn write_loop(mut rx: mpsc::UnboundedReceiver<LoggerOp>, mut sink: Box<dyn LogSink>) {
    loop {
        match rx.recv().await {
            Some(LoggerOp::Line { level, line }) => sink.write_line(level, &line).await,
            Some(LoggerOp::Close { ack }) => {
                sink.close().await;
                let _ = ack.send(());
                break;
            }
            // All handles dropped without an explicit close.
            None => {
                sink.close().await;
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
