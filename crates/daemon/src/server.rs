// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound HTTP surface for the scheduler.
//!
//! Every reply is HTTP 200 with a `{code, msg[, content]}` body; protocol
//! errors travel as `code=500` with the explanation in `msg`.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use xj_adapters::AdminClient;
use xj_core::RunData;
use xj_engine::Dispatcher;
use xj_logstore::{LogPage, LogRequest, TaskLogStore};

/// Shared state behind the scheduler-facing routes.
pub struct ServerCtx<A: AdminClient> {
    pub dispatcher: Arc<Dispatcher<A>>,
    pub logs: Arc<dyn TaskLogStore>,
}

#[derive(Debug, Serialize)]
struct Reply<T: Serialize = ()> {
    code: i64,
    msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<T>,
}

impl Reply<()> {
    fn ok() -> Json<Self> {
        Json(Self {
            code: 200,
            msg: None,
            content: None,
        })
    }

    fn ok_msg(msg: impl Into<String>) -> Json<Self> {
        Json(Self {
            code: 200,
            msg: Some(msg.into()),
            content: None,
        })
    }

    fn error(msg: impl Into<String>) -> Json<Self> {
        Json(Self {
            code: 500,
            msg: Some(msg.into()),
            content: None,
        })
    }
}

impl<T: Serialize> Reply<T> {
    fn ok_content(content: T) -> Json<Self> {
        Json(Self {
            code: 200,
            msg: None,
            content: Some(content),
        })
    }
}

#[derive(Debug, Deserialize)]
struct JobIdBody {
    #[serde(rename = "jobId")]
    job_id: i64,
}

/// Build the scheduler-facing router.
pub fn router<A: AdminClient>(ctx: Arc<ServerCtx<A>>) -> Router {
    Router::new()
        .route("/beat", post(beat))
        .route("/idleBeat", post(idle_beat::<A>))
        .route("/run", post(run::<A>))
        .route("/kill", post(kill::<A>))
        .route("/log", post(log::<A>))
        .with_state(ctx)
}

async fn beat() -> Json<Reply> {
    tracing::debug!("beat");
    Reply::ok()
}

async fn idle_beat<A: AdminClient>(
    State(ctx): State<Arc<ServerCtx<A>>>,
    Json(body): Json<JobIdBody>,
) -> Json<Reply> {
    if ctx.dispatcher.is_running(body.job_id) {
        return Reply::error(format!("job {} is running.", body.job_id));
    }
    Reply::ok()
}

async fn run<A: AdminClient>(
    State(ctx): State<Arc<ServerCtx<A>>>,
    Json(body): Json<Value>,
) -> Json<Reply> {
    // Parse by hand so malformed payloads (unknown block strategy
    // included) come back as a protocol-level 500, not a transport error.
    let run_data: RunData = match serde_json::from_value(body) {
        Ok(run_data) => run_data,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting malformed run request");
            return Reply::error(format!("invalid run request: {e}"));
        }
    };

    tracing::info!(
        job_id = run_data.job_id,
        log_id = run_data.log_id,
        handler = %run_data.executor_handler,
        strategy = %run_data.block_strategy,
        "run request accepted for dispatch"
    );

    match ctx.dispatcher.submit(run_data) {
        Ok(outcome) => Reply::ok_msg(outcome.to_string()),
        Err(e) => Reply::error(e.to_string()),
    }
}

async fn kill<A: AdminClient>(
    State(ctx): State<Arc<ServerCtx<A>>>,
    Json(body): Json<JobIdBody>,
) -> Json<Reply> {
    tracing::info!(job_id = body.job_id, "kill requested");
    ctx.dispatcher.cancel(body.job_id, true).await;
    Reply::ok()
}

async fn log<A: AdminClient>(
    State(ctx): State<Arc<ServerCtx<A>>>,
    Json(request): Json<LogRequest>,
) -> Json<Reply<LogPage>> {
    tracing::debug!(log_id = request.log_id, from = request.from_line_num, "log page requested");
    let page = ctx.logs.read_page(&request).await;
    Reply::ok_content(page)
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
