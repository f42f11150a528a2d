// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP/JSON admin client over reqwest.

use crate::admin::{AdminClient, AdminError, TaskCallback};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ACCESS_TOKEN_HEADER: &str = "XXL-JOB-ACCESS-TOKEN";

const DEFAULT_RETRY_TIMES: u32 = 3;
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistryBody<'a> {
    registry_group: &'static str,
    registry_key: &'a str,
    registry_value: &'a str,
}

impl<'a> RegistryBody<'a> {
    fn executor(key: &'a str, value: &'a str) -> Self {
        Self {
            registry_group: "EXECUTOR",
            registry_key: key,
            registry_value: value,
        }
    }
}

/// Callback entry in both the flat and nested shapes, for scheduler
/// version compatibility.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CallbackEntry<'a> {
    log_id: i64,
    log_date_tim: i64,
    handle_code: i32,
    handle_msg: Option<&'a str>,
    execute_result: ExecuteResult<'a>,
}

#[derive(Serialize)]
struct ExecuteResult<'a> {
    code: i32,
    msg: Option<&'a str>,
}

impl<'a> From<&'a TaskCallback> for CallbackEntry<'a> {
    fn from(cb: &'a TaskCallback) -> Self {
        Self {
            log_id: cb.log_id,
            log_date_tim: cb.log_date_tim,
            handle_code: cb.code,
            handle_msg: cb.msg.as_deref(),
            execute_result: ExecuteResult {
                code: cb.code,
                msg: cb.msg.as_deref(),
            },
        }
    }
}

/// Reply envelope every admin endpoint uses.
#[derive(Deserialize)]
struct AdminReply {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
}

/// Admin client speaking the scheduler's REST protocol.
#[derive(Debug)]
pub struct HttpAdminClient {
    base_url: String,
    client: reqwest::Client,
    access_token: Option<String>,
    retry_times: u32,
    retry_interval: Duration,
}

impl HttpAdminClient {
    /// `base_url` must end in `/` (config validation guarantees it).
    pub fn new(
        base_url: impl Into<String>,
        access_token: Option<String>,
    ) -> Result<Self, AdminError> {
        let base_url = base_url.into();
        if !base_url.ends_with('/') {
            return Err(AdminError::Config(format!(
                "admin base url must end with '/', got {base_url:?}"
            )));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AdminError::Config(e.to_string()))?;
        Ok(Self {
            base_url,
            client,
            access_token,
            retry_times: DEFAULT_RETRY_TIMES,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        })
    }

    pub fn with_retry(mut self, retry_times: u32, retry_interval: Duration) -> Self {
        self.retry_times = retry_times.max(1);
        self.retry_interval = retry_interval;
        self
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<(), AdminError> {
        let url = format!("{}{path}", self.base_url);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let mut request = self.client.post(&url).json(body);
            if let Some(token) = &self.access_token {
                request = request.header(ACCESS_TOKEN_HEADER, token);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        return Err(AdminError::Status { status });
                    }
                    let reply: AdminReply =
                        response.json().await.map_err(AdminError::Decode)?;
                    if reply.code == 200 {
                        return Ok(());
                    }
                    // Logical rejection: retrying will not change the answer.
                    return Err(AdminError::Rejected {
                        code: reply.code,
                        msg: reply.msg,
                    });
                }
                Err(e) => {
                    let transient = e.is_connect() || e.is_timeout();
                    if transient && attempt < self.retry_times {
                        tracing::warn!(
                            url = %url,
                            attempt,
                            error = %e,
                            "admin call failed, retrying in {:?}",
                            self.retry_interval
                        );
                        tokio::time::sleep(self.retry_interval).await;
                        continue;
                    }
                    return Err(AdminError::Transport {
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }
}

#[async_trait]
impl AdminClient for HttpAdminClient {
    async fn register(&self, app_name: &str, executor_url: &str) -> Result<(), AdminError> {
        self.post("registry", &RegistryBody::executor(app_name, executor_url))
            .await?;
        tracing::debug!(app_name, executor_url, "registry heartbeat accepted");
        Ok(())
    }

    async fn unregister(&self, app_name: &str, executor_url: &str) -> Result<(), AdminError> {
        self.post(
            "registryRemove",
            &RegistryBody::executor(app_name, executor_url),
        )
        .await?;
        tracing::info!(app_name, executor_url, "registry entry removed");
        Ok(())
    }

    async fn callback(&self, callback: &TaskCallback) -> Result<(), AdminError> {
        let entries = [CallbackEntry::from(callback)];
        self.post("callback", &entries).await?;
        tracing::debug!(
            log_id = callback.log_id,
            code = callback.code,
            "task callback delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
