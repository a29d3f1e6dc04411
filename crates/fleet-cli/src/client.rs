// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client: a thin HTTP wrapper that mirrors the tool surface, the
//! way the teacher's `oj::client::DaemonClient` mirrors its IPC protocol.

use serde_json::Value;
use thiserror::Error;

use crate::env;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not reachable at {0}: {1}")]
    Unreachable(String, reqwest::Error),
    #[error("daemon returned an error: {0}")]
    Daemon(Value),
    #[error("malformed daemon response: {0}")]
    MalformedResponse(reqwest::Error),
}

pub struct DaemonClient {
    http: reqwest::Client,
    base_url: String,
}

impl DaemonClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder().timeout(env::timeout_request()).build().unwrap_or_default(),
            base_url: env::daemon_url(),
        }
    }

    pub async fn list_tools(&self) -> Result<Value, ClientError> {
        let url = format!("{}/tools", self.base_url);
        let response = self.http.get(&url).send().await.map_err(|e| ClientError::Unreachable(url, e))?;
        response.json().await.map_err(ClientError::MalformedResponse)
    }

    pub async fn call_tool(&self, name: &str, args: Value) -> Result<Value, ClientError> {
        let url = format!("{}/tools/{name}", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&args)
            .send()
            .await
            .map_err(|e| ClientError::Unreachable(url, e))?;
        let body: Value = response.json().await.map_err(ClientError::MalformedResponse)?;
        if body.get("error").is_some() {
            return Err(ClientError::Daemon(body));
        }
        Ok(body)
    }
}

impl Default for DaemonClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
