// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The embedding pipeline the fragment store maps `(title, body)` text
//! through (spec §4.6). The embedding model server is an external
//! collaborator (spec §1); this adapter only speaks HTTP to it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Per-request embedding timeout (spec §5 "Cancellation & timeouts").
pub const EMBED_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding request failed: {0}")]
    Transport(String),
    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),
    #[error("embedding service returned no vector")]
    EmptyResponse,
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    vector: Vec<f32>,
}

/// Calls an external embedding server over HTTP. Retries with linear
/// backoff up to `max_retries` attempts; a final failure fails the calling
/// store operation with no partial row inserted (spec §4.6 failure model).
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
    backoff: Duration,
}

impl HttpEmbedder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            max_retries: 3,
            backoff: Duration::from_millis(200),
        }
    }

    pub fn with_retry_policy(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff = backoff;
        self
    }

    async fn attempt(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let request = self.client.post(&self.endpoint).json(&EmbedRequest { input: text });
        let response = tokio::time::timeout(EMBED_TIMEOUT, request.send())
            .await
            .map_err(|_| EmbedError::Timeout(EMBED_TIMEOUT))?
            .map_err(|e| EmbedError::Transport(e.to_string()))?;

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::Transport(e.to_string()))?;
        if parsed.vector.is_empty() {
            return Err(EmbedError::EmptyResponse);
        }
        Ok(parsed.vector)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            match self.attempt(text).await {
                Ok(vector) => return Ok(vector),
                Err(e) => {
                    last_err = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.backoff * (attempt + 1)).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or(EmbedError::EmptyResponse))
    }
}

#[cfg(test)]
#[path = "embedder_tests.rs"]
mod tests;
