// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic, dependency-free embedder for tests (`test-support`
//! feature). Maps text to a small bag-of-words vector so semantically
//! similar strings score as similar without a real embedding server.

use crate::embedder::{EmbedError, Embedder};
use async_trait::async_trait;

pub const FAKE_EMBED_DIMENSION: usize = 32;

/// Hashes each word of the input into a bucket of a fixed-size vector and
/// L2-normalizes the result. Two strings sharing vocabulary score closer
/// under cosine similarity than two that share nothing.
pub struct FakeEmbedder;

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vector = vec![0.0f32; FAKE_EMBED_DIMENSION];
        for word in text.to_lowercase().split_whitespace() {
            let bucket = word_bucket(word);
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

fn word_bucket(word: &str) -> usize {
    let mut hash: u64 = 1469598103934665603;
    for byte in word.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    (hash as usize) % FAKE_EMBED_DIMENSION
}

#[cfg(test)]
#[path = "fake_embedder_tests.rs"]
mod tests;
