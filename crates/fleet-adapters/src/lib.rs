// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! External collaborators: child-process spawning/signaling and the
//! embedding pipeline.

mod embedder;
#[cfg(feature = "test-support")]
mod fake_embedder;
mod process;

pub use embedder::{EmbedError, Embedder, HttpEmbedder, EMBED_TIMEOUT};
#[cfg(feature = "test-support")]
pub use fake_embedder::{FakeEmbedder, FAKE_EMBED_DIMENSION};
pub use process::{SpawnError, SpawnedChild};
