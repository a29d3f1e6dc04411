// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::time::Duration;

/// Resolve the daemon base URL: `FLEET_ADDR` > `http://<default ws_addr>`.
pub fn daemon_url() -> String {
    std::env::var("FLEET_ADDR").unwrap_or_else(|_| "http://127.0.0.1:4411".to_string())
}

/// Timeout for a single tool-call request.
pub fn timeout_request() -> Duration {
    std::env::var("FLEET_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(10))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
