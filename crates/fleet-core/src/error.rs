// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy (spec §7). Every crate-local error type maps into
//! one of these kinds at the tool-surface boundary; domain code keeps its
//! own narrower `thiserror` enums (`RegistryError`, `SchedulerError`, ...)
//! and only converts here when crossing into the adapter that talks to
//! callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    NotFound,
    Conflict,
    PreconditionFailed,
    SpawnFailed,
    TerminationFailed,
    Timeout,
    StoreCorrupt,
    Internal,
}

/// A classified, user-facing error. Carries the kind used for transport
/// mapping plus a human-readable message.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct FleetError {
    pub kind: ErrorKind,
    pub message: String,
}

impl FleetError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PreconditionFailed, message)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
