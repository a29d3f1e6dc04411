// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The process-orchestration engine: the registry that owns process
//! records, the supervisor that drives their lifecycle, the priority
//! scheduler that admits work into the supervisor, and the event bus they
//! all publish through.

mod event_bus;
mod registry;
mod scheduler;
mod supervisor;

pub use event_bus::{EventBus, Subscription, DEFAULT_CAPACITY};
pub use registry::{Page, ProcessFilter, ProcessRegistry, Sort, SortKey, SortOrder};
pub use scheduler::{
    cancel_running, Admission, Scheduler, SchedulerConfig, SchedulerError, SchedulerStatus, SubmitOptions,
    SubmitResult,
};
pub use supervisor::{StopOptions, Supervisor, DEFAULT_STOP_TIMEOUT_MS};
