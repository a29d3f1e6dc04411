// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level black-box scenarios, one file per seeded end-to-end
//! story. Each exercises two or more components together the way a real
//! client of `fleetd` would, rather than a single crate's unit surface.

#[path = "specs/queue_admission.rs"]
mod queue_admission;
#[path = "specs/retry_backoff.rs"]
mod retry_backoff;
#[path = "specs/log_ordering.rs"]
mod log_ordering;
#[path = "specs/cross_reference_rewrite.rs"]
mod cross_reference_rewrite;
#[path = "specs/vector_similarity_filter.rs"]
mod vector_similarity_filter;
#[path = "specs/hub_fan_out.rs"]
mod hub_fan_out;
