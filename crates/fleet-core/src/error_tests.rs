// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn constructors_set_expected_kind() {
    assert_eq!(FleetError::not_found("x").kind, ErrorKind::NotFound);
    assert_eq!(FleetError::invalid("x").kind, ErrorKind::InvalidRequest);
    assert_eq!(FleetError::conflict("x").kind, ErrorKind::Conflict);
    assert_eq!(
        FleetError::precondition("x").kind,
        ErrorKind::PreconditionFailed
    );
}

#[test]
fn display_uses_message_only() {
    let err = FleetError::new(ErrorKind::Internal, "boom");
    assert_eq!(err.to_string(), "boom");
}
