// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

define_id! {
    pub struct TestId;
}

#[test]
fn short_truncates_long_ids() {
    let id = TestId::new("0123456789abcdef");
    assert_eq!(id.short(8), "01234567");
}

#[test]
fn short_leaves_short_ids_untouched() {
    let id = TestId::new("abc");
    assert_eq!(id.short(8), "abc");
}

#[test]
fn sequential_id_gen_increments() {
    let gen = SequentialIdGen::new("p");
    assert_eq!(gen.next(), "p-1");
    assert_eq!(gen.next(), "p-2");
}

#[test]
fn uuid_id_gen_produces_distinct_ids() {
    let gen = UuidIdGen;
    assert_ne!(gen.next(), gen.next());
}

#[test]
fn display_and_string_conversions_round_trip() {
    let id: TestId = "abc".into();
    assert_eq!(id.to_string(), "abc");
    assert_eq!(id, "abc");
}
