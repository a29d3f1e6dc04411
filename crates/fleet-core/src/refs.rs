// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical `[[ID]]` cross-reference scanner (spec §3.4, §9 redesign note:
//! "a single canonical scanner returning all spans with positions; all
//! higher-level helpers consume its output"). `parseRefs`, `resolveRefs`,
//! `findBroken`, `rename`, and the syntax linter all build on [`scan`].

use serde::{Deserialize, Serialize};

/// One `[[ID]]` occurrence found in a body of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefSpan {
    pub id: String,
    /// Byte offset of the opening `[`.
    pub position: usize,
    /// Byte length of the full `[[ID]]` token.
    pub length: usize,
}

impl RefSpan {
    /// The entry-kind prefix, e.g. `"ISSUE"` out of `"ISSUE_42"`.
    pub fn prefix(&self) -> &str {
        self.id.split('_').next().unwrap_or(&self.id)
    }
}

/// Scans `text` for well-formed references matching `[A-Z]+_\d+` inside
/// double brackets. Case-sensitive; malformed brackets are not reported here
/// (see [`validate_syntax`] for the linter).
pub fn scan(text: &str) -> Vec<RefSpan> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'[' && bytes[i + 1] == b'[' {
            if let Some(close) = text[i + 2..].find("]]") {
                let candidate = &text[i + 2..i + 2 + close];
                if is_well_formed_id(candidate) {
                    spans.push(RefSpan {
                        id: candidate.to_string(),
                        position: i,
                        length: close + 4,
                    });
                    i += close + 4;
                    continue;
                }
            }
        }
        i += 1;
    }
    spans
}

/// `true` iff `s` matches `^[A-Z]+_\d+$`.
pub fn is_well_formed_id(s: &str) -> bool {
    let Some((prefix, number)) = s.split_once('_') else {
        return false;
    };
    !prefix.is_empty()
        && prefix.chars().all(|c| c.is_ascii_uppercase())
        && !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit())
}

/// A resolved reference: whether the target id is known to exist, per
/// `existsFn` (spec §4.5 `resolveRefs`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRef {
    pub id: String,
    pub exists: bool,
}

pub fn resolve_refs(text: &str, exists: impl Fn(&str) -> bool) -> Vec<ResolvedRef> {
    scan(text)
        .into_iter()
        .map(|span| ResolvedRef {
            exists: exists(&span.id),
            id: span.id,
        })
        .collect()
}

/// Rewrites every `[[old_id]]` occurrence in `text` to `[[new_id]]`. Pure
/// text transform; callers perform the atomic per-file rewrite
/// (spec §4.5 `rename`, `dryRun` is just "don't call this").
pub fn rewrite_refs(text: &str, old_id: &str, new_id: &str) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut count = 0;
    for span in scan(text) {
        if span.id == old_id {
            out.push_str(&text[last..span.position]);
            out.push_str("[[");
            out.push_str(new_id);
            out.push_str("]]");
            last = span.position + span.length;
            count += 1;
        }
    }
    out.push_str(&text[last..]);
    (out, count)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxIssue {
    pub position: usize,
    pub length: usize,
    pub message: String,
    pub suggestion: Option<String>,
}

/// Flags common near-miss patterns without double-reporting valid
/// `[[TYPE_N]]` spans already captured by [`scan`] (spec §4.5 linter).
pub fn validate_syntax(text: &str) -> Vec<SyntaxIssue> {
    let valid: Vec<(usize, usize)> = scan(text).into_iter().map(|s| (s.position, s.length)).collect();
    let is_inside_valid = |pos: usize| valid.iter().any(|(p, l)| pos >= *p && pos < p + l);

    let mut issues = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if is_inside_valid(i) {
            i += 1;
            continue;
        }
        if bytes[i] == b'[' {
            let double_open = i + 1 < bytes.len() && bytes[i + 1] == b'[';
            let start = if double_open { i + 2 } else { i + 1 };
            if let Some(rel_close) = text[start..].find(|c: char| c == ']' || c == '\n') {
                let candidate = &text[start..start + rel_close];
                if looks_like_id_attempt(candidate) {
                    let double_close =
                        text.as_bytes().get(start + rel_close) == Some(&b']')
                            && text.as_bytes().get(start + rel_close + 1) == Some(&b']');
                    let (message, suggestion) = classify_malformed(candidate, double_open, double_close);
                    if let Some(message) = message {
                        issues.push(SyntaxIssue {
                            position: i,
                            length: start + rel_close - i + if double_close { 2 } else { 1 },
                            message,
                            suggestion,
                        });
                    }
                }
            }
        }
        i += 1;
    }
    issues
}

fn looks_like_id_attempt(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && candidate.chars().any(|c| c.is_ascii_digit())
}

fn classify_malformed(candidate: &str, double_open: bool, double_close: bool) -> (Option<String>, Option<String>) {
    let uppercase_prefix: String = candidate
        .chars()
        .take_while(|c| !c.is_ascii_digit())
        .collect();
    let has_underscore = candidate.contains('_');
    let is_lowercase_prefix = !uppercase_prefix.is_empty() && uppercase_prefix.chars().any(|c| c.is_ascii_lowercase());

    if !double_open || !double_close {
        return (
            Some("reference uses single brackets or is missing a closing bracket".into()),
            Some(format!("[[{}]]", candidate.to_ascii_uppercase())),
        );
    }
    if is_lowercase_prefix {
        return (
            Some("reference prefix should be uppercase".into()),
            Some(format!("[[{}]]", candidate.to_ascii_uppercase())),
        );
    }
    if !has_underscore {
        return (
            Some("reference is missing the underscore before its number".into()),
            None,
        );
    }
    (None, None)
}

#[cfg(test)]
#[path = "refs_tests.rs"]
mod tests;
