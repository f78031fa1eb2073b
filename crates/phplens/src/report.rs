// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! Rendering of stored results
//!
//! The text report lists, per file, every test that did not pass as
//! `line  status  name  message`, followed by a one-line summary. The JSON
//! report serializes the store contents together with the summary.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use phplens_results::{Store, Summary, TestCase, Type, TypeGroups};
use serde::Serialize;

/// JSON shape of a report
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    /// Test cases per normalized file path
    pub files: BTreeMap<&'a str, &'a [TestCase]>,
    /// Counts over all files
    pub summary: Summary,
}

impl<'a> Report<'a> {
    /// Snapshot a store
    #[must_use]
    pub fn from_store(store: &'a Store) -> Self {
        Self {
            files: store
                .files()
                .into_iter()
                .filter_map(|file| store.get(file).map(|cases| (file, cases)))
                .collect(),
            summary: store.summary(),
        }
    }
}

/// Render a store as JSON
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(store: &Store) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Report::from_store(store))
}

/// Render a store as per-file diagnostics
#[must_use]
pub fn render_text(store: &Store, groups: &TypeGroups) -> String {
    let mut out = String::new();
    for file in store.files() {
        let mut diagnostics: Vec<&TestCase> = store
            .get_by_group(file, groups)
            .into_iter()
            .filter(|(group, _)| *group != Type::Passed)
            .flat_map(|(_, cases)| cases)
            .collect();
        if diagnostics.is_empty() {
            continue;
        }
        diagnostics.sort_by_key(|case| case.line);

        let _ = writeln!(out, "{file}");
        for case in diagnostics {
            let _ = writeln!(
                out,
                "  {:>5}  {:<10}  {}  {}",
                case.line,
                case.kind.as_str(),
                case.name,
                first_line(case.message())
            );
        }
        out.push('\n');
    }
    out.push_str(&summary_line(&store.summary()));
    out.push('\n');
    out
}

/// `5 tests: 3 passed, 1 failure, 1 skipped (24ms)`
#[must_use]
pub fn summary_line(summary: &Summary) -> String {
    let counts: Vec<String> = summary
        .counts
        .iter()
        .filter(|(_, n)| **n > 0)
        .map(|(ty, n)| format!("{n} {ty}"))
        .collect();
    let noun = if summary.total == 1 { "test" } else { "tests" };
    let time = if summary.time < 1.0 {
        format!("{}ms", (summary.time * 1000.0).round() as u64)
    } else {
        format!("{:.2}s", summary.time)
    };
    if counts.is_empty() {
        format!("{} {noun} ({time})", summary.total)
    } else {
        format!("{} {noun}: {} ({time})", summary.total, counts.join(", "))
    }
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or_default()
}
