// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! Test result types
//!
//! Both parsers produce the same [`TestCase`] model regardless of the output
//! format PHPUnit was asked to emit.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ResultsError;

/// Status of a single test method
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    /// Test passed
    Passed,
    /// Test raised an unexpected error
    Error,
    /// Test produced a warning
    Warning,
    /// An assertion failed
    Failure,
    /// Test was marked incomplete
    Incomplete,
    /// Test was considered risky
    Risky,
    /// Test was skipped
    Skipped,
    /// Test failed for a reason PHPUnit did not classify
    Failed,
}

impl Type {
    /// Every declared status, in declaration order
    pub const ALL: [Type; 8] = [
        Type::Passed,
        Type::Error,
        Type::Warning,
        Type::Failure,
        Type::Incomplete,
        Type::Risky,
        Type::Skipped,
        Type::Failed,
    ];

    /// Lowercase name as used in reports
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Type::Passed => "passed",
            Type::Error => "error",
            Type::Warning => "warning",
            Type::Failure => "failure",
            Type::Incomplete => "incomplete",
            Type::Risky => "risky",
            Type::Skipped => "skipped",
            Type::Failed => "failed",
        }
    }

    /// Whether a test with this status carries a [`Fault`]
    #[must_use]
    pub fn has_fault(self) -> bool {
        self != Type::Passed
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Type {
    type Err = ResultsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Type::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ResultsError::invalid(format!("unknown test status `{s}`")))
    }
}

/// Default decoration buckets, one row per [`Type`]
const DEFAULT_TYPE_GROUPS: [(Type, Type); 8] = [
    (Type::Passed, Type::Passed),
    (Type::Error, Type::Error),
    (Type::Warning, Type::Skipped),
    (Type::Failure, Type::Error),
    (Type::Incomplete, Type::Incomplete),
    (Type::Risky, Type::Risky),
    (Type::Skipped, Type::Skipped),
    (Type::Failed, Type::Error),
];

/// Table mapping fine-grained statuses onto the coarser buckets used for styling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeGroups {
    table: BTreeMap<Type, Type>,
}

impl TypeGroups {
    /// Build a table from explicit rows
    ///
    /// Statuses without a row map onto themselves.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Type, Type)>) -> Self {
        Self {
            table: pairs.into_iter().collect(),
        }
    }

    /// Bucket for a status
    #[must_use]
    pub fn group(&self, ty: Type) -> Type {
        self.table.get(&ty).copied().unwrap_or(ty)
    }

    /// Distinct buckets, in [`Type`] order
    #[must_use]
    pub fn groups(&self) -> Vec<Type> {
        let mut groups: Vec<Type> = Type::ALL.iter().map(|t| self.group(*t)).collect();
        groups.sort();
        groups.dedup();
        groups
    }
}

impl Default for TypeGroups {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_TYPE_GROUPS)
    }
}

/// A stack-frame-like location attached to a fault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detail {
    /// Source file
    pub file: String,
    /// 1-based line
    pub line: u32,
}

/// Failure detail of a non-passing test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fault {
    /// Exception or assertion class name
    #[serde(rename = "type")]
    pub kind: String,
    /// Human readable message
    pub message: String,
    /// Locations, most specific first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<Detail>,
}

/// Result of a single test method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Method name (including any data set suffix)
    pub name: String,
    /// Fully qualified class name (`Tests\Unit\FooTest`)
    pub class: String,
    /// Dotted class name (`Tests.Unit.FooTest`)
    pub classname: String,
    /// Absolute path of the test file
    pub file: String,
    /// 1-based line of the test method
    pub line: u32,
    /// Duration in seconds
    pub time: f64,
    /// Status
    #[serde(rename = "type")]
    pub kind: Type,
    /// Present iff `kind` is not [`Type::Passed`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<Fault>,
}

impl TestCase {
    /// Create a passing test case
    #[must_use]
    pub fn passed(
        name: impl Into<String>,
        class: impl Into<String>,
        file: impl Into<String>,
        line: u32,
    ) -> Self {
        let class = class.into();
        Self {
            name: name.into(),
            classname: dotted_class(&class),
            class,
            file: file.into(),
            line,
            time: 0.0,
            kind: Type::Passed,
            fault: None,
        }
    }

    /// Mark the test with a non-passing status
    ///
    /// Passing [`Type::Passed`] clears the fault instead.
    #[must_use]
    pub fn with_fault(mut self, kind: Type, fault: Fault) -> Self {
        self.set_fault(kind, fault);
        self
    }

    /// Set the duration in seconds
    #[must_use]
    pub fn with_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    pub(crate) fn set_fault(&mut self, kind: Type, fault: Fault) {
        self.kind = kind;
        self.fault = kind.has_fault().then_some(fault);
    }

    /// Check if the test passed
    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.kind == Type::Passed
    }

    /// Check if the test ended in an error, failure or warning
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(
            self.kind,
            Type::Error | Type::Failure | Type::Failed | Type::Warning
        )
    }

    /// Fault message, empty for passing tests
    #[must_use]
    pub fn message(&self) -> &str {
        self.fault.as_ref().map_or("", |f| f.message.as_str())
    }

    /// Human readable duration
    #[must_use]
    pub fn duration_display(&self) -> String {
        if self.time < 1.0 {
            format!("{}ms", (self.time * 1000.0).round() as u64)
        } else {
            format!("{:.2}s", self.time)
        }
    }
}

/// Counts per status for a set of test cases
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of test cases
    pub total: usize,
    /// Count per status; every [`Type`] is present
    pub counts: BTreeMap<Type, usize>,
    /// Sum of durations in seconds
    pub time: f64,
}

impl Summary {
    /// Summarize a slice of test cases
    #[must_use]
    pub fn from_cases<'a>(cases: impl IntoIterator<Item = &'a TestCase>) -> Self {
        let mut summary = Self {
            counts: Type::ALL.iter().map(|t| (*t, 0)).collect(),
            ..Self::default()
        };
        for case in cases {
            summary.total += 1;
            summary.time += case.time;
            *summary.counts.entry(case.kind).or_insert(0) += 1;
        }
        summary
    }

    /// Number of tests with the given status
    #[must_use]
    pub fn count(&self, ty: Type) -> usize {
        self.counts.get(&ty).copied().unwrap_or(0)
    }

    /// Check if no test errored, failed or warned
    #[must_use]
    pub fn all_passed(&self) -> bool {
        [Type::Error, Type::Failure, Type::Failed, Type::Warning]
            .iter()
            .all(|t| self.count(*t) == 0)
    }
}

/// `Tests\Unit\FooTest` -> `Tests.Unit.FooTest`
pub(crate) fn dotted_class(class: &str) -> String {
    class.trim_start_matches('\\').replace('\\', ".")
}

/// `Tests.Unit.FooTest` -> `Tests\Unit\FooTest`
pub(crate) fn namespaced_class(classname: &str) -> String {
    classname.replace('.', "\\")
}

static DETAIL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:#\d+\s+)?((?:[A-Za-z]:)?[^:()]*[\\/][^:()]*?)(?::(\d+)|\((\d+)\))(?::.*)?\s*$",
    )
    .expect("detail pattern is valid")
});

/// Parse one stack-frame line (`path:line` or `path(line)`)
#[must_use]
pub fn parse_detail_line(line: &str) -> Option<Detail> {
    let caps = DETAIL_LINE.captures(line)?;
    let file = caps.get(1)?.as_str().trim();
    let line = caps
        .get(2)
        .or_else(|| caps.get(3))?
        .as_str()
        .parse::<u32>()
        .ok()?;
    if file.is_empty() || line == 0 {
        return None;
    }
    Some(Detail {
        file: file.to_string(),
        line,
    })
}

/// Extract every stack frame from a fault body, keeping PHPUnit's order
#[must_use]
pub fn parse_details(text: &str) -> Vec<Detail> {
    text.lines().filter_map(parse_detail_line).collect()
}
