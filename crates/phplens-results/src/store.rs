// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! Result store
//!
//! Keeps the latest test cases per file, keyed by a normalized path so that
//! `C:\app\FooTest.php` and `\app\FooTest.php` address the same entry. A
//! by-status index is rebuilt for a file every time that file is written.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::result::{Summary, TestCase, Type, TypeGroups};

/// Test cases of one file plus their by-status index
#[derive(Debug, Clone, Default)]
struct Entry {
    cases: Vec<TestCase>,
    by_type: HashMap<Type, Vec<usize>>,
}

impl Entry {
    fn new(cases: Vec<TestCase>) -> Self {
        let mut by_type: HashMap<Type, Vec<usize>> = HashMap::new();
        for (idx, case) in cases.iter().enumerate() {
            by_type.entry(case.kind).or_default().push(idx);
        }
        Self { cases, by_type }
    }

    fn of_type(&self, ty: Type) -> Vec<&TestCase> {
        self.by_type
            .get(&ty)
            .map(|idxs| idxs.iter().map(|i| &self.cases[*i]).collect())
            .unwrap_or_default()
    }
}

/// Latest test results per file
#[derive(Debug, Clone, Default)]
pub struct Store {
    entries: HashMap<String, Entry>,
}

impl Store {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given test cases
    #[must_use]
    pub fn from_cases(cases: Vec<TestCase>) -> Self {
        let mut store = Self::new();
        store.put(cases);
        store
    }

    /// Replace the entries of every file present in `cases`
    ///
    /// Files not mentioned keep their current entries.
    pub fn put(&mut self, cases: Vec<TestCase>) -> &mut Self {
        let mut grouped: Vec<(String, Vec<TestCase>)> = Vec::new();
        for case in cases {
            let key = normalize_path(&case.file);
            match grouped.iter_mut().find(|(file, _)| *file == key) {
                Some((_, group)) => group.push(case),
                None => grouped.push((key, vec![case])),
            }
        }
        for (file, group) in grouped {
            debug!(file = %file, count = group.len(), "Storing test results");
            self.entries.insert(file, Entry::new(group));
        }
        self
    }

    /// Check if results exist for a file
    #[must_use]
    pub fn has(&self, file: &str) -> bool {
        self.entries.contains_key(&normalize_path(file))
    }

    /// Test cases of a file, in report order
    #[must_use]
    pub fn get(&self, file: &str) -> Option<&[TestCase]> {
        self.entries
            .get(&normalize_path(file))
            .map(|e| e.cases.as_slice())
    }

    /// Test cases of a file grouped by status
    ///
    /// Every [`Type`] is present as a key, with an empty list when no test
    /// (or no entry for the file) has that status.
    #[must_use]
    pub fn get_by_type(&self, file: &str) -> BTreeMap<Type, Vec<&TestCase>> {
        let entry = self.entries.get(&normalize_path(file));
        Type::ALL
            .iter()
            .map(|ty| (*ty, entry.map(|e| e.of_type(*ty)).unwrap_or_default()))
            .collect()
    }

    /// Test cases of a file with a single status
    #[must_use]
    pub fn of_type(&self, file: &str, ty: Type) -> Vec<&TestCase> {
        self.entries
            .get(&normalize_path(file))
            .map(|e| e.of_type(ty))
            .unwrap_or_default()
    }

    /// Test cases of a file grouped by decoration bucket
    ///
    /// Every bucket of `groups` is present as a key.
    #[must_use]
    pub fn get_by_group(&self, file: &str, groups: &TypeGroups) -> BTreeMap<Type, Vec<&TestCase>> {
        let mut grouped: BTreeMap<Type, Vec<&TestCase>> =
            groups.groups().into_iter().map(|g| (g, Vec::new())).collect();
        for case in self.get(file).unwrap_or_default() {
            grouped.entry(groups.group(case.kind)).or_default().push(case);
        }
        grouped
    }

    /// Normalized paths of all stored files, sorted
    #[must_use]
    pub fn files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        files.sort_unstable();
        files
    }

    /// Number of stored files
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts across all stored files
    #[must_use]
    pub fn summary(&self) -> Summary {
        Summary::from_cases(self.entries.values().flat_map(|e| e.cases.iter()))
    }

    /// Drop every entry
    pub fn dispose(&mut self) {
        self.entries.clear();
    }
}

/// Strip a leading drive letter (`C:`), case-insensitively
#[must_use]
pub fn normalize_path(file: &str) -> String {
    let bytes = file.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        file[2..].to_string()
    } else {
        file.to_string()
    }
}
