// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! Polling change detection for watch mode

use std::path::Path;
use std::time::SystemTime;

use ignore::WalkBuilder;

/// Directories never descended into
const SKIPPED_DIRS: [&str; 3] = ["vendor", "node_modules", ".git"];

/// Latest modification time of `path`
///
/// For a directory, the newest `.php` file below it. Vendored, hidden and
/// git-ignored directories are skipped. `None` if nothing could be read.
#[must_use]
pub fn latest_modification(path: &Path) -> Option<SystemTime> {
    let metadata = std::fs::metadata(path).ok()?;
    if !metadata.is_dir() {
        return metadata.modified().ok();
    }

    let walker = WalkBuilder::new(path)
        .hidden(true)
        .git_ignore(true)
        .filter_entry(|entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !(is_dir
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| SKIPPED_DIRS.contains(&name)))
        })
        .build();

    walker
        .flatten()
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "php"))
        .filter_map(|entry| entry.metadata().ok()?.modified().ok())
        .max()
}

/// Remembers the last seen modification time
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last: Option<SystemTime>,
}

impl ChangeDetector {
    /// Start from the current state of `path`
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            last: latest_modification(path),
        }
    }

    /// Check if `path` changed since the previous call
    pub fn changed(&mut self, path: &Path) -> bool {
        let current = latest_modification(path);
        if current > self.last {
            self.last = current;
            true
        } else {
            false
        }
    }
}
