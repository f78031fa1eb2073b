// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! Filesystem access used by the PHPUnit driver

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

/// Filesystem operations needed to locate PHPUnit and read its reports
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Check if a path exists
    async fn exists(&self, path: &Path) -> bool;

    /// Resolve a file by path or by name
    ///
    /// Absolute paths are checked as-is. Relative paths are looked up in
    /// `cwd` first, then in each directory of the search path.
    async fn find(&self, search: &Path, cwd: &Path) -> Option<PathBuf>;

    /// A fresh path in the temporary directory
    fn tmpfile(&self, prefix: &str, extension: &str) -> PathBuf;

    /// Read a file as UTF-8
    async fn get(&self, path: &Path) -> std::io::Result<String>;

    /// Remove a file; failures are logged and reported as `false`
    async fn unlink(&self, path: &Path) -> bool;
}

/// Local disk implementation
#[derive(Debug, Clone)]
pub struct LocalFilesystem {
    search_path: Vec<PathBuf>,
    tmp_dir: PathBuf,
}

impl LocalFilesystem {
    /// Use `PATH` and the system temporary directory
    #[must_use]
    pub fn new() -> Self {
        Self::with_search_path(std::env::var_os("PATH").unwrap_or_default())
    }

    /// Use an explicit search path (same syntax as `PATH`)
    #[must_use]
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: std::env::split_paths(&search_path.into())
                .filter(|p| !p.as_os_str().is_empty())
                .collect(),
            tmp_dir: std::env::temp_dir(),
        }
    }

    /// Place temporary files in `dir`
    #[must_use]
    pub fn with_tmp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = dir.into();
        self
    }
}

impl Default for LocalFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Filesystem for LocalFilesystem {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn find(&self, search: &Path, cwd: &Path) -> Option<PathBuf> {
        if search.is_absolute() {
            return self.exists(search).await.then(|| search.to_path_buf());
        }
        for dir in std::iter::once(cwd).chain(self.search_path.iter().map(PathBuf::as_path)) {
            let candidate = dir.join(search);
            if self.exists(&candidate).await {
                debug!(path = %candidate.display(), "Found file");
                return Some(candidate);
            }
        }
        None
    }

    fn tmpfile(&self, prefix: &str, extension: &str) -> PathBuf {
        let stamp = chrono::Utc::now().timestamp_millis();
        self.tmp_dir.join(format!(
            "{prefix}-{stamp}-{pid}.{extension}",
            pid = std::process::id()
        ))
    }

    async fn get(&self, path: &Path) -> std::io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn unlink(&self, path: &Path) -> bool {
        match tokio::fs::remove_file(path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "File already removed");
                false
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove file");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_find_prefers_cwd_over_search_path() {
        let cwd = TempDir::new().expect("tempdir");
        let bin = TempDir::new().expect("tempdir");
        std::fs::write(cwd.path().join("phpunit"), "").expect("write");
        std::fs::write(bin.path().join("phpunit"), "").expect("write");

        let files = LocalFilesystem::with_search_path(bin.path().as_os_str());
        let found = files.find(Path::new("phpunit"), cwd.path()).await;
        assert_eq!(found, Some(cwd.path().join("phpunit")));
    }

    #[tokio::test]
    async fn test_find_falls_back_to_search_path() {
        let cwd = TempDir::new().expect("tempdir");
        let bin = TempDir::new().expect("tempdir");
        std::fs::write(bin.path().join("phpunit"), "").expect("write");

        let files = LocalFilesystem::with_search_path(bin.path().as_os_str());
        let found = files.find(Path::new("phpunit"), cwd.path()).await;
        assert_eq!(found, Some(bin.path().join("phpunit")));
        assert!(files.find(Path::new("missing"), cwd.path()).await.is_none());
    }

    #[tokio::test]
    async fn test_find_absolute_path() {
        let dir = TempDir::new().expect("tempdir");
        let file = dir.path().join("phpunit.phar");
        let files = LocalFilesystem::with_search_path("");
        assert!(files.find(&file, dir.path()).await.is_none());

        std::fs::write(&file, "").expect("write");
        assert_eq!(files.find(&file, Path::new("/")).await, Some(file));
    }

    #[tokio::test]
    async fn test_tmpfile_get_unlink() {
        let dir = TempDir::new().expect("tempdir");
        let files = LocalFilesystem::new().with_tmp_dir(dir.path());

        let path = files.tmpfile("phplens-junit", "xml");
        assert!(path.starts_with(dir.path()));
        let name = path.file_name().and_then(|n| n.to_str()).expect("name");
        assert!(name.starts_with("phplens-junit-"));
        assert!(name.ends_with(".xml"));

        std::fs::write(&path, "<testsuites/>").expect("write");
        assert_eq!(files.get(&path).await.expect("read"), "<testsuites/>");
        assert!(files.unlink(&path).await);
        assert!(!files.exists(&path).await);
        assert!(!files.unlink(&path).await);
    }
}
