// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! Ordered PHPUnit command-line options
//!
//! Flags keep the order they were first inserted in, so the argument list
//! handed to PHPUnit is stable and caller flags stay where the caller put them.

use serde::{Deserialize, Serialize};

/// Ordered mapping of flag to optional value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOptions {
    items: Vec<(String, Option<String>)>,
}

impl CommandOptions {
    /// Create an empty option set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from caller arguments
    ///
    /// `--flag=value` and `-f value` carry a value, a flag followed by another
    /// flag (or nothing) is a bare flag. Tokens that do not start with `-` and
    /// do not follow a flag are kept as positional arguments. Repeated flags
    /// such as `-d` or `--group` are all kept, in order.
    #[must_use]
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::new();
        let mut pending: Option<String> = None;
        for arg in args {
            let arg = arg.as_ref();
            if arg.starts_with('-') {
                if let Some(flag) = pending.take() {
                    options.push(flag, None);
                }
                match arg.split_once('=') {
                    Some((flag, value)) if flag.starts_with("--") => {
                        options.push(flag.to_string(), Some(value.to_string()));
                    }
                    _ => pending = Some(arg.to_string()),
                }
            } else if let Some(flag) = pending.take() {
                options.push(flag, Some(arg.to_string()));
            } else {
                options.push(arg.to_string(), None);
            }
        }
        if let Some(flag) = pending {
            options.push(flag, None);
        }
        options
    }

    /// Check if a flag is present
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.items.iter().any(|(k, _)| k == key)
    }

    /// Value of a flag; `None` if absent or valueless
    ///
    /// For a repeated flag this is the first value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Set a flag with a value, replacing an existing value in place
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.insert(key.into(), Some(value.into()))
    }

    /// Set a valueless flag
    pub fn put_flag(&mut self, key: impl Into<String>) -> &mut Self {
        self.insert(key.into(), None)
    }

    fn push(&mut self, key: String, value: Option<String>) {
        self.items.push((key, value));
    }

    fn insert(&mut self, key: String, value: Option<String>) -> &mut Self {
        match self.items.iter_mut().find(|(k, _)| *k == key) {
            Some(item) => item.1 = value,
            None => self.items.push((key, value)),
        }
        self
    }

    /// Remove the first occurrence of a flag, returning its value
    pub fn remove(&mut self, key: &str) -> Option<Option<String>> {
        let idx = self.items.iter().position(|(k, _)| k == key)?;
        Some(self.items.remove(idx).1)
    }

    /// Check if a configuration file was requested by the caller
    #[must_use]
    pub fn has_configuration(&self) -> bool {
        self.has("-c") || self.has("--configuration")
    }

    /// Check if TeamCity output was requested
    #[must_use]
    pub fn is_teamcity(&self) -> bool {
        self.has("--teamcity")
    }

    /// Linearized argument list
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        self.items
            .iter()
            .flat_map(|(k, v)| std::iter::once(k.clone()).chain(v.clone()))
            .collect()
    }

    /// Number of flags
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if no flag is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn test_put_preserves_insertion_order() {
        let mut options = CommandOptions::new();
        options.put("--filter", "testAdd").put_flag("--teamcity").put("-c", "phpunit.xml");
        assert_eq!(
            options.to_args(),
            vec!["--filter", "testAdd", "--teamcity", "-c", "phpunit.xml"]
        );
    }

    #[test]
    fn test_put_replaces_in_place() {
        let mut options = CommandOptions::new();
        options.put("-c", "a.xml").put_flag("--stop-on-failure");
        options.put("-c", "b.xml");
        assert_eq!(options.to_args(), vec!["-c", "b.xml", "--stop-on-failure"]);
        assert_eq!(options.get("-c"), Some("b.xml"));
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn test_has_get_remove() {
        let mut options = CommandOptions::new();
        options.put_flag("--teamcity");
        assert!(options.has("--teamcity"));
        assert!(options.is_teamcity());
        assert_eq!(options.get("--teamcity"), None);
        assert_eq!(options.remove("--teamcity"), Some(None));
        assert_eq!(options.remove("--teamcity"), None);
        assert!(options.is_empty());
    }

    #[test]
    fn test_parse_caller_args() {
        let options = CommandOptions::parse([
            "--filter=testAdd",
            "-c",
            "phpunit.dist.xml",
            "--teamcity",
            "--stop-on-failure",
        ]);
        assert_eq!(options.get("--filter"), Some("testAdd"));
        assert_eq!(options.get("-c"), Some("phpunit.dist.xml"));
        assert!(options.has("--teamcity"));
        assert!(options.has("--stop-on-failure"));
        assert!(options.has_configuration());
    }

    #[test]
    fn test_parse_long_flag_with_value() {
        let options = CommandOptions::parse(["--configuration", "ci.xml", "--group", "slow"]);
        assert!(options.has_configuration());
        assert_eq!(
            options.to_args(),
            vec!["--configuration", "ci.xml", "--group", "slow"]
        );
    }

    #[test]
    fn test_parse_keeps_repeated_flags() {
        let options = CommandOptions::parse([
            "-d",
            "memory_limit=-1",
            "--group",
            "slow",
            "-d",
            "xdebug.mode=coverage",
            "--group=db",
        ]);
        assert_eq!(options.len(), 4);
        assert_eq!(options.get("-d"), Some("memory_limit=-1"));
        assert_eq!(
            options.to_args(),
            vec![
                "-d",
                "memory_limit=-1",
                "--group",
                "slow",
                "-d",
                "xdebug.mode=coverage",
                "--group",
                "db",
            ]
        );
    }
}
