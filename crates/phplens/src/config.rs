// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! Configuration for the phplens command line
//!
//! This module provides the command-line options, their environment
//! fallbacks and validation of the project paths they name.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::options::CommandOptions;

/// phplens - run PHPUnit and report test diagnostics per file
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "phplens")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Test file or directory to run, relative to the root
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Project root (working directory for PHPUnit)
    ///
    /// Configuration files and the vendored PHPUnit executable are looked
    /// up here. Defaults to the current working directory.
    #[arg(short, long, env = "PHPLENS_ROOT")]
    pub root: Option<PathBuf>,

    /// PHPUnit executable
    ///
    /// When unset (or set to `phpunit`), `vendor/bin/phpunit`, `phpunit.phar`
    /// and `phpunit` on `PATH` are tried in that order.
    #[arg(long, env = "PHPLENS_PHPUNIT")]
    pub phpunit: Option<String>,

    /// Read results from the TeamCity stream instead of a JUnit log
    #[arg(long, default_value = "false")]
    pub teamcity: bool,

    /// Delay before a requested run starts, in milliseconds
    #[arg(long, default_value = "100")]
    pub debounce_ms: u64,

    /// Output format for the report
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Re-run whenever the path is modified
    #[arg(short, long, default_value = "false")]
    pub watch: bool,

    /// Polling interval for watch mode, in milliseconds
    #[arg(long, default_value = "500")]
    pub poll_ms: u64,

    /// Enable verbose logging (debug level)
    ///
    /// Logs are written to stderr so they never mix with the report.
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Quiet mode - suppress info-level logs
    ///
    /// Only errors and warnings will be logged.
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,

    /// Extra arguments passed to PHPUnit
    #[arg(last = true)]
    pub phpunit_args: Vec<String>,
}

/// Report output format
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Diagnostics grouped per file
    #[default]
    Text,
    /// The store contents as JSON
    Json,
}

impl Config {
    /// Get the project root, using the current directory as default
    ///
    /// Returns `None` if no root is specified and the current directory
    /// cannot be determined.
    #[must_use]
    pub fn root_path(&self) -> Option<PathBuf> {
        self.root.clone().or_else(|| std::env::current_dir().ok())
    }

    /// Path to run, resolved against the project root
    #[must_use]
    pub fn target_path(&self) -> PathBuf {
        match self.root_path() {
            Some(root) if self.path.is_relative() => root.join(&self.path),
            _ => self.path.clone(),
        }
    }

    /// PHPUnit options built from the flags and trailing arguments
    #[must_use]
    pub fn command_options(&self) -> CommandOptions {
        let mut options = CommandOptions::parse(&self.phpunit_args);
        if self.teamcity {
            options.put_flag("--teamcity");
        }
        options
    }

    /// Debounce delay
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Watch-mode polling interval
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms.max(1))
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The root is specified but doesn't exist or isn't a directory
    /// - The target path doesn't exist
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref root) = self.root {
            if !root.exists() {
                return Err(ConfigError::RootNotFound(root.clone()));
            }
            if !root.is_dir() {
                return Err(ConfigError::RootNotDirectory(root.clone()));
            }
        }

        let target = self.target_path();
        if !target.exists() {
            return Err(ConfigError::PathNotFound(target));
        }

        Ok(())
    }

    /// Get the log level based on verbose/quiet flags
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::WARN
        } else {
            tracing::Level::INFO
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Project root not found
    #[error("Project root not found: {0}")]
    RootNotFound(PathBuf),

    /// Project root is not a directory
    #[error("Project root is not a directory: {0}")]
    RootNotDirectory(PathBuf),

    /// Test path not found
    #[error("Test path not found: {0}")]
    PathNotFound(PathBuf),
}
