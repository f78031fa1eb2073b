// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! phplens library
//!
//! This module exports the PHPUnit driver and its collaborators for use in
//! integration tests and as a library. Result parsing and storage live in
//! the `phplens-results` crate.

pub mod config;
pub mod debounce;
pub mod error;
pub mod filesystem;
pub mod options;
pub mod phpunit;
pub mod process;
pub mod report;
pub mod watch;

pub use error::RunError;
pub use options::CommandOptions;
pub use phpunit::{PhpunitDriver, RunEvent, RunRequest, RunState, is_runnable};
