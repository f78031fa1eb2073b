// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! Error types for PHPUnit runs

use phplens_results::ResultsError;
use thiserror::Error;

/// Errors that can end a PHPUnit run
#[derive(Debug, Error)]
pub enum RunError {
    /// No PHPUnit executable was found at any candidate location
    #[error("PHPUnit executable not found (searched: {})", searched.join(", "))]
    ExecutableNotFound {
        /// Candidate locations that were probed, in order
        searched: Vec<String>,
    },

    /// The PHPUnit process could not be started
    #[error("Failed to spawn {program}: {source}")]
    ProcessSpawn {
        /// Program that was being started
        program: String,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// PHPUnit output could not be turned into test cases
    #[error(transparent)]
    Results(#[from] ResultsError),

    /// Error reading the report or process output
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A newer request replaced this one before it ran
    #[error("Run superseded by a newer request")]
    Superseded,
}

impl RunError {
    /// Check if the run was dropped in favour of a newer one
    #[must_use]
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}
