// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! Parser contract and format selection

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ResultsError;
use crate::junit::JUnitParser;
use crate::result::TestCase;
use crate::teamcity::TeamCityParser;

/// Turns raw PHPUnit output into test cases
pub trait Parser: Send + Sync {
    /// Parse the complete output of one run
    ///
    /// # Errors
    ///
    /// Returns a `ResultsError` if the content cannot be interpreted; the
    /// TeamCity parser never fails.
    fn parse(&self, content: &str) -> Result<Vec<TestCase>, ResultsError>;
}

/// Output formats PHPUnit can report results in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// `--log-junit <file>`
    JUnit,
    /// `--teamcity` on stdout
    TeamCity,
}

impl Format {
    /// Name accepted by [`ParserFactory::create`]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Format::JUnit => "junit",
            Format::TeamCity => "teamcity",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = ResultsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "junit" => Ok(Format::JUnit),
            "teamcity" => Ok(Format::TeamCity),
            _ => Err(ResultsError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

/// Selects a parser implementation by format
#[derive(Debug, Clone, Default)]
pub struct ParserFactory {
    teamcity: TeamCityParser,
}

impl ParserFactory {
    /// Create a factory with default parsers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory whose TeamCity parser uses the given parser settings
    #[must_use]
    pub fn with_teamcity(teamcity: TeamCityParser) -> Self {
        Self { teamcity }
    }

    /// Parser for a format name (`junit` or `teamcity`)
    ///
    /// # Errors
    ///
    /// Returns `ResultsError::UnsupportedFormat` for any other name.
    pub fn create(&self, kind: &str) -> Result<Box<dyn Parser>, ResultsError> {
        Ok(self.create_for(kind.parse()?))
    }

    /// Parser for a known format
    #[must_use]
    pub fn create_for(&self, format: Format) -> Box<dyn Parser> {
        match format {
            Format::JUnit => Box::new(JUnitParser::new()),
            Format::TeamCity => Box::new(self.teamcity.clone()),
        }
    }

    /// The TeamCity parser, for streaming use
    #[must_use]
    pub fn teamcity(&self) -> &TeamCityParser {
        &self.teamcity
    }
}
