// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! Error types for phplens-results

use thiserror::Error;

/// Errors that can occur while turning PHPUnit output into test cases
#[derive(Debug, Error)]
pub enum ResultsError {
    /// The JUnit report is not well-formed XML
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Error reading a report file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is well-formed but not a PHPUnit report
    #[error("Invalid report format: {message}")]
    InvalidFormat {
        /// Description of the format error
        message: String,
    },

    /// A required attribute is absent from an element
    #[error("Missing attribute `{attribute}` on <{element}>")]
    MissingAttribute {
        /// Element the attribute was expected on
        element: String,
        /// Name of the missing attribute
        attribute: String,
    },

    /// No parser exists for the requested output format
    #[error("Unsupported output format: {format}")]
    UnsupportedFormat {
        /// The format name that was requested
        format: String,
    },
}

impl ResultsError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    pub(crate) fn missing(element: &str, attribute: &str) -> Self {
        Self::MissingAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for ResultsError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(quick_xml::Error::from(err))
    }
}
