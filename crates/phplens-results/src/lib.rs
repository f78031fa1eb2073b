// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! phplens-results: PHPUnit result processing for phplens
//!
//! This library crate turns PHPUnit output (a JUnit XML report or the
//! TeamCity service-message stream) into a uniform [`TestCase`] model and
//! keeps the latest results per file in a [`Store`].
//!
//! # Example
//!
//! ```no_run
//! use phplens_results::{ParserFactory, Store};
//!
//! let xml = std::fs::read_to_string("/tmp/junit.xml").unwrap();
//! let cases = ParserFactory::new().create("junit").unwrap().parse(&xml).unwrap();
//!
//! let mut store = Store::new();
//! store.put(cases);
//! for (status, cases) in store.get_by_type("/app/tests/CalcTest.php") {
//!     println!("{status}: {}", cases.len());
//! }
//! ```

pub mod error;
pub mod junit;
pub mod parser;
pub mod result;
pub mod store;
pub mod teamcity;

pub use error::ResultsError;
pub use junit::{JUnitParser, parse_junit};
pub use parser::{Format, Parser, ParserFactory};
pub use result::{Detail, Fault, Summary, TestCase, Type, TypeGroups};
pub use store::{Store, normalize_path};
pub use teamcity::{StreamingParser, TeamCityParser};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::ResultsError;
    pub use crate::parser::{Format, Parser, ParserFactory};
    pub use crate::result::{Fault, TestCase, Type};
    pub use crate::store::Store;
}
