// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! Fuzz target for TeamCity output parsing
//!
//! The TeamCity parser tolerates arbitrary interleaved output, so it must
//! always return `Ok`.

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;

use phplens_results::{Parser, TeamCityParser};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let parser = TeamCityParser::with_source_loader(Arc::new(|_: &str| None));
    assert!(parser.parse(&input).is_ok());
});
