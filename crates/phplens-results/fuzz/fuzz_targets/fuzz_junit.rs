// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! Fuzz target for JUnit report parsing
//!
//! `parse_junit` must reject malformed documents with an error, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

use phplens_results::parse_junit;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let _ = parse_junit(input);
    }
});
