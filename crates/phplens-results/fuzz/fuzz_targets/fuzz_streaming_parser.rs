// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! Fuzz target for the streaming TeamCity parser
//!
//! This feeds output line by line, the way a running PHPUnit process does.

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;

use phplens_results::StreamingParser;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let mut parser = StreamingParser::with_source_loader(Arc::new(|_: &str| None));

        for line in input.lines() {
            for case in parser.process_line(line) {
                assert_eq!(case.fault.is_some(), case.kind.has_fault());
            }
        }

        let _ = parser.finish();
    }
});
