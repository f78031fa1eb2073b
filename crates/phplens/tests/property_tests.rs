// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! Property-based tests for phplens
//!
//! These tests use proptest to check command-option handling and the
//! runnable-file heuristic against arbitrary input.

use std::path::Path;

use phplens::{CommandOptions, is_runnable};
use proptest::prelude::*;

/// Generate `(flag, value)` pairs with unique long flags
fn arbitrary_options() -> impl Strategy<Value = Vec<(String, Option<String>)>> {
    prop::collection::btree_map("--[a-z][a-z-]{0,10}", prop::option::of("[A-Za-z0-9_./]{1,12}"), 0..8)
        .prop_map(|map| map.into_iter().collect())
}

proptest! {
    #[test]
    fn prop_parse_inverts_to_args(pairs in arbitrary_options()) {
        let mut options = CommandOptions::new();
        for (flag, value) in &pairs {
            match value {
                Some(value) => options.put(flag.clone(), value.clone()),
                None => options.put_flag(flag.clone()),
            };
        }
        let reparsed = CommandOptions::parse(options.to_args());
        prop_assert_eq!(reparsed, options);
    }

    #[test]
    fn prop_put_keeps_single_entry(flag in "--[a-z]{1,8}", values in prop::collection::vec("[a-z]{1,5}", 1..6)) {
        let mut options = CommandOptions::new();
        for value in &values {
            options.put(flag.clone(), value.clone());
        }
        prop_assert_eq!(options.len(), 1);
        prop_assert_eq!(options.get(&flag), values.last().map(String::as_str));
    }

    #[test]
    fn prop_parse_never_panics(args in prop::collection::vec(".{0,20}", 0..10)) {
        let options = CommandOptions::parse(&args);
        prop_assert!(options.len() <= args.len());
    }

    #[test]
    fn prop_git_conflict_copies_never_run(stem in "[A-Za-z]{1,12}", source in ".{0,100}") {
        let path = format!("/app/tests/{stem}.git.php");
        prop_assert!(!is_runnable(Path::new(&path), &source));
    }
}
