#![no_main]

//! Fuzz target for PHPUnit command-option handling
//!
//! Arbitrary caller arguments and option edits must never panic, and every
//! flag must survive linearization.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use phplens::CommandOptions;

#[derive(Debug, Arbitrary)]
struct Input {
    args: Vec<String>,
    extra: Vec<(String, Option<String>)>,
}

fuzz_target!(|input: Input| {
    let mut options = CommandOptions::parse(&input.args);
    let _ = options.has_configuration();
    let _ = options.is_teamcity();

    for (flag, value) in input.extra {
        // Keep to the shapes callers produce: long flags, plain values
        if !flag.starts_with("--") || flag.contains('=') {
            continue;
        }
        match value {
            Some(value) if !value.is_empty() && !value.starts_with('-') => {
                options.put(flag, value);
            }
            _ => {
                options.put_flag(flag);
            }
        }
    }

    let args = options.to_args();
    assert!(args.len() >= options.len());
});
