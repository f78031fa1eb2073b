// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! TeamCity service-message parsing
//!
//! PHPUnit invoked with `--teamcity` streams its progress on stdout as
//! service messages:
//!
//! ```text
//! ##teamcity[testSuiteStarted name='Tests\CalcTest' locationHint='php_qn:///app/tests/CalcTest.php::\Tests\CalcTest' flowId='42']
//! ##teamcity[testStarted name='testDiv' locationHint='php_qn:///app/tests/CalcTest.php::\Tests\CalcTest::testDiv' flowId='42']
//! ##teamcity[testFailed name='testDiv' message='Failed asserting that 2 matches expected 3.' details=' /app/tests/CalcTest.php:22|n ' flowId='42']
//! ##teamcity[testFinished name='testDiv' duration='3' flowId='42']
//! ```
//!
//! Anything that is not a service message (PHP notices, progress text) is
//! ignored, as are messages that arrive outside a started/finished pair.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, trace};

use crate::error::ResultsError;
use crate::parser::Parser;
use crate::result::{Fault, TestCase, Type, dotted_class, parse_details};

static SERVICE_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"##teamcity\[([A-Za-z]+)((?:\s+[\w.-]+='(?:[^'|]|\|.)*')*)\s*\]")
        .expect("service message pattern is valid")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\w.-]+)='((?:[^'|]|\|.)*)'").expect("attribute pattern is valid")
});

static FUNCTION_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bfunction\s+&?\s*([A-Za-z_][A-Za-z0-9_]*)\s*\(")
        .expect("function declaration pattern is valid")
});

/// Reads the source of a test file so method lines can be located
pub type SourceLoader = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// A decoded `##teamcity[...]` message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceMessage {
    /// Message name, e.g. `testStarted`
    pub name: String,
    /// Unescaped attributes
    pub attributes: HashMap<String, String>,
}

impl ServiceMessage {
    /// Attribute value by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Find every service message in a chunk of output
#[must_use]
pub fn parse_messages(text: &str) -> Vec<ServiceMessage> {
    SERVICE_MESSAGE
        .captures_iter(text)
        .map(|caps| ServiceMessage {
            name: caps[1].to_string(),
            attributes: ATTRIBUTE
                .captures_iter(&caps[2])
                .map(|attr| (attr[1].to_string(), unescape(&attr[2])))
                .collect(),
        })
        .collect()
}

/// Decode TeamCity's `|` escapes
#[must_use]
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '|' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\'') => out.push('\''),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('p') | Some('|') => out.push('|'),
            Some('[') => out.push('['),
            Some(']') => out.push(']'),
            Some('x') => out.push('\u{0085}'),
            Some('l') => out.push('\u{2028}'),
            Some('0') if chars.peek() == Some(&'x') => {
                chars.next();
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("|0x");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('|');
                out.push(other);
            }
            None => out.push('|'),
        }
    }
    out
}

/// `php_qn://<file>::\<Class>[::<method>]` split into its parts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Location {
    file: String,
    class: String,
    method: Option<String>,
}

fn parse_location_hint(hint: &str) -> Option<Location> {
    let rest = hint.strip_prefix("php_qn://")?;
    let (file, qualified) = rest.split_once("::")?;
    let qualified = qualified.trim_start_matches('\\');
    let (class, method) = match qualified.split_once("::") {
        Some((class, method)) => (class, Some(method.to_string())),
        None => (qualified, None),
    };
    if file.is_empty() || class.is_empty() {
        return None;
    }
    Some(Location {
        file: file.to_string(),
        class: class.to_string(),
        method,
    })
}

/// `testAdd with data set #1` -> `testAdd`
fn method_name(name: &str) -> &str {
    name.split(" with data set").next().unwrap_or(name).trim()
}

/// Locate `function <method>(` in PHP source
fn find_method_line(source: &str, method: &str) -> Option<u32> {
    source
        .lines()
        .position(|line| {
            FUNCTION_DECLARATION
                .captures_iter(line)
                .any(|caps| &caps[1] == method)
        })
        .and_then(|idx| u32::try_from(idx + 1).ok())
}

fn read_source(path: &str) -> Option<String> {
    std::fs::read_to_string(path).ok()
}

/// Line-by-line TeamCity parser with a single open test
pub struct StreamingParser {
    source_loader: SourceLoader,
    sources: HashMap<String, Option<String>>,
    suites: Vec<Option<Location>>,
    current: Option<TestCase>,
    method: String,
    results: Vec<TestCase>,
}

impl StreamingParser {
    /// Create a parser that reads test sources from disk
    #[must_use]
    pub fn new() -> Self {
        Self::with_source_loader(Arc::new(read_source))
    }

    /// Create a parser with a custom source loader
    #[must_use]
    pub fn with_source_loader(source_loader: SourceLoader) -> Self {
        Self {
            source_loader,
            sources: HashMap::new(),
            suites: Vec::new(),
            current: None,
            method: String::new(),
            results: Vec::new(),
        }
    }

    /// Process one line of output
    ///
    /// Returns the test cases completed by this line (usually zero or one).
    pub fn process_line(&mut self, line: &str) -> Vec<TestCase> {
        parse_messages(line)
            .into_iter()
            .filter_map(|message| self.process_message(message))
            .collect()
    }

    /// Apply a single decoded message
    pub fn process_message(&mut self, message: ServiceMessage) -> Option<TestCase> {
        match message.name.as_str() {
            "testSuiteStarted" => {
                self.suites
                    .push(message.get("locationHint").and_then(parse_location_hint));
                None
            }
            "testSuiteFinished" => {
                self.suites.pop();
                None
            }
            "testStarted" => {
                if self.current.is_some() {
                    trace!("Dropping unterminated test");
                }
                self.current = self.start_test(&message);
                None
            }
            "testFailed" => {
                self.fail_current(&message, Type::Failure, "failure");
                None
            }
            "testIgnored" => {
                let incomplete = message.get("message").is_some_and(|m| {
                    m.starts_with("Test incomplete") || m.starts_with("Incomplete")
                });
                if incomplete {
                    self.fail_current(&message, Type::Incomplete, "incomplete");
                } else {
                    self.fail_current(&message, Type::Skipped, "skipped");
                }
                None
            }
            "testIncomplete" => {
                self.fail_current(&message, Type::Incomplete, "incomplete");
                None
            }
            "testRisky" => {
                self.fail_current(&message, Type::Risky, "risky");
                None
            }
            "testWarning" => {
                self.fail_current(&message, Type::Warning, "warning");
                None
            }
            "testFinished" => self.finish_current(&message),
            other => {
                trace!(name = other, "Ignoring service message");
                None
            }
        }
    }

    fn start_test(&mut self, message: &ServiceMessage) -> Option<TestCase> {
        let Some(name) = message.get("name") else {
            trace!("testStarted without a name");
            return None;
        };
        let location = message
            .get("locationHint")
            .and_then(parse_location_hint)
            .or_else(|| self.suites.iter().rev().flatten().next().cloned());
        let Some(location) = location else {
            debug!(test = name, "Dropping test without a location");
            return None;
        };
        self.method = location
            .method
            .as_deref()
            .map_or_else(|| method_name(name), method_name)
            .to_string();
        Some(TestCase {
            name: name.to_string(),
            classname: dotted_class(&location.class),
            class: location.class,
            file: location.file,
            line: 0,
            time: 0.0,
            kind: Type::Passed,
            fault: None,
        })
    }

    fn fail_current(&mut self, message: &ServiceMessage, status: Type, default_kind: &str) {
        let Some(case) = self.current.as_mut() else {
            trace!(name = %message.name, "Status outside of a running test");
            return;
        };
        if !same_test(case, message) {
            return;
        }
        let kind = message
            .get("type")
            .filter(|k| !k.is_empty())
            .unwrap_or(default_kind)
            .to_string();
        case.set_fault(
            status,
            Fault {
                kind,
                message: message.get("message").unwrap_or_default().trim().to_string(),
                details: parse_details(message.get("details").unwrap_or_default()),
            },
        );
    }

    fn finish_current(&mut self, message: &ServiceMessage) -> Option<TestCase> {
        let case = self.current.as_ref()?;
        if !same_test(case, message) {
            trace!(test = ?message.get("name"), "testFinished for another test");
            return None;
        }
        let mut case = self.current.take()?;
        case.time = message
            .get("duration")
            .and_then(|d| d.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite())
            .map_or(0.0, |ms| ms / 1000.0);
        case.line = self.resolve_line(&case);
        self.results.push(case.clone());
        Some(case)
    }

    /// First frame in the test's own file, else the method declaration, else 1
    fn resolve_line(&mut self, case: &TestCase) -> u32 {
        if let Some(detail) = case
            .fault
            .as_ref()
            .and_then(|f| f.details.iter().find(|d| d.file == case.file))
        {
            return detail.line;
        }
        let loader = Arc::clone(&self.source_loader);
        let source = self
            .sources
            .entry(case.file.clone())
            .or_insert_with(|| (*loader)(&case.file));
        source
            .as_deref()
            .and_then(|src| find_method_line(src, &self.method))
            .unwrap_or(1)
    }

    /// All completed test cases so far
    #[must_use]
    pub fn results(&self) -> &[TestCase] {
        &self.results
    }

    /// Finalize, dropping any test that never finished
    #[must_use]
    pub fn finish(self) -> Vec<TestCase> {
        if self.current.is_some() {
            debug!("Dropping test without testFinished");
        }
        self.results
    }
}

impl Default for StreamingParser {
    fn default() -> Self {
        Self::new()
    }
}

fn same_test(case: &TestCase, message: &ServiceMessage) -> bool {
    message.get("name").is_none_or(|name| name == case.name)
}

/// Parser for PHPUnit's TeamCity output
#[derive(Clone)]
pub struct TeamCityParser {
    source_loader: SourceLoader,
}

impl TeamCityParser {
    /// Create a parser that reads test sources from disk
    #[must_use]
    pub fn new() -> Self {
        Self::with_source_loader(Arc::new(read_source))
    }

    /// Create a parser with a custom source loader
    #[must_use]
    pub fn with_source_loader(source_loader: SourceLoader) -> Self {
        Self { source_loader }
    }

    /// Start a streaming parse sharing this parser's source loader
    #[must_use]
    pub fn streaming(&self) -> StreamingParser {
        StreamingParser::with_source_loader(Arc::clone(&self.source_loader))
    }
}

impl Default for TeamCityParser {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TeamCityParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamCityParser").finish_non_exhaustive()
    }
}

impl Parser for TeamCityParser {
    fn parse(&self, content: &str) -> Result<Vec<TestCase>, ResultsError> {
        let mut parser = self.streaming();
        for line in content.lines() {
            parser.process_line(line);
        }
        let cases = parser.finish();
        debug!(count = cases.len(), "Parsed TeamCity output");
        Ok(cases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn no_sources() -> TeamCityParser {
        TeamCityParser::with_source_loader(Arc::new(|_: &str| None))
    }

    #[test]
    fn test_unescape_all_sequences() {
        assert_eq!(unescape("|'"), "'");
        assert_eq!(unescape("|n"), "\n");
        assert_eq!(unescape("|r"), "\r");
        assert_eq!(unescape("|p"), "|");
        assert_eq!(unescape("|["), "[");
        assert_eq!(unescape("|]"), "]");
        assert_eq!(unescape("||"), "|");
        assert_eq!(unescape("a|0x0041b"), "aAb");
        assert_eq!(unescape("odd|q"), "odd|q");
        assert_eq!(unescape("trailing|"), "trailing|");
    }

    #[test]
    fn test_parse_messages_finds_embedded_message() {
        let line = "PHP Warning: oops in /a.php on line 3##teamcity[testCount count='2' flowId='1']";
        let messages = parse_messages(line);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].name, "testCount");
        assert_eq!(messages[0].get("count"), Some("2"));
    }

    #[test]
    fn test_parse_messages_unescapes_attributes() {
        let line = "##teamcity[testFailed name='t' message='it|'s |[bad|]' details=' /a/b.php:3|n ']";
        let messages = parse_messages(line);
        assert_eq!(messages[0].get("message"), Some("it's [bad]"));
        assert_eq!(messages[0].get("details"), Some(" /a/b.php:3\n "));
    }

    #[test]
    fn test_location_hint() {
        let location =
            parse_location_hint("php_qn:///app/tests/CalcTest.php::\\Tests\\CalcTest::testAdd")
                .expect("location");
        assert_eq!(location.file, "/app/tests/CalcTest.php");
        assert_eq!(location.class, "Tests\\CalcTest");
        assert_eq!(location.method.as_deref(), Some("testAdd"));

        let suite = parse_location_hint("php_qn://C:\\app\\CalcTest.php::\\CalcTest")
            .expect("location");
        assert_eq!(suite.file, "C:\\app\\CalcTest.php");
        assert!(suite.method.is_none());
        assert!(parse_location_hint("file:///x").is_none());
    }

    #[test]
    fn test_pass_fail_and_skip() {
        let output = "\
##teamcity[testSuiteStarted name='Tests\\CalcTest' locationHint='php_qn:///app/tests/CalcTest.php::\\Tests\\CalcTest' flowId='9']
##teamcity[testStarted name='testAdd' locationHint='php_qn:///app/tests/CalcTest.php::\\Tests\\CalcTest::testAdd' flowId='9']
##teamcity[testFinished name='testAdd' duration='4' flowId='9']
##teamcity[testStarted name='testDiv' locationHint='php_qn:///app/tests/CalcTest.php::\\Tests\\CalcTest::testDiv' flowId='9']
##teamcity[testFailed name='testDiv' message='Failed asserting that 2 matches expected 3.' details=' /app/src/Calc.php:41|n /app/tests/CalcTest.php:22|n ' flowId='9']
##teamcity[testFinished name='testDiv' duration='12' flowId='9']
##teamcity[testStarted name='testSkip' locationHint='php_qn:///app/tests/CalcTest.php::\\Tests\\CalcTest::testSkip' flowId='9']
##teamcity[testIgnored name='testSkip' message='later' details='' flowId='9']
##teamcity[testFinished name='testSkip' duration='0' flowId='9']
##teamcity[testSuiteFinished name='Tests\\CalcTest' flowId='9']";

        let cases = no_sources().parse(output).expect("never fails");
        assert_eq!(cases.len(), 3);

        assert_eq!(cases[0].kind, Type::Passed);
        assert_eq!(cases[0].class, "Tests\\CalcTest");
        assert_eq!(cases[0].classname, "Tests.CalcTest");
        assert!((cases[0].time - 0.004).abs() < 1e-9);
        assert_eq!(cases[0].line, 1);

        let fault = cases[1].fault.as_ref().expect("fault");
        assert_eq!(cases[1].kind, Type::Failure);
        assert_eq!(fault.kind, "failure");
        assert_eq!(fault.message, "Failed asserting that 2 matches expected 3.");
        assert_eq!(fault.details.len(), 2);
        assert_eq!(cases[1].line, 22);

        assert_eq!(cases[2].kind, Type::Skipped);
        assert_eq!(cases[2].message(), "later");
    }

    #[test]
    fn test_unfinished_test_is_dropped() {
        let output = "\
##teamcity[testStarted name='testA' locationHint='php_qn:///t/ATest.php::\\ATest::testA']
##teamcity[testFailed name='testA' message='boom' details='']";
        let cases = no_sources().parse(output).expect("never fails");
        assert!(cases.is_empty());
    }

    #[test]
    fn test_messages_outside_pair_are_ignored() {
        let output = "\
##teamcity[testFailed name='ghost' message='boom']
##teamcity[testFinished name='ghost' duration='1']
garbage ##teamcity[ not a message
##teamcity[testStarted name='testA' locationHint='php_qn:///t/ATest.php::\\ATest::testA']
##teamcity[testFinished name='testB' duration='1']
##teamcity[testFinished name='testA' duration='1']";
        let cases = no_sources().parse(output).expect("never fails");
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name, "testA");
        assert!(cases[0].is_passed());
    }

    #[test]
    fn test_incomplete_and_risky_markers() {
        let output = "\
##teamcity[testStarted name='testA' locationHint='php_qn:///t/ATest.php::\\ATest::testA']
##teamcity[testIgnored name='testA' message='Test incomplete: todo']
##teamcity[testFinished name='testA' duration='0']
##teamcity[testStarted name='testB' locationHint='php_qn:///t/ATest.php::\\ATest::testB']
##teamcity[testRisky name='testB' message='no assertions']
##teamcity[testFinished name='testB' duration='0']
##teamcity[testStarted name='testC' locationHint='php_qn:///t/ATest.php::\\ATest::testC']
##teamcity[testIncomplete name='testC' message='todo']
##teamcity[testFinished name='testC' duration='0']";
        let cases = no_sources().parse(output).expect("never fails");
        let kinds: Vec<Type> = cases.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![Type::Incomplete, Type::Risky, Type::Incomplete]);
    }

    #[test]
    fn test_line_from_source() {
        let source = "<?php\nclass ATest extends TestCase\n{\n    public function testA(): void\n    {\n    }\n}\n";
        let parser = TeamCityParser::with_source_loader(Arc::new(move |_: &str| Some(source.to_string())));
        let output = "\
##teamcity[testStarted name='testA with data set #0' locationHint='php_qn:///t/ATest.php::\\ATest::testA with data set #0']
##teamcity[testFinished name='testA with data set #0' duration='1']";
        let cases = parser.parse(output).expect("never fails");
        assert_eq!(cases[0].line, 4);
        assert_eq!(cases[0].name, "testA with data set #0");
    }

    #[test]
    fn test_find_method_line_matches_whole_name() {
        let source = "<?php\nclass ATest extends TestCase\n{\n    public function testAddMore(): void {}\n\n    public static function &testAdd ( ) {}\n}\n";
        assert_eq!(find_method_line(source, "testAdd"), Some(6));
        assert_eq!(find_method_line(source, "testAddMore"), Some(4));
        assert_eq!(find_method_line(source, "testMissing"), None);
        assert_eq!(find_method_line(source, "test.*"), None);
    }

    #[test]
    fn test_suite_location_fallback() {
        let output = "\
##teamcity[testSuiteStarted name='ATest' locationHint='php_qn:///t/ATest.php::\\ATest']
##teamcity[testStarted name='testA']
##teamcity[testFinished name='testA' duration='1']";
        let cases = no_sources().parse(output).expect("never fails");
        assert_eq!(cases[0].file, "/t/ATest.php");
        assert_eq!(cases[0].class, "ATest");
    }

    #[test]
    fn test_streaming_parser_emits_on_finish() {
        let mut parser = no_sources().streaming();
        assert!(
            parser
                .process_line("##teamcity[testStarted name='t' locationHint='php_qn:///a/T.php::\\T::t']")
                .is_empty()
        );
        let done = parser.process_line("##teamcity[testFinished name='t' duration='2']");
        assert_eq!(done.len(), 1);
        assert_eq!(parser.results().len(), 1);
        assert_eq!(parser.finish().len(), 1);
    }
}
