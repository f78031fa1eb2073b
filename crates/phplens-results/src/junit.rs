// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! JUnit XML report parsing
//!
//! PHPUnit writes a JUnit report when invoked with `--log-junit <file>`.
//! Suites nest per class (and per data provider), test cases are the leaves,
//! and a non-passing test carries exactly one status child:
//!
//! ```xml
//! <testsuites>
//!   <testsuite name="Tests\CalcTest" file="/app/tests/CalcTest.php">
//!     <testcase name="testAdd" class="Tests\CalcTest" classname="Tests.CalcTest"
//!               file="/app/tests/CalcTest.php" line="12" time="0.0012"/>
//!     <testcase name="testDiv" class="Tests\CalcTest" classname="Tests.CalcTest"
//!               file="/app/tests/CalcTest.php" line="20" time="0.0031">
//!       <failure type="PHPUnit\Framework\ExpectationFailedException">Tests\CalcTest::testDiv
//! Failed asserting that 2 matches expected 3.
//!
//! /app/tests/CalcTest.php:22
//! </failure>
//!     </testcase>
//!   </testsuite>
//! </testsuites>
//! ```

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::error::ResultsError;
use crate::parser::Parser;
use crate::result::{
    Fault, TestCase, Type, dotted_class, namespaced_class, parse_detail_line, parse_details,
};

/// Parser for PHPUnit's JUnit XML report
#[derive(Debug, Clone, Copy, Default)]
pub struct JUnitParser;

impl JUnitParser {
    /// Create a new JUnit parser
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Parser for JUnitParser {
    fn parse(&self, content: &str) -> Result<Vec<TestCase>, ResultsError> {
        parse_junit(content)
    }
}

/// Status child of a `testcase` being read
struct PendingFault {
    status: Type,
    kind: Option<String>,
    message: Option<String>,
    body: String,
}

/// Parse a JUnit XML document into test cases
///
/// # Errors
///
/// Returns `ResultsError::Xml` for malformed XML, `ResultsError::InvalidFormat`
/// if the document is not a PHPUnit report, and
/// `ResultsError::MissingAttribute` if a `testcase` lacks a required field.
pub fn parse_junit(content: &str) -> Result<Vec<TestCase>, ResultsError> {
    let mut reader = Reader::from_str(content);

    let mut cases = Vec::new();
    // One entry per open element; suites record their `file` attribute
    let mut open: Vec<Option<String>> = Vec::new();
    let mut seen_root = false;
    let mut current: Option<TestCase> = None;
    let mut fault: Option<PendingFault> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = element_name(&e);
                check_root(&name, &mut seen_root)?;
                match name.as_str() {
                    "testsuite" => open.push(Some(suite_file(&e, &open)?)),
                    "testcase" => {
                        current = Some(read_testcase(&e, &open)?);
                        open.push(None);
                    }
                    _ => {
                        if current.is_some() && fault.is_none() {
                            fault = status_child(&name, &e)?;
                        }
                        open.push(None);
                    }
                }
            }
            Event::Empty(e) => {
                let name = element_name(&e);
                check_root(&name, &mut seen_root)?;
                match name.as_str() {
                    "testcase" => cases.push(read_testcase(&e, &open)?),
                    "testsuite" => {}
                    _ => {
                        if let Some(case) = current.as_mut() {
                            if let Some(pending) = status_child(&name, &e)? {
                                apply_fault(case, pending);
                            }
                        }
                    }
                }
            }
            Event::Text(e) => {
                if let Some(pending) = fault.as_mut() {
                    pending.body.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some(pending) = fault.as_mut() {
                    pending.body.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                open.pop();
                match name.as_str() {
                    "testcase" => {
                        if let Some(case) = current.take() {
                            cases.push(case);
                        }
                        fault = None;
                    }
                    "error" | "warning" | "failure" | "skipped" => {
                        if let (Some(case), Some(pending)) = (current.as_mut(), fault.take()) {
                            apply_fault(case, pending);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(ResultsError::invalid("document has no root element"));
    }
    if !open.is_empty() {
        return Err(ResultsError::invalid(format!(
            "unexpected end of document with {} unclosed element(s)",
            open.len()
        )));
    }

    debug!(count = cases.len(), "Parsed JUnit report");
    Ok(cases)
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn check_root(name: &str, seen_root: &mut bool) -> Result<(), ResultsError> {
    if *seen_root {
        return Ok(());
    }
    if name != "testsuites" && name != "testsuite" {
        return Err(ResultsError::invalid(format!(
            "expected <testsuites> or <testsuite> root, found <{name}>"
        )));
    }
    *seen_root = true;
    Ok(())
}

fn attributes(e: &BytesStart<'_>) -> Result<HashMap<String, String>, ResultsError> {
    let mut attrs = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

/// File of a suite, inherited from the enclosing suite when absent
fn suite_file(e: &BytesStart<'_>, open: &[Option<String>]) -> Result<String, ResultsError> {
    let attrs = attributes(e)?;
    Ok(attrs
        .get("file")
        .cloned()
        .or_else(|| inherited_file(open))
        .unwrap_or_default())
}

fn inherited_file(open: &[Option<String>]) -> Option<String> {
    open.iter()
        .rev()
        .flatten()
        .find(|file| !file.is_empty())
        .cloned()
}

fn read_testcase(e: &BytesStart<'_>, open: &[Option<String>]) -> Result<TestCase, ResultsError> {
    let attrs = attributes(e)?;

    let name = attrs
        .get("name")
        .cloned()
        .ok_or_else(|| ResultsError::missing("testcase", "name"))?;

    let (class, classname) = match (attrs.get("class"), attrs.get("classname")) {
        (Some(class), Some(classname)) => (class.clone(), classname.clone()),
        (Some(class), None) => (class.clone(), dotted_class(class)),
        (None, Some(classname)) => (namespaced_class(classname), classname.clone()),
        (None, None) => return Err(ResultsError::missing("testcase", "class")),
    };

    let file = attrs
        .get("file")
        .cloned()
        .or_else(|| inherited_file(open))
        .ok_or_else(|| ResultsError::missing("testcase", "file"))?;

    let line = attrs
        .get("line")
        .ok_or_else(|| ResultsError::missing("testcase", "line"))?;
    let line = line
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|l| *l > 0)
        .ok_or_else(|| ResultsError::invalid(format!("invalid line `{line}` on <testcase>")))?;

    let time = attrs
        .get("time")
        .and_then(|t| t.trim().parse::<f64>().ok())
        .filter(|t| t.is_finite())
        .unwrap_or(0.0);

    Ok(TestCase {
        name,
        class,
        classname,
        file,
        line,
        time,
        kind: Type::Passed,
        fault: None,
    })
}

/// Recognize a status child element, refining `error`/`skipped` by exception type
fn status_child(name: &str, e: &BytesStart<'_>) -> Result<Option<PendingFault>, ResultsError> {
    let status = match name {
        "error" => Type::Error,
        "warning" => Type::Warning,
        "failure" => Type::Failure,
        "skipped" => Type::Skipped,
        _ => return Ok(None),
    };
    let mut attrs = attributes(e)?;
    let kind = attrs.remove("type");
    let status = match kind.as_deref() {
        Some(k) if k.ends_with("IncompleteTestError") => Type::Incomplete,
        Some(k) if k.ends_with("RiskyTestError") => Type::Risky,
        Some(k) if k.ends_with("SkippedTestError") || k.ends_with("SkippedWithMessageException") => {
            Type::Skipped
        }
        _ => status,
    };
    Ok(Some(PendingFault {
        status,
        kind,
        message: attrs.remove("message"),
        body: String::new(),
    }))
}

fn apply_fault(case: &mut TestCase, pending: PendingFault) {
    let details = parse_details(&pending.body);
    let message = pending
        .message
        .unwrap_or_else(|| fault_message(&pending.body, case));
    let kind = pending
        .kind
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| pending.status.as_str().to_string());
    case.set_fault(
        pending.status,
        Fault {
            kind,
            message,
            details,
        },
    );
}

/// Fault text without the `Class::method` header and the stack frames
fn fault_message(body: &str, case: &TestCase) -> String {
    let header = format!("{}::{}", case.class.trim_start_matches('\\'), case.name);
    let mut lines: Vec<&str> = body
        .lines()
        .filter(|line| parse_detail_line(line).is_none())
        .collect();
    if let Some(first) = lines.iter().position(|l| !l.trim().is_empty()) {
        if lines[first].trim().trim_start_matches('\\') == header {
            lines.remove(first);
        }
    }
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    const PASSING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuites>
  <testsuite name="Tests\CalcTest" file="/app/tests/CalcTest.php" tests="2">
    <testcase name="testAdd" class="Tests\CalcTest" classname="Tests.CalcTest" file="/app/tests/CalcTest.php" line="12" assertions="1" time="0.001200"/>
    <testcase name="testSub" class="Tests\CalcTest" classname="Tests.CalcTest" file="/app/tests/CalcTest.php" line="17" assertions="1" time="0.000800"/>
  </testsuite>
</testsuites>"#;

    #[test]
    fn test_parse_passing_suite() {
        let cases = parse_junit(PASSING).expect("Should parse");
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].name, "testAdd");
        assert_eq!(cases[0].class, "Tests\\CalcTest");
        assert_eq!(cases[0].classname, "Tests.CalcTest");
        assert_eq!(cases[0].line, 12);
        assert!((cases[0].time - 0.0012).abs() < f64::EPSILON);
        assert!(cases.iter().all(|c| c.is_passed() && c.fault.is_none()));
    }

    #[test]
    fn test_parse_failure_with_details() {
        let xml = r#"<testsuites><testsuite name="S" file="/app/tests/CalcTest.php">
<testcase name="testDiv" class="Tests\CalcTest" classname="Tests.CalcTest" file="/app/tests/CalcTest.php" line="20" time="0.01">
<failure type="PHPUnit\Framework\ExpectationFailedException">Tests\CalcTest::testDiv
Failed asserting that 2 matches expected 3.

/app/src/Calc.php:41
/app/tests/CalcTest.php:22
</failure>
</testcase>
</testsuite></testsuites>"#;

        let cases = parse_junit(xml).expect("Should parse");
        assert_eq!(cases.len(), 1);
        let case = &cases[0];
        assert_eq!(case.kind, Type::Failure);
        let fault = case.fault.as_ref().expect("fault");
        assert_eq!(fault.kind, "PHPUnit\\Framework\\ExpectationFailedException");
        assert_eq!(fault.message, "Failed asserting that 2 matches expected 3.");
        assert_eq!(fault.details.len(), 2);
        assert_eq!(fault.details[0].file, "/app/src/Calc.php");
        assert_eq!(fault.details[0].line, 41);
    }

    #[test]
    fn test_nested_suites_inherit_file() {
        let xml = r#"<testsuites>
<testsuite name="Tests\CalcTest" file="/app/tests/CalcTest.php">
  <testsuite name="Tests\CalcTest::testAdd">
    <testcase name="testAdd with data set #0" class="Tests\CalcTest" line="30" time="0.1"/>
    <testcase name="testAdd with data set #1" classname="Tests.CalcTest" line="30" time="x"/>
  </testsuite>
</testsuite>
</testsuites>"#;

        let cases = parse_junit(xml).expect("Should parse");
        assert_eq!(cases.len(), 2);
        assert!(cases.iter().all(|c| c.file == "/app/tests/CalcTest.php"));
        assert_eq!(cases[0].classname, "Tests.CalcTest");
        assert_eq!(cases[1].class, "Tests\\CalcTest");
        assert_eq!(cases[1].time, 0.0);
    }

    #[test]
    fn test_skipped_and_incomplete() {
        let xml = r#"<testsuite name="S" file="/t/FooTest.php">
<testcase name="testSkip" class="FooTest" line="5" time="0"><skipped/></testcase>
<testcase name="testTodo" class="FooTest" line="9" time="0">
<error type="PHPUnit\Framework\IncompleteTestError">FooTest::testTodo
Not done yet

/t/FooTest.php:10
</error>
</testcase>
<testcase name="testRisky" class="FooTest" line="14" time="0"><error type="PHPUnit\Framework\RiskyTestError">No assertions</error></testcase>
</testsuite>"#;

        let cases = parse_junit(xml).expect("Should parse");
        assert_eq!(cases[0].kind, Type::Skipped);
        assert_eq!(cases[0].fault.as_ref().expect("fault").kind, "skipped");
        assert_eq!(cases[1].kind, Type::Incomplete);
        assert_eq!(cases[1].message(), "Not done yet");
        assert_eq!(cases[2].kind, Type::Risky);
        assert_eq!(cases[2].message(), "No assertions");
    }

    #[test]
    fn test_message_attribute_wins() {
        let xml = r#"<testsuite name="S"><testcase name="t" class="C" file="/c.php" line="1"><warning type="W" message="careful">body</warning></testcase></testsuite>"#;
        let cases = parse_junit(xml).expect("Should parse");
        assert_eq!(cases[0].kind, Type::Warning);
        assert_eq!(cases[0].message(), "careful");
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let xml = r#"<testsuite name="S"><testcase class="C" file="/c.php" line="1"/></testsuite>"#;
        assert!(matches!(
            parse_junit(xml),
            Err(ResultsError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_rejected() {
        let xml = r#"<testsuite name="S"><testcase name="t" class="C" line="1"/></testsuite>"#;
        assert!(matches!(
            parse_junit(xml),
            Err(ResultsError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        assert!(matches!(
            parse_junit("<html><body/></html>"),
            Err(ResultsError::InvalidFormat { .. })
        ));
        assert!(parse_junit("").is_err());
    }

    #[test]
    fn test_unclosed_document_is_rejected() {
        assert!(parse_junit("<testsuites><testsuite name=\"S\">").is_err());
    }

    #[test]
    fn test_mismatched_tags_are_rejected() {
        assert!(parse_junit("<testsuites><testsuite></testcase></testsuites>").is_err());
    }

    #[test]
    fn test_empty_report() {
        let cases = parse_junit("<testsuites/>").expect("Should parse");
        assert!(cases.is_empty());
    }
}
