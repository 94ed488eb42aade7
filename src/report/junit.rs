use super::types::TestResults;
use crate::runner::state::{StepReport, StepStatus, SuiteReport};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

/// Generate JUnit XML report string from TestResults. Each suite becomes
/// a testsuite, each step a testcase, so CI groups them naturally.
pub fn generate_junit_xml(results: &TestResults) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    // Write XML declaration
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    // <testsuites> with session-wide totals
    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "confes-tester-run"));
    suites_start.push_attribute(("id", results.session_id.as_str()));
    suites_start.push_attribute(("tests", results.summary.total_steps.to_string().as_str()));
    suites_start.push_attribute(("failures", results.summary.failed.to_string().as_str()));
    suites_start.push_attribute(("skipped", results.summary.skipped.to_string().as_str()));
    suites_start.push_attribute((
        "time",
        (results.summary.total_duration_ms.unwrap_or(0) as f64 / 1000.0)
            .to_string()
            .as_str(),
    ));
    writer.write_event(Event::Start(suites_start))?;

    for suite in &results.suites {
        write_test_suite(&mut writer, suite, &results.generated_at)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let result = writer.into_inner().into_inner();
    let xml = String::from_utf8(result)?;
    Ok(xml)
}

fn write_test_suite<W: std::io::Write>(
    writer: &mut Writer<W>,
    suite: &SuiteReport,
    timestamp: &str,
) -> Result<()> {
    let failures = suite
        .steps
        .iter()
        .filter(|s| matches!(s.status, StepStatus::Failed { .. }))
        .count();
    let skipped = suite
        .steps
        .iter()
        .filter(|s| matches!(s.status, StepStatus::Skipped { .. }))
        .count();

    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", suite.suite_name.as_str()));
    suite_start.push_attribute(("tests", suite.steps.len().to_string().as_str()));
    suite_start.push_attribute(("failures", failures.to_string().as_str()));
    suite_start.push_attribute(("skipped", skipped.to_string().as_str()));
    suite_start.push_attribute((
        "time",
        (suite.total_duration_ms.unwrap_or(0) as f64 / 1000.0)
            .to_string()
            .as_str(),
    ));
    suite_start.push_attribute(("timestamp", timestamp));
    writer.write_event(Event::Start(suite_start))?;

    for step in &suite.steps {
        write_test_case(writer, &suite.suite_name, step)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    Ok(())
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    suite_name: &str,
    step: &StepReport,
) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", step.name.as_str()));
    case_start.push_attribute(("classname", suite_name));
    case_start.push_attribute((
        "time",
        (step.duration_ms.unwrap_or(0) as f64 / 1000.0)
            .to_string()
            .as_str(),
    ));
    writer.write_event(Event::Start(case_start))?;

    match &step.status {
        StepStatus::Failed { detail } => {
            let mut fail_start = BytesStart::new("failure");
            fail_start.push_attribute(("message", detail.as_str()));
            fail_start.push_attribute(("type", "AssertionError"));
            writer.write_event(Event::Start(fail_start))?;
            writer.write_event(Event::Text(BytesText::new(detail)))?;
            writer.write_event(Event::End(BytesEnd::new("failure")))?;
        }
        StepStatus::Skipped { reason } => {
            let mut skip_start = BytesStart::new("skipped");
            skip_start.push_attribute(("message", reason.as_str()));
            writer.write_event(Event::Empty(skip_start))?;
        }
        _ => {}
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Generate JUnit report to a file or stdout
pub async fn generate(results: &TestResults, output: Option<&Path>) -> Result<()> {
    let xml = generate_junit_xml(results)?;

    if let Some(path) = output {
        std::fs::write(path, xml)?;
        println!("JUnit report saved to: {}", path.display());
    } else {
        println!("{}", xml);
    }

    Ok(())
}

/// Write report to the output directory
pub fn write_report(results: &TestResults, output_dir: &Path) -> Result<()> {
    let xml = generate_junit_xml(results)?;
    let path = output_dir.join("junit.xml");
    std::fs::write(&path, xml)?;
    println!("    Generated JUnit report: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::TestResults;
    use crate::runner::state::{StepReport, StepStatus, SuiteReport, SuiteStatus, TestSummary};

    #[test]
    fn test_generate_junit_xml() {
        let results = TestResults {
            session_id: "test-session".to_string(),
            suites: vec![SuiteReport {
                suite_name: "cancellation".to_string(),
                description: "Band deletion and confession cancellation".to_string(),
                status: SuiteStatus::PartiallyPassed {
                    passed: 1,
                    failed: 1,
                },
                steps: vec![
                    StepReport {
                        index: 0,
                        name: "Priest Login".to_string(),
                        critical: false,
                        status: StepStatus::Passed {
                            detail: "logged in as padre.parroco@sanmiguel.es".to_string(),
                        },
                        duration_ms: Some(120),
                    },
                    StepReport {
                        index: 1,
                        name: "Cancel Booked Confession".to_string(),
                        critical: true,
                        status: StepStatus::Failed {
                            detail: "status not updated to cancelled, got booked".to_string(),
                        },
                        duration_ms: Some(95),
                    },
                    StepReport {
                        index: 2,
                        name: "Delete Existing Band With Bookings".to_string(),
                        critical: false,
                        status: StepStatus::Skipped {
                            reason: "no existing band with bookings".to_string(),
                        },
                        duration_ms: Some(1),
                    },
                ],
                total_duration_ms: Some(216),
            }],
            summary: TestSummary {
                session_id: "test-session".to_string(),
                total_suites: 1,
                total_steps: 3,
                passed: 1,
                failed: 1,
                skipped: 1,
                critical_failed: 1,
                total_duration_ms: Some(216),
            },
            generated_at: "2025-01-01 12:00:00".to_string(),
        };

        let xml = generate_junit_xml(&results).expect("Failed to generate XML");

        assert!(xml.contains(r#"<testsuites name="confes-tester-run""#));
        assert!(xml.contains(r#"tests="3""#));
        assert!(xml.contains(r#"failures="1""#));
        assert!(xml.contains(r#"skipped="1""#));
        assert!(xml.contains(r#"<testsuite name="cancellation""#));
        assert!(xml.contains(r#"<testcase name="Priest Login" classname="cancellation""#));
        assert!(xml.contains(r#"message="status not updated to cancelled, got booked""#));
        assert!(xml.contains(r#"<skipped message="no existing band with bookings"/>"#));
    }

    #[test]
    fn all_passing_report_has_no_failure_elements() {
        let results = TestResults {
            session_id: "s".to_string(),
            suites: vec![SuiteReport {
                suite_name: "directory".to_string(),
                description: String::new(),
                status: SuiteStatus::Passed,
                steps: vec![StepReport {
                    index: 0,
                    name: "List Dioceses".to_string(),
                    critical: false,
                    status: StepStatus::Passed {
                        detail: "1 dioceses listed".to_string(),
                    },
                    duration_ms: Some(8),
                }],
                total_duration_ms: Some(8),
            }],
            summary: TestSummary {
                session_id: "s".to_string(),
                total_suites: 1,
                total_steps: 1,
                passed: 1,
                failed: 0,
                skipped: 0,
                critical_failed: 0,
                total_duration_ms: Some(8),
            },
            generated_at: "2025-01-01 12:00:00".to_string(),
        };

        let xml = generate_junit_xml(&results).unwrap();
        assert!(!xml.contains("<failure"));
        assert!(!xml.contains("<skipped"));
        assert!(xml.contains(r#"failures="0""#));
    }
}
