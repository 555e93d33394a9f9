use super::types::VerifyResults;
use crate::runner::state::{CaseStateReport, CaseStatus, SuiteStateReport};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

/// Generate JUnit XML report string from VerifyResults
pub fn generate_junit_xml(results: &VerifyResults) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let total_tests: usize = results.suites.iter().map(|s| s.cases.len()).sum();
    let failures: usize = results
        .suites
        .iter()
        .flat_map(|s| &s.cases)
        .filter(|c| matches!(c.status, CaseStatus::Failed { .. }))
        .count();
    let skipped: usize = results
        .suites
        .iter()
        .flat_map(|s| &s.cases)
        .filter(|c| matches!(c.status, CaseStatus::Skipped { .. }))
        .count();
    let total_duration: u64 = results
        .suites
        .iter()
        .map(|s| s.total_duration_ms.unwrap_or(0))
        .sum();

    // <testsuites>
    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "contract-probe-run"));
    suites_start.push_attribute(("tests", total_tests.to_string().as_str()));
    suites_start.push_attribute(("failures", failures.to_string().as_str()));
    suites_start.push_attribute(("skipped", skipped.to_string().as_str()));
    suites_start.push_attribute((
        "time",
        (total_duration as f64 / 1000.0).to_string().as_str(),
    ));
    writer.write_event(Event::Start(suites_start))?;

    for suite in &results.suites {
        write_test_suite(&mut writer, suite, &results.session_id, &results.generated_at)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let result = writer.into_inner().into_inner();
    let xml = String::from_utf8(result)?;
    Ok(xml)
}

fn write_test_suite<W: std::io::Write>(
    writer: &mut Writer<W>,
    suite: &SuiteStateReport,
    session_id: &str,
    timestamp: &str,
) -> Result<()> {
    let failures = suite
        .cases
        .iter()
        .filter(|c| matches!(c.status, CaseStatus::Failed { .. }))
        .count();
    let skipped = suite
        .cases
        .iter()
        .filter(|c| matches!(c.status, CaseStatus::Skipped { .. }))
        .count();

    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", suite.suite_name.as_str()));
    suite_start.push_attribute(("tests", suite.cases.len().to_string().as_str()));
    suite_start.push_attribute(("failures", failures.to_string().as_str()));
    suite_start.push_attribute(("skipped", skipped.to_string().as_str()));
    suite_start.push_attribute(("id", session_id));
    suite_start.push_attribute((
        "time",
        (suite.total_duration_ms.unwrap_or(0) as f64 / 1000.0)
            .to_string()
            .as_str(),
    ));
    suite_start.push_attribute(("timestamp", timestamp));
    writer.write_event(Event::Start(suite_start))?;

    for case in &suite.cases {
        write_test_case(writer, case, &suite.suite_path)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    Ok(())
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    case: &CaseStateReport,
    suite_path: &str,
) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    let classname = suite_path.replace('/', ".");

    case_start.push_attribute(("name", case.case_name.as_str()));
    case_start.push_attribute(("classname", classname.as_str()));
    case_start.push_attribute((
        "time",
        (case.duration_ms.unwrap_or(0) as f64 / 1000.0)
            .to_string()
            .as_str(),
    ));

    writer.write_event(Event::Start(case_start))?;

    match &case.status {
        CaseStatus::Failed { error } => {
            let mut fail_start = BytesStart::new("failure");
            fail_start.push_attribute(("message", error.as_str()));
            fail_start.push_attribute(("type", "ContractViolation"));
            writer.write_event(Event::Start(fail_start))?;
            writer.write_event(Event::Text(quick_xml::events::BytesText::new(error)))?;
            writer.write_event(Event::End(BytesEnd::new("failure")))?;
        }
        CaseStatus::Skipped { reason } => {
            let mut skip_start = BytesStart::new("skipped");
            skip_start.push_attribute(("message", reason.as_str()));
            writer.write_event(Event::Start(skip_start))?;
            writer.write_event(Event::End(BytesEnd::new("skipped")))?;
        }
        _ => {}
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Write report to file
pub fn write_report(results: &VerifyResults, output_dir: &Path) -> Result<()> {
    let xml = generate_junit_xml(results)?;
    let path = output_dir.join("junit.xml");
    std::fs::write(&path, xml)?;
    println!("    Generated JUnit report: {}", path.display());
    Ok(())
}

/// Generate JUnit report to an explicit path or stdout
pub fn generate(results: &VerifyResults, output: Option<&Path>) -> Result<()> {
    let xml = generate_junit_xml(results)?;

    if let Some(path) = output {
        std::fs::write(path, &xml)?;
        println!("JUnit report saved to: {}", path.display());
    } else {
        println!("{}", xml);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::VerifyResults;
    use crate::runner::state::{CaseStateReport, RunSummary, SuiteStateReport, SuiteStatus};

    fn case(index: usize, name: &str, status: CaseStatus) -> CaseStateReport {
        CaseStateReport {
            index,
            case_name: name.to_string(),
            case_display: name.to_string(),
            status,
            actual_status: None,
            duration_ms: Some(120),
        }
    }

    #[test]
    fn test_generate_junit_xml() {
        let results = VerifyResults {
            session_id: "test-session".to_string(),
            suites: vec![SuiteStateReport {
                suite_name: "download-api".to_string(),
                suite_path: "suites/download.yaml".to_string(),
                status: SuiteStatus::PartiallyPassed {
                    passed: 1,
                    failed: 1,
                },
                cases: vec![
                    case(0, "accepts a checkpoint request", CaseStatus::Passed),
                    case(
                        1,
                        "rejects an unknown model type",
                        CaseStatus::Failed {
                            error: "expected status 400, got 200".to_string(),
                        },
                    ),
                ],
                total_duration_ms: Some(1500),
                error: None,
            }],
            summary: RunSummary {
                session_id: "test-session".to_string(),
                total_suites: 1,
                total_cases: 2,
                passed: 1,
                failed: 1,
                skipped: 0,
                total_duration_ms: Some(1500),
            },
            generated_at: "2023-01-01 12:00:00".to_string(),
        };

        let xml = generate_junit_xml(&results).expect("Failed to generate XML");

        assert!(xml.contains(r#"<testsuites name="contract-probe-run""#));
        assert!(xml.contains(r#"tests="2""#));
        assert!(xml.contains(r#"failures="1""#));
        assert!(xml.contains(r#"<testsuite name="download-api""#));
        assert!(xml.contains(r#"<testcase name="accepts a checkpoint request""#));
        assert!(xml.contains(r#"message="expected status 400, got 200""#));
    }

    #[test]
    fn test_skipped_cases_are_marked() {
        let results = VerifyResults {
            session_id: "s".to_string(),
            suites: vec![SuiteStateReport {
                suite_name: "interrupted".to_string(),
                suite_path: "builtin:download-api".to_string(),
                status: SuiteStatus::Failed,
                cases: vec![case(
                    0,
                    "never ran",
                    CaseStatus::Skipped {
                        reason: "interrupted".to_string(),
                    },
                )],
                total_duration_ms: Some(10),
                error: None,
            }],
            summary: RunSummary {
                session_id: "s".to_string(),
                total_suites: 1,
                total_cases: 1,
                passed: 0,
                failed: 0,
                skipped: 1,
                total_duration_ms: Some(10),
            },
            generated_at: "2023-01-01 12:00:00".to_string(),
        };

        let xml = generate_junit_xml(&results).unwrap();
        assert!(xml.contains(r#"skipped="1""#));
        assert!(xml.contains(r#"<skipped message="interrupted""#));
    }
}
