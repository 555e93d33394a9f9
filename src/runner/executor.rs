use anyhow::Result;
use colored::Colorize;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::events::{ConsoleEventListener, EventEmitter, VerifyEvent};
use super::state::{CaseState, CaseStatus, RunSummary, SessionState, SuiteState};
use crate::parser::types::{
    CapabilitySpec, CheckSpec, ExpectationSpec, RequestSpec, StructuralSpec, TestCase, TestSuite,
};
use crate::target::{CheckError, Target};

/// Recorded outcome of executing one case. Exactly one is produced per
/// case per run; transport faults are folded in, never propagated.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseOutcome {
    pub passed: bool,
    pub actual_status: Option<u16>,
    pub error: Option<String>,
}

impl CaseOutcome {
    fn passed(status: Option<u16>) -> Self {
        Self {
            passed: true,
            actual_status: status,
            error: None,
        }
    }

    fn failed(status: Option<u16>, error: CheckError) -> Self {
        Self {
            passed: false,
            actual_status: status,
            error: Some(error.to_string()),
        }
    }
}

pub struct SuiteExecutor {
    session: SessionState,
    emitter: EventEmitter,
    output_dir: PathBuf,
    report_enabled: bool,
    target_tags: Option<Vec<String>>,
    stop: Arc<AtomicBool>,
}

impl SuiteExecutor {
    pub fn new(
        output_dir: Option<&Path>,
        report: bool,
        target_tags: Option<Vec<String>>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let (emitter, receiver) = EventEmitter::new();

        // Start console listener in background
        tokio::spawn(ConsoleEventListener::listen(receiver));

        let session = SessionState::new(&Uuid::new_v4().to_string());
        emitter.emit(VerifyEvent::SessionStarted {
            session_id: session.session_id.clone(),
        });

        let mut executor = Self {
            session,
            emitter,
            output_dir: output_dir
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("./output")),
            report_enabled: report,
            target_tags,
            stop,
        };
        executor.session.start();
        executor
    }

    /// Subscribe to verification events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<VerifyEvent> {
        self.emitter.subscribe()
    }

    /// Run a suite against a target, one case at a time in declaration
    /// order. A case failure never prevents later cases from running.
    pub async fn run_suite(
        &mut self,
        suite: &TestSuite,
        suite_path: &str,
        target: &dyn Target,
        case_index: Option<usize>,
        case_name: Option<&str>,
    ) -> Result<()> {
        if let Some(ref required_tags) = self.target_tags {
            let matches_all = required_tags.iter().all(|req| suite.tags.contains(req));
            if !matches_all {
                self.emitter.emit(VerifyEvent::Log {
                    message: format!(
                        "{} Skipping suite due to tag mismatch. Required: {:?}, Suite tags: {:?}",
                        "ℹ".blue(),
                        required_tags,
                        suite.tags
                    ),
                });
                return Ok(());
            }
        }

        let cases = select_cases(suite, case_index, case_name)?;

        let case_states: Vec<CaseState> = cases
            .iter()
            .enumerate()
            .map(|(i, case)| CaseState::new(i, &case.name, &case.display_name()))
            .collect();

        let mut suite_state = SuiteState::new(suite.display_name(), suite_path, case_states);

        self.emitter.emit(VerifyEvent::SuiteStarted {
            suite_name: suite_state.suite_name.clone(),
            suite_path: suite_path.to_string(),
            case_count: cases.len(),
        });

        suite_state.start();

        for (i, case) in cases.iter().enumerate() {
            if self.stop.load(Ordering::SeqCst) {
                suite_state.skip_remaining("interrupted");
                for state in suite_state.cases.iter().skip(i) {
                    self.emitter.emit(VerifyEvent::CaseSkipped {
                        suite_name: suite_state.suite_name.clone(),
                        index: state.index,
                        reason: "interrupted".to_string(),
                    });
                }
                break;
            }

            let state = &mut suite_state.cases[i];
            state.start();

            self.emitter.emit(VerifyEvent::CaseStarted {
                suite_name: suite_state.suite_name.clone(),
                index: i,
                case: case.display_name(),
            });

            let outcome = run_case(case, target).await;
            let state = &mut suite_state.cases[i];
            state.actual_status = outcome.actual_status;

            if outcome.passed {
                state.pass();
                self.emitter.emit(VerifyEvent::CasePassed {
                    suite_name: suite_state.suite_name.clone(),
                    index: i,
                    duration_ms: state.duration_ms.unwrap_or(0),
                });
            } else {
                let error = outcome
                    .error
                    .unwrap_or_else(|| "unspecified failure".to_string());
                state.fail(error.clone());
                self.emitter.emit(VerifyEvent::CaseFailed {
                    suite_name: suite_state.suite_name.clone(),
                    index: i,
                    error,
                    duration_ms: state.duration_ms.unwrap_or(0),
                });
            }
        }

        suite_state.finish();

        self.emitter.emit(VerifyEvent::SuiteFinished {
            suite_name: suite_state.suite_name.clone(),
            status: suite_state.status.clone(),
            duration_ms: suite_state.total_duration_ms,
        });

        self.session.add_suite(suite_state);
        Ok(())
    }

    /// Finish the session: print the case recap, emit the summary, and
    /// write reports when enabled. Returns the summary so the caller can
    /// derive the process exit status.
    pub async fn finish(&mut self) -> Result<RunSummary> {
        self.session.finish();
        let summary = self.session.summary();

        self.print_recap();

        self.emitter.emit(VerifyEvent::SessionFinished {
            summary: summary.clone(),
        });

        // Let the listener drain before printing report paths
        tokio::time::sleep(tokio::time::Duration::from_millis(300)).await;

        if self.report_enabled {
            let report_data = self.session.to_report();
            std::fs::create_dir_all(&self.output_dir)?;

            let results = crate::report::types::VerifyResults {
                session_id: report_data.session_id.clone(),
                suites: report_data.suites,
                summary: report_data.summary,
                generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            };

            let json_path = self.output_dir.join("verify-results.json");
            let json = serde_json::to_string_pretty(&results)?;
            std::fs::write(&json_path, json)?;
            println!(
                "\n{} JSON report saved to: {}",
                "📄".to_string().blue(),
                json_path.display().to_string().cyan()
            );

            crate::report::junit::write_report(&results, &self.output_dir)?;
        }

        Ok(summary)
    }

    /// Enumerate every case outcome before the summary block
    fn print_recap(&self) {
        if self.session.suites.is_empty() {
            return;
        }

        println!("\n{} Case outcomes", "■".blue().bold());
        for suite in &self.session.suites {
            println!("  {}", suite.suite_name.white().bold());
            for case in &suite.cases {
                match &case.status {
                    CaseStatus::Passed => {
                        println!("    {} {}", "✓".green(), case.case_name);
                    }
                    CaseStatus::Failed { error } => {
                        println!("    {} {}", "✗".red(), case.case_name);
                        println!("        {}", error.dimmed());
                    }
                    CaseStatus::Skipped { reason } => {
                        println!(
                            "    {} {} ({})",
                            "○".yellow(),
                            case.case_name,
                            reason.dimmed()
                        );
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Select the cases to run, honoring single-case filters
fn select_cases<'a>(
    suite: &'a TestSuite,
    case_index: Option<usize>,
    case_name: Option<&str>,
) -> Result<Vec<&'a TestCase>> {
    if let Some(idx) = case_index {
        if idx >= suite.cases.len() {
            anyhow::bail!(
                "Case index {} is out of range. Suite has {} cases.",
                idx,
                suite.cases.len()
            );
        }
        return Ok(vec![&suite.cases[idx]]);
    }

    if let Some(name) = case_name {
        let found = suite.cases.iter().find(|case| {
            let case_name = case.name.to_lowercase();
            case_name == name.to_lowercase() || case_name.starts_with(&name.to_lowercase())
        });
        return match found {
            Some(case) => Ok(vec![case]),
            None => anyhow::bail!(
                "Case '{}' not found in suite. Available cases: {}",
                name,
                suite
                    .cases
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
    }

    Ok(suite.cases.iter().collect())
}

/// Execute one case against a target. Never raises: connection failures,
/// timeouts, and every other fault come back as a failed outcome.
pub async fn run_case(case: &TestCase, target: &dyn Target) -> CaseOutcome {
    match &case.check {
        CheckSpec::Request(request) => run_request_case(request, &case.expect, target).await,
        CheckSpec::Structural(spec) => run_structural_case(spec, target),
        CheckSpec::Capability(spec) => run_capability_case(spec, target),
    }
}

async fn run_request_case(
    request: &RequestSpec,
    expect: &ExpectationSpec,
    target: &dyn Target,
) -> CaseOutcome {
    let exchange = match target.execute(request).await {
        Ok(exchange) => exchange,
        Err(error) => return CaseOutcome::failed(None, error),
    };

    let actual = exchange.status;

    // Negative test: the server is expected to reject the request, and
    // the body shape is irrelevant.
    if expect.reject {
        return if actual == expect.status {
            CaseOutcome::passed(Some(actual))
        } else {
            CaseOutcome::failed(
                Some(actual),
                CheckError::UnexpectedStatus {
                    expected: expect.status,
                    actual,
                },
            )
        };
    }

    if actual != expect.status {
        return CaseOutcome::failed(
            Some(actual),
            CheckError::UnexpectedStatus {
                expected: expect.status,
                actual,
            },
        );
    }

    // Field requirements apply only when the body is JSON
    if exchange.body.is_some() {
        for field in &expect.body_fields {
            if !exchange.has_field(field) {
                return CaseOutcome::failed(
                    Some(actual),
                    CheckError::MissingField {
                        field: field.clone(),
                    },
                );
            }
        }
    }

    CaseOutcome::passed(Some(actual))
}

fn run_structural_case(spec: &StructuralSpec, target: &dyn Target) -> CaseOutcome {
    let text = match target.artifact_text() {
        Ok(text) => text,
        Err(error) => return CaseOutcome::failed(None, error),
    };

    let found = if spec.regex {
        match Regex::new(&spec.pattern) {
            Ok(re) => re.is_match(text),
            Err(e) => return CaseOutcome::failed(None, CheckError::InvalidPattern(e.to_string())),
        }
    } else {
        text.contains(&spec.pattern)
    };

    if found {
        CaseOutcome::passed(None)
    } else {
        CaseOutcome::failed(
            None,
            CheckError::StructuralMismatch {
                construct: spec.construct.clone(),
            },
        )
    }
}

fn run_capability_case(spec: &CapabilitySpec, target: &dyn Target) -> CaseOutcome {
    let operations = target.operations();
    if operations.is_empty() {
        return CaseOutcome::failed(None, CheckError::NoContractListing);
    }

    if operations.iter().any(|op| op == &spec.operation) {
        CaseOutcome::passed(None)
    } else {
        CaseOutcome::failed(
            None,
            CheckError::MissingCapability {
                operation: spec.operation.clone(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::types::Method;
    use crate::target::Exchange;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;

    /// Deterministic in-memory target for executor tests
    struct FakeTarget {
        responses: HashMap<String, Exchange>,
        refuse: bool,
        artifact: Option<String>,
        operations: Vec<String>,
    }

    impl FakeTarget {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                refuse: false,
                artifact: None,
                operations: Vec::new(),
            }
        }

        fn respond(mut self, path: &str, status: u16, body: serde_json::Value) -> Self {
            self.responses.insert(
                path.to_string(),
                Exchange {
                    status,
                    raw: body.to_string(),
                    body: Some(body),
                },
            );
            self
        }

        fn refusing(mut self) -> Self {
            self.refuse = true;
            self
        }

        fn with_artifact(mut self, text: &str) -> Self {
            self.artifact = Some(text.to_string());
            self
        }

        fn with_operations(mut self, ops: &[&str]) -> Self {
            self.operations = ops.iter().map(|s| s.to_string()).collect();
            self
        }
    }

    #[async_trait]
    impl Target for FakeTarget {
        async fn execute(&self, request: &RequestSpec) -> Result<Exchange, CheckError> {
            if self.refuse {
                return Err(CheckError::Connection("connection refused".to_string()));
            }
            self.responses
                .get(&request.path)
                .cloned()
                .ok_or_else(|| CheckError::Connection("no such route".to_string()))
        }

        fn artifact_text(&self) -> Result<&str, CheckError> {
            self.artifact
                .as_deref()
                .ok_or_else(|| CheckError::Artifact("no artifact configured".to_string()))
        }

        fn operations(&self) -> &[String] {
            &self.operations
        }

        fn describe(&self) -> String {
            "fake".to_string()
        }
    }

    fn request_case(path: &str, expect: ExpectationSpec) -> TestCase {
        TestCase {
            name: format!("case for {}", path),
            check: CheckSpec::Request(RequestSpec {
                method: Method::Post,
                path: path.to_string(),
                body: Some(json!({
                    "url": "https://example.com/model.safetensors",
                    "filename": "m.safetensors",
                    "model_type": "checkpoints"
                })),
                headers: None,
                timeout_ms: None,
            }),
            expect,
        }
    }

    fn expect_ok_with_path() -> ExpectationSpec {
        ExpectationSpec {
            status: 200,
            body_fields: vec!["path".to_string()],
            reject: false,
        }
    }

    #[tokio::test]
    async fn test_healthy_download_passes() {
        let target = FakeTarget::new().respond(
            "/api/download_model",
            200,
            json!({"path": "/models/checkpoints/m.safetensors"}),
        );
        let case = request_case("/api/download_model", expect_ok_with_path());

        let outcome = run_case(&case, &target).await;
        assert!(outcome.passed);
        assert_eq!(outcome.actual_status, Some(200));
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_missing_body_field_fails() {
        let target =
            FakeTarget::new().respond("/api/download_model", 200, json!({"status": "ok"}));
        let case = request_case("/api/download_model", expect_ok_with_path());

        let outcome = run_case(&case, &target).await;
        assert!(!outcome.passed);
        assert!(outcome.error.unwrap().contains("path"));
    }

    #[tokio::test]
    async fn test_rejection_passes_regardless_of_body() {
        let target = FakeTarget::new().respond(
            "/api/download_model",
            400,
            json!({"error": "Invalid model_type"}),
        );
        let case = request_case(
            "/api/download_model",
            ExpectationSpec {
                status: 400,
                body_fields: Vec::new(),
                reject: true,
            },
        );

        let outcome = run_case(&case, &target).await;
        assert!(outcome.passed);
        assert_eq!(outcome.actual_status, Some(400));
    }

    #[tokio::test]
    async fn test_accepted_forbidden_request_fails() {
        // The server accepted a request it should have rejected
        let target = FakeTarget::new().respond("/api/download_model", 200, json!({"path": "x"}));
        let case = request_case(
            "/api/download_model",
            ExpectationSpec {
                status: 400,
                body_fields: Vec::new(),
                reject: true,
            },
        );

        let outcome = run_case(&case, &target).await;
        assert!(!outcome.passed);
        assert!(outcome.error.unwrap().contains("expected status 400"));
    }

    #[tokio::test]
    async fn test_connection_refusal_downgrades_to_failed_result() {
        let target = FakeTarget::new().refusing();
        let case = request_case("/api/download_model", expect_ok_with_path());

        let outcome = run_case(&case, &target).await;
        assert!(!outcome.passed);
        assert_eq!(outcome.actual_status, None);
        assert!(outcome.error.unwrap().contains("connection"));
    }

    #[tokio::test]
    async fn test_run_is_idempotent_for_read_only_cases() {
        let target = FakeTarget::new().respond("/api/download_model", 200, json!({"path": "x"}));
        let case = request_case("/api/download_model", expect_ok_with_path());

        let first = run_case(&case, &target).await;
        let second = run_case(&case, &target).await;
        assert_eq!(first.passed, second.passed);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_structural_mismatch_names_the_construct() {
        let target = FakeTarget::new().with_artifact("class PromptServer:\n    pass\n");
        let case = TestCase {
            name: "route registration".to_string(),
            check: CheckSpec::Structural(StructuralSpec {
                construct: "download route registration".to_string(),
                pattern: "download_app.router.add_post(\"/download_model\"".to_string(),
                regex: false,
            }),
            expect: ExpectationSpec::default(),
        };

        let outcome = run_case(&case, &target).await;
        assert!(!outcome.passed);
        assert!(outcome
            .error
            .unwrap()
            .contains("download route registration"));
    }

    #[tokio::test]
    async fn test_structural_match_passes() {
        let target = FakeTarget::new()
            .with_artifact("    def download_model(self, request):\n        pass\n");
        let case = TestCase {
            name: "handler definition".to_string(),
            check: CheckSpec::Structural(StructuralSpec {
                construct: "download handler definition".to_string(),
                pattern: "def download_model(self".to_string(),
                regex: false,
            }),
            expect: ExpectationSpec::default(),
        };

        assert!(run_case(&case, &target).await.passed);
    }

    #[tokio::test]
    async fn test_structural_regex_mode() {
        let target = FakeTarget::new().with_artifact("download_app.router.add_post('/download_model', handler)");
        let case = TestCase {
            name: "route registration".to_string(),
            check: CheckSpec::Structural(StructuralSpec {
                construct: "download route registration".to_string(),
                pattern: r#"add_post\(['"]/download_model['"]"#.to_string(),
                regex: true,
            }),
            expect: ExpectationSpec::default(),
        };

        assert!(run_case(&case, &target).await.passed);
    }

    #[tokio::test]
    async fn test_capability_membership() {
        let target = FakeTarget::new().with_operations(&["download_model", "upload_model"]);

        let present = TestCase {
            name: "download exposed".to_string(),
            check: CheckSpec::Capability(CapabilitySpec {
                operation: "download_model".to_string(),
            }),
            expect: ExpectationSpec::default(),
        };
        assert!(run_case(&present, &target).await.passed);

        let absent = TestCase {
            name: "delete exposed".to_string(),
            check: CheckSpec::Capability(CapabilitySpec {
                operation: "delete_model".to_string(),
            }),
            expect: ExpectationSpec::default(),
        };
        let outcome = run_case(&absent, &target).await;
        assert!(!outcome.passed);
        assert!(outcome.error.unwrap().contains("delete_model"));
    }

    #[tokio::test]
    async fn test_suite_continues_past_failures() {
        let target = FakeTarget::new()
            .refusing()
            .with_artifact("def download_model(self, request):");

        let suite = TestSuite {
            name: Some("mixed".to_string()),
            cases: vec![
                request_case("/api/download_model", expect_ok_with_path()),
                TestCase {
                    name: "handler definition".to_string(),
                    check: CheckSpec::Structural(StructuralSpec {
                        construct: "download handler definition".to_string(),
                        pattern: "def download_model(self".to_string(),
                        regex: false,
                    }),
                    expect: ExpectationSpec::default(),
                },
            ],
            ..TestSuite::default()
        };

        let stop = Arc::new(AtomicBool::new(false));
        let mut executor = SuiteExecutor::new(None, false, None, stop);
        executor
            .run_suite(&suite, "mixed.yaml", &target, None, None)
            .await
            .unwrap();
        let summary = executor.finish().await.unwrap();

        // The refused network case failed but the structural case still ran
        assert_eq!(summary.total_cases, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.passed, 1);
        assert!(!summary.all_passed());
    }

    #[tokio::test]
    async fn test_interrupted_run_keeps_produced_results() {
        let target = FakeTarget::new().respond("/api/download_model", 200, json!({"path": "x"}));

        let suite = TestSuite {
            name: Some("interrupted".to_string()),
            cases: vec![
                request_case("/api/download_model", expect_ok_with_path()),
                request_case("/api/download_model", expect_ok_with_path()),
            ],
            ..TestSuite::default()
        };

        // Stop before the first case: everything is skipped but reportable
        let stop = Arc::new(AtomicBool::new(true));
        let mut executor = SuiteExecutor::new(None, false, None, stop);
        executor
            .run_suite(&suite, "interrupted.yaml", &target, None, None)
            .await
            .unwrap();
        let summary = executor.finish().await.unwrap();

        assert_eq!(summary.total_cases, 2);
        assert_eq!(summary.skipped, 2);
        assert!(!summary.all_passed());
    }

    #[test]
    fn test_select_cases_by_index_and_name() {
        let suite = TestSuite {
            cases: vec![
                request_case("/a", ExpectationSpec::default()),
                request_case("/b", ExpectationSpec::default()),
            ],
            ..TestSuite::default()
        };

        let by_index = select_cases(&suite, Some(1), None).unwrap();
        assert_eq!(by_index.len(), 1);
        assert_eq!(by_index[0].name, "case for /b");

        let by_name = select_cases(&suite, None, Some("case for /a")).unwrap();
        assert_eq!(by_name[0].name, "case for /a");

        assert!(select_cases(&suite, Some(5), None).is_err());
        assert!(select_cases(&suite, None, Some("nope")).is_err());
    }
}
