use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Case execution status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CaseStatus {
    Pending,
    Running,
    Passed,
    Failed { error: String },
    Skipped { reason: String },
}

impl CaseStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CaseStatus::Passed | CaseStatus::Failed { .. } | CaseStatus::Skipped { .. }
        )
    }
}

/// State for a single case execution
#[derive(Debug, Clone)]
pub struct CaseState {
    pub index: usize,
    pub case_name: String,
    pub case_display: String,
    pub status: CaseStatus,
    pub actual_status: Option<u16>,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    pub duration_ms: Option<u64>,
}

impl CaseState {
    pub fn new(index: usize, name: &str, display: &str) -> Self {
        Self {
            index,
            case_name: name.to_string(),
            case_display: display.to_string(),
            status: CaseStatus::Pending,
            actual_status: None,
            started_at: None,
            finished_at: None,
            duration_ms: None,
        }
    }

    pub fn start(&mut self) {
        self.status = CaseStatus::Running;
        self.started_at = Some(Instant::now());
    }

    pub fn pass(&mut self) {
        self.finish(CaseStatus::Passed);
    }

    pub fn fail(&mut self, error: String) {
        self.finish(CaseStatus::Failed { error });
    }

    pub fn skip(&mut self, reason: String) {
        self.status = CaseStatus::Skipped { reason };
    }

    fn finish(&mut self, status: CaseStatus) {
        self.status = status;
        self.finished_at = Some(Instant::now());
        if let Some(start) = self.started_at {
            self.duration_ms = Some(start.elapsed().as_millis() as u64);
        }
    }

    /// Serialize state for reporting (without Instant which isn't serializable)
    pub fn to_report(&self) -> CaseStateReport {
        CaseStateReport {
            index: self.index,
            case_name: self.case_name.clone(),
            case_display: self.case_display.clone(),
            status: self.status.clone(),
            actual_status: self.actual_status,
            duration_ms: self.duration_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStateReport {
    pub index: usize,
    pub case_name: String,
    pub case_display: String,
    pub status: CaseStatus,
    pub actual_status: Option<u16>,
    pub duration_ms: Option<u64>,
}

/// State for a whole suite execution
#[derive(Debug, Clone)]
pub struct SuiteState {
    pub suite_name: String,
    pub suite_path: String,
    pub status: SuiteStatus,
    pub cases: Vec<CaseState>,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    pub total_duration_ms: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SuiteStatus {
    Pending,
    Running,
    Passed,
    Failed,
    PartiallyPassed { passed: u32, failed: u32 },
}

impl SuiteState {
    pub fn new(name: &str, path: &str, cases: Vec<CaseState>) -> Self {
        Self {
            suite_name: name.to_string(),
            suite_path: path.to_string(),
            status: SuiteStatus::Pending,
            cases,
            started_at: None,
            finished_at: None,
            total_duration_ms: None,
            error: None,
        }
    }

    pub fn start(&mut self) {
        self.status = SuiteStatus::Running;
        self.started_at = Some(Instant::now());
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Instant::now());
        if let Some(start) = self.started_at {
            self.total_duration_ms = Some(start.elapsed().as_millis() as u64);
        }

        let (passed, failed) = self
            .cases
            .iter()
            .fold((0, 0), |(p, f), case| match case.status {
                CaseStatus::Passed => (p + 1, f),
                CaseStatus::Failed { .. } => (p, f + 1),
                _ => (p, f),
            });

        self.status = if failed == 0 {
            SuiteStatus::Passed
        } else if passed == 0 {
            SuiteStatus::Failed
        } else {
            SuiteStatus::PartiallyPassed { passed, failed }
        };
    }

    pub fn skip_remaining(&mut self, reason: &str) {
        for case in &mut self.cases {
            if matches!(case.status, CaseStatus::Pending) {
                case.skip(reason.to_string());
            }
        }
    }

    /// Serialize state for reporting
    pub fn to_report(&self) -> SuiteStateReport {
        SuiteStateReport {
            suite_name: self.suite_name.clone(),
            suite_path: self.suite_path.clone(),
            status: self.status.clone(),
            cases: self.cases.iter().map(|c| c.to_report()).collect(),
            total_duration_ms: self.total_duration_ms,
            error: self.error.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteStateReport {
    pub suite_name: String,
    pub suite_path: String,
    pub status: SuiteStatus,
    pub cases: Vec<CaseStateReport>,
    pub total_duration_ms: Option<u64>,
    pub error: Option<String>,
}

/// Global verification session state
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub suites: Vec<SuiteState>,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl SessionState {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            suites: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    pub fn add_suite(&mut self, suite: SuiteState) {
        self.suites.push(suite);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Instant::now());
    }

    pub fn summary(&self) -> RunSummary {
        let mut total_cases = 0;
        let mut passed = 0;
        let mut failed = 0;
        let mut skipped = 0;

        for suite in &self.suites {
            for case in &suite.cases {
                total_cases += 1;
                match case.status {
                    CaseStatus::Passed => passed += 1,
                    CaseStatus::Failed { .. } => failed += 1,
                    CaseStatus::Skipped { .. } => skipped += 1,
                    _ => {}
                }
            }
        }

        let total_duration_ms = self.started_at.map(|start| {
            self.finished_at
                .unwrap_or_else(Instant::now)
                .duration_since(start)
                .as_millis() as u64
        });

        RunSummary {
            session_id: self.session_id.clone(),
            total_suites: self.suites.len() as u32,
            total_cases,
            passed,
            failed,
            skipped,
            total_duration_ms,
        }
    }

    /// Serialize state for reporting
    pub fn to_report(&self) -> SessionReport {
        SessionReport {
            session_id: self.session_id.clone(),
            suites: self.suites.iter().map(|s| s.to_report()).collect(),
            summary: self.summary(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub session_id: String,
    pub total_suites: u32,
    pub total_cases: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub total_duration_ms: Option<u64>,
}

impl RunSummary {
    /// The process-level verdict: true iff every case passed
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub session_id: String,
    pub suites: Vec<SuiteStateReport>,
    pub summary: RunSummary,
}
