use crate::runner::state::{RunSummary, SuiteStateReport};
use serde::{Deserialize, Serialize};

/// Verification results for report generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResults {
    pub session_id: String,
    pub suites: Vec<SuiteStateReport>,
    pub summary: RunSummary,
    pub generated_at: String,
}
