use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A parsed verification suite: header metadata plus an ordered case list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuite {
    #[serde(default)]
    pub name: Option<String>,

    /// Target base URL, e.g. "http://127.0.0.1:8188"
    #[serde(default)]
    pub base_url: Option<String>,

    /// Text artifact that structural cases are checked against,
    /// resolved relative to the suite file
    #[serde(default)]
    pub artifact: Option<String>,

    /// Declared contract listing consulted by capability cases
    #[serde(default)]
    pub operations: Vec<String>,

    #[serde(default, alias = "defaultTimeout")]
    pub default_timeout_ms: Option<u64>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub cases: Vec<TestCase>,
}

/// A single scripted check/expectation pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub name: String,

    #[serde(flatten)]
    pub check: CheckSpec,

    #[serde(default)]
    pub expect: ExpectationSpec,
}

/// What a case verifies: a live HTTP exchange, a containment check against
/// a static artifact, or membership in the declared contract listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckSpec {
    #[serde(alias = "http")]
    Request(RequestSpec),
    Structural(StructuralSpec),
    Capability(CapabilitySpec),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    #[serde(default)]
    pub method: Method,

    /// Endpoint path, joined onto the target base URL
    pub path: String,

    #[serde(default, alias = "jsonBody")]
    pub body: Option<serde_json::Value>,

    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,

    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[serde(alias = "get")]
    Get,
    #[default]
    #[serde(alias = "post")]
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// Containment check against the suite's text artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralSpec {
    /// Human name of the construct being looked for, used in diagnostics
    pub construct: String,

    /// Substring (or regex, when `regex` is set) expected in the artifact
    pub pattern: String,

    #[serde(default)]
    pub regex: bool,
}

/// Checks that a named operation appears in the target's declared
/// contract listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySpec {
    pub operation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectationSpec {
    #[serde(default = "default_status")]
    pub status: u16,

    /// Top-level fields the JSON response body must contain
    #[serde(default, alias = "fields")]
    pub body_fields: Vec<String>,

    /// Negative test: success means the server rejected the request with
    /// the expected status, regardless of body shape
    #[serde(default, alias = "forbiddenOutcome")]
    pub reject: bool,
}

fn default_status() -> u16 {
    200
}

impl Default for ExpectationSpec {
    fn default() -> Self {
        Self {
            status: default_status(),
            body_fields: Vec::new(),
            reject: false,
        }
    }
}

impl TestCase {
    /// Short display form used in progress output and state tracking
    pub fn display_name(&self) -> String {
        match &self.check {
            CheckSpec::Request(r) => format!("{} {}", r.method, r.path),
            CheckSpec::Structural(s) => format!("artifact contains {}", s.construct),
            CheckSpec::Capability(c) => format!("contract exposes \"{}\"", c.operation),
        }
    }
}

impl TestSuite {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }
}
