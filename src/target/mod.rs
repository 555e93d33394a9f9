pub mod http;

use crate::parser::types::RequestSpec;
use async_trait::async_trait;
use thiserror::Error;

pub use http::{HttpTarget, HttpTargetBuilder};

/// Faults a single check can surface. Every variant is recovered into a
/// failed case result; none abort the run.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("expected status {expected}, got {actual}")]
    UnexpectedStatus { expected: u16, actual: u16 },

    #[error("response body is missing field \"{field}\"")]
    MissingField { field: String },

    #[error("artifact does not contain {construct}")]
    StructuralMismatch { construct: String },

    #[error("invalid structural pattern: {0}")]
    InvalidPattern(String),

    #[error("operation \"{operation}\" is not in the declared contract listing")]
    MissingCapability { operation: String },

    #[error("no contract listing declared (pass --operations or set `operations:` in the suite)")]
    NoContractListing,

    #[error("artifact unavailable: {0}")]
    Artifact(String),

    #[error("no base URL configured for request cases")]
    NoBaseUrl,
}

/// Snapshot of one HTTP exchange
#[derive(Debug, Clone)]
pub struct Exchange {
    pub status: u16,

    /// Parsed payload, present only when the response body is valid JSON
    pub body: Option<serde_json::Value>,

    pub raw: String,
}

impl Exchange {
    /// Whether the JSON body is a mapping carrying `field` at the top level
    pub fn has_field(&self, field: &str) -> bool {
        self.body
            .as_ref()
            .and_then(|b| b.as_object())
            .map_or(false, |map| map.contains_key(field))
    }
}

/// A verification target: a live server plus the static material (artifact
/// text, declared operation listing) cases are checked against.
///
/// Targets are constructed explicitly per run and dropped when the run
/// ends; tests inject fakes through this trait.
#[async_trait]
pub trait Target: Send + Sync {
    /// Issue the HTTP request a case describes and snapshot the response
    async fn execute(&self, request: &RequestSpec) -> Result<Exchange, CheckError>;

    /// Text content of the static artifact, for structural cases
    fn artifact_text(&self) -> Result<&str, CheckError>;

    /// Declared contract listing, for capability cases
    fn operations(&self) -> &[String];

    fn describe(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exchange(body: Option<serde_json::Value>) -> Exchange {
        Exchange {
            status: 200,
            raw: body.as_ref().map(|b| b.to_string()).unwrap_or_default(),
            body,
        }
    }

    #[test]
    fn test_has_field_on_mapping() {
        let ex = exchange(Some(json!({"path": "/models/checkpoints/m.safetensors"})));
        assert!(ex.has_field("path"));
        assert!(!ex.has_field("size"));
    }

    #[test]
    fn test_has_field_on_non_mapping_body() {
        assert!(!exchange(Some(json!(["path"]))).has_field("path"));
        assert!(!exchange(None).has_field("path"));
    }
}
