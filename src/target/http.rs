use super::{CheckError, Exchange, Target};
use crate::parser::types::{Method, RequestSpec};
use crate::utils::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Live verification target backed by a reqwest client.
///
/// The client is owned by the target and released with it when the run
/// ends, on every exit path.
pub struct HttpTarget {
    client: reqwest::Client,
    base_url: Option<String>,
    artifact: Result<String, String>,
    operations: Vec<String>,
    default_timeout: Duration,
}

impl HttpTarget {
    pub fn builder() -> HttpTargetBuilder {
        HttpTargetBuilder::default()
    }
}

#[derive(Default)]
pub struct HttpTargetBuilder {
    base_url: Option<String>,
    artifact_path: Option<PathBuf>,
    operations: Vec<String>,
    timeout_ms: Option<u64>,
}

impl HttpTargetBuilder {
    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    pub fn artifact_file(mut self, path: &Path) -> Self {
        self.artifact_path = Some(path.to_path_buf());
        self
    }

    pub fn operations(mut self, operations: Vec<String>) -> Self {
        self.operations = operations;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn build(self) -> Result<HttpTarget> {
        let config = Config::default();

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .context("Failed to construct HTTP client")?;

        // Artifact problems are folded into case results later, not raised
        // here: a missing source file fails its structural cases the same
        // way an unreachable server fails its request cases.
        let artifact = match self.artifact_path {
            Some(ref path) => std::fs::read_to_string(path)
                .map_err(|e| format!("{}: {}", path.display(), e)),
            None => Err("no artifact configured".to_string()),
        };
        if let Err(ref reason) = artifact {
            log::debug!("artifact not loaded ({})", reason);
        }

        Ok(HttpTarget {
            client,
            base_url: self.base_url,
            artifact,
            operations: self.operations,
            default_timeout: Duration::from_millis(
                self.timeout_ms.unwrap_or(config.default_timeout_ms),
            ),
        })
    }
}

#[async_trait]
impl Target for HttpTarget {
    async fn execute(&self, request: &RequestSpec) -> Result<Exchange, CheckError> {
        let base = self.base_url.as_deref().ok_or(CheckError::NoBaseUrl)?;
        let url = join_url(base, &request.path);
        let timeout = request
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout);

        let mut req = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };

        if let Some(headers) = &request.headers {
            for (k, v) in headers {
                req = req.header(k, v);
            }
        }

        if let Some(body) = &request.body {
            req = req.json(body);
        }

        log::debug!("{} {}", request.method, url);

        let res = req
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = res.status().as_u16();
        let raw = res
            .text()
            .await
            .map_err(|e| CheckError::Transport(e.to_string()))?;
        let body = serde_json::from_str(&raw).ok();

        log::debug!("{} {} -> {} ({} bytes)", request.method, url, status, raw.len());

        Ok(Exchange { status, body, raw })
    }

    fn artifact_text(&self) -> Result<&str, CheckError> {
        self.artifact
            .as_deref()
            .map_err(|reason| CheckError::Artifact(reason.clone()))
    }

    fn operations(&self) -> &[String] {
        &self.operations
    }

    fn describe(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| "static artifact only".to_string())
    }
}

/// Map a transport fault onto the error taxonomy
fn classify(err: reqwest::Error, timeout: Duration) -> CheckError {
    if err.is_timeout() {
        CheckError::Timeout(timeout.as_millis() as u64)
    } else if err.is_connect() {
        CheckError::Connection(err.to_string())
    } else {
        CheckError::Transport(err.to_string())
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("http://127.0.0.1:8188", "/api/download_model"),
            "http://127.0.0.1:8188/api/download_model"
        );
        assert_eq!(
            join_url("http://localhost:8188/", "download/download_model"),
            "http://localhost:8188/download/download_model"
        );
    }

    #[test]
    fn test_missing_artifact_is_deferred_to_case_time() {
        let target = HttpTarget::builder()
            .artifact_file(Path::new("does/not/exist.py"))
            .build()
            .unwrap();

        match target.artifact_text() {
            Err(CheckError::Artifact(reason)) => assert!(reason.contains("exist.py")),
            other => panic!("Expected artifact error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_unconfigured_base_url_is_reported() {
        let target = HttpTarget::builder().build().unwrap();
        assert_eq!(target.describe(), "static artifact only");
    }
}
