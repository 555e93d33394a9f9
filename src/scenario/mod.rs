//! Built-in scenarios for the model-management download contract.
//!
//! The download endpoint has been observed mounted two ways over time, so
//! both mount paths are kept as distinct named scenarios rather than
//! assuming one is obsolete.

use crate::parser::types::{
    CapabilitySpec, CheckSpec, ExpectationSpec, Method, RequestSpec, StructuralSpec, TestCase,
    TestSuite,
};
use serde_json::json;

pub fn names() -> Vec<&'static str> {
    vec!["download-api", "download-subapp", "route-structure"]
}

pub fn find(name: &str) -> Option<TestSuite> {
    match name {
        "download-api" => Some(download_api()),
        "download-subapp" => Some(download_subapp()),
        "route-structure" => Some(route_structure()),
        _ => None,
    }
}

pub fn all() -> Vec<TestSuite> {
    names().into_iter().filter_map(find).collect()
}

/// Live checks against the `/api` mount of the download endpoint
fn download_api() -> TestSuite {
    TestSuite {
        name: Some("download-api".to_string()),
        tags: vec!["live".to_string()],
        cases: vec![
            TestCase {
                name: "download_model accepts a checkpoint request".to_string(),
                check: CheckSpec::Request(RequestSpec {
                    method: Method::Post,
                    path: "/api/download_model".to_string(),
                    body: Some(json!({
                        "url": "https://huggingface.co/stabilityai/stable-diffusion-2-1/resolve/main/v2-1_768-ema-pruned.safetensors",
                        "filename": "test_model.safetensors",
                        "model_type": "checkpoints"
                    })),
                    headers: None,
                    timeout_ms: None,
                }),
                expect: ExpectationSpec {
                    status: 200,
                    body_fields: vec!["path".to_string()],
                    reject: false,
                },
            },
            TestCase {
                name: "download_model rejects an unknown model type".to_string(),
                check: CheckSpec::Request(RequestSpec {
                    method: Method::Post,
                    path: "/api/download_model".to_string(),
                    body: Some(json!({
                        "url": "https://example.com/test.safetensors",
                        "filename": "test.safetensors",
                        "model_type": "invalid_type"
                    })),
                    headers: None,
                    timeout_ms: Some(10_000),
                }),
                expect: ExpectationSpec {
                    status: 400,
                    body_fields: Vec::new(),
                    reject: true,
                },
            },
        ],
        ..TestSuite::default()
    }
}

/// Live check against the `/download` sub-application mount
fn download_subapp() -> TestSuite {
    TestSuite {
        name: Some("download-subapp".to_string()),
        tags: vec!["live".to_string()],
        cases: vec![TestCase {
            name: "download_model is reachable under the /download mount".to_string(),
            check: CheckSpec::Request(RequestSpec {
                method: Method::Post,
                path: "/download/download_model".to_string(),
                body: Some(json!({
                    "url": "https://huggingface.co/Comfy-Org/stable-diffusion-v1-5-image-vae/resolve/main/vae/diffusion_pytorch_model.bin",
                    "filename": "test_vae.bin",
                    "model_type": "vae"
                })),
                headers: None,
                timeout_ms: None,
            }),
            expect: ExpectationSpec {
                status: 200,
                body_fields: vec!["path".to_string()],
                reject: false,
            },
        }],
        ..TestSuite::default()
    }
}

/// Static checks against the server source: the handler, its
/// sub-application, and the route wiring must all be present.
fn route_structure() -> TestSuite {
    let structural = |name: &str, construct: &str, pattern: &str| TestCase {
        name: name.to_string(),
        check: CheckSpec::Structural(StructuralSpec {
            construct: construct.to_string(),
            pattern: pattern.to_string(),
            regex: false,
        }),
        expect: ExpectationSpec::default(),
    };

    TestSuite {
        name: Some("route-structure".to_string()),
        artifact: Some("server.py".to_string()),
        tags: vec!["static".to_string()],
        cases: vec![
            TestCase {
                name: "download_model is in the declared contract".to_string(),
                check: CheckSpec::Capability(CapabilitySpec {
                    operation: "download_model".to_string(),
                }),
                expect: ExpectationSpec::default(),
            },
            structural(
                "download handler is defined",
                "the download handler definition",
                "def download_model(self",
            ),
            structural(
                "download sub-application is constructed",
                "the download sub-application construction",
                "download_app = web.Application()",
            ),
            structural(
                "download route is registered",
                "the download route registration",
                "download_app.router.add_post(\"/download_model\"",
            ),
            structural(
                "download sub-application is mounted",
                "the download sub-application mounting",
                "self.app.add_subapp('/download'",
            ),
        ],
        ..TestSuite::default()
    }
}
