pub mod json;
pub mod junit;
pub mod types;

use anyhow::Result;
use std::path::Path;

/// Generate a report from saved verification results
pub async fn generate_report(
    results_path: &Path,
    format: &str,
    output: Option<&Path>,
) -> Result<()> {
    let results = std::fs::read_to_string(results_path)?;
    let verify_results: types::VerifyResults = serde_json::from_str(&results)?;

    match format {
        "json" => json::generate(&verify_results, output).await,
        "junit" => junit::generate(&verify_results, output),
        _ => anyhow::bail!("Unknown format: {}", format),
    }
}
