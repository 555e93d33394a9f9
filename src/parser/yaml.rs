use super::types::{TestCase, TestSuite};
use anyhow::{Context, Result};
use std::path::Path;

/// Parse a YAML suite file into a TestSuite
pub fn parse_suite_file(path: &Path) -> Result<TestSuite> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    parse_suite_content(&content, path)
}

/// Parse YAML content into a TestSuite
pub fn parse_suite_content(content: &str, source_path: &Path) -> Result<TestSuite> {
    // 1. "header --- cases" layout
    if content.contains("---") {
        let parts: Vec<&str> = content.split("---").collect();
        let (header, cases_yaml) = if parts.len() >= 2 {
            (parts[0].trim(), parts[1..].join("---"))
        } else {
            ("", content.to_string())
        };

        let mut suite: TestSuite = if header.is_empty() {
            TestSuite::default()
        } else {
            serde_yaml::from_str(header).context("Failed to parse suite header")?
        };
        suite.cases =
            serde_yaml::from_str(&cases_yaml).context("Failed to parse suite case list")?;
        return Ok(named(suite, source_path));
    }

    // 2. Bare case list without a header
    if let Ok(cases) = serde_yaml::from_str::<Vec<TestCase>>(content) {
        let suite = TestSuite {
            cases,
            ..TestSuite::default()
        };
        return Ok(named(suite, source_path));
    }

    // 3. Full mapping with a `cases` field
    let suite: TestSuite =
        serde_yaml::from_str(content).context("Failed to parse suite content")?;
    Ok(named(suite, source_path))
}

/// Default the suite name from the file stem when the header omits it
fn named(mut suite: TestSuite, source_path: &Path) -> TestSuite {
    if suite.name.is_none() {
        suite.name = source_path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string());
    }
    suite
}
