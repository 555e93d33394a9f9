pub mod events;
pub mod executor;
pub mod state;

use anyhow::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use events::*;
pub use state::*;

use crate::parser::types::TestSuite;
use crate::parser::yaml::parse_suite_file;
use crate::target::HttpTarget;
use crate::utils::config::Config;

/// CLI-level options that override suite headers
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub base_url: Option<String>,
    pub artifact: Option<PathBuf>,
    pub operations: Vec<String>,
    pub timeout_ms: Option<u64>,
    pub output: Option<PathBuf>,
    pub report: bool,
    pub tags: Option<Vec<String>>,
    pub case_index: Option<usize>,
    pub case_name: Option<String>,
}

/// Run verification suites from a file or directory
pub async fn run_suites(path: &Path, opts: RunOptions) -> Result<RunSummary> {
    let mut files = Vec::new();
    if path.is_dir() {
        for entry in walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map_or(false, |ext| ext == "yaml" || ext == "yml")
            })
        {
            files.push(entry.path().to_path_buf());
        }
        files.sort();
    } else {
        files.push(path.to_path_buf());
    }

    if files.is_empty() {
        println!("{} No suite files found.", "ℹ".blue());
        return Ok(empty_summary());
    }

    let stop = install_interrupt_handler();
    let mut executor = executor::SuiteExecutor::new(
        opts.output.as_deref(),
        opts.report,
        opts.tags.clone(),
        stop.clone(),
    );

    for file in &files {
        if stop.load(Ordering::SeqCst) {
            break;
        }

        let suite = parse_suite_file(file)?;
        let base_dir = file.parent().unwrap_or(Path::new("."));
        let target = build_target(&suite, &opts, base_dir)?;

        executor
            .run_suite(
                &suite,
                &file.display().to_string(),
                &target,
                opts.case_index,
                opts.case_name.as_deref(),
            )
            .await?;
    }

    executor.finish().await
}

/// Run a built-in scenario by name
pub async fn run_scenario(name: &str, opts: RunOptions) -> Result<RunSummary> {
    let suite = crate::scenario::find(name).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown scenario '{}'. Available scenarios: {}",
            name,
            crate::scenario::names().join(", ")
        )
    })?;

    let stop = install_interrupt_handler();
    let mut executor = executor::SuiteExecutor::new(
        opts.output.as_deref(),
        opts.report,
        opts.tags.clone(),
        stop,
    );

    let target = build_target(&suite, &opts, Path::new("."))?;
    executor
        .run_suite(
            &suite,
            &format!("builtin:{}", name),
            &target,
            opts.case_index,
            opts.case_name.as_deref(),
        )
        .await?;

    executor.finish().await
}

/// Resolve suite header and CLI overrides into a live target.
///
/// Precedence per setting: CLI flag, then suite header, then defaults.
fn build_target(suite: &TestSuite, opts: &RunOptions, base_dir: &Path) -> Result<HttpTarget> {
    let config = Config::default();

    let base_url = opts
        .base_url
        .clone()
        .or_else(|| suite.base_url.clone())
        .unwrap_or_else(|| config.default_base_url.clone());

    let mut builder = HttpTarget::builder().base_url(&base_url);

    let artifact = opts.artifact.clone().or_else(|| {
        suite.artifact.as_ref().map(|rel| {
            let p = Path::new(rel);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base_dir.join(p)
            }
        })
    });
    if let Some(ref path) = artifact {
        builder = builder.artifact_file(path);
    }

    let operations = if !opts.operations.is_empty() {
        opts.operations.clone()
    } else {
        suite.operations.clone()
    };
    builder = builder.operations(operations);

    if let Some(timeout) = opts.timeout_ms.or(suite.default_timeout_ms) {
        builder = builder.timeout_ms(timeout);
    }

    builder.build()
}

/// Ctrl+C sets a stop flag; the executor finishes the current case,
/// skips the rest, and still reports what already ran.
fn install_interrupt_handler() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();

    let result = ctrlc::set_handler(move || {
        println!("\n\n{} Interrupt received, finishing up...", "⏹".yellow());
        stop_handler.store(true, Ordering::SeqCst);
    });
    if let Err(e) = result {
        log::debug!("interrupt handler not installed: {}", e);
    }

    stop
}

fn empty_summary() -> RunSummary {
    RunSummary {
        session_id: String::new(),
        total_suites: 0,
        total_cases: 0,
        passed: 0,
        failed: 0,
        skipped: 0,
        total_duration_ms: None,
    }
}
