use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use contract_probe::{report, runner, scenario};

#[derive(Parser)]
#[command(name = "contract-probe")]
#[command(version = "0.1.0")]
#[command(about = "HTTP endpoint contract verification CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run verification suite file(s) or directory
    Run {
        /// Path to suite file or directory
        path: PathBuf,

        /// Target base URL (overrides suite headers)
        #[arg(short, long)]
        base_url: Option<String>,

        /// Static artifact for structural cases (overrides suite headers)
        #[arg(short, long)]
        artifact: Option<PathBuf>,

        /// Declared contract listing for capability cases (comma-separated)
        #[arg(long, value_delimiter = ',')]
        operations: Vec<String>,

        /// Per-request timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Output directory for reports
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Write JSON and JUnit reports
        #[arg(long, default_value = "false")]
        report: bool,

        /// Filter suites by tags (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Option<Vec<String>>,

        /// Run only a specific case by index (0-based)
        #[arg(long)]
        case_index: Option<usize>,

        /// Run only a specific case by name (first match)
        #[arg(long)]
        case_name: Option<String>,
    },

    /// Run a built-in scenario
    Scenario {
        /// Scenario name (use --list to enumerate)
        name: Option<String>,

        /// List available scenarios
        #[arg(long, default_value = "false")]
        list: bool,

        /// Target base URL
        #[arg(short, long)]
        base_url: Option<String>,

        /// Static artifact for structural cases
        #[arg(short, long)]
        artifact: Option<PathBuf>,

        /// Declared contract listing for capability cases (comma-separated)
        #[arg(long, value_delimiter = ',')]
        operations: Vec<String>,

        /// Per-request timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Output directory for reports
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Write JSON and JUnit reports
        #[arg(long, default_value = "false")]
        report: bool,
    },

    /// Generate report from saved verification results
    Report {
        /// Path to verification results JSON
        results: PathBuf,

        /// Output format (json, junit)
        #[arg(short, long, default_value = "junit")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            path,
            base_url,
            artifact,
            operations,
            timeout_ms,
            output,
            report,
            tags,
            case_index,
            case_name,
        } => {
            println!(
                "{} Running suites from: {}",
                "▶".green().bold(),
                path.display()
            );
            if let Some(ref url) = base_url {
                println!("  Target: {}", url.cyan());
            }
            if let Some(ref artifact) = artifact {
                println!("  Artifact: {}", artifact.display().to_string().cyan());
            }
            if let Some(ref tags_list) = tags {
                println!("  Tags: {}", tags_list.join(", ").yellow());
            }
            println!("  Output: {}", output.display().to_string().cyan());
            if report {
                println!("  Reports: {}", "Enabled".green());
            }
            if let Some(idx) = case_index {
                println!("  Case Index: {}", idx.to_string().yellow());
            }
            if let Some(ref name) = case_name {
                println!("  Case Name: {}", name.cyan());
            }

            let opts = runner::RunOptions {
                base_url,
                artifact,
                operations,
                timeout_ms,
                output: Some(output),
                report,
                tags,
                case_index,
                case_name,
            };

            let summary = runner::run_suites(&path, opts).await?;
            if !summary.all_passed() {
                std::process::exit(1);
            }
        }

        Commands::Scenario {
            name,
            list,
            base_url,
            artifact,
            operations,
            timeout_ms,
            output,
            report,
        } => {
            let name = match (name, list) {
                (Some(name), false) => name,
                _ => {
                    println!("{} Available scenarios:", "ℹ".blue());
                    for name in scenario::names() {
                        println!("  {}", name.cyan());
                    }
                    return Ok(());
                }
            };

            println!(
                "{} Running built-in scenario: {}",
                "▶".green().bold(),
                name.cyan()
            );

            let opts = runner::RunOptions {
                base_url,
                artifact,
                operations,
                timeout_ms,
                output: Some(output),
                report,
                tags: None,
                case_index: None,
                case_name: None,
            };

            let summary = runner::run_scenario(&name, opts).await?;
            if !summary.all_passed() {
                std::process::exit(1);
            }
        }

        Commands::Report {
            results,
            format,
            output,
        } => {
            println!(
                "{} Generating {} report from: {}",
                "📊".to_string().blue(),
                format.cyan(),
                results.display()
            );
            report::generate_report(&results, &format, output.as_deref()).await?;
        }
    }

    Ok(())
}
