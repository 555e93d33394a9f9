use super::state::{RunSummary, SuiteStatus};
use tokio::sync::broadcast;

/// Verification events for real-time console updates
#[derive(Debug, Clone)]
pub enum VerifyEvent {
    // Session events
    SessionStarted {
        session_id: String,
    },
    SessionFinished {
        summary: RunSummary,
    },

    // Suite events
    SuiteStarted {
        suite_name: String,
        suite_path: String,
        case_count: usize,
    },
    SuiteFinished {
        suite_name: String,
        status: SuiteStatus,
        duration_ms: Option<u64>,
    },

    // Case events
    CaseStarted {
        suite_name: String,
        index: usize,
        case: String,
    },
    CasePassed {
        suite_name: String,
        index: usize,
        duration_ms: u64,
    },
    CaseFailed {
        suite_name: String,
        index: usize,
        error: String,
        duration_ms: u64,
    },
    CaseSkipped {
        suite_name: String,
        index: usize,
        reason: String,
    },

    // Log event for coordinated output
    Log {
        message: String,
    },
}

/// Event emitter for broadcasting verification events
pub struct EventEmitter {
    sender: broadcast::Sender<VerifyEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<VerifyEvent>) {
        let (sender, receiver) = broadcast::channel(100);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: VerifyEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VerifyEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }
}

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<VerifyEvent>) {
        use colored::Colorize;
        use indicatif::ProgressDrawTarget;
        use std::io::IsTerminal;

        // Hidden draw target when stdout is piped, to avoid escape codes
        let multi = if std::io::stdout().is_terminal() {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        // Cases run strictly sequentially, so a single spinner slot suffices
        let mut spinner: Option<ProgressBar> = None;
        let mut case_text = String::new();

        while let Ok(event) = receiver.recv().await {
            match event {
                VerifyEvent::SessionStarted { session_id } => {
                    multi
                        .println(format!(
                            "\n{} Verification session started: {}",
                            "▶".green().bold(),
                            session_id.cyan()
                        ))
                        .ok();
                }

                VerifyEvent::SessionFinished { summary } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish();
                    }

                    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

                    println!("\n{} Verification finished", "■".blue().bold());
                    println!("  Total suites: {}", summary.total_suites);
                    println!("  Total cases: {}", summary.total_cases);
                    println!(
                        "  {} passed, {} failed, {} skipped",
                        summary.passed.to_string().green(),
                        summary.failed.to_string().red(),
                        summary.skipped.to_string().yellow()
                    );
                    if let Some(duration) = summary.total_duration_ms {
                        println!("  Duration: {}ms", duration);
                    }

                    if summary.all_passed() {
                        println!("\n{} All contract checks passed", "✅".green().bold());
                    } else {
                        println!("\n{} Contract verification failed", "❌".red().bold());
                    }
                }

                VerifyEvent::SuiteStarted {
                    suite_name,
                    case_count,
                    ..
                } => {
                    println!(
                        "\n  {} Suite: {} ({} cases)",
                        "→".blue(),
                        suite_name.white().bold(),
                        case_count
                    );
                }

                VerifyEvent::SuiteFinished {
                    suite_name,
                    status,
                    duration_ms,
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish();
                    }

                    let status_str = match status {
                        SuiteStatus::Passed => "PASSED".green().bold(),
                        SuiteStatus::Failed => "FAILED".red().bold(),
                        SuiteStatus::PartiallyPassed { passed, failed } => {
                            format!("PARTIAL ({}/{} passed)", passed, passed + failed)
                                .yellow()
                                .bold()
                        }
                        _ => "UNKNOWN".white().bold(),
                    };
                    println!("  {} Suite {} [{}]", "←".blue(), suite_name, status_str);
                    if let Some(duration) = duration_ms {
                        println!("    Duration: {}ms", duration);
                    }
                }

                VerifyEvent::CaseStarted { index, case, .. } => {
                    let pb = multi.add(ProgressBar::new_spinner());
                    let style = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("    {spinner} {msg}")
                        .unwrap();
                    pb.set_style(style);

                    let body = format!("[{}] {}... ", index, case.dimmed());
                    pb.set_message(body.clone());
                    pb.enable_steady_tick(StdDuration::from_millis(100));

                    spinner = Some(pb);
                    case_text = body;
                }

                VerifyEvent::CasePassed { duration_ms, .. } => {
                    let done_msg =
                        format!("    {} {}({}ms)", "✓".green(), case_text, duration_ms);

                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
                    }
                    println!("{}", done_msg);
                }

                VerifyEvent::CaseFailed {
                    error, duration_ms, ..
                } => {
                    let done_msg = format!("    {} {}({}ms)", "✗".red(), case_text, duration_ms);

                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
                    }
                    println!("{}", done_msg);
                    println!("        {}", error.red());
                }

                VerifyEvent::CaseSkipped { reason, index, .. } => {
                    let done_msg = format!(
                        "    {} [{}] skipped ({})",
                        "○".yellow(),
                        index,
                        reason.dimmed()
                    );

                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
                    }
                    println!("{}", done_msg);
                }

                VerifyEvent::Log { message } => {
                    multi.println(format!("      {}", message)).ok();
                }
            }
        }
    }
}
