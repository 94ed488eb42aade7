use super::state::{SuiteStatus, TestSummary};
use tokio::sync::broadcast;

/// Harness execution events for real-time updates
#[derive(Debug, Clone)]
pub enum TestEvent {
    // Session events
    SessionStarted {
        session_id: String,
        base_url: String,
    },
    SessionFinished {
        summary: TestSummary,
    },

    // Suite events
    SuiteStarted {
        suite_name: String,
        description: String,
        step_count: usize,
    },
    SuiteFinished {
        suite_name: String,
        status: SuiteStatus,
        duration_ms: Option<u64>,
        failed_critical: Vec<String>,
    },

    // Step events
    StepStarted {
        suite_name: String,
        index: usize,
        name: String,
    },
    StepPassed {
        suite_name: String,
        index: usize,
        detail: String,
        duration_ms: u64,
    },
    StepFailed {
        suite_name: String,
        index: usize,
        detail: String,
        duration_ms: u64,
    },
    StepSkipped {
        suite_name: String,
        index: usize,
        reason: String,
    },

    // Log event for coordinated output
    Log {
        message: String,
    },
}

/// Event emitter for broadcasting harness events
pub struct EventEmitter {
    sender: broadcast::Sender<TestEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<TestEvent>) {
        let (sender, receiver) = broadcast::channel(100);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: TestEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
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
    pub async fn listen(mut receiver: broadcast::Receiver<TestEvent>) {
        use colored::Colorize;
        use indicatif::ProgressDrawTarget;
        use std::io::IsTerminal;

        // When not a TTY (piped output), use a hidden draw target to avoid
        // terminal escape codes in the captured output
        let multi = if std::io::stdout().is_terminal() {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        // Suites run sequentially, so a single spinner tracks the live step
        let mut spinner: Option<ProgressBar> = None;
        let mut step_text = String::new();

        while let Ok(event) = receiver.recv().await {
            match event {
                TestEvent::SessionStarted {
                    session_id,
                    base_url,
                } => {
                    multi
                        .println(format!(
                            "\n{} Test session started: {}",
                            "▶".green().bold(),
                            session_id.cyan()
                        ))
                        .ok();
                    multi
                        .println(format!("  Target: {}", base_url.cyan()))
                        .ok();
                }

                TestEvent::SessionFinished { summary } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish();
                    }

                    // Small delay to ensure all spinner finishes are rendered
                    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

                    // Use println! directly so MultiProgress cannot overwrite
                    // the summary block
                    println!("\n{} Test session finished", "■".blue().bold());
                    println!("  Total suites: {}", summary.total_suites);
                    println!("  Total steps: {}", summary.total_steps);
                    println!(
                        "  {} passed, {} failed, {} skipped",
                        summary.passed.to_string().green(),
                        summary.failed.to_string().red(),
                        summary.skipped.to_string().yellow()
                    );
                    if summary.critical_failed > 0 {
                        println!(
                            "  {} critical check(s) failed",
                            summary.critical_failed.to_string().red().bold()
                        );
                    }
                    if let Some(rate) = summary.success_rate() {
                        println!("  Success rate: {:.1}%", rate);
                    }
                    if let Some(duration) = summary.total_duration_ms {
                        println!("  Duration: {}ms", duration);
                    }
                }

                TestEvent::SuiteStarted {
                    suite_name,
                    description,
                    step_count,
                } => {
                    println!(
                        "\n  {} Suite: {} ({} steps)",
                        "→".blue(),
                        suite_name.white().bold(),
                        step_count
                    );
                    if !description.is_empty() {
                        println!("    {}", description.dimmed());
                    }
                }

                TestEvent::SuiteFinished {
                    suite_name,
                    status,
                    duration_ms,
                    failed_critical,
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
                    for name in failed_critical {
                        println!("    {} CRITICAL: {}", "✗".red().bold(), name);
                    }
                }

                TestEvent::StepStarted { index, name, .. } => {
                    let pb = multi.add(ProgressBar::new_spinner());
                    let style = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("    {spinner} {msg}")
                        .unwrap();
                    pb.set_style(style);

                    let body = format!("[{}] {}... ", index + 1, name.dimmed());
                    pb.set_message(body.clone());
                    pb.enable_steady_tick(StdDuration::from_millis(100));

                    spinner = Some(pb);
                    step_text = body;
                }

                TestEvent::StepPassed {
                    detail,
                    duration_ms,
                    ..
                } => {
                    let done_msg = format!(
                        "    {} {}({}ms) {}",
                        "✓".green(),
                        step_text,
                        duration_ms,
                        detail.dimmed()
                    );
                    Self::replace_spinner(&mut spinner, done_msg).await;
                }

                TestEvent::StepFailed {
                    detail,
                    duration_ms,
                    ..
                } => {
                    let done_msg = format!(
                        "    {} {}({}ms)\n      {}",
                        "✗".red(),
                        step_text,
                        duration_ms,
                        detail.red()
                    );
                    Self::replace_spinner(&mut spinner, done_msg).await;
                }

                TestEvent::StepSkipped { reason, .. } => {
                    let done_msg = format!(
                        "    {} {}({})",
                        "○".yellow(),
                        step_text,
                        reason.dimmed()
                    );
                    Self::replace_spinner(&mut spinner, done_msg).await;
                }

                TestEvent::Log { message } => {
                    multi.println(format!("      {}", message)).ok();
                }
            }
        }
    }

    /// Clear the live spinner and print its final line in place.
    async fn replace_spinner(spinner: &mut Option<ProgressBar>, done_msg: String) {
        if let Some(pb) = spinner.take() {
            // Clear the animated line first, then give the draw target a
            // moment before printing the final message
            pb.finish_and_clear();
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
            println!("{}", done_msg);
        } else {
            println!("{}", done_msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emitted_events_reach_subscribers() {
        let (emitter, mut receiver) = EventEmitter::new();

        emitter.emit(TestEvent::SessionStarted {
            session_id: "s-1".to_string(),
            base_url: "http://localhost:8001/api".to_string(),
        });

        match receiver.recv().await {
            Ok(TestEvent::SessionStarted { session_id, .. }) => {
                assert_eq!(session_id, "s-1");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn emit_without_receivers_is_harmless() {
        let emitter = EventEmitter::default();
        emitter.emit(TestEvent::Log {
            message: "nobody listening".to_string(),
        });
    }
}
