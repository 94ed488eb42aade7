use anyhow::Result;
use colored::Colorize;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use uuid::Uuid;

use super::context::RunContext;
use super::events::{ConsoleEventListener, EventEmitter, TestEvent};
use super::state::{SessionState, StepState, StepStatus, SuiteState, TestSummary};
use crate::client::ApiClient;
use crate::report::types::TestResults;
use crate::suites::{outcome_of, Step, StepOutcome, Suite};
use crate::utils::config::HarnessConfig;

pub struct SuiteRunner {
    api: ApiClient,
    config: HarnessConfig,
    session: SessionState,
    emitter: EventEmitter,
}

impl SuiteRunner {
    pub fn new(api: ApiClient, config: HarnessConfig) -> Self {
        let (emitter, receiver) = EventEmitter::new();

        // Spawn console listener for real-time updates
        tokio::spawn(ConsoleEventListener::listen(receiver));

        let session = SessionState::new(&Uuid::new_v4().to_string());

        Self {
            api,
            config,
            session,
            emitter,
        }
    }

    pub fn start(&mut self) {
        self.session.start();
        self.emitter.emit(TestEvent::SessionStarted {
            session_id: self.session.session_id.clone(),
            base_url: self.config.base_url.clone(),
        });
    }

    /// Run one suite over a fresh context. A failing step never stops the
    /// suite; dependent steps guard their own inputs and fail fast.
    pub async fn run_suite(&mut self, suite: &Suite) {
        let step_states: Vec<StepState> = suite
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| StepState::new(i, step.name, step.critical))
            .collect();
        let mut suite_state = SuiteState::new(suite.name, suite.description, step_states);

        self.emitter.emit(TestEvent::SuiteStarted {
            suite_name: suite.name.to_string(),
            description: suite.description.to_string(),
            step_count: suite.steps.len(),
        });

        suite_state.start();

        let mut ctx = RunContext::new(self.config.clone());

        for (i, step) in suite.steps.iter().enumerate() {
            let Some(step_state) = suite_state.steps.get_mut(i) else {
                continue;
            };

            step_state.start();
            self.emitter.emit(TestEvent::StepStarted {
                suite_name: suite.name.to_string(),
                index: i,
                name: step.name.to_string(),
            });

            let outcome = Self::run_step(&self.api, &mut ctx, step).await;

            match outcome {
                StepOutcome::Passed { detail } => {
                    step_state.pass(detail.clone());
                    self.emitter.emit(TestEvent::StepPassed {
                        suite_name: suite.name.to_string(),
                        index: i,
                        detail,
                        duration_ms: step_state.duration_ms.unwrap_or(0),
                    });
                }
                StepOutcome::Failed { detail } => {
                    step_state.fail(detail.clone());
                    self.emitter.emit(TestEvent::StepFailed {
                        suite_name: suite.name.to_string(),
                        index: i,
                        detail,
                        duration_ms: step_state.duration_ms.unwrap_or(0),
                    });
                }
                StepOutcome::Skipped { reason } => {
                    step_state.skip(reason.clone());
                    self.emitter.emit(TestEvent::StepSkipped {
                        suite_name: suite.name.to_string(),
                        index: i,
                        reason,
                    });
                }
            }
        }

        suite_state.finish();

        self.emitter.emit(TestEvent::SuiteFinished {
            suite_name: suite.name.to_string(),
            status: suite_state.status.clone(),
            duration_ms: suite_state.total_duration_ms,
            failed_critical: suite_state.failed_critical(),
        });

        self.session.add_suite(suite_state);
    }

    /// Execute one step with its panic contained. A panicking step is a
    /// failed step, never a crashed run.
    async fn run_step(api: &ApiClient, ctx: &mut RunContext, step: &Step) -> StepOutcome {
        let fut = (step.run)(api, ctx);
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(result) => outcome_of(result),
            Err(panic) => StepOutcome::fail(format!("step panicked: {}", panic_message(&panic))),
        }
    }

    /// Close the session: print the recap, write reports when asked, and
    /// hand back the summary for the exit-code decision.
    pub async fn finish(mut self, output: Option<&Path>) -> Result<TestSummary> {
        self.session.finish();
        let summary = self.session.summary();

        self.emitter.emit(TestEvent::SessionFinished {
            summary: summary.clone(),
        });

        // Let the listener drain before printing below its output
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

        self.print_details();

        if let Some(dir) = output {
            std::fs::create_dir_all(dir)?;

            let report = self.session.to_report();
            let results = TestResults {
                session_id: report.session_id,
                suites: report.suites,
                summary: report.summary,
                generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            };

            let json_path = dir.join("test-results.json");
            let json = serde_json::to_string_pretty(&results)?;
            std::fs::write(&json_path, json)?;
            println!(
                "\n{} JSON report saved to: {}",
                "📄".blue(),
                json_path.display().to_string().cyan()
            );

            crate::report::junit::write_report(&results, dir)?;
        }

        Ok(summary)
    }

    /// Step-by-step recap under the summary block, in execution order.
    fn print_details(&self) {
        if self.session.suites.is_empty() {
            return;
        }

        println!("\n  Detailed results:");
        for suite in &self.session.suites {
            println!("    {}", suite.suite_name.white().bold());
            for step in &suite.steps {
                match &step.status {
                    StepStatus::Passed { detail } => {
                        println!("      {} {}: {}", "✓".green(), step.name, detail.dimmed());
                    }
                    StepStatus::Failed { detail } => {
                        println!("      {} {}: {}", "✗".red(), step.name, detail.red());
                    }
                    StepStatus::Skipped { reason } => {
                        println!("      {} {}: {}", "○".yellow(), step.name, reason.dimmed());
                    }
                    _ => {}
                }
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::canned::CannedTransport;
    use crate::suites::StepFuture;
    use serde_json::json;
    use std::sync::Arc;

    fn passing_step<'a>(api: &'a ApiClient, _ctx: &'a mut RunContext) -> StepFuture<'a> {
        Box::pin(async move {
            match api.get("/health", None).await {
                Some(res) if res.status == 200 => Ok("status ok".to_string()),
                Some(res) => Err(StepOutcome::fail(format!("got {}", res.status))),
                None => Err(StepOutcome::fail("no response from server")),
            }
        })
    }

    fn panicking_step<'a>(_api: &'a ApiClient, _ctx: &'a mut RunContext) -> StepFuture<'a> {
        Box::pin(async move { panic!("kaboom") })
    }

    fn skipping_step<'a>(_api: &'a ApiClient, _ctx: &'a mut RunContext) -> StepFuture<'a> {
        Box::pin(async move { Err(StepOutcome::skip("nothing to exercise")) })
    }

    fn runner_with(transport: Arc<CannedTransport>) -> SuiteRunner {
        let api = ApiClient::with_transport(transport);
        SuiteRunner::new(api, HarnessConfig::default())
    }

    use crate::utils::config::HarnessConfig;

    #[tokio::test]
    async fn panicking_step_fails_instead_of_crashing() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(200, json!({"status": "ok"}));

        let suite = Suite {
            name: "mini",
            description: "panic containment",
            steps: vec![
                Step::new("Panics", panicking_step),
                Step::new("Still Runs", passing_step),
            ],
        };

        let mut runner = runner_with(transport);
        runner.start();
        runner.run_suite(&suite).await;
        let summary = runner.finish(None).await.unwrap();

        assert_eq!(summary.total_steps, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.passed, 1);
    }

    #[tokio::test]
    async fn panic_detail_carries_the_message() {
        let transport = Arc::new(CannedTransport::new());
        let suite = Suite {
            name: "mini",
            description: "",
            steps: vec![Step::new("Panics", panicking_step)],
        };

        let mut runner = runner_with(transport);
        runner.start();
        runner.run_suite(&suite).await;

        let status = runner.session.suites[0].steps[0].status.clone();
        match status {
            StepStatus::Failed { detail } => {
                assert!(detail.contains("step panicked"));
                assert!(detail.contains("kaboom"));
            }
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[tokio::test]
    async fn a_failing_step_does_not_stop_the_suite() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(500, json!({"message": "boom"}));
        transport.push(200, json!({"status": "ok"}));

        let suite = Suite {
            name: "mini",
            description: "",
            steps: vec![
                Step::new("Fails", passing_step),
                Step::new("Passes", passing_step),
            ],
        };

        let mut runner = runner_with(transport.clone());
        runner.start();
        runner.run_suite(&suite).await;
        let summary = runner.finish(None).await.unwrap();

        // both steps reached the server
        assert_eq!(transport.request_count(), 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn counters_cover_every_step() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(200, json!({"status": "ok"}));

        let suite = Suite {
            name: "mini",
            description: "",
            steps: vec![
                Step::new("Passes", passing_step),
                Step::new("Skips", skipping_step),
                Step::new("Panics", panicking_step),
            ],
        };

        let mut runner = runner_with(transport);
        runner.start();
        runner.run_suite(&suite).await;
        let summary = runner.finish(None).await.unwrap();

        assert_eq!(summary.total_suites, 1);
        assert_eq!(summary.total_steps, 3);
        assert_eq!(
            summary.passed + summary.failed + summary.skipped,
            summary.total_steps
        );
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn empty_run_produces_an_empty_summary() {
        let transport = Arc::new(CannedTransport::new());
        let mut runner = runner_with(transport);
        runner.start();
        let summary = runner.finish(None).await.unwrap();

        assert_eq!(summary.total_steps, 0);
        assert!(summary.success_rate().is_none());
    }

    #[tokio::test]
    async fn critical_failures_reach_the_summary() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(500, json!({"message": "boom"}));

        let suite = Suite {
            name: "mini",
            description: "",
            steps: vec![Step::critical("Critical Check", passing_step)],
        };

        let mut runner = runner_with(transport);
        runner.start();
        runner.run_suite(&suite).await;
        let summary = runner.finish(None).await.unwrap();

        assert_eq!(summary.critical_failed, 1);
    }
}
