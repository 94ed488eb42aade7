use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Step execution status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Passed { detail: String },
    Failed { detail: String },
    Skipped { reason: String },
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Passed { .. } | StepStatus::Failed { .. } | StepStatus::Skipped { .. }
        )
    }
}

/// Suite execution status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SuiteStatus {
    Pending,
    Running,
    Passed,
    Failed,
    PartiallyPassed { passed: u32, failed: u32 },
}

/// Execution state of a single step
#[derive(Debug, Clone)]
pub struct StepState {
    pub index: usize,
    pub name: String,
    pub critical: bool,
    pub status: StepStatus,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    pub duration_ms: Option<u64>,
}

impl StepState {
    pub fn new(index: usize, name: &str, critical: bool) -> Self {
        Self {
            index,
            name: name.to_string(),
            critical,
            status: StepStatus::Pending,
            started_at: None,
            finished_at: None,
            duration_ms: None,
        }
    }

    pub fn start(&mut self) {
        self.status = StepStatus::Running;
        self.started_at = Some(Instant::now());
    }

    pub fn pass(&mut self, detail: String) {
        self.finish(StepStatus::Passed { detail });
    }

    pub fn fail(&mut self, detail: String) {
        self.finish(StepStatus::Failed { detail });
    }

    /// Skips happen mid-run when a step finds nothing to exercise, so they
    /// carry timing like any other terminal status.
    pub fn skip(&mut self, reason: String) {
        self.finish(StepStatus::Skipped { reason });
    }

    fn finish(&mut self, status: StepStatus) {
        self.status = status;
        self.finished_at = Some(Instant::now());
        if let Some(started) = self.started_at {
            self.duration_ms = Some(started.elapsed().as_millis() as u64);
        }
    }

    pub fn to_report(&self) -> StepReport {
        StepReport {
            index: self.index,
            name: self.name.clone(),
            critical: self.critical,
            status: self.status.clone(),
            duration_ms: self.duration_ms,
        }
    }
}

/// Execution state of one suite
#[derive(Debug, Clone)]
pub struct SuiteState {
    pub suite_name: String,
    pub description: String,
    pub status: SuiteStatus,
    pub steps: Vec<StepState>,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    pub total_duration_ms: Option<u64>,
}

impl SuiteState {
    pub fn new(suite_name: &str, description: &str, steps: Vec<StepState>) -> Self {
        Self {
            suite_name: suite_name.to_string(),
            description: description.to_string(),
            status: SuiteStatus::Pending,
            steps,
            started_at: None,
            finished_at: None,
            total_duration_ms: None,
        }
    }

    pub fn start(&mut self) {
        self.status = SuiteStatus::Running;
        self.started_at = Some(Instant::now());
    }

    /// Fold step outcomes into the suite status. Skipped steps count
    /// toward neither side.
    pub fn finish(&mut self) {
        self.finished_at = Some(Instant::now());
        if let Some(started) = self.started_at {
            self.total_duration_ms = Some(started.elapsed().as_millis() as u64);
        }

        let passed = self.count(|s| matches!(s, StepStatus::Passed { .. }));
        let failed = self.count(|s| matches!(s, StepStatus::Failed { .. }));

        self.status = if failed == 0 {
            SuiteStatus::Passed
        } else if passed == 0 {
            SuiteStatus::Failed
        } else {
            SuiteStatus::PartiallyPassed { passed, failed }
        };
    }

    /// Names of failed steps marked critical, for the report call-outs.
    pub fn failed_critical(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter(|s| s.critical && matches!(s.status, StepStatus::Failed { .. }))
            .map(|s| s.name.clone())
            .collect()
    }

    fn count(&self, pred: impl Fn(&StepStatus) -> bool) -> u32 {
        self.steps.iter().filter(|s| pred(&s.status)).count() as u32
    }

    pub fn to_report(&self) -> SuiteReport {
        SuiteReport {
            suite_name: self.suite_name.clone(),
            description: self.description.clone(),
            status: self.status.clone(),
            steps: self.steps.iter().map(StepState::to_report).collect(),
            total_duration_ms: self.total_duration_ms,
        }
    }
}

/// Execution state of an entire test session
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub suites: Vec<SuiteState>,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl SessionState {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            suites: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    pub fn add_suite(&mut self, suite: SuiteState) {
        self.suites.push(suite);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Instant::now());
    }

    pub fn summary(&self) -> TestSummary {
        let mut passed = 0;
        let mut failed = 0;
        let mut skipped = 0;
        let mut critical_failed = 0;

        for suite in &self.suites {
            for step in &suite.steps {
                match &step.status {
                    StepStatus::Passed { .. } => passed += 1,
                    StepStatus::Failed { .. } => {
                        failed += 1;
                        if step.critical {
                            critical_failed += 1;
                        }
                    }
                    StepStatus::Skipped { .. } => skipped += 1,
                    _ => {}
                }
            }
        }

        let total_duration_ms = match (self.started_at, self.finished_at) {
            (Some(started), Some(finished)) => {
                Some(finished.duration_since(started).as_millis() as u64)
            }
            _ => None,
        };

        TestSummary {
            session_id: self.session_id.clone(),
            total_suites: self.suites.len() as u32,
            total_steps: self.suites.iter().map(|s| s.steps.len() as u32).sum(),
            passed,
            failed,
            skipped,
            critical_failed,
            total_duration_ms,
        }
    }

    pub fn to_report(&self) -> SessionReport {
        SessionReport {
            session_id: self.session_id.clone(),
            suites: self.suites.iter().map(SuiteState::to_report).collect(),
            summary: self.summary(),
        }
    }
}

/// Serializable step report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub index: usize,
    pub name: String,
    pub critical: bool,
    pub status: StepStatus,
    pub duration_ms: Option<u64>,
}

/// Serializable suite report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteReport {
    pub suite_name: String,
    pub description: String,
    pub status: SuiteStatus,
    pub steps: Vec<StepReport>,
    pub total_duration_ms: Option<u64>,
}

/// Serializable session report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub session_id: String,
    pub suites: Vec<SuiteReport>,
    pub summary: TestSummary,
}

/// Aggregated counters for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub session_id: String,
    pub total_suites: u32,
    pub total_steps: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub critical_failed: u32,
    pub total_duration_ms: Option<u64>,
}

impl TestSummary {
    /// Pass rate over decided steps. `None` when nothing was decided,
    /// which keeps an empty run from dividing by zero.
    pub fn success_rate(&self) -> Option<f64> {
        let decided = self.passed + self.failed;
        if decided == 0 {
            None
        } else {
            Some(f64::from(self.passed) * 100.0 / f64::from(decided))
        }
    }
}
