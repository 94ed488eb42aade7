pub mod band_booking;
pub mod bands;
pub mod cancellation;
pub mod common;
pub mod delete_band;
pub mod directory;
pub mod registration;
pub mod smoke;

use futures::future::BoxFuture;
use rand::Rng;
use serde_json::Value;

use crate::client::{ApiClient, ApiResponse};
use crate::runner::context::RunContext;

/// Outcome of one executed step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Passed { detail: String },
    Failed { detail: String },
    Skipped { reason: String },
}

impl StepOutcome {
    pub fn fail(detail: impl Into<String>) -> Self {
        StepOutcome::Failed {
            detail: detail.into(),
        }
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        StepOutcome::Skipped {
            reason: reason.into(),
        }
    }

    /// A dependent step whose prerequisite was never captured. The step
    /// fails without attempting any network call.
    pub fn missing(what: &str) -> Self {
        StepOutcome::Failed {
            detail: format!("missing precondition: {}", what),
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, StepOutcome::Passed { .. })
    }
}

/// Step bodies return `Ok(detail)` on pass and push failures and skips
/// through the error channel, which keeps `?` usable on the helpers below.
pub type StepResult = Result<String, StepOutcome>;

pub type StepFuture<'a> = BoxFuture<'a, StepResult>;

pub type StepFn = for<'a> fn(&'a ApiClient, &'a mut RunContext) -> StepFuture<'a>;

/// Collapse a step's return into its outcome.
pub fn outcome_of(result: StepResult) -> StepOutcome {
    match result {
        Ok(detail) => StepOutcome::Passed { detail },
        Err(outcome) => outcome,
    }
}

/// One named step. Critical steps are the checks a suite exists for;
/// their failures are called out separately in the report.
#[derive(Debug)]
pub struct Step {
    pub name: &'static str,
    pub critical: bool,
    pub run: StepFn,
}

impl Step {
    pub fn new(name: &'static str, run: StepFn) -> Self {
        Self {
            name,
            critical: false,
            run,
        }
    }

    pub fn critical(name: &'static str, run: StepFn) -> Self {
        Self {
            name,
            critical: true,
            run,
        }
    }
}

/// An ordered sequence of steps exercising one area of the API
pub struct Suite {
    pub name: &'static str,
    pub description: &'static str,
    pub steps: Vec<Step>,
}

/// All suites, in canonical execution order.
pub fn registry() -> Vec<Suite> {
    vec![
        smoke::suite(),
        registration::suite(),
        bands::suite(),
        band_booking::suite(),
        delete_band::suite(),
        cancellation::suite(),
        directory::suite(),
    ]
}

/// The "no response" sentinel check plus the expected-status comparison.
/// Nearly every step starts here; an expected error status passes just
/// like an expected 2xx.
pub fn expect_status(
    response: Option<ApiResponse>,
    expected: u16,
) -> Result<ApiResponse, StepOutcome> {
    match response {
        None => Err(StepOutcome::fail("no response from server")),
        Some(res) if res.status == expected => Ok(res),
        Some(res) => Err(StepOutcome::fail(format!(
            "expected {}, got {}: {}",
            expected,
            res.status,
            res.detail()
        ))),
    }
}

/// Top-level string field, or a failure naming what was missing.
pub fn require_str(res: &ApiResponse, key: &str) -> Result<String, StepOutcome> {
    res.str_field(key).map(str::to_string).ok_or_else(|| {
        StepOutcome::fail(format!("response is missing '{}': {}", key, res.detail()))
    })
}

/// Top-level non-null field, cloned out of the body.
pub fn require_field(res: &ApiResponse, key: &str) -> Result<Value, StepOutcome> {
    match res.body.get(key) {
        Some(v) if !v.is_null() => Ok(v.clone()),
        _ => Err(StepOutcome::fail(format!(
            "response is missing '{}': {}",
            key,
            res.detail()
        ))),
    }
}

/// Array body, or a failure showing what came back instead.
pub fn expect_array(res: &ApiResponse) -> Result<Vec<Value>, StepOutcome> {
    match res.as_array() {
        Some(items) => Ok(items.clone()),
        None => Err(StepOutcome::fail(format!(
            "expected a JSON array, got: {}",
            res.detail()
        ))),
    }
}

/// The body's `status` string, compared against the state a mutation
/// should have produced. Catches endpoints that answer 200 without
/// persisting the transition.
pub fn expect_body_status(res: &ApiResponse, expected: &str) -> Result<(), StepOutcome> {
    match res.str_field("status") {
        Some(s) if s == expected => Ok(()),
        Some(s) => Err(StepOutcome::fail(format!(
            "status not updated to {}, got {}",
            expected, s
        ))),
        None => Err(StepOutcome::fail(format!(
            "status not updated to {}: field missing from {}",
            expected,
            res.detail()
        ))),
    }
}

/// Context value captured by an earlier step, or the precondition failure.
pub fn require<T: Clone>(value: &Option<T>, what: &str) -> Result<T, StepOutcome> {
    value.clone().ok_or_else(|| StepOutcome::missing(what))
}

/// String field of a JSON record.
pub fn field_str(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Unique mailbox for throwaway registrations: recognizable prefix, unix
/// timestamp, and a random suffix so two runs in the same second cannot
/// collide.
pub fn unique_email(prefix: &str, domain: &str) -> String {
    let stamp = chrono::Utc::now().timestamp();
    let suffix: u32 = rand::thread_rng().gen_range(1000..10000);
    format!("{}.{}.{}@{}", prefix, stamp, suffix, domain)
}
