pub mod context;
pub mod events;
pub mod executor;
pub mod state;

use anyhow::Result;
use std::path::Path;

pub use events::*;
pub use state::*;

use crate::client::ApiClient;
use crate::suites::{self, Suite};
use crate::utils::config::HarnessConfig;

/// Run the selected suites against the configured server. An empty
/// selection means every registered suite, in canonical order.
pub async fn run_suites(
    names: &[String],
    config: HarnessConfig,
    output: Option<&Path>,
) -> Result<()> {
    let registry = suites::registry();
    let selected = select_suites(&registry, names)?;

    let api = ApiClient::new(&config)?;
    let mut runner = executor::SuiteRunner::new(api, config);

    runner.start();
    for suite in selected {
        runner.run_suite(suite).await;
    }

    let summary = runner.finish(output).await?;

    // Non-zero exit when anything failed; skips alone stay green
    if summary.failed > 0 {
        anyhow::bail!(
            "{} of {} steps failed",
            summary.failed,
            summary.total_steps
        );
    }

    Ok(())
}

/// Resolve requested suite names against the registry, keeping the
/// registry's execution order and rejecting unknown names up front.
fn select_suites<'a>(registry: &'a [Suite], names: &[String]) -> Result<Vec<&'a Suite>> {
    if names.is_empty() {
        return Ok(registry.iter().collect());
    }

    for name in names {
        if !registry.iter().any(|s| s.name == name.as_str()) {
            let known: Vec<&str> = registry.iter().map(|s| s.name).collect();
            anyhow::bail!("Unknown suite '{}'. Available: {}", name, known.join(", "));
        }
    }

    Ok(registry
        .iter()
        .filter(|s| names.iter().any(|n| n == s.name))
        .collect())
}
