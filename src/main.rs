use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use confes_tester::utils::config::HarnessConfig;
use confes_tester::{report, runner, suites};

#[derive(Parser)]
#[command(name = "confes-tester")]
#[command(version = "0.1.0")]
#[command(about = "Diagnostic test harness for the ConfesApp API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run test suites against a live server
    Run {
        /// Suite names to run (runs every suite when omitted)
        suites: Vec<String>,

        /// Base URL of the API under test
        #[arg(short, long)]
        base_url: Option<String>,

        /// Path to a YAML config file with accounts and fixtures
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Request timeout in seconds
        #[arg(short, long)]
        timeout_secs: Option<u64>,

        /// Output directory for reports
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Write JSON and JUnit reports after the run
        #[arg(long, default_value = "false")]
        report: bool,
    },

    /// List available test suites
    Suites,

    /// Generate a report from saved results
    Report {
        /// Path to a test-results.json file
        results: PathBuf,

        /// Report format (json, junit)
        #[arg(short, long, default_value = "junit")]
        format: String,

        /// Output file path (prints to stdout if not specified)
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
            suites,
            base_url,
            config,
            timeout_secs,
            output,
            report,
        } => {
            let mut harness_config = HarnessConfig::load(config.as_deref())?;
            if let Some(url) = base_url {
                harness_config.base_url = url;
            }
            if let Some(secs) = timeout_secs {
                harness_config.timeout_secs = secs;
            }

            println!(
                "{} Running tests against: {}",
                "▶".green().bold(),
                harness_config.base_url.cyan()
            );
            if suites.is_empty() {
                println!("  Suites: {}", "all".cyan());
            } else {
                println!("  Suites: {}", suites.join(", ").cyan());
            }
            println!(
                "  Timeout: {}",
                format!("{}s", harness_config.timeout_secs).cyan()
            );
            if report {
                println!("  Reports: {}", output.display().to_string().cyan());
            }

            let report_dir = if report { Some(output.as_path()) } else { None };
            runner::run_suites(&suites, harness_config, report_dir).await?;
        }

        Commands::Suites => {
            println!("{} Available test suites:", "📋".to_string().blue());
            println!();
            for suite in suites::registry() {
                println!(
                    "  {} ({} steps)",
                    suite.name.cyan().bold(),
                    suite.steps.len()
                );
                println!("      {}", suite.description.dimmed());
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
