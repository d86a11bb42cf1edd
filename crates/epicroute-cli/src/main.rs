//! Epicroute CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use epicroute_core::{
    generate_orchestration_summary, AnalysisMode, EpicOrchestrator, ProviderProfile,
    WorkItemInput,
};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// Initialize logging with the specified verbosity level
fn init_logging(verbose: u8, quiet: bool, json: bool) -> Result<()> {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter =
        EnvFilter::from_default_env().add_directive(format!("epicroute={}", level).parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 2)
        .with_file(verbose >= 3)
        .with_line_number(verbose >= 3);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "epicroute")]
#[command(about = "Epic interpretation and task routing orchestrator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output logs as JSON (for machine parsing)
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a work item and print the routing decision
    Analyze {
        /// Issue number identifying the work item
        #[arg(long, default_value_t = -1)]
        issue_number: i64,

        /// Work item title
        #[arg(long, default_value = "")]
        title: String,

        /// Work item body
        #[arg(long, default_value = "")]
        body: String,

        /// Label (repeatable)
        #[arg(long = "label")]
        labels: Vec<String>,

        /// Assignee (repeatable)
        #[arg(long = "assignee")]
        assignees: Vec<String>,

        /// Analysis mode: epic-interpretation, agent-routing, or
        /// full-orchestration
        #[arg(long, default_value = "full-orchestration")]
        mode: String,

        /// Read the work item from a JSON file instead of flags
        #[arg(long)]
        input: Option<PathBuf>,

        /// Print the full orchestration result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the provider routing table
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet, cli.log_json)?;

    match cli.command {
        Commands::Analyze {
            issue_number,
            title,
            body,
            labels,
            assignees,
            mode,
            input,
            json,
        } => {
            let work_item = match input {
                Some(path) => {
                    let contents = std::fs::read_to_string(&path)?;
                    serde_json::from_str(&contents)?
                }
                None => {
                    let mode: AnalysisMode = mode.parse()?;
                    WorkItemInput::new(issue_number, title, body)
                        .with_labels(labels)
                        .with_assignees(assignees)
                        .with_mode(mode)
                }
            };

            info!(issue = work_item.issue_number, "analyzing work item");
            let orchestrator = EpicOrchestrator::new();
            let result = orchestrator.orchestrate_epic(&work_item).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", generate_orchestration_summary(&result));
            }
        }
        Commands::Providers => {
            let orchestrator = EpicOrchestrator::new();
            let table = orchestrator.providers();
            for profile in table.profiles() {
                print_profile(profile);
            }
            println!("default:");
            print_profile(table.default_profile());
        }
    }

    Ok(())
}

fn print_profile(profile: &ProviderProfile) {
    match &profile.fallback {
        Some(fallback) => println!(
            "{}: {} (temp {}, {} tok, {} rpm) -> fallback {}",
            profile.domain,
            profile.identity(),
            profile.temperature,
            profile.max_tokens,
            profile.rate_limit_per_minute,
            fallback.identity()
        ),
        None => println!(
            "{}: {} (temp {}, {} tok, {} rpm)",
            profile.domain,
            profile.identity(),
            profile.temperature,
            profile.max_tokens,
            profile.rate_limit_per_minute
        ),
    }
}
