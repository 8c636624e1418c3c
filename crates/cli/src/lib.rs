pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "fitlens",
    about = "Fitlens operator CLI",
    long_about = "Run customer segmentation, inspect segment summaries, query product recommendations, and check runtime readiness.",
    after_help = "Examples:\n  fitlens migrate\n  fitlens segment\n  fitlens recommend --sku 8529470 --limit 5\n  fitlens doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Recompute every customer segment from the current order snapshot")]
    Segment {
        #[arg(long, help = "Order status that counts as a completed purchase")]
        qualifying_status: Option<String>,
    },
    #[command(about = "Summarize the stored segments per cluster")]
    Segments,
    #[command(about = "Return the products most similar to a catalog sku")]
    Recommend {
        #[arg(long, help = "Catalog sku to find similar products for")]
        sku: String,
        #[arg(long, help = "Maximum number of recommendations (defaults to config)")]
        limit: Option<usize>,
    },
    #[command(about = "Validate config, model artifacts, DB connectivity and catalog readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

/// Diagnostics go to stderr so stdout stays a single JSON payload.
fn init_logging() {
    let filter = EnvFilter::try_from_env("FITLENS_LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Segment { qualifying_status } => commands::segment::run(qualifying_status),
        Command::Segments => commands::segments::run(),
        Command::Recommend { sku, limit } => commands::recommend::run(&sku, limit),
        Command::Doctor { json } => {
            let (output, passed) = commands::doctor::run(json);
            commands::CommandResult { exit_code: if passed { 0 } else { 1 }, output }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
