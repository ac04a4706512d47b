//! acctbatch - Batch account provisioning handler
//!
//! Routes provisioning events (stack load, record-store changes, lifecycle
//! notifications) through the pipeline, and gives operators direct access to
//! batch validation and dispatch.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod services;

use error::CliResult;

/// acctbatch - Batch account provisioning
#[derive(Parser)]
#[command(name = "acctbatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Route one event through the pipeline
    Handle(commands::handle::HandleArgs),

    /// Validate a batch file without provisioning
    Validate(commands::validate::ValidateArgs),

    /// Provision the next VALID request
    Dispatch(commands::dispatch::DispatchArgs),
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,acctbatch_provisioning=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.log_json);

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Handle(args) => commands::handle::execute(args).await,
        Commands::Validate(args) => commands::validate::execute(args).await,
        Commands::Dispatch(args) => commands::dispatch::execute(args).await,
    }
}
