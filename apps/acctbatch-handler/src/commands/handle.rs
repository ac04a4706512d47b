//! Handle command - Route one event through the pipeline

use std::path::PathBuf;

use clap::Args;
use tokio::io::AsyncReadExt;

use acctbatch_core::HandlerConfig;

use crate::commands::print_json;
use crate::error::CliResult;
use crate::services::Services;

/// Arguments for the handle command
#[derive(Args)]
pub struct HandleArgs {
    /// Event JSON file, or `-` for stdin
    #[arg(long, default_value = "-")]
    pub event: String,
}

/// Execute the handle command
pub async fn execute(args: HandleArgs) -> CliResult<()> {
    let config = HandlerConfig::from_env()?;
    let raw = read_event(&args.event).await?;
    let event: serde_json::Value = serde_json::from_str(&raw)?;

    let services = Services::from_config(&config).await;
    let outcome = services.router(&config).route(event).await?;

    print_json(&outcome)
}

async fn read_event(source: &str) -> CliResult<String> {
    if source == "-" {
        let mut raw = String::new();
        tokio::io::stdin().read_to_string(&mut raw).await?;
        return Ok(raw);
    }
    Ok(tokio::fs::read_to_string(PathBuf::from(source)).await?)
}
