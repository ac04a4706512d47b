//! Validate command - Dry-run a batch file against the live directory

use std::path::PathBuf;

use clap::Args;

use acctbatch_core::{BatchLocation, HandlerConfig};

use crate::commands::print_json;
use crate::error::CliResult;
use crate::services::Services;

/// Arguments for the validate command
#[derive(Args)]
pub struct ValidateArgs {
    /// Local batch CSV file
    #[arg(long, conflicts_with = "location")]
    pub file: Option<PathBuf>,

    /// Remote batch (`s3://bucket/key` or `https://…`); defaults to the configured location
    #[arg(long)]
    pub location: Option<BatchLocation>,

    /// Write VALID/INVALID records instead of only reporting
    #[arg(long)]
    pub write: bool,
}

/// Execute the validate command
pub async fn execute(args: ValidateArgs) -> CliResult<()> {
    let config = HandlerConfig::from_env()?;
    let services = Services::from_config(&config).await;

    let content = match (&args.file, args.location.as_ref().or(config.batch_location.as_ref())) {
        (Some(path), _) => tokio::fs::read_to_string(path).await?,
        (None, Some(location)) => services.source.fetch(location).await?,
        (None, None) => {
            return Err(acctbatch_provisioning::RouterError::MissingBatchLocation.into());
        }
    };

    let validator = services.validator();
    let report = if args.write {
        validator.validate_batch(&content).await?
    } else {
        validator.classify_batch(&content).await?
    };

    tracing::info!(
        valid = report.valid,
        invalid = report.invalid,
        already_exists = report.already_exists,
        writes = report.writes,
        "Batch validated"
    );
    print_json(&report)
}
