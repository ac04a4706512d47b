//! Dispatch command - Provision the next VALID request

use clap::Args;

use acctbatch_core::HandlerConfig;

use crate::commands::print_json;
use crate::error::CliResult;
use crate::services::Services;

/// Arguments for the dispatch command
#[derive(Args)]
pub struct DispatchArgs {
    /// Skip the status checks after a successful submission
    #[arg(long)]
    pub no_poll: bool,
}

/// Execute the dispatch command
pub async fn execute(args: DispatchArgs) -> CliResult<()> {
    let config = HandlerConfig::from_env()?;
    let services = Services::from_config(&config).await;

    if args.no_poll {
        let outcome = services.dispatcher(&config).provision_next().await?;
        return print_json(&outcome);
    }

    let report = services.router(&config).dispatch_and_poll().await?;
    print_json(&report)
}
