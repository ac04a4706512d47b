//! CLI error types and exit codes

use thiserror::Error;

use acctbatch_core::{ConfigError, SourceError};
use acctbatch_provisioning::{DispatchError, RouterError, ValidatorError};

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error
/// - 2: Configuration error
/// - 3: Invalid input (event or batch file)
/// - 4: External service error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid event JSON: {0}")]
    InvalidEvent(#[from] serde_json::Error),

    #[error("Batch source error: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Validator(#[from] ValidatorError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Router(#[from] RouterError),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            CliError::InvalidEvent(_) => 3,
            CliError::Validator(ValidatorError::Batch(_)) => 3,
            CliError::Router(RouterError::Event(_)) => 3,
            CliError::Router(RouterError::Validator(ValidatorError::Batch(_))) => 3,
            CliError::Source(_)
            | CliError::Validator(_)
            | CliError::Dispatch(_)
            | CliError::Router(_) => 4,
            CliError::Io(_) => 1,
        }
    }

    /// Print the error to stderr
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {self}");
        } else {
            eprintln!("Error: {self}");
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {suggestion}");
            } else {
                eprintln!("\nSuggestion: {suggestion}");
            }
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::Config(ConfigError::MissingVar(_)) => {
                Some("Set the variable in the environment or in a .env file")
            }
            CliError::Router(RouterError::MissingBatchLocation) => {
                Some("Set BATCH_BUCKET_NAME and BATCH_KEY_NAME, or BATCH_ACCT_INPUT")
            }
            CliError::Validator(ValidatorError::Batch(_))
            | CliError::Router(RouterError::Validator(ValidatorError::Batch(_))) => Some(
                "The header must name AccountName, AccountEmail, SSOUserEmail, \
                 SSOUserFirstName, SSOUserLastName and OrgUnit",
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acctbatch_provisioning::BatchError;

    #[test]
    fn test_exit_codes() {
        let config = CliError::Config(ConfigError::MissingVar("TABLE_NAME".to_string()));
        assert_eq!(config.exit_code(), 2);

        let batch = CliError::Validator(ValidatorError::Batch(BatchError::Empty));
        assert_eq!(batch.exit_code(), 3);

        let routed_batch =
            CliError::Router(RouterError::Validator(ValidatorError::Batch(BatchError::Empty)));
        assert_eq!(routed_batch.exit_code(), 3);
        assert!(routed_batch.suggestion().is_some());

        let router = CliError::Router(RouterError::MissingBatchLocation);
        assert_eq!(router.exit_code(), 4);
    }

    #[test]
    fn test_missing_var_has_suggestion() {
        let err = CliError::Config(ConfigError::MissingVar("PRINCIPAL_ARN".to_string()));
        assert!(err.suggestion().is_some());
        assert!(err.to_string().contains("PRINCIPAL_ARN"));
    }
}
