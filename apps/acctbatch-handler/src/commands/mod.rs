//! CLI command implementations

pub mod dispatch;
pub mod handle;
pub mod validate;

use serde::Serialize;

use crate::error::CliResult;

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
