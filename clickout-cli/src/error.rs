//! CLI error type.

use std::process::ExitCode;

use clickout::ClickoutError;
use thiserror::Error;

/// Errors surfaced by the command-line front end.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid arguments or configuration.
    #[error("{0}")]
    Config(String),

    /// Resolution of the deployment failed.
    #[error(transparent)]
    Resolve(#[from] ClickoutError),
}

impl CliError {
    /// Print the error to stderr and return the process exit code.
    pub fn report(&self) -> ExitCode {
        eprintln!("{} {}", console::style("error:").red().bold(), self);
        ExitCode::FAILURE
    }
}
