//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        ApplicationError::Domain(e).into()
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Infra(InfraError::Io { .. }) => exitcode::IOERR,
            CliError::Infra(InfraError::Application(e)) => match e {
                ApplicationError::FileCreate { .. } => exitcode::CANTCREAT,
                ApplicationError::FileOpen { .. } => exitcode::NOINPUT,
                ApplicationError::UnknownSubject(_) => exitcode::DATAERR,
                ApplicationError::Console(_) => exitcode::IOERR,
                ApplicationError::Config { .. } => exitcode::CONFIG,
                ApplicationError::Domain(d) => match d {
                    DomainError::Malformed { .. } | DomainError::EmptyKnowledgeBase => {
                        exitcode::DATAERR
                    }
                    DomainError::NodeAlloc(_) => exitcode::DATAERR,
                    DomainError::Graph { .. }
                    | DomainError::LostNodes { .. }
                    | DomainError::UnknownNode => exitcode::SOFTWARE,
                },
            },
        }
    }
}
