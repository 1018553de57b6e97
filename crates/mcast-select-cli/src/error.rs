//! Error types for the mcast-select CLI.
//!
//! CliError wraps CoreError from the shared library and adds CLI-specific variants.

use mcast_select_core::error::CoreError;
use thiserror::Error;

pub use mcast_select_core::error::{SelectionError, ServiceError, StorageError};

/// Exit codes for the CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const SERVICE_ERROR: i32 = 3;
    pub const INVALID_ARGS: i32 = 4;
    pub const EMPTY_SELECTION: i32 = 6;
}

/// Main error type for the CLI
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No inventory file given and no data directory available")]
    NoInventory,
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Core(e) => match e {
                CoreError::Selection(SelectionError::EmptySelection) => exit_codes::EMPTY_SELECTION,
                CoreError::Selection(_) => exit_codes::INVALID_ARGS,
                CoreError::Service(_) => exit_codes::SERVICE_ERROR,
                CoreError::Barrier(_) => exit_codes::GENERAL_ERROR,
                CoreError::Storage(StorageError::InvalidDevEui(_)) => exit_codes::INVALID_ARGS,
                CoreError::Storage(_) => exit_codes::GENERAL_ERROR,
            },
            CliError::InvalidArgument(_) => exit_codes::INVALID_ARGS,
            CliError::NoInventory => exit_codes::INVALID_ARGS,
        }
    }
}

// Conversions from core error subtypes to CliError
impl From<SelectionError> for CliError {
    fn from(e: SelectionError) -> Self {
        CliError::Core(CoreError::Selection(e))
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        CliError::Core(CoreError::Service(e))
    }
}

impl From<StorageError> for CliError {
    fn from(e: StorageError) -> Self {
        CliError::Core(CoreError::Storage(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            CliError::from(SelectionError::EmptySelection).exit_code(),
            exit_codes::EMPTY_SELECTION
        );
        assert_eq!(
            CliError::from(SelectionError::NoSourceChosen).exit_code(),
            exit_codes::INVALID_ARGS
        );
        assert_eq!(
            CliError::from(ServiceError::NotFound("x".to_string())).exit_code(),
            exit_codes::SERVICE_ERROR
        );
        assert_eq!(
            CliError::from(StorageError::InvalidDevEui("xyz".to_string())).exit_code(),
            exit_codes::INVALID_ARGS
        );
        assert_eq!(CliError::NoInventory.exit_code(), exit_codes::INVALID_ARGS);
    }
}
