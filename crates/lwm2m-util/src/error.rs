//! Object manager errors

use lwm2m_core::{DirectoryError, EngineError};
use thiserror::Error;

/// Result type for object manager operations
pub type UtilResult<T> = Result<T, UtilError>;

/// Errors that can occur while managing object instances
#[derive(Debug, Error)]
pub enum UtilError {
    /// Unknown index, missing gateway instance or no matching slot
    #[error("Not found: {0}")]
    NotFound(String),

    /// Slot table is stamped with a different base instance than the
    /// gateway index currently resolves to
    #[error("Base instance mismatch for index {index}: table {stamped}, gateway {resolved}")]
    Conflict {
        index: usize,
        stamped: u16,
        resolved: u16,
    },

    /// No free slot, or the slot's previous create attempt failed
    #[error("No capacity for object {obj_type}/{instance}")]
    ResourceExhausted { obj_type: u16, instance: u16 },

    /// Out-of-range instance id, reserved instance or bad payload length
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Object engine call failed
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Gateway directory refused the slot table
    #[error("Gateway directory error: {0}")]
    Directory(DirectoryError),

    /// Configuration storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Configuration file could not be used
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error category, for callers that only branch on the kind of failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    ResourceExhausted,
    InvalidArgument,
    /// A collaborator (engine, directory, storage) failed
    Underlying,
}

impl UtilError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UtilError::NotFound(_) => ErrorKind::NotFound,
            UtilError::Conflict { .. } => ErrorKind::Conflict,
            UtilError::ResourceExhausted { .. } => ErrorKind::ResourceExhausted,
            UtilError::InvalidArgument(_) | UtilError::Config(_) => ErrorKind::InvalidArgument,
            UtilError::Engine(_) | UtilError::Directory(_) | UtilError::Storage(_) => {
                ErrorKind::Underlying
            }
        }
    }
}

impl From<DirectoryError> for UtilError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::UnknownIndex(_) | DirectoryError::NoInstance(_) => {
                UtilError::NotFound(err.to_string())
            }
            DirectoryError::Rejected { .. } => UtilError::Directory(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_error_conversion() {
        let err: UtilError = DirectoryError::NoInstance(4).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: UtilError = DirectoryError::Rejected {
            index: 4,
            reason: "full".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Underlying);
    }

    #[test]
    fn test_engine_error_is_underlying() {
        let err: UtilError = EngineError::NoMemory("3303/100".into()).into();
        assert_eq!(err.kind(), ErrorKind::Underlying);
        assert_eq!(err.to_string(), "Engine error: Out of memory creating 3303/100");
    }
}
