//! Error types reported by collaborators

use thiserror::Error;

/// Result type for object engine calls
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type for gateway directory calls
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors returned by the LwM2M object engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Object, instance or resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Object instance already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Engine has no room for another instance
    #[error("Out of memory creating {0}")]
    NoMemory(String),

    /// Malformed path or value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Backing storage or transport failure
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Engine error: {0}")]
    Other(String),
}

impl EngineError {
    /// True when the error means the addressed instance is gone or was
    /// rejected by the server.
    ///
    /// These are the statuses that make a satellite owner hand its slot back.
    pub fn is_missing_instance(&self) -> bool {
        matches!(self, EngineError::NotFound(_) | EngineError::AlreadyExists(_))
    }
}

/// Errors returned by the gateway directory
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// Index does not address a gateway table entry
    #[error("Unknown gateway index: {0}")]
    UnknownIndex(usize),

    /// Index is valid but no gateway object instance exists for it
    #[error("No gateway instance for index {0}")]
    NoInstance(usize),

    /// Directory refused to store the slot table handle
    #[error("Gateway index {index} rejected slot table: {reason}")]
    Rejected { index: usize, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_instance_statuses() {
        assert!(EngineError::NotFound("3303/100".into()).is_missing_instance());
        assert!(EngineError::AlreadyExists("3303/100".into()).is_missing_instance());
        assert!(!EngineError::NoMemory("3303/100".into()).is_missing_instance());
        assert!(!EngineError::Io("timeout".into()).is_missing_instance());
    }

    #[test]
    fn test_error_display() {
        let err = DirectoryError::Rejected {
            index: 3,
            reason: "busy".into(),
        };
        assert_eq!(err.to_string(), "Gateway index 3 rejected slot table: busy");
    }
}
