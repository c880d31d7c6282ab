//! Index-specific errors.

use std::fmt;

use crate::datum::SerializationError;

/// Errors from index file operations.
#[derive(Debug)]
pub enum IndexError {
    /// Underlying file I/O failure.
    Io(std::io::Error),
    /// The index file is structurally invalid.
    Corrupted(String),
    /// Key (de)serialization failure.
    Serialization(SerializationError),
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::Io(e) => write!(f, "index I/O error: {}", e),
            IndexError::Corrupted(msg) => write!(f, "index corrupted: {}", msg),
            IndexError::Serialization(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IndexError::Io(e) => Some(e),
            IndexError::Serialization(e) => Some(e),
            IndexError::Corrupted(_) => None,
        }
    }
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Io(e)
    }
}

impl From<SerializationError> for IndexError {
    fn from(e: SerializationError) -> Self {
        IndexError::Serialization(e)
    }
}
