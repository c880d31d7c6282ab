//! Heap-specific errors.

use std::fmt;

use crate::datum::SerializationError;

use super::Rid;

/// Errors from heap file operations.
#[derive(Debug)]
pub enum HeapError {
    /// Underlying file I/O failure.
    Io(std::io::Error),
    /// The heap file is structurally invalid.
    Corrupted(String),
    /// Record does not fit in a page.
    RecordTooLarge {
        /// Serialized record size.
        size: usize,
    },
    /// The rid does not address a live record.
    InvalidRid(Rid),
    /// Record (de)serialization failure.
    Serialization(SerializationError),
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapError::Io(e) => write!(f, "heap I/O error: {}", e),
            HeapError::Corrupted(msg) => write!(f, "heap corrupted: {}", msg),
            HeapError::RecordTooLarge { size } => {
                write!(f, "record of {} bytes does not fit in a page", size)
            }
            HeapError::InvalidRid(rid) => write!(f, "no record at {}", rid),
            HeapError::Serialization(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for HeapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HeapError::Io(e) => Some(e),
            HeapError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HeapError {
    fn from(e: std::io::Error) -> Self {
        HeapError::Io(e)
    }
}

impl From<SerializationError> for HeapError {
    fn from(e: SerializationError) -> Self {
        HeapError::Serialization(e)
    }
}
