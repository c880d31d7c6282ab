//! Table-level errors.

use std::fmt;

use crate::datum::SerializationError;
use crate::heap::HeapError;
use crate::index::IndexError;

/// Errors from table operations.
#[derive(Debug)]
pub enum TableError {
    /// Underlying heap failure.
    Heap(HeapError),
    /// Underlying index failure.
    Index(IndexError),
    /// Header (de)serialization failure.
    Serialization(SerializationError),
    /// File I/O failure.
    Io(std::io::Error),
    /// The header file is structurally invalid.
    Corrupted(String),
    /// Referenced column does not exist.
    ColumnNotFound {
        /// Column name as written.
        name: String,
    },
    /// Column name already used in this table.
    DuplicateColumn {
        /// The duplicated name.
        name: String,
    },
    /// The column already has an index.
    IndexExists {
        /// Indexed column name.
        column: String,
    },
    /// The column has no index.
    IndexNotFound {
        /// Column name.
        column: String,
    },
    /// A NOT NULL column received NULL.
    NotNullViolation {
        /// Violated column.
        column: String,
    },
    /// A UNIQUE / PRIMARY KEY column received a duplicate value.
    UniqueViolation {
        /// Violated column.
        column: String,
    },
    /// A value does not fit the column's declared type.
    TypeMismatch {
        /// Target column.
        column: String,
        /// Declared type.
        expected: String,
        /// Offered value type.
        found: String,
    },
    /// Wrong number of values for the column list.
    ArityMismatch {
        /// Expected value count.
        expected: usize,
        /// Supplied value count.
        found: usize,
    },
    /// Identifier exceeds the name length bound.
    NameTooLong {
        /// Offending identifier.
        name: String,
    },
    /// Attempt to drop a table's only column.
    LastColumn {
        /// The column being dropped.
        column: String,
    },
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::Heap(e) => write!(f, "{}", e),
            TableError::Index(e) => write!(f, "{}", e),
            TableError::Serialization(e) => write!(f, "{}", e),
            TableError::Io(e) => write!(f, "table I/O error: {}", e),
            TableError::Corrupted(msg) => write!(f, "table header corrupted: {}", msg),
            TableError::ColumnNotFound { name } => {
                write!(f, "column `{}` does not exist", name)
            }
            TableError::DuplicateColumn { name } => {
                write!(f, "duplicate column `{}`", name)
            }
            TableError::IndexExists { column } => {
                write!(f, "column `{}` is already indexed", column)
            }
            TableError::IndexNotFound { column } => {
                write!(f, "no index on column `{}`", column)
            }
            TableError::NotNullViolation { column } => {
                write!(f, "column `{}` cannot be NULL", column)
            }
            TableError::UniqueViolation { column } => {
                write!(f, "duplicate value for unique column `{}`", column)
            }
            TableError::TypeMismatch {
                column,
                expected,
                found,
            } => write!(
                f,
                "incompatible value for column `{}`: expected {}, found {}",
                column, expected, found
            ),
            TableError::ArityMismatch { expected, found } => {
                write!(f, "expected {} values, found {}", expected, found)
            }
            TableError::NameTooLong { name } => {
                write!(f, "identifier `{}` is too long", name)
            }
            TableError::LastColumn { column } => {
                write!(f, "cannot drop `{}`: it is the table's only column", column)
            }
        }
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TableError::Heap(e) => Some(e),
            TableError::Index(e) => Some(e),
            TableError::Serialization(e) => Some(e),
            TableError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HeapError> for TableError {
    fn from(e: HeapError) -> Self {
        TableError::Heap(e)
    }
}

impl From<IndexError> for TableError {
    fn from(e: IndexError) -> Self {
        TableError::Index(e)
    }
}

impl From<SerializationError> for TableError {
    fn from(e: SerializationError) -> Self {
        TableError::Serialization(e)
    }
}

impl From<std::io::Error> for TableError {
    fn from(e: std::io::Error) -> Self {
        TableError::Io(e)
    }
}
