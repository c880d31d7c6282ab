//! Engine-level error taxonomy.
//!
//! Every module error folds into one of these kinds before it reaches the
//! user; the logger and the diagnostic stream only ever see an
//! [`EngineError`].

use std::fmt;

use crate::catalog::CatalogError;
use crate::heap::HeapError;
use crate::index::IndexError;
use crate::table::TableError;

/// What kind of object an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Database,
    Table,
    Column,
    Index,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectKind::Database => "database",
            ObjectKind::Table => "table",
            ObjectKind::Column => "column",
            ObjectKind::Index => "index",
        };
        write!(f, "{}", s)
    }
}

/// The engine's user-facing error kinds.
#[derive(Debug)]
pub enum EngineError {
    /// No database is open.
    NotOpen,
    /// A referenced object does not exist.
    NotFound {
        /// Object kind.
        kind: ObjectKind,
        /// Object name as written.
        name: String,
    },
    /// An object with this name already exists.
    AlreadyExists {
        /// Object kind.
        kind: ObjectKind,
        /// Conflicting name.
        name: String,
    },
    /// Incompatible value for a column or expression operand.
    TypeMismatch {
        /// Human-readable detail.
        detail: String,
    },
    /// NOT NULL / UNIQUE / PRIMARY KEY violation, or a structural bound.
    ConstraintViolation {
        /// Human-readable detail.
        detail: String,
    },
    /// Rename / open / read / write failure.
    StorageIo {
        /// Human-readable detail.
        detail: String,
    },
    /// Arithmetic or conversion fault inside the expression evaluator.
    Evaluation {
        /// Human-readable detail.
        detail: String,
    },
    /// Invariant violation.
    Internal {
        /// Human-readable detail.
        detail: String,
    },
}

impl EngineError {
    /// Short kind name for log records.
    pub fn kind_name(&self) -> &'static str {
        match self {
            EngineError::NotOpen => "NotOpen",
            EngineError::NotFound { .. } => "NotFound",
            EngineError::AlreadyExists { .. } => "AlreadyExists",
            EngineError::TypeMismatch { .. } => "TypeMismatch",
            EngineError::ConstraintViolation { .. } => "ConstraintViolation",
            EngineError::StorageIo { .. } => "StorageIO",
            EngineError::Evaluation { .. } => "Evaluation",
            EngineError::Internal { .. } => "Internal",
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NotOpen => write!(f, "no database is open"),
            EngineError::NotFound { kind, name } => {
                write!(f, "{} `{}` does not exist", kind, name)
            }
            EngineError::AlreadyExists { kind, name } => {
                write!(f, "{} `{}` already exists", kind, name)
            }
            EngineError::TypeMismatch { detail } => write!(f, "type mismatch: {}", detail),
            EngineError::ConstraintViolation { detail } => {
                write!(f, "constraint violation: {}", detail)
            }
            EngineError::StorageIo { detail } => write!(f, "storage error: {}", detail),
            EngineError::Evaluation { detail } => write!(f, "evaluation error: {}", detail),
            EngineError::Internal { detail } => write!(f, "internal error: {}", detail),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<TableError> for EngineError {
    fn from(e: TableError) -> Self {
        match e {
            TableError::ColumnNotFound { name } => EngineError::NotFound {
                kind: ObjectKind::Column,
                name,
            },
            TableError::DuplicateColumn { name } => EngineError::AlreadyExists {
                kind: ObjectKind::Column,
                name,
            },
            TableError::IndexExists { column } => EngineError::AlreadyExists {
                kind: ObjectKind::Index,
                name: column,
            },
            TableError::IndexNotFound { column } => EngineError::NotFound {
                kind: ObjectKind::Index,
                name: column,
            },
            TableError::NotNullViolation { .. }
            | TableError::UniqueViolation { .. }
            | TableError::LastColumn { .. }
            | TableError::NameTooLong { .. } => EngineError::ConstraintViolation {
                detail: e.to_string(),
            },
            TableError::TypeMismatch { .. } | TableError::ArityMismatch { .. } => {
                EngineError::TypeMismatch {
                    detail: e.to_string(),
                }
            }
            TableError::Heap(_)
            | TableError::Index(_)
            | TableError::Serialization(_)
            | TableError::Io(_)
            | TableError::Corrupted(_) => EngineError::StorageIo {
                detail: e.to_string(),
            },
        }
    }
}

impl From<CatalogError> for EngineError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NameTooLong { .. } | CatalogError::TooManyTables => {
                EngineError::ConstraintViolation {
                    detail: e.to_string(),
                }
            }
            CatalogError::Io(_) | CatalogError::Corrupted(_) => EngineError::StorageIo {
                detail: e.to_string(),
            },
        }
    }
}

impl From<HeapError> for EngineError {
    fn from(e: HeapError) -> Self {
        EngineError::StorageIo {
            detail: e.to_string(),
        }
    }
}

impl From<IndexError> for EngineError {
    fn from(e: IndexError) -> Self {
        EngineError::StorageIo {
            detail: e.to_string(),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::StorageIo {
            detail: e.to_string(),
        }
    }
}
