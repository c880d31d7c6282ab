//! Executor-specific errors.

use std::fmt;

use crate::db::{EngineError, ObjectKind};
use crate::table::TableError;

/// Errors that can occur during planning and execution.
#[derive(Debug)]
pub enum ExecutorError {
    /// Referenced relation is not part of the statement.
    TableNotFound {
        /// Relation name as written.
        name: String,
    },

    /// Referenced column does not exist in any live relation.
    ColumnNotFound {
        /// Column name as written.
        name: String,
    },

    /// Unqualified column reference matches more than one relation.
    AmbiguousColumn {
        /// Column name as written.
        name: String,
    },

    /// Type mismatch in expression evaluation.
    TypeMismatch {
        /// What the operator needed.
        expected: String,
        /// What it got.
        found: String,
    },

    /// Division by zero in arithmetic expression.
    DivisionByZero,

    /// Integer overflow in arithmetic expression.
    IntegerOverflow,

    /// Operation the executor does not support in this position.
    Unsupported(String),

    /// Storage failure from the table layer.
    Table(TableError),

    /// Result sink write failure.
    Output(std::io::Error),
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorError::TableNotFound { name } => {
                write!(f, "table `{}` does not exist", name)
            }
            ExecutorError::ColumnNotFound { name } => {
                write!(f, "column `{}` does not exist", name)
            }
            ExecutorError::AmbiguousColumn { name } => {
                write!(f, "column reference `{}` is ambiguous", name)
            }
            ExecutorError::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            ExecutorError::DivisionByZero => write!(f, "division by zero"),
            ExecutorError::IntegerOverflow => write!(f, "integer overflow"),
            ExecutorError::Unsupported(msg) => write!(f, "unsupported: {}", msg),
            ExecutorError::Table(e) => write!(f, "{}", e),
            ExecutorError::Output(e) => write!(f, "output error: {}", e),
        }
    }
}

impl std::error::Error for ExecutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecutorError::Table(e) => Some(e),
            ExecutorError::Output(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TableError> for ExecutorError {
    fn from(e: TableError) -> Self {
        ExecutorError::Table(e)
    }
}

impl From<ExecutorError> for EngineError {
    fn from(e: ExecutorError) -> Self {
        match e {
            ExecutorError::TableNotFound { name } => EngineError::NotFound {
                kind: ObjectKind::Table,
                name,
            },
            ExecutorError::ColumnNotFound { name } => EngineError::NotFound {
                kind: ObjectKind::Column,
                name,
            },
            ExecutorError::TypeMismatch { .. } => EngineError::TypeMismatch {
                detail: e.to_string(),
            },
            ExecutorError::AmbiguousColumn { .. }
            | ExecutorError::DivisionByZero
            | ExecutorError::IntegerOverflow
            | ExecutorError::Unsupported(_) => EngineError::Evaluation {
                detail: e.to_string(),
            },
            ExecutorError::Output(io) => EngineError::StorageIo {
                detail: io.to_string(),
            },
            ExecutorError::Table(table_error) => table_error.into(),
        }
    }
}
