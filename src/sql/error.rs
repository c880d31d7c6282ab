//! SQL syntax error types.

use std::fmt;

/// A span in the source SQL string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Byte offset from the start of the input.
    pub start: usize,
    /// Byte offset of the end of the span (exclusive).
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Creates a zero-length span at the given position.
    pub fn at(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }
}

/// SQL syntax error with source position information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Error message.
    pub message: String,
    /// Position in the source where the error occurred.
    pub span: Span,
}

impl ParseError {
    /// Creates a new syntax error at the given position.
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    /// Creates a new error for an unexpected token.
    pub fn unexpected_token(expected: &str, found: &str, span: Span) -> Self {
        Self::new(format!("expected {}, found {}", expected, found), span)
    }

    /// Creates a new error for an unterminated string literal.
    pub fn unterminated_string(span: Span) -> Self {
        Self::new("unterminated string literal", span)
    }

    /// Creates a new error for an invalid number literal.
    pub fn invalid_number(span: Span) -> Self {
        Self::new("invalid number literal", span)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "syntax error at byte {}: {}", self.span.start, self.message)
    }
}

impl std::error::Error for ParseError {}
