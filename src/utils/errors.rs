//! Error types for omegagen.
//!
//! Every failure is terminal for the compilation unit that produced it:
//! nothing here is retried or recovered, it propagates to the caller of the
//! pipeline.

use crate::utils::location::Span;
use std::fmt;
use thiserror::Error;

/// Top-level error type for a compilation.
#[derive(Error, Debug)]
pub enum CompileError {
    /// Error during lexing
    #[error("Lexer error: {0}")]
    Lexer(#[from] LexerError),

    /// Error during parsing of the host syntax
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// An operator with no entry in the relation or arithmetic symbol table
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// A syntax-tree node with no handler (multi-target assignment, `@`, ...)
    #[error("Unsupported construct: {0}")]
    UnsupportedConstruct(String),

    /// The scanning engine reported a failure in its output text.
    /// The payload is the engine's text, unmodified.
    #[error("{0}")]
    EngineReported(String),

    /// An invariant of the input shape was violated
    #[error("Structural assertion failed: {0}")]
    StructuralAssertion(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompileError {
    /// Source span of the failure, when it came from the front end.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Lexer(e) => Some(e.span),
            CompileError::Parse(e) => Some(e.span),
            _ => None,
        }
    }

    /// Shorthand for an unsupported construct.
    pub fn unsupported(what: impl Into<String>) -> Self {
        CompileError::UnsupportedConstruct(what.into())
    }

    /// Shorthand for a structural assertion failure.
    pub fn structural(what: impl Into<String>) -> Self {
        CompileError::StructuralAssertion(what.into())
    }
}

/// Error during lexical analysis.
#[derive(Error, Debug, Clone)]
pub struct LexerError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of lexer error
    pub kind: LexerErrorKind,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerErrorKind {
    /// Unexpected character
    UnexpectedChar,
    /// Invalid number literal
    InvalidNumber,
    /// Closing bracket without a matching opener
    UnbalancedBracket,
}

/// Error during parsing.
#[derive(Error, Debug, Clone)]
pub struct ParseError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of parse error
    pub kind: ParseErrorKind,
    /// Expected tokens (if applicable)
    pub expected: Vec<String>,
    /// What was found
    pub found: Option<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)?;
        if !self.expected.is_empty() {
            write!(f, " (expected: {})", self.expected.join(", "))?;
        }
        if let Some(ref found) = self.found {
            write!(f, " (found: {})", found)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Unexpected token
    UnexpectedToken,
    /// Expected a specific token
    ExpectedToken,
    /// Expected an expression
    ExpectedExpression,
    /// Left-hand side cannot be assigned to
    InvalidTarget,
}

/// Result type using CompileError.
pub type CompileResult<T> = Result<T, CompileError>;
