//! Frontend: Lexer, Parser, and syntax tree for domain descriptions.
//!
//! ## Language Overview
//!
//! A source text is a sequence of computations. Each one opens with a
//! header that names an iteration domain, followed by the statements
//! executed at every point of that domain:
//!
//! ```text
//! spmv = {[i, n, j]: 0 <= i < N ^ rp(i) <= n < rp(i + 1) ^ j == col(n)}
//! y[i] += A[n] * x[j]
//! ```
//!
//! The header's keys list the iterators in loop-nest order; its value is a
//! constraint chain whose `^` separates the individual relations.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

// Re-exports
pub use ast::*;
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Token, TokenKind};

use crate::utils::errors::CompileResult;
use std::path::Path;

/// Parse source text into a syntax tree.
pub fn parse(source: &str) -> CompileResult<Module> {
    let lexer = Lexer::new(source);
    let mut parser = Parser::new(lexer)?;
    parser.parse_module()
}

/// Read a source file.
pub fn read_source(path: &Path) -> CompileResult<String> {
    Ok(std::fs::read_to_string(path)?)
}
