//! # omegagen - Loop-nest generation from polyhedral domain descriptions
//!
//! Turns short descriptions of iteration domains and the statements that
//! run over them into C functions, using the Omega calculator to scan the
//! (possibly non-affine) domains:
//! - Python-like front end for headers and statements
//! - Relation and field IR
//! - C statement translation and statement macros
//! - Scanning-engine boundary with an Omega calculator driver
//!
//! ## Architecture
//!
//! ```text
//! Source → Frontend → IR (Space, Field) → CodeGen ⇄ Scanning engine → C
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use omegagen::prelude::*;
//!
//! let source = r#"
//! dmv = {[i, j]: 0 <= i < N ^ 0 <= j < M}
//! y[i] += A[i, j] * x[j]
//! "#;
//!
//! let engine = OmegaCalc::default();
//! let code = omegagen::compile(source, &engine, &CompileConfig::default())?;
//! ```

#![warn(clippy::all)]

pub mod codegen;
pub mod frontend;
pub mod ir;
pub mod omega;
pub mod utils;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::codegen::{CodeGenerator, RelationRenderer, SetForm, StatementTranslator};
    pub use crate::frontend::ast::{Expr, ExprKind, Module, Stmt, StmtKind};
    pub use crate::ir::{lower_program, Access, Computation, Field, Node, Relation, Space};
    pub use crate::omega::{scan, OmegaCalc, ScanRequest, ScanningEngine};
    pub use crate::utils::errors::*;
    pub use crate::CompileConfig;
}

use anyhow::Result;
use log::debug;
use omega::ScanningEngine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Knobs for code generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    /// C type of field elements
    pub elem_type: String,
    /// C type of constants and loop temporaries
    pub index_type: String,
    /// Send `C >= 1` for every symbolic constant
    pub assume_positive: bool,
    /// Drop the engine's outer `if (...) { }` guard
    pub strip_guard: bool,
    /// Omega calculator binary
    pub engine_path: String,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            elem_type: "float".to_string(),
            index_type: "int".to_string(),
            assume_positive: true,
            strip_guard: true,
            engine_path: omega::calc::DEFAULT_BINARY.to_string(),
        }
    }
}

impl CompileConfig {
    pub fn with_elem_type(mut self, ty: impl Into<String>) -> Self {
        self.elem_type = ty.into();
        self
    }

    pub fn with_index_type(mut self, ty: impl Into<String>) -> Self {
        self.index_type = ty.into();
        self
    }

    pub fn with_assume_positive(mut self, yes: bool) -> Self {
        self.assume_positive = yes;
        self
    }

    pub fn with_strip_guard(mut self, yes: bool) -> Self {
        self.strip_guard = yes;
        self
    }

    pub fn with_engine_path(mut self, path: impl Into<String>) -> Self {
        self.engine_path = path.into();
        self
    }
}

/// Main entry point for parsing source code.
pub fn parse(source: &str) -> Result<frontend::Module> {
    Ok(frontend::parse(source)?)
}

/// Parse and split source into computations.
pub fn lower(source: &str) -> Result<Vec<ir::Computation>> {
    let module = parse(source)?;
    let computations = ir::lower_program(&module)?;
    debug!("Lowered {} computation(s)", computations.len());
    Ok(computations)
}

/// Read a source file and split it into computations.
pub fn lower_file(path: &Path) -> Result<Vec<ir::Computation>> {
    let source = frontend::read_source(path)?;
    lower(&source)
}

/// Full pipeline: source text to C through `engine`.
pub fn compile<E: ScanningEngine + ?Sized>(
    source: &str,
    engine: &E,
    config: &CompileConfig,
) -> Result<String> {
    let computations = lower(source)?;
    let generator = codegen::CodeGenerator::new(engine, config.clone());
    Ok(generator.generate(&computations)?)
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::CompileError;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: CompileConfig = serde_json::from_str(r#"{"elem_type": "double"}"#).unwrap();
        assert_eq!(config.elem_type, "double");
        assert_eq!(config.index_type, "int");
        assert!(config.assume_positive);
    }

    #[test]
    fn test_lower_file_reports_io() {
        let err = lower_file(Path::new("/nonexistent/spmv.og")).unwrap_err();
        assert!(matches!(err.downcast_ref::<CompileError>(), Some(CompileError::Io(_))));
    }

    #[test]
    fn test_errors_downcast() {
        let err = lower("y[i] = 1").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CompileError>(),
            Some(CompileError::StructuralAssertion(_))
        ));
    }
}
