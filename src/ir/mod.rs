//! Intermediate representation.
//!
//! A source text lowers to a list of [`Computation`]s. Each one pairs an
//! iteration [`Space`] (from its header) with the statements executed at
//! every point of it and the [`Field`]s those statements touch.

pub mod lower_fields;
pub mod lower_space;
pub mod nodes;
pub mod visit;

pub use lower_fields::{parse_fields, ComputationParser};
pub use lower_space::{parse_space, RelationParser};
pub use nodes::*;
pub use visit::{walk_node, IrVisitor};

use crate::frontend::ast::{ExprKind, Module, Stmt};
use crate::utils::errors::{CompileError, CompileResult};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

/// A header and the statements that run over its domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Computation {
    pub space: Space,
    pub body: Vec<Stmt>,
    pub fields: IndexMap<String, Field>,
}

impl Computation {
    pub fn name(&self) -> &str {
        &self.space.name
    }
}

/// A header is an assignment whose value is a dict display.
pub fn is_header(stmt: &Stmt) -> bool {
    match &stmt.kind {
        crate::frontend::ast::StmtKind::Assign(assign) => {
            matches!(assign.value.kind, ExprKind::Dict(_))
        }
        _ => false,
    }
}

/// Split a module into computations, each opened by a header.
pub fn lower_program(module: &Module) -> CompileResult<Vec<Computation>> {
    let mut groups: Vec<(Space, Vec<Stmt>)> = Vec::new();

    for stmt in &module.body {
        if is_header(stmt) {
            groups.push((parse_space(stmt)?, Vec::new()));
            continue;
        }
        match groups.last_mut() {
            Some((_, body)) => body.push(stmt.clone()),
            None => {
                return Err(CompileError::structural(format!(
                    "first statement at {} must be a domain header",
                    stmt.span
                )))
            }
        }
    }

    if groups.is_empty() {
        return Err(CompileError::structural("no computations in source"));
    }

    let mut computations = Vec::with_capacity(groups.len());
    for (space, body) in groups {
        let fields = parse_fields(&space, &body)?;
        if fields.is_empty() {
            return Err(CompileError::structural(format!(
                "computation '{}' accesses no fields",
                space.name
            )));
        }
        computations.push(Computation { space, body, fields });
    }

    debug!("Lowered {} computation(s)", computations.len());
    Ok(computations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend;

    fn lower(source: &str) -> CompileResult<Vec<Computation>> {
        lower_program(&frontend::parse(source)?)
    }

    #[test]
    fn test_single_computation() {
        let comps = lower("dmv = {[i, j]: 0 <= i < N ^ 0 <= j < M}\ny[i] += A[i, j] * x[j]").unwrap();
        assert_eq!(comps.len(), 1);
        assert_eq!(comps[0].name(), "dmv");
        assert_eq!(comps[0].body.len(), 1);
        assert_eq!(comps[0].fields.len(), 3);
    }

    #[test]
    fn test_headers_open_computations() {
        let source = "\
a = {[i]: 0 <= i < N}
x[i] = 0
y[i] = x[i]
b = {[j]: 0 <= j < M}
z[j] = 1
";
        let comps = lower(source).unwrap();
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[0].body.len(), 2);
        assert_eq!(comps[1].name(), "b");
    }

    #[test]
    fn test_missing_header() {
        let err = lower("y[i] = x[i]").unwrap_err();
        assert!(matches!(err, CompileError::StructuralAssertion(_)));
    }

    #[test]
    fn test_computation_without_fields() {
        let err = lower("s = {[i]: 0 <= i < N}").unwrap_err();
        assert!(matches!(err, CompileError::StructuralAssertion(_)));
    }

    #[test]
    fn test_empty_source() {
        assert!(matches!(lower("").unwrap_err(), CompileError::StructuralAssertion(_)));
    }
}
