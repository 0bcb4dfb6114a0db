//! Collection of field accesses from computation statements.
//!
//! Every subscripted name becomes a [`Field`] the first time it appears,
//! and each subscript appends an [`Access`] flagged as a read or a write.
//! Assignment targets are writes; everything else, including every index
//! expression, is a read.

use crate::frontend::ast::{self, AstVisitor, ExprKind, UnaryOpKind};
use crate::ir::nodes::{Access, ArithOp, Field, Node, Space};
use crate::utils::errors::{CompileError, CompileResult};
use crate::utils::location::Span;
use indexmap::IndexMap;
use log::{debug, trace};

/// Collects the fields of one computation body.
pub struct ComputationParser<'s> {
    space: &'s Space,
    constants: Vec<String>,
    fields: IndexMap<String, Field>,
    in_write: bool,
    /// Nesting depth of subscript indices being lowered
    index_depth: usize,
}

impl<'s> ComputationParser<'s> {
    pub fn new(space: &'s Space) -> Self {
        Self {
            space,
            constants: space.constants(),
            fields: IndexMap::new(),
            in_write: false,
            index_depth: 0,
        }
    }

    /// Visit every statement and return the fields in first-seen order.
    pub fn parse(mut self, body: &[ast::Stmt]) -> CompileResult<IndexMap<String, Field>> {
        for stmt in body {
            self.visit_stmt(stmt)?;
        }
        debug!(
            "Computation '{}' uses fields {:?}",
            self.space.name,
            self.fields.keys().collect::<Vec<_>>()
        );
        Ok(self.fields)
    }

    fn record(&mut self, name: &str, index: Vec<Node>, is_write: bool) {
        trace!(
            "{} access to '{}' with {} index components",
            if is_write { "Write" } else { "Read" },
            name,
            index.len()
        );
        self.fields
            .entry(name.to_string())
            .or_insert_with(|| Field::new(name))
            .add_access(Access::new(index, is_write));
    }

    fn check_target(target: &ast::Expr) -> CompileResult<()> {
        match &target.kind {
            ExprKind::Tuple(_) => Err(CompileError::unsupported(format!(
                "tuple assignment target at {}",
                target.span
            ))),
            _ => Ok(()),
        }
    }

    fn visit_target(&mut self, target: &ast::Expr) -> CompileResult<()> {
        Self::check_target(target)?;
        self.in_write = true;
        let result = self.visit_expr(target);
        self.in_write = false;
        result.map(|_| ())
    }

    /// Lower an index component, which must produce a node.
    fn index_node(&mut self, expr: &ast::Expr) -> CompileResult<Node> {
        self.index_depth += 1;
        let node = self.visit_expr(expr);
        self.index_depth -= 1;
        node?.ok_or_else(|| {
            CompileError::unsupported(format!("{} in a subscript at {}", expr.describe(), expr.span))
        })
    }

    fn in_index(&self) -> bool {
        self.index_depth > 0
    }
}

impl AstVisitor for ComputationParser<'_> {
    type Output = Option<Node>;

    fn visit_assign(&mut self, node: &ast::Assign) -> CompileResult<Option<Node>> {
        if node.targets.len() != 1 {
            return Err(CompileError::unsupported(format!(
                "assignment to {} targets",
                node.targets.len()
            )));
        }
        self.visit_target(&node.targets[0])?;
        self.visit_expr(&node.value)?;
        Ok(None)
    }

    fn visit_aug_assign(&mut self, node: &ast::AugAssign) -> CompileResult<Option<Node>> {
        self.visit_target(&node.target)?;
        self.visit_expr(&node.value)?;
        Ok(None)
    }

    fn visit_subscript(&mut self, node: &ast::Subscript, span: Span) -> CompileResult<Option<Node>> {
        let name = node.value.as_name().ok_or_else(|| {
            CompileError::unsupported(format!("subscript of a {} at {}", node.value.describe(), span))
        })?;
        let is_write = self.in_write;

        // Create the field before lowering its index so outer names come first
        if !self.fields.contains_key(name) {
            self.fields.insert(name.to_string(), Field::new(name));
        }

        self.in_write = false;
        let index: CompileResult<Vec<Node>> = node
            .index
            .index_components()
            .into_iter()
            .map(|component| self.index_node(component))
            .collect();
        self.in_write = is_write;
        let index = index?;

        self.record(name, index.clone(), is_write);
        Ok(Some(Node::function(name, index)))
    }

    fn visit_name(&mut self, name: &str, _span: Span) -> CompileResult<Option<Node>> {
        if self.space.has_iterator(name) {
            return Ok(Some(Node::iterator(name)));
        }
        if self.constants.iter().any(|c| c == name) {
            return Ok(Some(Node::constant(name)));
        }
        // A bare name that is neither bound nor symbolic is a scalar field
        self.record(name, Vec::new(), self.in_write);
        Ok(Some(Node::constant(name)))
    }

    fn visit_number(&mut self, text: &str, _span: Span) -> CompileResult<Option<Node>> {
        Ok(Some(Node::literal(text)))
    }

    fn visit_bin_op(&mut self, node: &ast::BinOp, _span: Span) -> CompileResult<Option<Node>> {
        let left = self.visit_expr(&node.left)?;
        let right = self.visit_expr(&node.right)?;
        let op = if self.in_index() {
            Some(ArithOp::from_host(node.op)?)
        } else {
            ArithOp::from_host(node.op).ok()
        };
        Ok(match (left, op, right) {
            (Some(left), Some(op), Some(right)) => Some(Node::bin_op(left, op, right)),
            _ => None,
        })
    }

    fn visit_unary_op(&mut self, node: &ast::UnaryOp, _span: Span) -> CompileResult<Option<Node>> {
        let operand = self.visit_expr(&node.operand)?;
        Ok(match (node.op, operand) {
            (UnaryOpKind::USub, Some(Node::Literal(lit))) if !lit.value.starts_with('-') => {
                Some(Node::literal(format!("-{}", lit.value)))
            }
            (UnaryOpKind::USub, Some(operand)) => {
                Some(Node::bin_op(Node::literal("-1"), ArithOp::Mul, operand))
            }
            (UnaryOpKind::UAdd, operand) => operand,
            _ => None,
        })
    }

    fn visit_call(&mut self, node: &ast::Call, _span: Span) -> CompileResult<Option<Node>> {
        let mut args = Vec::with_capacity(node.args.len());
        for arg in &node.args {
            match self.visit_expr(arg)? {
                Some(arg) => args.push(arg),
                None if self.in_index() => {
                    return Err(CompileError::unsupported(format!(
                        "{} as a call argument at {}",
                        arg.describe(),
                        arg.span
                    )))
                }
                None => {}
            }
        }
        Ok(Some(Node::function(node.func.clone(), args)))
    }
}

/// Collect the fields referenced by `body` against `space`.
pub fn parse_fields(space: &Space, body: &[ast::Stmt]) -> CompileResult<IndexMap<String, Field>> {
    ComputationParser::new(space).parse(body)
}
