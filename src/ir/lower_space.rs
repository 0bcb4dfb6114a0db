//! Lowering of a domain header into a [`Space`].
//!
//! ```text
//! spmv = {[i, n, j]: 0 <= i < N ^ rp(i) <= n < rp(i + 1) ^ j == col(n)}
//! ```
//!
//! The whole constraint is one comparison chain. Each `^` inside a
//! comparator closes the relation being built and opens the next one, so
//! the chain above yields `0 <= i < N`, `rp(i) <= n < rp(i + 1)` and
//! `j == col(n)`.

use crate::frontend::ast::{self, AstVisitor, BoolOpKind, CmpOp, Expr, ExprKind, UnaryOpKind};
use crate::ir::nodes::{self, ArithOp, Node, NodeId, Relation, Space};
use crate::utils::errors::{CompileError, CompileResult};
use crate::utils::location::Span;
use log::{debug, trace};

/// A relation under construction.
///
/// Mirrors [`Relation`] with every position optional; its identity is fixed
/// at creation so that re-adding it updates the stored copy.
struct OpenRelation {
    id: NodeId,
    left: Node,
    left_op: Option<CmpOp>,
    mid: Option<Node>,
    right_op: Option<CmpOp>,
    right: Option<Node>,
}

impl OpenRelation {
    fn new(left: Node) -> Self {
        Self { id: NodeId::fresh(), left, left_op: None, mid: None, right_op: None, right: None }
    }

    fn to_relation(&self) -> CompileResult<Relation> {
        let (left_op, right) = match (self.left_op, &self.right) {
            (Some(op), Some(right)) => (op, right.clone()),
            _ => return Err(CompileError::structural("relation is missing an operand")),
        };
        Ok(Relation {
            id: self.id,
            left: self.left.clone(),
            left_op,
            mid: self.mid.clone(),
            right_op: self.right_op,
            right,
        })
    }
}

/// Builds a [`Space`] from one header statement.
#[derive(Debug, Default)]
pub struct RelationParser {
    space: Space,
}

impl RelationParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a header statement; the parser is consumed so every space is
    /// built from fresh state.
    pub fn parse(mut self, stmt: &ast::Stmt) -> CompileResult<Space> {
        self.visit_stmt(stmt)?;
        if self.space.name.is_empty() {
            return Err(CompileError::structural("domain header must be an assignment"));
        }
        debug!(
            "Parsed space '{}': {} iterators, {} relations",
            self.space.name,
            self.space.iterators.len(),
            self.space.relations.len()
        );
        Ok(self.space)
    }

    fn add(&mut self, relation: &OpenRelation) -> CompileResult<()> {
        let relation = relation.to_relation()?;
        trace!("Relation {} in '{}': {:?}", relation.id, self.space.name, relation);
        self.space.add_relation(relation);
        Ok(())
    }

    /// Lower an expression that must produce an IR node.
    fn operand(&mut self, expr: &Expr) -> CompileResult<Node> {
        self.visit_expr(expr)?.ok_or_else(|| {
            CompileError::unsupported(format!(
                "{} in a domain expression at {}",
                expr.describe(),
                expr.span
            ))
        })
    }

    /// The two sides of a `left ^ right` conjunction, if `expr` is one.
    fn conjunction(expr: &Expr) -> Option<(&Expr, &Expr)> {
        match &expr.kind {
            ExprKind::BinOp(bin) if bin.op == ast::BinOpKind::BitXor => {
                Some((bin.left.as_ref(), bin.right.as_ref()))
            }
            _ => None,
        }
    }

    /// Split one comparison chain into relations.
    ///
    /// Comparators are consumed in pairs. A trailing odd comparator extends
    /// whichever relation is still open.
    fn split_chain(&mut self, cmp: &ast::Compare) -> CompileResult<()> {
        let ops = &cmp.ops;
        let comps = &cmp.comparators;
        let mut relation = OpenRelation::new(self.operand(&cmp.left)?);

        let has_remaining = comps.len() % 2 == 1;
        let paired = comps.len() - comps.len() % 2;

        for n in (0..paired).step_by(2) {
            let (comp, next_comp) = (&comps[n], &comps[n + 1]);
            relation.left_op = Some(ops[n]);

            if let Some((close, open)) = Self::conjunction(comp) {
                relation.right = Some(self.operand(close)?);
                self.add(&relation)?;
                relation = OpenRelation::new(self.operand(open)?);
                relation.left_op = Some(ops[n + 1]);
            } else {
                relation.mid = Some(self.operand(comp)?);
                relation.right_op = Some(ops[n + 1]);
            }

            if let Some((close, open)) = Self::conjunction(next_comp) {
                relation.right = Some(self.operand(close)?);
                self.add(&relation)?;
                relation = OpenRelation::new(self.operand(open)?);
            } else {
                relation.right = Some(self.operand(next_comp)?);
                self.add(&relation)?;
            }
        }

        if let (true, Some(last_op), Some(last)) = (has_remaining, ops.last(), comps.last()) {
            if let Some(right) = relation.right.take() {
                relation.mid = Some(right);
                relation.right_op = Some(*last_op);
            } else {
                relation.left_op = Some(*last_op);
            }
            relation.right = Some(self.operand(last)?);
            self.add(&relation)?;
        } else if relation.right.is_none() {
            return Err(CompileError::structural(format!(
                "dangling operand after '^' in domain '{}' at {}",
                self.space.name, cmp.left.span
            )));
        }
        Ok(())
    }

    fn constraint(&mut self, expr: &Expr) -> CompileResult<()> {
        match &expr.kind {
            ExprKind::Compare(_) | ExprKind::BoolOp(_) => {
                self.visit_expr(expr)?;
                Ok(())
            }
            _ => Err(CompileError::unsupported(format!(
                "{} used as a domain constraint at {}",
                expr.describe(),
                expr.span
            ))),
        }
    }
}

impl AstVisitor for RelationParser {
    type Output = Option<Node>;

    fn visit_assign(&mut self, node: &ast::Assign) -> CompileResult<Option<Node>> {
        let name = match node.targets.as_slice() {
            [target] => target.as_name(),
            _ => None,
        };
        let name = name.ok_or_else(|| {
            CompileError::structural("domain header must assign to exactly one name")
        })?;
        self.space.name = name.to_string();

        match &node.value.kind {
            ExprKind::Dict(dict) => self.visit_dict(dict, node.value.span),
            _ => Err(CompileError::structural(format!(
                "domain '{}' must be a dict display, found {}",
                name,
                node.value.describe()
            ))),
        }
    }

    fn visit_aug_assign(&mut self, _node: &ast::AugAssign) -> CompileResult<Option<Node>> {
        Err(CompileError::structural("domain header cannot be an augmented assignment"))
    }

    fn visit_dict(&mut self, node: &ast::Dict, _span: Span) -> CompileResult<Option<Node>> {
        for key in &node.keys {
            let elts = match &key.kind {
                ExprKind::List(elts) | ExprKind::Tuple(elts) => elts,
                _ => {
                    return Err(CompileError::structural(format!(
                        "iterator list expected, found {}",
                        key.describe()
                    )))
                }
            };
            for elt in elts {
                let name = elt.as_name().ok_or_else(|| {
                    CompileError::structural(format!("iterator must be a name, found {}", elt.describe()))
                })?;
                self.space.add_iterator(nodes::Iterator { name: name.to_string() });
            }
        }
        for value in &node.values {
            self.constraint(value)?;
        }
        Ok(None)
    }

    fn visit_name(&mut self, name: &str, _span: Span) -> CompileResult<Option<Node>> {
        if self.space.has_iterator(name) {
            return Ok(Some(Node::iterator(name)));
        }
        Ok(Some(Node::constant(name)))
    }

    fn visit_number(&mut self, text: &str, _span: Span) -> CompileResult<Option<Node>> {
        Ok(Some(Node::literal(text)))
    }

    fn visit_bin_op(&mut self, node: &ast::BinOp, _span: Span) -> CompileResult<Option<Node>> {
        let left = self.operand(&node.left)?;
        let op = ArithOp::from_host(node.op)?;
        let right = self.operand(&node.right)?;
        Ok(Some(Node::bin_op(left, op, right)))
    }

    fn visit_unary_op(&mut self, node: &ast::UnaryOp, _span: Span) -> CompileResult<Option<Node>> {
        match (node.op, &node.operand.kind) {
            (UnaryOpKind::USub, ExprKind::Number(text)) => Ok(Some(Node::literal(format!("-{}", text)))),
            (UnaryOpKind::USub, _) => {
                let operand = self.operand(&node.operand)?;
                Ok(Some(Node::bin_op(Node::literal("-1"), ArithOp::Mul, operand)))
            }
            (UnaryOpKind::UAdd, _) => self.operand(&node.operand).map(Some),
            (UnaryOpKind::Not, _) => Err(CompileError::UnsupportedOperator("not".to_string())),
            (UnaryOpKind::Invert, _) => Err(CompileError::UnsupportedOperator("~".to_string())),
        }
    }

    fn visit_call(&mut self, node: &ast::Call, _span: Span) -> CompileResult<Option<Node>> {
        let mut func = nodes::Function::new(node.func.clone());
        for arg in &node.args {
            func.add(self.operand(arg)?);
        }
        Ok(Some(Node::Function(func)))
    }

    fn visit_compare(&mut self, node: &ast::Compare, _span: Span) -> CompileResult<Option<Node>> {
        self.split_chain(node)?;
        Ok(None)
    }

    fn visit_bool_op(&mut self, node: &ast::BoolOp, span: Span) -> CompileResult<Option<Node>> {
        if node.op == BoolOpKind::Or {
            return Err(CompileError::unsupported(format!("disjunction in a domain at {}", span)));
        }
        for value in &node.values {
            self.constraint(value)?;
        }
        Ok(None)
    }
}

/// Parse a header statement into a space.
pub fn parse_space(stmt: &ast::Stmt) -> CompileResult<Space> {
    RelationParser::new().parse(stmt)
}
