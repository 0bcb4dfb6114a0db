//! Rendering of spaces and relations as set-notation text.
//!
//! Two surface forms are produced from the same walk:
//!
//! ```text
//! engine:  dmv = {[i, j] : 0 <= i < N && 0 <= j < M}
//! source:  dmv = {[i, j]: 0 <= i < N ^ 0 <= j < M}
//! ```
//!
//! Every constant met during rendering is registered, in first-appearance
//! order, for the constraint list and the emitted signature.

use crate::ir::nodes::{self, ArithOp, BinOp, Node, Relation, Space};
use crate::ir::visit::IrVisitor;
use indexmap::IndexSet;

/// Conjunction used between relations in each surface form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetForm {
    /// Engine input: ` : ` after the tuple, `&&` between relations
    Engine,
    /// Host header syntax: `: ` after the tuple, `^` between relations
    Source,
}

#[derive(Debug, Default)]
pub struct RelationRenderer {
    constants: IndexSet<String>,
}

impl RelationRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constants registered so far, in first-appearance order.
    pub fn constants(&self) -> Vec<String> {
        self.constants.iter().cloned().collect()
    }

    /// `left left_op [mid right_op] right`
    pub fn relation(&mut self, relation: &Relation) -> String {
        self.visit_relation(relation)
    }

    pub fn space(&mut self, space: &Space, form: SetForm) -> String {
        let iterators = space.iterator_names().join(", ");
        if space.relations.is_empty() {
            return format!("{} = {{[{}]}}", space.name, iterators);
        }
        let relations: Vec<String> = space.relations.iter().map(|r| self.relation(r)).collect();
        match form {
            SetForm::Engine => format!("{} = {{[{}] : {}}}", space.name, iterators, relations.join(" && ")),
            SetForm::Source => format!("{} = {{[{}]: {}}}", space.name, iterators, relations.join(" ^ ")),
        }
    }

    pub fn engine_form(&mut self, space: &Space) -> String {
        self.space(space, SetForm::Engine)
    }

    pub fn source_form(&mut self, space: &Space) -> String {
        self.space(space, SetForm::Source)
    }

    fn precedence(node: &Node) -> u8 {
        match node {
            Node::BinOp(bin) => bin.op.precedence(),
            Node::Literal(lit) if lit.value.starts_with('-') => 2,
            _ => u8::MAX,
        }
    }

    fn child(&mut self, node: &Node, needs_parens: bool) -> String {
        let text = self.visit(node);
        if needs_parens {
            format!("({})", text)
        } else {
            text
        }
    }
}

impl IrVisitor for RelationRenderer {
    type Output = String;

    fn visit_symbol(&mut self, name: &str) -> String {
        name.to_string()
    }

    fn visit_constant(&mut self, node: &nodes::Constant) -> String {
        self.constants.insert(node.name.clone());
        node.name.clone()
    }

    fn visit_literal(&mut self, node: &nodes::Literal) -> String {
        node.value.clone()
    }

    fn visit_function(&mut self, node: &nodes::Function) -> String {
        let args: Vec<String> = node.args.iter().map(|arg| self.visit(arg)).collect();
        format!("{}({})", node.name, args.join(", "))
    }

    fn visit_bin_op(&mut self, node: &BinOp) -> String {
        let prec = node.op.precedence();
        let (left_prec, right_prec) = (Self::precedence(&node.left), Self::precedence(&node.right));
        // `**` groups to the right, everything else to the left
        let (left_parens, right_parens) = if node.op == ArithOp::Pow {
            (left_prec <= prec, right_prec < prec)
        } else {
            (left_prec < prec, right_prec <= prec)
        };
        let left = self.child(&node.left, left_parens);
        let right = self.child(&node.right, right_parens);
        format!("{} {} {}", left, node.op, right)
    }

    fn visit_relation(&mut self, relation: &Relation) -> String {
        let mut parts = vec![self.visit(&relation.left), relation.left_op.symbol().to_string()];
        if let (Some(mid), Some(right_op)) = (&relation.mid, relation.right_op) {
            parts.push(self.visit(mid));
            parts.push(right_op.symbol().to_string());
        }
        parts.push(self.visit(&relation.right));
        parts.join(" ")
    }
}
