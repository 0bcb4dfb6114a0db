//! Visitor over IR nodes.
//!
//! Dispatch is a single exhaustive `match` in [`IrVisitor::visit`]. Iterators
//! and constants share the [`IrVisitor::visit_symbol`] arm unless a visitor
//! overrides them separately; compound nodes fall back to [`walk_node`].

use crate::ir::nodes::*;
use indexmap::IndexSet;

pub trait IrVisitor: Sized {
    type Output: Default;

    fn visit(&mut self, node: &Node) -> Self::Output {
        match node {
            Node::Iterator(it) => self.visit_iterator(it),
            Node::Constant(c) => self.visit_constant(c),
            Node::Literal(lit) => self.visit_literal(lit),
            Node::Function(func) => self.visit_function(func),
            Node::BinOp(bin) => self.visit_bin_op(bin),
        }
    }

    /// Shared arm for named leaves.
    fn visit_symbol(&mut self, _name: &str) -> Self::Output {
        Self::Output::default()
    }

    fn visit_iterator(&mut self, node: &Iterator) -> Self::Output {
        self.visit_symbol(&node.name)
    }

    fn visit_constant(&mut self, node: &Constant) -> Self::Output {
        self.visit_symbol(&node.name)
    }

    fn visit_literal(&mut self, _node: &Literal) -> Self::Output {
        Self::Output::default()
    }

    fn visit_function(&mut self, node: &Function) -> Self::Output {
        walk_all(self, &node.args)
    }

    fn visit_bin_op(&mut self, node: &BinOp) -> Self::Output {
        walk_all(self, [node.left.as_ref(), node.right.as_ref()])
    }

    fn visit_relation(&mut self, relation: &Relation) -> Self::Output {
        walk_relation(self, relation)
    }

    fn visit_space(&mut self, space: &Space) -> Self::Output {
        for relation in &space.relations {
            self.visit_relation(relation);
        }
        Self::Output::default()
    }

    fn visit_field(&mut self, field: &Field) -> Self::Output {
        for access in &field.accesses {
            self.visit_access(access);
        }
        Self::Output::default()
    }

    fn visit_access(&mut self, access: &Access) -> Self::Output {
        walk_all(self, &access.index)
    }
}

/// Generic structural traversal: visit every child, yield the default.
pub fn walk_node<V: IrVisitor>(visitor: &mut V, node: &Node) -> V::Output {
    match node {
        Node::Function(func) => walk_all(visitor, &func.args),
        Node::BinOp(bin) => walk_all(visitor, [bin.left.as_ref(), bin.right.as_ref()]),
        Node::Iterator(_) | Node::Constant(_) | Node::Literal(_) => V::Output::default(),
    }
}

/// Visit the operands of a relation left to right.
pub fn walk_relation<V: IrVisitor>(visitor: &mut V, relation: &Relation) -> V::Output {
    visitor.visit(&relation.left);
    if let Some(mid) = &relation.mid {
        visitor.visit(mid);
    }
    visitor.visit(&relation.right);
    V::Output::default()
}

pub fn walk_all<'n, V, I>(visitor: &mut V, nodes: I) -> V::Output
where
    V: IrVisitor,
    I: IntoIterator<Item = &'n Node>,
{
    for node in nodes {
        visitor.visit(node);
    }
    V::Output::default()
}

/// Collects constant names in first-appearance order.
#[derive(Debug, Default)]
pub struct ConstantCollector {
    names: IndexSet<String>,
}

impl ConstantCollector {
    pub fn into_names(self) -> Vec<String> {
        self.names.into_iter().collect()
    }
}

impl IrVisitor for ConstantCollector {
    type Output = ();

    fn visit_constant(&mut self, node: &Constant) {
        self.names.insert(node.name.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::CmpOp;

    /// Counts every named leaf through the shared arm.
    #[derive(Default)]
    struct SymbolCounter {
        seen: Vec<String>,
    }

    impl IrVisitor for SymbolCounter {
        type Output = ();

        fn visit_symbol(&mut self, name: &str) {
            self.seen.push(name.to_string());
        }
    }

    #[test]
    fn test_symbols_share_one_arm() {
        let node = Node::function(
            "rp",
            vec![Node::bin_op(Node::iterator("i"), ArithOp::Add, Node::constant("N"))],
        );
        let mut counter = SymbolCounter::default();
        counter.visit(&node);
        assert_eq!(counter.seen, vec!["i", "N"]);
    }

    #[test]
    fn test_relation_walk_covers_mid() {
        let relation = Relation::bounded(
            Node::function("rp", vec![Node::iterator("i")]),
            CmpOp::LtE,
            Node::iterator("n"),
            CmpOp::Lt,
            Node::constant("M"),
        );
        let mut counter = SymbolCounter::default();
        counter.visit_relation(&relation);
        assert_eq!(counter.seen, vec!["i", "n", "M"]);
    }

    #[test]
    fn test_walk_node_ignores_leaves() {
        let mut collector = ConstantCollector::default();
        walk_node(&mut collector, &Node::constant("N"));
        walk_node(&mut collector, &Node::bin_op(Node::constant("M"), ArithOp::Sub, Node::literal("1")));
        assert_eq!(collector.into_names(), vec!["M"]);
    }
}
