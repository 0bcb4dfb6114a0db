//! Syntax tree for domain descriptions.
//!
//! The tree mirrors the shape of the host expression language: a module of
//! assignment-shaped statements whose expressions keep n-ary comparison
//! chains intact (`0 <= i < N` is one `Compare` node with two operators).
//! Parentheses are not recorded; printers re-insert them by precedence.

use crate::utils::errors::CompileResult;
use crate::utils::location::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A parsed source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl Module {
    pub fn new(body: Vec<Stmt>, span: Span) -> Self {
        Self { body, span }
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// `t0 = t1 = value`
    Assign(Assign),
    /// `target op= value`
    AugAssign(AugAssign),
    /// A bare expression
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assign {
    pub targets: Vec<Expr>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugAssign {
    pub target: Expr,
    pub op: BinOpKind,
    pub value: Expr,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The single assigned name and value, for `name = value` statements.
    pub fn as_named_assign(&self) -> Option<(&str, &Expr)> {
        match &self.kind {
            StmtKind::Assign(assign) if assign.targets.len() == 1 => {
                assign.targets[0].as_name().map(|name| (name, &assign.value))
            }
            _ => None,
        }
    }
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// An identifier
    Name(String),
    /// A numeric literal, as written
    Number(String),
    BinOp(BinOp),
    UnaryOp(UnaryOp),
    /// `a and b and c`
    BoolOp(BoolOp),
    /// `a < b <= c ...`
    Compare(Compare),
    Call(Call),
    Subscript(Subscript),
    /// `a, b` (subscript components, parenthesized tuples)
    Tuple(Vec<Expr>),
    /// `[a, b]`
    List(Vec<Expr>),
    /// `{k: v, ...}`
    Dict(Dict),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinOp {
    pub left: Box<Expr>,
    pub op: BinOpKind,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryOp {
    pub op: UnaryOpKind,
    pub operand: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolOp {
    pub op: BoolOpKind,
    pub values: Vec<Expr>,
}

/// An n-ary comparison chain: `ops.len() == comparators.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compare {
    pub left: Box<Expr>,
    pub ops: Vec<CmpOp>,
    pub comparators: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub func: String,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscript {
    pub value: Box<Expr>,
    pub index: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dict {
    pub keys: Vec<Expr>,
    pub values: Vec<Expr>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn name(name: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::Name(name.into()), span)
    }

    pub fn number(text: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::Number(text.into()), span)
    }

    pub fn binary(left: Expr, op: BinOpKind, right: Expr) -> Self {
        let span = left.span.merge(&right.span);
        Self::new(
            ExprKind::BinOp(BinOp { left: Box::new(left), op, right: Box::new(right) }),
            span,
        )
    }

    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name(name) => Some(name),
            _ => None,
        }
    }

    /// True for `left ^ right`, the conjunction of a domain header.
    pub fn is_conjunction(&self) -> bool {
        matches!(&self.kind, ExprKind::BinOp(b) if b.op == BinOpKind::BitXor)
    }

    /// Subscript components: a tuple index yields its elements.
    pub fn index_components(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Tuple(elts) => elts.iter().collect(),
            _ => vec![self],
        }
    }

    /// Short description used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match &self.kind {
            ExprKind::Name(_) => "name",
            ExprKind::Number(_) => "number",
            ExprKind::BinOp(_) => "binary operation",
            ExprKind::UnaryOp(_) => "unary operation",
            ExprKind::BoolOp(_) => "boolean operation",
            ExprKind::Compare(_) => "comparison",
            ExprKind::Call(_) => "call",
            ExprKind::Subscript(_) => "subscript",
            ExprKind::Tuple(_) => "tuple",
            ExprKind::List(_) => "list",
            ExprKind::Dict(_) => "dict display",
        }
    }
}

/// Binary operators of the host language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOpKind {
    Add,
    Sub,
    Mult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    MatMult,
    BitXor,
    BitAnd,
    BitOr,
    LShift,
    RShift,
}

impl BinOpKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mult => "*",
            BinOpKind::Div => "/",
            BinOpKind::FloorDiv => "//",
            BinOpKind::Mod => "%",
            BinOpKind::Pow => "**",
            BinOpKind::MatMult => "@",
            BinOpKind::BitXor => "^",
            BinOpKind::BitAnd => "&",
            BinOpKind::BitOr => "|",
            BinOpKind::LShift => "<<",
            BinOpKind::RShift => ">>",
        }
    }

    /// Operator of an augmented assignment lexeme such as `+=`.
    pub fn from_augmented(lexeme: &str) -> Option<BinOpKind> {
        let op = lexeme.strip_suffix('=')?;
        Some(match op {
            "+" => BinOpKind::Add,
            "-" => BinOpKind::Sub,
            "*" => BinOpKind::Mult,
            "/" => BinOpKind::Div,
            "//" => BinOpKind::FloorDiv,
            "%" => BinOpKind::Mod,
            "**" => BinOpKind::Pow,
            "@" => BinOpKind::MatMult,
            "^" => BinOpKind::BitXor,
            "&" => BinOpKind::BitAnd,
            "|" => BinOpKind::BitOr,
            "<<" => BinOpKind::LShift,
            ">>" => BinOpKind::RShift,
            _ => return None,
        })
    }
}

impl fmt::Display for BinOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOpKind {
    /// `-x`
    USub,
    /// `+x`
    UAdd,
    /// `not x`
    Not,
    /// `~x`
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoolOpKind {
    And,
    Or,
}

/// Visitor over the syntax tree.
///
/// Every `visit_*` method defaults to the matching `walk_*` function, which
/// recurses into the node's children and yields `Output::default()`.
/// Implementors override only the node kinds they give meaning to; every
/// other kind resolves to the generic walk, so dispatch is always total.
pub trait AstVisitor: Sized {
    type Output: Default;

    fn visit_module(&mut self, module: &Module) -> CompileResult<Self::Output> {
        walk_module(self, module)
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> CompileResult<Self::Output> {
        match &stmt.kind {
            StmtKind::Assign(node) => self.visit_assign(node),
            StmtKind::AugAssign(node) => self.visit_aug_assign(node),
            StmtKind::Expr(expr) => self.visit_expr(expr),
        }
    }

    fn visit_assign(&mut self, node: &Assign) -> CompileResult<Self::Output> {
        walk_assign(self, node)
    }

    fn visit_aug_assign(&mut self, node: &AugAssign) -> CompileResult<Self::Output> {
        self.visit_expr(&node.target)?;
        self.visit_expr(&node.value)?;
        Ok(Self::Output::default())
    }

    fn visit_expr(&mut self, expr: &Expr) -> CompileResult<Self::Output> {
        match &expr.kind {
            ExprKind::Name(name) => self.visit_name(name, expr.span),
            ExprKind::Number(text) => self.visit_number(text, expr.span),
            ExprKind::BinOp(node) => self.visit_bin_op(node, expr.span),
            ExprKind::UnaryOp(node) => self.visit_unary_op(node, expr.span),
            ExprKind::BoolOp(node) => self.visit_bool_op(node, expr.span),
            ExprKind::Compare(node) => self.visit_compare(node, expr.span),
            ExprKind::Call(node) => self.visit_call(node, expr.span),
            ExprKind::Subscript(node) => self.visit_subscript(node, expr.span),
            ExprKind::Tuple(elts) => self.visit_tuple(elts, expr.span),
            ExprKind::List(elts) => self.visit_list(elts, expr.span),
            ExprKind::Dict(node) => self.visit_dict(node, expr.span),
        }
    }

    fn visit_name(&mut self, _name: &str, _span: Span) -> CompileResult<Self::Output> {
        Ok(Self::Output::default())
    }

    fn visit_number(&mut self, _text: &str, _span: Span) -> CompileResult<Self::Output> {
        Ok(Self::Output::default())
    }

    fn visit_bin_op(&mut self, node: &BinOp, _span: Span) -> CompileResult<Self::Output> {
        walk_all(self, [node.left.as_ref(), node.right.as_ref()])
    }

    fn visit_unary_op(&mut self, node: &UnaryOp, _span: Span) -> CompileResult<Self::Output> {
        walk_all(self, [node.operand.as_ref()])
    }

    fn visit_bool_op(&mut self, node: &BoolOp, _span: Span) -> CompileResult<Self::Output> {
        walk_all(self, &node.values)
    }

    fn visit_compare(&mut self, node: &Compare, _span: Span) -> CompileResult<Self::Output> {
        self.visit_expr(&node.left)?;
        walk_all(self, &node.comparators)
    }

    fn visit_call(&mut self, node: &Call, _span: Span) -> CompileResult<Self::Output> {
        walk_all(self, &node.args)
    }

    fn visit_subscript(&mut self, node: &Subscript, _span: Span) -> CompileResult<Self::Output> {
        walk_all(self, [node.value.as_ref(), node.index.as_ref()])
    }

    fn visit_tuple(&mut self, elts: &[Expr], _span: Span) -> CompileResult<Self::Output> {
        walk_all(self, elts)
    }

    fn visit_list(&mut self, elts: &[Expr], _span: Span) -> CompileResult<Self::Output> {
        walk_all(self, elts)
    }

    fn visit_dict(&mut self, node: &Dict, _span: Span) -> CompileResult<Self::Output> {
        walk_all(self, &node.keys)?;
        walk_all(self, &node.values)
    }
}

/// Visit every statement of a module.
pub fn walk_module<V: AstVisitor>(visitor: &mut V, module: &Module) -> CompileResult<V::Output> {
    for stmt in &module.body {
        visitor.visit_stmt(stmt)?;
    }
    Ok(V::Output::default())
}

/// Visit the targets, then the value, of an assignment.
pub fn walk_assign<V: AstVisitor>(visitor: &mut V, node: &Assign) -> CompileResult<V::Output> {
    walk_all(visitor, &node.targets)?;
    visitor.visit_expr(&node.value)?;
    Ok(V::Output::default())
}

/// Visit a sequence of expressions, discarding their results.
pub fn walk_all<'e, V, I>(visitor: &mut V, exprs: I) -> CompileResult<V::Output>
where
    V: AstVisitor,
    I: IntoIterator<Item = &'e Expr>,
{
    for expr in exprs {
        visitor.visit_expr(expr)?;
    }
    Ok(V::Output::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts names through the default traversal only.
    #[derive(Default)]
    struct NameCounter {
        names: Vec<String>,
    }

    impl AstVisitor for NameCounter {
        type Output = ();

        fn visit_name(&mut self, name: &str, _span: Span) -> CompileResult<()> {
            self.names.push(name.to_string());
            Ok(())
        }
    }

    fn n(name: &str) -> Expr {
        Expr::name(name, Span::dummy())
    }

    #[test]
    fn test_default_walk_reaches_nested_names() {
        let index = Expr::binary(n("i"), BinOpKind::Add, Expr::number("1", Span::dummy()));
        let subscript = Expr::new(
            ExprKind::Subscript(Subscript { value: Box::new(n("A")), index: Box::new(index) }),
            Span::dummy(),
        );
        let call = Expr::new(
            ExprKind::Call(Call { func: "f".to_string(), args: vec![subscript] }),
            Span::dummy(),
        );
        let mut counter = NameCounter::default();
        counter.visit_expr(&call).unwrap();
        assert_eq!(counter.names, vec!["A", "i"]);
    }

    #[test]
    fn test_conjunction_and_components() {
        let conj = Expr::binary(n("N"), BinOpKind::BitXor, n("j"));
        assert!(conj.is_conjunction());
        assert!(!Expr::binary(n("N"), BinOpKind::Sub, n("j")).is_conjunction());

        let tuple = Expr::new(ExprKind::Tuple(vec![n("i"), n("j")]), Span::dummy());
        assert_eq!(tuple.index_components().len(), 2);
        assert_eq!(n("i").index_components().len(), 1);
    }

    #[test]
    fn test_augmented_operator_lookup() {
        assert_eq!(BinOpKind::from_augmented("+="), Some(BinOpKind::Add));
        assert_eq!(BinOpKind::from_augmented("//="), Some(BinOpKind::FloorDiv));
        assert_eq!(BinOpKind::from_augmented("@="), Some(BinOpKind::MatMult));
        assert_eq!(BinOpKind::from_augmented("+"), None);
    }
}
