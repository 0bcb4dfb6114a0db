//! IR node types: iteration-domain expressions, relations, spaces, and the
//! field/access records collected from computation bodies.

use crate::frontend::ast::{BinOpKind, CmpOp};
use crate::utils::errors::{CompileError, CompileResult};
use indexmap::IndexMap;
use log::{trace, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of a relation, independent of its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// A fresh, process-wide unique id.
    pub fn fresh() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A loop index bound by a space header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iterator {
    pub name: String,
}

/// A symbolic runtime scalar (a bound such as `N`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
}

/// A numeric literal, kept as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Literal {
    pub value: String,
}

/// An uninterpreted function application such as `rp(i + 1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub args: Vec<Node>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), args: Vec::new() }
    }

    pub fn add(&mut self, arg: Node) {
        self.args.push(arg);
    }
}

/// Arithmetic operators allowed inside domain and index expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl ArithOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
            ArithOp::Pow => "**",
        }
    }

    /// Binding strength, higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            ArithOp::Add | ArithOp::Sub => 1,
            ArithOp::Mul | ArithOp::Div | ArithOp::Mod => 2,
            ArithOp::Pow => 3,
        }
    }

    /// Map a host operator; `/` and `//` both become `/`.
    pub fn from_host(op: BinOpKind) -> CompileResult<ArithOp> {
        match op {
            BinOpKind::Add => Ok(ArithOp::Add),
            BinOpKind::Sub => Ok(ArithOp::Sub),
            BinOpKind::Mult => Ok(ArithOp::Mul),
            BinOpKind::Div | BinOpKind::FloorDiv => Ok(ArithOp::Div),
            BinOpKind::Mod => Ok(ArithOp::Mod),
            BinOpKind::Pow => Ok(ArithOp::Pow),
            other => Err(CompileError::UnsupportedOperator(other.symbol().to_string())),
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinOp {
    pub left: Box<Node>,
    pub op: ArithOp,
    pub right: Box<Node>,
}

/// An expression inside a relation or a subscript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Iterator(Iterator),
    Constant(Constant),
    Literal(Literal),
    Function(Function),
    BinOp(BinOp),
}

impl Node {
    pub fn iterator(name: impl Into<String>) -> Self {
        Node::Iterator(Iterator { name: name.into() })
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Node::Constant(Constant { name: name.into() })
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Node::Literal(Literal { value: value.into() })
    }

    pub fn function(name: impl Into<String>, args: Vec<Node>) -> Self {
        Node::Function(Function { name: name.into(), args })
    }

    pub fn bin_op(left: Node, op: ArithOp, right: Node) -> Self {
        Node::BinOp(BinOp { left: Box::new(left), op, right: Box::new(right) })
    }
}

/// A single constraint `left left_op [mid right_op] right`.
///
/// `mid` and `right_op` are either both present (a two-sided bound such as
/// `0 <= i < N`) or both absent (`j == col(n)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: NodeId,
    pub left: Node,
    pub left_op: CmpOp,
    pub mid: Option<Node>,
    pub right_op: Option<CmpOp>,
    pub right: Node,
}

impl Relation {
    /// A one-sided relation with a fresh identity.
    pub fn new(left: Node, op: CmpOp, right: Node) -> Self {
        Self { id: NodeId::fresh(), left, left_op: op, mid: None, right_op: None, right }
    }

    /// A two-sided relation with a fresh identity.
    pub fn bounded(left: Node, left_op: CmpOp, mid: Node, right_op: CmpOp, right: Node) -> Self {
        Self {
            id: NodeId::fresh(),
            left,
            left_op,
            mid: Some(mid),
            right_op: Some(right_op),
            right,
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.mid.is_some()
    }
}

/// An iteration domain: named iterators in loop-nest order and the
/// relations that constrain them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub name: String,
    pub iterators: IndexMap<String, Iterator>,
    pub relations: Vec<Relation>,
}

impl Space {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Insert an iterator by name; a repeated name keeps its first position.
    pub fn add_iterator(&mut self, iterator: Iterator) {
        if self.iterators.contains_key(&iterator.name) {
            warn!("Iterator '{}' declared twice in space '{}'", iterator.name, self.name);
        }
        self.iterators.insert(iterator.name.clone(), iterator);
    }

    /// Add a relation unless one with the same identity is already present.
    ///
    /// A relation with a known identity is the same in-flight relation seen
    /// again, so the stored copy is brought up to date instead of appended.
    pub fn add_relation(&mut self, relation: Relation) {
        if let Some(slot) = self.relations.iter_mut().rev().find(|r| r.id == relation.id) {
            trace!("Updating relation {} in space '{}'", relation.id, self.name);
            *slot = relation;
            return;
        }
        trace!("Adding relation {} to space '{}'", relation.id, self.name);
        self.relations.push(relation);
    }

    pub fn iterator(&self, name: &str) -> Option<&Iterator> {
        self.iterators.get(name)
    }

    pub fn has_iterator(&self, name: &str) -> bool {
        self.iterators.contains_key(name)
    }

    pub fn iterator_names(&self) -> Vec<&str> {
        self.iterators.keys().map(String::as_str).collect()
    }

    /// Constants referenced by the relations, in first-appearance order.
    pub fn constants(&self) -> Vec<String> {
        let mut collector = crate::ir::visit::ConstantCollector::default();
        crate::ir::visit::IrVisitor::visit_space(&mut collector, self);
        collector.into_names()
    }
}

/// One recorded use of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Access {
    /// One node per subscript component; empty for a bare scalar use
    pub index: Vec<Node>,
    pub is_write: bool,
}

impl Access {
    pub fn new(index: Vec<Node>, is_write: bool) -> Self {
        Self { index, is_write }
    }
}

/// An array (or scalar) referenced by a computation body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub accesses: Vec<Access>,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), accesses: Vec::new() }
    }

    pub fn add_access(&mut self, access: Access) {
        self.accesses.push(access);
    }

    /// True iff every recorded access is a read.
    pub fn is_read_only(&self) -> bool {
        self.accesses.iter().all(|a| !a.is_write)
    }

    /// True when the field is never subscripted.
    pub fn is_scalar(&self) -> bool {
        !self.accesses.is_empty() && self.accesses.iter().all(|a| a.index.is_empty())
    }
}
