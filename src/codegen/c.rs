//! Translation of body statements into C statement text.
//!
//! Each statement becomes one flat C statement without its terminating
//! semicolon. `**` is lowered to `pow`, `//` to `/`, and chained
//! comparisons to `&&`-joined pairs. Parentheses appear only where C
//! precedence requires them.

use crate::frontend::ast::{self, AstVisitor, BinOpKind, BoolOpKind, Expr, ExprKind, UnaryOpKind};
use crate::utils::errors::{CompileError, CompileResult};
use crate::utils::location::Span;

/// C binding strength, higher binds tighter.
mod prec {
    pub const OR: u8 = 1;
    pub const AND: u8 = 2;
    pub const BIT_OR: u8 = 3;
    pub const BIT_XOR: u8 = 4;
    pub const BIT_AND: u8 = 5;
    pub const EQUALITY: u8 = 6;
    pub const RELATIONAL: u8 = 7;
    pub const SHIFT: u8 = 8;
    pub const ADDITIVE: u8 = 9;
    pub const MULTIPLICATIVE: u8 = 10;
    pub const UNARY: u8 = 11;
    pub const POSTFIX: u8 = 12;
}

/// Renders host statements as C.
#[derive(Debug, Default)]
pub struct StatementTranslator;

impl StatementTranslator {
    pub fn new() -> Self {
        Self
    }

    /// Translate one statement, without a trailing `;`.
    pub fn translate_stmt(&mut self, stmt: &ast::Stmt) -> CompileResult<String> {
        self.visit_stmt(stmt)
    }

    /// Translate every statement; each one ends with `;`.
    pub fn translate_module(&mut self, module: &ast::Module) -> CompileResult<String> {
        let stmts = module
            .body
            .iter()
            .map(|stmt| self.translate_stmt(stmt))
            .collect::<CompileResult<Vec<_>>>()?;
        if stmts.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("{};", stmts.join(";\n")))
    }

    fn binary_precedence(op: BinOpKind) -> u8 {
        match op {
            BinOpKind::Add | BinOpKind::Sub => prec::ADDITIVE,
            BinOpKind::Mult | BinOpKind::Div | BinOpKind::FloorDiv | BinOpKind::Mod => prec::MULTIPLICATIVE,
            BinOpKind::MatMult => prec::MULTIPLICATIVE,
            BinOpKind::Pow => prec::POSTFIX,
            BinOpKind::LShift | BinOpKind::RShift => prec::SHIFT,
            BinOpKind::BitAnd => prec::BIT_AND,
            BinOpKind::BitXor => prec::BIT_XOR,
            BinOpKind::BitOr => prec::BIT_OR,
        }
    }

    fn comparison_precedence(op: ast::CmpOp) -> u8 {
        match op {
            ast::CmpOp::Eq | ast::CmpOp::NotEq => prec::EQUALITY,
            _ => prec::RELATIONAL,
        }
    }

    /// Precedence of the C text an expression renders to.
    fn precedence(expr: &Expr) -> u8 {
        match &expr.kind {
            ExprKind::BinOp(bin) => Self::binary_precedence(bin.op),
            ExprKind::UnaryOp(_) => prec::UNARY,
            ExprKind::Compare(cmp) if cmp.ops.len() == 1 => Self::comparison_precedence(cmp.ops[0]),
            ExprKind::Compare(_) => prec::AND,
            ExprKind::BoolOp(b) if b.op == BoolOpKind::And => prec::AND,
            ExprKind::BoolOp(_) => prec::OR,
            _ => prec::POSTFIX,
        }
    }

    /// Render `expr`, parenthesized when it binds looser than `min`.
    fn operand(&mut self, expr: &Expr, min: u8) -> CompileResult<String> {
        let text = self.visit_expr(expr)?;
        if Self::precedence(expr) < min {
            Ok(format!("({})", text))
        } else {
            Ok(text)
        }
    }

    fn operator(op: BinOpKind) -> CompileResult<&'static str> {
        match op {
            BinOpKind::FloorDiv => Ok("/"),
            BinOpKind::MatMult => Err(CompileError::unsupported("matrix multiplication operator '@'")),
            other => Ok(other.symbol()),
        }
    }

    fn target(&mut self, target: &Expr) -> CompileResult<String> {
        match &target.kind {
            ExprKind::Tuple(_) => Err(CompileError::unsupported(format!(
                "tuple assignment target at {}",
                target.span
            ))),
            _ => self.visit_expr(target),
        }
    }
}

impl AstVisitor for StatementTranslator {
    type Output = String;

    fn visit_assign(&mut self, node: &ast::Assign) -> CompileResult<String> {
        let target = match node.targets.as_slice() {
            [target] => self.target(target)?,
            targets => {
                return Err(CompileError::unsupported(format!(
                    "assignment to {} targets",
                    targets.len()
                )))
            }
        };
        Ok(format!("{} = {}", target, self.visit_expr(&node.value)?))
    }

    fn visit_aug_assign(&mut self, node: &ast::AugAssign) -> CompileResult<String> {
        let target = self.target(&node.target)?;
        let value = self.visit_expr(&node.value)?;
        match node.op {
            BinOpKind::Pow => Ok(format!("{} = pow({}, {})", target, target, value)),
            op => Ok(format!("{} {}= {}", target, Self::operator(op)?, value)),
        }
    }

    fn visit_name(&mut self, name: &str, _span: Span) -> CompileResult<String> {
        Ok(name.to_string())
    }

    fn visit_number(&mut self, text: &str, _span: Span) -> CompileResult<String> {
        Ok(text.to_string())
    }

    fn visit_bin_op(&mut self, node: &ast::BinOp, _span: Span) -> CompileResult<String> {
        if node.op == BinOpKind::Pow {
            let base = self.visit_expr(&node.left)?;
            let exponent = self.visit_expr(&node.right)?;
            return Ok(format!("pow({}, {})", base, exponent));
        }
        let symbol = Self::operator(node.op)?;
        let level = Self::binary_precedence(node.op);
        let left = self.operand(&node.left, level)?;
        let right = self.operand(&node.right, level + 1)?;
        Ok(format!("{} {} {}", left, symbol, right))
    }

    fn visit_unary_op(&mut self, node: &ast::UnaryOp, _span: Span) -> CompileResult<String> {
        let symbol = match node.op {
            UnaryOpKind::USub => "-",
            UnaryOpKind::UAdd => "+",
            UnaryOpKind::Invert => "~",
            UnaryOpKind::Not => "!",
        };
        let operand = self.operand(&node.operand, prec::UNARY)?;
        // `- -x` must not collapse into `--x`
        if operand.starts_with(symbol) && matches!(symbol, "-" | "+") {
            return Ok(format!("{}({})", symbol, operand));
        }
        Ok(format!("{}{}", symbol, operand))
    }

    fn visit_bool_op(&mut self, node: &ast::BoolOp, _span: Span) -> CompileResult<String> {
        let (symbol, level) = match node.op {
            BoolOpKind::And => ("&&", prec::AND),
            BoolOpKind::Or => ("||", prec::OR),
        };
        let values = node
            .values
            .iter()
            .map(|value| self.operand(value, level))
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(values.join(&format!(" {} ", symbol)))
    }

    fn visit_compare(&mut self, node: &ast::Compare, _span: Span) -> CompileResult<String> {
        let mut pairs = Vec::with_capacity(node.ops.len());
        let mut left = node.left.as_ref();
        for (op, right) in node.ops.iter().zip(&node.comparators) {
            let level = Self::comparison_precedence(*op);
            pairs.push(format!(
                "{} {} {}",
                self.operand(left, level)?,
                op.symbol(),
                self.operand(right, level + 1)?
            ));
            left = right;
        }
        Ok(pairs.join(" && "))
    }

    fn visit_call(&mut self, node: &ast::Call, _span: Span) -> CompileResult<String> {
        let args = node
            .args
            .iter()
            .map(|arg| self.visit_expr(arg))
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(format!("{}({})", node.func, args.join(", ")))
    }

    fn visit_subscript(&mut self, node: &ast::Subscript, _span: Span) -> CompileResult<String> {
        let base = self.operand(&node.value, prec::POSTFIX)?;
        let index = node
            .index
            .index_components()
            .into_iter()
            .map(|component| self.visit_expr(component))
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(format!("{}[{}]", base, index.join(", ")))
    }

    fn visit_tuple(&mut self, _elts: &[Expr], span: Span) -> CompileResult<String> {
        Err(CompileError::unsupported(format!("tuple expression at {}", span)))
    }

    fn visit_list(&mut self, _elts: &[Expr], span: Span) -> CompileResult<String> {
        Err(CompileError::unsupported(format!("list display at {}", span)))
    }

    fn visit_dict(&mut self, _node: &ast::Dict, span: Span) -> CompileResult<String> {
        Err(CompileError::unsupported(format!("dict display at {}", span)))
    }
}
