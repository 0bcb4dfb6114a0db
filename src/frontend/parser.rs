//! Parser for domain descriptions.
//!
//! A recursive descent parser over the token stream. Precedence follows the
//! host expression language: `^` binds tighter than comparisons, so a whole
//! header constraint such as `0 <= i < N ^ 0 <= j < M` parses to a single
//! comparison chain whose middle comparator is the conjunction `N ^ 0`.
//!
//! The parser stops at the first error; there is no recovery.

use crate::frontend::ast::*;
use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::utils::errors::{CompileResult, ParseError, ParseErrorKind};
use crate::utils::location::Span;

/// A parser for domain descriptions.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
}

impl<'a> Parser<'a> {
    /// Create a new parser from a lexer.
    pub fn new(mut lexer: Lexer<'a>) -> CompileResult<Self> {
        let first_token = lexer.next_token()?;
        Ok(Self {
            lexer,
            current: first_token.clone(),
            previous: first_token,
        })
    }

    /// Parse a complete module.
    pub fn parse_module(&mut self) -> CompileResult<Module> {
        let start = self.current.span;
        let mut body = Vec::new();

        loop {
            self.skip_terminators()?;
            if self.is_at_end() {
                break;
            }
            body.push(self.parse_statement()?);
            if !self.current.kind.is_terminator() {
                return Err(self.error_expected(&["newline", ";"]));
            }
        }

        Ok(Module::new(body, start.merge(&self.previous.span)))
    }

    fn skip_terminators(&mut self) -> CompileResult<()> {
        while matches!(self.current.kind, TokenKind::Newline | TokenKind::Semicolon) {
            self.advance()?;
        }
        Ok(())
    }

    fn parse_statement(&mut self) -> CompileResult<Stmt> {
        let start = self.current.span;
        let first = self.parse_expr_list()?;

        if self.check(TokenKind::AugAssign) {
            let op = BinOpKind::from_augmented(&self.current.lexeme).ok_or_else(|| {
                self.error(
                    &format!("Unknown augmented operator '{}'", self.current.lexeme),
                    ParseErrorKind::UnexpectedToken,
                )
            })?;
            self.validate_target(&first)?;
            self.advance()?;
            let value = self.parse_expression()?;
            let span = start.merge(&self.previous.span);
            return Ok(Stmt::new(
                StmtKind::AugAssign(AugAssign { target: first, op, value }),
                span,
            ));
        }

        if !self.check(TokenKind::Equal) {
            let span = start.merge(&self.previous.span);
            return Ok(Stmt::new(StmtKind::Expr(first), span));
        }

        // `a = b = value`: every expression but the last is a target
        let mut exprs = vec![first];
        while self.match_token(TokenKind::Equal)? {
            exprs.push(self.parse_expr_list()?);
        }
        let value = exprs.pop().ok_or_else(|| {
            self.error("Expected assignment value", ParseErrorKind::ExpectedExpression)
        })?;
        for target in &exprs {
            self.validate_target(target)?;
        }

        let span = start.merge(&self.previous.span);
        Ok(Stmt::new(StmtKind::Assign(Assign { targets: exprs, value }), span))
    }

    /// Only names, subscripts and tuples of them can be assigned to.
    fn validate_target(&self, target: &Expr) -> CompileResult<()> {
        match &target.kind {
            ExprKind::Name(_) | ExprKind::Subscript(_) => Ok(()),
            ExprKind::Tuple(elts) => elts.iter().try_for_each(|e| self.validate_target(e)),
            _ => Err(ParseError {
                message: format!("Cannot assign to {}", target.describe()),
                span: target.span,
                kind: ParseErrorKind::InvalidTarget,
                expected: Vec::new(),
                found: None,
            }
            .into()),
        }
    }

    /// `expr (',' expr)* [',']`; more than one element yields a tuple.
    fn parse_expr_list(&mut self) -> CompileResult<Expr> {
        let start = self.current.span;
        let first = self.parse_expression()?;
        if !self.check(TokenKind::Comma) {
            return Ok(first);
        }

        let mut elts = vec![first];
        while self.match_token(TokenKind::Comma)? {
            if self.at_list_end() {
                break;
            }
            elts.push(self.parse_expression()?);
        }
        Ok(Expr::new(ExprKind::Tuple(elts), start.merge(&self.previous.span)))
    }

    fn at_list_end(&self) -> bool {
        self.current.kind.is_terminator()
            || matches!(
                self.current.kind,
                TokenKind::RightParen
                    | TokenKind::RightBracket
                    | TokenKind::RightBrace
                    | TokenKind::Equal
                    | TokenKind::AugAssign
            )
    }

    // Expression parsing with precedence climbing
    fn parse_expression(&mut self) -> CompileResult<Expr> {
        self.parse_or_test()
    }

    fn parse_or_test(&mut self) -> CompileResult<Expr> {
        let left = self.parse_and_test()?;
        if !self.check(TokenKind::Or) && !self.check(TokenKind::PipePipe) {
            return Ok(left);
        }
        let mut values = vec![left];
        while self.match_token(TokenKind::Or)? || self.match_token(TokenKind::PipePipe)? {
            values.push(self.parse_and_test()?);
        }
        Ok(Self::bool_op(BoolOpKind::Or, values))
    }

    fn parse_and_test(&mut self) -> CompileResult<Expr> {
        let left = self.parse_not_test()?;
        if !self.check(TokenKind::And) && !self.check(TokenKind::AmpAmp) {
            return Ok(left);
        }
        let mut values = vec![left];
        while self.match_token(TokenKind::And)? || self.match_token(TokenKind::AmpAmp)? {
            values.push(self.parse_not_test()?);
        }
        Ok(Self::bool_op(BoolOpKind::And, values))
    }

    fn bool_op(op: BoolOpKind, values: Vec<Expr>) -> Expr {
        let span = match (values.first(), values.last()) {
            (Some(first), Some(last)) => first.span.merge(&last.span),
            _ => Span::dummy(),
        };
        Expr::new(ExprKind::BoolOp(BoolOp { op, values }), span)
    }

    fn parse_not_test(&mut self) -> CompileResult<Expr> {
        let start = self.current.span;
        if self.match_token(TokenKind::Not)? || self.match_token(TokenKind::Bang)? {
            let operand = self.parse_not_test()?;
            let span = start.merge(&operand.span);
            return Ok(Expr::new(
                ExprKind::UnaryOp(UnaryOp { op: UnaryOpKind::Not, operand: Box::new(operand) }),
                span,
            ));
        }
        self.parse_comparison()
    }

    /// An n-ary comparison chain, kept as one node.
    fn parse_comparison(&mut self) -> CompileResult<Expr> {
        let left = self.parse_bitor()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();

        while let Some(op) = Self::comparison_op(self.current.kind) {
            self.advance()?;
            ops.push(op);
            comparators.push(self.parse_bitor()?);
        }

        if ops.is_empty() {
            return Ok(left);
        }
        let span = left.span.merge(&self.previous.span);
        Ok(Expr::new(
            ExprKind::Compare(Compare { left: Box::new(left), ops, comparators }),
            span,
        ))
    }

    fn comparison_op(kind: TokenKind) -> Option<CmpOp> {
        match kind {
            TokenKind::EqualEqual => Some(CmpOp::Eq),
            TokenKind::BangEqual => Some(CmpOp::NotEq),
            TokenKind::Less => Some(CmpOp::Lt),
            TokenKind::LessEqual => Some(CmpOp::LtE),
            TokenKind::Greater => Some(CmpOp::Gt),
            TokenKind::GreaterEqual => Some(CmpOp::GtE),
            _ => None,
        }
    }

    /// Left-associative binary level: `next (op next)*`.
    fn parse_binary_level(
        &mut self,
        next: fn(&mut Self) -> CompileResult<Expr>,
        operator: fn(TokenKind) -> Option<BinOpKind>,
    ) -> CompileResult<Expr> {
        let mut left = next(self)?;
        while let Some(op) = operator(self.current.kind) {
            self.advance()?;
            let right = next(self)?;
            left = Expr::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_bitor(&mut self) -> CompileResult<Expr> {
        self.parse_binary_level(Self::parse_bitxor, |kind| match kind {
            TokenKind::Pipe => Some(BinOpKind::BitOr),
            _ => None,
        })
    }

    fn parse_bitxor(&mut self) -> CompileResult<Expr> {
        self.parse_binary_level(Self::parse_bitand, |kind| match kind {
            TokenKind::Caret => Some(BinOpKind::BitXor),
            _ => None,
        })
    }

    fn parse_bitand(&mut self) -> CompileResult<Expr> {
        self.parse_binary_level(Self::parse_shift, |kind| match kind {
            TokenKind::Amp => Some(BinOpKind::BitAnd),
            _ => None,
        })
    }

    fn parse_shift(&mut self) -> CompileResult<Expr> {
        self.parse_binary_level(Self::parse_arith, |kind| match kind {
            TokenKind::LessLess => Some(BinOpKind::LShift),
            TokenKind::GreaterGreater => Some(BinOpKind::RShift),
            _ => None,
        })
    }

    fn parse_arith(&mut self) -> CompileResult<Expr> {
        self.parse_binary_level(Self::parse_term, |kind| match kind {
            TokenKind::Plus => Some(BinOpKind::Add),
            TokenKind::Minus => Some(BinOpKind::Sub),
            _ => None,
        })
    }

    fn parse_term(&mut self) -> CompileResult<Expr> {
        self.parse_binary_level(Self::parse_factor, |kind| match kind {
            TokenKind::Star => Some(BinOpKind::Mult),
            TokenKind::Slash => Some(BinOpKind::Div),
            TokenKind::SlashSlash => Some(BinOpKind::FloorDiv),
            TokenKind::Percent => Some(BinOpKind::Mod),
            TokenKind::At => Some(BinOpKind::MatMult),
            _ => None,
        })
    }

    fn parse_factor(&mut self) -> CompileResult<Expr> {
        let start = self.current.span;
        let op = match self.current.kind {
            TokenKind::Minus => UnaryOpKind::USub,
            TokenKind::Plus => UnaryOpKind::UAdd,
            TokenKind::Tilde => UnaryOpKind::Invert,
            _ => return self.parse_power(),
        };
        self.advance()?;
        let operand = self.parse_factor()?;
        let span = start.merge(&operand.span);
        Ok(Expr::new(ExprKind::UnaryOp(UnaryOp { op, operand: Box::new(operand) }), span))
    }

    /// `primary ('**' factor)?`, right-associative through `factor`.
    fn parse_power(&mut self) -> CompileResult<Expr> {
        let base = self.parse_primary()?;
        if self.match_token(TokenKind::StarStar)? {
            let exponent = self.parse_factor()?;
            return Ok(Expr::binary(base, BinOpKind::Pow, exponent));
        }
        Ok(base)
    }

    /// An atom followed by any number of calls and subscripts.
    fn parse_primary(&mut self) -> CompileResult<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.check(TokenKind::LeftParen) {
                let func = match &expr.kind {
                    ExprKind::Name(name) => name.clone(),
                    _ => {
                        return Err(self.error(
                            &format!("Cannot call a {}", expr.describe()),
                            ParseErrorKind::UnexpectedToken,
                        ))
                    }
                };
                self.advance()?;
                let args = self.parse_args()?;
                self.consume(TokenKind::RightParen, "Expected ')' after arguments")?;
                let span = expr.span.merge(&self.previous.span);
                expr = Expr::new(ExprKind::Call(Call { func, args }), span);
            } else if self.match_token(TokenKind::LeftBracket)? {
                let index = self.parse_expr_list()?;
                self.consume(TokenKind::RightBracket, "Expected ']' after subscript")?;
                let span = expr.span.merge(&self.previous.span);
                expr = Expr::new(
                    ExprKind::Subscript(Subscript { value: Box::new(expr), index: Box::new(index) }),
                    span,
                );
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_atom(&mut self) -> CompileResult<Expr> {
        let start = self.current.span;

        match self.current.kind {
            TokenKind::Identifier => {
                let name = self.current.lexeme.clone();
                self.advance()?;
                Ok(Expr::name(name, start))
            }
            TokenKind::Integer | TokenKind::Float => {
                let text = self.current.lexeme.clone();
                self.advance()?;
                Ok(Expr::number(text, start))
            }
            TokenKind::LeftParen => {
                self.advance()?;
                if self.match_token(TokenKind::RightParen)? {
                    return Ok(Expr::new(ExprKind::Tuple(Vec::new()), start.merge(&self.previous.span)));
                }
                let inner = self.parse_expr_list()?;
                self.consume(TokenKind::RightParen, "Expected ')'")?;
                Ok(inner)
            }
            TokenKind::LeftBracket => {
                self.advance()?;
                let elts = self.parse_sequence(TokenKind::RightBracket)?;
                self.consume(TokenKind::RightBracket, "Expected ']'")?;
                Ok(Expr::new(ExprKind::List(elts), start.merge(&self.previous.span)))
            }
            TokenKind::LeftBrace => {
                self.advance()?;
                let dict = self.parse_dict()?;
                self.consume(TokenKind::RightBrace, "Expected '}'")?;
                Ok(Expr::new(ExprKind::Dict(dict), start.merge(&self.previous.span)))
            }
            _ => Err(self.error("Expected expression", ParseErrorKind::ExpectedExpression)),
        }
    }

    fn parse_dict(&mut self) -> CompileResult<Dict> {
        let mut dict = Dict { keys: Vec::new(), values: Vec::new() };
        while !self.check(TokenKind::RightBrace) {
            dict.keys.push(self.parse_expression()?);
            self.consume(TokenKind::Colon, "Expected ':' in dict display")?;
            dict.values.push(self.parse_expression()?);
            if !self.match_token(TokenKind::Comma)? {
                break;
            }
        }
        Ok(dict)
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed.
    fn parse_sequence(&mut self, close: TokenKind) -> CompileResult<Vec<Expr>> {
        let mut elts = Vec::new();
        while !self.check(close) {
            elts.push(self.parse_expression()?);
            if !self.match_token(TokenKind::Comma)? {
                break;
            }
        }
        Ok(elts)
    }

    fn parse_args(&mut self) -> CompileResult<Vec<Expr>> {
        self.parse_sequence(TokenKind::RightParen)
    }

    // Helper methods
    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn is_at_end(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    fn advance(&mut self) -> CompileResult<&Token> {
        let next = self.lexer.next_token()?;
        self.previous = std::mem::replace(&mut self.current, next);
        Ok(&self.previous)
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> CompileResult<&Token> {
        if self.check(kind) {
            self.advance()
        } else {
            Err(ParseError {
                message: message.to_string(),
                span: self.current.span,
                kind: ParseErrorKind::ExpectedToken,
                expected: vec![kind.name().to_string()],
                found: Some(self.current.kind.name().to_string()),
            }
            .into())
        }
    }

    fn match_token(&mut self, kind: TokenKind) -> CompileResult<bool> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn error(&self, message: &str, kind: ParseErrorKind) -> crate::utils::errors::CompileError {
        ParseError {
            message: message.to_string(),
            span: self.current.span,
            kind,
            expected: Vec::new(),
            found: Some(self.current.kind.name().to_string()),
        }
        .into()
    }

    fn error_expected(&self, expected: &[&str]) -> crate::utils::errors::CompileError {
        ParseError {
            message: "Unexpected token".to_string(),
            span: self.current.span,
            kind: ParseErrorKind::UnexpectedToken,
            expected: expected.iter().map(|s| s.to_string()).collect(),
            found: Some(self.current.kind.name().to_string()),
        }
        .into()
    }
}
