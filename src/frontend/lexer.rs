//! Lexer for domain descriptions.
//!
//! Newlines terminate statements except inside `()`, `[]` and `{}`, where
//! they are skipped (implicit line joining). `#` starts a comment.

use crate::frontend::token::{Token, TokenKind};
use crate::utils::errors::{LexerError, LexerErrorKind};
use crate::utils::location::{SourceLocation, Span};
use std::iter::Peekable;
use std::str::Chars;
use unicode_xid::UnicodeXID;

/// A lexer for tokenizing source text.
pub struct Lexer<'a> {
    /// The source text
    source: &'a str,
    /// Character iterator
    chars: Peekable<Chars<'a>>,
    /// Current byte offset
    offset: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
    /// Start of current token
    token_start: SourceLocation,
    /// Open bracket nesting
    depth: usize,
    /// Whether we've hit EOF
    at_eof: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().peekable(),
            offset: 0,
            line: 1,
            column: 1,
            token_start: SourceLocation::start(),
            depth: 0,
            at_eof: false,
        }
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column, self.offset)
    }

    fn mark_token_start(&mut self) {
        self.token_start = self.current_location();
    }

    fn make_span(&self) -> Span {
        Span::from_locations(self.token_start, self.current_location())
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Peek one character past the current one.
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.offset..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skip blanks and comments. Newlines are only skipped inside brackets.
    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('\n') if self.depth > 0 => {
                    self.advance();
                }
                Some('\\') if self.peek_next() == Some('\n') => {
                    // Explicit line continuation
                    self.advance();
                    self.advance();
                }
                Some('#') => {
                    while self.peek().is_some() && self.peek() != Some('\n') {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        let span = self.make_span();
        let lexeme = self.source[span.start_offset..span.end_offset].to_string();
        Token::new(kind, span, lexeme)
    }

    fn make_error(&self, message: &str, kind: LexerErrorKind) -> LexerError {
        LexerError {
            message: message.to_string(),
            span: self.make_span(),
            kind,
        }
    }

    fn is_digit(c: Option<char>) -> bool {
        c.map(|c| c.is_ascii_digit()).unwrap_or(false)
    }

    /// Scan a number literal. The first character has been consumed.
    fn scan_number(&mut self, first: char) -> Result<Token, LexerError> {
        let mut is_float = first == '.';
        while Self::is_digit(self.peek()) {
            self.advance();
        }

        if !is_float && self.peek() == Some('.') && Self::is_digit(self.peek_next()) {
            is_float = true;
            self.advance();
            while Self::is_digit(self.peek()) {
                self.advance();
            }
        }

        if self.peek() == Some('e') || self.peek() == Some('E') {
            is_float = true;
            self.advance();
            if self.peek() == Some('+') || self.peek() == Some('-') {
                self.advance();
            }
            if !Self::is_digit(self.peek()) {
                return Err(self.make_error(
                    "Invalid floating-point exponent",
                    LexerErrorKind::InvalidNumber,
                ));
            }
            while Self::is_digit(self.peek()) {
                self.advance();
            }
        }

        if self.peek().map(|c| c.is_xid_start() || c == '_').unwrap_or(false) {
            self.advance();
            return Err(self.make_error(
                "Identifier cannot start with a digit",
                LexerErrorKind::InvalidNumber,
            ));
        }

        if is_float {
            Ok(self.make_token(TokenKind::Float))
        } else {
            Ok(self.make_token(TokenKind::Integer))
        }
    }

    /// Scan an identifier or keyword.
    fn scan_identifier(&mut self) -> Token {
        while self.peek().map(|c| c.is_xid_continue() || c == '_').unwrap_or(false) {
            self.advance();
        }
        let span = self.make_span();
        let lexeme = &self.source[span.start_offset..span.end_offset];
        let kind = TokenKind::keyword(lexeme).unwrap_or(TokenKind::Identifier);
        Token::new(kind, span, lexeme.to_string())
    }

    /// Operator followed by an optional `=`, which turns it into an
    /// augmented assignment.
    fn operator_or_aug(&mut self, kind: TokenKind) -> Token {
        if self.match_char('=') {
            self.make_token(TokenKind::AugAssign)
        } else {
            self.make_token(kind)
        }
    }

    fn open(&mut self, kind: TokenKind) -> Result<Token, LexerError> {
        self.depth += 1;
        Ok(self.make_token(kind))
    }

    fn close(&mut self, kind: TokenKind) -> Result<Token, LexerError> {
        if self.depth == 0 {
            return Err(self.make_error(
                &format!("Unmatched '{}'", kind.name()),
                LexerErrorKind::UnbalancedBracket,
            ));
        }
        self.depth -= 1;
        Ok(self.make_token(kind))
    }

    /// Scan the next token.
    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_whitespace();
        self.mark_token_start();

        let c = match self.advance() {
            Some(c) => c,
            None => {
                self.at_eof = true;
                return Ok(self.make_token(TokenKind::Eof));
            }
        };

        match c {
            '\n' => Ok(self.make_token(TokenKind::Newline)),

            '(' => self.open(TokenKind::LeftParen),
            '[' => self.open(TokenKind::LeftBracket),
            '{' => self.open(TokenKind::LeftBrace),
            ')' => self.close(TokenKind::RightParen),
            ']' => self.close(TokenKind::RightBracket),
            '}' => self.close(TokenKind::RightBrace),
            ',' => Ok(self.make_token(TokenKind::Comma)),
            ':' => Ok(self.make_token(TokenKind::Colon)),
            ';' => Ok(self.make_token(TokenKind::Semicolon)),
            '~' => Ok(self.make_token(TokenKind::Tilde)),

            '+' => Ok(self.operator_or_aug(TokenKind::Plus)),
            '-' => Ok(self.operator_or_aug(TokenKind::Minus)),
            '%' => Ok(self.operator_or_aug(TokenKind::Percent)),
            '@' => Ok(self.operator_or_aug(TokenKind::At)),
            '^' => Ok(self.operator_or_aug(TokenKind::Caret)),
            '*' => {
                if self.match_char('*') {
                    Ok(self.operator_or_aug(TokenKind::StarStar))
                } else {
                    Ok(self.operator_or_aug(TokenKind::Star))
                }
            }
            '/' => {
                if self.match_char('/') {
                    Ok(self.operator_or_aug(TokenKind::SlashSlash))
                } else {
                    Ok(self.operator_or_aug(TokenKind::Slash))
                }
            }
            '&' => {
                if self.match_char('&') {
                    Ok(self.make_token(TokenKind::AmpAmp))
                } else {
                    Ok(self.operator_or_aug(TokenKind::Amp))
                }
            }
            '|' => {
                if self.match_char('|') {
                    Ok(self.make_token(TokenKind::PipePipe))
                } else {
                    Ok(self.operator_or_aug(TokenKind::Pipe))
                }
            }
            '=' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::EqualEqual))
                } else {
                    Ok(self.make_token(TokenKind::Equal))
                }
            }
            '!' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::BangEqual))
                } else {
                    Ok(self.make_token(TokenKind::Bang))
                }
            }
            '<' => {
                if self.match_char('<') {
                    Ok(self.operator_or_aug(TokenKind::LessLess))
                } else if self.match_char('=') {
                    Ok(self.make_token(TokenKind::LessEqual))
                } else {
                    Ok(self.make_token(TokenKind::Less))
                }
            }
            '>' => {
                if self.match_char('>') {
                    Ok(self.operator_or_aug(TokenKind::GreaterGreater))
                } else if self.match_char('=') {
                    Ok(self.make_token(TokenKind::GreaterEqual))
                } else {
                    Ok(self.make_token(TokenKind::Greater))
                }
            }

            c if c.is_ascii_digit() => self.scan_number(c),
            '.' if Self::is_digit(self.peek()) => self.scan_number('.'),

            c if c.is_xid_start() || c == '_' => Ok(self.scan_identifier()),

            _ => Err(self.make_error(
                &format!("Unexpected character: '{}'", c),
                LexerErrorKind::UnexpectedChar,
            )),
        }
    }

    /// Check if we've reached EOF.
    pub fn is_at_end(&self) -> bool {
        self.at_eof
    }

    /// Collect all tokens into a vector.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::new(source).tokenize().unwrap()
    }

    fn token_kinds(source: &str) -> Vec<TokenKind> {
        lex(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty() {
        let tokens = lex("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }

    #[test]
    fn test_header() {
        let kinds = token_kinds("dmv = {[i, j]: 0 <= i < N ^ 0 <= j < M}");
        assert_eq!(kinds[0], TokenKind::Identifier);
        assert_eq!(kinds[1], TokenKind::Equal);
        assert_eq!(kinds[2], TokenKind::LeftBrace);
        assert_eq!(kinds[3], TokenKind::LeftBracket);
        assert!(kinds.contains(&TokenKind::Caret));
        assert!(kinds.contains(&TokenKind::LessEqual));
        assert_eq!(*kinds.last().unwrap(), TokenKind::Eof);
    }

    #[test]
    fn test_numbers_keep_their_text() {
        let tokens = lex("4.0 1e3 42 .5");
        assert_eq!(tokens[0].kind, TokenKind::Float);
        assert_eq!(tokens[0].lexeme, "4.0");
        assert_eq!(tokens[1].kind, TokenKind::Float);
        assert_eq!(tokens[1].lexeme, "1e3");
        assert_eq!(tokens[2].kind, TokenKind::Integer);
        assert_eq!(tokens[3].lexeme, ".5");
    }

    #[test]
    fn test_operators() {
        let kinds = token_kinds("a // b ** c @ d << e");
        assert!(kinds.contains(&TokenKind::SlashSlash));
        assert!(kinds.contains(&TokenKind::StarStar));
        assert!(kinds.contains(&TokenKind::At));
        assert!(kinds.contains(&TokenKind::LessLess));
    }

    #[test]
    fn test_augmented_assignment() {
        let tokens = lex("y[i] += x //= z <<= w");
        let augs: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::AugAssign)
            .map(|t| t.lexeme.as_str())
            .collect();
        assert_eq!(augs, vec!["+=", "//=", "<<="]);
    }

    #[test]
    fn test_logical_aliases() {
        let kinds = token_kinds("a && b || !c != d");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::AmpAmp,
                TokenKind::Identifier,
                TokenKind::PipePipe,
                TokenKind::Bang,
                TokenKind::Identifier,
                TokenKind::BangEqual,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_newlines_inside_brackets_are_skipped() {
        let kinds = token_kinds("s = {[i]:\n 0 <= i < N}\ny[i] = 1");
        let newlines = kinds.iter().filter(|k| **k == TokenKind::Newline).count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn test_comments() {
        let tokens = lex("foo # comment\nbar");
        assert_eq!(tokens[0].lexeme, "foo");
        assert_eq!(tokens[1].kind, TokenKind::Newline);
        assert_eq!(tokens[2].lexeme, "bar");
    }

    #[test]
    fn test_unbalanced_bracket() {
        let err = Lexer::new("a]").tokenize().unwrap_err();
        assert_eq!(err.kind, LexerErrorKind::UnbalancedBracket);
    }

    #[test]
    fn test_location_tracking() {
        let tokens = lex("foo\nbar");
        assert_eq!(tokens[0].span.start_line, 1);
        assert_eq!(tokens[2].span.start_line, 2);
    }
}
