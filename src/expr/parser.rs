//! Recursive-descent parser for source expressions.
//!
//! Every binary level is left-associative, `**` included. A sign binds to the
//! factor that follows it, so `-2**2` is `4`.

use super::ast::{BinaryOp, Expr, Function};
use super::lexer::{Token, TokenKind};
use crate::error::{LumpedError, Result};

/// Parser over a token list produced by [`super::Lexer::tokenize`].
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse a complete expression; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.parse_level(BinaryOp::LOOSEST)?;
        if self.current().kind != TokenKind::Eof {
            return Err(self.unexpected("operator or end of expression"));
        }
        Ok(expr)
    }

    fn current(&self) -> &Token {
        // The token list always ends with Eof, and the parser never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn parse_level(&mut self, level: u8) -> Result<Expr> {
        let mut lhs = self.parse_operand(level)?;
        while let Some(op) = self.operator_at(level) {
            self.advance();
            let rhs = self.parse_operand(level)?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_operand(&mut self, level: u8) -> Result<Expr> {
        if level == 1 {
            self.parse_factor()
        } else {
            self.parse_level(level - 1)
        }
    }

    fn operator_at(&self, level: u8) -> Option<BinaryOp> {
        let token = self.current();
        if token.kind != TokenKind::Operator {
            return None;
        }
        BinaryOp::from_symbol(&token.text).filter(|op| op.precedence() == level)
    }

    fn parse_factor(&mut self) -> Result<Expr> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(value) | TokenKind::Constant(value) => Ok(Expr::Number(value)),
            TokenKind::Variable => Ok(Expr::Time),
            TokenKind::Operator if token.text == "+" => self.parse_factor(),
            TokenKind::Operator if token.text == "-" => {
                Ok(Expr::Negate(Box::new(self.parse_factor()?)))
            }
            TokenKind::Function => {
                let function = Function::from_name(&token.text).ok_or_else(|| {
                    LumpedError::internal(format!("'{}' lexed as a function", token.text))
                })?;
                self.expect(TokenKind::OpenParen, "(")?;
                let arg = self.parse_level(BinaryOp::LOOSEST)?;
                self.expect(TokenKind::CloseParen, ")")?;
                Ok(Expr::Call {
                    function,
                    arg: Box::new(arg),
                })
            }
            TokenKind::OpenParen => {
                let inner = self.parse_level(BinaryOp::LOOSEST)?;
                self.expect(TokenKind::CloseParen, ")")?;
                Ok(inner)
            }
            _ => {
                if token.kind != TokenKind::Eof {
                    self.pos -= 1;
                }
                Err(self.unexpected("number, '(' or function"))
            }
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<()> {
        if self.current().kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", expected)))
        }
    }

    fn unexpected(&self, expected: &str) -> LumpedError {
        let token = self.current();
        if token.kind == TokenKind::Eof {
            LumpedError::UnexpectedEnd {
                expected: expected.to_string(),
            }
        } else {
            LumpedError::unexpected_token(&token.text, token.column, expected)
        }
    }
}
