//! Precedence-climbing expression grammar.
//!
//! Low to high: `OR` -> `AND` -> additive (`+ -`) -> multiplicative
//! (`* / %`) -> primary. Function calls are recognized by `IDENT (`
//! lookahead; `CASE WHEN` recurses into the condition grammar for its
//! predicates and back into this grammar for THEN/ELSE values.

use crate::ast::{BinaryOp, CaseBranch, Expr, Literal};
use crate::token::TokenKind;

use super::{ParseError, Parser};

impl Parser<'_> {
    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and_expr()?;
        while self.eat_word("OR") {
            let right = self.parse_and_expr()?;
            left = Expr::binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        while self.eat_word("AND") {
            let right = self.parse_additive()?;
            left = Expr::binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    pub(crate) fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(t) if t.kind == TokenKind::Operator && t.text == "+" => BinaryOp::Add,
                Some(t) if t.kind == TokenKind::Operator && t.text == "-" => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_primary()?;
        loop {
            let op = match self.peek() {
                Some(t) if t.kind == TokenKind::Operator && t.text == "*" => BinaryOp::Mul,
                Some(t) if t.kind == TokenKind::Operator && t.text == "/" => BinaryOp::Div,
                Some(t) if t.kind == TokenKind::Operator && t.text == "%" => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_primary()?;
            left = Expr::binary(left, op, right);
        }
        Ok(left)
    }

    pub(crate) fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let Some(tok) = self.peek().cloned() else {
            return Err(self.error("expected expression, found end of input"));
        };

        match tok.kind {
            TokenKind::Number => {
                self.advance();
                Ok(Expr::Literal(Literal::Number(tok.text)))
            }
            TokenKind::Str => {
                self.advance();
                Ok(Expr::Literal(Literal::String(tok.text)))
            }
            TokenKind::Bool => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(tok.text == "TRUE")))
            }
            TokenKind::Operator if tok.text == "*" => {
                self.advance();
                Ok(Expr::Wildcard)
            }
            TokenKind::LParen => {
                self.enter()?;
                self.advance();
                let inner = self.parse_expr()?;
                self.expect_kind(TokenKind::RParen, "')'")?;
                self.exit();
                Ok(inner)
            }
            TokenKind::Clause if tok.text == "CASE" => self.parse_case_when(),
            TokenKind::Ident => {
                if tok.is_word("NULL") {
                    self.advance();
                    return Ok(Expr::Literal(Literal::Null));
                }
                // IDENT ( ... ) is a function call.
                if self.peek_at(1).map(|t| t.kind) == Some(TokenKind::LParen) {
                    return self.parse_function_call();
                }
                self.advance();
                Ok(Expr::Field(tok.text))
            }
            _ => Err(self.error(format!("expected expression, found {tok}"))),
        }
    }

    fn parse_function_call(&mut self) -> Result<Expr, ParseError> {
        let name = self.expect_ident("function name")?;
        self.enter()?;
        self.expect_kind(TokenKind::LParen, "'('")?;

        let mut args = Vec::new();
        if self.peek_kind() != Some(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.eat_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect_kind(TokenKind::RParen, "')'")?;
        self.exit();
        Ok(Expr::Function { name, args })
    }

    /// `CASE WHEN <conditions> THEN <expr> [WHEN ...] [ELSE <expr>] END`
    fn parse_case_when(&mut self) -> Result<Expr, ParseError> {
        self.expect_word("CASE")?;
        self.enter()?;

        let mut branches = Vec::new();
        while self.eat_word("WHEN") {
            let when = self.parse_condition_list()?;
            self.expect_word("THEN")?;
            let then = self.parse_expr()?;
            branches.push(CaseBranch { when, then });
        }
        if branches.is_empty() {
            return Err(self.error("CASE requires at least one WHEN branch"));
        }

        let otherwise = if self.eat_word("ELSE") {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.expect_word("END")?;
        self.exit();

        Ok(Expr::CaseWhen {
            branches,
            otherwise,
        })
    }
}
