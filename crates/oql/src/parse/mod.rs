//! Recursive-descent parser.
//!
//! Single cursor over the lexed token stream, no backtracking across
//! statements; the only lookahead is local (matching-paren peeks for
//! condition groups, two-token statement classification). Every sub-parser
//! consumes at least one token per iteration, so parsing always terminates.
//!
//! Statement dispatch: the first token's registry classification routes to a
//! family sub-parser (crud / dql / ddl / tcl / dcl modules). A leading `(`
//! routes to the set-operation grammar.

mod condition;
mod crud;
mod dcl;
mod ddl;
mod dql;
mod expr;
mod tcl;

use log::debug;
use thiserror::Error;

use crate::ast::Query;
use crate::registry::{Group, Registry};
use crate::token::{Position, Token, TokenKind};

/// Maximum nesting depth for parenthesized groups and nested sub-queries.
/// Converts would-be stack overflow into a reported error.
pub(crate) const MAX_DEPTH: usize = 32;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} ({position})")]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

/// Parse a tokenized statement into a single [`Query`].
pub fn parse(tokens: Vec<Token>, registry: &Registry) -> Result<Query, ParseError> {
    let mut parser = Parser::new(tokens, registry);
    let query = parser.parse_query()?;
    parser.skip_semicolons();
    if let Some(tok) = parser.peek() {
        return Err(parser.error_with_suggestion(format!("unexpected token {tok}"), &tok.text));
    }
    Ok(query)
}

pub(crate) struct Parser<'r> {
    tokens: Vec<Token>,
    pos: usize,
    pub(crate) registry: &'r Registry,
    depth: usize,
}

impl<'r> Parser<'r> {
    pub(crate) fn new(tokens: Vec<Token>, registry: &'r Registry) -> Self {
        Parser {
            tokens,
            pos: 0,
            registry,
            depth: 0,
        }
    }

    // ============ Statement dispatch ============

    pub(crate) fn parse_query(&mut self) -> Result<Query, ParseError> {
        if self.peek_kind() == Some(TokenKind::LParen) {
            return self.parse_set_operation();
        }

        let Some(first) = self.peek().cloned() else {
            return Err(self.error("empty statement"));
        };

        if first.kind != TokenKind::Operation {
            return Err(
                self.error_with_suggestion(format!("unknown operation {first}"), &first.text)
            );
        }

        let operation = self
            .registry
            .operation(&first.text)
            .ok_or_else(|| self.error(format!("unknown operation {first}")))?;
        debug!("dispatching {} statement", operation);

        match operation.group() {
            Group::Dql => self.parse_get(first.position),
            Group::Crud => self.parse_mutation(operation, first.position),
            Group::Ddl => self.parse_ddl(operation, first.position),
            Group::Tcl => self.parse_tcl(operation, first.position),
            Group::Dcl => self.parse_dcl(operation, first.position),
        }
    }

    // ============ Cursor primitives ============

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub(crate) fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead)
    }

    pub(crate) fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    pub(crate) fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(crate) fn skip_semicolons(&mut self) {
        while self.peek_kind() == Some(TokenKind::Semicolon) {
            self.pos += 1;
        }
    }

    /// Consume the next token if it is the given kind.
    pub(crate) fn eat_kind(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_kind(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        match self.peek() {
            Some(t) if t.kind == kind => Ok(self.advance().unwrap()),
            Some(t) => Err(self.error(format!("expected {what}, found {t}"))),
            None => Err(self.error(format!("expected {what}, found end of input"))),
        }
    }

    /// Consume the next token if it matches `upper` case-insensitively.
    pub(crate) fn eat_word(&mut self, upper: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_word(upper)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_word(&mut self, upper: &str) -> Result<Token, ParseError> {
        match self.peek() {
            Some(t) if t.is_word(upper) => Ok(self.advance().unwrap()),
            Some(t) => Err(self.error(format!("expected '{upper}', found {t}"))),
            None => Err(self.error(format!("expected '{upper}', found end of input"))),
        }
    }

    /// Take any word-shaped token (identifier or keyword) as a name.
    pub(crate) fn expect_name(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(t)
                if matches!(
                    t.kind,
                    TokenKind::Ident
                        | TokenKind::Operation
                        | TokenKind::Clause
                        | TokenKind::Operator
                        | TokenKind::Bool
                ) =>
            {
                Ok(self.advance().unwrap().text)
            }
            Some(t) => Err(self.error(format!("expected {what}, found {t}"))),
            None => Err(self.error(format!("expected {what}, found end of input"))),
        }
    }

    pub(crate) fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        Ok(self.expect_kind(TokenKind::Ident, what)?.text)
    }

    pub(crate) fn expect_number(&mut self, what: &str) -> Result<String, ParseError> {
        Ok(self.expect_kind(TokenKind::Number, what)?.text)
    }

    pub(crate) fn expect_string(&mut self, what: &str) -> Result<String, ParseError> {
        Ok(self.expect_kind(TokenKind::Str, what)?.text)
    }

    /// Index of the RParen matching the LParen at `open`, if balanced.
    pub(crate) fn matching_paren(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, tok) in self.tokens.iter().enumerate().skip(open) {
            match tok.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    // ============ Depth guard ============

    pub(crate) fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error(format!("nesting deeper than {MAX_DEPTH} levels")));
        }
        Ok(())
    }

    pub(crate) fn exit(&mut self) {
        self.depth -= 1;
    }

    // ============ Errors ============

    pub(crate) fn current_position(&self) -> Position {
        self.peek()
            .map(|t| t.position)
            .or_else(|| self.tokens.last().map(|t| t.position))
            .unwrap_or_else(Position::start)
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.current_position(),
        }
    }

    /// Error decorated with a "did you mean" hint when the offending word is
    /// close to a registry keyword.
    pub(crate) fn error_with_suggestion(
        &self,
        message: impl Into<String>,
        offending: &str,
    ) -> ParseError {
        let mut message = message.into();
        if let Some(hint) = self.registry.suggest(offending) {
            message.push_str(&format!(". Did you mean '{hint}'?"));
        }
        ParseError {
            message,
            position: self.current_position(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn try_parse(text: &str) -> Result<Query, ParseError> {
        let reg = Registry::new();
        let tokens = tokenize(text, &reg).unwrap();
        parse(tokens, &reg)
    }

    #[test]
    fn rejects_empty_input() {
        assert!(try_parse("").is_err());
        assert!(try_parse(";").is_err());
    }

    #[test]
    fn rejects_trailing_garbage() {
        let err = try_parse("COMMIT COMMIT").unwrap_err();
        assert!(err.message.contains("unexpected token"));
    }

    #[test]
    fn unknown_operation_gets_a_suggestion() {
        let err = try_parse("GETT User").unwrap_err();
        assert!(err.message.contains("Did you mean 'GET'"), "{}", err.message);
    }

    #[test]
    fn trailing_semicolon_is_tolerated() {
        assert!(try_parse("COMMIT;").is_ok());
    }
}
